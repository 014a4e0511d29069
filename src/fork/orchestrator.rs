use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use super::controller::ForkController;
use super::mode::ForkMode;
use super::state::AccountOutcome;
use crate::accounts::{Account, AccountSet};
use crate::poll::Clock;

/// Aggregate result of a batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub success_count: usize,
    pub failed_count: usize,
    pub total: usize,
}

/// Receives per-account progress. The CLI renders it; tests ignore it.
pub trait BatchObserver: Send + Sync {
    fn account_started(&self, _index: usize, _total: usize, _account: &Account) {}
    fn account_finished(&self, _index: usize, _total: usize, _outcome: &AccountOutcome) {}
}

/// Observer that does nothing.
pub struct SilentObserver;

impl BatchObserver for SilentObserver {}

/// Runs the controller over every collaborator, one at a time.
pub struct BatchOrchestrator {
    controller: ForkController,
    clock: Arc<dyn Clock>,
    account_delay: Duration,
}

impl BatchOrchestrator {
    pub fn new(controller: ForkController, clock: Arc<dyn Clock>, account_delay: Duration) -> Self {
        Self {
            controller,
            clock,
            account_delay,
        }
    }

    pub async fn run(&self, accounts: &AccountSet, mode: ForkMode) -> BatchReport {
        self.run_observed(accounts, mode, &SilentObserver).await
    }

    /// Process collaborators in account-set order. The main account is
    /// never a candidate, whatever the set contains.
    pub async fn run_observed(
        &self,
        accounts: &AccountSet,
        mode: ForkMode,
        observer: &dyn BatchObserver,
    ) -> BatchReport {
        let main = accounts.main().username.to_lowercase();
        let candidates: Vec<&Account> = accounts
            .collaborators()
            .filter(|a| !a.is_main() && a.username.to_lowercase() != main)
            .collect();

        let mut report = BatchReport {
            total: candidates.len(),
            ..BatchReport::default()
        };
        info!(
            total = report.total,
            mode = %mode.choice(),
            upstream = %self.controller.upstream().full_name(),
            "Starting fork batch"
        );

        for (i, account) in candidates.iter().enumerate() {
            let index = i + 1;
            observer.account_started(index, report.total, account);
            let outcome = self.controller.process(account, mode).await;
            if outcome.is_success() {
                report.success_count += 1;
            } else {
                report.failed_count += 1;
            }
            observer.account_finished(index, report.total, &outcome);

            if index < report.total {
                self.clock.sleep(self.account_delay).await;
            }
        }

        info!(
            success = report.success_count,
            failed = report.failed_count,
            total = report.total,
            "Fork batch complete"
        );
        report
    }
}
