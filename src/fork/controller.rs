use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::mode::ForkMode;
use super::state::{AccountOutcome, FailureReason, ForkPath, ForkState};
use crate::accounts::Account;
use crate::checklist::{Checklist, ChecklistStore};
use crate::classify::{Outcome, classify};
use crate::config::Upstream;
use crate::failure_log::FailureLog;
use crate::fleet_config::ForkSettings;
use crate::gateway::{Operation, OperationKind, RemoteGateway, RetryPolicy};
use crate::poll::{Clock, PollOutcome, PollPolicy, poll_until};
use crate::prober::ForkProber;

/// Drives one account's fork through its lifecycle.
///
/// The controller is the only component that issues destructive remote
/// calls, and it only ever touches the Forked checklist entry of the
/// account it is processing.
pub struct ForkController {
    gateway: Arc<dyn RemoteGateway>,
    checklist: Arc<dyn ChecklistStore>,
    clock: Arc<dyn Clock>,
    failures: Arc<FailureLog>,
    prober: ForkProber,
    upstream: Upstream,
    settings: ForkSettings,
}

impl ForkController {
    pub fn new(
        gateway: Arc<dyn RemoteGateway>,
        checklist: Arc<dyn ChecklistStore>,
        clock: Arc<dyn Clock>,
        failures: Arc<FailureLog>,
        upstream: Upstream,
        settings: ForkSettings,
    ) -> Self {
        let prober = ForkProber::new(gateway.clone(), settings.fallback_branch.clone());
        Self {
            gateway,
            checklist,
            clock,
            failures,
            prober,
            upstream,
            settings,
        }
    }

    pub fn upstream(&self) -> &Upstream {
        &self.upstream
    }

    /// Run the lifecycle for `account` under `mode`. Never panics and never
    /// returns an error: every failure ends in a `Failed` outcome.
    pub async fn process(&self, account: &Account, mode: ForkMode) -> AccountOutcome {
        let fork = self.upstream.fork_path(&account.username);
        let mut outcome = AccountOutcome::new(&account.username, &fork);

        match mode {
            ForkMode::SyncAndKeep => self.sync_and_keep(account, &fork, &mut outcome).await,
            ForkMode::ForceClean(_) => self.force_clean(account, &fork, &mut outcome).await,
        }

        match outcome.failure() {
            Some(reason) => {
                warn!(account = %account.username, %fork, %reason, "Fork lifecycle failed")
            }
            None => info!(
                account = %account.username,
                %fork,
                state = outcome.state().map(ForkState::name).unwrap_or("none"),
                "Fork lifecycle complete"
            ),
        }
        outcome
    }

    async fn sync_and_keep(&self, account: &Account, fork: &str, outcome: &mut AccountOutcome) {
        let expected_parent = self.upstream.full_name();
        if self
            .prober
            .is_valid_fork(fork, &account.token, &expected_parent)
            .await
        {
            info!(account = %account.username, %fork, "Valid fork found, syncing");
            outcome.path = Some(ForkPath::Sync);
            outcome.advance(ForkState::Ready);
            self.sync(account, fork, outcome).await;
        } else {
            info!(account = %account.username, %fork, "Fork missing or not a fork of upstream");
            outcome.path = Some(ForkPath::Create);
            outcome.advance(ForkState::Absent);
            self.create_and_wait(account, fork, outcome).await;
        }
    }

    async fn force_clean(&self, account: &Account, fork: &str, outcome: &mut AccountOutcome) {
        outcome.path = Some(ForkPath::Recreate);

        // Any failed existence probe is read as "nothing to delete".
        if self.prober.repo_exists(fork, &account.token).await {
            outcome.advance(ForkState::Deleting);
            if !self.delete(account, fork, outcome).await {
                return;
            }
        } else {
            debug!(account = %account.username, %fork, "No repository to delete");
        }
        outcome.advance(ForkState::Absent);
        self.create_and_wait(account, fork, outcome).await;
    }

    /// Delete `fork`. On failure the account is marked failed and nothing
    /// else happens to it this run.
    async fn delete(&self, account: &Account, fork: &str, outcome: &mut AccountOutcome) -> bool {
        info!(account = %account.username, %fork, "Deleting repository");
        let operation = Operation::DeleteRepository {
            path: fork.to_string(),
        };
        let result = self
            .gateway
            .execute(&operation, &account.token, RetryPolicy::DELETE)
            .await;

        if let Outcome::Failed { error } = classify(OperationKind::DeleteRepository, &result) {
            error!(account = %account.username, %fork, %error, "Deletion failed");
            self.failures
                .record(&format!("Failed to delete {}: {}", fork, error));
            outcome.fail(FailureReason::DeletionFailed(error));
            return false;
        }

        info!(account = %account.username, %fork, "Repository deleted");
        self.clock.sleep(self.settings.deletion_settle).await;
        true
    }

    /// Drop a Forked record that no longer matches the remote.
    fn repair_stale_record(&self, account: &Account) -> Result<(), FailureReason> {
        let stale = self
            .checklist
            .contains(Checklist::Forked, &account.username)
            .map_err(|e| FailureReason::Checklist(e.to_string()))?;
        if stale {
            warn!(account = %account.username, "Removing stale forked record");
            self.checklist
                .remove(Checklist::Forked, &account.username)
                .map_err(|e| FailureReason::Checklist(e.to_string()))?;
        }
        Ok(())
    }

    async fn create_and_wait(&self, account: &Account, fork: &str, outcome: &mut AccountOutcome) {
        if let Err(reason) = self.repair_stale_record(account) {
            outcome.fail(reason);
            return;
        }

        outcome.advance(ForkState::Creating);
        info!(account = %account.username, source = %self.upstream.full_name(), "Creating fork");
        let operation = Operation::CreateFork {
            source: self.upstream.full_name(),
        };
        let result = self
            .gateway
            .execute(&operation, &account.token, RetryPolicy::CREATE_FORK)
            .await;

        match classify(OperationKind::CreateFork, &result) {
            Outcome::Succeeded => debug!(account = %account.username, "Fork creation accepted"),
            Outcome::Converged { matched } => {
                warn!(
                    account = %account.username,
                    %matched,
                    "Fork already exists, skipping creation"
                )
            }
            Outcome::Failed { error } => {
                error!(account = %account.username, %error, "Fork creation failed");
                self.failures
                    .record(&format!("Fork failed for @{}: {}", account.username, error));
                outcome.fail(FailureReason::CreationFailed(error));
                return;
            }
        }
        outcome.advance(ForkState::Pending);

        self.clock.sleep(self.settings.step_delay).await;
        let policy = PollPolicy::new(self.settings.poll_interval, self.settings.poll_timeout);
        let token = account.token.as_str();
        let polled = poll_until(self.clock.as_ref(), policy, || {
            self.prober.repo_exists(fork, token)
        })
        .await;

        match polled {
            PollOutcome::Ready { attempts } => {
                info!(account = %account.username, %fork, attempts, "Fork is ready");
                outcome.advance(ForkState::Ready);
            }
            PollOutcome::TimedOut { attempts } => {
                let reason = FailureReason::ReadinessTimeout {
                    waited: policy.timeout,
                    attempts,
                };
                error!(account = %account.username, %fork, attempts, "Timed out waiting for fork");
                self.failures
                    .record(&format!("Fork failed for @{}: {}", account.username, reason));
                outcome.fail(reason);
                return;
            }
        }

        self.clock.sleep(self.settings.step_delay).await;
        self.disable_automation(account, fork).await;
        outcome.advance(ForkState::AutomationDisabled);

        if let Err(e) = self.checklist.add(Checklist::Forked, &account.username) {
            outcome.fail(FailureReason::Checklist(e.to_string()));
        }
    }

    /// Best effort: the workflow may not exist on the fork.
    async fn disable_automation(&self, account: &Account, fork: &str) -> bool {
        let operation = Operation::DisableWorkflow {
            repo: fork.to_string(),
            workflow: self.settings.workflow.clone(),
        };
        let result = self
            .gateway
            .execute(&operation, &account.token, RetryPolicy::DISABLE_WORKFLOW)
            .await;
        if result.success {
            debug!(
                account = %account.username,
                workflow = %self.settings.workflow,
                "Workflow disabled"
            );
        } else {
            warn!(
                account = %account.username,
                workflow = %self.settings.workflow,
                error = result.error_text(),
                "Could not disable workflow"
            );
        }
        result.success
    }

    async fn sync(&self, account: &Account, fork: &str, outcome: &mut AccountOutcome) {
        let branch = self.prober.get_default_branch(fork, &account.token).await;
        self.disable_automation(account, fork).await;
        outcome.advance(ForkState::AutomationDisabled);

        let operation = Operation::MergeUpstream {
            fork: fork.to_string(),
            branch: branch.clone(),
        };
        let result = self
            .gateway
            .execute(&operation, &account.token, RetryPolicy::MERGE_UPSTREAM)
            .await;

        match classify(OperationKind::MergeUpstream, &result) {
            Outcome::Succeeded => info!(account = %account.username, %branch, "Fork synced"),
            Outcome::Converged { .. } => {
                info!(account = %account.username, %branch, "Fork already up to date")
            }
            Outcome::Failed { error } => {
                warn!(account = %account.username, %branch, %error, "Sync failed");
                outcome.fail(FailureReason::SyncFailed(error));
                return;
            }
        }

        if let Err(e) = self.checklist.add(Checklist::Forked, &account.username) {
            outcome.fail(FailureReason::Checklist(e.to_string()));
            return;
        }
        outcome.advance(ForkState::Synced);
    }
}
