//! Wiring: builds the concrete gateway, stores and flows from a [`Config`].

use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::checklist::{ChecklistStore, FileChecklistStore};
use crate::collab::{AcceptFlow, InviteFlow};
use crate::config::{Config, Upstream};
use crate::failure_log::FailureLog;
use crate::fork::{BatchOrchestrator, ForkController};
use crate::gateway::{GitHubGateway, RemoteGateway};
use crate::poll::{Clock, TokioClock};
use crate::tokens::TokenValidator;

/// Shared dependencies of every command that talks to GitHub.
pub struct Fleet {
    pub gateway: Arc<dyn RemoteGateway>,
    pub checklist: Arc<dyn ChecklistStore>,
    pub clock: Arc<dyn Clock>,
    pub failures: Arc<FailureLog>,
    step_delay: Duration,
    account_delay: Duration,
    fork_settings: crate::fleet_config::ForkSettings,
}

impl Fleet {
    pub fn from_config(config: &Config) -> Result<Self> {
        let gateway = GitHubGateway::from_toml(&config.toml)?;
        Ok(Self::with_parts(
            config,
            Arc::new(gateway),
            Arc::new(FileChecklistStore::new(&config.state_dir)),
            Arc::new(TokioClock),
        ))
    }

    pub fn with_parts(
        config: &Config,
        gateway: Arc<dyn RemoteGateway>,
        checklist: Arc<dyn ChecklistStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let fork_settings = config.toml.fork_settings();
        Self {
            gateway,
            checklist,
            clock,
            failures: Arc::new(FailureLog::file(&config.failure_log)),
            step_delay: fork_settings.step_delay,
            account_delay: config.toml.account_delay(),
            fork_settings,
        }
    }

    pub fn fork_orchestrator(&self, upstream: Upstream) -> BatchOrchestrator {
        let controller = ForkController::new(
            self.gateway.clone(),
            self.checklist.clone(),
            self.clock.clone(),
            self.failures.clone(),
            upstream,
            self.fork_settings.clone(),
        );
        BatchOrchestrator::new(controller, self.clock.clone(), self.account_delay)
    }

    pub fn invite_flow(&self, upstream: Upstream) -> InviteFlow {
        InviteFlow::new(
            self.gateway.clone(),
            self.checklist.clone(),
            self.clock.clone(),
            upstream,
            self.step_delay,
        )
    }

    pub fn accept_flow(&self, upstream: Upstream) -> AcceptFlow {
        AcceptFlow::new(
            self.gateway.clone(),
            self.checklist.clone(),
            self.clock.clone(),
            upstream,
            self.step_delay,
        )
    }

    pub fn token_validator(&self) -> TokenValidator {
        TokenValidator::new(self.gateway.clone(), self.clock.clone())
    }
}

/// Exclusive lock on `.forkfleet/run.lock`, released on drop.
pub struct RunLock {
    file: File,
}

impl RunLock {
    pub fn acquire(path: &Path) -> Result<Self> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)
            .with_context(|| format!("Failed to open lock file {}", path.display()))?;
        file.try_lock_exclusive().with_context(|| {
            format!(
                "Another forkfleet run holds {}; wait for it to finish",
                path.display()
            )
        })?;
        Ok(Self { file })
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::{Account, AccountSet};
    use crate::checklist::{Checklist, MemoryChecklistStore};
    use crate::fleet_config::FleetToml;
    use crate::fork::ForkMode;
    use crate::gateway::{Operation, OperationKind, OperationResult};
    use crate::poll::ManualClock;
    use crate::test_support::MockGateway;
    use tempfile::tempdir;

    #[test]
    fn test_second_lock_is_refused_until_release() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".forkfleet/run.lock");
        let first = RunLock::acquire(&path).unwrap();
        assert!(RunLock::acquire(&path).is_err());
        drop(first);
        assert!(RunLock::acquire(&path).is_ok());
    }

    #[tokio::test]
    async fn test_failures_land_in_configured_log() {
        let dir = tempdir().unwrap();
        let config = Config::with_toml(dir.path(), false, FleetToml::default());
        let gateway = Arc::new(MockGateway::new());
        gateway.on(
            Operation::CreateFork {
                source: "main/project".into(),
            },
            OperationResult::failed("HTTP 403: Forbidden"),
        );
        let fleet = Fleet::with_parts(
            &config,
            gateway.clone(),
            Arc::new(MemoryChecklistStore::new()),
            Arc::new(ManualClock::new()),
        );
        let upstream = Upstream {
            owner: "main".into(),
            repo: "project".into(),
            token: "ghp_main".into(),
        };
        let accounts = AccountSet::new(
            Account::main("main", "ghp_main"),
            vec![Account::collaborator("bob", "ghp_bob")],
        );

        let report = fleet
            .fork_orchestrator(upstream)
            .run(&accounts, ForkMode::SyncAndKeep)
            .await;

        assert_eq!(report.failed_count, 1);
        assert_eq!(gateway.count(OperationKind::CreateFork), 1);
        let log = std::fs::read_to_string(&config.failure_log).unwrap();
        assert!(log.contains("Fork failed for @bob: HTTP 403: Forbidden"));
        assert!(!fleet.checklist.contains(Checklist::Forked, "bob").unwrap());
    }
}
