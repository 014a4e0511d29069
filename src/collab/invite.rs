use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::accounts::AccountSet;
use crate::checklist::{Checklist, ChecklistStore};
use crate::classify::{Outcome, classify};
use crate::config::Upstream;
use crate::errors::ChecklistError;
use crate::gateway::{Operation, OperationKind, RemoteGateway, RetryPolicy};
use crate::poll::Clock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InviteStatus {
    Invited,
    AlreadyCollaborator,
    Failed(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InviteReport {
    pub invited: usize,
    pub failed: usize,
    pub candidates: usize,
}

/// Invites every collaborator not yet in the Invited checklist, using the
/// main account's credential.
pub struct InviteFlow {
    gateway: Arc<dyn RemoteGateway>,
    checklist: Arc<dyn ChecklistStore>,
    clock: Arc<dyn Clock>,
    upstream: Upstream,
    delay: Duration,
}

impl InviteFlow {
    pub fn new(
        gateway: Arc<dyn RemoteGateway>,
        checklist: Arc<dyn ChecklistStore>,
        clock: Arc<dyn Clock>,
        upstream: Upstream,
        delay: Duration,
    ) -> Self {
        Self {
            gateway,
            checklist,
            clock,
            upstream,
            delay,
        }
    }

    /// Usernames that still need an invitation, in account-set order.
    pub fn candidates(&self, accounts: &AccountSet) -> Result<Vec<String>, ChecklistError> {
        let mut pending = Vec::new();
        for account in accounts.collaborators() {
            if !self.checklist.contains(Checklist::Invited, &account.username)? {
                pending.push(account.username.clone());
            }
        }
        Ok(pending)
    }

    /// `on_account(index, total, username, status)` fires after each invite.
    pub async fn run(
        &self,
        accounts: &AccountSet,
        on_account: &mut dyn FnMut(usize, usize, &str, &InviteStatus),
    ) -> Result<InviteReport, ChecklistError> {
        let candidates = self.candidates(accounts)?;
        let mut report = InviteReport {
            candidates: candidates.len(),
            ..InviteReport::default()
        };
        if candidates.is_empty() {
            info!("All accounts already invited");
            return Ok(report);
        }

        let repo = self.upstream.full_name();
        info!(%repo, candidates = report.candidates, "Inviting collaborators");

        for (i, username) in candidates.iter().enumerate() {
            if i > 0 {
                self.clock.sleep(self.delay).await;
            }
            let operation = Operation::InviteCollaborator {
                repo: repo.clone(),
                username: username.clone(),
            };
            let result = self
                .gateway
                .execute(&operation, &self.upstream.token, RetryPolicy::INVITE)
                .await;

            let status = match classify(OperationKind::InviteCollaborator, &result) {
                Outcome::Succeeded => InviteStatus::Invited,
                Outcome::Converged { .. } => InviteStatus::AlreadyCollaborator,
                Outcome::Failed { error } => InviteStatus::Failed(error),
            };

            match &status {
                InviteStatus::Failed(error) => {
                    warn!(account = %username, %error, "Invitation failed");
                    report.failed += 1;
                }
                _ => {
                    self.checklist.add(Checklist::Invited, username)?;
                    info!(account = %username, ?status, "Invited");
                    report.invited += 1;
                }
            }
            on_account(i + 1, report.candidates, username, &status);
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::Account;
    use crate::checklist::MemoryChecklistStore;
    use crate::gateway::OperationResult;
    use crate::poll::ManualClock;
    use crate::test_support::MockGateway;

    fn invite(username: &str) -> Operation {
        Operation::InviteCollaborator {
            repo: "main/project".into(),
            username: username.into(),
        }
    }

    fn flow(
        gateway: &Arc<MockGateway>,
        checklist: &Arc<MemoryChecklistStore>,
        clock: &Arc<ManualClock>,
    ) -> InviteFlow {
        InviteFlow::new(
            gateway.clone(),
            checklist.clone(),
            clock.clone(),
            Upstream {
                owner: "main".into(),
                repo: "project".into(),
                token: "ghp_main".into(),
            },
            Duration::from_secs(1),
        )
    }

    fn accounts() -> AccountSet {
        AccountSet::new(
            Account::main("main", "ghp_main"),
            vec![
                Account::collaborator("alice", "ghp_alice"),
                Account::collaborator("bob", "ghp_bob"),
                Account::collaborator("carol", "ghp_carol"),
            ],
        )
    }

    #[tokio::test]
    async fn test_invites_with_main_credential_and_records() {
        let gateway = Arc::new(MockGateway::new());
        let checklist = Arc::new(MemoryChecklistStore::new());
        let clock = Arc::new(ManualClock::new());
        gateway.on(invite("alice"), OperationResult::ok(""));
        gateway.on(
            invite("bob"),
            OperationResult::failed("HTTP 422: Validation Failed: already a collaborator"),
        );
        gateway.on(invite("carol"), OperationResult::failed("HTTP 404: Not Found"));

        let mut seen = Vec::new();
        let report = flow(&gateway, &checklist, &clock)
            .run(&accounts(), &mut |i, total, user, status| {
                seen.push((i, total, user.to_string(), status.clone()))
            })
            .await
            .unwrap();

        assert_eq!(
            report,
            InviteReport {
                invited: 2,
                failed: 1,
                candidates: 3
            }
        );
        assert_eq!(
            checklist.members(Checklist::Invited).unwrap(),
            vec!["alice".to_string(), "bob".to_string()]
        );
        assert!(gateway.calls().iter().all(|c| c.credential == "ghp_main"));
        assert!(gateway.calls().iter().all(|c| c.policy == RetryPolicy::INVITE));
        assert_eq!(seen[1].3, InviteStatus::AlreadyCollaborator);
        assert_eq!(clock.sleeps().len(), 2);
    }

    #[tokio::test]
    async fn test_second_run_does_not_reinvite() {
        let gateway = Arc::new(MockGateway::new());
        let checklist = Arc::new(MemoryChecklistStore::new());
        let clock = Arc::new(ManualClock::new());
        gateway.on(invite("alice"), OperationResult::ok(""));
        gateway.on(
            invite("bob"),
            OperationResult::failed("already a collaborator"),
        );
        gateway.on(invite("carol"), OperationResult::ok(""));
        let flow = flow(&gateway, &checklist, &clock);

        flow.run(&accounts(), &mut |_, _, _, _| {}).await.unwrap();
        let first_calls = gateway.count(OperationKind::InviteCollaborator);
        let second = flow.run(&accounts(), &mut |_, _, _, _| {}).await.unwrap();

        assert_eq!(first_calls, 3);
        assert_eq!(gateway.count(OperationKind::InviteCollaborator), 3);
        assert_eq!(second.candidates, 0);
        assert_eq!(checklist.members(Checklist::Invited).unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_already_invited_accounts_are_not_candidates() {
        let gateway = Arc::new(MockGateway::new());
        let checklist =
            Arc::new(MemoryChecklistStore::new().with_entries(Checklist::Invited, &["bob"]));
        let clock = Arc::new(ManualClock::new());
        let candidates = flow(&gateway, &checklist, &clock).candidates(&accounts()).unwrap();
        assert_eq!(candidates, vec!["alice".to_string(), "carol".to_string()]);
    }
}
