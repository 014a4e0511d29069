use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::accounts::{Account, AccountSet};
use crate::checklist::{Checklist, ChecklistStore};
use crate::config::Upstream;
use crate::errors::ChecklistError;
use crate::gateway::{Operation, RemoteGateway, RetryPolicy};
use crate::poll::Clock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcceptStatus {
    Accepted,
    AlreadyAccepted,
    NoInvitation,
    /// The invitation list could not be parsed; counted as no invitation.
    Malformed(String),
    Failed(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AcceptReport {
    pub accepted: usize,
    pub already_accepted: usize,
    pub no_invitation: usize,
    pub failed: usize,
    pub total: usize,
}

#[derive(Debug, Deserialize)]
struct Invitation {
    id: u64,
    #[serde(default)]
    repository: Option<InvitedRepository>,
}

#[derive(Debug, Deserialize)]
struct InvitedRepository {
    #[serde(default)]
    full_name: String,
}

/// Find the invitation to `target` (case-insensitive `owner/repo`).
fn find_invitation(payload: &str, target: &str) -> Result<Option<u64>, serde_json::Error> {
    let invitations: Vec<Invitation> = serde_json::from_str(payload)?;
    Ok(invitations
        .into_iter()
        .find(|inv| {
            inv.repository
                .as_ref()
                .is_some_and(|r| r.full_name.eq_ignore_ascii_case(target))
        })
        .map(|inv| inv.id))
}

/// Accepts each collaborator's pending invitation to the upstream repository
/// with that collaborator's own credential.
pub struct AcceptFlow {
    gateway: Arc<dyn RemoteGateway>,
    checklist: Arc<dyn ChecklistStore>,
    clock: Arc<dyn Clock>,
    upstream: Upstream,
    delay: Duration,
}

impl AcceptFlow {
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

    async fn accept_one(&self, account: &Account, target: &str) -> AcceptStatus {
        let listed = self
            .gateway
            .execute(&Operation::ListInvitations, &account.token, RetryPolicy::LIST_INVITATIONS)
            .await;
        if !listed.success {
            return AcceptStatus::Failed(format!(
                "failed to fetch invitations: {}",
                listed.error_text()
            ));
        }

        let id = match find_invitation(&listed.output, target) {
            Ok(Some(id)) => id,
            Ok(None) => return AcceptStatus::NoInvitation,
            Err(e) => return AcceptStatus::Malformed(e.to_string()),
        };

        let accepted = self
            .gateway
            .execute(&Operation::AcceptInvitation { id }, &account.token, RetryPolicy::ACCEPT)
            .await;
        if !accepted.success {
            return AcceptStatus::Failed(format!(
                "failed to accept invitation {}: {}",
                id,
                accepted.error_text()
            ));
        }
        AcceptStatus::Accepted
    }

    /// `on_account(index, total, username, status)` fires for every
    /// collaborator, including the ones skipped as already accepted.
    pub async fn run(
        &self,
        accounts: &AccountSet,
        on_account: &mut dyn FnMut(usize, usize, &str, &AcceptStatus),
    ) -> Result<AcceptReport, ChecklistError> {
        let target = self.upstream.full_name();
        let mut report = AcceptReport {
            total: accounts.collaborator_count(),
            ..AcceptReport::default()
        };
        info!(%target, total = report.total, "Accepting invitations");

        let mut processed_any = false;
        for (i, account) in accounts.collaborators().enumerate() {
            let status = if self.checklist.contains(Checklist::Accepted, &account.username)? {
                AcceptStatus::AlreadyAccepted
            } else {
                if processed_any {
                    self.clock.sleep(self.delay).await;
                }
                processed_any = true;
                self.accept_one(account, &target).await
            };

            match &status {
                AcceptStatus::Accepted => {
                    self.checklist.add(Checklist::Accepted, &account.username)?;
                    info!(account = %account.username, "Invitation accepted");
                    report.accepted += 1;
                }
                AcceptStatus::AlreadyAccepted => report.already_accepted += 1,
                AcceptStatus::NoInvitation => {
                    info!(account = %account.username, "No invitation found");
                    report.no_invitation += 1;
                }
                AcceptStatus::Malformed(error) => {
                    warn!(
                        account = %account.username,
                        %error,
                        "Unreadable invitation list, treating as no invitation"
                    );
                    report.no_invitation += 1;
                }
                AcceptStatus::Failed(error) => {
                    warn!(account = %account.username, %error, "Accept failed");
                    report.failed += 1;
                }
            }
            on_account(i + 1, report.total, &account.username, &status);
        }

        Ok(report)
    }
}
