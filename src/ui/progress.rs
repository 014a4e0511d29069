use console::style;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::accounts::Account;
use crate::collab::{AcceptStatus, InviteStatus};
use crate::fork::{AccountOutcome, BatchObserver, FailureReason, ForkPath, ForkState};
use crate::tokens::TokenStatus;
use crate::ui::icons::{CHECK, CROSS, FORK, INFO, SYNC, TRASH, WARN};

fn bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{prefix:.bold.dim} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓▒░")
}

/// Terminal UI for account batches, rendered via `indicatif`.
///
/// One bar tracks accounts processed; per-account result lines are printed
/// above it.
pub struct FleetUI {
    multi: MultiProgress,
    bar: ProgressBar,
    verbose: bool,
}

impl FleetUI {
    pub fn new(prefix: &str, total: u64, verbose: bool) -> Self {
        let multi = MultiProgress::new();
        let bar = multi.add(ProgressBar::new(total));
        bar.set_style(bar_style());
        bar.set_prefix(prefix.to_string());
        bar.enable_steady_tick(Duration::from_millis(120));
        Self {
            multi,
            bar,
            verbose,
        }
    }

    /// Print via `MultiProgress`, falling back to `eprintln!`.
    fn print_line(&self, msg: impl AsRef<str>) {
        if self.multi.println(msg.as_ref()).is_err() {
            eprintln!("{}", msg.as_ref());
        }
    }

    fn counter(index: usize, total: usize) -> String {
        style(format!("[{}/{}]", index, total)).dim().to_string()
    }

    pub fn invite_done(&self, index: usize, total: usize, username: &str, status: &InviteStatus) {
        let line = match status {
            InviteStatus::Invited => format!("{}Invited @{}", CHECK, username),
            InviteStatus::AlreadyCollaborator => {
                format!("{}@{} is already a collaborator", WARN, username)
            }
            InviteStatus::Failed(error) => {
                format!("{}@{}: {}", CROSS, username, style(error).red())
            }
        };
        self.print_line(format!("{} {}", Self::counter(index, total), line));
        self.bar.inc(1);
    }

    pub fn accept_done(&self, index: usize, total: usize, username: &str, status: &AcceptStatus) {
        let line = match status {
            AcceptStatus::Accepted => format!("{}@{} accepted", CHECK, username),
            AcceptStatus::AlreadyAccepted => {
                format!("{}@{} already accepted", CHECK, style(username).dim())
            }
            AcceptStatus::NoInvitation => format!("{}@{} has no invitation", INFO, username),
            AcceptStatus::Malformed(error) => format!(
                "{}@{}: unreadable invitation list ({})",
                WARN,
                username,
                style(error).dim()
            ),
            AcceptStatus::Failed(error) => {
                format!("{}@{}: {}", CROSS, username, style(error).red())
            }
        };
        self.print_line(format!("{} {}", Self::counter(index, total), line));
        self.bar.inc(1);
    }

    pub fn token_done(&self, index: usize, status: &TokenStatus) {
        let line = match status {
            TokenStatus::Cached { username } => {
                format!("{}@{} {}", CHECK, username, style("(cached)").dim())
            }
            TokenStatus::Valid { username } => format!("{}@{}", CHECK, username),
            TokenStatus::Invalid { error } => {
                format!("{}token #{} invalid: {}", CROSS, index, style(error).red())
            }
        };
        self.print_line(format!("  {}", line));
        self.bar.inc(1);
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl BatchObserver for FleetUI {
    fn account_started(&self, index: usize, total: usize, account: &Account) {
        self.bar
            .set_message(format!("@{}", style(&account.username).cyan()));
        if self.verbose {
            self.print_line(format!(
                "{} {}",
                Self::counter(index, total),
                style(format!("Processing @{}", account.username)).dim()
            ));
        }
    }

    fn account_finished(&self, index: usize, total: usize, outcome: &AccountOutcome) {
        let icon = match outcome.path {
            Some(ForkPath::Sync) => SYNC,
            Some(ForkPath::Recreate) if outcome.visited(&ForkState::Deleting) => TRASH,
            _ => FORK,
        };
        let line = match outcome.failure() {
            Some(reason) => {
                let reason = match reason {
                    FailureReason::DeletionFailed(_) => {
                        style(reason.to_string()).red().bold().to_string()
                    }
                    _ => style(reason.to_string()).red().to_string(),
                };
                format!("{}{}@{}: {}", CROSS, icon, outcome.username, reason)
            }
            None => {
                let what = match outcome.state() {
                    Some(ForkState::Synced) => "synced",
                    _ => "forked",
                };
                format!("{}{}@{} {} ({})", CHECK, icon, outcome.username, what, outcome.fork)
            }
        };
        self.print_line(format!("{} {}", Self::counter(index, total), line));
        self.bar.inc(1);
    }
}
