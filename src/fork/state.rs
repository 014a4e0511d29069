use std::fmt;
use std::time::Duration;
use tracing::error;

/// Lifecycle state of one account's fork during a run.
///
/// Create path: `Absent -> Creating -> Pending -> Ready -> AutomationDisabled`.
/// Sync path: `Ready -> AutomationDisabled -> Synced`.
/// Destructive mode may enter `Deleting` before `Absent`. `Failed` absorbs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForkState {
    Absent,
    Deleting,
    Creating,
    Pending,
    Ready,
    AutomationDisabled,
    Synced,
    Failed(FailureReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    DeletionFailed(String),
    CreationFailed(String),
    ReadinessTimeout { waited: Duration, attempts: u32 },
    SyncFailed(String),
    Checklist(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::DeletionFailed(e) => write!(f, "deletion failed: {}", e),
            FailureReason::CreationFailed(e) => write!(f, "fork creation failed: {}", e),
            FailureReason::ReadinessTimeout { waited, attempts } => write!(
                f,
                "fork was not ready after {}s ({} checks)",
                waited.as_secs(),
                attempts
            ),
            FailureReason::SyncFailed(e) => write!(f, "sync failed: {}", e),
            FailureReason::Checklist(e) => write!(f, "checklist update failed: {}", e),
        }
    }
}

impl ForkState {
    pub fn name(&self) -> &'static str {
        match self {
            ForkState::Absent => "absent",
            ForkState::Deleting => "deleting",
            ForkState::Creating => "creating",
            ForkState::Pending => "pending",
            ForkState::Ready => "ready",
            ForkState::AutomationDisabled => "automation-disabled",
            ForkState::Synced => "synced",
            ForkState::Failed(_) => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ForkState::Synced | ForkState::Failed(_))
    }

    /// Whether a run may end in this state and count as a success.
    pub fn is_success(&self) -> bool {
        matches!(self, ForkState::AutomationDisabled | ForkState::Synced)
    }

    pub fn can_transition_to(&self, next: &ForkState) -> bool {
        use ForkState::*;
        if self.is_terminal() {
            return false;
        }
        if matches!(next, Failed(_)) {
            return true;
        }
        matches!(
            (self, next),
            (Absent, Deleting)
                | (Absent, Creating)
                | (Deleting, Absent)
                | (Creating, Pending)
                | (Pending, Ready)
                | (Ready, AutomationDisabled)
                | (AutomationDisabled, Synced)
        )
    }
}

impl fmt::Display for ForkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForkState::Failed(reason) => write!(f, "failed ({})", reason),
            other => f.write_str(other.name()),
        }
    }
}

/// Which branch the controller took for an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForkPath {
    Sync,
    Create,
    Recreate,
}

/// Per-account result: every state entered, in order.
#[derive(Debug, Clone)]
pub struct AccountOutcome {
    pub username: String,
    pub fork: String,
    pub path: Option<ForkPath>,
    trail: Vec<ForkState>,
}

impl AccountOutcome {
    pub fn new(username: impl Into<String>, fork: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            fork: fork.into(),
            path: None,
            trail: Vec::new(),
        }
    }

    /// Enter `next`. The first state may be `Absent`, `Ready` or
    /// `Deleting`; after that only legal transitions are recorded.
    pub fn advance(&mut self, next: ForkState) {
        let legal = match self.trail.last() {
            None => matches!(
                next,
                ForkState::Absent | ForkState::Ready | ForkState::Deleting | ForkState::Failed(_)
            ),
            Some(current) => current.can_transition_to(&next),
        };
        if !legal {
            error!(
                account = %self.username,
                from = self.state().map(ForkState::name).unwrap_or("start"),
                to = next.name(),
                "Illegal fork state transition ignored"
            );
            return;
        }
        self.trail.push(next);
    }

    pub fn fail(&mut self, reason: FailureReason) {
        self.advance(ForkState::Failed(reason));
    }

    pub fn state(&self) -> Option<&ForkState> {
        self.trail.last()
    }

    pub fn trail(&self) -> &[ForkState] {
        &self.trail
    }

    pub fn is_success(&self) -> bool {
        self.state().is_some_and(ForkState::is_success)
    }

    pub fn failure(&self) -> Option<&FailureReason> {
        match self.state() {
            Some(ForkState::Failed(reason)) => Some(reason),
            _ => None,
        }
    }

    pub fn visited(&self, state: &ForkState) -> bool {
        self.trail.iter().any(|s| s == state)
    }
}
