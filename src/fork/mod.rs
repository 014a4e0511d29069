//! Fork lifecycle: per-account state machine and the batch runner on top.
//!
//! - [`ForkController`] decides and executes delete / create / poll /
//!   disable / sync for a single account.
//! - [`BatchOrchestrator`] walks the account set sequentially under a
//!   pre-resolved [`ForkMode`], pacing between accounts.

mod controller;
mod mode;
mod orchestrator;
mod state;

pub use controller::ForkController;
pub use mode::{DeletionConsent, ForkMode, ModeChoice};
pub use orchestrator::{BatchObserver, BatchOrchestrator, BatchReport, SilentObserver};
pub use state::{AccountOutcome, FailureReason, ForkPath, ForkState};
