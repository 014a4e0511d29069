//! Durable checklists of accounts that completed a phase.
//!
//! There is one checklist per phase (invited, accepted, forked). Membership
//! only grows during a run, except for [`ChecklistStore::remove`], which
//! repairs a single stale entry when the remote state no longer matches.
//!
//! | Store                   | Backing                                      |
//! |-------------------------|----------------------------------------------|
//! | `FileChecklistStore`    | one line-per-id file per list, fsync on add   |
//! | `MemoryChecklistStore`  | in-process sets, for tests and dry runs       |

mod file;
mod memory;

pub use file::FileChecklistStore;
pub use memory::MemoryChecklistStore;

use crate::errors::ChecklistError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Checklist {
    Invited,
    Accepted,
    Forked,
}

impl Checklist {
    pub const ALL: [Checklist; 3] = [Checklist::Invited, Checklist::Accepted, Checklist::Forked];

    /// File name of the list inside the state directory.
    pub fn file_name(self) -> &'static str {
        match self {
            Checklist::Invited => "invited.txt",
            Checklist::Accepted => "accepted.txt",
            Checklist::Forked => "forked.txt",
        }
    }
}

impl std::fmt::Display for Checklist {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Checklist::Invited => write!(f, "invited"),
            Checklist::Accepted => write!(f, "accepted"),
            Checklist::Forked => write!(f, "forked"),
        }
    }
}

/// Deduplicated, durable set of account identifiers per [`Checklist`].
///
/// `add` must be durable before it returns. Single-process sequential use
/// only; implementations synchronise internally so they can be shared.
pub trait ChecklistStore: Send + Sync {
    fn contains(&self, list: Checklist, id: &str) -> Result<bool, ChecklistError>;

    /// Append `id`. Adding an existing id is a no-op.
    fn add(&self, list: Checklist, id: &str) -> Result<(), ChecklistError>;

    /// Drop a stale `id`. Removing a missing id is a no-op.
    fn remove(&self, list: Checklist, id: &str) -> Result<(), ChecklistError>;

    /// Members in insertion order.
    fn members(&self, list: Checklist) -> Result<Vec<String>, ChecklistError>;
}
