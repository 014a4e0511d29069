//! Collaborator bookkeeping flows: inviting accounts to the upstream
//! repository and accepting those invitations on their behalf. Both share
//! the fork lifecycle's checklist pattern: skip what is recorded, record only
//! confirmed success.

mod accept;
mod invite;

pub use accept::{AcceptFlow, AcceptReport, AcceptStatus};
pub use invite::{InviteFlow, InviteReport, InviteStatus};
