//! CLI command implementations.
//!
//! Each submodule owns one or more related `Commands` variants:
//!
//! | Module    | Commands handled       |
//! |-----------|------------------------|
//! | `project` | `Init`, `Status`       |
//! | `config`  | `Config`               |
//! | `tokens`  | `Tokens`               |
//! | `keys`    | `Keys`                 |
//! | `collab`  | `Invite`, `Accept`     |
//! | `fork`    | `Fork`                 |

pub mod collab;
pub mod config;
pub mod fork;
pub mod keys;
pub mod project;
pub mod tokens;

pub use collab::{cmd_accept, cmd_invite};
pub use config::cmd_config;
pub use fork::cmd_fork;
pub use keys::cmd_keys;
pub use project::{cmd_init, cmd_status};
pub use tokens::cmd_tokens;
