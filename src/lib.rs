pub mod accounts;
pub mod api_keys;
pub mod checklist;
pub mod classify;
pub mod collab;
pub mod config;
pub mod errors;
pub mod failure_log;
pub mod fleet;
pub mod fleet_config;
pub mod fork;
pub mod gateway;
pub mod init;
pub mod poll;
pub mod prober;
pub mod telemetry;
pub mod tokens;
pub mod ui;

#[cfg(test)]
pub(crate) mod test_support;
