//! Typed error hierarchy for forkfleet.
//!
//! Three enums cover the places where a failure is not simply a per-account
//! outcome:
//! - `ConfigError`: configuration, tokens and token-cache loading. Fatal,
//!   raised before any remote call is made.
//! - `ChecklistError`: durable checklist persistence.
//! - `FleetError`: whole-batch aborts.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No configuration found at {path}. Run 'forkfleet config init' first")]
    NotConfigured { path: PathBuf },

    #[error("Configuration field '{field}' is empty")]
    MissingField { field: &'static str },

    #[error("Token cache at {path} is empty. Run 'forkfleet tokens validate' first")]
    EmptyTokenCache { path: PathBuf },

    #[error("No GitHub tokens found in {path}")]
    NoTokens { path: PathBuf },

    #[error("No valid API keys found in {source_name}")]
    NoApiKeys { source_name: String },

    #[error("Failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from the durable checklist store.
#[derive(Debug, Error)]
pub enum ChecklistError {
    #[error("Failed to read checklist {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write checklist {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Checklist lock poisoned")]
    LockPoisoned,
}

/// Errors that stop a whole batch.
#[derive(Debug, Error)]
pub enum FleetError {
    #[error("Operation cancelled: destructive mode was not confirmed")]
    ConfirmationDeclined,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Checklist(#[from] ChecklistError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_not_configured_mentions_path() {
        let err = ConfigError::NotConfigured {
            path: PathBuf::from("/p/.forkfleet/fleet.toml"),
        };
        assert!(err.to_string().contains("/p/.forkfleet/fleet.toml"));
        assert!(err.to_string().contains("config init"));
    }

    #[test]
    fn config_error_missing_field_names_field() {
        let err = ConfigError::MissingField {
            field: "upstream.token",
        };
        assert!(err.to_string().contains("upstream.token"));
    }

    #[test]
    fn checklist_error_write_carries_path() {
        let err = ChecklistError::Write {
            path: PathBuf::from("state/forked.txt"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        match &err {
            ChecklistError::Write { path, source } => {
                assert_eq!(path, &PathBuf::from("state/forked.txt"));
                assert_eq!(source.kind(), std::io::ErrorKind::PermissionDenied);
            }
            _ => panic!("Expected Write variant"),
        }
    }

    #[test]
    fn fleet_error_converts_from_checklist_error() {
        let inner = ChecklistError::LockPoisoned;
        let err: FleetError = inner.into();
        assert!(matches!(err, FleetError::Checklist(ChecklistError::LockPoisoned)));
    }

    #[test]
    fn confirmation_declined_is_distinct() {
        let err = FleetError::ConfirmationDeclined;
        assert!(matches!(err, FleetError::ConfirmationDeclined));
        assert!(err.to_string().contains("cancelled"));
    }

    #[test]
    fn all_error_types_implement_std_error_trait() {
        fn assert_std_error<E: std::error::Error>(_: &E) {}
        assert_std_error(&ConfigError::MissingField { field: "x" });
        assert_std_error(&ChecklistError::LockPoisoned);
        assert_std_error(&FleetError::ConfirmationDeclined);
    }
}
