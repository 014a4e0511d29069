//! Configuration file support for forkfleet.
//!
//! Settings live in `.forkfleet/fleet.toml`. Every field has a default so a
//! partial file is valid. Values are layered file → environment → CLI.
//!
//! # Configuration File Format
//!
//! ```toml
//! [upstream]
//! owner = "main-account"
//! repo = "project"
//! token = "ghp_..."
//!
//! [fork]
//! workflow = "datagram-runner.yml"
//! fallback_branch = "main"
//! poll_interval_secs = 5
//! poll_timeout_secs = 120
//!
//! [pacing]
//! account_delay_secs = 2
//! step_delay_secs = 1
//! deletion_settle_secs = 5
//!
//! [gateway]
//! api_url = "https://api.github.com"
//! request_timeout_secs = 30
//! backoff_base_ms = 1000
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::errors::ConfigError;

/// Environment variable overriding `upstream.token`.
pub const MAIN_TOKEN_ENV: &str = "FORKFLEET_MAIN_TOKEN";

/// Environment variable overriding `gateway.api_url`.
pub const API_URL_ENV: &str = "FORKFLEET_API_URL";

/// Name of the configuration file inside the state directory.
pub const CONFIG_FILE: &str = "fleet.toml";

/// The main account and repository every fork is created from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpstreamSection {
    /// Username of the main account
    #[serde(default)]
    pub owner: String,
    /// Name of the main repository
    #[serde(default)]
    pub repo: String,
    /// Token of the main account
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// Fork lifecycle tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForkSection {
    /// Automation workflow disabled on every fork
    #[serde(default = "default_workflow")]
    pub workflow: String,
    /// Branch assumed when the default branch cannot be fetched
    #[serde(default = "default_fallback_branch")]
    pub fallback_branch: String,
    /// Seconds between readiness probes after fork creation
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Upper bound on the readiness wait
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,
}

fn default_workflow() -> String {
    "datagram-runner.yml".to_string()
}

fn default_fallback_branch() -> String {
    "main".to_string()
}

fn default_poll_interval_secs() -> u64 {
    5
}

fn default_poll_timeout_secs() -> u64 {
    120
}

impl Default for ForkSection {
    fn default() -> Self {
        Self {
            workflow: default_workflow(),
            fallback_branch: default_fallback_branch(),
            poll_interval_secs: default_poll_interval_secs(),
            poll_timeout_secs: default_poll_timeout_secs(),
        }
    }
}

/// Delays that keep the run under the remote rate limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacingSection {
    #[serde(default = "default_account_delay_secs")]
    pub account_delay_secs: u64,
    #[serde(default = "default_step_delay_secs")]
    pub step_delay_secs: u64,
    /// Wait after a confirmed deletion before re-creating the fork
    #[serde(default = "default_deletion_settle_secs")]
    pub deletion_settle_secs: u64,
}

fn default_account_delay_secs() -> u64 {
    2
}

fn default_step_delay_secs() -> u64 {
    1
}

fn default_deletion_settle_secs() -> u64 {
    5
}

impl Default for PacingSection {
    fn default() -> Self {
        Self {
            account_delay_secs: default_account_delay_secs(),
            step_delay_secs: default_step_delay_secs(),
            deletion_settle_secs: default_deletion_settle_secs(),
        }
    }
}

/// Remote API transport settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewaySection {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// First backoff step between retries; doubled on every further attempt
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_backoff_base_ms() -> u64 {
    1000
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            request_timeout_secs: default_request_timeout_secs(),
            backoff_base_ms: default_backoff_base_ms(),
        }
    }
}

/// The complete fleet.toml structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FleetToml {
    #[serde(default)]
    pub upstream: UpstreamSection,
    #[serde(default)]
    pub fork: ForkSection,
    #[serde(default)]
    pub pacing: PacingSection,
    #[serde(default)]
    pub gateway: GatewaySection,
}

impl FleetToml {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content).map_err(|e| match e {
            ConfigError::Parse { message, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: CONFIG_FILE.into(),
            message: e.to_string(),
        })
    }

    /// Load from `<fleet_dir>/fleet.toml`, or defaults when the file is absent.
    pub fn load_or_default(fleet_dir: &Path) -> Result<Self, ConfigError> {
        let path = fleet_dir.join(CONFIG_FILE);
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Main account token, environment first.
    pub fn main_token(&self) -> Option<String> {
        std::env::var(MAIN_TOKEN_ENV)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| self.upstream.token.clone())
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
    }

    /// API base URL, environment first.
    pub fn api_url(&self) -> String {
        std::env::var(API_URL_ENV)
            .ok()
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| self.gateway.api_url.clone())
    }

    pub fn fork_settings(&self) -> ForkSettings {
        ForkSettings {
            workflow: self.fork.workflow.clone(),
            fallback_branch: self.fork.fallback_branch.clone(),
            poll_interval: Duration::from_secs(self.fork.poll_interval_secs),
            poll_timeout: Duration::from_secs(self.fork.poll_timeout_secs),
            step_delay: Duration::from_secs(self.pacing.step_delay_secs),
            deletion_settle: Duration::from_secs(self.pacing.deletion_settle_secs),
        }
    }

    pub fn account_delay(&self) -> Duration {
        Duration::from_secs(self.pacing.account_delay_secs)
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.upstream.owner.trim().is_empty() {
            warnings.push("upstream.owner is empty".to_string());
        }
        if self.upstream.repo.trim().is_empty() {
            warnings.push("upstream.repo is empty".to_string());
        }
        if self.upstream.repo.contains('/') {
            warnings.push(format!(
                "upstream.repo '{}' should be a bare repository name, not owner/repo",
                self.upstream.repo
            ));
        }
        if self.main_token().is_none() {
            warnings.push(format!(
                "No main account token: set upstream.token or {}",
                MAIN_TOKEN_ENV
            ));
        }
        if self.fork.poll_interval_secs == 0 {
            warnings.push("fork.poll_interval_secs must be greater than 0".to_string());
        }
        if self.fork.poll_timeout_secs < self.fork.poll_interval_secs {
            warnings.push(format!(
                "fork.poll_timeout_secs ({}) is shorter than fork.poll_interval_secs ({})",
                self.fork.poll_timeout_secs, self.fork.poll_interval_secs
            ));
        }
        if self.fork.workflow.trim().is_empty() {
            warnings.push("fork.workflow is empty; no workflow will be disabled".to_string());
        }
        if !self.gateway.api_url.starts_with("http://")
            && !self.gateway.api_url.starts_with("https://")
        {
            warnings.push(format!(
                "gateway.api_url '{}' is not an http(s) URL",
                self.gateway.api_url
            ));
        }

        warnings
    }
}

/// Resolved per-account lifecycle settings.
#[derive(Debug, Clone)]
pub struct ForkSettings {
    pub workflow: String,
    pub fallback_branch: String,
    pub poll_interval: Duration,
    pub poll_timeout: Duration,
    pub step_delay: Duration,
    pub deletion_settle: Duration,
}

impl Default for ForkSettings {
    fn default() -> Self {
        FleetToml::default().fork_settings()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_match_documented_values() {
        let toml = FleetToml::default();
        assert_eq!(toml.fork.workflow, "datagram-runner.yml");
        assert_eq!(toml.fork.fallback_branch, "main");
        assert_eq!(toml.fork.poll_interval_secs, 5);
        assert_eq!(toml.fork.poll_timeout_secs, 120);
        assert_eq!(toml.pacing.account_delay_secs, 2);
        assert_eq!(toml.pacing.step_delay_secs, 1);
        assert_eq!(toml.pacing.deletion_settle_secs, 5);
        assert_eq!(toml.gateway.api_url, "https://api.github.com");
    }

    #[test]
    fn test_parse_partial_file_fills_defaults() {
        let toml = FleetToml::parse(
            r#"
            [upstream]
            owner = "main"
            repo = "project"

            [fork]
            poll_timeout_secs = 60
            "#,
        )
        .unwrap();
        assert_eq!(toml.upstream.owner, "main");
        assert_eq!(toml.upstream.repo, "project");
        assert!(toml.upstream.token.is_none());
        assert_eq!(toml.fork.poll_timeout_secs, 60);
        assert_eq!(toml.fork.poll_interval_secs, 5);
        assert_eq!(toml.pacing.account_delay_secs, 2);
    }

    #[test]
    fn test_parse_invalid_toml_is_error() {
        let result = FleetToml::parse("[upstream\nowner = ");
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        let mut toml = FleetToml::default();
        toml.upstream.owner = "main".into();
        toml.upstream.repo = "project".into();
        toml.upstream.token = Some("ghp_saved".into());
        toml.save(&path).unwrap();

        let loaded = FleetToml::load(&path).unwrap();
        assert_eq!(loaded.upstream.owner, "main");
        assert_eq!(loaded.upstream.token.as_deref(), Some("ghp_saved"));
    }

    #[test]
    fn test_load_or_default_without_file() {
        let dir = tempdir().unwrap();
        let toml = FleetToml::load_or_default(dir.path()).unwrap();
        assert!(toml.upstream.owner.is_empty());
    }

    #[test]
    fn test_fork_settings_durations() {
        let settings = FleetToml::default().fork_settings();
        assert_eq!(settings.poll_interval, Duration::from_secs(5));
        assert_eq!(settings.poll_timeout, Duration::from_secs(120));
        assert_eq!(settings.step_delay, Duration::from_secs(1));
        assert_eq!(settings.deletion_settle, Duration::from_secs(5));
    }

    #[test]
    fn test_validate_flags_empty_upstream() {
        let mut toml = FleetToml::default();
        toml.upstream.token = Some("ghp_x".into());
        let warnings = toml.validate();
        assert!(warnings.iter().any(|w| w.contains("upstream.owner")));
        assert!(warnings.iter().any(|w| w.contains("upstream.repo")));
    }

    #[test]
    fn test_validate_flags_slash_in_repo_and_bad_poll() {
        let mut toml = FleetToml::default();
        toml.upstream.owner = "main".into();
        toml.upstream.repo = "main/project".into();
        toml.upstream.token = Some("ghp_x".into());
        toml.fork.poll_interval_secs = 0;
        let warnings = toml.validate();
        assert!(warnings.iter().any(|w| w.contains("bare repository name")));
        assert!(warnings.iter().any(|w| w.contains("poll_interval_secs")));
    }

    #[test]
    fn test_validate_clean_config_has_no_warnings() {
        let mut toml = FleetToml::default();
        toml.upstream.owner = "main".into();
        toml.upstream.repo = "project".into();
        toml.upstream.token = Some("ghp_x".into());
        assert!(toml.validate().is_empty());
    }
}
