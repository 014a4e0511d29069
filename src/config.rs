use std::path::{Path, PathBuf};

use crate::accounts::{AccountSet, TokenCache};
use crate::errors::ConfigError;
use crate::fleet_config::{CONFIG_FILE, FleetToml};
use crate::init::get_fleet_dir;

/// Upstream repository coordinates plus the main account credential.
#[derive(Debug, Clone)]
pub struct Upstream {
    pub owner: String,
    pub repo: String,
    pub token: String,
}

impl Upstream {
    /// `owner/repo` of the main repository.
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }

    /// Where `username`'s fork of the upstream lives.
    pub fn fork_path(&self, username: &str) -> String {
        format!("{}/{}", username, self.repo)
    }
}

/// Runtime configuration: resolved paths plus the parsed fleet.toml.
#[derive(Debug, Clone)]
pub struct Config {
    pub project_dir: PathBuf,
    pub fleet_dir: PathBuf,
    pub config_file: PathBuf,
    pub tokens_file: PathBuf,
    pub token_cache_file: PathBuf,
    pub api_keys_file: PathBuf,
    pub state_dir: PathBuf,
    pub log_dir: PathBuf,
    pub failure_log: PathBuf,
    pub lock_file: PathBuf,
    pub verbose: bool,
    pub toml: FleetToml,
}

impl Config {
    pub fn new(project_dir: &Path, verbose: bool) -> Result<Self, ConfigError> {
        let fleet_dir = get_fleet_dir(project_dir);
        let toml = FleetToml::load_or_default(&fleet_dir)?;
        Ok(Self::with_toml(project_dir, verbose, toml))
    }

    pub fn with_toml(project_dir: &Path, verbose: bool, toml: FleetToml) -> Self {
        let fleet_dir = get_fleet_dir(project_dir);
        let log_dir = fleet_dir.join("logs");
        Self {
            project_dir: project_dir.to_path_buf(),
            config_file: fleet_dir.join(CONFIG_FILE),
            tokens_file: fleet_dir.join("tokens.txt"),
            token_cache_file: fleet_dir.join("token_cache.json"),
            api_keys_file: fleet_dir.join("api_keys.txt"),
            state_dir: fleet_dir.join("state"),
            failure_log: log_dir.join("failures.log"),
            lock_file: fleet_dir.join("run.lock"),
            log_dir,
            fleet_dir,
            verbose,
            toml,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.config_file.exists()
    }

    /// Resolve the upstream, failing if anything required is missing.
    pub fn upstream(&self) -> Result<Upstream, ConfigError> {
        if !self.is_configured() && self.toml.upstream.owner.is_empty() {
            return Err(ConfigError::NotConfigured {
                path: self.config_file.clone(),
            });
        }
        let owner = self.toml.upstream.owner.trim();
        if owner.is_empty() {
            return Err(ConfigError::MissingField {
                field: "upstream.owner",
            });
        }
        let repo = self.toml.upstream.repo.trim();
        if repo.is_empty() {
            return Err(ConfigError::MissingField {
                field: "upstream.repo",
            });
        }
        let token = self.toml.main_token().ok_or(ConfigError::MissingField {
            field: "upstream.token",
        })?;
        Ok(Upstream {
            owner: owner.to_string(),
            repo: repo.to_string(),
            token,
        })
    }

    /// Load the token cache, treating a missing or empty cache as fatal.
    pub fn require_token_cache(&self) -> Result<TokenCache, ConfigError> {
        let cache = TokenCache::load(&self.token_cache_file)?;
        if cache.is_empty() {
            return Err(ConfigError::EmptyTokenCache {
                path: self.token_cache_file.clone(),
            });
        }
        Ok(cache)
    }

    /// Everything a batch needs before the first remote call.
    pub fn load_accounts(&self) -> Result<(Upstream, AccountSet), ConfigError> {
        let upstream = self.upstream()?;
        let cache = self.require_token_cache()?;
        let accounts = AccountSet::from_cache(&upstream.owner, &upstream.token, &cache);
        Ok((upstream, accounts))
    }

    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        for dir in [&self.fleet_dir, &self.state_dir, &self.log_dir] {
            std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        Ok(())
    }
}
