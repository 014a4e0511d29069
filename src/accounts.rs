//! Accounts taking part in a run and the token cache they come from.
//!
//! The token cache is a JSON object mapping each validated token to the login
//! it authenticates as. It is written with the `.tmp` + rename pattern so a
//! crash never leaves a truncated cache behind.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::errors::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Owns the upstream repository; never a fork target.
    Main,
    Collaborator,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub username: String,
    pub token: String,
    pub role: Role,
}

impl Account {
    pub fn collaborator(username: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            token: token.into(),
            role: Role::Collaborator,
        }
    }

    pub fn main(username: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            token: token.into(),
            role: Role::Main,
        }
    }

    pub fn is_main(&self) -> bool {
        self.role == Role::Main
    }
}

/// Validated `token -> username` map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenCache {
    entries: BTreeMap<String, String>,
}

impl TokenCache {
    /// Load the cache, returning an empty one if the file does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Save atomically: write `<path>.tmp`, then rename over `<path>`.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(&self.entries).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(io_err)?;
        std::fs::rename(&tmp, path).map_err(io_err)?;
        Ok(())
    }

    pub fn get(&self, token: &str) -> Option<&str> {
        self.entries.get(token).map(String::as_str)
    }

    pub fn insert(&mut self, token: impl Into<String>, username: impl Into<String>) {
        self.entries.insert(token.into(), username.into());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `(token, username)` pairs in token order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(t, u)| (t.as_str(), u.as_str()))
    }
}

/// The main account plus every collaborator account of a run.
///
/// Exactly one account has [`Role::Main`]. Collaborators are unique by
/// username and iterate in username order.
#[derive(Debug, Clone)]
pub struct AccountSet {
    main: Account,
    collaborators: Vec<Account>,
}

impl AccountSet {
    pub fn new(main: Account, collaborators: impl IntoIterator<Item = Account>) -> Self {
        let mut by_name: BTreeMap<String, Account> = BTreeMap::new();
        for account in collaborators {
            if account.username.eq_ignore_ascii_case(&main.username) {
                continue;
            }
            by_name.insert(
                account.username.clone(),
                Account {
                    role: Role::Collaborator,
                    ..account
                },
            );
        }
        Self {
            main: Account {
                role: Role::Main,
                ..main
            },
            collaborators: by_name.into_values().collect(),
        }
    }

    /// Build from the token cache; tokens that authenticate as the main user
    /// are dropped, duplicate usernames keep the last token in cache order.
    pub fn from_cache(main_username: &str, main_token: &str, cache: &TokenCache) -> Self {
        let collaborators = cache
            .iter()
            .map(|(token, username)| Account::collaborator(username, token));
        Self::new(Account::main(main_username, main_token), collaborators)
    }

    pub fn main(&self) -> &Account {
        &self.main
    }

    pub fn collaborators(&self) -> impl Iterator<Item = &Account> {
        self.collaborators.iter()
    }

    pub fn collaborator_count(&self) -> usize {
        self.collaborators.len()
    }

    /// Every account, main first.
    pub fn all(&self) -> impl Iterator<Item = &Account> {
        std::iter::once(&self.main).chain(self.collaborators.iter())
    }
}
