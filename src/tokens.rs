//! Collaborator token import and validation.

use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::accounts::TokenCache;
use crate::errors::ConfigError;
use crate::gateway::{Operation, RemoteGateway, RetryPolicy, is_valid_github_token};
use crate::poll::Clock;

/// Pause after a cache hit.
pub const CACHE_HIT_DELAY: Duration = Duration::from_millis(100);
/// Pause after a remote check.
pub const REMOTE_CHECK_DELAY: Duration = Duration::from_secs(1);

/// Tokens in `content`: trimmed lines with a GitHub token prefix, first
/// occurrence kept.
pub fn parse_tokens(content: &str) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    for line in content.lines().map(str::trim) {
        if is_valid_github_token(line) && !tokens.iter().any(|t| t == line) {
            tokens.push(line.to_string());
        }
    }
    tokens
}

pub fn read_tokens(path: &Path) -> Result<Vec<String>, ConfigError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_tokens(&content))
}

pub fn write_tokens(path: &Path, tokens: &[String]) -> Result<(), ConfigError> {
    write_lines(path, tokens)
}

/// Replace `path` with one entry per line through a `.tmp` + rename.
pub(crate) fn write_lines(path: &Path, lines: &[String]) -> Result<(), ConfigError> {
    let io_err = |source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(io_err)?;
    }
    let mut content = lines.join("\n");
    if !content.is_empty() {
        content.push('\n');
    }
    let tmp = path.with_extension("txt.tmp");
    std::fs::write(&tmp, content).map_err(io_err)?;
    std::fs::rename(&tmp, path).map_err(io_err)
}

/// Copy the token-looking lines of `source` into `dest`. Returns how many
/// were imported; a file with none is an error.
pub fn import_tokens(source: &Path, dest: &Path) -> Result<usize, ConfigError> {
    let content = std::fs::read_to_string(source).map_err(|e| ConfigError::Io {
        path: source.to_path_buf(),
        source: e,
    })?;
    let tokens = parse_tokens(&content);
    if tokens.is_empty() {
        return Err(ConfigError::NoTokens {
            path: source.to_path_buf(),
        });
    }
    write_tokens(dest, &tokens)?;
    info!(count = tokens.len(), dest = %dest.display(), "Imported tokens");
    Ok(tokens.len())
}

#[derive(Debug, Deserialize)]
struct AuthenticatedUser {
    login: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenStatus {
    Cached { username: String },
    Valid { username: String },
    Invalid { error: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Valid tokens in input order.
    pub valid: Vec<String>,
    pub invalid: usize,
    pub cached: usize,
}

/// Resolves tokens to logins through `GET /user`, consulting the cache
/// first.
pub struct TokenValidator {
    gateway: Arc<dyn RemoteGateway>,
    clock: Arc<dyn Clock>,
}

impl TokenValidator {
    pub fn new(gateway: Arc<dyn RemoteGateway>, clock: Arc<dyn Clock>) -> Self {
        Self { gateway, clock }
    }

    /// Look up the login behind `token`.
    pub async fn login(&self, token: &str) -> Result<String, String> {
        let result = self
            .gateway
            .execute(&Operation::GetAuthenticatedUser, token, RetryPolicy::VALIDATE_TOKEN)
            .await;
        if !result.success {
            return Err(result.error_text().to_string());
        }
        serde_json::from_str::<AuthenticatedUser>(&result.output)
            .map(|user| user.login)
            .map_err(|e| format!("unexpected /user payload: {}", e))
    }

    /// Validate every token, updating `cache` with new logins.
    /// `on_token(index, status)` fires once per token.
    pub async fn validate(
        &self,
        tokens: &[String],
        cache: &mut TokenCache,
        on_token: &mut dyn FnMut(usize, &TokenStatus),
    ) -> ValidationReport {
        let mut report = ValidationReport::default();

        for (i, token) in tokens.iter().enumerate() {
            let status = if let Some(username) = cache.get(token) {
                let username = username.to_string();
                self.clock.sleep(CACHE_HIT_DELAY).await;
                TokenStatus::Cached { username }
            } else {
                let checked = self.login(token).await;
                self.clock.sleep(REMOTE_CHECK_DELAY).await;
                match checked {
                    Ok(username) => {
                        cache.insert(token.clone(), username.clone());
                        TokenStatus::Valid { username }
                    }
                    Err(error) => TokenStatus::Invalid { error },
                }
            };

            match &status {
                TokenStatus::Cached { username } => {
                    debug!(%username, "Token cache hit");
                    report.cached += 1;
                    report.valid.push(token.clone());
                }
                TokenStatus::Valid { username } => {
                    info!(%username, "Token valid");
                    report.valid.push(token.clone());
                }
                TokenStatus::Invalid { error } => {
                    warn!(index = i + 1, %error, "Token invalid");
                    report.invalid += 1;
                }
            }
            on_token(i + 1, &status);
        }

        report
    }
}
