//! Third-party API keys kept alongside the fleet, one per line in
//! `.forkfleet/api_keys.txt`.
//!
//! Keys are opaque to forkfleet. The only format rule is that a key is a
//! single word longer than [`MIN_KEY_LEN`] characters.

use std::path::Path;
use tracing::info;

use crate::errors::ConfigError;
use crate::tokens::write_lines;

/// Keys must be strictly longer than this.
pub const MIN_KEY_LEN: usize = 10;
/// How many keys `keys status` previews.
pub const PREVIEW_COUNT: usize = 3;

pub fn is_valid_api_key(key: &str) -> bool {
    key.chars().count() > MIN_KEY_LEN
        && !key.starts_with('#')
        && !key.chars().any(char::is_whitespace)
}

/// Valid keys in `content`, trimmed, first occurrence kept.
pub fn parse_api_keys(content: &str) -> Vec<String> {
    let mut keys: Vec<String> = Vec::new();
    for line in content.lines().map(str::trim) {
        if is_valid_api_key(line) && !keys.iter().any(|k| k == line) {
            keys.push(line.to_string());
        }
    }
    keys
}

pub fn read_api_keys(path: &Path) -> Result<Vec<String>, ConfigError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_api_keys(&content))
}

/// Replace the stored keys with the valid entries of `keys`.
/// `source_name` names the input in the error when nothing is valid.
pub fn save_api_keys(
    keys: &[String],
    dest: &Path,
    source_name: &str,
) -> Result<usize, ConfigError> {
    let valid = parse_api_keys(&keys.join("\n"));
    if valid.is_empty() {
        return Err(ConfigError::NoApiKeys {
            source_name: source_name.to_string(),
        });
    }
    write_lines(dest, &valid)?;
    info!(count = valid.len(), dest = %dest.display(), "Saved API keys");
    Ok(valid.len())
}

/// Import the valid keys of `source` into `dest`.
pub fn import_api_keys(source: &Path, dest: &Path) -> Result<usize, ConfigError> {
    let content = std::fs::read_to_string(source).map_err(|e| ConfigError::Io {
        path: source.to_path_buf(),
        source: e,
    })?;
    let keys: Vec<String> = content.lines().map(str::to_string).collect();
    save_api_keys(&keys, dest, &source.display().to_string())
}

/// `abcdefgh...uvwxyz`. Keys too short to hide a middle keep only a
/// 3-character prefix.
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 14 {
        let head: String = chars.iter().take(3).collect();
        return format!("{}...", head);
    }
    let head: String = chars[..8].iter().collect();
    let tail: String = chars[chars.len() - 6..].iter().collect();
    format!("{}...{}", head, tail)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyStatus {
    pub count: usize,
    /// Masked previews of the first [`PREVIEW_COUNT`] keys.
    pub preview: Vec<String>,
}

/// `None` when the keys file has never been written.
pub fn key_status(path: &Path) -> Result<Option<KeyStatus>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let keys = read_api_keys(path)?;
    Ok(Some(KeyStatus {
        count: keys.len(),
        preview: keys.iter().take(PREVIEW_COUNT).map(|k| mask_key(k)).collect(),
    }))
}
