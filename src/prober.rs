//! Read-only probes of a candidate fork's remote state.

use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

use crate::gateway::{Operation, RemoteGateway, RetryPolicy};

/// Subset of GitHub's repository payload the probes need.
#[derive(Debug, Clone, Deserialize)]
pub struct RepoMetadata {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub default_branch: Option<String>,
    #[serde(default)]
    pub parent: Option<ParentRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ParentRef {
    pub full_name: String,
}

/// Derived view of one fork path. Built fresh, never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForkRecord {
    pub path: String,
    pub exists: bool,
    pub parent_full_name: Option<String>,
    pub default_branch: String,
}

impl ForkRecord {
    /// Exists and its declared parent is `upstream` (case-insensitive).
    pub fn is_fork_of(&self, upstream: &str) -> bool {
        self.exists
            && self
                .parent_full_name
                .as_deref()
                .is_some_and(|parent| parent.eq_ignore_ascii_case(upstream))
    }
}

pub struct ForkProber {
    gateway: Arc<dyn RemoteGateway>,
    fallback_branch: String,
}

impl ForkProber {
    pub fn new(gateway: Arc<dyn RemoteGateway>, fallback_branch: impl Into<String>) -> Self {
        Self {
            gateway,
            fallback_branch: fallback_branch.into(),
        }
    }

    async fn fetch(
        &self,
        path: &str,
        credential: &str,
        policy: RetryPolicy,
    ) -> Option<RepoMetadata> {
        let operation = Operation::GetRepository {
            path: path.to_string(),
        };
        let result = self.gateway.execute(&operation, credential, policy).await;
        if !result.success {
            debug!(repo = path, error = result.error_text(), "Repository fetch failed");
            return None;
        }
        match serde_json::from_str(&result.output) {
            Ok(meta) => Some(meta),
            Err(e) => {
                debug!(repo = path, error = %e, "Unreadable repository payload");
                None
            }
        }
    }

    /// Declared parent of `fork_path`; `None` when it cannot be confirmed.
    pub async fn probe_parentage(&self, fork_path: &str, credential: &str) -> Option<String> {
        self.fetch(fork_path, credential, RetryPolicy::PARENTAGE)
            .await
            .and_then(|meta| meta.parent)
            .map(|parent| parent.full_name)
    }

    /// Default branch of `repo_path`, or the configured fallback.
    pub async fn get_default_branch(&self, repo_path: &str, credential: &str) -> String {
        self.fetch(repo_path, credential, RetryPolicy::DEFAULT_BRANCH)
            .await
            .and_then(|meta| meta.default_branch)
            .filter(|branch| !branch.is_empty())
            .unwrap_or_else(|| self.fallback_branch.clone())
    }

    pub async fn is_valid_fork(
        &self,
        fork_path: &str,
        credential: &str,
        expected_parent: &str,
    ) -> bool {
        self.probe_parentage(fork_path, credential)
            .await
            .is_some_and(|parent| parent.eq_ignore_ascii_case(expected_parent))
    }

    /// Single-attempt existence check.
    pub async fn repo_exists(&self, path: &str, credential: &str) -> bool {
        let operation = Operation::GetRepository {
            path: path.to_string(),
        };
        self.gateway
            .execute(&operation, credential, RetryPolicy::EXISTENCE)
            .await
            .success
    }

    /// Single-attempt snapshot of a fork path, used by `status --remote`.
    pub async fn record(&self, path: &str, credential: &str) -> ForkRecord {
        match self.fetch(path, credential, RetryPolicy::EXISTENCE).await {
            Some(meta) => ForkRecord {
                path: path.to_string(),
                exists: true,
                parent_full_name: meta.parent.map(|p| p.full_name),
                default_branch: meta
                    .default_branch
                    .unwrap_or_else(|| self.fallback_branch.clone()),
            },
            None => ForkRecord {
                path: path.to_string(),
                exists: false,
                parent_full_name: None,
                default_branch: self.fallback_branch.clone(),
            },
        }
    }
}
