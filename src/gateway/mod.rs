//! Remote API gateway.
//!
//! The orchestration core only sees [`RemoteGateway`]: execute one
//! [`Operation`] with an account credential under a [`RetryPolicy`], get back
//! a uniform [`OperationResult`]. Transient failures are retried inside the
//! gateway; terminal responses such as 404 come back immediately as
//! `success = false`.
//!
//! Real implementation: [`GitHubGateway`]. Test double: `MockGateway`.

mod github;
mod operation;

pub use github::{GitHubGateway, is_valid_github_token};
pub use operation::{Method, Operation, OperationKind};

use async_trait::async_trait;
use std::time::Duration;

/// Uniform outcome of a gateway call.
///
/// `error` carries the remote's free-text message on failure; callers match
/// on it through [`crate::classify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationResult {
    pub success: bool,
    pub output: String,
    pub error: Option<String>,
}

impl OperationResult {
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: String::new(),
            error: Some(error.into()),
        }
    }

    /// Error text, or an empty string.
    pub fn error_text(&self) -> &str {
        self.error.as_deref().unwrap_or("")
    }
}

/// Attempt budget and per-request timeout for one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one; 0 is treated as 1.
    pub max_retries: u32,
    pub timeout: Duration,
}

impl RetryPolicy {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    pub const fn new(max_retries: u32, timeout: Duration) -> Self {
        Self {
            max_retries,
            timeout,
        }
    }

    pub const fn attempts(max_retries: u32) -> Self {
        Self::new(max_retries, Self::DEFAULT_TIMEOUT)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries.max(1)
    }

    /// Parentage probe of a candidate fork.
    pub const PARENTAGE: RetryPolicy = RetryPolicy::attempts(2);
    /// Default-branch lookup; a wrong guess is tolerated.
    pub const DEFAULT_BRANCH: RetryPolicy = RetryPolicy::attempts(1);
    /// Existence probe (destructive pre-check and readiness polling).
    pub const EXISTENCE: RetryPolicy = RetryPolicy::attempts(1);
    pub const DELETE: RetryPolicy = RetryPolicy::new(2, Duration::from_secs(60));
    pub const CREATE_FORK: RetryPolicy = RetryPolicy::attempts(1);
    pub const MERGE_UPSTREAM: RetryPolicy = RetryPolicy::attempts(2);
    pub const DISABLE_WORKFLOW: RetryPolicy = RetryPolicy::attempts(1);
    pub const VALIDATE_TOKEN: RetryPolicy = RetryPolicy::attempts(2);
    pub const INVITE: RetryPolicy = RetryPolicy::attempts(3);
    pub const LIST_INVITATIONS: RetryPolicy = RetryPolicy::attempts(3);
    pub const ACCEPT: RetryPolicy = RetryPolicy::attempts(3);
}

/// Executes named remote operations on behalf of an account.
#[async_trait]
pub trait RemoteGateway: Send + Sync {
    async fn execute(
        &self,
        operation: &Operation,
        credential: &str,
        policy: RetryPolicy,
    ) -> OperationResult;
}
