use anyhow::Context;
use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;
use tracing::{debug, warn};

use super::{Method, Operation, OperationResult, RemoteGateway, RetryPolicy};
use crate::fleet_config::FleetToml;

const USER_AGENT: &str = concat!("forkfleet/", env!("CARGO_PKG_VERSION"));
const GITHUB_API_VERSION: &str = "2022-11-28";
const MAX_BACKOFF: Duration = Duration::from_secs(30);
const MAX_RETRY_AFTER: Duration = Duration::from_secs(60);

/// Known GitHub token prefixes.
/// See: https://github.blog/2021-04-05-behind-githubs-new-authentication-token-formats/
const GITHUB_TOKEN_PREFIXES: &[&str] = &[
    "ghp_",        // Personal access tokens (classic)
    "github_pat_", // Fine-grained personal access tokens
    "gho_",        // OAuth access tokens
    "ghu_",        // GitHub App user-to-server tokens
    "ghs_",        // GitHub App server-to-server tokens
    "ghr_",        // GitHub App refresh tokens
];

/// Validate that a string looks like a GitHub token based on its prefix.
///
/// Format check only; whether the token is active is decided by
/// `GET /user` during `tokens validate`.
pub fn is_valid_github_token(token: &str) -> bool {
    if token.is_empty() {
        return false;
    }
    GITHUB_TOKEN_PREFIXES
        .iter()
        .any(|prefix| token.starts_with(prefix))
}

/// [`RemoteGateway`] over the GitHub REST API.
pub struct GitHubGateway {
    client: reqwest::Client,
    api_url: String,
    backoff_base: Duration,
    request_timeout: Duration,
}

/// Result of a single HTTP attempt.
enum Attempt {
    Done(OperationResult),
    Transient {
        error: String,
        retry_after: Option<Duration>,
    },
}

impl GitHubGateway {
    pub fn new(api_url: impl Into<String>, backoff_base: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            backoff_base,
            request_timeout: RetryPolicy::DEFAULT_TIMEOUT,
        })
    }

    /// Gateway configured from `[gateway]`, honouring `FORKFLEET_API_URL`.
    pub fn from_toml(toml: &FleetToml) -> anyhow::Result<Self> {
        let mut gateway = Self::new(
            toml.api_url(),
            Duration::from_millis(toml.gateway.backoff_base_ms),
        )?;
        gateway.request_timeout = Duration::from_secs(toml.gateway.request_timeout_secs.max(1));
        Ok(gateway)
    }

    /// Policies on the default timeout use the configured request timeout;
    /// explicit ones (deletion) keep their own.
    fn timeout_for(&self, policy: RetryPolicy) -> Duration {
        if policy.timeout == RetryPolicy::DEFAULT_TIMEOUT {
            self.request_timeout
        } else {
            policy.timeout
        }
    }

    fn url(&self, operation: &Operation) -> String {
        format!("{}/{}", self.api_url, operation.path())
    }

    /// Delay before attempt `attempt + 1`.
    fn backoff(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        if let Some(wait) = retry_after {
            return wait.min(MAX_RETRY_AFTER);
        }
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.backoff_base.saturating_mul(factor).min(MAX_BACKOFF)
    }

    async fn attempt(&self, operation: &Operation, credential: &str, timeout: Duration) -> Attempt {
        let method = match operation.method() {
            Method::Get => reqwest::Method::GET,
            Method::Put => reqwest::Method::PUT,
            Method::Post => reqwest::Method::POST,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut request = self
            .client
            .request(method, self.url(operation))
            .bearer_auth(credential)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", GITHUB_API_VERSION)
            .timeout(timeout);
        if let Some(body) = operation.body() {
            request = request.json(&body);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                return Attempt::Transient {
                    error: format!("Request failed: {}", e),
                    retry_after: None,
                };
            }
        };

        let status = response.status();
        let retry_after = header_value(&response, "retry-after")
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs);
        let rate_limited = status == StatusCode::FORBIDDEN
            && header_value(&response, "x-ratelimit-remaining").as_deref() == Some("0");

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return Attempt::Transient {
                    error: format!("Failed to read response body: {}", e),
                    retry_after: None,
                };
            }
        };

        if status.is_success() {
            return Attempt::Done(OperationResult::ok(body));
        }

        let error = describe_error(status.as_u16(), &body);
        if is_transient(status, rate_limited) {
            Attempt::Transient { error, retry_after }
        } else {
            Attempt::Done(OperationResult {
                success: false,
                output: body,
                error: Some(error),
            })
        }
    }
}

#[async_trait]
impl RemoteGateway for GitHubGateway {
    async fn execute(
        &self,
        operation: &Operation,
        credential: &str,
        policy: RetryPolicy,
    ) -> OperationResult {
        let attempts = policy.max_attempts();
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            debug!(%operation, attempt, attempts, "Executing remote operation");
            match self.attempt(operation, credential, self.timeout_for(policy)).await {
                Attempt::Done(result) => return result,
                Attempt::Transient { error, retry_after } => {
                    warn!(
                        %operation,
                        attempt,
                        attempts,
                        error = %error,
                        "Transient remote failure"
                    );
                    last_error = error;
                    if attempt < attempts {
                        tokio::time::sleep(self.backoff(attempt, retry_after)).await;
                    }
                }
            }
        }

        OperationResult::failed(last_error)
    }
}

fn header_value(response: &reqwest::Response, name: &str) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
}

/// 5xx, 429, and rate-limited 403s are worth another attempt.
fn is_transient(status: StatusCode, rate_limited: bool) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS || rate_limited
}

/// Build `"HTTP <status>: <message>[: <detail>...]"` from a GitHub error body.
///
/// GitHub reports validation problems as
/// `{"message": "Validation Failed", "errors": [{"message": "..."}]}`; the
/// nested messages are where idempotent conditions such as
/// "forks must have unique names" show up, so they are kept.
pub(crate) fn describe_error(status: u16, body: &str) -> String {
    let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
    let Some(value) = parsed.filter(|v| v.is_object()) else {
        let trimmed = body.trim();
        return if trimmed.is_empty() {
            format!("HTTP {}", status)
        } else {
            format!("HTTP {}: {}", status, trimmed)
        };
    };

    let mut parts: Vec<String> = Vec::new();
    if let Some(message) = value.get("message").and_then(|m| m.as_str()) {
        parts.push(message.to_string());
    }
    if let Some(errors) = value.get("errors").and_then(|e| e.as_array()) {
        for entry in errors {
            let detail = entry
                .as_str()
                .map(str::to_string)
                .or_else(|| {
                    entry
                        .get("message")
                        .and_then(|m| m.as_str())
                        .map(str::to_string)
                })
                .or_else(|| entry.get("code").and_then(|c| c.as_str()).map(str::to_string));
            if let Some(detail) = detail {
                parts.push(detail);
            }
        }
    }

    if parts.is_empty() {
        format!("HTTP {}: {}", status, body.trim())
    } else {
        format!("HTTP {}: {}", status, parts.join(": "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::http::{HeaderMap, StatusCode as AxumStatus};
    use axum::routing::{get, post};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn gateway(url: &str) -> GitHubGateway {
        GitHubGateway::new(url, Duration::from_millis(1)).unwrap()
    }

    // ── is_valid_github_token ────────────────────────────────────────

    #[test]
    fn test_valid_personal_access_token_classic() {
        assert!(is_valid_github_token("ghp_abc123def456"));
    }

    #[test]
    fn test_valid_fine_grained_pat() {
        assert!(is_valid_github_token("github_pat_abc123def456"));
    }

    #[test]
    fn test_empty_token_is_invalid() {
        assert!(!is_valid_github_token(""));
    }

    #[test]
    fn test_random_string_is_invalid() {
        assert!(!is_valid_github_token("not-a-token"));
    }

    #[test]
    fn test_uppercase_prefix_is_invalid() {
        assert!(!is_valid_github_token("GHP_abc123"));
    }

    #[test]
    fn test_token_with_leading_space_is_invalid() {
        assert!(!is_valid_github_token(" ghp_abc123"));
    }

    // ── describe_error ───────────────────────────────────────────────

    #[test]
    fn test_describe_error_with_nested_messages() {
        let body = r#"{"message":"Validation Failed","errors":[{"resource":"Repository","code":"custom","message":"forks must have unique names"}]}"#;
        assert_eq!(
            describe_error(422, body),
            "HTTP 422: Validation Failed: forks must have unique names"
        );
    }

    #[test]
    fn test_describe_error_with_string_errors() {
        let body = r#"{"message":"Validation Failed","errors":["already a collaborator"]}"#;
        assert_eq!(
            describe_error(422, body),
            "HTTP 422: Validation Failed: already a collaborator"
        );
    }

    #[test]
    fn test_describe_error_plain_message() {
        assert_eq!(
            describe_error(404, r#"{"message":"Not Found"}"#),
            "HTTP 404: Not Found"
        );
    }

    #[test]
    fn test_describe_error_non_json_body() {
        assert_eq!(describe_error(502, "Bad gateway\n"), "HTTP 502: Bad gateway");
        assert_eq!(describe_error(500, ""), "HTTP 500");
    }

    // ── retry classification ─────────────────────────────────────────

    #[test]
    fn test_transient_statuses() {
        assert!(is_transient(StatusCode::BAD_GATEWAY, false));
        assert!(is_transient(StatusCode::TOO_MANY_REQUESTS, false));
        assert!(is_transient(StatusCode::FORBIDDEN, true));
        assert!(!is_transient(StatusCode::FORBIDDEN, false));
        assert!(!is_transient(StatusCode::NOT_FOUND, false));
        assert!(!is_transient(StatusCode::UNPROCESSABLE_ENTITY, false));
    }

    #[test]
    fn test_configured_request_timeout() {
        let mut toml = FleetToml::default();
        toml.gateway.api_url = "http://localhost:9".into();
        toml.gateway.request_timeout_secs = 10;
        let gw = GitHubGateway::from_toml(&toml).unwrap();
        assert_eq!(gw.timeout_for(RetryPolicy::INVITE), Duration::from_secs(10));
        assert_eq!(gw.timeout_for(RetryPolicy::DELETE), Duration::from_secs(60));
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let gw = GitHubGateway::new("http://localhost", Duration::from_secs(1)).unwrap();
        assert_eq!(gw.backoff(1, None), Duration::from_secs(1));
        assert_eq!(gw.backoff(2, None), Duration::from_secs(2));
        assert_eq!(gw.backoff(3, None), Duration::from_secs(4));
        assert_eq!(gw.backoff(10, None), MAX_BACKOFF);
        assert_eq!(
            gw.backoff(1, Some(Duration::from_secs(7))),
            Duration::from_secs(7)
        );
        assert_eq!(gw.backoff(1, Some(Duration::from_secs(600))), MAX_RETRY_AFTER);
    }

    // ── HTTP behaviour against a local server ────────────────────────

    #[tokio::test]
    async fn test_not_found_is_not_retried() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let router = Router::new().route(
            "/repos/{owner}/{repo}",
            get(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    (AxumStatus::NOT_FOUND, r#"{"message":"Not Found"}"#)
                }
            }),
        );
        let url = serve(router).await;

        let result = gateway(&url)
            .execute(
                &Operation::GetRepository {
                    path: "alice/project".into(),
                },
                "ghp_alice",
                RetryPolicy::attempts(3),
            )
            .await;

        assert!(!result.success);
        assert_eq!(result.error_text(), "HTTP 404: Not Found");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_server_errors_are_retried_until_success() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let router = Router::new().route(
            "/user",
            get(move || {
                let counter = counter.clone();
                async move {
                    let n = counter.fetch_add(1, Ordering::SeqCst);
                    if n < 2 {
                        (AxumStatus::BAD_GATEWAY, "upstream hiccup".to_string())
                    } else {
                        (AxumStatus::OK, r#"{"login":"alice"}"#.to_string())
                    }
                }
            }),
        );
        let url = serve(router).await;

        let result = gateway(&url)
            .execute(
                &Operation::GetAuthenticatedUser,
                "ghp_alice",
                RetryPolicy::attempts(3),
            )
            .await;

        assert!(result.success);
        assert!(result.output.contains("alice"));
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retries_exhausted_returns_last_error() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let router = Router::new().route(
            "/user",
            get(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    (AxumStatus::SERVICE_UNAVAILABLE, r#"{"message":"try later"}"#)
                }
            }),
        );
        let url = serve(router).await;

        let result = gateway(&url)
            .execute(
                &Operation::GetAuthenticatedUser,
                "ghp_alice",
                RetryPolicy::attempts(2),
            )
            .await;

        assert!(!result.success);
        assert_eq!(result.error_text(), "HTTP 503: try later");
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_sends_bearer_credential_and_body() {
        let router = Router::new().route(
            "/repos/{owner}/{repo}/merge-upstream",
            post(|headers: HeaderMap, body: String| async move {
                let auth = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                (AxumStatus::OK, format!("{}|{}", auth, body))
            }),
        );
        let url = serve(router).await;

        let result = gateway(&url)
            .execute(
                &Operation::MergeUpstream {
                    fork: "alice/project".into(),
                    branch: "main".into(),
                },
                "ghp_alice",
                RetryPolicy::MERGE_UPSTREAM,
            )
            .await;

        assert!(result.success);
        assert!(result.output.starts_with("Bearer ghp_alice|"));
        assert!(result.output.contains(r#""branch":"main""#));
    }

    #[tokio::test]
    async fn test_validation_failure_keeps_body_as_output() {
        let router = Router::new().route(
            "/repos/{owner}/{repo}/forks",
            post(|| async {
                (
                    AxumStatus::UNPROCESSABLE_ENTITY,
                    r#"{"message":"Validation Failed","errors":[{"message":"forks must have unique names"}]}"#,
                )
            }),
        );
        let url = serve(router).await;

        let result = gateway(&url)
            .execute(
                &Operation::CreateFork {
                    source: "main/project".into(),
                },
                "ghp_alice",
                RetryPolicy::CREATE_FORK,
            )
            .await;

        assert!(!result.success);
        assert!(result.error_text().contains("forks must have unique names"));
        assert!(result.output.contains("Validation Failed"));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transient_failure() {
        // Bind then drop to get a port nothing listens on.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = gateway(&format!("http://{}", addr))
            .execute(
                &Operation::GetAuthenticatedUser,
                "ghp_alice",
                RetryPolicy::attempts(2),
            )
            .await;

        assert!(!result.success);
        assert!(result.error_text().starts_with("Request failed"));
    }
}
