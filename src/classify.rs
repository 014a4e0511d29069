//! Error-text classification.
//!
//! The gateway surfaces GitHub's free-text messages, so a handful of
//! "failures" are really the remote telling us the work is already done.
//! Those cases live in [`IDEMPOTENT_ERRORS`]; adding one is a table entry.

use crate::gateway::{OperationKind, OperationResult};

/// How a gateway result should be treated by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The remote reported success.
    Succeeded,
    /// The remote reported an error that means the desired state already
    /// holds.
    Converged { matched: &'static str },
    /// A real failure.
    Failed { error: String },
}

impl Outcome {
    /// Succeeded or converged.
    pub fn is_success(&self) -> bool {
        !matches!(self, Outcome::Failed { .. })
    }
}

/// One idempotent-error rule. Every rule resolves to
/// [`Outcome::Converged`]; the caller maps that onto its own end state
/// (invited, fork already present, branch already synced).
#[derive(Debug, Clone, Copy)]
pub struct IdempotentError {
    pub kind: OperationKind,
    /// Lower-case substring matched against the error text.
    pub needle: &'static str,
}

pub const IDEMPOTENT_ERRORS: &[IdempotentError] = &[
    IdempotentError {
        kind: OperationKind::InviteCollaborator,
        needle: "already a collaborator",
    },
    IdempotentError {
        kind: OperationKind::CreateFork,
        needle: "forks must have unique names",
    },
    IdempotentError {
        kind: OperationKind::CreateFork,
        needle: "name already exists",
    },
    IdempotentError {
        kind: OperationKind::CreateFork,
        needle: "already in use",
    },
    IdempotentError {
        kind: OperationKind::MergeUpstream,
        needle: "up-to-date",
    },
    IdempotentError {
        kind: OperationKind::MergeUpstream,
        needle: "up to date",
    },
    IdempotentError {
        kind: OperationKind::MergeUpstream,
        needle: "already",
    },
];

/// Match `error` against the rules for `kind`, case-insensitively.
pub fn idempotent_match(kind: OperationKind, error: &str) -> Option<&'static str> {
    let lowered = error.to_lowercase();
    IDEMPOTENT_ERRORS
        .iter()
        .filter(|rule| rule.kind == kind)
        .find(|rule| lowered.contains(rule.needle))
        .map(|rule| rule.needle)
}

pub fn classify(kind: OperationKind, result: &OperationResult) -> Outcome {
    if result.success {
        return Outcome::Succeeded;
    }
    let error = result.error_text();
    match idempotent_match(kind, error) {
        Some(matched) => Outcome::Converged { matched },
        None => Outcome::Failed {
            error: error.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failed(kind: OperationKind, error: &str) -> Outcome {
        classify(kind, &OperationResult::failed(error))
    }

    #[test]
    fn test_every_rule_converges_for_its_own_kind() {
        for rule in IDEMPOTENT_ERRORS {
            let error = format!("HTTP 422: {}", rule.needle.to_uppercase());
            assert_eq!(
                failed(rule.kind, &error),
                Outcome::Converged {
                    matched: rule.needle
                },
                "rule {:?}",
                rule
            );
        }
    }

    #[test]
    fn test_success_is_success_regardless_of_kind() {
        let outcome = classify(OperationKind::CreateFork, &OperationResult::ok("{}"));
        assert_eq!(outcome, Outcome::Succeeded);
    }

    #[test]
    fn test_already_collaborator_converges() {
        let outcome = failed(
            OperationKind::InviteCollaborator,
            "HTTP 422: Validation Failed: User is Already A Collaborator",
        );
        assert_eq!(
            outcome,
            Outcome::Converged {
                matched: "already a collaborator"
            }
        );
    }

    #[test]
    fn test_fork_name_conflicts_converge() {
        for error in [
            "HTTP 422: Validation Failed: forks must have unique names",
            "Validation Failed: name already exists on this account",
            "HTTP 422: Name already in use",
        ] {
            assert!(failed(OperationKind::CreateFork, error).is_success(), "{error}");
        }
    }

    #[test]
    fn test_merge_up_to_date_variants_converge() {
        for error in [
            "This branch is already up-to-date",
            "HTTP 409: Up to date",
            "already merged",
        ] {
            assert!(failed(OperationKind::MergeUpstream, error).is_success(), "{error}");
        }
    }

    #[test]
    fn test_rules_are_scoped_to_their_operation() {
        // "already" alone only means convergence for a merge.
        assert!(!failed(OperationKind::CreateFork, "already").is_success());
        assert!(!failed(OperationKind::DeleteRepository, "already a collaborator").is_success());
        assert!(!failed(OperationKind::InviteCollaborator, "up-to-date").is_success());
    }

    #[test]
    fn test_other_errors_fail_with_text() {
        assert_eq!(
            failed(OperationKind::CreateFork, "HTTP 403: Resource not accessible"),
            Outcome::Failed {
                error: "HTTP 403: Resource not accessible".to_string()
            }
        );
        assert!(!failed(OperationKind::MergeUpstream, "HTTP 409: merge conflict").is_success());
    }
}
