//! Test doubles shared by the unit tests.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use crate::gateway::{Operation, OperationKind, OperationResult, RemoteGateway, RetryPolicy};

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub operation: Operation,
    pub credential: String,
    pub policy: RetryPolicy,
}

/// Scripted gateway.
///
/// Each operation answers from its queue first, then its sticky result, then
/// `HTTP 404: Not Found`. Every call is recorded.
#[derive(Default)]
pub struct MockGateway {
    calls: Mutex<Vec<RecordedCall>>,
    queued: Mutex<HashMap<Operation, VecDeque<OperationResult>>>,
    sticky: Mutex<HashMap<Operation, OperationResult>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `operation` with `result` from now on.
    pub fn on(&self, operation: Operation, result: OperationResult) {
        self.sticky
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(operation, result);
    }

    /// Answer the next call of `operation` with `result`.
    pub fn push(&self, operation: Operation, result: OperationResult) {
        self.queued
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(operation)
            .or_default()
            .push_back(result);
    }

    pub fn on_repo(&self, path: &str, result: OperationResult) {
        self.on(
            Operation::GetRepository {
                path: path.to_string(),
            },
            result,
        );
    }

    pub fn push_repo(&self, path: &str, result: OperationResult) {
        self.push(
            Operation::GetRepository {
                path: path.to_string(),
            },
            result,
        );
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn calls_of(&self, kind: OperationKind) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.operation.kind() == kind)
            .collect()
    }

    pub fn count(&self, kind: OperationKind) -> usize {
        self.calls_of(kind).len()
    }

    /// Calls whose path mentions `needle`, e.g. an account's fork path.
    pub fn calls_touching(&self, needle: &str) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.operation.path().contains(needle))
            .collect()
    }
}

#[async_trait]
impl RemoteGateway for MockGateway {
    async fn execute(
        &self,
        operation: &Operation,
        credential: &str,
        policy: RetryPolicy,
    ) -> OperationResult {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(RecordedCall {
                operation: operation.clone(),
                credential: credential.to_string(),
                policy,
            });

        let queued = self
            .queued
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get_mut(operation)
            .and_then(|q| q.pop_front());
        if let Some(result) = queued {
            return result;
        }

        self.sticky
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(operation)
            .cloned()
            .unwrap_or_else(|| OperationResult::failed("HTTP 404: Not Found"))
    }
}

/// Repository payload with a parent, as GitHub returns for a fork.
pub fn fork_payload(full_name: &str, parent: &str, default_branch: &str) -> String {
    serde_json::json!({
        "full_name": full_name,
        "default_branch": default_branch,
        "fork": true,
        "parent": { "full_name": parent },
    })
    .to_string()
}

pub fn repo_payload(full_name: &str, default_branch: &str) -> String {
    serde_json::json!({
        "full_name": full_name,
        "default_branch": default_branch,
        "fork": false,
    })
    .to_string()
}

pub fn invitations_payload(entries: &[(u64, &str)]) -> String {
    let list: Vec<serde_json::Value> = entries
        .iter()
        .map(|(id, full_name)| {
            serde_json::json!({
                "id": id,
                "repository": { "full_name": full_name },
            })
        })
        .collect();
    serde_json::Value::Array(list).to_string()
}
