use serde_json::json;

/// Every remote call forkfleet makes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operation {
    /// `GET /user`
    GetAuthenticatedUser,
    /// `GET /repos/{path}`; doubles as the existence probe.
    GetRepository { path: String },
    /// `PUT /repos/{repo}/collaborators/{username}`
    InviteCollaborator { repo: String, username: String },
    /// `GET /user/repository_invitations`
    ListInvitations,
    /// `PATCH /user/repository_invitations/{id}`
    AcceptInvitation { id: u64 },
    /// `POST /repos/{source}/forks`
    CreateFork { source: String },
    /// `POST /repos/{fork}/merge-upstream`
    MergeUpstream { fork: String, branch: String },
    /// `DELETE /repos/{path}`
    DeleteRepository { path: String },
    /// `PUT /repos/{repo}/actions/workflows/{workflow}/disable`
    DisableWorkflow { repo: String, workflow: String },
}

/// Coarse category of an [`Operation`], used to key error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    GetAuthenticatedUser,
    GetRepository,
    InviteCollaborator,
    ListInvitations,
    AcceptInvitation,
    CreateFork,
    MergeUpstream,
    DeleteRepository,
    DisableWorkflow,
}

/// HTTP verb of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Put,
    Post,
    Patch,
    Delete,
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::GetAuthenticatedUser => OperationKind::GetAuthenticatedUser,
            Operation::GetRepository { .. } => OperationKind::GetRepository,
            Operation::InviteCollaborator { .. } => OperationKind::InviteCollaborator,
            Operation::ListInvitations => OperationKind::ListInvitations,
            Operation::AcceptInvitation { .. } => OperationKind::AcceptInvitation,
            Operation::CreateFork { .. } => OperationKind::CreateFork,
            Operation::MergeUpstream { .. } => OperationKind::MergeUpstream,
            Operation::DeleteRepository { .. } => OperationKind::DeleteRepository,
            Operation::DisableWorkflow { .. } => OperationKind::DisableWorkflow,
        }
    }

    pub fn method(&self) -> Method {
        match self {
            Operation::GetAuthenticatedUser
            | Operation::GetRepository { .. }
            | Operation::ListInvitations => Method::Get,
            Operation::InviteCollaborator { .. } | Operation::DisableWorkflow { .. } => Method::Put,
            Operation::CreateFork { .. } | Operation::MergeUpstream { .. } => Method::Post,
            Operation::AcceptInvitation { .. } => Method::Patch,
            Operation::DeleteRepository { .. } => Method::Delete,
        }
    }

    /// API path relative to the base URL, without a leading slash.
    pub fn path(&self) -> String {
        match self {
            Operation::GetAuthenticatedUser => "user".to_string(),
            Operation::GetRepository { path } | Operation::DeleteRepository { path } => {
                format!("repos/{}", path)
            }
            Operation::InviteCollaborator { repo, username } => {
                format!("repos/{}/collaborators/{}", repo, username)
            }
            Operation::ListInvitations => "user/repository_invitations".to_string(),
            Operation::AcceptInvitation { id } => format!("user/repository_invitations/{}", id),
            Operation::CreateFork { source } => format!("repos/{}/forks", source),
            Operation::MergeUpstream { fork, .. } => format!("repos/{}/merge-upstream", fork),
            Operation::DisableWorkflow { repo, workflow } => {
                format!("repos/{}/actions/workflows/{}/disable", repo, workflow)
            }
        }
    }

    /// JSON request body, if the endpoint takes one.
    pub fn body(&self) -> Option<serde_json::Value> {
        match self {
            Operation::InviteCollaborator { .. } => Some(json!({ "permission": "push" })),
            Operation::MergeUpstream { branch, .. } => Some(json!({ "branch": branch })),
            _ => None,
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let verb = match self.method() {
            Method::Get => "GET",
            Method::Put => "PUT",
            Method::Post => "POST",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        };
        write!(f, "{} /{}", verb, self.path())
    }
}
