//! Remote workflow documents, as exchanged with the workflow endpoints.

use serde::{Deserialize, Serialize};

/// Workflow document fetched from `GET /api/v1/workflows/{id}` and pushed
/// back in full via `PUT`. The local copy and the remote copy are
/// independent after fetch; the service merges by id on write.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Workflow {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub actions: Vec<WorkflowAction>,
}

/// One step of a remote workflow.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowAction {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub parameters: Vec<WorkflowParameter>,
}

/// Named parameter of a workflow action.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowParameter {
    pub name: String,
    #[serde(default)]
    pub value: String,
}

/// Success envelope returned by mutating endpoints. A 200 response with
/// `success: false` is still a rejection.
#[derive(Debug, Clone, Deserialize)]
pub struct ResultChecker {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub reason: Option<String>,
}
