//! Live parameter sync — mirrors a local file into a remote workflow
//! parameter.
//!
//! Each detected change is pushed from a spawned task holding its own copy
//! of the workflow, so the poll never waits on the network. Two edits in
//! quick succession can therefore arrive out of order at the remote
//! service: consistency is last-arrival-wins, accepted as best-effort for a
//! development convenience. A failed push is logged and polling continues.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use loom_common::Workflow;
use thiserror::Error;
use tokio::time::MissedTickBehavior;
use url::Url;

use crate::client::{ApiError, LoomClient};
use crate::output::OutputContext;

/// Poll interval for local file changes.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Only Python code fields are editable through a sync session.
const SUPPORTED_ACTION: &str = "execute_python";
const SUPPORTED_FIELD: &str = "code";

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("unsupported sync target: {0}")]
    UnsupportedTarget(String),

    #[error("workflow {workflow_id} has no {what} '{id}'")]
    TargetNotFound {
        workflow_id: String,
        what: &'static str,
        id: String,
    },

    #[error("cannot read {path}: {source}")]
    LocalFileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot seed {path}: {source}")]
    Seed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Target coordinates parsed from a pasted workflow UI URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncTarget {
    pub workflow_id: String,
    pub action_id: String,
    pub field: String,
}

impl SyncTarget {
    /// Parse a URL of the form
    /// `https://…/workflows/{id}?action_id=…&action_name=execute_python&field=code`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::UnsupportedTarget`] when the workflow id is
    /// absent or the `action_name`/`field` combination is anything other
    /// than `execute_python`/`code`.
    pub fn parse(raw: &str) -> Result<Self, SyncError> {
        let url =
            Url::parse(raw).map_err(|e| SyncError::UnsupportedTarget(format!("{raw}: {e}")))?;

        let segments: Vec<&str> = url.path_segments().map(Iterator::collect).unwrap_or_default();
        let workflow_id = segments
            .iter()
            .position(|s| *s == "workflows")
            .and_then(|i| segments.get(i + 1))
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                SyncError::UnsupportedTarget(format!("no /workflows/{{id}} segment in {raw}"))
            })?
            .to_string();

        let query: HashMap<_, _> = url.query_pairs().collect();
        let action_id = query
            .get("action_id")
            .filter(|v| !v.is_empty())
            .ok_or_else(|| SyncError::UnsupportedTarget("missing action_id".to_string()))?
            .to_string();
        let action_name = query.get("action_name").map_or("", |v| v.as_ref());
        let field = query.get("field").map_or("", |v| v.as_ref());
        if action_name != SUPPORTED_ACTION || field != SUPPORTED_FIELD {
            return Err(SyncError::UnsupportedTarget(format!(
                "only action_name={SUPPORTED_ACTION} with field={SUPPORTED_FIELD} can be synced, \
                 got action_name={action_name} field={field}"
            )));
        }

        Ok(Self {
            workflow_id,
            action_id,
            field: field.to_string(),
        })
    }
}

/// Linear scan for the target action, then its parameter.
///
/// # Errors
///
/// Either miss is [`SyncError::TargetNotFound`].
fn locate(workflow: &Workflow, target: &SyncTarget) -> Result<(usize, usize), SyncError> {
    let action_idx = workflow
        .actions
        .iter()
        .position(|a| a.id == target.action_id)
        .ok_or_else(|| SyncError::TargetNotFound {
            workflow_id: workflow.id.clone(),
            what: "action",
            id: target.action_id.clone(),
        })?;
    let param_idx = workflow.actions[action_idx]
        .parameters
        .iter()
        .position(|p| p.name == target.field)
        .ok_or_else(|| SyncError::TargetNotFound {
            workflow_id: workflow.id.clone(),
            what: "parameter",
            id: target.field.clone(),
        })?;
    Ok((action_idx, param_idx))
}

/// One live sync session bound to a workflow parameter and a local file.
/// Lives for the duration of one `loom dev run`; terminated by a local read
/// error or external interruption — there is no stop command.
pub struct SyncSession {
    client: LoomClient,
    target: SyncTarget,
    local_path: PathBuf,
    poll_interval: Duration,
}

impl SyncSession {
    #[must_use]
    pub fn new(client: LoomClient, target: SyncTarget, code_dir: &Path) -> Self {
        let local_path = code_dir.join(format!(
            "{}_{}.py",
            target.workflow_id, target.action_id
        ));
        Self {
            client,
            target,
            local_path,
            poll_interval: POLL_INTERVAL,
        }
    }

    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// File the session mirrors; seeded with the remote value on start.
    #[must_use]
    pub fn local_path(&self) -> &Path {
        &self.local_path
    }

    /// Fetch the workflow, locate the target parameter, seed the local
    /// file, then poll it until a read error or interruption.
    ///
    /// # Errors
    ///
    /// Fatal before the loop: fetch failures and [`SyncError::TargetNotFound`].
    /// Inside the loop only [`SyncError::LocalFileRead`] terminates; push
    /// failures are logged and polling continues.
    pub async fn run(self, out: &OutputContext) -> Result<(), SyncError> {
        let mut workflow = self.client.get_workflow(&self.target.workflow_id).await?;
        let (action_idx, param_idx) = locate(&workflow, &self.target)?;

        let seed = workflow.actions[action_idx].parameters[param_idx].value.clone();
        if let Some(parent) = self.local_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| SyncError::Seed {
                    path: self.local_path.clone(),
                    source,
                })?;
        }
        tokio::fs::write(&self.local_path, &seed)
            .await
            .map_err(|source| SyncError::Seed {
                path: self.local_path.clone(),
                source,
            })?;

        out.success(&format!(
            "synced remote value to {}",
            self.local_path.display()
        ));
        out.info("edit the file to push changes; interrupt to stop");

        let mut last = seed;
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let current = tokio::fs::read_to_string(&self.local_path)
                .await
                .map_err(|source| SyncError::LocalFileRead {
                    path: self.local_path.clone(),
                    source,
                })?;
            if current == last {
                continue;
            }
            last.clone_from(&current);
            workflow.actions[action_idx].parameters[param_idx].value = current;

            // Dispatch with a value copy taken now; the poll resumes
            // immediately and never cancels an in-flight push.
            let client = self.client.clone();
            let push = workflow.clone();
            let push_out = out.clone();
            tokio::spawn(async move {
                match client.put_workflow(&push).await {
                    Ok(()) => push_out.success(&format!("pushed update to workflow {}", push.id)),
                    Err(err) => push_out.error(&format!("push failed: {err}")),
                }
            });
        }
    }
}
