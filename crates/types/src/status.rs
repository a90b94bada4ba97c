//! Controller-written workflow status and the terminal snapshot derived from it.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::workflow::{ObjectMeta, Workflow};

/// Status block maintained by the workflow controller.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<WorkflowPhase>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    /// Set once the workflow reaches a terminal phase. `null` on the wire otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl WorkflowStatus {
    pub fn is_empty(&self) -> bool {
        self.phase.is_none() && self.started_at.is_none() && self.finished_at.is_none() && self.message.is_none()
    }

    pub fn is_finished(&self) -> bool {
        self.finished_at.is_some()
    }
}

/// The parts of a watched workflow needed to tell whether it has finished.
///
/// Decoding only metadata and status keeps a finishing event readable even
/// when its spec does not match the authored schema.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct WorkflowProgress {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub status: WorkflowStatus,
}

impl WorkflowProgress {
    pub fn name(&self) -> Option<&str> {
        self.metadata.name.as_deref().filter(|name| !name.is_empty())
    }

    pub fn terminal_status(&self) -> Option<TerminalStatus> {
        TerminalStatus::from_parts(&self.metadata, &self.status)
    }
}

/// Workflow phase as reported by the controller.
///
/// Unrecognised phases are preserved verbatim in [`WorkflowPhase::Unknown`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum WorkflowPhase {
    Pending,
    Running,
    Succeeded,
    Failed,
    Error,
    Unknown(String),
}

impl WorkflowPhase {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "Pending",
            Self::Running => "Running",
            Self::Succeeded => "Succeeded",
            Self::Failed => "Failed",
            Self::Error => "Error",
            Self::Unknown(raw) => raw,
        }
    }
}

impl From<String> for WorkflowPhase {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "Pending" => Self::Pending,
            "Running" => Self::Running,
            "Succeeded" => Self::Succeeded,
            "Failed" => Self::Failed,
            "Error" => Self::Error,
            _ => Self::Unknown(raw),
        }
    }
}

impl From<WorkflowPhase> for String {
    fn from(phase: WorkflowPhase) -> Self {
        phase.as_str().to_string()
    }
}

impl fmt::Display for WorkflowPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of a workflow that has finished.
///
/// Only constructible from a workflow whose `finishedAt` is set, so a
/// `TerminalStatus` always carries a finish time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalStatus {
    pub name: String,
    pub phase: Option<WorkflowPhase>,
    pub finished_at: DateTime<Utc>,
    pub message: Option<String>,
}

impl TerminalStatus {
    pub fn from_workflow(workflow: &Workflow) -> Option<Self> {
        Self::from_parts(&workflow.metadata, &workflow.status)
    }

    fn from_parts(metadata: &ObjectMeta, status: &WorkflowStatus) -> Option<Self> {
        let finished_at = status.finished_at?;
        Some(Self {
            name: metadata.name.clone().unwrap_or_default(),
            phase: status.phase.clone(),
            finished_at,
            message: status.message.clone(),
        })
    }
}

impl fmt::Display for TerminalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase = self.phase.as_ref().map(WorkflowPhase::as_str).unwrap_or("");
        let message = self.message.as_deref().unwrap_or("");
        write!(
            f,
            "Workflow {} {} at {}. Message: {}.",
            self.name, phase, self.finished_at, message
        )
    }
}
