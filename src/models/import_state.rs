use serde::Serialize;
use strum::Display;

use crate::models::job::{ImportJob, JobStatus};

/// Where the import poller is in its lifecycle.
#[derive(Debug, Clone, Copy, Serialize, Display, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ImportPhase {
    Idle,
    Uploading,
    Polling,
    /// The server reported `completed` or `failed`.
    Done,
    /// The upload or a status check failed on the client side.
    Errored,
}

#[derive(Debug, Clone, Copy, Serialize, Display, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NoticeLevel {
    Success,
    Error,
}

/// A user-facing message produced by a transition.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            text: text.into(),
        }
    }
}

/// Snapshot published to whoever renders the import screen.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ImportState {
    pub phase: ImportPhase,
    pub job: Option<ImportJob>,
    pub notice: Option<Notice>,
}

impl Default for ImportState {
    fn default() -> Self {
        Self {
            phase: ImportPhase::Idle,
            job: None,
            notice: None,
        }
    }
}

impl ImportState {
    /// True while an upload or status loop is in flight.
    pub fn is_busy(&self) -> bool {
        matches!(self.phase, ImportPhase::Uploading | ImportPhase::Polling)
    }

    pub fn job_id(&self) -> Option<&str> {
        self.job.as_ref().map(|j| j.job_id.as_str())
    }
}

/// How a submitted job ended, from this client's point of view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    Completed(ImportJob),
    Failed(ImportJob),
    /// A status check failed; `last_known` is whatever was fetched before.
    StatusCheckFailed {
        last_known: ImportJob,
        error: String,
    },
    /// Superseded by a new submit, cancelled, or the poller was torn down.
    Cancelled,
}

impl ImportOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, ImportOutcome::Completed(_))
    }

    pub fn job(&self) -> Option<&ImportJob> {
        match self {
            ImportOutcome::Completed(job) | ImportOutcome::Failed(job) => Some(job),
            ImportOutcome::StatusCheckFailed { last_known, .. } => Some(last_known),
            ImportOutcome::Cancelled => None,
        }
    }

    pub(crate) fn from_terminal(job: ImportJob) -> Self {
        match job.status {
            JobStatus::Completed => ImportOutcome::Completed(job),
            _ => ImportOutcome::Failed(job),
        }
    }
}
