use serde::{Deserialize, Serialize};
use strum::Display;

/// Status of a CSV import job as reported by the server.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Display, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    /// `completed` and `failed` end the job; nothing follows them.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// Client-side view of a server-tracked import job.
///
/// Every successful status check replaces this value wholesale; the client
/// never merges fields or edits `errors`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImportJob {
    pub job_id: String,
    pub status: JobStatus,
    #[serde(default)]
    pub progress: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_records: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_records: Option<u64>,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inserted: Option<u64>,
}

impl ImportJob {
    /// The state assumed the instant an upload is accepted.
    pub fn pending(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            status: JobStatus::Pending,
            progress: 0,
            total_records: None,
            processed_records: None,
            errors: Vec::new(),
            inserted: None,
        }
    }

    /// Progress clamped to a displayable percentage.
    pub fn percent(&self) -> u32 {
        self.progress.min(100)
    }
}

/// Response body of `POST /api/data/import`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub job_id: String,
    #[serde(default)]
    pub message: Option<String>,
}

/// Entry of `GET /api/data/import` (most recent jobs first).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportJobSummary {
    pub job_id: String,
    pub status: JobStatus,
    #[serde(default)]
    pub progress: u32,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ImportJobList {
    #[serde(default)]
    pub jobs: Vec<ImportJobSummary>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RecordCount {
    pub count: u64,
}
