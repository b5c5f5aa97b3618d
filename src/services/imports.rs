use std::path::Path;

use async_trait::async_trait;
use reqwest::multipart;

use crate::models::job::{ImportJob, ImportJobList, ImportJobSummary, RecordCount, UploadResponse};
use crate::services::api::{ensure_success, ApiClient, ApiError};

const CSV_MIME: &str = "text/csv";

/// A CSV file to upload. Contents are not inspected client-side.
#[derive(Debug, Clone)]
pub struct ImportFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl ImportFile {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }

    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, ApiError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.csv".to_string());
        Ok(Self { file_name, bytes })
    }
}

/// The two calls the import poller depends on.
#[async_trait]
pub trait ImportApi: Send + Sync {
    /// Upload a file and return the job id the server assigned.
    async fn upload(&self, file: &ImportFile) -> Result<String, ApiError>;

    /// Fetch the current state of a job.
    async fn job_status(&self, job_id: &str) -> Result<ImportJob, ApiError>;
}

impl ApiClient {
    /// POST /api/data/import: multipart upload, field `file`.
    pub async fn upload_csv(&self, file: &ImportFile) -> Result<UploadResponse, ApiError> {
        let part = multipart::Part::bytes(file.bytes.clone())
            .file_name(file.file_name.clone())
            .mime_str(CSV_MIME)?;
        let form = multipart::Form::new().part("file", part);

        let response = self
            .http
            .post(self.url("/api/data/import"))
            .multipart(form)
            .send()
            .await?;

        Ok(ensure_success(response).await?.json().await?)
    }

    /// GET /api/data/import/{job_id}
    pub async fn import_status(&self, job_id: &str) -> Result<ImportJob, ApiError> {
        let url = self.url_with_id("/api/data/import", job_id)?;
        let response = self.http.get(url).send().await?;
        Ok(ensure_success(response).await?.json().await?)
    }

    /// GET /api/data/import: the server's most recent jobs.
    pub async fn recent_imports(&self) -> Result<Vec<ImportJobSummary>, ApiError> {
        let list: ImportJobList = self.get_json("/api/data/import").await?;
        Ok(list.jobs)
    }

    /// GET /api/data/count: number of stored report rows.
    pub async fn record_count(&self) -> Result<u64, ApiError> {
        let count: RecordCount = self.get_json("/api/data/count").await?;
        Ok(count.count)
    }
}

#[async_trait]
impl ImportApi for ApiClient {
    async fn upload(&self, file: &ImportFile) -> Result<String, ApiError> {
        Ok(self.upload_csv(file).await?.job_id)
    }

    async fn job_status(&self, job_id: &str) -> Result<ImportJob, ApiError> {
        self.import_status(job_id).await
    }
}
