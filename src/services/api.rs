use std::time::Duration;

use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// HTTP client for the reporting API.
///
/// Import and report endpoints are implemented on this type in
/// `services::imports` and `services::reports`.
pub struct ApiClient {
    pub(crate) http: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let http = Client::builder()
            .user_agent(concat!("adreport-client/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `path` with `id` appended as one percent-encoded path segment.
    pub(crate) fn url_with_id(&self, path: &str, id: &str) -> Result<Url, ApiError> {
        let mut url = Url::parse(&self.url(path))
            .map_err(|e| ApiError::Invalid(format!("bad API URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| ApiError::Invalid(format!("API base URL cannot take a path: {}", self.base_url)))?
            .push(id);
        Ok(url)
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.http.get(self.url(path)).send().await?;
        Ok(ensure_success(response).await?.json().await?)
    }

    pub(crate) async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.http.post(self.url(path)).json(body).send().await?;
        Ok(ensure_success(response).await?.json().await?)
    }
}

/// Pass 2xx responses through; turn anything else into `ApiError::Status`.
pub(crate) async fn ensure_success(response: Response) -> Result<Response, ApiError> {
    if response.status().is_success() {
        return Ok(response);
    }
    Err(ApiError::from_response(response).await)
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server returned HTTP {status}{}", detail_suffix(.detail))]
    Status { status: u16, detail: Option<String> },

    #[error("Invalid request: {0}")]
    Invalid(String),

    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),
}

impl From<garde::Report> for ApiError {
    fn from(report: garde::Report) -> Self {
        ApiError::Invalid(report.to_string())
    }
}

impl ApiError {
    pub async fn from_response(response: Response) -> ApiError {
        let status = response.status().as_u16();
        let detail = match response.text().await {
            Ok(body) => extract_detail(&body),
            Err(_) => None,
        };
        ApiError::Status { status, detail }
    }

    /// The server's `detail` message, when it sent one.
    pub fn detail(&self) -> Option<&str> {
        match self {
            ApiError::Status { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }

    /// Message suitable for showing to a user: the server detail if present.
    pub fn user_message(&self) -> String {
        self.detail()
            .map(str::to_string)
            .unwrap_or_else(|| self.to_string())
    }
}

fn detail_suffix(detail: &Option<String>) -> String {
    detail.as_deref().map(|d| format!(": {d}")).unwrap_or_default()
}

/// Pull `detail` out of an error body. Structured details (validation error
/// lists) are rendered back to compact JSON.
fn extract_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }
}
