//! Test helper utilities for the integration tests

use std::sync::Arc;
use std::time::Duration;

use adreport_client::services::api::ApiClient;
use adreport_client::services::imports::ImportApi;
use adreport_client::services::poller::ImportPoller;
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Poll period used against mock servers.
#[allow(dead_code)] // used by import_flow_test only
pub const TEST_INTERVAL: Duration = Duration::from_millis(25);

/// Status body as the import service returns it.
#[allow(dead_code)] // used by import_flow_test only
pub fn job_body(job_id: &str, status: &str, progress: u32) -> Value {
    json!({
        "job_id": job_id,
        "status": status,
        "progress": progress,
        "errors": [],
        "inserted": 0,
    })
}

pub fn client_for(server: &MockServer) -> Arc<ApiClient> {
    Arc::new(ApiClient::new(&server.uri(), Duration::from_secs(5)).expect("Failed to build client"))
}

#[allow(dead_code)] // used by import_flow_test only
pub fn poller_for(server: &MockServer) -> ImportPoller {
    let api: Arc<dyn ImportApi> = client_for(server);
    ImportPoller::new(api).with_interval(TEST_INTERVAL)
}

/// Accept any upload and hand out `job_id`.
#[allow(dead_code)] // used by import_flow_test only
pub async fn mount_upload(server: &MockServer, job_id: &str) {
    Mock::given(method("POST"))
        .and(path("/api/data/import"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "job_id": job_id,
            "message": "Import started"
        })))
        .expect(1)
        .mount(server)
        .await;
}

/// Answer successive status checks for `job_id` with `responses` in order.
/// The last response repeats for any further checks.
#[allow(dead_code)] // used by import_flow_test only
pub async fn mount_status_sequence(
    server: &MockServer,
    job_id: &str,
    responses: Vec<ResponseTemplate>,
) {
    let count = responses.len();
    for (i, response) in responses.into_iter().enumerate() {
        let mock = Mock::given(method("GET"))
            .and(path(format!("/api/data/import/{job_id}")))
            .respond_with(response);
        let mock = if i + 1 < count {
            mock.up_to_n_times(1)
        } else {
            mock
        };
        mock.mount(server).await;
    }
}

/// Number of requests the server saw on `request_path`.
#[allow(dead_code)] // used by import_flow_test only
pub async fn hits(server: &MockServer, request_path: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == request_path)
        .count()
}
