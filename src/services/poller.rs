//! Import job poller.
//!
//! Uploads a CSV, then checks the job's status once per interval until the
//! server reports a terminal status, a status check fails, or the poller is
//! cancelled. Every transition is published as an [`ImportState`] on a watch
//! channel; each submitted job resolves its [`ImportHandle`] exactly once.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::{oneshot, watch};
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::models::import_state::{ImportOutcome, ImportPhase, ImportState, Notice};
use crate::models::job::{ImportJob, JobStatus};
use crate::services::api::ApiError;
use crate::services::imports::{ImportApi, ImportFile};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
/// Shorter intervals, including zero, are raised to this.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

pub const UPLOAD_ACCEPTED: &str = "Processing... File uploaded successfully.";
pub const IMPORT_COMPLETED: &str = "Import completed successfully";
pub const IMPORT_FAILED: &str = "Import failed";
pub const STATUS_CHECK_FAILED: &str = "Failed to check job status";

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("Upload failed: {}", upload_message(.0))]
    Upload(#[source] ApiError),

    #[error("Failed to check status of job {job_id}: {message}")]
    StatusCheck { job_id: String, message: String },

    #[error("Import job {job_id} failed")]
    JobFailed { job_id: String, errors: Vec<String> },

    #[error("Import was cancelled")]
    Cancelled,
}

fn upload_message(err: &ApiError) -> String {
    err.user_message()
}

impl ImportOutcome {
    /// Collapse the outcome into the job on success or the matching error.
    pub fn into_result(self) -> Result<ImportJob, ImportError> {
        match self {
            ImportOutcome::Completed(job) => Ok(job),
            ImportOutcome::Failed(job) => Err(ImportError::JobFailed {
                job_id: job.job_id,
                errors: job.errors,
            }),
            ImportOutcome::StatusCheckFailed { last_known, error } => Err(ImportError::StatusCheck {
                job_id: last_known.job_id,
                message: error,
            }),
            ImportOutcome::Cancelled => Err(ImportError::Cancelled),
        }
    }
}

/// Tracks one import at a time and publishes its state.
///
/// Submitting again cancels the loop of the previous job. Dropping the
/// poller stops every loop it started.
pub struct ImportPoller {
    api: Arc<dyn ImportApi>,
    interval: Duration,
    shared: Arc<Shared>,
    shutdown: CancellationToken,
}

/// Returned by [`ImportPoller::submit`]; resolves once the job's loop ends.
#[derive(Debug)]
pub struct ImportHandle {
    job_id: String,
    outcome: oneshot::Receiver<ImportOutcome>,
}

impl ImportHandle {
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Wait for the loop to end. A loop that is torn down resolves to `Cancelled`.
    pub async fn outcome(self) -> ImportOutcome {
        self.outcome.await.unwrap_or(ImportOutcome::Cancelled)
    }

    /// Wait for the job and return it only if it completed.
    pub async fn wait(self) -> Result<ImportJob, ImportError> {
        self.outcome().await.into_result()
    }
}

struct Shared {
    state: watch::Sender<ImportState>,
    active: Mutex<ActiveLoop>,
}

/// Which submission currently owns the published state.
#[derive(Default)]
struct ActiveLoop {
    generation: u64,
    token: Option<CancellationToken>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, ActiveLoop> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Take ownership for a new submission, cancelling the previous owner.
    fn begin(&self, token: CancellationToken) -> u64 {
        let mut active = self.lock();
        if let Some(previous) = active.token.replace(token) {
            previous.cancel();
        }
        active.generation += 1;
        self.state.send_replace(ImportState {
            phase: ImportPhase::Uploading,
            job: None,
            notice: None,
        });
        active.generation
    }

    /// Apply `update` only while `generation` still owns the state.
    fn publish(&self, generation: u64, update: impl FnOnce(&mut ImportState)) -> bool {
        let active = self.lock();
        if active.generation != generation {
            return false;
        }
        self.state.send_modify(update);
        true
    }

    /// Drop ownership without touching the state.
    fn release(&self, generation: u64) {
        let mut active = self.lock();
        if active.generation == generation {
            active.token = None;
        }
    }

    /// Revoke whatever owns the state. Returns true if a loop was running.
    fn revoke(&self) -> bool {
        let mut active = self.lock();
        active.generation += 1;
        match active.token.take() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }
}

impl ImportPoller {
    pub fn new(api: Arc<dyn ImportApi>) -> Self {
        let (state, _) = watch::channel(ImportState::default());
        Self {
            api,
            interval: DEFAULT_POLL_INTERVAL,
            shared: Arc::new(Shared {
                state,
                active: Mutex::new(ActiveLoop::default()),
            }),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval.max(MIN_POLL_INTERVAL);
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Latest published state.
    pub fn state(&self) -> ImportState {
        self.shared.state.borrow().clone()
    }

    /// Receiver that observes every published state.
    pub fn subscribe(&self) -> watch::Receiver<ImportState> {
        self.shared.state.subscribe()
    }

    /// Upload `file` and start polling the job it creates.
    ///
    /// Fails with [`ImportError::Upload`] when the upload is rejected; no
    /// polling happens in that case.
    pub async fn submit(&self, file: ImportFile) -> Result<ImportHandle, ImportError> {
        if self.shutdown.is_cancelled() {
            return Err(ImportError::Cancelled);
        }

        let token = self.shutdown.child_token();
        let generation = self.shared.begin(token.clone());

        tracing::info!(
            file = %file.file_name,
            bytes = file.bytes.len(),
            "Uploading import file"
        );
        metrics::counter!("import_uploads_total").increment(1);

        let uploaded = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(ImportError::Cancelled),
            result = self.api.upload(&file) => result,
        };

        let job_id = match uploaded {
            Ok(job_id) => job_id,
            Err(e) => {
                metrics::counter!("import_upload_failures").increment(1);
                tracing::warn!(file = %file.file_name, error = %e, "Upload rejected");
                let notice = Notice::error(format!("Upload failed: {}", e.user_message()));
                self.shared.publish(generation, |s| {
                    s.phase = ImportPhase::Errored;
                    s.job = None;
                    s.notice = Some(notice);
                });
                self.shared.release(generation);
                return Err(ImportError::Upload(e));
            }
        };

        let job = ImportJob::pending(job_id.clone());
        let accepted = self.shared.publish(generation, |s| {
            s.phase = ImportPhase::Polling;
            s.job = Some(job.clone());
            s.notice = Some(Notice::success(UPLOAD_ACCEPTED));
        });
        if !accepted {
            return Err(ImportError::Cancelled);
        }

        tracing::info!(job_id = %job_id, "Upload accepted, polling job status");

        let (done, outcome) = oneshot::channel();
        let poll = PollLoop {
            api: Arc::clone(&self.api),
            shared: Arc::clone(&self.shared),
            interval: self.interval,
            generation,
            token,
            job,
        };
        tokio::spawn(poll.run(done));

        Ok(ImportHandle { job_id, outcome })
    }

    /// Stop the current job's loop without asserting any outcome.
    /// The last known job stays visible. Calling it again is a no-op.
    pub fn cancel(&self) {
        let mut active = self.shared.lock();
        if let Some(token) = active.token.take() {
            token.cancel();
            active.generation += 1;
            self.shared.state.send_modify(|s| {
                s.phase = ImportPhase::Idle;
                s.notice = None;
            });
            tracing::info!("Import polling cancelled");
        }
    }

    /// Tear the poller down: no loop it started will poll, publish or notify
    /// afterwards. Idempotent; also runs on drop.
    pub fn shutdown(&self) {
        if self.shared.revoke() {
            tracing::debug!("Import poller shut down with a loop in flight");
        }
        self.shutdown.cancel();
    }
}

impl Drop for ImportPoller {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct PollLoop {
    api: Arc<dyn ImportApi>,
    shared: Arc<Shared>,
    interval: Duration,
    generation: u64,
    token: CancellationToken,
    job: ImportJob,
}

impl PollLoop {
    async fn run(self, done: oneshot::Sender<ImportOutcome>) {
        let started = Instant::now();
        let outcome = self.poll_until_terminal().await;
        self.shared.release(self.generation);

        match &outcome {
            ImportOutcome::Completed(_) => {
                metrics::counter!("import_jobs_completed").increment(1);
                metrics::histogram!("import_duration_seconds")
                    .record(started.elapsed().as_secs_f64());
            }
            ImportOutcome::Failed(_) => metrics::counter!("import_jobs_failed").increment(1),
            ImportOutcome::StatusCheckFailed { .. } => {}
            ImportOutcome::Cancelled => {
                tracing::debug!(job_id = %self.job.job_id, "Polling loop cancelled");
            }
        }

        // The handle may have been dropped; nobody is waiting then.
        let _ = done.send(outcome);
    }

    async fn poll_until_terminal(&self) -> ImportOutcome {
        let job_id = self.job.job_id.as_str();
        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_known = self.job.clone();

        loop {
            tokio::select! {
                biased;
                _ = self.token.cancelled() => return ImportOutcome::Cancelled,
                _ = ticker.tick() => {}
            }

            metrics::counter!("import_status_checks_total").increment(1);
            let checked = tokio::select! {
                biased;
                _ = self.token.cancelled() => return ImportOutcome::Cancelled,
                result = self.api.job_status(job_id) => result,
            };

            let job = match checked {
                Ok(job) => job,
                Err(e) => {
                    metrics::counter!("import_status_check_errors").increment(1);
                    tracing::warn!(job_id = %job_id, error = %e, "Status check failed, polling stopped");
                    let published = self.shared.publish(self.generation, |s| {
                        s.phase = ImportPhase::Errored;
                        s.notice = Some(Notice::error(STATUS_CHECK_FAILED));
                    });
                    if !published {
                        return ImportOutcome::Cancelled;
                    }
                    return ImportOutcome::StatusCheckFailed {
                        last_known,
                        error: e.to_string(),
                    };
                }
            };

            let status = job.status;
            tracing::debug!(
                job_id = %job_id,
                status = %status,
                progress = job.progress,
                processed = ?job.processed_records,
                total = ?job.total_records,
                "Job status"
            );

            let notice = match status {
                JobStatus::Completed => Some(Notice::success(IMPORT_COMPLETED)),
                JobStatus::Failed => Some(Notice::error(IMPORT_FAILED)),
                JobStatus::Pending | JobStatus::Processing => None,
            };
            let snapshot = job.clone();
            let published = self.shared.publish(self.generation, |s| {
                s.phase = if status.is_terminal() {
                    ImportPhase::Done
                } else {
                    ImportPhase::Polling
                };
                s.job = Some(snapshot);
                if let Some(notice) = notice {
                    s.notice = Some(notice);
                }
            });
            if !published {
                return ImportOutcome::Cancelled;
            }

            if status.is_terminal() {
                tracing::info!(
                    job_id = %job_id,
                    status = %status,
                    errors = job.errors.len(),
                    "Import job finished"
                );
                return ImportOutcome::from_terminal(job);
            }
            last_known = job;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::import_state::NoticeLevel;
    use async_trait::async_trait;
    use std::collections::{HashMap, VecDeque};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::oneshot::error::TryRecvError;
    use tokio::time::sleep;

    const PERIOD: Duration = Duration::from_secs(2);

    fn job(id: &str, status: JobStatus, progress: u32) -> ImportJob {
        ImportJob {
            status,
            progress,
            ..ImportJob::pending(id)
        }
    }

    fn server_error(status: u16, detail: Option<&str>) -> ApiError {
        ApiError::Status {
            status,
            detail: detail.map(str::to_string),
        }
    }

    /// Fake API answering from per-job scripts. An exhausted script keeps
    /// reporting the job as `processing`.
    #[derive(Default)]
    struct ScriptedApi {
        uploads: Mutex<VecDeque<Result<String, ApiError>>>,
        statuses: Mutex<HashMap<String, VecDeque<Result<ImportJob, ApiError>>>>,
        calls: Mutex<Vec<(String, Instant)>>,
        latency: Duration,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl ScriptedApi {
        fn upload_ok(self, job_id: &str) -> Self {
            self.uploads.lock().unwrap().push_back(Ok(job_id.to_string()));
            self
        }

        fn upload_err(self, err: ApiError) -> Self {
            self.uploads.lock().unwrap().push_back(Err(err));
            self
        }

        fn status(self, job_id: &str, result: Result<ImportJob, ApiError>) -> Self {
            self.statuses
                .lock()
                .unwrap()
                .entry(job_id.to_string())
                .or_default()
                .push_back(result);
            self
        }

        fn with_latency(mut self, latency: Duration) -> Self {
            self.latency = latency;
            self
        }

        fn calls_for(&self, job_id: &str) -> Vec<Instant> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|(id, _)| id == job_id)
                .map(|(_, at)| *at)
                .collect()
        }
    }

    #[async_trait]
    impl ImportApi for ScriptedApi {
        async fn upload(&self, _file: &ImportFile) -> Result<String, ApiError> {
            self.uploads
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(server_error(500, None)))
        }

        async fn job_status(&self, job_id: &str) -> Result<ImportJob, ApiError> {
            self.calls
                .lock()
                .unwrap()
                .push((job_id.to_string(), Instant::now()));
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            if !self.latency.is_zero() {
                sleep(self.latency).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            let scripted = self
                .statuses
                .lock()
                .unwrap()
                .get_mut(job_id)
                .and_then(|script| script.pop_front());
            scripted.unwrap_or_else(|| Ok(job(job_id, JobStatus::Processing, 10)))
        }
    }

    fn csv() -> ImportFile {
        ImportFile::new("report.csv", b"date,payout\n2024-01-01,1.5\n".to_vec())
    }

    fn poller(api: &Arc<ScriptedApi>) -> ImportPoller {
        let api: Arc<dyn ImportApi> = api.clone();
        ImportPoller::new(api).with_interval(PERIOD)
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_initializes_pending_state() {
        let api = Arc::new(ScriptedApi::default().upload_ok("job-1"));
        let poller = poller(&api);

        let handle = poller.submit(csv()).await.unwrap();
        assert_eq!(handle.job_id(), "job-1");

        let state = poller.state();
        assert_eq!(state.phase, ImportPhase::Polling);
        assert!(state.is_busy());
        assert_eq!(state.job, Some(ImportJob::pending("job-1")));
        assert_eq!(state.notice, Some(Notice::success(UPLOAD_ACCEPTED)));
        // First status check waits one full period.
        assert!(api.calls_for("job-1").is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_status_request_per_period_while_processing() {
        let api = Arc::new(ScriptedApi::default().upload_ok("job-1"));
        let poller = poller(&api);

        let started = Instant::now();
        let mut handle = poller.submit(csv()).await.unwrap();
        sleep(Duration::from_millis(6_100)).await;

        let calls = api.calls_for("job-1");
        assert_eq!(calls.len(), 3);
        for (i, at) in calls.iter().enumerate() {
            assert_eq!(*at - started, PERIOD * (i as u32 + 1));
        }
        assert!(matches!(handle.outcome.try_recv(), Err(TryRecvError::Empty)));
        assert_eq!(poller.state().phase, ImportPhase::Polling);
    }

    #[tokio::test(start_paused = true)]
    async fn test_completion_fires_once_and_stops_polling() {
        let api = Arc::new(
            ScriptedApi::default()
                .upload_ok("job-1")
                .status("job-1", Ok(job("job-1", JobStatus::Processing, 30)))
                .status("job-1", Ok(job("job-1", JobStatus::Processing, 60)))
                .status("job-1", Ok(job("job-1", JobStatus::Completed, 100))),
        );
        let poller = poller(&api);
        let mut states = poller.subscribe();

        let handle = poller.submit(csv()).await.unwrap();
        let outcome = handle.outcome().await;

        match outcome {
            ImportOutcome::Completed(job) => assert_eq!(job.progress, 100),
            other => panic!("expected completion, got {other:?}"),
        }
        assert_eq!(api.calls_for("job-1").len(), 3);

        let state = states.borrow_and_update().clone();
        assert_eq!(state.phase, ImportPhase::Done);
        assert!(!state.is_busy());
        assert_eq!(state.notice, Some(Notice::success(IMPORT_COMPLETED)));

        sleep(PERIOD * 5).await;
        assert_eq!(api.calls_for("job-1").len(), 3);
        assert!(!states.has_changed().unwrap_or(false));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_job_keeps_server_errors() {
        let failed = ImportJob {
            errors: vec!["Row 2: invalid date".into(), "Row 7: missing payout".into()],
            ..job("job-1", JobStatus::Failed, 50)
        };
        let api = Arc::new(
            ScriptedApi::default()
                .upload_ok("job-1")
                .status("job-1", Ok(job("job-1", JobStatus::Processing, 20)))
                .status("job-1", Ok(failed.clone())),
        );
        let poller = poller(&api);

        let outcome = poller.submit(csv()).await.unwrap().outcome().await;
        assert_eq!(outcome, ImportOutcome::Failed(failed.clone()));

        let state = poller.state();
        assert_eq!(state.phase, ImportPhase::Done);
        assert_eq!(state.job.as_ref().map(|j| j.errors.clone()), Some(failed.errors.clone()));
        let notice = state.notice.unwrap();
        assert_eq!(notice.level, NoticeLevel::Error);
        assert_eq!(notice.text, IMPORT_FAILED);

        match outcome.into_result() {
            Err(ImportError::JobFailed { job_id, errors }) => {
                assert_eq!(job_id, "job-1");
                assert_eq!(errors, failed.errors);
            }
            other => panic!("expected JobFailed, got {other:?}"),
        }

        sleep(PERIOD * 3).await;
        assert_eq!(api.calls_for("job-1").len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_error_keeps_last_known_state() {
        let api = Arc::new(
            ScriptedApi::default()
                .upload_ok("job-1")
                .status("job-1", Ok(job("job-1", JobStatus::Processing, 40)))
                .status("job-1", Err(server_error(503, None))),
        );
        let poller = poller(&api);

        let outcome = poller.submit(csv()).await.unwrap().outcome().await;
        match &outcome {
            ImportOutcome::StatusCheckFailed { last_known, .. } => {
                assert_eq!(last_known.status, JobStatus::Processing);
                assert_eq!(last_known.progress, 40);
            }
            other => panic!("expected status check failure, got {other:?}"),
        }

        let state = poller.state();
        assert_eq!(state.phase, ImportPhase::Errored);
        assert!(!state.is_busy());
        assert_eq!(state.job, Some(job("job-1", JobStatus::Processing, 40)));
        assert_eq!(state.notice, Some(Notice::error(STATUS_CHECK_FAILED)));
        assert_ne!(STATUS_CHECK_FAILED, IMPORT_FAILED);

        sleep(PERIOD * 3).await;
        assert_eq!(api.calls_for("job-1").len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_upload_failure_does_not_poll() {
        let api = Arc::new(
            ScriptedApi::default().upload_err(server_error(400, Some("File must be CSV"))),
        );
        let poller = poller(&api);

        let err = poller.submit(csv()).await.unwrap_err();
        assert!(matches!(err, ImportError::Upload(_)));
        assert_eq!(err.to_string(), "Upload failed: File must be CSV");

        let state = poller.state();
        assert_eq!(state.phase, ImportPhase::Errored);
        assert!(state.job.is_none());
        assert_eq!(
            state.notice,
            Some(Notice::error("Upload failed: File must be CSV"))
        );

        sleep(PERIOD * 3).await;
        assert!(api.calls.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_submit_supersedes_previous_loop() {
        let api = Arc::new(ScriptedApi::default().upload_ok("job-a").upload_ok("job-b"));
        let poller = poller(&api);

        let first = poller.submit(csv()).await.unwrap();
        sleep(Duration::from_millis(2_500)).await;
        assert_eq!(api.calls_for("job-a").len(), 1);

        let second = poller.submit(csv()).await.unwrap();
        assert_eq!(first.outcome().await, ImportOutcome::Cancelled);

        sleep(Duration::from_millis(4_100)).await;
        assert_eq!(api.calls_for("job-a").len(), 1);
        assert_eq!(api.calls_for("job-b").len(), 2);
        assert_eq!(poller.state().job_id(), Some("job-b"));
        assert_eq!(second.job_id(), "job-b");
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_tears_down_loop() {
        let api = Arc::new(ScriptedApi::default().upload_ok("job-1"));
        let poller = poller(&api);
        let states = poller.subscribe();

        let handle = poller.submit(csv()).await.unwrap();
        sleep(Duration::from_millis(2_100)).await;
        assert_eq!(api.calls_for("job-1").len(), 1);

        drop(poller);
        assert_eq!(handle.outcome().await, ImportOutcome::Cancelled);

        sleep(PERIOD * 5).await;
        assert_eq!(api.calls_for("job-1").len(), 1);
        assert_eq!(states.borrow().phase, ImportPhase::Polling);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_and_shutdown_are_idempotent() {
        let api = Arc::new(ScriptedApi::default().upload_ok("job-1"));
        let poller = poller(&api);

        // Nothing to cancel yet.
        poller.cancel();
        assert_eq!(poller.state(), ImportState::default());

        let handle = poller.submit(csv()).await.unwrap();
        poller.cancel();
        poller.cancel();

        let state = poller.state();
        assert_eq!(state.phase, ImportPhase::Idle);
        assert_eq!(state.job_id(), Some("job-1"));
        assert_eq!(handle.outcome().await, ImportOutcome::Cancelled);

        poller.shutdown();
        poller.shutdown();
        assert!(matches!(
            poller.submit(csv()).await,
            Err(ImportError::Cancelled)
        ));
        assert!(api.calls_for("job-1").is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_still_reaches_terminal_state() {
        let api = Arc::new(
            ScriptedApi::default()
                .upload_ok("job-1")
                .status("job-1", Ok(job("job-1", JobStatus::Processing, 50)))
                .status("job-1", Ok(job("job-1", JobStatus::Completed, 100))),
        );
        let api_dyn: Arc<dyn ImportApi> = api.clone();
        let poller = ImportPoller::new(api_dyn).with_interval(Duration::ZERO);
        assert_eq!(poller.interval(), MIN_POLL_INTERVAL);

        let outcome = poller.submit(csv()).await.unwrap().outcome().await;
        assert!(outcome.is_completed());

        let state = poller.state();
        assert_eq!(state.phase, ImportPhase::Done);
        assert!(!state.is_busy());
        assert_eq!(api.calls_for("job-1").len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_status_checks_never_overlap() {
        let latency = Duration::from_secs(5);
        let api = Arc::new(
            ScriptedApi::default()
                .upload_ok("job-1")
                .with_latency(latency),
        );
        let poller = poller(&api);

        let _handle = poller.submit(csv()).await.unwrap();
        sleep(Duration::from_secs(20)).await;

        assert_eq!(api.max_in_flight.load(Ordering::SeqCst), 1);
        let calls = api.calls_for("job-1");
        assert!(calls.len() >= 3);
        for pair in calls.windows(2) {
            assert!(pair[1] - pair[0] >= latency);
        }
    }
}
