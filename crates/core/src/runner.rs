//! Background execution of asynchronous jobs.
//!
//! [`JobRunner::submit`] records a `pending` job and returns at once; the
//! operation then runs on a task tracked by a [`TaskTracker`] so shutdown can
//! wait for in-flight jobs. Every state transition is written to the
//! [`JobStore`] first and then announced through the [`JobNotifier`], which
//! keeps per-job events in `pending -> running -> terminal` order.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use tokio_util::task::TaskTracker;

use crate::error::CoreError;
use crate::job::{generate_job_id, Job, INITIAL_RUNNING_PROGRESS};
use crate::job_events::{JobEvent, JobNotifier};
use crate::store::JobStore;
use crate::tools::{execute_sync, ToolExecution, ToolExecutor};
use crate::types::JobId;

/// Owns the lifecycle of every asynchronous job.
///
/// Cheap to clone; clones share the store, executor, notifier and tracker.
#[derive(Clone)]
pub struct JobRunner {
    store: Arc<JobStore>,
    executor: Arc<dyn ToolExecutor>,
    notifier: Arc<dyn JobNotifier>,
    tracker: TaskTracker,
    enabled: bool,
}

impl JobRunner {
    pub fn new(
        store: Arc<JobStore>,
        executor: Arc<dyn ToolExecutor>,
        notifier: Arc<dyn JobNotifier>,
    ) -> Self {
        Self {
            store,
            executor,
            notifier,
            tracker: TaskTracker::new(),
            enabled: true,
        }
    }

    /// Turn asynchronous submission on or off.
    pub fn with_async_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn store(&self) -> &Arc<JobStore> {
        &self.store
    }

    /// Number of job tasks still running.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Record a new `pending` job and schedule it.
    ///
    /// An empty or missing `job_id` gets a generated one. Unknown operations
    /// are rejected here, before anything is stored or spawned.
    pub async fn submit(
        &self,
        job_id: Option<JobId>,
        operation_name: &str,
        parameters: Value,
    ) -> Result<Job, CoreError> {
        if !self.enabled {
            return Err(CoreError::AsyncDisabled);
        }
        self.executor.check_operation(operation_name)?;

        let id = job_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(generate_job_id);

        let job = self.store.create(id, operation_name, parameters).await?;
        tracing::info!(job_id = %job.id, operation = %job.operation_name, "Job submitted");
        self.notify(&job).await;

        let runner = self.clone();
        let scheduled = job.clone();
        self.tracker.spawn(async move { runner.run(scheduled).await });

        Ok(job)
    }

    /// Drive one job from `pending` to a terminal state.
    async fn run(&self, job: Job) {
        let id = job.id;

        match self.store.mark_running(&id, INITIAL_RUNNING_PROGRESS).await {
            Ok(running) => self.notify(&running).await,
            Err(e) => {
                tracing::error!(job_id = %id, error = %e, "Could not start job");
                return;
            }
        }

        // Executed on its own task so a panicking executor still fails the job.
        let executor = Arc::clone(&self.executor);
        let operation = job.operation_name;
        let parameters = job.parameters;
        let handle =
            tokio::spawn(async move { execute_sync(executor.as_ref(), &operation, &parameters).await });

        let finished = match handle.await {
            Ok(Ok(execution)) => {
                let result = merge_result(execution, &id);
                self.store.complete(&id, result).await
            }
            Ok(Err(e)) => self.store.fail(&id, e.to_string()).await,
            Err(join_err) => {
                tracing::error!(job_id = %id, error = %join_err, "Executor task aborted");
                self.store
                    .fail(&id, format!("Execution aborted: {join_err}"))
                    .await
            }
        };

        match finished {
            Ok(job) => {
                tracing::info!(job_id = %job.id, status = %job.status, "Job finished");
                self.notify(&job).await;
            }
            Err(e) => tracing::error!(job_id = %id, error = %e, "Could not record job outcome"),
        }
    }

    async fn notify(&self, job: &Job) {
        self.notifier.notify(JobEvent::from_job(job)).await;
    }

    /// Stop accepting tracked work and wait for running jobs.
    ///
    /// Returns `false` if jobs were still running when `timeout` elapsed.
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        self.tracker.close();
        let in_flight = self.tracker.len();
        if in_flight > 0 {
            tracing::info!(in_flight, "Waiting for running jobs");
        }
        tokio::time::timeout(timeout, self.tracker.wait()).await.is_ok()
    }
}

/// Adapter result plus the runner's bookkeeping fields.
///
/// Non-object results are kept under `output`.
fn merge_result(execution: ToolExecution, job_id: &str) -> Value {
    let execution_time = execution.execution_time();
    let execution_time_ms = execution.elapsed.as_millis() as u64;

    let mut fields = match execution.result {
        Value::Object(map) => map,
        other => {
            let mut map = Map::new();
            map.insert("output".into(), other);
            map
        }
    };
    fields.insert("executionTimeMs".into(), execution_time_ms.into());
    fields.insert("executionTime".into(), execution_time.into());
    fields.insert(
        "completedAt".into(),
        chrono::Utc::now().to_rfc3339().into(),
    );
    fields.insert("jobId".into(), job_id.into());
    Value::Object(fields)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::job::JobStatus;
    use crate::job_events::NoopNotifier;
    use crate::tools::{ExecutorError, ExecutorHealth};

    enum Behavior {
        Succeed,
        Fail,
        Panic,
        Hang,
    }

    struct StubExecutor {
        delay: Duration,
        ceiling: Duration,
        behavior: Behavior,
        calls: AtomicUsize,
    }

    impl StubExecutor {
        fn new(delay_ms: u64, behavior: Behavior) -> Arc<Self> {
            Arc::new(Self {
                delay: Duration::from_millis(delay_ms),
                ceiling: Duration::from_secs(5),
                behavior,
                calls: AtomicUsize::new(0),
            })
        }

        fn hanging(ceiling: Duration) -> Arc<Self> {
            Arc::new(Self {
                delay: Duration::ZERO,
                ceiling,
                behavior: Behavior::Hang,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ToolExecutor for StubExecutor {
        fn operations(&self) -> Vec<String> {
            vec!["verify-A".to_string()]
        }

        fn timeout(&self) -> Duration {
            self.ceiling
        }

        async fn execute(
            &self,
            _operation: &str,
            _parameters: &Value,
        ) -> Result<ToolExecution, ExecutorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            match self.behavior {
                Behavior::Succeed => Ok(ToolExecution {
                    result: json!({"verdict": "VALID"}),
                    elapsed: self.delay,
                }),
                Behavior::Fail => Err(ExecutorError::ExternalProcessFailure {
                    exit_code: 1,
                    detail: "proof circuit failed".into(),
                }),
                Behavior::Panic => panic!("executor bug"),
                Behavior::Hang => {
                    std::future::pending::<()>().await;
                    unreachable!()
                }
            }
        }

        async fn health_check(&self) -> ExecutorHealth {
            ExecutorHealth::connected(json!({}))
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        events: Mutex<Vec<JobEvent>>,
    }

    impl RecordingNotifier {
        fn statuses(&self, job_id: &str) -> Vec<JobStatus> {
            self.events
                .lock()
                .expect("lock")
                .iter()
                .filter(|e| e.job_id == job_id)
                .map(|e| e.status)
                .collect()
        }
    }

    #[async_trait]
    impl JobNotifier for RecordingNotifier {
        async fn notify(&self, event: JobEvent) {
            self.events.lock().expect("lock").push(event);
        }
    }

    fn runner_with(
        executor: Arc<StubExecutor>,
        notifier: Arc<dyn JobNotifier>,
    ) -> JobRunner {
        JobRunner::new(Arc::new(JobStore::new()), executor, notifier)
    }

    async fn wait_terminal(runner: &JobRunner, id: &str) -> Job {
        for _ in 0..200 {
            let job = runner.store().get(id).await.expect("job exists");
            if job.status.is_terminal() {
                return job;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job {id} never reached a terminal state");
    }

    #[tokio::test]
    async fn successful_job_completes_with_merged_result() {
        let runner = runner_with(StubExecutor::new(50, Behavior::Succeed), Arc::new(NoopNotifier));

        let submitted = runner
            .submit(Some("job_1".into()), "verify-A", json!({}))
            .await
            .expect("submit");
        assert_eq!(submitted.id, "job_1");
        assert_eq!(submitted.status, JobStatus::Pending);
        assert_eq!(
            runner.store().get("job_1").await.expect("get").status,
            JobStatus::Pending
        );

        let done = wait_terminal(&runner, "job_1").await;
        assert_eq!(done.status, JobStatus::Completed);
        assert_eq!(done.progress, 100);
        assert!(done.end_time.is_some());
        assert!(done.error.is_none());

        let result = done.result.expect("result");
        assert_eq!(result["verdict"], "VALID");
        assert_eq!(result["jobId"], "job_1");
        assert_eq!(result["executionTimeMs"], 50);
        assert_eq!(result["executionTime"], "50ms");
        assert!(result["completedAt"].is_string());
    }

    #[tokio::test]
    async fn failing_job_records_error_without_result() {
        let runner = runner_with(StubExecutor::new(50, Behavior::Fail), Arc::new(NoopNotifier));
        runner
            .submit(Some("job_2".into()), "verify-A", json!({}))
            .await
            .expect("submit");

        let failed = wait_terminal(&runner, "job_2").await;
        assert_eq!(failed.status, JobStatus::Failed);
        assert!(failed.result.is_none());
        assert!(failed.end_time.is_some());
        assert!(failed
            .error
            .as_deref()
            .is_some_and(|e| e.contains("proof circuit failed")));
    }

    #[tokio::test]
    async fn panicking_executor_fails_the_job() {
        let runner = runner_with(StubExecutor::new(0, Behavior::Panic), Arc::new(NoopNotifier));
        runner
            .submit(Some("job_p".into()), "verify-A", json!({}))
            .await
            .expect("submit");

        let failed = wait_terminal(&runner, "job_p").await;
        assert_eq!(failed.status, JobStatus::Failed);
        assert!(failed.error.is_some());
    }

    #[tokio::test]
    async fn timed_out_job_fails_without_result() {
        let runner = runner_with(
            StubExecutor::hanging(Duration::from_millis(10)),
            Arc::new(NoopNotifier),
        );
        runner
            .submit(Some("job_t".into()), "verify-A", json!({}))
            .await
            .expect("submit");

        let failed = wait_terminal(&runner, "job_t").await;
        assert_eq!(failed.status, JobStatus::Failed);
        assert!(failed.result.is_none());
        assert!(failed.end_time.is_some());
        assert!(failed
            .error
            .as_deref()
            .is_some_and(|e| e.contains("timed out")));
    }

    #[tokio::test]
    async fn each_transition_is_announced_once_in_order() {
        let notifier = Arc::new(RecordingNotifier::default());
        let runner = runner_with(
            StubExecutor::new(5, Behavior::Succeed),
            Arc::clone(&notifier) as Arc<dyn JobNotifier>,
        );

        runner
            .submit(Some("job_1".into()), "verify-A", json!({}))
            .await
            .expect("submit");
        wait_terminal(&runner, "job_1").await;
        assert!(runner.shutdown(Duration::from_secs(1)).await);

        assert_eq!(
            notifier.statuses("job_1"),
            vec![JobStatus::Pending, JobStatus::Running, JobStatus::Completed]
        );
        let events = notifier.events.lock().expect("lock");
        assert_eq!(events[1].progress, 10);
        assert!(events[2].result.is_some());
    }

    #[tokio::test]
    async fn duplicate_id_leaves_first_job_untouched() {
        let executor = StubExecutor::new(50, Behavior::Succeed);
        let runner = runner_with(Arc::clone(&executor), Arc::new(NoopNotifier));

        runner
            .submit(Some("job_1".into()), "verify-A", json!({"first": true}))
            .await
            .expect("submit");
        let err = runner
            .submit(Some("job_1".into()), "verify-A", json!({"second": true}))
            .await
            .unwrap_err();
        assert_matches!(err, CoreError::DuplicateId(id) if id == "job_1");

        let done = wait_terminal(&runner, "job_1").await;
        assert_eq!(done.status, JobStatus::Completed);
        assert_eq!(done.parameters, json!({"first": true}));
        assert_eq!(executor.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unknown_operation_is_rejected_before_storing() {
        let executor = StubExecutor::new(0, Behavior::Succeed);
        let runner = runner_with(Arc::clone(&executor), Arc::new(NoopNotifier));

        let err = runner
            .submit(None, "verify-Z", json!({}))
            .await
            .unwrap_err();
        assert_matches!(
            err,
            CoreError::Executor(ExecutorError::UnknownOperation { .. })
        );
        assert_eq!(runner.store().count().await, 0);
        assert_eq!(runner.in_flight(), 0);
        assert_eq!(executor.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn disabled_runner_rejects_submissions() {
        let runner = runner_with(StubExecutor::new(0, Behavior::Succeed), Arc::new(NoopNotifier))
            .with_async_enabled(false);

        assert_matches!(
            runner.submit(None, "verify-A", json!({})).await,
            Err(CoreError::AsyncDisabled)
        );
        assert_eq!(runner.store().count().await, 0);
    }

    #[tokio::test]
    async fn missing_or_blank_id_is_generated() {
        let runner = runner_with(StubExecutor::new(0, Behavior::Succeed), Arc::new(NoopNotifier));

        let a = runner.submit(None, "verify-A", json!({})).await.expect("submit");
        let b = runner
            .submit(Some("  ".into()), "verify-A", json!({}))
            .await
            .expect("submit");
        assert!(a.id.starts_with("job_"));
        assert!(b.id.starts_with("job_"));
        assert_ne!(a.id, b.id);
    }

    #[tokio::test]
    async fn shutdown_waits_for_running_jobs() {
        let runner = runner_with(StubExecutor::new(50, Behavior::Succeed), Arc::new(NoopNotifier));
        runner
            .submit(Some("job_1".into()), "verify-A", json!({}))
            .await
            .expect("submit");

        assert!(runner.shutdown(Duration::from_secs(2)).await);
        assert_eq!(
            runner.store().get("job_1").await.expect("get").status,
            JobStatus::Completed
        );
    }

    #[test]
    fn non_object_result_is_wrapped() {
        let merged = merge_result(
            ToolExecution {
                result: json!("plain text"),
                elapsed: Duration::from_millis(7),
            },
            "job_x",
        );
        assert_eq!(merged["output"], "plain text");
        assert_eq!(merged["executionTime"], "7ms");
        assert_eq!(merged["jobId"], "job_x");
    }
}
