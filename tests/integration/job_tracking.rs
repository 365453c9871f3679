//! Job tracking: supersession, stale fetches and once-per-epoch completion

use async_trait::async_trait;
use coursegen::{
    Artifact, ArtifactRefreshCoordinator, ArtifactStore, ArtifactType, CompletionEvent,
    CompletionHandler, JobId, JobSnapshot, JobStatus, JobStore, PollPolicy, PollerState,
    SessionEvent, SessionState, TransportError,
};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Notify};

/// Job store whose responses are scripted per job id. A gated job blocks
/// each fetch until its gate is notified; a job without a script is a 404.
#[derive(Default)]
struct FakeJobStore {
    scripts: Mutex<HashMap<String, VecDeque<JobSnapshot>>>,
    gated: Mutex<HashMap<String, Arc<Notify>>>,
    hang_after: Mutex<HashMap<String, usize>>,
    calls: Mutex<Vec<String>>,
}

impl FakeJobStore {
    fn script(&self, job_id: &str, steps: &[(JobStatus, i64)]) {
        self.scripts.lock().insert(
            job_id.to_string(),
            steps
                .iter()
                .map(|(status, progress)| JobSnapshot::new(job_id, *status, *progress))
                .collect(),
        );
    }

    fn gate(&self, job_id: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gated.lock().insert(job_id.to_string(), gate.clone());
        gate
    }

    /// Fetches after the first `answered` ones never return.
    fn hang_after(&self, job_id: &str, answered: usize) {
        self.hang_after.lock().insert(job_id.to_string(), answered);
    }

    fn calls_for(&self, job_id: &str) -> usize {
        self.calls.lock().iter().filter(|id| id.as_str() == job_id).count()
    }
}

#[async_trait]
impl JobStore for FakeJobStore {
    async fn get(&self, job_id: &JobId) -> Result<JobSnapshot, TransportError> {
        self.calls.lock().push(job_id.to_string());
        let answered = self.hang_after.lock().get(job_id.as_str()).copied();
        if let Some(answered) = answered {
            if self.calls_for(job_id.as_str()) > answered {
                std::future::pending::<()>().await;
            }
        }
        let gate = self.gated.lock().get(job_id.as_str()).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let mut scripts = self.scripts.lock();
        let script = scripts
            .get_mut(job_id.as_str())
            .ok_or_else(|| TransportError::new(Some(404), "Job not found"))?;
        // Repeat the last step once the script runs out
        if script.len() > 1 {
            Ok(script.pop_front().unwrap())
        } else {
            script
                .front()
                .cloned()
                .ok_or_else(|| TransportError::new(Some(404), "Job not found"))
        }
    }
}

#[derive(Default)]
struct RecordingHandler {
    events: Mutex<Vec<CompletionEvent>>,
}

#[async_trait]
impl CompletionHandler for RecordingHandler {
    async fn on_complete(&self, event: &CompletionEvent) {
        self.events.lock().push(event.clone());
    }
}

#[derive(Default)]
struct CountingArtifacts {
    calls: Mutex<usize>,
}

#[async_trait]
impl ArtifactStore for CountingArtifacts {
    async fn list_by_chapter(&self, chapter_id: i64) -> Result<Vec<Artifact>, TransportError> {
        *self.calls.lock() += 1;
        Ok(vec![Artifact {
            id: 1,
            chapter_id,
            artifact_type: ArtifactType::Takeaways,
            content_md: "- borrow, don't own".to_string(),
            content_json: Value::Null,
            provider: "openai".to_string(),
            model: "gpt-4.1-mini".to_string(),
            params_hash: String::new(),
            version: 1,
            created_at: None,
        }])
    }
}

fn drain(events: &mut broadcast::Receiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    seen
}

async fn settle() {
    tokio::time::sleep(Duration::from_secs(10)).await;
}

#[tokio::test(start_paused = true)]
async fn stopped_session_ignores_in_flight_fetch() {
    let store = Arc::new(FakeJobStore::default());
    store.script("job-a", &[(JobStatus::Finished, 100)]);
    let gate = store.gate("job-a");
    let handler = Arc::new(RecordingHandler::default());
    let session = SessionState::new(store.clone(), PollPolicy::default())
        .with_completion_handler(handler.clone());
    let mut events = session.subscribe();

    session.track(JobId::new("job-a"));
    tokio::time::sleep(Duration::from_millis(1)).await;
    assert_eq!(store.calls_for("job-a"), 1);

    session.stop();
    gate.notify_one();
    settle().await;

    assert!(session.view().snapshot.is_none());
    assert!(handler.events.lock().is_empty());
    assert!(drain(&mut events).is_empty());
    assert_eq!(session.poller_state(), PollerState::Stopped);
    assert_eq!(store.calls_for("job-a"), 1);
}

#[tokio::test(start_paused = true)]
async fn superseded_job_has_no_effect() {
    let store = Arc::new(FakeJobStore::default());
    store.script("job-a", &[(JobStatus::Finished, 100)]);
    store.script("job-b", &[(JobStatus::Queued, 0)]);
    let gate = store.gate("job-a");
    let handler = Arc::new(RecordingHandler::default());
    let session = SessionState::new(store.clone(), PollPolicy::default())
        .with_completion_handler(handler.clone());
    let mut events = session.subscribe();

    session.track(JobId::new("job-a"));
    tokio::time::sleep(Duration::from_millis(1)).await;
    let first_epoch = session.epoch();

    session.track(JobId::new("job-b"));
    assert!(session.epoch() > first_epoch);
    gate.notify_one();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let view = session.view();
    assert_eq!(view.job_id, Some(JobId::new("job-b")));
    assert_eq!(view.snapshot.unwrap().status, JobStatus::Queued);
    assert!(handler.events.lock().is_empty());

    let seen = drain(&mut events);
    assert!(!seen.is_empty());
    for event in seen {
        match event {
            SessionEvent::Snapshot { snapshot, .. } => assert_eq!(snapshot.id, JobId::new("job-b")),
            other => panic!("unexpected event {other:?}"),
        }
    }

    // job-a is never polled again
    settle().await;
    assert_eq!(store.calls_for("job-a"), 1);
    assert!(store.calls_for("job-b") > 1);
}

#[tokio::test(start_paused = true)]
async fn completion_refreshes_artifacts_once_per_tracking() {
    let store = Arc::new(FakeJobStore::default());
    store.script(
        "job-a",
        &[
            (JobStatus::Queued, 0),
            (JobStatus::Started, 10),
            (JobStatus::Finished, 100),
        ],
    );
    let artifacts = Arc::new(CountingArtifacts::default());
    let coordinator = Arc::new(ArtifactRefreshCoordinator::new(artifacts.clone(), 42));
    let session = SessionState::new(store.clone(), PollPolicy::default())
        .with_completion_handler(coordinator.clone());

    session.track(JobId::new("job-a"));
    settle().await;
    assert_eq!(*artifacts.calls.lock(), 1);
    assert_eq!(coordinator.available_types().len(), 1);
    assert_eq!(session.poller_state(), PollerState::Stopped);

    // The job stays finished, so only the fresh epoch triggers another refresh
    settle().await;
    assert_eq!(*artifacts.calls.lock(), 1);

    session.track(JobId::new("job-a"));
    settle().await;
    assert_eq!(*artifacts.calls.lock(), 2);
}

#[tokio::test(start_paused = true)]
async fn stages_advance_in_order() {
    let store = Arc::new(FakeJobStore::default());
    store.script(
        "job-a",
        &[
            (JobStatus::Queued, 0),
            (JobStatus::Started, 5),
            (JobStatus::Started, 30),
            (JobStatus::Generating, 80),
            (JobStatus::Finished, 100),
        ],
    );
    let session = SessionState::new(store, PollPolicy::default());
    let events = session.subscribe();
    session.track(JobId::new("job-a"));

    let mut indices = Vec::new();
    let event = session
        .wait_for_completion(events, |_, view| {
            indices.push(view.stage.map(|s| s.index()))
        })
        .await
        .unwrap();

    assert_eq!(event.snapshot.progress, 100);
    assert_eq!(indices, vec![Some(0), Some(1), Some(2), Some(2), Some(3)]);
}

#[tokio::test(start_paused = true)]
async fn polls_at_success_interval_while_running() {
    let store = Arc::new(FakeJobStore::default());
    store.script("job-a", &[(JobStatus::Started, 10)]);
    let session = SessionState::new(store.clone(), PollPolicy::default());
    session.track(JobId::new("job-a"));

    tokio::time::sleep(Duration::from_millis(1)).await;
    assert_eq!(store.calls_for("job-a"), 1);

    // 1200 ms cadence: immediate fetch plus ticks at 1.2s, 2.4s and 3.6s
    tokio::time::sleep(Duration::from_millis(4000)).await;
    assert_eq!(store.calls_for("job-a"), 4);

    session.stop();
    settle().await;
    assert_eq!(store.calls_for("job-a"), 4);
    assert_eq!(session.view().snapshot.unwrap().progress, 10);
}

#[tokio::test(start_paused = true)]
async fn failed_fetches_retry_at_failure_interval() {
    // No script: every fetch is a 404
    let store = Arc::new(FakeJobStore::default());
    let session = SessionState::new(store.clone(), PollPolicy::default());
    session.track(JobId::new("job-x"));

    tokio::time::sleep(Duration::from_millis(1)).await;
    assert_eq!(store.calls_for("job-x"), 1);

    // Past the 1200 ms success interval, short of the 2000 ms failure interval
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(store.calls_for("job-x"), 1);

    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(store.calls_for("job-x"), 2);

    tokio::time::sleep(Duration::from_millis(2000)).await;
    assert_eq!(store.calls_for("job-x"), 3);

    let view = session.view();
    assert_eq!(view.consecutive_failures, 3);
    assert!(view.snapshot.is_none());
    assert_eq!(view.poller_state, PollerState::Polling);
    session.stop();
}

#[tokio::test(start_paused = true)]
async fn expired_fetch_counts_as_failure_and_keeps_snapshot() {
    let store = Arc::new(FakeJobStore::default());
    store.script("job-a", &[(JobStatus::Started, 40)]);
    store.hang_after("job-a", 1);
    let policy = PollPolicy {
        fetch_timeout: Some(Duration::from_millis(500)),
        ..PollPolicy::default()
    };
    let session = SessionState::new(store.clone(), policy);
    session.track(JobId::new("job-a"));

    // Answered at 0 ms; the 1200 ms fetch hangs and expires at 1700 ms
    tokio::time::sleep(Duration::from_millis(1800)).await;
    assert_eq!(store.calls_for("job-a"), 2);
    let view = session.view();
    assert_eq!(view.consecutive_failures, 1);
    assert_eq!(view.poller_state, PollerState::Polling);
    let held = view.snapshot.unwrap();
    assert_eq!(held.status, JobStatus::Started);
    assert_eq!(held.progress, 40);

    // Next attempt follows the 2000 ms failure interval, at 3700 ms
    tokio::time::sleep(Duration::from_millis(1800)).await;
    assert_eq!(store.calls_for("job-a"), 2);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(store.calls_for("job-a"), 3);
    assert_eq!(session.view().consecutive_failures, 1);

    session.stop();
}
