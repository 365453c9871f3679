//! Tracking sessions
//!
//! A [`SessionState`] is one tracking slot (for example, one chapter view). It
//! owns at most one active [`JobPoller`]; tracking a new job id stops the
//! previous poller before the new one starts.

use crate::error::CoreError;
use crate::poller::{
    stage_of, CompletionEvent, CompletionHandler, JobPoller, PollPolicy, PollerState, Slot,
};
use crate::refresh::failure_message_of;
use crate::service::JobStore;
use crate::stage::StageView;
use crate::types::{JobId, JobSnapshot};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

const EVENT_CAPACITY: usize = 64;

/// Events published for the session's current epoch only.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Snapshot {
        snapshot: JobSnapshot,
        stage: StageView,
    },
    Completed(CompletionEvent),
    Stalled {
        job_id: JobId,
        failures: u32,
    },
}

/// Read view of a session: latest snapshot plus derived stage.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackingView {
    pub job_id: Option<JobId>,
    pub snapshot: Option<JobSnapshot>,
    pub stage: Option<StageView>,
    pub poller_state: PollerState,
    pub consecutive_failures: u32,
    pub stalled: bool,
    pub last_polled_at: Option<DateTime<Utc>>,
    pub epoch: u64,
}

pub struct SessionState {
    slot: Arc<Slot>,
    store: Arc<dyn JobStore>,
    handler: Option<Arc<dyn CompletionHandler>>,
    policy: PollPolicy,
    poller: Mutex<Option<JobPoller>>,
}

impl SessionState {
    pub fn new(store: Arc<dyn JobStore>, policy: PollPolicy) -> Self {
        Self {
            slot: Arc::new(Slot::new(EVENT_CAPACITY)),
            store,
            handler: None,
            policy,
            poller: Mutex::new(None),
        }
    }

    /// Register the handler invoked once when a tracked job reaches a terminal status.
    pub fn with_completion_handler(mut self, handler: Arc<dyn CompletionHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Track `job_id`, replacing any job tracked so far.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn track(&self, job_id: JobId) {
        let mut guard = self.poller.lock();
        if let Some(previous) = guard.as_mut() {
            if let Some(old) = previous.job_id() {
                debug!(old_job_id = %old, new_job_id = %job_id, "Superseding tracked job");
            }
            previous.stop();
        }
        let mut poller = JobPoller::new(
            Arc::clone(&self.slot),
            Arc::clone(&self.store),
            self.handler.clone(),
            self.policy.clone(),
        );
        poller.start(job_id);
        *guard = Some(poller);
    }

    /// Stop polling, keeping the last snapshot for display.
    pub fn stop(&self) {
        if let Some(poller) = self.poller.lock().as_mut() {
            poller.stop();
        }
    }

    /// Stop polling and drop the held snapshot.
    pub fn clear(&self) {
        let mut guard = self.poller.lock();
        if let Some(mut poller) = guard.take() {
            poller.stop();
        }
        self.slot.reset();
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.slot.subscribe()
    }

    pub fn epoch(&self) -> u64 {
        self.slot.epoch()
    }

    pub fn poller_state(&self) -> PollerState {
        self.poller
            .lock()
            .as_ref()
            .map(JobPoller::state)
            .unwrap_or(PollerState::Idle)
    }

    pub fn view(&self) -> TrackingView {
        let poller_state = self.poller_state();
        let slot = self.slot.snapshot();
        TrackingView {
            stage: stage_of(&slot),
            job_id: slot.job_id,
            snapshot: slot.snapshot,
            poller_state,
            consecutive_failures: slot.consecutive_failures,
            stalled: slot.stalled,
            last_polled_at: slot.last_polled_at,
            epoch: slot.epoch,
        }
    }

    /// Wait for the tracked job's completion.
    ///
    /// `events` must have been obtained from [`subscribe`](Self::subscribe)
    /// before the job was tracked. Resolves with the completion event for
    /// finished jobs and with [`CoreError::JobFailed`] or [`CoreError::Stalled`]
    /// otherwise. `on_snapshot` sees every applied snapshot.
    pub async fn wait_for_completion<F>(
        &self,
        mut events: broadcast::Receiver<SessionEvent>,
        mut on_snapshot: F,
    ) -> Result<CompletionEvent, CoreError>
    where
        F: FnMut(&JobSnapshot, &StageView),
    {
        loop {
            match events.recv().await {
                Ok(SessionEvent::Snapshot { snapshot, stage }) => on_snapshot(&snapshot, &stage),
                Ok(SessionEvent::Completed(event)) => return completion_result(event),
                Ok(SessionEvent::Stalled { job_id, failures }) => {
                    return Err(CoreError::Stalled { job_id, failures })
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Session event receiver lagged");
                }
                Err(RecvError::Closed) => {
                    return Err(CoreError::Internal("Session event channel closed".to_string()))
                }
            }
        }
    }
}

fn completion_result(event: CompletionEvent) -> Result<CompletionEvent, CoreError> {
    if event.is_finished() {
        return Ok(event);
    }
    let message = failure_message_of(&event.snapshot);
    Err(CoreError::JobFailed {
        job_id: event.job_id,
        message,
    })
}
