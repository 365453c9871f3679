//! Job Poller
//!
//! One polling loop per tracked job. Each `start` opens a new epoch on the
//! session's [`Slot`]; every fetch result is applied only while its captured
//! epoch is still current, so a stopped or superseded loop can never mutate the
//! slot or fire a completion, even if its last fetch resolves late.

use crate::error::TransportError;
use crate::service::JobStore;
use crate::session::SessionEvent;
use crate::stage::{resolve_snapshot, StageView};
use crate::types::{JobId, JobSnapshot, JobStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Notify};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Timing and failure policy for a polling loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollPolicy {
    /// Delay before the next fetch after a successful, non-terminal fetch.
    pub success_interval: Duration,
    /// Delay before the next fetch after a failed fetch.
    pub failure_interval: Duration,
    /// Stop and report the job as stalled after this many failures in a row.
    /// `None` retries forever.
    pub max_consecutive_failures: Option<u32>,
    /// Per-fetch deadline; an expired fetch counts as a failure. `None` waits
    /// for the fetch to settle.
    pub fetch_timeout: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            success_interval: Duration::from_millis(1200),
            failure_interval: Duration::from_millis(2000),
            max_consecutive_failures: None,
            fetch_timeout: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PollerState {
    Idle,
    Polling,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Terminal {
    Finished,
    Failed,
}

/// Payload of the one-time completion notification for an epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionEvent {
    pub job_id: JobId,
    pub terminal: Terminal,
    pub snapshot: JobSnapshot,
}

impl CompletionEvent {
    fn from_snapshot(snapshot: JobSnapshot) -> Option<Self> {
        let terminal = match snapshot.status {
            JobStatus::Finished => Terminal::Finished,
            JobStatus::Failed => Terminal::Failed,
            _ => return None,
        };
        Some(Self {
            job_id: snapshot.id.clone(),
            terminal,
            snapshot,
        })
    }

    pub fn is_finished(&self) -> bool {
        self.terminal == Terminal::Finished
    }
}

/// Receives the completion of a tracked job, at most once per epoch.
#[async_trait]
pub trait CompletionHandler: Send + Sync {
    async fn on_complete(&self, event: &CompletionEvent);
}

#[derive(Debug, Default)]
struct SlotInner {
    epoch: u64,
    job_id: Option<JobId>,
    snapshot: Option<JobSnapshot>,
    state: Option<PollerState>,
    consecutive_failures: u32,
    stalled: bool,
    completed_epoch: Option<u64>,
    last_polled_at: Option<DateTime<Utc>>,
}

/// Outcome of applying a successful fetch.
#[derive(Debug, PartialEq)]
pub(crate) enum Applied {
    /// The fetch belongs to an older epoch and was discarded.
    Stale,
    Progress,
    /// Terminal status observed. `event` is `Some` only the first time for the epoch.
    Terminal { event: Option<CompletionEvent> },
}

/// Outcome of applying a failed fetch.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Failure {
    Stale,
    Retry { failures: u32 },
    Stalled { failures: u32 },
}

/// Point-in-time copy of a slot, for display.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotSnapshot {
    pub epoch: u64,
    pub job_id: Option<JobId>,
    pub snapshot: Option<JobSnapshot>,
    pub consecutive_failures: u32,
    pub stalled: bool,
    pub last_polled_at: Option<DateTime<Utc>>,
}

/// Session-owned tracking state: the epoch counter, the held job snapshot and
/// the event channel. Every mutation checks the caller's epoch under the lock.
pub(crate) struct Slot {
    inner: Mutex<SlotInner>,
    events: broadcast::Sender<SessionEvent>,
}

impl Slot {
    pub(crate) fn new(event_capacity: usize) -> Self {
        let (events, _) = broadcast::channel(event_capacity.max(1));
        Self {
            inner: Mutex::new(SlotInner::default()),
            events,
        }
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub(crate) fn epoch(&self) -> u64 {
        self.inner.lock().epoch
    }

    /// Open a new epoch for `job_id` and return it.
    pub(crate) fn begin(&self, job_id: &JobId) -> u64 {
        let mut inner = self.inner.lock();
        inner.epoch += 1;
        inner.job_id = Some(job_id.clone());
        inner.snapshot = None;
        inner.state = Some(PollerState::Polling);
        inner.consecutive_failures = 0;
        inner.stalled = false;
        inner.last_polled_at = None;
        inner.epoch
    }

    /// Invalidate `epoch` if it is still current. Returns whether it was.
    pub(crate) fn end(&self, epoch: u64) -> bool {
        let mut inner = self.inner.lock();
        if inner.epoch != epoch {
            return false;
        }
        inner.epoch += 1;
        inner.state = Some(PollerState::Stopped);
        true
    }

    /// Drop the tracked job and its snapshot, invalidating any running epoch.
    pub(crate) fn reset(&self) {
        let mut inner = self.inner.lock();
        let epoch = inner.epoch + 1;
        let completed_epoch = inner.completed_epoch;
        *inner = SlotInner {
            epoch,
            completed_epoch,
            ..SlotInner::default()
        };
    }

    pub(crate) fn state_for(&self, epoch: u64) -> PollerState {
        let inner = self.inner.lock();
        if inner.epoch != epoch {
            return PollerState::Stopped;
        }
        inner.state.unwrap_or(PollerState::Idle)
    }

    pub(crate) fn snapshot(&self) -> SlotSnapshot {
        let inner = self.inner.lock();
        SlotSnapshot {
            epoch: inner.epoch,
            job_id: inner.job_id.clone(),
            snapshot: inner.snapshot.clone(),
            consecutive_failures: inner.consecutive_failures,
            stalled: inner.stalled,
            last_polled_at: inner.last_polled_at,
        }
    }

    pub(crate) fn apply_success(&self, epoch: u64, snapshot: JobSnapshot) -> Applied {
        let mut inner = self.inner.lock();
        if inner.epoch != epoch {
            return Applied::Stale;
        }
        inner.consecutive_failures = 0;
        inner.last_polled_at = Some(Utc::now());
        inner.snapshot = Some(snapshot.clone());
        let stage = resolve_snapshot(&snapshot);
        self.publish(SessionEvent::Snapshot {
            snapshot: snapshot.clone(),
            stage,
        });

        if !snapshot.status.is_terminal() {
            return Applied::Progress;
        }
        inner.state = Some(PollerState::Stopped);
        if inner.completed_epoch == Some(epoch) {
            return Applied::Terminal { event: None };
        }
        inner.completed_epoch = Some(epoch);
        let event = CompletionEvent::from_snapshot(snapshot);
        if let Some(event) = &event {
            self.publish(SessionEvent::Completed(event.clone()));
        }
        Applied::Terminal { event }
    }

    pub(crate) fn apply_failure(&self, epoch: u64, policy: &PollPolicy) -> Failure {
        let mut inner = self.inner.lock();
        if inner.epoch != epoch {
            return Failure::Stale;
        }
        inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);
        let failures = inner.consecutive_failures;
        match policy.max_consecutive_failures {
            Some(limit) if failures >= limit => {
                inner.stalled = true;
                inner.state = Some(PollerState::Stopped);
                if let Some(job_id) = inner.job_id.clone() {
                    self.publish(SessionEvent::Stalled { job_id, failures });
                }
                Failure::Stalled { failures }
            }
            _ => Failure::Retry { failures },
        }
    }

    fn publish(&self, event: SessionEvent) {
        // No receivers is fine; the read view still carries the state.
        let _ = self.events.send(event);
    }
}

struct PollRun {
    job_id: JobId,
    epoch: u64,
    cancel: Arc<Notify>,
    _task: JoinHandle<()>,
}

/// A per-job polling state machine: `Idle` until started, `Polling` while its
/// epoch is current and the job is not terminal, `Stopped` afterwards.
pub struct JobPoller {
    slot: Arc<Slot>,
    store: Arc<dyn JobStore>,
    handler: Option<Arc<dyn CompletionHandler>>,
    policy: PollPolicy,
    run: Option<PollRun>,
    started: bool,
}

impl JobPoller {
    pub(crate) fn new(
        slot: Arc<Slot>,
        store: Arc<dyn JobStore>,
        handler: Option<Arc<dyn CompletionHandler>>,
        policy: PollPolicy,
    ) -> Self {
        Self {
            slot,
            store,
            handler,
            policy,
            run: None,
            started: false,
        }
    }

    /// Begin polling `job_id` under a fresh epoch. The first fetch is issued
    /// immediately. A running loop is stopped first.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&mut self, job_id: JobId) {
        self.stop();
        let epoch = self.slot.begin(&job_id);
        let cancel = Arc::new(Notify::new());
        info!(job_id = %job_id, epoch, "Polling job");

        let task = tokio::spawn(poll_loop(PollContext {
            slot: Arc::clone(&self.slot),
            store: Arc::clone(&self.store),
            handler: self.handler.clone(),
            policy: self.policy.clone(),
            job_id: job_id.clone(),
            epoch,
            cancel: Arc::clone(&cancel),
        }));

        self.run = Some(PollRun {
            job_id,
            epoch,
            cancel,
            _task: task,
        });
        self.started = true;
    }

    /// Invalidate the current epoch and cancel the pending tick. An in-flight
    /// fetch may still complete, but its result is discarded.
    pub fn stop(&mut self) {
        if let Some(run) = self.run.take() {
            if self.slot.end(run.epoch) {
                debug!(job_id = %run.job_id, epoch = run.epoch, "Stopped polling job");
            }
            run.cancel.notify_one();
        }
    }

    pub fn state(&self) -> PollerState {
        match &self.run {
            Some(run) => self.slot.state_for(run.epoch),
            None if self.started => PollerState::Stopped,
            None => PollerState::Idle,
        }
    }

    pub fn job_id(&self) -> Option<&JobId> {
        self.run.as_ref().map(|run| &run.job_id)
    }

    pub fn epoch(&self) -> Option<u64> {
        self.run.as_ref().map(|run| run.epoch)
    }
}

impl Drop for JobPoller {
    fn drop(&mut self) {
        self.stop();
    }
}

struct PollContext {
    slot: Arc<Slot>,
    store: Arc<dyn JobStore>,
    handler: Option<Arc<dyn CompletionHandler>>,
    policy: PollPolicy,
    job_id: JobId,
    epoch: u64,
    cancel: Arc<Notify>,
}

async fn fetch(ctx: &PollContext) -> Result<JobSnapshot, TransportError> {
    match ctx.policy.fetch_timeout {
        Some(limit) => match tokio::time::timeout(limit, ctx.store.get(&ctx.job_id)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::no_response(format!(
                "Status fetch timed out after {} ms",
                limit.as_millis()
            ))),
        },
        None => ctx.store.get(&ctx.job_id).await,
    }
}

async fn poll_loop(ctx: PollContext) {
    loop {
        let delay = match fetch(&ctx).await {
            Ok(snapshot) => {
                let status = snapshot.status;
                let progress = snapshot.progress;
                match ctx.slot.apply_success(ctx.epoch, snapshot) {
                    Applied::Stale => {
                        debug!(job_id = %ctx.job_id, epoch = ctx.epoch, "Discarded stale job snapshot");
                        return;
                    }
                    Applied::Progress => {
                        debug!(
                            job_id = %ctx.job_id,
                            epoch = ctx.epoch,
                            status = %status,
                            progress,
                            "Job in progress"
                        );
                        ctx.policy.success_interval
                    }
                    Applied::Terminal { event } => {
                        info!(job_id = %ctx.job_id, epoch = ctx.epoch, status = %status, "Job reached terminal status");
                        if let (Some(event), Some(handler)) = (event, ctx.handler.as_ref()) {
                            handler.on_complete(&event).await;
                        }
                        return;
                    }
                }
            }
            Err(err) => match ctx.slot.apply_failure(ctx.epoch, &ctx.policy) {
                Failure::Stale => return,
                Failure::Retry { failures } => {
                    warn!(
                        job_id = %ctx.job_id,
                        epoch = ctx.epoch,
                        failures,
                        error = %err,
                        "Job status fetch failed, retrying"
                    );
                    ctx.policy.failure_interval
                }
                Failure::Stalled { failures } => {
                    warn!(
                        job_id = %ctx.job_id,
                        epoch = ctx.epoch,
                        failures,
                        error = %err,
                        "Job status polling stalled"
                    );
                    return;
                }
            },
        };

        tokio::select! {
            _ = sleep(delay) => {}
            _ = ctx.cancel.notified() => return,
        }
    }
}

/// Derived stage for a slot snapshot, if one is held.
pub(crate) fn stage_of(snapshot: &SlotSnapshot) -> Option<StageView> {
    snapshot.snapshot.as_ref().map(resolve_snapshot)
}
