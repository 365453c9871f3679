//! Artifact refresh on job completion.

use crate::error::TransportError;
use crate::poller::{CompletionEvent, CompletionHandler, Terminal};
use crate::service::ArtifactStore;
use crate::types::{Artifact, ArtifactType, JobSnapshot};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, warn};

pub const DEFAULT_FAILURE_MESSAGE: &str = "Generation failed";

/// Message shown for a failed job; empty or missing messages fall back to
/// [`DEFAULT_FAILURE_MESSAGE`].
pub fn failure_message_of(snapshot: &JobSnapshot) -> String {
    snapshot
        .message
        .as_deref()
        .filter(|m| !m.is_empty())
        .unwrap_or(DEFAULT_FAILURE_MESSAGE)
        .to_string()
}

#[derive(Debug, Default)]
struct RefreshState {
    artifacts: Vec<Artifact>,
    failure_message: Option<String>,
    last_error: Option<TransportError>,
    refreshes: usize,
}

/// Completion handler that re-lists a chapter's artifacts when a job finishes,
/// and records the failure message when it fails.
pub struct ArtifactRefreshCoordinator {
    store: Arc<dyn ArtifactStore>,
    chapter_id: i64,
    state: RwLock<RefreshState>,
}

impl ArtifactRefreshCoordinator {
    pub fn new(store: Arc<dyn ArtifactStore>, chapter_id: i64) -> Self {
        Self {
            store,
            chapter_id,
            state: RwLock::new(RefreshState::default()),
        }
    }

    pub fn chapter_id(&self) -> i64 {
        self.chapter_id
    }

    /// Load the current listing without waiting for a job.
    pub async fn refresh(&self) -> Result<Vec<Artifact>, TransportError> {
        let result = self.store.list_by_chapter(self.chapter_id).await;
        let mut state = self.state.write();
        state.refreshes += 1;
        match &result {
            Ok(artifacts) => {
                state.artifacts = artifacts.clone();
                state.last_error = None;
            }
            Err(err) => state.last_error = Some(err.clone()),
        }
        result
    }

    pub fn artifacts(&self) -> Vec<Artifact> {
        self.state.read().artifacts.clone()
    }

    /// Highest-version artifact of `artifact_type`.
    pub fn latest(&self, artifact_type: ArtifactType) -> Option<Artifact> {
        latest_of(&self.state.read().artifacts, artifact_type).cloned()
    }

    pub fn available_types(&self) -> BTreeSet<ArtifactType> {
        self.state
            .read()
            .artifacts
            .iter()
            .map(|a| a.artifact_type)
            .collect()
    }

    /// Message of the last failed job, if the last completion was a failure.
    pub fn failure_message(&self) -> Option<String> {
        self.state.read().failure_message.clone()
    }

    /// Error from the last listing call, if it failed.
    pub fn last_error(&self) -> Option<TransportError> {
        self.state.read().last_error.clone()
    }

    /// Number of listing calls made so far.
    pub fn refresh_count(&self) -> usize {
        self.state.read().refreshes
    }
}

pub fn latest_of(artifacts: &[Artifact], artifact_type: ArtifactType) -> Option<&Artifact> {
    artifacts
        .iter()
        .filter(|a| a.artifact_type == artifact_type)
        .max_by_key(|a| a.version)
}

#[async_trait]
impl CompletionHandler for ArtifactRefreshCoordinator {
    async fn on_complete(&self, event: &CompletionEvent) {
        match event.terminal {
            Terminal::Finished => {
                self.state.write().failure_message = None;
                match self.refresh().await {
                    Ok(artifacts) => info!(
                        job_id = %event.job_id,
                        chapter_id = self.chapter_id,
                        artifacts = artifacts.len(),
                        "Refreshed chapter artifacts"
                    ),
                    Err(err) => warn!(
                        job_id = %event.job_id,
                        chapter_id = self.chapter_id,
                        error = %err,
                        "Artifact refresh failed"
                    ),
                }
            }
            Terminal::Failed => {
                let message = failure_message_of(&event.snapshot);
                warn!(job_id = %event.job_id, message = %message, "Generation job failed");
                self.state.write().failure_message = Some(message);
            }
        }
    }
}
