//! Job submission: local validation, then a single forward to the generation service.

use crate::error::CoreError;
use crate::request::GenerationRequest;
use crate::service::GenerationService;
use crate::types::JobId;
use std::sync::Arc;
use tracing::{info, warn};

pub struct JobSubmitter {
    service: Arc<dyn GenerationService>,
}

impl JobSubmitter {
    pub fn new(service: Arc<dyn GenerationService>) -> Self {
        Self { service }
    }

    /// Submit `request` and return the issued job id.
    ///
    /// Invalid requests fail with [`CoreError::Validation`] without touching the
    /// service. Service failures come back as [`CoreError::Submission`] and are
    /// not retried.
    pub async fn submit(&self, request: &GenerationRequest) -> Result<JobId, CoreError> {
        request.validate()?;

        match self.service.submit(request).await {
            Ok(job_id) => {
                info!(
                    job_id = %job_id,
                    book_id = request.book_id,
                    chapter_index = request.chapter_index,
                    outputs = request.outputs.len(),
                    "Submitted generation request"
                );
                Ok(job_id)
            }
            Err(err) => {
                warn!(
                    book_id = request.book_id,
                    chapter_index = request.chapter_index,
                    status = ?err.status,
                    error = %err,
                    "Generation request rejected"
                );
                Err(CoreError::Submission(err))
            }
        }
    }
}
