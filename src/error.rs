//! Error types for the CourseGen generation client.

use crate::types::JobId;
use thiserror::Error;

/// Local precondition failures detected before any request leaves the process.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("At least one output must be requested")]
    EmptyOutputs,

    #[error("Book id must be positive, got {0}")]
    InvalidBookId(i64),

    #[error("Chapter index must be >= 1, got {0}")]
    InvalidChapterIndex(i64),

    #[error("Temperature must lie in [0.0, 1.5], got {0}")]
    TemperatureOutOfRange(f64),

    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    #[error("Provider '{provider}' does not advertise model '{model}'")]
    UnknownModel { provider: String, model: String },

    #[error("Provider catalog is empty")]
    EmptyCatalog,
}

/// A failed call to one of the HTTP collaborators.
///
/// `status` is `None` when no response was received (connect failure, timeout,
/// undecodable body).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", describe_transport(.status, .body))]
pub struct TransportError {
    pub status: Option<u16>,
    pub body: String,
}

fn describe_transport(status: &Option<u16>, body: &String) -> String {
    match status {
        Some(code) => format!("Request failed with status {}: {}", code, body),
        None => format!("Request failed: {}", body),
    }
}

impl TransportError {
    pub fn new(status: Option<u16>, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn no_response(body: impl Into<String>) -> Self {
        Self::new(None, body)
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(error: reqwest::Error) -> Self {
        let status = error.status().map(|s| s.as_u16());
        if error.is_timeout() {
            TransportError::new(status, format!("Request timeout: {}", error))
        } else if error.is_connect() {
            TransportError::new(status, format!("Connection error: {}", error))
        } else if error.is_decode() {
            TransportError::new(status, format!("Invalid response body: {}", error))
        } else {
            TransportError::new(status, format!("HTTP error: {}", error))
        }
    }
}

/// Errors surfaced to callers of the generation core.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid generation request: {0}")]
    Validation(#[from] ValidationError),

    #[error("Submission rejected: {0}")]
    Submission(TransportError),

    #[error("{0}")]
    Transport(#[from] TransportError),

    #[error("Job {job_id} failed: {message}")]
    JobFailed { job_id: JobId, message: String },

    #[error("Job {job_id} stalled after {failures} consecutive poll failures")]
    Stalled { job_id: JobId, failures: u32 },

    #[error("Configuration error: {0}")]
    Config(String),

    /// Rendering command output failed.
    #[error("Output error: {0}")]
    Output(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for CoreError {
    fn from(err: config::ConfigError) -> Self {
        CoreError::Config(err.to_string())
    }
}
