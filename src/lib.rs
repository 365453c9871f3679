//! coursegen: Chapter Generation Job Client
//!
//! Submits generation requests for book chapters, tracks the resulting jobs by
//! polling their status, maps status to display stages, and refreshes a
//! chapter's artifacts when a job finishes.

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod poller;
pub mod refresh;
pub mod request;
pub mod service;
pub mod session;
pub mod stage;
pub mod submit;
pub mod types;

pub use error::{CoreError, TransportError, ValidationError};
pub use poller::{CompletionEvent, CompletionHandler, JobPoller, PollPolicy, PollerState, Terminal};
pub use refresh::ArtifactRefreshCoordinator;
pub use request::{GenerationRequest, GenerationRequestBuilder};
pub use service::{
    ArtifactStore, ChapterDirectory, GenerationService, HttpApiClient, JobStore, ProviderCatalog,
};
pub use session::{SessionEvent, SessionState, TrackingView};
pub use stage::{resolve, Stage, StageView};
pub use submit::JobSubmitter;
pub use types::{Artifact, ArtifactType, Chapter, JobId, JobSnapshot, JobStatus, ProviderListing};
