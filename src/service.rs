//! Generation API Collaborators
//!
//! Traits for the external services the generation core talks to, plus
//! [`HttpApiClient`], which implements all of them against the CourseGen HTTP
//! API. Keeping the traits separate lets the poller and session be driven by
//! in-memory fakes.

use crate::error::TransportError;
use crate::request::GenerationRequest;
use crate::types::{Artifact, Chapter, JobId, JobSnapshot, ProviderListing};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Accepts generation requests and issues job ids.
#[async_trait]
pub trait GenerationService: Send + Sync {
    async fn submit(&self, request: &GenerationRequest) -> Result<JobId, TransportError>;
}

/// Read access to job snapshots.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn get(&self, job_id: &JobId) -> Result<JobSnapshot, TransportError>;
}

/// Lists generated artifacts for a chapter.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn list_by_chapter(&self, chapter_id: i64) -> Result<Vec<Artifact>, TransportError>;
}

/// Provider/model catalog used to pick request defaults.
#[async_trait]
pub trait ProviderCatalog: Send + Sync {
    async fn list(&self) -> Result<ProviderListing, TransportError>;
}

/// Chapter lookup, used to map a chapter index to the id artifacts are keyed by.
#[async_trait]
pub trait ChapterDirectory: Send + Sync {
    async fn list_by_book(&self, book_id: i64) -> Result<Vec<Chapter>, TransportError>;

    async fn find_chapter(
        &self,
        book_id: i64,
        chapter_index: i64,
    ) -> Result<Option<Chapter>, TransportError> {
        Ok(self
            .list_by_book(book_id)
            .await?
            .into_iter()
            .find(|c| c.index == chapter_index))
    }
}

pub const DEFAULT_API_BASE: &str = "http://localhost:8000";

/// HTTP client settings.
#[derive(Debug, Clone)]
pub struct HttpClientOptions {
    pub connect_timeout: Duration,
    /// Whole-request timeout. `None` leaves requests unbounded.
    pub request_timeout: Option<Duration>,
}

impl Default for HttpClientOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: None,
        }
    }
}

#[derive(Deserialize)]
struct GenerateResponse {
    job_id: JobId,
}

/// reqwest-backed client for the CourseGen API.
#[derive(Clone)]
pub struct HttpApiClient {
    client: Client,
    base_url: String,
}

impl HttpApiClient {
    pub fn new(base_url: impl Into<String>, options: &HttpClientOptions) -> Result<Self, TransportError> {
        let mut builder = Client::builder()
            .no_proxy()
            .connect_timeout(options.connect_timeout);
        if let Some(timeout) = options.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| {
            TransportError::no_response(format!("Failed to create HTTP client: {}", e))
        })?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, TransportError> {
        debug!(path = %path, "GET");
        let response = self.client.get(self.url(path)).send().await?;
        decode(response).await
    }
}

/// Map non-2xx responses to `TransportError` with the body text, otherwise decode JSON.
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, TransportError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(TransportError::new(Some(status.as_u16()), body));
    }
    response.json::<T>().await.map_err(TransportError::from)
}

#[async_trait]
impl GenerationService for HttpApiClient {
    async fn submit(&self, request: &GenerationRequest) -> Result<JobId, TransportError> {
        debug!(
            book_id = request.book_id,
            chapter_index = request.chapter_index,
            provider = %request.provider,
            model = %request.model,
            "POST /generate"
        );
        let response = self
            .client
            .post(self.url("/generate"))
            .json(request)
            .send()
            .await?;
        let body: GenerateResponse = decode(response).await?;
        Ok(body.job_id)
    }
}

#[async_trait]
impl JobStore for HttpApiClient {
    async fn get(&self, job_id: &JobId) -> Result<JobSnapshot, TransportError> {
        self.get_json(&format!("/jobs/{}", job_id)).await
    }
}

#[async_trait]
impl ArtifactStore for HttpApiClient {
    async fn list_by_chapter(&self, chapter_id: i64) -> Result<Vec<Artifact>, TransportError> {
        self.get_json(&format!("/artifacts/by-chapter/{}", chapter_id))
            .await
    }
}

#[async_trait]
impl ProviderCatalog for HttpApiClient {
    async fn list(&self) -> Result<ProviderListing, TransportError> {
        self.get_json("/providers").await
    }
}

#[async_trait]
impl ChapterDirectory for HttpApiClient {
    async fn list_by_book(&self, book_id: i64) -> Result<Vec<Chapter>, TransportError> {
        self.get_json(&format!("/chapters/by-book/{}", book_id))
            .await
    }
}
