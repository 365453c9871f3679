//! Wire and domain types shared across the generation client.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Opaque job identifier issued by the generation service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for JobId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Backend-reported job status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Started,
    Generating,
    Finished,
    Failed,
}

impl JobStatus {
    /// `finished` and `failed` end polling for a job id.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Finished | JobStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Started => "started",
            JobStatus::Generating => "generating",
            JobStatus::Finished => "finished",
            JobStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only snapshot of a job as returned by `GET /jobs/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub id: JobId,
    pub status: JobStatus,
    #[serde(default)]
    pub progress: i64,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub payload: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl JobSnapshot {
    pub fn new(id: impl Into<JobId>, status: JobStatus, progress: i64) -> Self {
        Self {
            id: id.into(),
            status,
            progress,
            message: None,
            payload: Map::new(),
            created_at: None,
            updated_at: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Kind of generated chapter artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactType {
    Summary,
    Quiz,
    Lab,
    Takeaways,
}

impl ArtifactType {
    pub const ALL: [ArtifactType; 4] = [
        ArtifactType::Summary,
        ArtifactType::Takeaways,
        ArtifactType::Quiz,
        ArtifactType::Lab,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactType::Summary => "summary",
            ArtifactType::Quiz => "quiz",
            ArtifactType::Lab => "lab",
            ArtifactType::Takeaways => "takeaways",
        }
    }
}

impl fmt::Display for ArtifactType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Tutor,
    Socratic,
    Concise,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Length {
    Short,
    Medium,
    Long,
}

/// Generated artifact as listed by `GET /artifacts/by-chapter/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub id: i64,
    pub chapter_id: i64,
    #[serde(rename = "type")]
    pub artifact_type: ArtifactType,
    #[serde(default)]
    pub content_md: String,
    #[serde(default)]
    pub content_json: Value,
    pub provider: String,
    pub model: String,
    #[serde(default)]
    pub params_hash: String,
    pub version: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Chapter row as listed by `GET /chapters/by-book/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    pub id: i64,
    pub book_id: i64,
    pub index: i64,
    pub title: String,
    #[serde(default)]
    pub word_count: i64,
}

/// One provider entry in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEntry {
    pub id: String,
    #[serde(default)]
    pub models: Vec<String>,
}

/// Response of `GET /providers`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProviderListing {
    #[serde(default)]
    pub default_provider: String,
    #[serde(default)]
    pub providers: Vec<ProviderEntry>,
}

impl ProviderListing {
    pub fn find(&self, provider_id: &str) -> Option<&ProviderEntry> {
        self.providers.iter().find(|p| p.id == provider_id)
    }
}
