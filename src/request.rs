//! Generation requests
//!
//! A [`GenerationRequest`] is the body of `POST /generate`. Requests are built
//! with [`GenerationRequestBuilder`], which fills provider and model defaults
//! from the provider catalog and rejects combinations the catalog does not
//! advertise.

use crate::error::ValidationError;
use crate::types::{ArtifactType, Difficulty, Length, ProviderListing, Tone};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const MIN_TEMPERATURE: f64 = 0.0;
pub const MAX_TEMPERATURE: f64 = 1.5;
pub const DEFAULT_TEMPERATURE: f64 = 0.3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub book_id: i64,
    pub chapter_index: i64,
    pub outputs: BTreeSet<ArtifactType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone: Option<Tone>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<Length>,
    pub include_code: bool,
    pub temperature: f64,
    pub provider: String,
    pub model: String,
}

impl GenerationRequest {
    /// Check the preconditions that can be decided without the network.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.outputs.is_empty() {
            return Err(ValidationError::EmptyOutputs);
        }
        if self.book_id <= 0 {
            return Err(ValidationError::InvalidBookId(self.book_id));
        }
        if self.chapter_index < 1 {
            return Err(ValidationError::InvalidChapterIndex(self.chapter_index));
        }
        // NaN fails the range check as well
        if !(MIN_TEMPERATURE..=MAX_TEMPERATURE).contains(&self.temperature) {
            return Err(ValidationError::TemperatureOutOfRange(self.temperature));
        }
        Ok(())
    }

    /// Check that `provider`/`model` name an advertised catalog entry.
    pub fn validate_against(&self, listing: &ProviderListing) -> Result<(), ValidationError> {
        let entry = listing
            .find(&self.provider)
            .ok_or_else(|| ValidationError::UnknownProvider(self.provider.clone()))?;
        if !entry.models.iter().any(|m| m == &self.model) {
            return Err(ValidationError::UnknownModel {
                provider: self.provider.clone(),
                model: self.model.clone(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct GenerationRequestBuilder {
    book_id: i64,
    chapter_index: i64,
    outputs: Option<BTreeSet<ArtifactType>>,
    difficulty: Option<Difficulty>,
    tone: Option<Tone>,
    length: Option<Length>,
    include_code: bool,
    temperature: f64,
    provider: Option<String>,
    model: Option<String>,
}

impl GenerationRequestBuilder {
    pub fn new(book_id: i64, chapter_index: i64) -> Self {
        Self {
            book_id,
            chapter_index,
            outputs: None,
            difficulty: None,
            tone: None,
            length: None,
            include_code: true,
            temperature: DEFAULT_TEMPERATURE,
            provider: None,
            model: None,
        }
    }

    /// Replace the requested outputs. Duplicates collapse.
    pub fn outputs<I>(mut self, outputs: I) -> Self
    where
        I: IntoIterator<Item = ArtifactType>,
    {
        self.outputs = Some(outputs.into_iter().collect());
        self
    }

    pub fn difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = Some(difficulty);
        self
    }

    pub fn tone(mut self, tone: Tone) -> Self {
        self.tone = Some(tone);
        self
    }

    pub fn length(mut self, length: Length) -> Self {
        self.length = Some(length);
        self
    }

    pub fn include_code(mut self, include_code: bool) -> Self {
        self.include_code = include_code;
        self
    }

    pub fn temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Resolve provider/model defaults from `listing` and validate the result.
    ///
    /// Provider falls back to `default_provider`, then to the first listed
    /// provider. Model falls back to the provider's first advertised model.
    pub fn build(self, listing: &ProviderListing) -> Result<GenerationRequest, ValidationError> {
        let provider = match self.provider {
            Some(provider) => provider,
            None => default_provider(listing)?,
        };
        let entry = listing
            .find(&provider)
            .ok_or_else(|| ValidationError::UnknownProvider(provider.clone()))?;
        let model = match self.model {
            Some(model) => model,
            None => entry.models.first().cloned().ok_or_else(|| {
                ValidationError::UnknownModel {
                    provider: provider.clone(),
                    model: String::new(),
                }
            })?,
        };

        let request = GenerationRequest {
            book_id: self.book_id,
            chapter_index: self.chapter_index,
            outputs: self
                .outputs
                .unwrap_or_else(|| ArtifactType::ALL.into_iter().collect()),
            difficulty: self.difficulty,
            tone: self.tone,
            length: self.length,
            include_code: self.include_code,
            temperature: self.temperature,
            provider,
            model,
        };
        request.validate()?;
        request.validate_against(listing)?;
        Ok(request)
    }
}

fn default_provider(listing: &ProviderListing) -> Result<String, ValidationError> {
    if !listing.default_provider.is_empty() {
        return Ok(listing.default_provider.clone());
    }
    listing
        .providers
        .first()
        .map(|p| p.id.clone())
        .ok_or(ValidationError::EmptyCatalog)
}
