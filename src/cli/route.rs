//! CLI route: single route table and run context. Dispatches to the generation
//! core and presentation.

use crate::cli::help::command_name;
use crate::cli::parse::{Commands, ConfigFormat, OutputFormat};
use crate::cli::presentation::{
    format_artifacts_json, format_artifacts_text, format_completion_json, format_completion_text,
    format_job_json, format_job_text, format_progress_line, format_providers_json,
    format_providers_text, format_submitted_json, format_submitted_text, to_json,
};
use crate::config::{ConfigLoader, CoursegenConfig};
use crate::error::CoreError;
use crate::poller::CompletionHandler;
use crate::refresh::{latest_of, ArtifactRefreshCoordinator};
use crate::request::GenerationRequestBuilder;
use crate::service::{ArtifactStore, ChapterDirectory, HttpApiClient, JobStore, ProviderCatalog};
use crate::session::SessionState;
use crate::submit::JobSubmitter;
use crate::types::{ArtifactType, Difficulty, JobId, JobStatus, Length, Tone};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::runtime::Runtime;
use tracing::{info, warn};

/// Runtime context for CLI execution: effective config, the API client, and
/// the Tokio runtime commands run on.
pub struct RunContext {
    config: CoursegenConfig,
    client: Arc<HttpApiClient>,
    runtime: Runtime,
}

/// Options of one `generate` invocation.
struct GenerateOptions {
    book_id: i64,
    chapter_index: i64,
    outputs: Vec<ArtifactType>,
    difficulty: Option<Difficulty>,
    tone: Option<Tone>,
    length: Option<Length>,
    include_code: bool,
    provider: Option<String>,
    model: Option<String>,
    temperature: Option<f64>,
}

impl RunContext {
    /// Create run context from workspace root, optional config path and
    /// optional API base override. Uses ConfigLoader only.
    pub fn new(
        workspace_root: PathBuf,
        config_path: Option<PathBuf>,
        api_base: Option<String>,
    ) -> Result<Self, CoreError> {
        let mut config = if let Some(ref cfg_path) = config_path {
            ConfigLoader::load_from_file(cfg_path)?
        } else {
            ConfigLoader::load(&workspace_root)?
        };
        if let Some(base) = api_base {
            config.api.base_url = base;
        }
        config.ensure_valid()?;

        let client = HttpApiClient::new(config.api.base_url.clone(), &config.api.client_options())?;
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;

        Ok(Self {
            config,
            client: Arc::new(client),
            runtime,
        })
    }

    pub fn config(&self) -> &CoursegenConfig {
        &self.config
    }

    /// Execute a CLI command via the single route table.
    pub fn execute(&self, command: &Commands) -> Result<String, CoreError> {
        let started = Instant::now();
        let name = command_name(command);
        info!(command = name, api_base = %self.client.base_url(), "Running command");
        let result = self.runtime.block_on(self.execute_inner(command));
        let duration_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => info!(command = name, duration_ms, "Command completed"),
            Err(e) => warn!(command = name, duration_ms, error = %e, "Command failed"),
        }
        result
    }

    async fn execute_inner(&self, command: &Commands) -> Result<String, CoreError> {
        match command {
            Commands::Generate {
                book_id,
                chapter_index,
                summary,
                quiz,
                lab,
                takeaways,
                difficulty,
                tone,
                length,
                no_code,
                provider,
                model,
                temperature,
                wait,
                format,
            } => {
                let options = GenerateOptions {
                    book_id: *book_id,
                    chapter_index: *chapter_index,
                    outputs: selected_outputs(*summary, *quiz, *lab, *takeaways),
                    difficulty: *difficulty,
                    tone: *tone,
                    length: *length,
                    include_code: !*no_code,
                    provider: provider.clone(),
                    model: model.clone(),
                    temperature: *temperature,
                };
                self.handle_generate(options, *wait, *format).await
            }
            Commands::Job { job_id, format } => {
                let job = JobStore::get(self.client.as_ref(), &JobId::new(job_id.as_str())).await?;
                match format {
                    OutputFormat::Text => Ok(format_job_text(&job)),
                    OutputFormat::Json => format_job_json(&job),
                }
            }
            Commands::Watch {
                job_id,
                chapter_id,
                format,
            } => {
                self.track_to_completion(JobId::new(job_id.as_str()), *chapter_id, *format)
                    .await
            }
            Commands::Artifacts {
                chapter_id,
                all,
                format,
            } => {
                let mut artifacts =
                    ArtifactStore::list_by_chapter(self.client.as_ref(), *chapter_id).await?;
                if !*all {
                    artifacts = ArtifactType::ALL
                        .iter()
                        .filter_map(|t| latest_of(&artifacts, *t).cloned())
                        .collect();
                }
                match format {
                    OutputFormat::Text => Ok(format_artifacts_text(Some(*chapter_id), &artifacts)),
                    OutputFormat::Json => format_artifacts_json(*chapter_id, &artifacts),
                }
            }
            Commands::Providers { format } => {
                let listing = ProviderCatalog::list(self.client.as_ref()).await?;
                match format {
                    OutputFormat::Text => Ok(format_providers_text(&listing)),
                    OutputFormat::Json => format_providers_json(&listing),
                }
            }
            Commands::Config { format } => match format {
                ConfigFormat::Json => to_json(&self.config),
                ConfigFormat::Toml => toml::to_string_pretty(&self.config)
                    .map_err(|e| CoreError::Output(format!("Failed to encode config: {}", e))),
            },
        }
    }

    async fn handle_generate(
        &self,
        options: GenerateOptions,
        wait: bool,
        format: OutputFormat,
    ) -> Result<String, CoreError> {
        let listing = ProviderCatalog::list(self.client.as_ref()).await?;

        let mut builder = GenerationRequestBuilder::new(options.book_id, options.chapter_index)
            .include_code(options.include_code);
        if !options.outputs.is_empty() {
            builder = builder.outputs(options.outputs);
        }
        if let Some(difficulty) = options.difficulty {
            builder = builder.difficulty(difficulty);
        }
        if let Some(tone) = options.tone {
            builder = builder.tone(tone);
        }
        if let Some(length) = options.length {
            builder = builder.length(length);
        }
        if let Some(temperature) = options.temperature {
            builder = builder.temperature(temperature);
        }
        if let Some(provider) = options.provider {
            builder = builder.provider(provider);
        }
        if let Some(model) = options.model {
            builder = builder.model(model);
        }
        let request = builder.build(&listing)?;

        let submitter = JobSubmitter::new(self.client.clone());
        let job_id = submitter.submit(&request).await?;

        if !wait {
            return match format {
                OutputFormat::Text => Ok(format_submitted_text(&job_id)),
                OutputFormat::Json => format_submitted_json(&job_id),
            };
        }

        let chapter_id = match self
            .client
            .find_chapter(options.book_id, options.chapter_index)
            .await
        {
            Ok(chapter) => chapter.map(|c| c.id),
            Err(err) => {
                warn!(
                    book_id = options.book_id,
                    chapter_index = options.chapter_index,
                    error = %err,
                    "Chapter lookup failed; artifacts will not be listed"
                );
                None
            }
        };
        self.track_to_completion(job_id, chapter_id, format).await
    }

    /// Poll `job_id` until terminal, then list the chapter's artifacts if known.
    async fn track_to_completion(
        &self,
        job_id: JobId,
        chapter_id: Option<i64>,
        format: OutputFormat,
    ) -> Result<String, CoreError> {
        let session = SessionState::new(self.client.clone(), self.config.polling.to_policy());
        let events = session.subscribe();
        session.track(job_id);

        let mut last_seen: Option<(JobStatus, i64, Option<String>)> = None;
        let outcome = session
            .wait_for_completion(events, |job, view| {
                if format != OutputFormat::Text {
                    return;
                }
                let seen = (job.status, job.progress, job.message.clone());
                if last_seen.as_ref() != Some(&seen) {
                    eprintln!("{}", format_progress_line(job, view));
                    last_seen = Some(seen);
                }
            })
            .await;
        session.stop();
        let event = outcome?;

        let artifacts = match chapter_id {
            Some(chapter_id) => {
                let coordinator = ArtifactRefreshCoordinator::new(self.client.clone(), chapter_id);
                coordinator.on_complete(&event).await;
                if let Some(err) = coordinator.last_error() {
                    return Err(CoreError::Transport(err));
                }
                Some(coordinator.artifacts())
            }
            None => None,
        };

        match format {
            OutputFormat::Text => Ok(format_completion_text(&event, artifacts.as_deref())),
            OutputFormat::Json => format_completion_json(&event, artifacts.as_deref()),
        }
    }
}

/// Outputs named by flags; empty means "all", resolved by the request builder.
fn selected_outputs(summary: bool, quiz: bool, lab: bool, takeaways: bool) -> Vec<ArtifactType> {
    [
        (summary, ArtifactType::Summary),
        (quiz, ArtifactType::Quiz),
        (lab, ArtifactType::Lab),
        (takeaways, ArtifactType::Takeaways),
    ]
    .into_iter()
    .filter(|(selected, _)| *selected)
    .map(|(_, artifact_type)| artifact_type)
    .collect()
}
