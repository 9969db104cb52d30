//! The recommendation pipeline.
//!
//! One invocation runs sequentially: validate inputs, validate and store
//! the image, obtain a description if needed, build the messages, invoke
//! the provider with retry, parse, and record the outcome. Exactly one
//! terminal outcome (recorded success or recorded failure) is produced.

use diesel::sqlite::SqliteConnection;

use crate::config::Settings;
use crate::error::AgentError;
use crate::media::{self, ImagePayload};
use crate::prompts;
use crate::provider::{self, PoemProvider};
use crate::recorder::{self, RequestMetadata};
use crate::types::{PoemCandidate, RecommendationOutcome, RecommendationRequest};

/// Result of a completed, recorded invocation.
#[derive(Debug)]
pub struct RunReport {
    /// Persisted record ids, in write order.
    pub record_ids: Vec<i64>,
    pub poems: Vec<PoemCandidate>,
    pub image_description: Option<String>,
    pub model_name: String,
}

/// Drives one recommendation invocation end to end.
pub struct PoetryAgent {
    settings: Settings,
}

impl PoetryAgent {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Run one invocation, selecting the provider from the requested (or
    /// configured default) model.
    pub async fn run(
        &self,
        conn: &mut SqliteConnection,
        request: RecommendationRequest,
    ) -> Result<RunReport, AgentError> {
        let model_name = self.model_name(&request);
        let provider = provider::create_provider(&model_name, &self.settings)?;
        self.run_with(provider.as_ref(), conn, request).await
    }

    /// Run one invocation with an explicit provider. This is the injection
    /// point for tests using `FakeProvider`.
    pub async fn run_with(
        &self,
        provider: &dyn PoemProvider,
        conn: &mut SqliteConnection,
        request: RecommendationRequest,
    ) -> Result<RunReport, AgentError> {
        if !request.has_input() {
            return Err(AgentError::MissingInput);
        }

        let model_name = self.model_name(&request);
        tracing::info!(model = %model_name, count = request.count, "starting recommendation");

        // Validate, store and encode the image before anything remote.
        let mut stored_image: Option<String> = None;
        let mut payload: Option<ImagePayload> = None;
        if let Some(path) = &request.image_path {
            media::validate(path, self.settings.max_image_size, &self.settings.allowed_formats)?;
            let stored = media::store(path, request.user_id, &self.settings.upload_dir)?;
            stored_image = Some(stored.display().to_string());
            payload = Some(media::encode(path)?);
        }

        let meta = RequestMetadata {
            user_id: request.user_id,
            positive_prompt: request.positive_prompt.as_deref(),
            negative_prompt: request.negative_prompt.as_deref(),
            image_path: stored_image.as_deref(),
            context: request.context.as_deref(),
            model_name: &model_name,
        };

        // Ask the provider for a description when an image arrives without one.
        let mut image_description = request.image_description.clone();
        if image_description.is_none() {
            if let Some(image) = &payload {
                match provider.describe_image(image).await {
                    Ok(description) => {
                        tracing::debug!(description = %description, "image described");
                        image_description = Some(description);
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "image description failed");
                        recorder::record_failure_best_effort(conn, &e.to_string(), &meta);
                        return Err(e.into());
                    }
                }
            }
        }

        let messages = prompts::build_messages(&request, image_description.as_deref(), payload.as_ref());

        let poems = match provider.recommend(&messages, request.count).await {
            Ok(poems) => poems,
            Err(e) => {
                tracing::error!(error = %e, "provider invocation failed");
                recorder::record_failure_best_effort(conn, &e.to_string(), &meta);
                return Err(e.into());
            }
        };

        let outcome = RecommendationOutcome::Success {
            poems: poems.clone(),
            image_description: image_description.clone(),
        };
        let record_ids = recorder::record(conn, &outcome, &meta).map_err(|e| {
            // The computed result must not vanish with the write: dump it
            // before surfacing the persistence error.
            tracing::error!(
                error = %e,
                poems = %serde_json::to_string(&poems).unwrap_or_default(),
                "failed to persist recommendations"
            );
            e
        })?;

        tracing::info!(ids = ?record_ids, "recommendation complete");
        Ok(RunReport {
            record_ids,
            poems,
            image_description,
            model_name,
        })
    }

    fn model_name(&self, request: &RecommendationRequest) -> String {
        request
            .model
            .clone()
            .unwrap_or_else(|| self.settings.default_model.clone())
    }
}
