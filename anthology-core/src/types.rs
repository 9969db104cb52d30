//! Core data types for one recommendation invocation.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Sentinel for poem fields the provider did not supply.
pub const UNKNOWN: &str = "未知";

fn unknown() -> String {
    UNKNOWN.to_string()
}

/// Inputs for one recommendation invocation.
///
/// Invariant: `positive_prompt` and `image_path` are not both absent.
/// The pipeline validates this at entry.
#[derive(Debug, Clone)]
pub struct RecommendationRequest {
    pub positive_prompt: Option<String>,
    pub negative_prompt: Option<String>,
    pub image_path: Option<PathBuf>,
    /// Caller-supplied description. When absent and an image is present,
    /// the provider is asked to describe the image first.
    pub image_description: Option<String>,
    pub context: Option<String>,
    pub user_id: Option<i64>,
    /// Overrides the configured default model.
    pub model: Option<String>,
    /// Number of poems requested, at least 1.
    pub count: usize,
}

impl Default for RecommendationRequest {
    fn default() -> Self {
        Self {
            positive_prompt: None,
            negative_prompt: None,
            image_path: None,
            image_description: None,
            context: None,
            user_id: None,
            model: None,
            count: 1,
        }
    }
}

impl RecommendationRequest {
    /// True when the entry invariant holds: a non-empty positive prompt
    /// or an image.
    pub fn has_input(&self) -> bool {
        self.positive_prompt
            .as_deref()
            .map(|p| !p.trim().is_empty())
            .unwrap_or(false)
            || self.image_path.is_some()
    }
}

/// One structured poem extracted from a provider reply.
///
/// Missing fields decode to the `未知` sentinel rather than being dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoemCandidate {
    #[serde(default = "unknown")]
    pub title: String,
    #[serde(default = "unknown")]
    pub content: String,
    #[serde(default = "unknown")]
    pub author: String,
    #[serde(default = "unknown")]
    pub dynasty: String,
    #[serde(default = "unknown")]
    pub appreciation: String,
}

/// Terminal result of one invocation. Exactly one variant is produced.
#[derive(Debug, Clone)]
pub enum RecommendationOutcome {
    Success {
        poems: Vec<PoemCandidate>,
        image_description: Option<String>,
    },
    Failure {
        error_detail: String,
    },
}
