//! Fake provider for testing.
//!
//! Returns deterministic raw replies based on prompt matching, then runs
//! them through the same parsing chain as the real client, so pipeline
//! tests exercise the full fallback behavior without network access.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use super::PoemProvider;
use crate::chat::ChatMessage;
use crate::error::ProviderError;
use crate::media::ImagePayload;
use crate::parse;
use crate::types::PoemCandidate;

/// A fake poem provider for testing.
///
/// Raw replies are matched by checking if the combined message text
/// contains a registered substring. Without a match, the default reply is
/// used if set, otherwise the call errors.
#[derive(Debug, Default)]
pub struct FakeProvider {
    /// Map of prompt substring -> raw reply
    responses: RwLock<HashMap<String, String>>,
    default_response: Option<String>,
    description: Option<String>,
    always_fail: bool,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// A provider that returns a specific raw reply for prompts containing
    /// a substring.
    pub fn with_response(prompt_contains: &str, response: &str) -> Self {
        let provider = Self::new();
        provider.add_response(prompt_contains, response);
        provider
    }

    /// Add a raw reply for prompts containing a specific substring.
    pub fn add_response(&self, prompt_contains: &str, response: &str) {
        self.responses
            .write()
            .unwrap()
            .insert(prompt_contains.to_string(), response.to_string());
    }

    /// Set the raw reply used when no pattern matches.
    pub fn with_default_response(mut self, response: &str) -> Self {
        self.default_response = Some(response.to_string());
        self
    }

    /// Set the description returned by `describe_image`.
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// A provider whose every call fails, for exercising failure paths.
    pub fn failing() -> Self {
        Self {
            always_fail: true,
            ..Self::default()
        }
    }

    fn raw_reply(&self, prompt: &str) -> Result<String, ProviderError> {
        if self.always_fail {
            return Err(ProviderError::RequestFailed(
                "simulated provider outage".to_string(),
            ));
        }

        let responses = self.responses.read().unwrap();
        let prompt_lower = prompt.to_lowercase();
        for (pattern, response) in responses.iter() {
            if prompt_lower.contains(&pattern.to_lowercase()) {
                return Ok(response.clone());
            }
        }

        match &self.default_response {
            Some(response) => Ok(response.clone()),
            None => Err(ProviderError::RequestFailed(format!(
                "FakeProvider: no response configured for prompt (first 100 chars): {}",
                prompt.chars().take(100).collect::<String>()
            ))),
        }
    }
}

#[async_trait]
impl PoemProvider for FakeProvider {
    async fn recommend(
        &self,
        messages: &[ChatMessage],
        count: usize,
    ) -> Result<Vec<PoemCandidate>, ProviderError> {
        let prompt = messages
            .iter()
            .map(|m| m.text())
            .collect::<Vec<_>>()
            .join("\n");
        let raw = self.raw_reply(&prompt)?;
        parse::parse_candidates(&raw, count)
    }

    async fn describe_image(&self, _image: &ImagePayload) -> Result<String, ProviderError> {
        if self.always_fail {
            return Err(ProviderError::RequestFailed(
                "simulated provider outage".to_string(),
            ));
        }
        self.description.clone().ok_or_else(|| {
            ProviderError::RequestFailed("FakeProvider: no description configured".to_string())
        })
    }

    fn model_name(&self) -> &str {
        "fake-model"
    }
}
