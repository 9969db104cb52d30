//! OpenAI-compatible chat completions client.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{retry_with_backoff, PoemProvider};
use crate::chat::ChatMessage;
use crate::error::ProviderError;
use crate::media::ImagePayload;
use crate::parse;
use crate::prompts;
use crate::types::PoemCandidate;

/// Vision-capable variant requested whenever a message carries an image.
const VISION_MODEL: &str = "gpt-4-vision-preview";

const RECOMMEND_TEMPERATURE: f32 = 0.7;
const RECOMMEND_MAX_TOKENS: u32 = 2000;
const DESCRIBE_MAX_TOKENS: u32 = 500;

/// OpenAI API provider.
#[derive(Debug)]
pub struct OpenAiProvider {
    api_key: String,
    base_url: String,
    model: String,
    retry_times: u32,
    retry_backoff: Duration,
    client: reqwest::Client,
}

impl OpenAiProvider {
    pub fn new(
        api_key: String,
        base_url: String,
        model: String,
        timeout: Duration,
        retry_times: u32,
        retry_backoff: Duration,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::NotConfigured(e.to_string()))?;

        Ok(Self {
            api_key,
            base_url,
            model,
            retry_times,
            retry_backoff,
            client,
        })
    }

    /// One chat completion call. Retry policy lives in the callers.
    async fn chat_completion(
        &self,
        model: &str,
        messages: &[ChatMessage],
        temperature: Option<f32>,
        max_tokens: u32,
    ) -> Result<String, ProviderError> {
        let request = ChatCompletionRequest {
            model,
            messages,
            temperature,
            max_tokens,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;

        let status = response.status().as_u16();

        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;

        if status != 200 {
            // Try to parse a structured error body
            if let Ok(error_response) = serde_json::from_str::<ApiErrorResponse>(&body) {
                return Err(ProviderError::Api {
                    status,
                    message: error_response.error.message,
                });
            }
            return Err(ProviderError::Api {
                status,
                message: body,
            });
        }

        let response: ChatCompletionResponse =
            serde_json::from_str(&body).map_err(|e| ProviderError::Parse(e.to_string()))?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ProviderError::Parse("No message content in response".to_string()))
    }

    /// The vision variant when any message carries an image, otherwise the
    /// configured text model.
    fn select_model<'a>(&'a self, messages: &[ChatMessage]) -> &'a str {
        if messages.iter().any(|m| m.has_image()) {
            VISION_MODEL
        } else {
            &self.model
        }
    }
}

/// Chat completions request format.
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    max_tokens: u32,
}

/// Chat completions response format.
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

/// Error response from the API.
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiError,
}

#[async_trait]
impl PoemProvider for OpenAiProvider {
    async fn recommend(
        &self,
        messages: &[ChatMessage],
        count: usize,
    ) -> Result<Vec<PoemCandidate>, ProviderError> {
        let model = self.select_model(messages);
        tracing::debug!(model = model, "calling chat completions API");

        let raw = retry_with_backoff(self.retry_times, self.retry_backoff, || {
            self.chat_completion(
                model,
                messages,
                Some(RECOMMEND_TEMPERATURE),
                RECOMMEND_MAX_TOKENS,
            )
        })
        .await?;

        parse::parse_candidates(&raw, count)
    }

    async fn describe_image(&self, image: &ImagePayload) -> Result<String, ProviderError> {
        let messages = vec![ChatMessage::user_with_image(
            prompts::DESCRIBE_IMAGE_PROMPT,
            image.data_url.clone(),
        )];

        tracing::debug!(model = VISION_MODEL, "requesting image description");
        self.chat_completion(VISION_MODEL, &messages, None, DESCRIBE_MAX_TOKENS)
            .await
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> OpenAiProvider {
        OpenAiProvider::new(
            "sk-test".to_string(),
            "http://localhost:9".to_string(),
            "gpt-4".to_string(),
            Duration::from_secs(1),
            1,
            Duration::from_millis(1),
        )
        .unwrap()
    }

    #[test]
    fn test_model_selection_switches_to_vision_for_images() {
        let p = provider();

        let text_only = vec![ChatMessage::user("hi")];
        assert_eq!(p.select_model(&text_only), "gpt-4");

        let with_image = vec![
            ChatMessage::system("sys"),
            ChatMessage::user_with_image("t", "data:image/png;base64,AA"),
        ];
        assert_eq!(p.select_model(&with_image), VISION_MODEL);
    }

    #[test]
    fn test_request_serialization_omits_missing_temperature() {
        let messages = vec![ChatMessage::user("hi")];
        let request = ChatCompletionRequest {
            model: "gpt-4",
            messages: &messages,
            temperature: None,
            max_tokens: 500,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("temperature").is_none());
        assert_eq!(json["max_tokens"], 500);

        let request = ChatCompletionRequest {
            model: "gpt-4",
            messages: &messages,
            temperature: Some(0.7),
            max_tokens: 2000,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!((json["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
    }
}
