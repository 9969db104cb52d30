//! LLM provider abstraction for poem recommendations.
//!
//! Providers are polymorphic over two capabilities: recommending poems
//! from a built message sequence, and describing an image for use in a
//! later recommendation. Concrete clients are selected by a factory keyed
//! on the model-family prefix.

mod fake;
mod openai;

pub use fake::FakeProvider;
pub use openai::OpenAiProvider;

use std::fmt;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use crate::chat::ChatMessage;
use crate::config::Settings;
use crate::error::ProviderError;
use crate::media::ImagePayload;
use crate::types::PoemCandidate;

/// Trait for poem recommendation providers.
///
/// Implementations are stateless and thread-safe; no state is retained
/// between attempts of one invocation.
#[async_trait]
pub trait PoemProvider: Send + Sync + fmt::Debug {
    /// Send the built messages and return at most `count` candidates in
    /// provider order. Owns the response-parsing fallback chain.
    async fn recommend(
        &self,
        messages: &[ChatMessage],
        count: usize,
    ) -> Result<Vec<PoemCandidate>, ProviderError>;

    /// Describe an image for use in a recommendation prompt.
    async fn describe_image(&self, image: &ImagePayload) -> Result<String, ProviderError>;

    /// The model this provider will request for text-only invocations.
    fn model_name(&self) -> &str;
}

/// Create a provider for the given model name.
///
/// Model families map to concrete clients; an unrecognized family fails
/// fast without retry.
pub fn create_provider(
    model_name: &str,
    settings: &Settings,
) -> Result<Box<dyn PoemProvider>, ProviderError> {
    if model_name.starts_with("gpt") {
        let api_key = settings
            .openai_api_key
            .clone()
            .ok_or_else(|| ProviderError::NotConfigured("OPENAI_API_KEY not set".to_string()))?;
        Ok(Box::new(OpenAiProvider::new(
            api_key,
            settings.openai_base_url.clone(),
            model_name.to_string(),
            settings.api_timeout,
            settings.retry_times,
            settings.retry_backoff,
        )?))
    } else {
        Err(ProviderError::UnsupportedModel(model_name.to_string()))
    }
}

/// Run `call` up to `retry_times` times with exponential backoff between
/// attempts: the delay after attempt `n` (0-indexed) is `base * 2^n`.
///
/// The last error is surfaced verbatim once attempts are exhausted.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    retry_times: u32,
    base: Duration,
    mut call: F,
) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let mut last_error = None;

    for attempt in 0..retry_times {
        match call().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                tracing::warn!(
                    attempt = attempt + 1,
                    total = retry_times,
                    error = %e,
                    "provider request failed"
                );
                last_error = Some(e);
                if attempt + 1 < retry_times {
                    tokio::time::sleep(base * 2u32.pow(attempt)).await;
                }
            }
        }
    }

    Err(last_error
        .unwrap_or_else(|| ProviderError::RequestFailed("no attempts were made".to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Instant;

    #[tokio::test]
    async fn test_retry_exhausts_exactly_n_attempts() {
        let attempts = AtomicU32::new(0);
        let base = Duration::from_millis(10);
        let started = Instant::now();

        let result: Result<(), _> = retry_with_backoff(3, base, || {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move { Err(ProviderError::RequestFailed(format!("boom {}", n))) }
        })
        .await;

        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        // Last error is surfaced verbatim.
        match result.unwrap_err() {
            ProviderError::RequestFailed(msg) => assert_eq!(msg, "boom 2"),
            other => panic!("unexpected error: {other:?}"),
        }
        // Two sleeps: base + 2*base.
        assert!(started.elapsed() >= base * 3);
    }

    #[tokio::test]
    async fn test_retry_stops_on_first_success() {
        let attempts = AtomicU32::new(0);

        let result = retry_with_backoff(3, Duration::from_millis(1), || {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(ProviderError::RequestFailed("transient".to_string()))
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 1);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_factory_rejects_unknown_model_family() {
        let settings = test_settings();
        let err = create_provider("llama-3", &settings).unwrap_err();
        assert!(matches!(err, ProviderError::UnsupportedModel(_)));
    }

    #[test]
    fn test_factory_requires_api_key() {
        let mut settings = test_settings();
        settings.openai_api_key = None;
        let err = create_provider("gpt-4", &settings).unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
    }

    #[test]
    fn test_factory_builds_openai_client_for_gpt_models() {
        let settings = test_settings();
        let provider = create_provider("gpt-4", &settings).unwrap();
        assert_eq!(provider.model_name(), "gpt-4");
    }

    fn test_settings() -> Settings {
        Settings {
            database_url: ":memory:".to_string(),
            default_model: "gpt-4".to_string(),
            openai_api_key: Some("sk-test".to_string()),
            openai_base_url: "http://localhost:9".to_string(),
            upload_dir: std::path::PathBuf::from("uploads"),
            max_image_size: 1024,
            allowed_formats: vec!["png".to_string()],
            api_timeout: Duration::from_secs(1),
            retry_times: 3,
            retry_backoff: Duration::from_millis(1),
            log_level: "info".to_string(),
        }
    }
}
