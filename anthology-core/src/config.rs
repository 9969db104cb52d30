//! Settings resolved once at startup from layered sources.
//!
//! Precedence: JSON override file > environment variables > built-in
//! defaults. The resolved struct is passed by reference into each
//! component; nothing reads configuration ambiently after startup.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// Default model when neither config nor CLI overrides it.
pub const DEFAULT_MODEL: &str = "gpt-4";

/// Default OpenAI-compatible API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default SQLite database path.
pub const DEFAULT_DATABASE_URL: &str = "anthology.db";

/// Default directory uploaded images are copied into.
pub const DEFAULT_UPLOAD_DIR: &str = "uploads/images";

/// Maximum image file size (10MB).
pub const DEFAULT_MAX_IMAGE_SIZE: u64 = 10 * 1024 * 1024;

/// Default request timeout in seconds.
pub const DEFAULT_API_TIMEOUT_SECS: u64 = 60;

/// Default number of provider attempts.
pub const DEFAULT_RETRY_TIMES: u32 = 3;

/// Default base delay for exponential backoff in milliseconds.
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 1000;

fn default_allowed_formats() -> Vec<String> {
    ["jpg", "jpeg", "png", "webp"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Application settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// SQLite database path.
    pub database_url: String,
    /// Model used when the caller does not override it.
    pub default_model: String,
    /// API key for the OpenAI-compatible provider.
    pub openai_api_key: Option<String>,
    /// Base URL for the OpenAI-compatible provider.
    pub openai_base_url: String,
    /// Directory uploaded images are copied into.
    pub upload_dir: PathBuf,
    /// Maximum accepted image size in bytes.
    pub max_image_size: u64,
    /// Accepted image file extensions, lowercase without the dot.
    pub allowed_formats: Vec<String>,
    /// Timeout for one provider HTTP request.
    pub api_timeout: Duration,
    /// Number of provider attempts before giving up.
    pub retry_times: u32,
    /// Base delay for exponential backoff between attempts.
    pub retry_backoff: Duration,
    /// Log level used when RUST_LOG is not set.
    pub log_level: String,
}

/// Optional overrides read from a JSON config file.
///
/// Every field is optional; sections mirror the environment variables.
#[derive(Debug, Default, Deserialize)]
struct FileOverrides {
    #[serde(default)]
    database: DatabaseOverrides,
    #[serde(default)]
    ai: AiOverrides,
    #[serde(default)]
    image: ImageOverrides,
    #[serde(default)]
    api: ApiOverrides,
    #[serde(default)]
    log: LogOverrides,
}

#[derive(Debug, Default, Deserialize)]
struct DatabaseOverrides {
    url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AiOverrides {
    default_model: Option<String>,
    openai_api_key: Option<String>,
    openai_base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ImageOverrides {
    upload_dir: Option<String>,
    max_size: Option<u64>,
    allowed_formats: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiOverrides {
    timeout: Option<u64>,
    retry_times: Option<u32>,
    retry_backoff_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LogOverrides {
    level: Option<String>,
}

impl Settings {
    /// Load settings, optionally layering a JSON config file on top of the
    /// environment.
    ///
    /// Environment variables:
    /// - `DATABASE_URL`: SQLite path (default: "anthology.db")
    /// - `DEFAULT_MODEL`: model name (default: "gpt-4")
    /// - `OPENAI_API_KEY`: provider API key
    /// - `OPENAI_BASE_URL`: provider base URL
    /// - `IMAGE_UPLOAD_DIR`: upload directory (default: "uploads/images")
    /// - `MAX_IMAGE_SIZE`: max image bytes (default: 10485760)
    /// - `API_TIMEOUT`: request timeout in seconds (default: 60)
    /// - `API_RETRY_TIMES`: provider attempts (default: 3)
    /// - `API_RETRY_BACKOFF_MS`: backoff base in ms (default: 1000)
    /// - `LOG_LEVEL`: fallback log level (default: "info")
    pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        let overrides = match config_file {
            Some(path) => Self::read_overrides(path)?,
            None => FileOverrides::default(),
        };

        let database_url = overrides
            .database
            .url
            .or_else(|| env::var("DATABASE_URL").ok())
            .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        let default_model = overrides
            .ai
            .default_model
            .or_else(|| env::var("DEFAULT_MODEL").ok())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let openai_api_key = overrides
            .ai
            .openai_api_key
            .or_else(|| env::var("OPENAI_API_KEY").ok());

        let openai_base_url = overrides
            .ai
            .openai_base_url
            .or_else(|| env::var("OPENAI_BASE_URL").ok())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let upload_dir = overrides
            .image
            .upload_dir
            .map(PathBuf::from)
            .or_else(|| env::var("IMAGE_UPLOAD_DIR").ok().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_UPLOAD_DIR));

        let max_image_size = overrides
            .image
            .max_size
            .or_else(|| parse_env("MAX_IMAGE_SIZE"))
            .unwrap_or(DEFAULT_MAX_IMAGE_SIZE);

        let allowed_formats = overrides
            .image
            .allowed_formats
            .unwrap_or_else(default_allowed_formats);

        let api_timeout = overrides
            .api
            .timeout
            .or_else(|| parse_env("API_TIMEOUT"))
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(DEFAULT_API_TIMEOUT_SECS));

        let retry_times = overrides
            .api
            .retry_times
            .or_else(|| parse_env("API_RETRY_TIMES"))
            .unwrap_or(DEFAULT_RETRY_TIMES);

        let retry_backoff = overrides
            .api
            .retry_backoff_ms
            .or_else(|| parse_env("API_RETRY_BACKOFF_MS"))
            .map(Duration::from_millis)
            .unwrap_or(Duration::from_millis(DEFAULT_RETRY_BACKOFF_MS));

        let log_level = overrides
            .log
            .level
            .or_else(|| env::var("LOG_LEVEL").ok())
            .unwrap_or_else(|| "info".to_string());

        Ok(Self {
            database_url,
            default_model,
            openai_api_key,
            openai_base_url,
            upload_dir,
            max_image_size,
            allowed_formats,
            api_timeout,
            retry_times,
            retry_backoff,
            log_level,
        })
    }

    fn read_overrides(path: &Path) -> Result<FileOverrides, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Invalid {
            path: path.display().to_string(),
            source,
        })
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_file_overrides_beat_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "database": {{"url": "/tmp/override.db"}},
                "ai": {{"default_model": "gpt-4o"}},
                "image": {{"max_size": 1024, "allowed_formats": ["png"]}},
                "api": {{"retry_times": 5, "retry_backoff_ms": 250}}
            }}"#
        )
        .unwrap();

        let settings = Settings::load(Some(file.path())).unwrap();
        assert_eq!(settings.database_url, "/tmp/override.db");
        assert_eq!(settings.default_model, "gpt-4o");
        assert_eq!(settings.max_image_size, 1024);
        assert_eq!(settings.allowed_formats, vec!["png".to_string()]);
        assert_eq!(settings.retry_times, 5);
        assert_eq!(settings.retry_backoff, Duration::from_millis(250));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"ai": {{"default_model": "gpt-4o-mini"}}}}"#).unwrap();

        let settings = Settings::load(Some(file.path())).unwrap();
        assert_eq!(settings.default_model, "gpt-4o-mini");
        assert_eq!(settings.max_image_size, DEFAULT_MAX_IMAGE_SIZE);
        assert_eq!(settings.retry_times, DEFAULT_RETRY_TIMES);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let result = Settings::load(Some(file.path()));
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = Settings::load(Some(Path::new("/nonexistent/config.json")));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }
}
