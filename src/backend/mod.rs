pub mod gemini;
pub mod google;
pub mod libre;
pub mod openai;
mod prompt;

pub use gemini::GeminiBackend;
pub use google::GoogleBackend;
pub use libre::LibreTranslateBackend;
pub use openai::OpenAiBackend;

use crate::config::BackendConfig;
use crate::error::{PolyglotError, Result};
use crate::governor::RateLimit;
use crate::language::{Language, LanguageScheme, SourceLanguage};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Longest slice of a provider error body kept in error messages (characters).
const ERROR_BODY_LIMIT: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Google Gemini text generation.
    Gemini,
    /// OpenAI chat completions.
    #[serde(rename = "openai")]
    OpenAi,
    /// Community machine translation (LibreTranslate).
    #[serde(rename = "libretranslate")]
    LibreTranslate,
    /// Google Translate web endpoint.
    Google,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Gemini => write!(f, "gemini"),
            BackendKind::OpenAi => write!(f, "openai"),
            BackendKind::LibreTranslate => write!(f, "libretranslate"),
            BackendKind::Google => write!(f, "google"),
        }
    }
}

impl std::str::FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gemini" => Ok(BackendKind::Gemini),
            "openai" => Ok(BackendKind::OpenAi),
            "libretranslate" | "libre" => Ok(BackendKind::LibreTranslate),
            "google" => Ok(BackendKind::Google),
            _ => Err(format!(
                "Unknown backend: {}. Use 'gemini', 'openai', 'libretranslate', or 'google'",
                s
            )),
        }
    }
}

impl BackendKind {
    pub fn requires_api_key(&self) -> bool {
        matches!(self, BackendKind::Gemini | BackendKind::OpenAi)
    }

    pub fn scheme(&self) -> LanguageScheme {
        match self {
            BackendKind::Gemini | BackendKind::OpenAi => LanguageScheme::Name,
            BackendKind::LibreTranslate => LanguageScheme::Libre,
            BackendKind::Google => LanguageScheme::Google,
        }
    }

    /// Coarse provider family, as shown by `/services`.
    pub fn category(&self) -> &'static str {
        match self {
            BackendKind::Gemini | BackendKind::OpenAi => "generative",
            BackendKind::LibreTranslate => "community-mt",
            BackendKind::Google => "library",
        }
    }

    /// Longest text sent in one call before chunking (characters).
    pub fn default_max_text_length(&self) -> usize {
        match self {
            BackendKind::Gemini => 4000,
            BackendKind::OpenAi => 800,
            BackendKind::LibreTranslate => 2000,
            BackendKind::Google => 5000,
        }
    }

    pub fn default_rate_limits(&self) -> Vec<RateLimit> {
        match self {
            // Conservative free-tier quota.
            BackendKind::Gemini => vec![RateLimit::per_minute(10), RateLimit::per_day(1000)],
            BackendKind::OpenAi => vec![RateLimit::per_minute(60)],
            BackendKind::LibreTranslate | BackendKind::Google => vec![RateLimit::per_second(4)],
        }
    }
}

/// What a provider returned for one piece of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendTranslation {
    pub text: String,
    /// Source language as reported by the provider (code or name).
    pub detected_source: Option<String>,
}

#[async_trait]
pub trait TranslationBackend: Send + Sync {
    async fn translate_one(
        &self,
        text: &str,
        source: SourceLanguage,
        target: &'static Language,
    ) -> Result<BackendTranslation>;

    fn id(&self) -> &str;

    fn kind(&self) -> BackendKind;

    /// Longest text this backend accepts in one call (characters).
    fn max_text_length(&self) -> usize;

    fn supports(&self, language: &Language) -> bool {
        self.kind().scheme().supports(language)
    }
}

/// Build the adapter described by `config`.
pub fn create_backend(config: &BackendConfig) -> Result<Box<dyn TranslationBackend>> {
    let client = build_http_client(Duration::from_secs(config.timeout_secs))?;
    let max_len = config.max_text_length();

    let backend: Box<dyn TranslationBackend> = match config.kind {
        BackendKind::Gemini => {
            let mut backend = GeminiBackend::new(required_key(config)?)
                .with_id(&config.id)
                .with_client(client)
                .with_max_text_length(max_len);
            if let Some(model) = &config.model {
                backend = backend.with_model(model);
            }
            if let Some(url) = &config.base_url {
                backend = backend.with_base_url(url);
            }
            Box::new(backend)
        }
        BackendKind::OpenAi => {
            let mut backend = OpenAiBackend::new(required_key(config)?)
                .with_id(&config.id)
                .with_client(client)
                .with_max_text_length(max_len);
            if let Some(model) = &config.model {
                backend = backend.with_model(model);
            }
            if let Some(url) = &config.base_url {
                backend = backend.with_base_url(url);
            }
            Box::new(backend)
        }
        BackendKind::LibreTranslate => {
            let mut backend = LibreTranslateBackend::new()
                .with_id(&config.id)
                .with_client(client)
                .with_max_text_length(max_len);
            if let Some(key) = &config.api_key {
                backend = backend.with_api_key(key);
            }
            if let Some(url) = &config.base_url {
                backend = backend.with_base_url(url);
            }
            Box::new(backend)
        }
        BackendKind::Google => {
            let mut backend = GoogleBackend::new()
                .with_id(&config.id)
                .with_client(client)
                .with_max_text_length(max_len);
            if let Some(url) = &config.base_url {
                backend = backend.with_base_url(url);
            }
            Box::new(backend)
        }
    };

    Ok(backend)
}

fn required_key(config: &BackendConfig) -> Result<String> {
    config.api_key.clone().ok_or_else(|| {
        PolyglotError::Config(format!("Backend '{}' requires an API key", config.id))
    })
}

pub fn build_http_client(timeout: Duration) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder().timeout(timeout).build()?)
}

/// Wire spelling of `language` for `scheme`, or `InvalidLanguage`.
pub(crate) fn language_code(
    backend: &str,
    scheme: LanguageScheme,
    language: &Language,
) -> Result<&'static str> {
    scheme
        .code(language)
        .ok_or_else(|| PolyglotError::invalid_language(backend, language.name))
}

/// Classify a non-success HTTP status from a provider.
///
/// Throttling, timeouts and server errors are transient; any other
/// status means the provider refused the request itself.
pub(crate) fn status_error(backend: &str, status: StatusCode, body: &str) -> PolyglotError {
    let message = format!("HTTP {}: {}", status, truncate(body));
    match status.as_u16() {
        408 | 429 => PolyglotError::unavailable(backend, message),
        s if s >= 500 => PolyglotError::unavailable(backend, message),
        _ => PolyglotError::rejected(backend, message),
    }
}

/// Transport-level failures (timeouts, refused connections, broken bodies).
pub(crate) fn transport_error(backend: &str, err: reqwest::Error) -> PolyglotError {
    let message = if err.is_timeout() {
        format!("request timed out: {}", err)
    } else {
        format!("request failed: {}", err)
    };
    PolyglotError::unavailable(backend, message)
}

pub(crate) fn truncate(body: &str) -> String {
    body.chars().take(ERROR_BODY_LIMIT).collect()
}

/// Join a base URL and path without doubling slashes.
pub(crate) fn endpoint(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
