//! Request and response bodies of the HTTP API.

use crate::dispatcher::TranslationResult;
use crate::error::PolyglotError;
use crate::governor::{GovernorStatus, RateLimit};
use serde::{Deserialize, Serialize};

fn default_source_lang() -> String {
    crate::language::AUTO.to_string()
}

fn default_target_lang() -> String {
    "English".to_string()
}

/// Body of `POST /translate`.
#[derive(Debug, Deserialize)]
pub struct TranslateBody {
    /// Missing text is reported as a validation error rather than a parse error.
    #[serde(default)]
    pub text: String,
    #[serde(default = "default_source_lang")]
    pub source_lang: String,
    #[serde(default = "default_target_lang")]
    pub target_lang: String,
    #[serde(default)]
    pub backend: Option<String>,
}

/// Body of `POST /translate_batch`.
#[derive(Debug, Deserialize)]
pub struct BatchBody {
    #[serde(default)]
    pub texts: Vec<String>,
    #[serde(default = "default_source_lang")]
    pub source_lang: String,
    #[serde(default = "default_target_lang")]
    pub target_lang: String,
    #[serde(default)]
    pub backend: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslateResponse {
    pub translated_text: String,
    pub detected_language: Option<String>,
    pub backend_used: Option<String>,
    pub success: bool,
    pub message: Option<String>,
    /// Error class (`ValidationError`, `AllBackendsExhausted`, ...) on failure.
    pub error: Option<String>,
    pub attempt_count: u32,
    pub source_lang: String,
    pub target_lang: String,
}

impl TranslateResponse {
    pub fn success(result: TranslationResult, source_lang: &str, target_lang: &str) -> Self {
        Self {
            translated_text: result.translated_text,
            detected_language: result.detected_source_language,
            backend_used: Some(result.backend_used),
            success: true,
            message: Some("Translation successful".to_string()),
            error: None,
            attempt_count: result.attempt_count,
            source_lang: source_lang.to_string(),
            target_lang: target_lang.to_string(),
        }
    }

    pub fn failure(error: &PolyglotError, source_lang: &str, target_lang: &str) -> Self {
        Self {
            translated_text: String::new(),
            detected_language: None,
            backend_used: None,
            success: false,
            message: Some(format!("Translation failed: {}", error)),
            error: Some(error.kind().to_string()),
            attempt_count: 0,
            source_lang: source_lang.to_string(),
            target_lang: target_lang.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResponse {
    /// True when at least one text was translated.
    pub success: bool,
    pub translations: Vec<TranslateResponse>,
    pub total_texts: usize,
    pub successful_translations: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub enabled_backends: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct LanguagesQuery {
    pub backend: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LanguagesResponse {
    pub languages: Vec<&'static str>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub id: String,
    pub kind: String,
    pub category: &'static str,
    pub priority: u32,
    pub enabled: bool,
    pub max_text_length: usize,
    pub rate_limits: Vec<RateLimit>,
    /// Live governor state; absent for disabled backends.
    pub rate_status: Option<GovernorStatus>,
}

#[derive(Debug, Serialize)]
pub struct ServicesResponse {
    pub services: Vec<ServiceInfo>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub message: String,
}

impl From<&PolyglotError> for ErrorResponse {
    fn from(error: &PolyglotError) -> Self {
        Self {
            success: false,
            error: error.kind().to_string(),
            message: error.to_string(),
        }
    }
}
