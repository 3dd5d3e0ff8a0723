//! Gemini-based translation using the Generative AI API.

use crate::backend::{
    endpoint, language_code, prompt, status_error, transport_error, BackendKind,
    BackendTranslation, TranslationBackend,
};
use crate::error::{PolyglotError, Result};
use crate::language::{Language, SourceLanguage};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Lower temperature keeps translations consistent between calls.
const TEMPERATURE: f32 = 0.3;
const MAX_OUTPUT_TOKENS: u32 = 2048;
const TRUNCATED_FINISH_REASON: &str = "MAX_TOKENS";

/// Translator using Google Gemini API.
pub struct GeminiBackend {
    id: String,
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    max_text_length: usize,
}

impl GeminiBackend {
    /// Create a new Gemini backend with the given API key.
    pub fn new(api_key: String) -> Self {
        Self {
            id: BackendKind::Gemini.to_string(),
            client: Client::new(),
            api_key,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            max_text_length: BackendKind::Gemini.default_max_text_length(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Set a different model (e.g., "gemini-1.5-pro").
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn with_max_text_length(mut self, max_text_length: usize) -> Self {
        self.max_text_length = max_text_length;
        self
    }

    fn url(&self) -> String {
        endpoint(
            &self.base_url,
            &format!("v1beta/models/{}:generateContent", self.model),
        )
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
    error: Option<GeminiError>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiResponseContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
struct GeminiResponseContent {
    parts: Option<Vec<GeminiResponsePart>>,
}

#[derive(Deserialize, Debug)]
struct GeminiResponsePart {
    text: Option<String>,
}

#[derive(Deserialize, Debug)]
struct GeminiError {
    message: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    total_token_count: Option<u64>,
}

#[async_trait]
impl TranslationBackend for GeminiBackend {
    async fn translate_one(
        &self,
        text: &str,
        source: SourceLanguage,
        target: &'static Language,
    ) -> Result<BackendTranslation> {
        let scheme = self.kind().scheme();
        if let Some(from) = source.language() {
            language_code(&self.id, scheme, from)?;
        }
        language_code(&self.id, scheme, target)?;

        debug!("Translating {} chars with Gemini: {} -> {}", text.chars().count(), source, target.name);

        let request = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: prompt::build_prompt(text, source, target),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
                max_output_tokens: MAX_OUTPUT_TOKENS,
            },
        };

        let response = self
            .client
            .post(self.url())
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error(&self.id, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| transport_error(&self.id, e))?;

        if !status.is_success() {
            return Err(status_error(&self.id, status, &body));
        }

        let gemini_response: GeminiResponse = serde_json::from_str(&body).map_err(|e| {
            PolyglotError::unavailable(&self.id, format!("Failed to parse response: {}", e))
        })?;

        if let Some(error) = gemini_response.error {
            return Err(PolyglotError::unavailable(
                &self.id,
                format!("Gemini error: {}", error.message),
            ));
        }

        if let Some(tokens) = gemini_response
            .usage_metadata
            .and_then(|u| u.total_token_count)
        {
            debug!("Gemini translation used {} tokens", tokens);
        }

        let candidate = gemini_response
            .candidates
            .and_then(|c| c.into_iter().next());

        // A cut-off translation must not pass as a complete one.
        if let Some(reason) = candidate
            .as_ref()
            .and_then(|c| c.finish_reason.as_deref())
            .filter(|r| *r == TRUNCATED_FINISH_REASON)
        {
            return Err(PolyglotError::rejected(
                &self.id,
                format!("output truncated ({}), text too long for one call", reason),
            ));
        }

        let raw = candidate
            .and_then(|c| c.content)
            .and_then(|c| c.parts)
            .and_then(|p| p.into_iter().next())
            .and_then(|p| p.text)
            .unwrap_or_default();

        let translation = prompt::parse_output(&raw, source);
        if translation.text.is_empty() {
            return Err(PolyglotError::unavailable(&self.id, "empty translation"));
        }
        Ok(translation)
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Gemini
    }

    fn max_text_length(&self) -> usize {
        self.max_text_length
    }
}
