//! LibreTranslate, a community machine-translation service.

use crate::backend::{
    endpoint, language_code, status_error, transport_error, BackendKind, BackendTranslation,
    TranslationBackend,
};
use crate::error::{PolyglotError, Result};
use crate::language::{Language, SourceLanguage};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://libretranslate.com";

pub struct LibreTranslateBackend {
    id: String,
    client: Client,
    base_url: String,
    api_key: Option<String>,
    max_text_length: usize,
}

impl LibreTranslateBackend {
    pub fn new() -> Self {
        Self {
            id: BackendKind::LibreTranslate.to_string(),
            client: Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            max_text_length: BackendKind::LibreTranslate.default_max_text_length(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Point at a self-hosted instance.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Public instances require a key; self-hosted ones usually don't.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
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
}

impl Default for LibreTranslateBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
struct LibreRequest<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
    format: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<&'a str>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct LibreResponse {
    translated_text: Option<String>,
    detected_language: Option<DetectedLanguage>,
    error: Option<String>,
}

#[derive(Deserialize, Debug)]
struct DetectedLanguage {
    language: String,
}

#[async_trait]
impl TranslationBackend for LibreTranslateBackend {
    async fn translate_one(
        &self,
        text: &str,
        source: SourceLanguage,
        target: &'static Language,
    ) -> Result<BackendTranslation> {
        let scheme = self.kind().scheme();
        let source_code = match source.language() {
            Some(from) => language_code(&self.id, scheme, from)?,
            None => "auto",
        };
        let target_code = language_code(&self.id, scheme, target)?;

        debug!("Translating with LibreTranslate: {} -> {}", source_code, target_code);

        let request = LibreRequest {
            q: text,
            source: source_code,
            target: target_code,
            format: "text",
            api_key: self.api_key.as_deref(),
        };

        let response = self
            .client
            .post(endpoint(&self.base_url, "translate"))
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

        let parsed: LibreResponse = serde_json::from_str(&body).map_err(|e| {
            PolyglotError::unavailable(&self.id, format!("Failed to parse response: {}", e))
        })?;

        if let Some(error) = parsed.error {
            return Err(PolyglotError::rejected(&self.id, error));
        }

        let text = parsed.translated_text.unwrap_or_default();
        if text.trim().is_empty() {
            return Err(PolyglotError::unavailable(&self.id, "empty translation"));
        }

        Ok(BackendTranslation {
            text,
            detected_source: parsed.detected_language.map(|d| d.language),
        })
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> BackendKind {
        BackendKind::LibreTranslate
    }

    fn max_text_length(&self) -> usize {
        self.max_text_length
    }
}
