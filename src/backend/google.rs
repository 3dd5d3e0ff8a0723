//! Google Translate through the public web endpoint (`client=gtx`).
//!
//! The endpoint answers with nested arrays rather than an object:
//! `[[["Hola ","Hello ",...],["mundo","world",...]], null, "en", ...]`.
//! Segment translations are concatenated; index 2 holds the detected source.

use crate::backend::{
    endpoint, language_code, status_error, transport_error, BackendKind, BackendTranslation,
    TranslationBackend,
};
use crate::error::{PolyglotError, Result};
use crate::language::{Language, SourceLanguage};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://translate.googleapis.com";

pub struct GoogleBackend {
    id: String,
    client: Client,
    base_url: String,
    max_text_length: usize,
}

impl GoogleBackend {
    pub fn new() -> Self {
        Self {
            id: BackendKind::Google.to_string(),
            client: Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            max_text_length: BackendKind::Google.default_max_text_length(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
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
}

impl Default for GoogleBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_response(body: &Value) -> Option<BackendTranslation> {
    let segments = body.get(0)?.as_array()?;
    let text: String = segments
        .iter()
        .filter_map(|segment| segment.get(0).and_then(Value::as_str))
        .collect();

    let detected_source = body
        .get(2)
        .and_then(Value::as_str)
        .map(str::to_string);

    Some(BackendTranslation {
        text,
        detected_source,
    })
}

#[async_trait]
impl TranslationBackend for GoogleBackend {
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

        debug!("Translating with Google: {} -> {}", source_code, target_code);

        let response = self
            .client
            .get(endpoint(&self.base_url, "translate_a/single"))
            .query(&[
                ("client", "gtx"),
                ("sl", source_code),
                ("tl", target_code),
                ("dt", "t"),
                ("q", text),
            ])
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

        let value: Value = serde_json::from_str(&body).map_err(|e| {
            PolyglotError::unavailable(&self.id, format!("Failed to parse response: {}", e))
        })?;

        let translation = parse_response(&value)
            .filter(|t| !t.text.trim().is_empty())
            .ok_or_else(|| PolyglotError::unavailable(&self.id, "empty translation"))?;

        Ok(translation)
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Google
    }

    fn max_text_length(&self) -> usize {
        self.max_text_length
    }
}
