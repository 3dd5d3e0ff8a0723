//! OpenAI chat-completions translation.

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

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
const TEMPERATURE: f32 = 0.3;
const MAX_TOKENS: u32 = 4000;

pub struct OpenAiBackend {
    id: String,
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    max_text_length: usize,
}

impl OpenAiBackend {
    pub fn new(api_key: String) -> Self {
        Self {
            id: BackendKind::OpenAi.to_string(),
            client: Client::new(),
            api_key,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            max_text_length: BackendKind::OpenAi.default_max_text_length(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Set a different model (e.g., "gpt-4o-mini").
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
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize, Debug)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Deserialize, Debug)]
struct ChatChoice {
    message: Option<ChatResponseMessage>,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ChatUsage {
    total_tokens: u64,
}

#[async_trait]
impl TranslationBackend for OpenAiBackend {
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

        debug!("Translating with OpenAI ({}): {} -> {}", self.model, source, target.name);

        let user_prompt = prompt::build_prompt(text, source, target);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: prompt::SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &user_prompt,
                },
            ],
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        };

        let response = self
            .client
            .post(endpoint(&self.base_url, "v1/chat/completions"))
            .bearer_auth(&self.api_key)
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

        let chat: ChatResponse = serde_json::from_str(&body).map_err(|e| {
            PolyglotError::unavailable(&self.id, format!("Failed to parse response: {}", e))
        })?;

        if let Some(usage) = &chat.usage {
            debug!("OpenAI translation used {} tokens", usage.total_tokens);
        }

        let choice = chat.choices.into_iter().next();

        // "length" means the reply hit max_tokens mid-translation.
        if choice.as_ref().and_then(|c| c.finish_reason.as_deref()) == Some("length") {
            return Err(PolyglotError::rejected(
                &self.id,
                "output truncated (length), text too long for one call",
            ));
        }

        let raw = choice
            .and_then(|c| c.message)
            .and_then(|m| m.content)
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
        BackendKind::OpenAi
    }

    fn max_text_length(&self) -> usize {
        self.max_text_length
    }
}
