//! Routes translation requests across backends.
//!
//! Backends are tried in priority order. Every call passes through the
//! backend's [`RateGovernor`] and the shared [`RetryPolicy`]; oversized
//! texts are split with the [`TextChunker`] and translated chunk by chunk.

use crate::backend::{create_backend, BackendTranslation, TranslationBackend};
use crate::chunker::{self, TextChunker, DEFAULT_LOOKBACK};
use crate::config::Config;
use crate::error::{BackendFailure, PolyglotError, Result};
use crate::governor::{GovernorStatus, RateGovernor, RateLimit};
use crate::language::{self, Language, SourceLanguage};
use crate::retry::{Attempted, RetryPolicy};
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(45);

/// A validated single-text request.
#[derive(Debug, Clone)]
pub struct TranslationRequest {
    text: String,
    source: SourceLanguage,
    target: &'static Language,
    backend: Option<String>,
}

impl TranslationRequest {
    /// Validate caller input. Nothing is sent to a backend if this fails.
    pub fn new(text: impl Into<String>, source: &str, target: &str) -> Result<Self> {
        let source = language::parse_source(source)?;
        let target = language::parse_target(target)?;
        Self::from_parts(text.into(), source, target)
    }

    fn from_parts(text: String, source: SourceLanguage, target: &'static Language) -> Result<Self> {
        if text.trim().is_empty() {
            return Err(PolyglotError::Validation("Text cannot be empty".to_string()));
        }
        Ok(Self {
            text,
            source,
            target,
            backend: None,
        })
    }

    /// Send the request to one backend only, without fallback.
    pub fn with_backend(mut self, backend: impl Into<String>) -> Self {
        self.backend = Some(backend.into());
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn source(&self) -> SourceLanguage {
        self.source
    }

    pub fn target(&self) -> &'static Language {
        self.target
    }

    pub fn backend(&self) -> Option<&str> {
        self.backend.as_deref()
    }
}

/// Texts sharing one language pair. Items are validated individually.
#[derive(Debug, Clone)]
pub struct BatchRequest {
    texts: Vec<String>,
    source: SourceLanguage,
    target: &'static Language,
    backend: Option<String>,
}

impl BatchRequest {
    pub fn new(texts: Vec<String>, source: &str, target: &str, max_batch_size: usize) -> Result<Self> {
        if texts.is_empty() {
            return Err(PolyglotError::Validation("No texts provided".to_string()));
        }
        if texts.len() > max_batch_size {
            return Err(PolyglotError::Validation(format!(
                "Batch size cannot exceed {} texts",
                max_batch_size
            )));
        }
        Ok(Self {
            texts,
            source: language::parse_source(source)?,
            target: language::parse_target(target)?,
            backend: None,
        })
    }

    pub fn with_backend(mut self, backend: impl Into<String>) -> Self {
        self.backend = Some(backend.into());
        self
    }

    pub fn texts(&self) -> &[String] {
        &self.texts
    }

    pub fn len(&self) -> usize {
        self.texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }

    pub fn source(&self) -> SourceLanguage {
        self.source
    }

    pub fn target(&self) -> &'static Language {
        self.target
    }

    fn item(&self, text: &str) -> Result<TranslationRequest> {
        let request = TranslationRequest::from_parts(text.to_string(), self.source, self.target)?;
        Ok(match &self.backend {
            Some(id) => request.with_backend(id.as_str()),
            None => request,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranslationResult {
    pub translated_text: String,
    /// Only set when the request asked for auto-detection.
    pub detected_source_language: Option<String>,
    pub backend_used: String,
    /// Calls made by the backend that produced this result, over all chunks.
    pub attempt_count: u32,
}

/// Rate and size settings of one active backend.
#[derive(Debug, Clone, Serialize)]
pub struct BackendStatus {
    pub id: String,
    pub kind: String,
    pub priority: u32,
    pub max_text_length: usize,
    pub rate_limits: Vec<RateLimit>,
    pub rate_status: GovernorStatus,
}

struct BackendSlot {
    backend: Arc<dyn TranslationBackend>,
    governor: RateGovernor,
    rate_limits: Vec<RateLimit>,
    priority: u32,
}

impl BackendSlot {
    fn id(&self) -> &str {
        self.backend.id()
    }
}

pub struct Dispatcher {
    slots: Vec<BackendSlot>,
    retry: RetryPolicy,
    call_timeout: Duration,
    fallback_on_permanent: bool,
    chunk_lookback: usize,
}

impl Dispatcher {
    pub fn new(retry: RetryPolicy) -> Self {
        Self {
            slots: Vec::new(),
            retry,
            call_timeout: DEFAULT_CALL_TIMEOUT,
            fallback_on_permanent: true,
            chunk_lookback: DEFAULT_LOOKBACK,
        }
    }

    /// Build adapters and governors for every enabled backend in `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut dispatcher = Self::new(config.retry)
            .with_call_timeout(Duration::from_secs(config.call_timeout_secs))
            .with_fallback_on_permanent(config.fallback_on_permanent)
            .with_chunk_lookback(config.chunk_lookback);

        for backend_config in config.enabled_backends() {
            let backend = create_backend(backend_config)?;
            info!(
                "Backend '{}' ({}) ready, priority {}",
                backend_config.id, backend_config.kind, backend_config.priority
            );
            dispatcher = dispatcher.with_backend(
                Arc::from(backend),
                backend_config.priority,
                backend_config.rate_limits(),
            );
        }

        Ok(dispatcher)
    }

    /// Register a backend. Equal priorities keep registration order.
    pub fn with_backend(
        mut self,
        backend: Arc<dyn TranslationBackend>,
        priority: u32,
        rate_limits: Vec<RateLimit>,
    ) -> Self {
        self.slots.push(BackendSlot {
            backend,
            governor: RateGovernor::new(rate_limits.clone()),
            rate_limits,
            priority,
        });
        self.slots.sort_by_key(|slot| slot.priority);
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn with_fallback_on_permanent(mut self, enabled: bool) -> Self {
        self.fallback_on_permanent = enabled;
        self
    }

    pub fn with_chunk_lookback(mut self, lookback: usize) -> Self {
        self.chunk_lookback = lookback;
        self
    }

    /// Active backend ids in the order they are tried.
    pub fn enabled_backends(&self) -> Vec<&str> {
        self.slots.iter().map(BackendSlot::id).collect()
    }

    pub fn status(&self) -> Vec<BackendStatus> {
        self.slots
            .iter()
            .map(|slot| BackendStatus {
                id: slot.id().to_string(),
                kind: slot.backend.kind().to_string(),
                priority: slot.priority,
                max_text_length: slot.backend.max_text_length(),
                rate_limits: slot.rate_limits.clone(),
                rate_status: slot.governor.status(),
            })
            .collect()
    }

    pub fn rate_status(&self, backend: &str) -> Option<GovernorStatus> {
        self.slot(backend).map(|slot| slot.governor.status())
    }

    /// Languages accepted by `backend`, or by any backend when `None`.
    pub fn supported_languages(&self, backend: Option<&str>) -> Result<Vec<&'static Language>> {
        match backend {
            None => Ok(language::all().iter().collect()),
            Some(id) => {
                let slot = self.slot(id).ok_or_else(|| unknown_backend(id))?;
                Ok(language::all()
                    .iter()
                    .filter(|l| slot.backend.supports(l))
                    .collect())
            }
        }
    }

    fn slot(&self, id: &str) -> Option<&BackendSlot> {
        self.slots.iter().find(|slot| slot.id() == id)
    }

    fn candidates(&self, backend: Option<&str>) -> Result<Vec<&BackendSlot>> {
        match backend {
            Some(id) => Ok(vec![self.slot(id).ok_or_else(|| unknown_backend(id))?]),
            None => Ok(self.slots.iter().collect()),
        }
    }

    pub async fn translate(&self, request: &TranslationRequest) -> Result<TranslationResult> {
        let candidates = self.candidates(request.backend())?;
        let mut failures = Vec::new();

        for slot in candidates {
            match self.translate_with(slot, request).await {
                Ok(result) => {
                    info!(
                        "Translated {} chars {} -> {} via '{}' ({} attempt(s))",
                        request.text().chars().count(),
                        request.source(),
                        request.target().name,
                        result.backend_used,
                        result.attempt_count
                    );
                    return Ok(result);
                }
                Err(e) if !e.allows_fallback(self.fallback_on_permanent) => {
                    warn!("Backend '{}' failed permanently: {}", slot.id(), e);
                    return Err(e);
                }
                Err(e) => {
                    warn!("Backend '{}' failed: {}", slot.id(), e);
                    failures.push(BackendFailure {
                        backend: slot.id().to_string(),
                        error: e,
                    });
                }
            }
        }

        if failures.len() == 1 {
            return Err(failures.remove(0).error);
        }
        Err(PolyglotError::AllBackendsExhausted(failures))
    }

    /// Translate every text concurrently. Results keep the input order.
    pub async fn translate_batch(&self, batch: &BatchRequest) -> Vec<Result<TranslationResult>> {
        let items = batch.texts().iter().map(|text| async move {
            let request = batch.item(text)?;
            self.translate(&request).await
        });
        let results = join_all(items).await;

        let ok = results.iter().filter(|r| r.is_ok()).count();
        info!("Batch finished: {}/{} translated", ok, results.len());
        results
    }

    async fn translate_with(
        &self,
        slot: &BackendSlot,
        request: &TranslationRequest,
    ) -> Result<TranslationResult> {
        let backend = &slot.backend;
        let source = request.source();
        let target = request.target();

        // Checked up front so an unsupported pair spends no rate budget.
        for language in source.language().into_iter().chain([target]) {
            if !backend.supports(language) {
                return Err(PolyglotError::invalid_language(backend.id(), language.name));
            }
        }

        let text = request.text();
        let max_length = backend.max_text_length();

        let (translated_text, detected, attempt_count) = if text.chars().count() <= max_length {
            let out = self.call(slot, text, source, target).await?;
            (out.value.text, out.value.detected_source, out.attempts)
        } else {
            let chunks = TextChunker::new(max_length)
                .with_lookback(self.chunk_lookback)
                .split(text);
            debug!("[{}] translating {} chunks", backend.id(), chunks.len());

            let mut translated = Vec::with_capacity(chunks.len());
            let mut detected = None;
            let mut attempts = 0;
            for chunk in &chunks {
                if chunk.text.trim().is_empty() {
                    translated.push(chunk.text.clone());
                    continue;
                }
                let out = self.call(slot, &chunk.text, source, target).await?;
                attempts += out.attempts;
                detected = detected.or(out.value.detected_source);
                translated.push(out.value.text);
            }
            (chunker::join(&chunks, &translated), detected, attempts)
        };

        let detected_source_language = if source.is_auto() {
            detected.map(|raw| match language::from_detected(&raw) {
                Some(l) => l.name.to_string(),
                None => raw,
            })
        } else {
            None
        };

        Ok(TranslationResult {
            translated_text,
            detected_source_language,
            backend_used: backend.id().to_string(),
            attempt_count,
        })
    }

    /// One rate-limited, time-bounded, retried backend call.
    async fn call(
        &self,
        slot: &BackendSlot,
        text: &str,
        source: SourceLanguage,
        target: &'static Language,
    ) -> Result<Attempted<BackendTranslation>> {
        let call_timeout = self.call_timeout;
        self.retry
            .execute(|attempt| async move {
                slot.governor.acquire().await;
                debug!("[{}] attempt {}", slot.id(), attempt);
                match tokio::time::timeout(
                    call_timeout,
                    slot.backend.translate_one(text, source, target),
                )
                .await
                {
                    Ok(result) => result,
                    Err(_) => Err(PolyglotError::unavailable(
                        slot.id(),
                        format!("call timed out after {}ms", call_timeout.as_millis()),
                    )),
                }
            })
            .await
    }
}

fn unknown_backend(id: &str) -> PolyglotError {
    PolyglotError::Validation(format!("Unknown or disabled backend: {}", id))
}
