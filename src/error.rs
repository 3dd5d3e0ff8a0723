use thiserror::Error;

/// The last error a single backend produced before the dispatcher moved on.
#[derive(Debug)]
pub struct BackendFailure {
    pub backend: String,
    pub error: PolyglotError,
}

#[derive(Error, Debug)]
pub enum PolyglotError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{backend} does not support language '{language}'")]
    InvalidLanguage { backend: String, language: String },

    #[error("{backend} unavailable: {message}")]
    ProviderUnavailable { backend: String, message: String },

    #[error("{backend} rejected the request: {message}")]
    ProviderRejected { backend: String, message: String },

    #[error("Retries exhausted after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        last: Box<PolyglotError>,
    },

    #[error("All backends failed: {}", summarize_failures(.0))]
    AllBackendsExhausted(Vec<BackendFailure>),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl PolyglotError {
    pub fn unavailable(backend: &str, message: impl Into<String>) -> Self {
        PolyglotError::ProviderUnavailable {
            backend: backend.to_string(),
            message: message.into(),
        }
    }

    pub fn rejected(backend: &str, message: impl Into<String>) -> Self {
        PolyglotError::ProviderRejected {
            backend: backend.to_string(),
            message: message.into(),
        }
    }

    pub fn invalid_language(backend: &str, language: impl Into<String>) -> Self {
        PolyglotError::InvalidLanguage {
            backend: backend.to_string(),
            language: language.into(),
        }
    }

    /// Whether retrying the same call may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, PolyglotError::ProviderUnavailable { .. })
    }

    /// Whether another backend may still succeed where this one failed.
    ///
    /// Exhausted retries always qualify. Permanent backend errors only
    /// qualify when the caller allows fallback on them.
    pub fn allows_fallback(&self, fallback_on_permanent: bool) -> bool {
        match self {
            PolyglotError::RetriesExhausted { .. } | PolyglotError::ProviderUnavailable { .. } => {
                true
            }
            PolyglotError::InvalidLanguage { .. } | PolyglotError::ProviderRejected { .. } => {
                fallback_on_permanent
            }
            _ => false,
        }
    }

    /// Taxonomy name reported to API callers.
    pub fn kind(&self) -> &'static str {
        match self {
            PolyglotError::Validation(_) => "ValidationError",
            PolyglotError::InvalidLanguage { .. } => "InvalidLanguage",
            PolyglotError::ProviderUnavailable { .. } => "ProviderUnavailable",
            PolyglotError::ProviderRejected { .. } => "ProviderRejected",
            PolyglotError::RetriesExhausted { .. } => "RetriesExhausted",
            PolyglotError::AllBackendsExhausted(_) => "AllBackendsExhausted",
            PolyglotError::Config(_) => "ConfigError",
            PolyglotError::Io(_) => "IoError",
            PolyglotError::Http(_) => "HttpError",
        }
    }
}

fn summarize_failures(failures: &[BackendFailure]) -> String {
    if failures.is_empty() {
        return "no backend was attempted".to_string();
    }
    failures
        .iter()
        .map(|f| format!("[{}] {}", f.backend, f.error))
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T> = std::result::Result<T, PolyglotError>;
