use crate::backend::BackendKind;
use crate::chunker::DEFAULT_LOOKBACK;
use crate::error::{PolyglotError, Result};
use crate::governor::RateLimit;
use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_MAX_BATCH_SIZE: usize = 10;

/// Overall deadline for one backend call, on top of the HTTP client timeout.
const DEFAULT_CALL_TIMEOUT_SECS: u64 = 45;

/// HTTP client timeout per backend.
const DEFAULT_BACKEND_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

/// One configured translation backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    pub id: String,
    pub kind: BackendKind,
    /// Lower values are tried first.
    #[serde(default)]
    pub priority: u32,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Overrides the kind's default chunking threshold (characters).
    #[serde(default)]
    pub max_text_length: Option<usize>,
    /// Overrides the kind's default quota.
    #[serde(default)]
    pub rate_limits: Option<Vec<RateLimit>>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_backend_timeout")]
    pub timeout_secs: u64,
}

fn default_enabled() -> bool {
    true
}

fn default_backend_timeout() -> u64 {
    DEFAULT_BACKEND_TIMEOUT_SECS
}

impl BackendConfig {
    pub fn new(id: impl Into<String>, kind: BackendKind) -> Self {
        Self {
            id: id.into(),
            kind,
            priority: 0,
            enabled: true,
            max_text_length: None,
            rate_limits: None,
            api_key: None,
            model: None,
            base_url: None,
            timeout_secs: DEFAULT_BACKEND_TIMEOUT_SECS,
        }
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn max_text_length(&self) -> usize {
        self.max_text_length
            .unwrap_or_else(|| self.kind.default_max_text_length())
    }

    pub fn rate_limits(&self) -> Vec<RateLimit> {
        self.rate_limits
            .clone()
            .unwrap_or_else(|| self.kind.default_rate_limits())
    }

    fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub max_batch_size: usize,
    pub call_timeout_secs: u64,
    /// Whether a permanent backend error (bad key, unsupported language)
    /// moves on to the next backend instead of failing the request.
    pub fallback_on_permanent: bool,
    pub chunk_lookback: usize,
    pub retry: RetryPolicy,
    pub backends: Vec<BackendConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            call_timeout_secs: DEFAULT_CALL_TIMEOUT_SECS,
            fallback_on_permanent: true,
            chunk_lookback: DEFAULT_LOOKBACK,
            retry: RetryPolicy::default(),
            backends: default_backends(),
        }
    }
}

fn default_backends() -> Vec<BackendConfig> {
    vec![
        BackendConfig::new("gemini", BackendKind::Gemini).with_priority(0),
        BackendConfig::new("openai", BackendKind::OpenAi).with_priority(1),
        // The public instance needs a key, so it stays off until configured.
        BackendConfig::new("libretranslate", BackendKind::LibreTranslate)
            .with_priority(2)
            .disabled(),
        BackendConfig::new("google", BackendKind::Google).with_priority(3),
    ]
}

impl Config {
    /// Load from the default config file (if present) and the environment.
    pub fn load() -> Result<Self> {
        let mut config = match Self::config_file_path() {
            Some(path) if path.exists() => Self::from_file(&path)?,
            _ => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.disable_keyless_backends();
        Ok(config)
    }

    /// Load from an explicit config file and the environment.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = Self::from_file(path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.disable_keyless_backends();
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config = toml::from_str::<Config>(&contents).map_err(|e| {
            PolyglotError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Override settings from environment-style variables.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("GEMINI_API_KEY") {
            self.set_for_kind(BackendKind::Gemini, |b| b.api_key = Some(key.clone()));
        }
        if let Some(key) = lookup("OPENAI_API_KEY") {
            self.set_for_kind(BackendKind::OpenAi, |b| b.api_key = Some(key.clone()));
        }
        if let Some(url) = lookup("LIBRETRANSLATE_URL") {
            // Naming an instance is an explicit opt-in.
            self.set_for_kind(BackendKind::LibreTranslate, |b| {
                b.base_url = Some(url.clone());
                b.enabled = true;
            });
        }
        if let Some(key) = lookup("LIBRETRANSLATE_API_KEY") {
            self.set_for_kind(BackendKind::LibreTranslate, |b| {
                b.api_key = Some(key.clone())
            });
        }
        if let Some(host) = lookup("HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("PORT") {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }
        if let Some(size) = lookup("POLYGLOT_MAX_BATCH_SIZE") {
            if let Ok(s) = size.parse() {
                self.max_batch_size = s;
            }
        }
    }

    fn set_for_kind(&mut self, kind: BackendKind, mut apply: impl FnMut(&mut BackendConfig)) {
        self.backends
            .iter_mut()
            .filter(|b| b.kind == kind)
            .for_each(|b| apply(b));
    }

    /// Turn off enabled backends whose provider needs a key we don't have.
    pub fn disable_keyless_backends(&mut self) {
        for backend in self
            .backends
            .iter_mut()
            .filter(|b| b.enabled && b.kind.requires_api_key() && !b.has_api_key())
        {
            warn!(
                "Backend '{}' disabled: no API key configured for {}",
                backend.id, backend.kind
            );
            backend.enabled = false;
        }
    }

    pub fn enabled_backends(&self) -> impl Iterator<Item = &BackendConfig> {
        self.backends.iter().filter(|b| b.enabled)
    }

    pub fn validate(&self) -> Result<()> {
        if self.enabled_backends().next().is_none() {
            return Err(PolyglotError::Config(
                "No translation backend is enabled. Set GEMINI_API_KEY or OPENAI_API_KEY, \
                 or enable a backend in the config file"
                    .to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for backend in &self.backends {
            if backend.id.trim().is_empty() {
                return Err(PolyglotError::Config("Backend id must not be empty".to_string()));
            }
            if !seen.insert(backend.id.as_str()) {
                return Err(PolyglotError::Config(format!(
                    "Duplicate backend id: {}",
                    backend.id
                )));
            }
            if backend.max_text_length == Some(0) {
                return Err(PolyglotError::Config(format!(
                    "Backend '{}': max_text_length must be greater than 0",
                    backend.id
                )));
            }
            if backend
                .rate_limits()
                .iter()
                .any(|l| l.max_calls == 0 || l.window.is_zero())
            {
                return Err(PolyglotError::Config(format!(
                    "Backend '{}': rate limits need a positive call count and window",
                    backend.id
                )));
            }
            if backend.timeout_secs == 0 {
                return Err(PolyglotError::Config(format!(
                    "Backend '{}': timeout_secs must be greater than 0",
                    backend.id
                )));
            }
        }

        if self.max_batch_size == 0 {
            return Err(PolyglotError::Config(
                "max_batch_size must be greater than 0".to_string(),
            ));
        }
        if self.call_timeout_secs == 0 {
            return Err(PolyglotError::Config(
                "call_timeout_secs must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn config_file_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("polyglot").join("config.toml"))
    }
}
