pub mod backend;
pub mod chunker;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod governor;
pub mod language;
pub mod retry;
pub mod server;

pub use config::Config;
pub use dispatcher::{BatchRequest, Dispatcher, TranslationRequest, TranslationResult};
pub use error::{PolyglotError, Result};
