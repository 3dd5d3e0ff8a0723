//! Prompt construction and response parsing shared by the generative backends.

use crate::backend::BackendTranslation;
use crate::language::{Language, SourceLanguage};
use regex::Regex;
use std::sync::OnceLock;
use tracing::warn;

pub(crate) const SYSTEM_PROMPT: &str =
    "You are a professional translator. Translate accurately and naturally.";

/// Build the translation prompt.
///
/// With auto-detection the model is asked to name the source language on
/// a `Language:` line before the `Translation:` line.
pub(crate) fn build_prompt(text: &str, source: SourceLanguage, target: &Language) -> String {
    match source {
        SourceLanguage::Known(from) => format!(
            r#"Translate the following text from {} to {}.
Maintain the original meaning, tone, and style. Return ONLY the translated text, nothing else. Preserve all formatting and line breaks.

Text to translate:
{text}"#,
            from.name, target.name
        ),
        SourceLanguage::Auto => format!(
            r#"Translate the following text to {}.
Maintain the original meaning, tone, and style. Preserve all formatting and line breaks.
Respond in exactly this format and nothing else:
Language: <name of the source language, in English>
Translation: <the translated text>

Text to translate:
{text}"#,
            target.name
        ),
    }
}

/// Matches both the two-line reply and `Language: X Translation: Y` on one line.
fn detected_format() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)^\s*Language:\s*([^\n]+?)\s+Translation:[ \t]*\n?(.*)$")
            .expect("Invalid regex")
    })
}

fn translation_label() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)^\s*Translation:\s*(.*)$").expect("Invalid regex"))
}

/// Turn raw model output into a translation.
pub(crate) fn parse_output(raw: &str, source: SourceLanguage) -> BackendTranslation {
    if source.is_auto() {
        if let Some(caps) = detected_format().captures(raw) {
            return BackendTranslation {
                text: caps[2].trim().to_string(),
                detected_source: Some(caps[1].to_string()),
            };
        }
        if let Some(caps) = translation_label().captures(raw) {
            warn!("Model omitted the Language line, no source detected");
            return BackendTranslation {
                text: caps[1].trim().to_string(),
                detected_source: None,
            };
        }
        warn!("Model ignored the detection format, using the whole response");
    }

    BackendTranslation {
        text: raw.trim().to_string(),
        detected_source: None,
    }
}
