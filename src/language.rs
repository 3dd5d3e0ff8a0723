//! Static language registry shared by every backend.
//!
//! Callers name languages the way the front end shows them ("Spanish",
//! "Chinese (Traditional)") or by ISO code. Each backend then maps the
//! resolved [`Language`] into its own scheme through [`LanguageScheme`].

use crate::error::{PolyglotError, Result};
use serde::Serialize;

/// Sentinel accepted as a source language to request auto-detection.
pub const AUTO: &str = "Auto";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Language {
    pub name: &'static str,
    pub code: &'static str,
}

const fn lang(name: &'static str, code: &'static str) -> Language {
    Language { name, code }
}

static LANGUAGES: [Language; 59] = [
    lang("English", "en"),
    lang("Spanish", "es"),
    lang("French", "fr"),
    lang("German", "de"),
    lang("Italian", "it"),
    lang("Portuguese", "pt"),
    lang("Russian", "ru"),
    lang("Chinese (Simplified)", "zh"),
    lang("Chinese (Traditional)", "zh-TW"),
    lang("Japanese", "ja"),
    lang("Korean", "ko"),
    lang("Arabic", "ar"),
    lang("Hindi", "hi"),
    lang("Bengali", "bn"),
    lang("Urdu", "ur"),
    lang("Persian", "fa"),
    lang("Turkish", "tr"),
    lang("Polish", "pl"),
    lang("Dutch", "nl"),
    lang("Swedish", "sv"),
    lang("Danish", "da"),
    lang("Norwegian", "no"),
    lang("Finnish", "fi"),
    lang("Greek", "el"),
    lang("Hebrew", "he"),
    lang("Thai", "th"),
    lang("Vietnamese", "vi"),
    lang("Indonesian", "id"),
    lang("Malay", "ms"),
    lang("Filipino", "tl"),
    lang("Ukrainian", "uk"),
    lang("Czech", "cs"),
    lang("Slovak", "sk"),
    lang("Hungarian", "hu"),
    lang("Romanian", "ro"),
    lang("Bulgarian", "bg"),
    lang("Croatian", "hr"),
    lang("Serbian", "sr"),
    lang("Slovenian", "sl"),
    lang("Estonian", "et"),
    lang("Latvian", "lv"),
    lang("Lithuanian", "lt"),
    lang("Icelandic", "is"),
    lang("Maltese", "mt"),
    lang("Luxembourgish", "lb"),
    lang("Catalan", "ca"),
    lang("Galician", "gl"),
    lang("Basque", "eu"),
    lang("Welsh", "cy"),
    lang("Irish", "ga"),
    lang("Scottish Gaelic", "gd"),
    lang("Swahili", "sw"),
    lang("Zulu", "zu"),
    lang("Afrikaans", "af"),
    lang("Belarusian", "be"),
    lang("Macedonian", "mk"),
    lang("Albanian", "sq"),
    lang("Bosnian", "bs"),
    lang("Breton", "br"),
];

/// Alternative spellings seen from clients and generative models.
const ALIASES: &[(&str, &str)] = &[
    ("chinese", "zh"),
    ("simplified chinese", "zh"),
    ("traditional chinese", "zh-TW"),
    ("mandarin", "zh"),
    ("tagalog", "tl"),
    ("farsi", "fa"),
    ("norwegian bokmal", "no"),
    ("gaelic", "gd"),
];

/// Every language in the registry.
pub fn all() -> &'static [Language] {
    &LANGUAGES
}

/// Resolve a language name, alias or ISO code (case-insensitive).
pub fn resolve(input: &str) -> Option<&'static Language> {
    let needle = input.trim();
    if needle.is_empty() {
        return None;
    }

    LANGUAGES
        .iter()
        .find(|l| l.name.eq_ignore_ascii_case(needle) || l.code.eq_ignore_ascii_case(needle))
        .or_else(|| {
            let lowered = needle.to_lowercase();
            ALIASES
                .iter()
                .find(|(alias, _)| *alias == lowered)
                .and_then(|(_, code)| by_code(code))
        })
}

fn by_code(code: &str) -> Option<&'static Language> {
    LANGUAGES.iter().find(|l| l.code.eq_ignore_ascii_case(code))
}

/// Map a code reported by a provider's language detection back to the registry.
///
/// Accepts provider-specific spellings (`zh-CN`, `iw`, `nb`, `zt`) and
/// strips region suffixes such as `en-US`.
pub fn from_detected(code: &str) -> Option<&'static Language> {
    let code = code.trim();
    match code.to_ascii_lowercase().as_str() {
        "zh-cn" | "zh-hans" => return by_code("zh"),
        "zh-hant" | "zt" => return by_code("zh-TW"),
        "iw" => return by_code("he"),
        "nb" | "nn" => return by_code("no"),
        "fil" => return by_code("tl"),
        _ => {}
    }

    by_code(code)
        .or_else(|| code.split(['-', '_']).next().and_then(by_code))
        .or_else(|| resolve(code))
}

/// Source language of a request: a concrete language or auto-detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceLanguage {
    Auto,
    Known(&'static Language),
}

impl SourceLanguage {
    pub fn is_auto(&self) -> bool {
        matches!(self, SourceLanguage::Auto)
    }

    pub fn language(&self) -> Option<&'static Language> {
        match self {
            SourceLanguage::Auto => None,
            SourceLanguage::Known(l) => Some(l),
        }
    }
}

impl std::fmt::Display for SourceLanguage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceLanguage::Auto => write!(f, "{}", AUTO),
            SourceLanguage::Known(l) => write!(f, "{}", l.name),
        }
    }
}

/// Parse a caller-supplied source language; empty input means auto-detect.
pub fn parse_source(input: &str) -> Result<SourceLanguage> {
    let trimmed = input.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(AUTO) {
        return Ok(SourceLanguage::Auto);
    }
    resolve(trimmed)
        .map(SourceLanguage::Known)
        .ok_or_else(|| PolyglotError::Validation(format!("Unsupported language: {}", trimmed)))
}

/// Parse a caller-supplied target language. `Auto` is not a valid target.
pub fn parse_target(input: &str) -> Result<&'static Language> {
    let trimmed = input.trim();
    if trimmed.eq_ignore_ascii_case(AUTO) {
        return Err(PolyglotError::Validation(
            "Cannot translate to 'Auto' language".to_string(),
        ));
    }
    resolve(trimmed)
        .ok_or_else(|| PolyglotError::Validation(format!("Unsupported language: {}", trimmed)))
}

/// Names offered to clients, with the auto-detect sentinel first.
pub fn supported_language_names() -> Vec<&'static str> {
    std::iter::once(AUTO)
        .chain(LANGUAGES.iter().map(|l| l.name))
        .collect()
}

/// How a backend spells languages on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageScheme {
    /// Full English names, used in generative prompts.
    Name,
    /// Google Translate web codes.
    Google,
    /// LibreTranslate codes; only a subset of the registry is available.
    Libre,
}

const GOOGLE_UNSUPPORTED: &[&str] = &["br"];

const LIBRE_SUPPORTED: &[&str] = &[
    "en", "ar", "bg", "bn", "ca", "cs", "da", "de", "el", "es", "et", "eu", "fa", "fi", "fr", "ga",
    "gl", "he", "hi", "hu", "id", "it", "ja", "ko", "lt", "lv", "ms", "no", "nl", "pl", "pt", "ro",
    "ru", "sk", "sl", "sq", "sv", "th", "tl", "tr", "uk", "ur", "vi", "zh", "zh-TW", "az", "eo",
];

impl LanguageScheme {
    /// The wire spelling of `language`, or `None` when the backend lacks it.
    pub fn code(&self, language: &Language) -> Option<&'static str> {
        match self {
            LanguageScheme::Name => Some(language.name),
            LanguageScheme::Google => match language.code {
                c if GOOGLE_UNSUPPORTED.contains(&c) => None,
                "zh" => Some("zh-CN"),
                "he" => Some("iw"),
                c => Some(c),
            },
            LanguageScheme::Libre => match language.code {
                c if !LIBRE_SUPPORTED.contains(&c) => None,
                "zh-TW" => Some("zt"),
                "no" => Some("nb"),
                c => Some(c),
            },
        }
    }

    pub fn supports(&self, language: &Language) -> bool {
        self.code(language).is_some()
    }

    /// Registry languages this scheme can express.
    pub fn languages(&self) -> Vec<&'static Language> {
        LANGUAGES.iter().filter(|l| self.supports(l)).collect()
    }
}
