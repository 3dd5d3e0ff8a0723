//! Splitting of oversized texts into boundary-aligned chunks.
//!
//! Lengths are counted in characters, not bytes. Each chunk keeps the
//! whitespace that followed it in the original text, so joining the
//! untranslated chunks gives back the input exactly.

use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

/// How far back from a chunk's hard limit we search for a boundary (characters).
pub const DEFAULT_LOOKBACK: usize = 200;

/// A piece of the input and the whitespace that separated it from the next piece.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub text: String,
    pub separator: String,
}

/// Sentence endings: Latin punctuation followed by whitespace, or CJK full stops.
fn sentence_end() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"[.!?…]+["'”’)\]]*\s|[。！？]+["'”’」』)]*"#).expect("Invalid regex")
    })
}

#[derive(Debug, Clone, Copy)]
pub struct TextChunker {
    max_length: usize,
    lookback: usize,
}

impl TextChunker {
    pub fn new(max_length: usize) -> Self {
        let max_length = max_length.max(1);
        Self {
            max_length,
            lookback: DEFAULT_LOOKBACK.min(max_length),
        }
    }

    pub fn with_lookback(mut self, lookback: usize) -> Self {
        self.lookback = lookback.clamp(1, self.max_length);
        self
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Split `text` into ordered chunks of at most `max_length` characters.
    pub fn split(&self, text: &str) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        let mut pos = 0;

        while pos < text.len() {
            let rest = &text[pos..];
            let Some((window_end, _)) = rest.char_indices().nth(self.max_length) else {
                chunks.push(Chunk {
                    text: rest.to_string(),
                    separator: String::new(),
                });
                break;
            };

            let cut = self.find_boundary(rest, window_end).unwrap_or(window_end);
            let after = &rest[cut..];
            let separator_len = after.len() - after.trim_start().len();

            chunks.push(Chunk {
                text: rest[..cut].to_string(),
                separator: after[..separator_len].to_string(),
            });
            pos += cut + separator_len;
        }

        debug!(
            "Split {} chars into {} chunk(s) (max {})",
            text.chars().count(),
            chunks.len(),
            self.max_length
        );
        chunks
    }

    /// Best cut point in `rest[..=window_end]`, searching only the lookback region.
    fn find_boundary(&self, rest: &str, window_end: usize) -> Option<usize> {
        let next_len = rest[window_end..]
            .chars()
            .next()
            .map(char::len_utf8)
            .unwrap_or(0);
        let lookahead = &rest[..window_end + next_len];
        let floor = rest
            .char_indices()
            .nth(self.max_length - self.lookback)
            .map(|(i, _)| i)
            .unwrap_or(0);

        let sentence = sentence_end()
            .find_iter(lookahead)
            .map(|m| {
                let matched = m.as_str();
                m.start() + matched.trim_end().len()
            })
            .filter(|&cut| cut > 0 && cut >= floor && cut <= window_end)
            .last();
        if sentence.is_some() {
            return sentence;
        }

        lookahead
            .char_indices()
            .rev()
            .filter(|&(i, c)| c.is_whitespace() && i >= floor && i <= window_end)
            .map(|(i, _)| rest[..i].trim_end().len())
            .find(|&cut| cut > 0)
    }
}

/// Split with the default lookback.
pub fn split(text: &str, max_length: usize) -> Vec<Chunk> {
    TextChunker::new(max_length).split(text)
}

/// Reassemble translated chunks in order, reusing the original separators.
///
/// Missing translations are treated as empty; extra ones are ignored.
pub fn join<S: AsRef<str>>(chunks: &[Chunk], translated: &[S]) -> String {
    let mut out = String::new();
    for (i, chunk) in chunks.iter().enumerate() {
        if let Some(t) = translated.get(i) {
            out.push_str(t.as_ref());
        }
        out.push_str(&chunk.separator);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "The quick brown fox jumps over the lazy dog. It was a sunny day!\n\
        Nobody expected what happened next? The end… Or was it.  Maybe not  \n";

    fn originals(chunks: &[Chunk]) -> Vec<&str> {
        chunks.iter().map(|c| c.text.as_str()).collect()
    }

    #[test]
    fn test_short_text_is_single_chunk() {
        let chunks = split("Hello", 10);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Hello");
        assert!(chunks[0].separator.is_empty());
    }

    #[test]
    fn test_prefers_sentence_boundary() {
        let chunks = split("First sentence. Second sentence is longer", 25);
        assert_eq!(chunks[0].text, "First sentence.");
        assert_eq!(chunks[0].separator, " ");
        assert_eq!(chunks[1].text, "Second sentence is longer");
    }

    #[test]
    fn test_falls_back_to_word_boundary() {
        let chunks = split("alpha beta gamma delta", 12);
        assert_eq!(originals(&chunks), vec!["alpha beta", "gamma delta"]);
    }

    #[test]
    fn test_hard_cut_without_boundaries() {
        let chunks = split("abcdefghij", 4);
        assert_eq!(originals(&chunks), vec!["abcd", "efgh", "ij"]);
        assert!(chunks.iter().all(|c| c.separator.is_empty()));
    }

    #[test]
    fn test_cjk_sentence_boundaries() {
        let chunks = split("你好。世界。再见", 4);
        assert_eq!(originals(&chunks), vec!["你好。", "世界。", "再见"]);
    }

    #[test]
    fn test_lookback_limits_boundary_search() {
        // The only space is far from the limit, so a short lookback hard-cuts.
        let chunks = TextChunker::new(10).with_lookback(2).split("ab cdefghijklmnop");
        assert_eq!(chunks[0].text, "ab cdefghi");

        let chunks = TextChunker::new(10).split("ab cdefghijklmnop");
        assert_eq!(chunks[0].text, "ab");
    }

    #[test]
    fn test_chunks_respect_max_length_and_round_trip() {
        for max in 1..40 {
            let chunks = split(SAMPLE, max);
            for chunk in &chunks {
                assert!(
                    chunk.text.chars().count() <= max,
                    "chunk {:?} exceeds {}",
                    chunk.text,
                    max
                );
            }
            assert_eq!(join(&chunks, &originals(&chunks)), SAMPLE);
        }
    }

    #[test]
    fn test_round_trip_multibyte() {
        let text = "Ñandú corre rápido. Über den Wolken muss die Freiheit wohl grenzenlos sein. 東京は大きい。";
        for max in [3, 7, 16, 50] {
            let chunks = split(text, max);
            assert_eq!(join(&chunks, &originals(&chunks)), text);
        }
    }

    #[test]
    fn test_join_keeps_order_and_separators() {
        let chunks = split("One. Two.\nThree.", 6);
        assert_eq!(originals(&chunks), vec!["One.", "Two.", "Three."]);
        let joined = join(&chunks, &["Uno.", "Dos.", "Tres."]);
        assert_eq!(joined, "Uno. Dos.\nTres.");
    }
}
