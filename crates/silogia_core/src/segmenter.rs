//! crates/silogia_core/src/segmenter.rs
//!
//! Splits submitted text into paragraphs (blank lines) and then into sentences
//! (terminal punctuation followed by whitespace and a capital letter).
//! Every span is a byte range into the original text, so later offsets can be
//! mapped back to it without loss.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

static PARAGRAPH_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n[ \t\r]*\n").expect("paragraph break pattern is valid"));

static SENTENCE_END: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[.!?…]+["'»”’)\]]*\s+"#).expect("sentence end pattern is valid")
});

/// Abbreviations whose trailing period never ends a sentence.
const ABBREVIATIONS: &[&str] = &[
    "sr", "sra", "srta", "sres", "dr", "dra", "lic", "ing", "prof", "arq", "ud", "uds", "vd",
    "vds", "etc", "ej", "pág", "págs", "núm", "art", "cap", "vol", "aprox", "av", "avda",
    "dpto", "ee.uu", "cf", "vs", "i.e", "e.g", "a.c", "d.c", "p.m", "a.m",
];

/// A sentence located in the submitted text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentence {
    pub text: String,
    /// Byte offset of the first character of `text` in the submitted text.
    pub start: usize,
}

impl Sentence {
    pub fn end(&self) -> usize {
        self.start + self.text.len()
    }
}

/// Byte range of a paragraph in the submitted text, trimmed of surrounding whitespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// Splits text on blank lines. Whitespace-only paragraphs are dropped.
pub fn paragraphs(text: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut cursor = 0;
    for brk in PARAGRAPH_BREAK.find_iter(text) {
        push_trimmed(text, cursor, brk.start(), &mut spans);
        cursor = brk.end();
    }
    push_trimmed(text, cursor, text.len(), &mut spans);
    spans
}

/// Splits text into non-empty, trimmed sentences in document order.
pub fn segment(text: &str) -> Vec<Sentence> {
    let abbreviations: HashSet<&str> = ABBREVIATIONS.iter().copied().collect();
    let mut sentences = Vec::new();

    for paragraph in paragraphs(text) {
        let body = &text[paragraph.start..paragraph.end];
        let mut cursor = 0;
        for end in SENTENCE_END.find_iter(body) {
            let punctuation = end.as_str().trim_end();
            let rest = &body[end.end()..];
            if !starts_sentence(rest) {
                continue;
            }
            if punctuation.starts_with('.') && is_abbreviation(&body[cursor..end.start()], &abbreviations) {
                continue;
            }
            let sentence_end = end.start() + punctuation.len();
            let mut spans = Vec::new();
            push_trimmed(body, cursor, sentence_end, &mut spans);
            sentences.extend(spans.into_iter().map(|s| Sentence {
                text: body[s.start..s.end].to_string(),
                start: paragraph.start + s.start,
            }));
            cursor = end.end();
        }
        if cursor < body.len() {
            let mut spans = Vec::new();
            push_trimmed(body, cursor, body.len(), &mut spans);
            sentences.extend(spans.into_iter().map(|s| Sentence {
                text: body[s.start..s.end].to_string(),
                start: paragraph.start + s.start,
            }));
        }
    }
    sentences
}

/// Rebuilds the submitted text from its sentences and the original separators
/// between them. `rejoin(text, &segment(text)) == text` for every input.
pub fn rejoin(original: &str, sentences: &[Sentence]) -> String {
    let mut out = String::with_capacity(original.len());
    let mut cursor = 0;
    for sentence in sentences {
        out.push_str(&original[cursor..sentence.start]);
        out.push_str(&sentence.text);
        cursor = sentence.end();
    }
    out.push_str(&original[cursor..]);
    out
}

fn push_trimmed(text: &str, start: usize, end: usize, spans: &mut Vec<Span>) {
    let slice = &text[start..end];
    let trimmed = slice.trim_start();
    let lead = slice.len() - trimmed.len();
    let trimmed = trimmed.trim_end();
    if !trimmed.is_empty() {
        spans.push(Span {
            start: start + lead,
            end: start + lead + trimmed.len(),
        });
    }
}

fn starts_sentence(rest: &str) -> bool {
    rest.trim_start_matches(['¿', '¡', '"', '«', '“', '(', '\''])
        .chars()
        .next()
        .is_some_and(|c| c.is_uppercase() || c.is_ascii_digit())
}

fn is_abbreviation(before: &str, abbreviations: &HashSet<&str>) -> bool {
    let word = before
        .rsplit(char::is_whitespace)
        .next()
        .unwrap_or("")
        .trim_start_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase();
    abbreviations.contains(word.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(text: &str) -> Vec<String> {
        segment(text).into_iter().map(|s| s.text).collect()
    }

    #[test]
    fn empty_text_has_no_sentences() {
        assert!(segment("").is_empty());
        assert!(segment("  \n\n  ").is_empty());
    }

    #[test]
    fn splits_on_terminal_punctuation_before_capitals() {
        assert_eq!(
            texts("La educación es fundamental. Por lo tanto, debemos invertir. ¿Y luego? ¡Actuar!"),
            ["La educación es fundamental.", "Por lo tanto, debemos invertir.", "¿Y luego?", "¡Actuar!"]
        );
    }

    #[test]
    fn lowercase_continuation_does_not_split() {
        assert_eq!(texts("Costó 3.5 millones. y siguió."), ["Costó 3.5 millones. y siguió."]);
    }

    #[test]
    fn abbreviations_do_not_end_sentences() {
        assert_eq!(
            texts("El Dr. García y la Sra. Pérez opinan igual. Nadie lo duda."),
            ["El Dr. García y la Sra. Pérez opinan igual.", "Nadie lo duda."]
        );
    }

    #[test]
    fn blank_lines_separate_paragraphs() {
        let text = "Primera idea sin punto\n\nSegunda idea. Tercera idea.";
        assert_eq!(texts(text), ["Primera idea sin punto", "Segunda idea.", "Tercera idea."]);
        assert_eq!(paragraphs(text).len(), 2);
    }

    #[test]
    fn sentence_offsets_point_into_original_text() {
        let text = "  Uno dos.  Tres cuatro.\n\n\tCinco… Seis";
        for sentence in segment(text) {
            assert_eq!(&text[sentence.start..sentence.end()], sentence.text);
            assert!(!sentence.text.trim().is_empty());
        }
    }

    #[test]
    fn rejoining_sentences_reconstructs_the_text() {
        let samples = [
            "La educación es fundamental para el desarrollo. Por lo tanto, debemos invertir más en escuelas.",
            "  Espacios al inicio. Y al final.  ",
            "Párrafo uno.\n\n\nPárrafo dos! Con \"citas.\" Sí.",
            "sin mayúsculas ni puntos",
        ];
        for text in samples {
            assert_eq!(rejoin(text, &segment(text)), text);
        }
    }

    #[test]
    fn closing_quotes_stay_with_their_sentence() {
        assert_eq!(texts("Dijo «basta.» Luego calló."), ["Dijo «basta.»", "Luego calló."]);
    }
}
