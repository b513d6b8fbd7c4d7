//! crates/silogia_core/src/tokenizer.rs
//!
//! Splits a sentence into word and punctuation tokens and assigns each a
//! Universal POS tag. `RuleAnnotator` is a small lexicon-and-suffix tagger for
//! Spanish; any other annotator can be plugged in through the `TextAnnotator` port.

use crate::ports::TextAnnotator;
use unicode_segmentation::UnicodeSegmentation;

/// A token of a sentence. `start`/`end` are byte offsets into that sentence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub pos: String,
    pub start: usize,
    pub end: usize,
}

/// Splits `sentence` on Unicode word boundaries, dropping whitespace runs.
pub fn tokenize(sentence: &str) -> Vec<(usize, &str)> {
    sentence
        .split_word_bound_indices()
        .filter(|(_, piece)| !piece.trim().is_empty())
        .collect()
}

const DETERMINERS: &[&str] = &[
    "el", "la", "los", "las", "un", "una", "unos", "unas", "este", "esta", "estos", "estas",
    "ese", "esa", "esos", "esas", "aquel", "aquella", "aquellos", "aquellas", "su", "sus", "mi",
    "mis", "tu", "tus", "nuestro", "nuestra", "nuestros", "nuestras", "cada", "todo", "toda",
    "todos", "todas", "otro", "otra", "otros", "otras", "mucho", "mucha", "muchos", "muchas",
    "algún", "alguna", "algunos", "algunas", "ningún", "ninguna",
];

const ADPOSITIONS: &[&str] = &[
    "a", "ante", "bajo", "con", "contra", "de", "desde", "en", "entre", "hacia", "hasta", "para",
    "por", "según", "sin", "sobre", "tras", "durante", "mediante", "del", "al",
];

const COORDINATORS: &[&str] = &["y", "e", "o", "u", "ni", "pero", "sino", "mas"];

const SUBORDINATORS: &[&str] = &[
    "que", "porque", "aunque", "si", "como", "cuando", "pues", "mientras", "donde", "luego",
];

const PRONOUNS: &[&str] = &[
    "yo", "tú", "él", "ella", "ello", "nosotros", "nosotras", "vosotros", "ellos", "ellas",
    "usted", "ustedes", "me", "te", "se", "nos", "os", "le", "les", "lo", "esto", "eso",
    "aquello", "quien", "quienes", "cual", "cuales", "algo", "nada", "alguien", "nadie",
];

const AUXILIARIES: &[&str] = &[
    "es", "son", "era", "eran", "fue", "fueron", "ser", "sea", "sean", "será", "serán", "sería",
    "está", "están", "estaba", "estaban", "estar", "ha", "han", "he", "hemos", "había",
    "habían", "sido", "haber", "hay",
];

const ADVERBS: &[&str] = &[
    "no", "sí", "más", "menos", "muy", "también", "tampoco", "siempre", "nunca", "ya", "tanto",
    "así", "bien", "mal", "aquí", "allí", "hoy", "ahora", "además", "entonces", "quizás",
    "todavía", "aún", "solo", "sólo",
];

const VERB_SUFFIXES: &[&str] = &[
    "ar", "er", "ir", "amos", "emos", "imos", "ando", "iendo", "aron", "ieron", "aba", "aban",
    "ían", "an", "en",
];

const ADJECTIVE_SUFFIXES: &[&str] = &[
    "ble", "bles", "oso", "osa", "osos", "osas", "ivo", "iva", "ivos", "ivas", "ental",
    "entales", "ico", "ica", "icos", "icas",
];

/// Lexicon-and-suffix part-of-speech annotator for Spanish text.
#[derive(Debug, Clone, Default)]
pub struct RuleAnnotator;

impl RuleAnnotator {
    pub fn new() -> Self {
        Self
    }

    fn pos_for(word: &str, is_first: bool) -> &'static str {
        if word.chars().all(|c| !c.is_alphanumeric()) {
            return "PUNCT";
        }
        if word.chars().all(|c| c.is_ascii_digit() || c == '.' || c == ',') {
            return "NUM";
        }

        let lower = word.to_lowercase();
        let lower = lower.as_str();
        if DETERMINERS.contains(&lower) {
            "DET"
        } else if ADPOSITIONS.contains(&lower) {
            "ADP"
        } else if COORDINATORS.contains(&lower) {
            "CCONJ"
        } else if SUBORDINATORS.contains(&lower) {
            "SCONJ"
        } else if PRONOUNS.contains(&lower) {
            "PRON"
        } else if AUXILIARIES.contains(&lower) {
            "AUX"
        } else if ADVERBS.contains(&lower) || lower.ends_with("mente") {
            "ADV"
        } else if !is_first && word.chars().next().is_some_and(char::is_uppercase) {
            "PROPN"
        } else if ADJECTIVE_SUFFIXES.iter().any(|s| lower.ends_with(s)) {
            "ADJ"
        } else if lower.chars().count() > 3 && VERB_SUFFIXES.iter().any(|s| lower.ends_with(s)) {
            "VERB"
        } else {
            "NOUN"
        }
    }
}

impl TextAnnotator for RuleAnnotator {
    fn annotate(&self, sentence: &str) -> Vec<Token> {
        let mut seen_word = false;
        tokenize(sentence)
            .into_iter()
            .map(|(start, text)| {
                let pos = Self::pos_for(text, !seen_word);
                if pos != "PUNCT" {
                    seen_word = true;
                }
                Token {
                    text: text.to_string(),
                    pos: pos.to_string(),
                    start,
                    end: start + text.len(),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(sentence: &str) -> Vec<(String, String)> {
        RuleAnnotator::new()
            .annotate(sentence)
            .into_iter()
            .map(|t| (t.text, t.pos))
            .collect()
    }

    #[test]
    fn splits_words_and_punctuation_with_offsets() {
        let sentence = "Por lo tanto, debemos invertir.";
        let tokens = RuleAnnotator::new().annotate(sentence);
        let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, ["Por", "lo", "tanto", ",", "debemos", "invertir", "."]);
        for token in &tokens {
            assert_eq!(&sentence[token.start..token.end], token.text);
        }
    }

    #[test]
    fn offsets_are_byte_offsets_for_accented_text() {
        let sentence = "La educación es clave";
        let tokens = RuleAnnotator::new().annotate(sentence);
        assert_eq!(tokens[1].text, "educación");
        assert_eq!(&sentence[tokens[1].start..tokens[1].end], "educación");
        assert_eq!(tokens[2].start, "La educación ".len());
    }

    #[test]
    fn assigns_closed_class_and_heuristic_tags() {
        let tagged = tags("¿Acaso María debe estudiar rápidamente en 2024?");
        let pos: Vec<&str> = tagged.iter().map(|(_, p)| p.as_str()).collect();
        assert_eq!(pos, ["PUNCT", "NOUN", "PROPN", "NOUN", "VERB", "ADV", "ADP", "NUM", "PUNCT"]);
    }

    #[test]
    fn sentence_initial_capital_is_not_a_proper_noun() {
        let tagged = tags("Educación y salud");
        assert_eq!(tagged[0].1, "NOUN");
        assert_eq!(tagged[1].1, "CCONJ");
    }

    #[test]
    fn empty_sentence_has_no_tokens() {
        assert!(RuleAnnotator::new().annotate("   ").is_empty());
    }
}
