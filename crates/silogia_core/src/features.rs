//! crates/silogia_core/src/features.rs
//!
//! Turns an annotated sentence into the per-token feature maps consumed by the
//! sequence tagger: lexical shape, part of speech, discourse-marker membership,
//! position in the sentence, and a window of neighbouring-token features.

use crate::tokenizer::Token;
use std::collections::BTreeMap;

/// Sentinel used for neighbour features that fall before the first token.
pub const BOS: &str = "__BOS__";
/// Sentinel used for neighbour features that fall after the last token.
pub const EOS: &str = "__EOS__";

/// Window size the bundled tagger was trained with.
pub const DEFAULT_WINDOW: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub enum FeatureValue {
    Text(String),
    Flag(bool),
    Number(f64),
}

/// Feature name to value. Ordered so that a feature sequence is reproducible.
pub type FeatureMap = BTreeMap<String, FeatureValue>;

/// What a discourse marker usually signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    Premise,
    Conclusion,
    Contrast,
    Elaboration,
}

impl MarkerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarkerKind::Premise => "premise",
            MarkerKind::Conclusion => "conclusion",
            MarkerKind::Contrast => "contrast",
            MarkerKind::Elaboration => "elaboration",
        }
    }
}

/// Spanish connectives and discourse markers, one or more words each.
pub const DISCOURSE_MARKERS: &[(&str, MarkerKind)] = &[
    ("por lo tanto", MarkerKind::Conclusion),
    ("por consiguiente", MarkerKind::Conclusion),
    ("en consecuencia", MarkerKind::Conclusion),
    ("por ende", MarkerKind::Conclusion),
    ("así que", MarkerKind::Conclusion),
    ("así pues", MarkerKind::Conclusion),
    ("de modo que", MarkerKind::Conclusion),
    ("de manera que", MarkerKind::Conclusion),
    ("en conclusión", MarkerKind::Conclusion),
    ("en definitiva", MarkerKind::Conclusion),
    ("por eso", MarkerKind::Conclusion),
    ("por ello", MarkerKind::Conclusion),
    ("por esto", MarkerKind::Conclusion),
    ("entonces", MarkerKind::Conclusion),
    ("luego", MarkerKind::Conclusion),
    ("porque", MarkerKind::Premise),
    ("ya que", MarkerKind::Premise),
    ("puesto que", MarkerKind::Premise),
    ("dado que", MarkerKind::Premise),
    ("debido a", MarkerKind::Premise),
    ("a causa de", MarkerKind::Premise),
    ("gracias a", MarkerKind::Premise),
    ("considerando que", MarkerKind::Premise),
    ("teniendo en cuenta", MarkerKind::Premise),
    ("pues", MarkerKind::Premise),
    ("sin embargo", MarkerKind::Contrast),
    ("no obstante", MarkerKind::Contrast),
    ("a pesar de", MarkerKind::Contrast),
    ("en cambio", MarkerKind::Contrast),
    ("por el contrario", MarkerKind::Contrast),
    ("aunque", MarkerKind::Contrast),
    ("pero", MarkerKind::Contrast),
    ("es decir", MarkerKind::Elaboration),
    ("o sea", MarkerKind::Elaboration),
    ("por ejemplo", MarkerKind::Elaboration),
    ("además", MarkerKind::Elaboration),
    ("asimismo", MarkerKind::Elaboration),
];

/// Finds, for every token, the discourse marker it belongs to (if any).
///
/// Markers are matched case-insensitively over consecutive tokens, longest
/// marker first, and matches never overlap.
pub fn find_markers(tokens: &[Token]) -> Vec<Option<MarkerKind>> {
    let lowered: Vec<String> = tokens.iter().map(|t| t.text.to_lowercase()).collect();
    let mut markers: Vec<(Vec<&str>, MarkerKind)> = DISCOURSE_MARKERS
        .iter()
        .map(|(phrase, kind)| (phrase.split(' ').collect(), *kind))
        .collect();
    markers.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

    let mut found = vec![None; tokens.len()];
    let mut i = 0;
    while i < tokens.len() {
        let hit = markers.iter().find(|(words, _)| {
            i + words.len() <= lowered.len()
                && words.iter().zip(&lowered[i..]).all(|(w, t)| *w == t.as_str())
        });
        match hit {
            Some((words, kind)) => {
                for slot in &mut found[i..i + words.len()] {
                    *slot = Some(*kind);
                }
                i += words.len();
            }
            None => i += 1,
        }
    }
    found
}

/// Builds feature maps for one sentence at a time.
#[derive(Debug, Clone, Copy)]
pub struct FeatureExtractor {
    window: usize,
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl FeatureExtractor {
    pub fn new(window: usize) -> Self {
        Self { window }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Produces one feature map per token. An empty sentence yields an empty sequence.
    pub fn sentence_features(&self, tokens: &[Token]) -> Vec<FeatureMap> {
        let markers = find_markers(tokens);
        (0..tokens.len())
            .map(|i| self.token_features(tokens, &markers, i))
            .collect()
    }

    fn token_features(&self, tokens: &[Token], markers: &[Option<MarkerKind>], i: usize) -> FeatureMap {
        let token = &tokens[i];
        let word = token.text.as_str();
        let lower = word.to_lowercase();
        let mut map = FeatureMap::new();

        map.insert("bias".into(), FeatureValue::Number(1.0));
        map.insert("word.lower".into(), FeatureValue::Text(lower.clone()));
        map.insert("word.suffix3".into(), FeatureValue::Text(last_chars(&lower, 3)));
        map.insert("word.prefix3".into(), FeatureValue::Text(lower.chars().take(3).collect()));
        map.insert("word.istitle".into(), FeatureValue::Flag(is_title(word)));
        map.insert(
            "word.isupper".into(),
            FeatureValue::Flag(word.chars().any(char::is_alphabetic) && word == word.to_uppercase()),
        );
        map.insert(
            "word.isdigit".into(),
            FeatureValue::Flag(word.chars().all(|c| c.is_ascii_digit())),
        );
        map.insert(
            "word.ispunct".into(),
            FeatureValue::Flag(word.chars().all(|c| !c.is_alphanumeric())),
        );
        map.insert("pos".into(), FeatureValue::Text(token.pos.clone()));
        map.insert(
            "pos.major".into(),
            FeatureValue::Text(token.pos.chars().take(2).collect()),
        );
        map.insert("marker".into(), FeatureValue::Flag(markers[i].is_some()));
        map.insert(
            "marker.kind".into(),
            FeatureValue::Text(markers[i].map_or("none", |k| k.as_str()).to_string()),
        );
        map.insert("position".into(), FeatureValue::Text(position_bucket(i, tokens.len()).into()));

        for k in 1..=self.window {
            let before = i.checked_sub(k);
            self.insert_neighbour(&mut map, &format!("-{k}"), before, tokens, markers, BOS);
            let after = Some(i + k).filter(|&j| j < tokens.len());
            self.insert_neighbour(&mut map, &format!("+{k}"), after, tokens, markers, EOS);
        }
        map
    }

    fn insert_neighbour(
        &self,
        map: &mut FeatureMap,
        prefix: &str,
        index: Option<usize>,
        tokens: &[Token],
        markers: &[Option<MarkerKind>],
        sentinel: &str,
    ) {
        match index {
            Some(j) => {
                map.insert(
                    format!("{prefix}:word.lower"),
                    FeatureValue::Text(tokens[j].text.to_lowercase()),
                );
                map.insert(format!("{prefix}:pos"), FeatureValue::Text(tokens[j].pos.clone()));
                map.insert(format!("{prefix}:marker"), FeatureValue::Flag(markers[j].is_some()));
            }
            None => {
                map.insert(format!("{prefix}:word.lower"), FeatureValue::Text(sentinel.into()));
                map.insert(format!("{prefix}:pos"), FeatureValue::Text(sentinel.into()));
                map.insert(format!("{prefix}:marker"), FeatureValue::Flag(false));
            }
        }
    }
}

fn position_bucket(i: usize, len: usize) -> &'static str {
    match (i, len) {
        (_, 1) => "only",
        (0, _) => "first",
        (i, len) if i + 1 == len => "last",
        _ => "middle",
    }
}

fn last_chars(s: &str, n: usize) -> String {
    let count = s.chars().count();
    s.chars().skip(count.saturating_sub(n)).collect()
}

fn is_title(word: &str) -> bool {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) if first.is_uppercase() => chars.all(|c| !c.is_uppercase()),
        _ => false,
    }
}
