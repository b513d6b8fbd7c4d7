//! crates/silogia_core/src/tagger.rs
//!
//! Runs the sequence tagger over each sentence and merges the BIO labels it
//! returns into premise/conclusion components with character offsets into the
//! full submitted text. Components never cross sentence boundaries.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::ComponentType;
use crate::features::FeatureExtractor;
use crate::ports::{SequenceTagger, TextAnnotator};
use crate::segmenter::{self, Sentence};
use crate::tokenizer::Token;

//=========================================================================================
// Labels
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Label {
    BeginPremise,
    InsidePremise,
    BeginConclusion,
    InsideConclusion,
    Outside,
}

impl Label {
    pub const ALL: [Label; 5] = [
        Label::BeginPremise,
        Label::InsidePremise,
        Label::BeginConclusion,
        Label::InsideConclusion,
        Label::Outside,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Label::BeginPremise => "B-Premise",
            Label::InsidePremise => "I-Premise",
            Label::BeginConclusion => "B-Conclusion",
            Label::InsideConclusion => "I-Conclusion",
            Label::Outside => "O",
        }
    }

    /// The component type this label contributes to, `None` for `O`.
    pub fn component_type(&self) -> Option<ComponentType> {
        match self {
            Label::BeginPremise | Label::InsidePremise => Some(ComponentType::Premise),
            Label::BeginConclusion | Label::InsideConclusion => Some(ComponentType::Conclusion),
            Label::Outside => None,
        }
    }

    pub fn is_begin(&self) -> bool {
        matches!(self, Label::BeginPremise | Label::BeginConclusion)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown label '{0}'")]
pub struct UnknownLabel(pub String);

impl FromStr for Label {
    type Err = UnknownLabel;

    /// Accepts the long names as well as the short and "Claim" spellings used
    /// by older model exports.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "B-Premise" | "B-P" => Ok(Label::BeginPremise),
            "I-Premise" | "I-P" => Ok(Label::InsidePremise),
            "B-Conclusion" | "B-C" | "B-Claim" => Ok(Label::BeginConclusion),
            "I-Conclusion" | "I-C" | "I-Claim" => Ok(Label::InsideConclusion),
            "O" => Ok(Label::Outside),
            other => Err(UnknownLabel(other.to_string())),
        }
    }
}

//=========================================================================================
// Merging
//=========================================================================================

/// A run of tokens that forms one component. Indices are inclusive token positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenRun {
    pub component_type: ComponentType,
    pub first: usize,
    pub last: usize,
}

/// Merges a label sequence into component runs.
///
/// A run is a `B-X` followed by any number of `I-X`. `O` and any `B-` label
/// close the open run, so two runs are never joined even when only whitespace
/// separates them in the text. An `I-X` that cannot continue the open run
/// starts a new one.
pub fn merge_labels(labels: &[Label]) -> Vec<TokenRun> {
    let mut runs = Vec::new();
    let mut open: Option<TokenRun> = None;

    for (i, label) in labels.iter().enumerate() {
        let Some(kind) = label.component_type() else {
            runs.extend(open.take());
            continue;
        };
        match open.as_mut() {
            Some(run) if run.component_type == kind && !label.is_begin() => run.last = i,
            _ => {
                runs.extend(open.take());
                open = Some(TokenRun {
                    component_type: kind,
                    first: i,
                    last: i,
                });
            }
        }
    }
    runs.extend(open);
    runs
}

//=========================================================================================
// Extraction
//=========================================================================================

/// A component found in the submitted text, before it is given an identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedComponent {
    pub component_type: ComponentType,
    pub text: String,
    pub start_char: usize,
    pub end_char: usize,
}

/// Segments, annotates, featurizes and tags text.
#[derive(Clone)]
pub struct ArgumentExtractor {
    annotator: Arc<dyn TextAnnotator>,
    tagger: Arc<dyn SequenceTagger>,
    features: FeatureExtractor,
}

impl ArgumentExtractor {
    pub fn new(
        annotator: Arc<dyn TextAnnotator>,
        tagger: Arc<dyn SequenceTagger>,
        features: FeatureExtractor,
    ) -> Self {
        Self {
            annotator,
            tagger,
            features,
        }
    }

    /// Extracts components from `text` in document order.
    ///
    /// A sentence the tagger rejects is logged and skipped; the rest of the text
    /// is still analysed.
    pub fn extract(&self, text: &str) -> Vec<ExtractedComponent> {
        let sentences = segmenter::segment(text);
        let mut components = Vec::new();
        let mut chars = CharIndex::new(text);

        for (index, sentence) in sentences.iter().enumerate() {
            let tokens = self.annotator.annotate(&sentence.text);
            if tokens.is_empty() {
                continue;
            }
            let features = self.features.sentence_features(&tokens);
            let labels = match self.tagger.tag(&features) {
                Ok(labels) if labels.len() == tokens.len() => labels,
                Ok(labels) => {
                    warn!(
                        sentence = index,
                        tokens = tokens.len(),
                        labels = labels.len(),
                        "Tagger returned a label sequence of the wrong length; skipping sentence"
                    );
                    continue;
                }
                Err(e) => {
                    warn!(sentence = index, error = %e, "Tagger failed on sentence; skipping it");
                    continue;
                }
            };
            debug!(sentence = index, labels = ?labels, "Sentence tagged");

            for run in merge_labels(&labels) {
                components.push(Self::locate(text, sentence, &tokens, run, &mut chars));
            }
        }
        components
    }

    fn locate(
        text: &str,
        sentence: &Sentence,
        tokens: &[Token],
        run: TokenRun,
        chars: &mut CharIndex,
    ) -> ExtractedComponent {
        let start = sentence.start + tokens[run.first].start;
        let end = sentence.start + tokens[run.last].end;
        ExtractedComponent {
            component_type: run.component_type,
            text: text[start..end].to_string(),
            start_char: chars.char_offset(start),
            end_char: chars.char_offset(end),
        }
    }
}

/// Converts increasing byte offsets to character offsets in one pass.
struct CharIndex<'a> {
    text: &'a str,
    byte: usize,
    chars: usize,
}

impl<'a> CharIndex<'a> {
    fn new(text: &'a str) -> Self {
        Self { text, byte: 0, chars: 0 }
    }

    fn char_offset(&mut self, byte: usize) -> usize {
        if byte < self.byte {
            self.byte = 0;
            self.chars = 0;
        }
        self.chars += self.text[self.byte..byte].chars().count();
        self.byte = byte;
        self.chars
    }
}

/// Returns the substring between two character offsets.
pub fn char_slice(text: &str, start_char: usize, end_char: usize) -> &str {
    let byte_at = |n: usize| {
        text.char_indices()
            .nth(n)
            .map_or(text.len(), |(b, _)| b)
    };
    &text[byte_at(start_char)..byte_at(end_char)]
}
