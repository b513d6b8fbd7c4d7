//! services/api/src/adapters/crf.rs
//!
//! The pretrained argument tagger: a linear-chain CRF exported to JSON and
//! decoded with Viterbi. Implements the `SequenceTagger` port. The model is
//! loaded once at startup and only read afterwards.

use serde::Deserialize;
use silogia_core::features::{FeatureMap, FeatureValue};
use silogia_core::ports::{PortError, PortResult, SequenceTagger};
use silogia_core::tagger::{Label, UnknownLabel};
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum CrfModelError {
    #[error("could not read model file: {0}")]
    Io(#[from] std::io::Error),
    #[error("model file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("model refers to {0}")]
    Label(#[from] UnknownLabel),
    #[error("model declares no labels")]
    NoLabels,
}

/// On-disk layout of the exported model.
#[derive(Deserialize)]
struct CrfArtifact {
    labels: Vec<String>,
    #[serde(default)]
    state_features: HashMap<String, HashMap<String, f64>>,
    #[serde(default)]
    transitions: HashMap<String, HashMap<String, f64>>,
}

#[derive(Debug, Clone)]
pub struct CrfTagger {
    labels: Vec<Label>,
    /// Attribute name to (label index, weight).
    state: HashMap<String, Vec<(usize, f64)>>,
    /// `transitions[from][to]`.
    transitions: Vec<Vec<f64>>,
}

impl CrfTagger {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CrfModelError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, CrfModelError> {
        let artifact: CrfArtifact = serde_json::from_str(raw)?;
        let labels = artifact
            .labels
            .iter()
            .map(|l| l.parse::<Label>())
            .collect::<Result<Vec<_>, _>>()?;
        if labels.is_empty() {
            return Err(CrfModelError::NoLabels);
        }
        let index_of = |name: &str| -> Result<Option<usize>, UnknownLabel> {
            let label = name.parse::<Label>()?;
            Ok(labels.iter().position(|l| *l == label))
        };

        let mut state: HashMap<String, Vec<(usize, f64)>> = HashMap::new();
        for (attribute, weights) in artifact.state_features {
            let mut entries = Vec::with_capacity(weights.len());
            for (label, weight) in weights {
                // Weights for labels the model does not declare can never be decoded.
                if let Some(i) = index_of(&label)? {
                    entries.push((i, weight));
                }
            }
            state.insert(attribute, entries);
        }

        let mut transitions = vec![vec![0.0; labels.len()]; labels.len()];
        for (from, targets) in artifact.transitions {
            let Some(i) = index_of(&from)? else { continue };
            for (to, weight) in targets {
                if let Some(j) = index_of(&to)? {
                    transitions[i][j] = weight;
                }
            }
        }

        Ok(Self {
            labels,
            state,
            transitions,
        })
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    /// Per-label emission score of one token.
    fn emissions(&self, features: &FeatureMap) -> Vec<f64> {
        let mut scores = vec![0.0; self.labels.len()];
        for (name, value) in features {
            let (attribute, scale) = match value {
                FeatureValue::Text(text) => (format!("{}={}", name, text), 1.0),
                FeatureValue::Flag(true) => (name.clone(), 1.0),
                FeatureValue::Flag(false) => continue,
                FeatureValue::Number(x) => (name.clone(), *x),
            };
            if let Some(weights) = self.state.get(&attribute) {
                for &(label, weight) in weights {
                    scores[label] += weight * scale;
                }
            }
        }
        scores
    }

    /// Highest-scoring label path. Ties go to the label declared first.
    fn viterbi(&self, features: &[FeatureMap]) -> Vec<usize> {
        let n_labels = self.labels.len();
        let mut score = self.emissions(&features[0]);
        let mut back: Vec<Vec<usize>> = Vec::with_capacity(features.len());

        for token in &features[1..] {
            let emit = self.emissions(token);
            let mut next = vec![f64::NEG_INFINITY; n_labels];
            let mut pointers = vec![0; n_labels];
            for to in 0..n_labels {
                for from in 0..n_labels {
                    let candidate = score[from] + self.transitions[from][to];
                    if candidate > next[to] {
                        next[to] = candidate;
                        pointers[to] = from;
                    }
                }
                next[to] += emit[to];
            }
            score = next;
            back.push(pointers);
        }

        let mut best = 0;
        for (i, s) in score.iter().enumerate() {
            if *s > score[best] {
                best = i;
            }
        }
        let mut path = vec![best];
        for pointers in back.iter().rev() {
            best = pointers[best];
            path.push(best);
        }
        path.reverse();
        path
    }
}

impl SequenceTagger for CrfTagger {
    fn tag(&self, features: &[FeatureMap]) -> PortResult<Vec<Label>> {
        if features.is_empty() {
            return Err(PortError::Invalid("cannot tag an empty sentence".to_string()));
        }
        Ok(self
            .viterbi(features)
            .into_iter()
            .map(|i| self.labels[i])
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(pairs: &[(&str, FeatureValue)]) -> FeatureMap {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    fn text(s: &str) -> FeatureValue {
        FeatureValue::Text(s.to_string())
    }

    const MODEL: &str = r#"{
        "labels": ["B-P", "I-P", "B-C", "I-C", "O"],
        "state_features": {
            "position=first": { "B-P": 3.0 },
            "word.ispunct": { "O": 5.0 },
            "word.lower=luego": { "O": 4.0 },
            "-1:word.lower=luego": { "B-C": 4.0 },
            "bias": { "O": 0.5 }
        },
        "transitions": {
            "B-P": { "I-P": 2.0 },
            "I-P": { "I-P": 2.0 },
            "B-C": { "I-C": 2.0 },
            "I-C": { "I-C": 2.0 }
        }
    }"#;

    #[test]
    fn accepts_short_label_names() {
        let tagger = CrfTagger::from_json(MODEL).unwrap();
        assert_eq!(tagger.labels(), Label::ALL);
    }

    #[test]
    fn transitions_extend_a_begun_component() {
        let tagger = CrfTagger::from_json(MODEL).unwrap();
        let sentence = vec![
            token(&[("position", text("first")), ("bias", FeatureValue::Number(1.0))]),
            token(&[("position", text("middle")), ("bias", FeatureValue::Number(1.0))]),
            token(&[("position", text("middle")), ("bias", FeatureValue::Number(1.0))]),
            token(&[("word.ispunct", FeatureValue::Flag(true))]),
        ];
        let labels = tagger.tag(&sentence).unwrap();
        assert_eq!(
            labels,
            [Label::BeginPremise, Label::InsidePremise, Label::InsidePremise, Label::Outside]
        );
    }

    #[test]
    fn context_features_start_a_conclusion() {
        let tagger = CrfTagger::from_json(MODEL).unwrap();
        let sentence = vec![
            token(&[("word.lower", text("luego"))]),
            token(&[("-1:word.lower", text("luego"))]),
            token(&[]),
        ];
        let labels = tagger.tag(&sentence).unwrap();
        assert_eq!(
            labels,
            [Label::Outside, Label::BeginConclusion, Label::InsideConclusion]
        );
    }

    #[test]
    fn false_flags_and_number_scaling() {
        let tagger = CrfTagger::from_json(MODEL).unwrap();
        // bias scaled to 0 leaves every label at 0, so the first declared label wins.
        let quiet = token(&[
            ("word.ispunct", FeatureValue::Flag(false)),
            ("bias", FeatureValue::Number(0.0)),
        ]);
        assert_eq!(tagger.tag(&[quiet]).unwrap(), [Label::BeginPremise]);

        let biased = token(&[("bias", FeatureValue::Number(2.0))]);
        assert_eq!(tagger.tag(&[biased]).unwrap(), [Label::Outside]);
    }

    #[test]
    fn empty_sentence_is_an_error() {
        let tagger = CrfTagger::from_json(MODEL).unwrap();
        assert!(tagger.tag(&[]).is_err());
    }

    #[test]
    fn rejects_bad_artifacts() {
        assert!(matches!(
            CrfTagger::from_json(r#"{"labels": []}"#),
            Err(CrfModelError::NoLabels)
        ));
        assert!(matches!(
            CrfTagger::from_json(r#"{"labels": ["B-X"]}"#),
            Err(CrfModelError::Label(_))
        ));
        assert!(matches!(CrfTagger::from_json("not json"), Err(CrfModelError::Json(_))));
        assert!(matches!(
            CrfTagger::load("/definitely/missing/model.json"),
            Err(CrfModelError::Io(_))
        ));
    }
}
