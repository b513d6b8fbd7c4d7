//! crates/silogia_core/src/paragraphs.rs
//!
//! Paragraph-level scoring of an analysed text: how many premises and
//! conclusions each paragraph holds, how dense it is in argumentation, and a
//! short recommendation.

use crate::domain::{ArgumentComponent, ComponentType};
use crate::segmenter;

/// Paragraphs shorter than this are not scored.
pub const MIN_PARAGRAPH_WORDS: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct ParagraphAnalysis {
    pub text: String,
    pub strength: &'static str,
    pub strength_score: u32,
    pub premises_count: usize,
    pub conclusions_count: usize,
    pub word_count: usize,
    pub density: f64,
    pub recommendation: Option<&'static str>,
}

/// Scores every paragraph of at least `MIN_PARAGRAPH_WORDS` words.
///
/// A component is counted in the paragraph that contains its midpoint.
pub fn analyze_paragraphs(text: &str, components: &[ArgumentComponent]) -> Vec<ParagraphAnalysis> {
    segmenter::paragraphs(text)
        .into_iter()
        .filter_map(|span| {
            let body = &text[span.start..span.end];
            let word_count = body.split_whitespace().count();
            if word_count < MIN_PARAGRAPH_WORDS {
                return None;
            }
            let start = text[..span.start].chars().count() as f64;
            let end = start + body.chars().count() as f64;
            let count = |kind: ComponentType| {
                components
                    .iter()
                    .filter(|c| c.component_type == kind)
                    .filter(|c| {
                        let centre = (c.start_char + c.end_char) as f64 / 2.0;
                        start <= centre && centre < end
                    })
                    .count()
            };
            let premises = count(ComponentType::Premise);
            let conclusions = count(ComponentType::Conclusion);
            let density = (premises + conclusions) as f64 / word_count as f64;
            let strength_score = strength_score(premises, conclusions, word_count, density);

            Some(ParagraphAnalysis {
                text: body.to_string(),
                strength: strength_label(strength_score),
                strength_score,
                premises_count: premises,
                conclusions_count: conclusions,
                word_count,
                density: (density * 1000.0).round() / 1000.0,
                recommendation: recommendation(premises, conclusions, density, word_count),
            })
        })
        .collect()
}

fn strength_score(premises: usize, conclusions: usize, word_count: usize, density: f64) -> u32 {
    let mut score = (premises * 15 + conclusions * 20) as i64;
    if density > 0.15 {
        score += 20;
    }
    if premises > 0 && conclusions > 0 {
        score += 10;
    }
    if premises + conclusions == 0 {
        score -= (word_count / 50) as i64 * 5;
    }
    score.clamp(0, 100) as u32
}

fn strength_label(score: u32) -> &'static str {
    match score {
        s if s >= 70 => "muy fuerte",
        s if s >= 50 => "fuerte",
        s if s >= 30 => "moderada",
        _ => "débil",
    }
}

fn recommendation(premises: usize, conclusions: usize, density: f64, word_count: usize) -> Option<&'static str> {
    if premises == 0 {
        Some("Añade premisas que sustenten tus afirmaciones")
    } else if conclusions == 0 {
        Some("Incluye conclusiones que sinteticen las ideas")
    } else if density < 0.1 {
        Some("Considera hacer el párrafo más conciso o añadir más argumentación")
    } else if word_count > 150 {
        Some("Párrafo extenso, considera dividirlo para mayor claridad")
    } else {
        None
    }
}
