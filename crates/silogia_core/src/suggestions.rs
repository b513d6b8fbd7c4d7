//! crates/silogia_core/src/suggestions.rs
//!
//! Asks the language model for improvement suggestions on extracted components
//! and parses its line-oriented answer. Failures here never fail an analysis:
//! they are reported as a `SuggestionStatus` next to an empty list.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::domain::{SuggestionStatus, SuggestionType};
use crate::ports::{CompletionService, PortError};
use crate::tagger::ExtractedComponent;

/// Marks a suggestion about the text as a whole.
pub const GLOBAL_TARGET: &str = "GLOBAL";

const FIELD_SEPARATOR: char = '|';

const PROMPT_HEADER: &str = "Eres un asistente experto en argumentación académica.

A continuación verás un texto y las premisas y conclusiones que se extrajeron de él, numeradas.
Comenta solo los componentes que lo necesiten y, si lo consideras útil, añade una observación general sobre el texto completo.

Responde ÚNICAMENTE con líneas de este formato, una por sugerencia, sin títulos ni numeraciones adicionales:
<número> | <tipo> | <sugerencia>
GLOBAL | <tipo> | <sugerencia>

Donde <número> es el número del componente y <tipo> es exactamente uno de: improvement, warning, praise.
Cada sugerencia debe ser específica, práctica y de máximo dos oraciones.";

//=========================================================================================
// Errors and Outcome
//=========================================================================================

/// Recoverable failures of the suggestion step.
#[derive(Debug, thiserror::Error)]
pub enum SuggestionError {
    #[error("Suggestion service unavailable: {0}")]
    Unavailable(String),
    #[error("Malformed suggestion response: {0}")]
    Malformed(String),
}

impl SuggestionError {
    pub fn status(&self) -> SuggestionStatus {
        match self {
            SuggestionError::Unavailable(_) => SuggestionStatus::Unavailable,
            SuggestionError::Malformed(_) => SuggestionStatus::Malformed,
        }
    }
}

/// One parsed suggestion. `component_index` points into the component slice
/// that was sent; `None` means the remark is about the whole text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSuggestion {
    pub component_index: Option<usize>,
    pub suggestion_type: SuggestionType,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestionOutcome {
    pub suggestions: Vec<ParsedSuggestion>,
    pub status: SuggestionStatus,
}

//=========================================================================================
// Prompt and Parsing
//=========================================================================================

/// Builds the completion prompt. Components are numbered from 1.
pub fn build_prompt(text: &str, components: &[ExtractedComponent]) -> String {
    let mut prompt = String::from(PROMPT_HEADER);
    prompt.push_str("\n\nTexto:\n\"\"\"\n");
    prompt.push_str(text.trim());
    prompt.push_str("\n\"\"\"\n\nComponentes:\n");
    for (i, component) in components.iter().enumerate() {
        prompt.push_str(&format!(
            "[{}] ({}) {}\n",
            i + 1,
            component.component_type.as_str(),
            component.text
        ));
    }
    prompt.push_str("\nAhora, genera las sugerencias solicitadas.");
    prompt
}

/// Parses `<n|GLOBAL> | <type> | <text>` lines.
///
/// Blank lines are ignored; any other line that does not follow the format
/// makes the whole response malformed.
pub fn parse_response(raw: &str, component_count: usize) -> Result<Vec<ParsedSuggestion>, SuggestionError> {
    let mut suggestions = Vec::new();
    for (line_no, line) in raw.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let malformed = |why: &str| SuggestionError::Malformed(format!("line {}: {why}", line_no + 1));

        let mut fields = line.splitn(3, FIELD_SEPARATOR).map(str::trim);
        let (Some(target), Some(kind), Some(text)) = (fields.next(), fields.next(), fields.next()) else {
            return Err(malformed("expected three '|'-separated fields"));
        };
        if text.is_empty() {
            return Err(malformed("empty suggestion text"));
        }

        let component_index = if target.eq_ignore_ascii_case(GLOBAL_TARGET) {
            None
        } else {
            let n: usize = target
                .trim_start_matches('[')
                .trim_end_matches(']')
                .parse()
                .map_err(|_| malformed("target is neither a component number nor GLOBAL"))?;
            if n == 0 || n > component_count {
                return Err(malformed("component number out of range"));
            }
            Some(n - 1)
        };
        let suggestion_type = kind
            .parse::<SuggestionType>()
            .map_err(|_| malformed("unknown suggestion type"))?;

        suggestions.push(ParsedSuggestion {
            component_index,
            suggestion_type,
            text: text.to_string(),
        });
    }
    Ok(suggestions)
}

//=========================================================================================
// Generator
//=========================================================================================

/// Timeout and retry settings for the completion call.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub timeout: Duration,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            backoff: Duration::from_millis(500),
        }
    }
}

#[derive(Clone)]
pub struct SuggestionGenerator {
    completion: Arc<dyn CompletionService>,
    policy: RetryPolicy,
}

impl SuggestionGenerator {
    pub fn new(completion: Arc<dyn CompletionService>, policy: RetryPolicy) -> Self {
        Self { completion, policy }
    }

    /// Generates suggestions, folding any failure into the returned status.
    pub async fn generate(&self, text: &str, components: &[ExtractedComponent]) -> SuggestionOutcome {
        match self.try_generate(text, components).await {
            Ok(suggestions) => SuggestionOutcome {
                suggestions,
                status: SuggestionStatus::Ok,
            },
            Err(e) => {
                warn!(error = %e, "Suggestion generation degraded");
                SuggestionOutcome {
                    suggestions: Vec::new(),
                    status: e.status(),
                }
            }
        }
    }

    /// Sends one prompt (retried once after the backoff on failure or timeout)
    /// and parses the answer. No call is made when there are no components.
    pub async fn try_generate(
        &self,
        text: &str,
        components: &[ExtractedComponent],
    ) -> Result<Vec<ParsedSuggestion>, SuggestionError> {
        if components.is_empty() {
            return Ok(Vec::new());
        }
        let prompt = build_prompt(text, components);
        let raw = match self.attempt(&prompt).await {
            Ok(raw) => raw,
            Err(first) => {
                warn!(error = %first, backoff_ms = self.policy.backoff.as_millis() as u64, "Completion failed; retrying once");
                tokio::time::sleep(self.policy.backoff).await;
                self.attempt(&prompt)
                    .await
                    .map_err(|e| SuggestionError::Unavailable(e.to_string()))?
            }
        };
        let suggestions = parse_response(&raw, components.len())?;
        info!(count = suggestions.len(), "Suggestions generated");
        Ok(suggestions)
    }

    async fn attempt(&self, prompt: &str) -> Result<String, PortError> {
        match tokio::time::timeout(self.policy.timeout, self.completion.complete(prompt)).await {
            Ok(result) => result,
            Err(_) => Err(PortError::Timeout(format!(
                "no completion within {}s",
                self.policy.timeout.as_secs_f32()
            ))),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::ComponentType;
    use crate::ports::PortResult;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Replays scripted answers and counts the calls it received.
    pub(crate) struct ScriptedCompletion {
        answers: Mutex<VecDeque<PortResult<String>>>,
        pub calls: AtomicUsize,
        delay: Option<Duration>,
    }

    impl ScriptedCompletion {
        pub(crate) fn new(answers: Vec<PortResult<String>>) -> Self {
            Self {
                answers: Mutex::new(answers.into()),
                calls: AtomicUsize::new(0),
                delay: None,
            }
        }

        fn slow(delay: Duration) -> Self {
            Self {
                delay: Some(delay),
                ..Self::new(Vec::new())
            }
        }
    }

    #[async_trait]
    impl CompletionService for ScriptedCompletion {
        async fn complete(&self, _prompt: &str) -> PortResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.answers
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(PortError::Unavailable("connection refused".into())))
        }
    }

    fn components() -> Vec<ExtractedComponent> {
        vec![
            ExtractedComponent {
                component_type: ComponentType::Premise,
                text: "La educación es fundamental".into(),
                start_char: 0,
                end_char: 27,
            },
            ExtractedComponent {
                component_type: ComponentType::Conclusion,
                text: "debemos invertir".into(),
                start_char: 40,
                end_char: 56,
            },
        ]
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            timeout: Duration::from_millis(50),
            backoff: Duration::from_millis(1),
        }
    }

    #[test]
    fn prompt_embeds_each_component_with_its_type() {
        let prompt = build_prompt("texto completo", &components());
        assert!(prompt.contains("[1] (premise) La educación es fundamental"));
        assert!(prompt.contains("[2] (conclusion) debemos invertir"));
        assert!(prompt.contains("texto completo"));
    }

    #[test]
    fn parses_component_and_global_lines() {
        let raw = "1 | improvement | Aporta datos.\n\n[2] | praise | Clara y directa.\nglobal | warning | Falta un contraargumento.";
        let parsed = parse_response(raw, 2).unwrap();
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed[0].component_index, Some(0));
        assert_eq!(parsed[0].suggestion_type, SuggestionType::Improvement);
        assert_eq!(parsed[1].component_index, Some(1));
        assert_eq!(parsed[2].component_index, None);
        assert_eq!(parsed[2].text, "Falta un contraargumento.");
    }

    #[test]
    fn suggestion_text_may_contain_separator() {
        let parsed = parse_response("1 | warning | Usa fuentes | no opiniones", 1).unwrap();
        assert_eq!(parsed[0].text, "Usa fuentes | no opiniones");
    }

    #[test]
    fn rejects_malformed_lines() {
        for raw in [
            "Aquí tienes mis sugerencias:",
            "3 | improvement | fuera de rango",
            "0 | improvement | fuera de rango",
            "1 | rewrite | tipo desconocido",
            "1 | praise |   ",
        ] {
            assert!(
                matches!(parse_response(raw, 2), Err(SuggestionError::Malformed(_))),
                "accepted {raw:?}"
            );
        }
    }

    #[tokio::test]
    async fn successful_generation_reports_ok() {
        let service = Arc::new(ScriptedCompletion::new(vec![Ok("1 | praise | Bien.".into())]));
        let generator = SuggestionGenerator::new(service.clone(), fast_policy());
        let outcome = generator.generate("t", &components()).await;
        assert_eq!(outcome.status, SuggestionStatus::Ok);
        assert_eq!(outcome.suggestions.len(), 1);
        assert_eq!(service.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_once_after_a_failure() {
        let service = Arc::new(ScriptedCompletion::new(vec![
            Err(PortError::Unavailable("reset".into())),
            Ok("GLOBAL | improvement | Ordena las ideas.".into()),
        ]));
        let generator = SuggestionGenerator::new(service.clone(), fast_policy());
        let outcome = generator.generate("t", &components()).await;
        assert_eq!(outcome.status, SuggestionStatus::Ok);
        assert_eq!(outcome.suggestions[0].component_index, None);
        assert_eq!(service.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn unreachable_service_degrades_to_empty_list() {
        let service = Arc::new(ScriptedCompletion::new(Vec::new()));
        let generator = SuggestionGenerator::new(service.clone(), fast_policy());
        let outcome = generator.generate("t", &components()).await;
        assert_eq!(outcome.status, SuggestionStatus::Unavailable);
        assert!(outcome.suggestions.is_empty());
        assert_eq!(service.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn timeouts_count_as_failures() {
        let service = Arc::new(ScriptedCompletion::slow(Duration::from_millis(500)));
        let generator = SuggestionGenerator::new(service.clone(), fast_policy());
        let outcome = generator.generate("t", &components()).await;
        assert_eq!(outcome.status, SuggestionStatus::Unavailable);
        assert_eq!(service.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn malformed_answer_is_not_retried() {
        let service = Arc::new(ScriptedCompletion::new(vec![Ok("Lo siento, no puedo.".into())]));
        let generator = SuggestionGenerator::new(service.clone(), fast_policy());
        let outcome = generator.generate("t", &components()).await;
        assert_eq!(outcome.status, SuggestionStatus::Malformed);
        assert!(outcome.suggestions.is_empty());
        assert_eq!(service.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn no_components_means_no_call() {
        let service = Arc::new(ScriptedCompletion::new(Vec::new()));
        let generator = SuggestionGenerator::new(service.clone(), fast_policy());
        let outcome = generator.generate("t", &[]).await;
        assert_eq!(outcome.status, SuggestionStatus::Ok);
        assert_eq!(service.calls.load(Ordering::SeqCst), 0);
    }
}
