use crate::{
    application::services::{AnswerGenerator, GeneratedAnswer, GenerationRequest},
    domain::{prompt::NO_CONTEXT_PLACEHOLDER, DomainError},
};

const MODEL_LABEL: &str = "ragdesk/extractive";

/// Offline generator that answers with the highest-ranked context verbatim.
///
/// Keeps the ask pipeline usable without an LLM endpoint; the "answer" is
/// only as good as retrieval.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExtractiveGenerator;

impl ExtractiveGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl AnswerGenerator for ExtractiveGenerator {
    fn model(&self) -> &str {
        MODEL_LABEL
    }

    fn generate(&self, request: &GenerationRequest) -> Result<GeneratedAnswer, DomainError> {
        let text = match request.contexts.iter().find(|ctx| !ctx.trim().is_empty()) {
            Some(best) => best.trim().to_string(),
            None => format!("I don't know. {NO_CONTEXT_PLACEHOLDER}"),
        };

        Ok(GeneratedAnswer {
            text,
            model: MODEL_LABEL.into(),
            usage: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answers_with_the_first_non_blank_context() {
        let answer = ExtractiveGenerator::new()
            .generate(&GenerationRequest {
                question: "q".into(),
                contexts: vec!["  ".into(), " best match ".into(), "second".into()],
                temperature: None,
            })
            .unwrap();
        assert_eq!(answer.text, "best match");
        assert_eq!(answer.model, MODEL_LABEL);
    }

    #[test]
    fn admits_ignorance_without_context() {
        let answer = ExtractiveGenerator::new()
            .generate(&GenerationRequest {
                question: "q".into(),
                contexts: Vec::new(),
                temperature: None,
            })
            .unwrap();
        assert!(answer.text.starts_with("I don't know."));
    }
}
