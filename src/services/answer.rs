use std::sync::Arc;

use crate::config::AnswerConfig;
use crate::errors::AppError;
use crate::services::llm::{Completer, GenerationParams};
use crate::services::qa::SpanExtractor;
use crate::services::text::{count_words, truncate_words};

/// Fixed note appended to generated answers that fall below the length
/// floor. Appending is flagged via [`Answer::padded`], never silent, so
/// synthetic padding stays distinguishable from model output.
pub const SHORT_ANSWER_NOTE: &str =
    "Note: this answer may be incomplete given the available document context.";

#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,
    pub padded: bool,
}

pub enum AnswerBackend {
    /// Span-extraction model; answers are substrings of the context.
    Extractive(Arc<dyn SpanExtractor>),
    /// Sequence model prompted with an instruction template.
    Generative(Arc<dyn Completer>),
}

pub struct AnswerEngine {
    backend: AnswerBackend,
    config: AnswerConfig,
    params: GenerationParams,
}

impl AnswerEngine {
    pub fn new(backend: AnswerBackend, config: AnswerConfig, params: GenerationParams) -> Self {
        Self {
            backend,
            config,
            params,
        }
    }

    pub async fn answer(&self, question: &str, context: &str) -> Result<Answer, AppError> {
        match &self.backend {
            AnswerBackend::Extractive(extractor) => {
                let span = extractor
                    .extract(question, context)
                    .await
                    .map_err(|e| AppError::Generation(format!("{e:#}")))?;

                tracing::debug!(score = span.score, "extracted answer span");

                // Spans at or under the cap pass through verbatim so the
                // answer stays a literal substring of the context.
                let text = if count_words(&span.answer) > self.config.extractive_word_cap {
                    let (capped, _) =
                        truncate_words(&span.answer, self.config.extractive_word_cap);
                    format!("{capped}...")
                } else {
                    span.answer
                };

                Ok(Answer {
                    text,
                    padded: false,
                })
            }
            AnswerBackend::Generative(completer) => {
                let prompt = build_prompt(context, question);
                let text = completer
                    .complete(&prompt, &self.params)
                    .await
                    .map_err(|e| AppError::Generation(format!("{e:#}")))?;

                if count_words(&text) < self.config.min_answer_words {
                    Ok(Answer {
                        text: format!("{text} {SHORT_ANSWER_NOTE}"),
                        padded: true,
                    })
                } else {
                    Ok(Answer {
                        text,
                        padded: false,
                    })
                }
            }
        }
    }
}

/// Instruction template embedding the context and question verbatim.
fn build_prompt(context: &str, question: &str) -> String {
    format!(
        "Answer the question using only the document excerpt below.\n\n\
         Document excerpt:\n{context}\n\n\
         Question: {question}\n\n\
         Answer:"
    )
}
