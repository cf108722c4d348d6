use std::sync::Arc;

use crate::errors::AppError;
use crate::services::answer::{Answer, AnswerEngine};
use crate::services::embeddings::Embedder;
use crate::services::index::ChunkIndex;
use crate::services::pdf::DocumentParser;
use crate::services::text::{split_chars, truncate_words};

/// The derived context kept for a session's current document.
#[derive(Debug)]
pub enum DocumentContext {
    /// Whole-document mode: the extracted text, already word-capped.
    Whole(String),
    /// Chunked mode: embedded chunks in a per-document index.
    Indexed(ChunkIndex),
}

/// How the answering context is selected from the extracted text.
pub enum ContextSelector {
    Whole {
        word_cap: usize,
    },
    Chunked {
        embedder: Arc<dyn Embedder>,
        window: usize,
        overlap: usize,
        top_k: usize,
        /// Post-retrieval word cap on the concatenated context, applied
        /// to respect the downstream token budget.
        word_cap: Option<usize>,
    },
}

/// The per-submission document pipeline: extract, select context, answer.
///
/// Holds the process-wide model handles; everything here is read-only
/// after construction and shared across requests.
pub struct Pipeline {
    parser: Arc<dyn DocumentParser>,
    selector: ContextSelector,
    engine: AnswerEngine,
}

impl Pipeline {
    pub fn new(
        parser: Arc<dyn DocumentParser>,
        selector: ContextSelector,
        engine: AnswerEngine,
    ) -> Self {
        Self {
            parser,
            selector,
            engine,
        }
    }

    /// Extract text from the PDF and derive the session's document
    /// context. In chunked mode the index is built from scratch; a
    /// failure mid-build discards the partial index.
    pub async fn process_document(&self, bytes: &[u8]) -> Result<DocumentContext, AppError> {
        let pages = self
            .parser
            .extract_pages(bytes)
            .await
            .map_err(|e| AppError::Extraction(format!("{e:#}")))?;

        // Concatenate in page order; pages without text contribute nothing.
        let text = pages.concat();

        match &self.selector {
            ContextSelector::Whole { word_cap } => {
                let (capped, _) = truncate_words(&text, *word_cap);
                Ok(DocumentContext::Whole(capped))
            }
            ContextSelector::Chunked {
                embedder,
                window,
                overlap,
                ..
            } => {
                let chunks = split_chars(&text, *window, *overlap);
                if chunks.is_empty() {
                    return Err(AppError::Extraction(
                        "Document contains no extractable text".to_string(),
                    ));
                }

                tracing::info!("Embedding {} chunks", chunks.len());

                let mut embedded = Vec::with_capacity(chunks.len());
                for chunk in chunks {
                    let vector = embedder
                        .embed(&chunk)
                        .await
                        .map_err(|e| AppError::Indexing(format!("{e:#}")))?;
                    embedded.push((chunk, vector));
                }

                Ok(DocumentContext::Indexed(ChunkIndex::build(embedded)))
            }
        }
    }

    /// Answer a question against an already processed document.
    pub async fn answer(
        &self,
        document: &DocumentContext,
        question: &str,
    ) -> Result<Answer, AppError> {
        let context = match document {
            DocumentContext::Whole(text) => text.clone(),
            DocumentContext::Indexed(index) => {
                let (embedder, top_k, word_cap) = match &self.selector {
                    ContextSelector::Chunked {
                        embedder,
                        top_k,
                        word_cap,
                        ..
                    } => (embedder, *top_k, *word_cap),
                    ContextSelector::Whole { .. } => {
                        return Err(AppError::Internal(anyhow::anyhow!(
                            "Indexed document in whole-document mode"
                        )));
                    }
                };

                let query_vec = embedder
                    .embed(question)
                    .await
                    .map_err(|e| AppError::Indexing(format!("{e:#}")))?;

                // Concatenated in retrieval order, not document order.
                let hits = index.query(&query_vec, top_k);
                let mut context = hits
                    .iter()
                    .map(|c| c.text.as_str())
                    .collect::<Vec<_>>()
                    .join(" ");

                if let Some(cap) = word_cap {
                    context = truncate_words(&context, cap).0;
                }

                context
            }
        };

        self.engine.answer(question, &context).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AnswerConfig, AnswerMode};
    use crate::services::answer::AnswerBackend;
    use crate::services::llm::{Completer, GenerationParams};
    use anyhow::Result;
    use async_trait::async_trait;

    struct FakeParser {
        pages: Vec<String>,
    }

    #[async_trait]
    impl DocumentParser for FakeParser {
        async fn extract_pages(&self, _bytes: &[u8]) -> Result<Vec<String>> {
            Ok(self.pages.clone())
        }
    }

    struct FailingParser;

    #[async_trait]
    impl DocumentParser for FailingParser {
        async fn extract_pages(&self, _bytes: &[u8]) -> Result<Vec<String>> {
            Err(anyhow::anyhow!("could not open PDF"))
        }
    }

    /// Deterministic letter-frequency embedding; related texts score
    /// higher cosine similarity than unrelated ones.
    struct HistogramEmbedder;

    #[async_trait]
    impl Embedder for HistogramEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let mut v = vec![0.0f32; 26];
            for c in text.to_lowercase().chars() {
                if c.is_ascii_lowercase() {
                    v[(c as u8 - b'a') as usize] += 1.0;
                }
            }
            Ok(v)
        }
    }

    struct FailingEmbedder;

    #[async_trait]
    impl Embedder for FailingEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Err(anyhow::anyhow!("embedding service unavailable"))
        }
    }

    /// Echoes the first words of the context so tests can see which
    /// chunks were retrieved.
    struct EchoCompleter;

    #[async_trait]
    impl Completer for EchoCompleter {
        async fn complete(&self, prompt: &str, _params: &GenerationParams) -> Result<String> {
            Ok(prompt
                .split_whitespace()
                .take(60)
                .collect::<Vec<_>>()
                .join(" "))
        }
    }

    fn generative_pipeline(parser: Arc<dyn DocumentParser>, embedder: Arc<dyn Embedder>) -> Pipeline {
        Pipeline::new(
            parser,
            ContextSelector::Chunked {
                embedder,
                window: 50,
                overlap: 10,
                top_k: 3,
                word_cap: Some(200),
            },
            AnswerEngine::new(
                AnswerBackend::Generative(Arc::new(EchoCompleter)),
                AnswerConfig {
                    mode: AnswerMode::Generative,
                    extractive_word_cap: 40,
                    min_answer_words: 5,
                },
                GenerationParams {
                    temperature: 0.7,
                    max_tokens: 400,
                },
            ),
        )
    }

    #[tokio::test]
    async fn test_end_to_end_answer_from_uploaded_document() {
        let parser = Arc::new(FakeParser {
            pages: vec![
                "Climate change is driven by greenhouse gases. ".to_string(),
                "Emissions from fossil fuels trap heat in the atmosphere.".to_string(),
            ],
        });
        let pipeline = generative_pipeline(parser, Arc::new(HistogramEmbedder));

        let document = pipeline.process_document(b"pdf bytes").await.unwrap();
        let answer = pipeline
            .answer(&document, "What drives climate change?")
            .await
            .unwrap();

        assert!(!answer.text.is_empty());
    }

    #[tokio::test]
    async fn test_extraction_failure_surfaces_extraction_error() {
        let pipeline = generative_pipeline(Arc::new(FailingParser), Arc::new(HistogramEmbedder));
        let err = pipeline.process_document(b"corrupt").await.unwrap_err();
        assert!(matches!(err, AppError::Extraction(_)));
    }

    #[tokio::test]
    async fn test_embedding_failure_surfaces_indexing_error() {
        let parser = Arc::new(FakeParser {
            pages: vec!["some document text".to_string()],
        });
        let pipeline = generative_pipeline(parser, Arc::new(FailingEmbedder));
        let err = pipeline.process_document(b"pdf").await.unwrap_err();
        assert!(matches!(err, AppError::Indexing(_)));
    }

    #[tokio::test]
    async fn test_empty_pages_tolerated() {
        let parser = Arc::new(FakeParser {
            pages: vec![
                String::new(),
                "only the second page has text".to_string(),
                String::new(),
            ],
        });
        let pipeline = generative_pipeline(parser, Arc::new(HistogramEmbedder));
        let document = pipeline.process_document(b"pdf").await.unwrap();
        match &document {
            DocumentContext::Indexed(index) => assert!(!index.is_empty()),
            _ => panic!("expected indexed context"),
        }
    }

    #[tokio::test]
    async fn test_document_with_no_text_rejected_in_chunked_mode() {
        let parser = Arc::new(FakeParser {
            pages: vec![String::new(), String::new()],
        });
        let pipeline = generative_pipeline(parser, Arc::new(HistogramEmbedder));
        let err = pipeline.process_document(b"pdf").await.unwrap_err();
        assert!(matches!(err, AppError::Extraction(_)));
    }

    #[tokio::test]
    async fn test_whole_document_mode_caps_words() {
        let long_page = (0..500).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ");
        let parser = Arc::new(FakeParser {
            pages: vec![long_page],
        });
        let pipeline = Pipeline::new(
            parser,
            ContextSelector::Whole { word_cap: 300 },
            AnswerEngine::new(
                AnswerBackend::Generative(Arc::new(EchoCompleter)),
                AnswerConfig {
                    mode: AnswerMode::Generative,
                    extractive_word_cap: 40,
                    min_answer_words: 5,
                },
                GenerationParams {
                    temperature: 0.7,
                    max_tokens: 400,
                },
            ),
        );

        let document = pipeline.process_document(b"pdf").await.unwrap();
        match &document {
            DocumentContext::Whole(text) => {
                assert_eq!(text.split_whitespace().count(), 300);
            }
            _ => panic!("expected whole-document context"),
        }
    }
}
