use axum::{
    Json,
    extract::{Multipart, State},
    http::HeaderMap,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::errors::AppError;
use crate::session::Exchange;
use crate::state::AppState;

#[derive(Serialize)]
pub struct AnswerResponse {
    pub answer: String,
    /// True when the short-answer note was appended.
    pub padded: bool,
    /// The most recent exchanges, newest first.
    pub history: Vec<Exchange>,
}

/// Sessions are keyed by an opaque client-supplied header; absent or
/// empty headers share one anonymous session.
fn session_id(headers: &HeaderMap) -> String {
    headers
        .get("x-session-id")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or("anonymous")
        .to_string()
}

/// Request body limit: the file cap plus headroom for the question field
/// and multipart framing, so an oversized file reaches the handler's own
/// size check rather than the opaque body-limit rejection.
pub fn body_limit_bytes(max_file_size_mb: usize) -> usize {
    max_file_size_mb * 1024 * 1024 + 1024 * 1024
}

/// Both parts of the form are required before any processing starts.
fn validate_submission(
    file: Option<&[u8]>,
    question: Option<&str>,
) -> Result<(), AppError> {
    if question.map(str::trim).filter(|q| !q.is_empty()).is_none() {
        return Err(AppError::Validation("A question is required".to_string()));
    }
    if file.is_none() {
        return Err(AppError::Validation("No file provided".to_string()));
    }
    Ok(())
}

/// Upload a PDF together with a question and run the full pipeline:
/// extract, select context, answer, record the exchange.
pub async fn analyze(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<AnswerResponse>, AppError> {
    let session = session_id(&headers);

    let mut file_bytes: Option<Vec<u8>> = None;
    let mut question: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart data: {e}")))?
    {
        match field.name() {
            Some("file") => {
                let content_type = field
                    .content_type()
                    .unwrap_or("application/pdf")
                    .to_string();
                if content_type != "application/pdf" {
                    return Err(AppError::Validation(
                        "Only PDF files are supported".to_string(),
                    ));
                }

                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read file: {e}")))?;

                let max_bytes = state.config.upload.max_file_size_mb * 1024 * 1024;
                if data.len() > max_bytes {
                    return Err(AppError::Validation(format!(
                        "File too large. Maximum size is {} MB",
                        state.config.upload.max_file_size_mb
                    )));
                }

                file_bytes = Some(data.to_vec());
            }
            Some("question") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read question: {e}")))?;
                question = Some(text);
            }
            _ => {}
        }
    }

    validate_submission(file_bytes.as_deref(), question.as_deref())?;
    let file_bytes = file_bytes.unwrap();
    let question = question.unwrap().trim().to_string();

    let document = Arc::new(state.pipeline.process_document(&file_bytes).await?);
    state.sessions.set_document(&session, document.clone());

    // A generation failure past this point leaves the processed document
    // in place for follow-up questions.
    let answer = state.pipeline.answer(&document, &question).await?;

    state.sessions.record_exchange(
        &session,
        Exchange {
            question,
            answer: answer.text.clone(),
            padded: answer.padded,
            created_at: chrono::Utc::now().to_rfc3339(),
        },
    );

    let history = state
        .sessions
        .recent_exchanges(&session, state.config.history.display_window);

    Ok(Json(AnswerResponse {
        answer: answer.text,
        padded: answer.padded,
        history,
    }))
}

#[derive(Deserialize)]
pub struct AskRequest {
    pub question: String,
}

/// Ask a follow-up question against the session's current document.
pub async fn ask(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<AskRequest>,
) -> Result<Json<AnswerResponse>, AppError> {
    let session = session_id(&headers);

    let question = payload.question.trim().to_string();
    if question.is_empty() {
        return Err(AppError::Validation("A question is required".to_string()));
    }

    let document = state.sessions.document(&session).ok_or_else(|| {
        AppError::NotFound("No document has been processed in this session".to_string())
    })?;

    let answer = state.pipeline.answer(&document, &question).await?;

    state.sessions.record_exchange(
        &session,
        Exchange {
            question,
            answer: answer.text.clone(),
            padded: answer.padded,
            created_at: chrono::Utc::now().to_rfc3339(),
        },
    );

    let history = state
        .sessions
        .recent_exchanges(&session, state.config.history.display_window);

    Ok(Json(AnswerResponse {
        answer: answer.text,
        padded: answer.padded,
        history,
    }))
}

pub async fn history(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Json<Vec<Exchange>> {
    let session = session_id(&headers);
    Json(
        state
            .sessions
            .recent_exchanges(&session, state.config.history.display_window),
    )
}

pub async fn reset_session(State(state): State<AppState>, headers: HeaderMap) {
    let session = session_id(&headers);
    state.sessions.clear(&session);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::pipeline::{ContextSelector, Pipeline};
    use crate::services::answer::{AnswerBackend, AnswerEngine};
    use crate::services::llm::{Completer, GenerationParams};
    use crate::services::pdf::DocumentParser;
    use async_trait::async_trait;
    use axum::http::HeaderValue;

    struct StubParser;

    #[async_trait]
    impl DocumentParser for StubParser {
        async fn extract_pages(&self, _bytes: &[u8]) -> anyhow::Result<Vec<String>> {
            Ok(vec!["climate change is driven by greenhouse gases".to_string()])
        }
    }

    struct StubCompleter;

    #[async_trait]
    impl Completer for StubCompleter {
        async fn complete(
            &self,
            _prompt: &str,
            _params: &GenerationParams,
        ) -> anyhow::Result<String> {
            Ok("a perfectly serviceable answer with more than enough words in it to clear \
                the configured padding floor for generated answers in every test here"
                .to_string())
        }
    }

    fn test_state() -> AppState {
        let config = AppConfig::load().unwrap();
        let engine = AnswerEngine::new(
            AnswerBackend::Generative(Arc::new(StubCompleter)),
            config.answer.clone(),
            GenerationParams {
                temperature: 0.7,
                max_tokens: 400,
            },
        );
        let pipeline = Pipeline::new(
            Arc::new(StubParser),
            ContextSelector::Whole { word_cap: 300 },
            engine,
        );
        AppState::new(config, pipeline)
    }

    #[tokio::test]
    async fn test_ask_without_processed_document_is_not_found() {
        let state = test_state();
        let result = ask(
            State(state),
            HeaderMap::new(),
            Json(AskRequest {
                question: "What drives climate change?".to_string(),
            }),
        )
        .await;

        match result {
            Err(AppError::NotFound(_)) => {}
            Err(e) => panic!("expected NotFound, got {e}"),
            Ok(_) => panic!("expected NotFound, got an answer"),
        }
    }

    #[tokio::test]
    async fn test_ask_after_processing_answers_and_records_history() {
        let state = test_state();
        let document = state.pipeline.process_document(b"pdf").await.unwrap();
        state.sessions.set_document("anonymous", Arc::new(document));

        let result = ask(
            State(state.clone()),
            HeaderMap::new(),
            Json(AskRequest {
                question: "What drives climate change?".to_string(),
            }),
        )
        .await;

        match result {
            Ok(Json(response)) => {
                assert!(!response.answer.is_empty());
                assert_eq!(response.history.len(), 1);
            }
            Err(e) => panic!("expected an answer: {e}"),
        }
    }

    #[test]
    fn test_submission_rejected_without_question() {
        let err = validate_submission(Some(b"pdf"), None).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = validate_submission(Some(b"pdf"), Some("   ")).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_submission_rejected_without_file() {
        let err = validate_submission(None, Some("a question")).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_submission_accepted_with_both() {
        assert!(validate_submission(Some(b"pdf"), Some("a question")).is_ok());
    }

    #[test]
    fn test_body_limit_exceeds_file_cap() {
        assert_eq!(body_limit_bytes(50), 51 * 1024 * 1024);
        assert!(body_limit_bytes(50) > 50 * 1024 * 1024);
    }

    #[test]
    fn test_session_id_defaults_to_anonymous() {
        let headers = HeaderMap::new();
        assert_eq!(session_id(&headers), "anonymous");

        let mut headers = HeaderMap::new();
        headers.insert("x-session-id", HeaderValue::from_static("  "));
        assert_eq!(session_id(&headers), "anonymous");

        let mut headers = HeaderMap::new();
        headers.insert("x-session-id", HeaderValue::from_static("user-42"));
        assert_eq!(session_id(&headers), "user-42");
    }
}
