use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::QaConfig;

#[derive(Debug, Clone)]
pub struct ExtractedSpan {
    /// A contiguous substring of the supplied context.
    pub answer: String,
    pub score: f32,
}

/// Extractive QA seam: (question, context) in, answer span out.
#[async_trait]
pub trait SpanExtractor: Send + Sync {
    async fn extract(&self, question: &str, context: &str) -> Result<ExtractedSpan>;
}

/// Hosted span-extraction model behind a question-answering inference API.
pub struct HostedSpanExtractor {
    endpoint: String,
    model: String,
    api_token: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct QaRequest<'a> {
    inputs: QaInputs<'a>,
}

#[derive(Serialize)]
struct QaInputs<'a> {
    question: &'a str,
    context: &'a str,
}

#[derive(Deserialize)]
struct QaResponse {
    answer: String,
    score: f32,
}

impl HostedSpanExtractor {
    pub fn new(config: &QaConfig) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_token: config.api_token.clone(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl SpanExtractor for HostedSpanExtractor {
    async fn extract(&self, question: &str, context: &str) -> Result<ExtractedSpan> {
        let url = format!("{}/models/{}", self.endpoint, self.model);

        let request = QaRequest {
            inputs: QaInputs { question, context },
        };

        let mut builder = self.client.post(&url).json(&request);
        if !self.api_token.is_empty() {
            builder = builder.bearer_auth(&self.api_token);
        }

        let response = builder
            .send()
            .await
            .context("Failed to send QA inference request")?;

        if !response.status().is_success() {
            anyhow::bail!("QA inference request failed: {}", response.status());
        }

        let qa: QaResponse = response
            .json()
            .await
            .context("Failed to parse QA inference response")?;

        Ok(ExtractedSpan {
            answer: qa.answer,
            score: qa.score,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let request = QaRequest {
            inputs: QaInputs {
                question: "What drives climate change?",
                context: "Climate change is driven by greenhouse gases.",
            },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["inputs"]["question"], "What drives climate change?");
        assert!(json["inputs"]["context"].as_str().unwrap().contains("greenhouse"));
    }

    #[test]
    fn test_response_parsing() {
        let raw = r#"{"score": 0.87, "start": 30, "end": 46, "answer": "greenhouse gases"}"#;
        let qa: QaResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(qa.answer, "greenhouse gases");
        assert!((qa.score - 0.87).abs() < 1e-6);
    }
}
