use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub upload: UploadConfig,
    pub pipeline: PipelineConfig,
    pub llm: LlmConfig,
    pub qa: QaConfig,
    pub answer: AnswerConfig,
    pub history: HistoryConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UploadConfig {
    pub max_file_size_mb: usize,
}

/// How context is selected from an uploaded document.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SelectorMode {
    /// Truncate the full document text to a fixed word budget.
    Whole,
    /// Embed overlapping character windows and retrieve nearest chunks.
    Chunked,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PipelineConfig {
    pub mode: SelectorMode,
    pub whole_doc_word_cap: usize,
    pub chunk_window: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
    pub context_word_cap: Option<usize>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    pub provider: String,
    pub model: String,
    pub embedding_model: String,
    pub api_key: String,
    pub temperature: f64,
    pub max_output_tokens: u64,
}

/// Hosted span-extraction endpoint (question-answering inference API).
#[derive(Debug, Deserialize, Clone)]
pub struct QaConfig {
    pub endpoint: String,
    pub model: String,
    pub api_token: String,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AnswerMode {
    Extractive,
    Generative,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AnswerConfig {
    pub mode: AnswerMode,
    pub extractive_word_cap: usize,
    pub min_answer_words: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HistoryConfig {
    pub max_entries: usize,
    pub display_window: usize,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("RUN_ENV").unwrap_or_else(|_| "development".into());

        Config::builder()
            .add_source(File::with_name("config/default"))
            .add_source(File::with_name(&format!("config/{environment}")).required(false))
            .add_source(Environment::with_prefix("APP").separator("__"))
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_loads() {
        let config = AppConfig::load();
        assert!(config.is_ok(), "Default config should load: {config:?}");

        let config = config.unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.pipeline.top_k, 3);
        assert_eq!(config.pipeline.whole_doc_word_cap, 300);
        assert_eq!(config.history.display_window, 3);
    }

    #[test]
    fn test_chunk_window_exceeds_overlap() {
        let config = AppConfig::load().unwrap();
        assert!(config.pipeline.chunk_window > config.pipeline.chunk_overlap);
    }
}
