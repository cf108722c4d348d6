use anyhow::{Context, Result};
use async_trait::async_trait;
use rig::client::completion::CompletionClientDyn;
use rig::client::embeddings::EmbeddingsClientDyn;
use rig::client::{ProviderClient, ProviderValue};
use rig::completion::Prompt;
use rig::providers::{anthropic, gemini, mistral, ollama, openai};

fn create_provider_boxed(provider: &str, api_key: &str) -> Result<Box<dyn ProviderClient>> {
    let value = ProviderValue::Simple(api_key.to_string());

    let boxed: Box<dyn ProviderClient> = match provider.to_lowercase().as_str() {
        "openai" => {
            let c: openai::Client<reqwest::Client> = openai::Client::from_val(value);
            c.boxed()
        }
        "anthropic" => {
            let c: anthropic::Client<reqwest::Client> = anthropic::Client::from_val(value);
            c.boxed()
        }
        "gemini" | "google" => {
            let c: gemini::Client<reqwest::Client> = gemini::Client::from_val(value);
            c.boxed()
        }
        "mistral" => {
            let c: mistral::Client<reqwest::Client> = mistral::Client::from_val(value);
            c.boxed()
        }
        "ollama" => {
            let c: ollama::Client<reqwest::Client> = ollama::Client::from_val(value);
            c.boxed()
        }
        other => return Err(anyhow::anyhow!("Unsupported provider: {other}")),
    };

    Ok(boxed)
}

pub fn create_completion_client(
    provider: &str,
    api_key: &str,
) -> Result<Box<dyn CompletionClientDyn>> {
    let boxed = create_provider_boxed(provider, api_key)?;
    boxed
        .as_completion()
        .context(format!("Provider '{provider}' does not support completions"))
}

pub fn create_embeddings_client(
    provider: &str,
    api_key: &str,
) -> Result<Box<dyn EmbeddingsClientDyn>> {
    let boxed = create_provider_boxed(provider, api_key)?;
    boxed
        .as_embeddings()
        .context(format!("Provider '{provider}' does not support embeddings"))
}

#[derive(Debug, Clone)]
pub struct GenerationParams {
    /// Sampling temperature; generation is stochastic, not greedy.
    pub temperature: f64,
    pub max_tokens: u64,
}

/// Generative model seam: one prompt in, one completed text out.
#[async_trait]
pub trait Completer: Send + Sync {
    async fn complete(&self, prompt: &str, params: &GenerationParams) -> Result<String>;
}

pub struct RigCompleter {
    client: Box<dyn CompletionClientDyn>,
    model: String,
}

impl RigCompleter {
    pub fn new(client: Box<dyn CompletionClientDyn>, model: &str) -> Self {
        Self {
            client,
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl Completer for RigCompleter {
    async fn complete(&self, prompt: &str, params: &GenerationParams) -> Result<String> {
        let agent = self
            .client
            .agent(&self.model)
            .temperature(params.temperature)
            .max_tokens(params.max_tokens)
            .build();

        agent
            .prompt(prompt)
            .await
            .map_err(|e| anyhow::anyhow!("LLM error: {e}"))
    }
}
