use anyhow::Result;
use async_trait::async_trait;
use rig::client::embeddings::EmbeddingsClientDyn;

/// Embedding model seam: text in, fixed-length vector out.
///
/// The same implementation embeds both document chunks and questions, so
/// vectors are always comparable within one index.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

pub struct RigEmbedder {
    client: Box<dyn EmbeddingsClientDyn>,
    model: String,
}

impl RigEmbedder {
    pub fn new(client: Box<dyn EmbeddingsClientDyn>, model: &str) -> Self {
        Self {
            client,
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl Embedder for RigEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let model =
            EmbeddingsClientDyn::embedding_model(self.client.as_ref(), &self.model);

        let embedding = model
            .embed_text(text)
            .await
            .map_err(|e| anyhow::anyhow!("Embedding error: {e}"))?;

        Ok(embedding.vec.iter().map(|&v| v as f32).collect())
    }
}
