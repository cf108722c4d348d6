pub mod answer;
pub mod embeddings;
pub mod index;
pub mod llm;
pub mod pdf;
pub mod qa;
pub mod text;
