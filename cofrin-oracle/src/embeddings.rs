//! Batch embedding generation for similarity search.
//!
//! One API call per batch, order-preserving. Embeddings are an enrichment:
//! when the call fails the whole batch degrades to nulls and the financial
//! records still save.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_MODEL: &str = "text-embedding-3-small";

/// Order-preserving batch embedder; output length always equals input
/// length.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed_batch(&self, texts: &[String]) -> Vec<Option<Vec<f32>>>;
}

#[derive(Clone)]
pub struct EmbeddingClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl EmbeddingClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn request(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            input: &'a [String],
            encoding_format: &'a str,
        }

        #[derive(Deserialize)]
        struct Resp {
            data: Vec<Item>,
        }

        #[derive(Deserialize)]
        struct Item {
            embedding: Vec<f32>,
        }

        let resp = self
            .http
            .post(format!("{}/v1/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&Req {
                model: &self.model,
                input: texts,
                encoding_format: "float",
            })
            .send()
            .await
            .context("embedding request")?;

        let status = resp.status();
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_default();
            bail!("embedding error: {status} {txt}");
        }

        let out: Resp = resp.json().await.context("parse embedding response")?;
        Ok(out.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait]
impl Embedder for EmbeddingClient {
    async fn embed_batch(&self, texts: &[String]) -> Vec<Option<Vec<f32>>> {
        if texts.is_empty() {
            return Vec::new();
        }
        match self.request(texts).await {
            Ok(vectors) if vectors.len() == texts.len() => {
                vectors.into_iter().map(Some).collect()
            }
            Ok(vectors) => {
                warn!(
                    expected = texts.len(),
                    got = vectors.len(),
                    "embedding batch length mismatch, saving without vectors"
                );
                texts.iter().map(|_| None).collect()
            }
            Err(err) => {
                warn!(error = %err, "embedding batch failed, saving without vectors");
                texts.iter().map(|_| None).collect()
            }
        }
    }
}
