//! cofrin-oracle: HTTP clients for the external reasoning engine,
//! embedding generation and exchange-rate lookup.

pub mod client;
pub mod embeddings;
pub mod prompts;
pub mod rates;

pub use client::{CompletionClient, Oracle, UserContent};
pub use embeddings::{Embedder, EmbeddingClient};
pub use prompts::{conversational_prompt, document_prompt};
pub use rates::{RateClient, RateSource};
