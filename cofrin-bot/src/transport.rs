//! Contracts with the external collaborators: inbound chat messages, the
//! reply channel, and the opaque media-to-text converters.

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Image,
    Audio,
    Document,
}

/// A media attachment the transport adapter already downloaded.
#[derive(Debug, Clone)]
pub struct InboundMedia {
    pub media_type: MediaType,
    pub mime_type: String,
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// One message from the chat transport.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub sender_id: String,
    pub body: String,
    pub media: Option<InboundMedia>,
}

impl InboundMessage {
    pub fn text(sender_id: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            sender_id: sender_id.into(),
            body: body.into(),
            media: None,
        }
    }
}

/// Outbound side of the chat transport.
#[async_trait]
pub trait ReplyChannel: Send + Sync {
    async fn reply(&self, text: &str) -> Result<()>;
}

/// Replies to the terminal; used by the CLI front end.
pub struct StdoutReply;

#[async_trait]
impl ReplyChannel for StdoutReply {
    async fn reply(&self, text: &str) -> Result<()> {
        println!("🤖 {text}");
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("document is password-protected")]
    PasswordRequired,
    #[error("wrong password")]
    WrongPassword,
    #[error("extraction unsupported: {0}")]
    Unsupported(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Opaque media (PDF, audio) to raw text. The actual engines live with
/// the transport adapter; the pipeline only sees this capability.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract_text(&self, bytes: &[u8], password: Option<&str>)
        -> Result<String, ExtractError>;
}

/// Stand-in used by the CLI build, which ships no PDF/audio engine.
pub struct UnavailableExtractor;

#[async_trait]
impl TextExtractor for UnavailableExtractor {
    async fn extract_text(
        &self,
        _bytes: &[u8],
        _password: Option<&str>,
    ) -> Result<String, ExtractError> {
        Err(ExtractError::Unsupported(
            "no media-to-text engine in this build".to_string(),
        ))
    }
}
