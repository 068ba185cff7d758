//! Chat-completion client for the extraction oracle.
//!
//! Talks to an OpenAI-compatible endpoint, always requesting a strict JSON
//! object at temperature 0. The reply text goes straight into
//! `cofrin_core::parse_oracle_content`; nothing here interprets it.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use cofrin_core::conversation::{ConversationTurn, Role};
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_MODEL: &str = "gpt-4o";

/// What the user turn carries into the oracle call.
#[derive(Debug, Clone)]
pub enum UserContent {
    Text(String),
    /// Receipt/ note photo: the oracle reads the image directly.
    TextWithImage {
        text: String,
        base64: String,
        mime_type: String,
    },
}

/// The external reasoning capability, narrowed to one call so tests can
/// substitute a canned implementation.
#[async_trait]
pub trait Oracle: Send + Sync {
    async fn complete(
        &self,
        system_prompt: &str,
        window: &[ConversationTurn],
        content: UserContent,
    ) -> Result<String>;
}

#[derive(Clone)]
pub struct CompletionClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl CompletionClient {
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

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[derive(Serialize)]
struct Req {
    model: String,
    temperature: f32,
    messages: Vec<Msg>,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Serialize)]
struct Msg {
    role: &'static str,
    content: MsgContent,
}

#[derive(Serialize)]
#[serde(untagged)]
enum MsgContent {
    Text(String),
    Parts(Vec<Part>),
}

#[derive(Serialize)]
#[serde(tag = "type")]
enum Part {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Deserialize)]
struct Resp {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: MsgOut,
}

#[derive(Deserialize)]
struct MsgOut {
    content: Option<String>,
}

#[async_trait]
impl Oracle for CompletionClient {
    async fn complete(
        &self,
        system_prompt: &str,
        window: &[ConversationTurn],
        content: UserContent,
    ) -> Result<String> {
        let mut messages = vec![Msg {
            role: "system",
            content: MsgContent::Text(system_prompt.to_string()),
        }];

        for turn in window {
            messages.push(Msg {
                role: match turn.role {
                    Role::User => "user",
                    Role::Assistant => "assistant",
                },
                content: MsgContent::Text(turn.content.clone()),
            });
        }

        messages.push(Msg {
            role: "user",
            content: match content {
                UserContent::Text(text) => MsgContent::Text(text),
                UserContent::TextWithImage {
                    text,
                    base64,
                    mime_type,
                } => MsgContent::Parts(vec![
                    Part::Text { text },
                    Part::ImageUrl {
                        image_url: ImageUrl {
                            url: format!("data:{mime_type};base64,{base64}"),
                        },
                    },
                ]),
            },
        });

        let body = Req {
            model: self.model.clone(),
            temperature: 0.0,
            messages,
            response_format: ResponseFormat {
                format_type: "json_object",
            },
        };

        let resp = self
            .http
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("oracle request")?;

        let status = resp.status();
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_default();
            bail!("oracle error: {status} {txt}");
        }

        let out: Resp = resp.json().await.context("parse oracle response")?;
        let content = out
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();

        Ok(content.trim().to_string())
    }
}
