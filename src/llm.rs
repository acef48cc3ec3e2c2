use crate::config::LLMConfig;
use crate::{JobScoutError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

/// Sends chat-style prompts to a language model and returns the text of its answer.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Sends a `system` message followed by a `user` message and returns the assistant's reply.
    async fn complete(&self, system: &str, user: &str) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: u32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

/// The `OpenAiChat` struct talks to an OpenAI compatible chat completions endpoint.
pub struct OpenAiChat {
    client: Client,
    api_key: String,
    config: LLMConfig,
}

impl OpenAiChat {
    /// Creates a new `OpenAiChat` sharing the given HTTP client.
    ///
    /// # Arguments
    ///
    /// * `client` - The HTTP client used for making requests.
    /// * `api_key` - The bearer token sent with every request.
    /// * `config` - The endpoint, model and sampling settings.
    pub fn new(client: Client, api_key: impl Into<String>, config: LLMConfig) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            config,
        }
    }
}

#[async_trait]
impl ChatClient for OpenAiChat {
    #[instrument(skip_all, fields(model = %self.config.model))]
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        if self.api_key.is_empty() {
            return Err(JobScoutError::LLMError("OPENAI_API_KEY is not configured".to_string()));
        }

        let request = ChatRequest {
            model: &self.config.model,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            messages: vec![
                ChatMessage { role: "system", content: system },
                ChatMessage { role: "user", content: user },
            ],
        };

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        debug!("LLM response status: {}", status);
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(JobScoutError::LLMError(format!("{}: {}", status, body)));
        }

        let response: ChatResponse = response.json().await?;
        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .ok_or_else(|| JobScoutError::LLMError("Empty completion".to_string()))
    }
}

/// Parses the JSON object or array embedded in a model answer.
///
/// Models often wrap JSON in markdown fences or surround it with prose; everything
/// outside the outermost braces (or brackets) is ignored.
pub fn parse_llm_json(text: &str) -> Result<Value> {
    let trimmed = text.trim();
    if let Ok(value) = serde_json::from_str(trimmed) {
        return Ok(value);
    }

    let object = trimmed.find('{').zip(trimmed.rfind('}'));
    let array = trimmed.find('[').zip(trimmed.rfind(']'));
    let span = match (object, array) {
        (Some(o), Some(a)) => Some(if a.0 < o.0 { a } else { o }),
        (o, a) => o.or(a),
    };

    match span {
        Some((start, end)) if start < end => Ok(serde_json::from_str(&trimmed[start..=end])?),
        _ => Err(JobScoutError::LLMError(format!(
            "No JSON found in answer: {:.100}",
            trimmed
        ))),
    }
}
