//! generator::chat
//!
//! OpenAI-compatible chat-completions client.
//!
//! Groq's endpoint speaks the same protocol as OpenAI's, so one client
//! covers both; only `api_base` and `model` change. The request carries a
//! whole-request timeout, and both transport failures and non-success
//! statuses surface as [`GenerationError::Unavailable`].

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{extract_entry, truncate_diff, EntryGenerator, GenerationError};

const SYSTEM_PROMPT: &str = "You are a changelog expert. Given a unified diff, produce \
Keep-a-Changelog bullet points summarizing the changes for the [Unreleased] section. \
If a hunk consists only of re-formatted lines or whitespace changes, omit it. \
No preamble, no explanation, no headings: only bullet lines of the form \
`- **<file>**: <summary>`.";

/// Chat-completions backed entry generator.
#[derive(Clone)]
pub struct ChatCompletionsGenerator {
    client: reqwest::Client,
    api_base: String,
    api_key: Option<String>,
    model: String,
    max_diff_chars: usize,
}

impl std::fmt::Debug for ChatCompletionsGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatCompletionsGenerator")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("has_api_key", &self.api_key.is_some())
            .finish()
    }
}

impl ChatCompletionsGenerator {
    pub fn new(
        api_base: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
        max_diff_chars: usize,
    ) -> Result<Self, GenerationError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GenerationError::Unavailable(e.to_string()))?;
        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            api_key,
            model: model.into(),
            max_diff_chars,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.api_base)
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl EntryGenerator for ChatCompletionsGenerator {
    async fn generate(&self, diff: &str) -> Result<String, GenerationError> {
        let diff = truncate_diff(diff, self.max_diff_chars);
        let user_prompt = format!("Here is the unified diff:\n```diff\n{diff}\n```");
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &user_prompt,
                },
            ],
            temperature: 0.1,
        };

        let mut request = self.client.post(self.endpoint()).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        debug!(model = %self.model, diff_chars = diff.len(), "requesting changelog entry");
        let response = request.send().await.map_err(|e| {
            let reason = if e.is_timeout() { "timed out" } else { "request failed" };
            warn!(error = %e, "entry generator {reason}");
            GenerationError::Unavailable(format!("{reason}: {e}"))
        })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(GenerationError::Unavailable(format!(
                "status {status}: {}",
                text.chars().take(300).collect::<String>()
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::MalformedResponse(e.to_string()))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| GenerationError::MalformedResponse("reply has no choices".into()))?;

        extract_entry(&content)
    }
}
