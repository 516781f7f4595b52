use std::env;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use theory_core::model::{extract_directive, Category, ChatMessage, CoachReply};

use crate::error::CoachError;

#[derive(Clone, Debug)]
pub struct CoachConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl CoachConfig {
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let api_key = env::var("THEORY_AI_API_KEY").ok()?;
        if api_key.trim().is_empty() {
            return None;
        }
        let base_url =
            env::var("THEORY_AI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into());
        let model = env::var("THEORY_AI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into());
        Some(Self {
            base_url,
            api_key,
            model,
        })
    }
}

/// Chat tutor backed by an OpenAI-compatible completions endpoint.
///
/// The coach can suggest a practice quiz by embedding an action directive
/// in its reply; `ask` parses it out so callers receive the visible text
/// and a structured [`theory_core::model::CoachAction`] separately.
#[derive(Clone)]
pub struct CoachService {
    client: Client,
    config: Option<CoachConfig>,
}

impl CoachService {
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(CoachConfig::from_env())
    }

    #[must_use]
    pub fn new(config: Option<CoachConfig>) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.config.is_some()
    }

    /// Send the conversation so far and return the coach's reply.
    ///
    /// `history` carries the full exchange, newest message last; the
    /// tutoring system prompt is prepended here.
    ///
    /// # Errors
    ///
    /// Returns `CoachError` when the service is disabled, the request
    /// fails, or the response is empty.
    pub async fn ask(&self, history: &[ChatMessage]) -> Result<CoachReply, CoachError> {
        let config = self.config.as_ref().ok_or(CoachError::Disabled)?;

        let url = format!(
            "{}/chat/completions",
            config.base_url.trim_end_matches('/')
        );
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(ChatMessage::system(system_prompt()));
        messages.extend_from_slice(history);

        let payload = ChatRequest {
            model: config.model.clone(),
            messages,
            temperature: 0.7,
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(&config.api_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(CoachError::HttpStatus(response.status()));
        }

        let body: ChatResponse = response.json().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(CoachError::EmptyResponse)?;

        let (message, action) = extract_directive(&content);
        Ok(CoachReply { message, action })
    }
}

fn system_prompt() -> String {
    let mut topics = String::new();
    for category in Category::ALL {
        if !topics.is_empty() {
            topics.push_str(", ");
        }
        topics.push_str(category.as_str());
    }
    format!(
        "You are a friendly driving theory coach helping a learner pass the \
         official test. Keep answers short, concrete and encouraging. The \
         syllabus topics are: {topics}. When the learner would benefit from \
         practising, end your reply with exactly one directive of the form \
         [[start_quiz category=<topic|mixed> count=<1-50>]] using one of the \
         topic slugs above. Never mention the directive in the visible text."
    )
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_prompt_names_every_topic() {
        let prompt = system_prompt();
        for category in Category::ALL {
            assert!(prompt.contains(category.as_str()));
        }
    }

    #[tokio::test]
    async fn disabled_without_config() {
        let service = CoachService::new(None);
        assert!(!service.enabled());

        let history = vec![ChatMessage::user("How do I revise road signs?")];
        assert!(matches!(
            service.ask(&history).await,
            Err(CoachError::Disabled)
        ));
    }
}
