use serde::Deserialize;
use serde_json::json;

use crate::{
    application::services::{AnswerGenerator, GeneratedAnswer, GenerationRequest},
    domain::{
        prompt::{build_user_prompt, SYSTEM_PROMPT},
        DomainError, TokenUsage,
    },
    infrastructure::http_client::ProviderClient,
};

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

/// Answer generator calling an OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenAiChatGenerator {
    client: ProviderClient,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiChatGenerator {
    pub fn new(client: ProviderClient, temperature: f32, max_tokens: u32) -> Self {
        Self {
            client,
            temperature,
            max_tokens,
        }
    }

    fn request_body(&self, request: &GenerationRequest) -> serde_json::Value {
        let mut body = json!({
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                {
                    "role": "user",
                    "content": build_user_prompt(&request.question, request.contexts.as_slice())
                },
            ],
            "temperature": request.temperature.unwrap_or(self.temperature),
            "max_tokens": self.max_tokens,
            "top_p": 1.0,
        });
        if self.client.sends_model() {
            body["model"] = json!(self.client.model());
        }
        body
    }
}

impl AnswerGenerator for OpenAiChatGenerator {
    fn model(&self) -> &str {
        self.client.model()
    }

    fn generate(&self, request: &GenerationRequest) -> Result<GeneratedAnswer, DomainError> {
        let response: ChatResponse = self
            .client
            .post_json("chat/completions", self.request_body(request))?;

        let text = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| DomainError::provider("chat completion returned no content"))?;

        Ok(GeneratedAnswer {
            text,
            model: response
                .model
                .unwrap_or_else(|| self.client.model().to_string()),
            usage: response.usage.map(|usage| TokenUsage {
                prompt_tokens: usage.prompt_tokens,
                completion_tokens: usage.completion_tokens,
                total_tokens: usage.total_tokens,
            }),
        })
    }
}
