use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use polish_core::{ChatProvider, ModelCall, ProviderError};

use crate::base_url::normalize_openai_base_url;
use crate::error::{classify_status, transport_error, AdapterError};

/// Client for `chat/completions`-style endpoints (OpenAI, DeepSeek, Ollama
/// and other compatible servers). The model identifier travels in the request
/// body, so one client serves every candidate.
#[derive(Debug)]
pub struct OpenAiCompatProvider {
    client: Client,
    url: String,
    api_key: Option<String>,
}

impl OpenAiCompatProvider {
    pub fn new(
        api_key: Option<String>,
        base_url: &str,
        timeout: Option<u64>,
    ) -> Result<Self, AdapterError> {
        let base = normalize_openai_base_url(base_url);
        if base.is_empty() {
            return Err(AdapterError::InvalidConfig(
                "base_url must not be empty".to_string(),
            ));
        }

        let mut builder = Client::builder();
        if let Some(secs) = timeout {
            builder = builder.timeout(Duration::from_secs(secs.max(1)));
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            url: format!("{}/chat/completions", base.trim_end_matches('/')),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
        })
    }
}

impl ChatProvider for OpenAiCompatProvider {
    fn generate(&self, call: &ModelCall<'_>) -> Result<String, ProviderError> {
        let mut messages = Vec::new();
        if let Some(system) = call.system {
            messages.push(ChatMessageRequest {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessageRequest {
            role: "user",
            content: call.prompt,
        });

        let body = ChatCompletionRequest {
            model: call.model,
            messages,
            max_tokens: Some(call.max_output_tokens),
            temperature: Some(call.temperature),
        };

        let mut request = self.client.post(&self.url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().map_err(transport_error)?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(classify_status(status, body));
        }

        let parsed: ChatCompletionResponse = response.json().map_err(transport_error)?;
        Ok(extract_choice_content(parsed).unwrap_or_default())
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessageRequest<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize)]
struct ChatMessageRequest<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    #[serde(default)]
    message: Option<ChatMessage>,
    // Some compatible servers put the text directly on the choice.
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

fn extract_choice_content(response: ChatCompletionResponse) -> Option<String> {
    for choice in response.choices {
        if let Some(message) = choice.message {
            if let Some(content) = message.content {
                if !content.trim().is_empty() {
                    return Some(content);
                }
            }
        }
        if let Some(content) = choice.content {
            if !content.trim().is_empty() {
                return Some(content);
            }
        }
    }
    None
}
