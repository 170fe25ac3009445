use std::time::Duration;

use log::warn;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use polish_core::{ChatProvider, ModelCall, ProviderError};

use crate::base_url::normalize_gemini_base_url;
use crate::error::{classify_status, transport_error, AdapterError};

/// Google Gemini `generateContent` client. The model name is part of each
/// call, not of the client, so the dispatcher can walk its candidate list
/// over one connection pool.
#[derive(Debug)]
pub struct GeminiProvider {
    client: Client,
    base_url: String,
    api_key: String,
}

impl GeminiProvider {
    pub fn new(
        api_key: impl Into<String>,
        base_url: &str,
        timeout: Option<u64>,
    ) -> Result<Self, AdapterError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(AdapterError::InvalidConfig(
                "Gemini api_key must not be empty".to_string(),
            ));
        }

        let mut builder = Client::builder();
        if let Some(secs) = timeout {
            builder = builder.timeout(Duration::from_secs(secs.max(1)));
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            base_url: normalize_gemini_base_url(base_url),
            api_key,
        })
    }

    fn request_url(&self, model: &str) -> String {
        format!(
            "{base}/models/{model}:generateContent?key={key}",
            base = self.base_url,
            key = self.api_key
        )
    }
}

impl ChatProvider for GeminiProvider {
    fn generate(&self, call: &ModelCall<'_>) -> Result<String, ProviderError> {
        let request = GeminiRequest {
            system_instruction: call.system.map(|text| GeminiSystemInstruction {
                parts: vec![GeminiRequestPart { text }],
            }),
            contents: vec![GeminiRequestContent {
                role: "user",
                parts: vec![GeminiRequestPart { text: call.prompt }],
            }],
            generation_config: GeminiGenerationConfig {
                max_output_tokens: call.max_output_tokens,
                temperature: call.temperature,
            },
        };

        let response = self
            .client
            .post(self.request_url(call.model))
            .json(&request)
            .send()
            .map_err(transport_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(classify_status(status, body));
        }

        let parsed: GeminiResponse = response.json().map_err(transport_error)?;
        Ok(collect_candidate_text(parsed))
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiSystemInstruction<'a>>,
    contents: Vec<GeminiRequestContent<'a>>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Serialize)]
struct GeminiSystemInstruction<'a> {
    parts: Vec<GeminiRequestPart<'a>>,
}

#[derive(Serialize)]
struct GeminiRequestContent<'a> {
    role: &'static str,
    parts: Vec<GeminiRequestPart<'a>>,
}

#[derive(Serialize)]
struct GeminiRequestPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContent>,
    #[serde(rename = "finishReason")]
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GeminiPart {
    Text { text: String },
    Other(serde_json::Value),
}

/// Concatenates the text parts of the first candidate that has any. A
/// response without usable text yields an empty string; the dispatcher
/// decides what that means.
fn collect_candidate_text(response: GeminiResponse) -> String {
    for candidate in response.candidates {
        if let Some(reason) = candidate.finish_reason.as_deref() {
            match reason {
                "MAX_TOKENS" => warn!("Gemini response truncated due to max_output_tokens limit"),
                "SAFETY" => warn!("Gemini response blocked by safety filters"),
                "RECITATION" => warn!("Gemini response blocked due to recitation concerns"),
                _ => {}
            }
        }

        if let Some(content) = candidate.content {
            let mut text = String::new();
            for part in content.parts {
                if let GeminiPart::Text { text: part_text } = part {
                    text.push_str(&part_text);
                }
            }
            if !text.trim().is_empty() {
                return text;
            }
        }
    }

    String::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_uses_the_wire_field_names() {
        let request = GeminiRequest {
            system_instruction: Some(GeminiSystemInstruction {
                parts: vec![GeminiRequestPart { text: "你是编辑。" }],
            }),
            contents: vec![GeminiRequestContent {
                role: "user",
                parts: vec![GeminiRequestPart { text: "润色这段。" }],
            }],
            generation_config: GeminiGenerationConfig {
                max_output_tokens: 8192,
                temperature: 0.5,
            },
        };

        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("systemInstruction").is_some());
        assert_eq!(value["contents"][0]["role"], "user");
        assert_eq!(value["generationConfig"]["maxOutputTokens"], 8192);
    }

    #[test]
    fn candidate_text_parts_are_concatenated() {
        let response: GeminiResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"前半"},{"text":"后半"}]},"finishReason":"STOP"}]}"#,
        )
        .unwrap();
        assert_eq!(collect_candidate_text(response), "前半后半");
    }

    #[test]
    fn blocked_response_collapses_to_empty() {
        let response: GeminiResponse =
            serde_json::from_str(r#"{"candidates":[{"finishReason":"SAFETY"}]}"#).unwrap();
        assert_eq!(collect_candidate_text(response), "");

        let empty: GeminiResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(collect_candidate_text(empty), "");
    }

    #[test]
    fn non_text_parts_are_ignored() {
        let response: GeminiResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"inlineData":{"mimeType":"image/png"}},{"text":"正文"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(collect_candidate_text(response), "正文");
    }

    #[test]
    fn blank_api_key_is_rejected() {
        let error = GeminiProvider::new("  ", "", None).expect_err("blank key");
        assert!(matches!(error, AdapterError::InvalidConfig(_)));
    }

    #[test]
    fn url_is_built_per_model() {
        let provider = GeminiProvider::new("test-key", "", None).unwrap();
        assert_eq!(
            provider.request_url("gemini-1.5-flash"),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent?key=test-key"
        );
    }
}
