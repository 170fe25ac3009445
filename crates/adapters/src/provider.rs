use serde::{Deserialize, Serialize};

use polish_core::ChatProvider;

use crate::error::AdapterError;
use crate::gemini::GeminiProvider;
use crate::openai_like::OpenAiCompatProvider;

/// Connection settings for one provider endpoint. Carried by the embedding
/// application; this library persists nothing.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ProviderConfig {
    /// Which wire protocol to speak: `gemini` or `openai`.
    #[serde(default)]
    pub interface_format: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub base_url: String,
    /// Request timeout in seconds; `None` keeps the HTTP client default.
    #[serde(default)]
    pub timeout: Option<u64>,
}

pub fn create_provider(config: &ProviderConfig) -> Result<Box<dyn ChatProvider>, AdapterError> {
    let format = config.interface_format.trim().to_lowercase();
    match format.as_str() {
        "gemini" => Ok(Box::new(GeminiProvider::new(
            config.api_key.clone(),
            &config.base_url,
            config.timeout,
        )?)),
        "openai" => Ok(Box::new(OpenAiCompatProvider::new(
            optional_string(&config.api_key),
            &config.base_url,
            config.timeout,
        )?)),
        other => Err(AdapterError::InvalidConfig(format!(
            "unknown interface_format: {other}"
        ))),
    }
}

fn optional_string(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
