mod base_url;
mod error;
mod gemini;
mod openai_like;
mod provider;

pub use base_url::{
    normalize_gemini_base_url, normalize_openai_base_url, GEMINI_DEFAULT_BASE_URL,
    OPENAI_DEFAULT_BASE_URL,
};
pub use error::AdapterError;
pub use gemini::GeminiProvider;
pub use openai_like::OpenAiCompatProvider;
pub use provider::{create_provider, ProviderConfig};

pub use polish_core::{ChatProvider, ModelCall, ProviderError, ProviderErrorKind};
