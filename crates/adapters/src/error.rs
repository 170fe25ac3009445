use reqwest::StatusCode;
use thiserror::Error;

use polish_core::{ProviderError, ProviderErrorKind};

/// Client construction failures. Runtime failures are mapped straight into
/// [`ProviderError`] so the dispatcher can classify them.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("invalid adapter configuration: {0}")]
    InvalidConfig(String),
    #[error("failed to build http client: {0}")]
    Http(#[from] reqwest::Error),
}

/// Maps an HTTP status to the fallback-relevant error kind. The response
/// body rides along verbatim so the operator sees what the provider said.
pub(crate) fn classify_status(status: StatusCode, body: String) -> ProviderError {
    let kind = match status {
        StatusCode::NOT_FOUND => ProviderErrorKind::ModelNotFound,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderErrorKind::Unauthorized,
        StatusCode::TOO_MANY_REQUESTS => ProviderErrorKind::RateLimited,
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            ProviderErrorKind::InvalidRequest
        }
        _ => ProviderErrorKind::Other,
    };
    ProviderError::new(kind, format!("unexpected http status {status}: {body}"))
}

pub(crate) fn transport_error(err: reqwest::Error) -> ProviderError {
    let message = if err.is_decode() {
        format!("failed to parse provider response: {err}")
    } else {
        format!("http request failed: {err}")
    };
    ProviderError::with_source(ProviderErrorKind::Other, message, err)
}
