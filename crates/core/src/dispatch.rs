use std::error::Error as StdError;
use std::fmt;

use thiserror::Error;

use crate::logging::{LogRecord, LogSink};

/// One call against a single candidate model.
#[derive(Clone, Copy, Debug)]
pub struct ModelCall<'a> {
    pub model: &'a str,
    pub system: Option<&'a str>,
    pub prompt: &'a str,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

/// Generation knobs shared by every candidate of one dispatch.
#[derive(Clone, Copy, Debug)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_output_tokens: u32,
}

/// A chat/completion backend. One synchronous provider call per invocation;
/// no internal retry. An empty completion body is `Ok("")`, not an error —
/// the dispatcher owns empty-output classification.
pub trait ChatProvider: Send + Sync + std::fmt::Debug {
    fn generate(&self, call: &ModelCall<'_>) -> Result<String, ProviderError>;
}

/// How a provider failure bears on the fallback decision. Assigned once at
/// the client boundary; the dispatcher never inspects message text.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ProviderErrorKind {
    /// The model identifier is unknown or unsupported; the next candidate
    /// may still work.
    ModelNotFound,
    Unauthorized,
    RateLimited,
    InvalidRequest,
    Other,
}

#[derive(Debug)]
pub struct ProviderError {
    kind: ProviderErrorKind,
    message: String,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source<E>(kind: ProviderErrorKind, message: impl Into<String>, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn kind(&self) -> ProviderErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_model_not_found(&self) -> bool {
        self.kind == ProviderErrorKind::ModelNotFound
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl StdError for ProviderError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_deref()
            .map(|err| err as &(dyn StdError + 'static))
    }
}

/// Output of the candidate that answered. Request-scoped; never persisted.
#[derive(Clone, Debug)]
pub struct DispatchOutput {
    pub model: String,
    pub raw_output: String,
}

#[derive(Debug, Error)]
pub enum DispatchError {
    /// A candidate answered with an empty body, or the candidate list ran
    /// out without a single classifiable rejection.
    #[error("no usable model produced output")]
    NoUsableModel { model: Option<String> },
    /// Every candidate was rejected as unknown/unsupported; wraps the last
    /// rejection.
    #[error("all candidate models were rejected; last (`{model}`): {source}")]
    Exhausted {
        model: String,
        #[source]
        source: ProviderError,
    },
    /// A failure fallback cannot fix (auth, quota, malformed request, …).
    #[error("model `{model}` failed: {source}")]
    Provider {
        model: String,
        #[source]
        source: ProviderError,
    },
}

/// Walks the candidate list in preference order and returns the first
/// non-empty completion. `ModelNotFound` rejections fall through to the next
/// candidate; any other failure aborts immediately, since it is not
/// candidate-specific and weaker candidates would fail the same way.
pub fn dispatch<P>(
    provider: &P,
    candidates: &[String],
    system: Option<&str>,
    prompt: &str,
    params: &GenerationParams,
    sink: &dyn LogSink,
) -> Result<DispatchOutput, DispatchError>
where
    P: ChatProvider + ?Sized,
{
    let mut last_rejection: Option<(String, ProviderError)> = None;

    for model in candidates {
        sink.log(LogRecord::info(format!("尝试候选模型：{model}")));

        let call = ModelCall {
            model,
            system,
            prompt,
            temperature: params.temperature,
            max_output_tokens: params.max_output_tokens,
        };

        match provider.generate(&call) {
            Ok(output) if !output.trim().is_empty() => {
                sink.log(LogRecord::info(format!("模型 {model} 调用成功。")));
                return Ok(DispatchOutput {
                    model: model.clone(),
                    raw_output: output,
                });
            }
            Ok(_) => {
                sink.log(LogRecord::warn(format!("模型 {model} 返回内容为空。")));
                return Err(DispatchError::NoUsableModel {
                    model: Some(model.clone()),
                });
            }
            Err(err) if err.is_model_not_found() => {
                sink.log(LogRecord::warn(format!(
                    "模型 {model} 不可用，尝试下一个候选：{err}"
                )));
                last_rejection = Some((model.clone(), err));
            }
            Err(err) => {
                return Err(DispatchError::Provider {
                    model: model.clone(),
                    source: err,
                });
            }
        }
    }

    match last_rejection {
        Some((model, source)) => Err(DispatchError::Exhausted { model, source }),
        None => Err(DispatchError::NoUsableModel { model: None }),
    }
}
