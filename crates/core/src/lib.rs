pub mod config;
pub mod dispatch;
pub mod edit;
pub mod logging;
pub mod prompts;
pub mod report;

pub use config::{
    clamp_temperature, resolve_api_key, ConfigError, EditOptions, ModelTier, StyleProfile,
    TargetUse, API_KEY_ENV, DEFAULT_MAX_OUTPUT_TOKENS, DEFAULT_TEMPERATURE, TEMPERATURE_MAX,
    TEMPERATURE_MIN,
};
pub use dispatch::{
    dispatch, ChatProvider, DispatchError, DispatchOutput, GenerationParams, ModelCall,
    ProviderError, ProviderErrorKind,
};
pub use edit::{build_prompt, EditError, EditPrompt, EditRequest, EditReview, EditService};
pub use logging::{
    LogLevel, LogRecord, LogSink, NullLogSink, SharedLogSink, StdoutLogSink, VecLogSink,
};
pub use prompts::{
    PromptArguments, PromptError, PromptMetadata, PromptRegistry, PromptSource, PromptTemplate,
};
pub use report::{interpret, strip_code_fence, EditReport, OutputMode, ParseError};
