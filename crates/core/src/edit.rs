use thiserror::Error;

use crate::config::{
    clamp_temperature, EditOptions, ModelTier, DEFAULT_MAX_OUTPUT_TOKENS, DEFAULT_TEMPERATURE,
};
use crate::dispatch::{dispatch, ChatProvider, DispatchError, GenerationParams};
use crate::logging::{LogRecord, LogSink};
use crate::prompts::{PromptArguments, PromptError, PromptRegistry};
use crate::report::{interpret, EditReport, OutputMode, ParseError};

/// Everything one edit pass needs. Created per user action, discarded after
/// the review is rendered.
#[derive(Clone, Debug)]
pub struct EditRequest {
    pub manuscript: String,
    /// Optional outline / world-building notes supplied by the author.
    pub auxiliary_context: String,
    pub options: EditOptions,
    pub temperature: f32,
    pub max_output_tokens: u32,
    /// Candidate model identifiers, first preference first.
    pub candidates: Vec<String>,
    pub output: OutputMode,
}

impl EditRequest {
    pub fn new(manuscript: impl Into<String>, tier: ModelTier) -> Self {
        Self {
            manuscript: manuscript.into(),
            auxiliary_context: String::new(),
            options: EditOptions::default(),
            temperature: DEFAULT_TEMPERATURE,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            candidates: tier.candidates(),
            output: OutputMode::default(),
        }
    }

    pub fn with_candidates(mut self, candidates: Vec<String>) -> Self {
        self.candidates = candidates;
        self
    }

    pub fn with_auxiliary_context(mut self, context: impl Into<String>) -> Self {
        self.auxiliary_context = context.into();
        self
    }
}

/// What the presentation layer receives back. Caller-owned; the library
/// keeps no state between actions.
#[derive(Clone, Debug)]
pub struct EditReview {
    /// The candidate that actually produced the output.
    pub model: String,
    pub raw_output: String,
    /// `None` in plain-text mode, where `raw_output` is the result verbatim.
    pub report: Option<EditReport>,
}

#[derive(Debug, Error)]
pub enum EditError {
    #[error("manuscript text is empty")]
    EmptyManuscript,
    #[error("candidate model list is empty")]
    NoCandidates,
    #[error("failed to render prompt: {0}")]
    Prompt(#[from] PromptError),
    #[error("model dispatch failed: {0}")]
    Dispatch(#[from] DispatchError),
    #[error("failed to decode model output: {0}")]
    Parse(#[from] ParseError),
}

/// The rendered instruction pair handed to the provider.
#[derive(Clone, Debug)]
pub struct EditPrompt {
    pub system: String,
    pub user: String,
}

/// Pure assembly of the instruction strings from a typed request. No state,
/// no side effects; unit-testable without a network.
pub fn build_prompt(
    prompts: &PromptRegistry,
    request: &EditRequest,
) -> Result<EditPrompt, PromptError> {
    let mut args = PromptArguments::new();
    args.insert("humanize".into(), flag_label(request.options.humanize).into());
    args.insert(
        "logic_check".into(),
        flag_label(request.options.logic_check).into(),
    );
    args.insert("style".into(), request.options.style.label().into());
    args.insert(
        "target_use".into(),
        request.options.target_use.label().into(),
    );
    args.insert("manuscript".into(), request.manuscript.trim().to_string());
    args.insert(
        "auxiliary_context".into(),
        auxiliary_block(&request.auxiliary_context),
    );

    let key = match request.output {
        OutputMode::Structured => "manuscript_review",
        OutputMode::PlainText => "manuscript_rewrite",
    };

    let system = prompts.format("system_preamble", &PromptArguments::new())?;
    let user = prompts.format(key, &args)?;

    Ok(EditPrompt { system, user })
}

fn flag_label(enabled: bool) -> &'static str {
    if enabled {
        "是"
    } else {
        "否"
    }
}

fn auxiliary_block(context: &str) -> String {
    let trimmed = context.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("\n【作者补充的世界观/大纲信息】：\n{trimmed}\n")
    }
}

/// One edit pass: render the prompt, walk the candidate models, decode the
/// answer. Strictly sequential and synchronous; the only retry axis is the
/// next candidate.
pub struct EditService<'a> {
    prompts: &'a PromptRegistry,
    sink: &'a dyn LogSink,
}

impl<'a> EditService<'a> {
    pub fn new(prompts: &'a PromptRegistry, sink: &'a dyn LogSink) -> Self {
        Self { prompts, sink }
    }

    pub fn run<P>(&self, provider: &P, request: &EditRequest) -> Result<EditReview, EditError>
    where
        P: ChatProvider + ?Sized,
    {
        if request.manuscript.trim().is_empty() {
            return Err(EditError::EmptyManuscript);
        }
        if request.candidates.is_empty() {
            return Err(EditError::NoCandidates);
        }

        let prompt = build_prompt(self.prompts, request)?;
        self.sink.log(LogRecord::info(format!(
            "开始分析与润色，候选模型 {} 个。",
            request.candidates.len()
        )));

        let params = GenerationParams {
            temperature: clamp_temperature(request.temperature),
            max_output_tokens: request.max_output_tokens,
        };

        let output = dispatch(
            provider,
            &request.candidates,
            Some(&prompt.system),
            &prompt.user,
            &params,
            self.sink,
        )?;
        self.sink.log(LogRecord::info(format!(
            "本次实际使用的模型：{}",
            output.model
        )));

        let report = interpret(&output.raw_output, request.output)?;

        Ok(EditReview {
            model: output.model,
            raw_output: output.raw_output,
            report,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{StyleProfile, TargetUse};

    fn registry() -> PromptRegistry {
        PromptRegistry::new().expect("built-in prompts parse")
    }

    fn request(manuscript: &str) -> EditRequest {
        EditRequest::new(manuscript, ModelTier::Light)
    }

    #[test]
    fn review_prompt_reflects_the_options() {
        let mut req = request("他推开门，走了进去。");
        req.options = EditOptions {
            humanize: true,
            logic_check: false,
            style: StyleProfile::Literary,
            target_use: TargetUse::Contest,
        };

        let prompt = build_prompt(&registry(), &req).expect("rendered");
        assert!(prompt.system.contains("小说编辑"));
        assert!(prompt.user.contains("去AI化润色：是"));
        assert!(prompt.user.contains("逻辑/设定检查：否"));
        assert!(prompt.user.contains("文学性偏强（语言更讲究）"));
        assert!(prompt.user.contains("征文比赛"));
        assert!(prompt.user.contains("他推开门，走了进去。"));
    }

    #[test]
    fn auxiliary_context_block_is_conditional() {
        let bare = build_prompt(&registry(), &request("正文")).expect("rendered");
        assert!(!bare.user.contains("作者补充的世界观"));

        let with_context = build_prompt(
            &registry(),
            &request("正文").with_auxiliary_context("男主是卧底警察。"),
        )
        .expect("rendered");
        assert!(with_context.user.contains("【作者补充的世界观/大纲信息】"));
        assert!(with_context.user.contains("男主是卧底警察。"));
    }

    #[test]
    fn plain_text_mode_uses_the_rewrite_template() {
        let mut req = request("正文");
        req.output = OutputMode::PlainText;

        let prompt = build_prompt(&registry(), &req).expect("rendered");
        assert!(prompt.user.contains("只输出润色后的正文本身"));
        assert!(!prompt.user.contains("edited_text"));
    }
}
