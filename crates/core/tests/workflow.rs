use std::sync::Mutex;

use polish_core::{
    ChatProvider, DispatchError, EditError, EditRequest, EditService, ModelCall, ModelTier,
    OutputMode, PromptRegistry, ProviderError, ProviderErrorKind, VecLogSink,
};

#[derive(Debug)]
enum Reply {
    Text(&'static str),
    Fail(ProviderErrorKind, &'static str),
}

/// Provider double keyed by model name; unknown names are rejected the way a
/// real backend rejects a nonexistent model. Records every call for
/// short-circuit assertions.
#[derive(Debug)]
struct MockProvider {
    replies: Vec<(&'static str, Reply)>,
    calls: Mutex<Vec<String>>,
}

impl MockProvider {
    fn new(replies: Vec<(&'static str, Reply)>) -> Self {
        Self {
            replies,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("mock mutex poisoned").clone()
    }
}

impl ChatProvider for MockProvider {
    fn generate(&self, call: &ModelCall<'_>) -> Result<String, ProviderError> {
        self.calls
            .lock()
            .expect("mock mutex poisoned")
            .push(call.model.to_string());
        match self.replies.iter().find(|(model, _)| *model == call.model) {
            Some((_, Reply::Text(text))) => Ok((*text).to_string()),
            Some((_, Reply::Fail(kind, message))) => Err(ProviderError::new(*kind, *message)),
            None => Err(ProviderError::new(
                ProviderErrorKind::ModelNotFound,
                format!("models/{} is not found for API version v1beta", call.model),
            )),
        }
    }
}

const REPORT_JSON: &str =
    r#"{"edited_text":"foo","ai_style_issues":[],"logic_issues":[],"suggestions":"bar"}"#;

fn request(candidates: &[&str]) -> EditRequest {
    EditRequest::new("窗外的雨下了一夜。", ModelTier::Light)
        .with_candidates(candidates.iter().map(|c| c.to_string()).collect())
}

#[test]
fn fallback_reaches_the_second_candidate() {
    let provider = MockProvider::new(vec![("m2", Reply::Text(REPORT_JSON))]);
    let prompts = PromptRegistry::new().expect("registry");
    let sink = VecLogSink::new();

    let review = EditService::new(&prompts, &sink)
        .run(&provider, &request(&["m1", "m2"]))
        .expect("m2 answers");

    assert_eq!(review.model, "m2");
    let report = review.report.expect("structured mode");
    assert_eq!(report.edited_text, "foo");
    assert_eq!(report.suggestions, "bar");
    assert_eq!(provider.calls(), vec!["m1", "m2"]);
}

#[test]
fn preferred_candidate_wins_without_touching_the_rest() {
    let provider = MockProvider::new(vec![
        ("m1", Reply::Text(REPORT_JSON)),
        ("m2", Reply::Text("{\"edited_text\":\"wrong\"}")),
    ]);
    let prompts = PromptRegistry::new().expect("registry");
    let sink = VecLogSink::new();

    let review = EditService::new(&prompts, &sink)
        .run(&provider, &request(&["m1", "m2"]))
        .expect("m1 answers");

    assert_eq!(review.model, "m1");
    assert_eq!(provider.calls(), vec!["m1"]);
}

#[test]
fn blank_reply_means_no_usable_model() {
    let provider = MockProvider::new(vec![("m1", Reply::Text(""))]);
    let prompts = PromptRegistry::new().expect("registry");
    let sink = VecLogSink::new();

    let error = EditService::new(&prompts, &sink)
        .run(&provider, &request(&["m1"]))
        .expect_err("empty body is a failure");

    match error {
        EditError::Dispatch(DispatchError::NoUsableModel { model }) => {
            assert_eq!(model.as_deref(), Some("m1"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn authentication_failure_is_not_retried_on_weaker_candidates() {
    // 鉴权失败与候选无关，换更弱的模型重试只是浪费。
    let provider = MockProvider::new(vec![
        (
            "m1",
            Reply::Fail(ProviderErrorKind::Unauthorized, "API key not valid"),
        ),
        ("m2", Reply::Text(REPORT_JSON)),
    ]);
    let prompts = PromptRegistry::new().expect("registry");
    let sink = VecLogSink::new();

    let error = EditService::new(&prompts, &sink)
        .run(&provider, &request(&["m1", "m2"]))
        .expect_err("auth failure is fatal");

    match error {
        EditError::Dispatch(DispatchError::Provider { model, source }) => {
            assert_eq!(model, "m1");
            assert_eq!(source.kind(), ProviderErrorKind::Unauthorized);
            assert_eq!(source.message(), "API key not valid");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(provider.calls(), vec!["m1"]);
}

#[test]
fn quota_failure_mid_list_stops_the_walk() {
    let provider = MockProvider::new(vec![
        (
            "m2",
            Reply::Fail(ProviderErrorKind::RateLimited, "quota exceeded"),
        ),
        ("m3", Reply::Text(REPORT_JSON)),
    ]);
    let prompts = PromptRegistry::new().expect("registry");
    let sink = VecLogSink::new();

    let error = EditService::new(&prompts, &sink)
        .run(&provider, &request(&["m1", "m2", "m3"]))
        .expect_err("quota failure is fatal");

    assert!(matches!(
        error,
        EditError::Dispatch(DispatchError::Provider { .. })
    ));
    assert_eq!(provider.calls(), vec!["m1", "m2"]);
}

#[test]
fn exhausted_candidates_surface_the_last_rejection() {
    let provider = MockProvider::new(vec![]);
    let prompts = PromptRegistry::new().expect("registry");
    let sink = VecLogSink::new();

    let error = EditService::new(&prompts, &sink)
        .run(&provider, &request(&["m1", "m2", "m3"]))
        .expect_err("every candidate is unknown");

    match error {
        EditError::Dispatch(DispatchError::Exhausted { model, source }) => {
            assert_eq!(model, "m3");
            assert!(source.message().contains("m3"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(provider.calls(), vec!["m1", "m2", "m3"]);
}

#[test]
fn fenced_json_reply_still_decodes() {
    let provider = MockProvider::new(vec![(
        "m1",
        Reply::Text("```json\n{\"edited_text\":\"雨声很轻。\",\"suggestions\":\"好\"}\n```"),
    )]);
    let prompts = PromptRegistry::new().expect("registry");
    let sink = VecLogSink::new();

    let review = EditService::new(&prompts, &sink)
        .run(&provider, &request(&["m1"]))
        .expect("fenced JSON decodes");

    let report = review.report.expect("structured mode");
    assert_eq!(report.edited_text, "雨声很轻。");
    assert!(report.logic_issues.is_empty());
}

#[test]
fn undecodable_reply_keeps_the_raw_text_reachable() {
    let provider = MockProvider::new(vec![("m1", Reply::Text("我觉得这段写得不错。"))]);
    let prompts = PromptRegistry::new().expect("registry");
    let sink = VecLogSink::new();

    let error = EditService::new(&prompts, &sink)
        .run(&provider, &request(&["m1"]))
        .expect_err("not JSON");

    match error {
        EditError::Parse(parse) => assert_eq!(parse.raw_output(), "我觉得这段写得不错。"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn plain_text_mode_returns_the_reply_verbatim() {
    let provider = MockProvider::new(vec![("m1", Reply::Text("润色后的正文。"))]);
    let prompts = PromptRegistry::new().expect("registry");
    let sink = VecLogSink::new();

    let mut req = request(&["m1"]);
    req.output = OutputMode::PlainText;

    let review = EditService::new(&prompts, &sink)
        .run(&provider, &req)
        .expect("plain mode");

    assert_eq!(review.raw_output, "润色后的正文。");
    assert!(review.report.is_none());
}

#[test]
fn preconditions_are_checked_before_any_call() {
    let provider = MockProvider::new(vec![("m1", Reply::Text(REPORT_JSON))]);
    let prompts = PromptRegistry::new().expect("registry");
    let sink = VecLogSink::new();
    let service = EditService::new(&prompts, &sink);

    let blank = EditRequest::new("   ", ModelTier::Light);
    assert!(matches!(
        service.run(&provider, &blank),
        Err(EditError::EmptyManuscript)
    ));

    let no_candidates = request(&[]);
    assert!(matches!(
        service.run(&provider, &no_candidates),
        Err(EditError::NoCandidates)
    ));

    assert!(provider.calls().is_empty());
}
