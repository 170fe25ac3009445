use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The structured record the review prompt contracts for. Keys the model
/// omits decode to empty values rather than failing.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct EditReport {
    #[serde(default)]
    pub edited_text: String,
    #[serde(default)]
    pub ai_style_issues: Vec<String>,
    #[serde(default)]
    pub logic_issues: Vec<String>,
    #[serde(default)]
    pub suggestions: String,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    /// Decode the completion into an [`EditReport`].
    #[default]
    Structured,
    /// The raw completion is the polished text verbatim; no decoding.
    PlainText,
}

#[derive(Debug, Error)]
#[error("model output is not valid JSON: {source}")]
pub struct ParseError {
    raw_output: String,
    #[source]
    source: serde_json::Error,
}

impl ParseError {
    /// The undecodable completion, kept for display so the operator can
    /// inspect what the model actually said.
    pub fn raw_output(&self) -> &str {
        &self.raw_output
    }

    pub fn into_raw_output(self) -> String {
        self.raw_output
    }
}

/// Decodes a completion according to the mode the caller asked for.
pub fn interpret(raw_output: &str, mode: OutputMode) -> Result<Option<EditReport>, ParseError> {
    match mode {
        OutputMode::PlainText => Ok(None),
        OutputMode::Structured => serde_json::from_str(strip_code_fence(raw_output))
            .map(Some)
            .map_err(|source| ParseError {
                raw_output: raw_output.to_string(),
                source,
            }),
    }
}

/// Removes one wrapping fenced code block (``` or ```json style) if the text
/// carries both the opening and the closing marker; anything else is
/// returned trimmed but otherwise untouched. Some providers wrap JSON bodies
/// this way despite being told not to.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(line_end) = rest.find('\n') else {
        return trimmed;
    };
    match rest[line_end + 1..].trim_end().strip_suffix("```") {
        Some(body) => body.trim(),
        None => trimmed,
    }
}
