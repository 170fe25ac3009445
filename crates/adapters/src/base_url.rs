use once_cell::sync::Lazy;
use regex::Regex;

pub const GEMINI_DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const OPENAI_DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

static VERSION_SUFFIX_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"/v\d+$").unwrap());

/// Normalizes an OpenAI-compatible base URL: blank falls back to the default,
/// a trailing `#` means "use exactly as written", and a URL without a version
/// segment gets `/v1` appended.
pub fn normalize_openai_base_url(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return OPENAI_DEFAULT_BASE_URL.to_string();
    }

    if let Some(stripped) = trimmed.strip_suffix('#') {
        return stripped.to_string();
    }

    if VERSION_SUFFIX_RE.is_match(trimmed) || trimmed.contains("/v1") {
        trimmed.to_string()
    } else {
        format!("{}/v1", trimmed.trim_end_matches('/'))
    }
}

pub fn normalize_gemini_base_url(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        GEMINI_DEFAULT_BASE_URL.to_string()
    } else {
        trimmed.trim_end_matches('/').to_string()
    }
}
