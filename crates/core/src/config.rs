use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

pub const TEMPERATURE_MIN: f32 = 0.0;
pub const TEMPERATURE_MAX: f32 = 1.2;

pub const DEFAULT_TEMPERATURE: f32 = 0.5;
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 8192;

/// Environment fallback consulted when no key is supplied by the caller.
pub const API_KEY_ENV: &str = "GOOGLE_API_KEY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(
        "no API key available; enter a Gemini API key or set the GOOGLE_API_KEY environment variable"
    )]
    MissingApiKey,
}

/// Resolves the provider credential before any dispatch is attempted.
///
/// A non-blank key supplied by the presentation layer wins; otherwise the
/// `GOOGLE_API_KEY` environment variable is consulted. Absence is a
/// precondition failure, not a dispatch error.
pub fn resolve_api_key(explicit: Option<&str>) -> Result<String, ConfigError> {
    resolve_api_key_from(explicit, env::var(API_KEY_ENV).ok())
}

fn resolve_api_key_from(
    explicit: Option<&str>,
    fallback: Option<String>,
) -> Result<String, ConfigError> {
    if let Some(key) = explicit {
        let trimmed = key.trim();
        if !trimmed.is_empty() {
            return Ok(trimmed.to_string());
        }
    }

    match fallback {
        Some(key) if !key.trim().is_empty() => Ok(key.trim().to_string()),
        _ => Err(ConfigError::MissingApiKey),
    }
}

/// Clamps a user-chosen temperature into the supported range.
pub fn clamp_temperature(value: f32) -> f32 {
    if !value.is_finite() {
        return DEFAULT_TEMPERATURE;
    }
    value.clamp(TEMPERATURE_MIN, TEMPERATURE_MAX)
}

/// Preference tier mapped to an ordered candidate model list, first choice
/// first. The dispatcher walks the list until one model answers.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelTier {
    #[default]
    Light,
    Heavy,
}

impl ModelTier {
    pub fn candidates(&self) -> Vec<String> {
        let names: &[&str] = match self {
            Self::Light => &["gemini-1.5-flash", "gemini-pro", "text-bison-001"],
            Self::Heavy => &["gemini-1.5-pro", "gemini-pro", "text-bison-001"],
        };
        names.iter().map(|name| (*name).to_string()).collect()
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Light => "轻量档",
            Self::Heavy => "强力档",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StyleProfile {
    #[default]
    KeepOriginal,
    Commercial,
    Literary,
    WebSerial,
}

impl StyleProfile {
    pub fn label(&self) -> &'static str {
        match self {
            Self::KeepOriginal => "保持原文风格为主",
            Self::Commercial => "偏商业流行风（适合杂志/实体出版）",
            Self::Literary => "文学性偏强（语言更讲究）",
            Self::WebSerial => "网文爽文风（节奏快、爽感强）",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetUse {
    #[default]
    MagazineSubmission,
    WebPlatform,
    Contest,
    Personal,
}

impl TargetUse {
    pub fn label(&self) -> &'static str {
        match self {
            Self::MagazineSubmission => "杂志/出版社投稿",
            Self::WebPlatform => "网文平台连载",
            Self::Contest => "征文比赛",
            Self::Personal => "个人练笔/自用",
        }
    }
}

/// Feature flags and style selectors for one edit pass.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct EditOptions {
    #[serde(default = "default_enabled")]
    pub humanize: bool,
    #[serde(default = "default_enabled")]
    pub logic_check: bool,
    #[serde(default)]
    pub style: StyleProfile,
    #[serde(default)]
    pub target_use: TargetUse,
}

fn default_enabled() -> bool {
    true
}

impl Default for EditOptions {
    fn default() -> Self {
        Self {
            humanize: true,
            logic_check: true,
            style: StyleProfile::default(),
            target_use: TargetUse::default(),
        }
    }
}
