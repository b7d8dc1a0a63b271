//! Daily prompt text-generation collaborator.

use std::future::Future;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Used whenever the generator is missing, failing, or returns nothing usable.
pub const FALLBACK_PROMPT: &str = "What is something small that made you smile today?";

/// Longest prompt accepted from a generator, in characters.
pub const MAX_PROMPT_CHARS: usize = 200;

/// Label stored for prompts that came from [`FALLBACK_PROMPT`].
pub const FALLBACK_SOURCE: &str = "fallback";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyPrompt {
    pub date: NaiveDate,
    pub text: String,
    pub generated_by: String,
}

impl DailyPrompt {
    pub fn fallback(date: NaiveDate) -> Self {
        Self {
            date,
            text: FALLBACK_PROMPT.to_string(),
            generated_by: FALLBACK_SOURCE.to_string(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.generated_by == FALLBACK_SOURCE
    }
}

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("prompt generator is not configured")]
    NotConfigured,
    #[error("prompt generator request failed: {0}")]
    Request(String),
    #[error("prompt generator returned no usable text")]
    Empty,
}

/// External text generator producing one short conversation prompt.
pub trait PromptGenerator: Send + Sync {
    /// Label persisted alongside generated prompts (e.g. the model name).
    fn name(&self) -> &str;

    fn generate(&self) -> impl Future<Output = Result<String, PromptError>> + Send;
}

/// Generator that is never configured; every call takes the fallback path.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGenerator;

impl PromptGenerator for NoGenerator {
    fn name(&self) -> &str {
        "none"
    }

    async fn generate(&self) -> Result<String, PromptError> {
        Err(PromptError::NotConfigured)
    }
}

/// Normalize raw generator output into a single-line prompt.
///
/// Strips surrounding whitespace and quotes, collapses internal
/// whitespace, and rejects empty or overlong text.
pub fn clean_prompt(raw: &str) -> Option<String> {
    let trimmed = raw
        .trim()
        .trim_matches(|c| matches!(c, '"' | '\'' | '“' | '”'))
        .trim();
    let collapsed = trimmed.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() || collapsed.chars().count() > MAX_PROMPT_CHARS {
        return None;
    }
    Some(collapsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_prompt_strips_quotes_and_whitespace() {
        assert_eq!(
            clean_prompt("  \"Show us your desk\"\n").as_deref(),
            Some("Show us your desk")
        );
        assert_eq!(
            clean_prompt("What did\n you   eat?").as_deref(),
            Some("What did you eat?")
        );
    }

    #[test]
    fn clean_prompt_rejects_empty_and_overlong() {
        assert_eq!(clean_prompt("   "), None);
        assert_eq!(clean_prompt("\"\""), None);
        assert_eq!(clean_prompt(&"x".repeat(MAX_PROMPT_CHARS + 1)), None);
        assert!(clean_prompt(&"x".repeat(MAX_PROMPT_CHARS)).is_some());
    }

    #[test]
    fn fallback_is_clean() {
        assert_eq!(clean_prompt(FALLBACK_PROMPT).as_deref(), Some(FALLBACK_PROMPT));
    }
}
