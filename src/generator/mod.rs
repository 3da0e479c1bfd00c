//! generator
//!
//! Turns a unified diff into a changelog entry.
//!
//! # Modules
//!
//! - [`chat`] - OpenAI-compatible chat-completions client (Groq by default)
//! - [`mock`] - Fixed-reply generator for tests
//!
//! # Contract
//!
//! [`EntryGenerator::generate`] returns bullet lines ready for
//! `core::changelog::insert_entry`. Model replies are normalized by
//! [`extract_entry`]: code fences and `#` headings are dropped (the model is
//! asked for a dated heading, but the mutator owns headings) and surrounding
//! blank lines are trimmed. A reply without a single bullet is rejected as
//! [`GenerationError::MalformedResponse`].

pub mod chat;
pub mod mock;

pub use chat::ChatCompletionsGenerator;
pub use mock::StaticGenerator;

use async_trait::async_trait;
use thiserror::Error;

/// Errors from entry generation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GenerationError {
    /// The service could not be reached, timed out, or returned an error status.
    #[error("entry generator unavailable: {0}")]
    Unavailable(String),

    /// The service answered with something that is not a changelog entry.
    #[error("malformed generator response: {0}")]
    MalformedResponse(String),
}

/// Something that can summarize a diff as changelog bullets.
#[async_trait]
pub trait EntryGenerator: Send + Sync {
    async fn generate(&self, diff: &str) -> Result<String, GenerationError>;
}

const TRUNCATION_MARKER: &str = "\n[diff truncated]\n";

/// Cut `diff` to at most `max_chars` characters, marking the cut.
pub fn truncate_diff(diff: &str, max_chars: usize) -> std::borrow::Cow<'_, str> {
    match diff.char_indices().nth(max_chars) {
        Some((byte_index, _)) => format!("{}{TRUNCATION_MARKER}", &diff[..byte_index]).into(),
        None => diff.into(),
    }
}

/// Normalize a model reply into entry lines.
pub fn extract_entry(reply: &str) -> Result<String, GenerationError> {
    let lines: Vec<&str> = reply
        .lines()
        .filter(|line| {
            let trimmed = line.trim_start();
            !(trimmed.starts_with("```") || trimmed.starts_with('#'))
        })
        .collect();

    let is_bullet = |line: &&str| {
        let trimmed = line.trim_start();
        trimmed.starts_with("- ") || trimmed.starts_with("* ")
    };
    if !lines.iter().any(is_bullet) {
        let preview: String = reply.chars().take(120).collect();
        return Err(GenerationError::MalformedResponse(format!(
            "no bullet lines in reply: {preview:?}"
        )));
    }

    let start = lines.iter().position(|l| !l.trim().is_empty()).unwrap_or(0);
    let end = lines
        .iter()
        .rposition(|l| !l.trim().is_empty())
        .map_or(start, |i| i + 1);
    Ok(lines[start..end].join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    mod extract {
        use super::*;

        #[test]
        fn strips_fence_and_dated_heading() {
            let reply = "```\n## 2024-06-01\n- **src/lib.rs**: add parser\n- **README.md**: docs\n```";
            assert_eq!(
                extract_entry(reply).unwrap(),
                "- **src/lib.rs**: add parser\n- **README.md**: docs"
            );
        }

        #[test]
        fn keeps_nested_bullets_and_inner_blanks() {
            let reply = "\n\n- top\n  - nested\n\n* other\n\n";
            assert_eq!(extract_entry(reply).unwrap(), "- top\n  - nested\n\n* other");
        }

        #[test]
        fn prose_only_is_malformed() {
            let err = extract_entry("Sorry, I cannot help with that.").unwrap_err();
            assert!(matches!(err, GenerationError::MalformedResponse(_)));
        }

        #[test]
        fn empty_is_malformed() {
            assert!(extract_entry("").is_err());
            assert!(extract_entry("```\n```").is_err());
        }
    }

    mod truncate {
        use super::*;

        #[test]
        fn short_diff_is_borrowed() {
            assert!(matches!(truncate_diff("abc", 10), std::borrow::Cow::Borrowed("abc")));
        }

        #[test]
        fn long_diff_is_cut_on_char_boundary() {
            let diff = "ééééé";
            let out = truncate_diff(diff, 2);
            assert!(out.starts_with("éé\n"));
            assert!(out.contains("[diff truncated]"));
        }
    }
}
