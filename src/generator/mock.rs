//! generator::mock
//!
//! Deterministic generator for tests: returns a fixed entry, or a configured
//! error, and records the diffs it was given.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{EntryGenerator, GenerationError};

/// Generator returning a fixed reply; clones share state.
#[derive(Debug, Clone)]
pub struct StaticGenerator {
    reply: Result<String, GenerationError>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl StaticGenerator {
    /// Always answer with `entry`.
    pub fn new(entry: impl Into<String>) -> Self {
        Self {
            reply: Ok(entry.into()),
            calls: Arc::default(),
        }
    }

    /// Always fail with `error`.
    pub fn failing(error: GenerationError) -> Self {
        Self {
            reply: Err(error),
            calls: Arc::default(),
        }
    }

    /// Diffs received so far.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl EntryGenerator for StaticGenerator {
    async fn generate(&self, diff: &str) -> Result<String, GenerationError> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(diff.to_string());
        self.reply.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_calls() {
        let g = StaticGenerator::new("- x");
        assert_eq!(g.generate("diff a").await.unwrap(), "- x");
        assert_eq!(g.calls(), vec!["diff a".to_string()]);
    }

    #[tokio::test]
    async fn failing_returns_error() {
        let g = StaticGenerator::failing(GenerationError::Unavailable("down".into()));
        assert!(matches!(g.generate("d").await, Err(GenerationError::Unavailable(_))));
    }
}
