pub mod segment;
pub mod wikipedia;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("no topic given")]
    EmptyTopic,

    #[error("topic not found")]
    NotFound,

    #[error("article has no readable content")]
    EmptyContent,

    #[error("connection error: {0}")]
    Connection(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        Self::Connection(e.to_string())
    }
}

/// Resolves a topic into ordered, trimmed, non-empty prose fragments.
///
/// A successful result is never empty; implementations report
/// [`SourceError::EmptyContent`] instead.
#[async_trait]
pub trait TextSource: Send + Sync {
    async fn fetch(&self, topic: &str) -> Result<Vec<String>, SourceError>;
}

/// Typed-in text is narrated as a single fragment.
pub fn manual_sequence(text: &str) -> Result<Vec<String>, SourceError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(SourceError::EmptyContent);
    }
    Ok(vec![text.to_string()])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_text_is_one_trimmed_fragment() {
        assert_eq!(
            manual_sequence("  Ala ma kota. Kot ma Alę.\n").unwrap(),
            vec!["Ala ma kota. Kot ma Alę.".to_string()]
        );
    }

    #[test]
    fn blank_manual_text_is_empty_content() {
        assert_eq!(manual_sequence(" \t\n"), Err(SourceError::EmptyContent));
    }
}
