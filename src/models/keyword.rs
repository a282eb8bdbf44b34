use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// A normalized topic phrase.
///
/// Normalization lowercases the input and collapses every run of whitespace
/// into a single space. Cache keys and lexical overlap are both computed on
/// the normalized form, so two spellings that differ only in case or spacing
/// share results.
///
/// # Examples
///
/// ```rust
/// use keyscout::models::keyword::Topic;
///
/// let topic = Topic::parse("  Email   MARKETING ").unwrap();
/// assert_eq!(topic.as_str(), "email marketing");
/// assert_eq!(topic.word_count(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Topic(String);

impl Topic {
    /// Returns `None` when the input has no letters or digits at all.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = normalize(raw);
        normalized
            .chars()
            .any(char::is_alphanumeric)
            .then(|| Self(normalized))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn word_count(&self) -> usize {
        self.0.split(' ').count()
    }

    #[must_use]
    pub fn words(&self) -> HashSet<&str> {
        self.0.split(' ').collect()
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[must_use]
pub fn normalize(raw: &str) -> String {
    raw.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Where a candidate's metrics came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Provider,
    Heuristic,
}

impl Source {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Provider => "provider",
            Self::Heuristic => "heuristic",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keyword metrics before scoring.
///
/// Both the provider adapter and the heuristic generator produce these;
/// the scorer turns them into [`KeywordCandidate`]s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordMetrics {
    pub phrase: String,

    pub search_volume: u64,

    pub difficulty: u8,

    /// Set only when the source supplied its own relevance figure.
    pub relevance: Option<u8>,

    pub related: Vec<String>,

    pub source: Source,
}

/// One ranked keyword suggestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordCandidate {
    pub phrase: String,

    pub search_volume: u64,

    /// 0-100, lower is easier to rank for.
    pub difficulty: u8,

    /// 0-100, higher is a closer match to the topic.
    pub relevance: u8,

    pub related: Vec<String>,

    pub source: Source,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_normalization() {
        let topic = Topic::parse("\tHealthy  Boundaries\n").unwrap();
        assert_eq!(topic.as_str(), "healthy boundaries");
        assert_eq!(topic.to_string(), "healthy boundaries");
    }

    #[test]
    fn test_blank_topic_is_rejected() {
        assert!(Topic::parse("").is_none());
        assert!(Topic::parse("   \t ").is_none());
        assert!(Topic::parse("?? !!").is_none());
    }

    #[test]
    fn test_topic_words() {
        let topic = Topic::parse("seo for seo people").unwrap();
        assert_eq!(topic.word_count(), 4);
        assert_eq!(topic.words().len(), 3);
    }

    #[test]
    fn test_source_serializes_lowercase() {
        let json = serde_json::to_string(&Source::Heuristic).unwrap();
        assert_eq!(json, "\"heuristic\"");
    }
}
