//! Deterministic regex-rule classifier.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use super::QueryClassifier;
use crate::types::{QueryType, Weights};

static ERROR_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(ERR_[A-Z0-9_]+|E\d{4}|[A-Za-z]+\d{3,})$").unwrap());

static EXCEPTION_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)Exception$").unwrap());

static QUOTED_PHRASE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"^".*"$|^'.*'$"#).unwrap());

static FILE_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)[\w./-]+\.(go|rs|py|js|ts|tsx|jsx|java|c|cpp|h|hpp|rb|md|json|yaml|yml|toml)$")
        .unwrap()
});

static CAMEL_OR_PASCAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][a-z0-9]*([A-Z][a-z0-9]*)+$").unwrap());

static SNAKE_CASE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z0-9]+(_[a-z0-9]+)+$").unwrap());

static SCREAMING_SNAKE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z0-9]+(_[A-Z0-9]+)+$").unwrap());

const INTERROGATIVE_OR_COMMAND: &[&str] = &[
    "how", "what", "where", "why", "when", "which", "can", "does", "is", "are", "should",
    "explain", "describe", "show", "find", "list",
];

/// Deterministic, dependency-free classifier. Always the fallback path for
/// [`HybridClassifier`](super::HybridClassifier).
#[derive(Debug, Default, Clone, Copy)]
pub struct PatternClassifier;

impl PatternClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn classify_sync(&self, query: &str) -> QueryType {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return QueryType::Mixed;
        }

        if is_lexical(trimmed) {
            return QueryType::Lexical;
        }

        let first_word = trimmed
            .split_whitespace()
            .next()
            .unwrap_or("")
            .trim_matches(|c: char| !c.is_alphanumeric())
            .to_lowercase();

        if INTERROGATIVE_OR_COMMAND.contains(&first_word.as_str()) {
            return QueryType::Semantic;
        }

        let word_count = trimmed.split_whitespace().count();
        if word_count >= 3 {
            QueryType::Semantic
        } else {
            QueryType::Mixed
        }
    }
}

fn is_lexical(query: &str) -> bool {
    if ERROR_CODE.is_match(query) || EXCEPTION_SUFFIX.is_match(query) {
        return true;
    }
    if QUOTED_PHRASE.is_match(query) {
        return true;
    }
    if FILE_PATH.is_match(query) {
        return true;
    }

    let is_single_token = !query.contains(char::is_whitespace);
    if is_single_token
        && (CAMEL_OR_PASCAL.is_match(query)
            || SNAKE_CASE.is_match(query)
            || SCREAMING_SNAKE.is_match(query))
    {
        return true;
    }

    false
}

#[async_trait]
impl QueryClassifier for PatternClassifier {
    async fn classify(&self, query: &str) -> (QueryType, Weights) {
        let query_type = self.classify_sync(query);
        (query_type, query_type.canonical_weights())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(q: &str) -> QueryType {
        PatternClassifier::new().classify_sync(q)
    }

    #[test]
    fn error_code_forms_are_lexical() {
        assert_eq!(classify("ERR_NOT_FOUND"), QueryType::Lexical);
        assert_eq!(classify("E0382"), QueryType::Lexical);
        assert_eq!(classify("WORD404"), QueryType::Lexical);
        assert_eq!(classify("NullPointerException"), QueryType::Lexical);
    }

    #[test]
    fn quoted_phrase_is_lexical() {
        assert_eq!(classify("\"exact phrase here\""), QueryType::Lexical);
    }

    #[test]
    fn file_path_is_lexical() {
        assert_eq!(classify("src/search/engine.go"), QueryType::Lexical);
    }

    #[test]
    fn single_token_identifier_casing_is_lexical() {
        assert_eq!(classify("parseQueryString"), QueryType::Lexical);
        assert_eq!(classify("ParseQueryString"), QueryType::Lexical);
        assert_eq!(classify("parse_query_string"), QueryType::Lexical);
        assert_eq!(classify("MAX_RETRY_COUNT"), QueryType::Lexical);
    }

    #[test]
    fn multi_word_identifier_like_phrase_is_not_lexical_by_casing_rule() {
        // camelCase rule only applies to a single token.
        assert_ne!(classify("parseQueryString please"), QueryType::Lexical);
    }

    #[test]
    fn interrogative_queries_are_semantic() {
        assert_eq!(classify("how does caching work"), QueryType::Semantic);
        assert_eq!(classify("explain the retry logic"), QueryType::Semantic);
    }

    #[test]
    fn long_queries_without_interrogative_are_semantic() {
        assert_eq!(classify("database connection pool settings"), QueryType::Semantic);
    }

    #[test]
    fn short_non_interrogative_queries_are_mixed() {
        assert_eq!(classify("connection pool"), QueryType::Mixed);
    }

    #[test]
    fn empty_query_is_mixed() {
        assert_eq!(classify(""), QueryType::Mixed);
        assert_eq!(classify("   "), QueryType::Mixed);
    }
}
