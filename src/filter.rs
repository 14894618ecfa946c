//! Filter pipeline: AND-composed predicates over a chunk.

use crate::types::{Chunk, ContentType, ContentTypeFilter, SearchFilter};

/// True if `chunk` satisfies every predicate set in `filter`.
pub fn matches(chunk: &Chunk, filter: &SearchFilter) -> bool {
    matches_content_type(chunk, filter.content_type)
        && matches_language(chunk, filter.language.as_deref())
        && matches_symbol_type(chunk, filter.symbol_type.as_deref())
        && matches_scopes(chunk, &filter.scopes)
}

fn matches_content_type(chunk: &Chunk, filter: ContentTypeFilter) -> bool {
    match filter {
        ContentTypeFilter::All => true,
        ContentTypeFilter::Code => chunk.content_type == ContentType::Code,
        ContentTypeFilter::Docs => {
            matches!(chunk.content_type, ContentType::Markdown | ContentType::Text)
        }
    }
}

fn matches_language(chunk: &Chunk, language: Option<&str>) -> bool {
    match language {
        None => true,
        Some(lang) => chunk.language.as_deref() == Some(lang),
    }
}

fn matches_symbol_type(chunk: &Chunk, symbol_type: Option<&str>) -> bool {
    match symbol_type {
        None => true,
        Some(want) => chunk.symbols.iter().any(|s| s.symbol_type == want),
    }
}

fn matches_scopes(chunk: &Chunk, scopes: &[String]) -> bool {
    if scopes.is_empty() {
        return true;
    }
    scopes.iter().any(|scope| {
        let normalized = format!("{}/", scope.trim_matches('/'));
        chunk.path.starts_with(&normalized)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Symbol;
    use std::collections::HashMap;

    fn chunk(path: &str, content_type: ContentType, language: Option<&str>) -> Chunk {
        Chunk {
            id: "1".to_string(),
            path: path.to_string(),
            content_type,
            language: language.map(|s| s.to_string()),
            start_line: 1,
            end_line: 10,
            content: String::new(),
            symbols: vec![Symbol {
                symbol_type: "function".to_string(),
                name: "Search".to_string(),
            }],
            metadata: HashMap::new(),
        }
    }

    #[test]
    fn empty_filter_matches_everything() {
        let c = chunk("src/x.go", ContentType::Code, Some("go"));
        assert!(matches(&c, &SearchFilter::default()));
    }

    #[test]
    fn content_type_code_excludes_markdown() {
        let mut filter = SearchFilter::default();
        filter.content_type = ContentTypeFilter::Code;
        let md = chunk("README.md", ContentType::Markdown, None);
        let code = chunk("main.go", ContentType::Code, Some("go"));
        assert!(!matches(&md, &filter));
        assert!(matches(&code, &filter));
    }

    #[test]
    fn content_type_docs_matches_markdown_and_text() {
        let mut filter = SearchFilter::default();
        filter.content_type = ContentTypeFilter::Docs;
        assert!(matches(&chunk("a.md", ContentType::Markdown, None), &filter));
        assert!(matches(&chunk("a.txt", ContentType::Text, None), &filter));
        assert!(!matches(&chunk("a.go", ContentType::Code, None), &filter));
    }

    #[test]
    fn language_filter_is_exact_match() {
        let mut filter = SearchFilter::default();
        filter.language = Some("rust".to_string());
        assert!(matches(
            &chunk("a.rs", ContentType::Code, Some("rust")),
            &filter
        ));
        assert!(!matches(
            &chunk("a.go", ContentType::Code, Some("go")),
            &filter
        ));
    }

    #[test]
    fn symbol_type_requires_at_least_one_match() {
        let mut filter = SearchFilter::default();
        filter.symbol_type = Some("struct".to_string());
        assert!(!matches(
            &chunk("a.go", ContentType::Code, Some("go")),
            &filter
        ));
    }

    #[test]
    fn scope_prefix_does_not_match_sibling_with_shared_prefix() {
        let mut filter = SearchFilter::default();
        filter.scopes = vec!["services/api".to_string()];
        let sibling = chunk("services/api-v2/handler.go", ContentType::Code, Some("go"));
        let nested = chunk("services/api/handler.go", ContentType::Code, Some("go"));
        assert!(!matches(&sibling, &filter));
        assert!(matches(&nested, &filter));
    }

    #[test]
    fn scope_is_or_composed_across_multiple_entries() {
        let mut filter = SearchFilter::default();
        filter.scopes = vec!["pkg/a".to_string(), "pkg/b".to_string()];
        assert!(matches(
            &chunk("pkg/b/file.go", ContentType::Code, Some("go")),
            &filter
        ));
    }

    #[test]
    fn filters_are_and_composed() {
        let mut filter = SearchFilter::default();
        filter.content_type = ContentTypeFilter::Code;
        filter.language = Some("go".to_string());
        filter.scopes = vec!["pkg".to_string()];
        let good = chunk("pkg/x.go", ContentType::Code, Some("go"));
        let wrong_lang = chunk("pkg/x.go", ContentType::Code, Some("rust"));
        assert!(matches(&good, &filter));
        assert!(!matches(&wrong_lang, &filter));
    }
}
