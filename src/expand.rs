//! Query expansion: enlarge a lexical query with code-aware synonyms.
//!
//! Used only for the lexical (BM25) side of a search; the dense side
//! always receives the original query, since dense embeddings already model
//! semantic similarity and expansion only adds noise there.

use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};

use crate::config::ExpanderConfig;

/// Static code-aware synonym dictionary. Not exhaustive, just a representative
/// slice of the kind of domain vocabulary a code search engine benefits
/// from expanding (function/method naming, CRUD verbs, common container and
/// concurrency terms, HTTP verbs, and test/error vocabulary).
static SYNONYMS: Lazy<HashMap<&'static str, &'static [&'static str]>> = Lazy::new(|| {
    let mut m: HashMap<&'static str, &'static [&'static str]> = HashMap::new();
    m.insert("function", &["func", "method", "fn", "def"]);
    m.insert("method", &["func", "function", "fn"]);
    m.insert("variable", &["var", "field", "attribute"]);
    m.insert("constant", &["const", "immutable"]);
    m.insert("class", &["struct", "type", "object"]);
    m.insert("struct", &["class", "record", "type"]);
    m.insert("interface", &["trait", "protocol", "abstract"]);
    m.insert("trait", &["interface", "protocol"]);
    m.insert("create", &["new", "init", "make", "build"]);
    m.insert("init", &["create", "new", "setup", "initialize"]);
    m.insert("initialize", &["init", "setup", "create"]);
    m.insert("delete", &["remove", "destroy", "drop"]);
    m.insert("remove", &["delete", "drop", "unset"]);
    m.insert("update", &["modify", "edit", "change", "set"]);
    m.insert("modify", &["update", "edit", "change"]);
    m.insert("get", &["fetch", "retrieve", "read", "load"]);
    m.insert("fetch", &["get", "retrieve", "download"]);
    m.insert("retrieve", &["get", "fetch", "load"]);
    m.insert("set", &["assign", "update", "write"]);
    m.insert("list", &["array", "slice", "vec", "collection"]);
    m.insert("array", &["list", "slice", "vec"]);
    m.insert("map", &["dict", "dictionary", "hashmap", "hash"]);
    m.insert("dict", &["map", "dictionary", "hashmap"]);
    m.insert("hashmap", &["map", "dict"]);
    m.insert("queue", &["buffer", "channel", "fifo"]);
    m.insert("stack", &["lifo"]);
    m.insert("error", &["err", "exception", "failure"]);
    m.insert("exception", &["error", "err", "panic"]);
    m.insert("panic", &["crash", "abort", "exception"]);
    m.insert("test", &["spec", "unittest", "assertion"]);
    m.insert("mock", &["stub", "fake", "double"]);
    m.insert("config", &["configuration", "settings", "options"]);
    m.insert("configuration", &["config", "settings"]);
    m.insert("connect", &["connection", "dial", "link"]);
    m.insert("connection", &["conn", "session", "link"]);
    m.insert("request", &["req", "call"]);
    m.insert("response", &["resp", "reply", "result"]);
    m.insert("authenticate", &["auth", "login", "signin"]);
    m.insert("authorize", &["authz", "permission"]);
    m.insert("validate", &["verify", "check", "sanitize"]);
    m.insert("verify", &["validate", "check", "confirm"]);
    m.insert("parse", &["decode", "deserialize", "tokenize"]);
    m.insert("serialize", &["encode", "marshal"]);
    m.insert("deserialize", &["decode", "unmarshal", "parse"]);
    m.insert("encode", &["serialize", "marshal"]);
    m.insert("decode", &["deserialize", "unmarshal", "parse"]);
    m.insert("thread", &["goroutine", "task", "worker"]);
    m.insert("goroutine", &["thread", "task", "coroutine"]);
    m.insert("async", &["asynchronous", "concurrent", "await"]);
    m.insert("concurrent", &["parallel", "async"]);
    m.insert("parallel", &["concurrent", "simultaneous"]);
    m.insert("lock", &["mutex", "semaphore", "guard"]);
    m.insert("mutex", &["lock", "guard"]);
    m.insert("channel", &["chan", "queue", "pipe"]);
    m.insert("server", &["service", "daemon", "backend"]);
    m.insert("client", &["consumer", "caller"]);
    m.insert("handler", &["callback", "listener"]);
    m.insert("callback", &["handler", "hook"]);
    m.insert("router", &["mux", "dispatcher"]);
    m.insert("middleware", &["interceptor", "filter"]);
    m.insert("database", &["db", "datastore", "storage"]);
    m.insert("db", &["database", "datastore"]);
    m.insert("cache", &["memo", "buffer"]);
    m.insert("index", &["idx", "indexer"]);
    m.insert("search", &["query", "find", "lookup"]);
    m.insert("query", &["search", "lookup", "find"]);
    m.insert("find", &["search", "lookup", "locate"]);
    m.insert("embedding", &["vector", "encoding"]);
    m.insert("vector", &["embedding", "array"]);
    m.insert("rank", &["score", "order", "sort"]);
    m.insert("score", &["rank", "weight"]);
    m.insert("sort", &["order", "rank"]);
    m.insert("filter", &["predicate", "select"]);
    m.insert("iterate", &["loop", "iterator", "traverse"]);
    m.insert("loop", &["iterate", "for"]);
    m.insert("recursive", &["recursion", "self-call"]);
    m.insert("build", &["compile", "construct", "make"]);
    m.insert("compile", &["build"]);
    m.insert("deploy", &["release", "publish", "ship"]);
    m.insert("log", &["logging", "trace", "record"]);
    m.insert("logging", &["log", "trace"]);
    m.insert("metric", &["metrics", "measurement", "telemetry"]);
    m.insert("http", &["rest", "web", "api"]);
    m.insert("api", &["endpoint", "interface"]);
    m.insert("endpoint", &["route", "api", "handler"]);
    m
});

/// Code-aware query expander. Stateless: all synonym data lives in the
/// static dictionary.
#[derive(Debug, Clone, Default)]
pub struct QueryExpander {
    pub max_expansions: usize,
    pub include_casing_variants: bool,
}

impl QueryExpander {
    pub fn new(config: &ExpanderConfig) -> Self {
        Self {
            max_expansions: config.max_expansions,
            include_casing_variants: config.include_casing_variants,
        }
    }

    /// Expand `query` with synonyms and casing variants, returning a single
    /// space-joined string whose token set is a superset of `query`'s
    /// (case-insensitively).
    pub fn expand(&self, query: &str) -> String {
        let original_tokens = tokenize(query);

        let mut seen: HashSet<String> = HashSet::new();
        let mut out: Vec<String> = Vec::new();

        for token in &original_tokens {
            let lower = token.to_lowercase();
            if seen.insert(lower) {
                out.push(token.clone());
            }
        }

        for token in &original_tokens {
            let lower = token.to_lowercase();
            if let Some(synonyms) = SYNONYMS.get(lower.as_str()) {
                let mut added = 0usize;
                for syn in synonyms.iter() {
                    if added >= self.max_expansions {
                        break;
                    }
                    let syn_lower = syn.to_lowercase();
                    if seen.insert(syn_lower) {
                        out.push(syn.to_string());
                        added += 1;
                    }
                }
            }
        }

        if self.include_casing_variants {
            for token in &original_tokens {
                for variant in casing_variants(token) {
                    let variant_lower = variant.to_lowercase();
                    if seen.insert(variant_lower) {
                        out.push(variant);
                    }
                }
            }
        }

        out.join(" ")
    }
}

/// Split on non-alphanumerics, then split each piece on camelCase and
/// snake_case boundaries.
fn tokenize(query: &str) -> Vec<String> {
    query
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .flat_map(split_identifier_boundaries)
        .filter(|s| !s.is_empty())
        .collect()
}

fn split_identifier_boundaries(token: &str) -> Vec<String> {
    if token.contains('_') {
        return token
            .split('_')
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .collect();
    }

    let chars: Vec<char> = token.chars().collect();
    let mut parts = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if i > 0 && c.is_uppercase() && chars[i - 1].is_lowercase() {
            parts.push(std::mem::take(&mut current));
        }
        current.push(c);
    }
    if !current.is_empty() {
        parts.push(current);
    }
    parts
}

fn casing_variants(token: &str) -> Vec<String> {
    let mut variants = vec![token.to_lowercase()];
    let mut chars = token.chars();
    if let Some(first) = chars.next() {
        let title = first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase();
        variants.push(title);
    }
    if token.chars().count() <= 4 {
        variants.push(token.to_uppercase());
    }
    variants
}
