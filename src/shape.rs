//! Score shapers: multiplicative, order-free path-based adjustments
//! applied after reranking and enrichment, followed by a re-sort.

/// Multiply `score` by every applicable shaper's factor for `path`.
pub fn shape_score(path: &str, score: f64) -> f64 {
    let mut shaped = score;
    if is_test_file(path) {
        shaped *= 0.5;
    }
    if is_internal_path(path) {
        shaped *= 1.3;
    }
    if is_wrapper_path(path) {
        shaped *= 0.6;
    }
    shaped
}

fn is_test_file(path: &str) -> bool {
    if path.ends_with("_test.go") {
        return true;
    }
    if path.contains(".test.") || path.contains(".spec.") {
        return true;
    }
    if let Some(filename) = path.rsplit('/').next() {
        if filename.starts_with("test_") && filename.ends_with(".py") {
            return true;
        }
        if filename.ends_with("_test.py") {
            return true;
        }
    }
    for segment in ["test/", "tests/", "__tests__/"] {
        if path.starts_with(segment) || path.contains(&format!("/{segment}")) {
            return true;
        }
    }
    false
}

fn is_internal_path(path: &str) -> bool {
    path.starts_with("internal/") || path.contains("/internal/")
}

fn is_wrapper_path(path: &str) -> bool {
    path.starts_with("cmd/") || path.contains("/cmd/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn go_test_suffix_is_penalized() {
        assert_eq!(shape_score("pkg/search_test.go", 1.0), 0.5);
    }

    #[test]
    fn js_test_infix_is_penalized() {
        assert_eq!(shape_score("src/foo.test.ts", 1.0), 0.5);
    }

    #[test]
    fn python_test_prefix_and_suffix_are_penalized() {
        assert_eq!(shape_score("pkg/test_foo.py", 1.0), 0.5);
        assert_eq!(shape_score("pkg/foo_test.py", 1.0), 0.5);
    }

    #[test]
    fn tests_directory_segment_is_penalized() {
        assert_eq!(shape_score("__tests__/foo.ts", 1.0), 0.5);
        assert_eq!(shape_score("pkg/tests/foo.go", 1.0), 0.5);
    }

    #[test]
    fn internal_path_is_boosted() {
        assert_eq!(shape_score("internal/search/engine.go", 1.0), 1.3);
        assert_eq!(shape_score("pkg/internal/cache.go", 1.0), 1.3);
    }

    #[test]
    fn cmd_path_is_penalized() {
        assert_eq!(shape_score("cmd/server/main.go", 1.0), 0.6);
        assert_eq!(shape_score("tools/cmd/migrate/main.go", 1.0), 0.6);
    }

    #[test]
    fn ordinary_path_is_unshaped() {
        assert_eq!(shape_score("pkg/search/engine.go", 1.0), 1.0);
    }

    #[test]
    fn shapers_compose_multiplicatively() {
        // A file under both a tests/ segment and internal/ would be
        // unusual, but the shapers are independent and must still combine.
        let shaped = shape_score("internal/tests/helper_test.go", 1.0);
        assert!((shaped - (0.5 * 1.3)).abs() < 1e-9);
    }
}
