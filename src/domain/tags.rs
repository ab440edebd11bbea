//! Canonical tag sets parsed from free-text, comma separated input.

use std::collections::BTreeSet;

use super::slug::slug_fragment;

/// Normalize comma separated tag input into a set of slug-form tags.
///
/// Pieces that slugify to nothing are dropped and duplicates collapse, so
/// `"Foo, foo , BAR"` becomes `{"bar", "foo"}`.
pub fn normalize_tags(raw: &str) -> BTreeSet<String> {
    raw.split(',')
        .map(slug_fragment)
        .filter(|tag| !tag.is_empty())
        .collect()
}

/// Render a tag set back into the comma separated form the editor accepts.
pub fn tags_as_text(tags: &BTreeSet<String>) -> String {
    tags.iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Whether `value` can appear as a path segment in `/t/<tag>`, `/e/<slug>`
/// and `/edit/<key>` routes.
pub fn is_route_token(value: &str) -> bool {
    !value.is_empty()
        && value
            .bytes()
            .all(|byte| byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn normalizes_case_whitespace_and_duplicates() {
        assert_eq!(normalize_tags("Foo, foo , BAR"), set(&["foo", "bar"]));
        assert_eq!(normalize_tags("A, a, B"), set(&["a", "b"]));
    }

    #[test]
    fn punctuation_becomes_hyphens_and_empty_pieces_drop() {
        assert_eq!(
            normalize_tags("Rust Lang, , !!!, web/dev,"),
            set(&["rust-lang", "web-dev"])
        );
        assert!(normalize_tags("").is_empty());
    }

    #[test]
    fn normalizing_rendered_text_is_idempotent() {
        let samples = [
            "Foo, foo , BAR",
            "Machine Learning, machine-learning, AI",
            "  ,  spaces  everywhere ,",
            "C++, C#, c",
        ];

        for sample in samples {
            let once = normalize_tags(sample);
            let twice = normalize_tags(&tags_as_text(&once));
            assert_eq!(once, twice, "sample `{sample}`");
        }
    }

    #[test]
    fn route_tokens_allow_word_characters_and_hyphens() {
        assert!(is_route_token("hello-world_2"));
        assert!(!is_route_token(""));
        assert!(!is_route_token("hello world"));
        assert!(!is_route_token("a.b"));
    }

    #[test]
    fn route_tokens_reject_non_ascii_letters() {
        assert!(!is_route_token("café"));
        assert!(!is_route_token("基线"));
        assert!(is_route_token(&crate::domain::slug::slug_fragment("café")));
    }
}
