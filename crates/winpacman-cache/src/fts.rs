//! FTS5 query sanitization (spec §4.4 "FTS query sanitization").
//!
//! FTS5's default query grammar treats `.`, `-`, `/`, `:` and most other
//! punctuation as syntax, so a raw user query containing them (`"c++"`,
//! `"3.12"`) would otherwise be rejected by `MATCH`. Tokens are quoted to
//! pass them through as phrases instead.

/// Tokenize on whitespace; any token containing a non-alphanumeric
/// character is wrapped in double quotes (with embedded quotes escaped
/// by doubling, FTS5's own escaping convention). A token made up
/// entirely of punctuation carries no searchable content and is
/// dropped. Returns `None` if nothing searchable remains, so the caller
/// can short-circuit to an empty result instead of issuing an empty
/// `MATCH` (spec: "empty result after sanitization ⇒ return empty, do
/// not error").
pub fn sanitize(raw: &str) -> Option<String> {
    let mut tokens = Vec::new();

    for token in raw.split_whitespace() {
        if token.chars().all(|c| c.is_alphanumeric()) {
            tokens.push(token.to_string());
        } else if token.chars().any(|c| c.is_alphanumeric()) {
            tokens.push(format!("\"{}\"", token.replace('"', "\"\"")));
        }
        // Pure punctuation (e.g. "." or "++") carries nothing to search
        // on, so it is dropped rather than quoted.
    }

    if tokens.is_empty() {
        None
    } else {
        Some(tokens.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_alphanumeric_tokens_pass_through() {
        assert_eq!(sanitize("visual studio code").as_deref(), Some("visual studio code"));
    }

    #[test]
    fn tokens_with_punctuation_are_quoted() {
        assert_eq!(sanitize("c++").as_deref(), Some("\"c++\""));
    }

    #[test]
    fn mixed_query_quotes_only_the_punctuated_token() {
        assert_eq!(sanitize("python 3.12").as_deref(), Some("python \"3.12\""));
    }

    #[test]
    fn pure_punctuation_query_sanitizes_to_nothing() {
        assert_eq!(sanitize("."), None);
        assert_eq!(sanitize("..."), None);
    }

    #[test]
    fn repeated_whitespace_collapses_like_split_whitespace() {
        assert_eq!(sanitize("visual  studio   code").as_deref(), Some("visual studio code"));
    }
}
