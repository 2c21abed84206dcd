//! Small text helpers shared by the stores and the assistant.

/// Collapses all whitespace runs to single spaces and trims the ends.
/// Applied to titles, summaries, and model-supplied suggestion text before
/// anything is stored.
pub fn sanitize_text(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncates to at most `max` characters, never splitting a code point.
pub fn truncate_chars(value: &str, max: usize) -> &str {
    match value.char_indices().nth(max) {
        Some((idx, _)) => &value[..idx],
        None => value,
    }
}

/// Builds the alternative offered on a name collision: `_2` inserted before
/// the last-dot extension, or appended when there is none.
pub fn build_suggested_name(name: &str) -> String {
    match name.rfind('.') {
        Some(dot) => format!("{}_2{}", &name[..dot], &name[dot..]),
        None => format!("{name}_2"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_collapses_inner_whitespace() {
        assert_eq!(sanitize_text("  a\tb\n\n c  "), "a b c");
        assert_eq!(sanitize_text(""), "");
        assert_eq!(sanitize_text("   "), "");
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("short", 100), "short");
        assert_eq!(truncate_chars("", 4), "");
    }

    #[test]
    fn test_suggested_name_inserts_before_extension() {
        assert_eq!(build_suggested_name("proposal.pdf"), "proposal_2.pdf");
        assert_eq!(build_suggested_name("a.tar.gz"), "a.tar_2.gz");
    }

    #[test]
    fn test_suggested_name_without_extension_appends() {
        assert_eq!(build_suggested_name("Alpha"), "Alpha_2");
    }
}
