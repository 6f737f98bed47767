//! Normalization of text before it reaches an engine

use regex::Regex;
use std::sync::OnceLock;

fn timestamp() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[\d{2}:\d{2}:\d{2}\]").ok())
        .as_ref()
}

/// Strip log timestamps and the `OPC UA:` prefix, collapse whitespace.
pub fn clean_text(text: &str) -> String {
    let text = match timestamp() {
        Some(re) => re.replace_all(text, ""),
        None => text.into(),
    };
    text.replace("OPC UA:", "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_timestamps_and_prefix() {
        assert_eq!(
            clean_text("[12:01:59] OPC UA:  Connected   to robot"),
            "Connected to robot"
        );
    }

    #[test]
    fn test_blank_text_cleans_to_empty() {
        assert_eq!(clean_text(""), "");
        assert_eq!(clean_text("   \t\n"), "");
        assert_eq!(clean_text("[00:00:00]"), "");
    }

    #[test]
    fn test_plain_text_untouched() {
        assert_eq!(clean_text("Moving to pickup"), "Moving to pickup");
    }
}
