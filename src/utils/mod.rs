//! Utility functions and helpers.

pub mod http;

use std::sync::LazyLock;

use regex::Regex;

static FIRST_INTEGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("valid integer pattern"));

static NON_ALNUM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("valid slug pattern"));

/// Extract the first run of ASCII digits in `text` as a number.
///
/// Runs too large for `u32` saturate rather than being skipped.
pub fn first_integer(text: &str) -> Option<u32> {
    FIRST_INTEGER
        .find(text)
        .map(|m| m.as_str().parse().unwrap_or(u32::MAX))
}

/// Lowercase `text` and collapse every non-alphanumeric run into a single `-`.
pub fn slugify(text: &str) -> String {
    NON_ALNUM
        .replace_all(&text.to_lowercase(), "-")
        .trim_matches('-')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_integer() {
        assert_eq!(first_integer("5-7 years"), Some(5));
        assert_eq!(first_integer("at least 12+"), Some(12));
        assert_eq!(first_integer("10+ years"), Some(10));
        assert_eq!(first_integer("senior"), None);
        assert_eq!(first_integer(""), None);
    }

    #[test]
    fn test_first_integer_saturates() {
        assert_eq!(first_integer("99999999999 years"), Some(u32::MAX));
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Tech Mahindra"), "tech-mahindra");
        assert_eq!(slugify("  UI/UX Designer!"), "ui-ux-designer");
    }
}
