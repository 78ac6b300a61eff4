use lazy_static::lazy_static;
use regex::Regex;

use crate::shared::constants::MAX_SLUG_LENGTH;

lazy_static! {
    /// Regex for validating slug fields
    /// Must be lowercase alphanumeric with single hyphens between segments
    /// - Valid: "santexnika", "elektr-montaj", "remont-2"
    /// - Invalid: "-remont", "remont-", "remont--uy", "Remont", "remont_uy"
    pub static ref SLUG_REGEX: Regex = Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").unwrap();
}

/// Derive a URL slug from a display name.
///
/// Lowercases, drops everything except ASCII letters, digits, whitespace and
/// hyphens, turns whitespace runs into a single hyphen and truncates to
/// [`MAX_SLUG_LENGTH`]. Returns `None` when nothing usable remains.
pub fn slugify(name: &str) -> Option<String> {
    let lowered = name.to_lowercase();
    let mut slug = String::with_capacity(lowered.len());
    let mut pending_hyphen = false;

    for ch in lowered.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(ch);
        } else if ch.is_whitespace() || ch == '-' {
            pending_hyphen = true;
        }
    }

    if slug.len() > MAX_SLUG_LENGTH {
        slug.truncate(MAX_SLUG_LENGTH);
        while slug.ends_with('-') {
            slug.pop();
        }
    }

    if slug.is_empty() {
        None
    } else {
        Some(slug)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_regex_valid() {
        assert!(SLUG_REGEX.is_match("santexnika"));
        assert!(SLUG_REGEX.is_match("elektr-montaj"));
        assert!(SLUG_REGEX.is_match("a"));
        assert!(SLUG_REGEX.is_match("remont-2"));
    }

    #[test]
    fn test_slug_regex_invalid() {
        assert!(!SLUG_REGEX.is_match("-remont")); // starts with hyphen
        assert!(!SLUG_REGEX.is_match("remont-")); // ends with hyphen
        assert!(!SLUG_REGEX.is_match("remont--uy")); // double hyphen
        assert!(!SLUG_REGEX.is_match("Remont")); // uppercase
        assert!(!SLUG_REGEX.is_match("remont_uy")); // underscore
        assert!(!SLUG_REGEX.is_match("")); // empty
    }

    #[test]
    fn test_slugify_collapses_whitespace_and_strips_symbols() {
        assert_eq!(
            slugify("  Uy  Tozalash & Xizmatlar!  ").as_deref(),
            Some("uy-tozalash-xizmatlar")
        );
        assert_eq!(slugify("Elektr - montaj").as_deref(), Some("elektr-montaj"));
        assert_eq!(slugify("O'rnatish").as_deref(), Some("ornatish"));
    }

    #[test]
    fn test_slugify_output_passes_slug_regex() {
        for name in ["Santexnika ishlari", "  --IT  xizmatlari-- ", "Remont 2024"] {
            let slug = slugify(name).unwrap();
            assert!(SLUG_REGEX.is_match(&slug), "{slug}");
        }
    }

    #[test]
    fn test_slugify_truncates() {
        let long = "ab ".repeat(80);
        let slug = slugify(&long).unwrap();
        assert!(slug.len() <= MAX_SLUG_LENGTH);
        assert!(!slug.ends_with('-'));
    }

    #[test]
    fn test_slugify_non_latin_only() {
        assert_eq!(slugify("Ремонт"), None);
        assert_eq!(slugify("!!!"), None);
    }
}
