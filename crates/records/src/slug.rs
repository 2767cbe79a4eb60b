//! Slug rules.
//!
//! A slug is the storage key of a record (its filename stem). It must be a
//! single lowercase alphanumeric run with optional internal hyphens.

use crate::consts::SLUG_REGEX;
use rslug::slugify;

/// Returns `true` if the string is shaped like a slug.
///
/// ```
/// use gearbase_records::slug::is_valid_slug_format;
/// assert!(is_valid_slug_format("pro-tools-12"));
/// assert!(is_valid_slug_format("x"));
/// assert!(!is_valid_slug_format("-invalid"));
/// assert!(!is_valid_slug_format("Serum"));
/// ```
pub fn is_valid_slug_format(s: &str) -> bool {
    SLUG_REGEX.is_match(s)
}

/// Generates a slug from a display name.
///
/// Symbols (trademark signs, quotation marks, punctuation) are dropped before
/// slugifying so they never turn into stray hyphens. The output is a fixed
/// point: generating a slug from a generated slug returns it unchanged.
///
/// ```
/// use gearbase_records::slug::generate;
/// assert_eq!(generate("Pro  Tools™"), "pro-tools");
/// assert_eq!(generate("pro-tools"), "pro-tools");
/// ```
pub fn generate(name: &str) -> String {
    let stripped: String = name
        .chars()
        .map(|c| match c {
            c if c.is_alphanumeric() || c == '-' => c,
            c if c.is_whitespace() || c == '_' || c == '/' || c == '.' => ' ',
            _ => '\0',
        })
        .filter(|c| *c != '\0')
        .collect();
    let slug = slugify!(&stripped);
    // Collapse any separator runs left over from transliteration.
    slug.split('-').filter(|part| !part.is_empty()).collect::<Vec<_>>().join("-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("pro-tools-12")]
    #[case("serum")]
    #[case("a")]
    #[case("7")]
    #[case("tr-808")]
    #[case("a--b")]
    fn test_valid_slugs(#[case] slug: &str) {
        assert!(is_valid_slug_format(slug));
    }

    #[rstest]
    #[case("-invalid")]
    #[case("invalid-")]
    #[case("-")]
    #[case("Serum")]
    #[case("pro_tools")]
    #[case("pro tools")]
    #[case(" pro")]
    #[case("")]
    #[case("café")]
    fn test_invalid_slugs(#[case] slug: &str) {
        assert!(!is_valid_slug_format(slug));
    }

    #[rstest]
    #[case("Pro  Tools™", "pro-tools")]
    #[case("pro-tools", "pro-tools")]
    #[case("Serum", "serum")]
    #[case("  Model D  ", "model-d")]
    #[case("\"Quoted\" Name's", "quoted-names")]
    #[case("FabFilter Pro-Q 3", "fabfilter-pro-q-3")]
    #[case("U-He / Diva", "u-he-diva")]
    fn test_generate(#[case] name: &str, #[case] expected: &str) {
        assert_eq!(generate(name), expected);
    }

    #[rstest]
    #[case("Pro  Tools™")]
    #[case("Ableton Live 12 Suite")]
    #[case("--weird--input--")]
    #[case("Dave Smith Instruments")]
    fn test_generate_is_idempotent(#[case] name: &str) {
        let once = generate(name);
        assert_eq!(generate(&once), once);
        assert!(once.is_empty() || is_valid_slug_format(&once), "{once}");
    }
}
