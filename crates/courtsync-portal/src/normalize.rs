//! Phone normalization for customer lookup and booking creation.

/// Country code the portal operates under; stripped before lookup because the
/// portal stores national-format numbers.
const COUNTRY_CODE: &str = "+91";

/// Reduce a phone number to national-format digits.
///
/// Strips whitespace, the country-code prefix (with or without `+`), and any
/// remaining non-digit characters.
#[must_use]
pub fn normalize_phone(raw: &str) -> String {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    let stripped = compact
        .strip_prefix(COUNTRY_CODE)
        .or_else(|| compact.strip_prefix(&COUNTRY_CODE[1..]).filter(|rest| rest.len() == 10))
        .unwrap_or(&compact);
    stripped.chars().filter(char::is_ascii_digit).collect()
}
