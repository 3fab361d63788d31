// Text and number normalization helpers.
//
// Everything that turns loosely typed CSV cells into lookup keys and
// counts lives here, so the loader and the aggregation code can assume
// clean values.
use num_format::{Locale, ToFormattedString};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Build the grouping key for a municipality name.
///
/// - Trims and lowercases.
/// - Decomposes accented characters (NFD) and drops the combining marks,
///   so `"Florianópolis"` and `"florianopolis"` collide.
/// - Collapses whitespace runs to a single space.
///
/// The result is only meant for lookups; never display it.
pub fn normalize_key(value: &str) -> String {
    let stripped: String = value
        .trim()
        .to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parse a count the way spreadsheet exports tend to write them.
///
/// - Missing, empty, or non-numeric input yields `fallback`.
/// - A leading sign and digit run is a successful parse; anything after
///   the digits is ignored (`"3.7"` is 3, `"12 un"` is 12).
/// - A successful negative parse clamps to 0 instead of using `fallback`.
/// - Values past `u64::MAX` saturate.
pub fn to_non_negative_int(s: Option<&str>, fallback: u64) -> u64 {
    let Some(s) = s else { return fallback };
    let s = s.trim();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let run = digits.bytes().take_while(u8::is_ascii_digit).count();
    if run == 0 {
        return fallback;
    }
    if negative {
        return 0;
    }
    digits.as_bytes()[..run].iter().fold(0u64, |acc, d| {
        acc.saturating_mul(10).saturating_add(u64::from(d - b'0'))
    })
}

/// Trim an optional cell into an owned string, empty when missing.
pub fn clean_text(s: Option<&str>) -> String {
    s.map(str::trim).unwrap_or_default().to_string()
}

/// Group digits the way the dashboard labels counts (`1.234`).
pub fn format_count<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::pt)
}
