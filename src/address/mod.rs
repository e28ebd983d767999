//! Heuristic street-address normalization.
//!
//! Produces the lower-cased, unit-stripped, city/state-stripped street key
//! used for cache matching. Best-effort text transform: it never fails, and
//! malformed input degrades to an empty or degenerate key rather than an
//! error.

use once_cell::sync::Lazy;
use regex::Regex;

/// Pull the 5-digit ZIP out of a raw address, if it ends with one.
pub fn extract_zip(raw: &str) -> Option<String> {
    static RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(\d{5})(?:-\d{4})?\s*$").unwrap());
    RE.captures(raw.trim())
        .map(|caps| caps[1].to_string())
}

/// Normalize a free-text address to its canonical street-only matching key.
pub fn normalize(raw: &str) -> String {
    static ZIP: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\d{5}(?:-\d{4})?\s*$").unwrap());
    // The 50 standard USPS state codes, preceded by a comma or whitespace,
    // at the end of the (ZIP-stripped) string.
    static STATE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(
            r"(?i)[,\s]+(AL|AK|AZ|AR|CA|CO|CT|DE|FL|GA|HI|ID|IL|IN|IA|KS|KY|LA|ME|MD|MA|MI|MN|MS|MO|MT|NE|NV|NH|NJ|NM|NY|NC|ND|OH|OK|OR|PA|RI|SC|SD|TN|TX|UT|VT|VA|WA|WV|WI|WY)\s*$",
        )
        .unwrap()
    });
    // Unit/suite/apartment designators (and a bare "d" token), each followed
    // by an alphanumeric token.
    static UNIT: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(?i)\s*[#,]?\s*\b(?:unit|apt|apartment|suite|ste|d)\b\s*#?\s*[\w-]+").unwrap()
    });

    let without_zip = ZIP.replace(raw, "");
    let without_zip = without_zip.trim();

    let street = match STATE.find(without_zip) {
        Some(m) => strip_city(without_zip[..m.start()].trim()),
        None => strip_city(without_zip),
    };

    UNIT.replace_all(&street, "").trim().to_lowercase()
}

/// Drop the city portion: everything after the first comma, or the last word
/// when the string has more than 3 whitespace-separated words.
fn strip_city(s: &str) -> String {
    if let Some((street, _)) = s.split_once(',') {
        return street.trim().to_string();
    }
    let words: Vec<&str> = s.split_whitespace().collect();
    if words.len() > 3 {
        words[..words.len() - 1].join(" ")
    } else {
        s.trim().to_string()
    }
}
