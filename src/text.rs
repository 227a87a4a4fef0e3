use std::borrow::Cow;

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Minimum normalized length for free-text queries. Shorter input yields an
/// empty result instead of a full scan.
pub const MIN_QUERY_CHARS: usize = 2;

/// Folds text into the comparison key used for every match in the directory:
/// accents dropped, whitespace collapsed, lowercase.
pub fn normalize(s: &str) -> String {
    let repaired = repair_latin1_mojibake(s);
    let folded = repaired.nfkc().collect::<String>().to_lowercase();
    let stripped: String = folded.nfd().filter(|c| !is_combining_mark(*c)).collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// `needle` must already be normalized.
pub fn contains_normalized(haystack: &str, needle: &str) -> bool {
    normalize(haystack).contains(needle)
}

// Legacy imports re-read UTF-8 bytes as Latin-1, so "á" shows up as "Ã¡".
fn repair_latin1_mojibake(s: &str) -> Cow<'_, str> {
    if !s.contains(['Ã', 'Â']) {
        return Cow::Borrowed(s);
    }
    let mut bytes = Vec::with_capacity(s.len());
    for ch in s.chars() {
        let code = u32::from(ch);
        if code > 0xFF {
            return Cow::Borrowed(s);
        }
        bytes.push(code as u8);
    }
    match String::from_utf8(bytes) {
        Ok(fixed) => Cow::Owned(fixed),
        Err(_) => Cow::Borrowed(s),
    }
}
