//! Character-level cleanup of event text and tag payloads.

/// Decorative glyphs that text generators leave behind.
pub const ARTIFACTS: &[char] = &[
    '†', '⇥', '⇤', '‹', '›', '«', '»', '【', '】', '✨', '🚀', '📈', '📊', '💱', '💎',
];

fn is_removed(c: char) -> bool {
    c < '\u{20}' || c == '\u{7f}' || c == char::REPLACEMENT_CHARACTER || ARTIFACTS.contains(&c)
}

/// Removes control characters, U+FFFD and [`ARTIFACTS`], then trims
/// surrounding whitespace.
///
/// Never fails. The result may be empty.
pub fn clean(raw: &str) -> String {
    let stripped: String = raw.chars().filter(|&c| !is_removed(c)).collect();
    stripped.trim().to_string()
}
