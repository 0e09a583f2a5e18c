//! Utility functions for console output

/// Truncates a string to fit within a given width.
///
/// If the string exceeds `max_len` characters, it is cut and "..." is
/// appended. Counts characters, not bytes, so paths with non-ASCII user
/// names are not split inside a code point.
#[must_use]
pub fn truncate_string(s: &str, max_len: usize) -> String {
    let len = s.chars().count();
    if len <= max_len {
        s.to_string()
    } else if max_len > 3 {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{}...", kept)
    } else {
        s.chars().take(max_len).collect()
    }
}
