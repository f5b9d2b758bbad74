/// Marker appended to text cut by [`truncate_utf8`].
pub const TRUNCATION_MARKER: &str = "\n... (truncated)";

/// Cut `text` to at most `max_bytes` bytes on a char boundary, appending a marker when cut.
pub fn truncate_utf8(text: &str, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        return text.to_string();
    }
    let mut end = max_bytes;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    let mut out = String::with_capacity(end + TRUNCATION_MARKER.len());
    out.push_str(&text[..end]);
    out.push_str(TRUNCATION_MARKER);
    out
}
