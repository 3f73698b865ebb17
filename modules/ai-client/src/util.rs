/// Truncate a string to at most `max_bytes` bytes at a character boundary.
pub fn truncate_to_char_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) && end > 0 {
        end -= 1;
    }
    &s[..end]
}

/// Like [`truncate_to_char_boundary`] but marks a cut with a trailing ellipsis.
pub fn clip_for_prompt(s: &str, max_bytes: usize) -> String {
    let clipped = truncate_to_char_boundary(s, max_bytes);
    if clipped.len() < s.len() {
        format!("{}…", clipped.trim_end())
    } else {
        clipped.to_string()
    }
}
