//! Small string helpers.

/// Truncate `s` to at most `max_bytes` bytes without splitting a UTF-8
/// character, appending `...` when anything was cut.
#[must_use]
pub fn truncate_str(s: &str, max_bytes: usize) -> String {
    if s.len() <= max_bytes {
        return s.to_owned();
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_strings_unchanged() {
        assert_eq!(truncate_str("abc", 10), "abc");
        assert_eq!(truncate_str("", 0), "");
    }

    #[test]
    fn long_strings_truncated() {
        assert_eq!(truncate_str("abcdef", 3), "abc...");
    }

    #[test]
    fn respects_char_boundaries() {
        // 'é' is two bytes; cutting at 2 would split it
        assert_eq!(truncate_str("aé", 2), "a...");
    }
}
