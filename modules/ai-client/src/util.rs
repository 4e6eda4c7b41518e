use regex::Regex;
use std::sync::LazyLock;

static FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```[A-Za-z0-9_+-]*").expect("valid regex"));

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

/// Remove every markdown code fence marker (with optional language tag) from a
/// response, wherever it appears, and trim the result.
///
/// Models often wrap JSON in ```` ```json ```` blocks and surround the block with
/// prose, so fences are not only at the edges.
pub fn strip_code_fences(response: &str) -> String {
    FENCE_RE.replace_all(response, "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_to_char_boundary() {
        let text = "Hello 世界";
        let truncated = truncate_to_char_boundary(text, 8);
        assert!(truncated.len() <= 8);
        assert!(text.starts_with(truncated));
    }

    #[test]
    fn test_truncate_within_bounds() {
        let text = "Hello";
        assert_eq!(truncate_to_char_boundary(text, 100), "Hello");
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n[]\n```"), "[]");
        assert_eq!(strip_code_fences("```\n[]\n```"), "[]");
        assert_eq!(strip_code_fences("[]"), "[]");
    }

    #[test]
    fn test_strip_code_fences_inside_prose() {
        let raw = "Here you go:\n```json\n[1]\n```\nEnjoy!";
        assert_eq!(strip_code_fences(raw), "Here you go:\n\n[1]\n\nEnjoy!");
    }
}
