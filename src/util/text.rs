/// Returns the trimmed string, or `None` if nothing but whitespace remains.
pub fn trimmed_non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_owned())
    }
}

/// Finds the first occurrence of `needle` in `haystack`, comparing ASCII
/// letters case-insensitively.
///
/// `needle` is expected to be lower-case ASCII. Returns the byte offset of the
/// match.
pub fn find_ignore_ascii_case(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    if haystack.len() < needle.len() {
        return None;
    }

    let first = needle[0];
    let mut start = 0;
    while start + needle.len() <= haystack.len() {
        // memchr2 on both cases of the first byte skips most of the haystack
        let offset = memchr::memchr2(
            first.to_ascii_lowercase(),
            first.to_ascii_uppercase(),
            &haystack[start..=haystack.len() - needle.len()],
        )?;
        let candidate = start + offset;
        if haystack[candidate..candidate + needle.len()].eq_ignore_ascii_case(needle) {
            return Some(candidate);
        }
        start = candidate + 1;
    }
    None
}

/// Whether `haystack` begins with `prefix`, ignoring ASCII case.
pub fn starts_with_ignore_ascii_case(haystack: &[u8], prefix: &[u8]) -> bool {
    haystack.len() >= prefix.len() && haystack[..prefix.len()].eq_ignore_ascii_case(prefix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trimmed_non_empty() {
        assert_eq!(trimmed_non_empty("  Hello \n"), Some("Hello".to_string()));
        assert_eq!(trimmed_non_empty(" \t\n "), None);
        assert_eq!(trimmed_non_empty(""), None);
    }

    #[test]
    fn test_find_ignore_ascii_case() {
        assert_eq!(find_ignore_ascii_case(b"<HTML lang=en>", b"<html"), Some(0));
        assert_eq!(find_ignore_ascii_case(b"  <!DocType Html>", b"<!doctype html"), Some(2));
        assert_eq!(find_ignore_ascii_case(b"<rss>", b"<feed"), None);
        assert_eq!(find_ignore_ascii_case(b"ab", b"abc"), None);
        assert_eq!(find_ignore_ascii_case(b"xxScRiPt", b"script"), Some(2));
    }

    #[test]
    fn test_find_at_end_of_haystack() {
        assert_eq!(find_ignore_ascii_case(b"abcFEED", b"feed"), Some(3));
    }

    #[test]
    fn test_starts_with_ignore_ascii_case() {
        assert!(starts_with_ignore_ascii_case(b"<?XML version", b"<?xml"));
        assert!(!starts_with_ignore_ascii_case(b"<?x", b"<?xml"));
    }
}
