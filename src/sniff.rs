//! Lightweight content sniffing.
//!
//! Classifies a byte buffer as HTML, XML, JSON or a specific feed flavor
//! without parsing it. Every predicate looks at no more than the first
//! [`SNIFF_PREFIX_LEN`] bytes, never panics, and returns `false` for empty or
//! truncated input.
//!
//! The predicates are independent: an RSS document is both XML and RSS. Use
//! [`feed_type`] to combine them into a single decision.

use serde::Serialize;

use crate::util::{find_ignore_ascii_case, starts_with_ignore_ascii_case};

/// Number of leading bytes the sniffers inspect.
pub const SNIFF_PREFIX_LEN: usize = 4096;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// The feed format a buffer most likely contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FeedType {
    Rss,
    Atom,
    JsonFeed,
    RssInJson,
    NotAFeed,
}

fn prefix(bytes: &[u8]) -> &[u8] {
    &bytes[..bytes.len().min(SNIFF_PREFIX_LEN)]
}

/// The prefix with a UTF-8 BOM and leading ASCII whitespace removed.
fn significant(bytes: &[u8]) -> &[u8] {
    let bytes = prefix(bytes);
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    &bytes[start..]
}

fn contains(bytes: &[u8], needle: &[u8]) -> bool {
    find_ignore_ascii_case(prefix(bytes), needle).is_some()
}

pub fn is_probably_json(bytes: &[u8]) -> bool {
    matches!(significant(bytes).first(), Some(b'{') | Some(b'['))
}

/// JSON whose prefix carries a `jsonfeed.org/version` marker.
///
/// The escaped-slash spelling (`jsonfeed.org\/version`) is accepted because
/// several JSON encoders escape `/` by default.
pub fn is_probably_json_feed(bytes: &[u8]) -> bool {
    is_probably_json(bytes)
        && (contains(bytes, b"jsonfeed.org/version") || contains(bytes, b"jsonfeed.org\\/version"))
}

/// JSON with an RSS-in-JSON envelope (`{"rss": {"channel": ...}}`).
pub fn is_probably_rss_in_json(bytes: &[u8]) -> bool {
    is_probably_json(bytes) && contains(bytes, b"\"rss\"") && contains(bytes, b"\"channel\"")
}

pub fn is_probably_html(bytes: &[u8]) -> bool {
    contains(bytes, b"<html") || contains(bytes, b"<!doctype html")
}

pub fn is_probably_xml(bytes: &[u8]) -> bool {
    let head = significant(bytes);
    if starts_with_ignore_ascii_case(head, b"<?xml") {
        return true;
    }
    head.first() == Some(&b'<') && !is_probably_html(bytes)
}

pub fn is_probably_rss(bytes: &[u8]) -> bool {
    rss_marker_offset(bytes).is_some()
}

pub fn is_probably_atom(bytes: &[u8]) -> bool {
    atom_marker_offset(bytes).is_some()
}

fn rss_marker_offset(bytes: &[u8]) -> Option<usize> {
    let head = prefix(bytes);
    let rss = find_tag(head, b"<rss");
    let rdf = find_tag(head, b"<rdf:rdf");
    match (rss, rdf) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

fn atom_marker_offset(bytes: &[u8]) -> Option<usize> {
    find_tag(prefix(bytes), b"<feed")
}

fn html_marker_offset(bytes: &[u8]) -> Option<usize> {
    let head = prefix(bytes);
    match (find_tag(head, b"<html"), find_ignore_ascii_case(head, b"<!doctype html")) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

/// First `<name` in `head` that is a whole tag name, so `<feed` does not match
/// `<feedback-form>`.
fn find_tag(head: &[u8], open: &[u8]) -> Option<usize> {
    let mut start = 0;
    while let Some(found) = find_ignore_ascii_case(&head[start..], open) {
        let at = start + found;
        match head.get(at + open.len()) {
            Some(b) if b.is_ascii_whitespace() || *b == b'>' || *b == b'/' => return Some(at),
            Some(_) => start = at + 1,
            None => return None,
        }
    }
    None
}

/// Picks a single feed flavor from the independent predicates.
///
/// JSON flavors are checked first. For markup, whichever of the RSS and Atom
/// root markers appears earlier in the prefix wins, which handles Atom feeds
/// that mention `<rss` in a comment further down (and vice versa). A page
/// whose `<html` (or doctype) comes before any feed root is not a feed.
pub fn feed_type(bytes: &[u8]) -> FeedType {
    if is_probably_json_feed(bytes) {
        return FeedType::JsonFeed;
    }
    if is_probably_rss_in_json(bytes) {
        return FeedType::RssInJson;
    }
    if is_probably_json(bytes) {
        return FeedType::NotAFeed;
    }

    let (rss, atom) = (rss_marker_offset(bytes), atom_marker_offset(bytes));
    let root = match (rss, atom) {
        (Some(rss), Some(atom)) if atom < rss => Some((atom, FeedType::Atom)),
        (Some(rss), _) => Some((rss, FeedType::Rss)),
        (None, Some(atom)) => Some((atom, FeedType::Atom)),
        (None, None) => None,
    };
    match (root, html_marker_offset(bytes)) {
        (Some((at, _)), Some(html)) if html < at => FeedType::NotAFeed,
        (Some((_, feed_type)), _) => feed_type,
        (None, _) => FeedType::NotAFeed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const RSS: &[u8] = br#"<?xml version="1.0"?><rss version="2.0"><channel></channel></rss>"#;
    const ATOM: &[u8] =
        br#"<?xml version="1.0" encoding="utf-8"?><feed xmlns="http://www.w3.org/2005/Atom"></feed>"#;
    const HTML: &[u8] = b"<!DOCTYPE html>\n<html><head><title>x</title></head></html>";
    const JSON_FEED: &[u8] =
        br#"{"version": "https://jsonfeed.org/version/1.1", "title": "T", "items": []}"#;

    #[test]
    fn test_rss_is_xml_and_rss() {
        assert!(is_probably_xml(RSS));
        assert!(is_probably_rss(RSS));
        assert!(!is_probably_atom(RSS));
        assert!(!is_probably_html(RSS));
        assert!(!is_probably_json(RSS));
        assert_eq!(feed_type(RSS), FeedType::Rss);
    }

    #[test]
    fn test_atom() {
        assert!(is_probably_xml(ATOM));
        assert!(is_probably_atom(ATOM));
        assert_eq!(feed_type(ATOM), FeedType::Atom);
    }

    #[test]
    fn test_rdf_counts_as_rss() {
        let rdf = br#"<?xml version="1.0"?><rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"></rdf:RDF>"#;
        assert!(is_probably_rss(rdf));
        assert_eq!(feed_type(rdf), FeedType::Rss);
    }

    #[test]
    fn test_html_is_not_xml_or_feed() {
        assert!(is_probably_html(HTML));
        assert!(!is_probably_xml(HTML));
        assert_eq!(feed_type(HTML), FeedType::NotAFeed);
    }

    #[test]
    fn test_json_feed_and_escaped_slash() {
        assert!(is_probably_json(JSON_FEED));
        assert!(is_probably_json_feed(JSON_FEED));
        assert_eq!(feed_type(JSON_FEED), FeedType::JsonFeed);

        let escaped = br#"{"version":"https:\/\/jsonfeed.org\/version\/1","items":[]}"#;
        assert!(is_probably_json_feed(escaped));
    }

    #[test]
    fn test_rss_in_json() {
        let doc = br#" {"rss": {"version": "2.0", "channel": {"title": "x", "item": []}}}"#;
        assert!(is_probably_rss_in_json(doc));
        assert!(!is_probably_json_feed(doc));
        assert_eq!(feed_type(doc), FeedType::RssInJson);
    }

    #[test]
    fn test_bom_and_whitespace_skipped() {
        let mut doc = UTF8_BOM.to_vec();
        doc.extend_from_slice(b"\n\n  <?xml version=\"1.0\"?><rss></rss>");
        assert!(is_probably_xml(&doc));
        assert_eq!(feed_type(&doc), FeedType::Rss);

        let mut json = UTF8_BOM.to_vec();
        json.extend_from_slice(b" [1, 2]");
        assert!(is_probably_json(&json));
    }

    #[test]
    fn test_marker_beyond_prefix_is_ignored() {
        let mut doc = b"<?xml version=\"1.0\"?><!--".to_vec();
        doc.extend(std::iter::repeat(b'x').take(SNIFF_PREFIX_LEN));
        doc.extend_from_slice(b"--><rss></rss>");
        assert!(is_probably_xml(&doc));
        assert!(!is_probably_rss(&doc));
    }

    #[test]
    fn test_earlier_marker_wins() {
        let doc = br#"<feed xmlns="http://www.w3.org/2005/Atom"><!-- not <rss --></feed>"#;
        assert_eq!(feed_type(doc), FeedType::Atom);
    }

    #[test]
    fn test_html_with_feed_like_elements_is_not_a_feed() {
        let page = br#"<!DOCTYPE html>
<html><head><title>Blog</title></head>
<body><feedback-form></feedback-form><rss-widget src="/rss.xml"></rss-widget></body></html>"#;
        assert!(is_probably_html(page));
        assert!(!is_probably_atom(page));
        assert!(!is_probably_rss(page));
        assert_eq!(feed_type(page), FeedType::NotAFeed);

        let embedded = b"<html><body><rss version=\"2.0\"></rss></body></html>";
        assert!(is_probably_rss(embedded));
        assert_eq!(feed_type(embedded), FeedType::NotAFeed);
    }

    #[test]
    fn test_feed_root_before_html_mention_is_a_feed() {
        let doc = br#"<rss version="2.0"><channel><description><![CDATA[<html><body>hi</body></html>]]></description></channel></rss>"#;
        assert_eq!(feed_type(doc), FeedType::Rss);
    }

    #[test]
    fn test_empty_and_truncated_input() {
        for input in [&b""[..], b"<", b"{", b"\xEF\xBB", b"   "] {
            assert!(!is_probably_html(input));
            assert!(!is_probably_rss(input));
            assert!(!is_probably_atom(input));
            assert!(!is_probably_json_feed(input));
            assert!(!is_probably_rss_in_json(input));
        }
        assert!(!is_probably_xml(b""));
        assert!(!is_probably_json(b""));
        assert_eq!(feed_type(b""), FeedType::NotAFeed);
    }

    proptest! {
        #[test]
        fn test_sniffers_never_panic(bytes in proptest::collection::vec(any::<u8>(), 0..512)) {
            let _ = is_probably_html(&bytes);
            let _ = is_probably_xml(&bytes);
            let _ = is_probably_json(&bytes);
            let _ = is_probably_json_feed(&bytes);
            let _ = is_probably_rss_in_json(&bytes);
            let _ = is_probably_rss(&bytes);
            let _ = is_probably_atom(&bytes);
            let _ = feed_type(&bytes);
        }
    }
}
