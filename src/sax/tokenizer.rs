//! Byte-level token scanner.
//!
//! [`scan`] looks at the front of the pending buffer and either returns one
//! complete token, asks for more input, or reports an error. It never holds
//! state of its own: the parser owns the buffer and tells the scanner whether
//! the input has ended and whether it is inside a raw-text element.
//!
//! A token is only returned once it is complete, and text runs are only
//! returned once the `<` that ends them has been seen, so splitting the input
//! into chunks at any byte never changes the token sequence.

use memchr::{memchr, memmem};

use super::{Grammar, SaxErrorKind};
use crate::util::starts_with_ignore_ascii_case;

const COMMENT_OPEN: &[u8] = b"<!--";
const CDATA_OPEN: &[u8] = b"<![CDATA[";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Token<'a> {
    /// Character data, not yet entity-decoded.
    Text(&'a [u8]),
    /// Contents of a raw-text element (`script`, `style`). Possibly empty.
    RawText(&'a [u8]),
    CData(&'a [u8]),
    StartTag {
        name: &'a [u8],
        /// Everything between the name and `>` (or `/>`).
        attributes: &'a [u8],
        self_closing: bool,
    },
    EndTag {
        name: &'a [u8],
    },
    /// Comment, processing instruction, or declaration.
    Markup,
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Scan<'a> {
    Token { token: Token<'a>, len: usize },
    NeedMore,
    /// Unterminated markup at the end of an HTML document.
    Discard,
    Error(SaxErrorKind),
}

fn token(token: Token<'_>, len: usize) -> Scan<'_> {
    Scan::Token { token, len }
}

/// Scans one token from the front of `buf`.
///
/// `raw_text_element` is the (lower-case) name of the open `script`/`style`
/// element whose end tag terminates raw text, if any.
///
/// `scanned` is how much of `buf` an earlier call already searched before
/// returning [`Scan::NeedMore`] for the same token start. Text and raw-text
/// searches resume near there instead of at the front, so a long text run fed
/// in small chunks is scanned once.
pub(crate) fn scan<'a>(
    buf: &'a [u8],
    grammar: Grammar,
    raw_text_element: Option<&str>,
    scanned: usize,
    at_eof: bool,
) -> Scan<'a> {
    if buf.is_empty() {
        return Scan::NeedMore;
    }
    let scanned = scanned.min(buf.len());
    if let Some(element) = raw_text_element {
        let from = scanned.saturating_sub(element.len() + 2);
        return scan_raw_text(buf, element.as_bytes(), from, at_eof);
    }
    // Back up one byte: an HTML `<` at the very end was undecided
    let resume = scanned.saturating_sub(1);
    if buf[0] != b'<' {
        return scan_text(buf, resume, grammar, at_eof);
    }

    let Some(&next) = buf.get(1) else {
        return match (grammar, at_eof) {
            (_, false) => Scan::NeedMore,
            (Grammar::Html, true) => token(Token::Text(buf), buf.len()),
            (Grammar::Xml, true) => Scan::Error(SaxErrorKind::UnexpectedEof),
        };
    };

    match next {
        b'!' => scan_bang(buf, grammar, at_eof),
        b'?' => scan_processing_instruction(buf, grammar, at_eof),
        b'/' => scan_end_tag(buf, grammar, at_eof),
        ch if is_name_start(ch, grammar) => scan_start_tag(buf, grammar, at_eof),
        _ if grammar == Grammar::Html => scan_text(buf, resume.max(1), grammar, at_eof),
        _ => Scan::Error(SaxErrorKind::MalformedTag),
    }
}

fn is_name_start(ch: u8, grammar: Grammar) -> bool {
    match grammar {
        Grammar::Html => ch.is_ascii_alphabetic(),
        Grammar::Xml => ch.is_ascii_alphabetic() || ch == b'_' || ch == b':' || ch >= 0x80,
    }
}

/// In HTML, a `<` only starts markup when followed by one of these.
fn starts_html_markup(ch: u8) -> bool {
    ch.is_ascii_alphabetic() || matches!(ch, b'/' | b'!' | b'?')
}

fn incomplete<'a>(grammar: Grammar, at_eof: bool) -> Scan<'a> {
    match (grammar, at_eof) {
        (_, false) => Scan::NeedMore,
        (Grammar::Xml, true) => Scan::Error(SaxErrorKind::UnexpectedEof),
        (Grammar::Html, true) => Scan::Discard,
    }
}

/// Text from the start of `buf` up to the next `<` that begins markup,
/// searching from `from`.
fn scan_text(buf: &[u8], from: usize, grammar: Grammar, at_eof: bool) -> Scan<'_> {
    let mut search = from;
    loop {
        let Some(offset) = memchr(b'<', &buf[search..]) else {
            return if at_eof {
                token(Token::Text(buf), buf.len())
            } else {
                Scan::NeedMore
            };
        };
        let lt = search + offset;

        if grammar == Grammar::Xml {
            return token(Token::Text(&buf[..lt]), lt);
        }
        match buf.get(lt + 1) {
            Some(&ch) if starts_html_markup(ch) => return token(Token::Text(&buf[..lt]), lt),
            Some(_) => search = lt + 1,
            None if at_eof => return token(Token::Text(buf), buf.len()),
            None => return Scan::NeedMore,
        }
    }
}

/// Raw text up to `</name` followed by whitespace, `/` or `>`.
fn scan_raw_text<'a>(buf: &'a [u8], name: &[u8], from: usize, at_eof: bool) -> Scan<'a> {
    let mut from = from;
    while let Some(offset) = memmem::find(&buf[from..], b"</") {
        let start = from + offset;
        let candidate = &buf[start + 2..];
        if candidate.len() <= name.len() {
            if !at_eof {
                return Scan::NeedMore;
            }
            break;
        }
        let terminator = candidate[name.len()];
        if starts_with_ignore_ascii_case(candidate, name)
            && (terminator == b'>' || terminator == b'/' || terminator.is_ascii_whitespace())
        {
            return token(Token::RawText(&buf[..start]), start);
        }
        from = start + 2;
    }

    if at_eof {
        token(Token::RawText(buf), buf.len())
    } else {
        Scan::NeedMore
    }
}

fn scan_bang(buf: &[u8], grammar: Grammar, at_eof: bool) -> Scan<'_> {
    if buf.starts_with(COMMENT_OPEN) {
        return match memmem::find(&buf[COMMENT_OPEN.len()..], b"-->") {
            Some(end) => token(Token::Markup, COMMENT_OPEN.len() + end + 3),
            None => incomplete(grammar, at_eof),
        };
    }
    if buf.starts_with(CDATA_OPEN) {
        let body = &buf[CDATA_OPEN.len()..];
        return match memmem::find(body, b"]]>") {
            Some(end) => token(Token::CData(&body[..end]), CDATA_OPEN.len() + end + 3),
            None => incomplete(grammar, at_eof),
        };
    }
    if !at_eof && (COMMENT_OPEN.starts_with(buf) || CDATA_OPEN.starts_with(buf)) {
        return Scan::NeedMore;
    }
    scan_declaration(buf, grammar, at_eof)
}

/// `<!DOCTYPE ...>`, including an internal subset in brackets.
fn scan_declaration(buf: &[u8], grammar: Grammar, at_eof: bool) -> Scan<'_> {
    let mut quote = None;
    let mut depth = 0usize;
    for (index, &ch) in buf.iter().enumerate().skip(2) {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => {}
            None => match ch {
                b'"' | b'\'' => quote = Some(ch),
                b'[' => depth += 1,
                b']' => depth = depth.saturating_sub(1),
                b'>' if depth == 0 => return token(Token::Markup, index + 1),
                _ => {}
            },
        }
    }
    incomplete(grammar, at_eof)
}

fn scan_processing_instruction(buf: &[u8], grammar: Grammar, at_eof: bool) -> Scan<'_> {
    let end = match grammar {
        Grammar::Xml => memmem::find(&buf[2..], b"?>").map(|i| 2 + i + 2),
        Grammar::Html => memchr(b'>', &buf[2..]).map(|i| 2 + i + 1),
    };
    match end {
        Some(len) => token(Token::Markup, len),
        None => incomplete(grammar, at_eof),
    }
}

fn scan_end_tag(buf: &[u8], grammar: Grammar, at_eof: bool) -> Scan<'_> {
    let Some(gt) = memchr(b'>', &buf[2..]).map(|i| i + 2) else {
        return incomplete(grammar, at_eof);
    };
    let inner = &buf[2..gt];
    let name_len = inner
        .iter()
        .position(|b| b.is_ascii_whitespace() || *b == b'/')
        .unwrap_or(inner.len());
    let name = &inner[..name_len];

    match grammar {
        Grammar::Xml => {
            let trailing_ok = inner[name_len..].iter().all(u8::is_ascii_whitespace);
            if name.is_empty() || !trailing_ok {
                return Scan::Error(SaxErrorKind::MalformedTag);
            }
            token(Token::EndTag { name }, gt + 1)
        }
        // `</>` and `</ foo>` are bogus comments in HTML
        Grammar::Html if name.is_empty() || !name[0].is_ascii_alphabetic() => {
            token(Token::Markup, gt + 1)
        }
        Grammar::Html => token(Token::EndTag { name }, gt + 1),
    }
}

fn scan_start_tag(buf: &[u8], grammar: Grammar, at_eof: bool) -> Scan<'_> {
    let Some(gt) = find_tag_end(buf, 1) else {
        return incomplete(grammar, at_eof);
    };

    let name_end = buf[1..gt]
        .iter()
        .position(|b| b.is_ascii_whitespace() || *b == b'/')
        .map_or(gt, |i| i + 1);
    let name = &buf[1..name_end];

    let mut attributes = &buf[name_end..gt];
    let trimmed_len = attributes
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(0, |i| i + 1);
    let self_closing = trimmed_len > 0 && attributes[trimmed_len - 1] == b'/';
    if self_closing {
        attributes = &attributes[..trimmed_len - 1];
    }

    token(
        Token::StartTag {
            name,
            attributes,
            self_closing,
        },
        gt + 1,
    )
}

/// Index of the `>` closing a start tag. Quotes only count when they open an
/// attribute value (directly after `=`, ignoring whitespace).
fn find_tag_end(buf: &[u8], from: usize) -> Option<usize> {
    let mut index = from;
    let mut after_equals = false;
    while index < buf.len() {
        match buf[index] {
            b'>' => return Some(index),
            b'=' => after_equals = true,
            quote @ (b'"' | b'\'') if after_equals => {
                let close = memchr(quote, &buf[index + 1..])?;
                index += close + 1;
                after_equals = false;
            }
            ch if ch.is_ascii_whitespace() => {}
            _ => after_equals = false,
        }
        index += 1;
    }
    None
}

/// One attribute as it appears in the tag, value still quoted-content raw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RawAttribute<'a> {
    pub name: &'a [u8],
    pub value: &'a [u8],
}

/// Splits the attribute region of a start tag.
///
/// XML requires `name="value"` or `name='value'`. HTML also accepts
/// unquoted values, valueless attributes, and stray `/` characters.
pub(crate) fn parse_attributes(
    region: &[u8],
    grammar: Grammar,
) -> Result<Vec<RawAttribute<'_>>, SaxErrorKind> {
    let html = grammar == Grammar::Html;
    let len = region.len();
    let mut attributes = Vec::new();
    let mut index = 0;

    loop {
        while index < len && (region[index].is_ascii_whitespace() || (html && region[index] == b'/'))
        {
            index += 1;
        }
        if index >= len {
            break;
        }

        let name_start = index;
        while index < len
            && !region[index].is_ascii_whitespace()
            && region[index] != b'='
            && region[index] != b'/'
        {
            index += 1;
        }
        let name = &region[name_start..index];
        if name.is_empty() {
            if !html {
                return Err(SaxErrorKind::MalformedAttribute);
            }
            index += 1;
            continue;
        }

        let mut cursor = skip_whitespace(region, index);
        if region.get(cursor) != Some(&b'=') {
            if !html {
                return Err(SaxErrorKind::MalformedAttribute);
            }
            attributes.push(RawAttribute { name, value: b"" });
            continue;
        }

        cursor = skip_whitespace(region, cursor + 1);
        let value = match region.get(cursor) {
            Some(&quote @ (b'"' | b'\'')) => match memchr(quote, &region[cursor + 1..]) {
                Some(end) => {
                    index = cursor + 1 + end + 1;
                    &region[cursor + 1..cursor + 1 + end]
                }
                None if html => {
                    index = len;
                    &region[cursor + 1..]
                }
                None => return Err(SaxErrorKind::MalformedAttribute),
            },
            Some(_) if html => {
                let end = region[cursor..]
                    .iter()
                    .position(u8::is_ascii_whitespace)
                    .map_or(len, |i| cursor + i);
                index = end;
                &region[cursor..end]
            }
            None if html => {
                index = cursor;
                &b""[..]
            }
            _ => return Err(SaxErrorKind::MalformedAttribute),
        };

        attributes.push(RawAttribute { name, value });
    }

    Ok(attributes)
}

fn skip_whitespace(bytes: &[u8], mut index: usize) -> usize {
    while index < bytes.len() && bytes[index].is_ascii_whitespace() {
        index += 1;
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;

    fn xml(buf: &[u8]) -> Scan<'_> {
        scan(buf, Grammar::Xml, None, 0, false)
    }

    fn html_eof(buf: &[u8]) -> Scan<'_> {
        scan(buf, Grammar::Html, None, 0, true)
    }

    #[test]
    fn test_text_waits_for_terminating_lt() {
        assert_eq!(xml(b"hello"), Scan::NeedMore);
        assert_eq!(
            xml(b"hello<b>"),
            Scan::Token {
                token: Token::Text(b"hello"),
                len: 5
            }
        );
        assert_eq!(
            scan(b"hello", Grammar::Xml, None, 0, true),
            Scan::Token {
                token: Token::Text(b"hello"),
                len: 5
            }
        );
    }

    #[test]
    fn test_start_tag_with_quoted_gt() {
        let Scan::Token { token, len } = xml(br#"<a title="1 > 0" href='x'>rest"#) else {
            panic!("expected token");
        };
        assert_eq!(len, 26);
        assert_eq!(
            token,
            Token::StartTag {
                name: b"a",
                attributes: br#" title="1 > 0" href='x'"#,
                self_closing: false
            }
        );
    }

    #[test]
    fn test_self_closing() {
        let Scan::Token { token, .. } = xml(b"<br />") else {
            panic!("expected token");
        };
        assert_eq!(
            token,
            Token::StartTag {
                name: b"br",
                attributes: b" ",
                self_closing: true
            }
        );
    }

    #[test]
    fn test_partial_markup_needs_more() {
        for partial in [&b"<"[..], b"<!", b"<!-", b"<![CD", b"<a href=\"x", b"<!-- x", b"</a"] {
            assert_eq!(xml(partial), Scan::NeedMore, "{:?}", partial);
        }
    }

    #[test]
    fn test_xml_eof_inside_markup_is_error() {
        assert_eq!(
            scan(b"<item", Grammar::Xml, None, 0, true),
            Scan::Error(SaxErrorKind::UnexpectedEof)
        );
    }

    #[test]
    fn test_html_eof_inside_markup_discards() {
        assert_eq!(html_eof(b"<a href=\"x"), Scan::Discard);
        assert_eq!(
            html_eof(b"<"),
            Scan::Token {
                token: Token::Text(b"<"),
                len: 1
            }
        );
    }

    #[test]
    fn test_html_lt_not_followed_by_name_is_text() {
        assert_eq!(
            html_eof(b"a < b<p>"),
            Scan::Token {
                token: Token::Text(b"a < b"),
                len: 5
            }
        );
        assert_eq!(
            html_eof(b"< 3 hearts"),
            Scan::Token {
                token: Token::Text(b"< 3 hearts"),
                len: 10
            }
        );
        assert_eq!(
            scan(b"< 3", Grammar::Xml, None, 0, false),
            Scan::Error(SaxErrorKind::MalformedTag)
        );
    }

    #[test]
    fn test_cdata_and_comment() {
        assert_eq!(
            xml(b"<![CDATA[<b>x</b>]]>tail"),
            Scan::Token {
                token: Token::CData(b"<b>x</b>"),
                len: 20
            }
        );
        assert_eq!(
            xml(b"<!-- a > b -->tail"),
            Scan::Token {
                token: Token::Markup,
                len: 14
            }
        );
    }

    #[test]
    fn test_doctype_with_internal_subset() {
        let doc = br#"<!DOCTYPE rss [<!ENTITY x "y>">]><rss/>"#;
        let Scan::Token { token, len } = xml(doc) else {
            panic!("expected token");
        };
        assert_eq!(token, Token::Markup);
        assert_eq!(&doc[len..], b"<rss/>");
    }

    #[test]
    fn test_raw_text_until_matching_end_tag() {
        let buf = b"if (a </b) {}</SCRIPT >";
        assert_eq!(
            scan(buf, Grammar::Html, Some("script"), 0, false),
            Scan::Token {
                token: Token::RawText(b"if (a </b) {}"),
                len: 13
            }
        );
        assert_eq!(
            scan(b"x </scr", Grammar::Html, Some("script"), 0, false),
            Scan::NeedMore
        );
    }

    #[test]
    fn test_resumed_scan_matches_fresh_scan() {
        let text = b"a long run of text < 3 then<b>";
        let markup = text.len() - 3;
        for scanned in 0..=markup + 1 {
            assert_eq!(
                scan(text, Grammar::Html, None, scanned, false),
                scan(text, Grammar::Html, None, 0, false),
                "scanned {scanned}"
            );
        }

        let xml_text = b"plain text&amp;more<x/>";
        assert_eq!(
            scan(xml_text, Grammar::Xml, None, 12, false),
            Scan::Token {
                token: Token::Text(b"plain text&amp;more"),
                len: 19
            }
        );

        let raw = b"var s = '</scr' + 'ipt>';</script>";
        for scanned in 0..raw.len() {
            assert_eq!(
                scan(raw, Grammar::Html, Some("script"), scanned, false),
                Scan::Token {
                    token: Token::RawText(b"var s = '</scr' + 'ipt>';"),
                    len: 25
                },
                "scanned {scanned}"
            );
        }
    }

    #[test]
    fn test_html_lt_at_chunk_end_rechecked_on_resume() {
        assert_eq!(scan(b"x <", Grammar::Html, None, 0, false), Scan::NeedMore);
        assert_eq!(
            scan(b"x <b>", Grammar::Html, None, 3, false),
            Scan::Token {
                token: Token::Text(b"x "),
                len: 2
            }
        );
    }

    #[test]
    fn test_xml_attributes() {
        let attrs = parse_attributes(br#" a="1" b = '2' c="x &amp; y""#, Grammar::Xml).unwrap();
        assert_eq!(
            attrs,
            vec![
                RawAttribute { name: b"a", value: b"1" },
                RawAttribute { name: b"b", value: b"2" },
                RawAttribute { name: b"c", value: b"x &amp; y" },
            ]
        );
        assert_eq!(
            parse_attributes(b" checked", Grammar::Xml),
            Err(SaxErrorKind::MalformedAttribute)
        );
        assert_eq!(
            parse_attributes(b" a=1", Grammar::Xml),
            Err(SaxErrorKind::MalformedAttribute)
        );
    }

    #[test]
    fn test_html_attributes() {
        let attrs = parse_attributes(b" checked href=/x/y class=\"a b\" data-x=", Grammar::Html).unwrap();
        assert_eq!(
            attrs,
            vec![
                RawAttribute { name: b"checked", value: b"" },
                RawAttribute { name: b"href", value: b"/x/y" },
                RawAttribute { name: b"class", value: b"a b" },
                RawAttribute { name: b"data-x", value: b"" },
            ]
        );
    }
}
