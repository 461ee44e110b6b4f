//! Entity decoding for character data and attribute values.
//!
//! XML mode decodes the five predefined entities and numeric character
//! references. HTML mode adds the named entities that show up in real feeds
//! and web pages. Unknown or unterminated references are kept literally.
//!
//! Uses `Cow` so input without a `&` is returned without copying.

use memchr::memchr;
use std::borrow::Cow;

/// Longest entity name we look for a terminating `;` within.
const MAX_ENTITY_LEN: usize = 32;

/// Decodes entity references in `input`.
#[inline]
pub fn decode(input: &[u8], html: bool) -> Cow<'_, [u8]> {
    if memchr(b'&', input).is_none() {
        return Cow::Borrowed(input);
    }
    Cow::Owned(decode_all(input, html))
}

fn decode_all(input: &[u8], html: bool) -> Vec<u8> {
    let mut result = Vec::with_capacity(input.len());
    let mut pos = 0;

    while let Some(amp) = memchr(b'&', &input[pos..]) {
        result.extend_from_slice(&input[pos..pos + amp]);
        pos += amp;

        let window_end = input.len().min(pos + 1 + MAX_ENTITY_LEN);
        let decoded = memchr(b';', &input[pos + 1..window_end]).and_then(|semi| {
            let entity = &input[pos + 1..pos + 1 + semi];
            decode_entity(entity, html).map(|ch| (ch, semi + 2))
        });

        match decoded {
            Some((ch, consumed)) => {
                let mut utf8 = [0u8; 4];
                result.extend_from_slice(ch.encode_utf8(&mut utf8).as_bytes());
                pos += consumed;
            }
            None => {
                result.push(b'&');
                pos += 1;
            }
        }
    }

    result.extend_from_slice(&input[pos..]);
    result
}

/// Decodes one entity body (without `&` and `;`).
fn decode_entity(entity: &[u8], html: bool) -> Option<char> {
    if let Some(numeric) = entity.strip_prefix(b"#") {
        return decode_numeric(numeric);
    }

    let ch = match entity {
        b"lt" => '<',
        b"gt" => '>',
        b"amp" => '&',
        b"quot" => '"',
        b"apos" => '\'',
        _ if html => return decode_html_named(entity),
        _ => return None,
    };
    Some(ch)
}

/// `&#123;` and `&#x7B;`. Code points that are not valid `char`s, and NUL,
/// decode to U+FFFD.
fn decode_numeric(digits: &[u8]) -> Option<char> {
    let (digits, radix) = match digits.first()? {
        b'x' | b'X' => (&digits[1..], 16),
        _ => (digits, 10),
    };
    if digits.is_empty() {
        return None;
    }
    let text = std::str::from_utf8(digits).ok()?;
    let code = u32::from_str_radix(text, radix).ok()?;
    match code {
        0 => Some(char::REPLACEMENT_CHARACTER),
        _ => Some(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER)),
    }
}

fn decode_html_named(entity: &[u8]) -> Option<char> {
    let ch = match entity {
        b"nbsp" => '\u{00A0}',
        b"iexcl" => '\u{00A1}',
        b"cent" => '\u{00A2}',
        b"pound" => '\u{00A3}',
        b"yen" => '\u{00A5}',
        b"sect" => '\u{00A7}',
        b"copy" => '\u{00A9}',
        b"laquo" => '\u{00AB}',
        b"shy" => '\u{00AD}',
        b"reg" => '\u{00AE}',
        b"deg" => '\u{00B0}',
        b"plusmn" => '\u{00B1}',
        b"para" => '\u{00B6}',
        b"middot" => '\u{00B7}',
        b"raquo" => '\u{00BB}',
        b"iquest" => '\u{00BF}',
        b"Agrave" => '\u{00C0}',
        b"Aacute" => '\u{00C1}',
        b"Auml" => '\u{00C4}',
        b"Ccedil" => '\u{00C7}',
        b"Eacute" => '\u{00C9}',
        b"Ouml" => '\u{00D6}',
        b"times" => '\u{00D7}',
        b"Uuml" => '\u{00DC}',
        b"szlig" => '\u{00DF}',
        b"agrave" => '\u{00E0}',
        b"aacute" => '\u{00E1}',
        b"auml" => '\u{00E4}',
        b"ccedil" => '\u{00E7}',
        b"egrave" => '\u{00E8}',
        b"eacute" => '\u{00E9}',
        b"iacute" => '\u{00ED}',
        b"ntilde" => '\u{00F1}',
        b"oacute" => '\u{00F3}',
        b"ouml" => '\u{00F6}',
        b"divide" => '\u{00F7}',
        b"uacute" => '\u{00FA}',
        b"uuml" => '\u{00FC}',
        b"ndash" => '\u{2013}',
        b"mdash" => '\u{2014}',
        b"lsquo" => '\u{2018}',
        b"rsquo" => '\u{2019}',
        b"sbquo" => '\u{201A}',
        b"ldquo" => '\u{201C}',
        b"rdquo" => '\u{201D}',
        b"bdquo" => '\u{201E}',
        b"dagger" => '\u{2020}',
        b"bull" => '\u{2022}',
        b"hellip" => '\u{2026}',
        b"prime" => '\u{2032}',
        b"lsaquo" => '\u{2039}',
        b"rsaquo" => '\u{203A}',
        b"euro" => '\u{20AC}',
        b"trade" => '\u{2122}',
        b"larr" => '\u{2190}',
        b"rarr" => '\u{2192}',
        _ => return None,
    };
    Some(ch)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn xml(input: &str) -> String {
        String::from_utf8(decode(input.as_bytes(), false).into_owned()).unwrap()
    }

    fn html(input: &str) -> String {
        String::from_utf8(decode(input.as_bytes(), true).into_owned()).unwrap()
    }

    #[test]
    fn test_no_entities_borrows() {
        assert!(matches!(decode(b"plain text", false), Cow::Borrowed(_)));
    }

    #[test]
    fn test_predefined_entities() {
        assert_eq!(xml("&lt;p&gt; &amp; &quot;q&quot; &apos;a&apos;"), "<p> & \"q\" 'a'");
    }

    #[test]
    fn test_numeric_references() {
        assert_eq!(xml("&#65;&#x42;&#X43;"), "ABC");
        assert_eq!(xml("&#x1F600;"), "\u{1F600}");
        assert_eq!(xml("&#0;"), "\u{FFFD}");
        assert_eq!(xml("&#xD800;"), "\u{FFFD}");
    }

    #[test]
    fn test_unknown_and_unterminated_are_literal() {
        assert_eq!(xml("AT&T"), "AT&T");
        assert_eq!(xml("&nbsp;"), "&nbsp;");
        assert_eq!(xml("a & b &amp c"), "a & b &amp c");
        assert_eq!(xml("&#;&#x;"), "&#;&#x;");
    }

    #[test]
    fn test_html_named_entities() {
        assert_eq!(html("a&nbsp;b &mdash; &hellip;"), "a\u{A0}b \u{2014} \u{2026}");
        assert_eq!(html("&copy; 2024"), "\u{A9} 2024");
        assert_eq!(html("&bogus;"), "&bogus;");
    }
}
