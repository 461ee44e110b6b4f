//! HTML to plain text for previews and search snippets.
//!
//! A single forward scan with no parser behind it. Output is bounded both in
//! bytes and in characters, and a multi-byte character is either copied whole
//! or not at all.

use crate::util::{find_ignore_ascii_case, starts_with_ignore_ascii_case};

/// Tags that separate words. Matched exactly, ignoring ASCII case.
const BREAK_TAGS: [&[u8]; 10] = [
    b"<p>",
    b"</p>",
    b"<div>",
    b"</div>",
    b"<blockquote>",
    b"</blockquote>",
    b"<br>",
    b"<br/>",
    b"<br />",
    b"</li>",
];

/// Elements whose contents are dropped entirely, with their end tags.
const SKIPPED_ELEMENTS: [(&[u8], &[u8]); 2] = [(b"<script", b"</script"), (b"<style", b"</style")];

/// Strips markup from `input`.
///
/// At most `max_characters` characters and `max_output_bytes` bytes are
/// produced. Whitespace runs and word-breaking tags collapse to one space,
/// and the result has no leading or trailing spaces.
///
/// ```
/// use feedparse::html::strip_html;
///
/// let text = strip_html(b"<p>Hello <b>World</b></p>", 4096, 300);
/// assert_eq!(text, b"Hello World");
/// ```
pub fn strip_html(input: &[u8], max_output_bytes: usize, max_characters: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len().min(max_output_bytes));
    let mut characters = 0;
    let mut depth = 0usize;
    let mut last_was_space = true;
    let mut pos = 0;

    while pos < input.len() {
        let byte = input[pos];

        if byte == b'<' {
            let rest = &input[pos..];
            if depth == 0 {
                if let Some(tag) = BREAK_TAGS.iter().find(|tag| starts_with_ignore_ascii_case(rest, tag)) {
                    pos += tag.len();
                    if !last_was_space {
                        if characters >= max_characters || out.len() + 1 > max_output_bytes {
                            break;
                        }
                        out.push(b' ');
                        characters += 1;
                        last_was_space = true;
                    }
                    continue;
                }
            }
            if let Some(end) = skipped_element_end(rest) {
                match end {
                    Some(len) => {
                        pos += len;
                        continue;
                    }
                    None => break,
                }
            }
            depth += 1;
            pos += 1;
            continue;
        }

        if byte == b'>' && depth > 0 {
            depth -= 1;
            pos += 1;
            continue;
        }

        if depth > 0 {
            pos += 1;
            continue;
        }

        if matches!(byte, b' ' | b'\t' | b'\r' | b'\n') {
            pos += 1;
            if last_was_space {
                continue;
            }
            if characters >= max_characters || out.len() + 1 > max_output_bytes {
                break;
            }
            out.push(b' ');
            characters += 1;
            last_was_space = true;
            continue;
        }

        let width = utf8_width(byte);
        if pos + width > input.len() || characters >= max_characters || out.len() + width > max_output_bytes {
            break;
        }
        out.extend_from_slice(&input[pos..pos + width]);
        characters += 1;
        last_was_space = false;
        pos += width;
    }

    while out.last() == Some(&b' ') {
        out.pop();
    }
    out
}

/// [`strip_html`] over a `&str`, bounded only by `max_characters`.
pub fn strip_html_str(input: &str, max_characters: Option<usize>) -> String {
    let stripped = strip_html(input.as_bytes(), input.len(), max_characters.unwrap_or(usize::MAX));
    String::from_utf8_lossy(&stripped).into_owned()
}

/// For `<script…>`/`<style…>` at the start of `rest`, the length up to and
/// including the matching end tag. `Some(None)` when the element never ends.
fn skipped_element_end(rest: &[u8]) -> Option<Option<usize>> {
    let (_, close) = SKIPPED_ELEMENTS.iter().find(|(open, _)| {
        starts_with_ignore_ascii_case(rest, open)
            && rest
                .get(open.len())
                .is_some_and(|&next| matches!(next, b'>' | b'/' | b' ' | b'\t' | b'\r' | b'\n'))
    })?;

    let Some(close_at) = find_ignore_ascii_case(rest, close) else {
        return Some(None);
    };
    let after_close = close_at + close.len();
    Some(memchr::memchr(b'>', &rest[after_close..]).map(|gt| after_close + gt + 1))
}

/// Byte length of the UTF-8 sequence a leading byte announces. Stray
/// continuation bytes count as one.
fn utf8_width(byte: u8) -> usize {
    match byte {
        0xF0..=0xF7 => 4,
        0xE0..=0xEF => 3,
        0xC0..=0xDF => 2,
        _ => 1,
    }
}
