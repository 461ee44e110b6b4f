//! Lenient date parsing for feed timestamps.
//!
//! Feeds carry dates in two broad families: RFC 822 (`pubDate`, e.g.
//! `Tue, 10 Jun 2003 04:00:00 GMT`) and W3C/ISO 8601 (`updated`, `dc:date`,
//! e.g. `2003-06-10T04:00:00Z`). Publishers get both wrong in creative ways,
//! so this parser scans byte by byte and keeps whatever fields it can find
//! instead of rejecting the string.
//!
//! # Matcher chain
//!
//! Matchers are tried in a fixed order and the first one producing a date wins:
//!
//! 1. W3C, when the first non-whitespace bytes look like `YYYY-`
//! 2. RFC 822, when the input contains a space or a comma
//! 3. W3C again, unconditionally, as a best guess
//!
//! # Example
//!
//! ```
//! use chrono::{TimeZone, Utc};
//!
//! let date = feedparse::date::parse("Wed, 02 Oct 2002 08:00:00 EST");
//! assert_eq!(date, Some(Utc.with_ymd_and_hms(2002, 10, 2, 13, 0, 0).unwrap()));
//! ```

mod zones;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

/// Shortest input worth scanning.
const MIN_DATE_LEN: usize = 6;

/// Longest input worth scanning. Anything longer is not a date.
const MAX_DATE_LEN: usize = 150;

type Matcher = fn(&[u8]) -> Option<DateTime<Utc>>;

const MATCHERS: [Matcher; 3] = [match_w3c, match_pub_date, parse_w3c];

/// Parses an RFC 822 or W3C date string.
///
/// Returns `None` when nothing date-like can be recovered. Never panics.
pub fn parse(input: &str) -> Option<DateTime<Utc>> {
    parse_bytes(input.as_bytes())
}

/// Parses a date from raw bytes, as delivered by SAX character callbacks.
///
/// The bytes are treated as ASCII; non-ASCII bytes are skipped like any other
/// separator.
pub fn parse_bytes(bytes: &[u8]) -> Option<DateTime<Utc>> {
    if !(MIN_DATE_LEN..=MAX_DATE_LEN).contains(&bytes.len()) {
        return None;
    }
    MATCHERS.iter().find_map(|matcher| matcher(bytes))
}

fn match_w3c(bytes: &[u8]) -> Option<DateTime<Utc>> {
    looks_like_w3c(bytes).then(|| parse_w3c(bytes)).flatten()
}

fn match_pub_date(bytes: &[u8]) -> Option<DateTime<Utc>> {
    looks_like_pub_date(bytes)
        .then(|| parse_pub_date(bytes))
        .flatten()
}

fn looks_like_w3c(bytes: &[u8]) -> bool {
    let Some(start) = bytes.iter().position(|b| !is_date_whitespace(*b)) else {
        return false;
    };
    match bytes.get(start..start + 5) {
        Some([y1, y2, y3, y4, b'-']) => [y1, y2, y3, y4].iter().all(|b| b.is_ascii_digit()),
        _ => false,
    }
}

fn looks_like_pub_date(bytes: &[u8]) -> bool {
    bytes.iter().any(|b| *b == b' ' || *b == b',')
}

fn is_date_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\r' | b'\n' | b'\t')
}

// ============================================================================
// Field scanning
// ============================================================================

/// Cursor over a date string.
///
/// Every read starts at an explicit index and records the index of the last
/// byte it examined in `last`, so the next read can begin at `next()`. A read
/// that never enters its loop (start past the end) leaves `last` untouched.
struct Scanner<'a> {
    bytes: &'a [u8],
    last: usize,
}

impl<'a> Scanner<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, last: 0 }
    }

    fn next(&self) -> usize {
        self.last + 1
    }

    /// Reads up to `max_digits` consecutive digits, skipping any non-digit
    /// bytes before them. Returns the value and the number of digits read.
    fn digits(&mut self, start: usize, max_digits: usize) -> Option<(i64, usize)> {
        let mut value = 0i64;
        let mut found = 0;

        for index in start..self.bytes.len() {
            self.last = index;
            let ch = self.bytes[index];
            if !ch.is_ascii_digit() {
                if found == 0 {
                    continue;
                }
                break;
            }
            value = value * 10 + i64::from(ch - b'0');
            found += 1;
            if found >= max_digits {
                break;
            }
        }

        (found > 0).then_some((value, found))
    }

    fn number(&mut self, start: usize, max_digits: usize) -> Option<i64> {
        self.digits(start, max_digits).map(|(value, _)| value)
    }

    /// Reads a month name, matching on as few letters as disambiguate it.
    fn month(&mut self, start: usize) -> Option<u32> {
        let mut letters = [0u8; 3];
        let mut found = 0;

        for index in start..self.bytes.len() {
            self.last = index;
            let ch = self.bytes[index].to_ascii_lowercase();
            if !ch.is_ascii_alphabetic() {
                if found == 0 {
                    continue;
                }
                break;
            }

            if found == 0 {
                match ch {
                    b'f' => return Some(2),
                    b's' => return Some(9),
                    b'o' => return Some(10),
                    b'n' => return Some(11),
                    b'd' => return Some(12),
                    _ => {}
                }
            }

            letters[found] = ch;
            found += 1;
            if found >= 3 {
                break;
            }
        }

        if found < 2 {
            return None;
        }

        let month = match letters {
            [b'j', b'u', b'n'] => 6,
            [b'j', b'u', _] => 7,
            [b'm', _, b'y'] => 5,
            [b'm', ..] => 3,
            [b'a', b'u', _] => 8,
            [b'a', ..] => 4,
            _ => 1,
        };
        Some(month)
    }
}

/// Reads a trailing zone: `Z`, a numeric offset, or an abbreviation.
/// Unknown or missing zones mean UTC.
fn zone_offset(bytes: &[u8], start: usize) -> i32 {
    let mut chars = [0u8; 5];
    let mut found = 0;
    let mut has_alpha = false;

    for &ch in bytes.iter().skip(start) {
        if ch == b':' || ch == b' ' {
            continue;
        }
        let alpha = ch.is_ascii_alphabetic();
        has_alpha |= alpha;
        if alpha || ch.is_ascii_digit() || ch == b'+' || ch == b'-' {
            chars[found] = ch;
            found += 1;
        }
        if found >= chars.len() {
            break;
        }
    }

    let chars = &chars[..found];
    if matches!(chars.first(), None | Some(b'Z') | Some(b'z')) {
        return 0;
    }

    if has_alpha {
        let name = std::str::from_utf8(chars).unwrap_or_default();
        return zones::offset_for_abbreviation(name).unwrap_or_else(|| {
            tracing::debug!(zone = name, "Unknown time zone abbreviation, assuming UTC");
            0
        });
    }

    let sign = if chars[0] == b'-' { -1 } else { 1 };
    let mut scanner = Scanner::new(chars);
    let hours = scanner.number(0, 2).unwrap_or(0);
    let minutes = scanner.number(scanner.next(), 2).unwrap_or(0);
    // Both are at most two digits, so this always fits.
    sign * (hours * 3600 + minutes * 60) as i32
}

// ============================================================================
// Matchers
// ============================================================================

/// `2010-11-17T08:40:07.123-05:00` and its many partial forms.
fn parse_w3c(bytes: &[u8]) -> Option<DateTime<Utc>> {
    let mut scanner = Scanner::new(bytes);

    let year = scanner.number(0, 4)?;
    let month = scanner.number(scanner.next(), 2)?;
    let day = scanner.number(scanner.next(), 2)?;
    let hour = scanner.number(scanner.next(), 2).unwrap_or(0);
    let minute = scanner.number(scanner.next(), 2).unwrap_or(0);
    let second = match bytes.get(scanner.next()) {
        // `08:40-05:00`: the offset follows the minutes directly
        Some(b'+') | Some(b'-') => 0,
        _ => scanner.number(scanner.next(), 2).unwrap_or(0),
    };

    let mut index = scanner.next();
    let mut millis = 0;
    if bytes.get(index) == Some(&b'.') {
        index += 1;
        let fraction = bytes[index..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count();
        let significant = &bytes[index..index + fraction.min(3)];
        let value = significant
            .iter()
            .fold(0i64, |acc, b| acc * 10 + i64::from(b - b'0'));
        millis = value * 10i64.pow(3 - significant.len() as u32);
        index += fraction;
    }

    let offset = zone_offset(bytes, index);
    assemble(year, month, day, hour, minute, second, millis, offset)
}

/// `Tue, 10 Jun 2003 04:00:00 GMT` and its many partial forms.
fn parse_pub_date(bytes: &[u8]) -> Option<DateTime<Utc>> {
    let mut scanner = Scanner::new(bytes);

    let day = scanner.number(0, 2).unwrap_or(1);
    let month = scanner.month(scanner.next()).unwrap_or(1);
    let (year, year_digits) = scanner.digits(scanner.next(), 4)?;
    let year = match (year_digits, year) {
        (1..=2, y) if y < 50 => 2000 + y,
        (1..=2, y) => 1900 + y,
        (_, y) => y,
    };
    let hour = scanner.number(scanner.next(), 2).unwrap_or(0);
    let minute = scanner.number(scanner.next(), 2).unwrap_or(0);

    let second = if bytes.get(scanner.next()) == Some(&b':') {
        scanner.number(scanner.next(), 2).unwrap_or(0)
    } else {
        0
    };

    let index = scanner.next();
    let offset = if bytes.get(index) == Some(&b' ') {
        zone_offset(bytes, index)
    } else {
        0
    };

    assemble(year, i64::from(month), day, hour, minute, second, 0, offset)
}

/// Builds the instant the way `timegm` would: day, hour, minute and second
/// overflow roll into the next unit. Only the month must be in range.
#[allow(clippy::too_many_arguments)]
fn assemble(
    year: i64,
    month: i64,
    day: i64,
    hour: i64,
    minute: i64,
    second: i64,
    millis: i64,
    offset_seconds: i32,
) -> Option<DateTime<Utc>> {
    let month = u32::try_from(month).ok().filter(|m| (1..=12).contains(m))?;
    let year = i32::try_from(year).ok()?;

    let start_of_month = NaiveDate::from_ymd_opt(year, month, 1)?.and_hms_opt(0, 0, 0)?;
    let seconds = (day - 1) * 86_400 + hour * 3_600 + minute * 60 + second
        - i64::from(offset_seconds);

    let naive = start_of_month
        .checked_add_signed(Duration::seconds(seconds))?
        .checked_add_signed(Duration::milliseconds(millis))?;
    Some(Utc.from_utc_datetime(&naive))
}
