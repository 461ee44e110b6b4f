//! Article identity.
//!
//! An article ID is the lower-case hex SHA-256 of one identity string. The
//! string is picked from the article's fields by a fixed priority:
//!
//! | priority | identity string |
//! | --- | --- |
//! | 1 | `guid` |
//! | 2 | `permalink` (else `link`) followed by the published Unix seconds |
//! | 3 | `title` followed by the published Unix seconds |
//! | 4 | the published Unix seconds |
//! | 5 | `permalink` (else `link`) |
//! | 6 | `title` |
//! | 7 | `body` |
//! | 8 | the empty string |
//!
//! Empty fields count as absent. IDs are only unique within one feed.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

/// The fields of an article that take part in its identity.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityFields<'a> {
    pub guid: Option<&'a str>,
    pub permalink: Option<&'a str>,
    pub link: Option<&'a str>,
    pub title: Option<&'a str>,
    pub body: Option<&'a str>,
    pub date_published: Option<DateTime<Utc>>,
}

/// Computes the article ID for `fields`.
///
/// # Example
///
/// ```
/// use feedparse::feed::{article_id, IdentityFields};
///
/// let id = article_id(&IdentityFields {
///     guid: Some("urn:uuid:1234"),
///     ..Default::default()
/// });
/// assert_eq!(id, "961c6ab5defb654a5bb67a4611a608174d096d27f1435a82ef888a9081b825ce");
/// ```
pub fn article_id(fields: &IdentityFields<'_>) -> String {
    let hash = Sha256::digest(identity_string(fields).as_bytes());
    format!("{:x}", hash)
}

fn identity_string(fields: &IdentityFields<'_>) -> String {
    let present = |value: Option<&str>| value.filter(|v| !v.is_empty()).map(str::to_owned);

    let guid = present(fields.guid);
    let url = present(fields.permalink).or_else(|| present(fields.link));
    let title = present(fields.title);
    let timestamp = fields.date_published.map(|date| date.timestamp().to_string());

    if let Some(guid) = guid {
        return guid;
    }
    match (url, title, timestamp) {
        (Some(url), _, Some(ts)) => url + &ts,
        (None, Some(title), Some(ts)) => title + &ts,
        (None, None, Some(ts)) => ts,
        (Some(url), _, None) => url,
        (None, Some(title), None) => title,
        (None, None, None) => present(fields.body).unwrap_or_default(),
    }
}
