//! JSON Feed (1.0/1.1) and RSS-in-JSON extraction.
//!
//! Both formats are loosely typed in the wild (numeric IDs, lengths as
//! strings), so they are read from a [`serde_json::Value`] rather than derived
//! structs.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use super::types::{ArticleDraft, ArticleSet, FeedHeader, ParsedAuthor, ParsedEnclosure, ParsedFeed};
use super::FeedError;
use crate::date;
use crate::sniff::FeedType;
use crate::RawInput;

/// Matches `https://jsonfeed.org/version/1.1` and scheme mistakes alike.
const JSON_FEED_VERSION_MARKER: &str = "://jsonfeed.org/version/";

type Object = Map<String, Value>;

fn object(input: &RawInput) -> Result<Object, FeedError> {
    let value: Value = serde_json::from_slice(&input.bytes).map_err(|source| FeedError::InvalidJson {
        url: input.url.clone(),
        source,
    })?;
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(FeedError::UnsupportedFormat {
            url: input.url.clone(),
        }),
    }
}

fn string(map: &Object, key: &str) -> Option<String> {
    map.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_owned)
}

fn parse_date(map: &Object, key: &str) -> Option<DateTime<Utc>> {
    map.get(key).and_then(Value::as_str).and_then(date::parse)
}

pub(crate) fn parse_json_feed(input: &RawInput, parsed_at: DateTime<Utc>) -> Result<ParsedFeed, FeedError> {
    let root = object(input)?;
    let url = || input.url.clone();

    let has_version = root
        .get("version")
        .and_then(Value::as_str)
        .is_some_and(|v| v.contains(JSON_FEED_VERSION_MARKER));
    if !has_version {
        return Err(FeedError::JsonFeedVersionNotFound { url: url() });
    }
    let Some(items) = root.get("items").and_then(Value::as_array) else {
        return Err(FeedError::JsonFeedItemsNotFound { url: url() });
    };
    let Some(title) = root.get("title").and_then(Value::as_str) else {
        return Err(FeedError::JsonFeedTitleNotFound { url: url() });
    };

    let header = FeedHeader {
        title: Some(title.to_owned()).filter(|t| !t.is_empty()),
        link: string(&root, "home_page_url"),
        language: string(&root, "language"),
        description: string(&root, "description"),
    };

    let mut articles = ArticleSet::default();
    for item in items.iter().filter_map(Value::as_object) {
        if let Some(draft) = json_feed_item(item) {
            articles.insert(draft.finish(&input.url, parsed_at));
        }
    }
    Ok(header.into_feed(FeedType::JsonFeed, &input.url, articles))
}

/// Items without an ID or without content are dropped.
fn json_feed_item(item: &Object) -> Option<ArticleDraft> {
    let guid = match item.get("id")? {
        Value::String(id) => id.clone(),
        Value::Number(id) => id.to_string(),
        _ => return None,
    };
    let body = string(item, "content_html").or_else(|| string(item, "content_text"))?;

    let mut draft = ArticleDraft {
        guid: Some(guid),
        title: string(item, "title"),
        body: Some(body),
        link: string(item, "external_url"),
        permalink: string(item, "url"),
        date_published: parse_date(item, "date_published"),
        date_modified: parse_date(item, "date_modified"),
        language: string(item, "language"),
        ..Default::default()
    };

    for author in json_feed_authors(item) {
        draft.add_author(author);
    }
    let attachments = item.get("attachments").and_then(Value::as_array);
    for attachment in attachments.into_iter().flatten().filter_map(Value::as_object) {
        if let Some(enclosure) = json_feed_attachment(attachment) {
            draft.add_enclosure(enclosure);
        }
    }
    Some(draft)
}

/// `authors` (1.1) wins over `author` (1.0).
fn json_feed_authors(item: &Object) -> Vec<ParsedAuthor> {
    let to_author = |value: &Value| {
        let map = value.as_object()?;
        let author = ParsedAuthor {
            name: string(map, "name"),
            url: string(map, "url"),
            avatar_url: string(map, "avatar"),
            email_address: None,
        };
        (!author.is_empty()).then_some(author)
    };

    if let Some(authors) = item.get("authors").and_then(Value::as_array) {
        return authors.iter().filter_map(to_author).collect();
    }
    item.get("author").and_then(to_author).into_iter().collect()
}

fn json_feed_attachment(attachment: &Object) -> Option<ParsedEnclosure> {
    Some(ParsedEnclosure {
        url: string(attachment, "url")?,
        mime_type: Some(string(attachment, "mime_type")?),
        length: attachment.get("size_in_bytes").and_then(Value::as_u64),
        title: string(attachment, "title"),
    })
}

pub(crate) fn parse_rss_in_json(input: &RawInput, parsed_at: DateTime<Utc>) -> Result<ParsedFeed, FeedError> {
    let root = object(input)?;
    let url = || input.url.clone();

    let Some(channel) = root
        .get("rss")
        .and_then(Value::as_object)
        .and_then(|rss| rss.get("channel"))
        .and_then(Value::as_object)
    else {
        return Err(FeedError::RssChannelNotFound { url: url() });
    };

    // Items turn up in the channel or at the top level, as `item` or `items`
    let items = [channel, &root]
        .into_iter()
        .flat_map(|map| [map.get("item"), map.get("items")])
        .flatten()
        .find_map(Value::as_array);
    let Some(items) = items else {
        return Err(FeedError::RssItemsNotFound { url: url() });
    };

    let header = FeedHeader {
        title: string(channel, "title"),
        link: string(channel, "link"),
        language: string(channel, "language"),
        description: string(channel, "description"),
    };

    let mut articles = ArticleSet::default();
    for item in items.iter().filter_map(Value::as_object) {
        if let Some(draft) = rss_in_json_item(item) {
            articles.insert(draft.finish(&input.url, parsed_at));
        }
    }
    Ok(header.into_feed(FeedType::RssInJson, &input.url, articles))
}

fn rss_in_json_item(item: &Object) -> Option<ArticleDraft> {
    let title = string(item, "title");
    let body = string(item, "description");
    if title.is_none() && body.is_none() {
        return None;
    }

    let mut draft = ArticleDraft {
        guid: string(item, "guid"),
        title,
        body,
        link: string(item, "link"),
        date_published: parse_date(item, "pubDate"),
        ..Default::default()
    };
    if let Some(email) = string(item, "author") {
        draft.add_author(ParsedAuthor {
            email_address: Some(email),
            ..Default::default()
        });
    }
    if let Some(enclosure) = item.get("enclosure").and_then(Value::as_object).and_then(rss_in_json_enclosure) {
        draft.add_enclosure(enclosure);
    }
    Some(draft)
}

fn rss_in_json_enclosure(enclosure: &Object) -> Option<ParsedEnclosure> {
    let length = match enclosure.get("length") {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    };
    Some(ParsedEnclosure {
        url: string(enclosure, "url")?,
        mime_type: string(enclosure, "type"),
        length,
        title: None,
    })
}
