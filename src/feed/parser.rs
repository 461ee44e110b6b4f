use chrono::Utc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use super::types::ParsedFeed;
use super::{atom, json, rss, FeedError};
use crate::config::ParserConfig;
use crate::sniff::{self, FeedType};
use crate::RawInput;

/// Parses a feed with the default limits.
///
/// The format is sniffed from the bytes. Inputs that are not RSS, Atom, JSON
/// Feed or RSS-in-JSON fail with [`FeedError::UnsupportedFormat`].
pub fn parse_feed_sync(input: &RawInput) -> Result<ParsedFeed, FeedError> {
    parse_feed_sync_with_config(input, &ParserConfig::default())
}

pub fn parse_feed_sync_with_config(input: &RawInput, config: &ParserConfig) -> Result<ParsedFeed, FeedError> {
    if input.bytes.len() > config.max_input_bytes {
        return Err(FeedError::TooLarge {
            url: input.url.clone(),
            size: input.bytes.len(),
            max: config.max_input_bytes,
        });
    }

    let feed_type = sniff::feed_type(&input.bytes);
    let parsed_at = Utc::now();
    tracing::debug!(url = %input.url, ?feed_type, bytes = input.bytes.len(), "Parsing feed");

    let feed = match feed_type {
        FeedType::Rss => rss::parse(input, config.intern_capacity, parsed_at)?,
        FeedType::Atom => atom::parse(input, config.intern_capacity, parsed_at)?,
        FeedType::JsonFeed => json::parse_json_feed(input, parsed_at)?,
        FeedType::RssInJson => json::parse_rss_in_json(input, parsed_at)?,
        FeedType::NotAFeed => {
            return Err(FeedError::UnsupportedFormat {
                url: input.url.clone(),
            })
        }
    };

    tracing::debug!(url = %input.url, articles = feed.articles.len(), "Parsed feed");
    Ok(feed)
}

/// Parses on the blocking thread pool.
pub async fn parse_feed(input: RawInput) -> Result<ParsedFeed, FeedError> {
    parse_feed_with_config(input, ParserConfig::default()).await
}

pub async fn parse_feed_with_config(input: RawInput, config: ParserConfig) -> Result<ParsedFeed, FeedError> {
    tokio::task::spawn_blocking(move || parse_feed_sync_with_config(&input, &config))
        .await
        .map_err(|e| FeedError::TaskFailed(e.to_string()))?
}

/// Parses in a task on `handle` and hands the result to `callback`.
///
/// The callback runs exactly once, on a runtime worker. A parse that panics is
/// reported as [`FeedError::TaskFailed`].
pub fn parse_feed_with_callback<F>(input: RawInput, handle: &Handle, callback: F) -> JoinHandle<()>
where
    F: FnOnce(Result<ParsedFeed, FeedError>) + Send + 'static,
{
    let blocking = handle.clone();
    handle.spawn(async move {
        let url = input.url.clone();
        let result = blocking
            .spawn_blocking(move || parse_feed_sync(&input))
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(url = %url, error = %e, "Feed parse task failed");
                Err(FeedError::TaskFailed(e.to_string()))
            });
        callback(result);
    })
}
