//! Feed extraction: RSS, Atom, JSON Feed and RSS-in-JSON into one model.
//!
//! - **Sniffing** picks the format from the bytes ([`crate::sniff::feed_type`])
//! - **XML formats** drive the SAX engine with an extractor observer
//! - **JSON formats** read a `serde_json::Value`
//!
//! Every format fills an [`ArticleDraft`] per item. Finishing the draft fixes
//! the article ID, and the feed keeps one article per ID.
//!
//! # Example
//!
//! ```
//! use feedparse::{feed, RawInput};
//!
//! let input = RawInput::new(
//!     "https://example.com/feed.xml",
//!     r#"<rss><channel><title>News</title><item><title>Hi</title></item></channel></rss>"#,
//! );
//! let parsed = feed::parse_feed_sync(&input)?;
//! assert_eq!(parsed.title.as_deref(), Some("News"));
//! assert_eq!(parsed.articles.len(), 1);
//! # Ok::<(), feed::FeedError>(())
//! ```

mod atom;
mod author;
mod identity;
mod json;
mod parser;
mod rss;
mod types;

use thiserror::Error;

use crate::sax::SaxError;

pub use identity::{article_id, IdentityFields};
pub use parser::{
    parse_feed, parse_feed_sync, parse_feed_sync_with_config, parse_feed_with_callback,
    parse_feed_with_config,
};
pub use types::{ArticleDraft, ParsedArticle, ParsedAuthor, ParsedEnclosure, ParsedFeed};

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("{url}: not a recognised feed format")]
    UnsupportedFormat { url: String },

    #[error("{url}: feed is {size} bytes (max {max} bytes)")]
    TooLarge { url: String, size: usize, max: usize },

    #[error("{url}: malformed XML: {source}")]
    Malformed {
        url: String,
        #[source]
        source: SaxError,
    },

    #[error("{url}: invalid JSON: {source}")]
    InvalidJson {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{url}: JSON Feed version not found")]
    JsonFeedVersionNotFound { url: String },

    #[error("{url}: JSON Feed items not found")]
    JsonFeedItemsNotFound { url: String },

    #[error("{url}: JSON Feed title not found")]
    JsonFeedTitleNotFound { url: String },

    #[error("{url}: RSS-in-JSON channel not found")]
    RssChannelNotFound { url: String },

    #[error("{url}: RSS-in-JSON items not found")]
    RssItemsNotFound { url: String },

    #[error("Feed parse task failed: {0}")]
    TaskFailed(String),
}

impl FeedError {
    /// URL of the input that failed, if the error is tied to one.
    pub fn url(&self) -> Option<&str> {
        match self {
            FeedError::UnsupportedFormat { url }
            | FeedError::TooLarge { url, .. }
            | FeedError::Malformed { url, .. }
            | FeedError::InvalidJson { url, .. }
            | FeedError::JsonFeedVersionNotFound { url }
            | FeedError::JsonFeedItemsNotFound { url }
            | FeedError::JsonFeedTitleNotFound { url }
            | FeedError::RssChannelNotFound { url }
            | FeedError::RssItemsNotFound { url } => Some(url),
            FeedError::TaskFailed(_) => None,
        }
    }
}
