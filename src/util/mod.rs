//! Utility functions and types shared by the parsers.
//!
//! This module provides reusable pieces for:
//!
//! - **Attribute bags**: [`AttributeMap`], an ordered map with ASCII
//!   case-insensitive keys, used by OPML outlines and HTML tags
//! - **URL resolution**: turning relative `href`/`src` values into absolute URLs
//! - **Byte/text helpers**: case-insensitive searching and trimming
//!
//! # Examples
//!
//! ```
//! use feedparse::util::{resolve_url, AttributeMap};
//!
//! let mut attrs = AttributeMap::new();
//! attrs.insert("xmlUrl", "https://example.com/feed.xml");
//! assert_eq!(attrs.get("XMLURL"), Some("https://example.com/feed.xml"));
//!
//! let icon = resolve_url("/favicon.ico", "https://example.com/blog/");
//! assert_eq!(icon.as_deref(), Some("https://example.com/favicon.ico"));
//! ```

mod attributes;
mod text;
mod url;

pub use attributes::AttributeMap;
pub use text::{find_ignore_ascii_case, starts_with_ignore_ascii_case, trimmed_non_empty};
pub use self::url::{resolve_url, resolve_url_lenient};
