//! Feed, OPML and HTML parsing for feed readers.
//!
//! Everything takes a [`RawInput`] (bytes plus the URL they came from) and
//! returns an owned model or a typed error. Nothing here touches the network
//! or the filesystem, apart from [`config::ParserConfig::load`].
//!
//! - [`sniff`] guesses the format from the first bytes
//! - [`sax`] is the streaming XML / tag-soup HTML tokenizer the parsers share
//! - [`feed`] extracts RSS, Atom, JSON Feed and RSS-in-JSON
//! - [`opml`] reads and writes subscription lists
//! - [`html`] pulls page metadata and links, and strips markup to text
//! - [`date`] parses the date formats feeds actually use

pub mod config;
pub mod date;
pub mod feed;
pub mod html;
mod input;
pub mod opml;
pub mod sax;
pub mod sniff;
pub mod util;

pub use input::RawInput;
