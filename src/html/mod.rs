//! HTML pages: metadata, anchors, and plain-text stripping.
//!
//! - [`metadata`] collects `<link>`/`<meta>` tags and derives favicons, feed
//!   autodiscovery links, Open Graph and Twitter card images
//! - [`links`] collects every anchor with its text
//! - [`strip_html`] turns markup into a bounded plain-text snippet
//!
//! The extractors run the SAX engine in tag-soup mode and never fail.

pub mod links;
pub mod metadata;
mod strip;

pub use links::HtmlLink;
pub use metadata::HtmlMetadata;
pub use strip::{strip_html, strip_html_str};

use crate::sax::{SaxObserver, SaxParser};
use crate::RawInput;

/// Runs `observer` over the page in HTML mode and hands it back.
fn run_html<O: SaxObserver>(observer: O, input: &RawInput) -> O {
    let mut parser = SaxParser::html(observer);
    if let Err(e) = parser.feed(&input.bytes).and_then(|()| parser.finish()) {
        // HTML mode recovers from everything; keep whatever was collected
        tracing::debug!(url = %input.url, error = %e, "HTML scan ended early");
    }
    parser.into_observer()
}
