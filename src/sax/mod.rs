//! Streaming SAX-style tokenizer for XML and tag-soup HTML.
//!
//! A [`SaxParser`] accepts input in chunks and reports what it finds to a
//! [`SaxObserver`] as it goes. Nothing is built up behind the observer's back:
//! the observer decides which character data to keep (through
//! [`SaxContext`]) and what model to build from the events.
//!
//! # Architecture
//!
//! ```text
//! feed(bytes) ──> pending buffer ──> tokenizer::scan ──> SaxParser ──> SaxObserver
//!                                         │                  │
//!                                  one complete token   names interned,
//!                                  or "need more"       namespaces resolved,
//!                                                       text entity-decoded
//! ```
//!
//! Two grammars share the machinery:
//!
//! - [`Grammar::Xml`] enforces well-formedness and resolves namespaces.
//!   Mismatched tags, unterminated markup, and a missing root abort the parse.
//! - [`Grammar::Html`] never fails. Names are lower-cased, void elements
//!   self-close, `script`/`style` are raw text, and unbalanced tags are
//!   repaired.
//!
//! # Example
//!
//! ```
//! use feedparse::sax::{self, Grammar, SaxCollector, SaxEvent};
//!
//! let collector = sax::parse(Grammar::Xml, SaxCollector::new(), b"<a x='1'>hi</a>").unwrap();
//! let names: Vec<_> = collector.events().iter().filter_map(SaxEvent::local_name).collect();
//! assert_eq!(names, ["a", "a"]);
//! ```

mod collector;
mod context;
mod entities;
mod event;
mod html;
mod intern;
mod namespace;
mod parser;
mod tokenizer;

pub use collector::SaxCollector;
pub use context::SaxContext;
pub use event::{Attribute, EndElement, OwnedAttribute, SaxEvent, StartElement};
pub use namespace::XML_NAMESPACE;
pub use parser::{SaxParser, DEFAULT_INTERN_CAPACITY};

use thiserror::Error;

/// Which tokenizer rules apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Grammar {
    Xml,
    Html,
}

/// Lifecycle of a [`SaxParser`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserState {
    Idle,
    Parsing,
    Finished,
    Cancelled,
    /// A tokenizer error ended the parse.
    Failed,
}

/// A tokenizer error with the byte offset where the offending token starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} at byte {offset}")]
pub struct SaxError {
    pub kind: SaxErrorKind,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SaxErrorKind {
    #[error("end tag </{found}> does not match open element <{expected}>")]
    MismatchedEndTag { expected: String, found: String },

    #[error("end tag </{0}> with no open element")]
    UnexpectedEndTag(String),

    #[error("unexpected end of input inside markup")]
    UnexpectedEof,

    #[error("element <{0}> is not closed at end of input")]
    UnclosedElement(String),

    #[error("document has no root element")]
    NoRootElement,

    #[error("malformed tag")]
    MalformedTag,

    #[error("malformed attribute")]
    MalformedAttribute,

    #[error("invalid UTF-8 in element or attribute name")]
    InvalidUtf8,

    #[error("parser is not accepting input")]
    NotParsing,
}

/// Receives events from a [`SaxParser`].
///
/// Callbacks must not call back into the parser; [`SaxContext`] is the only
/// way to interact with the engine mid-callback.
pub trait SaxObserver {
    fn start_element(&mut self, ctx: &mut SaxContext, element: &StartElement<'_>);

    fn end_element(&mut self, ctx: &mut SaxContext, element: &EndElement<'_>);

    /// Decoded character data. Never called with an empty slice. A run of
    /// text may arrive in several calls (text, CDATA, text).
    fn characters(&mut self, ctx: &mut SaxContext, text: &[u8]) {
        let _ = (ctx, text);
    }

    /// Called once after the last element closes. Not called after
    /// cancellation.
    fn end_of_document(&mut self, ctx: &mut SaxContext) {
        let _ = ctx;
    }
}

impl<O: SaxObserver + ?Sized> SaxObserver for &mut O {
    fn start_element(&mut self, ctx: &mut SaxContext, element: &StartElement<'_>) {
        (**self).start_element(ctx, element)
    }

    fn end_element(&mut self, ctx: &mut SaxContext, element: &EndElement<'_>) {
        (**self).end_element(ctx, element)
    }

    fn characters(&mut self, ctx: &mut SaxContext, text: &[u8]) {
        (**self).characters(ctx, text)
    }

    fn end_of_document(&mut self, ctx: &mut SaxContext) {
        (**self).end_of_document(ctx)
    }
}

/// Parses a complete document in one call and hands the observer back.
///
/// # Errors
///
/// Returns the first [`SaxError`] in XML mode. HTML mode does not fail.
pub fn parse<O: SaxObserver>(grammar: Grammar, observer: O, bytes: &[u8]) -> Result<O, SaxError> {
    parse_with_intern_capacity(grammar, observer, bytes, DEFAULT_INTERN_CAPACITY)
}

/// [`parse`] with an explicit name-interner capacity.
pub fn parse_with_intern_capacity<O: SaxObserver>(
    grammar: Grammar,
    observer: O,
    bytes: &[u8],
    intern_capacity: usize,
) -> Result<O, SaxError> {
    let mut parser = SaxParser::with_intern_capacity(grammar, observer, intern_capacity);
    parser.feed(bytes)?;
    parser.finish()?;
    Ok(parser.into_observer())
}
