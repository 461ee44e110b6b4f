//! OPML subscription lists: parsing into an outline tree and OPML 2.0 export.
//!
//! Parsing runs the XML SAX engine with an [`OpmlBuilder`] observer. Every
//! `<outline>` keeps its full attribute bag, so nothing a producer puts in the
//! file is lost, and [`OpmlItem::feed_specifier`] pulls out the
//! subscription-relevant parts.

use std::io::Cursor;

use anyhow::{Context, Result};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use serde::Serialize;
use thiserror::Error;

use crate::config::ParserConfig;
use crate::sax::{self, EndElement, Grammar, SaxContext, SaxError, SaxObserver, StartElement};
use crate::util::AttributeMap;
use crate::RawInput;

/// Errors that can occur during OPML parsing.
#[derive(Debug, Error)]
pub enum OpmlError {
    /// The root element is not `<opml>`.
    #[error("{url}: wrong format, root element is not <opml>")]
    WrongFormat { url: String },

    #[error("{url}: malformed OPML: {source}")]
    Malformed {
        url: String,
        #[source]
        source: SaxError,
    },

    /// Outline nesting exceeds the configured limit.
    #[error("{url}: OPML nesting depth exceeds maximum of {max} levels")]
    MaxDepthExceeded { url: String, max: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpmlDocument {
    pub url: String,
    pub title: Option<String>,
    pub items: Vec<OpmlItem>,
}

/// One `<outline>` element and its children.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OpmlItem {
    pub attributes: AttributeMap,
    pub children: Vec<OpmlItem>,
}

/// The subscription described by an outline with an `xmlUrl`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpmlFeedSpecifier {
    pub title: Option<String>,
    pub feed_description: Option<String>,
    pub home_page_url: Option<String>,
    pub feed_url: String,
}

impl OpmlItem {
    /// `title`, falling back to `text`.
    pub fn title(&self) -> Option<&str> {
        self.attributes
            .get_non_empty("title")
            .or_else(|| self.attributes.get_non_empty("text"))
    }

    /// `Some` when the outline carries a non-empty `xmlUrl` (any case).
    pub fn feed_specifier(&self) -> Option<OpmlFeedSpecifier> {
        let feed_url = self.attributes.get_non_empty("xmlUrl")?;
        Some(OpmlFeedSpecifier {
            title: self.title().map(str::to_owned),
            feed_description: self.attributes.get_non_empty("description").map(str::to_owned),
            home_page_url: self.attributes.get_non_empty("htmlUrl").map(str::to_owned),
            feed_url: feed_url.to_owned(),
        })
    }

    /// An outline without a feed is a folder, whether or not it has children.
    pub fn is_folder(&self) -> bool {
        self.feed_specifier().is_none()
    }
}

impl OpmlDocument {
    /// Every feed in the tree, depth first.
    pub fn feed_specifiers(&self) -> Vec<OpmlFeedSpecifier> {
        fn walk(items: &[OpmlItem], out: &mut Vec<OpmlFeedSpecifier>) {
            for item in items {
                out.extend(item.feed_specifier());
                walk(&item.children, out);
            }
        }
        let mut out = Vec::new();
        walk(&self.items, &mut out);
        out
    }
}

pub fn parse_opml(input: &RawInput) -> Result<OpmlDocument, OpmlError> {
    parse_opml_with_config(input, &ParserConfig::default())
}

pub fn parse_opml_with_config(input: &RawInput, config: &ParserConfig) -> Result<OpmlDocument, OpmlError> {
    let builder = OpmlBuilder::new(config.max_opml_depth);
    let builder = sax::parse_with_intern_capacity(Grammar::Xml, builder, &input.bytes, config.intern_capacity)
        .map_err(|source| OpmlError::Malformed {
            url: input.url.clone(),
            source,
        })?;
    builder.into_document(&input.url)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Abort {
    WrongFormat,
    TooDeep,
}

/// SAX observer that builds the outline tree.
#[derive(Debug)]
struct OpmlBuilder {
    max_depth: usize,
    seen_root: bool,
    in_head: bool,
    title: Option<String>,
    /// Open outlines, innermost last.
    open: Vec<OpmlItem>,
    items: Vec<OpmlItem>,
    abort: Option<Abort>,
}

impl OpmlBuilder {
    fn new(max_depth: usize) -> Self {
        Self {
            max_depth,
            seen_root: false,
            in_head: false,
            title: None,
            open: Vec::new(),
            items: Vec::new(),
            abort: None,
        }
    }

    fn into_document(self, url: &str) -> Result<OpmlDocument, OpmlError> {
        match self.abort {
            Some(Abort::WrongFormat) => Err(OpmlError::WrongFormat { url: url.to_owned() }),
            Some(Abort::TooDeep) => Err(OpmlError::MaxDepthExceeded {
                url: url.to_owned(),
                max: self.max_depth,
            }),
            None => Ok(OpmlDocument {
                url: url.to_owned(),
                title: self.title,
                items: self.items,
            }),
        }
    }

    fn stop(&mut self, ctx: &mut SaxContext, abort: Abort) {
        self.abort = Some(abort);
        ctx.cancel();
    }
}

impl SaxObserver for OpmlBuilder {
    fn start_element(&mut self, ctx: &mut SaxContext, element: &StartElement<'_>) {
        let name = element.local_name;
        if !self.seen_root {
            self.seen_root = true;
            if !name.eq_ignore_ascii_case("opml") {
                self.stop(ctx, Abort::WrongFormat);
            }
            return;
        }

        if name.eq_ignore_ascii_case("outline") {
            if self.open.len() >= self.max_depth {
                tracing::warn!(max = self.max_depth, "OPML outline nesting too deep, rejecting");
                self.stop(ctx, Abort::TooDeep);
                return;
            }
            self.open.push(OpmlItem {
                attributes: element.attribute_map(ctx),
                children: Vec::new(),
            });
        } else if name.eq_ignore_ascii_case("head") {
            self.in_head = true;
        } else if self.in_head && name.eq_ignore_ascii_case("title") {
            ctx.begin_storing_characters();
        }
    }

    fn end_element(&mut self, ctx: &mut SaxContext, element: &EndElement<'_>) {
        let name = element.local_name;
        if name.eq_ignore_ascii_case("outline") {
            if let Some(item) = self.open.pop() {
                match self.open.last_mut() {
                    Some(parent) => parent.children.push(item),
                    None => self.items.push(item),
                }
            }
        } else if name.eq_ignore_ascii_case("head") {
            self.in_head = false;
        } else if self.in_head && name.eq_ignore_ascii_case("title") && self.title.is_none() {
            self.title = ctx.current_trimmed_string();
        }
    }
}

/// Serialises a document as OPML 2.0.
///
/// Outline attributes are written in their stored order and spelling, so the
/// output parses back to the same tree.
pub fn export_opml(document: &OpmlDocument) -> Result<String> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .context("Failed to write XML declaration")?;

    let mut opml = BytesStart::new("opml");
    opml.push_attribute(("version", "2.0"));
    writer
        .write_event(Event::Start(opml))
        .context("Failed to write opml element")?;

    writer
        .write_event(Event::Start(BytesStart::new("head")))
        .context("Failed to write head element")?;
    if let Some(title) = &document.title {
        writer
            .write_event(Event::Start(BytesStart::new("title")))
            .context("Failed to write title element")?;
        writer
            .write_event(Event::Text(BytesText::new(title)))
            .context("Failed to write title text")?;
        writer
            .write_event(Event::End(BytesEnd::new("title")))
            .context("Failed to write title end")?;
    }
    writer
        .write_event(Event::End(BytesEnd::new("head")))
        .context("Failed to write head end")?;

    writer
        .write_event(Event::Start(BytesStart::new("body")))
        .context("Failed to write body element")?;
    for item in &document.items {
        write_outline(&mut writer, item)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new("body")))
        .context("Failed to write body end")?;

    writer
        .write_event(Event::End(BytesEnd::new("opml")))
        .context("Failed to write opml end")?;

    let result = writer.into_inner().into_inner();
    String::from_utf8(result).context("Generated OPML contains invalid UTF-8")
}

fn write_outline(writer: &mut Writer<Cursor<Vec<u8>>>, item: &OpmlItem) -> Result<()> {
    let mut outline = BytesStart::new("outline");
    for (key, value) in item.attributes.iter() {
        outline.push_attribute((key, value));
    }

    if item.children.is_empty() {
        writer
            .write_event(Event::Empty(outline))
            .context("Failed to write outline element")?;
        return Ok(());
    }

    writer
        .write_event(Event::Start(outline))
        .context("Failed to write outline element")?;
    for child in &item.children {
        write_outline(writer, child)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new("outline")))
        .context("Failed to write outline end")?;
    Ok(())
}
