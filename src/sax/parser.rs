use std::borrow::Cow;
use std::sync::Arc;

use tracing::{debug, warn};

use super::context::SaxContext;
use super::entities;
use super::event::{split_qualified, Attribute, EndElement, StartElement};
use super::html;
use super::namespace::NamespaceStack;
use super::tokenizer::{self, RawAttribute, Scan, Token};
use super::{Grammar, ParserState, SaxError, SaxErrorKind, SaxObserver};

/// Interner capacity used when none is configured.
pub const DEFAULT_INTERN_CAPACITY: usize = 512;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Clone)]
struct OpenElement {
    name: Arc<str>,
    local_name: Arc<str>,
    prefix: Option<Arc<str>>,
    uri: Option<Arc<str>>,
}

impl OpenElement {
    fn unqualified(name: Arc<str>) -> Self {
        Self {
            local_name: Arc::clone(&name),
            name,
            prefix: None,
            uri: None,
        }
    }

    fn as_start<'a>(&'a self, attributes: &'a [Attribute<'a>]) -> StartElement<'a> {
        StartElement {
            name: &self.name,
            local_name: &self.local_name,
            prefix: self.prefix.as_deref(),
            uri: self.uri.as_deref(),
            attributes,
        }
    }

    fn as_end(&self) -> EndElement<'_> {
        EndElement {
            name: &self.name,
            local_name: &self.local_name,
            prefix: self.prefix.as_deref(),
            uri: self.uri.as_deref(),
        }
    }
}

/// Incremental push parser.
///
/// Feed bytes as they arrive with [`feed`](Self::feed), then call
/// [`finish`](Self::finish) once. Events are delivered synchronously from
/// inside those calls. A parser handles exactly one document.
///
/// # Example
///
/// ```
/// use feedparse::sax::{SaxCollector, SaxParser};
///
/// let mut parser = SaxParser::xml(SaxCollector::new());
/// parser.feed(b"<rss><chan").unwrap();
/// parser.feed(b"nel/></rss>").unwrap();
/// parser.finish().unwrap();
/// assert_eq!(parser.observer().event_count(), 5);
/// ```
pub struct SaxParser<O> {
    grammar: Grammar,
    observer: O,
    ctx: SaxContext,
    state: ParserState,
    buffer: Vec<u8>,
    /// Stream offset of `buffer[0]`.
    offset: usize,
    /// Bytes of the pending token already searched by the tokenizer.
    scanned: usize,
    open: Vec<OpenElement>,
    namespaces: NamespaceStack,
    bom_checked: bool,
    seen_root: bool,
    root_closed: bool,
    trailing_logged: bool,
    /// Open `script`/`style` element in HTML mode.
    raw_text: Option<Arc<str>>,
}

impl<O: SaxObserver> SaxParser<O> {
    pub fn new(grammar: Grammar, observer: O) -> Self {
        Self::with_intern_capacity(grammar, observer, DEFAULT_INTERN_CAPACITY)
    }

    pub fn xml(observer: O) -> Self {
        Self::new(Grammar::Xml, observer)
    }

    pub fn html(observer: O) -> Self {
        Self::new(Grammar::Html, observer)
    }

    pub fn with_intern_capacity(grammar: Grammar, observer: O, intern_capacity: usize) -> Self {
        Self {
            grammar,
            observer,
            ctx: SaxContext::new(intern_capacity),
            state: ParserState::Idle,
            buffer: Vec::new(),
            offset: 0,
            scanned: 0,
            open: Vec::new(),
            namespaces: NamespaceStack::default(),
            bom_checked: false,
            seen_root: false,
            root_closed: false,
            trailing_logged: false,
            raw_text: None,
        }
    }

    pub fn grammar(&self) -> Grammar {
        self.grammar
    }

    pub fn state(&self) -> ParserState {
        self.state
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }

    pub fn into_observer(self) -> O {
        self.observer
    }

    /// Consumes the next chunk of input.
    ///
    /// Incomplete tokens at the end of the chunk are held until more input
    /// arrives. After cancellation this is a no-op.
    ///
    /// # Errors
    ///
    /// In XML mode, returns the first well-formedness error; the parser is
    /// then [`Failed`](ParserState::Failed). Returns
    /// [`SaxErrorKind::NotParsing`] after `finish` or a failure.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<(), SaxError> {
        if !self.begin()? {
            return Ok(());
        }
        self.buffer.extend_from_slice(bytes);
        self.pump(false)
    }

    /// Ends the document: flushes held input, checks that every element was
    /// closed (XML) or closes them (HTML), and delivers `end_of_document`.
    ///
    /// # Errors
    ///
    /// Same as [`feed`](Self::feed), plus unclosed elements and a missing
    /// root element in XML mode.
    pub fn finish(&mut self) -> Result<(), SaxError> {
        if !self.begin()? {
            return Ok(());
        }
        self.pump(true)?;
        if self.state != ParserState::Parsing {
            return Ok(());
        }

        match self.grammar {
            Grammar::Xml => {
                if let Some(name) = self.open.last().map(|element| element.name.to_string()) {
                    return Err(self.fail(SaxErrorKind::UnclosedElement(name), self.offset));
                }
                if !self.seen_root {
                    return Err(self.fail(SaxErrorKind::NoRootElement, self.offset));
                }
            }
            Grammar::Html => {
                while let Some(element) = self.open.pop() {
                    self.emit_end(&element);
                }
            }
        }

        if self.ctx.is_cancelled() {
            self.state = ParserState::Cancelled;
            return Ok(());
        }
        self.observer.end_of_document(&mut self.ctx);
        self.state = ParserState::Finished;
        Ok(())
    }

    /// Stops event delivery. Later `feed`/`finish` calls do nothing.
    pub fn cancel(&mut self) {
        if matches!(self.state, ParserState::Idle | ParserState::Parsing) {
            self.state = ParserState::Cancelled;
            self.ctx.cancel();
            self.buffer.clear();
        }
    }

    /// `Ok(false)` when cancelled.
    fn begin(&mut self) -> Result<bool, SaxError> {
        match self.state {
            ParserState::Cancelled => Ok(false),
            ParserState::Finished | ParserState::Failed => Err(SaxError {
                kind: SaxErrorKind::NotParsing,
                offset: self.offset,
            }),
            ParserState::Idle | ParserState::Parsing => {
                self.state = ParserState::Parsing;
                Ok(true)
            }
        }
    }

    fn fail(&mut self, kind: SaxErrorKind, offset: usize) -> SaxError {
        self.state = ParserState::Failed;
        SaxError { kind, offset }
    }

    fn pump(&mut self, at_eof: bool) -> Result<(), SaxError> {
        if !self.bom_checked {
            let maybe_partial_bom =
                self.buffer.len() < UTF8_BOM.len() && UTF8_BOM.starts_with(&self.buffer);
            if maybe_partial_bom && !at_eof {
                return Ok(());
            }
            if self.buffer.starts_with(UTF8_BOM) {
                self.buffer.drain(..UTF8_BOM.len());
                self.offset += UTF8_BOM.len();
            }
            self.bom_checked = true;
        }

        let buffer = std::mem::take(&mut self.buffer);
        let mut consumed = 0;
        let result = self.drain_tokens(&buffer, &mut consumed, at_eof);
        self.buffer = buffer;

        if self.state == ParserState::Parsing {
            self.buffer.drain(..consumed);
            self.offset += consumed;
        } else {
            self.buffer.clear();
        }
        result
    }

    fn drain_tokens(
        &mut self,
        buffer: &[u8],
        consumed: &mut usize,
        at_eof: bool,
    ) -> Result<(), SaxError> {
        loop {
            if self.ctx.is_cancelled() {
                self.state = ParserState::Cancelled;
            }
            if self.state != ParserState::Parsing {
                return Ok(());
            }

            let at = self.offset + *consumed;
            let raw_text = self.raw_text.clone();
            let pending = &buffer[*consumed..];
            match tokenizer::scan(pending, self.grammar, raw_text.as_deref(), self.scanned, at_eof) {
                Scan::NeedMore => {
                    self.scanned = pending.len();
                    return Ok(());
                }
                Scan::Discard => {
                    debug!(offset = at, "Discarding unterminated tag at end of input");
                    *consumed = buffer.len();
                    return Ok(());
                }
                Scan::Error(kind) if self.root_closed => {
                    debug!(offset = at, error = %kind, "Ignoring malformed content after root element");
                    *consumed = buffer.len();
                    return Ok(());
                }
                Scan::Error(kind) => return Err(self.fail(kind, at)),
                Scan::Token { token, len } => {
                    self.scanned = 0;
                    *consumed += len;
                    self.handle(token, at)?;
                }
            }
        }
    }

    fn handle(&mut self, token: Token<'_>, at: usize) -> Result<(), SaxError> {
        if self.root_closed {
            self.note_trailing_content(&token, at);
            return Ok(());
        }

        match token {
            Token::Markup => {}
            Token::Text(raw) => {
                let decoded = entities::decode(raw, self.grammar == Grammar::Html);
                self.characters(&decoded);
            }
            Token::RawText(raw) => {
                self.raw_text = None;
                self.characters(raw);
            }
            Token::CData(raw) => self.characters(raw),
            Token::StartTag {
                name,
                attributes,
                self_closing,
            } => match self.grammar {
                Grammar::Xml => self.xml_start_tag(name, attributes, self_closing, at)?,
                Grammar::Html => self.html_start_tag(name, attributes, self_closing, at),
            },
            Token::EndTag { name } => match self.grammar {
                Grammar::Xml => self.xml_end_tag(name, at)?,
                Grammar::Html => self.html_end_tag(name, at),
            },
        }
        Ok(())
    }

    fn note_trailing_content(&mut self, token: &Token<'_>, at: usize) {
        let significant = match token {
            Token::Markup => false,
            Token::Text(text) => !text.iter().all(u8::is_ascii_whitespace),
            _ => true,
        };
        if significant && !self.trailing_logged {
            debug!(offset = at, "Ignoring content after root element");
            self.trailing_logged = true;
        }
    }

    fn characters(&mut self, text: &[u8]) {
        if text.is_empty() || self.ctx.is_cancelled() {
            return;
        }
        if self.grammar == Grammar::Xml && self.open.is_empty() {
            return;
        }
        self.ctx.append_characters(text);
        self.observer.characters(&mut self.ctx, text);
    }

    fn emit_start(&mut self, element: &OpenElement, attributes: &[Attribute<'_>]) {
        if self.ctx.is_cancelled() {
            return;
        }
        self.observer
            .start_element(&mut self.ctx, &element.as_start(attributes));
    }

    fn emit_end(&mut self, element: &OpenElement) {
        if self.ctx.is_cancelled() {
            return;
        }
        self.observer.end_element(&mut self.ctx, &element.as_end());
        self.ctx.end_storing_characters();
    }

    // ------------------------------------------------------------------------
    // XML
    // ------------------------------------------------------------------------

    fn xml_start_tag(
        &mut self,
        name: &[u8],
        region: &[u8],
        self_closing: bool,
        at: usize,
    ) -> Result<(), SaxError> {
        let name = std::str::from_utf8(name).map_err(|_| self.fail(SaxErrorKind::InvalidUtf8, at))?;
        let raw = tokenizer::parse_attributes(region, Grammar::Xml).map_err(|kind| self.fail(kind, at))?;

        let mut named: Vec<(Arc<str>, &[u8])> = Vec::with_capacity(raw.len());
        for RawAttribute { name, value } in raw {
            let name =
                std::str::from_utf8(name).map_err(|_| self.fail(SaxErrorKind::InvalidUtf8, at))?;
            named.push((self.ctx.intern(name), value));
        }

        self.namespaces.push_scope();
        for (attr_name, value) in &named {
            if &**attr_name == "xmlns" {
                self.namespaces.declare(None, &decode_value(value, false));
            } else if let Some(prefix) = attr_name.strip_prefix("xmlns:") {
                let prefix = self.ctx.intern(prefix);
                self.namespaces
                    .declare(Some(prefix), &decode_value(value, false));
            }
        }

        let qualified = self.ctx.intern(name);
        let element = match split_qualified(name) {
            (Some(prefix), local) => OpenElement {
                local_name: self.ctx.intern(local),
                uri: self.namespaces.resolve(Some(prefix)),
                prefix: Some(self.ctx.intern(prefix)),
                name: qualified,
            },
            (None, _) => OpenElement {
                uri: self.namespaces.resolve(None),
                ..OpenElement::unqualified(qualified)
            },
        };

        let attributes: Vec<Attribute<'_>> = named
            .iter()
            .map(|(name, value)| Attribute {
                name: &**name,
                raw_value: *value,
                html: false,
            })
            .collect();

        let is_root = self.open.is_empty();
        self.seen_root = true;
        self.emit_start(&element, &attributes);

        if self_closing {
            self.emit_end(&element);
            self.namespaces.pop_scope();
            if is_root {
                self.root_closed = true;
            }
        } else {
            self.open.push(element);
        }
        Ok(())
    }

    fn xml_end_tag(&mut self, name: &[u8], at: usize) -> Result<(), SaxError> {
        let name = std::str::from_utf8(name).map_err(|_| self.fail(SaxErrorKind::InvalidUtf8, at))?;

        let Some(top) = self.open.last() else {
            return Err(self.fail(SaxErrorKind::UnexpectedEndTag(name.to_owned()), at));
        };
        if &*top.name != name {
            let kind = SaxErrorKind::MismatchedEndTag {
                expected: top.name.to_string(),
                found: name.to_owned(),
            };
            return Err(self.fail(kind, at));
        }

        if let Some(element) = self.open.pop() {
            self.emit_end(&element);
            self.namespaces.pop_scope();
        }
        if self.open.is_empty() {
            self.root_closed = true;
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // HTML
    // ------------------------------------------------------------------------

    fn html_start_tag(&mut self, name: &[u8], region: &[u8], self_closing: bool, at: usize) {
        let lowered = String::from_utf8_lossy(name).to_ascii_lowercase();

        let raw = tokenizer::parse_attributes(region, Grammar::Html).unwrap_or_else(|kind| {
            warn!(offset = at, element = %lowered, error = %kind, "Skipping malformed attributes");
            Vec::new()
        });
        let mut named: Vec<(Arc<str>, &[u8])> = Vec::with_capacity(raw.len());
        for RawAttribute { name, value } in raw {
            match std::str::from_utf8(name) {
                Ok(name) => named.push((self.ctx.intern(&name.to_ascii_lowercase()), value)),
                Err(_) => {
                    warn!(offset = at, element = %lowered, "Skipping attribute with invalid UTF-8 name")
                }
            }
        }

        if html::closes_open_sibling(&lowered)
            && self.open.last().is_some_and(|top| *top.name == *lowered)
        {
            if let Some(sibling) = self.open.pop() {
                self.emit_end(&sibling);
            }
        }

        let element = OpenElement::unqualified(self.ctx.intern(&lowered));
        let attributes: Vec<Attribute<'_>> = named
            .iter()
            .map(|(name, value)| Attribute {
                name: &**name,
                raw_value: *value,
                html: true,
            })
            .collect();

        self.emit_start(&element, &attributes);

        if self_closing || html::is_void(&lowered) {
            self.emit_end(&element);
        } else {
            if html::is_raw_text(&lowered) {
                self.raw_text = Some(Arc::clone(&element.name));
            }
            self.open.push(element);
        }
    }

    fn html_end_tag(&mut self, name: &[u8], at: usize) {
        let lowered = String::from_utf8_lossy(name).to_ascii_lowercase();
        match self.open.iter().rposition(|element| *element.name == *lowered) {
            Some(index) => {
                while self.open.len() > index {
                    if let Some(element) = self.open.pop() {
                        self.emit_end(&element);
                    }
                }
            }
            None => debug!(offset = at, element = %lowered, "Ignoring unmatched end tag"),
        }
    }
}

fn decode_value(raw: &[u8], html: bool) -> String {
    match entities::decode(raw, html) {
        Cow::Borrowed(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        Cow::Owned(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
    }
}
