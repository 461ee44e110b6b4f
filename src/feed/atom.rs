//! Atom 1.0 and 0.3 extraction.

use chrono::{DateTime, Utc};
use quick_xml::escape::escape;

use super::types::{ArticleDraft, ArticleSet, FeedHeader, ParsedAuthor, ParsedEnclosure, ParsedFeed};
use super::FeedError;
use crate::date;
use crate::sax::{self, EndElement, Grammar, SaxContext, SaxObserver, StartElement};
use crate::sniff::FeedType;
use crate::util::{resolve_url, AttributeMap};
use crate::RawInput;

const ATOM_NAMESPACE: &str = "http://www.w3.org/2005/Atom";
const ATOM_03_NAMESPACE: &str = "http://purl.org/atom/ns#";

pub(crate) fn parse(
    input: &RawInput,
    intern_capacity: usize,
    parsed_at: DateTime<Utc>,
) -> Result<ParsedFeed, FeedError> {
    let extractor = AtomExtractor::new(&input.url, parsed_at);
    let extractor = sax::parse_with_intern_capacity(Grammar::Xml, extractor, &input.bytes, intern_capacity)
        .map_err(|source| FeedError::Malformed {
            url: input.url.clone(),
            source,
        })?;
    Ok(extractor.into_feed())
}

/// Unprefixed, or prefixed but bound to an Atom namespace.
fn is_atom(local_name: &str, prefix: Option<&str>, uri: Option<&str>, name: &str) -> bool {
    local_name == name
        && (prefix.is_none() || matches!(uri, Some(ATOM_NAMESPACE | ATOM_03_NAMESPACE)))
}

/// `type="xhtml"` content being re-serialised.
struct Xhtml {
    markup: String,
    /// Depth of the `content`/`summary` element that opened it.
    depth: usize,
}

struct AtomExtractor {
    feed_url: String,
    parsed_at: DateTime<Utc>,
    header: FeedHeader,
    articles: ArticleSet,
    current: Option<ArticleDraft>,
    /// Attributes of every open element.
    attributes: Vec<AttributeMap>,
    xml_base: Option<String>,
    xhtml: Option<Xhtml>,
    author: Option<ParsedAuthor>,
    in_source: bool,
    end_found: bool,
    depth: usize,
    entry_depth: usize,
}

impl AtomExtractor {
    fn new(feed_url: &str, parsed_at: DateTime<Utc>) -> Self {
        Self {
            feed_url: feed_url.to_owned(),
            parsed_at,
            header: FeedHeader::default(),
            articles: ArticleSet::default(),
            current: None,
            attributes: Vec::new(),
            xml_base: None,
            xhtml: None,
            author: None,
            in_source: false,
            end_found: false,
            depth: 0,
            entry_depth: 0,
        }
    }

    fn into_feed(self) -> ParsedFeed {
        self.header.into_feed(FeedType::Atom, &self.feed_url, self.articles)
    }

    fn current_attributes(&self) -> Option<&AttributeMap> {
        self.attributes.last()
    }

    fn resolve(&self, href: &str) -> String {
        match &self.xml_base {
            Some(base) => resolve_url(href, base).unwrap_or_else(|| href.to_owned()),
            None => href.to_owned(),
        }
    }

    fn add_feed_attributes(&mut self, attributes: &AttributeMap) {
        if self.header.language.is_none() {
            self.header.language = attributes.get_non_empty("xml:lang").map(str::to_owned);
        }
        if self.xml_base.is_none() {
            self.xml_base = attributes
                .get_non_empty("xml:base")
                .filter(|base| url::Url::parse(base).is_ok())
                .map(str::to_owned);
        }
    }

    fn add_feed_link(&mut self, attributes: &AttributeMap) {
        if self.header.link.is_some() {
            return;
        }
        let Some(href) = attributes.get_non_empty("href") else {
            return;
        };
        // A lone `<link href="..."/>` with no rel is the home page too
        if attributes.get("rel") == Some("alternate") || attributes.len() == 1 {
            self.header.link = Some(href.to_owned());
        }
    }

    fn add_link(&mut self) {
        let Some(attributes) = self.current_attributes() else {
            return;
        };
        let Some(href) = attributes.get_non_empty("href") else {
            return;
        };
        let resolved = self.resolve(href.trim());
        let rel = attributes.get_non_empty("rel").unwrap_or("alternate");
        let enclosure = (rel == "enclosure").then(|| ParsedEnclosure {
            url: resolved.clone(),
            mime_type: attributes.get_non_empty("type").map(str::to_owned),
            length: attributes.get("length").and_then(|v| v.trim().parse().ok()),
            title: attributes.get_non_empty("title").map(str::to_owned),
        });
        let rel = rel.to_owned();

        let Some(draft) = self.current.as_mut() else {
            return;
        };
        match rel.as_str() {
            "related" => {
                draft.link.get_or_insert(resolved);
            }
            "alternate" => {
                draft.permalink.get_or_insert(resolved);
            }
            _ => {
                if let Some(enclosure) = enclosure {
                    draft.add_enclosure(enclosure);
                }
            }
        }
    }

    fn add_article_element(&mut self, ctx: &SaxContext, local_name: &str) {
        if local_name == "link" {
            self.add_link();
            return;
        }

        let is_text_content = self
            .current_attributes()
            .and_then(|attrs| attrs.get("type"))
            == Some("text");
        let Some(draft) = self.current.as_mut() else {
            return;
        };
        let text = ctx.current_trimmed_string();
        let date = || ctx.current_characters().and_then(date::parse_bytes);

        match local_name {
            "id" => draft.guid = text,
            "title" => draft.title = text,
            "content" => {
                draft.body = if is_text_content {
                    text.map(|t| t.replace('\n', "\n<br>"))
                } else {
                    text
                };
            }
            "summary" => {
                if draft.body.is_none() {
                    draft.body = text;
                }
            }
            "published" => draft.date_published = date(),
            "updated" => draft.date_modified = date(),
            "issued" => {
                if draft.date_published.is_none() {
                    draft.date_published = date();
                }
            }
            "modified" => {
                if draft.date_modified.is_none() {
                    draft.date_modified = date();
                }
            }
            _ => {}
        }
    }

    fn dispatch_end(&mut self, ctx: &SaxContext, element: &EndElement<'_>) {
        let is = |name| is_atom(element.local_name, element.prefix, element.uri, name);

        if self.xhtml.is_some() {
            self.end_xhtml(element);
        } else if self.author.is_some() {
            self.end_author(ctx, element);
        } else if is("entry") {
            if let Some(draft) = self.current.take() {
                self.articles.insert(draft.finish(&self.feed_url, self.parsed_at));
            }
        } else if self.current.is_some() && !self.in_source && self.depth == self.entry_depth + 1 {
            if is(element.local_name) {
                self.add_article_element(ctx, element.local_name);
            }
        } else if is("source") {
            self.in_source = false;
        } else if self.current.is_none() && !self.in_source && is("title") && self.header.title.is_none() {
            self.header.title = ctx.current_trimmed_string();
        }
    }

    fn end_author(&mut self, ctx: &SaxContext, element: &EndElement<'_>) {
        let is = |name| is_atom(element.local_name, element.prefix, element.uri, name);

        if is("author") {
            if let (Some(author), Some(draft)) = (self.author.take(), self.current.as_mut()) {
                draft.add_author(author);
            }
            return;
        }

        let Some(author) = self.author.as_mut() else {
            return;
        };
        if is("name") {
            author.name = ctx.current_trimmed_string();
        } else if is("email") {
            author.email_address = ctx.current_trimmed_string();
        } else if is("uri") {
            author.url = ctx.current_trimmed_string();
        }
    }

    fn end_xhtml(&mut self, element: &EndElement<'_>) {
        let Some(xhtml) = self.xhtml.as_mut() else {
            return;
        };
        if self.depth != xhtml.depth {
            xhtml.markup.push_str("</");
            xhtml.markup.push_str(element.local_name);
            xhtml.markup.push('>');
            return;
        }

        let markup = self.xhtml.take().map(|x| x.markup);
        if let Some(draft) = self.current.as_mut() {
            if element.local_name == "content" {
                draft.body = markup;
            } else if draft.body.as_deref().map_or(true, str::is_empty) {
                draft.body = markup;
            }
        }
    }
}

fn push_xhtml_tag(markup: &mut String, element: &StartElement<'_>, attributes: &AttributeMap) {
    markup.push('<');
    markup.push_str(element.local_name);
    for (key, value) in attributes.iter() {
        if key == "xmlns" || key.starts_with("xmlns:") {
            continue;
        }
        markup.push(' ');
        markup.push_str(key);
        markup.push_str("=\"");
        markup.push_str(&escape(value));
        markup.push('"');
    }
    markup.push('>');
}

impl SaxObserver for AtomExtractor {
    fn start_element(&mut self, ctx: &mut SaxContext, element: &StartElement<'_>) {
        self.depth += 1;
        if self.end_found {
            return;
        }

        let attributes = element.attribute_map(ctx);
        if let Some(xhtml) = self.xhtml.as_mut() {
            push_xhtml_tag(&mut xhtml.markup, element, &attributes);
            self.attributes.push(attributes);
            return;
        }

        let is = |name| is_atom(element.local_name, element.prefix, element.uri, name);
        let in_entry = self.current.is_some();

        if is("entry") {
            self.current = Some(ArticleDraft::default());
            self.entry_depth = self.depth;
        } else if is("author") && !self.in_source {
            self.author = Some(ParsedAuthor::default());
        } else if is("source") {
            self.in_source = true;
        } else if in_entry && (is("content") || is("summary")) {
            if is("content") {
                if let Some(draft) = self.current.as_mut() {
                    draft.language = attributes.get_non_empty("xml:lang").map(str::to_owned);
                }
            }
            if attributes.get("type") == Some("xhtml") {
                self.xhtml = Some(Xhtml {
                    markup: String::new(),
                    depth: self.depth,
                });
            } else {
                ctx.begin_storing_characters();
            }
        } else if !in_entry && is("link") {
            self.add_feed_link(&attributes);
        } else {
            if is("feed") {
                self.add_feed_attributes(&attributes);
            }
            ctx.begin_storing_characters();
        }

        self.attributes.push(attributes);
    }

    fn end_element(&mut self, ctx: &mut SaxContext, element: &EndElement<'_>) {
        if is_atom(element.local_name, element.prefix, element.uri, "feed") {
            self.end_found = true;
            ctx.cancel();
        } else if !self.end_found {
            self.dispatch_end(ctx, element);
        }

        self.attributes.pop();
        self.depth = self.depth.saturating_sub(1);
    }

    fn characters(&mut self, _ctx: &mut SaxContext, text: &[u8]) {
        if let Some(xhtml) = self.xhtml.as_mut() {
            let text = String::from_utf8_lossy(text);
            xhtml.markup.push_str(&escape(&*text));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse_str(xml: &str) -> ParsedFeed {
        let input = RawInput::new("https://example.com/atom.xml", xml);
        parse(&input, 64, Utc::now()).unwrap()
    }

    const ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom" xml:lang="en" xml:base="https://example.com/blog/">
  <title>Example Atom</title>
  <link rel="self" href="https://example.com/atom.xml"/>
  <link rel="alternate" href="https://example.com/"/>
  <updated>2024-01-02T00:00:00Z</updated>
  <author><name>Feed Author</name></author>
  <entry>
    <title>Entry one</title>
    <link href="posts/1"/>
    <link rel="related" href="https://other.example/story"/>
    <link rel="enclosure" href="/media/1.mp3" type="audio/mpeg" length="99" title="Episode"/>
    <id>urn:uuid:1</id>
    <published>2024-01-02T03:04:05Z</published>
    <updated>2024-01-03T00:00:00Z</updated>
    <author>
      <name>Jo Doe</name>
      <email>jo@example.com</email>
      <uri>https://jo.example</uri>
    </author>
    <summary>Short</summary>
    <content type="html" xml:lang="fr">&lt;p&gt;Bonjour&lt;/p&gt;</content>
    <source><title>Not the title</title><id>urn:source</id><author><name>Source author</name></author></source>
  </entry>
  <entry>
    <title>Entry two</title>
    <id>urn:uuid:2</id>
    <issued>2023-12-01T00:00:00Z</issued>
    <modified>2023-12-02T00:00:00Z</modified>
    <summary type="xhtml"><div xmlns="http://www.w3.org/1999/xhtml"><p class="x">a &amp; b</p></div></summary>
  </entry>
</feed>"#;

    #[test]
    fn test_feed_fields() {
        let feed = parse_str(ATOM);
        assert_eq!(feed.feed_type, FeedType::Atom);
        assert_eq!(feed.title.as_deref(), Some("Example Atom"));
        assert_eq!(feed.link.as_deref(), Some("https://example.com/"));
        assert_eq!(feed.language.as_deref(), Some("en"));
        assert_eq!(feed.articles.len(), 2);
    }

    #[test]
    fn test_entry_fields() {
        let feed = parse_str(ATOM);
        let entry = &feed.articles[0];
        assert_eq!(entry.guid.as_deref(), Some("urn:uuid:1"));
        assert_eq!(entry.title.as_deref(), Some("Entry one"));
        assert_eq!(entry.permalink.as_deref(), Some("https://example.com/blog/posts/1"));
        assert_eq!(entry.link.as_deref(), Some("https://other.example/story"));
        assert_eq!(entry.body.as_deref(), Some("<p>Bonjour</p>"));
        assert_eq!(entry.language.as_deref(), Some("fr"));
        assert_eq!(
            entry.date_published.map(|d| d.to_rfc3339()).as_deref(),
            Some("2024-01-02T03:04:05+00:00")
        );
        assert_eq!(
            entry.date_modified.map(|d| d.to_rfc3339()).as_deref(),
            Some("2024-01-03T00:00:00+00:00")
        );
        assert_eq!(
            entry.authors,
            vec![ParsedAuthor {
                name: Some("Jo Doe".into()),
                email_address: Some("jo@example.com".into()),
                url: Some("https://jo.example".into()),
                avatar_url: None,
            }]
        );
        assert_eq!(
            entry.enclosures,
            vec![ParsedEnclosure {
                url: "https://example.com/media/1.mp3".into(),
                mime_type: Some("audio/mpeg".into()),
                length: Some(99),
                title: Some("Episode".into()),
            }]
        );
    }

    #[test]
    fn test_atom03_dates_and_xhtml_summary() {
        let feed = parse_str(ATOM);
        let entry = &feed.articles[1];
        assert_eq!(
            entry.date_published.map(|d| d.to_rfc3339()).as_deref(),
            Some("2023-12-01T00:00:00+00:00")
        );
        assert!(entry.date_modified.is_some());
        assert_eq!(
            entry.body.as_deref(),
            Some(r#"<div><p class="x">a &amp; b</p></div>"#)
        );
    }

    #[test]
    fn test_text_content_gets_line_breaks() {
        let feed = parse_str(
            "<feed xmlns=\"http://www.w3.org/2005/Atom\"><entry><id>1</id><content type=\"text\">one\ntwo</content></entry></feed>",
        );
        assert_eq!(feed.articles[0].body.as_deref(), Some("one\n<br>two"));
    }

    #[test]
    fn test_bare_href_link_is_home_page() {
        let feed = parse_str(
            r#"<feed xmlns="http://www.w3.org/2005/Atom"><link href="https://example.org/"/><title>T</title></feed>"#,
        );
        assert_eq!(feed.link.as_deref(), Some("https://example.org/"));
    }

    #[test]
    fn test_nested_elements_are_not_entry_fields() {
        let feed = parse_str(
            r#"<feed xmlns="http://www.w3.org/2005/Atom"><entry><id>1</id>
            <media:group xmlns:media="http://search.yahoo.com/mrss/"><title>nested</title></media:group>
            </entry></feed>"#,
        );
        assert_eq!(feed.articles[0].title, None);
    }

    #[test]
    fn test_prefixed_atom_elements() {
        let feed = parse_str(
            r#"<a:feed xmlns:a="http://www.w3.org/2005/Atom" xmlns:x="urn:other">
            <a:title>Prefixed</a:title>
            <a:entry>
              <a:id>urn:p:1</a:id>
              <a:title>Prefixed entry</a:title>
              <a:link href="https://example.com/p/1"/>
              <a:updated>2024-01-03T00:00:00Z</a:updated>
              <a:content type="html">&lt;b&gt;hi&lt;/b&gt;</a:content>
              <x:title>Foreign</x:title>
            </a:entry>
            </a:feed>"#,
        );
        assert_eq!(feed.title.as_deref(), Some("Prefixed"));
        let entry = &feed.articles[0];
        assert_eq!(entry.guid.as_deref(), Some("urn:p:1"));
        assert_eq!(entry.title.as_deref(), Some("Prefixed entry"));
        assert_eq!(entry.permalink.as_deref(), Some("https://example.com/p/1"));
        assert_eq!(entry.body.as_deref(), Some("<b>hi</b>"));
        assert!(entry.date_modified.is_some());
    }

    #[test]
    fn test_malformed_is_error() {
        let input = RawInput::new("u", "<feed><entry></feed>");
        assert!(matches!(
            parse(&input, 64, Utc::now()),
            Err(FeedError::Malformed { .. })
        ));
    }
}
