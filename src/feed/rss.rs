//! RSS 0.9x/2.0 and RSS 1.0 (RDF) extraction.

use chrono::{DateTime, Utc};

use super::types::{ArticleDraft, ArticleSet, FeedHeader, ParsedAuthor, ParsedEnclosure, ParsedFeed};
use super::FeedError;
use crate::date;
use crate::sax::{self, EndElement, Grammar, SaxContext, SaxObserver, StartElement};
use crate::sniff::FeedType;
use crate::util::resolve_url_lenient;
use crate::RawInput;

const DC_NAMESPACE: &str = "http://purl.org/dc/elements/1.1/";
const CONTENT_NAMESPACE: &str = "http://purl.org/rss/1.0/modules/content/";

pub(crate) fn parse(
    input: &RawInput,
    intern_capacity: usize,
    parsed_at: DateTime<Utc>,
) -> Result<ParsedFeed, FeedError> {
    let extractor = RssExtractor::new(&input.url, parsed_at);
    let extractor = sax::parse_with_intern_capacity(Grammar::Xml, extractor, &input.bytes, intern_capacity)
        .map_err(|source| FeedError::Malformed {
            url: input.url.clone(),
            source,
        })?;
    Ok(extractor.into_feed())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Namespace {
    None,
    DublinCore,
    Content,
    Other,
}

fn namespace(prefix: Option<&str>, uri: Option<&str>) -> Namespace {
    match (prefix, uri) {
        (None, _) => Namespace::None,
        (_, Some(DC_NAMESPACE)) | (Some("dc"), None) => Namespace::DublinCore,
        (_, Some(CONTENT_NAMESPACE)) | (Some("content"), None) => Namespace::Content,
        _ => Namespace::Other,
    }
}

struct RssExtractor {
    feed_url: String,
    parsed_at: DateTime<Utc>,
    header: FeedHeader,
    articles: ArticleSet,
    current: Option<ArticleDraft>,
    is_rdf: bool,
    end_found: bool,
    in_channel_image: bool,
    in_author: bool,
    guid_is_permalink: bool,
}

impl RssExtractor {
    fn new(feed_url: &str, parsed_at: DateTime<Utc>) -> Self {
        Self {
            feed_url: feed_url.to_owned(),
            parsed_at,
            header: FeedHeader::default(),
            articles: ArticleSet::default(),
            current: None,
            is_rdf: false,
            end_found: false,
            in_channel_image: false,
            in_author: false,
            guid_is_permalink: true,
        }
    }

    fn into_feed(self) -> ParsedFeed {
        self.header.into_feed(FeedType::Rss, &self.feed_url, self.articles)
    }

    /// Relative item links resolve against the channel link, else the feed URL.
    fn resolve(&self, href: &str) -> String {
        let base = self.header.link.as_deref().unwrap_or(&self.feed_url);
        resolve_url_lenient(href, base)
    }

    fn add_feed_element(&mut self, ctx: &SaxContext, element: &EndElement<'_>) {
        if element.prefix.is_some() {
            return;
        }
        let slot = match element.local_name {
            "link" => &mut self.header.link,
            "title" => &mut self.header.title,
            "language" => &mut self.header.language,
            "description" => &mut self.header.description,
            _ => return,
        };
        if slot.is_none() {
            *slot = ctx.current_trimmed_string();
        }
    }

    fn add_article_element(&mut self, ctx: &SaxContext, element: &EndElement<'_>) {
        let Some(text) = ctx.current_trimmed_string() else {
            return;
        };
        let in_author = self.in_author;
        let link = (element.local_name == "link").then(|| self.resolve(&text));
        let permalink = (element.local_name == "guid"
            && self.guid_is_permalink
            && is_probably_url_or_path(&text))
        .then(|| self.resolve(&text));

        let Some(draft) = self.current.as_mut() else {
            return;
        };

        match (namespace(element.prefix, element.uri), element.local_name) {
            (Namespace::DublinCore, "creator") => add_author(draft, &text),
            (Namespace::DublinCore, "date") => draft.date_published = date::parse(&text),
            (Namespace::Content, "encoded") => draft.body = Some(text),
            (Namespace::None, "guid") => {
                draft.guid = Some(text);
                if permalink.is_some() {
                    draft.permalink = permalink;
                }
            }
            (Namespace::None, "author") => add_author(draft, &text),
            (Namespace::None, "link") => draft.link = link,
            (Namespace::None, "description") => {
                if draft.body.is_none() {
                    draft.body = Some(text);
                }
            }
            (Namespace::None, "title") if !in_author => draft.title = Some(text),
            (Namespace::None, "pubDate") => draft.date_published = date::parse(&text),
            _ => {}
        }
    }

    fn finish_article(&mut self) {
        if let Some(draft) = self.current.take() {
            let article = draft.finish(&self.feed_url, self.parsed_at);
            self.articles.insert(article);
        }
    }
}

fn add_author(draft: &mut ArticleDraft, text: &str) {
    if let Some(author) = ParsedAuthor::from_single_string(text) {
        draft.add_author(author);
    }
}

/// Guids default to being permalinks, but many feeds use opaque IDs without
/// saying so. Treat the guid as a link only if it could be one.
fn is_probably_url_or_path(guid: &str) -> bool {
    guid.contains('/') && !guid.to_ascii_lowercase().starts_with("tag:")
}

fn enclosure(element: &StartElement<'_>) -> Option<ParsedEnclosure> {
    let url = element.attribute_value("url")?;
    if url.trim().is_empty() {
        return None;
    }
    Some(ParsedEnclosure {
        url: url.trim().to_owned(),
        mime_type: element
            .attribute_value("type")
            .map(|v| v.into_owned())
            .filter(|v| !v.is_empty()),
        length: element
            .attribute_value("length")
            .and_then(|v| v.trim().parse().ok()),
        title: None,
    })
}

impl SaxObserver for RssExtractor {
    fn start_element(&mut self, ctx: &mut SaxContext, element: &StartElement<'_>) {
        if self.end_found {
            return;
        }
        if element.local_name == "RDF" {
            self.is_rdf = true;
            return;
        }

        let unprefixed = element.prefix.is_none();
        match element.local_name {
            "item" if unprefixed => {
                let mut draft = ArticleDraft::default();
                if self.is_rdf {
                    if let Some(about) = element.attribute_value("rdf:about") {
                        draft.guid = Some(about.to_string());
                        draft.permalink = Some(about.into_owned());
                    }
                }
                self.current = Some(draft);
            }
            "image" if unprefixed => self.in_channel_image = true,
            "author" if unprefixed && self.current.is_some() => self.in_author = true,
            "guid" if unprefixed => {
                self.guid_is_permalink = element
                    .attribute_value("isPermaLink")
                    .map_or(true, |v| v != "false");
            }
            "enclosure" if unprefixed => {
                if let (Some(draft), Some(enclosure)) = (self.current.as_mut(), enclosure(element)) {
                    draft.add_enclosure(enclosure);
                }
            }
            _ => {}
        }

        if !self.in_channel_image {
            ctx.begin_storing_characters();
        }
    }

    fn end_element(&mut self, ctx: &mut SaxContext, element: &EndElement<'_>) {
        if self.end_found {
            return;
        }

        if (self.is_rdf && element.local_name == "RDF") || element.local_name == "rss" {
            self.end_found = true;
            ctx.cancel();
        } else if element.local_name == "image" {
            self.in_channel_image = false;
        } else if element.local_name == "item" {
            self.finish_article();
        } else if self.current.is_some() {
            self.add_article_element(ctx, element);
            if element.local_name == "author" {
                self.in_author = false;
            }
        } else if !self.in_channel_image {
            self.add_feed_element(ctx, element);
        }
    }
}
