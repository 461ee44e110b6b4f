use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::identity::{article_id, IdentityFields};
use crate::sniff::FeedType;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedFeed {
    pub feed_type: FeedType,
    pub url: String,
    pub title: Option<String>,
    /// Home page of the site.
    pub link: Option<String>,
    pub language: Option<String>,
    pub description: Option<String>,
    /// Unique by `article_id`, in document order.
    pub articles: Vec<ParsedArticle>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedArticle {
    pub feed_url: String,
    pub article_id: String,
    pub guid: Option<String>,
    pub title: Option<String>,
    pub body: Option<String>,
    /// External link (RSS `link`, Atom `rel="related"`).
    pub link: Option<String>,
    pub permalink: Option<String>,
    pub authors: Vec<ParsedAuthor>,
    pub enclosures: Vec<ParsedEnclosure>,
    pub date_published: Option<DateTime<Utc>>,
    pub date_modified: Option<DateTime<Utc>>,
    /// When this parse ran. Shared by every article of one parse.
    pub date_parsed: DateTime<Utc>,
    pub language: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParsedAuthor {
    pub name: Option<String>,
    pub email_address: Option<String>,
    pub url: Option<String>,
    pub avatar_url: Option<String>,
}

impl ParsedAuthor {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email_address.is_none()
            && self.url.is_none()
            && self.avatar_url.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedEnclosure {
    pub url: String,
    pub mime_type: Option<String>,
    pub length: Option<u64>,
    pub title: Option<String>,
}

impl ParsedEnclosure {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            mime_type: None,
            length: None,
            title: None,
        }
    }
}

/// An article under construction.
///
/// Extractors fill the fields while the item is open and call
/// [`finish`](Self::finish) at its end tag. The ID is computed there, from the
/// final field values, and the draft is consumed.
#[derive(Debug, Clone, Default)]
pub struct ArticleDraft {
    pub guid: Option<String>,
    pub title: Option<String>,
    pub body: Option<String>,
    pub link: Option<String>,
    pub permalink: Option<String>,
    pub authors: Vec<ParsedAuthor>,
    pub enclosures: Vec<ParsedEnclosure>,
    pub date_published: Option<DateTime<Utc>>,
    pub date_modified: Option<DateTime<Utc>>,
    pub language: Option<String>,
}

impl ArticleDraft {
    /// Adds an author unless it is empty or already present.
    pub fn add_author(&mut self, author: ParsedAuthor) {
        if !author.is_empty() && !self.authors.contains(&author) {
            self.authors.push(author);
        }
    }

    /// Adds an enclosure unless an identical one is already present.
    pub fn add_enclosure(&mut self, enclosure: ParsedEnclosure) {
        if !self.enclosures.contains(&enclosure) {
            self.enclosures.push(enclosure);
        }
    }

    pub fn finish(self, feed_url: &str, date_parsed: DateTime<Utc>) -> ParsedArticle {
        let article_id = article_id(&IdentityFields {
            guid: self.guid.as_deref(),
            permalink: self.permalink.as_deref(),
            link: self.link.as_deref(),
            title: self.title.as_deref(),
            body: self.body.as_deref(),
            date_published: self.date_published,
        });

        ParsedArticle {
            feed_url: feed_url.to_owned(),
            article_id,
            guid: self.guid,
            title: self.title,
            body: self.body,
            link: self.link,
            permalink: self.permalink,
            authors: self.authors,
            enclosures: self.enclosures,
            date_published: self.date_published,
            date_modified: self.date_modified,
            date_parsed,
            language: self.language,
        }
    }
}

/// Articles keyed by ID. A repeated ID replaces the earlier article in place.
#[derive(Debug, Default)]
pub(crate) struct ArticleSet {
    articles: Vec<ParsedArticle>,
    positions: HashMap<String, usize>,
}

impl ArticleSet {
    pub fn insert(&mut self, article: ParsedArticle) {
        match self.positions.get(&article.article_id) {
            Some(&index) => self.articles[index] = article,
            None => {
                self.positions
                    .insert(article.article_id.clone(), self.articles.len());
                self.articles.push(article);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.articles.len()
    }

    pub fn into_vec(self) -> Vec<ParsedArticle> {
        self.articles
    }
}

/// Feed-level fields collected while parsing.
#[derive(Debug, Default)]
pub(crate) struct FeedHeader {
    pub title: Option<String>,
    pub link: Option<String>,
    pub language: Option<String>,
    pub description: Option<String>,
}

impl FeedHeader {
    pub fn into_feed(self, feed_type: FeedType, url: &str, articles: ArticleSet) -> ParsedFeed {
        ParsedFeed {
            feed_type,
            url: url.to_owned(),
            title: self.title,
            link: self.link,
            language: self.language,
            description: self.description,
            articles: articles.into_vec(),
        }
    }
}
