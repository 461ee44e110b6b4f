//! Integration tests for OPML round-trips, HTML metadata and links, the
//! stripper, sniffing and dates, all through the public API.

use feedparse::html::{self, HtmlLink};
use feedparse::opml::{self, OpmlError};
use feedparse::sniff::{self, FeedType};
use feedparse::{date, RawInput};
use pretty_assertions::assert_eq;

// ============================================================================
// OPML
// ============================================================================

const SUBSCRIPTIONS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<opml version="1.0">
  <head>
    <title>My Subscriptions</title>
    <dateCreated>Mon, 01 Jan 2024 00:00:00 GMT</dateCreated>
  </head>
  <body>
    <outline text="News" title="News">
      <outline text="Example" type="rss" xmlUrl="https://example.com/feed.xml" htmlUrl="https://example.com/"/>
      <outline text="Nested folder">
        <outline text="Deep" xmlURL="https://deep.example.com/rss"/>
      </outline>
    </outline>
    <outline text="Loose" xmlurl="https://loose.example.com/atom"/>
  </body>
</opml>"#;

#[test]
fn test_opml_tree_shape() {
    let doc = opml::parse_opml(&RawInput::new("file:///subs.opml", SUBSCRIPTIONS)).unwrap();

    assert_eq!(doc.title.as_deref(), Some("My Subscriptions"));
    assert_eq!(doc.items.len(), 2);
    assert!(doc.items[0].is_folder());
    assert!(doc.items[0].children[1].is_folder());
    assert!(!doc.items[1].is_folder());

    let urls: Vec<_> = doc.feed_specifiers().into_iter().map(|f| f.feed_url).collect();
    assert_eq!(
        urls,
        [
            "https://example.com/feed.xml",
            "https://deep.example.com/rss",
            "https://loose.example.com/atom",
        ]
    );
}

#[test]
fn test_opml_export_round_trip() {
    let input = RawInput::new("file:///subs.opml", SUBSCRIPTIONS);
    let doc = opml::parse_opml(&input).unwrap();

    let exported = opml::export_opml(&doc).unwrap();
    let reparsed = opml::parse_opml(&RawInput::new("file:///subs.opml", exported)).unwrap();
    assert_eq!(reparsed, doc);
}

#[test]
fn test_opml_rejects_feeds() {
    let rss = "<rss><channel/></rss>";
    assert!(matches!(
        opml::parse_opml(&RawInput::new("u", rss)),
        Err(OpmlError::WrongFormat { .. })
    ));
}

// ============================================================================
// HTML
// ============================================================================

const PAGE: &str = r#"<!doctype html>
<HTML><HEAD>
<Link Rel="alternate" Type="application/atom+xml" Title="Atom" HREF="/atom.xml">
<link rel=icon href="/icon.png">
<meta property="og:image" content="https://cdn.example.com/og.jpg">
</HEAD>
<BODY>
<p>Intro<p>See <a href="/a">A <i>link</i></a> and <a href=b.html title=Bee>B</a>
<script>document.write("<a href='/fake'>no</a>")</script>
</BODY></HTML>"#;

#[test]
fn test_html_metadata_from_tag_soup() {
    let metadata = html::metadata::parse(&RawInput::new("https://site.example.com/dir/page", PAGE));

    assert_eq!(metadata.feed_links.len(), 1);
    assert_eq!(metadata.feed_links[0].title.as_deref(), Some("Atom"));
    assert_eq!(
        metadata.feed_links[0].url.as_deref(),
        Some("https://site.example.com/atom.xml")
    );
    assert_eq!(metadata.favicons[0].url, "https://site.example.com/icon.png");
    assert_eq!(
        metadata.open_graph.image.and_then(|image| image.url).as_deref(),
        Some("https://cdn.example.com/og.jpg")
    );
}

#[test]
fn test_html_links_skip_script_markup() {
    let links = html::links::parse(&RawInput::new("https://site.example.com/dir/page", PAGE));
    assert_eq!(
        links,
        vec![
            HtmlLink {
                url: Some("https://site.example.com/a".into()),
                text: Some("A link".into()),
                title: None,
            },
            HtmlLink {
                url: Some("https://site.example.com/dir/b.html".into()),
                text: Some("B".into()),
                title: Some("Bee".into()),
            },
        ]
    );
}

#[test]
fn test_strip_article_preview() {
    let body = r#"<div class="post"><h1>Title</h1><p>First   paragraph.</p>
        <style>.x{}</style><p>Second<br/>line</p></div>"#;
    assert_eq!(html::strip_html_str(body, None), "Title First paragraph. Second line");
    assert_eq!(html::strip_html_str(body, Some(5)), "Title");
}

// ============================================================================
// Sniffing and Dates
// ============================================================================

#[test]
fn test_sniffing_matches_parsers() {
    assert_eq!(sniff::feed_type(SUBSCRIPTIONS.as_bytes()), FeedType::NotAFeed);
    assert!(sniff::is_probably_xml(SUBSCRIPTIONS.as_bytes()));
    assert!(sniff::is_probably_html(PAGE.as_bytes()));
    assert_eq!(sniff::feed_type(PAGE.as_bytes()), FeedType::NotAFeed);
}

#[test]
fn test_dates_agree_across_formats() {
    let rfc822 = date::parse("Tue, 02 Jan 2024 03:04:05 GMT").unwrap();
    let iso = date::parse("2024-01-02T03:04:05Z").unwrap();
    let offset = date::parse("2024-01-01T22:04:05-05:00").unwrap();
    assert_eq!(rfc822, iso);
    assert_eq!(iso, offset);
    assert_eq!(date::parse_bytes(b"2024-01-02T03:04:05.250Z").map(|d| d.timestamp_subsec_millis()), Some(250));
}
