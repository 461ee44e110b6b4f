//! `<link>` and `<meta>` metadata from an HTML page.
//!
//! The page is scanned once in HTML mode and every `link`/`meta` tag is kept
//! with its attribute bag. Everything else (favicons, feed autodiscovery, Open
//! Graph, Twitter cards) is derived from that list.

use serde::Serialize;

use super::run_html;
use crate::sax::{EndElement, SaxContext, SaxObserver, StartElement};
use crate::util::{resolve_url, AttributeMap};
use crate::RawInput;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HtmlTagType {
    Link,
    Meta,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HtmlTag {
    pub tag_type: HtmlTagType,
    pub attributes: AttributeMap,
}

impl HtmlTag {
    /// `href`, else `src`, else `content` on `meta` tags.
    fn url_value(&self) -> Option<&str> {
        self.attributes
            .get("href")
            .or_else(|| self.attributes.get("src"))
            .or_else(|| self.is_meta().then(|| self.attributes.get("content")).flatten())
            .filter(|value| !value.trim().is_empty())
    }

    fn resolved_url(&self, base_url: &str) -> Option<String> {
        resolve_url(self.url_value()?, base_url)
    }

    /// Whether the whitespace-separated `rel` words include any of `values`,
    /// ignoring ASCII case.
    fn rel_matches(&self, values: &[&str]) -> bool {
        self.attributes.get("rel").is_some_and(|rel| {
            rel.split_ascii_whitespace()
                .any(|word| values.iter().any(|value| word.eq_ignore_ascii_case(value)))
        })
    }

    fn is_link(&self) -> bool {
        self.tag_type == HtmlTagType::Link
    }

    fn is_meta(&self) -> bool {
        self.tag_type == HtmlTagType::Meta
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HtmlFavicon {
    pub url: String,
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HtmlAppleTouchIcon {
    pub rel: Option<String>,
    /// Raw `sizes` attribute, such as `180x180`.
    pub sizes: Option<String>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HtmlFeedLink {
    pub title: Option<String>,
    pub mime_type: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OpenGraphImage {
    pub url: Option<String>,
    pub secure_url: Option<String>,
    pub mime_type: Option<String>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub alt_text: Option<String>,
}

impl OpenGraphImage {
    fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OpenGraphProperties {
    pub image: Option<OpenGraphImage>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TwitterProperties {
    /// `twitter:image:src`
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HtmlMetadata {
    pub base_url: String,
    /// Every `link` and `meta` tag, in document order.
    pub tags: Vec<HtmlTag>,
    pub favicons: Vec<HtmlFavicon>,
    pub apple_touch_icons: Vec<HtmlAppleTouchIcon>,
    pub feed_links: Vec<HtmlFeedLink>,
    pub open_graph: OpenGraphProperties,
    pub twitter: TwitterProperties,
}

/// Collects page metadata. Never fails; a page without `link` or `meta` tags
/// gives empty results.
pub fn parse(input: &RawInput) -> HtmlMetadata {
    let collector = run_html(TagCollector::default(), input);
    HtmlMetadata::new(&input.url, collector.tags)
}

impl HtmlMetadata {
    pub fn new(base_url: &str, tags: Vec<HtmlTag>) -> Self {
        Self {
            base_url: base_url.to_owned(),
            favicons: favicons(base_url, &tags),
            apple_touch_icons: apple_touch_icons(base_url, &tags),
            feed_links: feed_links(base_url, &tags),
            open_graph: OpenGraphProperties {
                image: open_graph_image(base_url, &tags),
            },
            twitter: TwitterProperties {
                image_url: twitter_image(base_url, &tags),
            },
            tags,
        }
    }
}

fn favicons(base_url: &str, tags: &[HtmlTag]) -> Vec<HtmlFavicon> {
    let mut favicons: Vec<HtmlFavicon> = Vec::new();
    for tag in tags.iter().filter(|tag| tag.is_link() && tag.rel_matches(&["icon"])) {
        let Some(url) = tag.resolved_url(base_url) else {
            continue;
        };
        if favicons.iter().any(|favicon| favicon.url == url) {
            continue;
        }
        favicons.push(HtmlFavicon {
            url,
            mime_type: tag.attributes.get("type").map(str::to_owned),
        });
    }
    favicons
}

fn apple_touch_icons(base_url: &str, tags: &[HtmlTag]) -> Vec<HtmlAppleTouchIcon> {
    tags.iter()
        .filter(|tag| tag.is_link() && tag.rel_matches(&["apple-touch-icon", "apple-touch-icon-precomposed"]))
        .map(|tag| {
            let sizes = tag.attributes.get("sizes");
            let (width, height) = sizes.and_then(parse_sizes).unzip();
            HtmlAppleTouchIcon {
                rel: tag.attributes.get("rel").map(str::to_owned),
                sizes: sizes.map(str::to_owned),
                width,
                height,
                url: tag.resolved_url(base_url),
            }
        })
        .collect()
}

/// `WxH` into its two numbers.
fn parse_sizes(sizes: &str) -> Option<(f64, f64)> {
    let (width, height) = sizes.split_once('x')?;
    Some((width.trim().parse().ok()?, height.trim().parse().ok()?))
}

fn is_feed_type(mime_type: &str) -> bool {
    let lower = mime_type.to_ascii_lowercase();
    lower.ends_with("/rss+xml") || lower.ends_with("/atom+xml") || lower.ends_with("/json")
}

fn feed_links(base_url: &str, tags: &[HtmlTag]) -> Vec<HtmlFeedLink> {
    tags.iter()
        .filter(|tag| {
            tag.is_link()
                && tag.url_value().is_some()
                && tag.rel_matches(&["alternate"])
                && tag.attributes.get("type").is_some_and(is_feed_type)
        })
        .map(|tag| HtmlFeedLink {
            title: tag.attributes.get("title").map(str::to_owned),
            mime_type: tag.attributes.get("type").map(str::to_owned),
            url: tag.resolved_url(base_url),
        })
        .collect()
}

fn open_graph_image(base_url: &str, tags: &[HtmlTag]) -> Option<OpenGraphImage> {
    let mut image = OpenGraphImage::default();

    for tag in tags.iter().filter(|tag| tag.is_meta()) {
        let Some(property) = tag.attributes.get("property").filter(|p| p.starts_with("og:")) else {
            continue;
        };
        let Some(content) = tag.attributes.get("content") else {
            continue;
        };

        // The first resolvable URL wins over later duplicates
        match property {
            "og:image" | "og:image:url" if image.url.is_none() => {
                image.url = tag.resolved_url(base_url);
            }
            "og:image:secure_url" if image.secure_url.is_none() => {
                image.secure_url = tag.resolved_url(base_url);
            }
            "og:image:type" => image.mime_type = Some(content.to_owned()),
            "og:image:alt" => image.alt_text = Some(content.to_owned()),
            "og:image:width" => {
                if let Ok(width) = content.trim().parse() {
                    image.width = Some(width);
                }
            }
            "og:image:height" => {
                if let Ok(height) = content.trim().parse() {
                    image.height = Some(height);
                }
            }
            _ => {}
        }
    }

    (!image.is_empty()).then_some(image)
}

fn twitter_image(base_url: &str, tags: &[HtmlTag]) -> Option<String> {
    tags.iter()
        .filter(|tag| tag.is_meta() && tag.attributes.get("name") == Some("twitter:image:src"))
        .find_map(HtmlTag::url_value)
        .and_then(|url| resolve_url(url, base_url))
}

#[derive(Debug, Default)]
struct TagCollector {
    tags: Vec<HtmlTag>,
}

impl SaxObserver for TagCollector {
    fn start_element(&mut self, ctx: &mut SaxContext, element: &StartElement<'_>) {
        let tag_type = match element.local_name {
            "link" => HtmlTagType::Link,
            "meta" => HtmlTagType::Meta,
            _ => return,
        };
        self.tags.push(HtmlTag {
            tag_type,
            attributes: element.attribute_map(ctx),
        });
    }

    fn end_element(&mut self, _ctx: &mut SaxContext, _element: &EndElement<'_>) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
  <title>Example &amp; Co</title>
  <meta charset="utf-8">
  <link rel="icon" href="/favicon.ico" type="image/x-icon">
  <link rel="shortcut icon" href="/favicon.ico">
  <link REL="Icon" href="https://cdn.example.com/icon.png">
  <link rel="apple-touch-icon" sizes="180x180" href="/apple-touch-icon.png">
  <link rel="apple-touch-icon-precomposed" href="touch.png">
  <link rel="alternate" type="application/rss+xml" title="RSS" href="/feed.xml">
  <link rel="alternate" type="application/atom+xml" href="atom.xml">
  <link rel="alternate" type="application/json" href="/feed.json">
  <link rel="alternate" type="text/html" hreflang="fr" href="/fr/">
  <link rel="alternate" type="application/rss+xml">
  <meta property="og:image" content="/images/card.png">
  <meta property="og:image:secure_url" content="https://example.com/images/card.png">
  <meta property="og:image:width" content="1200">
  <meta property="og:image:height" content="630">
  <meta property="og:image:alt" content="A card">
  <meta property="og:title" content="Ignored">
  <meta name="twitter:image:src" content="">
  <meta name="twitter:image:src" content="/tw.png">
</head>
<body><p>Hi<br>there</p><link rel="icon" href="/late.ico"></body>
</html>"#;

    fn metadata() -> HtmlMetadata {
        parse(&RawInput::new("https://example.com/blog/", PAGE))
    }

    #[test]
    fn test_collects_link_and_meta_tags_in_order() {
        let metadata = metadata();
        assert_eq!(metadata.base_url, "https://example.com/blog/");
        assert_eq!(metadata.tags.len(), 20);
        assert_eq!(metadata.tags[0].tag_type, HtmlTagType::Meta);
        assert_eq!(metadata.tags[0].attributes.get("charset"), Some("utf-8"));
        assert_eq!(metadata.tags[1].tag_type, HtmlTagType::Link);
    }

    #[test]
    fn test_favicons_deduplicated_and_resolved() {
        let urls: Vec<_> = metadata().favicons.into_iter().map(|f| f.url).collect();
        assert_eq!(
            urls,
            [
                "https://example.com/favicon.ico",
                "https://cdn.example.com/icon.png",
                "https://example.com/late.ico",
            ]
        );
    }

    #[test]
    fn test_apple_touch_icons() {
        let icons = metadata().apple_touch_icons;
        assert_eq!(icons.len(), 2);
        assert_eq!(icons[0].width, Some(180.0));
        assert_eq!(icons[0].height, Some(180.0));
        assert_eq!(icons[0].url.as_deref(), Some("https://example.com/apple-touch-icon.png"));
        assert_eq!(icons[1].sizes, None);
        assert_eq!(icons[1].url.as_deref(), Some("https://example.com/blog/touch.png"));
    }

    #[test]
    fn test_feed_links() {
        let links = metadata().feed_links;
        let urls: Vec<_> = links.iter().filter_map(|l| l.url.as_deref()).collect();
        assert_eq!(
            urls,
            [
                "https://example.com/feed.xml",
                "https://example.com/blog/atom.xml",
                "https://example.com/feed.json",
            ]
        );
        assert_eq!(links[0].title.as_deref(), Some("RSS"));
        assert_eq!(links[1].mime_type.as_deref(), Some("application/atom+xml"));
    }

    #[test]
    fn test_open_graph_image() {
        let image = metadata().open_graph.image.unwrap();
        assert_eq!(
            image,
            OpenGraphImage {
                url: Some("https://example.com/images/card.png".into()),
                secure_url: Some("https://example.com/images/card.png".into()),
                mime_type: None,
                width: Some(1200.0),
                height: Some(630.0),
                alt_text: Some("A card".into()),
            }
        );
    }

    #[test]
    fn test_open_graph_image_keeps_first_resolved_url() {
        let page = r#"<head>
            <meta property="og:image" content="http://[bad">
            <meta property="og:image" content="/first.png">
            <meta property="og:image:url" content="/second.png">
        </head>"#;
        let metadata = parse(&RawInput::new("https://example.com/", page));
        let image = metadata.open_graph.image.unwrap();
        assert_eq!(image.url.as_deref(), Some("https://example.com/first.png"));
    }

    #[test]
    fn test_meta_content_is_url_value() {
        let meta = HtmlTag {
            tag_type: HtmlTagType::Meta,
            attributes: [("property", "og:image"), ("content", "/card.png")].into_iter().collect(),
        };
        assert_eq!(meta.url_value(), Some("/card.png"));
        assert_eq!(
            meta.resolved_url("https://example.com/a/").as_deref(),
            Some("https://example.com/card.png")
        );

        let link = HtmlTag {
            tag_type: HtmlTagType::Link,
            attributes: [("rel", "icon"), ("content", "/not-a-url.png")].into_iter().collect(),
        };
        assert_eq!(link.url_value(), None);
    }

    #[test]
    fn test_twitter_image_first_non_empty() {
        assert_eq!(
            metadata().twitter.image_url.as_deref(),
            Some("https://example.com/tw.png")
        );
    }

    #[test]
    fn test_page_without_metadata() {
        let metadata = parse(&RawInput::new("https://example.com/", "<p>just text"));
        assert!(metadata.tags.is_empty());
        assert!(metadata.favicons.is_empty());
        assert_eq!(metadata.open_graph.image, None);
        assert_eq!(metadata.twitter.image_url, None);
    }

    #[test]
    fn test_sizes_parsing() {
        assert_eq!(parse_sizes("32x16"), Some((32.0, 16.0)));
        assert_eq!(parse_sizes("any"), None);
        assert_eq!(parse_sizes("32x"), None);
    }
}
