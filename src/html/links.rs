//! Anchors (`<a>`) from an HTML page.

use serde::Serialize;

use super::run_html;
use crate::sax::{EndElement, SaxContext, SaxObserver, StartElement};
use crate::util::{resolve_url, trimmed_non_empty};
use crate::RawInput;

/// One anchor. Any field may be missing on real-world pages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HtmlLink {
    /// `href` resolved against the page URL.
    pub url: Option<String>,
    /// All text inside the anchor, nested markup included, trimmed.
    pub text: Option<String>,
    pub title: Option<String>,
}

/// Every `<a>` on the page, in document order. Never fails.
pub fn parse(input: &RawInput) -> Vec<HtmlLink> {
    run_html(LinkCollector::new(&input.url), input).links
}

struct OpenAnchor {
    link: HtmlLink,
    text: Vec<u8>,
}

struct LinkCollector {
    base_url: String,
    open: Option<OpenAnchor>,
    links: Vec<HtmlLink>,
}

impl LinkCollector {
    fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_owned(),
            open: None,
            links: Vec::new(),
        }
    }

    fn close_anchor(&mut self) {
        if let Some(OpenAnchor { mut link, text }) = self.open.take() {
            link.text = trimmed_non_empty(&String::from_utf8_lossy(&text));
            self.links.push(link);
        }
    }
}

impl SaxObserver for LinkCollector {
    fn start_element(&mut self, _ctx: &mut SaxContext, element: &StartElement<'_>) {
        if element.local_name != "a" {
            return;
        }
        // Anchors do not nest; a new one ends the previous
        self.close_anchor();

        let url = element
            .attribute_value("href")
            .and_then(|href| resolve_url(&href, &self.base_url));
        let title = element
            .attribute_value("title")
            .and_then(|title| trimmed_non_empty(&title));
        self.open = Some(OpenAnchor {
            link: HtmlLink { url, text: None, title },
            text: Vec::new(),
        });
    }

    fn end_element(&mut self, _ctx: &mut SaxContext, element: &EndElement<'_>) {
        if element.local_name == "a" {
            self.close_anchor();
        }
    }

    fn characters(&mut self, _ctx: &mut SaxContext, text: &[u8]) {
        if let Some(anchor) = self.open.as_mut() {
            anchor.text.extend_from_slice(text);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn links(html: &str) -> Vec<HtmlLink> {
        parse(&RawInput::new("https://example.com/posts/", html))
    }

    #[test]
    fn test_links_in_order() {
        let html = r#"<html><body>
            <p>See <a href="/about" title="About us">the <b>about</b> page</a>.</p>
            <A HREF="https://other.example/x">Other</A>
            <a href="next.html">  Next &raquo; </a>
        </body></html>"#;

        assert_eq!(
            links(html),
            vec![
                HtmlLink {
                    url: Some("https://example.com/about".into()),
                    text: Some("the about page".into()),
                    title: Some("About us".into()),
                },
                HtmlLink {
                    url: Some("https://other.example/x".into()),
                    text: Some("Other".into()),
                    title: None,
                },
                HtmlLink {
                    url: Some("https://example.com/posts/next.html".into()),
                    text: Some("Next »".into()),
                    title: None,
                },
            ]
        );
    }

    #[test]
    fn test_missing_fields() {
        let found = links(r#"<a name="top"></a><a href="">  </a><a title=" t ">x"#);
        assert_eq!(
            found,
            vec![
                HtmlLink::default(),
                HtmlLink::default(),
                HtmlLink {
                    url: None,
                    text: Some("x".into()),
                    title: Some("t".into()),
                },
            ]
        );
    }

    #[test]
    fn test_unclosed_anchor_ended_by_next() {
        let found = links(r#"<a href="/1">one<a href="/2">two</a>"#);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].text.as_deref(), Some("one"));
        assert_eq!(found[1].url.as_deref(), Some("https://example.com/2"));
    }

    #[test]
    fn test_script_text_in_anchor_is_kept_raw() {
        let found = links(r#"<a href="/x"><script>if (a < b) {}</script>go</a>"#);
        assert_eq!(found[0].text.as_deref(), Some("if (a < b) {}go"));
    }
}
