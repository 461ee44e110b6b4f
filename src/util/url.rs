use url::Url;

/// Resolves a potentially relative URL against a base URL.
///
/// Returns `None` when `href` is empty or cannot be made absolute: either the
/// base does not parse or joining fails. Already-absolute `href` values are
/// accepted even when the base is unusable.
///
/// The result is the `url` crate's serialization, so it is normalized
/// (`https://Example.com` becomes `https://example.com/`).
pub fn resolve_url(href: &str, base_url: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }

    if let Ok(absolute) = Url::parse(href) {
        return Some(absolute.to_string());
    }

    // Protocol-relative: borrow the base scheme, default to https
    if href.starts_with("//") {
        let scheme = Url::parse(base_url)
            .map(|base| base.scheme().to_owned())
            .unwrap_or_else(|_| "https".to_owned());
        return Url::parse(&format!("{scheme}:{href}"))
            .ok()
            .map(|u| u.to_string());
    }

    let base = Url::parse(base_url).ok()?;
    base.join(href).ok().map(|u| u.to_string())
}

/// Best-effort variant of [`resolve_url`] used for feed item links.
///
/// Anything that already starts with `http` (any case) is returned untouched.
/// Otherwise the value is resolved against `base_url`; if that fails the
/// original string comes back unchanged.
pub fn resolve_url_lenient(href: &str, base_url: &str) -> String {
    if href.len() >= 4 && href.as_bytes()[..4].eq_ignore_ascii_case(b"http") {
        return href.to_owned();
    }

    match Url::parse(base_url).and_then(|base| base.join(href)) {
        Ok(resolved) => resolved.to_string(),
        Err(_) => href.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_relative_path() {
        assert_eq!(
            resolve_url("feed.xml", "https://example.com/blog/").as_deref(),
            Some("https://example.com/blog/feed.xml")
        );
        assert_eq!(
            resolve_url("/feed.xml", "https://example.com/blog/post").as_deref(),
            Some("https://example.com/feed.xml")
        );
    }

    #[test]
    fn test_resolve_absolute_ignores_base() {
        assert_eq!(
            resolve_url("https://cdn.example.org/icon.png", "not a url").as_deref(),
            Some("https://cdn.example.org/icon.png")
        );
    }

    #[test]
    fn test_resolve_protocol_relative_uses_base_scheme() {
        assert_eq!(
            resolve_url("//cdn.example.org/a.png", "http://example.com/").as_deref(),
            Some("http://cdn.example.org/a.png")
        );
        assert_eq!(
            resolve_url("//cdn.example.org/a.png", "").as_deref(),
            Some("https://cdn.example.org/a.png")
        );
    }

    #[test]
    fn test_resolve_fails_without_usable_base() {
        assert!(resolve_url("icon.png", "").is_none());
        assert!(resolve_url("", "https://example.com/").is_none());
        assert!(resolve_url("   ", "https://example.com/").is_none());
    }

    #[test]
    fn test_lenient_keeps_http_prefixed_values() {
        assert_eq!(
            resolve_url_lenient("HTTP://Example.com/A", "https://base.example/"),
            "HTTP://Example.com/A"
        );
    }

    #[test]
    fn test_lenient_resolves_or_falls_back() {
        assert_eq!(
            resolve_url_lenient("/posts/1", "https://example.com/feed"),
            "https://example.com/posts/1"
        );
        assert_eq!(resolve_url_lenient("/posts/1", "garbage"), "/posts/1");
    }
}
