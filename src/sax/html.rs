//! Tag-soup rules for HTML mode.
//!
//! HTML mode does not build a DOM, so only the rules that change the event
//! stream are modelled: void elements, raw-text elements, and the handful of
//! elements that implicitly close a sibling of the same name.

/// Elements that never have content or an end tag.
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

pub fn is_void(name: &str) -> bool {
    VOID_ELEMENTS.contains(&name)
}

/// Elements whose content is text up to the matching end tag.
pub fn is_raw_text(name: &str) -> bool {
    matches!(name, "script" | "style")
}

/// Opening one of these while the same element is current closes it first
/// (`<li>a<li>b`).
pub fn closes_open_sibling(name: &str) -> bool {
    matches!(name, "p" | "li" | "option" | "dt" | "dd" | "tr" | "td" | "th")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rules() {
        assert!(is_void("br"));
        assert!(is_void("meta"));
        assert!(!is_void("div"));
        assert!(is_raw_text("style"));
        assert!(!is_raw_text("textarea"));
        assert!(closes_open_sibling("li"));
        assert!(!closes_open_sibling("ul"));
    }
}
