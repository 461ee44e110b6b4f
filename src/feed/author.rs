//! Single-string author heuristic.
//!
//! RSS `author` and `dc:creator` carry one free-text string. Rules, first
//! match wins:
//!
//! 1. empty after trimming: no author
//! 2. starts with `http://` or `https://`: URL
//! 3. `email (Name)`: email address and name
//! 4. `Name <email>`: name and email address
//! 5. one token containing `@`: email address
//! 6. anything else: name

use super::types::ParsedAuthor;
use crate::util::trimmed_non_empty;

impl ParsedAuthor {
    /// Builds an author from one free-text field. Returns `None` for blank
    /// input.
    ///
    /// ```
    /// use feedparse::feed::ParsedAuthor;
    ///
    /// let author = ParsedAuthor::from_single_string("jo@example.com (Jo Doe)").unwrap();
    /// assert_eq!(author.name.as_deref(), Some("Jo Doe"));
    /// assert_eq!(author.email_address.as_deref(), Some("jo@example.com"));
    /// ```
    pub fn from_single_string(input: &str) -> Option<ParsedAuthor> {
        let s = input.trim();
        if s.is_empty() {
            return None;
        }

        let lower = s.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            return Some(ParsedAuthor {
                url: Some(s.to_owned()),
                ..Default::default()
            });
        }

        if let Some(author) = email_then_name(s).or_else(|| name_then_email(s)) {
            return Some(author);
        }

        if s.contains('@') && !s.contains(char::is_whitespace) {
            return Some(ParsedAuthor {
                email_address: Some(s.to_owned()),
                ..Default::default()
            });
        }

        Some(ParsedAuthor {
            name: Some(s.to_owned()),
            ..Default::default()
        })
    }
}

/// `jo@example.com (Jo Doe)`
fn email_then_name(s: &str) -> Option<ParsedAuthor> {
    let inner = s.strip_suffix(')')?;
    let open = inner.find('(')?;
    let email = inner[..open].trim();
    if !email.contains('@') || email.contains(char::is_whitespace) {
        return None;
    }
    Some(ParsedAuthor {
        name: trimmed_non_empty(&inner[open + 1..]),
        email_address: Some(email.to_owned()),
        ..Default::default()
    })
}

/// `Jo Doe <jo@example.com>`
fn name_then_email(s: &str) -> Option<ParsedAuthor> {
    let inner = s.strip_suffix('>')?;
    let open = inner.rfind('<')?;
    let email = inner[open + 1..].trim();
    if !email.contains('@') {
        return None;
    }
    Some(ParsedAuthor {
        name: trimmed_non_empty(&inner[..open]),
        email_address: Some(email.to_owned()),
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn author(name: Option<&str>, email: Option<&str>, url: Option<&str>) -> ParsedAuthor {
        ParsedAuthor {
            name: name.map(str::to_owned),
            email_address: email.map(str::to_owned),
            url: url.map(str::to_owned),
            avatar_url: None,
        }
    }

    #[test]
    fn test_blank_is_none() {
        assert_eq!(ParsedAuthor::from_single_string(""), None);
        assert_eq!(ParsedAuthor::from_single_string(" \n\t"), None);
    }

    #[test]
    fn test_url() {
        assert_eq!(
            ParsedAuthor::from_single_string("https://example.com/about"),
            Some(author(None, None, Some("https://example.com/about")))
        );
        assert_eq!(
            ParsedAuthor::from_single_string("HTTP://example.com"),
            Some(author(None, None, Some("HTTP://example.com")))
        );
    }

    #[test]
    fn test_email_with_name_in_parens() {
        assert_eq!(
            ParsedAuthor::from_single_string("jo@example.com (Jo Doe)"),
            Some(author(Some("Jo Doe"), Some("jo@example.com"), None))
        );
        assert_eq!(
            ParsedAuthor::from_single_string("jo@example.com ()"),
            Some(author(None, Some("jo@example.com"), None))
        );
    }

    #[test]
    fn test_name_with_email_in_brackets() {
        assert_eq!(
            ParsedAuthor::from_single_string("Jo Doe <jo@example.com>"),
            Some(author(Some("Jo Doe"), Some("jo@example.com"), None))
        );
    }

    #[test]
    fn test_bare_email() {
        assert_eq!(
            ParsedAuthor::from_single_string("  jo@example.com "),
            Some(author(None, Some("jo@example.com"), None))
        );
    }

    #[test]
    fn test_plain_name() {
        assert_eq!(
            ParsedAuthor::from_single_string("Jo Doe"),
            Some(author(Some("Jo Doe"), None, None))
        );
        // Parens without an email are part of the name
        assert_eq!(
            ParsedAuthor::from_single_string("Jo (editor)"),
            Some(author(Some("Jo (editor)"), None, None))
        );
        // A space means it is not a bare address
        assert_eq!(
            ParsedAuthor::from_single_string("Jo at jo@example.com"),
            Some(author(Some("Jo at jo@example.com"), None, None))
        );
    }
}
