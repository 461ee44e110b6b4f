//! SAX event types.
//!
//! Observers receive borrowed events ([`StartElement`], [`EndElement`]) that
//! live only for the duration of one callback. [`SaxEvent`] is the owned form,
//! used by [`SaxCollector`](super::SaxCollector) and by tests.

use std::borrow::Cow;

use serde::Serialize;

use super::{entities, SaxContext};
use crate::util::AttributeMap;

/// One attribute of a start tag.
///
/// The value is kept exactly as it appears between the quotes. Call
/// [`value`](Self::value) to get the entity-decoded text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attribute<'a> {
    /// Qualified name as written (`href`, `xml:lang`, `rdf:about`).
    /// Lower-cased in HTML mode.
    pub name: &'a str,
    pub raw_value: &'a [u8],
    pub(crate) html: bool,
}

impl<'a> Attribute<'a> {
    /// The entity-decoded value. Invalid UTF-8 is replaced, not rejected.
    pub fn value(&self) -> Cow<'a, str> {
        match entities::decode(self.raw_value, self.html) {
            Cow::Borrowed(bytes) => String::from_utf8_lossy(bytes),
            Cow::Owned(bytes) => Cow::Owned(String::from_utf8_lossy(&bytes).into_owned()),
        }
    }

    /// Local part of the name (`lang` for `xml:lang`).
    pub fn local_name(&self) -> &'a str {
        split_qualified(self.name).1
    }
}

/// An element start delivered to [`SaxObserver::start_element`](super::SaxObserver::start_element).
#[derive(Debug, Clone, Copy)]
pub struct StartElement<'a> {
    /// Qualified name as written.
    pub name: &'a str,
    pub local_name: &'a str,
    pub prefix: Option<&'a str>,
    /// Namespace URI the prefix (or default namespace) resolves to.
    pub uri: Option<&'a str>,
    pub attributes: &'a [Attribute<'a>],
}

impl<'a> StartElement<'a> {
    /// First attribute whose qualified name matches, ignoring ASCII case.
    pub fn attribute(&self, name: &str) -> Option<&Attribute<'a>> {
        self.attributes
            .iter()
            .find(|attr| attr.name.eq_ignore_ascii_case(name))
    }

    /// Decoded value of the named attribute.
    pub fn attribute_value(&self, name: &str) -> Option<Cow<'a, str>> {
        self.attribute(name).map(Attribute::value)
    }

    /// True when the element has this local name and no prefix.
    pub fn is_unprefixed(&self, local_name: &str) -> bool {
        self.prefix.is_none() && self.local_name == local_name
    }

    /// Every attribute with its decoded value. Keys are interned through
    /// `ctx`.
    pub fn attribute_map(&self, ctx: &mut SaxContext) -> AttributeMap {
        self.attributes
            .iter()
            .map(|attr| (ctx.intern(attr.name), attr.value().into_owned()))
            .collect()
    }

    pub(crate) fn to_owned_event(self) -> SaxEvent {
        SaxEvent::StartElement {
            local_name: self.local_name.to_owned(),
            prefix: self.prefix.map(str::to_owned),
            uri: self.uri.map(str::to_owned),
            attributes: self
                .attributes
                .iter()
                .map(|attr| OwnedAttribute {
                    name: attr.name.to_owned(),
                    value: attr.raw_value.to_vec(),
                })
                .collect(),
        }
    }
}

/// An element end delivered to [`SaxObserver::end_element`](super::SaxObserver::end_element).
#[derive(Debug, Clone, Copy)]
pub struct EndElement<'a> {
    pub name: &'a str,
    pub local_name: &'a str,
    pub prefix: Option<&'a str>,
    pub uri: Option<&'a str>,
}

impl EndElement<'_> {
    pub fn is_unprefixed(&self, local_name: &str) -> bool {
        self.prefix.is_none() && self.local_name == local_name
    }

    pub(crate) fn to_owned_event(self) -> SaxEvent {
        SaxEvent::EndElement {
            local_name: self.local_name.to_owned(),
            prefix: self.prefix.map(str::to_owned),
            uri: self.uri.map(str::to_owned),
        }
    }
}

/// Owned attribute with its raw value bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OwnedAttribute {
    pub name: String,
    #[serde(serialize_with = "serialize_lossy")]
    pub value: Vec<u8>,
}

/// Owned SAX event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SaxEvent {
    StartElement {
        local_name: String,
        prefix: Option<String>,
        uri: Option<String>,
        attributes: Vec<OwnedAttribute>,
    },
    EndElement {
        local_name: String,
        prefix: Option<String>,
        uri: Option<String>,
    },
    Characters {
        #[serde(serialize_with = "serialize_lossy")]
        text: Vec<u8>,
    },
    EndOfDocument,
}

impl SaxEvent {
    pub fn is_start_element(&self) -> bool {
        matches!(self, SaxEvent::StartElement { .. })
    }

    pub fn is_end_element(&self) -> bool {
        matches!(self, SaxEvent::EndElement { .. })
    }

    /// Local name for start and end events.
    pub fn local_name(&self) -> Option<&str> {
        match self {
            SaxEvent::StartElement { local_name, .. } | SaxEvent::EndElement { local_name, .. } => {
                Some(local_name)
            }
            _ => None,
        }
    }
}

fn serialize_lossy<S: serde::Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&String::from_utf8_lossy(bytes))
}

/// Splits `prefix:local` at the first colon. Names without a colon, or with a
/// leading or trailing colon, have no prefix.
pub(crate) fn split_qualified(name: &str) -> (Option<&str>, &str) {
    match name.split_once(':') {
        Some((prefix, local)) if !prefix.is_empty() && !local.is_empty() => (Some(prefix), local),
        _ => (None, name),
    }
}
