//! Scoped namespace bindings.

use std::sync::Arc;

pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

#[derive(Debug, Clone)]
struct Binding {
    /// `None` is the default namespace.
    prefix: Option<Arc<str>>,
    /// `None` undeclares (`xmlns=""`).
    uri: Option<Arc<str>>,
    depth: usize,
}

/// Stack of `xmlns` declarations, popped as elements close.
#[derive(Debug)]
pub struct NamespaceStack {
    bindings: Vec<Binding>,
    depth: usize,
}

impl Default for NamespaceStack {
    fn default() -> Self {
        Self {
            bindings: vec![Binding {
                prefix: Some(Arc::from("xml")),
                uri: Some(Arc::from(XML_NAMESPACE)),
                depth: 0,
            }],
            depth: 0,
        }
    }
}

impl NamespaceStack {
    pub fn push_scope(&mut self) {
        self.depth += 1;
    }

    pub fn pop_scope(&mut self) {
        while self
            .bindings
            .last()
            .is_some_and(|binding| binding.depth >= self.depth && binding.depth > 0)
        {
            self.bindings.pop();
        }
        self.depth = self.depth.saturating_sub(1);
    }

    /// Declares a binding in the current scope. The `xml` prefix cannot be
    /// rebound.
    pub fn declare(&mut self, prefix: Option<Arc<str>>, uri: &str) {
        if prefix.as_deref() == Some("xml") {
            return;
        }
        let uri = (!uri.is_empty()).then(|| Arc::from(uri));
        self.bindings.push(Binding {
            prefix,
            uri,
            depth: self.depth,
        });
    }

    /// Resolves a prefix (or the default namespace for `None`).
    pub fn resolve(&self, prefix: Option<&str>) -> Option<Arc<str>> {
        self.bindings
            .iter()
            .rev()
            .find(|binding| binding.prefix.as_deref() == prefix)
            .and_then(|binding| binding.uri.clone())
    }
}
