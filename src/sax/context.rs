use std::sync::Arc;

use super::intern::Interner;

/// The observer's handle into the engine during a callback.
///
/// Character storage is opt-in: call
/// [`begin_storing_characters`](Self::begin_storing_characters) from
/// `start_element` for the elements whose text you need, then read it back in
/// `end_element`. The engine clears the storage after every `end_element`
/// callback, so nothing leaks from one element into the next.
#[derive(Debug)]
pub struct SaxContext {
    storing: bool,
    characters: Vec<u8>,
    interner: Interner,
    cancelled: bool,
}

impl SaxContext {
    pub(crate) fn new(intern_capacity: usize) -> Self {
        Self {
            storing: false,
            characters: Vec::new(),
            interner: Interner::new(intern_capacity),
            cancelled: false,
        }
    }

    /// Starts accumulating character data, discarding anything stored so far.
    pub fn begin_storing_characters(&mut self) {
        self.storing = true;
        self.characters.clear();
    }

    pub fn end_storing_characters(&mut self) {
        self.storing = false;
        self.characters.clear();
    }

    pub fn is_storing_characters(&self) -> bool {
        self.storing
    }

    /// Bytes stored since the last `begin_storing_characters`, or `None` when
    /// not storing or nothing arrived.
    pub fn current_characters(&self) -> Option<&[u8]> {
        (self.storing && !self.characters.is_empty()).then_some(self.characters.as_slice())
    }

    /// Stored characters as a string. Invalid UTF-8 is replaced.
    pub fn current_string(&self) -> Option<String> {
        self.current_characters()
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }

    /// Stored characters with surrounding whitespace removed; `None` if
    /// nothing but whitespace was stored.
    pub fn current_trimmed_string(&self) -> Option<String> {
        self.current_string()
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
    }

    /// Returns the canonical shared copy of `value`.
    pub fn intern(&mut self, value: &str) -> Arc<str> {
        self.interner.intern(value)
    }

    /// Stops the parse after the current callback returns.
    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    pub(crate) fn append_characters(&mut self, text: &[u8]) {
        if self.storing {
            self.characters.extend_from_slice(text);
        }
    }
}
