//! SAX Collector
//!
//! Observer that records every event in owned form. Used by the `events`
//! CLI command and by tests that compare event streams.

use super::event::{EndElement, SaxEvent, StartElement};
use super::{SaxContext, SaxObserver};

#[derive(Debug, Clone, Default)]
pub struct SaxCollector {
    events: Vec<SaxEvent>,
}

impl SaxCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[SaxEvent] {
        &self.events
    }

    pub fn into_events(self) -> Vec<SaxEvent> {
        self.events
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// All character data, concatenated.
    pub fn text(&self) -> String {
        let bytes: Vec<u8> = self
            .events
            .iter()
            .filter_map(|event| match event {
                SaxEvent::Characters { text } => Some(text.as_slice()),
                _ => None,
            })
            .flatten()
            .copied()
            .collect();
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl SaxObserver for SaxCollector {
    fn start_element(&mut self, _ctx: &mut SaxContext, element: &StartElement<'_>) {
        self.events.push(element.to_owned_event());
    }

    fn end_element(&mut self, _ctx: &mut SaxContext, element: &EndElement<'_>) {
        self.events.push(element.to_owned_event());
    }

    fn characters(&mut self, _ctx: &mut SaxContext, text: &[u8]) {
        self.events.push(SaxEvent::Characters {
            text: text.to_vec(),
        });
    }

    fn end_of_document(&mut self, _ctx: &mut SaxContext) {
        self.events.push(SaxEvent::EndOfDocument);
    }
}
