//! Miner Registry
//!
//! A miner turns one data item into tooltip content for a given track type and
//! event kind. Miners are registered per `(event, type)`; several miners for
//! the same key run in registration order. A header producer registered for a
//! type switches that type into table mode: every miner then returns a row and
//! all rows share one table.
//!
//! The registry is built explicitly and handed to the composer; the bundled
//! modules each expose a `register` function.

pub mod crispr;
pub mod info;
pub mod standard;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::TipError;
use crate::render::linker::TextLinker;
use crate::render::table::TableCell;
use crate::tooltip::context::TipContext;

/// Host event that triggered the render
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    #[serde(rename = "mouseover")]
    MouseOver,
    Click,
}

impl EventKind {
    /// Map a DOM event type; anything that is not a click is treated as hover
    pub fn from_dom(event_type: &str) -> Self {
        if event_type.eq_ignore_ascii_case("click") {
            EventKind::Click
        } else {
            EventKind::MouseOver
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::MouseOver => "mouseover",
            EventKind::Click => "click",
        }
    }
}

/// What a miner produced for one item
#[derive(Debug, Clone, PartialEq)]
pub enum MinerOutput {
    Html(String),
    /// One table row, for types in table mode
    Row(Vec<TableCell>),
}

impl MinerOutput {
    /// Non-empty HTML, or nothing
    pub fn html(text: String) -> Option<Self> {
        (!text.is_empty()).then_some(MinerOutput::Html(text))
    }
}

pub type Miner = Box<dyn Fn(&TipContext, usize) -> Option<MinerOutput>>;
pub type HeaderMiner = Box<dyn Fn(&TipContext) -> Vec<String>>;

type MinerKey = (EventKind, String);

#[derive(Default)]
pub struct MinerRegistry {
    miners: HashMap<MinerKey, Vec<Miner>>,
    headers: HashMap<MinerKey, HeaderMiner>,
}

impl MinerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the standard, CRISPR and information miners and their
    /// linkers installed
    pub fn with_bundled(linker: &mut TextLinker) -> Result<Self, TipError> {
        let mut registry = Self::new();
        standard::register(&mut registry, linker)?;
        crispr::register(&mut registry, linker)?;
        info::register(&mut registry, linker)?;
        console_log!(
            "[MinerRegistry] Loaded {} miners for {} types",
            registry.miner_count(),
            registry.miners.len()
        );
        Ok(registry)
    }

    pub fn register<F>(&mut self, event: EventKind, type_name: &str, miner: F)
    where
        F: Fn(&TipContext, usize) -> Option<MinerOutput> + 'static,
    {
        self.miners
            .entry((event, type_name.to_string()))
            .or_default()
            .push(Box::new(miner));
    }

    /// Register the column header for a table-mode type. The first header
    /// registered for a key is kept.
    pub fn register_header<F>(&mut self, event: EventKind, type_name: &str, header: F)
    where
        F: Fn(&TipContext) -> Vec<String> + 'static,
    {
        self.headers
            .entry((event, type_name.to_string()))
            .or_insert_with(|| Box::new(header));
    }

    pub fn lookup(&self, event: EventKind, type_name: &str) -> &[Miner] {
        self.miners
            .get(&(event, type_name.to_string()))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn header(&self, event: EventKind, type_name: &str) -> Option<&HeaderMiner> {
        self.headers.get(&(event, type_name.to_string()))
    }

    /// Whether anything at all is registered for this event
    pub fn has_event(&self, event: EventKind) -> bool {
        self.miners.keys().any(|(e, _)| *e == event)
    }

    pub fn miner_count(&self) -> usize {
        self.miners.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TipConfig;
    use crate::model::items::PlottedObject;
    use crate::tooltip::TipComposer;
    use serde_json::json;

    #[test]
    fn test_registration_order_is_call_order() {
        let mut registry = MinerRegistry::new();
        registry.register(EventKind::MouseOver, "feature", |_, _| MinerOutput::html("one".into()));
        registry.register(EventKind::MouseOver, "feature", |_, _| MinerOutput::html("two".into()));

        let composer = TipComposer::with_registries(
            TipConfig::default(),
            "cx",
            registry,
            TextLinker::new(),
        );
        let obj = PlottedObject::from_value(json!({ "name": "feature", "data": [{}] })).unwrap();
        let ctx = composer.context(&obj, EventKind::MouseOver);
        let out: Vec<_> = composer
            .miners()
            .lookup(EventKind::MouseOver, "feature")
            .iter()
            .filter_map(|m| m(&ctx, 0))
            .collect();
        assert_eq!(
            out,
            vec![MinerOutput::Html("one".into()), MinerOutput::Html("two".into())]
        );
    }

    #[test]
    fn test_lookup_misses_are_empty() {
        let registry = MinerRegistry::new();
        assert!(registry.lookup(EventKind::Click, "nothing").is_empty());
        assert!(registry.header(EventKind::Click, "nothing").is_none());
        assert!(!registry.has_event(EventKind::MouseOver));
    }

    #[test]
    fn test_first_header_kept() {
        let mut registry = MinerRegistry::new();
        registry.register_header(EventKind::MouseOver, "x", |_| vec!["A".into()]);
        registry.register_header(EventKind::MouseOver, "x", |_| vec!["B".into()]);
        assert!(registry.header(EventKind::MouseOver, "x").is_some());
        assert_eq!(registry.headers.len(), 1);
    }

    #[test]
    fn test_bundled_miners() {
        let mut linker = TextLinker::new();
        let registry = MinerRegistry::with_bundled(&mut linker).unwrap();
        for name in ["polymorphism", "polymorphismBrief", "alignment", "feature", "featureBrief",
                     "unknown", "crispr", "information", "informationBrief"] {
            assert_eq!(registry.lookup(EventKind::MouseOver, name).len(), 1, "{}", name);
        }
        assert!(registry.header(EventKind::MouseOver, "polymorphismBrief").is_some());
        assert!(registry.header(EventKind::MouseOver, "featureBrief").is_some());
        assert!(registry.header(EventKind::MouseOver, "informationBrief").is_some());
        assert_eq!(linker.linker_count(), 5);
    }

    #[test]
    fn test_event_kind_names() {
        assert_eq!(EventKind::from_dom("click"), EventKind::Click);
        assert_eq!(EventKind::from_dom("mouseover"), EventKind::MouseOver);
        assert_eq!(EventKind::from_dom("mousemove"), EventKind::MouseOver);
        let kind: EventKind = serde_json::from_str("\"mouseover\"").unwrap();
        assert_eq!(kind, EventKind::MouseOver);
    }
}
