use std::collections::HashMap;

use once_cell::sync::Lazy;
use tracing::debug;

use crate::{
    elements::{Payload, PayloadKind},
    error::{Error, Result},
    payloads,
    xml::XmlElement,
    REGRWS,
};

static BUILTIN: Lazy<Registry> = Lazy::new(payloads::registry);

/// Maps root tag names to payload types.
#[derive(Debug, Default, Clone)]
pub struct Registry {
    kinds: HashMap<&'static str, &'static dyn PayloadKind>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every payload type that can appear under its own tag.
    pub fn builtin() -> &'static Registry {
        &BUILTIN
    }

    pub fn register(&mut self, kind: &'static dyn PayloadKind) -> &mut Self {
        self.kinds.insert(kind.name(), kind);
        self
    }

    pub fn with(mut self, kind: &'static dyn PayloadKind) -> Self {
        self.register(kind);
        self
    }

    pub fn lookup(&self, tag: &str) -> Option<&'static dyn PayloadKind> {
        self.kinds.get(tag).copied()
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.kinds.contains_key(tag)
    }

    /// A blank payload for the tag, if one is registered.
    pub fn instantiate(&self, tag: &str) -> Result<Option<Payload>> {
        self.lookup(tag).map(Payload::new).transpose()
    }

    pub fn from_xml(&self, xml: &str) -> Result<Payload> {
        let root = XmlElement::parse(xml)?;
        self.from_element(&root)
    }

    pub fn from_element(&self, root: &XmlElement) -> Result<Payload> {
        let kind = self
            .lookup(&root.name)
            .ok_or_else(|| Error::Parse(format!("payload \"{}\" is not known", root.name)))?;
        debug!(target: REGRWS, tag = %root.name, class = kind.class(), "resolved payload");
        let mut payload = Payload::new(kind)?;
        payload.xml_parse(root, self)?;
        Ok(payload)
    }
}
