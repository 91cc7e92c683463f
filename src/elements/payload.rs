use std::fmt;

use serde::{ser::SerializeMap, Serialize, Serializer};
use tracing::{debug, trace, warn};

use super::{Field, Group, MultiLine, Node};
use crate::{
    error::{Error, Result},
    registry::Registry,
    value::Value,
    xml::XmlElement,
    REGRWS,
};

/// Namespace of the core registration schema.
pub const CORE_NAMESPACE: &str = "http://www.arin.net/regrws/core/v1";

/// Schema and behavior of one payload type.
///
/// `init` declares the children once per instance; the remaining hooks
/// default to the generic behavior and are overridden per type.
pub trait PayloadKind: fmt::Debug + Send + Sync {
    /// Type name, used in messages and class-list validation.
    fn class(&self) -> &'static str;

    /// Root tag name.
    fn name(&self) -> &'static str;

    fn namespace(&self) -> &'static str {
        CORE_NAMESPACE
    }

    fn init(&self, payload: &mut Payload) -> Result<()>;

    /// Primary payloads stand alone as request or response bodies.
    fn is_primary(&self) -> bool {
        false
    }

    fn handle(&self, _payload: &Payload) -> Option<String> {
        None
    }

    fn is_valid(&self, payload: &Payload) -> bool {
        payload.children_valid()
    }

    /// Display form. Defaults to the handle.
    fn describe(&self, payload: &Payload) -> String {
        payload.handle().unwrap_or_default()
    }

    /// Label used in the submission warning.
    fn label(&self, payload: &Payload) -> String {
        payload.handle().unwrap_or_default()
    }

    /// Wholly read-only payloads reject `set` and `add`.
    fn read_only(&self) -> bool {
        false
    }

    /// Whether the child under `alias` is reachable through lookups.
    fn exposes(&self, _alias: &str, _node: &Node) -> bool {
        true
    }

    fn value(&self, payload: &Payload) -> Value {
        payload.children_value()
    }

    /// Assignment of a value to a nested payload of this type.
    fn set_value(&self, payload: &mut Payload, value: Value) -> Result<()> {
        payload.replace(value)
    }

    fn xml_append(&self, payload: &Payload, parent: &mut XmlElement) {
        payload.append_wrapped(parent)
    }

    fn xml_children(&self, payload: &Payload, element: &mut XmlElement) {
        payload.append_children(element)
    }

    fn xml_parse(&self, payload: &mut Payload, node: &XmlElement, registry: &Registry) -> Result<()> {
        payload.parse_children(node, registry)
    }
}

/// A named tree of aliased fields, groups and nested payloads.
#[derive(Debug, Clone)]
pub struct Payload {
    kind: &'static dyn PayloadKind,
    elements: Vec<(String, Node)>,
    options: Vec<(&'static str, String)>,
}

impl Payload {
    pub fn new(kind: &'static dyn PayloadKind) -> Result<Self> {
        let mut payload = Self {
            kind,
            elements: Vec::new(),
            options: Vec::new(),
        };
        kind.init(&mut payload)?;
        Ok(payload)
    }

    /// Parses a document whose root is any registered payload.
    pub fn from_xml(xml: &str) -> Result<Self> {
        Registry::builtin().from_xml(xml)
    }

    pub fn kind(&self) -> &'static dyn PayloadKind {
        self.kind
    }

    pub fn class(&self) -> &'static str {
        self.kind.class()
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn namespace(&self) -> &'static str {
        self.kind.namespace()
    }

    pub fn is_primary(&self) -> bool {
        self.kind.is_primary()
    }

    pub fn is_a(&self, class: &str) -> bool {
        self.kind.class() == class
    }

    pub fn handle(&self) -> Option<String> {
        self.kind.handle(self)
    }

    /// Declares a child. Without an alias the child's tag name is used.
    pub fn define(&mut self, alias: Option<&str>, node: impl Into<Node>) -> Result<&mut Self> {
        let node = node.into();
        let alias = alias.unwrap_or_else(|| node.name()).to_string();
        if self.elements.iter().any(|(a, _)| *a == alias) {
            return Err(Error::DuplicateAlias(alias));
        }
        self.elements.push((alias, node));
        Ok(self)
    }

    pub fn option(&self, key: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_option(&mut self, key: &'static str, value: impl Into<String>) {
        let value = value.into();
        match self.options.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.options.push((key, value)),
        }
    }

    /// Exact alias first, then a case-insensitive match on alias or tag name.
    fn position(&self, key: &str, exposed_only: bool) -> Option<usize> {
        let visible = |(alias, node): &(String, Node)| !exposed_only || self.kind.exposes(alias, node);
        self.elements
            .iter()
            .position(|entry| entry.0 == key && visible(entry))
            .or_else(|| {
                self.elements.iter().position(|entry| {
                    (entry.0.eq_ignore_ascii_case(key) || entry.1.name().eq_ignore_ascii_case(key))
                        && visible(entry)
                })
            })
    }

    fn locate(&self, key: &str) -> Result<usize> {
        self.position(key, true)
            .ok_or_else(|| Error::not_found(key, self.class()))
    }

    fn guard(&self) -> Result<()> {
        if self.kind.read_only() {
            return Err(Error::ReadOnlyPayload(self.class().to_string()));
        }
        Ok(())
    }

    pub fn has(&self, key: &str) -> bool {
        self.position(key, true).is_some()
    }

    pub fn attr(&self, key: &str) -> Result<&Node> {
        let index = self.locate(key)?;
        Ok(&self.elements[index].1)
    }

    pub fn attr_mut(&mut self, key: &str) -> Result<&mut Node> {
        self.guard()?;
        let index = self.locate(key)?;
        Ok(&mut self.elements[index].1)
    }

    pub fn field(&self, key: &str) -> Result<&Field> {
        self.attr(key)?
            .as_field()
            .ok_or_else(|| Error::not_found(key, self.class()))
    }

    pub fn group(&self, key: &str) -> Result<&Group> {
        self.attr(key)?
            .as_group()
            .ok_or_else(|| Error::not_found(key, self.class()))
    }

    pub fn group_mut(&mut self, key: &str) -> Result<&mut Group> {
        let class = self.class();
        self.attr_mut(key)?
            .as_group_mut()
            .ok_or_else(|| Error::not_found(key, class))
    }

    pub fn multi_line(&self, key: &str) -> Result<&MultiLine> {
        self.attr(key)?
            .as_multi_line()
            .ok_or_else(|| Error::not_found(key, self.class()))
    }

    pub fn payload(&self, key: &str) -> Result<&Payload> {
        self.attr(key)?
            .as_payload()
            .ok_or_else(|| Error::not_found(key, self.class()))
    }

    pub fn payload_mut(&mut self, key: &str) -> Result<&mut Payload> {
        let class = self.class();
        self.attr_mut(key)?
            .as_payload_mut()
            .ok_or_else(|| Error::not_found(key, class))
    }

    /// Read value of a child.
    pub fn get(&self, key: &str) -> Result<Value> {
        Ok(self.attr(key)?.value())
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> Result<&mut Self> {
        self.guard()?;
        let index = self.locate(key)?;
        self.elements[index].1.set_value(value)?;
        Ok(self)
    }

    /// Appends to a group or multi-line child, or sets an empty field.
    pub fn add(&mut self, key: &str, value: impl Into<Value>) -> Result<&mut Self> {
        self.guard()?;
        let index = self.locate(key)?;
        match &mut self.elements[index].1 {
            Node::Group(group) => group.add_value(value)?,
            Node::MultiLine(block) => block.add_value(value)?,
            Node::Field(field) if !field.is_valid() => field.set_value(value)?,
            other => return Err(Error::NotAGroup(other.name().to_string())),
        }
        Ok(self)
    }

    /// Clears a child if it exists.
    pub fn unset(&mut self, key: &str) -> Result<()> {
        if self.has(key) {
            self.set(key, Value::Null)?;
        }
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.elements
            .iter()
            .filter(|(alias, node)| self.kind.exposes(alias, node))
            .map(|(alias, node)| (alias.as_str(), node))
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_valid(&self) -> bool {
        self.kind.is_valid(self)
    }

    /// All children are valid.
    pub fn children_valid(&self) -> bool {
        self.elements.iter().all(|(_, node)| node.is_valid())
    }

    /// Validity of the child declared under `alias`; unknown aliases are
    /// never valid.
    pub fn valid(&self, alias: &str) -> bool {
        self.elements
            .iter()
            .find(|(a, _)| a == alias)
            .is_some_and(|(_, node)| node.is_valid())
    }

    pub fn all_valid(&self, aliases: &[&str]) -> bool {
        aliases.iter().all(|alias| self.valid(alias))
    }

    pub fn none_valid(&self, aliases: &[&str]) -> bool {
        !aliases.iter().any(|alias| self.valid(alias))
    }

    /// Validity of every child by alias.
    pub fn validity(&self) -> Vec<(&str, bool)> {
        self.elements
            .iter()
            .map(|(alias, node)| (alias.as_str(), node.is_valid()))
            .collect()
    }

    pub fn value(&self) -> Value {
        self.kind.value(self)
    }

    /// Read values of all children, keyed by alias.
    pub fn children_value(&self) -> Value {
        Value::Map(
            self.elements
                .iter()
                .map(|(alias, node)| (alias.clone(), node.value()))
                .collect(),
        )
    }

    pub fn set_value(&mut self, value: impl Into<Value>) -> Result<()> {
        let kind = self.kind;
        kind.set_value(self, value.into())
    }

    /// Swaps in another payload of the same type, or a blank one for null.
    pub fn replace(&mut self, value: Value) -> Result<()> {
        match value {
            Value::Null => {
                *self = Payload::new(self.kind)?;
                Ok(())
            }
            Value::Node(node) => match *node {
                Node::Payload(other) if other.class() == self.class() => {
                    *self = other;
                    Ok(())
                }
                other => Err(Error::Overwrite {
                    value: other.type_name().to_string(),
                    payload: self.class().to_string(),
                }),
            },
            other => Err(Error::Overwrite {
                value: other.to_string(),
                payload: self.class().to_string(),
            }),
        }
    }

    /// Clears every child, keeping the schema.
    pub fn clear(&mut self) -> Result<()> {
        let options = std::mem::take(&mut self.options);
        *self = Payload::new(self.kind)?;
        self.options = options;
        Ok(())
    }

    /// The bare root element of this payload.
    pub fn element(&self) -> XmlElement {
        XmlElement::new(self.name()).with_namespace(None, Some(self.namespace()))
    }

    pub fn xml_append(&self, parent: &mut XmlElement) {
        self.kind.xml_append(self, parent)
    }

    /// Appends this payload as a child element, unless it is invalid.
    pub fn append_wrapped(&self, parent: &mut XmlElement) {
        if !self.is_valid() {
            return;
        }
        let mut element = self.element();
        self.kind.xml_children(self, &mut element);
        parent.add_child(element);
    }

    /// Appends every child in declaration order.
    pub fn append_children(&self, element: &mut XmlElement) {
        for (_, node) in &self.elements {
            node.xml_append(element);
        }
    }

    /// Appends every child except the listed aliases.
    pub fn append_children_except(&self, element: &mut XmlElement, skip: &[&str]) {
        for (alias, node) in &self.elements {
            if !skip.contains(&alias.as_str()) {
                node.xml_append(element);
            }
        }
    }

    pub fn xml_parse(&mut self, node: &XmlElement, registry: &Registry) -> Result<()> {
        let kind = self.kind;
        kind.xml_parse(self, node, registry)
    }

    /// Dispatches each child element to the schema entry with that tag.
    /// Unknown tags are skipped.
    pub fn parse_children(&mut self, node: &XmlElement, registry: &Registry) -> Result<()> {
        for child in &node.children {
            match self.position(&child.name, false) {
                Some(index) => {
                    trace!(target: REGRWS, payload = self.class(), tag = %child.name, "parsing element");
                    self.elements[index].1.xml_parse(child, registry)?
                }
                None => {
                    debug!(target: REGRWS, payload = self.class(), tag = %child.name, "skipping unknown element")
                }
            }
        }
        Ok(())
    }

    /// Serializes as a UTF-8 document.
    pub fn xml_serialize(&self) -> Result<String> {
        self.xml_serialize_with("UTF-8")
    }

    /// Serializes as a document. An invalid payload is logged and yields the
    /// bare root element.
    pub fn xml_serialize_with(&self, encoding: &str) -> Result<String> {
        let mut root = self.element();
        if self.is_valid() {
            self.kind.xml_children(self, &mut root);
        } else {
            warn!(
                target: REGRWS,
                "{} payload '{}' is not valid for submission",
                self.class(),
                self.kind.label(self)
            );
        }
        root.to_document(encoding)
    }

    #[cfg(feature = "json")]
    pub fn to_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.kind.describe(self))
    }
}

/// Valid children only, keyed by alias.
impl Serialize for Payload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for (alias, node) in self.iter().filter(|(_, node)| node.is_valid()) {
            map.serialize_entry(alias, node)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{transform::ElementTransformer, validate::NamedElement};

    payload_kind!(
        Sample => "sample" {
            fn init(&self, payload: &mut Payload) -> Result<()> {
                payload
                    .define(None, Field::new("name"))?
                    .define(Some("handle"), Field::new("sampleHandle").generated())?
                    .define(
                        None,
                        Group::new("tags")
                            .with_transformer(ElementTransformer::new(Field::new("tag")))
                            .with_validator(NamedElement::new("tag")),
                    )?
                    .define(Some("nested"), Payload::new(&Nested)?)?;
                Ok(())
            }

            fn handle(&self, payload: &Payload) -> Option<String> {
                payload.field("handle").ok()?.canonical().map(str::to_string)
            }
        }
    );

    payload_kind!(
        Nested => "nested" {
            fn init(&self, payload: &mut Payload) -> Result<()> {
                payload.define(None, Field::new("code"))?;
                Ok(())
            }
        }
    );

    payload_kind!(
        Duplicate => "duplicate" {
            fn init(&self, payload: &mut Payload) -> Result<()> {
                payload
                    .define(None, Field::new("name"))?
                    .define(Some("name"), Field::new("other"))?;
                Ok(())
            }
        }
    );

    #[test]
    fn test_duplicate_alias() {
        let err = Payload::new(&Duplicate).unwrap_err();
        assert_eq!(err.to_string(), "duplicate attribute alias \"name\"");
    }

    #[test]
    fn test_lookup() {
        let sample = Payload::new(&Sample).unwrap();
        assert!(sample.has("name"));
        assert!(sample.has("NAME"));
        assert!(sample.has("sampleHandle"));
        assert!(!sample.has("missing"));
        assert_eq!(sample.len(), 4);
        assert_eq!(
            sample.attr("missing").unwrap_err().to_string(),
            "element \"missing\" not found in the Sample payload"
        );
        assert!(sample.group("name").is_err());
    }

    #[test]
    fn test_add() {
        let mut sample = Payload::new(&Sample).unwrap();
        sample.add("name", "first").unwrap();
        assert!(matches!(sample.add("name", "second"), Err(Error::NotAGroup(_))));
        assert_eq!(sample.get("name").unwrap(), "first");

        sample.add("tags", "x").unwrap().add("tags", ["y", "z"]).unwrap();
        assert_eq!(sample.get("tags").unwrap(), Value::from(["x", "y", "z"]));
        assert!(matches!(sample.add("nested", "x"), Err(Error::NotAGroup(_))));
    }

    #[test]
    fn test_nested_payload() {
        let mut sample = Payload::new(&Sample).unwrap();
        let mut nested = Payload::new(&Nested).unwrap();
        nested.set("code", "A").unwrap();
        sample.set("nested", nested).unwrap();
        assert_eq!(sample.payload("nested").unwrap().get("code").unwrap(), "A");

        let err = sample.set("nested", Payload::new(&Sample).unwrap()).unwrap_err();
        assert_eq!(err.to_string(), "value [Sample] cannot overwrite a Nested payload");
        assert!(matches!(sample.set("nested", "text"), Err(Error::Overwrite { .. })));
        assert_eq!(sample.payload("nested").unwrap().get("code").unwrap(), "A");

        sample.set("nested", Value::Null).unwrap();
        assert!(!sample.payload("nested").unwrap().valid("code"));
    }

    #[test]
    fn test_unset() {
        let mut sample = Payload::new(&Sample).unwrap();
        sample.set("name", "x").unwrap();
        sample.unset("name").unwrap();
        assert!(!sample.valid("name"));
        sample.unset("missing").unwrap();
    }

    #[test]
    fn test_clone_drops_generated_values() {
        let mut sample = Payload::new(&Sample).unwrap();
        sample.set("name", "x").unwrap().set("handle", "S-1").unwrap();
        assert_eq!(sample.handle().as_deref(), Some("S-1"));

        let copy = sample.clone();
        assert_eq!(copy.handle(), None);
        assert_eq!(copy.get("name").unwrap(), "x");
        assert_eq!(sample.handle().as_deref(), Some("S-1"));
    }

    #[test]
    fn test_invalid_document() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();

        let sample = Payload::new(&Sample).unwrap();
        assert!(!sample.is_valid());
        assert_eq!(
            sample.validity(),
            vec![("name", false), ("handle", false), ("tags", false), ("nested", false)]
        );
        assert_eq!(
            sample.xml_serialize().unwrap(),
            concat!(
                r#"<?xml version="1.0" encoding="UTF-8"?>"#,
                r#"<sample xmlns="http://www.arin.net/regrws/core/v1"/>"#
            )
        );
    }

    #[cfg(feature = "json")]
    #[test]
    fn test_json() {
        let mut sample = Payload::new(&Sample).unwrap();
        sample.set("name", "x").unwrap().add("tags", "a").unwrap();
        assert_eq!(
            sample.to_json().unwrap(),
            serde_json::json!({"name": "x", "tags": ["a"]})
        );
    }
}
