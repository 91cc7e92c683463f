use std::{fmt, slice, sync::Arc};

use serde::{Serialize, Serializer};
use tracing::warn;

use super::{Node, QName};
use crate::{
    error::{Error, Result, Role},
    registry::Registry,
    transform::{SharedTransformer, Stack, Transformer},
    validate::{IsNode, SharedValidator, Validator},
    value::Value,
    xml::XmlElement,
    REGRWS,
};

/// Index into a [`Group`]: a position (negative counts from the end) or a
/// child's handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    Position(isize),
    Handle(String),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Position(i) => write!(f, "{i}"),
            Key::Handle(h) => f.write_str(h),
        }
    }
}

impl From<isize> for Key {
    fn from(value: isize) -> Self {
        Key::Position(value)
    }
}

impl From<i32> for Key {
    fn from(value: i32) -> Self {
        Key::Position(value as isize)
    }
}

impl From<usize> for Key {
    fn from(value: usize) -> Self {
        Key::Position(value as isize)
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Key::Handle(value.to_string())
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Key::Handle(value)
    }
}

/// Resolves a possibly negative position against `len`.
pub(crate) fn resolve_position(index: isize, len: usize) -> Option<usize> {
    let len = len as isize;
    let index = if index < 0 { index + len } else { index };
    (0..len).contains(&index).then_some(index as usize)
}

/// Ordered collection of handlers sharing one wrapper tag.
#[derive(Debug, Clone)]
pub struct Group {
    qname: QName,
    items: Vec<Node>,
    transformer: SharedTransformer,
    validator: SharedValidator,
}

impl Group {
    pub fn new(tag: &str) -> Self {
        Self::with_qname(QName::new(tag, None))
    }

    pub fn new_ns(tag: &str, namespace: &str) -> Self {
        Self::with_qname(QName::new(tag, Some(namespace)))
    }

    fn with_qname(qname: QName) -> Self {
        Self {
            qname,
            items: Vec::new(),
            transformer: Arc::new(Stack::new()),
            validator: Arc::new(IsNode),
        }
    }

    pub fn with_transformer(mut self, transformer: impl Transformer + 'static) -> Self {
        self.transformer = Arc::new(transformer);
        self
    }

    pub fn with_validator(mut self, validator: impl Validator + 'static) -> Self {
        self.validator = Arc::new(validator);
        self
    }

    pub fn set_transformer(&mut self, transformer: SharedTransformer) {
        self.transformer = transformer;
    }

    pub fn set_validator(&mut self, validator: SharedValidator) {
        self.validator = validator;
    }

    pub fn qname(&self) -> &QName {
        &self.qname
    }

    pub fn name(&self) -> &str {
        self.qname.name()
    }

    pub fn tag(&self) -> String {
        self.qname.tag()
    }

    pub fn namespace(&self) -> Option<&str> {
        self.qname.namespace()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> slice::Iter<'_, Node> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> slice::IterMut<'_, Node> {
        self.items.iter_mut()
    }

    /// Read values of all children.
    pub fn value(&self) -> Value {
        Value::List(self.items.iter().map(Node::value).collect())
    }

    /// Replaces the contents. Nothing changes if any item is rejected.
    pub fn set_value(&mut self, value: impl Into<Value>) -> Result<()> {
        self.items = self.convert_all(value.into())?;
        Ok(())
    }

    /// Appends one item or a list of items. Nothing changes if any item is
    /// rejected.
    pub fn add_value(&mut self, value: impl Into<Value>) -> Result<()> {
        let items = self.convert_all(value.into())?;
        self.items.extend(items);
        Ok(())
    }

    fn convert_all(&self, value: Value) -> Result<Vec<Node>> {
        match value {
            Value::Null => Ok(Vec::new()),
            Value::List(items) => items.into_iter().map(|v| self.convert(v)).collect(),
            Value::Node(node) => match *node {
                Node::Group(group) => group
                    .items
                    .into_iter()
                    .map(|n| self.convert(n.into()))
                    .collect(),
                other => Ok(vec![self.convert(other.into())?]),
            },
            other => Ok(vec![self.convert(other)?]),
        }
    }

    fn convert(&self, value: Value) -> Result<Node> {
        let shown = value.to_string();
        let transformed = self.transformer.transform(value);
        if self.validator.validate(&transformed) {
            if let Some(node) = transformed.into_node() {
                return Ok(node);
            }
        }
        Err(Error::validation(shown, self.name(), Role::Group))
    }

    /// At least one child is valid.
    pub fn is_valid(&self) -> bool {
        self.items.iter().any(Node::is_valid)
    }

    /// Position a key refers to. Out of range positions fall back to a
    /// handle comparison against their string form.
    pub fn resolve(&self, key: &Key) -> Option<usize> {
        match key {
            Key::Position(index) => resolve_position(*index, self.items.len())
                .or_else(|| self.position_of(&index.to_string())),
            Key::Handle(handle) => self.position_of(handle),
        }
    }

    fn position_of(&self, handle: &str) -> Option<usize> {
        self.items
            .iter()
            .position(|item| item.handle().as_deref() == Some(handle))
    }

    pub fn exists(&self, key: impl Into<Key>) -> bool {
        self.resolve(&key.into()).is_some()
    }

    pub fn get(&self, key: impl Into<Key>) -> Option<&Node> {
        let index = self.resolve(&key.into())?;
        self.items.get(index)
    }

    pub fn get_mut(&mut self, key: impl Into<Key>) -> Option<&mut Node> {
        let index = self.resolve(&key.into())?;
        self.items.get_mut(index)
    }

    pub fn get_by_handle(&self, handle: &str) -> Option<&Node> {
        self.position_of(handle).map(|index| &self.items[index])
    }

    /// Like [`Group::get`], but a missing key logs a warning and yields the
    /// transformer's empty value instead.
    pub fn at(&self, key: impl Into<Key>) -> Value {
        let key = key.into();
        match self.resolve(&key) {
            Some(index) => self.items[index].clone().into(),
            None => {
                warn!(target: REGRWS, group = self.name(), "undefined index: {key}");
                self.transformer.transform(Value::Null)
            }
        }
    }

    /// Inserts before the child at `key`, shifting it and its successors.
    /// A key that resolves to no child changes nothing; use [`Group::push`]
    /// to append.
    pub fn set(&mut self, key: impl Into<Key>, value: impl Into<Value>) -> Result<()> {
        let Some(index) = self.resolve(&key.into()) else {
            return Ok(());
        };
        let node = self.convert(value.into())?;
        self.items.insert(index, node);
        Ok(())
    }

    pub fn push(&mut self, value: impl Into<Value>) -> Result<()> {
        let node = self.convert(value.into())?;
        self.items.push(node);
        Ok(())
    }

    pub fn remove(&mut self, key: impl Into<Key>) -> Option<Node> {
        let index = self.resolve(&key.into())?;
        Some(self.items.remove(index))
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Appends the wrapper with all valid children; nothing if none is valid.
    pub fn xml_append(&self, parent: &mut XmlElement) {
        if !self.is_valid() {
            return;
        }
        let mut element = self.qname.element();
        for item in self.items.iter().filter(|item| item.is_valid()) {
            item.xml_append(&mut element);
        }
        parent.add_child(element);
    }

    pub fn xml_parse(&mut self, node: &XmlElement, registry: &Registry) -> Result<()> {
        for child in &node.children {
            let mut handler = self.handler_for(child, registry)?;
            handler.xml_parse(child, registry)?;
            self.items.push(handler);
        }
        Ok(())
    }

    /// A registered payload for the tag if the group accepts it, otherwise
    /// whatever the transformer makes of the text.
    fn handler_for(&self, child: &XmlElement, registry: &Registry) -> Result<Node> {
        if let Some(payload) = registry.instantiate(&child.name)? {
            let candidate = Value::from(payload);
            if self.validator.validate(&candidate) {
                if let Some(node) = candidate.into_node() {
                    return Ok(node);
                }
            }
        }
        let transformed = self.transformer.transform(Value::Str(child.text.clone()));
        if self.validator.validate(&transformed) {
            if let Some(node) = transformed.into_node() {
                return Ok(node);
            }
        }
        Err(Error::Parse(format!(
            "xml element <{}> is not valid for the [{}] group element",
            child.name,
            self.name()
        )))
    }
}

impl<'a> IntoIterator for &'a Group {
    type Item = &'a Node;
    type IntoIter = slice::Iter<'a, Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl Serialize for Group {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(&self.items)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        elements::Field,
        transform::ElementTransformer,
        validate::{ClassList, NamedElement},
    };

    fn named_group(tag: &str, item: &str) -> Group {
        Group::new(tag)
            .with_transformer(ElementTransformer::new(Field::new(item)))
            .with_validator(NamedElement::new(item))
    }

    #[test]
    fn test_from_field() {
        let mut group = Group::new("test");
        let mut field = Field::new("sample");
        field.set_value("foo").unwrap();

        assert_eq!(group.len(), 0);
        assert!(!group.is_valid());

        group.add_value(field).unwrap();
        assert_eq!(group.len(), 1);
        assert!(group.is_valid());
        assert_eq!(group.get(0).unwrap().name(), "sample");
        assert_eq!(group.value(), Value::from(["foo"]));

        group.set_value(Value::Null).unwrap();
        assert!(group.is_empty());
    }

    #[test]
    fn test_add_null_is_ignored() {
        let mut group = Group::new("test");
        group.add_value(Value::Null).unwrap();
        assert!(group.is_empty());
    }

    #[test]
    fn test_named_group_from_strings() {
        let mut group = named_group("test", "sample");
        group.add_value("foo").unwrap();
        group.add_value(["bar", "baz"]).unwrap();
        assert_eq!(group.len(), 3);
        assert_eq!(group.get(0).unwrap().name(), "sample");
        assert_eq!(group.get(2).unwrap().value(), "baz");
    }

    #[test]
    fn test_rejected_item_leaves_group_untouched() {
        let mut group = Group::new("test").with_validator(NamedElement::new("sample"));
        let mut other = Field::new("xxx");
        other.set_value("foo").unwrap();
        let mut good = Field::new("sample");
        good.set_value("bar").unwrap();

        let err = group
            .add_value(Value::List(vec![good.into(), other.into()]))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "value [foo] is not allowed for the [test] group element"
        );
        assert!(group.is_empty());
    }

    #[test]
    fn test_class_list() {
        let mut group =
            Group::new("test").with_validator(ClassList::new(["GeneratedField", "ReadOnlyField"]));
        let mut field = Field::new("sample").read_only();
        field.set_value("foo").unwrap();
        group.add_value(field).unwrap();
        assert_eq!(group.len(), 1);

        assert!(group.add_value(Field::new("sample")).is_err());
        assert_eq!(group.len(), 1);
    }

    #[test]
    fn test_existential_validity() {
        let mut group = named_group("test", "sample");
        group.add_value(["foo", "bar"]).unwrap();
        if let Some(Node::Field(field)) = group.get_mut(1) {
            field.set_value(Value::Null).unwrap();
        }
        assert!(group.is_valid());
        assert_eq!(group.len(), 2);

        let mut root = XmlElement::new("root");
        group.xml_append(&mut root);
        assert_eq!(
            root.to_fragment().unwrap(),
            "<root><test><sample>foo</sample></test></root>"
        );
    }

    #[test]
    fn test_negative_index() {
        let mut group = named_group("test", "sample");
        group.add_value(["foo", "bar"]).unwrap();
        assert!(group.exists(-1));
        assert_eq!(group.get(-1).unwrap().value(), "bar");
        assert!(!group.exists(-3));

        group.push("abc").unwrap();
        assert_eq!(group.get(-1).unwrap().value(), "abc");
        assert_eq!(group.get(-1).unwrap().value(), group.get(2).unwrap().value());

        group.remove(1);
        assert_eq!(group.len(), 2);
        assert_eq!(group.get(-1).unwrap().value(), "abc");
        assert_eq!(group.resolve(&Key::Position(-2)), Some(0));

        group.set(1, "xyz").unwrap();
        assert_eq!(group.get(1).unwrap().value(), "xyz");
        assert_eq!(group.get(2).unwrap().value(), "abc");
        assert_eq!(group.len(), 3);

        group.set(9, "nope").unwrap();
        assert_eq!(group.len(), 3);
    }

    #[test]
    fn test_undefined_index_yields_placeholder() {
        let group = named_group("test", "sample");
        let placeholder = group.at(9);
        let field = placeholder.as_node().and_then(Node::as_field).unwrap();
        assert_eq!(field.name(), "sample");
        assert_eq!(field.value(), Value::Null);

        assert_eq!(Group::new("test").at(9), Value::Null);
    }

    #[test]
    fn test_xml() {
        let mut group = Group::new("outer")
            .with_transformer(ElementTransformer::new(Field::new("test")));
        group.add_value(["foo", "bar"]).unwrap();

        let mut root = XmlElement::new("root");
        group.xml_append(&mut root);
        assert_eq!(
            root.to_fragment().unwrap(),
            "<root><outer><test>foo</test><test>bar</test></outer></root>"
        );

        let mut root = XmlElement::new("root");
        Group::new("outer").xml_append(&mut root);
        assert!(root.children.is_empty());
    }

    #[test]
    fn test_parse() {
        let xml = XmlElement::parse("<outer><test>foo</test><test>bar</test></outer>").unwrap();
        let registry = Registry::new();

        let mut group = named_group("outer", "test");
        group.xml_parse(&xml, &registry).unwrap();
        assert_eq!(group.value(), Value::from(["foo", "bar"]));

        let err = Group::new("outer").xml_parse(&xml, &registry).unwrap_err();
        assert_eq!(
            err.to_string(),
            "xml element <test> is not valid for the [outer] group element"
        );
    }
}
