mod field;
mod group;
mod multiline;
mod payload;

pub use field::{Access, Field};
pub use group::{Group, Key};
pub use multiline::MultiLine;
pub use payload::{Payload, PayloadKind, CORE_NAMESPACE};

use serde::{Serialize, Serializer};
use url::Url;

use crate::{error::Result, registry::Registry, value::Value, xml::XmlElement};

/// Namespaced tag name of an element.
///
/// A prefix is only kept when the namespace is a valid URI; otherwise the
/// element falls back to its bare local name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QName {
    prefix: Option<String>,
    name: String,
    namespace: Option<String>,
}

impl QName {
    pub fn new(tag: &str, namespace: Option<&str>) -> Self {
        match namespace.filter(|ns| Url::parse(ns).is_ok()) {
            Some(namespace) => {
                let (prefix, name) = match tag.split_once(':') {
                    Some((prefix, name)) => (Some(prefix.to_string()), name),
                    None => (None, tag),
                };
                Self {
                    prefix,
                    name: name.to_string(),
                    namespace: Some(namespace.to_string()),
                }
            }
            None => Self {
                prefix: None,
                name: tag.rsplit(':').next().unwrap_or(tag).to_string(),
                namespace: None,
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// `prefix:name`, or the bare name.
    pub fn tag(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}:{}", self.name),
            None => self.name.clone(),
        }
    }

    pub(crate) fn element(&self) -> XmlElement {
        XmlElement::new(self.name.as_str())
            .with_namespace(self.prefix.as_deref(), self.namespace.as_deref())
    }
}

/// Any handler a payload or group can hold.
#[derive(Debug, Clone)]
pub enum Node {
    Field(Field),
    Group(Group),
    MultiLine(MultiLine),
    Payload(Payload),
}

impl Node {
    /// Local tag name.
    pub fn name(&self) -> &str {
        match self {
            Node::Field(f) => f.name(),
            Node::Group(g) => g.name(),
            Node::MultiLine(m) => m.name(),
            Node::Payload(p) => p.name(),
        }
    }

    pub fn type_name(&self) -> &str {
        match self {
            Node::Field(f) => f.type_name(),
            Node::Group(_) => "Group",
            Node::MultiLine(_) => "MultiLine",
            Node::Payload(p) => p.class(),
        }
    }

    pub fn is_valid(&self) -> bool {
        match self {
            Node::Field(f) => f.is_valid(),
            Node::Group(g) => g.is_valid(),
            Node::MultiLine(m) => m.is_valid(),
            Node::Payload(p) => p.is_valid(),
        }
    }

    pub fn is_defined(&self) -> bool {
        match self {
            Node::Field(f) => f.is_defined(),
            Node::Group(g) => !g.is_empty(),
            Node::MultiLine(m) => m.is_defined(),
            Node::Payload(p) => p.is_valid(),
        }
    }

    pub fn value(&self) -> Value {
        match self {
            Node::Field(f) => f.value(),
            Node::Group(g) => g.value(),
            Node::MultiLine(m) => m.value(),
            Node::Payload(p) => p.value(),
        }
    }

    pub fn set_value(&mut self, value: impl Into<Value>) -> Result<()> {
        match self {
            Node::Field(f) => f.set_value(value),
            Node::Group(g) => g.set_value(value),
            Node::MultiLine(m) => m.set_value(value),
            Node::Payload(p) => p.set_value(value),
        }
    }

    /// Handle of a primary payload.
    pub fn handle(&self) -> Option<String> {
        match self {
            Node::Payload(p) => p.handle(),
            _ => None,
        }
    }

    /// String form, if the handler has a meaningful one.
    pub fn text(&self) -> Option<String> {
        let text = match self {
            Node::Field(f) => f.canonical()?.to_string(),
            Node::Group(_) => return None,
            Node::MultiLine(m) => m.to_string(),
            Node::Payload(p) => p.to_string(),
        };
        (!text.is_empty()).then_some(text)
    }

    pub fn xml_append(&self, parent: &mut XmlElement) {
        match self {
            Node::Field(f) => f.xml_append(parent),
            Node::Group(g) => g.xml_append(parent),
            Node::MultiLine(m) => m.xml_append(parent),
            Node::Payload(p) => p.xml_append(parent),
        }
    }

    pub fn xml_parse(&mut self, node: &XmlElement, registry: &Registry) -> Result<()> {
        match self {
            Node::Field(f) => f.xml_parse(node),
            Node::Group(g) => g.xml_parse(node, registry)?,
            Node::MultiLine(m) => m.xml_parse(node),
            Node::Payload(p) => p.xml_parse(node, registry)?,
        }
        Ok(())
    }

    pub fn as_field(&self) -> Option<&Field> {
        match self {
            Node::Field(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_field_mut(&mut self) -> Option<&mut Field> {
        match self {
            Node::Field(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_group(&self) -> Option<&Group> {
        match self {
            Node::Group(g) => Some(g),
            _ => None,
        }
    }

    pub fn as_group_mut(&mut self) -> Option<&mut Group> {
        match self {
            Node::Group(g) => Some(g),
            _ => None,
        }
    }

    pub fn as_multi_line(&self) -> Option<&MultiLine> {
        match self {
            Node::MultiLine(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_payload(&self) -> Option<&Payload> {
        match self {
            Node::Payload(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_payload_mut(&mut self) -> Option<&mut Payload> {
        match self {
            Node::Payload(p) => Some(p),
            _ => None,
        }
    }
}

impl From<Field> for Node {
    fn from(value: Field) -> Self {
        Node::Field(value)
    }
}

impl From<Group> for Node {
    fn from(value: Group) -> Self {
        Node::Group(value)
    }
}

impl From<MultiLine> for Node {
    fn from(value: MultiLine) -> Self {
        Node::MultiLine(value)
    }
}

impl From<Payload> for Node {
    fn from(value: Payload) -> Self {
        Node::Payload(value)
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Node::Field(f) => f.serialize(serializer),
            Node::Group(g) => g.serialize(serializer),
            Node::MultiLine(m) => m.serialize(serializer),
            Node::Payload(p) => p.serialize(serializer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qname() {
        let name = QName::new("ns2:messageId", Some("http://www.arin.net/regrws/messages/v1"));
        assert_eq!(name.prefix(), Some("ns2"));
        assert_eq!(name.name(), "messageId");
        assert_eq!(name.tag(), "ns2:messageId");

        let name = QName::new("ns2:messageId", None);
        assert_eq!(name.prefix(), None);
        assert_eq!(name.tag(), "messageId");
        assert_eq!(name.namespace(), None);

        let name = QName::new("test", Some("http://example.org/foo"));
        assert_eq!(name.tag(), "test");
        assert_eq!(name.namespace(), Some("http://example.org/foo"));
    }
}
