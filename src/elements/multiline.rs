use std::fmt;

use serde::{Serialize, Serializer};
use tracing::warn;

use super::{group::resolve_position, Field, Node, QName};
use crate::{
    error::{Error, Result, Role},
    value::Value,
    xml::XmlElement,
    REGRWS,
};

/// A block of text lines emitted as numbered `<line>` children.
///
/// Lines can be appended or the whole block replaced, but single lines are
/// never edited or removed.
#[derive(Debug, Clone)]
pub struct MultiLine {
    qname: QName,
    lines: Vec<String>,
}

impl MultiLine {
    pub fn new(tag: &str) -> Self {
        Self {
            qname: QName::new(tag, None),
            lines: Vec::new(),
        }
    }

    pub fn new_ns(tag: &str, namespace: &str) -> Self {
        Self {
            qname: QName::new(tag, Some(namespace)),
            lines: Vec::new(),
        }
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

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn value(&self) -> Value {
        Value::List(self.lines.iter().cloned().map(Value::Str).collect())
    }

    pub fn set_value(&mut self, value: impl Into<Value>) -> Result<()> {
        self.lines = self.convert_all(value.into())?;
        Ok(())
    }

    pub fn add_value(&mut self, value: impl Into<Value>) -> Result<()> {
        let lines = self.convert_all(value.into())?;
        self.lines.extend(lines);
        Ok(())
    }

    fn convert_all(&self, value: Value) -> Result<Vec<String>> {
        match value {
            Value::Null => Ok(Vec::new()),
            Value::List(items) => items.into_iter().map(|v| self.convert(v)).collect(),
            Value::Str(s) if s.contains('\n') => Ok(s
                .replace("\r\n", "\n")
                .split('\n')
                .map(str::to_string)
                .collect()),
            Value::Node(node) => match *node {
                Node::MultiLine(block) => Ok(block.lines),
                other => Ok(vec![self.convert(other.into())?]),
            },
            other => Ok(vec![self.convert(other)?]),
        }
    }

    fn convert(&self, value: Value) -> Result<String> {
        match value {
            Value::Bool(_) => Err(Error::validation(&value, self.name(), Role::MultiLine)),
            other => match other.scalar().or_else(|| other.text()) {
                Some(line) => Ok(line),
                None => Err(Error::validation(&other, self.name(), Role::MultiLine)),
            },
        }
    }

    pub fn is_valid(&self) -> bool {
        !self.lines.is_empty()
    }

    pub fn is_defined(&self) -> bool {
        !self.lines.is_empty()
    }

    pub fn exists(&self, index: isize) -> bool {
        resolve_position(index, self.lines.len()).is_some()
    }

    pub fn get(&self, index: isize) -> Option<&str> {
        resolve_position(index, self.lines.len()).map(|i| self.lines[i].as_str())
    }

    /// A `<line>` field for the given index. Missing lines log a warning and
    /// yield an empty field.
    pub fn line(&self, index: isize) -> Field {
        match resolve_position(index, self.lines.len()) {
            Some(i) => {
                let mut field = Field::new("line").with_attribute("number", (i + 1).to_string());
                field.assign(self.lines[i].clone());
                field
            }
            None => {
                warn!(target: REGRWS, block = self.name(), "undefined index: {index}");
                Field::new("line")
            }
        }
    }

    /// Appends unless `index` names an existing line.
    pub fn set(&mut self, index: Option<isize>, value: impl Into<Value>) -> Result<()> {
        if index.is_some_and(|i| self.exists(i)) {
            return Err(Error::LineModification);
        }
        self.add_value(value)
    }

    /// Lines cannot be removed; removing a missing line is a no-op.
    pub fn remove(&mut self, index: isize) -> Result<()> {
        if self.exists(index) {
            return Err(Error::LineDeletion);
        }
        Ok(())
    }

    pub fn xml_append(&self, parent: &mut XmlElement) {
        if self.lines.is_empty() {
            return;
        }
        let mut element = self.qname.element();
        let line_name = self.line_qname();
        for (i, line) in self.lines.iter().enumerate() {
            element.add_child(
                line_name
                    .element()
                    .with_attribute("number", (i + 1).to_string())
                    .with_text(line.as_str()),
            );
        }
        parent.add_child(element);
    }

    /// Lines share the namespace of the block.
    fn line_qname(&self) -> QName {
        let tag = match self.qname.prefix() {
            Some(prefix) => format!("{prefix}:line"),
            None => "line".to_string(),
        };
        QName::new(&tag, self.qname.namespace())
    }

    pub fn xml_parse(&mut self, node: &XmlElement) {
        self.lines
            .extend(node.children.iter().map(|child| child.text.clone()));
    }
}

impl fmt::Display for MultiLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.lines.join("\n"))
    }
}

impl Serialize for MultiLine {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(&self.lines)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_set_from_string() {
        let mut block = MultiLine::new("comment");
        assert!(!block.is_valid());

        block.set_value("line one\nline two\nline three").unwrap();
        assert!(block.is_valid());
        assert_eq!(block.lines(), ["line one", "line two", "line three"]);

        block.set_value("one\r\ntwo").unwrap();
        assert_eq!(block.lines(), ["one", "two"]);

        block.add_value("three").unwrap();
        block.add_value(["four", "five"]).unwrap();
        assert_eq!(block.len(), 5);
        assert_eq!(block.to_string(), "one\ntwo\nthree\nfour\nfive");

        block.set_value(Value::Null).unwrap();
        assert!(block.is_empty());
    }

    #[test]
    fn test_rejects_booleans() {
        let mut block = MultiLine::new("test");
        block.add_value("keep").unwrap();
        let err = block.add_value(false).unwrap_err();
        assert_eq!(
            err.to_string(),
            "value [false] is not allowed for the [test] multi-line element"
        );
        assert!(block
            .set_value(vec![Value::from("a"), Value::from(true)])
            .is_err());
        assert_eq!(block.lines(), ["keep"]);
    }

    #[test]
    fn test_line_access() {
        let mut block = MultiLine::new("comment");
        block.set_value(["first", "second"]).unwrap();

        let line = block.line(-1);
        assert_eq!(line.name(), "line");
        assert_eq!(line.value(), "second");
        assert_eq!(line.attribute("number"), Some("2"));
        assert_eq!(block.get(-1), block.get(1));

        let missing = block.line(9);
        assert!(!missing.is_valid());

        assert!(matches!(block.set(Some(0), "x"), Err(Error::LineModification)));
        assert!(matches!(block.remove(0), Err(Error::LineDeletion)));
        block.remove(5).unwrap();
        block.set(None, "third").unwrap();
        block.set(Some(7), "fourth").unwrap();
        assert_eq!(block.get(-1), Some("fourth"));
        assert_eq!(block.len(), 4);
    }

    #[test]
    fn test_xml_round_trip() {
        let mut block = MultiLine::new("streetAddress");
        block.set_value("line one\nline two\nline three").unwrap();

        let mut root = XmlElement::new("root");
        block.xml_append(&mut root);
        assert_eq!(
            root.to_fragment().unwrap(),
            concat!(
                "<root><streetAddress>",
                r#"<line number="1">line one</line>"#,
                r#"<line number="2">line two</line>"#,
                r#"<line number="3">line three</line>"#,
                "</streetAddress></root>"
            )
        );

        let parsed = XmlElement::parse(&root.to_fragment().unwrap()).unwrap();
        let mut copy = MultiLine::new("streetAddress");
        copy.xml_parse(parsed.child("streetAddress").unwrap());
        assert_eq!(copy.lines(), block.lines());

        let mut root = XmlElement::new("root");
        MultiLine::new("empty").xml_append(&mut root);
        assert!(root.children.is_empty());
    }

    #[test]
    fn test_prefixed_block_lines() {
        let mut block = MultiLine::new_ns("ns2:text", "http://www.arin.net/regrws/messages/v1");
        block.set_value("hello").unwrap();

        let mut root = XmlElement::new("root");
        block.xml_append(&mut root);
        assert_eq!(
            root.to_fragment().unwrap(),
            concat!(
                r#"<root><ns2:text xmlns:ns2="http://www.arin.net/regrws/messages/v1">"#,
                r#"<ns2:line number="1">hello</ns2:line>"#,
                "</ns2:text></root>"
            )
        );
    }
}
