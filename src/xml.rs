use std::{borrow::Cow, fmt::Display};

use quick_xml::{
    escape::partial_escape,
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
    Reader, Writer,
};
use tracing::trace;

use crate::{
    error::{Error, Result},
    REGRWS,
};

type Scope = Vec<(Option<String>, String)>;

/// Owned XML element tree the payload walk reads from and writes into.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlElement {
    pub prefix: Option<String>,
    pub name: String,
    pub namespace: Option<String>,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlElement>,
    pub text: String,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_namespace(mut self, prefix: Option<&str>, namespace: Option<&str>) -> Self {
        self.prefix = prefix.map(str::to_string);
        self.namespace = namespace.map(str::to_string);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    pub fn qualified_name(&self) -> Cow<'_, str> {
        match &self.prefix {
            Some(prefix) => Cow::Owned(format!("{prefix}:{}", self.name)),
            None => Cow::Borrowed(&self.name),
        }
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn add_child(&mut self, child: XmlElement) -> &mut XmlElement {
        self.children.push(child);
        let last = self.children.len() - 1;
        &mut self.children[last]
    }

    /// Parses a document into its root element.
    pub fn parse(xml: &str) -> Result<Self> {
        if xml.trim().is_empty() {
            return Err(Error::EmptyDocument);
        }

        let mut reader = Reader::from_str(xml);
        let mut scopes: Vec<Scope> = Vec::new();
        let mut stack: Vec<XmlElement> = Vec::new();

        loop {
            let event = reader
                .read_event()
                .map_err(|e| malformed(xml, reader.buffer_position(), e))?;
            let closed = match event {
                Event::Start(start) => {
                    let element = open(&start, &mut scopes)
                        .map_err(|e| malformed(xml, reader.buffer_position(), e))?;
                    stack.push(element);
                    None
                }
                Event::Empty(start) => {
                    let element = open(&start, &mut scopes)
                        .map_err(|e| malformed(xml, reader.buffer_position(), e))?;
                    scopes.pop();
                    Some(element)
                }
                Event::End(_) => {
                    scopes.pop();
                    stack.pop()
                }
                Event::Text(text) => {
                    let text = text
                        .unescape()
                        .map_err(|e| malformed(xml, reader.buffer_position(), e))?;
                    match stack.last_mut() {
                        Some(current) => current.text.push_str(&text),
                        None if text.trim().is_empty() => {}
                        None => {
                            return Err(malformed(
                                xml,
                                reader.buffer_position(),
                                "text outside of the document element",
                            ))
                        }
                    }
                    None
                }
                Event::CData(data) => {
                    if let Some(current) = stack.last_mut() {
                        current
                            .text
                            .push_str(&String::from_utf8_lossy(&data.into_inner()));
                    }
                    None
                }
                Event::Eof => {
                    if stack.is_empty() {
                        return Err(Error::EmptyDocument);
                    }
                    return Err(malformed(
                        xml,
                        reader.buffer_position(),
                        "unexpected end of document",
                    ));
                }
                _ => None,
            };

            if let Some(mut element) = closed {
                if !element.children.is_empty() && element.text.trim().is_empty() {
                    element.text.clear();
                }
                trace!(target: REGRWS, name = %element.name, "parsed element");
                match stack.last_mut() {
                    Some(parent) => parent.children.push(element),
                    None => return Ok(element),
                }
            }
        }
    }

    /// Writes the element as a document with an XML declaration.
    pub fn to_document(&self, encoding: &str) -> Result<String> {
        let mut writer = Writer::new(Vec::new());
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some(encoding), None)))
            .map_err(write_failed)?;
        self.write(&mut writer, &mut Vec::new())?;
        String::from_utf8(writer.into_inner()).map_err(write_failed)
    }

    /// Writes the element without a declaration.
    pub fn to_fragment(&self) -> Result<String> {
        let mut writer = Writer::new(Vec::new());
        self.write(&mut writer, &mut Vec::new())?;
        String::from_utf8(writer.into_inner()).map_err(write_failed)
    }

    fn write(&self, writer: &mut Writer<Vec<u8>>, scope: &mut Scope) -> Result<()> {
        let qname = self.qualified_name();
        let mut start = BytesStart::new(qname.as_ref());
        let depth = scope.len();

        if let Some(namespace) = &self.namespace {
            let bound = scope
                .iter()
                .rev()
                .find(|(prefix, _)| *prefix == self.prefix)
                .map(|(_, uri)| uri.as_str());
            if bound != Some(namespace.as_str()) {
                let key = match &self.prefix {
                    Some(prefix) => format!("xmlns:{prefix}"),
                    None => "xmlns".to_string(),
                };
                start.push_attribute((key.as_str(), namespace.as_str()));
                scope.push((self.prefix.clone(), namespace.clone()));
            }
        }
        for (key, value) in &self.attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }

        if self.children.is_empty() && self.text.is_empty() {
            writer
                .write_event(Event::Empty(start))
                .map_err(write_failed)?;
        } else {
            writer
                .write_event(Event::Start(start))
                .map_err(write_failed)?;
            if !self.text.is_empty() {
                let text = BytesText::from_escaped(partial_escape(&self.text));
                writer.write_event(Event::Text(text)).map_err(write_failed)?;
            }
            for child in &self.children {
                child.write(writer, scope)?;
            }
            writer
                .write_event(Event::End(BytesEnd::new(qname.as_ref())))
                .map_err(write_failed)?;
        }

        scope.truncate(depth);
        Ok(())
    }
}

fn open(start: &BytesStart<'_>, scopes: &mut Vec<Scope>) -> std::result::Result<XmlElement, String> {
    let mut declared = Scope::new();
    let mut attributes = Vec::new();

    for attr in start.attributes() {
        let attr = attr.map_err(|e| e.to_string())?;
        let key = std::str::from_utf8(attr.key.as_ref()).map_err(|e| e.to_string())?;
        let value = attr.unescape_value().map_err(|e| e.to_string())?.into_owned();
        if key == "xmlns" {
            declared.push((None, value));
        } else if let Some(prefix) = key.strip_prefix("xmlns:") {
            declared.push((Some(prefix.to_string()), value));
        } else {
            attributes.push((key.to_string(), value));
        }
    }
    scopes.push(declared);

    let qname = std::str::from_utf8(start.name().as_ref())
        .map_err(|e| e.to_string())?
        .to_string();
    let (prefix, name) = match qname.split_once(':') {
        Some((prefix, name)) => (Some(prefix.to_string()), name.to_string()),
        None => (None, qname),
    };
    let namespace = scopes
        .iter()
        .rev()
        .flat_map(|scope| scope.iter().rev())
        .find(|(p, _)| *p == prefix)
        .map(|(_, uri)| uri.clone());
    if let (Some(prefix), None) = (&prefix, &namespace) {
        return Err(format!("unbound namespace prefix \"{prefix}\""));
    }

    Ok(XmlElement {
        prefix,
        name,
        namespace,
        attributes,
        children: Vec::new(),
        text: String::new(),
    })
}

fn malformed(xml: &str, position: usize, message: impl Display) -> Error {
    let consumed = &xml.as_bytes()[..position.min(xml.len())];
    let line_start = consumed
        .iter()
        .rposition(|b| *b == b'\n')
        .map_or(0, |i| i + 1);
    Error::MalformedXml {
        message: message.to_string(),
        line: consumed.iter().filter(|b| **b == b'\n').count() + 1,
        column: consumed.len() - line_start + 1,
    }
}

fn write_failed(err: impl Display) -> Error {
    Error::XmlWrite(err.to_string())
}
