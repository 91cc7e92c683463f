use std::{fmt, sync::Arc};

use serde::{Serialize, Serializer};

use super::QName;
use crate::{
    error::{Error, Result, Role},
    transform::{SharedTransformer, StringTransformer, Transformer},
    validate::{Scalar, SharedValidator, Validator},
    value::Value,
    xml::XmlElement,
};

/// Write policy of a [`Field`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Access {
    #[default]
    Writable,
    /// Set once, afterwards only re-asserting the same value is accepted.
    ReadOnly,
    /// Server assigned. Read-only, never validated and never copied.
    Generated,
}

/// A named leaf holding one canonical string.
#[derive(Debug)]
pub struct Field {
    qname: QName,
    access: Access,
    value: Option<String>,
    attributes: Vec<(String, String)>,
    transformer: SharedTransformer,
    validator: SharedValidator,
}

impl Clone for Field {
    fn clone(&self) -> Self {
        let generated = self.access == Access::Generated;
        Self {
            qname: self.qname.clone(),
            access: self.access,
            value: if generated { None } else { self.value.clone() },
            attributes: if generated {
                Vec::new()
            } else {
                self.attributes.clone()
            },
            transformer: self.transformer.clone(),
            validator: self.validator.clone(),
        }
    }
}

impl Field {
    pub fn new(tag: &str) -> Self {
        Self::with_qname(QName::new(tag, None))
    }

    /// A field in its own namespace; `tag` may carry a `prefix:`.
    pub fn new_ns(tag: &str, namespace: &str) -> Self {
        Self::with_qname(QName::new(tag, Some(namespace)))
    }

    fn with_qname(qname: QName) -> Self {
        Self {
            qname,
            access: Access::Writable,
            value: None,
            attributes: Vec::new(),
            transformer: Arc::new(StringTransformer),
            validator: Arc::new(Scalar),
        }
    }

    pub fn read_only(mut self) -> Self {
        self.access = Access::ReadOnly;
        self
    }

    pub fn generated(mut self) -> Self {
        self.access = Access::Generated;
        self
    }

    pub fn with_transformer(mut self, transformer: impl Transformer + 'static) -> Self {
        self.transformer = Arc::new(transformer);
        self
    }

    pub fn with_validator(mut self, validator: impl Validator + 'static) -> Self {
        self.validator = Arc::new(validator);
        self
    }

    pub(crate) fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    /// Stores a canonical value without conversion.
    pub(crate) fn assign(&mut self, canonical: String) {
        self.value = Some(canonical);
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

    pub fn access(&self) -> Access {
        self.access
    }

    pub fn type_name(&self) -> &'static str {
        match self.access {
            Access::Writable => "Field",
            Access::ReadOnly => "ReadOnlyField",
            Access::Generated => "GeneratedField",
        }
    }

    /// The stored wire value.
    pub fn canonical(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// The stored value run through the reverse transformation.
    pub fn value(&self) -> Value {
        let stored = self.value.clone().map_or(Value::Null, Value::Str);
        self.transformer.reverse_transform(stored)
    }

    pub fn set_value(&mut self, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        if value.is_null() && self.access == Access::Writable {
            self.value = None;
            self.attributes.clear();
            return Ok(());
        }
        if value.is_null() && self.value.is_none() {
            self.attributes.clear();
            return Ok(());
        }

        let canonical = self.convert(value)?;
        match (&self.value, self.access) {
            (Some(current), Access::ReadOnly | Access::Generated) => {
                if Some(current) == canonical.as_ref() {
                    Ok(())
                } else {
                    Err(Error::ReadOnly(self.name().to_string()))
                }
            }
            _ => {
                self.value = canonical;
                Ok(())
            }
        }
    }

    fn convert(&self, value: Value) -> Result<Option<String>> {
        if value.is_null() {
            return Ok(None);
        }
        // server values are taken as-is
        if self.access == Access::Generated {
            return Ok(Some(value.handle().unwrap_or_else(|| value.to_string())));
        }
        let shown = value.to_string();
        let transformed = self.transformer.transform(value);
        match transformed.scalar() {
            Some(s) if self.validator.validate(&transformed) => Ok(Some(s)),
            _ => Err(Error::validation(shown, self.name(), Role::Element)),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.value.is_some()
    }

    pub fn is_defined(&self) -> bool {
        self.value.is_some()
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    pub fn xml_append(&self, parent: &mut XmlElement) {
        let Some(value) = &self.value else {
            return;
        };
        let mut element = self.qname.element().with_text(value.as_str());
        element.attributes = self.attributes.clone();
        parent.add_child(element);
    }

    /// Takes text and attributes from the node as-is.
    pub fn xml_parse(&mut self, node: &XmlElement) {
        self.value = Some(node.text.clone());
        self.attributes = node.attributes.clone();
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.value.as_deref().unwrap_or_default())
    }
}

impl Serialize for Field {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value().serialize(serializer)
    }
}
