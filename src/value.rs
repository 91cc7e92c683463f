use std::{fmt, net::IpAddr, str::FromStr, sync::Arc};

use chrono::{DateTime, FixedOffset, SecondsFormat, TimeZone};
use serde::{ser::SerializeMap, Serialize, Serializer};

use crate::{
    elements::{Field, Group, MultiLine, Node, Payload},
    error::Error,
};

/// Capability of domain objects that can stand in for a field value.
///
/// Transformers consult `handle` before `text`, so a payload-like object
/// resolves to its primary key and anything else to its string form.
pub trait DomainValue: fmt::Debug + Send + Sync {
    fn type_name(&self) -> &str;

    fn handle(&self) -> Option<String> {
        None
    }

    fn text(&self) -> Option<String> {
        None
    }

    fn network(&self) -> Option<(IpAddr, u8)> {
        None
    }
}

#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    DateTime(DateTime<FixedOffset>),
    List(Vec<Value>),
    Map(Vec<(String, Value)>),
    Node(Box<Node>),
    Object(Arc<dyn DomainValue>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Whether the value can be stored as a field's canonical string.
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::Str(_)
        )
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<&DateTime<FixedOffset>> {
        match self {
            Value::DateTime(dt) => Some(dt),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Value::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn into_node(self) -> Option<Node> {
        match self {
            Value::Node(node) => Some(*node),
            _ => None,
        }
    }

    pub fn as_payload(&self) -> Option<&Payload> {
        self.as_node().and_then(Node::as_payload)
    }

    /// String form of a scalar; booleans become `"true"`/`"false"`.
    pub fn scalar(&self) -> Option<String> {
        match self {
            Value::Bool(b) => Some(b.to_string()),
            Value::Int(i) => Some(i.to_string()),
            Value::Float(f) => Some(f.to_string()),
            Value::Str(s) => Some(s.clone()),
            _ => None,
        }
    }

    /// Handle of a handle-bearing object or payload.
    pub fn handle(&self) -> Option<String> {
        match self {
            Value::Object(obj) => obj.handle(),
            Value::Node(node) => node.handle(),
            _ => None,
        }
    }

    /// String form of a stringable object.
    pub fn text(&self) -> Option<String> {
        match self {
            Value::Object(obj) => obj.text(),
            Value::Node(node) => node.text(),
            _ => None,
        }
    }

    /// Runtime type name, as matched by class-list validation.
    pub fn type_name(&self) -> &str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::DateTime(_) => "DateTime",
            Value::List(_) | Value::Map(_) => "array",
            Value::Node(node) => node.type_name(),
            Value::Object(obj) => obj.type_name(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Str(s) => f.write_str(s),
            Value::DateTime(dt) => f.write_str(&dt.to_rfc3339_opts(SecondsFormat::Secs, false)),
            Value::List(_) | Value::Map(_) => f.write_str("Array"),
            Value::Node(node) => match node.text() {
                Some(text) => f.write_str(&text),
                None => f.write_str(node.type_name()),
            },
            Value::Object(obj) => match obj.text() {
                Some(text) => f.write_str(&text),
                None => f.write_str(obj.type_name()),
            },
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::DateTime(a), Value::DateTime(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Node(a), Value::Node(b)) => {
                a.type_name() == b.type_name() && a.value() == b.value()
            }
            (Value::Object(a), Value::Object(b)) => {
                Arc::ptr_eq(a, b) || (a.type_name() == b.type_name() && a.text() == b.text())
            }
            _ => false,
        }
    }
}

impl PartialEq<&str> for Value {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == Some(*other)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::Str(s) => serializer.serialize_str(s),
            Value::DateTime(dt) => {
                serializer.serialize_str(&dt.to_rfc3339_opts(SecondsFormat::Secs, false))
            }
            Value::List(items) => serializer.collect_seq(items),
            Value::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
            Value::Node(node) => node.serialize(serializer),
            Value::Object(obj) => match obj.handle().or_else(|| obj.text()) {
                Some(text) => serializer.serialize_str(&text),
                None => serializer.serialize_none(),
            },
        }
    }
}

macro_rules! impl_from_int {
    ($($ty:ty),*) => {
        $(impl From<$ty> for Value {
            fn from(value: $ty) -> Self {
                Value::Int(value.into())
            }
        })*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<&String> for Value {
    fn from(value: &String) -> Self {
        Value::Str(value.clone())
    }
}

impl<Tz: TimeZone> From<DateTime<Tz>> for Value {
    fn from(value: DateTime<Tz>) -> Self {
        Value::DateTime(value.fixed_offset())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(value: Vec<T>) -> Self {
        Value::List(value.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>, const N: usize> From<[T; N]> for Value {
    fn from(value: [T; N]) -> Self {
        Value::List(value.into_iter().map(Into::into).collect())
    }
}

impl From<Node> for Value {
    fn from(value: Node) -> Self {
        Value::Node(Box::new(value))
    }
}

impl From<Field> for Value {
    fn from(value: Field) -> Self {
        Node::Field(value).into()
    }
}

impl From<Group> for Value {
    fn from(value: Group) -> Self {
        Node::Group(value).into()
    }
}

impl From<MultiLine> for Value {
    fn from(value: MultiLine) -> Self {
        Node::MultiLine(value).into()
    }
}

impl From<Payload> for Value {
    fn from(value: Payload) -> Self {
        Node::Payload(value).into()
    }
}

impl From<Arc<dyn DomainValue>> for Value {
    fn from(value: Arc<dyn DomainValue>) -> Self {
        Value::Object(value)
    }
}

/// An IP network in CIDR notation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Network {
    addr: IpAddr,
    prefix: u8,
}

impl Network {
    pub fn new(addr: IpAddr, prefix: u8) -> Self {
        Self { addr, prefix }
    }

    pub fn addr(&self) -> IpAddr {
        self.addr
    }

    pub fn prefix(&self) -> u8 {
        self.prefix
    }
}

impl FromStr for Network {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::Parse(format!("invalid network [{s}]"));
        let (addr, prefix) = s.split_once('/').ok_or_else(invalid)?;
        let addr: IpAddr = addr.trim().parse().map_err(|_| invalid())?;
        let prefix: u8 = prefix.trim().parse().map_err(|_| invalid())?;
        let max = if addr.is_ipv4() { 32 } else { 128 };
        if prefix > max {
            return Err(invalid());
        }
        Ok(Self { addr, prefix })
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr, self.prefix)
    }
}

impl DomainValue for Network {
    fn type_name(&self) -> &str {
        "Network"
    }

    fn text(&self) -> Option<String> {
        Some(self.to_string())
    }

    fn network(&self) -> Option<(IpAddr, u8)> {
        Some((self.addr, self.prefix))
    }
}

impl From<Network> for Value {
    fn from(value: Network) -> Self {
        Value::Object(Arc::new(value))
    }
}
