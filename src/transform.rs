use std::{
    fmt::{self, Write},
    net::IpAddr,
    sync::Arc,
};

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    elements::{Field, Node},
    value::Value,
};

pub type SharedTransformer = Arc<dyn Transformer>;

/// A reversible converter between user input and the canonical wire value.
///
/// A transformer that cannot make sense of its input returns it unchanged;
/// rejecting such values is left to validation.
pub trait Transformer: fmt::Debug + Send + Sync {
    fn transform(&self, value: Value) -> Value;

    fn reverse_transform(&self, value: Value) -> Value;
}

/// Passes values through in both directions.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl Transformer for Identity {
    fn transform(&self, value: Value) -> Value {
        value
    }

    fn reverse_transform(&self, value: Value) -> Value {
        value
    }
}

/// Coerces scalars and handle or string bearing objects into strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringTransformer;

impl Transformer for StringTransformer {
    fn transform(&self, value: Value) -> Value {
        if let Some(s) = value.scalar() {
            return Value::Str(s);
        }
        match value.handle().or_else(|| value.text()) {
            Some(s) => Value::Str(s),
            None => value,
        }
    }

    fn reverse_transform(&self, value: Value) -> Value {
        value
    }
}

/// Strict integer parse: optional sign, no leading zeros, surrounding
/// whitespace allowed.
pub(crate) fn filter_int(input: &str) -> Option<i64> {
    let s = input.trim();
    let digits = s.strip_prefix(['+', '-']).unwrap_or(s);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if digits.len() > 1 && digits.starts_with('0') {
        return None;
    }
    s.parse().ok()
}

/// Canonicalizes integers. Booleans are passed through untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct Integer;

impl Transformer for Integer {
    fn transform(&self, value: Value) -> Value {
        match value {
            Value::Int(i) => Value::Str(i.to_string()),
            Value::Float(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                Value::Str((f as i64).to_string())
            }
            Value::Str(ref s) => match filter_int(s) {
                Some(i) => Value::Str(i.to_string()),
                None => value,
            },
            other => other,
        }
    }

    fn reverse_transform(&self, value: Value) -> Value {
        match value {
            Value::Str(ref s) => match s.trim().parse::<i64>() {
                Ok(i) => Value::Int(i),
                Err(_) => value,
            },
            other => other,
        }
    }
}

/// Fuzzy boolean parsing. Unrecognized input is preserved.
#[derive(Debug, Clone, Copy, Default)]
pub struct Boolean;

impl Boolean {
    fn parse(value: &Value) -> Option<bool> {
        match value {
            Value::Bool(b) => Some(*b),
            Value::Int(1) => Some(true),
            Value::Int(0) => Some(false),
            Value::Str(s) => match s.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "on" | "yes" => Some(true),
                "0" | "false" | "off" | "no" | "" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }
}

impl Transformer for Boolean {
    fn transform(&self, value: Value) -> Value {
        match Self::parse(&value) {
            Some(b) => Value::Str(b.to_string()),
            None => value,
        }
    }

    fn reverse_transform(&self, value: Value) -> Value {
        let lowered = value.as_str().map(str::to_ascii_lowercase);
        match lowered.as_deref() {
            Some("true") => Value::Bool(true),
            Some("false") => Value::Bool(false),
            _ => value,
        }
    }
}

static DOTTED_QUAD: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+(\.\d+){3}$").unwrap());

/// Strips zero padding from dotted IPv4 notation.
fn unpad(s: &str) -> Option<String> {
    if !DOTTED_QUAD.is_match(s) {
        return None;
    }
    let parts = s
        .split('.')
        .map(|part| part.parse::<u32>().map(|n| n.to_string()))
        .collect::<Result<Vec<_>, _>>()
        .ok()?;
    Some(parts.join("."))
}

/// IP address normalization. IPv6 is compressed on the read path only.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ip;

impl Transformer for Ip {
    fn transform(&self, value: Value) -> Value {
        let value = match value {
            Value::Object(ref obj) => match obj.network() {
                Some((addr, _)) => Value::Str(addr.to_string()),
                None => value,
            },
            other => other,
        };
        match value.as_str().map(str::trim).and_then(unpad) {
            Some(ip) => Value::Str(ip),
            None => value,
        }
    }

    fn reverse_transform(&self, value: Value) -> Value {
        let Some(s) = value.as_str() else {
            return value;
        };
        let s = unpad(s.trim()).unwrap_or_else(|| s.trim().to_string());
        match s.parse::<IpAddr>() {
            Ok(ip) => Value::Str(ip.to_string()),
            Err(_) => value,
        }
    }
}

/// chrono format for RFC 3339 timestamps.
pub const RFC3339: &str = "%Y-%m-%dT%H:%M:%S%:z";

/// Parses `s` under `format`, interpreting zone-less input in `offset`.
pub(crate) fn parse_datetime(
    s: &str,
    format: &str,
    offset: &FixedOffset,
) -> Option<DateTime<FixedOffset>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_str(s, format) {
        return Some(dt);
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
        return offset.from_local_datetime(&naive).single();
    }
    let date = NaiveDate::parse_from_str(s, format).ok()?;
    offset.from_local_datetime(&date.and_hms_opt(0, 0, 0)?).single()
}

/// Converts dates into a formatted UTC string and back into a zoned date.
#[derive(Debug, Clone)]
pub struct Datetime {
    format: String,
    source: FixedOffset,
}

impl Default for Datetime {
    fn default() -> Self {
        Self::new(RFC3339)
    }
}

impl Datetime {
    pub fn new(format: impl Into<String>) -> Self {
        Self {
            format: format.into(),
            source: Utc.fix(),
        }
    }

    /// Offset used to read zone-less input and to build dates on read.
    pub fn with_source(mut self, source: FixedOffset) -> Self {
        self.source = source;
        self
    }

    /// `None` when the format has specifiers chrono cannot render.
    fn format(&self, dt: &DateTime<FixedOffset>) -> Option<String> {
        let mut out = String::new();
        write!(out, "{}", dt.with_timezone(&Utc).format(&self.format)).ok()?;
        Some(out)
    }

    fn parse_input(&self, s: &str) -> Option<DateTime<FixedOffset>> {
        parse_datetime(s, &self.format, &self.source)
            .or_else(|| DateTime::parse_from_rfc3339(s.trim()).ok())
            .or_else(|| parse_datetime(s, "%Y-%m-%d %H:%M:%S", &self.source))
            .or_else(|| parse_datetime(s, "%Y-%m-%d", &self.source))
    }
}

impl Transformer for Datetime {
    fn transform(&self, value: Value) -> Value {
        match value {
            Value::DateTime(dt) => match self.format(&dt) {
                Some(s) => Value::Str(s),
                None => Value::DateTime(dt),
            },
            Value::Int(i) => self.transform(Value::Str(i.to_string())),
            Value::Str(ref s) => match self.parse_input(s).and_then(|dt| self.format(&dt)) {
                Some(formatted) => Value::Str(formatted),
                None => value,
            },
            other => other,
        }
    }

    fn reverse_transform(&self, value: Value) -> Value {
        let Some(s) = value.as_str() else {
            return value;
        };
        match parse_datetime(s, &self.format, &Utc.fix()) {
            Some(dt) => Value::DateTime(dt.with_timezone(&self.source)),
            None => value,
        }
    }
}

/// Bidirectional lookup table.
#[derive(Debug, Clone, Default)]
pub struct MapTransformer {
    pairs: Vec<(String, String)>,
}

impl MapTransformer {
    pub fn new<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: ToString,
        V: ToString,
    {
        Self {
            pairs: pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

impl Transformer for MapTransformer {
    fn transform(&self, value: Value) -> Value {
        let Some(key) = value.scalar() else {
            return value;
        };
        match self.pairs.iter().find(|(k, _)| *k == key) {
            Some((_, v)) => Value::Str(v.clone()),
            None => value,
        }
    }

    fn reverse_transform(&self, value: Value) -> Value {
        let Some(needle) = value.scalar() else {
            return value;
        };
        match self.pairs.iter().find(|(_, v)| *v == needle) {
            Some((k, _)) => Value::Str(k.clone()),
            None => value,
        }
    }
}

type Func = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// Caller supplied conversion pair.
#[derive(Clone)]
pub struct Callback {
    up: Func,
    down: Func,
}

impl Callback {
    pub fn new<U, D>(up: U, down: D) -> Self
    where
        U: Fn(Value) -> Value + Send + Sync + 'static,
        D: Fn(Value) -> Value + Send + Sync + 'static,
    {
        Self {
            up: Arc::new(up),
            down: Arc::new(down),
        }
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callback").finish_non_exhaustive()
    }
}

impl Transformer for Callback {
    fn transform(&self, value: Value) -> Value {
        (self.up)(value)
    }

    fn reverse_transform(&self, value: Value) -> Value {
        (self.down)(value)
    }
}

/// Upper-cases string input, leaving the read path alone.
pub fn uppercase() -> Callback {
    Callback::new(
        |value| match value {
            Value::Str(s) => Value::Str(s.to_uppercase()),
            other => other,
        },
        |value| value,
    )
}

/// Ordered chain of transformers.
///
/// `transform` runs front to back, `reverse_transform` back to front.
#[derive(Debug, Clone, Default)]
pub struct Stack {
    items: Vec<SharedTransformer>,
}

impl Stack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, transformer: impl Transformer + 'static) -> Self {
        self.push(transformer);
        self
    }

    pub fn push(&mut self, transformer: impl Transformer + 'static) {
        self.items.push(Arc::new(transformer));
    }

    pub fn pop(&mut self) -> Option<SharedTransformer> {
        self.items.pop()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Transformer for Stack {
    fn transform(&self, value: Value) -> Value {
        self.items
            .iter()
            .fold(value, |value, item| item.transform(value))
    }

    fn reverse_transform(&self, value: Value) -> Value {
        self.items
            .iter()
            .rev()
            .fold(value, |value, item| item.reverse_transform(value))
    }
}

/// Wraps scalars into copies of a configured leaf field.
#[derive(Debug, Clone)]
pub struct ElementTransformer {
    prototype: Field,
}

impl ElementTransformer {
    pub fn new(prototype: Field) -> Self {
        Self { prototype }
    }
}

impl Transformer for ElementTransformer {
    fn transform(&self, value: Value) -> Value {
        if matches!(&value, Value::Node(node) if matches!(**node, Node::Field(_))) {
            return value;
        }
        let input = match value.scalar().or_else(|| value.text()) {
            Some(s) => Value::Str(s),
            None if value.is_null() => Value::Null,
            None => return value,
        };
        let mut field = self.prototype.clone();
        match field.set_value(input) {
            Ok(()) => field.into(),
            Err(_) => value,
        }
    }

    fn reverse_transform(&self, value: Value) -> Value {
        value
    }
}
