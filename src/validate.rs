use std::{
    fmt,
    net::{IpAddr, Ipv4Addr, Ipv6Addr},
    ops::BitOr,
    sync::Arc,
};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{Offset, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    elements::Node,
    error::Result,
    transform::{filter_int, parse_datetime, RFC3339},
    value::Value,
};

pub type SharedValidator = Arc<dyn Validator>;

/// A predicate over a transformed value. Never fails, only rejects.
pub trait Validator: fmt::Debug + Send + Sync {
    fn validate(&self, value: &Value) -> bool;
}

/// Accepts anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct Always;

impl Validator for Always {
    fn validate(&self, _value: &Value) -> bool {
        true
    }
}

/// Accepts values that can be stored as text.
#[derive(Debug, Clone, Copy, Default)]
pub struct Scalar;

impl Validator for Scalar {
    fn validate(&self, value: &Value) -> bool {
        value.is_scalar()
    }
}

/// Accepts element handlers: fields, groups, multi-line blocks and payloads.
#[derive(Debug, Clone, Copy, Default)]
pub struct IsNode;

impl Validator for IsNode {
    fn validate(&self, value: &Value) -> bool {
        matches!(value, Value::Node(_))
    }
}

/// Accepts any payload.
#[derive(Debug, Clone, Copy, Default)]
pub struct IsPayload;

impl Validator for IsPayload {
    fn validate(&self, value: &Value) -> bool {
        value.as_payload().is_some()
    }
}

/// Allow-list of strings.
#[derive(Debug, Clone)]
pub struct Choice {
    choices: Vec<String>,
}

impl Choice {
    pub fn new<T: ToString>(choices: impl IntoIterator<Item = T>) -> Self {
        Self {
            choices: choices.into_iter().map(|c| c.to_string()).collect(),
        }
    }
}

impl Validator for Choice {
    fn validate(&self, value: &Value) -> bool {
        value
            .as_str()
            .is_some_and(|s| self.choices.iter().any(|c| c == s))
    }
}

/// Allow-list of runtime type names.
#[derive(Debug, Clone)]
pub struct ClassList {
    classes: Vec<String>,
}

impl ClassList {
    pub fn new<T: ToString>(classes: impl IntoIterator<Item = T>) -> Self {
        Self {
            classes: classes.into_iter().map(|c| c.to_string()).collect(),
        }
    }
}

impl Validator for ClassList {
    fn validate(&self, value: &Value) -> bool {
        let name = value.type_name();
        self.classes.iter().any(|c| c == name)
    }
}

/// Inclusive integer range.
#[derive(Debug, Clone, Copy, Default)]
pub struct Range {
    min: Option<i64>,
    max: Option<i64>,
}

impl Range {
    pub fn new(min: i64, max: i64) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }

    pub fn min(min: i64) -> Self {
        Self {
            min: Some(min),
            max: None,
        }
    }

    pub fn max(max: i64) -> Self {
        Self {
            min: None,
            max: Some(max),
        }
    }
}

impl Validator for Range {
    fn validate(&self, value: &Value) -> bool {
        let n = match value {
            Value::Int(i) => *i,
            Value::Str(s) => match filter_int(s) {
                Some(i) => i,
                None => return false,
            },
            _ => return false,
        };
        self.min.map_or(true, |min| n >= min) && self.max.map_or(true, |max| n <= max)
    }
}

/// Regular expression match. The pattern is compiled up front.
#[derive(Debug, Clone)]
pub struct RegExp {
    pattern: Regex,
}

impl RegExp {
    pub fn new(pattern: &str) -> Result<Self> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
        })
    }
}

impl Validator for RegExp {
    fn validate(&self, value: &Value) -> bool {
        value
            .scalar()
            .is_some_and(|s| self.pattern.is_match(&s))
    }
}

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$",
    )
    .unwrap()
});

#[derive(Debug, Clone, Copy, Default)]
pub struct Email;

impl Validator for Email {
    fn validate(&self, value: &Value) -> bool {
        value.as_str().is_some_and(|s| {
            let local = s.split('@').next().unwrap_or_default();
            EMAIL.is_match(s)
                && !local.starts_with('.')
                && !local.ends_with('.')
                && !local.contains("..")
        })
    }
}

/// Address family and range restrictions for [`Ip`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IpFlags(u8);

impl IpFlags {
    pub const V4: IpFlags = IpFlags(0b0001);
    pub const V6: IpFlags = IpFlags(0b0010);
    pub const ALL: IpFlags = IpFlags(0b0011);
    pub const NO_PRIV: IpFlags = IpFlags(0b0100);
    pub const NO_RES: IpFlags = IpFlags(0b1000);
    pub const ONLY_PUBLIC: IpFlags = IpFlags(0b1100);

    pub const V4_NO_PRIV: IpFlags = IpFlags(0b0101);
    pub const V6_NO_PRIV: IpFlags = IpFlags(0b0110);
    pub const ALL_NO_PRIV: IpFlags = IpFlags(0b0111);
    pub const V4_NO_RES: IpFlags = IpFlags(0b1001);
    pub const V6_NO_RES: IpFlags = IpFlags(0b1010);
    pub const ALL_NO_RES: IpFlags = IpFlags(0b1011);
    pub const V4_ONLY_PUBLIC: IpFlags = IpFlags(0b1101);
    pub const V6_ONLY_PUBLIC: IpFlags = IpFlags(0b1110);
    pub const ALL_ONLY_PUBLIC: IpFlags = IpFlags(0b1111);

    pub fn contains(self, other: IpFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for IpFlags {
    type Output = IpFlags;

    fn bitor(self, rhs: Self) -> Self::Output {
        IpFlags(self.0 | rhs.0)
    }
}

fn is_private(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_private(),
        IpAddr::V6(v6) => (v6.segments()[0] & 0xfe00) == 0xfc00,
    }
}

fn is_reserved(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            let [a, b, ..] = v4.octets();
            a == 0 || a == 127 || (a == 169 && b == 254) || a >= 240 || *v4 == Ipv4Addr::BROADCAST
        }
        IpAddr::V6(v6) => {
            let s = v6.segments();
            *v6 == Ipv6Addr::UNSPECIFIED
                || *v6 == Ipv6Addr::LOCALHOST
                || (s[0] == 0x2001 && s[1] == 0x0db8)
                || (s[0] & 0xffc0) == 0xfe80
                || v6.to_ipv4_mapped().is_some()
        }
    }
}

/// IP address format check.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ip {
    flags: IpFlags,
}

impl Ip {
    pub fn new(flags: IpFlags) -> Self {
        Self { flags }
    }
}

impl Validator for Ip {
    fn validate(&self, value: &Value) -> bool {
        let Some(ip) = value.as_str().and_then(|s| s.parse::<IpAddr>().ok()) else {
            return false;
        };
        let family = self.flags.0 & IpFlags::ALL.0;
        let family_ok = match ip {
            IpAddr::V4(_) => family == 0 || self.flags.contains(IpFlags::V4),
            IpAddr::V6(_) => family == 0 || self.flags.contains(IpFlags::V6),
        };
        family_ok
            && !(self.flags.contains(IpFlags::NO_PRIV) && is_private(&ip))
            && !(self.flags.contains(IpFlags::NO_RES) && is_reserved(&ip))
    }
}

/// Non-empty, strictly decodable base64.
#[derive(Debug, Clone, Copy, Default)]
pub struct Base64;

impl Validator for Base64 {
    fn validate(&self, value: &Value) -> bool {
        value
            .as_str()
            .is_some_and(|s| !s.is_empty() && STANDARD.decode(s).is_ok())
    }
}

/// Accepts a leaf field with the given tag name.
#[derive(Debug, Clone)]
pub struct NamedElement {
    name: String,
}

impl NamedElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Validator for NamedElement {
    fn validate(&self, value: &Value) -> bool {
        matches!(value.as_node(), Some(Node::Field(field)) if field.name() == self.name)
    }
}

/// Decimal digits only.
#[derive(Debug, Clone, Copy, Default)]
pub struct Digits;

impl Validator for Digits {
    fn validate(&self, value: &Value) -> bool {
        value
            .scalar()
            .is_some_and(|s| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()))
    }
}

/// Hexadecimal digits only.
#[derive(Debug, Clone, Copy, Default)]
pub struct HexDigits;

impl Validator for HexDigits {
    fn validate(&self, value: &Value) -> bool {
        value
            .scalar()
            .is_some_and(|s| !s.is_empty() && s.bytes().all(|b| b.is_ascii_hexdigit()))
    }
}

/// Accepts strings readable under a chrono format.
#[derive(Debug, Clone)]
pub struct DatetimeFormat {
    format: String,
}

impl Default for DatetimeFormat {
    fn default() -> Self {
        Self::new(RFC3339)
    }
}

impl DatetimeFormat {
    pub fn new(format: impl Into<String>) -> Self {
        Self {
            format: format.into(),
        }
    }
}

impl Validator for DatetimeFormat {
    fn validate(&self, value: &Value) -> bool {
        value
            .scalar()
            .is_some_and(|s| parse_datetime(&s, &self.format, &Utc.fix()).is_some())
    }
}

/// Closure-backed validator for one-off rules.
#[derive(Clone)]
pub struct Predicate(Arc<dyn Fn(&Value) -> bool + Send + Sync>);

impl Predicate {
    pub fn new(f: impl Fn(&Value) -> bool + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Predicate").finish_non_exhaustive()
    }
}

impl Validator for Predicate {
    fn validate(&self, value: &Value) -> bool {
        (self.0)(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{elements::Field, error::Error};

    #[test]
    fn test_choice() {
        let vd = Choice::new([4, 6]);
        assert!(vd.validate(&"4".into()));
        assert!(!vd.validate(&"5".into()));
        assert!(!vd.validate(&4.into()));
    }

    #[test]
    fn test_class_list() {
        let vd = ClassList::new(["ReadOnlyField", "GeneratedField"]);
        assert!(vd.validate(&Field::new("a").read_only().into()));
        assert!(!vd.validate(&Field::new("a").into()));
        assert!(!vd.validate(&"a".into()));
    }

    #[test]
    fn test_range() {
        let vd = Range::new(0, 128);
        assert!(vd.validate(&"0".into()));
        assert!(vd.validate(&128.into()));
        assert!(!vd.validate(&"129".into()));
        assert!(!vd.validate(&"08".into()));
        assert!(!vd.validate(&"abc".into()));
        assert!(Range::min(5).validate(&"500".into()));
        assert!(!Range::max(5).validate(&"6".into()));
    }

    #[test]
    fn test_regexp() {
        assert!(matches!(RegExp::new("(unclosed"), Err(Error::InvalidPattern(_))));
        let vd = RegExp::new("^[A-Z]{2}$").unwrap();
        assert!(vd.validate(&"DE".into()));
        assert!(!vd.validate(&"DEU".into()));
    }

    #[test]
    fn test_email() {
        assert!(Email.validate(&"someone@example.com".into()));
        assert!(Email.validate(&"first.last+tag@mail.example.org".into()));
        assert!(!Email.validate(&"someone@".into()));
        assert!(!Email.validate(&"someone".into()));
        assert!(!Email.validate(&".dot@example.com".into()));
    }

    #[test]
    fn test_ip() {
        let cases = [
            (IpFlags::ALL, "207.142.131.235", true),
            (IpFlags::ALL, "127.0.0.1", true),
            (IpFlags::ALL, "2001:0db8:85a3:8d3::", true),
            (IpFlags::V4, "192.168.2.1", true),
            (IpFlags::V4, "7708:7d89:363d:b185::", false),
            (IpFlags::V6, "127.0.0.1", false),
            (IpFlags::V6, "fd9e:21a7:a92c:2323::", true),
            (IpFlags::ALL_ONLY_PUBLIC, "207.142.131.235", true),
            (IpFlags::ALL_ONLY_PUBLIC, "127.0.0.1", false),
            (IpFlags::ALL_ONLY_PUBLIC, "192.168.2.1", false),
            (IpFlags::ALL_ONLY_PUBLIC, "7708:7d89:363d:b185::", true),
            (IpFlags::ALL_ONLY_PUBLIC, "2001:0db8:85a3:8d3::", false),
            (IpFlags::ALL_ONLY_PUBLIC, "fd9e:21a7:a92c:2323::", false),
            (IpFlags::V4_ONLY_PUBLIC, "7708:7d89:363d:b185::", false),
            (IpFlags::V6_ONLY_PUBLIC, "7708:7d89:363d:b185::", true),
            (IpFlags::ALL_NO_PRIV, "127.0.0.1", true),
            (IpFlags::ALL_NO_RES, "192.168.2.1", true),
            (IpFlags::V4 | IpFlags::NO_RES, "0.1.2.3", false),
        ];
        for (flags, input, expected) in cases {
            assert_eq!(Ip::new(flags).validate(&input.into()), expected, "{input}");
        }
        assert!(!Ip::default().validate(&"300.1.1.1".into()));
    }

    #[test]
    fn test_base64() {
        assert!(Base64.validate(&"cGhwdW5pdA==".into()));
        assert!(!Base64.validate(&"".into()));
        assert!(!Base64.validate(&"not base64!".into()));
    }

    #[test]
    fn test_named_element() {
        let vd = NamedElement::new("originAS");
        let mut field = Field::new("originAS");
        field.set_value("AS1").unwrap();
        assert!(vd.validate(&field.into()));
        assert!(!vd.validate(&Field::new("other").into()));
        assert!(!vd.validate(&"originAS".into()));
    }

    #[test]
    fn test_digits() {
        assert!(Digits.validate(&"0123".into()));
        assert!(Digits.validate(&12.into()));
        assert!(!Digits.validate(&"12a".into()));
        assert!(!Digits.validate(&"".into()));
        assert!(HexDigits.validate(&"DEADbeef01".into()));
        assert!(!HexDigits.validate(&"xyz".into()));
    }

    #[test]
    fn test_datetime_format() {
        assert!(DatetimeFormat::default().validate(&"2012-06-19T15:48:16-04:00".into()));
        assert!(DatetimeFormat::new("%m-%d-%Y").validate(&"05-25-2011".into()));
        assert!(!DatetimeFormat::new("%m-%d-%Y").validate(&"2011-05-25".into()));
    }

    #[test]
    fn test_predicate() {
        let vd = Predicate::new(|v| v.as_str().is_some_and(|s| s.len() == 3));
        assert!(vd.validate(&"abc".into()));
        assert!(!vd.validate(&"ab".into()));
    }
}
