use once_cell::sync::Lazy;
use regex::Regex;

use super::{canonical, RPKI_NAMESPACE};
use crate::{
    elements::{Field, Group, Payload},
    error::{Error, Result, Role},
    registry::Registry,
    transform::{Callback, Datetime, Integer},
    validate::{self, Choice, ClassList, DatetimeFormat, Digits, RegExp},
    value::Value,
    xml::XmlElement,
};

const RESOURCE_CLASS: &str = "resourceClass";
const RESOURCE_CLASSES: [&str; 5] = ["AR", "AP", "RN", "LN", "AF"];

/// Date format of the validity period.
const VALIDITY_FORMAT: &str = "%m-%d-%Y";

static AS_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^AS(\d+)$").unwrap());

payload_kind!(
    /// A signed route origin authorization request.
    Roa => "roa" {
        fn namespace(&self) -> &'static str {
            RPKI_NAMESPACE
        }

        fn init(&self, payload: &mut Payload) -> Result<()> {
            payload
                .define(None, Field::new("signature").with_validator(validate::Base64))?
                .define(Some("data"), Payload::new(&RoaData)?)?;
            Ok(())
        }

        fn label(&self, payload: &Payload) -> String {
            payload
                .payload("data")
                .ok()
                .and_then(|data| canonical(data, "name"))
                .unwrap_or_default()
        }
    }
);

impl Roa {
    /// Resource class the ROA is issued for. Defaults to `AR`.
    pub fn resource_class(roa: &Payload) -> &str {
        roa.option(RESOURCE_CLASS).unwrap_or("AR")
    }

    pub fn set_resource_class(roa: &mut Payload, class: &str) -> Result<()> {
        let class = class.to_uppercase();
        if !RESOURCE_CLASSES.contains(&class.as_str()) {
            return Err(Error::InvalidResourceClass(class));
        }
        roa.set_option(RESOURCE_CLASS, class);
        Ok(())
    }
}

/// Strips the `AS` prefix of an AS number; adds it back on read.
fn as_number() -> Callback {
    Callback::new(
        |value| match value.as_str().and_then(|s| AS_NUMBER.captures(s)) {
            Some(caps) => Value::Str(caps[1].to_string()),
            None => value,
        },
        |value| match value.as_str() {
            Some(number) => Value::Str(format!("AS{number}")),
            None => value,
        },
    )
}

payload_kind!(
    /// The data a ROA signature covers, carried on the wire as a single
    /// pipe separated string.
    RoaData => "roaData" {
        fn namespace(&self) -> &'static str {
            RPKI_NAMESPACE
        }

        fn init(&self, payload: &mut Payload) -> Result<()> {
            let validity = |tag: &str| {
                Field::new(tag)
                    .with_transformer(Datetime::new(VALIDITY_FORMAT))
                    .with_validator(DatetimeFormat::new(VALIDITY_FORMAT))
            };
            let mut version = Field::new("version")
                .with_transformer(Integer)
                .with_validator(Choice::new([1]));
            version.set_value(1)?;
            payload
                .define(None, version)?
                .define(
                    None,
                    Field::new("signed")
                        .with_transformer(Datetime::new("%s"))
                        .with_validator(DatetimeFormat::new("%s")),
                )?
                .define(None, Field::new("name"))?
                .define(
                    Some("asn"),
                    Field::new("originAS").with_transformer(as_number()).with_validator(Digits),
                )?
                .define(Some("start"), validity("validityStart"))?
                .define(Some("end"), validity("validityEnd"))?
                .define(
                    Some("prefix"),
                    Group::new("roaPrefixes").with_validator(ClassList::new(["RoaPrefix"])),
                )?;
            Ok(())
        }

        fn describe(&self, payload: &Payload) -> String {
            RoaData::pack(payload)
        }

        fn value(&self, payload: &Payload) -> Value {
            Value::Str(RoaData::pack(payload))
        }

        fn set_value(&self, payload: &mut Payload, value: Value) -> Result<()> {
            match value {
                Value::Null => payload.clear(),
                Value::Str(text) => {
                    payload.clear()?;
                    RoaData::unpack(payload, &text)
                }
                Value::Node(node) => payload.replace(Value::Node(node)),
                other => Err(Error::validation(other.type_name(), "roaData", Role::Element)),
            }
        }

        fn xml_children(&self, payload: &Payload, element: &mut XmlElement) {
            element.text = RoaData::pack(payload);
        }

        fn xml_parse(&self, payload: &mut Payload, node: &XmlElement, _registry: &Registry) -> Result<()> {
            RoaData::unpack(payload, &node.text)
        }
    }
);

impl RoaData {
    /// Joins the fields and prefixes, each followed by a `|`.
    fn pack(data: &Payload) -> String {
        let mut text = String::new();
        for alias in ["version", "signed", "name", "asn", "start", "end"] {
            text.push_str(&canonical(data, alias).unwrap_or_default());
            text.push('|');
        }
        if let Ok(prefixes) = data.group("prefix") {
            for prefix in prefixes {
                text.push_str(&prefix.text().unwrap_or_default());
                text.push('|');
            }
        }
        text
    }

    fn unpack(data: &mut Payload, text: &str) -> Result<()> {
        let text = text.trim_matches(|c: char| c == '|' || c.is_whitespace() || c == '\0');
        let mut parts = text.split('|');
        for alias in ["version", "signed", "name", "asn", "start", "end"] {
            data.set(alias, parts.next().map_or(Value::Null, Value::from))?;
        }
        while let Some(address) = parts.next() {
            let length = parts.next().unwrap_or_default();
            let mut prefix = RoaPrefix::from_cidr(&format!("{address}/{length}"))?;
            match parts.next().filter(|max| !max.is_empty()) {
                Some(max) => prefix.set("maxLength", max)?,
                None => prefix.set("maxLength", Value::Null)?,
            };
            data.add("prefix", prefix)?;
        }
        Ok(())
    }
}

payload_kind!(
    /// A prefix a ROA authorizes, with an optional maximum length.
    RoaPrefix => "roaPrefix" {
        fn namespace(&self) -> &'static str {
            RPKI_NAMESPACE
        }

        fn init(&self, payload: &mut Payload) -> Result<()> {
            payload
                .define(
                    None,
                    Field::new("cidr").with_validator(RegExp::new(r"(?i)^[0-9a-f:.]+/\d+$")?),
                )?
                // not below the prefix length of the cidr
                .define(None, Field::new("maxLength").with_validator(Digits))?;
            Ok(())
        }

        fn is_valid(&self, payload: &Payload) -> bool {
            payload.valid("cidr")
        }

        fn describe(&self, payload: &Payload) -> String {
            let cidr = canonical(payload, "cidr").unwrap_or_default();
            let max = canonical(payload, "maxLength").unwrap_or_default();
            format!("{}|{max}", cidr.replace('/', "|"))
        }
    }
);

impl RoaPrefix {
    pub fn from_cidr(cidr: &str) -> Result<Payload> {
        let mut prefix = Payload::new(&RoaPrefix)?;
        prefix.set("cidr", cidr)?;
        Ok(prefix)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    use super::*;

    const PACKED: &str = "1|1340135296|My First ROA|1234|05-25-2011|05-25-2012|10.0.0.0|8|16|";

    fn roa_data() -> Payload {
        let mut data = Payload::new(&RoaData).unwrap();
        let mut prefix = RoaPrefix::from_cidr("10.0.0.0/8").unwrap();
        prefix.set("maxLength", 16).unwrap();
        data.set("signed", Utc.timestamp_opt(1340135296, 0).unwrap())
            .unwrap()
            .set("name", "My First ROA")
            .unwrap()
            .set("asn", "AS1234")
            .unwrap()
            .set("start", "05-25-2011")
            .unwrap()
            .set("end", "05-25-2012")
            .unwrap()
            .add("prefix", prefix)
            .unwrap();
        data
    }

    #[test]
    fn test_pack() {
        let data = roa_data();
        assert!(data.is_valid());
        assert_eq!(data.to_string(), PACKED);
        assert_eq!(data.value(), PACKED);
        assert_eq!(data.get("asn").unwrap(), "AS1234");
    }

    #[test]
    fn test_unpack() {
        let mut data = Payload::new(&RoaData).unwrap();
        data.set_value(format!(" {PACKED}\n")).unwrap();
        assert_eq!(data.field("asn").unwrap().canonical(), Some("1234"));
        assert_eq!(
            data.get("start").unwrap().as_datetime().map(|dt| dt.timestamp()),
            Some(1306281600)
        );
        assert_eq!(data.group("prefix").unwrap().len(), 1);
        assert_eq!(data.to_string(), PACKED);

        data.set_value("1|1340135296|Second|1234|05-25-2011|05-25-2012|2001:db8::|32||")
            .unwrap();
        assert_eq!(data.get("name").unwrap(), "Second");
        assert_eq!(
            data.to_string(),
            "1|1340135296|Second|1234|05-25-2011|05-25-2012|2001:db8::|32||"
        );

        assert!(data.set_value(42).is_err());
        data.set_value(Value::Null).unwrap();
        assert!(!data.is_valid());
    }

    #[test]
    fn test_roa_document() {
        let mut roa = Payload::new(&Roa).unwrap();
        roa.set("data", roa_data()).unwrap();
        roa.set("signature", "c2lnbmF0dXJl").unwrap();
        assert!(roa.is_valid());

        let xml = roa.xml_serialize().unwrap();
        assert_eq!(
            xml,
            format!(
                concat!(
                    r#"<?xml version="1.0" encoding="UTF-8"?>"#,
                    r#"<roa xmlns="http://www.arin.net/regrws/rpki/v1">"#,
                    "<signature>c2lnbmF0dXJl</signature>",
                    "<roaData>{}</roaData>",
                    "</roa>"
                ),
                PACKED
            )
        );

        let parsed = Payload::from_xml(&xml).unwrap();
        assert_eq!(parsed.payload("data").unwrap().to_string(), PACKED);
        assert_eq!(parsed.get("signature").unwrap(), "c2lnbmF0dXJl");
    }

    #[test]
    fn test_resource_class() {
        let mut roa = Payload::new(&Roa).unwrap();
        assert_eq!(Roa::resource_class(&roa), "AR");
        Roa::set_resource_class(&mut roa, "rn").unwrap();
        assert_eq!(Roa::resource_class(&roa), "RN");
        let err = Roa::set_resource_class(&mut roa, "xx").unwrap_err();
        assert_eq!(err.to_string(), "value [XX] is not a valid ROA resource class");
        assert_eq!(Roa::resource_class(&roa), "RN");
    }

    #[test]
    fn test_invalid_roa_warns() {
        let roa = Payload::new(&Roa).unwrap();
        assert!(!roa.is_valid());
        assert_eq!(
            roa.xml_serialize().unwrap(),
            concat!(
                r#"<?xml version="1.0" encoding="UTF-8"?>"#,
                r#"<roa xmlns="http://www.arin.net/regrws/rpki/v1"/>"#
            )
        );
    }
}
