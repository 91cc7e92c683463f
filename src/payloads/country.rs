use super::canonical;
use crate::{
    elements::{Field, Payload, PayloadKind},
    error::Result,
    transform::{uppercase, Integer},
    validate::{Range, RegExp},
    value::Value,
};

payload_kind!(
    /// ISO 3166-1 country, identified by its two or three letter code.
    Country => "iso3166-1" {
        fn init(&self, payload: &mut Payload) -> Result<()> {
            payload
                .define(None, Field::new("name"))?
                .define(
                    None,
                    Field::new("code2")
                        .with_transformer(uppercase())
                        .with_validator(RegExp::new("^[A-Z]{2}$")?),
                )?
                .define(
                    None,
                    Field::new("code3")
                        .with_transformer(uppercase())
                        .with_validator(RegExp::new("^[A-Z]{3}$")?),
                )?
                .define(
                    None,
                    Field::new("e164")
                        .with_transformer(Integer)
                        .with_validator(Range::new(1, 999)),
                )?;
            Ok(())
        }

        fn is_valid(&self, payload: &Payload) -> bool {
            payload.valid("code2") || payload.valid("code3")
        }

        fn describe(&self, payload: &Payload) -> String {
            canonical(payload, "code2")
                .or_else(|| canonical(payload, "code3"))
                .unwrap_or_default()
        }

        fn label(&self, payload: &Payload) -> String {
            self.describe(payload)
        }

        // a bare code replaces the whole record
        fn set_value(&self, payload: &mut Payload, value: Value) -> Result<()> {
            match value {
                Value::Str(code) => {
                    *payload = Country::from_code(&code)?;
                    Ok(())
                }
                other => payload.replace(other),
            }
        }
    }
);

impl Country {
    /// A country from its alpha-2 code, or its alpha-3 code if the former
    /// does not fit.
    pub fn from_code(code: &str) -> Result<Payload> {
        let mut country = Payload::new(&Country)?;
        if country.set("code2", code).is_err() {
            country.set("code3", code)?;
        }
        Ok(country)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::payloads::Customer;

    #[test]
    fn test_codes() {
        let country = Country::from_code("de").unwrap();
        assert!(country.is_valid());
        assert_eq!(country.to_string(), "DE");

        let country = Country::from_code("deu").unwrap();
        assert_eq!(country.to_string(), "DEU");
        assert!(!country.valid("code2"));

        let err = Country::from_code("germany").unwrap_err();
        assert_eq!(
            err.to_string(),
            "value [germany] is not allowed for the [code3] element"
        );
    }

    #[test]
    fn test_lookup_by_alias_or_tag() {
        let mut customer = Payload::new(&Customer).unwrap();
        customer.set("country", "us").unwrap();

        let by_alias = customer.payload("country").unwrap();
        let by_tag = customer.payload("ISO3166-1").unwrap();
        assert_eq!(by_alias.to_string(), "US");
        assert_eq!(by_tag.to_string(), "US");
        assert_eq!(
            by_alias.field("CODE2").unwrap().canonical(),
            Some("US")
        );
    }

    #[test]
    fn test_e164() {
        let mut country = Country::from_code("US").unwrap();
        country.set("e164", "1").unwrap();
        assert_eq!(country.get("e164").unwrap(), Value::Int(1));
        assert!(country.set("e164", 0).is_err());
    }
}
