use super::canonical;
use crate::{
    elements::{Field, Group, Payload},
    error::Result,
    transform::{ElementTransformer, Integer, MapTransformer},
    validate::{Choice, ClassList, Digits, HexDigits, NamedElement},
};

payload_kind!(
    /// Reverse DNS delegation of a zone to a set of nameservers.
    Delegation => "delegation" {
        fn init(&self, payload: &mut Payload) -> Result<()> {
            payload
                .define(None, Field::new("name").generated())?
                .define(
                    Some("key"),
                    Group::new("delegationKeys").with_validator(ClassList::new(["DelegationKey"])),
                )?
                .define(
                    None,
                    Group::new("nameservers")
                        .with_transformer(ElementTransformer::new(Field::new("nameserver")))
                        .with_validator(NamedElement::new("nameserver")),
                )?;
            Ok(())
        }

        fn is_primary(&self) -> bool {
            true
        }

        fn handle(&self, payload: &Payload) -> Option<String> {
            canonical(payload, "name")
        }

        fn is_valid(&self, payload: &Payload) -> bool {
            payload.valid("nameservers")
        }
    }
);

payload_kind!(
    /// DNSSEC delegation signer record.
    DelegationKey => "delegationKey" {
        fn init(&self, payload: &mut Payload) -> Result<()> {
            let algorithms = MapTransformer::new([
                ("RSASHA1", "5"),
                ("RSASHA1-NSEC3-SHA1", "7"),
                ("RSASHA256", "8"),
                ("RSASHA512", "10"),
                ("ECDSAP256SHA256", "13"),
                ("ECDSAP384SHA384", "14"),
            ]);
            payload
                .define(
                    None,
                    Field::new("algorithm")
                        .with_transformer(algorithms)
                        .with_validator(Choice::new([5, 7, 8, 10, 13, 14])),
                )?
                .define(None, Field::new("digest").with_validator(HexDigits))?
                // seconds
                .define(
                    None,
                    Field::new("ttl").with_transformer(Integer).with_validator(Digits),
                )?
                .define(
                    Some("type"),
                    Field::new("digestType")
                        .with_transformer(Integer)
                        .with_validator(Choice::new([1, 2, 3, 4])),
                )?
                .define(
                    None,
                    Field::new("keyTag").with_transformer(Integer).with_validator(Digits),
                )?;
            Ok(())
        }
    }
);

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::value::Value;

    #[test]
    fn test_delegation_key() {
        let mut key = Payload::new(&DelegationKey).unwrap();
        key.set("algorithm", "RSASHA256")
            .unwrap()
            .set("digest", "0DC99D4B6549F83385214189CA48DC6B209ABB71")
            .unwrap()
            .set("ttl", 86400)
            .unwrap()
            .set("type", 1)
            .unwrap()
            .set("keyTag", "264")
            .unwrap();
        assert!(key.is_valid());
        assert_eq!(key.field("algorithm").unwrap().canonical(), Some("8"));
        assert_eq!(key.get("algorithm").unwrap(), "RSASHA256");
        assert_eq!(key.get("ttl").unwrap(), Value::Int(86400));

        assert!(key.set("algorithm", "MD5").is_err());
        assert!(key.set("digest", "xyz").is_err());
        assert!(key.set("ttl", -1).is_err());
    }

    #[test]
    fn test_delegation() {
        let xml = concat!(
            r#"<delegation xmlns="http://www.arin.net/regrws/core/v1">"#,
            "<name>0.0.8.in-addr.arpa.</name>",
            "<delegationKeys/>",
            "<nameservers><nameserver>NS1.EXAMPLE.COM</nameserver>",
            "<nameserver>NS2.EXAMPLE.COM</nameserver></nameservers>",
            "</delegation>"
        );
        let mut delegation = Payload::from_xml(xml).unwrap();
        assert_eq!(delegation.to_string(), "0.0.8.in-addr.arpa.");
        assert!(delegation.is_valid());
        assert_eq!(delegation.group("nameservers").unwrap().len(), 2);

        delegation.set("nameservers", Value::Null).unwrap();
        assert!(!delegation.is_valid());
        delegation.add("nameservers", "ns3.example.com").unwrap();
        assert_eq!(
            delegation.get("nameservers").unwrap(),
            Value::from(["ns3.example.com"])
        );
    }
}
