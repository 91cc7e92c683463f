use tracing::debug;

use crate::{
    elements::{Group, Payload},
    error::Result,
    registry::Registry,
    validate::IsPayload,
    value::Value,
    xml::XmlElement,
    REGRWS,
};

payload_kind!(
    /// A list of payloads of any registered type, as returned by searches.
    /// The items sit directly under the root without a wrapper element.
    Collection => "collection" {
        fn init(&self, payload: &mut Payload) -> Result<()> {
            payload.define(Some("items"), Group::new("collection").with_validator(IsPayload))?;
            Ok(())
        }

        fn is_valid(&self, payload: &Payload) -> bool {
            payload.valid("items")
        }

        fn value(&self, payload: &Payload) -> Value {
            payload.get("items").unwrap_or_default()
        }

        fn xml_children(&self, payload: &Payload, element: &mut XmlElement) {
            if let Ok(items) = payload.group("items") {
                for item in items.iter().filter(|item| item.is_valid()) {
                    item.xml_append(element);
                }
            }
        }

        fn xml_parse(&self, payload: &mut Payload, node: &XmlElement, registry: &Registry) -> Result<()> {
            for child in &node.children {
                match registry.instantiate(&child.name)? {
                    Some(mut item) => {
                        item.xml_parse(child, registry)?;
                        payload.group_mut("items")?.add_value(item)?;
                    }
                    None => {
                        debug!(target: REGRWS, tag = %child.name, "skipping unknown collection item")
                    }
                }
            }
            Ok(())
        }
    }
);

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::payloads::{Customer, Delegation};

    const SEARCH: &str = concat!(
        r#"<collection xmlns="http://www.arin.net/regrws/core/v1">"#,
        "<delegation><name>0.0.8.in-addr.arpa.</name>",
        "<nameservers><nameserver>NS1.EXAMPLE.COM</nameserver></nameservers></delegation>",
        "<unknownThing>ignored</unknownThing>",
        "<customer><customerName>Jane Roe</customerName><handle>C00000001</handle></customer>",
        "</collection>"
    );

    #[test]
    fn test_parse() {
        let collection = Payload::from_xml(SEARCH).unwrap();
        assert_eq!(collection.class(), "Collection");

        let items = collection.group("items").unwrap();
        assert_eq!(items.len(), 2);
        let customer = items.get("C00000001").and_then(|node| node.as_payload()).unwrap();
        assert!(customer.is_a("Customer"));
        assert_eq!(customer.get("name").unwrap(), "Jane Roe");
        assert_eq!(
            items.get(0).and_then(|node| node.as_payload()).map(Payload::class),
            Some("Delegation")
        );
    }

    #[test]
    fn test_serialize_skips_invalid_items() {
        let collection = Payload::from_xml(SEARCH).unwrap();
        assert!(collection.is_valid());
        assert_eq!(
            collection.xml_serialize().unwrap(),
            concat!(
                r#"<?xml version="1.0" encoding="UTF-8"?>"#,
                r#"<collection xmlns="http://www.arin.net/regrws/core/v1">"#,
                "<delegation><name>0.0.8.in-addr.arpa.</name>",
                "<nameservers><nameserver>NS1.EXAMPLE.COM</nameserver></nameservers></delegation>",
                "</collection>"
            )
        );
    }

    #[test]
    fn test_build() {
        let mut collection = Payload::new(&Collection).unwrap();
        assert!(!collection.is_valid());
        assert_eq!(collection.value(), Value::List(Vec::new()));

        collection.add("items", Payload::new(&Customer).unwrap()).unwrap();
        collection.add("items", Payload::new(&Delegation).unwrap()).unwrap();
        assert_eq!(collection.group("items").unwrap().len(), 2);
        assert!(collection.add("items", "C00000001").is_err());
    }
}
