use super::canonical;
use crate::{
    elements::{Field, Payload},
    error::Result,
    transform::uppercase,
    validate::Choice,
};

payload_kind!(
    /// Phone number of a contact.
    Phone => "phone" {
        fn init(&self, payload: &mut Payload) -> Result<()> {
            payload
                .define(Some("type"), Payload::new(&PhoneType)?)?
                .define(None, Field::new("number"))?
                .define(None, Field::new("extension"))?;
            Ok(())
        }

        fn is_valid(&self, payload: &Payload) -> bool {
            payload.all_valid(&["type", "number"])
        }

        fn describe(&self, payload: &Payload) -> String {
            canonical(payload, "number").unwrap_or_default()
        }

        fn label(&self, payload: &Payload) -> String {
            canonical(payload, "number").unwrap_or_default()
        }
    }
);

impl Phone {
    /// A phone of the given type code: `O`ffice, `F`ax or `M`obile.
    pub fn from_number(number: &str, code: &str) -> Result<Payload> {
        let mut phone = Payload::new(&Phone)?;
        phone.set("number", number)?;
        phone.payload_mut("type")?.set("code", code)?;
        Ok(phone)
    }
}

payload_kind!(
    PhoneType => "type" {
        fn init(&self, payload: &mut Payload) -> Result<()> {
            payload
                .define(None, Field::new("description"))?
                .define(
                    None,
                    Field::new("code")
                        .with_transformer(uppercase())
                        .with_validator(Choice::new(["O", "F", "M"])),
                )?;
            Ok(())
        }

        fn is_valid(&self, payload: &Payload) -> bool {
            payload.valid("code")
        }

        fn describe(&self, payload: &Payload) -> String {
            canonical(payload, "code").unwrap_or_default()
        }
    }
);

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_phone() {
        let mut phone = Phone::from_number("+1.703.227.9840", "m").unwrap();
        assert!(phone.is_valid());
        assert_eq!(phone.to_string(), "+1.703.227.9840");
        assert_eq!(phone.payload("type").unwrap().to_string(), "M");

        phone.set("extension", "101").unwrap();
        let mut root = crate::xml::XmlElement::new("phones");
        phone.xml_append(&mut root);
        assert_eq!(
            root.to_fragment().unwrap(),
            concat!(
                r#"<phones><phone xmlns="http://www.arin.net/regrws/core/v1">"#,
                "<type><code>M</code></type>",
                "<number>+1.703.227.9840</number>",
                "<extension>101</extension>",
                "</phone></phones>"
            )
        );

        assert!(Phone::from_number("+1.703.227.9840", "X").is_err());
    }

    #[test]
    fn test_parse_in_group() {
        let xml = concat!(
            r#"<poc xmlns="http://www.arin.net/regrws/core/v1"><phones>"#,
            "<phone><type><description>Office</description><code>O</code></type>",
            "<number>+1.703.227.9840</number></phone>",
            "</phones></poc>"
        );
        let poc = Payload::from_xml(xml).unwrap();
        let phones = poc.group("phone").unwrap();
        assert_eq!(phones.len(), 1);
        let phone = phones.get(0).and_then(|node| node.as_payload()).unwrap();
        assert_eq!(phone.class(), "Phone");
        assert!(phone.is_valid());
        assert_eq!(
            phone.payload("type").unwrap().get("description").unwrap(),
            "Office"
        );
    }
}
