use tracing::debug;

use super::{canonical, state_field, Country};
use crate::{
    elements::{Field, Group, MultiLine, Payload},
    error::Result,
    registry::Registry,
    transform::{uppercase, Boolean, Datetime, ElementTransformer, Transformer},
    validate::{Choice, ClassList, Email},
    value::Value,
    xml::XmlElement,
    REGRWS,
};

const MAKE_LINK: &str = "makeLink";

payload_kind!(
    /// A point of contact, either a person or a role account.
    Poc => "poc" {
        fn init(&self, payload: &mut Payload) -> Result<()> {
            let email = Field::new("email").with_validator(Email);
            payload
                .define(Some("state"), state_field()?)?
                .define(Some("country"), Payload::new(&Country)?)?
                .define(
                    Some("email"),
                    Group::new("emails").with_transformer(ElementTransformer::new(email)),
                )?
                .define(Some("address"), MultiLine::new("streetAddress"))?
                .define(None, Field::new("city"))?
                .define(Some("zip"), Field::new("postalCode"))?
                .define(None, MultiLine::new("comment"))?
                .define(
                    Some("created"),
                    Field::new("registrationDate")
                        .generated()
                        .with_transformer(Datetime::default()),
                )?
                .define(None, Field::new("handle").generated())?
                .define(
                    Some("type"),
                    Field::new("contactType")
                        .read_only()
                        .with_transformer(uppercase())
                        .with_validator(Choice::new(["PERSON", "ROLE"])),
                )?
                .define(Some("company"), Field::new("companyName"))?
                .define(None, Field::new("firstName").read_only())?
                .define(None, Field::new("middleName").read_only())?
                .define(None, Field::new("lastName").read_only())?
                .define(
                    Some("phone"),
                    Group::new("phones").with_validator(ClassList::new(["Phone"])),
                )?;
            Ok(())
        }

        fn is_primary(&self) -> bool {
            true
        }

        fn handle(&self, payload: &Payload) -> Option<String> {
            canonical(payload, "handle")
        }

        fn is_valid(&self, payload: &Payload) -> bool {
            let required = ["type", "country", "address", "city", "email", "phone", "lastName"];
            if payload.valid("handle") {
                payload.all_valid(&["handle", "created"])
                    && payload.all_valid(&required)
                    && (payload.valid("firstName") || payload.valid("company"))
            } else {
                !payload.valid("created") && payload.all_valid(&required) && valid_type(payload)
            }
        }
    }
);

/// A person needs a first name, a role a company name and no first name.
fn valid_type(payload: &Payload) -> bool {
    match canonical(payload, "type").as_deref() {
        Some("PERSON") => payload.valid("firstName"),
        Some("ROLE") => !payload.valid("firstName") && payload.valid("company"),
        _ => false,
    }
}

impl Poc {
    /// Whether a newly created contact is linked to the creating account.
    /// Defaults to `true`.
    pub fn make_link(poc: &Payload) -> bool {
        poc.option(MAKE_LINK) != Some("false")
    }

    /// Sets the link flag from any boolean-like input; anything unrecognized
    /// turns it off.
    pub fn set_make_link(poc: &mut Payload, link: impl Into<Value>) {
        let link = Boolean.transform(link.into()).as_str() == Some("true");
        poc.set_option(MAKE_LINK, link.to_string());
    }
}

payload_kind!(
    /// Link from an org or net to a contact, serialized as attributes.
    PocLinkRef => "pocLinkRef" {
        fn init(&self, payload: &mut Payload) -> Result<()> {
            payload
                .define(None, Field::new("description"))?
                .define(None, Field::new("handle"))?
                .define(
                    None,
                    Field::new("function")
                        .with_transformer(uppercase())
                        .with_validator(Choice::new(["AD", "AB", "N", "T"])),
                )?;
            Ok(())
        }

        fn handle(&self, payload: &Payload) -> Option<String> {
            canonical(payload, "handle")
        }

        fn is_valid(&self, payload: &Payload) -> bool {
            payload.all_valid(&["function", "handle"])
        }

        fn xml_children(&self, payload: &Payload, element: &mut XmlElement) {
            for (_, node) in payload.iter().filter(|(_, node)| node.is_valid()) {
                if let Some(value) = node.as_field().and_then(Field::canonical) {
                    element.attributes.push((node.name().to_string(), value.to_string()));
                }
            }
        }

        fn xml_parse(&self, payload: &mut Payload, node: &XmlElement, _registry: &Registry) -> Result<()> {
            for (key, value) in &node.attributes {
                if payload.has(key) {
                    payload.set(key, value.as_str())?;
                } else {
                    debug!(target: REGRWS, payload = "PocLinkRef", attribute = %key, "skipping unknown attribute");
                }
            }
            Ok(())
        }
    }
);

impl PocLinkRef {
    pub fn link(handle: &str, function: &str) -> Result<Payload> {
        let mut link = Payload::new(&PocLinkRef)?;
        link.set("handle", handle)?.set("function", function)?;
        Ok(link)
    }
}
