use super::{canonical, state_field, Country};
use crate::{
    elements::{Field, Group, MultiLine, Payload},
    error::Result,
    transform::Datetime,
    validate::ClassList,
};

payload_kind!(
    /// An organization holding resources and the contacts linked to it.
    Org => "org" {
        fn init(&self, payload: &mut Payload) -> Result<()> {
            payload
                .define(Some("country"), Payload::new(&Country)?)?
                .define(Some("address"), MultiLine::new("streetAddress"))?
                .define(None, Field::new("city"))?
                .define(Some("state"), state_field()?)?
                .define(Some("zip"), Field::new("postalCode"))?
                .define(None, MultiLine::new("comment"))?
                .define(
                    Some("created"),
                    Field::new("registrationDate")
                        .generated()
                        .with_transformer(Datetime::default()),
                )?
                .define(None, Field::new("handle").generated())?
                .define(Some("name"), Field::new("orgName").read_only())?
                .define(None, Field::new("dbaName").read_only())?
                .define(None, Field::new("taxId"))?
                .define(None, Field::new("orgUrl"))?
                .define(
                    Some("poc"),
                    Group::new("pocLinks").with_validator(ClassList::new(["PocLinkRef"])),
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
            if payload.valid("handle") {
                payload.all_valid(&["handle", "created", "name", "address", "city", "country", "poc"])
            } else {
                !payload.valid("created")
                    && payload.all_valid(&["name", "address", "city", "country", "poc"])
            }
        }
    }
);
