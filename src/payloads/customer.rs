use super::{canonical, state_field, Country, HandleTransformer};
use crate::{
    elements::{Field, MultiLine, Payload},
    error::Result,
    transform::{Boolean, Datetime},
};

payload_kind!(
    /// An end user that reassigned address space is registered to.
    Customer => "customer" {
        fn init(&self, payload: &mut Payload) -> Result<()> {
            payload
                .define(Some("name"), Field::new("customerName"))?
                .define(Some("country"), Payload::new(&Country)?)?
                .define(None, Field::new("handle").generated())?
                .define(Some("address"), MultiLine::new("streetAddress"))?
                .define(None, Field::new("city"))?
                .define(Some("state"), state_field()?)?
                .define(Some("zip"), Field::new("postalCode"))?
                .define(None, MultiLine::new("comment"))?
                .define(
                    Some("org"),
                    Field::new("parentOrgHandle").with_transformer(HandleTransformer),
                )?
                .define(
                    Some("created"),
                    Field::new("registrationDate")
                        .generated()
                        .with_transformer(Datetime::default()),
                )?
                .define(
                    Some("private"),
                    Field::new("privateCustomer").with_transformer(Boolean),
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
                payload.all_valid(&["handle", "org", "created", "name", "address", "city", "country"])
            } else {
                !payload.valid("created")
                    && payload.all_valid(&["org", "name", "address", "city", "country"])
            }
        }
    }
);
