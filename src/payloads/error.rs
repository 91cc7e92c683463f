use super::canonical;
use crate::{
    elements::{Field, Group, Payload},
    error::{ApiError, Result},
    transform::ElementTransformer,
    validate::ClassList,
};

payload_kind!(
    /// A field level detail of an error response.
    Component => "component" {
        fn init(&self, payload: &mut Payload) -> Result<()> {
            payload
                .define(None, Field::new("name").generated())?
                .define(None, Field::new("message").generated())?;
            Ok(())
        }

        fn is_valid(&self, _payload: &Payload) -> bool {
            false
        }
    }
);

payload_kind!(
    /// Error response of the registry. Read-only by nature, so never valid
    /// for submission.
    ErrorResponse => "error" {
        fn init(&self, payload: &mut Payload) -> Result<()> {
            payload
                .define(None, Field::new("message"))?
                .define(None, Field::new("code"))?
                .define(
                    None,
                    Group::new("components").with_validator(ClassList::new(["Component"])),
                )?
                // plain message fields, not message payloads
                .define(
                    Some("info"),
                    Group::new("additionalInfo")
                        .with_transformer(ElementTransformer::new(Field::new("message")))
                        .with_validator(ClassList::new(["Field"])),
                )?;
            Ok(())
        }

        fn is_valid(&self, _payload: &Payload) -> bool {
            false
        }

        fn describe(&self, payload: &Payload) -> String {
            format!(
                "{}: {}",
                canonical(payload, "code").unwrap_or_default(),
                canonical(payload, "message").unwrap_or_default()
            )
        }
    }
);

impl ErrorResponse {
    /// The error code of the response.
    pub fn api_error(response: &Payload) -> Option<ApiError> {
        ApiError::from_name(&canonical(response, "code")?)
    }
}
