use base64::{engine::general_purpose::STANDARD, Engine};

use super::{canonical, MESSAGES_NAMESPACE};
use crate::{
    elements::{Field, Group, MultiLine, Payload},
    error::Result,
    transform::{Callback, Datetime},
    validate::{self, Choice, ClassList},
    value::Value,
};

payload_kind!(
    /// A message on a ticket. Only outgoing messages without server
    /// assigned parts are valid for submission.
    Message => "message" {
        fn init(&self, payload: &mut Payload) -> Result<()> {
            payload
                .define(Some("id"), Field::new_ns("ns2:messageId", MESSAGES_NAMESPACE).generated())?
                .define(
                    Some("created"),
                    Field::new_ns("ns2:createdDate", MESSAGES_NAMESPACE)
                        .generated()
                        .with_transformer(Datetime::default()),
                )?
                .define(None, Field::new("subject"))?
                .define(None, MultiLine::new("text"))?
                .define(None, {
                    let mut category = Field::new("category")
                        .with_validator(Choice::new(["NONE", "JUSTIFICATION"]));
                    category.set_value("NONE")?;
                    category
                })?
                .define(
                    None,
                    Group::new("attachments").with_validator(ClassList::new(["Attachment"])),
                )?
                .define(
                    Some("references"),
                    Group::new("attachmentReferences")
                        .with_validator(ClassList::new(["AttachmentReference"])),
                )?;
            Ok(())
        }

        fn handle(&self, payload: &Payload) -> Option<String> {
            canonical(payload, "id")
        }

        fn is_valid(&self, payload: &Payload) -> bool {
            payload.none_valid(&["id", "references"])
                && (payload.valid("text") || payload.valid("attachments"))
        }

        fn describe(&self, payload: &Payload) -> String {
            payload
                .multi_line("text")
                .map(ToString::to_string)
                .unwrap_or_default()
        }

        fn label(&self, payload: &Payload) -> String {
            canonical(payload, "subject").unwrap_or_default()
        }
    }
);

payload_kind!(
    /// Reference to a message of a ticket, as listed in ticket responses.
    MessageReference => "messageReference" {
        fn init(&self, payload: &mut Payload) -> Result<()> {
            payload
                .define(
                    Some("references"),
                    Group::new("attachmentReferences")
                        .with_validator(ClassList::new(["AttachmentReference"])),
                )?
                .define(Some("id"), Field::new("messageId").generated())?;
            Ok(())
        }

        fn handle(&self, payload: &Payload) -> Option<String> {
            canonical(payload, "id")
        }
    }
);

/// Base64 on the wire; decoded on read when the content is text.
fn attachment_data() -> Callback {
    Callback::new(
        |value| value,
        |value| {
            let decoded = value
                .as_str()
                .and_then(|s| STANDARD.decode(s).ok())
                .and_then(|bytes| String::from_utf8(bytes).ok());
            match decoded {
                Some(text) => Value::Str(text),
                None => value,
            }
        },
    )
}

payload_kind!(
    /// A file attached to a message.
    Attachment => "attachment" {
        fn init(&self, payload: &mut Payload) -> Result<()> {
            payload
                .define(
                    None,
                    Field::new("data")
                        .with_transformer(attachment_data())
                        .with_validator(validate::Base64),
                )?
                .define(None, Field::new("filename"))?;
            Ok(())
        }

        fn label(&self, payload: &Payload) -> String {
            canonical(payload, "filename").unwrap_or_default()
        }
    }
);

impl Attachment {
    /// An attachment carrying the given file contents.
    pub fn from_bytes(filename: &str, data: &[u8]) -> Result<Payload> {
        let mut attachment = Payload::new(&Attachment)?;
        attachment
            .set("filename", filename)?
            .set("data", STANDARD.encode(data))?;
        Ok(attachment)
    }

    /// Decoded file contents.
    pub fn bytes(attachment: &Payload) -> Option<Vec<u8>> {
        STANDARD.decode(canonical(attachment, "data")?).ok()
    }
}

payload_kind!(
    /// Server side record of an attachment. Never submitted.
    AttachmentReference => "attachmentReference" {
        fn init(&self, payload: &mut Payload) -> Result<()> {
            payload
                .define(Some("filename"), Field::new("attachmentFilename").generated())?
                .define(Some("id"), Field::new("attachmentId").generated())?;
            Ok(())
        }

        fn handle(&self, payload: &Payload) -> Option<String> {
            canonical(payload, "id")
        }

        fn is_valid(&self, _payload: &Payload) -> bool {
            false
        }
    }
);

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_outgoing_message() {
        let mut message = Payload::new(&Message).unwrap();
        assert_eq!(message.get("category").unwrap(), "NONE");
        assert!(!message.is_valid());

        message
            .set("subject", "Justification")
            .unwrap()
            .set("text", "first line\nsecond line")
            .unwrap();
        assert!(message.is_valid());
        assert_eq!(message.to_string(), "first line\nsecond line");
        assert!(message.set("category", "OTHER").is_err());

        assert_eq!(
            message.xml_serialize().unwrap(),
            concat!(
                r#"<?xml version="1.0" encoding="UTF-8"?>"#,
                r#"<message xmlns="http://www.arin.net/regrws/core/v1">"#,
                "<subject>Justification</subject>",
                "<text>",
                r#"<line number="1">first line</line>"#,
                r#"<line number="2">second line</line>"#,
                "</text>",
                "<category>NONE</category>",
                "</message>"
            )
        );
    }

    #[test]
    fn test_attachments() {
        let attachment = Attachment::from_bytes("notes.txt", b"hello world").unwrap();
        assert!(attachment.is_valid());
        assert_eq!(attachment.field("data").unwrap().canonical(), Some("aGVsbG8gd29ybGQ="));
        assert_eq!(attachment.get("data").unwrap(), "hello world");
        assert_eq!(Attachment::bytes(&attachment).as_deref(), Some(&b"hello world"[..]));

        let mut message = Payload::new(&Message).unwrap();
        message.add("attachments", attachment).unwrap();
        assert!(message.is_valid());
        assert!(message.add("attachments", "notes.txt").is_err());

        let mut empty = Payload::new(&Attachment).unwrap();
        assert!(empty.set("data", "").is_err());
        assert!(empty.set("data", "not base64!").is_err());
    }

    #[test]
    fn test_incoming_message() {
        let xml = concat!(
            r#"<message xmlns="http://www.arin.net/regrws/core/v1" "#,
            r#"xmlns:ns2="http://www.arin.net/regrws/messages/v1">"#,
            "<ns2:messageId>4711</ns2:messageId>",
            "<ns2:createdDate>2012-06-19T15:48:16-04:00</ns2:createdDate>",
            "<subject>Re: request</subject>",
            "<text><line number=\"1\">Approved.</line></text>",
            "<category>NONE</category>",
            "<attachmentReferences><attachmentReference>",
            "<attachmentFilename>report.pdf</attachmentFilename>",
            "<attachmentId>8a8180b1</attachmentId>",
            "</attachmentReference></attachmentReferences>",
            "</message>"
        );
        let message = Payload::from_xml(xml).unwrap();
        assert_eq!(message.handle().as_deref(), Some("4711"));
        assert_eq!(message.to_string(), "Approved.");
        assert!(!message.is_valid());

        let reference = message.group("references").unwrap().get("8a8180b1").unwrap();
        assert_eq!(
            reference.as_payload().unwrap().get("filename").unwrap(),
            "report.pdf"
        );

        assert_eq!(
            message.xml_serialize().unwrap(),
            concat!(
                r#"<?xml version="1.0" encoding="UTF-8"?>"#,
                r#"<message xmlns="http://www.arin.net/regrws/core/v1"/>"#
            )
        );
    }

    #[test]
    fn test_prefixed_fields() {
        let mut message = Payload::new(&Message).unwrap();
        message.set("id", "1").unwrap();
        message.set("text", "x").unwrap();

        let mut root = crate::xml::XmlElement::new("ticket");
        message.append_children(&mut root);
        assert_eq!(
            root.to_fragment().unwrap(),
            concat!(
                "<ticket>",
                r#"<ns2:messageId xmlns:ns2="http://www.arin.net/regrws/messages/v1">1</ns2:messageId>"#,
                r#"<text><line number="1">x</line></text>"#,
                "<category>NONE</category>",
                "</ticket>"
            )
        );
    }
}
