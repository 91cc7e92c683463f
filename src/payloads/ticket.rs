use super::{canonical, HandleTransformer, Net, SHARED_TICKET_NAMESPACE};
use crate::{
    elements::{Field, Group, Node, Payload},
    error::Result,
    transform::{Boolean, Datetime, Transformer},
    validate::ClassList,
    value::Value,
    xml::XmlElement,
};

const MSG_REFS: &str = "msgRefs";

payload_kind!(
    /// A registration ticket. Only closing a resolved ticket is a valid
    /// submission.
    Ticket => "ticket" {
        fn init(&self, payload: &mut Payload) -> Result<()> {
            let date = Datetime::default;
            payload
                .define(None, Group::new("messages").with_validator(ClassList::new(["Message"])))?
                .define(
                    Some("references"),
                    Group::new("messageReferences")
                        .with_validator(ClassList::new(["MessageReference"])),
                )?
                .define(None, Field::new("ticketNo").generated())?
                .define(
                    None,
                    Field::new_ns("ns4:shared", SHARED_TICKET_NAMESPACE).with_transformer(Boolean),
                )?
                .define(
                    Some("org"),
                    Field::new_ns("ns4:orgHandle", SHARED_TICKET_NAMESPACE)
                        .with_transformer(HandleTransformer),
                )?
                .define(Some("created"), Field::new("createdDate").generated().with_transformer(date()))?
                .define(Some("resolved"), Field::new("resolvedDate").generated().with_transformer(date()))?
                .define(Some("closed"), Field::new("closedDate").generated().with_transformer(date()))?
                .define(Some("updated"), Field::new("updatedDate").generated().with_transformer(date()))?
                .define(Some("type"), Field::new("webTicketType").generated())?
                .define(Some("status"), Field::new("webTicketStatus"))?
                .define(Some("resolution"), Field::new("webTicketResolution").generated())?;
            Ok(())
        }

        fn handle(&self, payload: &Payload) -> Option<String> {
            canonical(payload, "ticketNo")
        }

        fn label(&self, payload: &Payload) -> String {
            canonical(payload, "ticketNo").unwrap_or_default()
        }

        fn is_valid(&self, payload: &Payload) -> bool {
            payload.all_valid(&["ticketNo", "resolved", "type", "resolution"])
                && !payload.valid("closed")
                && canonical(payload, "status").as_deref() == Some("CLOSED")
        }

        fn xml_children(&self, payload: &Payload, element: &mut XmlElement) {
            payload.append_children_except(element, &["messages", "references"]);
        }
    }
);

impl Ticket {
    /// Whether message references are requested along with the ticket.
    /// Defaults to `true`.
    pub fn msg_refs(ticket: &Payload) -> bool {
        ticket.option(MSG_REFS) != Some("false")
    }

    pub fn set_msg_refs(ticket: &mut Payload, refs: impl Into<Value>) {
        let refs = Boolean.transform(refs.into()).as_str() == Some("true");
        ticket.set_option(MSG_REFS, refs.to_string());
    }
}

payload_kind!(
    /// Response to a net request that may either complete at once or be
    /// queued as a ticket. Only the part that carries a handle is reachable.
    TicketedRequest => "ticketedRequest" {
        fn init(&self, payload: &mut Payload) -> Result<()> {
            payload
                .define(Some("net"), Payload::new(&Net)?)?
                .define(Some("ticket"), Payload::new(&Ticket)?)?;
            Ok(())
        }

        fn read_only(&self) -> bool {
            true
        }

        fn exposes(&self, _alias: &str, node: &Node) -> bool {
            node.handle().is_some()
        }
    }
);
