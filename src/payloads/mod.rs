//! The registration payload types.

mod collection;
mod country;
mod customer;
mod delegation;
mod error;
mod message;
mod net;
mod org;
mod phone;
mod poc;
mod roa;
mod ticket;

pub use collection::Collection;
pub use country::Country;
pub use customer::Customer;
pub use delegation::{Delegation, DelegationKey};
pub use error::{Component, ErrorResponse};
pub use message::{Attachment, AttachmentReference, Message, MessageReference};
pub use net::{Net, NetBlock};
pub use org::Org;
pub use phone::{Phone, PhoneType};
pub use poc::{Poc, PocLinkRef};
pub use roa::{Roa, RoaData, RoaPrefix};
pub use ticket::{Ticket, TicketedRequest};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    elements::{Field, Payload, PayloadKind},
    error::Result,
    registry::Registry,
    transform::{uppercase, Transformer},
    validate::RegExp,
    value::Value,
};

pub const MESSAGES_NAMESPACE: &str = "http://www.arin.net/regrws/messages/v1";
pub const SHARED_TICKET_NAMESPACE: &str = "http://www.arin.net/regrws/shared-ticket/v1";
pub const RPKI_NAMESPACE: &str = "http://www.arin.net/regrws/rpki/v1";

/// Payload types that appear under their own tag, as documents or inside
/// groups. Types that only occur under an alias of their parent are left
/// out.
pub(crate) fn registry() -> Registry {
    Registry::new()
        .with(&Attachment)
        .with(&AttachmentReference)
        .with(&Collection)
        .with(&Component)
        .with(&Customer)
        .with(&Delegation)
        .with(&DelegationKey)
        .with(&ErrorResponse)
        .with(&Message)
        .with(&MessageReference)
        .with(&Net)
        .with(&NetBlock)
        .with(&Org)
        .with(&Phone)
        .with(&Poc)
        .with(&PocLinkRef)
        .with(&Roa)
        .with(&Ticket)
        .with(&TicketedRequest)
}

/// Stored value of a leaf, if set.
fn canonical(payload: &Payload, alias: &str) -> Option<String> {
    payload
        .field(alias)
        .ok()
        .and_then(|field| field.canonical())
        .map(str::to_string)
}

/// State or province code shared by the address bearing payloads.
fn state_field() -> Result<Field> {
    Ok(Field::new("iso3166-2")
        .with_transformer(uppercase())
        .with_validator(RegExp::new("^[A-Z0-9]{1,3}$")?))
}

static NET_HANDLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^NET-(\d{1,3}-){4}\d$").unwrap());
static NET6_HANDLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^NET6-([0-9A-F]{1,4}-){1,8}\d$").unwrap());
static CUSTOMER_HANDLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^C\d+$").unwrap());
static POC_HANDLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z]+\d*-ARIN$").unwrap());
static ORG_HANDLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z0-9]+(-\d+)?$").unwrap());

/// Reference to a primary payload by handle.
///
/// Accepts handles and anything that carries one. On read, a handle of a
/// known shape becomes a blank payload of the matching type holding just
/// that handle.
#[derive(Debug, Clone, Copy, Default)]
pub struct HandleTransformer;

impl HandleTransformer {
    fn resolve(handle: &str) -> Option<Payload> {
        let kind: &'static dyn PayloadKind =
            if NET_HANDLE.is_match(handle) || NET6_HANDLE.is_match(handle) {
                &Net
            } else if CUSTOMER_HANDLE.is_match(handle) {
                &Customer
            } else if POC_HANDLE.is_match(handle) {
                &Poc
            } else if ORG_HANDLE.is_match(handle) {
                &Org
            } else {
                return None;
            };
        let mut payload = Payload::new(kind).ok()?;
        payload.set("handle", handle).ok()?;
        Some(payload)
    }
}

impl Transformer for HandleTransformer {
    fn transform(&self, value: Value) -> Value {
        let value = match value.handle().or_else(|| value.text()) {
            Some(handle) => Value::Str(handle),
            None => value,
        };
        match value {
            Value::Str(s) => Value::Str(s.to_uppercase()),
            other => other,
        }
    }

    fn reverse_transform(&self, value: Value) -> Value {
        match value.as_str().and_then(Self::resolve) {
            Some(payload) => payload.into(),
            None => value,
        }
    }
}
