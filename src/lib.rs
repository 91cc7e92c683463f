#[macro_use]
mod macros;

pub mod elements;
pub mod error;
pub mod payloads;
pub mod registry;
pub mod transform;
pub mod validate;
pub mod value;
pub mod xml;

pub use elements::{Access, Field, Group, Key, MultiLine, Node, Payload, PayloadKind, QName};
pub use error::{ApiError, Error, Result};
pub use registry::Registry;
pub use value::{DomainValue, Network, Value};

/// Tracing target of every event this crate emits.
pub const REGRWS: &str = "regrws";
