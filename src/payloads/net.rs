use super::{canonical, HandleTransformer};
use crate::{
    elements::{Field, Group, MultiLine, Payload, PayloadKind},
    error::Result,
    transform::{Callback, Datetime, ElementTransformer, Integer, Ip},
    validate::{self, Choice, ClassList, IpFlags, NamedElement, Range},
    value::{Network, Value},
};

const BLOCK_TYPES: [&str; 19] = [
    "A", "AF", "AP", "AR", "AV", "DA", "DS", "FX", "IR", "IU", "LN", "LX", "PV", "PX", "RD", "RN",
    "RV", "RX", "S",
];

/// Wraps network values into `S` typed net blocks.
fn net_block_transformer() -> Callback {
    Callback::new(
        |value| {
            let network = match &value {
                Value::Object(obj) => obj.network(),
                _ => None,
            };
            let Some((addr, prefix)) = network else {
                return value;
            };
            let block = NetBlock::from_network(Network::new(addr, prefix))
                .and_then(|mut block| {
                    block.set("type", "S")?;
                    Ok(block)
                });
            match block {
                Ok(block) => block.into(),
                Err(_) => value,
            }
        },
        |value| value,
    )
}

payload_kind!(
    /// An IPv4 or IPv6 network registration.
    Net => "net" {
        fn init(&self, payload: &mut Payload) -> Result<()> {
            payload
                .define(
                    None,
                    Field::new("version")
                        .read_only()
                        .with_transformer(Integer)
                        .with_validator(Choice::new([4, 6])),
                )?
                .define(None, MultiLine::new("comment"))?
                .define(
                    Some("created"),
                    Field::new("registrationDate")
                        .generated()
                        .with_transformer(Datetime::default()),
                )?
                .define(
                    Some("org"),
                    Field::new("orgHandle")
                        .read_only()
                        .with_transformer(HandleTransformer),
                )?
                .define(None, Field::new("handle").generated())?
                .define(
                    Some("net"),
                    Group::new("netBlocks")
                        .with_transformer(net_block_transformer())
                        .with_validator(ClassList::new(["NetBlock"])),
                )?
                .define(
                    Some("customer"),
                    Field::new("customerHandle")
                        .read_only()
                        .with_transformer(HandleTransformer),
                )?
                .define(
                    Some("parentNet"),
                    Field::new("parentNetHandle")
                        .read_only()
                        .with_transformer(HandleTransformer),
                )?
                .define(Some("name"), Field::new("netName"))?
                .define(
                    Some("asn"),
                    Group::new("originASes")
                        .with_transformer(ElementTransformer::new(Field::new("originAS")))
                        .with_validator(NamedElement::new("originAS")),
                )?
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

        // exactly one of customer and org
        fn is_valid(&self, payload: &Payload) -> bool {
            let owner = payload.valid("customer") != payload.valid("org");
            if payload.valid("handle") {
                owner
                    && payload.all_valid(&["version", "created", "handle", "net", "parentNet", "name"])
            } else {
                owner
                    && !payload.valid("created")
                    && payload.all_valid(&["net", "name", "parentNet"])
            }
        }
    }
);

payload_kind!(
    /// An address range of a net, given as start plus prefix length or
    /// start and end address.
    NetBlock => "netBlock" {
        fn init(&self, payload: &mut Payload) -> Result<()> {
            let public = || validate::Ip::new(IpFlags::ALL_ONLY_PUBLIC);
            payload
                .define(
                    None,
                    Field::new("type").read_only().with_validator(Choice::new(BLOCK_TYPES)),
                )?
                .define(None, Field::new("description").read_only())?
                .define(
                    Some("start"),
                    Field::new("startAddress")
                        .read_only()
                        .with_transformer(Ip)
                        .with_validator(public()),
                )?
                .define(
                    Some("end"),
                    Field::new("endAddress")
                        .read_only()
                        .with_transformer(Ip)
                        .with_validator(public()),
                )?
                .define(
                    Some("length"),
                    Field::new("cidrLength")
                        .read_only()
                        .with_transformer(Integer)
                        .with_validator(Range::new(0, 128)),
                )?;
            Ok(())
        }

        fn is_valid(&self, payload: &Payload) -> bool {
            payload.all_valid(&["type", "start"])
                && (payload.valid("end") || payload.valid("length"))
        }

        fn describe(&self, payload: &Payload) -> String {
            if !payload.is_valid() {
                return String::new();
            }
            let read = |alias| payload.get(alias).map(|value| value.to_string()).unwrap_or_default();
            match canonical(payload, "length") {
                Some(length) => format!("{}/{length}", read("start")),
                None => format!("{} - {}", read("start"), read("end")),
            }
        }

        fn label(&self, payload: &Payload) -> String {
            self.describe(payload)
        }
    }
);

impl NetBlock {
    /// A block covering the given network. The block type is left unset.
    pub fn from_network(network: Network) -> Result<Payload> {
        let mut block = Payload::new(&NetBlock)?;
        block
            .set("start", network.addr().to_string())?
            .set("length", i64::from(network.prefix()))?;
        Ok(block)
    }
}
