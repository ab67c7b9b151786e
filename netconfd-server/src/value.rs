//
// Copyright (c) The netconfd Contributors
//
// SPDX-License-Identifier: MIT
//

use std::fmt::Write;

use netconfd_datastore::{DatastoreItem, DatastoreValue};
use netconfd_yang::data::{DataTree, NodeId};
use netconfd_yang::schema::{BaseType, SchemaContext, SchemaNodeKind};
use netconfd_yang::xpath::Path;

// The leaf's base type cannot be carried across the codec (leafref,
// union, anyxml). Callers treat the value as absent.
#[derive(Debug, Eq, PartialEq)]
pub struct InvalidType;

impl std::fmt::Display for InvalidType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "value type cannot be represented")
    }
}

impl std::error::Error for InvalidType {}

// Canonical string form of a datastore scalar, for insertion into a data
// tree. Returns None when the node carries no value (containers, lists,
// leaves of type empty) or when the value cannot be interpreted against
// the schema. Formatted representations borrow the caller's scratch
// buffer; everything else borrows the value itself.
pub fn datastore_to_tree<'a>(
    ctx: &SchemaContext,
    item: &'a DatastoreItem,
    buf: &'a mut String,
) -> Option<&'a str> {
    match &item.value {
        DatastoreValue::Container
        | DatastoreValue::List
        | DatastoreValue::LeafEmpty => None,
        DatastoreValue::Bool(value) => {
            Some(if *value { "true" } else { "false" })
        }
        DatastoreValue::String(value)
        | DatastoreValue::Binary(value)
        | DatastoreValue::Enumeration(value)
        | DatastoreValue::InstanceId(value) => Some(value.as_str()),
        DatastoreValue::Int8(value) => format_int(buf, *value),
        DatastoreValue::Int16(value) => format_int(buf, *value),
        DatastoreValue::Int32(value) => format_int(buf, *value),
        DatastoreValue::Int64(value) => format_int(buf, *value),
        DatastoreValue::Uint8(value) => format_int(buf, *value),
        DatastoreValue::Uint16(value) => format_int(buf, *value),
        DatastoreValue::Uint32(value) => format_int(buf, *value),
        DatastoreValue::Uint64(value) => format_int(buf, *value),
        DatastoreValue::Decimal64 { value, .. } => {
            // The canonical form uses the schema's declared
            // fraction-digits, not whatever the backend stored.
            let digits = match leaf_base(ctx, &item.xpath)? {
                BaseType::Decimal64(digits) => *digits,
                _ => return None,
            };
            format_decimal64(buf, *value, digits);
            Some(buf.as_str())
        }
        DatastoreValue::Bits(names) => {
            // Space-separated bit names in schema declaration order.
            match leaf_base(ctx, &item.xpath) {
                Some(BaseType::Bits(order)) => {
                    let mut first = true;
                    for bit in order
                        .iter()
                        .filter(|bit| names.iter().any(|name| name == *bit))
                    {
                        if !first {
                            buf.push(' ');
                        }
                        buf.push_str(bit);
                        first = false;
                    }
                }
                _ => *buf = names.join(" "),
            }
            Some(buf.as_str())
        }
        DatastoreValue::IdentityRef { module, identity } => match module {
            // The module is set only for identities foreign to the leaf's
            // module, which the canonical form qualifies.
            Some(module) => {
                let _ = write!(buf, "{}:{}", module, identity);
                Some(buf.as_str())
            }
            None => Some(identity.as_str()),
        },
    }
}

// Typed datastore value of a data tree node, the inverse of
// `datastore_to_tree`. The returned item owns its payload.
pub fn tree_to_datastore(
    ctx: &SchemaContext,
    tree: &DataTree,
    node: NodeId,
    xpath: &str,
) -> Result<DatastoreItem, InvalidType> {
    let snode = ctx.node(tree.snode(node));
    let text = tree.value(node).unwrap_or("");

    let value = match &snode.kind {
        SchemaNodeKind::Container { .. } => DatastoreValue::Container,
        SchemaNodeKind::List { .. } => DatastoreValue::List,
        SchemaNodeKind::Leaf(leaf) | SchemaNodeKind::LeafList(leaf) => {
            match &leaf.base {
                BaseType::Binary => DatastoreValue::Binary(text.to_owned()),
                BaseType::Bits(..) => DatastoreValue::Bits(
                    text.split_whitespace().map(str::to_owned).collect(),
                ),
                BaseType::Bool => DatastoreValue::Bool(text == "true"),
                BaseType::Decimal64(digits) => {
                    let value = parse_decimal64(text, *digits)
                        .ok_or(InvalidType)?;
                    DatastoreValue::Decimal64 {
                        value,
                        fraction_digits: *digits,
                    }
                }
                BaseType::Empty => DatastoreValue::LeafEmpty,
                BaseType::Enumeration => {
                    DatastoreValue::Enumeration(text.to_owned())
                }
                BaseType::IdentityRef => {
                    let own_module = &ctx.module(snode.module).name;
                    match text.split_once(':') {
                        Some((module, identity)) if module != own_module => {
                            DatastoreValue::IdentityRef {
                                module: Some(module.to_owned()),
                                identity: identity.to_owned(),
                            }
                        }
                        Some((_, identity)) => DatastoreValue::IdentityRef {
                            module: None,
                            identity: identity.to_owned(),
                        },
                        None => DatastoreValue::IdentityRef {
                            module: None,
                            identity: text.to_owned(),
                        },
                    }
                }
                BaseType::InstanceId => {
                    DatastoreValue::InstanceId(text.to_owned())
                }
                BaseType::Int8 => {
                    DatastoreValue::Int8(text.parse().map_err(|_| InvalidType)?)
                }
                BaseType::Int16 => DatastoreValue::Int16(
                    text.parse().map_err(|_| InvalidType)?,
                ),
                BaseType::Int32 => DatastoreValue::Int32(
                    text.parse().map_err(|_| InvalidType)?,
                ),
                BaseType::Int64 => DatastoreValue::Int64(
                    text.parse().map_err(|_| InvalidType)?,
                ),
                BaseType::Uint8 => DatastoreValue::Uint8(
                    text.parse().map_err(|_| InvalidType)?,
                ),
                BaseType::Uint16 => DatastoreValue::Uint16(
                    text.parse().map_err(|_| InvalidType)?,
                ),
                BaseType::Uint32 => DatastoreValue::Uint32(
                    text.parse().map_err(|_| InvalidType)?,
                ),
                BaseType::Uint64 => DatastoreValue::Uint64(
                    text.parse().map_err(|_| InvalidType)?,
                ),
                BaseType::String => DatastoreValue::String(text.to_owned()),
                // Leafrefs and unions resolve to other types in the
                // backend; they cannot be produced from here.
                BaseType::LeafRef | BaseType::Union => {
                    return Err(InvalidType);
                }
            }
        }
        SchemaNodeKind::AnyXml
        | SchemaNodeKind::Rpc
        | SchemaNodeKind::Notification => return Err(InvalidType),
    };

    Ok(DatastoreItem::new(
        xpath.to_owned(),
        value,
        tree.is_default(node),
    ))
}

// ===== helper functions =====

fn leaf_base<'a>(ctx: &'a SchemaContext, xpath: &str) -> Option<&'a BaseType> {
    let path = Path::parse(xpath).ok()?;
    let snode = ctx.node_at(&path).ok()?;
    ctx.leaf_schema(snode).map(|leaf| &leaf.base)
}

fn format_int<'a>(buf: &'a mut String, value: impl std::fmt::Display) -> Option<&'a str> {
    let _ = write!(buf, "{}", value);
    Some(buf.as_str())
}

// Formats a decimal64 mantissa without going through floating point,
// keeping the full declared fraction width (up to 18 digits).
fn format_decimal64(buf: &mut String, mantissa: i64, digits: u8) {
    let scale = 10i128.pow(digits as u32) as u128;
    let abs = (mantissa as i128).unsigned_abs();
    let _ = write!(
        buf,
        "{}{}.{:0width$}",
        if mantissa < 0 { "-" } else { "" },
        abs / scale,
        abs % scale,
        width = digits as usize
    );
}

fn parse_decimal64(text: &str, digits: u8) -> Option<i64> {
    let (negative, rest) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let (int_part, frac_part) = match rest.split_once('.') {
        Some((int_part, frac_part)) => (int_part, frac_part),
        None => (rest, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    if frac_part.len() > digits as usize {
        return None;
    }

    let int: i128 = match int_part {
        "" => 0,
        _ => int_part.parse().ok()?,
    };
    let frac: i128 = match frac_part {
        "" => 0,
        _ => frac_part.parse().ok()?,
    };
    let frac = frac * 10i128.pow((digits as usize - frac_part.len()) as u32);

    let mantissa = int * 10i128.pow(digits as u32) + frac;
    let mantissa = if negative { -mantissa } else { mantissa };
    i64::try_from(mantissa).ok()
}
