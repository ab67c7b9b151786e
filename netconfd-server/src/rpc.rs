//
// Copyright (c) The netconfd Contributors
//
// SPDX-License-Identifier: MIT
//

use std::fmt::Write;

use netconfd_datastore::DatastoreType;
use netconfd_yang::NETCONF_BASE_NS;
use netconfd_yang::data::write_escaped;
use roxmltree::{Document, Node};

use crate::WithDefaults;
use crate::error::Error;

// A dissected `<get>` or `<get-config>` request.
pub(crate) enum Operation<'a, 'input> {
    Get {
        filter: Option<FilterSpec<'a, 'input>>,
        with_defaults: Option<WithDefaults>,
    },
    GetConfig {
        source: DatastoreType,
        filter: Option<FilterSpec<'a, 'input>>,
        with_defaults: Option<WithDefaults>,
    },
}

pub(crate) enum FilterSpec<'a, 'input> {
    // The `<filter>` element itself; its children are the filter forest.
    Subtree(Node<'a, 'input>),
    // The value of the `select` attribute, verbatim.
    XPath(String),
}

// ===== parsing =====

// The attributes of the inbound `<rpc>` element (message-id and anything
// else the client added), echoed on the reply per RFC 6241.
pub(crate) fn envelope_attributes(doc: &Document<'_>) -> Vec<(String, String)> {
    doc.root_element()
        .attributes()
        .filter(|attr| attr.namespace().is_none())
        .map(|attr| (attr.name().to_owned(), attr.value().to_owned()))
        .collect()
}

pub(crate) fn parse_rpc<'a, 'input>(
    doc: &'a Document<'input>,
) -> Result<Operation<'a, 'input>, Error> {
    let root = doc.root_element();
    if root.tag_name().name() != "rpc" {
        return Err(Error::Parse("expected an <rpc> element".to_owned()));
    }
    if let Some(ns) = root.tag_name().namespace()
        && ns != NETCONF_BASE_NS
    {
        return Err(Error::Parse(format!(
            "<rpc> in unexpected namespace '{}'",
            ns
        )));
    }

    let operation = root
        .children()
        .find(|node| node.is_element())
        .ok_or_else(|| Error::Parse("missing operation element".to_owned()))?;
    if let Some(ns) = operation.tag_name().namespace()
        && ns != NETCONF_BASE_NS
    {
        return Err(Error::Parse(format!(
            "operation in unexpected namespace '{}'",
            ns
        )));
    }

    match operation.tag_name().name() {
        "get" => Ok(Operation::Get {
            filter: parse_filter(operation)?,
            with_defaults: parse_with_defaults(operation)?,
        }),
        "get-config" => Ok(Operation::GetConfig {
            source: parse_source(operation)?,
            filter: parse_filter(operation)?,
            with_defaults: parse_with_defaults(operation)?,
        }),
        name => Err(Error::Parse(format!("unsupported operation '{}'", name))),
    }
}

fn parse_source(operation: Node<'_, '_>) -> Result<DatastoreType, Error> {
    let source = operation
        .children()
        .find(|node| node.is_element() && node.tag_name().name() == "source")
        .ok_or_else(|| Error::Parse("missing <source> element".to_owned()))?;
    let datastore = source
        .children()
        .find(|node| node.is_element())
        .ok_or_else(|| Error::Parse("empty <source> element".to_owned()))?;
    DatastoreType::from_name(datastore.tag_name().name()).ok_or_else(|| {
        Error::Parse(format!(
            "unknown datastore '{}'",
            datastore.tag_name().name()
        ))
    })
}

fn parse_filter<'a, 'input>(
    operation: Node<'a, 'input>,
) -> Result<Option<FilterSpec<'a, 'input>>, Error> {
    let Some(filter) = operation
        .children()
        .find(|node| node.is_element() && node.tag_name().name() == "filter")
    else {
        return Ok(None);
    };

    match filter.attribute("type") {
        None | Some("subtree") => Ok(Some(FilterSpec::Subtree(filter))),
        Some("xpath") => match filter.attribute("select") {
            Some(select) => Ok(Some(FilterSpec::XPath(select.to_owned()))),
            None => Err(Error::Parse(
                "XPath filter without the \"select\" attribute".to_owned(),
            )),
        },
        Some(other) => {
            Err(Error::Parse(format!("unknown filter type '{}'", other)))
        }
    }
}

fn parse_with_defaults(
    operation: Node<'_, '_>,
) -> Result<Option<WithDefaults>, Error> {
    let Some(leaf) = operation.children().find(|node| {
        node.is_element() && node.tag_name().name() == "with-defaults"
    }) else {
        return Ok(None);
    };

    let mode = leaf.text().unwrap_or("").trim();
    WithDefaults::from_name(mode).map(Some).ok_or_else(|| {
        Error::Parse(format!("invalid with-defaults mode '{}'", mode))
    })
}

// ===== reply building =====

pub(crate) fn reply_data(
    attributes: &[(String, String)],
    data_xml: &str,
) -> String {
    let mut out = String::new();
    write_reply_open(&mut out, attributes);
    if data_xml.is_empty() {
        out.push_str("<data/>");
    } else {
        out.push_str("<data>");
        out.push_str(data_xml);
        out.push_str("</data>");
    }
    out.push_str("</rpc-reply>");
    out
}

pub(crate) fn reply_error(
    attributes: &[(String, String)],
    message: &str,
) -> String {
    let mut out = String::new();
    write_reply_open(&mut out, attributes);
    out.push_str("<rpc-error>");
    out.push_str("<error-type>application</error-type>");
    out.push_str("<error-tag>operation-failed</error-tag>");
    out.push_str("<error-severity>error</error-severity>");
    out.push_str("<error-message xml:lang=\"en\">");
    let _ = write_escaped(&mut out, message);
    out.push_str("</error-message>");
    out.push_str("</rpc-error>");
    out.push_str("</rpc-reply>");
    out
}

// ===== helper functions =====

fn write_reply_open(out: &mut String, attributes: &[(String, String)]) {
    let _ = write!(out, "<rpc-reply xmlns=\"{}\"", NETCONF_BASE_NS);
    for (name, value) in attributes {
        let _ = write!(out, " {}=\"", name);
        let _ = write_escaped(out, value);
        out.push('"');
    }
    out.push('>');
}
