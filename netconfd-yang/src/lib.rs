//
// Copyright (c) The netconfd Contributors
//
// SPDX-License-Identifier: MIT
//

pub mod data;
pub mod error;
pub mod schema;
pub mod xpath;

pub use error::Error;

// XML namespace of the NETCONF base protocol.
pub const NETCONF_BASE_NS: &str = "urn:ietf:params:xml:ns:netconf:base:1.0";

// XML namespace of the RFC 6243 default-indicator attribute.
pub const NETCONF_DEFAULT_NS: &str =
    "urn:ietf:params:xml:ns:netconf:default:1.0";
