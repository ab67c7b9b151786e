//
// Copyright (c) The netconfd Contributors
//
// SPDX-License-Identifier: MIT
//

#[cfg(feature = "testing")]
pub mod mem;

use derive_new::new;
use enum_as_inner::EnumAsInner;

// A NETCONF datastore.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum DatastoreType {
    Running,
    Startup,
    Candidate,
}

// A scalar yielded by the datastore iterator: the typed value together
// with its data path and default flag.
#[derive(Clone, Debug, Eq, PartialEq, new)]
pub struct DatastoreItem {
    pub xpath: String,
    pub value: DatastoreValue,
    pub default: bool,
}

// Typed representation of one datastore scalar.
//
// Containers, lists and leaves of type empty carry no payload; their
// existence is the information.
#[derive(Clone, Debug, EnumAsInner, Eq, PartialEq)]
pub enum DatastoreValue {
    Container,
    List,
    LeafEmpty,
    Bool(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Uint8(u8),
    Uint16(u16),
    Uint32(u32),
    Uint64(u64),
    // Raw integer mantissa scaled by 10^-fraction_digits.
    Decimal64 { value: i64, fraction_digits: u8 },
    String(String),
    // Base64 text.
    Binary(String),
    // Set bit names, in no particular order.
    Bits(Vec<String>),
    Enumeration(String),
    // The module is present only when the identity is defined outside the
    // leaf's own module.
    IdentityRef {
        module: Option<String>,
        identity: String,
    },
    InstanceId(String),
}

// Datastore backend errors. `NotFound` and `UnknownModel` mean the
// requested path holds no data and are not failures of the read path.
#[derive(Debug)]
pub enum DatastoreError {
    NotFound,
    UnknownModel,
    Backend(String),
}

// Iterator over the scalars under one subtree, in pre-order.
pub type ItemIter<'a> =
    Box<dyn Iterator<Item = Result<DatastoreItem, DatastoreError>> + 'a>;

// Per-session handle into the datastore backend. A handle is owned by one
// session and never shared across threads; the session's RPC lock
// serializes access to it.
pub trait DatastoreSession: Send {
    // Binds the handle to the given datastore. With `config_only`, state
    // data is excluded from subsequent reads.
    fn switch(
        &mut self,
        ds: DatastoreType,
        config_only: bool,
    ) -> Result<(), DatastoreError>;

    // Re-synchronizes the handle with the backing store. For the candidate
    // datastore this re-bases the candidate on the running configuration.
    fn refresh(&mut self) -> Result<(), DatastoreError>;

    // Returns an iterator over every scalar matching the given XPath.
    fn get_items(&mut self, xpath: &str) -> Result<ItemIter<'_>, DatastoreError>;
}

// ===== impl DatastoreType =====

impl DatastoreType {
    pub fn from_name(name: &str) -> Option<DatastoreType> {
        match name {
            "running" => Some(DatastoreType::Running),
            "startup" => Some(DatastoreType::Startup),
            "candidate" => Some(DatastoreType::Candidate),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DatastoreType::Running => "running",
            DatastoreType::Startup => "startup",
            DatastoreType::Candidate => "candidate",
        }
    }
}

impl std::fmt::Display for DatastoreType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ===== impl DatastoreError =====

impl DatastoreError {
    // Whether the error merely signals the absence of data.
    pub fn is_benign(&self) -> bool {
        matches!(
            self,
            DatastoreError::NotFound | DatastoreError::UnknownModel
        )
    }
}

impl std::fmt::Display for DatastoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatastoreError::NotFound => write!(f, "no data at the given path"),
            DatastoreError::UnknownModel => {
                write!(f, "path references an unknown model")
            }
            DatastoreError::Backend(error) => {
                write!(f, "datastore backend failure: {}", error)
            }
        }
    }
}

impl std::error::Error for DatastoreError {}
