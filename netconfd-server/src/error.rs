//
// Copyright (c) The netconfd Contributors
//
// SPDX-License-Identifier: MIT
//

use netconfd_datastore::DatastoreError;
use tracing::{error, warn};

// Read-path errors. Every variant except the benign datastore conditions
// (handled at the call sites) is reported to the client as a NETCONF
// `operation-failed` error of type `application`.
#[derive(Debug)]
pub enum Error {
    Parse(String),
    Schema(netconfd_yang::Error),
    Datastore(DatastoreError),
    Internal(String),
}

// ===== impl Error =====

impl Error {
    pub fn log(&self) {
        match self {
            Error::Parse(error) => {
                warn!(%error, "{}", self);
            }
            Error::Schema(error) => {
                warn!(%error, "{}", self);
            }
            Error::Datastore(error) => {
                warn!(%error, "{}", self);
            }
            Error::Internal(error) => {
                error!(%error, "{}", self);
            }
        }
    }

    // Human-readable message carried in the reply's `error-message`
    // element, matching what `log()` emits.
    pub fn message(&self) -> String {
        match self {
            Error::Parse(error) => format!("{}: {}", self, error),
            Error::Schema(error) => format!("{}: {}", self, error),
            Error::Datastore(error) => format!("{}: {}", self, error),
            Error::Internal(error) => format!("{}: {}", self, error),
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Parse(..) => write!(f, "malformed RPC"),
            Error::Schema(..) => write!(f, "schema resolution failed"),
            Error::Datastore(..) => write!(f, "datastore request failed"),
            Error::Internal(..) => write!(f, "internal error"),
        }
    }
}

impl std::error::Error for Error {}

impl From<netconfd_yang::Error> for Error {
    fn from(error: netconfd_yang::Error) -> Error {
        match error {
            netconfd_yang::Error::UnknownModule(..)
            | netconfd_yang::Error::UnknownNode(..)
            | netconfd_yang::Error::BadPath(..) => Error::Schema(error),
            netconfd_yang::Error::Validation(msg)
            | netconfd_yang::Error::Internal(msg) => Error::Internal(msg),
        }
    }
}
