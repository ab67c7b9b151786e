//
// Copyright (c) The netconfd Contributors
//
// SPDX-License-Identifier: MIT
//

use tracing::warn;

// Schema context and data tree errors.
#[derive(Debug)]
pub enum Error {
    UnknownModule(String),
    UnknownNode(String),
    BadPath(String),
    Validation(String),
    Internal(String),
}

// ===== impl Error =====

impl Error {
    pub fn log(&self) {
        match self {
            Error::UnknownModule(name) => {
                warn!(%name, "{}", self);
            }
            Error::UnknownNode(path) => {
                warn!(%path, "{}", self);
            }
            Error::BadPath(path) => {
                warn!(%path, "{}", self);
            }
            Error::Validation(error) => {
                warn!(%error, "{}", self);
            }
            Error::Internal(error) => {
                warn!(%error, "{}", self);
            }
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::UnknownModule(..) => {
                write!(f, "unknown YANG module")
            }
            Error::UnknownNode(..) => {
                write!(f, "unknown schema node")
            }
            Error::BadPath(..) => {
                write!(f, "malformed data path")
            }
            Error::Validation(..) => {
                write!(f, "data tree validation failed")
            }
            Error::Internal(..) => {
                write!(f, "internal data tree error")
            }
        }
    }
}

impl std::error::Error for Error {}
