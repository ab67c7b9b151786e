//
// Copyright (c) The netconfd Contributors
//
// SPDX-License-Identifier: MIT
//

mod get;
mod rpc;

pub mod config;
pub mod error;
pub mod filter;
pub mod pool;
pub mod session;
pub mod value;

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use netconfd_yang::data::DataTree;
use netconfd_yang::schema::SchemaContext;
use serde::Deserialize;

use crate::config::Config;
use crate::error::Error;
use crate::session::Session;

// RPC-level with-defaults handling mode (RFC 6243).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WithDefaults {
    ReportAll,
    ReportAllTagged,
    Trim,
    Explicit,
}

// The server context shared by all sessions: the schema context, the
// server configuration, and the pre-built local data trees (YANG library,
// NETCONF monitoring state, notification stream state). There is no other
// process-wide state; handlers receive everything through here.
pub struct Server {
    // Shared/exclusive: the read path takes shared access for the duration
    // of one RPC, module installs take exclusive access.
    schema: RwLock<SchemaContext>,
    config: Config,
    // In-memory data trees keyed by module name, projected (never queried
    // through the datastore) when a filter targets them.
    local_data: RwLock<HashMap<String, DataTree>>,
}

// ===== impl WithDefaults =====

impl WithDefaults {
    pub fn from_name(name: &str) -> Option<WithDefaults> {
        match name {
            "report-all" => Some(WithDefaults::ReportAll),
            "report-all-tagged" => Some(WithDefaults::ReportAllTagged),
            "trim" => Some(WithDefaults::Trim),
            "explicit" => Some(WithDefaults::Explicit),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            WithDefaults::ReportAll => "report-all",
            WithDefaults::ReportAllTagged => "report-all-tagged",
            WithDefaults::Trim => "trim",
            WithDefaults::Explicit => "explicit",
        }
    }
}

impl std::fmt::Display for WithDefaults {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ===== impl Server =====

impl Server {
    pub fn new(schema: SchemaContext, config: Config) -> Server {
        Server {
            schema: RwLock::new(schema),
            config,
            local_data: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // Shared access to the schema context, as taken by the read path.
    pub fn schema(&self) -> RwLockReadGuard<'_, SchemaContext> {
        self.schema.read().unwrap()
    }

    // Exclusive access to the schema context, for module installs. Blocks
    // until all in-flight RPCs have released their shared access.
    pub fn schema_mut(&self) -> RwLockWriteGuard<'_, SchemaContext> {
        self.schema.write().unwrap()
    }

    // Installs (or replaces) the local data tree of a module.
    pub fn set_local_data(&self, module: &str, tree: DataTree) {
        self.local_data
            .write()
            .unwrap()
            .insert(module.to_owned(), tree);
    }

    pub(crate) fn local_data(
        &self,
    ) -> RwLockReadGuard<'_, HashMap<String, DataTree>> {
        self.local_data.read().unwrap()
    }

    // The with-defaults capability advertised in the hello exchange.
    pub fn with_defaults_capability(&self) -> String {
        use itertools::Itertools;

        let wd = &self.config.with_defaults;
        let mut capability = format!(
            "urn:ietf:params:netconf:capability:with-defaults:1.0?basic-mode={}",
            wd.basic_mode.name()
        );
        if !wd.also_supported.is_empty() {
            let also = wd
                .also_supported
                .iter()
                .map(WithDefaults::name)
                .join(",");
            capability.push_str("&also-supported=");
            capability.push_str(&also);
        }
        capability
    }

    // Runs one RPC against a session, returning the reply document. This
    // is the entry point the worker pool (or an embedding session layer)
    // calls for every inbound `<rpc>`.
    pub fn handle_rpc(&self, session: &Session, rpc: &str) -> String {
        get::process_rpc(self, session, rpc)
    }
}

// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
