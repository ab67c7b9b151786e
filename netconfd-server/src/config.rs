//
// Copyright (c) The netconfd Contributors
//
// SPDX-License-Identifier: MIT
//

use serde::Deserialize;

use crate::WithDefaults;

// Server configuration. The embedding daemon deserializes this from its
// configuration file; every field has a working default.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    // Number of RPC worker threads.
    pub rpc_workers: usize,
    pub with_defaults: WithDefaultsConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WithDefaultsConfig {
    // Mode applied when the client does not ask for one.
    pub basic_mode: WithDefaults,
    // Additional modes advertised in the with-defaults capability.
    pub also_supported: Vec<WithDefaults>,
}

// ===== impl Config =====

impl Default for Config {
    fn default() -> Config {
        Config {
            rpc_workers: 4,
            with_defaults: Default::default(),
        }
    }
}

// ===== impl WithDefaultsConfig =====

impl Default for WithDefaultsConfig {
    fn default() -> WithDefaultsConfig {
        WithDefaultsConfig {
            basic_mode: WithDefaults::Explicit,
            also_supported: vec![
                WithDefaults::ReportAll,
                WithDefaults::ReportAllTagged,
                WithDefaults::Trim,
            ],
        }
    }
}
