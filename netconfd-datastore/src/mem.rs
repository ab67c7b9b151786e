//
// Copyright (c) The netconfd Contributors
//
// SPDX-License-Identifier: MIT
//
//! In-memory datastore backend.
//!
//! A reference implementation of the backend contract used by the
//! end-to-end tests: one scalar store per datastore, addressed by data
//! path, with a syntactic path matcher. Items are yielded in store order,
//! so stores should be populated in pre-order.

use std::sync::{Arc, Mutex};

use derive_new::new;
use netconfd_yang::xpath::{Path, Predicate};
use tracing::debug;

use crate::{
    DatastoreError, DatastoreItem, DatastoreSession, DatastoreType,
    DatastoreValue, ItemIter,
};

#[derive(Clone, Debug, new)]
pub struct MemItem {
    pub xpath: String,
    pub value: DatastoreValue,
    pub default: bool,
    // Whether the item belongs to the configuration (config true) part of
    // the schema. State items are hidden from config-only sessions.
    pub config: bool,
}

#[derive(Debug, Default)]
struct Stores {
    running: Vec<MemItem>,
    startup: Vec<MemItem>,
    candidate: Vec<MemItem>,
}

#[derive(Clone, Debug, Default)]
pub struct MemDatastore {
    shared: Arc<Mutex<Stores>>,
}

#[derive(Debug)]
pub struct MemSession {
    shared: Arc<Mutex<Stores>>,
    ds: DatastoreType,
    config_only: bool,
}

// ===== impl MemDatastore =====

impl MemDatastore {
    pub fn new() -> MemDatastore {
        Default::default()
    }

    // Replaces the contents of one datastore.
    pub fn set_items(&self, ds: DatastoreType, items: Vec<MemItem>) {
        let mut stores = self.shared.lock().unwrap();
        *store_mut(&mut stores, ds) = items;
    }

    pub fn session(&self) -> MemSession {
        MemSession {
            shared: self.shared.clone(),
            ds: DatastoreType::Running,
            config_only: false,
        }
    }
}

// ===== impl MemSession =====

impl DatastoreSession for MemSession {
    fn switch(
        &mut self,
        ds: DatastoreType,
        config_only: bool,
    ) -> Result<(), DatastoreError> {
        self.ds = ds;
        self.config_only = config_only;
        Ok(())
    }

    fn refresh(&mut self) -> Result<(), DatastoreError> {
        if self.ds == DatastoreType::Candidate {
            debug!("re-basing candidate datastore on running");
            let mut stores = self.shared.lock().unwrap();
            stores.candidate = stores.running.clone();
        }
        Ok(())
    }

    fn get_items(
        &mut self,
        xpath: &str,
    ) -> Result<ItemIter<'_>, DatastoreError> {
        let (filter, descendants) = match xpath.strip_suffix("//.") {
            Some(filter) => (filter, true),
            None => (xpath, false),
        };
        let filter = Path::parse(filter).map_err(|_| {
            DatastoreError::Backend(format!("invalid path: {}", xpath))
        })?;
        let module = filter.steps[0]
            .module
            .clone()
            .ok_or(DatastoreError::UnknownModel)?;

        let stores = self.shared.lock().unwrap();
        let store = store_ref(&stores, self.ds);

        if !store
            .iter()
            .any(|item| first_module(&item.xpath) == Some(module.as_str()))
        {
            return Err(DatastoreError::UnknownModel);
        }

        let matches: Vec<DatastoreItem> = store
            .iter()
            .filter(|item| item.config || !self.config_only)
            .filter(|item| matches_filter(store, item, &filter, descendants))
            .map(|item| {
                DatastoreItem::new(
                    item.xpath.clone(),
                    item.value.clone(),
                    item.default,
                )
            })
            .collect();
        if matches.is_empty() {
            return Err(DatastoreError::NotFound);
        }
        Ok(Box::new(matches.into_iter().map(Ok)))
    }
}

// ===== helper functions =====

fn store_mut(stores: &mut Stores, ds: DatastoreType) -> &mut Vec<MemItem> {
    match ds {
        DatastoreType::Running => &mut stores.running,
        DatastoreType::Startup => &mut stores.startup,
        DatastoreType::Candidate => &mut stores.candidate,
    }
}

fn store_ref(stores: &Stores, ds: DatastoreType) -> &Vec<MemItem> {
    match ds {
        DatastoreType::Running => &stores.running,
        DatastoreType::Startup => &stores.startup,
        DatastoreType::Candidate => &stores.candidate,
    }
}

fn first_module(xpath: &str) -> Option<&str> {
    let first = xpath.strip_prefix('/')?;
    let end = first.find(['/', '[']).unwrap_or(first.len());
    first[..end].split_once(':').map(|(module, _)| module)
}

// Whether a stored item falls under the filter path (or, with
// `descendants`, under any node matching it).
fn matches_filter(
    store: &[MemItem],
    item: &MemItem,
    filter: &Path,
    descendants: bool,
) -> bool {
    let Ok(item_path) = Path::parse(&item.xpath) else {
        return false;
    };
    if descendants {
        if item_path.steps.len() < filter.steps.len() {
            return false;
        }
    } else if item_path.steps.len() != filter.steps.len() {
        return false;
    }

    let mut filter_module: Option<&str> = None;
    let mut item_module: Option<&str> = None;

    for (depth, fstep) in filter.steps.iter().enumerate() {
        let istep = &item_path.steps[depth];
        filter_module = fstep.module.as_deref().or(filter_module);
        item_module = istep.module.as_deref().or(item_module);
        if filter_module != item_module {
            return false;
        }
        if fstep.name != "*" && fstep.name != istep.name {
            return false;
        }

        // The data path of the node this step lands on.
        let prefix = Path {
            steps: item_path.steps[..=depth].iter().cloned().collect(),
        }
        .to_string();

        for pred in &fstep.predicates {
            let holds = match pred {
                Predicate::Content { name, value, .. } if name == "." => {
                    item_text(store, &prefix).as_deref() == Some(value.as_str())
                }
                Predicate::Content { name, value, .. } => {
                    // List keys are embedded in the item path; other
                    // content matches resolve against a sibling item.
                    istep.predicates.iter().any(|ipred| {
                        matches!(ipred, Predicate::Content {
                            name: iname,
                            value: ivalue,
                            ..
                        } if iname == name && ivalue == value)
                    }) || child_text(store, &prefix, name).as_deref()
                        == Some(value.as_str())
                }
                Predicate::Text { value } => {
                    item_text(store, &prefix).as_deref() == Some(value.as_str())
                }
                // Datastore nodes carry no attributes.
                Predicate::Attribute { .. } => false,
            };
            if !holds {
                return false;
            }
        }
    }

    true
}

// The scalar text of the item stored exactly at `path`.
fn item_text(store: &[MemItem], path: &str) -> Option<String> {
    store
        .iter()
        .find(|item| item.xpath == path)
        .and_then(|item| scalar_text(&item.value))
}

// The scalar text of the child leaf `name` of the node at `path`.
fn child_text(store: &[MemItem], path: &str, name: &str) -> Option<String> {
    store
        .iter()
        .find(|item| {
            let Some(rest) = item.xpath.strip_prefix(path) else {
                return false;
            };
            let Some(rest) = rest.strip_prefix('/') else {
                return false;
            };
            rest == name
                || rest
                    .split_once(':')
                    .map(|(_, local)| local == name)
                    .unwrap_or(false)
        })
        .and_then(|item| scalar_text(&item.value))
}

// Canonical-ish text of a stored scalar, for predicate comparison.
fn scalar_text(value: &DatastoreValue) -> Option<String> {
    match value {
        DatastoreValue::Container
        | DatastoreValue::List
        | DatastoreValue::LeafEmpty => None,
        DatastoreValue::Bool(value) => {
            Some(if *value { "true" } else { "false" }.to_owned())
        }
        DatastoreValue::Int8(value) => Some(value.to_string()),
        DatastoreValue::Int16(value) => Some(value.to_string()),
        DatastoreValue::Int32(value) => Some(value.to_string()),
        DatastoreValue::Int64(value) => Some(value.to_string()),
        DatastoreValue::Uint8(value) => Some(value.to_string()),
        DatastoreValue::Uint16(value) => Some(value.to_string()),
        DatastoreValue::Uint32(value) => Some(value.to_string()),
        DatastoreValue::Uint64(value) => Some(value.to_string()),
        DatastoreValue::Decimal64 {
            value,
            fraction_digits,
        } => {
            let scale = 10i128.pow(*fraction_digits as u32);
            let abs = (*value as i128).unsigned_abs();
            Some(format!(
                "{}{}.{:0width$}",
                if *value < 0 { "-" } else { "" },
                abs / scale as u128,
                abs % scale as u128,
                width = *fraction_digits as usize
            ))
        }
        DatastoreValue::String(value)
        | DatastoreValue::Binary(value)
        | DatastoreValue::Enumeration(value)
        | DatastoreValue::InstanceId(value) => Some(value.clone()),
        DatastoreValue::Bits(names) => Some(names.join(" ")),
        DatastoreValue::IdentityRef { module, identity } => {
            Some(match module {
                Some(module) => format!("{}:{}", module, identity),
                None => identity.clone(),
            })
        }
    }
}
