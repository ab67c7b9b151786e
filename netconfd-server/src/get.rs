//
// Copyright (c) The netconfd Contributors
//
// SPDX-License-Identifier: MIT
//
//! The `<get>` / `<get-config>` read path.
//!
//! An inbound RPC selects a datastore, compiles its filter into datastore
//! XPaths, assembles the matching data into one tree (from the datastore
//! backend, or from local data trees for the modules the server answers
//! itself), applies the with-defaults policy and wraps the result into an
//! `<rpc-reply>`.

use netconfd_datastore::DatastoreType;
use netconfd_yang::data::{DataTree, NodeId, ValidationMode};
use netconfd_yang::schema::{SchemaContext, SchemaNodeKind};
use netconfd_yang::xpath::Path;
use tracing::debug;

use crate::error::Error;
use crate::rpc::{self, FilterSpec, Operation};
use crate::session::{Session, SessionState};
use crate::{Server, WithDefaults, filter, value};

// Modules whose data lives in local trees rather than in the datastore.
// All of it is state data, elided entirely from config-only reads.
const LOCAL_MODULES: [&str; 3] = [
    "ietf-yang-library",
    "ietf-netconf-monitoring",
    "nc-notifications",
];

enum Decision {
    Keep,
    Drop,
    KeepTagged,
}

// ===== global functions =====

pub(crate) fn process_rpc(
    server: &Server,
    session: &Session,
    rpc_xml: &str,
) -> String {
    let doc = match roxmltree::Document::parse(rpc_xml) {
        Ok(doc) => doc,
        Err(error) => {
            let error = Error::Parse(error.to_string());
            error.log();
            return rpc::reply_error(&[], &error.message());
        }
    };
    let attributes = rpc::envelope_attributes(&doc);
    let operation = match rpc::parse_rpc(&doc) {
        Ok(operation) => operation,
        Err(error) => {
            error.log();
            return rpc::reply_error(&attributes, &error.message());
        }
    };

    // Serialize RPC execution on this session.
    let mut state = session.begin_rpc();
    match process_get(server, &mut state, &operation) {
        Ok(data_xml) => rpc::reply_data(&attributes, &data_xml),
        Err(error) => {
            error.log();
            rpc::reply_error(&attributes, &error.message())
        }
    }
}

// ===== helper functions =====

fn process_get(
    server: &Server,
    state: &mut SessionState,
    operation: &Operation<'_, '_>,
) -> Result<String, Error> {
    let schema = server.schema();

    // Datastore selection.
    let (ds, config_only, filter_spec, with_defaults) = match operation {
        Operation::Get {
            filter,
            with_defaults,
        } => (DatastoreType::Running, false, filter, with_defaults),
        Operation::GetConfig {
            source,
            filter,
            with_defaults,
        } => (*source, true, filter, with_defaults),
    };
    if state.datastore != ds || state.config_only != config_only {
        state
            .backend
            .switch(ds, config_only)
            .map_err(Error::Datastore)?;
        state.datastore = ds;
        state.config_only = config_only;
    }

    // Filter compilation.
    let xpaths = match filter_spec {
        None => filter::unfiltered(&schema),
        Some(FilterSpec::Subtree(node)) => filter::from_subtree(&schema, *node),
        Some(FilterSpec::XPath(select)) if select.is_empty() => Vec::new(),
        Some(FilterSpec::XPath(select)) => vec![select.clone()],
    };
    debug!(datastore = %ds, filters = xpaths.len(), "processing read request");

    // With-defaults resolution: the RPC's choice, or the advertised basic
    // mode.
    let with_defaults =
        with_defaults.unwrap_or(server.config().with_defaults.basic_mode);

    // Datastore refresh. The candidate is re-based on running only while
    // the session has not staged changes into it.
    if state.datastore != DatastoreType::Candidate || !state.candidate_changed
    {
        state.backend.refresh().map_err(Error::Datastore)?;
    }

    // Assembly.
    let mut root = DataTree::new();
    let local_data = server.local_data();
    for xpath in &xpaths {
        let local_module = LOCAL_MODULES
            .iter()
            .find(|module| is_module_path(xpath, module));
        match local_module {
            Some(module) => {
                // Local modules hold state data only.
                if state.config_only {
                    continue;
                }
                if let Some(source) = local_data.get(*module) {
                    project(&schema, &mut root, source, xpath)?;
                }
            }
            None => build_from_datastore(&schema, state, &mut root, xpath)?,
        }
    }

    // With-defaults pass.
    apply_with_defaults(&schema, &mut root, with_defaults, false);

    // Validate the assembled tree and serialize it.
    let mode = match config_only {
        true => ValidationMode::GetConfig,
        false => ValidationMode::Get,
    };
    root.validate(&schema, mode)?;
    let mut xml = String::new();
    root.print_xml(&schema, &mut xml)
        .map_err(|_| Error::Internal("reply serialization failed".to_owned()))?;
    Ok(xml)
}

fn is_module_path(xpath: &str, module: &str) -> bool {
    xpath
        .strip_prefix('/')
        .and_then(|rest| rest.strip_prefix(module))
        .is_some_and(|rest| rest.starts_with(':'))
}

// Populates the tree with every scalar the datastore holds under one
// compiled XPath, creating ancestors as needed and propagating default
// flags.
fn build_from_datastore(
    ctx: &SchemaContext,
    state: &mut SessionState,
    root: &mut DataTree,
    xpath: &str,
) -> Result<(), Error> {
    let full_xpath = format!("{}//.", xpath);
    let iter = match state.backend.get_items(&full_xpath) {
        Ok(iter) => iter,
        // A model without data is not an error.
        Err(error) if error.is_benign() => return Ok(()),
        Err(error) => return Err(Error::Datastore(error)),
    };

    let mut buf = String::new();
    for item in iter {
        let item = match item {
            Ok(item) => item,
            Err(error) if error.is_benign() => break,
            Err(error) => return Err(Error::Datastore(error)),
        };

        let path = Path::parse(&item.xpath)?;
        buf.clear();
        let value = value::datastore_to_tree(ctx, &item, &mut buf);
        let node = root.find_or_create(ctx, &path, value)?;

        if item.default {
            mark_default(ctx, root, node);
        } else {
            clear_default_ancestors(root, node);
        }
    }

    Ok(())
}

// Marks a freshly inserted default value: descend to the deepest node on
// the first-child chain, then walk back up flagging every node until the
// insertion point, stopping short of presence containers and keyed lists
// (their existence is explicit information).
fn mark_default(ctx: &SchemaContext, tree: &mut DataTree, node: NodeId) {
    let mut cursor = node;
    loop {
        let kind = &ctx.node(tree.snode(cursor)).kind;
        if matches!(
            kind,
            SchemaNodeKind::Leaf(..)
                | SchemaNodeKind::LeafList(..)
                | SchemaNodeKind::AnyXml
        ) {
            break;
        }
        match tree.first_child(cursor) {
            Some(child) => cursor = child,
            None => break,
        }
    }

    loop {
        let snode = tree.snode(cursor);
        if ctx.is_presence_container(snode) || ctx.is_keyed_list(snode) {
            break;
        }
        tree.set_default(cursor, true);
        if cursor == node {
            break;
        }
        match tree.parent(cursor) {
            Some(parent) => cursor = parent,
            None => break,
        }
    }
}

// A non-default value makes every default-flagged ancestor explicit. The
// walk stops at the first ancestor that is already explicit.
fn clear_default_ancestors(tree: &mut DataTree, node: NodeId) {
    let mut cursor = tree.parent(node);
    while let Some(idx) = cursor {
        if !tree.is_default(idx) {
            break;
        }
        tree.set_default(idx, false);
        cursor = tree.parent(idx);
    }
}

// Projects the nodes matching `xpath` out of an in-memory tree: each
// match is deep-copied, wrapped into shallow copies of its ancestors
// (with list keys completed and re-sorted into schema order), and merged
// into the result.
fn project(
    ctx: &SchemaContext,
    root: &mut DataTree,
    source: &DataTree,
    xpath: &str,
) -> Result<(), Error> {
    let path = Path::parse(xpath)?;

    for matched in source.select(ctx, &path)? {
        let mut fragment = DataTree::new();
        let mut inner = fragment.copy_from(source, matched, true);

        let mut ancestor = source.parent(matched);
        while let Some(anc) = ancestor {
            let wrapper = fragment.copy_from(source, anc, false);
            fragment.attach(ctx, Some(wrapper), inner);

            // Every list ancestor carries its full set of keys.
            let keys: Vec<_> = ctx.list_keys(source.snode(anc)).to_vec();
            for key in keys {
                if fragment
                    .children(Some(wrapper))
                    .any(|child| fragment.snode(child) == key)
                {
                    continue;
                }
                if let Some(src_key) = source
                    .children(Some(anc))
                    .find(|&child| source.snode(child) == key)
                {
                    let copy = fragment.copy_from(source, src_key, false);
                    fragment.attach(ctx, Some(wrapper), copy);
                }
            }
            fragment.sort_children(ctx, Some(wrapper));

            inner = wrapper;
            ancestor = source.parent(anc);
        }
        fragment.attach(ctx, None, inner);

        root.merge(ctx, fragment)?;
    }

    Ok(())
}

// Applies the with-defaults mode to the assembled tree: dropped leaves
// are removed (pruning containers left childless), tagged leaves carry
// the default-indicator attribute on output.
fn apply_with_defaults(
    ctx: &SchemaContext,
    tree: &mut DataTree,
    mode: WithDefaults,
    rpc_output: bool,
) {
    if mode == WithDefaults::ReportAll {
        return;
    }

    let nodes: Vec<NodeId> = tree.traverse().collect();
    for idx in nodes {
        // Pruning may have freed ancestors collected earlier.
        if !tree.contains(idx) {
            continue;
        }
        match inspect(ctx, tree, idx, mode, rpc_output) {
            Decision::Keep => (),
            Decision::KeepTagged => tree.set_tagged(idx, true),
            Decision::Drop => {
                let parent = tree.parent(idx);
                tree.remove(idx);
                prune_empty_containers(ctx, tree, parent);
            }
        }
    }
}

// The per-leaf with-defaults decision. Only true leaves are inspected;
// list keys are always reported (RFC 6243).
fn inspect(
    ctx: &SchemaContext,
    tree: &DataTree,
    idx: NodeId,
    mode: WithDefaults,
    rpc_output: bool,
) -> Decision {
    let snode_id = tree.snode(idx);
    let snode = ctx.node(snode_id);
    let SchemaNodeKind::Leaf(leaf) = &snode.kind else {
        return Decision::Keep;
    };
    if ctx.is_list_key(snode_id) {
        return Decision::Keep;
    }

    if tree.is_default(idx) {
        return match mode {
            WithDefaults::ReportAll => Decision::Keep,
            WithDefaults::ReportAllTagged => Decision::KeepTagged,
            WithDefaults::Trim => Decision::Drop,
            WithDefaults::Explicit => match snode.config && !rpc_output {
                true => Decision::Drop,
                false => Decision::Keep,
            },
        };
    }
    if mode == WithDefaults::Explicit {
        return Decision::Keep;
    }

    // An explicitly set value equal to the schema default: `trim` drops
    // it, `report-all-tagged` tags it.
    let Some(default) = ctx.effective_default(leaf) else {
        return Decision::Keep;
    };
    if tree.value(idx) != Some(default) {
        return Decision::Keep;
    }
    match mode {
        WithDefaults::Trim => Decision::Drop,
        WithDefaults::ReportAllTagged => Decision::KeepTagged,
        _ => Decision::Keep,
    }
}

// Removes non-presence containers left without children, walking upward.
fn prune_empty_containers(
    ctx: &SchemaContext,
    tree: &mut DataTree,
    mut cursor: Option<NodeId>,
) {
    while let Some(idx) = cursor {
        if tree.first_child(idx).is_some() {
            break;
        }
        if !matches!(
            ctx.node(tree.snode(idx)).kind,
            SchemaNodeKind::Container { presence: false }
        ) {
            break;
        }
        let parent = tree.parent(idx);
        tree.remove(idx);
        cursor = parent;
    }
}
