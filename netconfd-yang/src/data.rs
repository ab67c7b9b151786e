//
// Copyright (c) The netconfd Contributors
//
// SPDX-License-Identifier: MIT
//

use std::fmt::Write;

use generational_arena::{Arena, Index};

// Handle of a node within a data tree.
pub type NodeId = Index;

use crate::NETCONF_DEFAULT_NS;
use crate::error::Error;
use crate::schema::{SchemaContext, SchemaNodeId, SchemaNodeKind};
use crate::xpath::{Path, Predicate, Step};

// Validation mode for assembled reply trees.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ValidationMode {
    Get,
    GetConfig,
}

// An ordered tree of data nodes backed by an arena.
//
// Nodes reference each other through arena indices (parent, first child,
// sibling chain), so subtrees can be detached and freed by index without
// reference cycles. Top-level siblings form a forest hanging off
// `first_root`.
#[derive(Debug, Default)]
pub struct DataTree {
    arena: Arena<DataNode>,
    first_root: Option<Index>,
}

#[derive(Debug)]
struct DataNode {
    snode: SchemaNodeId,
    // Canonical value for leaf and leaf-list nodes. None for containers,
    // lists and leaves of type empty.
    value: Option<String>,
    // The node's value is (or is derived solely from) a schema default.
    default: bool,
    // Carry the RFC 6243 default-indicator attribute on output.
    tagged: bool,
    parent: Option<Index>,
    first_child: Option<Index>,
    prev_sibling: Option<Index>,
    next_sibling: Option<Index>,
}

// ===== impl DataTree =====

impl DataTree {
    pub fn new() -> DataTree {
        Default::default()
    }

    pub fn is_empty(&self) -> bool {
        self.first_root.is_none()
    }

    // Whether the node handle is still live (not freed by a removal).
    pub fn contains(&self, idx: Index) -> bool {
        self.arena.contains(idx)
    }

    // ----- node accessors -----

    pub fn snode(&self, idx: Index) -> SchemaNodeId {
        self.arena[idx].snode
    }

    pub fn value(&self, idx: Index) -> Option<&str> {
        self.arena[idx].value.as_deref()
    }

    pub fn set_value(&mut self, idx: Index, value: Option<&str>) {
        self.arena[idx].value = value.map(str::to_owned);
    }

    pub fn is_default(&self, idx: Index) -> bool {
        self.arena[idx].default
    }

    pub fn set_default(&mut self, idx: Index, default: bool) {
        self.arena[idx].default = default;
    }

    pub fn is_tagged(&self, idx: Index) -> bool {
        self.arena[idx].tagged
    }

    pub fn set_tagged(&mut self, idx: Index, tagged: bool) {
        self.arena[idx].tagged = tagged;
    }

    pub fn parent(&self, idx: Index) -> Option<Index> {
        self.arena[idx].parent
    }

    pub fn first_child(&self, idx: Index) -> Option<Index> {
        self.arena[idx].first_child
    }

    pub fn next_sibling(&self, idx: Index) -> Option<Index> {
        self.arena[idx].next_sibling
    }

    // ----- iteration -----

    pub fn roots(&self) -> Siblings<'_> {
        Siblings {
            tree: self,
            next: self.first_root,
        }
    }

    pub fn children(&self, parent: Option<Index>) -> Siblings<'_> {
        let first = match parent {
            Some(parent) => self.arena[parent].first_child,
            None => self.first_root,
        };
        Siblings {
            tree: self,
            next: first,
        }
    }

    // Pre-order traversal over the whole forest.
    pub fn traverse(&self) -> Traverse<'_> {
        let mut stack = Vec::new();
        if let Some(root) = self.first_root {
            stack.push(root);
        }
        Traverse { tree: self, stack }
    }

    // The node's data path, for diagnostics.
    pub fn path(&self, ctx: &SchemaContext, idx: Index) -> String {
        let mut names = Vec::new();
        let mut cursor = Some(idx);
        while let Some(idx) = cursor {
            let snode = ctx.node(self.arena[idx].snode);
            names.push(format!(
                "/{}:{}",
                ctx.module(snode.module).name,
                snode.name
            ));
            cursor = self.arena[idx].parent;
        }
        names.into_iter().rev().collect()
    }

    // ----- construction -----

    // Creates an unlinked node. The caller attaches it afterwards.
    pub fn new_node(
        &mut self,
        snode: SchemaNodeId,
        value: Option<&str>,
    ) -> Index {
        self.arena.insert(DataNode {
            snode,
            value: value.map(str::to_owned),
            default: false,
            tagged: false,
            parent: None,
            first_child: None,
            prev_sibling: None,
            next_sibling: None,
        })
    }

    // Links an unattached node under the given parent (or as a top-level
    // sibling), keeping siblings in schema-declared order. Insertion is
    // stable: instances of the same schema node stay in insertion order.
    pub fn attach(
        &mut self,
        ctx: &SchemaContext,
        parent: Option<Index>,
        child: Index,
    ) {
        let pos = ctx.child_position(self.arena[child].snode);
        let mut prev = None;
        let mut cursor = match parent {
            Some(parent) => self.arena[parent].first_child,
            None => self.first_root,
        };
        while let Some(sibling) = cursor {
            if ctx.child_position(self.arena[sibling].snode) > pos {
                break;
            }
            prev = Some(sibling);
            cursor = self.arena[sibling].next_sibling;
        }
        self.link_between(parent, prev, cursor, child);
    }

    // Copies a node (optionally with its whole subtree) from another tree
    // into this one, returning the unlinked copy. Child order is preserved.
    pub fn copy_from(
        &mut self,
        source: &DataTree,
        src: Index,
        deep: bool,
    ) -> Index {
        let data = &source.arena[src];
        let idx = self.arena.insert(DataNode {
            snode: data.snode,
            value: data.value.clone(),
            default: data.default,
            tagged: data.tagged,
            parent: None,
            first_child: None,
            prev_sibling: None,
            next_sibling: None,
        });
        if deep {
            let children: Vec<_> = source.children(Some(src)).collect();
            for child in children {
                let copy = self.copy_from(source, child, true);
                self.append_child(Some(idx), copy);
            }
        }
        idx
    }

    // Unlinks a node and frees its whole subtree.
    pub fn remove(&mut self, idx: Index) {
        self.unlink(idx);
        let mut subtree = Vec::new();
        self.collect_subtree(idx, &mut subtree);
        for idx in subtree {
            self.arena.remove(idx);
        }
    }

    // ----- path-based creation -----

    // Finds or creates the node at the given data path, creating all
    // missing ancestors and list keys along the way (update semantics: an
    // existing leaf has its value replaced, nodes are never duplicated).
    pub fn find_or_create(
        &mut self,
        ctx: &SchemaContext,
        path: &Path,
        value: Option<&str>,
    ) -> Result<Index, Error> {
        if path.steps.is_empty() {
            return Err(Error::BadPath(path.to_string()));
        }

        let mut parent: Option<Index> = None;
        let mut parent_snode: Option<SchemaNodeId> = None;
        let mut module = None;
        let mut node = None;

        let last_step = path.steps.len() - 1;
        for (depth, step) in path.steps.iter().enumerate() {
            let step_module = match &step.module {
                Some(name) => {
                    ctx.module_by_name(name)
                        .map(|(id, _)| id)
                        .ok_or_else(|| Error::UnknownModule(name.clone()))?
                }
                None => module
                    .ok_or_else(|| Error::BadPath(path.to_string()))?,
            };
            let snode = ctx
                .resolve_child(parent_snode, step_module, &step.name)
                .ok_or_else(|| Error::UnknownNode(path.to_string()))?;

            let last = depth == last_step;
            let step_value = if last { value } else { None };
            let existing = self.children(parent).find(|&idx| {
                self.instance_matches(
                    ctx,
                    idx,
                    snode,
                    &step.predicates,
                    step_value,
                )
            });

            let idx = match existing {
                Some(idx) => {
                    if last {
                        self.arena[idx].value = value.map(str::to_owned);
                    }
                    idx
                }
                None => {
                    let idx = self.new_node(snode, step_value);
                    self.attach(ctx, parent, idx);
                    self.create_keys(ctx, idx, snode, &step.predicates);
                    idx
                }
            };

            parent = Some(idx);
            parent_snode = Some(snode);
            module = Some(step_module);
            node = Some(idx);
        }

        node.ok_or_else(|| Error::BadPath(path.to_string()))
    }

    // ----- selection -----

    // Evaluates a compiled-filter XPath against the tree. Supports
    // module-qualified steps, the `*` wildcard, key/content predicates,
    // `text()` predicates, and attribute predicates (which never match
    // data nodes).
    pub fn select(
        &self,
        ctx: &SchemaContext,
        path: &Path,
    ) -> Result<Vec<Index>, Error> {
        let mut candidates: Vec<Index> = Vec::new();
        let mut module: Option<&str> = None;

        for (depth, step) in path.steps.iter().enumerate() {
            let step_module = step
                .module
                .as_deref()
                .or(module)
                .ok_or_else(|| Error::BadPath(path.to_string()))?;

            let level: Vec<Index> = if depth == 0 {
                self.roots().collect()
            } else {
                candidates
                    .iter()
                    .flat_map(|&idx| self.children(Some(idx)))
                    .collect()
            };
            candidates = level
                .into_iter()
                .filter(|&idx| {
                    self.step_matches(ctx, idx, step, step_module)
                })
                .collect();
            if candidates.is_empty() {
                break;
            }
            module = Some(step_module);
        }

        Ok(candidates)
    }

    // ----- merge -----

    // Merges another tree into this one: nodes that already exist here are
    // retained, new subtrees are attached, duplicate leaves take the
    // fragment's value and flags.
    pub fn merge(
        &mut self,
        ctx: &SchemaContext,
        other: DataTree,
    ) -> Result<(), Error> {
        let roots: Vec<_> = other.roots().collect();
        for root in roots {
            self.merge_node(ctx, &other, root, None)?;
        }
        Ok(())
    }

    // ----- ordering -----

    // Re-sorts the children of a node (or the top-level siblings) into
    // schema-declared order. The sort is stable, so instances of one list
    // keep their relative order.
    pub fn sort_children(
        &mut self,
        ctx: &SchemaContext,
        parent: Option<Index>,
    ) {
        let mut children: Vec<_> = self.children(parent).collect();
        children
            .sort_by_key(|&idx| ctx.child_position(self.arena[idx].snode));

        let mut prev: Option<Index> = None;
        for &child in &children {
            match prev {
                Some(prev) => self.arena[prev].next_sibling = Some(child),
                None => match parent {
                    Some(parent) => {
                        self.arena[parent].first_child = Some(child)
                    }
                    None => self.first_root = Some(child),
                },
            }
            self.arena[child].prev_sibling = prev;
            self.arena[child].next_sibling = None;
            prev = Some(child);
        }
    }

    // ----- validation -----

    // Checks the structural invariants of an assembled reply tree: schema
    // linkage, list-key completeness, and (for get-config) the absence of
    // state nodes.
    pub fn validate(
        &self,
        ctx: &SchemaContext,
        mode: ValidationMode,
    ) -> Result<(), Error> {
        for idx in self.traverse() {
            let node = &self.arena[idx];
            let snode = ctx.node(node.snode);

            // Schema linkage.
            let parent_snode = node.parent.map(|parent| self.arena[parent].snode);
            if ctx.parent(node.snode) != parent_snode {
                return Err(Error::Validation(format!(
                    "node {} linked under the wrong parent",
                    self.path(ctx, idx)
                )));
            }

            // Key completeness.
            for &key in ctx.list_keys(node.snode) {
                if !self
                    .children(Some(idx))
                    .any(|child| self.arena[child].snode == key)
                {
                    return Err(Error::Validation(format!(
                        "list {} is missing key {}",
                        self.path(ctx, idx),
                        ctx.node(key).name
                    )));
                }
            }

            // No state data in a get-config reply.
            if mode == ValidationMode::GetConfig && !snode.config {
                return Err(Error::Validation(format!(
                    "state node {} in a get-config reply",
                    self.path(ctx, idx)
                )));
            }
        }

        Ok(())
    }

    // ----- XML output -----

    // Serializes the forest as namespace-correct XML. A default xmlns
    // declaration is emitted whenever a node's module differs from its
    // parent's; tagged nodes carry the RFC 6243 default-indicator
    // attribute.
    pub fn print_xml(
        &self,
        ctx: &SchemaContext,
        w: &mut impl Write,
    ) -> std::fmt::Result {
        let roots: Vec<_> = self.roots().collect();
        for root in roots {
            self.print_node(ctx, w, root, None)?;
        }
        Ok(())
    }

    fn print_node(
        &self,
        ctx: &SchemaContext,
        w: &mut impl Write,
        idx: Index,
        parent_module: Option<&str>,
    ) -> std::fmt::Result {
        let node = &self.arena[idx];
        let snode = ctx.node(node.snode);
        let module = ctx.module(snode.module);

        write!(w, "<{}", snode.name)?;
        if parent_module != Some(module.name.as_str()) {
            write!(w, " xmlns=\"")?;
            write_escaped(w, &module.namespace)?;
            write!(w, "\"")?;
        }
        if node.tagged {
            write!(
                w,
                " xmlns:ncwd=\"{}\" ncwd:default=\"true\"",
                NETCONF_DEFAULT_NS
            )?;
        }

        let children: Vec<_> = self.children(Some(idx)).collect();
        if children.is_empty() && node.value.is_none() {
            return write!(w, "/>");
        }

        write!(w, ">")?;
        if let Some(value) = &node.value {
            write_escaped(w, value)?;
        }
        for child in children {
            self.print_node(ctx, w, child, Some(&module.name))?;
        }
        write!(w, "</{}>", snode.name)
    }

    // ----- helpers -----

    fn append_child(&mut self, parent: Option<Index>, child: Index) {
        let mut prev = None;
        let mut cursor = match parent {
            Some(parent) => self.arena[parent].first_child,
            None => self.first_root,
        };
        while let Some(sibling) = cursor {
            prev = Some(sibling);
            cursor = self.arena[sibling].next_sibling;
        }
        self.link_between(parent, prev, None, child);
    }

    fn link_between(
        &mut self,
        parent: Option<Index>,
        prev: Option<Index>,
        next: Option<Index>,
        child: Index,
    ) {
        self.arena[child].parent = parent;
        self.arena[child].prev_sibling = prev;
        self.arena[child].next_sibling = next;
        match prev {
            Some(prev) => self.arena[prev].next_sibling = Some(child),
            None => match parent {
                Some(parent) => self.arena[parent].first_child = Some(child),
                None => self.first_root = Some(child),
            },
        }
        if let Some(next) = next {
            self.arena[next].prev_sibling = Some(child);
        }
    }

    fn unlink(&mut self, idx: Index) {
        let (parent, prev, next) = {
            let node = &self.arena[idx];
            (node.parent, node.prev_sibling, node.next_sibling)
        };
        match prev {
            Some(prev) => self.arena[prev].next_sibling = next,
            None => match parent {
                Some(parent) => self.arena[parent].first_child = next,
                None => self.first_root = next,
            },
        }
        if let Some(next) = next {
            self.arena[next].prev_sibling = prev;
        }
        let node = &mut self.arena[idx];
        node.parent = None;
        node.prev_sibling = None;
        node.next_sibling = None;
    }

    fn collect_subtree(&self, idx: Index, out: &mut Vec<Index>) {
        out.push(idx);
        let mut cursor = self.arena[idx].first_child;
        while let Some(child) = cursor {
            self.collect_subtree(child, out);
            cursor = self.arena[child].next_sibling;
        }
    }

    // Whether an existing child node is the instance addressed by a path
    // step: same schema node, matching key predicates for keyed lists, and
    // a matching value for leaf-list entries.
    fn instance_matches(
        &self,
        ctx: &SchemaContext,
        idx: Index,
        snode: SchemaNodeId,
        predicates: &[Predicate],
        value: Option<&str>,
    ) -> bool {
        let node = &self.arena[idx];
        if node.snode != snode {
            return false;
        }

        match ctx.node(snode).kind {
            SchemaNodeKind::List { .. } => {
                predicates.iter().all(|pred| match pred {
                    Predicate::Content {
                        name,
                        value: pred_value,
                        ..
                    } => self.children(Some(idx)).any(|child| {
                        let child_snode = ctx.node(self.arena[child].snode);
                        child_snode.name == *name
                            && self.arena[child].value.as_deref()
                                == Some(pred_value.as_str())
                    }),
                    _ => true,
                })
            }
            SchemaNodeKind::LeafList(..) => {
                let pred_value =
                    predicates.iter().find_map(|pred| match pred {
                        Predicate::Content { name, value, .. }
                            if name == "." =>
                        {
                            Some(value.as_str())
                        }
                        _ => None,
                    });
                match pred_value.or(value) {
                    Some(value) => node.value.as_deref() == Some(value),
                    None => true,
                }
            }
            _ => true,
        }
    }

    // Auto-creates the key leaves of a freshly created list entry from the
    // path predicates, in schema key order.
    fn create_keys(
        &mut self,
        ctx: &SchemaContext,
        idx: Index,
        snode: SchemaNodeId,
        predicates: &[Predicate],
    ) {
        let keys: Vec<_> = ctx.list_keys(snode).to_vec();
        for key in keys {
            let key_name = ctx.node(key).name.clone();
            let value = predicates.iter().find_map(|pred| match pred {
                Predicate::Content { name, value, .. }
                    if *name == key_name =>
                {
                    Some(value.as_str())
                }
                _ => None,
            });
            if let Some(value) = value {
                let key_idx = self.new_node(key, Some(value));
                self.attach(ctx, Some(idx), key_idx);
            }
        }
    }

    fn step_matches(
        &self,
        ctx: &SchemaContext,
        idx: Index,
        step: &Step,
        module: &str,
    ) -> bool {
        let snode = ctx.node(self.arena[idx].snode);
        if ctx.module(snode.module).name != module {
            return false;
        }
        if step.name != "*" && snode.name != step.name {
            return false;
        }
        step.predicates
            .iter()
            .all(|pred| self.predicate_matches(ctx, idx, pred, module))
    }

    fn predicate_matches(
        &self,
        ctx: &SchemaContext,
        idx: Index,
        pred: &Predicate,
        module: &str,
    ) -> bool {
        match pred {
            Predicate::Content {
                module: pred_module,
                name,
                value,
            } => {
                if name == "." {
                    return self.arena[idx].value.as_deref()
                        == Some(value.as_str());
                }
                let want_module = pred_module.as_deref().unwrap_or(module);
                self.children(Some(idx)).any(|child| {
                    let child_snode = ctx.node(self.arena[child].snode);
                    child_snode.name == *name
                        && ctx.module(child_snode.module).name == want_module
                        && self.arena[child].value.as_deref()
                            == Some(value.as_str())
                })
            }
            Predicate::Text { value } => {
                self.arena[idx].value.as_deref() == Some(value.as_str())
            }
            // Data nodes carry no attributes.
            Predicate::Attribute { .. } => false,
        }
    }

    fn merge_node(
        &mut self,
        ctx: &SchemaContext,
        other: &DataTree,
        other_idx: Index,
        parent: Option<Index>,
    ) -> Result<(), Error> {
        let matched = self
            .children(parent)
            .find(|&idx| self.instances_equal(ctx, idx, other, other_idx));

        match matched {
            Some(idx) => {
                // Duplicate leaves take the fragment's value and flags.
                let other_node = &other.arena[other_idx];
                if other_node.first_child.is_none()
                    && other_node.value.is_some()
                {
                    let node = &mut self.arena[idx];
                    node.value = other_node.value.clone();
                    node.default = other_node.default;
                    node.tagged = other_node.tagged;
                }
                let children: Vec<_> =
                    other.children(Some(other_idx)).collect();
                for child in children {
                    self.merge_node(ctx, other, child, Some(idx))?;
                }
            }
            None => {
                let copy = self.copy_from(other, other_idx, true);
                self.attach(ctx, parent, copy);
            }
        }
        Ok(())
    }

    // Whether a node of this tree and a node of another tree denote the
    // same instance: same schema node, equal key values for keyed lists,
    // equal value for leaf-list entries.
    fn instances_equal(
        &self,
        ctx: &SchemaContext,
        idx: Index,
        other: &DataTree,
        other_idx: Index,
    ) -> bool {
        let node = &self.arena[idx];
        let other_node = &other.arena[other_idx];
        if node.snode != other_node.snode {
            return false;
        }

        match &ctx.node(node.snode).kind {
            SchemaNodeKind::List { keys } => keys.iter().all(|&key| {
                self.key_value(idx, key) == other.key_value(other_idx, key)
            }),
            SchemaNodeKind::LeafList(..) => node.value == other_node.value,
            _ => true,
        }
    }

    fn key_value(&self, idx: Index, key: SchemaNodeId) -> Option<&str> {
        self.children(Some(idx))
            .find(|&child| self.arena[child].snode == key)
            .and_then(|child| self.arena[child].value.as_deref())
    }
}

// ===== impl Siblings =====

pub struct Siblings<'a> {
    tree: &'a DataTree,
    next: Option<Index>,
}

impl Iterator for Siblings<'_> {
    type Item = Index;

    fn next(&mut self) -> Option<Index> {
        let idx = self.next?;
        self.next = self.tree.arena[idx].next_sibling;
        Some(idx)
    }
}

// ===== impl Traverse =====

pub struct Traverse<'a> {
    tree: &'a DataTree,
    stack: Vec<Index>,
}

impl Iterator for Traverse<'_> {
    type Item = Index;

    fn next(&mut self) -> Option<Index> {
        let idx = self.stack.pop()?;
        let node = &self.tree.arena[idx];
        if let Some(next) = node.next_sibling {
            self.stack.push(next);
        }
        if let Some(child) = node.first_child {
            self.stack.push(child);
        }
        Some(idx)
    }
}

// ===== global functions =====

// XML-escapes a string into the writer (text and attribute safe).
pub fn write_escaped(w: &mut impl Write, text: &str) -> std::fmt::Result {
    for ch in text.chars() {
        match ch {
            '&' => w.write_str("&amp;")?,
            '<' => w.write_str("&lt;")?,
            '>' => w.write_str("&gt;")?,
            '"' => w.write_str("&quot;")?,
            '\'' => w.write_str("&apos;")?,
            _ => w.write_char(ch)?,
        }
    }
    Ok(())
}
