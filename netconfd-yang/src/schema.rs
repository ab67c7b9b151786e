//
// Copyright (c) The netconfd Contributors
//
// SPDX-License-Identifier: MIT
//

use crate::error::Error;
use crate::xpath::Path;

// Handle of a module installed in a schema context.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct ModuleId(usize);

// Handle of a schema node installed in a schema context.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct SchemaNodeId(usize);

// Handle of a typedef installed in a schema context.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct TypedefId(usize);

// Registry of loaded YANG modules and their schema trees.
//
// The context is populated at startup through the installation methods and
// only read afterwards. The read path never mutates it; module installs
// require exclusive access (the server wraps the context in a RwLock).
#[derive(Debug, Default)]
pub struct SchemaContext {
    modules: Vec<Module>,
    nodes: Vec<SchemaNode>,
    typedefs: Vec<Typedef>,
}

#[derive(Debug)]
pub struct Module {
    pub name: String,
    pub namespace: String,
    top_level: Vec<SchemaNodeId>,
}

#[derive(Debug)]
pub struct SchemaNode {
    pub module: ModuleId,
    pub name: String,
    pub kind: SchemaNodeKind,
    pub config: bool,
    parent: Option<SchemaNodeId>,
    children: Vec<SchemaNodeId>,
}

#[derive(Debug)]
pub enum SchemaNodeKind {
    Container { presence: bool },
    List { keys: Vec<SchemaNodeId> },
    Leaf(LeafSchema),
    LeafList(LeafSchema),
    AnyXml,
    Rpc,
    Notification,
}

#[derive(Debug)]
pub struct LeafSchema {
    pub base: BaseType,
    pub default: Option<String>,
    pub typedef: Option<TypedefId>,
}

// YANG built-in types, resolved to the base of the typedef chain.
//
// `LeafRef` and `Union` are listed so that schema installation can express
// them; the value codec rejects both.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum BaseType {
    Binary,
    // Bit names in schema declaration order.
    Bits(Vec<String>),
    Bool,
    // Declared fraction-digits.
    Decimal64(u8),
    Empty,
    Enumeration,
    IdentityRef,
    InstanceId,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    String,
    LeafRef,
    Union,
}

#[derive(Debug)]
pub struct Typedef {
    pub default: Option<String>,
    pub parent: Option<TypedefId>,
}

// ===== impl SchemaContext =====

impl SchemaContext {
    pub fn new() -> SchemaContext {
        Default::default()
    }

    // ----- installation -----

    pub fn add_module(&mut self, name: &str, namespace: &str) -> ModuleId {
        let id = ModuleId(self.modules.len());
        self.modules.push(Module {
            name: name.to_owned(),
            namespace: namespace.to_owned(),
            top_level: Vec::new(),
        });
        id
    }

    pub fn add_typedef(
        &mut self,
        default: Option<&str>,
        parent: Option<TypedefId>,
    ) -> TypedefId {
        let id = TypedefId(self.typedefs.len());
        self.typedefs.push(Typedef {
            default: default.map(str::to_owned),
            parent,
        });
        id
    }

    // Installs a schema node under the given parent (or at the module top
    // level). Children are recorded in installation order, which is the
    // schema-declared order.
    pub fn add_node(
        &mut self,
        module: ModuleId,
        parent: Option<SchemaNodeId>,
        name: &str,
        kind: SchemaNodeKind,
        config: bool,
    ) -> SchemaNodeId {
        let id = SchemaNodeId(self.nodes.len());
        self.nodes.push(SchemaNode {
            module,
            name: name.to_owned(),
            kind,
            config,
            parent,
            children: Vec::new(),
        });
        match parent {
            Some(parent) => self.nodes[parent.0].children.push(id),
            None => self.modules[module.0].top_level.push(id),
        }
        id
    }

    // Declares the key leaves of a list, in key declaration order. The keys
    // must already be installed as children of the list.
    pub fn set_list_keys(&mut self, list: SchemaNodeId, keys: &[SchemaNodeId]) {
        let node = &mut self.nodes[list.0];
        match &mut node.kind {
            SchemaNodeKind::List { keys: list_keys } => {
                *list_keys = keys.to_vec();
            }
            _ => unreachable!("set_list_keys on a non-list schema node"),
        }
    }

    // ----- lookup -----

    pub fn modules(&self) -> impl Iterator<Item = (ModuleId, &Module)> {
        self.modules
            .iter()
            .enumerate()
            .map(|(id, module)| (ModuleId(id), module))
    }

    pub fn module(&self, id: ModuleId) -> &Module {
        &self.modules[id.0]
    }

    pub fn module_by_namespace(
        &self,
        namespace: &str,
    ) -> Option<(ModuleId, &Module)> {
        self.modules()
            .find(|(_, module)| module.namespace == namespace)
    }

    pub fn module_by_name(&self, name: &str) -> Option<(ModuleId, &Module)> {
        self.modules().find(|(_, module)| module.name == name)
    }

    pub fn node(&self, id: SchemaNodeId) -> &SchemaNode {
        &self.nodes[id.0]
    }

    pub fn parent(&self, id: SchemaNodeId) -> Option<SchemaNodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(
        &self,
        id: SchemaNodeId,
    ) -> impl Iterator<Item = SchemaNodeId> + '_ {
        self.nodes[id.0].children.iter().copied()
    }

    pub fn top_level(
        &self,
        module: ModuleId,
    ) -> impl Iterator<Item = SchemaNodeId> + '_ {
        self.modules[module.0].top_level.iter().copied()
    }

    // Resolves one data-path step: a child of `parent` (or a top-level node
    // of `module` when `parent` is None) with the given name. The module
    // matters for augmented containers, where children from different
    // modules share a parent.
    pub fn resolve_child(
        &self,
        parent: Option<SchemaNodeId>,
        module: ModuleId,
        name: &str,
    ) -> Option<SchemaNodeId> {
        let mut children = match parent {
            Some(parent) => self.nodes[parent.0].children.iter(),
            None => self.modules[module.0].top_level.iter(),
        };
        children
            .find(|id| {
                let node = &self.nodes[id.0];
                node.module == module && node.name == name
            })
            .copied()
    }

    // Resolves a parsed data path to its schema node. Predicates are
    // ignored; steps without a module prefix inherit the previous step's
    // module. The first step must carry a prefix.
    pub fn node_at(&self, path: &Path) -> Result<SchemaNodeId, Error> {
        let mut snode = None;
        let mut module = None;

        for step in &path.steps {
            let step_module = match &step.module {
                Some(name) => {
                    let (id, _) = self
                        .module_by_name(name)
                        .ok_or_else(|| Error::UnknownModule(name.clone()))?;
                    Some(id)
                }
                None => module,
            };
            let step_module = step_module
                .ok_or_else(|| Error::BadPath(path.to_string()))?;
            snode = Some(
                self.resolve_child(snode, step_module, &step.name)
                    .ok_or_else(|| Error::UnknownNode(path.to_string()))?,
            );
            module = Some(step_module);
        }

        snode.ok_or_else(|| Error::BadPath(path.to_string()))
    }

    // ----- schema properties -----

    pub fn is_presence_container(&self, id: SchemaNodeId) -> bool {
        matches!(
            self.nodes[id.0].kind,
            SchemaNodeKind::Container { presence: true }
        )
    }

    // A list with at least one declared key.
    pub fn is_keyed_list(&self, id: SchemaNodeId) -> bool {
        matches!(&self.nodes[id.0].kind, SchemaNodeKind::List { keys } if !keys.is_empty())
    }

    pub fn list_keys(&self, id: SchemaNodeId) -> &[SchemaNodeId] {
        match &self.nodes[id.0].kind {
            SchemaNodeKind::List { keys } => keys,
            _ => &[],
        }
    }

    pub fn is_list_key(&self, id: SchemaNodeId) -> bool {
        self.nodes[id.0]
            .parent
            .map(|parent| self.list_keys(parent).contains(&id))
            .unwrap_or(false)
    }

    pub fn leaf_schema(&self, id: SchemaNodeId) -> Option<&LeafSchema> {
        match &self.nodes[id.0].kind {
            SchemaNodeKind::Leaf(leaf) | SchemaNodeKind::LeafList(leaf) => {
                Some(leaf)
            }
            _ => None,
        }
    }

    // The default effectively declared for a leaf: the leaf's own default,
    // or the first default found walking up the typedef chain.
    pub fn effective_default<'a>(&'a self, leaf: &'a LeafSchema) -> Option<&'a str> {
        if let Some(default) = &leaf.default {
            return Some(default);
        }
        let mut typedef = leaf.typedef;
        while let Some(id) = typedef {
            let tpdf = &self.typedefs[id.0];
            if let Some(default) = &tpdf.default {
                return Some(default);
            }
            typedef = tpdf.parent;
        }
        None
    }

    // Position of a node among its parent's schema-declared children, used
    // for sibling ordering. Top-level nodes order by module then position.
    pub fn child_position(&self, id: SchemaNodeId) -> (usize, usize) {
        let node = &self.nodes[id.0];
        match node.parent {
            Some(parent) => {
                let pos = self.nodes[parent.0]
                    .children
                    .iter()
                    .position(|child| *child == id)
                    .unwrap_or(usize::MAX);
                (0, pos)
            }
            None => {
                let pos = self.modules[node.module.0]
                    .top_level
                    .iter()
                    .position(|child| *child == id)
                    .unwrap_or(usize::MAX);
                (node.module.0, pos)
            }
        }
    }

    // Whether the module defines at least one top-level data node (not an
    // RPC or notification). Modules without data contribute nothing to an
    // unfiltered get.
    pub fn has_data_nodes(&self, module: ModuleId) -> bool {
        self.modules[module.0].top_level.iter().any(|id| {
            !matches!(
                self.nodes[id.0].kind,
                SchemaNodeKind::Rpc | SchemaNodeKind::Notification
            )
        })
    }

    // Whether the module has a top-level data node with the given name.
    // Used to resolve namespace-less filter roots.
    pub fn has_top_level_node(&self, module: ModuleId, name: &str) -> bool {
        self.modules[module.0].top_level.iter().any(|id| {
            let node = &self.nodes[id.0];
            node.name == name
                && !matches!(
                    node.kind,
                    SchemaNodeKind::Rpc | SchemaNodeKind::Notification
                )
        })
    }
}

// ===== impl LeafSchema =====

impl LeafSchema {
    pub fn new(base: BaseType) -> LeafSchema {
        LeafSchema {
            base,
            default: None,
            typedef: None,
        }
    }

    #[must_use]
    pub fn with_default(mut self, default: &str) -> LeafSchema {
        self.default = Some(default.to_owned());
        self
    }

    #[must_use]
    pub fn with_typedef(mut self, typedef: TypedefId) -> LeafSchema {
        self.typedef = Some(typedef);
        self
    }
}
