//
// Copyright (c) The netconfd Contributors
//
// SPDX-License-Identifier: MIT
//

#![allow(dead_code)]

use std::sync::Arc;

use netconfd_datastore::mem::{MemDatastore, MemItem};
use netconfd_datastore::{DatastoreType, DatastoreValue};
use netconfd_server::Server;
use netconfd_server::config::Config;
use netconfd_server::session::Session;
use netconfd_yang::data::DataTree;
use netconfd_yang::schema::{
    BaseType, LeafSchema, SchemaContext, SchemaNodeKind,
};
use netconfd_yang::xpath::Path;

pub const IF_NS: &str = "urn:ietf-interfaces";
pub const X_NS: &str = "urn:x";
pub const NCM_NS: &str = "urn:ietf:params:xml:ns:yang:ietf-netconf-monitoring";
pub const YANGLIB_NS: &str = "urn:ietf:params:xml:ns:yang:ietf-yang-library";

// The schema used by the read-path tests:
//
//   ietf-interfaces: container interfaces {
//     list interface [name] { leaf name; leaf description;
//       leaf enabled (default "true"); leaf mtu (default "1500");
//       container statistics(state) { leaf in-octets; } } }
//   x: container c { leaf y (default "dy"); leaf z; }
//   t: container vals { price/tiny(decimal64), flags(bits), kind(identityref),
//      raw(binary), count(uint8), active(bool), marker(empty),
//      chain(leafref), mixed(union) }
//   ietf-netconf-monitoring, ietf-yang-library, nc-notifications: state
//   trees served from local data.
pub fn context() -> SchemaContext {
    let mut ctx = SchemaContext::new();

    // ietf-interfaces.
    let module = ctx.add_module("ietf-interfaces", IF_NS);
    let interfaces = ctx.add_node(
        module,
        None,
        "interfaces",
        SchemaNodeKind::Container { presence: false },
        true,
    );
    let interface = ctx.add_node(
        module,
        Some(interfaces),
        "interface",
        SchemaNodeKind::List { keys: vec![] },
        true,
    );
    let name = ctx.add_node(
        module,
        Some(interface),
        "name",
        SchemaNodeKind::Leaf(LeafSchema::new(BaseType::String)),
        true,
    );
    ctx.set_list_keys(interface, &[name]);
    ctx.add_node(
        module,
        Some(interface),
        "description",
        SchemaNodeKind::Leaf(LeafSchema::new(BaseType::String)),
        true,
    );
    ctx.add_node(
        module,
        Some(interface),
        "enabled",
        SchemaNodeKind::Leaf(
            LeafSchema::new(BaseType::Bool).with_default("true"),
        ),
        true,
    );
    ctx.add_node(
        module,
        Some(interface),
        "mtu",
        SchemaNodeKind::Leaf(
            LeafSchema::new(BaseType::Uint16).with_default("1500"),
        ),
        true,
    );
    let statistics = ctx.add_node(
        module,
        Some(interface),
        "statistics",
        SchemaNodeKind::Container { presence: false },
        false,
    );
    ctx.add_node(
        module,
        Some(statistics),
        "in-octets",
        SchemaNodeKind::Leaf(LeafSchema::new(BaseType::Uint64)),
        false,
    );

    // x, for the with-defaults scenarios. The typedef behind `y` carries
    // the default.
    let module = ctx.add_module("x", X_NS);
    let c = ctx.add_node(
        module,
        None,
        "c",
        SchemaNodeKind::Container { presence: false },
        true,
    );
    let typedef = ctx.add_typedef(Some("dy"), None);
    ctx.add_node(
        module,
        Some(c),
        "y",
        SchemaNodeKind::Leaf(
            LeafSchema::new(BaseType::String).with_typedef(typedef),
        ),
        true,
    );
    ctx.add_node(
        module,
        Some(c),
        "z",
        SchemaNodeKind::Leaf(LeafSchema::new(BaseType::String)),
        true,
    );

    // t, covering the value codec types.
    let module = ctx.add_module("t", "urn:t");
    let vals = ctx.add_node(
        module,
        None,
        "vals",
        SchemaNodeKind::Container { presence: false },
        true,
    );
    ctx.add_node(
        module,
        Some(vals),
        "price",
        SchemaNodeKind::Leaf(LeafSchema::new(BaseType::Decimal64(2))),
        true,
    );
    ctx.add_node(
        module,
        Some(vals),
        "tiny",
        SchemaNodeKind::Leaf(LeafSchema::new(BaseType::Decimal64(18))),
        true,
    );
    ctx.add_node(
        module,
        Some(vals),
        "flags",
        SchemaNodeKind::Leaf(LeafSchema::new(BaseType::Bits(vec![
            "alpha".to_owned(),
            "beta".to_owned(),
            "gamma".to_owned(),
        ]))),
        true,
    );
    ctx.add_node(
        module,
        Some(vals),
        "kind",
        SchemaNodeKind::Leaf(LeafSchema::new(BaseType::IdentityRef)),
        true,
    );
    ctx.add_node(
        module,
        Some(vals),
        "raw",
        SchemaNodeKind::Leaf(LeafSchema::new(BaseType::Binary)),
        true,
    );
    ctx.add_node(
        module,
        Some(vals),
        "count",
        SchemaNodeKind::Leaf(LeafSchema::new(BaseType::Uint8)),
        true,
    );
    ctx.add_node(
        module,
        Some(vals),
        "active",
        SchemaNodeKind::Leaf(LeafSchema::new(BaseType::Bool)),
        true,
    );
    ctx.add_node(
        module,
        Some(vals),
        "marker",
        SchemaNodeKind::Leaf(LeafSchema::new(BaseType::Empty)),
        true,
    );
    ctx.add_node(
        module,
        Some(vals),
        "chain",
        SchemaNodeKind::Leaf(LeafSchema::new(BaseType::LeafRef)),
        true,
    );
    ctx.add_node(
        module,
        Some(vals),
        "mixed",
        SchemaNodeKind::Leaf(LeafSchema::new(BaseType::Union)),
        true,
    );

    // Modules served from local data trees.
    let module = ctx.add_module("ietf-netconf-monitoring", NCM_NS);
    let state = ctx.add_node(
        module,
        None,
        "netconf-state",
        SchemaNodeKind::Container { presence: false },
        false,
    );
    let statistics = ctx.add_node(
        module,
        Some(state),
        "statistics",
        SchemaNodeKind::Container { presence: false },
        false,
    );
    ctx.add_node(
        module,
        Some(statistics),
        "in-sessions",
        SchemaNodeKind::Leaf(LeafSchema::new(BaseType::Uint32)),
        false,
    );

    let module = ctx.add_module("ietf-yang-library", YANGLIB_NS);
    let modules_state = ctx.add_node(
        module,
        None,
        "modules-state",
        SchemaNodeKind::Container { presence: false },
        false,
    );
    ctx.add_node(
        module,
        Some(modules_state),
        "module-set-id",
        SchemaNodeKind::Leaf(LeafSchema::new(BaseType::String)),
        false,
    );
    let entry = ctx.add_node(
        module,
        Some(modules_state),
        "module",
        SchemaNodeKind::List { keys: vec![] },
        false,
    );
    let entry_name = ctx.add_node(
        module,
        Some(entry),
        "name",
        SchemaNodeKind::Leaf(LeafSchema::new(BaseType::String)),
        false,
    );
    let entry_revision = ctx.add_node(
        module,
        Some(entry),
        "revision",
        SchemaNodeKind::Leaf(LeafSchema::new(BaseType::String)),
        false,
    );
    ctx.set_list_keys(entry, &[entry_name, entry_revision]);
    ctx.add_node(
        module,
        Some(entry),
        "namespace",
        SchemaNodeKind::Leaf(LeafSchema::new(BaseType::String)),
        false,
    );

    let module = ctx
        .add_module("nc-notifications", "urn:ietf:params:xml:ns:netmod:notification");
    let netconf = ctx.add_node(
        module,
        None,
        "netconf",
        SchemaNodeKind::Container { presence: false },
        false,
    );
    let streams = ctx.add_node(
        module,
        Some(netconf),
        "streams",
        SchemaNodeKind::Container { presence: false },
        false,
    );
    ctx.add_node(
        module,
        Some(streams),
        "stream",
        SchemaNodeKind::Leaf(LeafSchema::new(BaseType::String)),
        false,
    );

    ctx
}

// Running datastore contents backing the end-to-end scenarios.
pub fn datastore() -> MemDatastore {
    let ds = MemDatastore::new();
    ds.set_items(
        DatastoreType::Running,
        vec![
            MemItem::new(
                "/ietf-interfaces:interfaces".to_owned(),
                DatastoreValue::Container,
                false,
                true,
            ),
            MemItem::new(
                "/ietf-interfaces:interfaces/interface[name='eth0']"
                    .to_owned(),
                DatastoreValue::List,
                false,
                true,
            ),
            MemItem::new(
                "/ietf-interfaces:interfaces/interface[name='eth0']/name"
                    .to_owned(),
                DatastoreValue::String("eth0".to_owned()),
                false,
                true,
            ),
            MemItem::new(
                "/ietf-interfaces:interfaces/interface[name='eth0']/description"
                    .to_owned(),
                DatastoreValue::String("uplink".to_owned()),
                false,
                true,
            ),
            // Never configured: carries the schema default.
            MemItem::new(
                "/ietf-interfaces:interfaces/interface[name='eth0']/enabled"
                    .to_owned(),
                DatastoreValue::Bool(true),
                true,
                true,
            ),
            // Explicitly configured to a value equal to the default.
            MemItem::new(
                "/ietf-interfaces:interfaces/interface[name='eth0']/mtu"
                    .to_owned(),
                DatastoreValue::Uint16(1500),
                false,
                true,
            ),
            MemItem::new(
                "/ietf-interfaces:interfaces/interface[name='eth0']/statistics"
                    .to_owned(),
                DatastoreValue::Container,
                false,
                false,
            ),
            MemItem::new(
                "/ietf-interfaces:interfaces/interface[name='eth0']/statistics/in-octets"
                    .to_owned(),
                DatastoreValue::Uint64(123456),
                false,
                false,
            ),
            MemItem::new(
                "/x:c".to_owned(),
                DatastoreValue::Container,
                false,
                true,
            ),
            // Value equal to the typedef default, but explicitly set.
            MemItem::new(
                "/x:c/y".to_owned(),
                DatastoreValue::String("dy".to_owned()),
                false,
                true,
            ),
            MemItem::new(
                "/x:c/z".to_owned(),
                DatastoreValue::String("zz".to_owned()),
                false,
                true,
            ),
        ],
    );
    ds
}

// Local data trees for the self-served state modules.
pub fn install_local_data(server: &Server) {
    let schema = server.schema();

    let mut ncm = DataTree::new();
    let path = Path::parse(
        "/ietf-netconf-monitoring:netconf-state/statistics/in-sessions",
    )
    .unwrap();
    ncm.find_or_create(&schema, &path, Some("42")).unwrap();

    let mut yanglib = DataTree::new();
    let path =
        Path::parse("/ietf-yang-library:modules-state/module-set-id").unwrap();
    yanglib.find_or_create(&schema, &path, Some("c0ffee")).unwrap();
    let path = Path::parse(
        "/ietf-yang-library:modules-state/module[name='ietf-interfaces']\
         [revision='2018-02-20']/namespace",
    )
    .unwrap();
    yanglib
        .find_or_create(&schema, &path, Some(IF_NS))
        .unwrap();

    drop(schema);
    server.set_local_data("ietf-netconf-monitoring", ncm);
    server.set_local_data("ietf-yang-library", yanglib);
}

// A fully wired server plus one session against the in-memory backend.
pub fn setup() -> (Arc<Server>, Arc<Session>, MemDatastore) {
    let ds = datastore();
    let server = Arc::new(Server::new(context(), Config::default()));
    install_local_data(&server);
    let session = Arc::new(Session::new(Box::new(ds.session())));
    (server, session, ds)
}

pub fn rpc_get(body: &str) -> String {
    format!(
        "<rpc message-id=\"101\" \
         xmlns=\"urn:ietf:params:xml:ns:netconf:base:1.0\">\
         <get>{}</get></rpc>",
        body
    )
}

pub fn rpc_get_config(source: &str, body: &str) -> String {
    format!(
        "<rpc message-id=\"101\" \
         xmlns=\"urn:ietf:params:xml:ns:netconf:base:1.0\">\
         <get-config><source><{}/></source>{}</get-config></rpc>",
        source, body
    )
}

pub fn reply_with_data(data: &str) -> String {
    match data.is_empty() {
        true => "<rpc-reply \
                 xmlns=\"urn:ietf:params:xml:ns:netconf:base:1.0\" \
                 message-id=\"101\"><data/></rpc-reply>"
            .to_owned(),
        false => format!(
            "<rpc-reply xmlns=\"urn:ietf:params:xml:ns:netconf:base:1.0\" \
             message-id=\"101\"><data>{}</data></rpc-reply>",
            data
        ),
    }
}
