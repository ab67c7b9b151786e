//
// Copyright (c) The netconfd Contributors
//
// SPDX-License-Identifier: MIT
//

use netconfd_yang::data::{DataTree, ValidationMode};
use netconfd_yang::error::Error;
use netconfd_yang::schema::{
    BaseType, LeafSchema, SchemaContext, SchemaNodeKind,
};
use netconfd_yang::xpath::{Path, Predicate};

//
// Helper functions.
//

// A schema with one module:
//
//   container system { leaf hostname; leaf location; }
//   container interfaces {
//     list interface [name] { leaf name; leaf mtu; container stats(state) {
//       leaf in-octets; } }
//   }
fn context() -> SchemaContext {
    let mut ctx = SchemaContext::new();
    let module = ctx.add_module("test", "urn:test");

    let system = ctx.add_node(
        module,
        None,
        "system",
        SchemaNodeKind::Container { presence: false },
        true,
    );
    ctx.add_node(
        module,
        Some(system),
        "hostname",
        SchemaNodeKind::Leaf(LeafSchema::new(BaseType::String)),
        true,
    );
    ctx.add_node(
        module,
        Some(system),
        "location",
        SchemaNodeKind::Leaf(LeafSchema::new(BaseType::String)),
        true,
    );

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
        "mtu",
        SchemaNodeKind::Leaf(LeafSchema::new(BaseType::Uint16)),
        true,
    );
    let stats = ctx.add_node(
        module,
        Some(interface),
        "stats",
        SchemaNodeKind::Container { presence: false },
        false,
    );
    ctx.add_node(
        module,
        Some(stats),
        "in-octets",
        SchemaNodeKind::Leaf(LeafSchema::new(BaseType::Uint64)),
        false,
    );

    ctx
}

fn create(tree: &mut DataTree, ctx: &SchemaContext, path: &str, value: Option<&str>) {
    let path = Path::parse(path).unwrap();
    tree.find_or_create(ctx, &path, value).unwrap();
}

fn xml(tree: &DataTree, ctx: &SchemaContext) -> String {
    let mut out = String::new();
    tree.print_xml(ctx, &mut out).unwrap();
    out
}

//
// Tests.
//

#[test]
fn test_path_parse() {
    let path =
        Path::parse("/test:interfaces/interface[name='eth0']/mtu").unwrap();
    assert_eq!(path.steps.len(), 3);
    assert_eq!(path.steps[0].module.as_deref(), Some("test"));
    assert_eq!(path.steps[1].name, "interface");
    assert_eq!(
        path.steps[1].predicates,
        vec![Predicate::Content {
            module: None,
            name: "name".to_owned(),
            value: "eth0".to_owned(),
        }]
    );
    assert_eq!(
        path.to_string(),
        "/test:interfaces/interface[name='eth0']/mtu"
    );
}

#[test]
fn test_path_parse_predicates() {
    let path = Path::parse(
        "/t:a[text()='v'][@m:attr='w']/b[.='x'][k='']",
    )
    .unwrap();
    assert_eq!(
        path.steps[0].predicates,
        vec![
            Predicate::Text {
                value: "v".to_owned()
            },
            Predicate::Attribute {
                module: "m".to_owned(),
                name: "attr".to_owned(),
                value: "w".to_owned(),
            },
        ]
    );
    // Empty key values are allowed.
    assert_eq!(
        path.steps[1].predicates[1],
        Predicate::Content {
            module: None,
            name: "k".to_owned(),
            value: String::new(),
        }
    );
}

#[test]
fn test_path_parse_errors() {
    for bad in ["", "no-slash", "/", "/a/[x='y']", "/a[unterminated"] {
        assert!(Path::parse(bad).is_err(), "{:?} should not parse", bad);
    }
}

#[test]
fn test_create_update_semantics() {
    let ctx = context();
    let mut tree = DataTree::new();

    create(&mut tree, &ctx, "/test:system/hostname", Some("r1"));
    create(&mut tree, &ctx, "/test:system/hostname", Some("r2"));

    // The leaf was updated, not duplicated.
    assert_eq!(xml(&tree, &ctx), "<system xmlns=\"urn:test\"><hostname>r2</hostname></system>");
}

#[test]
fn test_create_list_keys() {
    let ctx = context();
    let mut tree = DataTree::new();

    // Creating a descendant of a list entry pulls the key in from the
    // path predicate.
    create(
        &mut tree,
        &ctx,
        "/test:interfaces/interface[name='eth0']/mtu",
        Some("1500"),
    );

    assert_eq!(
        xml(&tree, &ctx),
        "<interfaces xmlns=\"urn:test\"><interface><name>eth0</name>\
         <mtu>1500</mtu></interface></interfaces>"
    );
    tree.validate(&ctx, ValidationMode::Get).unwrap();
}

#[test]
fn test_list_instances() {
    let ctx = context();
    let mut tree = DataTree::new();

    create(
        &mut tree,
        &ctx,
        "/test:interfaces/interface[name='eth0']/mtu",
        Some("1500"),
    );
    create(
        &mut tree,
        &ctx,
        "/test:interfaces/interface[name='eth1']/mtu",
        Some("9000"),
    );

    // Two distinct entries, selectable by key.
    let path =
        Path::parse("/test:interfaces/interface[name='eth1']").unwrap();
    let matches = tree.select(&ctx, &path).unwrap();
    assert_eq!(matches.len(), 1);
    let path = Path::parse("/test:interfaces/interface").unwrap();
    assert_eq!(tree.select(&ctx, &path).unwrap().len(), 2);
}

#[test]
fn test_sibling_order_follows_schema() {
    let ctx = context();
    let mut tree = DataTree::new();

    // Created out of schema order on purpose.
    create(&mut tree, &ctx, "/test:system/location", Some("lab"));
    create(&mut tree, &ctx, "/test:system/hostname", Some("r1"));

    assert_eq!(
        xml(&tree, &ctx),
        "<system xmlns=\"urn:test\"><hostname>r1</hostname>\
         <location>lab</location></system>"
    );
}

#[test]
fn test_select_wildcard_and_predicates() {
    let ctx = context();
    let mut tree = DataTree::new();

    create(&mut tree, &ctx, "/test:system/hostname", Some("r1"));
    create(
        &mut tree,
        &ctx,
        "/test:interfaces/interface[name='eth0']/mtu",
        Some("1500"),
    );

    // Wildcard matches every top-level node of the module.
    let path = Path::parse("/test:*").unwrap();
    assert_eq!(tree.select(&ctx, &path).unwrap().len(), 2);

    // Content predicate on a non-key leaf.
    let path =
        Path::parse("/test:interfaces/interface[mtu='1500']").unwrap();
    assert_eq!(tree.select(&ctx, &path).unwrap().len(), 1);

    // text() matches the node's own value.
    let path = Path::parse("/test:system/hostname[text()='r1']").unwrap();
    assert_eq!(tree.select(&ctx, &path).unwrap().len(), 1);

    // Attribute predicates never match data nodes.
    let path =
        Path::parse("/test:system/hostname[@test:flag='x']").unwrap();
    assert!(tree.select(&ctx, &path).unwrap().is_empty());
}

#[test]
fn test_merge() {
    let ctx = context();

    let mut target = DataTree::new();
    create(&mut target, &ctx, "/test:system/hostname", Some("r1"));
    create(
        &mut target,
        &ctx,
        "/test:interfaces/interface[name='eth0']/mtu",
        Some("1500"),
    );

    let mut fragment = DataTree::new();
    create(&mut fragment, &ctx, "/test:system/hostname", Some("r9"));
    create(
        &mut fragment,
        &ctx,
        "/test:interfaces/interface[name='eth1']/mtu",
        Some("9000"),
    );

    target.merge(&ctx, fragment).unwrap();

    // Duplicate leaves take the fragment's value; new entries attach.
    assert_eq!(
        xml(&target, &ctx),
        "<system xmlns=\"urn:test\"><hostname>r9</hostname></system>\
         <interfaces xmlns=\"urn:test\"><interface><name>eth0</name>\
         <mtu>1500</mtu></interface><interface><name>eth1</name>\
         <mtu>9000</mtu></interface></interfaces>"
    );
}

#[test]
fn test_validate_missing_key() {
    let ctx = context();
    let mut tree = DataTree::new();

    // Build a list entry without its key by hand.
    let interfaces_path = Path::parse("/test:interfaces").unwrap();
    let interfaces =
        tree.find_or_create(&ctx, &interfaces_path, None).unwrap();
    let interface_snode = ctx
        .resolve_child(
            Some(tree.snode(interfaces)),
            ctx.module_by_name("test").unwrap().0,
            "interface",
        )
        .unwrap();
    let entry = tree.new_node(interface_snode, None);
    tree.attach(&ctx, Some(interfaces), entry);

    assert!(matches!(
        tree.validate(&ctx, ValidationMode::Get),
        Err(Error::Validation(..))
    ));
}

#[test]
fn test_validate_config_only() {
    let ctx = context();
    let mut tree = DataTree::new();

    create(
        &mut tree,
        &ctx,
        "/test:interfaces/interface[name='eth0']/stats/in-octets",
        Some("1"),
    );

    tree.validate(&ctx, ValidationMode::Get).unwrap();
    assert!(matches!(
        tree.validate(&ctx, ValidationMode::GetConfig),
        Err(Error::Validation(..))
    ));
}

#[test]
fn test_remove() {
    let ctx = context();
    let mut tree = DataTree::new();

    create(&mut tree, &ctx, "/test:system/hostname", Some("r1"));
    let path = Path::parse("/test:system/hostname").unwrap();
    let hostname = tree.select(&ctx, &path).unwrap()[0];

    tree.remove(hostname);
    assert!(!tree.contains(hostname));
    assert_eq!(xml(&tree, &ctx), "<system xmlns=\"urn:test\"/>");
}

#[test]
fn test_print_xml_escaping() {
    let ctx = context();
    let mut tree = DataTree::new();

    create(&mut tree, &ctx, "/test:system/hostname", Some("a<b>&'\"c"));
    assert_eq!(
        xml(&tree, &ctx),
        "<system xmlns=\"urn:test\"><hostname>a&lt;b&gt;&amp;&apos;&quot;c\
         </hostname></system>"
    );
}

#[test]
fn test_default_flags() {
    let ctx = context();
    let mut tree = DataTree::new();

    create(&mut tree, &ctx, "/test:system/hostname", Some("r1"));
    let path = Path::parse("/test:system/hostname").unwrap();
    let hostname = tree.select(&ctx, &path).unwrap()[0];

    assert!(!tree.is_default(hostname));
    tree.set_default(hostname, true);
    assert!(tree.is_default(hostname));
}
