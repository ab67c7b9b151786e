//
// Copyright (c) The netconfd Contributors
//
// SPDX-License-Identifier: MIT
//
//! Subtree-filter compilation (RFC 6241 section 6).
//!
//! A subtree filter is a forest of XML elements classified as containment,
//! selection or content-match nodes. The compiler translates each filter
//! subtree into one or more absolute XPath expressions executable against
//! the datastore: content matches become predicates (and additionally emit
//! a selection form so the matched leaf itself appears in the output),
//! sibling containment/selection nodes branch the accumulated path prefix.
//!
//! Elements carrying a namespace no module implements compile to nothing:
//! such a filter matches no data by definition. The NETCONF base namespace
//! is transparent to module resolution.

use std::fmt::Write;

use netconfd_yang::NETCONF_BASE_NS;
use netconfd_yang::schema::SchemaContext;
use roxmltree::Node;

// Compiles the children of a `<filter>` element into datastore XPaths.
pub fn from_subtree(ctx: &SchemaContext, filter: Node<'_, '_>) -> Vec<String> {
    let mut xpaths = Vec::new();

    for root in filter.children().filter(|node| node.is_element()) {
        // A namespaced root resolves to exactly one module. A root without
        // a namespace (permitted legacy) is tried against every module
        // with a matching top-level node.
        let modules: Vec<(&str, &str)> = match root.tag_name().namespace() {
            Some(ns) if ns != NETCONF_BASE_NS => {
                match ctx.module_by_namespace(ns) {
                    Some((_, module)) => {
                        vec![(module.name.as_str(), module.namespace.as_str())]
                    }
                    // Unknown namespace: the match is empty by definition.
                    None => continue,
                }
            }
            _ => ctx
                .modules()
                .filter(|(id, _)| {
                    ctx.has_top_level_node(*id, root.tag_name().name())
                })
                .map(|(_, module)| {
                    (module.name.as_str(), module.namespace.as_str())
                })
                .collect(),
        };

        for (module_name, module_ns) in modules {
            if is_content_match(root) {
                compile_top_content(ctx, root, module_name, &mut xpaths);
            } else {
                compile_node(
                    ctx,
                    root,
                    Some(module_name),
                    module_ns,
                    String::new(),
                    &mut xpaths,
                );
            }
        }
    }

    xpaths
}

// One XPath per module owning top-level data, for an unfiltered get.
pub fn unfiltered(ctx: &SchemaContext) -> Vec<String> {
    ctx.modules()
        .filter(|(id, _)| ctx.has_data_nodes(*id))
        .map(|(_, module)| format!("/{}:*", module.name))
        .collect()
}

// ===== helper functions =====

// Compiles one containment/selection element and everything below it,
// extending `prefix` (the XPath accumulated so far).
fn compile_node(
    ctx: &SchemaContext,
    elem: Node<'_, '_>,
    module_name: Option<&str>,
    last_ns: &str,
    prefix: String,
    out: &mut Vec<String>,
) {
    let Some((step, mut last_ns)) =
        qualified_step(ctx, elem, module_name, last_ns)
    else {
        // Unknown namespace kills the whole branch, silently.
        return;
    };
    let mut acc = prefix;
    acc.push('/');
    acc.push_str(&step);

    // Content-match children turn into predicates on the accumulator, in
    // document order. Each one also emits a selection-form XPath so the
    // matched node itself is present in the reply.
    let mut remaining = Vec::new();
    for child in elem.children().filter(|node| node.is_element()) {
        if !is_content_match(child) {
            remaining.push(child);
            continue;
        }

        let Some((pred_step, pred_ns)) =
            qualified_step(ctx, child, None, &last_ns)
        else {
            return;
        };
        last_ns = pred_ns;
        acc.push('[');
        acc.push_str(&pred_step);
        acc.push_str("='");
        acc.push_str(trimmed_text(child));
        acc.push_str("']");

        let Some((sel_step, sel_ns)) =
            qualified_step(ctx, child, None, &last_ns)
        else {
            return;
        };
        last_ns = sel_ns;
        out.push(format!("{}/{}", acc, sel_step));
    }

    // Nothing left below: the accumulator is a finished XPath.
    if remaining.is_empty() {
        out.push(acc);
        return;
    }

    // Branch on every remaining child; the last one consumes the
    // accumulator, the others clone it.
    let count = remaining.len();
    for (position, child) in remaining.into_iter().enumerate() {
        let branch = if position + 1 == count {
            std::mem::take(&mut acc)
        } else {
            acc.clone()
        };

        if child.children().any(|node| node.is_element()) {
            // Containment node.
            compile_node(ctx, child, None, &last_ns, branch, out);
        } else {
            // Selection node.
            let Some((sel_step, sel_ns)) =
                qualified_step(ctx, child, None, &last_ns)
            else {
                continue;
            };
            last_ns = sel_ns;
            out.push(format!("{}/{}", branch, sel_step));
        }
    }
}

// A whole filter root consisting of a single content match:
// /module:name[text()='value'].
fn compile_top_content(
    ctx: &SchemaContext,
    elem: Node<'_, '_>,
    module_name: &str,
    out: &mut Vec<String>,
) {
    out.push(format!(
        "/{}:{}[text()='{}']{}",
        module_name,
        elem.tag_name().name(),
        trimmed_text(elem),
        attribute_predicates(ctx, elem)
    ));
}

// The element's path step with attribute predicates appended, qualified
// with a module prefix when the namespace changes. Returns None when the
// element's namespace resolves to no module; the base NETCONF namespace
// neither qualifies nor updates the tracked namespace.
fn qualified_step(
    ctx: &SchemaContext,
    elem: Node<'_, '_>,
    module_name: Option<&str>,
    last_ns: &str,
) -> Option<(String, String)> {
    let mut prefix = module_name.map(str::to_owned);
    let mut new_last_ns = last_ns.to_owned();

    if prefix.is_none()
        && let Some(ns) = elem.tag_name().namespace()
        && ns != last_ns
        && ns != NETCONF_BASE_NS
    {
        let (_, module) = ctx.module_by_namespace(ns)?;
        prefix = Some(module.name.clone());
        new_last_ns = ns.to_owned();
    }

    let mut step = String::new();
    if let Some(prefix) = &prefix {
        step.push_str(prefix);
        step.push(':');
    }
    step.push_str(elem.tag_name().name());
    step.push_str(&attribute_predicates(ctx, elem));
    Some((step, new_last_ns))
}

// [@module:attr='value'] for every attribute whose namespace resolves to
// a module. Attributes without a namespace, or with an unknown one, would
// never match anything and are silently dropped.
fn attribute_predicates(ctx: &SchemaContext, elem: Node<'_, '_>) -> String {
    let mut predicates = String::new();
    for attr in elem.attributes() {
        let Some(ns) = attr.namespace() else {
            continue;
        };
        let Some((_, module)) = ctx.module_by_namespace(ns) else {
            continue;
        };
        let _ = write!(
            predicates,
            "[@{}:{}='{}']",
            module.name,
            attr.name(),
            attr.value()
        );
    }
    predicates
}

// RFC 6241 section 6.2.5: no child elements and non-whitespace text.
fn is_content_match(elem: Node<'_, '_>) -> bool {
    !elem.children().any(|node| node.is_element())
        && !trimmed_text(elem).is_empty()
}

fn trimmed_text<'a>(elem: Node<'a, '_>) -> &'a str {
    elem.text().unwrap_or("").trim()
}
