//! Text binding resolution: `{{field}}` and `{{child_referrer:...}}`.
//!
//! Resolution is two sequential rewrites of the template string:
//!
//! 1. `child_referrer:` placeholders are replaced via the child-referrer
//!    locator (their colons must never be read as a field name);
//! 2. every remaining placeholder is looked up across the context set,
//!    first match wins.
//!
//! Unresolved placeholders become the empty string. Nothing here fails.

use crate::context::context_nodes;
use crate::expr::{ChildReferrerExpr, has_bindings, substitute};
use crate::model::{Document, Element, Node};
use crate::referrer::find_child_referrer;

/// Resolve every placeholder in `template` as seen from `node`.
///
/// Templates without `{{`, and any template when `node` is `None`, are
/// returned unchanged.
pub fn resolve_text(doc: &Document, template: &str, node: Option<&Node>) -> String {
    let Some(node) = node else {
        return template.to_string();
    };
    if !has_bindings(template) {
        return template.to_string();
    }

    let referrers_resolved = substitute(template, |key| {
        ChildReferrerExpr::matches(key)
            .then(|| resolve_child_referrer(doc, node, key).unwrap_or_default())
    });
    if !has_bindings(&referrers_resolved) {
        return referrers_resolved;
    }

    let context = context_nodes(doc, node);
    let resolved = substitute(&referrers_resolved, |key| {
        if key.is_empty() {
            return Some(String::new());
        }
        Some(
            context
                .iter()
                .find_map(|n| field_value(n, key))
                .unwrap_or_default()
                .to_string(),
        )
    });
    log::trace!("resolve_text @{}: {template:?} → {resolved:?}", node.id);
    resolved
}

/// Resolve the label of a text-capable element for `node`.
pub fn resolve_element_text(doc: &Document, element: &Element, node: &Node) -> Option<String> {
    if !element.kind.is_text_capable() {
        return None;
    }
    element
        .text_template()
        .map(|template| resolve_text(doc, &template, Some(node)))
}

/// `title` or a data field of a single node.
fn field_value<'a>(node: &'a Node, key: &str) -> Option<&'a str> {
    if key == "title" {
        Some(node.title.as_str())
    } else {
        node.data.get(key)
    }
}

fn resolve_child_referrer(doc: &Document, node: &Node, key: &str) -> Option<String> {
    let expr = ChildReferrerExpr::parse(key)?;
    let found = find_child_referrer(doc, node, expr.start, expr.count, expr.type_filter)?;
    field_value(found, expr.field).map(str::to_string)
}
