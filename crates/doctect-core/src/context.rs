//! Context collection: which nodes a binding on `node` can see.
//!
//! The context set is ordered; text resolution takes the first node that
//! has the requested field, so the order below is the priority order:
//!
//! 1. the node and its ancestors,
//! 2. its reference target and the target's ancestors,
//! 3. every referrer (of the node or of its target) and their ancestors,
//! 4. the node's immediate children, then the target's immediate children.

use crate::id::NodeId;
use crate::model::{Document, Node};
use std::collections::HashSet;

/// Ordered, duplicate-free list of nodes that is searched during binding
/// resolution.
pub fn context_nodes<'a>(doc: &'a Document, node: &'a Node) -> Vec<&'a Node> {
    let mut ctx = ContextSet::default();

    ctx.push_with_ancestors(doc, node);

    let target = node.reference_id.and_then(|id| doc.node(id));
    if let Some(target) = target {
        ctx.push_with_ancestors(doc, target);
    }

    let mut referred: Vec<NodeId> = vec![node.id];
    if let Some(target_id) = node.reference_id
        && target_id != node.id
    {
        referred.push(target_id);
    }
    // Referrers are processed in document order across both ids.
    for referrer in doc.referrers_of_any(&referred) {
        ctx.push_with_ancestors(doc, referrer);
    }

    for child in node.children.iter().filter_map(|&id| doc.node(id)) {
        ctx.push(child);
    }
    if let Some(target) = target {
        for child in target.children.iter().filter_map(|&id| doc.node(id)) {
            ctx.push(child);
        }
    }

    log::trace!("context @{}: {} nodes", node.id, ctx.nodes.len());
    ctx.nodes
}

/// Bindable field names visible from `node`: `title` first, then every data
/// key across the context set in context order.
pub fn available_fields(doc: &Document, node: &Node) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut fields = vec!["title".to_string()];
    seen.insert("title");
    for ctx_node in context_nodes(doc, node) {
        for key in ctx_node.data.keys() {
            if seen.insert(key) {
                fields.push(key.to_string());
            }
        }
    }
    fields
}

#[derive(Default)]
struct ContextSet<'a> {
    nodes: Vec<&'a Node>,
    seen: HashSet<NodeId>,
}

impl<'a> ContextSet<'a> {
    fn push(&mut self, node: &'a Node) {
        if self.seen.insert(node.id) {
            self.nodes.push(node);
        }
    }

    fn push_with_ancestors(&mut self, doc: &'a Document, node: &'a Node) {
        self.push(node);
        for ancestor in doc.ancestors(node) {
            self.push(ancestor);
        }
    }
}
