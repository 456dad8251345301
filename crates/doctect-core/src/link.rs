//! Link target resolution: symbolic `linkTarget` → concrete node.
//!
//! The resolver only reports presence or absence; whether an absent link is
//! drawn inert or dropped is up to the page planner.

use crate::expr::parse_int_prefix;
use crate::id::NodeId;
use crate::model::{Document, LinkSpec, LinkTarget, Node};
use crate::referrer::find_child_referrer;

/// Resolve `link` as seen from `node`. `url` and `none` never resolve to a node.
pub fn resolve_link_target<'a>(doc: &'a Document, node: &Node, link: &LinkSpec) -> Option<&'a Node> {
    let value = link.link_value.as_str();
    let resolved = match link.link_target {
        LinkTarget::None | LinkTarget::Url => None,
        LinkTarget::Parent => doc.parent(node),
        LinkTarget::ChildIndex => parse_int_prefix(value)
            .and_then(|i| usize::try_from(i).ok())
            .and_then(|i| node.children.get(i))
            .and_then(|&id| doc.node(id)),
        LinkTarget::SpecificNode => doc.node_by_str(value.trim()),
        LinkTarget::Sibling => parse_int_prefix(value).and_then(|delta| sibling(doc, node, delta)),
        LinkTarget::Ancestor => {
            let hops = parse_int_prefix(value).unwrap_or(1).max(1);
            usize::try_from(hops - 1)
                .ok()
                .and_then(|n| doc.ancestors(node).nth(n))
        }
        LinkTarget::Referrer => {
            let my_id = node.reference_id.unwrap_or(node.id);
            doc.referrers(my_id).next().and_then(|r| doc.parent(r))
        }
        LinkTarget::ChildReferrer => find_child_referrer(
            doc,
            node,
            value,
            &link.link_secondary_value,
            link.link_referrer_parent_type.as_deref(),
        ),
    };
    log::trace!(
        "link @{} {:?}({value:?}) → {:?}",
        node.id,
        link.link_target,
        resolved.map(|n| n.id)
    );
    resolved
}

/// Resolve `link` to a page that can actually be jumped to.
///
/// Reference destinations are followed one hop (references are not pages of
/// their own), and the destination must have a template.
pub fn resolve_live_link<'a>(doc: &'a Document, node: &Node, link: &LinkSpec) -> Option<&'a Node> {
    let target = resolve_link_target(doc, node, link)?;
    live_page(doc, target.id)
}

/// The page shown when jumping to `id`: one reference hop, template required.
pub fn live_page(doc: &Document, id: NodeId) -> Option<&Node> {
    let node = doc.resolve_reference(doc.node(id)?);
    doc.template_for(node).map(|_| node)
}

fn child_at(children: &[NodeId], idx: i64) -> Option<NodeId> {
    usize::try_from(idx).ok().and_then(|i| children.get(i)).copied()
}

/// Sibling `delta` places away; falls back to the nearest uncle (in the
/// direction of `delta`) that has a child of the same type as `node`.
fn sibling<'a>(doc: &'a Document, node: &Node, delta: i64) -> Option<&'a Node> {
    let parent = doc.parent(node)?;
    let my_index = i64::try_from(parent.children.iter().position(|&c| c == node.id)?).ok()?;
    if let Some(id) = child_at(&parent.children, my_index.saturating_add(delta)) {
        return doc.node(id);
    }

    // Cousin fallback
    let grandparent = doc.parent(parent)?;
    let parent_index =
        i64::try_from(grandparent.children.iter().position(|&c| c == parent.id)?).ok()?;
    let dir: i64 = if delta < 0 { -1 } else { 1 };

    let mut i = parent_index + dir;
    while let Some(uncle_id) = child_at(&grandparent.children, i) {
        if let Some(uncle) = doc.node(uncle_id) {
            let mut same_type = uncle
                .children
                .iter()
                .filter_map(|&id| doc.node(id))
                .filter(|c| c.kind == node.kind);
            let cousin = if dir > 0 {
                same_type.next()
            } else {
                same_type.last()
            };
            if cousin.is_some() {
                return cousin;
            }
        }
        i += dir;
    }
    None
}
