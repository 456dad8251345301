//! Export walk: the whole document → ordered pages plus an outline.
//!
//! Pages follow a depth-first pre-order walk from the root. Reference nodes
//! are pointers into other parts of the tree, not pages: they are neither
//! emitted nor walked into. After the walk, any node link whose destination
//! did not become a page is dropped so the PDF never carries a dead jump.

use crate::plan::{LinkAction, PagePlan, PlanConfig, PlanMode, plan_page};
use doctect_core::{Document, NodeId};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// One bookmark in the PDF outline.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutlineEntry {
    pub node_id: NodeId,
    pub title: String,
    /// Zero-based page index.
    pub page: usize,
    /// Number of exported ancestors.
    pub depth: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ExportPlan {
    pub pages: Vec<PagePlan>,
    pub outline: Vec<OutlineEntry>,
    #[serde(skip)]
    index: HashMap<NodeId, usize>,
}

impl ExportPlan {
    /// Page index of `node_id`, if it was exported.
    pub fn page_of(&self, node_id: NodeId) -> Option<usize> {
        self.index.get(&node_id).copied()
    }

    /// Page a link jumps to; `None` for URIs.
    pub fn link_page(&self, action: &LinkAction) -> Option<usize> {
        match action {
            LinkAction::Node(id) => self.page_of(*id),
            LinkAction::Uri(_) => None,
        }
    }
}

/// Plan every exportable page of `doc`.
///
/// `config.mode` is forced to `Export`; only `placeholder_cells` is read.
#[must_use]
pub fn plan_export(doc: &Document, config: &PlanConfig) -> ExportPlan {
    let config = PlanConfig {
        mode: PlanMode::Export,
        ..config.clone()
    };
    let mut plan = ExportPlan::default();
    let mut visited: HashSet<NodeId> = HashSet::new();
    // (node, exported-ancestor count)
    let mut stack: Vec<(NodeId, usize)> = vec![(doc.root_id, 0)];

    while let Some((id, depth)) = stack.pop() {
        if !visited.insert(id) {
            log::warn!("@{id} reached twice during export; skipping");
            continue;
        }
        let Some(node) = doc.node(id) else {
            log::warn!("missing node @{id} skipped during export");
            continue;
        };
        if node.is_reference() {
            continue;
        }

        let child_depth = match plan_page(doc, id, &config) {
            Some(page) => {
                let page_idx = plan.pages.len();
                plan.index.insert(id, page_idx);
                plan.outline.push(OutlineEntry {
                    node_id: id,
                    title: node.title.clone(),
                    page: page_idx,
                    depth,
                });
                plan.pages.push(page);
                depth + 1
            }
            None => {
                log::warn!("@{id} has no template `{}`; not exported", node.kind);
                depth
            }
        };

        // Reverse so the first child is popped first.
        for &child in node.children.iter().rev() {
            stack.push((child, child_depth));
        }
    }

    prune_links(&mut plan);
    log::debug!("export plan: {} pages", plan.pages.len());
    plan
}

fn prune_links(plan: &mut ExportPlan) {
    let index = &plan.index;
    for page in &mut plan.pages {
        let page_id = page.node_id;
        for link in page.links_mut() {
            if let Some(LinkAction::Node(target)) = link.as_ref()
                && !index.contains_key(target)
            {
                log::trace!("@{page_id}: dropped link to unexported @{target}");
                *link = None;
            }
        }
    }
}
