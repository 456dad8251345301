//! Lint diagnostics for Doctect projects.
//!
//! Reports structural issues without modifying the document. The resolvers
//! tolerate every one of these; lint exists so authors find out why a link is
//! inert or a grid is empty.

use crate::id::NodeId;
use crate::model::{Document, Node, SourceType};
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;
use std::collections::HashMap;

// ─── Diagnostic types ────────────────────────────────────────────────────

/// Severity of a lint finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LintSeverity {
    /// Should be fixed: something will silently not render or not link.
    Warning,
    /// Informational.
    Info,
}

/// A single lint diagnostic for a node.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LintDiagnostic {
    /// The node this diagnostic refers to.
    pub node_id: NodeId,
    /// Human-readable message.
    pub message: String,
    pub severity: LintSeverity,
    /// Short rule identifier (e.g. "dangling-reference", "parent-cycle").
    pub rule: &'static str,
}

impl LintDiagnostic {
    fn warning(node_id: NodeId, rule: &'static str, message: String) -> Self {
        Self {
            node_id,
            message,
            severity: LintSeverity::Warning,
            rule,
        }
    }

    fn info(node_id: NodeId, rule: &'static str, message: String) -> Self {
        Self {
            node_id,
            message,
            severity: LintSeverity::Info,
            rule,
        }
    }
}

// ─── Public API ───────────────────────────────────────────────────────────

/// Run all lint rules over the document and return diagnostics.
#[must_use]
pub fn lint_document(doc: &Document) -> Vec<LintDiagnostic> {
    let mut diags = Vec::new();
    lint_references(doc, &mut diags);
    lint_children(doc, &mut diags);
    lint_parents(doc, &mut diags);
    lint_parent_cycles(doc, &mut diags);
    lint_templates(doc, &mut diags);
    lint_grid_sources(doc, &mut diags);
    diags
}

// ─── Rules ────────────────────────────────────────────────────────────────

fn lint_references(doc: &Document, diags: &mut Vec<LintDiagnostic>) {
    for node in doc.nodes() {
        let Some(target_id) = node.reference_id else {
            continue;
        };
        match doc.node(target_id) {
            None => diags.push(LintDiagnostic::warning(
                node.id,
                "dangling-reference",
                format!("Reference `@{}` points at missing node `@{target_id}`.", node.id),
            )),
            Some(target) if target.is_reference() => diags.push(LintDiagnostic::info(
                node.id,
                "reference-chain",
                format!(
                    "Reference `@{}` points at another reference `@{target_id}`; only one hop is followed.",
                    node.id
                ),
            )),
            Some(_) => {}
        }
    }
}

fn lint_children(doc: &Document, diags: &mut Vec<LintDiagnostic>) {
    for node in doc.nodes() {
        for &child_id in &node.children {
            match doc.node(child_id) {
                None => diags.push(LintDiagnostic::warning(
                    node.id,
                    "missing-child",
                    format!("`@{}` lists missing child `@{child_id}`.", node.id),
                )),
                Some(child) if child.parent_id != Some(node.id) => {
                    diags.push(LintDiagnostic::warning(
                        child_id,
                        "parent-mismatch",
                        format!(
                            "`@{child_id}` is listed under `@{}` but its parent is {}.",
                            node.id,
                            describe_parent(child)
                        ),
                    ));
                }
                Some(_) => {}
            }
        }
    }
}

fn describe_parent(node: &Node) -> String {
    match node.parent_id {
        Some(p) => format!("`@{p}`"),
        None => "unset".to_string(),
    }
}

fn lint_parents(doc: &Document, diags: &mut Vec<LintDiagnostic>) {
    for node in doc.nodes().filter(|n| n.id != doc.root_id) {
        if let Some(parent_id) = node.parent_id
            && !doc.contains(parent_id)
        {
            diags.push(LintDiagnostic::warning(
                node.id,
                "missing-parent",
                format!("`@{}` has missing parent `@{parent_id}`.", node.id),
            ));
        }
    }
}

/// Build a graph of child → parent edges and report each strongly connected
/// component that forms a cycle, once, on its earliest node.
fn lint_parent_cycles(doc: &Document, diags: &mut Vec<LintDiagnostic>) {
    let mut graph: DiGraph<NodeId, ()> = DiGraph::with_capacity(doc.node_count(), doc.node_count());
    let index: HashMap<NodeId, NodeIndex> = doc
        .nodes()
        .map(|node| (node.id, graph.add_node(node.id)))
        .collect();
    for node in doc.nodes() {
        if let Some(parent_id) = node.parent_id
            && let Some(&parent_idx) = index.get(&parent_id)
            && let Some(&child_idx) = index.get(&node.id)
        {
            graph.add_edge(child_idx, parent_idx, ());
        }
    }

    for component in tarjan_scc(&graph) {
        let is_cycle = component.len() > 1
            || component
                .first()
                .is_some_and(|&idx| graph.contains_edge(idx, idx));
        if !is_cycle {
            continue;
        }
        // Graph indices follow document order.
        let mut members = component;
        members.sort();
        let names: Vec<String> = members.iter().map(|&idx| format!("`@{}`", graph[idx])).collect();
        diags.push(LintDiagnostic::warning(
            graph[members[0]],
            "parent-cycle",
            format!("Parent chain loops: {}.", names.join(" → ")),
        ));
    }
}

fn lint_templates(doc: &Document, diags: &mut Vec<LintDiagnostic>) {
    for node in doc.nodes().filter(|n| !n.is_reference()) {
        if doc.template_for(node).is_none() {
            diags.push(LintDiagnostic::info(
                node.id,
                "missing-template",
                format!(
                    "`@{}` has type `{}` with no template; it will not be exported.",
                    node.id, node.kind
                ),
            ));
        }
    }
}

/// Grids with `sourceType: specific` whose `sourceId` is absent from the
/// document. Reported once per template element, on the first node using it.
fn lint_grid_sources(doc: &Document, diags: &mut Vec<LintDiagnostic>) {
    for template in doc.templates() {
        let Some(first_user) = doc.nodes().find(|n| n.kind == template.id) else {
            continue;
        };
        for element in &template.elements {
            let Some(config) = &element.grid_config else {
                continue;
            };
            if config.source_type != SourceType::Specific {
                continue;
            }
            let source = config.source_id.as_deref().unwrap_or("");
            if doc.node_by_str(source).is_none() {
                diags.push(LintDiagnostic::warning(
                    first_user.id,
                    "missing-grid-source",
                    format!(
                        "Grid `{}` on template `{}` reads from missing node `@{source}`.",
                        element.id, template.id
                    ),
                ));
            }
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Element, ElementDefaults, ElementKind, Template};
    use pretty_assertions::assert_eq;

    fn clean() -> Document {
        let mut doc = Document::new(Node::new("year", "year", "2026"));
        doc.add_child(NodeId::intern("year"), Node::new("jan", "month", "January"));
        doc.add_child(NodeId::intern("jan"), Node::new("jan_01", "day", "1"));
        doc.add_child(NodeId::intern("year"), Node::new("w1", "week", "Week 1"));
        doc.add_child(NodeId::intern("w1"), Node::reference("w1_d1", "day", "jan_01"));
        for t in ["year", "month", "day", "week"] {
            doc.add_template(Template::new(t, 595.0, 842.0));
        }
        doc
    }

    fn rules(diags: &[LintDiagnostic]) -> Vec<&'static str> {
        diags.iter().map(|d| d.rule).collect()
    }

    #[test]
    fn lint_clean_document_no_diags() {
        assert_eq!(lint_document(&clean()), vec![]);
    }

    #[test]
    fn lint_dangling_and_chained_references() {
        let mut doc = clean();
        doc.add_child(NodeId::intern("w1"), Node::reference("ghost", "day", "nowhere"));
        doc.add_child(NodeId::intern("w1"), Node::reference("chain", "day", "w1_d1"));

        let diags = lint_document(&doc);
        assert_eq!(rules(&diags), vec!["dangling-reference", "reference-chain"]);
        assert_eq!(diags[0].node_id.as_str(), "ghost");
        assert_eq!(diags[0].severity, LintSeverity::Warning);
        assert_eq!(diags[1].severity, LintSeverity::Info);
    }

    #[test]
    fn lint_child_and_parent_consistency() {
        let mut doc = clean();
        let mut jan = doc.node_by_str("jan").unwrap().clone();
        jan.children.push(NodeId::intern("lost"));
        jan.children.push(NodeId::intern("w1"));
        doc.insert_node(jan);
        let mut stray = Node::new("stray", "day", "?");
        stray.parent_id = Some(NodeId::intern("gone"));
        doc.insert_node(stray);

        let diags = lint_document(&doc);
        assert_eq!(
            rules(&diags),
            vec!["missing-child", "parent-mismatch", "missing-parent"]
        );
        assert_eq!(diags[1].node_id.as_str(), "w1");
    }

    #[test]
    fn lint_parent_cycle_reported_once() {
        let mut doc = clean();
        let mut a = Node::new("loop_a", "day", "A");
        a.parent_id = Some(NodeId::intern("loop_b"));
        let mut b = Node::new("loop_b", "day", "B");
        b.parent_id = Some(NodeId::intern("loop_a"));
        doc.insert_node(a);
        doc.insert_node(b);

        let cycles: Vec<_> = lint_document(&doc)
            .into_iter()
            .filter(|d| d.rule == "parent-cycle")
            .collect();
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].node_id.as_str(), "loop_a");
    }

    #[test]
    fn lint_self_parent_is_a_cycle() {
        let mut doc = clean();
        let mut me = Node::new("narcissus", "day", "N");
        me.parent_id = Some(NodeId::intern("narcissus"));
        doc.insert_node(me);
        assert!(rules(&lint_document(&doc)).contains(&"parent-cycle"));
    }

    #[test]
    fn lint_missing_template_skips_references() {
        let mut doc = clean();
        doc.add_child(NodeId::intern("year"), Node::new("notes", "notes", "Notes"));
        doc.add_child(NodeId::intern("w1"), Node::reference("w1_notes", "notes", "notes"));

        let diags = lint_document(&doc);
        assert_eq!(rules(&diags), vec!["missing-template"]);
        assert_eq!(diags[0].node_id.as_str(), "notes");
    }

    #[test]
    fn lint_missing_grid_source() {
        let mut doc = clean();
        let mut grid = Element::new("months", ElementKind::Grid, 0.0, 0.0, &ElementDefaults::default());
        if let Some(config) = grid.grid_config.as_mut() {
            config.source_type = SourceType::Specific;
            config.source_id = Some("no_such_node".into());
        }
        doc.add_template(Template::new("year", 595.0, 842.0).with_element(grid));

        let diags = lint_document(&doc);
        assert_eq!(rules(&diags), vec!["missing-grid-source"]);
        assert_eq!(diags[0].node_id.as_str(), "year");
    }
}
