//! WASM bridge for Doctect: exposes the resolvers and page planner to the
//! browser editor.
//!
//! Compiled via `wasm-pack build --target web`. Every query returns a JSON
//! string; failures come back as `{"ok":false,"error":"..."}` rather than as
//! exceptions so the editor can keep rendering.

use doctect_core::grid::GridLayout;
use doctect_core::{
    Document, Element, ElementDefaults, ElementKind, ImportError, Node, available_fields,
    export_json, import_json, lint_document, resolve_live_link, resolve_text,
};
use doctect_render::{PlanConfig, PlanMode, hit_test, plan_export, plan_page};
use serde::Serialize;
use serde_json::json;
use std::fmt::Display;
use wasm_bindgen::prelude::*;

/// A loaded project plus the editor-side settings that affect planning.
///
/// The document is replaced wholesale on every `set_project` call; nothing
/// here mutates it in place.
#[wasm_bindgen]
pub struct DoctectProject {
    doc: Document,
    defaults: ElementDefaults,
    plan: PlanConfig,
}

impl DoctectProject {
    /// Build from project JSON without touching JS types.
    pub fn from_json(json: &str) -> Result<Self, ImportError> {
        Ok(Self {
            doc: import_json(json)?,
            defaults: ElementDefaults::default(),
            plan: PlanConfig::default(),
        })
    }

    fn node(&self, node_id: &str) -> Option<&Node> {
        self.doc.node_by_str(node_id)
    }

    /// The element `element_id` on the template rendering `node`.
    fn element(&self, node: &Node, element_id: &str) -> Option<&Element> {
        self.doc
            .template_for(node)?
            .elements
            .iter()
            .find(|e| e.id == element_id)
    }

    fn plan_config(&self, canvas: bool) -> PlanConfig {
        PlanConfig {
            mode: if canvas {
                PlanMode::Canvas
            } else {
                PlanMode::Export
            },
            ..self.plan.clone()
        }
    }
}

#[wasm_bindgen]
impl DoctectProject {
    /// Load a project from its JSON export.
    #[wasm_bindgen(constructor)]
    pub fn new(json: &str) -> Result<DoctectProject, JsValue> {
        console_error_panic_hook_setup();
        Self::from_json(json).map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Replace the loaded project. Returns `{"ok":true}` or an error object;
    /// on error the previous project stays loaded.
    pub fn set_project(&mut self, json: &str) -> String {
        match import_json(json) {
            Ok(doc) => {
                self.doc = doc;
                ok_json(json!({}))
            }
            Err(e) => {
                log::warn!("project rejected: {e}");
                error_json(e)
            }
        }
    }

    /// Current project as JSON (keyed format).
    pub fn project_json(&self) -> String {
        export_json(&self.doc).unwrap_or_else(error_json)
    }

    // ─── Editor settings ─────────────────────────────────────────────────

    pub fn set_default_font(&mut self, family: &str, size: f64) {
        self.defaults.font_family = family.to_string();
        self.defaults.font_size = size;
    }

    pub fn set_placeholder_cells(&mut self, cells: usize) {
        self.plan.placeholder_cells = cells;
    }

    // ─── Resolution queries ──────────────────────────────────────────────

    /// Resolve `{{...}}` placeholders as seen from `node_id`.
    /// An unknown or empty node id returns the template unchanged.
    pub fn resolve_text(&self, template: &str, node_id: &str) -> String {
        resolve_text(&self.doc, template, self.node(node_id))
    }

    /// Field names bindable from `node_id`, as a JSON array. `[]` if unknown.
    pub fn available_fields_json(&self, node_id: &str) -> String {
        let fields = self
            .node(node_id)
            .map(|node| available_fields(&self.doc, node))
            .unwrap_or_default();
        serde_json::to_string(&fields).unwrap_or_else(|_| "[]".to_string())
    }

    /// Items and cell positions of grid `element_id` on `node_id`'s page.
    pub fn grid_items_json(&self, node_id: &str, element_id: &str) -> String {
        let Some(node) = self.node(node_id) else {
            return error_json(format!("unknown node `{node_id}`"));
        };
        let Some(config) = self
            .element(node, element_id)
            .and_then(|e| e.grid_config.as_ref())
        else {
            return error_json(format!("no grid `{element_id}` on `{node_id}`"));
        };
        let layout = GridLayout::resolve(&self.doc, node, config);
        let cells: Vec<_> = (0..layout.items.len()).map(|i| layout.cell(i)).collect();
        ok_json(json!({
            "items": layout.items,
            "offset": layout.offset,
            "cols": layout.cols,
            "cells": cells,
        }))
    }

    /// Destination page of element `element_id` on `node_id`'s page, or an
    /// empty string when the link is inert.
    pub fn resolve_link(&self, node_id: &str, element_id: &str) -> String {
        self.node(node_id)
            .and_then(|node| {
                let element = self.element(node, element_id)?;
                resolve_live_link(&self.doc, node, &element.link)
            })
            .map(|target| target.id.to_string())
            .unwrap_or_default()
    }

    // ─── Planning ────────────────────────────────────────────────────────

    /// Full page plan for `node_id`, canvas or export mode.
    pub fn page_plan_json(&self, node_id: &str, canvas: bool) -> String {
        let Some(node) = self.node(node_id) else {
            return error_json(format!("unknown node `{node_id}`"));
        };
        match plan_page(&self.doc, node.id, &self.plan_config(canvas)) {
            Some(plan) => ok_json(json!({ "page": to_value(&plan) })),
            None => error_json(format!("no template `{}` for `{node_id}`", node.kind)),
        }
    }

    /// Every exported page in order, plus the outline.
    pub fn export_plan_json(&self) -> String {
        let plan = plan_export(&self.doc, &self.plan_config(false));
        ok_json(to_value(&plan))
    }

    pub fn lint_json(&self) -> String {
        ok_json(json!({ "diagnostics": lint_document(&self.doc) }))
    }

    /// Topmost element under `(x, y)` on `node_id`'s canvas page.
    /// Returns `{"ok":true,"hit":null}` over the background.
    pub fn hit_test_json(&self, node_id: &str, x: f64, y: f64) -> String {
        let Some(node) = self.node(node_id) else {
            return error_json(format!("unknown node `{node_id}`"));
        };
        let Some(plan) = plan_page(&self.doc, node.id, &self.plan_config(true)) else {
            return error_json(format!("no template `{}` for `{node_id}`", node.kind));
        };
        ok_json(json!({ "hit": hit_test(&plan, x, y) }))
    }

    /// A new element of `kind` at `(x, y)` with the editor defaults applied.
    /// `kind` is "rect", "ellipse", "triangle", "line", "text" or "grid".
    pub fn create_element_json(&self, kind: &str, id: &str, x: f64, y: f64) -> String {
        let kind = match kind {
            "rect" => ElementKind::Rect,
            "ellipse" => ElementKind::Ellipse,
            "triangle" => ElementKind::Triangle,
            "line" => ElementKind::Line,
            "text" => ElementKind::Text,
            "grid" => ElementKind::Grid,
            other => return error_json(format!("unknown element type `{other}`")),
        };
        let element = Element::new(id, kind, x, y, &self.defaults);
        ok_json(json!({ "element": to_value(&element) }))
    }
}

// ─── JSON helpers ────────────────────────────────────────────────────────

fn to_value<T: Serialize>(value: &T) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or(serde_json::Value::Null)
}

/// Merge `"ok": true` into an object payload.
fn ok_json(payload: serde_json::Value) -> String {
    let mut obj = match payload {
        serde_json::Value::Object(map) => map,
        other => {
            let mut map = serde_json::Map::new();
            map.insert("value".into(), other);
            map
        }
    };
    obj.insert("ok".into(), serde_json::Value::Bool(true));
    serde_json::Value::Object(obj).to_string()
}

fn error_json(error: impl Display) -> String {
    json!({ "ok": false, "error": error.to_string() }).to_string()
}

// ─── Panic hook for WASM debugging ───────────────────────────────────────

fn console_error_panic_hook_setup() {
    #[cfg(target_arch = "wasm32")]
    {
        use std::sync::Once;
        static SET_HOOK: Once = Once::new();
        SET_HOOK.call_once(|| {
            std::panic::set_hook(Box::new(|info| {
                let msg = format!("Doctect WASM panic: {info}");
                web_sys::console::error_1(&msg.into());
            }));
        });
    }
}

// ─── Standalone functions (no project needed) ────────────────────────────

/// Evaluate an arithmetic expression against a JSON object of data fields.
/// Malformed data is treated as no fields.
#[wasm_bindgen]
pub fn evaluate_math(expr: &str, data_json: &str) -> f64 {
    let data = serde_json::from_str(data_json).unwrap_or_default();
    doctect_core::evaluate_math(expr, &data) as f64
}

/// Validate project JSON. Returns `{"ok":true,"warnings":N,"infos":N}` or
/// `{"ok":false,"error":"..."}`.
#[wasm_bindgen]
pub fn validate(json: &str) -> String {
    match import_json(json) {
        Ok(doc) => {
            let diags = lint_document(&doc);
            let warnings = diags
                .iter()
                .filter(|d| d.severity == doctect_core::LintSeverity::Warning)
                .count();
            ok_json(json!({ "warnings": warnings, "infos": diags.len() - warnings }))
        }
        Err(e) => error_json(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::Value;

    const PROJECT: &str = r#"{
        "rootId": "wb_year",
        "nodes": {
            "wb_year": { "type": "year", "title": "2026", "children": ["wb_jan", "wb_feb"] },
            "wb_jan": { "parentId": "wb_year", "type": "month", "title": "January", "data": { "first": 3 } },
            "wb_feb": { "parentId": "wb_year", "type": "month", "title": "February" }
        },
        "templates": {
            "year": {
                "width": 200, "height": 200,
                "elements": [
                    { "id": "months", "type": "grid", "x": 0, "y": 0, "w": 50, "h": 20,
                      "gridConfig": { "cols": 2 } }
                ]
            },
            "month": {
                "width": 200, "height": 200,
                "elements": [
                    { "id": "up", "type": "rect", "x": 10, "y": 10, "w": 40, "h": 20,
                      "text": "{{title}} of {{wb_missing}}", "linkTarget": "parent" },
                    { "id": "next", "type": "text", "x": 100, "y": 10, "w": 40, "h": 20,
                      "linkTarget": "sibling", "linkValue": "1" }
                ]
            }
        }
    }"#;

    fn project() -> DoctectProject {
        DoctectProject::from_json(PROJECT).unwrap()
    }

    fn parse(s: &str) -> Value {
        serde_json::from_str(s).unwrap()
    }

    #[test]
    fn text_and_fields() {
        let p = project();
        assert_eq!(p.resolve_text("{{title}}!", "wb_jan"), "January!");
        assert_eq!(p.resolve_text("{{title}}", ""), "{{title}}");
        assert_eq!(parse(&p.available_fields_json("wb_jan")), json!(["title", "first"]));
        assert_eq!(p.available_fields_json("wb_nowhere"), "[]");
    }

    #[test]
    fn grid_items() {
        let p = project();
        let grid = parse(&p.grid_items_json("wb_year", "months"));
        assert_eq!(grid["ok"], json!(true));
        assert_eq!(grid["items"], json!(["wb_jan", "wb_feb"]));
        assert_eq!(grid["cells"][1], json!({ "row": 0, "col": 1 }));
        assert_eq!(parse(&p.grid_items_json("wb_year", "nope"))["ok"], json!(false));
    }

    #[test]
    fn links() {
        let p = project();
        assert_eq!(p.resolve_link("wb_jan", "up"), "wb_year");
        assert_eq!(p.resolve_link("wb_jan", "next"), "wb_feb");
        assert_eq!(p.resolve_link("wb_feb", "next"), "");
    }

    #[test]
    fn page_plans_and_hit_test() {
        let p = project();
        let page = parse(&p.page_plan_json("wb_jan", true));
        assert_eq!(page["ok"], json!(true));
        assert_eq!(page["page"]["elements"][0]["text"], json!("January of "));
        assert_eq!(
            page["page"]["elements"][0]["link"],
            json!({ "kind": "node", "target": "wb_year" })
        );

        let hit = parse(&p.hit_test_json("wb_jan", 15.0, 15.0));
        assert_eq!(hit["hit"]["elementId"], json!("up"));
        assert_eq!(parse(&p.hit_test_json("wb_jan", 190.0, 190.0))["hit"], Value::Null);

        let export = parse(&p.export_plan_json());
        assert_eq!(export["pages"].as_array().map(Vec::len), Some(3));
        assert_eq!(export["outline"][1]["title"], json!("January"));
    }

    #[test]
    fn create_element_uses_defaults() {
        let mut p = project();
        p.set_default_font("Inter", 10.0);
        let created = parse(&p.create_element_json("grid", "g1", 5.0, 6.0));
        assert_eq!(created["element"]["type"], json!("grid"));
        assert_eq!(created["element"]["fontFamily"], json!("Inter"));
        assert_eq!(created["element"]["gridConfig"]["cols"], json!(7));
        assert_eq!(parse(&p.create_element_json("star", "s", 0.0, 0.0))["ok"], json!(false));
    }

    #[test]
    fn set_project_keeps_old_on_error() {
        let mut p = project();
        assert_eq!(parse(&p.set_project("{ nope"))["ok"], json!(false));
        assert_eq!(p.resolve_text("{{title}}", "wb_feb"), "February");
    }

    #[test]
    fn standalone_functions() {
        assert_eq!(evaluate_math("first+2", r#"{"first": "3"}"#), 5.0);
        assert_eq!(evaluate_math("7", "not json"), 7.0);
        let ok = parse(&validate(PROJECT));
        assert_eq!(ok, json!({ "ok": true, "warnings": 0, "infos": 0 }));
        assert_eq!(parse(&validate("[]"))["ok"], json!(false));
    }
}
