//! Project file import and export.
//!
//! ```json
//! { "rootId": "year",
//!   "nodes":     { "year": { "type": "year", "title": "2026", "children": [...] } },
//!   "templates": { "year": { "width": 595, "height": 842, "elements": [...] } } }
//! ```
//!
//! `nodes` and `templates` may also be arrays (older exports). In the keyed
//! form an entry without its own `id` takes the key.

use crate::error::ImportError;
use crate::model::{Document, Node, Template};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Parse a project file into a `Document`.
pub fn import_json(input: &str) -> Result<Document, ImportError> {
    let mut root: Map<String, Value> = serde_json::from_str(input)?;

    let nodes: Vec<Node> = entries(root.remove("nodes"), "nodes")?;
    let templates: Vec<Template> = entries(root.remove("templates"), "templates")?;
    let root_hint = root
        .remove("rootId")
        .and_then(|v| v.as_str().map(str::to_string))
        .filter(|s| !s.is_empty());

    let root_id = match &root_hint {
        Some(id) => nodes.iter().find(|n| n.id.as_str() == id).map(|n| n.id),
        None => nodes.iter().find(|n| n.parent_id.is_none()).map(|n| n.id),
    }
    .ok_or(ImportError::MissingRoot { root_id: root_hint })?;

    let mut doc = Document::empty(root_id);
    for node in nodes {
        if doc.contains(node.id) {
            log::warn!("duplicate node id @{}; keeping the last definition", node.id);
        }
        doc.insert_node(node);
    }
    for template in templates {
        if doc.template(&template.id).is_some() {
            log::warn!("duplicate template id `{}`; keeping the last definition", template.id);
        }
        doc.add_template(template);
    }

    log::debug!(
        "imported project rooted at @{}: {} nodes, {} templates",
        doc.root_id,
        doc.node_count(),
        doc.templates().count()
    );
    Ok(doc)
}

/// Serialize a `Document` in the keyed format, preserving insertion order.
pub fn export_json(doc: &Document) -> Result<String, ImportError> {
    let mut nodes = Map::new();
    for node in doc.nodes() {
        nodes.insert(node.id.to_string(), serde_json::to_value(node)?);
    }
    let mut templates = Map::new();
    for template in doc.templates() {
        templates.insert(template.id.clone(), serde_json::to_value(template)?);
    }

    let mut project = Map::new();
    project.insert("rootId".into(), Value::String(doc.root_id.to_string()));
    project.insert("nodes".into(), Value::Object(nodes));
    project.insert("templates".into(), Value::Object(templates));
    Ok(serde_json::to_string_pretty(&Value::Object(project))?)
}

fn entries<T: DeserializeOwned>(
    value: Option<Value>,
    field: &'static str,
) -> Result<Vec<T>, ImportError> {
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .into_iter()
            .map(|item| serde_json::from_value(item).map_err(ImportError::from))
            .collect(),
        Some(Value::Object(map)) => map
            .into_iter()
            .map(|(key, mut item)| {
                if let Value::Object(fields) = &mut item {
                    fields.entry("id").or_insert(Value::String(key));
                }
                serde_json::from_value(item).map_err(ImportError::from)
            })
            .collect(),
        Some(_) => Err(ImportError::Shape { field }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ElementKind, LinkTarget};
    use pretty_assertions::assert_eq;

    const KEYED: &str = r#"{
        "rootId": "imp_year",
        "nodes": {
            "imp_year": { "type": "year", "title": "2026", "children": ["imp_jan"], "data": { "year": 2026 } },
            "imp_jan":  { "parentId": "imp_year", "type": "month", "title": "January" }
        },
        "templates": {
            "month": {
                "width": 595, "height": 842,
                "elements": [
                    { "id": "back", "type": "text", "x": 10, "y": 10, "w": 80, "h": 20,
                      "text": "Back", "linkTarget": "parent", "fontSize": 9 }
                ]
            }
        }
    }"#;

    #[test]
    fn import_keyed_form() {
        let doc = import_json(KEYED).unwrap();
        assert_eq!(doc.root_id.as_str(), "imp_year");
        let year = doc.root().unwrap();
        assert_eq!(year.data.get("year"), Some("2026"));
        let jan = doc.node_by_str("imp_jan").unwrap();
        assert_eq!(jan.children, vec![]);
        assert_eq!(jan.parent_id, Some(year.id));

        let month = doc.template("month").unwrap();
        assert_eq!(month.id, "month");
        let back = &month.elements[0];
        assert_eq!(back.kind, ElementKind::Text);
        assert_eq!(back.link.link_target, LinkTarget::Parent);
        assert_eq!(back.style.font_size, Some(9.0));
    }

    #[test]
    fn import_array_form_and_root_fallback() {
        let doc = import_json(
            r#"{
                "nodes": [
                    { "id": "arr_child", "parentId": "arr_root", "type": "t" },
                    { "id": "arr_root", "parentId": null, "type": "t", "children": ["arr_child"] }
                ],
                "templates": [ { "id": "t", "width": 10, "height": 10 } ]
            }"#,
        )
        .unwrap();
        assert_eq!(doc.root_id.as_str(), "arr_root");
        let ids: Vec<&str> = doc.nodes().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["arr_child", "arr_root"]);
    }

    #[test]
    fn missing_root_is_an_error() {
        let err = import_json(r#"{ "rootId": "nope", "nodes": {} }"#).unwrap_err();
        assert!(matches!(err, ImportError::MissingRoot { root_id: Some(ref id) } if id == "nope"));

        let err = import_json(r#"{ "nodes": [] }"#).unwrap_err();
        assert!(matches!(err, ImportError::MissingRoot { root_id: None }));
    }

    #[test]
    fn wrong_shape_and_bad_json() {
        assert!(matches!(
            import_json(r#"{ "nodes": 3 }"#),
            Err(ImportError::Shape { field: "nodes" })
        ));
        assert!(matches!(import_json("{"), Err(ImportError::Json(_))));
    }

    #[test]
    fn duplicate_ids_last_wins() {
        let doc = import_json(
            r#"{ "nodes": [
                { "id": "dup_root", "type": "t", "title": "first" },
                { "id": "dup_root", "type": "t", "title": "second" }
            ] }"#,
        )
        .unwrap();
        assert_eq!(doc.node_count(), 1);
        assert_eq!(doc.root().unwrap().title, "second");
    }

    #[test]
    fn export_then_import_preserves_model() {
        let doc = import_json(KEYED).unwrap();
        let json = export_json(&doc).unwrap();
        let again = import_json(&json).unwrap();

        assert_eq!(again.root_id, doc.root_id);
        assert_eq!(
            again.nodes().cloned().collect::<Vec<_>>(),
            doc.nodes().cloned().collect::<Vec<_>>()
        );
        assert_eq!(
            again.templates().cloned().collect::<Vec<_>>(),
            doc.templates().cloned().collect::<Vec<_>>()
        );
    }
}
