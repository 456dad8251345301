//! Core data model for Doctect projects.
//!
//! A project is a tree of content `Node`s (pages) plus a set of reusable
//! `Template`s. Each node names the template that renders it through its
//! `type`. Nodes may be *reference nodes*: lightweight pointers whose real
//! content (data fields, children for grid purposes) lives on the target.
//!
//! The `Document` is the read-only snapshot every resolver works on. It keeps
//! nodes and templates in insertion order and maintains lookup indexes so
//! "first referrer" is always "first inserted".

use crate::id::NodeId;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use smallvec::SmallVec;
use std::collections::{HashMap, HashSet};
use std::fmt;

// ─── Data fields ─────────────────────────────────────────────────────────

/// Ordered field name → string value mapping attached to a node.
///
/// Deserializes from a JSON object; non-string scalars are stored in their
/// textual form so older exports with numeric fields keep working.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataMap(Vec<(String, String)>);

impl DataMap {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Insert or overwrite a field. Overwriting keeps the original position.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for DataMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = DataMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl Serialize for DataMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

impl<'de> Deserialize<'de> for DataMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct DataMapVisitor;

        impl<'de> Visitor<'de> for DataMapVisitor {
            type Value = DataMap;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object of data fields")
            }

            fn visit_unit<E: serde::de::Error>(self) -> Result<DataMap, E> {
                Ok(DataMap::new())
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<DataMap, A::Error> {
                let mut map = DataMap::new();
                while let Some((key, value)) = access.next_entry::<String, serde_json::Value>()? {
                    map.insert(key, scalar_to_string(value));
                }
                Ok(map)
            }
        }

        deserializer.deserialize_any(DataMapVisitor)
    }
}

fn scalar_to_string(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

// ─── Nodes ───────────────────────────────────────────────────────────────

/// A content page in the tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,

    #[serde(default)]
    pub parent_id: Option<NodeId>,

    /// Id of the template that renders this node.
    #[serde(rename = "type", default)]
    pub kind: String,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub data: DataMap,

    /// Ordered child ids. Iteration order for grids, index order for links.
    #[serde(default)]
    pub children: Vec<NodeId>,

    /// Present on reference nodes: the node whose content this one stands for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_id: Option<NodeId>,
}

impl Node {
    pub fn new(id: &str, kind: &str, title: &str) -> Self {
        Self {
            id: NodeId::intern(id),
            parent_id: None,
            kind: kind.to_string(),
            title: title.to_string(),
            data: DataMap::new(),
            children: Vec::new(),
            reference_id: None,
        }
    }

    /// A reference node pointing at `target`.
    pub fn reference(id: &str, kind: &str, target: &str) -> Self {
        let mut node = Self::new(id, kind, "");
        node.reference_id = Some(NodeId::intern(target));
        node
    }

    pub fn with_data(mut self, key: &str, value: &str) -> Self {
        self.data.insert(key, value);
        self
    }

    pub fn is_reference(&self) -> bool {
        self.reference_id.is_some()
    }
}

// ─── Templates & Elements ────────────────────────────────────────────────

/// A reusable page layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub elements: Vec<Element>,
}

impl Template {
    pub fn new(id: &str, width: f64, height: f64) -> Self {
        Self {
            id: id.to_string(),
            name: id.to_string(),
            width,
            height,
            elements: Vec::new(),
        }
    }

    pub fn with_element(mut self, element: Element) -> Self {
        self.elements.push(element);
        self
    }

    /// Elements in paint order: ascending `z_index`, ties by array order.
    pub fn paint_order(&self) -> Vec<&Element> {
        let mut ordered: Vec<&Element> = self.elements.iter().collect();
        // sort_by_key is stable, so equal z-indexes keep array order
        ordered.sort_by_key(|e| e.z_index);
        ordered
    }
}

/// Shape kind of a template element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Rect,
    Ellipse,
    Triangle,
    Line,
    Text,
    Grid,
}

impl ElementKind {
    /// Whether the element carries its own `text` / `dataBinding` label.
    /// Grids label their cells through `GridConfig::display_field` instead.
    pub fn is_text_capable(self) -> bool {
        matches!(
            self,
            ElementKind::Rect | ElementKind::Ellipse | ElementKind::Triangle | ElementKind::Text
        )
    }
}

/// Fractional rotation pivot within the element box (0.5, 0.5 = centre).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransformOrigin {
    pub x: f64,
    pub y: f64,
}

/// Visual properties passed through to renderers untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_weight: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_align: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
}

/// Symbolic link destination of an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkTarget {
    #[default]
    None,
    Url,
    Parent,
    ChildIndex,
    SpecificNode,
    Sibling,
    Ancestor,
    Referrer,
    ChildReferrer,
}

/// Link fields of an element, flattened into the element in JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkSpec {
    #[serde(default)]
    pub link_target: LinkTarget,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub link_value: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub link_secondary_value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_referrer_parent_type: Option<String>,
}

impl LinkSpec {
    pub fn new(target: LinkTarget, value: &str) -> Self {
        Self {
            link_target: target,
            link_value: value.to_string(),
            ..Default::default()
        }
    }
}

/// A positioned shape on a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    pub id: String,

    #[serde(rename = "type")]
    pub kind: ElementKind,

    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    /// Width; for grids, the width of one cell.
    #[serde(default)]
    pub w: f64,
    /// Height; for grids, the height of one cell.
    #[serde(default)]
    pub h: f64,

    /// Degrees, clockwise.
    #[serde(default)]
    pub rotation: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform_origin: Option<TransformOrigin>,

    #[serde(default)]
    pub z_index: i32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_binding: Option<String>,

    #[serde(flatten)]
    pub style: ElementStyle,

    #[serde(flatten)]
    pub link: LinkSpec,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid_config: Option<GridConfig>,
}

impl Element {
    /// Create an element at `(x, y)` sized and styled from `defaults`.
    pub fn new(id: &str, kind: ElementKind, x: f64, y: f64, defaults: &ElementDefaults) -> Self {
        let mut style = ElementStyle {
            stroke_width: Some(defaults.stroke_width),
            ..Default::default()
        };
        if kind.is_text_capable() || kind == ElementKind::Grid {
            style.font_size = Some(defaults.font_size);
            style.font_family = Some(defaults.font_family.clone());
        }
        let grid_config = (kind == ElementKind::Grid).then(|| GridConfig {
            cols: defaults.grid_cols,
            ..Default::default()
        });
        let (w, h) = match kind {
            ElementKind::Grid => (defaults.cell_width, defaults.cell_height),
            _ => (defaults.width, defaults.height),
        };

        Self {
            id: id.to_string(),
            kind,
            x,
            y,
            w,
            h,
            rotation: 0.0,
            transform_origin: None,
            z_index: 0,
            text: None,
            data_binding: None,
            style,
            link: LinkSpec::default(),
            grid_config,
        }
    }

    /// The text template this element displays, if any.
    ///
    /// A non-empty `dataBinding` is shorthand for `{{dataBinding}}` and takes
    /// precedence over literal `text`.
    pub fn text_template(&self) -> Option<String> {
        match self.data_binding.as_deref() {
            Some(binding) if !binding.trim().is_empty() => Some(format!("{{{{{binding}}}}}")),
            _ => self.text.clone(),
        }
    }
}

// ─── Grid configuration ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    #[default]
    Current,
    Specific,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OffsetMode {
    #[default]
    Static,
    Dynamic,
}

/// One drill-down step: take children, then slice them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SliceStep {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slice_start: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slice_count: Option<i64>,
}

/// Declarative grid population rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GridConfig {
    pub cols: u32,
    pub gap_x: f64,
    pub gap_y: f64,
    pub source_type: SourceType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    pub traversal_path: SmallVec<[SliceStep; 2]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_slice_start: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_slice_count: Option<i64>,
    pub offset_mode: OffsetMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset_start: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset_field: Option<String>,
    pub offset_adjustment: i64,
    /// Literal or `{{...}}` template per item. Absent → the item's title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_field: Option<String>,
    /// Whether each cell links to its item's page.
    pub link_items: bool,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            cols: 1,
            gap_x: 0.0,
            gap_y: 0.0,
            source_type: SourceType::Current,
            source_id: None,
            traversal_path: SmallVec::new(),
            data_slice_start: None,
            data_slice_count: None,
            offset_mode: OffsetMode::Static,
            offset_start: None,
            offset_field: None,
            offset_adjustment: 0,
            display_field: None,
            link_items: true,
        }
    }
}

impl GridConfig {
    /// Column count, never below 1.
    pub fn columns(&self) -> i64 {
        i64::from(self.cols.max(1))
    }
}

// ─── Config ──────────────────────────────────────────────────────────────

/// Defaults applied when the editor creates a new element.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementDefaults {
    pub font_size: f64,
    pub font_family: String,
    pub stroke_width: f64,
    pub width: f64,
    pub height: f64,
    pub cell_width: f64,
    pub cell_height: f64,
    pub grid_cols: u32,
}

impl Default for ElementDefaults {
    fn default() -> Self {
        Self {
            font_size: 12.0,
            font_family: "Helvetica".into(),
            stroke_width: 1.0,
            width: 120.0,
            height: 40.0,
            cell_width: 40.0,
            cell_height: 40.0,
            grid_cols: 7,
        }
    }
}

// ─── Document ────────────────────────────────────────────────────────────

/// An immutable-by-convention snapshot of a project.
///
/// Mutation methods exist for import and tests; resolvers only take `&Document`.
#[derive(Debug, Clone)]
pub struct Document {
    pub root_id: NodeId,
    nodes: Vec<Node>,
    templates: Vec<Template>,
    id_index: HashMap<NodeId, usize>,
    template_index: HashMap<String, usize>,
    /// Target id → indices of nodes referencing it, in insertion order.
    referrer_index: HashMap<NodeId, SmallVec<[usize; 2]>>,
}

impl Document {
    /// Create a document whose root is `root`.
    #[must_use]
    pub fn new(mut root: Node) -> Self {
        root.parent_id = None;
        let mut doc = Self::empty(root.id);
        doc.insert_node(root);
        doc
    }

    /// A document with no nodes yet; `root_id` must be inserted afterwards.
    pub(crate) fn empty(root_id: NodeId) -> Self {
        Self {
            root_id,
            nodes: Vec::new(),
            templates: Vec::new(),
            id_index: HashMap::new(),
            template_index: HashMap::new(),
            referrer_index: HashMap::new(),
        }
    }

    /// Insert a node as-is. A node with an existing id is replaced in place.
    pub fn insert_node(&mut self, node: Node) {
        if let Some(&idx) = self.id_index.get(&node.id) {
            self.nodes[idx] = node;
            self.rebuild_referrers();
            return;
        }
        let idx = self.nodes.len();
        self.id_index.insert(node.id, idx);
        if let Some(target) = node.reference_id {
            self.referrer_index.entry(target).or_default().push(idx);
        }
        self.nodes.push(node);
    }

    /// Append `node` to `parent`'s children. Returns `false` if the parent is missing.
    pub fn add_child(&mut self, parent: NodeId, mut node: Node) -> bool {
        let Some(&parent_idx) = self.id_index.get(&parent) else {
            return false;
        };
        node.parent_id = Some(parent);
        let child_id = node.id;
        let siblings = &mut self.nodes[parent_idx].children;
        if !siblings.contains(&child_id) {
            siblings.push(child_id);
        }
        self.insert_node(node);
        true
    }

    /// Insert a template. A template with an existing id is replaced in place.
    pub fn add_template(&mut self, template: Template) {
        match self.template_index.get(&template.id) {
            Some(&idx) => self.templates[idx] = template,
            None => {
                self.template_index
                    .insert(template.id.clone(), self.templates.len());
                self.templates.push(template);
            }
        }
    }

    /// Rebuild the referrer index (needed after in-place replacement).
    fn rebuild_referrers(&mut self) {
        self.referrer_index.clear();
        for (idx, node) in self.nodes.iter().enumerate() {
            if let Some(target) = node.reference_id {
                self.referrer_index.entry(target).or_default().push(idx);
            }
        }
    }

    pub fn root(&self) -> Option<&Node> {
        self.node(self.root_id)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.id_index.get(&id).map(|&idx| &self.nodes[idx])
    }

    /// Look up a node by a user-supplied string without interning it.
    pub fn node_by_str(&self, id: &str) -> Option<&Node> {
        NodeId::get(id).and_then(|id| self.node(id))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.id_index.contains_key(&id)
    }

    pub fn template(&self, id: &str) -> Option<&Template> {
        self.template_index.get(id).map(|&idx| &self.templates[idx])
    }

    /// The template that renders `node`.
    pub fn template_for(&self, node: &Node) -> Option<&Template> {
        self.template(&node.kind)
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// Templates in insertion order.
    pub fn templates(&self) -> impl Iterator<Item = &Template> {
        self.templates.iter()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn parent(&self, node: &Node) -> Option<&Node> {
        node.parent_id.and_then(|p| self.node(p))
    }

    /// Follow `referenceId` exactly one hop. Non-references (and dangling
    /// references) resolve to the node itself.
    pub fn resolve_reference<'a>(&'a self, node: &'a Node) -> &'a Node {
        node.reference_id
            .and_then(|target| self.node(target))
            .unwrap_or(node)
    }

    /// Nodes whose `referenceId` is `target`, in insertion order.
    pub fn referrers(&self, target: NodeId) -> impl Iterator<Item = &Node> {
        self.referrer_index
            .get(&target)
            .into_iter()
            .flat_map(|indices| indices.iter().map(|&idx| &self.nodes[idx]))
    }

    /// Nodes referencing any of `targets`, merged in insertion order.
    pub fn referrers_of_any(&self, targets: &[NodeId]) -> Vec<&Node> {
        let mut indices: SmallVec<[usize; 4]> = targets
            .iter()
            .filter_map(|t| self.referrer_index.get(t))
            .flatten()
            .copied()
            .collect();
        indices.sort_unstable();
        indices.dedup();
        indices.into_iter().map(|idx| &self.nodes[idx]).collect()
    }

    /// Walk the `parentId` chain upwards, excluding `node` itself.
    ///
    /// Stops at the root, at a missing parent, or when a node repeats.
    pub fn ancestors(&self, node: &Node) -> Ancestors<'_> {
        let mut seen = HashSet::new();
        seen.insert(node.id);
        Ancestors {
            doc: self,
            next: node.parent_id,
            seen,
        }
    }

    /// Check if `ancestor_id` is a parent/grandparent/etc. of `descendant_id`.
    pub fn is_ancestor_of(&self, ancestor_id: NodeId, descendant_id: NodeId) -> bool {
        self.node(descendant_id)
            .is_some_and(|n| self.ancestors(n).any(|a| a.id == ancestor_id))
    }
}

/// Iterator over a node's ancestors with a cycle guard.
pub struct Ancestors<'a> {
    doc: &'a Document,
    next: Option<NodeId>,
    seen: HashSet<NodeId>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<&'a Node> {
        let id = self.next.take()?;
        if !self.seen.insert(id) {
            log::trace!("parent cycle at @{id}");
            return None;
        }
        let node = self.doc.node(id)?;
        self.next = node.parent_id;
        Some(node)
    }
}
