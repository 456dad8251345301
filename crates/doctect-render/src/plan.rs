//! Page planning: node + template → positioned, resolved page content.
//!
//! A `PagePlan` is what both the editor canvas and the PDF writer draw. The
//! two modes differ only where the author is helped by seeing something that
//! must not reach the printed page:
//!
//! - **Canvas**: an empty grid still shows `placeholder_cells` blank cells.
//! - **Export**: empty grids are omitted.
//!
//! Text, cell geometry and link destinations are otherwise identical.

use doctect_core::grid::{GridLayout, cell_origin, grid_extent, item_label};
use doctect_core::{
    CellPosition, Document, Element, ElementKind, ElementStyle, GridConfig, LinkSpec, LinkTarget,
    Node, NodeId, live_page, resolve_element_text, resolve_live_link,
};
use kurbo::{Point, Rect};
use serde::Serialize;

// ─── Config ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanMode {
    /// Interactive editor preview.
    #[default]
    Canvas,
    /// Printed output.
    Export,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlanConfig {
    pub mode: PlanMode,
    /// Blank cells drawn for an empty grid on the canvas.
    pub placeholder_cells: usize,
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            mode: PlanMode::Canvas,
            placeholder_cells: 6,
        }
    }
}

impl PlanConfig {
    pub fn export() -> Self {
        Self {
            mode: PlanMode::Export,
            ..Default::default()
        }
    }
}

// ─── Plan types ──────────────────────────────────────────────────────────

/// Where activating an element takes the reader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "target", rename_all = "lowercase")]
pub enum LinkAction {
    Uri(String),
    Node(NodeId),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedCell {
    /// `None` for canvas placeholders.
    pub item: Option<NodeId>,
    pub position: CellPosition,
    pub bounds: Rect,
    pub text: Option<String>,
    pub link: Option<LinkAction>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedGrid {
    pub cells: Vec<PlannedCell>,
    /// Union of every row the cells span, including leading offset cells.
    pub bounds: Rect,
    pub offset: i64,
    pub placeholder: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedElement {
    pub id: String,
    pub kind: ElementKind,
    pub bounds: Rect,
    /// Degrees, clockwise about `pivot`.
    pub rotation: f64,
    pub pivot: Point,
    pub style: ElementStyle,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<LinkAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grid: Option<PlannedGrid>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PagePlan {
    pub node_id: NodeId,
    pub template_id: String,
    pub title: String,
    pub mode: PlanMode,
    pub width: f64,
    pub height: f64,
    /// Paint order: ascending z-index, ties by template order.
    pub elements: Vec<PlannedElement>,
}

impl PagePlan {
    pub fn element(&self, id: &str) -> Option<&PlannedElement> {
        self.elements.iter().find(|e| e.id == id)
    }

    /// Every link on the page, element links and cell links alike.
    pub fn links(&self) -> impl Iterator<Item = &LinkAction> {
        self.elements.iter().flat_map(|e| {
            let cells = e.grid.iter().flat_map(|g| g.cells.iter());
            e.link.iter().chain(cells.filter_map(|c| c.link.as_ref()))
        })
    }

    pub(crate) fn links_mut(&mut self) -> impl Iterator<Item = &mut Option<LinkAction>> {
        self.elements.iter_mut().flat_map(|e| {
            let cells = e.grid.iter_mut().flat_map(|g| g.cells.iter_mut());
            std::iter::once(&mut e.link).chain(cells.map(|c| &mut c.link))
        })
    }
}

// ─── Planning ────────────────────────────────────────────────────────────

/// Plan the page of `node_id`. `None` when the node or its template is missing.
#[must_use]
pub fn plan_page(doc: &Document, node_id: NodeId, config: &PlanConfig) -> Option<PagePlan> {
    let node = doc.node(node_id)?;
    let Some(template) = doc.template_for(node) else {
        log::debug!("no template `{}` for @{node_id}", node.kind);
        return None;
    };

    let elements: Vec<PlannedElement> = template
        .paint_order()
        .into_iter()
        .filter_map(|element| plan_element(doc, node, element, config))
        .collect();

    log::debug!(
        "planned @{node_id} ({:?}) with template `{}`: {} elements",
        config.mode,
        template.id,
        elements.len()
    );
    Some(PagePlan {
        node_id,
        template_id: template.id.clone(),
        title: node.title.clone(),
        mode: config.mode,
        width: template.width,
        height: template.height,
        elements,
    })
}

fn plan_element(
    doc: &Document,
    node: &Node,
    element: &Element,
    config: &PlanConfig,
) -> Option<PlannedElement> {
    let grid = match element.kind {
        ElementKind::Grid => {
            let grid_config = element.grid_config.clone().unwrap_or_default();
            let grid = plan_grid(doc, node, element, &grid_config, config);
            if grid.is_none() {
                log::trace!("@{}: empty grid `{}` omitted", node.id, element.id);
                return None;
            }
            grid
        }
        _ => None,
    };

    let bounds = match &grid {
        Some(g) => g.bounds,
        None => Rect::new(element.x, element.y, element.x + element.w, element.y + element.h),
    };
    let pivot = match element.transform_origin {
        Some(origin) => Point::new(
            bounds.x0 + origin.x * bounds.width(),
            bounds.y0 + origin.y * bounds.height(),
        ),
        None => bounds.center(),
    };

    Some(PlannedElement {
        id: element.id.clone(),
        kind: element.kind,
        bounds,
        rotation: element.rotation,
        pivot,
        style: element.style.clone(),
        text: resolve_element_text(doc, element, node),
        link: plan_link(doc, node, &element.link),
        grid,
    })
}

/// Resolve an element link into an action. Unresolvable links are inert.
fn plan_link(doc: &Document, node: &Node, link: &LinkSpec) -> Option<LinkAction> {
    match link.link_target {
        LinkTarget::None => None,
        LinkTarget::Url => {
            let uri = link.link_value.trim();
            (!uri.is_empty()).then(|| LinkAction::Uri(uri.to_string()))
        }
        _ => {
            let action = resolve_live_link(doc, node, link).map(|n| LinkAction::Node(n.id));
            if action.is_none() {
                log::trace!("@{}: inert {:?} link", node.id, link.link_target);
            }
            action
        }
    }
}

/// `None` when the grid resolves to no items in export mode.
fn plan_grid(
    doc: &Document,
    node: &Node,
    element: &Element,
    grid_config: &GridConfig,
    config: &PlanConfig,
) -> Option<PlannedGrid> {
    let layout = GridLayout::resolve(doc, node, grid_config);
    let placeholder = layout.is_empty();
    if placeholder && config.mode == PlanMode::Export {
        return None;
    }

    let count = if placeholder {
        config.placeholder_cells
    } else {
        layout.items.len()
    };

    let cells: Vec<PlannedCell> = (0..count)
        .map(|idx| {
            let position = layout.cell(idx);
            let (x, y) = cell_origin(element, grid_config, position);
            let bounds = Rect::new(x, y, x + element.w, y + element.h);
            match layout.items.get(idx) {
                Some(&item) => PlannedCell {
                    item: Some(item),
                    position,
                    bounds,
                    text: Some(item_label(doc, grid_config, item)),
                    link: grid_config
                        .link_items
                        .then(|| live_page(doc, item).map(|n| LinkAction::Node(n.id)))
                        .flatten(),
                },
                None => PlannedCell {
                    item: None,
                    position,
                    bounds,
                    text: None,
                    link: None,
                },
            }
        })
        .collect();

    // Cells start at row 0 unless a negative offset pushes them above.
    let first_row = cells.iter().map(|c| c.position.row).min().unwrap_or(0).min(0);
    let (width, height) = grid_extent(element, grid_config, &layout, count);
    let top = element.y + first_row as f64 * (element.h + grid_config.gap_y);
    Some(PlannedGrid {
        cells,
        bounds: Rect::new(element.x, top, element.x + width, element.y + height),
        offset: layout.offset,
        placeholder,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use doctect_core::{ElementDefaults, Template, TransformOrigin};
    use pretty_assertions::assert_eq;

    fn month_doc(days: usize) -> Document {
        let mut doc = Document::new(Node::new("pl_year", "year", "2026"));
        doc.add_child(
            NodeId::intern("pl_year"),
            Node::new("pl_jan", "month", "January").with_data("first", "2"),
        );
        for d in 0..days {
            let id = format!("pl_d{d}");
            doc.add_child(
                NodeId::intern("pl_jan"),
                Node::new(&id, "day", &format!("{}", d + 1)),
            );
        }

        let defaults = ElementDefaults::default();
        let mut grid = Element::new("days", ElementKind::Grid, 10.0, 100.0, &defaults);
        grid.w = 20.0;
        grid.h = 10.0;
        if let Some(config) = grid.grid_config.as_mut() {
            config.cols = 7;
            config.offset_start = Some(3);
        }
        let mut back = Element::new("back", ElementKind::Text, 0.0, 0.0, &defaults);
        back.text = Some("{{title}}".into());
        back.link = LinkSpec::new(LinkTarget::Parent, "");
        back.z_index = 2;
        let mut web = Element::new("web", ElementKind::Rect, 0.0, 50.0, &defaults);
        web.link = LinkSpec::new(LinkTarget::Url, " https://example.com ");
        let mut dead = Element::new("dead", ElementKind::Ellipse, 0.0, 80.0, &defaults);
        dead.link = LinkSpec::new(LinkTarget::ChildIndex, "40");

        doc.add_template(
            Template::new("month", 200.0, 300.0)
                .with_element(back)
                .with_element(grid)
                .with_element(web)
                .with_element(dead),
        );
        doc.add_template(Template::new("year", 200.0, 300.0));
        doc.add_template(Template::new("day", 200.0, 300.0));
        doc
    }

    fn plan(doc: &Document, config: &PlanConfig) -> PagePlan {
        plan_page(doc, NodeId::intern("pl_jan"), config).unwrap()
    }

    #[test]
    fn elements_in_paint_order() {
        let doc = month_doc(3);
        let ids: Vec<String> = plan(&doc, &PlanConfig::default())
            .elements
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, vec!["days", "web", "dead", "back"]);
    }

    #[test]
    fn text_and_links() {
        let doc = month_doc(3);
        let page = plan(&doc, &PlanConfig::default());
        let back = page.element("back").unwrap();
        assert_eq!(back.text.as_deref(), Some("January"));
        assert_eq!(back.link, Some(LinkAction::Node(NodeId::intern("pl_year"))));
        assert_eq!(
            page.element("web").unwrap().link,
            Some(LinkAction::Uri("https://example.com".into()))
        );
        // Unresolved links leave the element drawn but inert.
        let dead = page.element("dead").unwrap();
        assert_eq!(dead.link, None);
        assert_eq!(dead.bounds, Rect::new(0.0, 80.0, 120.0, 120.0));
    }

    #[test]
    fn grid_cells_are_placed_from_offset() {
        let doc = month_doc(5);
        let page = plan(&doc, &PlanConfig::default());
        let grid = page.element("days").unwrap().grid.as_ref().unwrap();
        assert!(!grid.placeholder);
        assert_eq!(grid.cells.len(), 5);
        assert_eq!(grid.cells[0].bounds, Rect::new(70.0, 100.0, 90.0, 110.0));
        assert_eq!(grid.cells[4].position, CellPosition { row: 1, col: 0 });
        assert_eq!(grid.cells[4].bounds, Rect::new(10.0, 110.0, 30.0, 120.0));
        assert_eq!(grid.cells[1].text.as_deref(), Some("2"));
        assert_eq!(
            grid.cells[1].link,
            Some(LinkAction::Node(NodeId::intern("pl_d1")))
        );
        assert_eq!(grid.bounds, Rect::new(10.0, 100.0, 150.0, 120.0));
    }

    #[test]
    fn link_items_off_leaves_cells_inert() {
        let mut doc = month_doc(2);
        let mut template = doc.template("month").unwrap().clone();
        if let Some(config) = template.elements[1].grid_config.as_mut() {
            config.link_items = false;
        }
        doc.add_template(template);
        let page = plan(&doc, &PlanConfig::default());
        let grid = page.element("days").unwrap().grid.as_ref().unwrap();
        assert!(grid.cells.iter().all(|c| c.link.is_none()));
    }

    #[test]
    fn empty_grid_placeholder_on_canvas_omitted_on_export() {
        let doc = month_doc(0);
        let canvas = plan(&doc, &PlanConfig::default());
        let grid = canvas.element("days").unwrap().grid.as_ref().unwrap();
        assert!(grid.placeholder);
        assert_eq!(grid.cells.len(), 6);
        assert!(grid.cells.iter().all(|c| c.item.is_none() && c.link.is_none() && c.text.is_none()));

        let export = plan(&doc, &PlanConfig::export());
        assert!(export.element("days").is_none());
        assert_eq!(export.elements.len(), 3);
    }

    #[test]
    fn pivot_defaults_to_centre() {
        let mut doc = month_doc(1);
        let mut template = doc.template("month").unwrap().clone();
        template.elements[2].rotation = 45.0;
        template.elements[2].transform_origin = Some(TransformOrigin { x: 0.0, y: 1.0 });
        doc.add_template(template);

        let page = plan(&doc, &PlanConfig::default());
        let web = page.element("web").unwrap();
        assert_eq!(web.rotation, 45.0);
        assert_eq!(web.pivot, Point::new(0.0, 90.0));
        assert_eq!(page.element("back").unwrap().pivot, Point::new(60.0, 20.0));
    }

    #[test]
    fn missing_node_or_template() {
        let mut doc = month_doc(1);
        assert!(plan_page(&doc, NodeId::intern("pl_nowhere"), &PlanConfig::default()).is_none());
        doc.add_child(NodeId::intern("pl_year"), Node::new("pl_misc", "misc", "Misc"));
        assert!(plan_page(&doc, NodeId::intern("pl_misc"), &PlanConfig::default()).is_none());
    }
}
