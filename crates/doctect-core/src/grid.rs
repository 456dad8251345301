//! Grid resolution: which nodes a grid element shows, and where.
//!
//! A grid element describes *one cell* (`w`×`h`); the `GridConfig` decides
//! the item list (root selection → traversal → final slice) and the starting
//! offset (static, or read from the first item's data). Canvas and PDF both
//! place cells with `cell_position`, so their layouts agree cell for cell.

use crate::expr::parse_int_prefix;
use crate::id::NodeId;
use crate::model::{Document, Element, GridConfig, Node, OffsetMode, SliceStep, SourceType};
use crate::text::resolve_text;
use serde::Serialize;
use std::ops::Range;

/// Ordered item ids for a grid rendered on `node`.
pub fn resolve_grid_items(doc: &Document, node: &Node, config: &GridConfig) -> Vec<NodeId> {
    let roots: Vec<NodeId> = match config.source_type {
        SourceType::Current => vec![node.id],
        SourceType::Specific => config
            .source_id
            .as_deref()
            .and_then(|id| doc.node_by_str(id))
            .map(|n| vec![n.id])
            .unwrap_or_default(),
    };

    let whole = [SliceStep::default()];
    let steps: &[SliceStep] = if config.traversal_path.is_empty() {
        &whole
    } else {
        config.traversal_path.as_slice()
    };

    let mut current = roots;
    for step in steps {
        current = current
            .iter()
            .filter_map(|&id| doc.node(id))
            .flat_map(|n| {
                let children = &doc.resolve_reference(n).children;
                children[slice_range(children.len(), step.slice_start, step.slice_count)]
                    .iter()
                    .copied()
            })
            .collect();
    }

    let range = slice_range(
        current.len(),
        config.data_slice_start,
        config.data_slice_count,
    );
    current[range].to_vec()
}

/// Starting cell offset for `items`.
///
/// Dynamic mode reads `offset_field` from the first item (one reference hop)
/// and adds `offset_adjustment`; unparseable values fall back to the static
/// `offset_start`. A negative result is shifted by one row.
pub fn compute_offset(doc: &Document, items: &[NodeId], config: &GridConfig) -> i64 {
    let static_offset = config.offset_start.unwrap_or(0);
    let offset = match config.offset_mode {
        OffsetMode::Static => static_offset,
        OffsetMode::Dynamic => items
            .first()
            .and_then(|&id| doc.node(id))
            .map(|n| doc.resolve_reference(n))
            .zip(config.offset_field.as_deref())
            .and_then(|(n, field)| n.data.get(field))
            .and_then(parse_int_prefix)
            .map(|v| v.saturating_add(config.offset_adjustment))
            .unwrap_or(static_offset),
    };
    if offset < 0 {
        offset + config.columns()
    } else {
        offset
    }
}

/// JavaScript `Array.prototype.slice(start, start + count)` bounds.
fn slice_range(len: usize, start: Option<i64>, count: Option<i64>) -> Range<usize> {
    let len = i64::try_from(len).unwrap_or(i64::MAX);
    let clamp = |i: i64| if i < 0 { (len + i).max(0) } else { i.min(len) };
    let raw_start = start.unwrap_or(0);
    let begin = clamp(raw_start);
    let end = count.map_or(len, |c| clamp(raw_start.saturating_add(c)));
    // Both ends are clamped into 0..=len above.
    let begin = begin as usize;
    let end = (end as usize).max(begin);
    begin..end
}

/// Row / column of a cell. Rows may be negative for large negative offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CellPosition {
    pub row: i64,
    pub col: i64,
}

/// Place the item at list position `idx`.
pub fn cell_position(idx: usize, offset: i64, cols: i64) -> CellPosition {
    let cols = cols.max(1);
    let pos = i64::try_from(idx).unwrap_or(i64::MAX).saturating_add(offset);
    CellPosition {
        row: pos.div_euclid(cols),
        col: pos.rem_euclid(cols),
    }
}

/// Resolved grid: items plus the offset they are laid out from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridLayout {
    pub items: Vec<NodeId>,
    pub offset: i64,
    pub cols: i64,
}

impl GridLayout {
    pub fn resolve(doc: &Document, node: &Node, config: &GridConfig) -> Self {
        let items = resolve_grid_items(doc, node, config);
        let offset = compute_offset(doc, &items, config);
        log::trace!(
            "grid @{}: {} items, offset {offset}",
            node.id,
            items.len()
        );
        Self {
            items,
            offset,
            cols: config.columns(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn cell(&self, idx: usize) -> CellPosition {
        cell_position(idx, self.offset, self.cols)
    }

    /// Number of rows spanned by `count` cells starting at the offset.
    pub fn rows(&self, count: usize) -> i64 {
        let filled = i64::try_from(count)
            .unwrap_or(i64::MAX)
            .saturating_add(self.offset);
        let cols = self.cols.max(1);
        if filled <= 0 {
            0
        } else {
            filled.div_euclid(cols) + i64::from(filled.rem_euclid(cols) != 0)
        }
    }
}

/// Top-left of a cell in template coordinates.
pub fn cell_origin(element: &Element, config: &GridConfig, cell: CellPosition) -> (f64, f64) {
    (
        element.x + cell.col as f64 * (element.w + config.gap_x),
        element.y + cell.row as f64 * (element.h + config.gap_y),
    )
}

/// Overall `(width, height)` of a grid holding `count` cells.
pub fn grid_extent(element: &Element, config: &GridConfig, layout: &GridLayout, count: usize) -> (f64, f64) {
    let cols = layout.cols as f64;
    let width = cols * element.w + (cols - 1.0) * config.gap_x;
    let rows = layout.rows(count) as f64;
    let height = if rows > 0.0 {
        rows * element.h + (rows - 1.0) * config.gap_y
    } else {
        0.0
    };
    (width, height)
}

/// Text shown in the cell of `item`.
pub fn item_label(doc: &Document, config: &GridConfig, item: NodeId) -> String {
    let template = config.display_field.as_deref().unwrap_or("{{title}}");
    resolve_text(doc, template, doc.node(item))
}
