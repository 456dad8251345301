//! Hit testing: point → element (and grid cell) lookup on a planned page.
//!
//! Reverse-walks the paint order (last painted = topmost) and tests each
//! element in its own unrotated frame.

use crate::plan::{LinkAction, PagePlan, PlannedElement};
use kurbo::{Affine, Point};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Hit {
    pub element_id: String,
    /// Index into the grid's cells, for grid elements.
    pub cell: Option<usize>,
    /// The cell's link for grid cells, otherwise the element's link.
    pub link: Option<LinkAction>,
}

/// Find the topmost element at page position `(x, y)`.
/// Returns `None` if only the page background is hit.
pub fn hit_test(plan: &PagePlan, x: f64, y: f64) -> Option<Hit> {
    let point = Point::new(x, y);
    plan.elements
        .iter()
        .rev()
        .find_map(|element| hit_element(element, point))
}

fn hit_element(element: &PlannedElement, point: Point) -> Option<Hit> {
    let local = unrotate(element, point);
    if !element.bounds.contains(local) {
        return None;
    }

    let Some(grid) = &element.grid else {
        return Some(Hit {
            element_id: element.id.clone(),
            cell: None,
            link: element.link.clone(),
        });
    };

    let cell = grid.cells.iter().position(|c| c.bounds.contains(local));
    let link = match cell {
        Some(idx) => grid.cells[idx].link.clone(),
        None => element.link.clone(),
    };
    Some(Hit {
        element_id: element.id.clone(),
        cell,
        link,
    })
}

/// Map a page point into the element's unrotated frame.
fn unrotate(element: &PlannedElement, point: Point) -> Point {
    if element.rotation == 0.0 {
        return point;
    }
    Affine::rotate_about(-element.rotation.to_radians(), element.pivot) * point
}
