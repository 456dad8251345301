pub mod export;
pub mod hit;
pub mod plan;

pub use export::{ExportPlan, OutlineEntry, plan_export};
pub use hit::{Hit, hit_test};
pub use plan::{
    LinkAction, PagePlan, PlanConfig, PlanMode, PlannedCell, PlannedElement, PlannedGrid,
    plan_page,
};
