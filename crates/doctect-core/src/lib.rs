pub mod context;
pub mod error;
pub mod expr;
pub mod grid;
pub mod id;
pub mod import;
pub mod link;
pub mod lint;
pub mod model;
pub mod referrer;
pub mod text;

pub use context::{available_fields, context_nodes};
pub use error::ImportError;
pub use expr::{ChildReferrerExpr, Segment, evaluate_math, parse_bindings};
pub use grid::{CellPosition, GridLayout, resolve_grid_items};
pub use id::NodeId;
pub use import::{export_json, import_json};
pub use link::{live_page, resolve_link_target, resolve_live_link};
pub use lint::{LintDiagnostic, LintSeverity, lint_document};
pub use model::*;
pub use referrer::find_child_referrer;
pub use text::{resolve_element_text, resolve_text};
