use thiserror::Error;

/// Errors raised while reading or writing a project file.
///
/// The resolvers themselves never fail; these only surface at the edges.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error(transparent)]
    /// The input is not valid JSON, or a node/template has the wrong shape
    Json(#[from] serde_json::Error),

    #[error("`{field}` must be an object keyed by id or an array")]
    /// `nodes` or `templates` is neither a map nor a list
    Shape { field: &'static str },

    #[error("project has no root node (rootId: {root_id:?})")]
    /// No `rootId` and no parentless node, or `rootId` names a missing node
    MissingRoot { root_id: Option<String> },
}
