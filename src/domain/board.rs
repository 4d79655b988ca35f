use serde::{Deserialize, Serialize};

/// A discussion board as the origin describes it in its breadcrumb.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    pub id: i64,
    pub name: String,
    /// Enclosing board, if this is a child board. Not checked against stored boards.
    pub parent: Option<i64>,
    /// Top-level category label, e.g. "Bitcoin".
    pub container: Option<String>,
}
