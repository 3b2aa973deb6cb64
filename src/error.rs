use crate::model::NodeId;

/// Why an edit was refused. Edits that fail validation leave the state untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("node {0} not found")]
    NodeNotFound(NodeId),
    #[error("cannot link a node to itself")]
    SelfLink,
    #[error("link already exists")]
    DuplicateLink,
    #[error("cannot make a node its own parent")]
    SelfParent,
    #[error("reparenting {child} under {parent} would create a cycle")]
    WouldCreateCycle { child: NodeId, parent: NodeId },
    #[error("the root node cannot be deleted or reparented")]
    RootLocked,
    #[error("invalid color {0:?}, expected #rrggbb")]
    InvalidColor(String),
}

/// Rejected external input.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("invalid mindmap JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("invalid mindmap JSON: root {0} is not in the node map")]
    MissingRoot(NodeId),
    #[error("invalid mindmap JSON: node keyed {key} has id {id}")]
    IdMismatch { key: NodeId, id: NodeId },
    #[error("outline contains no bullet items")]
    EmptyOutline,
}

/// Storage failures. Callers in this crate log and swallow them.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode state: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

pub type ImportResult<T> = std::result::Result<T, ImportError>;
pub type PersistResult<T> = std::result::Result<T, PersistError>;
