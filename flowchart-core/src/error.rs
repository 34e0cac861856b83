//! Error types for document and history operations.

use std::fmt;

use thiserror::Error;

/// Result type for document operations.
pub type FlowResult<T> = Result<T, FlowError>;

/// What an id was expected to resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    /// A node looked up by its own id.
    Node,
    /// An edge looked up by its own id.
    Edge,
    /// The node an edge starts from.
    SourceNode,
    /// The node an edge points to.
    TargetNode,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Node => "Node",
            Self::Edge => "Edge",
            Self::SourceNode => "Source node",
            Self::TargetNode => "Target node",
        };
        f.write_str(name)
    }
}

/// Errors that can occur in document operations.
#[derive(Debug, Error)]
pub enum FlowError {
    /// An add was attempted with an id that already exists.
    #[error("{entity} {id} already exists")]
    DuplicateId {
        /// Node or edge.
        entity: EntityKind,
        /// The colliding id.
        id: String,
    },

    /// An id did not resolve.
    #[error("{entity} {id} does not exist")]
    NotFound {
        /// What the id was expected to name.
        entity: EntityKind,
        /// The missing id.
        id: String,
    },

    /// An import payload has the wrong shape or fails validation.
    #[error("Invalid flowchart data: {0}")]
    Format(String),

    /// JSON serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A history operation was invoked while another one is still running.
    #[error("Command history is busy: nested {0} rejected")]
    HistoryBusy(&'static str),

    /// A command could not be applied.
    #[error("Command failed: {0}")]
    Command(String),
}

impl FlowError {
    /// Shorthand for a [`FlowError::NotFound`].
    pub fn not_found(entity: EntityKind, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Shorthand for a [`FlowError::DuplicateId`].
    pub fn duplicate(entity: EntityKind, id: impl Into<String>) -> Self {
        Self::DuplicateId {
            entity,
            id: id.into(),
        }
    }
}
