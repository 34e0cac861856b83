//! Renderer error types.

use thiserror::Error;

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RenderError>;

/// Errors that can occur during rendering.
#[derive(Debug, Error)]
pub enum RenderError {
    /// No render object is registered under this id.
    #[error("Render object {0} does not exist")]
    ObjectNotFound(String),

    /// A single drawable failed; the rest of the frame still painted.
    #[error("Render object {id} failed: {message}")]
    Object {
        /// Registered id, or the slot in explicit render data.
        id: String,
        /// The drawable's error chain.
        message: String,
    },

    /// The host refused an animation-frame request.
    #[error("Frame request failed: {0}")]
    Scheduler(String),

    /// Backing-store error.
    #[error("Surface error: {0}")]
    Surface(String),

    /// The renderer has been destroyed.
    #[error("Renderer destroyed")]
    Destroyed,
}

impl RenderError {
    /// Wrap a drawable's failure.
    pub fn object(id: impl Into<String>, err: &anyhow::Error) -> Self {
        Self::Object {
            id: id.into(),
            message: format!("{err:#}"),
        }
    }
}
