//! Renderer error types.

use thiserror::Error;

use crate::RenderDiagnostic;

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RenderError>;

/// Errors that can occur during rendering.
#[derive(Debug, Error)]
pub enum RenderError {
    /// One or more elements reference unregistered component types.
    #[error("{} element(s) reference unknown component types", .0.len())]
    UnknownComponents(Vec<RenderDiagnostic>),

    /// A tree operation failed while preparing the render.
    #[error(transparent)]
    Core(#[from] site_core::CoreError),
}
