//! Domain-specific errors.

use thiserror::Error;

/// Problems reading an image's position or size.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GeometryError {
    #[error("missing `{name}` attribute")]
    MissingAttribute { name: &'static str },
    #[error("invalid `{name}` length '{value}'")]
    InvalidLength { name: &'static str, value: String },
}

/// Recoverable failures while computing a clone transform. The duplicate is still converted.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TransformError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),
    #[error("invalid transform '{value}': {reason}")]
    InvalidTransform { value: String, reason: String },
    #[error("original transform '{value}' is not invertible")]
    SingularOriginal { value: String },
    #[error("transform has non-finite coefficients")]
    NonFinite,
}

/// Fatal failures that abort the run before the document is written.
#[derive(Debug, Error)]
pub enum CloneError {
    #[error("clone-of target '{id}' does not exist")]
    MissingOriginal { id: String },
    #[error("original image '{id}' has invalid geometry")]
    OriginalGeometry {
        id: String,
        #[source]
        source: GeometryError,
    },
    #[error("original image '{id}' has degenerate size {width}x{height}")]
    DegenerateOriginal { id: String, width: f64, height: f64 },
}
