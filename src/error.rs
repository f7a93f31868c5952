//! Central error handling for drape3d
//!
//! Provides a unified OverlayError enum used by the overlay store, the
//! projector and configuration loading. Pick misses are not errors; they
//! surface as `PickResult::found == false`.

use crate::geo::GeoError;

/// Centralized error type for overlay operations
#[derive(thiserror::Error, Debug)]
pub enum OverlayError {
    #[error("Invalid index: {what} {index} (len {len})")]
    InvalidIndex {
        what: &'static str,
        index: usize,
        len: usize,
    },

    #[error("Out of memory: {0}")]
    OutOfMemory(String),

    #[error("Invalid grid: {0}")]
    InvalidGrid(String),

    #[error("Unknown window: {0}")]
    UnknownWindow(u32),

    #[error("Edit mode conflict: {0}")]
    EditModeConflict(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Projection error: {0}")]
    Projection(#[from] GeoError),
}

impl OverlayError {
    /// Short category label used in diagnostics
    pub fn category(&self) -> &'static str {
        match self {
            OverlayError::InvalidIndex { .. } => "InvalidIndex",
            OverlayError::OutOfMemory(_) => "OutOfMemory",
            OverlayError::InvalidGrid(_) => "InvalidGrid",
            OverlayError::UnknownWindow(_) => "UnknownWindow",
            OverlayError::EditModeConflict(_) => "EditModeConflict",
            OverlayError::Config(_) => "Config",
            OverlayError::Projection(_) => "Projection",
        }
    }

    /// Convenience constructors for common error types
    pub fn invalid_index(what: &'static str, index: usize, len: usize) -> Self {
        OverlayError::InvalidIndex { what, index, len }
    }

    pub fn out_of_memory<T: ToString>(msg: T) -> Self {
        OverlayError::OutOfMemory(msg.to_string())
    }

    pub fn invalid_grid<T: ToString>(msg: T) -> Self {
        OverlayError::InvalidGrid(msg.to_string())
    }

    pub fn config<T: ToString>(msg: T) -> Self {
        OverlayError::Config(msg.to_string())
    }
}

impl From<std::collections::TryReserveError> for OverlayError {
    fn from(err: std::collections::TryReserveError) -> Self {
        OverlayError::OutOfMemory(err.to_string())
    }
}

/// Result type alias for convenience
pub type OverlayResult<T> = Result<T, OverlayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        let err = OverlayError::invalid_index("point", 7, 3);
        assert_eq!(err.category(), "InvalidIndex");
        assert_eq!(err.to_string(), "Invalid index: point 7 (len 3)");

        let err = OverlayError::out_of_memory("route points");
        assert_eq!(err.category(), "OutOfMemory");
        assert!(err.to_string().contains("route points"));
    }

    #[test]
    fn test_geo_error_conversion() {
        let err: OverlayError = GeoError::Projection("bad".into()).into();
        assert_eq!(err.category(), "Projection");
    }
}
