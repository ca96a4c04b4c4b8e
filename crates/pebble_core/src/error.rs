//! Error taxonomy for the level-set pipeline.

use nalgebra::Point3;
use thiserror::Error;

pub type ShapeResult<T> = Result<T, ShapeError>;

#[derive(Debug, Clone, Error)]
pub enum ShapeError {
    /// The mesh was rejected before any level was computed.
    #[error("Invalid mesh: {0}")]
    InvalidMesh(String),

    /// Crossings on shared half-edges could not be paired after the merge.
    #[error(
        "Degenerate geometry: {unmatched} unmatched crossing(s) at center ({:.6}, {:.6}, {:.6}) with {level_count} levels.",
        center.x,
        center.y,
        center.z
    )]
    Degenerate {
        unmatched: usize,
        center: Point3<f64>,
        level_count: usize,
    },

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    /// The caller asked to stop. Not a failure of the input.
    #[error("Computation cancelled.")]
    Cancelled,
}

impl ShapeError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ShapeError::Cancelled)
    }

    pub fn is_degenerate(&self) -> bool {
        matches!(self, ShapeError::Degenerate { .. })
    }

    pub(crate) fn invalid_mesh(err: anyhow::Error) -> Self {
        ShapeError::InvalidMesh(format!("{err:#}"))
    }

    pub(crate) fn invalid_parameters(err: anyhow::Error) -> Self {
        ShapeError::InvalidParameters(format!("{err:#}"))
    }
}

#[cfg(test)]
mod tests {
    use super::ShapeError;
    use nalgebra::Point3;

    #[test]
    fn degenerate_message_names_configuration() {
        let err = ShapeError::Degenerate {
            unmatched: 3,
            center: Point3::new(0.5, 0.0, -1.0),
            level_count: 12,
        };
        let message = err.to_string();
        assert!(message.contains("3 unmatched"), "unexpected message: {message}");
        assert!(message.contains("12 levels"), "unexpected message: {message}");
        assert!(err.is_degenerate());
        assert!(!err.is_cancelled());
    }

    #[test]
    fn anyhow_context_is_flattened_into_invalid_mesh() {
        let err = anyhow::anyhow!("face 4 repeats vertex 2.").context("Mesh validation failed");
        let converted = ShapeError::invalid_mesh(err);
        let message = converted.to_string();
        assert!(message.contains("Mesh validation failed"), "{message}");
        assert!(message.contains("face 4 repeats vertex 2"), "{message}");
    }
}
