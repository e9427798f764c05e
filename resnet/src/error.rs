use std::path::PathBuf;

use thiserror::Error;

use super::architecture::ArchitectureError;
use super::checkpoint::CheckpointError;

#[derive(Debug, Error)]
pub enum ResNetError {
    #[error("invalid cell value {value} at ({row}, {col}), expected -1, 0 or 1")]
    InvalidCellValue { row: usize, col: usize, value: i8 },

    #[error("invalid side to move {0}, expected -1 or 1")]
    InvalidSideToMove(i8),

    #[error("shape mismatch for {what}: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        what: &'static str,
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    #[error("failed to restore the model from {path:?}")]
    Restore {
        path: PathBuf,
        #[source]
        source: CheckpointError,
    },

    #[error("failed to save the model to {path:?}")]
    Save {
        path: PathBuf,
        #[source]
        source: CheckpointError,
    },

    #[error(transparent)]
    Architecture(#[from] ArchitectureError),

    #[error(transparent)]
    Torch(#[from] tch::TchError),
}

impl ResNetError {
    pub(crate) fn shape_mismatch(what: &'static str, expected: &[usize], found: &[usize]) -> Self {
        ResNetError::ShapeMismatch {
            what,
            expected: expected.to_vec(),
            found: found.to_vec(),
        }
    }
}

pub type Result<T, E = ResNetError> = std::result::Result<T, E>;
