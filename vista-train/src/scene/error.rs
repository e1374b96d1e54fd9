use crate::ingest::IngestError;
use std::path::PathBuf;
use thiserror::Error;
use vista_data::DataError;

/// Errors raised by [`SceneIndex`](super::SceneIndex) bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexError {
    #[error("View {0} is already active")]
    DuplicateActivation(usize),
    #[error("Cannot renumber {train_len} active views into a pool of {pool_len} over a universe of {universe_len}")]
    InvalidRenumbering {
        train_len: usize,
        pool_len: usize,
        universe_len: usize,
    },
}

/// Errors raised by scene construction, access and mutation.
#[derive(Debug, Error)]
pub enum SceneError {
    #[error("Resolution scale {0} was not realized")]
    UnknownScale(f32),

    #[error("Inflated cameras are only supported at scale 1.0, not {0}")]
    UnsupportedScale(f32),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error("Selection index {index} out of range for {len} cameras")]
    SelectionOutOfRange { index: usize, len: usize },

    #[error("Camera identifier {id} out of sequence, expected {expected}")]
    IdentifierOutOfSequence { id: usize, expected: usize },

    #[error("Pool at scale {scale} holds {len} cameras, expected {expected}")]
    PoolMismatch { scale: f32, len: usize, expected: usize },

    #[error("View {id} has no camera realized at scale {scale}")]
    CameraNotRealized { id: usize, scale: f32 },

    #[error("No snapshots found in {0}")]
    NoSnapshots(PathBuf),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
