//! Error types for scenestack
//!
//! Per-scene structural errors (`MissingBand`, `BandRead`, `GridMismatch`)
//! are recoverable: the batch loop records them and skips the scene.
//! `UnknownIndex` is a configuration mistake and is raised before any
//! work starts. `OutputWrite` aborts the batch it occurs in.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for scenestack operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("scene '{scene}' is missing the {role} band (expected a file ending in {suffix})")]
    MissingBand {
        scene: String,
        role: &'static str,
        suffix: &'static str,
    },

    #[error("cannot read band {path}: {reason}")]
    BandRead { path: PathBuf, reason: String },

    #[error("band grid mismatch: expected {expected_rows}x{expected_cols}, got {actual_rows}x{actual_cols}")]
    GridMismatch {
        expected_rows: usize,
        expected_cols: usize,
        actual_rows: usize,
        actual_cols: usize,
    },

    #[error("unknown spectral index selector '{0}': must be one of NDVI (0), NDMI (1), NBR (2)")]
    UnknownIndex(String),

    #[error("cannot reconcile array shapes: {0}")]
    ShapeReconcile(String),

    #[error("cannot write output {path}: {reason}")]
    OutputWrite { path: PathBuf, reason: String },

    #[error("invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("unsupported data type: {0}")]
    UnsupportedDataType(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether this error should skip the current scene rather than
    /// abort the whole batch.
    pub fn is_scene_recoverable(&self) -> bool {
        matches!(
            self,
            Error::MissingBand { .. } | Error::BandRead { .. } | Error::GridMismatch { .. }
        )
    }
}

/// Result type alias for scenestack operations
pub type Result<T> = std::result::Result<T, Error>;
