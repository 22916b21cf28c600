//! # Engine Error Types
//!
//! All recoverable errors produced by the engine core. Invariant violations (for example a
//! mesh whose vertex count disagrees with its precomputed size) are not represented here;
//! those panic.

use thiserror::Error;

/// Errors that can occur in the engine core.
#[derive(Error, Debug)]
pub enum EngineError {
    /// A write addressed a cell outside the grid.
    #[error("block position ({x}, {y}, {z}) is outside the terrain")]
    OutOfBounds {
        /// X coordinate of the rejected write.
        x: i32,
        /// Y coordinate of the rejected write.
        y: i32,
        /// Z coordinate of the rejected write.
        z: i32,
    },

    /// World or chunk extents that the engine cannot work with.
    #[error("invalid world dimensions: {0}")]
    InvalidDimensions(String),

    /// A terrain file whose length does not match the configured grid.
    #[error("terrain file holds {actual} bytes, expected {expected}")]
    TerrainSizeMismatch {
        /// Byte count of the configured grid.
        expected: usize,
        /// Byte count found on disk.
        actual: usize,
    },

    /// An entity record that could not be decoded.
    #[error("corrupt entity record {index}: {reason}")]
    CorruptEntityRecord {
        /// Position of the record in the data file.
        index: usize,
        /// What was wrong with it.
        reason: String,
    },

    /// Underlying file system failure.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed configuration document.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

/// Convenience alias used throughout the crate.
pub type EngineResult<T> = Result<T, EngineError>;
