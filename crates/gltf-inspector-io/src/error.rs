use std::io;

use gltf_inspector_core::InspectError;
use thiserror::Error;

/// Errors that can occur while loading a glTF package or reading its bytes.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Inspect(#[from] InspectError),

    #[error("Invalid GLB: {0}")]
    InvalidGlb(String),

    #[error("No .gltf or .glb file found among {0} files")]
    NoRootAsset(usize),

    #[error("Referenced file not found: {0}")]
    MissingFile(String),

    #[error("Invalid URI: {0}")]
    InvalidUri(String),

    #[error("Unsupported feature: {0}")]
    Unsupported(String),

    #[error("Buffer {index} is {len} bytes, above the {max} byte limit")]
    BufferTooLarge { index: usize, len: usize, max: usize },

    /// A byte range reaches past the end of the data that backs it.
    #[error("{what} needs bytes {start}..{end}, but only {len} are available")]
    OutOfBounds {
        what: String,
        start: usize,
        end: usize,
        len: usize,
    },
}

pub type Result<T> = std::result::Result<T, LoadError>;
