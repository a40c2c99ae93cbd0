//! Error type shared by the annotation pass and the document model.

use thiserror::Error;

use crate::document::AssetType;

/// Errors that can occur while parsing or annotating a glTF document.
#[derive(Error, Debug)]
pub enum InspectError {
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// A positional reference points past the end of its target array.
    #[error("{referrer} references {kind} {index}, but only {len} exist")]
    IndexOutOfRange {
        kind: AssetType,
        index: usize,
        len: usize,
        referrer: String,
    },

    #[error("Unknown accessor component type: {0}")]
    UnknownComponentType(u32),

    #[error("Unknown accessor type: {0}")]
    UnknownAccessorType(String),
}

pub type Result<T> = std::result::Result<T, InspectError>;

/// Look up `items[index]`, reporting an [`InspectError::IndexOutOfRange`]
/// that names the referring entity on failure.
pub(crate) fn lookup<'a, T>(
    items: &'a [T],
    kind: AssetType,
    index: usize,
    referrer: impl FnOnce() -> String,
) -> Result<&'a T> {
    items.get(index).ok_or_else(|| InspectError::IndexOutOfRange {
        kind,
        index,
        len: items.len(),
        referrer: referrer(),
    })
}

/// Mutable counterpart of [`lookup`].
pub(crate) fn lookup_mut<'a, T>(
    items: &'a mut [T],
    kind: AssetType,
    index: usize,
    referrer: impl FnOnce() -> String,
) -> Result<&'a mut T> {
    let len = items.len();
    items.get_mut(index).ok_or_else(|| InspectError::IndexOutOfRange {
        kind,
        index,
        len,
        referrer: referrer(),
    })
}
