//! GLB (binary glTF) container parsing.
//!
//! Layout: a 12-byte header (magic, version, total length) followed by
//! chunks of `[length: u32][type: u32][data]`. The first JSON chunk holds
//! the document and the first BIN chunk backs buffer 0 when that buffer has
//! no URI. Unknown chunk types are skipped.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{LoadError, Result};

// ============================================================================
// GLB Binary Format Constants
// ============================================================================

pub const GLB_MAGIC: u32 = 0x46546C67; // "glTF" in little-endian
pub const GLB_VERSION: u32 = 2;
pub const GLB_CHUNK_JSON: u32 = 0x4E4F534A; // "JSON"
pub const GLB_CHUNK_BIN: u32 = 0x004E4942; // "BIN\0"

const HEADER_LEN: usize = 12;
const CHUNK_HEADER_LEN: usize = 8;

/// The two payloads of a GLB container, borrowed from the input.
#[derive(Debug, Clone, Copy)]
pub struct GlbChunks<'a> {
    pub json: &'a [u8],
    pub bin: Option<&'a [u8]>,
}

/// Whether `data` starts with the GLB magic.
pub fn is_glb(data: &[u8]) -> bool {
    data.len() >= 4 && LittleEndian::read_u32(&data[0..4]) == GLB_MAGIC
}

/// Split a GLB container, requiring the declared length to fit the data.
pub fn split(data: &[u8]) -> Result<GlbChunks<'_>> {
    split_with(data, true)
}

/// Split a GLB container.
///
/// With `strict_length` false, a header length larger than the data is
/// clamped to the data instead of being rejected.
pub fn split_with(data: &[u8], strict_length: bool) -> Result<GlbChunks<'_>> {
    if data.len() < HEADER_LEN {
        return Err(LoadError::InvalidGlb("File too small for GLB header".into()));
    }

    let magic = LittleEndian::read_u32(&data[0..4]);
    let version = LittleEndian::read_u32(&data[4..8]);
    let mut length = LittleEndian::read_u32(&data[8..12]) as usize;

    if magic != GLB_MAGIC {
        return Err(LoadError::InvalidGlb("Invalid GLB magic".into()));
    }
    if version != GLB_VERSION {
        return Err(LoadError::InvalidGlb(format!(
            "Unsupported GLB version: {}",
            version
        )));
    }
    if length > data.len() {
        if strict_length {
            return Err(LoadError::InvalidGlb(format!(
                "File truncated: header declares {} bytes, found {}",
                length,
                data.len()
            )));
        }
        tracing::warn!(declared = length, actual = data.len(), "GLB length exceeds data");
        length = data.len();
    }

    let mut offset = HEADER_LEN;
    let mut json_chunk: Option<&[u8]> = None;
    let mut bin_chunk: Option<&[u8]> = None;

    while offset + CHUNK_HEADER_LEN <= length {
        let chunk_length = LittleEndian::read_u32(&data[offset..offset + 4]) as usize;
        let chunk_type = LittleEndian::read_u32(&data[offset + 4..offset + 8]);
        offset += CHUNK_HEADER_LEN;

        let chunk_end = match offset.checked_add(chunk_length) {
            Some(end) if end <= length => end,
            _ => return Err(LoadError::InvalidGlb("Chunk extends past file end".into())),
        };

        let chunk_data = &data[offset..chunk_end];
        offset = chunk_end;

        match chunk_type {
            GLB_CHUNK_JSON if json_chunk.is_none() => json_chunk = Some(chunk_data),
            GLB_CHUNK_BIN if bin_chunk.is_none() => bin_chunk = Some(chunk_data),
            _ => tracing::debug!(chunk_type, chunk_length, "skipping GLB chunk"),
        }
    }

    let json = json_chunk.ok_or_else(|| LoadError::InvalidGlb("No JSON chunk".into()))?;
    Ok(GlbChunks {
        json,
        bin: bin_chunk,
    })
}

/// Assemble a GLB container from a JSON document and optional binary payload.
///
/// The JSON chunk is padded with spaces and the BIN chunk with zeros to
/// 4-byte alignment.
pub fn assemble(json: &[u8], bin: Option<&[u8]>) -> Vec<u8> {
    let json_padding = (4 - json.len() % 4) % 4;
    let padded_json_len = json.len() + json_padding;
    let bin_chunk_len = bin.map_or(0, |b| CHUNK_HEADER_LEN + b.len() + (4 - b.len() % 4) % 4);
    let total_len = HEADER_LEN + CHUNK_HEADER_LEN + padded_json_len + bin_chunk_len;

    let mut out = Vec::with_capacity(total_len);
    out.extend_from_slice(&GLB_MAGIC.to_le_bytes());
    out.extend_from_slice(&GLB_VERSION.to_le_bytes());
    out.extend_from_slice(&(total_len as u32).to_le_bytes());

    out.extend_from_slice(&(padded_json_len as u32).to_le_bytes());
    out.extend_from_slice(&GLB_CHUNK_JSON.to_le_bytes());
    out.extend_from_slice(json);
    out.resize(out.len() + json_padding, b' ');

    if let Some(bin) = bin {
        let bin_padding = (4 - bin.len() % 4) % 4;
        out.extend_from_slice(&((bin.len() + bin_padding) as u32).to_le_bytes());
        out.extend_from_slice(&GLB_CHUNK_BIN.to_le_bytes());
        out.extend_from_slice(bin);
        out.resize(out.len() + bin_padding, 0);
    }
    out
}
