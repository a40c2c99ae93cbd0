//! Accessor byte resolution.
//!
//! [`AssetResolver`] follows accessor -> bufferView -> buffer, loads buffer
//! payloads from the package on first use and decodes the addressed bytes as
//! little-endian components.
//!
//! Layout of a returned [`TypedBuffer`]:
//!
//! - tightly packed views: `data` holds `count * num_components` elements,
//!   `offset` is 0 and `stride` equals the component count
//! - interleaved views (`byteStride` larger than the item): `data` covers
//!   whole stride slots starting at the slot holding the accessor's first
//!   byte; `offset` and `stride` are measured in elements
//!
//! Sparse accessors are densified into a packed buffer. Sparse data over an
//! interleaved view, and accessors with neither a view nor sparse data,
//! resolve to `Ok(None)`.

use std::cell::OnceCell;
use std::sync::Arc;

use byteorder::{ByteOrder, LittleEndian};
use gltf_inspector_core::{Accessor, AccessorType, BufferView, ComponentType, Document};
use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::error::{LoadError, Result};
use crate::options::LoadOptions;
use crate::package::FilePackage;
use crate::uri::{self, UriKind};

/// Largest zero base, in bytes, built for a sparse accessor without a view
/// when no buffer length limit is configured.
pub const MAX_SPARSE_BASE_LEN: usize = 256 * 1024 * 1024;

// ============================================================================
// Component Data
// ============================================================================

/// Decoded components, one variant per glTF component type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "componentType", content = "values")]
pub enum ComponentData {
    Int8(Vec<i8>),
    Uint8(Vec<u8>),
    Int16(Vec<i16>),
    Uint16(Vec<u16>),
    Uint32(Vec<u32>),
    Float32(Vec<f32>),
}

impl ComponentData {
    /// Decode as many whole components of `component_type` as `bytes` holds.
    pub fn decode(component_type: ComponentType, bytes: &[u8]) -> Self {
        let n = bytes.len() / component_type.byte_length();
        let src = &bytes[..n * component_type.byte_length()];
        match component_type {
            ComponentType::Int8 => ComponentData::Int8(src.iter().map(|&b| b as i8).collect()),
            ComponentType::Uint8 => ComponentData::Uint8(src.to_vec()),
            ComponentType::Int16 => {
                let mut dst = vec![0i16; n];
                LittleEndian::read_i16_into(src, &mut dst);
                ComponentData::Int16(dst)
            }
            ComponentType::Uint16 => {
                let mut dst = vec![0u16; n];
                LittleEndian::read_u16_into(src, &mut dst);
                ComponentData::Uint16(dst)
            }
            ComponentType::Uint32 => {
                let mut dst = vec![0u32; n];
                LittleEndian::read_u32_into(src, &mut dst);
                ComponentData::Uint32(dst)
            }
            ComponentType::Float32 => {
                let mut dst = vec![0f32; n];
                LittleEndian::read_f32_into(src, &mut dst);
                ComponentData::Float32(dst)
            }
        }
    }

    pub fn zeros(component_type: ComponentType, n: usize) -> Self {
        match component_type {
            ComponentType::Int8 => ComponentData::Int8(vec![0; n]),
            ComponentType::Uint8 => ComponentData::Uint8(vec![0; n]),
            ComponentType::Int16 => ComponentData::Int16(vec![0; n]),
            ComponentType::Uint16 => ComponentData::Uint16(vec![0; n]),
            ComponentType::Uint32 => ComponentData::Uint32(vec![0; n]),
            ComponentType::Float32 => ComponentData::Float32(vec![0.0; n]),
        }
    }

    pub fn component_type(&self) -> ComponentType {
        match self {
            ComponentData::Int8(_) => ComponentType::Int8,
            ComponentData::Uint8(_) => ComponentType::Uint8,
            ComponentData::Int16(_) => ComponentType::Int16,
            ComponentData::Uint16(_) => ComponentType::Uint16,
            ComponentData::Uint32(_) => ComponentType::Uint32,
            ComponentData::Float32(_) => ComponentType::Float32,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ComponentData::Int8(v) => v.len(),
            ComponentData::Uint8(v) => v.len(),
            ComponentData::Int16(v) => v.len(),
            ComponentData::Uint16(v) => v.len(),
            ComponentData::Uint32(v) => v.len(),
            ComponentData::Float32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element `i` widened to `f64`.
    pub fn get(&self, i: usize) -> Option<f64> {
        match self {
            ComponentData::Int8(v) => v.get(i).map(|&x| f64::from(x)),
            ComponentData::Uint8(v) => v.get(i).map(|&x| f64::from(x)),
            ComponentData::Int16(v) => v.get(i).map(|&x| f64::from(x)),
            ComponentData::Uint16(v) => v.get(i).map(|&x| f64::from(x)),
            ComponentData::Uint32(v) => v.get(i).map(|&x| f64::from(x)),
            ComponentData::Float32(v) => v.get(i).map(|&x| f64::from(x)),
        }
    }

    /// Element `i` as an index, for integer data.
    fn index(&self, i: usize) -> Option<usize> {
        match self {
            ComponentData::Uint8(v) => v.get(i).map(|&x| x as usize),
            ComponentData::Uint16(v) => v.get(i).map(|&x| x as usize),
            ComponentData::Uint32(v) => v.get(i).map(|&x| x as usize),
            _ => None,
        }
    }

    /// Copy `len` elements from `src[src_start..]` to `self[dst_start..]`.
    /// Both sides must hold the same component type and the ranges must fit.
    fn copy_range(&mut self, dst_start: usize, src: &ComponentData, src_start: usize, len: usize) -> bool {
        fn copy<T: Copy>(dst: &mut [T], d: usize, src: &[T], s: usize, len: usize) -> bool {
            match (dst.get_mut(d..d + len), src.get(s..s + len)) {
                (Some(dst), Some(src)) => {
                    dst.copy_from_slice(src);
                    true
                }
                _ => false,
            }
        }
        match (self, src) {
            (ComponentData::Int8(d), ComponentData::Int8(s)) => copy(d, dst_start, s, src_start, len),
            (ComponentData::Uint8(d), ComponentData::Uint8(s)) => copy(d, dst_start, s, src_start, len),
            (ComponentData::Int16(d), ComponentData::Int16(s)) => copy(d, dst_start, s, src_start, len),
            (ComponentData::Uint16(d), ComponentData::Uint16(s)) => copy(d, dst_start, s, src_start, len),
            (ComponentData::Uint32(d), ComponentData::Uint32(s)) => copy(d, dst_start, s, src_start, len),
            (ComponentData::Float32(d), ComponentData::Float32(s)) => copy(d, dst_start, s, src_start, len),
            _ => false,
        }
    }
}

// ============================================================================
// Typed Buffer
// ============================================================================

/// The decoded contents of one accessor.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedBuffer {
    pub accessor_type: AccessorType,
    /// Number of items (vectors or matrices).
    pub count: usize,
    /// Element index of the first item's first component.
    pub offset: usize,
    /// Elements between the starts of consecutive items.
    pub stride: usize,
    pub data: ComponentData,
}

impl TypedBuffer {
    pub fn component_type(&self) -> ComponentType {
        self.data.component_type()
    }

    pub fn num_components(&self) -> usize {
        self.accessor_type.num_components()
    }

    pub fn is_interleaved(&self) -> bool {
        self.stride != self.num_components()
    }

    /// Component `component` of item `item`.
    pub fn component(&self, item: usize, component: usize) -> Option<f64> {
        if item >= self.count || component >= self.num_components() {
            return None;
        }
        self.data.get(self.offset + item * self.stride + component)
    }

    /// All components of item `item`, in storage order.
    pub fn item(&self, item: usize) -> Option<Vec<f64>> {
        (0..self.num_components())
            .map(|c| self.component(item, c))
            .collect()
    }

    /// Every item, packed.
    pub fn items(&self) -> Vec<Vec<f64>> {
        (0..self.count).filter_map(|i| self.item(i)).collect()
    }
}

// ============================================================================
// Asset Resolver
// ============================================================================

/// Where a buffer's payload comes from.
#[derive(Debug, Clone)]
enum BufferSource {
    /// The BIN chunk of the root GLB.
    Embedded,
    /// A `data:` URI, decoded on first use.
    DataUri(String),
    /// A package key.
    File(String),
    Remote(String),
    /// No URI and no BIN chunk to fall back to.
    Missing,
}

/// Loads buffer payloads on demand and resolves accessor bytes.
///
/// Payloads are cached per buffer for the resolver's lifetime. The resolver
/// does not own the document; every query takes it explicitly.
#[derive(Debug)]
pub struct AssetResolver {
    package: FilePackage,
    bin_chunk: Option<Arc<[u8]>>,
    sources: Vec<BufferSource>,
    cache: Vec<OnceCell<Arc<[u8]>>>,
    max_buffer_len: Option<usize>,
}

impl AssetResolver {
    pub fn new(
        document: &Document,
        package: FilePackage,
        bin_chunk: Option<Arc<[u8]>>,
        options: &LoadOptions,
    ) -> Result<Self> {
        let mut sources = Vec::with_capacity(document.buffers.len());
        for (i, buffer) in document.buffers.iter().enumerate() {
            let source = match buffer.uri.as_deref() {
                None if i == 0 && bin_chunk.is_some() => BufferSource::Embedded,
                None => BufferSource::Missing,
                Some(u) => match uri::classify(u) {
                    UriKind::Data(d) => BufferSource::DataUri(d.to_string()),
                    UriKind::Remote(r) => BufferSource::Remote(r.to_string()),
                    UriKind::Relative(r) => BufferSource::File(uri::resolve_relative(
                        package.root_path(),
                        r,
                        options.decode_uris(),
                    )?),
                },
            };
            sources.push(source);
        }

        Ok(Self {
            package,
            bin_chunk,
            cache: (0..sources.len()).map(|_| OnceCell::new()).collect(),
            sources,
            max_buffer_len: options.max_buffer_len(),
        })
    }

    /// Element count of the zero base a sparse accessor without a view is
    /// densified over. The byte size is capped by `max_buffer_len`, or
    /// [`MAX_SPARSE_BASE_LEN`] when no limit is set.
    fn sparse_base_len(
        &self,
        index: usize,
        count: usize,
        num_components: usize,
        element_bytes: usize,
    ) -> Result<usize> {
        let max = self.max_buffer_len.unwrap_or(MAX_SPARSE_BASE_LEN);
        let elements = count.checked_mul(num_components);
        let byte_len = elements.and_then(|n| n.checked_mul(element_bytes));
        match (elements, byte_len) {
            (Some(elements), Some(len)) if len <= max => Ok(elements),
            _ => Err(LoadError::OutOfBounds {
                what: format!("accessor {} sparse base", index),
                start: 0,
                end: byte_len.unwrap_or(usize::MAX),
                len: max,
            }),
        }
    }

    pub fn package(&self) -> &FilePackage {
        &self.package
    }

    /// The package key a buffer is read from, if it is file-backed.
    pub fn buffer_path(&self, buffer: usize) -> Option<&str> {
        match self.sources.get(buffer)? {
            BufferSource::File(key) => Some(key),
            _ => None,
        }
    }

    /// The full payload of `buffer`.
    pub fn load_buffer(&self, buffer: usize) -> Result<Arc<[u8]>> {
        let cell = self.cache.get(buffer).ok_or_else(|| LoadError::OutOfBounds {
            what: "buffer index".into(),
            start: buffer,
            end: buffer + 1,
            len: self.cache.len(),
        })?;
        if let Some(bytes) = cell.get() {
            return Ok(bytes.clone());
        }

        let bytes = self.fetch(buffer)?;
        if let Some(max) = self.max_buffer_len {
            if bytes.len() > max {
                return Err(LoadError::BufferTooLarge {
                    index: buffer,
                    len: bytes.len(),
                    max,
                });
            }
        }
        debug!(buffer, len = bytes.len(), "loaded buffer");
        Ok(cell.get_or_init(|| bytes).clone())
    }

    fn fetch(&self, buffer: usize) -> Result<Arc<[u8]>> {
        match &self.sources[buffer] {
            BufferSource::Embedded => self
                .bin_chunk
                .clone()
                .ok_or_else(|| LoadError::InvalidGlb("No BIN chunk".into())),
            BufferSource::DataUri(data) => Ok(uri::decode_data_uri(data)?.into()),
            BufferSource::File(key) => self
                .package
                .get(key)
                .cloned()
                .ok_or_else(|| LoadError::MissingFile(key.clone())),
            BufferSource::Remote(uri) => Err(LoadError::Unsupported(format!(
                "Remote buffer URI {}",
                uri
            ))),
            BufferSource::Missing => Err(LoadError::InvalidGlb(format!(
                "Buffer {} has no URI and no BIN chunk backs it",
                buffer
            ))),
        }
    }

    /// The raw bytes of buffer view `view`.
    pub fn load_view(&self, document: &Document, view: usize) -> Result<Vec<u8>> {
        let (bytes, start, end) = self.view_range(document, view)?;
        Ok(bytes[start..end].to_vec())
    }

    fn view_range(&self, document: &Document, view: usize) -> Result<(Arc<[u8]>, usize, usize)> {
        let buffer_view = buffer_view(document, view)?;
        let bytes = self.load_buffer(buffer_view.buffer)?;
        let start = buffer_view.byte_offset as usize;
        let end = start.saturating_add(buffer_view.byte_length as usize);
        check_range(&format!("bufferView {}", view), start, end, bytes.len())?;
        Ok((bytes, start, end))
    }

    /// Decode accessor `index`.
    pub fn load_accessor(&self, document: &Document, index: usize) -> Result<Option<TypedBuffer>> {
        let accessor = document.accessors.get(index).ok_or_else(|| LoadError::OutOfBounds {
            what: "accessor index".into(),
            start: index,
            end: index + 1,
            len: document.accessors.len(),
        })?;
        let component_type = accessor.component_type()?;
        let accessor_type = accessor.item_type()?;
        let count = accessor.count as usize;
        let num_components = accessor_type.num_components();
        let element_bytes = component_type.byte_length();
        let item_bytes = num_components * element_bytes;

        let base = match accessor.buffer_view {
            Some(view) => {
                let stride = buffer_view(document, view)?.byte_stride.map(|s| s as usize);
                if let Some(stride) = stride.filter(|&s| s > 0 && s != item_bytes) {
                    if accessor.sparse.is_some() {
                        warn!(accessor = index, "sparse data over an interleaved view is not displayed");
                        return Ok(None);
                    }
                    return self
                        .load_interleaved(document, index, view, stride, accessor_type, component_type)
                        .map(Some);
                }

                let (bytes, view_start, view_end) = self.view_range(document, view)?;
                let start = view_start.saturating_add(accessor.byte_offset as usize);
                let end = start.saturating_add(count.saturating_mul(item_bytes));
                check_range(&format!("accessor {}", index), start, end, view_end)?;
                ComponentData::decode(component_type, &bytes[start..end])
            }
            None if accessor.sparse.is_some() => {
                let elements = self.sparse_base_len(index, count, num_components, element_bytes)?;
                ComponentData::zeros(component_type, elements)
            }
            None => {
                warn!(accessor = index, "accessor has no bufferView and no sparse data");
                return Ok(None);
            }
        };

        let mut buffer = TypedBuffer {
            accessor_type,
            count,
            offset: 0,
            stride: num_components,
            data: base,
        };
        if accessor.sparse.is_some() {
            self.apply_sparse(document, index, accessor, &mut buffer)?;
        }
        Ok(Some(buffer))
    }

    fn load_interleaved(
        &self,
        document: &Document,
        index: usize,
        view: usize,
        byte_stride: usize,
        accessor_type: AccessorType,
        component_type: ComponentType,
    ) -> Result<TypedBuffer> {
        let accessor = &document.accessors[index];
        let (bytes, view_start, view_end) = self.view_range(document, view)?;
        let element_bytes = component_type.byte_length();
        let item_bytes = accessor_type.num_components() * element_bytes;
        let count = accessor.count as usize;
        let byte_offset = accessor.byte_offset as usize;

        // Start at the stride slot containing the first item.
        let slot = byte_offset / byte_stride;
        let inner = byte_offset % byte_stride;
        let what = || format!("accessor {}", index);
        let start = offset_add(&what(), view_start, slot * byte_stride, view_end)?;

        if count > 0 {
            let first_end = offset_add(&what(), start, inner + item_bytes, view_end)?;
            let needed = (count - 1).saturating_mul(byte_stride).saturating_add(first_end);
            check_range(&what(), start, needed, view_end)?;
        }
        let end = start.saturating_add(count.saturating_mul(byte_stride)).min(view_end);
        trace!(accessor = index, byte_stride, slot, "interleaved accessor");

        Ok(TypedBuffer {
            accessor_type,
            count,
            offset: inner / element_bytes,
            stride: byte_stride / element_bytes,
            data: ComponentData::decode(component_type, &bytes[start..end]),
        })
    }

    fn apply_sparse(
        &self,
        document: &Document,
        index: usize,
        accessor: &Accessor,
        buffer: &mut TypedBuffer,
    ) -> Result<()> {
        let Some(sparse) = &accessor.sparse else {
            return Ok(());
        };
        let sparse_count = sparse.count as usize;
        let num_components = buffer.num_components();
        let component_type = buffer.component_type();
        let what = || format!("accessor {} sparse", index);

        let index_type = ComponentType::from_gl(sparse.indices.component_type)?;
        let (bytes, view_start, view_end) = self.view_range(document, sparse.indices.buffer_view)?;
        let start = offset_add(&what(), view_start, sparse.indices.byte_offset as usize, view_end)?;
        let end = start.saturating_add(sparse_count.saturating_mul(index_type.byte_length()));
        check_range(&what(), start, end, view_end)?;
        let indices = ComponentData::decode(index_type, &bytes[start..end]);

        let (bytes, view_start, view_end) = self.view_range(document, sparse.values.buffer_view)?;
        let start = offset_add(&what(), view_start, sparse.values.byte_offset as usize, view_end)?;
        let end = start.saturating_add(sparse_count.saturating_mul(num_components * component_type.byte_length()));
        check_range(&what(), start, end, view_end)?;
        let values = ComponentData::decode(component_type, &bytes[start..end]);

        for k in 0..sparse_count {
            let target = indices.index(k).ok_or_else(|| {
                LoadError::Unsupported(format!("{} indices of type {}", what(), index_type))
            })?;
            if target >= buffer.count {
                return Err(LoadError::OutOfBounds {
                    what: format!("{} index {}", what(), k),
                    start: target,
                    end: target + 1,
                    len: buffer.count,
                });
            }
            buffer
                .data
                .copy_range(target * num_components, &values, k * num_components, num_components);
        }
        Ok(())
    }
}

fn buffer_view(document: &Document, view: usize) -> Result<&BufferView> {
    document.buffer_views.get(view).ok_or_else(|| LoadError::OutOfBounds {
        what: "bufferView index".into(),
        start: view,
        end: view + 1,
        len: document.buffer_views.len(),
    })
}

/// `base + offset`, failing like [`check_range`] when the sum overflows.
fn offset_add(what: &str, base: usize, offset: usize, len: usize) -> Result<usize> {
    base.checked_add(offset).ok_or_else(|| LoadError::OutOfBounds {
        what: what.to_string(),
        start: base,
        end: usize::MAX,
        len,
    })
}

fn check_range(what: &str, start: usize, end: usize, len: usize) -> Result<()> {
    if start > end || end > len {
        return Err(LoadError::OutOfBounds {
            what: what.to_string(),
            start,
            end,
            len,
        });
    }
    Ok(())
}
