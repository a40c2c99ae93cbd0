//! Typed glTF 2.0 document model.
//!
//! Every entity keeps the fields the inspector consumes as typed members and
//! carries all remaining JSON members in a flattened `extra` map, so a
//! document can be written back out without losing data. Each entity also
//! owns an [`Annotation`] record that is filled in by
//! [`annotate`](crate::annotate::annotate) and never serialized.
//!
//! Cross references are positional indices into the arrays of [`Document`];
//! the declaration order of every array is therefore significant.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::accessor_types::{AccessorType, ComponentType};
use crate::error::Result;

/// Name of the pseudo-attribute used for a primitive's index accessor.
pub const INDICES_SLOT: &str = "INDICES";

/// Kind of entity an [`Annotation`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetType {
    Buffer,
    View,
    Accessor,
    Material,
    Primitive,
    Mesh,
    Node,
}

impl AssetType {
    pub fn name(&self) -> &'static str {
        match self {
            AssetType::Buffer => "buffer",
            AssetType::View => "view",
            AssetType::Accessor => "accessor",
            AssetType::Material => "material",
            AssetType::Primitive => "primitive",
            AssetType::Mesh => "mesh",
            AssetType::Node => "node",
        }
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Derived metadata attached to every entity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Annotation {
    /// `None` until the entity has been annotated.
    pub asset_type: Option<AssetType>,
    /// Position of the entity in its containing array.
    pub self_index: usize,
    /// Byte size attributed to the entity.
    pub size: u64,
    /// Number of incoming references.
    pub reference_count: usize,
    /// Nesting depth (node traversal depth, or 0/1 for meshes/primitives).
    pub hierarchy: usize,
    /// Pre-order traversal rank; only assigned to nodes.
    pub order: Option<usize>,
}

// ============================================================================
// Top-level document
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(default)]
    pub asset: Asset,
    /// Default scene index (if present).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scene: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scenes: Vec<Scene>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<Node>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub meshes: Vec<Mesh>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub buffers: Vec<Buffer>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub buffer_views: Vec<BufferView>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub accessors: Vec<Accessor>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub materials: Vec<Material>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extensions_used: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extensions_required: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Document {
    /// Parse a glTF JSON document.
    pub fn from_slice(json: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(json)?)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize back to glTF JSON. Annotations are not written.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn to_json_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Total number of primitives across all meshes.
    pub fn num_primitives(&self) -> usize {
        self.meshes.iter().map(|m| m.primitives.len()).sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generator: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Asset {
    fn default() -> Self {
        Self {
            version: "2.0".to_string(),
            generator: None,
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub nodes: Vec<usize>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ============================================================================
// Binary storage
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Buffer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub byte_length: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    #[serde(skip)]
    pub annotation: Annotation,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BufferView {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub buffer: usize,
    #[serde(default)]
    pub byte_offset: u64,
    pub byte_length: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub byte_stride: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    #[serde(skip)]
    pub annotation: Annotation,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Accessor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buffer_view: Option<usize>,
    #[serde(default)]
    pub byte_offset: u64,
    pub component_type: u32,
    pub count: u64,
    #[serde(rename = "type")]
    pub accessor_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sparse: Option<Sparse>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    #[serde(skip)]
    pub annotation: Annotation,
}

impl Accessor {
    pub fn component_type(&self) -> Result<ComponentType> {
        ComponentType::from_gl(self.component_type)
    }

    pub fn item_type(&self) -> Result<AccessorType> {
        AccessorType::parse(&self.accessor_type)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sparse {
    pub count: u64,
    pub indices: SparseIndices,
    pub values: SparseValues,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SparseIndices {
    pub buffer_view: usize,
    #[serde(default)]
    pub byte_offset: u64,
    pub component_type: u32,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SparseValues {
    pub buffer_view: usize,
    #[serde(default)]
    pub byte_offset: u64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ============================================================================
// Materials, meshes and nodes
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Material {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pbr_metallic_roughness: Option<PbrMetallicRoughness>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    #[serde(skip)]
    pub annotation: Annotation,
    /// Number of nodes whose mesh uses this material.
    #[serde(skip)]
    pub reference_count_nodes: usize,
}

impl Material {
    /// Display label, falling back to `Unnamed Material #<index>`.
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("Unnamed Material #{}", self.annotation.self_index),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PbrMetallicRoughness {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_color_factor: Option<[f64; 4]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metallic_factor: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roughness_factor: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mesh {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub primitives: Vec<Primitive>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    #[serde(skip)]
    pub annotation: Annotation,
}

impl Mesh {
    /// Distinct material indices used by the mesh's primitives, ascending.
    pub fn material_indices(&self) -> Vec<usize> {
        let mut materials: Vec<usize> = self.primitives.iter().filter_map(|p| p.material).collect();
        materials.sort_unstable();
        materials.dedup();
        materials
    }

    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => "Unnamed Mesh".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Primitive {
    /// Semantic name to accessor index, in declaration order.
    #[serde(default)]
    pub attributes: IndexMap<String, usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indices: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    #[serde(skip)]
    pub annotation: Annotation,
}

impl Primitive {
    /// Every accessor slot of the primitive as `(semantic, accessor)`, with
    /// the index accessor last under [`INDICES_SLOT`].
    pub fn accessor_slots(&self) -> Vec<(&str, usize)> {
        let mut slots: Vec<(&str, usize)> = self
            .attributes
            .iter()
            .map(|(name, &accessor)| (name.as_str(), accessor))
            .collect();
        if let Some(indices) = self.indices {
            slots.push((INDICES_SLOT, indices));
        }
        slots
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Index into meshes array.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mesh: Option<usize>,
    /// Child node indices.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<usize>,
    /// 4x4 transformation matrix (column-major).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matrix: Option<[f64; 16]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation: Option<[f64; 3]>,
    /// Rotation quaternion [x, y, z, w].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<[f64; 4]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<[f64; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extras: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    #[serde(skip)]
    pub annotation: Annotation,
}

pub const IDENTITY_MATRIX: [f64; 16] = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
];

impl Node {
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("Node #{}", self.annotation.self_index),
        }
    }

    /// Local transform as a column-major 4x4 matrix.
    ///
    /// Uses `matrix` when present, otherwise composes `T * R * S`, and falls
    /// back to identity.
    pub fn local_matrix(&self) -> [f64; 16] {
        if let Some(m) = self.matrix {
            return m;
        }
        if self.translation.is_none() && self.rotation.is_none() && self.scale.is_none() {
            return IDENTITY_MATRIX;
        }

        let t = self.translation.unwrap_or([0.0, 0.0, 0.0]);
        let [qx, qy, qz, qw] = self.rotation.unwrap_or([0.0, 0.0, 0.0, 1.0]);
        let s = self.scale.unwrap_or([1.0, 1.0, 1.0]);

        let (xx, yy, zz) = (qx * qx, qy * qy, qz * qz);
        let (xy, xz, yz) = (qx * qy, qx * qz, qy * qz);
        let (wx, wy, wz) = (qw * qx, qw * qy, qw * qz);

        // Rotation rows
        let rot = [
            [1.0 - 2.0 * (yy + zz), 2.0 * (xy - wz), 2.0 * (xz + wy)],
            [2.0 * (xy + wz), 1.0 - 2.0 * (xx + zz), 2.0 * (yz - wx)],
            [2.0 * (xz - wy), 2.0 * (yz + wx), 1.0 - 2.0 * (xx + yy)],
        ];

        let mut out = [0.0; 16];
        for col in 0..3 {
            for row in 0..3 {
                out[col * 4 + row] = rot[row][col] * s[col];
            }
        }
        out[12] = t[0];
        out[13] = t[1];
        out[14] = t[2];
        out[15] = 1.0;
        out
    }
}
