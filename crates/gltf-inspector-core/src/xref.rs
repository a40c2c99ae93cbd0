//! Cross-reference queries over an annotated document.
//!
//! The free functions re-derive their answer on every call. [`XrefIndex`]
//! precomputes the same reverse maps once per document for constant-time
//! lookups. Both return results in ascending index order and never mutate
//! the document; an out-of-range argument yields an empty result.

use serde::Serialize;

use crate::annotate::AnnotatedDocument;
use crate::document::{Accessor, AssetType, BufferView, Material, Mesh, Node};

/// Location of a primitive: mesh index plus position inside the mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PrimitiveRef {
    pub mesh: usize,
    pub primitive: usize,
}

pub fn nodes_referencing_mesh(doc: &AnnotatedDocument, mesh: usize) -> Vec<&Node> {
    doc.nodes.iter().filter(|n| n.mesh == Some(mesh)).collect()
}

/// Meshes with at least one primitive using `material`.
pub fn meshes_referencing_material(doc: &AnnotatedDocument, material: usize) -> Vec<&Mesh> {
    doc.meshes
        .iter()
        .filter(|m| m.primitives.iter().any(|p| p.material == Some(material)))
        .collect()
}

/// Nodes whose mesh is one of [`meshes_referencing_material`].
pub fn nodes_referencing_material(doc: &AnnotatedDocument, material: usize) -> Vec<&Node> {
    let mut uses_material = vec![false; doc.meshes.len()];
    for mesh in meshes_referencing_material(doc, material) {
        uses_material[mesh.annotation.self_index] = true;
    }

    doc.nodes
        .iter()
        .filter(|n| n.mesh.map_or(false, |m| uses_material[m]))
        .collect()
}

/// Distinct materials used by the primitives of the node's mesh.
pub fn materials_referenced_by_node(doc: &AnnotatedDocument, node: usize) -> Vec<&Material> {
    let Some(mesh) = doc.nodes.get(node).and_then(|n| n.mesh) else {
        return Vec::new();
    };
    doc.meshes[mesh]
        .material_indices()
        .into_iter()
        .map(|m| &doc.materials[m])
        .collect()
}

pub fn views_referencing_buffer(doc: &AnnotatedDocument, buffer: usize) -> Vec<&BufferView> {
    doc.buffer_views.iter().filter(|v| v.buffer == buffer).collect()
}

pub fn accessors_referencing_view(doc: &AnnotatedDocument, view: usize) -> Vec<&Accessor> {
    doc.accessors
        .iter()
        .filter(|a| a.buffer_view == Some(view))
        .collect()
}

/// Primitives with at least one slot (attribute or indices) reading `accessor`.
pub fn primitives_referencing_accessor(doc: &AnnotatedDocument, accessor: usize) -> Vec<PrimitiveRef> {
    let mut refs = Vec::new();
    for (mesh_index, mesh) in doc.meshes.iter().enumerate() {
        for (prim_index, primitive) in mesh.primitives.iter().enumerate() {
            if primitive.accessor_slots().iter().any(|&(_, a)| a == accessor) {
                refs.push(PrimitiveRef {
                    mesh: mesh_index,
                    primitive: prim_index,
                });
            }
        }
    }
    refs
}

/// Case-insensitive substring match on entity names.
///
/// An empty needle matches every entity of the kind. Primitives carry no
/// name and never match.
pub fn search_by_name(doc: &AnnotatedDocument, kind: AssetType, needle: &str) -> Vec<usize> {
    let needle = needle.to_lowercase();
    let names: Vec<Option<&str>> = match kind {
        AssetType::Buffer => doc.buffers.iter().map(|e| e.name.as_deref()).collect(),
        AssetType::View => doc.buffer_views.iter().map(|e| e.name.as_deref()).collect(),
        AssetType::Accessor => doc.accessors.iter().map(|e| e.name.as_deref()).collect(),
        AssetType::Material => doc.materials.iter().map(|e| e.name.as_deref()).collect(),
        AssetType::Mesh => doc.meshes.iter().map(|e| e.name.as_deref()).collect(),
        AssetType::Node => doc.nodes.iter().map(|e| e.name.as_deref()).collect(),
        AssetType::Primitive => return Vec::new(),
    };

    names
        .into_iter()
        .enumerate()
        .filter(|(_, name)| {
            needle.is_empty() || name.map_or(false, |n| n.to_lowercase().contains(&needle))
        })
        .map(|(i, _)| i)
        .collect()
}

// ============================================================================
// Precomputed index
// ============================================================================

/// Reverse reference maps built once per annotated document.
#[derive(Debug, Clone, Default)]
pub struct XrefIndex {
    nodes_by_mesh: Vec<Vec<usize>>,
    meshes_by_material: Vec<Vec<usize>>,
    nodes_by_material: Vec<Vec<usize>>,
    materials_by_node: Vec<Vec<usize>>,
    views_by_buffer: Vec<Vec<usize>>,
    accessors_by_view: Vec<Vec<usize>>,
    primitives_by_accessor: Vec<Vec<PrimitiveRef>>,
}

fn slice_at<T>(table: &[Vec<T>], index: usize) -> &[T] {
    table.get(index).map(Vec::as_slice).unwrap_or(&[])
}

impl XrefIndex {
    pub fn build(doc: &AnnotatedDocument) -> Self {
        let mut index = XrefIndex {
            nodes_by_mesh: vec![Vec::new(); doc.meshes.len()],
            meshes_by_material: vec![Vec::new(); doc.materials.len()],
            nodes_by_material: vec![Vec::new(); doc.materials.len()],
            materials_by_node: vec![Vec::new(); doc.nodes.len()],
            views_by_buffer: vec![Vec::new(); doc.buffers.len()],
            accessors_by_view: vec![Vec::new(); doc.buffer_views.len()],
            primitives_by_accessor: vec![Vec::new(); doc.accessors.len()],
        };

        for (i, view) in doc.buffer_views.iter().enumerate() {
            index.views_by_buffer[view.buffer].push(i);
        }
        for (i, accessor) in doc.accessors.iter().enumerate() {
            if let Some(view) = accessor.buffer_view {
                index.accessors_by_view[view].push(i);
            }
        }

        let mut mesh_materials = Vec::with_capacity(doc.meshes.len());
        for (mesh_index, mesh) in doc.meshes.iter().enumerate() {
            for (prim_index, primitive) in mesh.primitives.iter().enumerate() {
                let prim_ref = PrimitiveRef {
                    mesh: mesh_index,
                    primitive: prim_index,
                };
                for (_, accessor) in primitive.accessor_slots() {
                    let refs = &mut index.primitives_by_accessor[accessor];
                    // Slots of one primitive are visited together, so a
                    // repeated accessor shows up as the last entry.
                    if refs.last() != Some(&prim_ref) {
                        refs.push(prim_ref);
                    }
                }
            }

            let materials = mesh.material_indices();
            for &material in &materials {
                index.meshes_by_material[material].push(mesh_index);
            }
            mesh_materials.push(materials);
        }

        for (node_index, node) in doc.nodes.iter().enumerate() {
            if let Some(mesh) = node.mesh {
                index.nodes_by_mesh[mesh].push(node_index);
                for &material in &mesh_materials[mesh] {
                    index.nodes_by_material[material].push(node_index);
                }
                index.materials_by_node[node_index] = mesh_materials[mesh].clone();
            }
        }

        index
    }

    pub fn nodes_referencing_mesh(&self, mesh: usize) -> &[usize] {
        slice_at(&self.nodes_by_mesh, mesh)
    }

    pub fn meshes_referencing_material(&self, material: usize) -> &[usize] {
        slice_at(&self.meshes_by_material, material)
    }

    pub fn nodes_referencing_material(&self, material: usize) -> &[usize] {
        slice_at(&self.nodes_by_material, material)
    }

    pub fn materials_referenced_by_node(&self, node: usize) -> &[usize] {
        slice_at(&self.materials_by_node, node)
    }

    pub fn views_referencing_buffer(&self, buffer: usize) -> &[usize] {
        slice_at(&self.views_by_buffer, buffer)
    }

    pub fn accessors_referencing_view(&self, view: usize) -> &[usize] {
        slice_at(&self.accessors_by_view, view)
    }

    pub fn primitives_referencing_accessor(&self, accessor: usize) -> &[PrimitiveRef] {
        slice_at(&self.primitives_by_accessor, accessor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotate::annotate;
    use crate::document::Document;

    fn indices_of<T>(items: &[&T], self_index: impl Fn(&T) -> usize) -> Vec<usize> {
        items.iter().map(|&i| self_index(i)).collect()
    }

    fn sample() -> AnnotatedDocument {
        // mesh 0 uses materials 0 and 1, mesh 1 uses material 1 twice,
        // mesh 2 has no material. Nodes 0 and 2 share mesh 1.
        let json = r#"{
            "asset": {"version": "2.0"},
            "buffers": [{"byteLength": 96}, {"byteLength": 12, "name": "Extra"}],
            "bufferViews": [
                {"buffer": 0, "byteLength": 48},
                {"buffer": 0, "byteOffset": 48, "byteLength": 48},
                {"buffer": 1, "byteLength": 12}
            ],
            "accessors": [
                {"bufferView": 0, "count": 4, "type": "VEC3", "componentType": 5126},
                {"bufferView": 1, "count": 24, "type": "SCALAR", "componentType": 5123},
                {"bufferView": 2, "count": 3, "type": "SCALAR", "componentType": 5126}
            ],
            "materials": [{"name": "Red"}, {"name": "Blue"}, {"name": "Unused"}],
            "meshes": [
                {"name": "Cube", "primitives": [
                    {"attributes": {"POSITION": 0}, "indices": 1, "material": 0},
                    {"attributes": {"POSITION": 0}, "indices": 1, "material": 1}
                ]},
                {"name": "Sphere", "primitives": [
                    {"attributes": {"POSITION": 0}, "material": 1},
                    {"attributes": {"POSITION": 2}, "material": 1}
                ]},
                {"name": "Plain", "primitives": [{"attributes": {"POSITION": 2}}]}
            ],
            "nodes": [
                {"name": "Left", "mesh": 1, "children": [1, 3]},
                {"name": "Center", "mesh": 0},
                {"name": "Right", "mesh": 1},
                {"name": "Empty"},
                {"name": "Bare", "mesh": 2}
            ]
        }"#;
        annotate(Document::from_json_str(json).unwrap()).unwrap()
    }

    #[test]
    fn test_nodes_referencing_mesh() {
        let doc = sample();
        let nodes = nodes_referencing_mesh(&doc, 1);
        assert_eq!(indices_of(&nodes, |n: &Node| n.annotation.self_index), vec![0, 2]);
        assert_eq!(doc.meshes[1].annotation.reference_count, 2);
        assert!(nodes_referencing_mesh(&doc, 42).is_empty());
    }

    #[test]
    fn test_material_queries() {
        let doc = sample();

        let meshes = meshes_referencing_material(&doc, 1);
        assert_eq!(indices_of(&meshes, |m: &Mesh| m.annotation.self_index), vec![0, 1]);

        let nodes = nodes_referencing_material(&doc, 1);
        assert_eq!(indices_of(&nodes, |n: &Node| n.annotation.self_index), vec![0, 1, 2]);

        let nodes = nodes_referencing_material(&doc, 0);
        assert_eq!(indices_of(&nodes, |n: &Node| n.annotation.self_index), vec![1]);

        assert!(meshes_referencing_material(&doc, 2).is_empty());
        assert!(nodes_referencing_material(&doc, 2).is_empty());

        assert_eq!(doc.materials[1].annotation.reference_count, 3);
        assert_eq!(doc.materials[1].reference_count_nodes, 3);
        assert_eq!(doc.materials[0].reference_count_nodes, 1);
    }

    #[test]
    fn test_materials_referenced_by_node() {
        let doc = sample();

        let materials = materials_referenced_by_node(&doc, 1);
        assert_eq!(
            indices_of(&materials, |m: &Material| m.annotation.self_index),
            vec![0, 1]
        );
        // Repeated material on one mesh is reported once.
        assert_eq!(materials_referenced_by_node(&doc, 0).len(), 1);
        assert!(materials_referenced_by_node(&doc, 3).is_empty());
        assert!(materials_referenced_by_node(&doc, 4).is_empty());
        assert!(materials_referenced_by_node(&doc, 99).is_empty());
    }

    #[test]
    fn test_storage_queries() {
        let doc = sample();

        let views = views_referencing_buffer(&doc, 0);
        assert_eq!(indices_of(&views, |v: &BufferView| v.annotation.self_index), vec![0, 1]);

        let accessors = accessors_referencing_view(&doc, 2);
        assert_eq!(indices_of(&accessors, |a: &Accessor| a.annotation.self_index), vec![2]);

        let prims = primitives_referencing_accessor(&doc, 2);
        assert_eq!(
            prims,
            vec![
                PrimitiveRef { mesh: 1, primitive: 1 },
                PrimitiveRef { mesh: 2, primitive: 0 }
            ]
        );
    }

    #[test]
    fn test_search_by_name() {
        let doc = sample();
        assert_eq!(search_by_name(&doc, AssetType::Node, "e"), vec![0, 1, 3, 4]);
        assert_eq!(search_by_name(&doc, AssetType::Node, "RIGHT"), vec![2]);
        assert_eq!(search_by_name(&doc, AssetType::Mesh, ""), vec![0, 1, 2]);
        assert_eq!(search_by_name(&doc, AssetType::Buffer, "extra"), vec![1]);
        assert!(search_by_name(&doc, AssetType::Primitive, "").is_empty());
    }

    #[test]
    fn test_index_agrees_with_queries() {
        let doc = sample();
        let index = XrefIndex::build(&doc);

        for mesh in 0..doc.meshes.len() {
            let expected: Vec<usize> = nodes_referencing_mesh(&doc, mesh)
                .iter()
                .map(|n| n.annotation.self_index)
                .collect();
            assert_eq!(index.nodes_referencing_mesh(mesh), expected.as_slice());
        }
        for material in 0..doc.materials.len() {
            let meshes: Vec<usize> = meshes_referencing_material(&doc, material)
                .iter()
                .map(|m| m.annotation.self_index)
                .collect();
            let nodes: Vec<usize> = nodes_referencing_material(&doc, material)
                .iter()
                .map(|n| n.annotation.self_index)
                .collect();
            assert_eq!(index.meshes_referencing_material(material), meshes.as_slice());
            assert_eq!(index.nodes_referencing_material(material), nodes.as_slice());
        }
        for node in 0..doc.nodes.len() {
            let materials: Vec<usize> = materials_referenced_by_node(&doc, node)
                .iter()
                .map(|m| m.annotation.self_index)
                .collect();
            assert_eq!(index.materials_referenced_by_node(node), materials.as_slice());
        }
        for accessor in 0..doc.accessors.len() {
            assert_eq!(
                index.primitives_referencing_accessor(accessor),
                primitives_referencing_accessor(&doc, accessor).as_slice()
            );
        }
        assert_eq!(index.views_referencing_buffer(1), &[2]);
        assert_eq!(index.accessors_referencing_view(0), &[0]);
        assert!(index.nodes_referencing_mesh(17).is_empty());
    }
}
