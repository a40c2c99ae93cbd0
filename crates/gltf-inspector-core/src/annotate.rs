//! The annotation pass.
//!
//! [`annotate`] walks the interlinked arrays of a [`Document`] in dependency
//! order and fills in every entity's [`Annotation`]:
//!
//! 1. buffers: size and self index
//! 2. buffer views: size, self index, buffer reference counts
//! 3. accessors: size (`view size - byteOffset`), view reference counts
//! 4. materials: self index, counters reset
//! 5. meshes and primitives: sizes summed per accessor slot, accessor and
//!    material reference counts
//! 6. nodes: size taken from the mesh, mesh reference counts
//! 7. material node counts
//! 8. node ordering: depth-first pre-order over the node forest
//!
//! Counters are reset at the start of every run, so annotating an already
//! annotated document yields identical values. Any positional reference
//! that points outside its target array aborts the whole pass.
//!
//! [`Annotation`]: crate::document::Annotation

use std::ops::Deref;

use serde::Serialize;
use tracing::debug;

use crate::document::{AssetType, Document, Node};
use crate::error::{lookup_mut, InspectError, Result};

/// A document whose annotation records are populated.
///
/// Only [`annotate`] constructs this type, so anything holding one can rely
/// on sizes, reference counts and node ordering being present. Read access
/// to the underlying [`Document`] goes through `Deref`.
#[derive(Debug, Clone)]
pub struct AnnotatedDocument {
    document: Document,
}

impl AnnotatedDocument {
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Give the document back, e.g. to annotate it again.
    pub fn into_inner(self) -> Document {
        self.document
    }

    /// Nodes sorted by traversal order: every parent is followed by its
    /// subtree before the next sibling.
    ///
    /// The node array itself stays in declaration order because child
    /// references are positional.
    pub fn nodes_in_order(&self) -> Vec<&Node> {
        let mut nodes: Vec<&Node> = self.document.nodes.iter().collect();
        nodes.sort_by_key(|n| n.annotation.order);
        nodes
    }

    /// Indices of the nodes that started a traversal, ascending.
    pub fn traversal_roots(&self) -> Vec<usize> {
        self.document
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.annotation.hierarchy == 0)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn stats(&self) -> DocumentStats {
        let doc = &self.document;
        DocumentStats {
            nodes: doc.nodes.len(),
            meshes: doc.meshes.len(),
            primitives: doc.num_primitives(),
            accessors: doc.accessors.len(),
            buffer_views: doc.buffer_views.len(),
            buffers: doc.buffers.len(),
            materials: doc.materials.len(),
            buffer_bytes: doc.buffers.iter().map(|b| b.annotation.size).sum(),
            mesh_bytes: doc.meshes.iter().map(|m| m.annotation.size).sum(),
            traversal_roots: self.traversal_roots().len(),
            max_hierarchy: doc
                .nodes
                .iter()
                .map(|n| n.annotation.hierarchy)
                .max()
                .unwrap_or(0),
        }
    }
}

impl Deref for AnnotatedDocument {
    type Target = Document;

    fn deref(&self) -> &Document {
        &self.document
    }
}

/// Document-wide totals shown in the inspector header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentStats {
    pub nodes: usize,
    pub meshes: usize,
    pub primitives: usize,
    pub accessors: usize,
    pub buffer_views: usize,
    pub buffers: usize,
    pub materials: usize,
    /// Sum of all buffer byte lengths.
    pub buffer_bytes: u64,
    /// Sum of all mesh sizes (shared accessors counted per reference).
    pub mesh_bytes: u64,
    pub traversal_roots: usize,
    pub max_hierarchy: usize,
}

/// Annotate `document`, returning it as an [`AnnotatedDocument`].
pub fn annotate(mut document: Document) -> Result<AnnotatedDocument> {
    annotate_buffers(&mut document);
    annotate_buffer_views(&mut document)?;
    annotate_accessors(&mut document)?;
    annotate_materials(&mut document);
    annotate_meshes(&mut document)?;
    annotate_nodes(&mut document)?;
    count_material_nodes(&mut document);
    order_nodes(&mut document.nodes);

    debug!(
        buffers = document.buffers.len(),
        views = document.buffer_views.len(),
        accessors = document.accessors.len(),
        meshes = document.meshes.len(),
        nodes = document.nodes.len(),
        "annotated glTF document"
    );

    Ok(AnnotatedDocument { document })
}

fn annotate_buffers(document: &mut Document) {
    for (i, buffer) in document.buffers.iter_mut().enumerate() {
        buffer.annotation.asset_type = Some(AssetType::Buffer);
        buffer.annotation.self_index = i;
        buffer.annotation.size = buffer.byte_length;
        buffer.annotation.reference_count = 0;
    }
}

fn annotate_buffer_views(document: &mut Document) -> Result<()> {
    let Document {
        buffers,
        buffer_views,
        ..
    } = document;

    for (i, view) in buffer_views.iter_mut().enumerate() {
        view.annotation.asset_type = Some(AssetType::View);
        view.annotation.self_index = i;
        view.annotation.size = view.byte_length;
        view.annotation.reference_count = 0;

        let buffer = lookup_mut(buffers, AssetType::Buffer, view.buffer, || {
            format!("bufferView {}", i)
        })?;
        buffer.annotation.reference_count += 1;
    }
    Ok(())
}

fn annotate_accessors(document: &mut Document) -> Result<()> {
    let Document {
        buffer_views,
        accessors,
        ..
    } = document;

    for (i, accessor) in accessors.iter_mut().enumerate() {
        accessor.annotation.asset_type = Some(AssetType::Accessor);
        accessor.annotation.self_index = i;
        accessor.annotation.reference_count = 0;
        accessor.annotation.size = 0;

        // Accessors without a view (sparse-only, or filled in by an
        // extension) own no bytes.
        if let Some(view_index) = accessor.buffer_view {
            let view = lookup_mut(buffer_views, AssetType::View, view_index, || {
                format!("accessor {}", i)
            })?;
            view.annotation.reference_count += 1;
            accessor.annotation.size = view.annotation.size.saturating_sub(accessor.byte_offset);
        }
    }
    Ok(())
}

fn annotate_materials(document: &mut Document) {
    for (i, material) in document.materials.iter_mut().enumerate() {
        material.annotation.asset_type = Some(AssetType::Material);
        material.annotation.self_index = i;
        material.annotation.reference_count = 0;
        material.reference_count_nodes = 0;
    }
}

fn annotate_meshes(document: &mut Document) -> Result<()> {
    let Document {
        meshes,
        accessors,
        materials,
        ..
    } = document;

    for (mesh_index, mesh) in meshes.iter_mut().enumerate() {
        let mut mesh_size = 0u64;

        for (prim_index, primitive) in mesh.primitives.iter_mut().enumerate() {
            let mut primitive_size = 0u64;

            for (semantic, accessor_index) in primitive.accessor_slots() {
                let accessor = lookup_mut(accessors, AssetType::Accessor, accessor_index, || {
                    format!("mesh {} primitive {} {}", mesh_index, prim_index, semantic)
                })?;
                accessor.annotation.reference_count += 1;
                primitive_size += accessor.annotation.size;
            }

            if let Some(material_index) = primitive.material {
                let material = lookup_mut(materials, AssetType::Material, material_index, || {
                    format!("mesh {} primitive {}", mesh_index, prim_index)
                })?;
                material.annotation.reference_count += 1;
            }

            primitive.annotation.asset_type = Some(AssetType::Primitive);
            primitive.annotation.self_index = prim_index;
            primitive.annotation.size = primitive_size;
            primitive.annotation.hierarchy = 1;
            mesh_size += primitive_size;
        }

        mesh.annotation.asset_type = Some(AssetType::Mesh);
        mesh.annotation.self_index = mesh_index;
        mesh.annotation.size = mesh_size;
        mesh.annotation.hierarchy = 0;
        mesh.annotation.reference_count = 0;
    }
    Ok(())
}

fn annotate_nodes(document: &mut Document) -> Result<()> {
    let Document { meshes, nodes, .. } = document;
    let node_count = nodes.len();

    for (i, node) in nodes.iter_mut().enumerate() {
        node.annotation.asset_type = Some(AssetType::Node);
        node.annotation.self_index = i;
        node.annotation.size = 0;

        if let Some(mesh_index) = node.mesh {
            let mesh = lookup_mut(meshes, AssetType::Mesh, mesh_index, || format!("node {}", i))?;
            mesh.annotation.reference_count += 1;
            node.annotation.size = mesh.annotation.size;
        }

        // The ordering pass indexes children directly.
        if let Some(&child) = node.children.iter().find(|&&c| c >= node_count) {
            return Err(InspectError::IndexOutOfRange {
                kind: AssetType::Node,
                index: child,
                len: node_count,
                referrer: format!("node {} children", i),
            });
        }
    }
    Ok(())
}

fn count_material_nodes(document: &mut Document) {
    let Document {
        meshes,
        nodes,
        materials,
        ..
    } = document;

    // Mesh and material indices were checked by the earlier passes.
    for node in nodes.iter() {
        if let Some(mesh_index) = node.mesh {
            for material_index in meshes[mesh_index].material_indices() {
                materials[material_index].reference_count_nodes += 1;
            }
        }
    }
}

/// Assign `order` and `hierarchy` to every node.
///
/// Roots are taken in ascending index order among nodes not yet reached;
/// a node already carrying an `order` is never visited again, which keeps
/// the walk finite on shared children and cycles. A node reachable along
/// several paths keeps the depth of the first path that reaches it.
fn order_nodes(nodes: &mut [Node]) {
    for node in nodes.iter_mut() {
        node.annotation.order = None;
        node.annotation.hierarchy = 0;
    }

    let mut counter = 0usize;
    let mut stack: Vec<(usize, usize)> = Vec::new();

    for root in 0..nodes.len() {
        if nodes[root].annotation.order.is_some() {
            continue;
        }

        stack.push((root, 0));
        while let Some((index, depth)) = stack.pop() {
            let node = &mut nodes[index];
            if node.annotation.order.is_some() {
                continue;
            }
            node.annotation.order = Some(counter);
            node.annotation.hierarchy = depth;
            counter += 1;

            // Reversed so the first child is popped first.
            stack.extend(node.children.iter().rev().map(|&child| (child, depth + 1)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Document {
        Document::from_json_str(json).unwrap()
    }

    #[test]
    fn test_single_accessor_used_twice() {
        let doc = parse(
            r#"{
            "asset": {"version": "2.0"},
            "buffers": [{"byteLength": 100}],
            "bufferViews": [{"buffer": 0, "byteOffset": 0, "byteLength": 100}],
            "accessors": [{"bufferView": 0, "byteOffset": 0, "count": 25,
                           "type": "VEC4", "componentType": 5126}],
            "meshes": [{"primitives": [{"attributes": {"POSITION": 0}, "indices": 0}]}],
            "nodes": [{"mesh": 0}]
        }"#,
        );
        let doc = annotate(doc).unwrap();

        assert_eq!(doc.accessors[0].annotation.size, 100);
        assert_eq!(doc.meshes[0].primitives[0].annotation.size, 200);
        assert_eq!(doc.meshes[0].annotation.size, 200);
        assert_eq!(doc.nodes[0].annotation.size, 200);
        assert_eq!(doc.buffers[0].annotation.reference_count, 1);
        assert_eq!(doc.buffer_views[0].annotation.reference_count, 1);
        assert_eq!(doc.accessors[0].annotation.reference_count, 2);
        assert_eq!(doc.meshes[0].annotation.reference_count, 1);
    }

    #[test]
    fn test_accessor_size_subtracts_offset() {
        let doc = parse(
            r#"{
            "asset": {"version": "2.0"},
            "buffers": [{"byteLength": 64}],
            "bufferViews": [{"buffer": 0, "byteLength": 48}],
            "accessors": [
                {"bufferView": 0, "byteOffset": 12, "count": 3, "type": "VEC3", "componentType": 5126},
                {"bufferView": 0, "byteOffset": 60, "count": 1, "type": "SCALAR", "componentType": 5126},
                {"count": 4, "type": "SCALAR", "componentType": 5126}
            ]
        }"#,
        );
        let doc = annotate(doc).unwrap();

        assert_eq!(doc.accessors[0].annotation.size, 36);
        assert_eq!(doc.accessors[1].annotation.size, 0);
        assert_eq!(doc.accessors[2].annotation.size, 0);
        assert_eq!(doc.buffer_views[0].annotation.reference_count, 2);
    }

    #[test]
    fn test_parent_then_child() {
        let doc = parse(r#"{"asset": {"version": "2.0"}, "nodes": [{"children": [1]}, {}]}"#);
        let doc = annotate(doc).unwrap();

        assert_eq!(doc.nodes[0].annotation.order, Some(0));
        assert_eq!(doc.nodes[0].annotation.hierarchy, 0);
        assert_eq!(doc.nodes[1].annotation.order, Some(1));
        assert_eq!(doc.nodes[1].annotation.hierarchy, 1);
    }

    #[test]
    fn test_disjoint_roots_in_index_order() {
        let doc = parse(r#"{"asset": {"version": "2.0"}, "nodes": [{}, {}]}"#);
        let doc = annotate(doc).unwrap();

        assert_eq!(doc.nodes[0].annotation.order, Some(0));
        assert_eq!(doc.nodes[1].annotation.order, Some(1));
        assert_eq!(doc.nodes[0].annotation.hierarchy, 0);
        assert_eq!(doc.nodes[1].annotation.hierarchy, 0);
        assert_eq!(doc.traversal_roots(), vec![0, 1]);
    }

    #[test]
    fn test_child_declared_before_parent_becomes_root() {
        let doc = parse(r#"{"asset": {"version": "2.0"}, "nodes": [{}, {"children": [0]}]}"#);
        let doc = annotate(doc).unwrap();

        assert_eq!(doc.nodes[0].annotation.order, Some(0));
        assert_eq!(doc.nodes[0].annotation.hierarchy, 0);
        assert_eq!(doc.nodes[1].annotation.order, Some(1));
        assert_eq!(doc.nodes[1].annotation.hierarchy, 0);
    }

    #[test]
    fn test_shared_child_and_cycle_visited_once() {
        // 0 -> [1, 2], 1 -> [2], 2 -> [0]
        let doc = parse(
            r#"{"asset": {"version": "2.0"},
               "nodes": [{"children": [1, 2]}, {"children": [2]}, {"children": [0]}]}"#,
        );
        let doc = annotate(doc).unwrap();

        let orders: Vec<_> = doc.nodes.iter().map(|n| n.annotation.order).collect();
        assert_eq!(orders, vec![Some(0), Some(1), Some(2)]);
        // Node 2 is first reached through node 1.
        assert_eq!(doc.nodes[2].annotation.hierarchy, 2);
    }

    #[test]
    fn test_nodes_in_order_is_preorder() {
        // 0 -> [2, 1], 2 -> [3]
        let doc = parse(
            r#"{"asset": {"version": "2.0"},
               "nodes": [{"children": [2, 1]}, {}, {"children": [3]}, {}]}"#,
        );
        let doc = annotate(doc).unwrap();

        let order: Vec<usize> = doc
            .nodes_in_order()
            .iter()
            .map(|n| n.annotation.self_index)
            .collect();
        assert_eq!(order, vec![0, 2, 3, 1]);
        // Declaration order is untouched.
        for (i, node) in doc.nodes.iter().enumerate() {
            assert_eq!(node.annotation.self_index, i);
        }
    }

    #[test]
    fn test_mesh_and_material_index_zero_counted() {
        let doc = parse(
            r#"{
            "asset": {"version": "2.0"},
            "buffers": [{"byteLength": 8}],
            "bufferViews": [{"buffer": 0, "byteLength": 8}],
            "accessors": [{"bufferView": 0, "count": 2, "type": "SCALAR", "componentType": 5126}],
            "materials": [{"name": "Only"}],
            "meshes": [{"primitives": [
                {"attributes": {"POSITION": 0}, "material": 0},
                {"attributes": {"POSITION": 0}, "material": 0}
            ]}],
            "nodes": [{"mesh": 0}]
        }"#,
        );
        let doc = annotate(doc).unwrap();

        assert_eq!(doc.materials[0].annotation.reference_count, 2);
        assert_eq!(doc.materials[0].reference_count_nodes, 1);
        assert_eq!(doc.meshes[0].annotation.reference_count, 1);
    }

    #[test]
    fn test_reannotation_does_not_accumulate() {
        let doc = parse(
            r#"{
            "asset": {"version": "2.0"},
            "buffers": [{"byteLength": 8}],
            "bufferViews": [{"buffer": 0, "byteLength": 8}, {"buffer": 0, "byteLength": 4}],
            "accessors": [{"bufferView": 0, "count": 2, "type": "SCALAR", "componentType": 5126}],
            "meshes": [{"primitives": [{"attributes": {"POSITION": 0}}]}],
            "nodes": [{"mesh": 0, "children": [1]}, {"mesh": 0}]
        }"#,
        );
        let first = annotate(doc).unwrap();
        let second = annotate(first.clone().into_inner()).unwrap();

        assert_eq!(second.buffers[0].annotation, first.buffers[0].annotation);
        assert_eq!(second.accessors[0].annotation, first.accessors[0].annotation);
        assert_eq!(second.meshes[0].annotation.reference_count, 2);
        for (a, b) in first.nodes.iter().zip(second.nodes.iter()) {
            assert_eq!(a.annotation, b.annotation);
        }
    }

    #[test]
    fn test_out_of_range_reference_fails() {
        let doc = parse(
            r#"{"asset": {"version": "2.0"},
               "buffers": [{"byteLength": 8}],
               "bufferViews": [{"buffer": 3, "byteLength": 8}]}"#,
        );
        match annotate(doc) {
            Err(InspectError::IndexOutOfRange {
                kind, index, len, ..
            }) => {
                assert_eq!(kind, AssetType::Buffer);
                assert_eq!(index, 3);
                assert_eq!(len, 1);
            }
            other => panic!("expected IndexOutOfRange, got {:?}", other),
        }
    }

    #[test]
    fn test_out_of_range_child_fails() {
        let doc = parse(r#"{"asset": {"version": "2.0"}, "nodes": [{"children": [5]}]}"#);
        match annotate(doc) {
            Err(InspectError::IndexOutOfRange {
                kind, index, len, ..
            }) => {
                assert_eq!(kind, AssetType::Node);
                assert_eq!(index, 5);
                assert_eq!(len, 1);
            }
            other => panic!("expected IndexOutOfRange, got {:?}", other),
        }
    }

    #[test]
    fn test_stats() {
        let doc = parse(
            r#"{
            "asset": {"version": "2.0"},
            "buffers": [{"byteLength": 100}, {"byteLength": 20}],
            "bufferViews": [{"buffer": 0, "byteLength": 100}],
            "accessors": [{"bufferView": 0, "count": 25, "type": "SCALAR", "componentType": 5126}],
            "meshes": [{"primitives": [{"attributes": {"POSITION": 0}}, {"attributes": {"POSITION": 0}}]}],
            "nodes": [{"mesh": 0, "children": [1]}, {"children": [2]}, {}]
        }"#,
        );
        let stats = annotate(doc).unwrap().stats();

        assert_eq!(stats.primitives, 2);
        assert_eq!(stats.buffer_bytes, 120);
        assert_eq!(stats.mesh_bytes, 200);
        assert_eq!(stats.traversal_roots, 1);
        assert_eq!(stats.max_hierarchy, 2);
    }
}
