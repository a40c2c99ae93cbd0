//! Standalone sub-documents for focused viewing of one mesh or node.
//!
//! The extracted document contains one scene with one node. Accessors,
//! buffer views and materials are copied only when referenced and are
//! renumbered densely in first-use order. Buffers, textures, images and
//! samplers are copied whole so every URI and texture index stays valid.

use std::collections::HashMap;

use serde_json::Map;

use crate::document::{Annotation, AssetType, Document, Mesh, Node, Scene};
use crate::error::{lookup, Result};

/// Top-level arrays copied verbatim into extracted documents.
const SHARED_ARRAYS: [&str; 3] = ["textures", "images", "samplers"];

/// Build a document holding only `mesh` and what it references.
pub fn extract_mesh(doc: &Document, mesh: usize) -> Result<Document> {
    let source = lookup(&doc.meshes, AssetType::Mesh, mesh, || "mesh extraction".into())?;
    let node = Node {
        mesh: Some(0),
        ..Default::default()
    };
    let mut builder = SubDocument::new(doc);
    let mesh = builder.add_mesh(source, mesh)?;
    Ok(builder.finish(node, Some(mesh)))
}

/// Build a document holding `node` (without children) and its mesh.
///
/// The node's name, transform and extras are kept. A node without a mesh
/// yields a document with a single empty node.
pub fn extract_node(doc: &Document, node: usize) -> Result<Document> {
    let source = lookup(&doc.nodes, AssetType::Node, node, || "node extraction".into())?;

    let mut copy = source.clone();
    copy.children.clear();
    copy.annotation = Annotation::default();

    let mut builder = SubDocument::new(doc);
    let mesh = match source.mesh {
        Some(index) => {
            let mesh = lookup(&doc.meshes, AssetType::Mesh, index, || format!("node {}", node))?;
            copy.mesh = Some(0);
            Some(builder.add_mesh(mesh, index)?)
        }
        None => None,
    };
    Ok(builder.finish(copy, mesh))
}

struct SubDocument<'a> {
    source: &'a Document,
    out: Document,
    accessor_map: HashMap<usize, usize>,
    view_map: HashMap<usize, usize>,
    material_map: HashMap<usize, usize>,
}

impl<'a> SubDocument<'a> {
    fn new(source: &'a Document) -> Self {
        Self {
            source,
            out: Document::default(),
            accessor_map: HashMap::new(),
            view_map: HashMap::new(),
            material_map: HashMap::new(),
        }
    }

    fn add_mesh(&mut self, source: &Mesh, mesh_index: usize) -> Result<Mesh> {
        let mut mesh = source.clone();
        mesh.annotation = Annotation::default();

        for (prim_index, primitive) in mesh.primitives.iter_mut().enumerate() {
            primitive.annotation = Annotation::default();
            let referrer = || format!("mesh {} primitive {}", mesh_index, prim_index);

            for accessor in primitive.attributes.values_mut() {
                *accessor = self.map_accessor(*accessor, &referrer)?;
            }
            if let Some(indices) = primitive.indices {
                primitive.indices = Some(self.map_accessor(indices, &referrer)?);
            }
            if let Some(material) = primitive.material {
                primitive.material = Some(self.map_material(material, &referrer)?);
            }
        }
        Ok(mesh)
    }

    fn map_accessor(&mut self, index: usize, referrer: &dyn Fn() -> String) -> Result<usize> {
        if let Some(&mapped) = self.accessor_map.get(&index) {
            return Ok(mapped);
        }
        let source = self.source;
        let mut accessor = lookup(&source.accessors, AssetType::Accessor, index, referrer)?.clone();
        accessor.annotation = Annotation::default();

        let accessor_referrer = || format!("accessor {}", index);
        if let Some(view) = accessor.buffer_view {
            accessor.buffer_view = Some(self.map_view(view, &accessor_referrer)?);
        }
        if let Some(sparse) = accessor.sparse.as_mut() {
            sparse.indices.buffer_view = self.map_view(sparse.indices.buffer_view, &accessor_referrer)?;
            sparse.values.buffer_view = self.map_view(sparse.values.buffer_view, &accessor_referrer)?;
        }

        let mapped = self.out.accessors.len();
        self.out.accessors.push(accessor);
        self.accessor_map.insert(index, mapped);
        Ok(mapped)
    }

    fn map_view(&mut self, index: usize, referrer: &dyn Fn() -> String) -> Result<usize> {
        if let Some(&mapped) = self.view_map.get(&index) {
            return Ok(mapped);
        }
        let mut view = lookup(&self.source.buffer_views, AssetType::View, index, referrer)?.clone();
        view.annotation = Annotation::default();

        let mapped = self.out.buffer_views.len();
        self.out.buffer_views.push(view);
        self.view_map.insert(index, mapped);
        Ok(mapped)
    }

    fn map_material(&mut self, index: usize, referrer: &dyn Fn() -> String) -> Result<usize> {
        if let Some(&mapped) = self.material_map.get(&index) {
            return Ok(mapped);
        }
        let mut material = lookup(&self.source.materials, AssetType::Material, index, referrer)?.clone();
        material.annotation = Annotation::default();
        material.reference_count_nodes = 0;

        let mapped = self.out.materials.len();
        self.out.materials.push(material);
        self.material_map.insert(index, mapped);
        Ok(mapped)
    }

    fn finish(mut self, node: Node, mesh: Option<Mesh>) -> Document {
        let source = self.source;

        self.out.asset = source.asset.clone();
        self.out.extensions_used = source.extensions_used.clone();
        self.out.extensions_required = source.extensions_required.clone();
        self.out.buffers = source
            .buffers
            .iter()
            .map(|b| {
                let mut buffer = b.clone();
                buffer.annotation = Annotation::default();
                buffer
            })
            .collect();

        let mut extra = Map::new();
        for key in SHARED_ARRAYS {
            if let Some(value) = source.extra.get(key) {
                extra.insert(key.to_string(), value.clone());
            }
        }
        self.out.extra = extra;

        self.out.meshes = mesh.into_iter().collect();
        self.out.nodes = vec![node];
        self.out.scenes = vec![Scene {
            nodes: vec![0],
            ..Default::default()
        }];
        self.out.scene = Some(0);
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotate::annotate;

    fn source() -> Document {
        Document::from_json_str(
            r#"{
            "asset": {"version": "2.0", "generator": "test"},
            "buffers": [{"byteLength": 256, "uri": "scene.bin"}],
            "bufferViews": [
                {"buffer": 0, "byteLength": 64},
                {"buffer": 0, "byteOffset": 64, "byteLength": 64},
                {"buffer": 0, "byteOffset": 128, "byteLength": 64},
                {"buffer": 0, "byteOffset": 192, "byteLength": 64}
            ],
            "accessors": [
                {"bufferView": 0, "count": 4, "type": "VEC3", "componentType": 5126},
                {"bufferView": 1, "count": 4, "type": "VEC3", "componentType": 5126},
                {"bufferView": 2, "count": 6, "type": "SCALAR", "componentType": 5123},
                {"bufferView": 3, "count": 6, "type": "SCALAR", "componentType": 5123}
            ],
            "materials": [{"name": "A"}, {"name": "B", "pbrMetallicRoughness": {"baseColorTexture": {"index": 0}}}],
            "textures": [{"source": 0}],
            "images": [{"uri": "albedo.png"}],
            "meshes": [
                {"name": "First", "primitives": [{"attributes": {"POSITION": 0}, "indices": 2, "material": 0}]},
                {"name": "Second", "primitives": [
                    {"attributes": {"POSITION": 1, "NORMAL": 1}, "indices": 3, "material": 1},
                    {"attributes": {"POSITION": 1}, "indices": 3, "material": 1}
                ]}
            ],
            "nodes": [
                {"name": "Root", "children": [1]},
                {"name": "Child", "mesh": 1, "translation": [1, 2, 3], "extras": {"tag": 7}}
            ]
        }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_extract_mesh_remaps_densely() {
        let doc = source();
        let mini = extract_mesh(&doc, 1).unwrap();

        assert_eq!(mini.meshes.len(), 1);
        assert_eq!(mini.meshes[0].name.as_deref(), Some("Second"));
        assert_eq!(mini.accessors.len(), 2);
        assert_eq!(mini.buffer_views.len(), 2);
        assert_eq!(mini.materials.len(), 1);
        assert_eq!(mini.materials[0].name.as_deref(), Some("B"));

        let prim = &mini.meshes[0].primitives[0];
        assert_eq!(prim.attributes["POSITION"], 0);
        assert_eq!(prim.attributes["NORMAL"], 0);
        assert_eq!(prim.indices, Some(1));
        assert_eq!(prim.material, Some(0));
        assert_eq!(mini.accessors[1].buffer_view, Some(1));
        assert_eq!(mini.buffer_views[1].byte_offset, 192);

        assert_eq!(mini.buffers.len(), 1);
        assert_eq!(mini.nodes.len(), 1);
        assert_eq!(mini.nodes[0].mesh, Some(0));
        assert_eq!(mini.scenes[0].nodes, vec![0]);
        assert!(mini.extra.contains_key("textures"));
        assert!(mini.extra.contains_key("images"));
    }

    #[test]
    fn test_extracted_document_annotates() {
        let doc = source();
        let mini = annotate(extract_mesh(&doc, 1).unwrap()).unwrap();
        assert_eq!(mini.accessors[0].annotation.reference_count, 3);
        assert_eq!(mini.materials[0].annotation.reference_count, 2);
        assert_eq!(mini.meshes[0].annotation.reference_count, 1);

        let json = mini.to_json().unwrap();
        let reparsed = Document::from_json_str(&json).unwrap();
        assert_eq!(reparsed.accessors.len(), 2);
    }

    #[test]
    fn test_extract_node_keeps_transform() {
        let doc = source();
        let mini = extract_node(&doc, 1).unwrap();

        let node = &mini.nodes[0];
        assert_eq!(node.name.as_deref(), Some("Child"));
        assert_eq!(node.mesh, Some(0));
        assert_eq!(node.translation, Some([1.0, 2.0, 3.0]));
        assert_eq!(node.extras.as_ref().unwrap()["tag"], 7);
        assert_eq!(mini.meshes[0].name.as_deref(), Some("Second"));

        let empty = extract_node(&doc, 0).unwrap();
        assert!(empty.meshes.is_empty());
        assert!(empty.nodes[0].children.is_empty());
    }

    #[test]
    fn test_extract_out_of_range() {
        let doc = source();
        assert!(extract_mesh(&doc, 9).is_err());
        assert!(extract_node(&doc, 9).is_err());
    }
}
