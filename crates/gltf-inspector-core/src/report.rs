//! Flat, serializable views of an annotated document for list and detail
//! panels.

use serde::Serialize;
use serde_json::Value;

use crate::accessor_types::ComponentType;
use crate::annotate::AnnotatedDocument;
use crate::document::{AssetType, Primitive};
use crate::xref;

/// A named pointer to another entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityRef {
    pub kind: AssetType,
    pub index: usize,
    pub name: String,
}

/// One line of the node tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRow {
    pub index: usize,
    pub name: String,
    pub depth: usize,
    pub order: usize,
    pub mesh: Option<usize>,
    pub size: u64,
    pub children: Vec<usize>,
}

/// Node rows in traversal order.
pub fn node_rows(doc: &AnnotatedDocument) -> Vec<NodeRow> {
    doc.nodes_in_order()
        .into_iter()
        .map(|node| NodeRow {
            index: node.annotation.self_index,
            name: node.label(),
            depth: node.annotation.hierarchy,
            order: node.annotation.order.unwrap_or_default(),
            mesh: node.mesh,
            size: node.annotation.size,
            children: node.children.clone(),
        })
        .collect()
}

/// Detail view of a single node.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodePanel {
    pub index: usize,
    pub name: String,
    pub mesh: Option<EntityRef>,
    /// Local transform, column-major; identity when the node has none.
    pub matrix: [f64; 16],
    pub children: Vec<EntityRef>,
    pub extras: Option<Value>,
    pub materials: Vec<EntityRef>,
}

pub fn node_panel(doc: &AnnotatedDocument, index: usize) -> Option<NodePanel> {
    let node = doc.nodes.get(index)?;
    let mesh = node.mesh.and_then(|m| {
        doc.meshes.get(m).map(|mesh| EntityRef {
            kind: AssetType::Mesh,
            index: m,
            name: mesh.label(),
        })
    });
    let children = node
        .children
        .iter()
        .filter_map(|&c| {
            doc.nodes.get(c).map(|child| EntityRef {
                kind: AssetType::Node,
                index: c,
                name: child.label(),
            })
        })
        .collect();
    let materials = xref::materials_referenced_by_node(doc, index)
        .into_iter()
        .map(|m| EntityRef {
            kind: AssetType::Material,
            index: m.annotation.self_index,
            name: m.label(),
        })
        .collect();

    Some(NodePanel {
        index,
        name: node.label(),
        mesh,
        matrix: node.local_matrix(),
        children,
        extras: node.extras.clone(),
        materials,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeshRow {
    pub index: usize,
    pub name: String,
    pub primitives: usize,
    pub size: u64,
    pub reference_count: usize,
    pub materials: Vec<usize>,
}

pub fn mesh_rows(doc: &AnnotatedDocument) -> Vec<MeshRow> {
    doc.meshes
        .iter()
        .map(|mesh| MeshRow {
            index: mesh.annotation.self_index,
            name: mesh.label(),
            primitives: mesh.primitives.len(),
            size: mesh.annotation.size,
            reference_count: mesh.annotation.reference_count,
            materials: mesh.material_indices(),
        })
        .collect()
}

/// Detail view of a single mesh: one card per primitive.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeshPanel {
    pub index: usize,
    pub name: String,
    pub size: u64,
    pub reference_count: usize,
    pub nodes: Vec<EntityRef>,
    pub primitives: Vec<PrimitiveCard>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrimitiveCard {
    pub index: usize,
    pub size: u64,
    pub material: Option<EntityRef>,
    /// Attribute slots in declaration order, then `INDICES`.
    pub slots: Vec<SlotRow>,
}

/// One accessor slot of a primitive.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotRow {
    pub semantic: String,
    pub accessor: usize,
    #[serde(rename = "type")]
    pub accessor_type: String,
    /// GL enum name, or the raw code when it is not a glTF component type.
    pub component_type: String,
    pub count: u64,
    pub size: u64,
}

pub fn mesh_panel(doc: &AnnotatedDocument, index: usize) -> Option<MeshPanel> {
    let mesh = doc.meshes.get(index)?;
    let nodes = xref::nodes_referencing_mesh(doc, index)
        .into_iter()
        .map(|n| EntityRef {
            kind: AssetType::Node,
            index: n.annotation.self_index,
            name: n.label(),
        })
        .collect();
    let primitives = mesh
        .primitives
        .iter()
        .enumerate()
        .map(|(i, primitive)| primitive_card(doc, i, primitive))
        .collect();

    Some(MeshPanel {
        index,
        name: mesh.label(),
        size: mesh.annotation.size,
        reference_count: mesh.annotation.reference_count,
        nodes,
        primitives,
    })
}

fn primitive_card(doc: &AnnotatedDocument, index: usize, primitive: &Primitive) -> PrimitiveCard {
    let material = primitive.material.and_then(|m| {
        doc.materials.get(m).map(|material| EntityRef {
            kind: AssetType::Material,
            index: m,
            name: material.label(),
        })
    });
    let slots = primitive
        .accessor_slots()
        .into_iter()
        .filter_map(|(semantic, a)| {
            let accessor = doc.accessors.get(a)?;
            let component_type = ComponentType::from_gl(accessor.component_type)
                .map(|c| c.name().to_string())
                .unwrap_or_else(|_| accessor.component_type.to_string());
            Some(SlotRow {
                semantic: semantic.to_string(),
                accessor: a,
                accessor_type: accessor.accessor_type.clone(),
                component_type,
                count: accessor.count,
                size: accessor.annotation.size,
            })
        })
        .collect();

    PrimitiveCard {
        index,
        size: primitive.annotation.size,
        material,
        slots,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialRow {
    pub index: usize,
    pub name: String,
    /// Primitives using the material.
    pub reference_count: usize,
    /// Nodes drawing a mesh that uses the material.
    pub reference_count_nodes: usize,
    pub base_color_factor: Option<[f64; 4]>,
}

pub fn material_rows(doc: &AnnotatedDocument) -> Vec<MaterialRow> {
    doc.materials
        .iter()
        .map(|material| MaterialRow {
            index: material.annotation.self_index,
            name: material.label(),
            reference_count: material.annotation.reference_count,
            reference_count_nodes: material.reference_count_nodes,
            base_color_factor: material
                .pbr_metallic_roughness
                .as_ref()
                .and_then(|pbr| pbr.base_color_factor),
        })
        .collect()
}
