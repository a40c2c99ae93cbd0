//! Plain-text rendering of inspector reports.

use std::fmt::{self, Write as _};

use gltf_inspector_core::report::{MaterialRow, MeshPanel, MeshRow, NodePanel, NodeRow};
use gltf_inspector_core::{AssetType, DocumentStats};
use gltf_inspector_io::{LoadedAsset, TypedBuffer};
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub root: String,
    pub version: String,
    pub generator: Option<String>,
    pub extensions_used: Vec<String>,
    pub stats: DocumentStats,
}

impl Summary {
    pub fn new(asset: &LoadedAsset) -> Self {
        let doc = asset.document();
        Self {
            root: asset.root().to_string(),
            version: doc.asset.version.clone(),
            generator: doc.asset.generator.clone(),
            extensions_used: doc.extensions_used.clone(),
            stats: doc.stats(),
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = &self.stats;
        writeln!(f, "{} (glTF {})", self.root, self.version)?;
        if let Some(generator) = &self.generator {
            writeln!(f, "  generator:    {}", generator)?;
        }
        if !self.extensions_used.is_empty() {
            writeln!(f, "  extensions:   {}", self.extensions_used.join(", "))?;
        }
        writeln!(f, "  nodes:        {} ({} roots, depth {})", s.nodes, s.traversal_roots, s.max_hierarchy)?;
        writeln!(f, "  meshes:       {} ({} primitives, {} bytes)", s.meshes, s.primitives, s.mesh_bytes)?;
        writeln!(f, "  materials:    {}", s.materials)?;
        writeln!(f, "  accessors:    {}", s.accessors)?;
        writeln!(f, "  bufferViews:  {}", s.buffer_views)?;
        writeln!(f, "  buffers:      {} ({} bytes)", s.buffers, s.buffer_bytes)
    }
}

pub fn node_tree(rows: &[NodeRow]) -> String {
    let mut out = String::new();
    for row in rows {
        let mesh = row.mesh.map(|m| format!("  mesh {}", m)).unwrap_or_default();
        let _ = writeln!(
            out,
            "{:indent$}[{}] {}{}  {} bytes",
            "",
            row.index,
            row.name,
            mesh,
            row.size,
            indent = row.depth * 2
        );
    }
    out
}

pub fn node_panel(panel: &NodePanel) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Node {}: {}", panel.index, panel.name);
    match &panel.mesh {
        Some(mesh) => {
            let _ = writeln!(out, "  mesh:      {} ({})", mesh.index, mesh.name);
        }
        None => {
            let _ = writeln!(out, "  mesh:      none");
        }
    }
    // Column-major storage, printed row by row.
    for row in 0..4 {
        let values: Vec<String> = (0..4)
            .map(|col| format!("{:>8.3}", panel.matrix[col * 4 + row]))
            .collect();
        let label = if row == 0 { "  matrix:" } else { "" };
        let _ = writeln!(out, "{:<12}{}", label, values.join(" "));
    }
    let children: Vec<String> = panel
        .children
        .iter()
        .map(|c| format!("{} ({})", c.index, c.name))
        .collect();
    let _ = writeln!(out, "  children:  {}", list_or_none(&children));
    let materials: Vec<String> = panel
        .materials
        .iter()
        .map(|m| format!("{} ({})", m.index, m.name))
        .collect();
    let _ = writeln!(out, "  materials: {}", list_or_none(&materials));
    if let Some(extras) = &panel.extras {
        let _ = writeln!(out, "  extras:    {}", extras);
    }
    out
}

pub fn mesh_panel(panel: &MeshPanel) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Mesh {}: {}", panel.index, panel.name);
    let _ = writeln!(out, "  size:      {} bytes", panel.size);
    let nodes: Vec<String> = panel
        .nodes
        .iter()
        .map(|n| format!("{} ({})", n.index, n.name))
        .collect();
    let _ = writeln!(out, "  nodes:     {}", list_or_none(&nodes));
    for card in &panel.primitives {
        let material = card
            .material
            .as_ref()
            .map(|m| format!("{} ({})", m.index, m.name))
            .unwrap_or_else(|| "none".to_string());
        let _ = writeln!(
            out,
            "  primitive {}  {} bytes  material {}",
            card.index, card.size, material
        );
        let _ = writeln!(
            out,
            "    {:<14} {:>8} {:>7} {:<6} {:<15} {:>10}",
            "attribute", "accessor", "count", "type", "component", "bytes"
        );
        for slot in &card.slots {
            let _ = writeln!(
                out,
                "    {:<14} {:>8} {:>7} {:<6} {:<15} {:>10}",
                slot.semantic, slot.accessor, slot.count, slot.accessor_type, slot.component_type, slot.size
            );
        }
    }
    out
}

fn list_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}

pub fn mesh_table(rows: &[MeshRow]) -> String {
    let mut out = format!("{:>5}  {:<24} {:>5} {:>12} {:>5}  materials\n", "index", "name", "prims", "bytes", "refs");
    for row in rows {
        let materials: Vec<String> = row.materials.iter().map(|m| m.to_string()).collect();
        let _ = writeln!(
            out,
            "{:>5}  {:<24} {:>5} {:>12} {:>5}  {}",
            row.index,
            row.name,
            row.primitives,
            row.size,
            row.reference_count,
            materials.join(",")
        );
    }
    out
}

pub fn material_table(rows: &[MaterialRow]) -> String {
    let mut out = format!("{:>5}  {:<24} {:>5} {:>5}  baseColor\n", "index", "name", "prims", "nodes");
    for row in rows {
        let color = row
            .base_color_factor
            .map(|c| format!("{:.2} {:.2} {:.2} {:.2}", c[0], c[1], c[2], c[3]))
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(
            out,
            "{:>5}  {:<24} {:>5} {:>5}  {}",
            row.index, row.name, row.reference_count, row.reference_count_nodes, color
        );
    }
    out
}

/// One entity in a cross-reference listing.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Referrer {
    pub kind: AssetType,
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primitive: Option<usize>,
    pub name: String,
}

impl Referrer {
    pub fn new(kind: AssetType, index: usize, name: String) -> Self {
        Self {
            kind,
            index,
            primitive: None,
            name,
        }
    }

    pub fn primitive(mesh: usize, primitive: usize, mesh_name: String) -> Self {
        Self {
            kind: AssetType::Primitive,
            index: mesh,
            primitive: Some(primitive),
            name: mesh_name,
        }
    }
}

pub fn referrers(referrers: &[Referrer]) -> String {
    if referrers.is_empty() {
        return "no references\n".to_string();
    }
    let mut out = String::new();
    for r in referrers {
        let _ = match r.primitive {
            Some(p) => writeln!(out, "mesh {} primitive {}  {}", r.index, p, r.name),
            None => writeln!(out, "{} {}  {}", r.kind, r.index, r.name),
        };
    }
    out
}

/// Items of an accessor laid out as `rows x cols` per element, e.g. four
/// lines of four values for MAT4. Matrices are stored column-major and
/// printed row by row, like the node panel's transform.
pub fn accessor_table(buffer: &TypedBuffer, limit: usize) -> String {
    let (rows, cols) = buffer.accessor_type.shape();
    let mut out = format!(
        "{} x {} {}{}\n",
        buffer.count,
        buffer.accessor_type,
        buffer.component_type(),
        if buffer.is_interleaved() { " (interleaved)" } else { "" }
    );

    for item in 0..buffer.count.min(limit) {
        let Some(values) = buffer.item(item) else {
            break;
        };
        for row in 0..rows {
            let cells: Vec<String> = (0..cols)
                .map(|col| format!("{:>10}", format_component(values[col * rows + row])))
                .collect();
            let label = if row == 0 { format!("{:>6}", item) } else { String::new() };
            let _ = writeln!(out, "{:>6}  {}", label, cells.join(" "));
        }
    }
    if buffer.count > limit {
        let _ = writeln!(out, "... {} more", buffer.count - limit);
    }
    out
}

fn format_component(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{:.4}", v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gltf_inspector_core::AccessorType;
    use gltf_inspector_io::ComponentData;

    #[test]
    fn test_accessor_table_matrix_layout() {
        let buffer = TypedBuffer {
            accessor_type: AccessorType::Mat2,
            count: 2,
            offset: 0,
            stride: 4,
            data: ComponentData::Float32(vec![1.0, 2.0, 3.0, 4.0, 0.5, 0.0, 0.0, 0.5]),
        };
        let text = accessor_table(&buffer, 10);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[0].starts_with("2 x MAT2"));
        // Columns [1, 2] and [3, 4] print as rows "1 3" and "2 4".
        assert!(lines[1].trim_start().starts_with('0'));
        assert!(lines[1].ends_with("1          3"));
        assert!(lines[2].ends_with("2          4"));
        assert!(lines[3].ends_with("0.5000          0"));
    }

    #[test]
    fn test_accessor_table_limit() {
        let buffer = TypedBuffer {
            accessor_type: AccessorType::Scalar,
            count: 5,
            offset: 0,
            stride: 1,
            data: ComponentData::Uint16(vec![1, 2, 3, 4, 5]),
        };
        let text = accessor_table(&buffer, 2);
        assert_eq!(text.lines().count(), 4);
        assert!(text.ends_with("... 3 more\n"));
    }

    #[test]
    fn test_node_tree_indents_by_depth() {
        let rows = vec![
            NodeRow {
                index: 0,
                name: "Root".into(),
                depth: 0,
                order: 0,
                mesh: None,
                size: 0,
                children: vec![1],
            },
            NodeRow {
                index: 1,
                name: "Leaf".into(),
                depth: 1,
                order: 1,
                mesh: Some(0),
                size: 96,
                children: vec![],
            },
        ];
        let text = node_tree(&rows);
        assert_eq!(text, "[0] Root  0 bytes\n  [1] Leaf  mesh 0  96 bytes\n");
    }

    #[test]
    fn test_empty_referrers() {
        assert_eq!(referrers(&[]), "no references\n");
    }
}
