use gltf_inspector_core::{annotate, extract_mesh, xref, AssetType, Document, InspectError};

const CUBE_SCENE: &str = r#"{
    "asset": {"version": "2.0", "generator": "inspector tests"},
    "scene": 0,
    "scenes": [{"nodes": [0]}],
    "buffers": [{"byteLength": 1000, "uri": "cube.bin"}],
    "bufferViews": [
        {"buffer": 0, "byteLength": 400},
        {"buffer": 0, "byteOffset": 400, "byteLength": 600}
    ],
    "accessors": [
        {"bufferView": 0, "count": 24, "type": "VEC3", "componentType": 5126},
        {"bufferView": 1, "byteOffset": 100, "count": 36, "type": "SCALAR", "componentType": 5123}
    ],
    "materials": [{"name": "Paint"}],
    "meshes": [{"name": "Cube", "primitives": [{"attributes": {"POSITION": 0}, "indices": 1, "material": 0}]}],
    "nodes": [
        {"name": "Root", "children": [1, 2]},
        {"name": "CubeA", "mesh": 0},
        {"name": "CubeB", "mesh": 0, "translation": [2, 0, 0]}
    ]
}"#;

#[test]
fn test_cube_scene_sizes_and_counts() {
    let doc = annotate(Document::from_json_str(CUBE_SCENE).unwrap()).unwrap();

    assert_eq!(doc.buffers[0].annotation.size, 1000);
    assert_eq!(doc.buffers[0].annotation.reference_count, 2);
    assert_eq!(doc.buffer_views[1].annotation.reference_count, 1);
    assert_eq!(doc.accessors[0].annotation.size, 400);
    assert_eq!(doc.accessors[1].annotation.size, 500);
    assert_eq!(doc.meshes[0].annotation.size, 900);
    assert_eq!(doc.meshes[0].annotation.reference_count, 2);
    assert_eq!(doc.materials[0].annotation.reference_count, 1);
    assert_eq!(doc.materials[0].reference_count_nodes, 2);
    assert_eq!(doc.nodes[1].annotation.size, 900);
    assert_eq!(doc.nodes[0].annotation.size, 0);
}

#[test]
fn test_cube_scene_hierarchy() {
    let doc = annotate(Document::from_json_str(CUBE_SCENE).unwrap()).unwrap();

    let order: Vec<&str> = doc
        .nodes_in_order()
        .iter()
        .map(|n| n.name.as_deref().unwrap())
        .collect();
    assert_eq!(order, vec!["Root", "CubeA", "CubeB"]);
    assert_eq!(doc.nodes[2].annotation.hierarchy, 1);
    assert_eq!(doc.traversal_roots(), vec![0]);

    let stats = doc.stats();
    assert_eq!(stats.buffer_bytes, 1000);
    assert_eq!(stats.mesh_bytes, 900);
    assert_eq!(stats.max_hierarchy, 1);
}

#[test]
fn test_cube_scene_queries() {
    let doc = annotate(Document::from_json_str(CUBE_SCENE).unwrap()).unwrap();

    let users: Vec<usize> = xref::nodes_referencing_mesh(&doc, 0)
        .iter()
        .map(|n| n.annotation.self_index)
        .collect();
    assert_eq!(users, vec![1, 2]);
    assert_eq!(xref::views_referencing_buffer(&doc, 0).len(), 2);
    assert_eq!(xref::search_by_name(&doc, AssetType::Node, "cube"), vec![1, 2]);
    assert!(xref::nodes_referencing_mesh(&doc, 7).is_empty());
}

#[test]
fn test_dangling_accessor_reference_names_referrer() {
    let json = CUBE_SCENE.replace(r#""indices": 1"#, r#""indices": 5"#);
    let err = annotate(Document::from_json_str(&json).unwrap()).unwrap_err();

    match &err {
        InspectError::IndexOutOfRange { kind, index, len, .. } => {
            assert_eq!(*kind, AssetType::Accessor);
            assert_eq!(*index, 5);
            assert_eq!(*len, 2);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("mesh 0 primitive 0"));
}

#[test]
fn test_extracted_mesh_serializes_to_valid_document() {
    let doc = annotate(Document::from_json_str(CUBE_SCENE).unwrap()).unwrap();
    let mini = extract_mesh(&doc, 0).unwrap();

    let bytes = mini.to_json_bytes().unwrap();
    let reparsed = annotate(Document::from_slice(&bytes).unwrap()).unwrap();
    assert_eq!(reparsed.meshes[0].annotation.size, 900);
    assert_eq!(reparsed.buffers[0].uri.as_deref(), Some("cube.bin"));
    assert_eq!(reparsed.asset.generator.as_deref(), Some("inspector tests"));
}

#[test]
fn test_malformed_json_is_reported() {
    let err = Document::from_json_str("{\"asset\": ").unwrap_err();
    assert!(matches!(err, InspectError::Json(_)));
}
