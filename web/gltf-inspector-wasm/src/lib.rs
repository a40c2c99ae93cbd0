//! glTF Inspector WASM Module
//!
//! Browser bindings for the glTF inspector. A page hands over the files a
//! user dropped, then queries reports and decoded accessor data.

use gltf_inspector_core::{extract_mesh, report, xref, DocumentStats};
use gltf_inspector_io::{
    load_glb, load_package, FilePackage, InspectorSession, LoadOptions, LoadOutcome, LoadTicket,
    LoadedAsset,
};
use serde::Serialize;
use wasm_bindgen::prelude::*;

#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Summary<'a> {
    root: &'a str,
    version: &'a str,
    generator: Option<&'a str>,
    extensions_used: &'a [String],
    stats: DocumentStats,
}

/// Inspector state owned by the page. Holds at most one loaded asset.
#[wasm_bindgen]
pub struct GltfInspector {
    session: InspectorSession,
    options: LoadOptions,
}

#[wasm_bindgen]
impl GltfInspector {
    #[wasm_bindgen(constructor)]
    pub fn new() -> GltfInspector {
        GltfInspector {
            session: InspectorSession::new(),
            options: LoadOptions::default(),
        }
    }

    /// Reserve a ticket before reading dropped files. Finishing an older
    /// ticket after a newer one was issued has no effect.
    #[wasm_bindgen(js_name = beginLoad)]
    pub fn begin_load(&mut self) -> f64 {
        self.session.begin_load().id() as f64
    }

    /// Install the files read for `ticket`. `paths[i]` names `files[i]`.
    ///
    /// Returns `false` when the ticket was superseded. Fails without
    /// touching the session when the two arrays differ in length.
    #[wasm_bindgen(js_name = finishLoad)]
    pub fn finish_load(
        &mut self,
        ticket: f64,
        paths: Vec<String>,
        files: js_sys::Array,
    ) -> Result<bool, JsError> {
        let files: Vec<Vec<u8>> = files
            .iter()
            .map(|file| js_sys::Uint8Array::new(&file).to_vec())
            .collect();
        let pairs = paired_files(paths, files).map_err(|e| JsError::new(&e))?;
        let result = FilePackage::from_files(pairs).and_then(|package| load_package(package, &self.options));
        let outcome = self
            .session
            .finish_load(LoadTicket::from_id(ticket as u64), result)
            .map_err(|e| JsError::new(&e.to_string()))?;
        Ok(outcome == LoadOutcome::Installed)
    }

    /// Load a single `.glb` file, replacing the current asset.
    #[wasm_bindgen(js_name = loadGlb)]
    pub fn load_glb(&mut self, name: &str, bytes: Vec<u8>) -> Result<(), JsError> {
        let ticket = self.session.begin_load();
        let result = load_glb(name, bytes, &self.options);
        self.session
            .finish_load(ticket, result)
            .map_err(|e| JsError::new(&e.to_string()))?;
        Ok(())
    }

    #[wasm_bindgen(js_name = isLoaded)]
    pub fn is_loaded(&self) -> bool {
        self.session.current().is_some()
    }

    pub fn clear(&mut self) {
        self.session.clear();
    }

    pub fn summary(&self) -> Result<JsValue, JsError> {
        let asset = self.asset()?;
        let doc = asset.document();
        let summary = Summary {
            root: asset.root(),
            version: &doc.asset.version,
            generator: doc.asset.generator.as_deref(),
            extensions_used: &doc.extensions_used,
            stats: doc.stats(),
        };
        Ok(to_js(&summary))
    }

    /// Node rows in traversal order.
    pub fn nodes(&self) -> Result<JsValue, JsError> {
        Ok(to_js(&report::node_rows(self.asset()?.document())))
    }

    /// Detail panel of one node, or `null` when it does not exist.
    pub fn node(&self, index: usize) -> Result<JsValue, JsError> {
        Ok(to_js(&report::node_panel(self.asset()?.document(), index)))
    }

    pub fn meshes(&self) -> Result<JsValue, JsError> {
        Ok(to_js(&report::mesh_rows(self.asset()?.document())))
    }

    /// Detail panel of one mesh with its primitive cards, or `null`.
    pub fn mesh(&self, index: usize) -> Result<JsValue, JsError> {
        Ok(to_js(&report::mesh_panel(self.asset()?.document(), index)))
    }

    pub fn materials(&self) -> Result<JsValue, JsError> {
        Ok(to_js(&report::material_rows(self.asset()?.document())))
    }

    #[wasm_bindgen(js_name = nodesReferencingMesh)]
    pub fn nodes_referencing_mesh(&self, mesh: usize) -> Result<Vec<usize>, JsError> {
        let doc = self.asset()?.document();
        Ok(xref::nodes_referencing_mesh(doc, mesh)
            .iter()
            .map(|n| n.annotation.self_index)
            .collect())
    }

    #[wasm_bindgen(js_name = meshesReferencingMaterial)]
    pub fn meshes_referencing_material(&self, material: usize) -> Result<Vec<usize>, JsError> {
        let doc = self.asset()?.document();
        Ok(xref::meshes_referencing_material(doc, material)
            .iter()
            .map(|m| m.annotation.self_index)
            .collect())
    }

    #[wasm_bindgen(js_name = nodesReferencingMaterial)]
    pub fn nodes_referencing_material(&self, material: usize) -> Result<Vec<usize>, JsError> {
        let doc = self.asset()?.document();
        Ok(xref::nodes_referencing_material(doc, material)
            .iter()
            .map(|n| n.annotation.self_index)
            .collect())
    }

    #[wasm_bindgen(js_name = materialsReferencedByNode)]
    pub fn materials_referenced_by_node(&self, node: usize) -> Result<Vec<usize>, JsError> {
        let doc = self.asset()?.document();
        Ok(xref::materials_referenced_by_node(doc, node)
            .iter()
            .map(|m| m.annotation.self_index)
            .collect())
    }

    /// Decoded values of an accessor, or `null` when it has nothing to show.
    #[wasm_bindgen(js_name = accessorData)]
    pub fn accessor_data(&self, accessor: usize) -> Result<JsValue, JsError> {
        let data = self
            .asset()?
            .accessor_data(accessor)
            .map_err(|e| JsError::new(&e.to_string()))?;
        Ok(to_js(&data))
    }

    /// Standalone glTF JSON holding a single mesh.
    #[wasm_bindgen(js_name = extractMesh)]
    pub fn extract_mesh(&self, mesh: usize) -> Result<String, JsError> {
        let mini = extract_mesh(self.asset()?.document(), mesh).map_err(|e| JsError::new(&e.to_string()))?;
        mini.to_json().map_err(|e| JsError::new(&e.to_string()))
    }
}

impl Default for GltfInspector {
    fn default() -> Self {
        Self::new()
    }
}

impl GltfInspector {
    fn asset(&self) -> Result<&LoadedAsset, JsError> {
        self.session
            .current()
            .ok_or_else(|| JsError::new("No asset loaded"))
    }
}

fn paired_files(paths: Vec<String>, files: Vec<Vec<u8>>) -> Result<Vec<(String, Vec<u8>)>, String> {
    if paths.len() != files.len() {
        return Err(format!("Got {} paths for {} files", paths.len(), files.len()));
    }
    Ok(paths.into_iter().zip(files).collect())
}

fn to_js<T: Serialize + ?Sized>(value: &T) -> JsValue {
    serde_wasm_bindgen::to_value(value).unwrap_or(JsValue::NULL)
}
