use std::path::Path;
use std::sync::Arc;

use gltf_inspector_core::{annotate, AnnotatedDocument, Document, XrefIndex};
use tracing::info;

use crate::accessor_data::{AssetResolver, TypedBuffer};
use crate::error::Result;
use crate::glb;
use crate::options::LoadOptions;
use crate::package::{FilePackage, RootFormat};

/// An annotated document together with the means to read its bytes.
#[derive(Debug)]
pub struct LoadedAsset {
    document: AnnotatedDocument,
    index: XrefIndex,
    resolver: AssetResolver,
}

impl LoadedAsset {
    pub fn document(&self) -> &AnnotatedDocument {
        &self.document
    }

    /// Precomputed reverse references for the document.
    pub fn index(&self) -> &XrefIndex {
        &self.index
    }

    pub fn resolver(&self) -> &AssetResolver {
        &self.resolver
    }

    /// Path of the root asset within its package.
    pub fn root(&self) -> &str {
        self.resolver.package().root()
    }

    pub fn accessor_data(&self, accessor: usize) -> Result<Option<TypedBuffer>> {
        self.resolver.load_accessor(&self.document, accessor)
    }

    pub fn view_data(&self, view: usize) -> Result<Vec<u8>> {
        self.resolver.load_view(&self.document, view)
    }
}

/// Parse, annotate and index the package's root asset.
///
/// Buffer payloads are not read here; the returned resolver loads them on
/// first access.
pub fn load_package(package: FilePackage, options: &LoadOptions) -> Result<LoadedAsset> {
    let (document, bin_chunk) = match package.format() {
        RootFormat::Glb => {
            let chunks = glb::split_with(package.root_bytes(), options.strict_glb_length())?;
            let document = Document::from_slice(chunks.json)?;
            (document, chunks.bin.map(Arc::<[u8]>::from))
        }
        RootFormat::Gltf => (Document::from_slice(package.root_bytes())?, None),
    };

    let resolver = AssetResolver::new(&document, package, bin_chunk, options)?;
    let document = annotate(document)?;
    let index = XrefIndex::build(&document);

    let stats = document.stats();
    info!(
        root = resolver.package().root(),
        nodes = stats.nodes,
        meshes = stats.meshes,
        materials = stats.materials,
        buffer_bytes = stats.buffer_bytes,
        "loaded glTF asset"
    );

    Ok(LoadedAsset {
        document,
        index,
        resolver,
    })
}

/// Load a single self-contained `.glb` file held in memory.
pub fn load_glb(name: &str, bytes: Vec<u8>, options: &LoadOptions) -> Result<LoadedAsset> {
    load_package(FilePackage::from_files([(name.to_string(), bytes)])?, options)
}

/// Load a `.gltf` or `.glb` file and its external buffers from disk.
pub fn load_path<P: AsRef<Path>>(path: P, options: &LoadOptions) -> Result<LoadedAsset> {
    load_package(FilePackage::open(path)?, options)
}
