//! A set of named files making up one glTF asset.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use gltf_inspector_core::Document;
use tracing::{debug, warn};

use crate::error::{LoadError, Result};
use crate::glb;
use crate::uri::{self, UriKind};

/// Root asset flavour, chosen from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootFormat {
    Gltf,
    Glb,
}

impl RootFormat {
    fn from_path(path: &str) -> Option<Self> {
        let lower = path.to_ascii_lowercase();
        if lower.ends_with(".gltf") {
            Some(RootFormat::Gltf)
        } else if lower.ends_with(".glb") {
            Some(RootFormat::Glb)
        } else {
            None
        }
    }
}

/// Files keyed by `/`-separated relative path, with the root asset chosen.
#[derive(Debug, Clone)]
pub struct FilePackage {
    files: BTreeMap<String, Arc<[u8]>>,
    root: String,
    root_path: String,
    format: RootFormat,
}

impl FilePackage {
    /// Build a package from an in-memory file set.
    ///
    /// The root asset is the last `.gltf` or `.glb` file in path order, and
    /// `root_path` is its directory prefix.
    pub fn from_files<I, K, V>(files: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Arc<[u8]>>,
    {
        let files: BTreeMap<String, Arc<[u8]>> = files
            .into_iter()
            .map(|(k, v)| (normalize_key(&k.into()), v.into()))
            .collect();

        let (root, format) = files
            .keys()
            .filter_map(|k| RootFormat::from_path(k).map(|f| (k.clone(), f)))
            .last()
            .ok_or(LoadError::NoRootAsset(files.len()))?;

        let root_path = match root.rfind('/') {
            Some(pos) => root[..=pos].to_string(),
            None => String::new(),
        };
        debug!(%root, %root_path, files = files.len(), "selected root asset");

        Ok(Self {
            files,
            root,
            root_path,
            format,
        })
    }

    /// Read a `.gltf`/`.glb` file from disk along with the external buffers
    /// it references.
    ///
    /// Referenced files that cannot be read are left out; accessing their
    /// data later reports [`LoadError::MissingFile`].
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| LoadError::MissingFile(path.display().to_string()))?;

        let mut files: Vec<(String, Arc<[u8]>)> = Vec::new();
        if let Some(dir) = path.parent() {
            for uri in external_uris(&data)? {
                let Ok(relative) = uri::resolve_relative("", &uri, true) else {
                    continue;
                };
                match fs::read(dir.join(&relative)) {
                    Ok(bytes) => files.push((relative, bytes.into())),
                    Err(e) => warn!(%relative, error = %e, "referenced file not readable"),
                }
            }
        }
        files.push((name, data.into()));

        Self::from_files(files)
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn root_path(&self) -> &str {
        &self.root_path
    }

    pub fn format(&self) -> RootFormat {
        self.format
    }

    pub fn root_bytes(&self) -> &[u8] {
        // The root key was taken from the map.
        self.files.get(&self.root).map(|b| &b[..]).unwrap_or(&[])
    }

    pub fn get(&self, key: &str) -> Option<&Arc<[u8]>> {
        self.files.get(key)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

fn normalize_key(path: &str) -> String {
    let path = path.replace('\\', "/");
    path.strip_prefix("./").unwrap_or(&path).to_string()
}

/// Relative buffer URIs named by a `.gltf` or `.glb` root.
fn external_uris(data: &[u8]) -> Result<Vec<String>> {
    let json = if glb::is_glb(data) {
        glb::split_with(data, false)?.json
    } else {
        data
    };
    let document = Document::from_slice(json)?;
    Ok(document
        .buffers
        .iter()
        .filter_map(|b| b.uri.as_deref())
        .filter(|u| matches!(uri::classify(u), UriKind::Relative(_)))
        .map(str::to_string)
        .collect())
}
