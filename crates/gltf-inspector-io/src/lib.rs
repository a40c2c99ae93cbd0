//! File intake and byte access for the glTF inspector.
//!
//! A load starts from a [`FilePackage`], the set of files the user supplied
//! (a dropped folder, a file picked on disk, or one `.glb`). [`load_package`]
//! picks the root asset, splits GLB containers, annotates the document and
//! returns a [`LoadedAsset`] whose [`AssetResolver`] reads buffer payloads
//! on demand.
//!
//! ```ignore
//! use gltf_inspector_io::{load_path, LoadOptions};
//!
//! let asset = load_path("models/DamagedHelmet.gltf", &LoadOptions::default())?;
//! if let Some(positions) = asset.accessor_data(0)? {
//!     println!("{} items, first = {:?}", positions.count, positions.item(0));
//! }
//! ```
//!
//! [`InspectorSession`] holds the current asset and discards results of
//! loads that were superseded by a newer one.

pub mod accessor_data;
pub mod error;
pub mod glb;
pub mod loader;
pub mod options;
pub mod package;
pub mod session;
pub mod uri;

pub use accessor_data::{AssetResolver, ComponentData, TypedBuffer};
pub use error::{LoadError, Result};
pub use loader::{load_glb, load_package, load_path, LoadedAsset};
pub use options::LoadOptions;
pub use package::{FilePackage, RootFormat};
pub use session::{InspectorSession, LoadOutcome, LoadTicket};
