//! Core model for inspecting glTF 2.0 documents.
//!
//! A parsed [`Document`] is passed through [`annotate`], which validates
//! every positional reference and attaches an [`Annotation`] to each
//! buffer, buffer view, accessor, material, mesh, primitive and node:
//!
//! | Field             | Meaning                                              |
//! |-------------------|------------------------------------------------------|
//! | `size`            | Approximate bytes owned by or reachable from entity  |
//! | `reference_count` | Number of references from other entities             |
//! | `hierarchy`       | Node depth in the scene graph (nodes only)           |
//! | `order`           | Depth-first preorder position (nodes only)           |
//!
//! The [`xref`] module answers "who references this?" queries over an
//! [`AnnotatedDocument`], and [`extract`] builds standalone sub-documents
//! around a single mesh or node. [`report`] flattens the document into the
//! rows shown by list and detail views.
//!
//! ```ignore
//! use gltf_inspector_core::{annotate, xref, Document};
//!
//! let doc = annotate(Document::from_slice(&json)?)?;
//! for node in doc.nodes_in_order() {
//!     println!("{:indent$}{}", "", node.label(), indent = node.annotation.hierarchy * 2);
//! }
//! let users = xref::nodes_referencing_mesh(&doc, 0);
//! ```

pub mod accessor_types;
pub mod annotate;
pub mod document;
pub mod error;
pub mod extract;
pub mod report;
pub mod xref;

pub use accessor_types::{AccessorType, ComponentType};
pub use annotate::{annotate, AnnotatedDocument, DocumentStats};
pub use document::{
    Accessor, Annotation, Asset, AssetType, Buffer, BufferView, Document, Material, Mesh, Node,
    Primitive, Scene, Sparse,
};
pub use error::{InspectError, Result};
pub use extract::{extract_mesh, extract_node};
pub use xref::{PrimitiveRef, XrefIndex};
