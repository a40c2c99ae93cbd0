//! gltf-inspect - glTF 2.0 inspector
//!
//! Prints sizes, reference counts, the node hierarchy, cross references and
//! decoded accessor data for a `.gltf` or `.glb` file.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use gltf_inspector_core::{extract_mesh, extract_node, report, xref, AssetType};
use gltf_inspector_io::{load_path, LoadOptions, LoadedAsset};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod render;

use render::Referrer;

#[derive(Parser)]
#[command(name = "gltf-inspect")]
#[command(about = "Inspect the structure, sizes and references of glTF 2.0 assets")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Print reports as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Log loading details (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Refuse buffers larger than this many bytes
    #[arg(long, global = true, value_name = "BYTES")]
    max_buffer_len: Option<usize>,

    /// Accept GLB files whose header length exceeds the file size
    #[arg(long, global = true)]
    lenient_glb: bool,

    /// Look up buffer URIs without percent-decoding them
    #[arg(long, global = true)]
    no_decode_uris: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Entity counts and total sizes
    Summary {
        /// Input .gltf or .glb file
        input: PathBuf,
    },

    /// Node tree in traversal order
    Nodes {
        input: PathBuf,
    },

    /// Details of one node
    Node {
        input: PathBuf,
        index: usize,
    },

    /// Meshes with sizes and reference counts
    Meshes {
        input: PathBuf,
    },

    /// Primitives and accessor slots of one mesh
    Mesh {
        input: PathBuf,
        index: usize,
    },

    /// Materials with primitive and node counts
    Materials {
        input: PathBuf,
    },

    /// Entities referencing (or referenced by) one entity
    Refs {
        input: PathBuf,
        kind: RefKind,
        index: usize,
    },

    /// Case-insensitive search on entity names
    Search {
        input: PathBuf,
        kind: RefKind,
        needle: String,
    },

    /// Decoded accessor data
    Accessor {
        input: PathBuf,
        index: usize,

        /// Maximum number of items to print
        #[arg(short, long, default_value_t = 32)]
        limit: usize,
    },

    /// Write a standalone document holding one mesh
    ExtractMesh {
        input: PathBuf,
        index: usize,

        /// Output .gltf file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write a standalone document holding one node and its mesh
    ExtractNode {
        input: PathBuf,
        index: usize,

        /// Output .gltf file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum RefKind {
    Node,
    Mesh,
    Material,
    Buffer,
    View,
    Accessor,
}

impl From<RefKind> for AssetType {
    fn from(kind: RefKind) -> Self {
        match kind {
            RefKind::Node => AssetType::Node,
            RefKind::Mesh => AssetType::Mesh,
            RefKind::Material => AssetType::Material,
            RefKind::Buffer => AssetType::Buffer,
            RefKind::View => AssetType::View,
            RefKind::Accessor => AssetType::Accessor,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let options = LoadOptions::new()
        .with_decode_uris(!cli.no_decode_uris)
        .with_max_buffer_len(cli.max_buffer_len)
        .with_strict_glb_length(!cli.lenient_glb);

    run(cli.command, &options, cli.json)
}

fn load(input: &Path, options: &LoadOptions) -> Result<LoadedAsset> {
    debug!(input = %input.display(), ?options, "loading");
    load_path(input, options).with_context(|| format!("Failed to load {}", input.display()))
}

fn run(command: Commands, options: &LoadOptions, json: bool) -> Result<()> {
    match command {
        Commands::Summary { input } => {
            let asset = load(&input, options)?;
            let summary = render::Summary::new(&asset);
            emit(json, &summary, || summary.to_string())
        }
        Commands::Nodes { input } => {
            let asset = load(&input, options)?;
            let rows = report::node_rows(asset.document());
            emit(json, &rows, || render::node_tree(&rows))
        }
        Commands::Node { input, index } => {
            let asset = load(&input, options)?;
            let Some(panel) = report::node_panel(asset.document(), index) else {
                bail!("Node {} does not exist ({} nodes)", index, asset.document().nodes.len());
            };
            emit(json, &panel, || render::node_panel(&panel))
        }
        Commands::Meshes { input } => {
            let asset = load(&input, options)?;
            let rows = report::mesh_rows(asset.document());
            emit(json, &rows, || render::mesh_table(&rows))
        }
        Commands::Mesh { input, index } => {
            let asset = load(&input, options)?;
            let Some(panel) = report::mesh_panel(asset.document(), index) else {
                bail!("Mesh {} does not exist ({} meshes)", index, asset.document().meshes.len());
            };
            emit(json, &panel, || render::mesh_panel(&panel))
        }
        Commands::Materials { input } => {
            let asset = load(&input, options)?;
            let rows = report::material_rows(asset.document());
            emit(json, &rows, || render::material_table(&rows))
        }
        Commands::Refs { input, kind, index } => {
            let asset = load(&input, options)?;
            let referrers = referrers(&asset, kind, index);
            emit(json, &referrers, || render::referrers(&referrers))
        }
        Commands::Search {
            input,
            kind,
            needle,
        } => {
            let asset = load(&input, options)?;
            let hits = xref::search_by_name(asset.document(), kind.into(), &needle);
            emit(json, &hits, || {
                hits.iter()
                    .map(|i| format!("{}\n", i))
                    .collect::<String>()
            })
        }
        Commands::Accessor {
            input,
            index,
            limit,
        } => {
            let asset = load(&input, options)?;
            let data = asset
                .accessor_data(index)
                .with_context(|| format!("Failed to read accessor {}", index))?;
            match data {
                Some(buffer) => emit(json, &buffer, || render::accessor_table(&buffer, limit)),
                None => {
                    eprintln!("Accessor {} has no displayable data", index);
                    Ok(())
                }
            }
        }
        Commands::ExtractMesh {
            input,
            index,
            output,
        } => {
            let asset = load(&input, options)?;
            let mini = extract_mesh(asset.document(), index)?;
            write_document(&mini.to_json()?, output)
        }
        Commands::ExtractNode {
            input,
            index,
            output,
        } => {
            let asset = load(&input, options)?;
            let mini = extract_node(asset.document(), index)?;
            write_document(&mini.to_json()?, output)
        }
    }
}

fn referrers(asset: &LoadedAsset, kind: RefKind, index: usize) -> Vec<Referrer> {
    let doc = asset.document();
    match kind {
        RefKind::Mesh => xref::nodes_referencing_mesh(doc, index)
            .into_iter()
            .map(|n| Referrer::new(AssetType::Node, n.annotation.self_index, n.label()))
            .collect(),
        RefKind::Material => {
            let meshes = xref::meshes_referencing_material(doc, index)
                .into_iter()
                .map(|m| Referrer::new(AssetType::Mesh, m.annotation.self_index, m.label()));
            let nodes = xref::nodes_referencing_material(doc, index)
                .into_iter()
                .map(|n| Referrer::new(AssetType::Node, n.annotation.self_index, n.label()));
            meshes.chain(nodes).collect()
        }
        RefKind::Node => xref::materials_referenced_by_node(doc, index)
            .into_iter()
            .map(|m| Referrer::new(AssetType::Material, m.annotation.self_index, m.label()))
            .collect(),
        RefKind::Buffer => xref::views_referencing_buffer(doc, index)
            .into_iter()
            .map(|v| {
                let name = v.name.clone().unwrap_or_default();
                Referrer::new(AssetType::View, v.annotation.self_index, name)
            })
            .collect(),
        RefKind::View => xref::accessors_referencing_view(doc, index)
            .into_iter()
            .map(|a| {
                let name = a.name.clone().unwrap_or_default();
                Referrer::new(AssetType::Accessor, a.annotation.self_index, name)
            })
            .collect(),
        RefKind::Accessor => asset
            .index()
            .primitives_referencing_accessor(index)
            .iter()
            .map(|p| Referrer::primitive(p.mesh, p.primitive, doc.meshes[p.mesh].label()))
            .collect(),
    }
}

fn emit<T: Serialize>(json: bool, value: &T, text: impl FnOnce() -> String) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        print!("{}", text());
    }
    Ok(())
}

fn write_document(json: &str, output: Option<PathBuf>) -> Result<()> {
    match output {
        Some(path) => {
            fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("Wrote {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}
