//! Subcommands and the argument plumbing they share

pub mod additions;
pub mod digest;
pub mod merge;

use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use graft_core::{
    find_additions, AdditionTree, ConflictMode, Document, GraftError, MergeConfig, NodeId,
    TreeView,
};
use graft_store::{load_document_file, LoadedDocument};

pub type CliResult<T> = Result<T, Box<dyn Error>>;

/// Where the baseline and modified trees come from
#[derive(Debug, Args)]
pub struct SourceArgs {
    /// Document holding the modified (and destination) trees
    #[arg(long)]
    pub doc: PathBuf,

    /// Name of the baseline tree
    #[arg(long)]
    pub baseline: String,

    /// Name of the modified tree
    #[arg(long)]
    pub modified: String,

    /// Separate document to read the baseline tree from
    #[arg(long)]
    pub baseline_doc: Option<PathBuf>,
}

/// Loaded inputs for one alignment
pub struct Sources {
    pub loaded: LoadedDocument,
    template: Option<LoadedDocument>,
    pub baseline_root: NodeId,
    pub modified_root: NodeId,
}

impl Sources {
    pub fn open(args: &SourceArgs) -> CliResult<Self> {
        let loaded = load_document_file(&args.doc)?;
        let template = match &args.baseline_doc {
            Some(path) => Some(load_document_file(path)?),
            None => None,
        };
        let baseline_root = template.as_ref().unwrap_or(&loaded).root(&args.baseline)?;
        let modified_root = loaded.root(&args.modified)?;
        Ok(Self {
            loaded,
            template,
            baseline_root,
            modified_root,
        })
    }

    pub fn baseline_view(&self) -> &Document {
        &self.template.as_ref().unwrap_or(&self.loaded).document
    }

    pub fn additions(&self) -> CliResult<AdditionTree> {
        Ok(find_additions(
            self.baseline_view(),
            self.baseline_root,
            &self.loaded.document,
            self.modified_root,
        )?)
    }
}

/// `--pin MOD_PATH=DEST_PATH`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinArg {
    pub modified_path: String,
    pub destination_path: String,
}

pub fn parse_pin(text: &str) -> Result<PinArg, String> {
    let (modified_path, destination_path) = text
        .split_once('=')
        .ok_or_else(|| format!("expected MOD_PATH=DEST_PATH, got '{}'", text))?;
    if modified_path.is_empty() || destination_path.is_empty() {
        return Err(format!("expected MOD_PATH=DEST_PATH, got '{}'", text));
    }
    Ok(PinArg {
        modified_path: modified_path.to_string(),
        destination_path: destination_path.to_string(),
    })
}

/// `--mode MOD_PATH:KIND=MODE`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeArg {
    pub modified_path: String,
    pub kind: String,
    pub mode: ConflictMode,
}

pub fn parse_mode(text: &str) -> Result<ModeArg, String> {
    let malformed = || format!("expected MOD_PATH:KIND=MODE, got '{}'", text);
    let (target, mode) = text.split_once('=').ok_or_else(malformed)?;
    let (modified_path, kind) = target.rsplit_once(':').ok_or_else(malformed)?;
    if modified_path.is_empty() || kind.is_empty() {
        return Err(malformed());
    }
    let mode: ConflictMode = mode.parse().map_err(|e: GraftError| e.to_string())?;
    Ok(ModeArg {
        modified_path: modified_path.to_string(),
        kind: kind.to_string(),
        mode,
    })
}

/// Pin the root and every `--pin`, then assign conflict resolutions
///
/// Explicit `--mode` values are applied after detection so they survive it.
pub fn prepare_tree(
    tree: &mut AdditionTree,
    doc: &Document,
    modified_root: NodeId,
    destination_root: NodeId,
    pins: &[PinArg],
    modes: &[ModeArg],
    config: &MergeConfig,
) -> CliResult<()> {
    let root = tree.root();
    tree.set_remap_target(root, destination_root, doc)?;

    for pin in pins {
        let source = doc.resolve_path(modified_root, &pin.modified_path)?;
        let id = tree
            .find_by_source(source)
            .ok_or_else(|| format!("'{}' is not part of the addition tree", pin.modified_path))?;
        let target = doc.resolve_path(destination_root, &pin.destination_path)?;
        tree.set_remap_target(id, target, doc)?;
    }

    tree.refresh_conflicts(doc, config.default_conflict_mode)?;

    for mode in modes {
        let owner = doc.resolve_path(modified_root, &mode.modified_path)?;
        let group = tree
            .find_facet_group(owner)
            .ok_or_else(|| format!("'{}' has no added facets", mode.modified_path))?;
        tree.set_conflict_resolution(group, mode.kind.as_str(), mode.mode)?;
    }
    Ok(())
}

/// Read a TOML merge configuration, or the defaults
pub fn load_config(path: Option<&PathBuf>) -> CliResult<MergeConfig> {
    match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            Ok(toml::from_str(&text)?)
        }
        None => Ok(MergeConfig::default()),
    }
}
