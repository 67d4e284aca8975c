//! Merge command
//!
//! Usage: graft merge --doc <PATH> --baseline <TREE> --modified <TREE> --destination <TREE>
//!        [--pin MOD_PATH=DEST_PATH]... [--mode MOD_PATH:KIND=MODE]... [--config <TOML>] [--out <PATH>]
//!
//! Without `--out` nothing is written; the reports alone are printed.

use std::path::PathBuf;

use clap::Args;
use graft_core::{replace, ExError, HookRegistry, TargetStatus, TreeView};
use graft_store::{export_trees, write_document_file};

use super::{load_config, parse_mode, parse_pin, prepare_tree, CliResult, ModeArg, PinArg, SourceArgs, Sources};

#[derive(Debug, Args)]
pub struct MergeArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Tree receiving the additions
    #[arg(long)]
    pub destination: String,

    /// Pin an addition tree node: MOD_PATH=DEST_PATH
    #[arg(long = "pin", value_parser = parse_pin)]
    pub pins: Vec<PinArg>,

    /// Conflict mode for added facets: MOD_PATH:KIND=MODE
    #[arg(long = "mode", value_parser = parse_mode)]
    pub modes: Vec<ModeArg>,

    /// Merge configuration (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Write the merged document here
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

/// Execute merge command
pub fn execute(args: MergeArgs) -> CliResult<()> {
    let config = load_config(args.config.as_ref())?;
    let mut sources = Sources::open(&args.source)?;
    let mut tree = sources.additions()?;
    let destination_root = sources.loaded.root(&args.destination)?;

    prepare_tree(
        &mut tree,
        &sources.loaded.document,
        sources.modified_root,
        destination_root,
        &args.pins,
        &args.modes,
        &config,
    )?;

    for issue in tree.validate_targets(&sources.loaded.document)? {
        if issue.status == TargetStatus::Unassigned {
            println!(
                "warning: '{}' has no target and will not be merged",
                tree.get(issue.node)?.name()
            );
        }
    }

    let additions = tree.addition_count();
    let doc = &mut sources.loaded.document;
    let outcome = replace(doc, tree, &config, &HookRegistry::new())?;

    println!(
        "Merged {} addition(s) into {}",
        additions,
        doc.node_name(destination_root)?
    );
    if let Some(failure) = &outcome.hooks.failure {
        println!("hook failed: {}", ExError::from(failure));
    }
    for entry in &outcome.fixup.fixed {
        println!("fixed: {}", entry);
    }
    for entry in &outcome.fixup.unfixed {
        println!("unfixed: {}", entry);
    }

    if let Some(out) = &args.out {
        let roots = doc.roots().to_vec();
        write_document_file(out, &export_trees(&*doc, &roots)?)?;
        println!("Wrote {}", out.display());
    }

    Ok(())
}
