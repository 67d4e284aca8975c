//! Additions command
//!
//! Usage: graft additions --doc <PATH> --baseline <TREE> --modified <TREE> [--destination <TREE>]

use std::path::PathBuf;

use clap::Args;
use graft_core::TargetStatus;

use super::{load_config, parse_mode, parse_pin, prepare_tree, CliResult, ModeArg, PinArg, SourceArgs, Sources};

#[derive(Debug, Args)]
pub struct AdditionsArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Destination tree; when given, targets are guessed and conflicts detected
    #[arg(long)]
    pub destination: Option<String>,

    /// Pin an addition tree node: MOD_PATH=DEST_PATH
    #[arg(long = "pin", value_parser = parse_pin)]
    pub pins: Vec<PinArg>,

    /// Conflict mode for added facets: MOD_PATH:KIND=MODE
    #[arg(long = "mode", value_parser = parse_mode)]
    pub modes: Vec<ModeArg>,

    /// Merge configuration (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Execute additions command
pub fn execute(args: AdditionsArgs) -> CliResult<()> {
    let sources = Sources::open(&args.source)?;
    let mut tree = sources.additions()?;
    let doc = &sources.loaded.document;

    if let Some(destination) = &args.destination {
        let config = load_config(args.config.as_ref())?;
        let destination_root = sources.loaded.root(destination)?;
        prepare_tree(
            &mut tree,
            doc,
            sources.modified_root,
            destination_root,
            &args.pins,
            &args.modes,
            &config,
        )?;
    }

    print!("{}", tree.render(doc)?);
    println!("{} addition(s)", tree.addition_count());

    if args.destination.is_some() {
        for issue in tree.validate_targets(doc)? {
            let node = tree.get(issue.node)?;
            match issue.status {
                TargetStatus::RootUnassigned => println!("error: root has no target"),
                TargetStatus::OutsideRootTarget => {
                    println!("error: '{}' targets outside the destination", node.name())
                }
                TargetStatus::Unassigned => {
                    println!("warning: '{}' has no target and will not be merged", node.name())
                }
            }
        }
    }

    Ok(())
}
