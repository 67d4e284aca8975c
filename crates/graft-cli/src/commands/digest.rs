//! Digest command
//!
//! Usage: graft digest --doc <PATH> --tree <TREE>

use std::path::PathBuf;

use clap::Args;
use graft_core::subtree_digest;
use graft_store::load_document_file;

use super::CliResult;

#[derive(Debug, Args)]
pub struct DigestArgs {
    /// Document to read
    #[arg(long)]
    pub doc: PathBuf,

    /// Name of the tree to digest
    #[arg(long)]
    pub tree: String,
}

/// Execute digest command
pub fn execute(args: DigestArgs) -> CliResult<()> {
    let loaded = load_document_file(&args.doc)?;
    let root = loaded.root(&args.tree)?;
    println!("{}", subtree_digest(&loaded.document, root)?);
    Ok(())
}
