//! graft CLI
//!
//! Command-line interface for propagating additions between hierarchies

use clap::{Parser, Subcommand};
use graft_core::logging_facility::{self, Profile};

mod commands;

#[derive(Debug, Parser)]
#[command(name = "graft")]
#[command(about = "graft - Carry structural additions into an evolved hierarchy", long_about = None)]
struct Cli {
    /// Logging profile (development, production); logging is off when omitted
    #[arg(long, global = true)]
    log_profile: Option<Profile>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print the addition tree of a modified hierarchy
    Additions(commands::additions::AdditionsArgs),
    /// Merge additions into a destination and repair references
    Merge(commands::merge::MergeArgs),
    /// Print the content digest of a tree
    Digest(commands::digest::DigestArgs),
}

fn main() {
    let cli = Cli::parse();

    if let Some(profile) = cli.log_profile {
        logging_facility::init(profile);
    }

    let result = match cli.command {
        Commands::Additions(args) => commands::additions::execute(args),
        Commands::Merge(args) => commands::merge::execute(args),
        Commands::Digest(args) => commands::digest::execute(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
