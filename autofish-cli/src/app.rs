use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// autofish - automatic catching and recasting for Terraria
#[derive(Debug, Parser)]
#[command(name = "autofish", version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOptions,

    #[command(subcommand)]
    pub command: Command,
}

/// Options shared across all subcommands.
#[derive(Debug, Parser)]
pub struct GlobalOptions {
    /// Game directory. Defaults to TERRARIA_DIR, then the Steam install location.
    #[arg(short, long, global = true, value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// File name of the game executable.
    #[arg(long, global = true, default_value = "Terraria.exe", value_name = "NAME")]
    pub exe: String,

    /// Emit output as JSON instead of human-readable text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose (debug-level) logging output.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Patch the executable, keeping a backup of the original.
    Patch {
        /// Number of projectile slots the recast check scans.
        #[arg(
            long,
            default_value_t = autofish::config::DEFAULT_MAX_PROJECTILES,
            value_parser = clap::value_parser!(i32).range(1..)
        )]
        max_projectiles: i32,

        /// Local slot of Player.ItemCheck holding the item in use.
        #[arg(long, default_value_t = autofish::config::DEFAULT_HELD_ITEM_LOCAL)]
        held_item_local: u16,

        /// Do not create or update the backup and hash file.
        #[arg(long)]
        no_backup: bool,
    },

    /// Copy the backup over the executable.
    Restore,

    /// Show the executable, its backup state and where the patches would go.
    Info,
}
