mod app;
mod commands;
mod output;

use clap::Parser;

use crate::app::{Cli, Command};

fn main() -> anyhow::Result<()> {
    ctrlc::set_handler(|| {
        eprintln!("\nCancelled.");
        std::process::exit(130);
    })?;

    let cli = Cli::parse();

    // Show autofish info+ on stderr unless --json; --verbose enables debug; RUST_LOG overrides
    if !cli.global.json {
        let level = if cli.global.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        };
        env_logger::Builder::new()
            .filter_module("autofish", level)
            .parse_default_env()
            .target(env_logger::Target::Stderr)
            .format_timestamp(None)
            .format_module_path(false)
            .format_target(false)
            .init();
    }

    let result = match &cli.command {
        Command::Patch {
            max_projectiles,
            held_item_local,
            no_backup,
        } => commands::patch::run(
            &commands::patch::PatchOptions {
                max_projectiles: *max_projectiles,
                held_item_local: *held_item_local,
                backup: !*no_backup,
            },
            &cli.global,
        ),
        Command::Restore => commands::restore::run(&cli.global),
        Command::Info => commands::info::run(&cli.global),
    };

    // One error line and a non-zero exit
    if let Err(error) = result {
        if cli.global.json {
            eprintln!("{error:#}");
        } else {
            log::error!("{error:#}");
        }
        std::process::exit(1);
    }
    Ok(())
}
