use anyhow::Context;
use autofish::autofish::Patcher;
use serde::Serialize;

use crate::{app::GlobalOptions, commands::common::config, output::print_output};

#[derive(Debug, Serialize)]
pub struct RestoreSummary {
    pub exe: String,
    pub backup: String,
}

pub fn run(opts: &GlobalOptions) -> anyhow::Result<()> {
    let config = config(opts);
    Patcher::new(config.clone())
        .restore()
        .with_context(|| format!("failed to restore {}", config.exe_path().display()))?;

    let summary = RestoreSummary {
        exe: config.exe_path().display().to_string(),
        backup: config.backup_path().display().to_string(),
    };
    print_output(&summary, opts, |summary| {
        println!("Restored {} from {}", summary.exe, summary.backup);
    })
}
