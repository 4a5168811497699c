use anyhow::Context;
use autofish::autofish::{PatchReport, Patcher};
use serde::Serialize;

use crate::{
    app::GlobalOptions,
    commands::common::config,
    output::{print_output, PatchTable},
};

/// Options of the `patch` subcommand.
pub struct PatchOptions {
    pub max_projectiles: i32,
    pub held_item_local: u16,
    pub backup: bool,
}

#[derive(Debug, Serialize)]
pub struct PatchSummary {
    pub exe: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup: Option<String>,
    pub patches: Vec<AppliedPatch>,
    pub original_size: u64,
    pub patched_size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AppliedPatch {
    pub patch: String,
    pub method: String,
    pub pattern: String,
    pub index: usize,
    pub inserted: usize,
    pub retargeted: usize,
    pub locals: usize,
}

fn summarize(exe: String, report: PatchReport) -> PatchSummary {
    PatchSummary {
        exe,
        backup: report.backup.map(|action| format!("{action:?}")),
        patches: report
            .outcomes
            .into_iter()
            .map(|outcome| AppliedPatch {
                patch: outcome.patch,
                method: outcome.method,
                pattern: outcome.pattern,
                index: outcome.splice.index,
                inserted: outcome.splice.inserted,
                retargeted: outcome.splice.retargeted.len(),
                locals: outcome.splice.locals,
            })
            .collect(),
        original_size: report.original_size,
        patched_size: report.patched_size,
        hash: report.hash,
    }
}

pub fn run(options: &PatchOptions, opts: &GlobalOptions) -> anyhow::Result<()> {
    let config = config(opts)
        .with_max_projectiles(options.max_projectiles)
        .with_held_item_local(options.held_item_local)
        .with_backup(options.backup);
    let exe = config.exe_path();

    let report = Patcher::new(config)
        .run()
        .with_context(|| format!("failed to patch {}", exe.display()))?;
    let summary = summarize(exe.display().to_string(), report);

    print_output(&summary, opts, |summary| {
        println!("Patched {}", summary.exe);
        let mut table = PatchTable::new(
            &["Patch", "Method", "Pattern"],
            &["Index", "Inserted", "Retargeted"],
        );
        for patch in &summary.patches {
            table.row(
                &[patch.patch.as_str(), &patch.method, &patch.pattern],
                &[patch.index, patch.inserted, patch.retargeted],
            );
        }
        table.print();
        if let Some(hash) = &summary.hash {
            println!("SHA-256:  {hash}");
        }
    })
}
