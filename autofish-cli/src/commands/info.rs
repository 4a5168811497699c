use anyhow::Context;
use autofish::autofish::Patcher;
use serde::Serialize;

use crate::{
    app::GlobalOptions,
    commands::common::config,
    output::{print_output, PatchTable},
};

#[derive(Debug, Serialize)]
pub struct ExecutableInfo {
    pub exe: String,
    pub module: String,
    pub mvid: String,
    pub backup: String,
    pub locations: Vec<Location>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Location {
    pub method: String,
    pub pattern: String,
    pub index: usize,
}

pub fn run(opts: &GlobalOptions) -> anyhow::Result<()> {
    let config = config(opts);
    let exe = config.exe_path();
    let inspection = Patcher::new(config)
        .inspect()
        .with_context(|| format!("failed to load {}", exe.display()))?;

    let (locations, error) = match inspection.locations {
        Ok(found) => (
            found
                .into_iter()
                .map(|(method, found)| Location {
                    method,
                    pattern: found.pattern,
                    index: found.index,
                })
                .collect(),
            None,
        ),
        Err(error) => (Vec::new(), Some(error.to_string())),
    };

    let info = ExecutableInfo {
        exe: exe.display().to_string(),
        module: inspection.module,
        mvid: inspection.mvid,
        backup: format!("{:?}", inspection.backup),
        locations,
        error,
    };

    print_output(&info, opts, |info| {
        println!("Executable:  {}", info.exe);
        println!("Module:      {}", info.module);
        println!("MVID:        {}", info.mvid);
        println!("Backup:      {}", info.backup);

        if let Some(error) = &info.error {
            println!("Patches:     cannot be applied: {error}");
        } else {
            println!("\nPatch locations:");
            let mut table = PatchTable::new(&["Method", "Pattern"], &["Index"]);
            for location in &info.locations {
                table.row(&[location.method.as_str(), &location.pattern], &[location.index]);
            }
            table.print();
        }
    })
}
