use comfy_table::{presets, CellAlignment, ContentArrangement, Table};
use serde::Serialize;

use crate::app::GlobalOptions;

/// Print `data` as JSON (if `--json`) or call `display_fn` for human-readable output.
pub fn print_output<T: Serialize>(
    data: &T,
    opts: &GlobalOptions,
    display_fn: impl FnOnce(&T),
) -> anyhow::Result<()> {
    if opts.json {
        let json = serde_json::to_string_pretty(data)?;
        println!("{json}");
    } else {
        display_fn(data);
    }
    Ok(())
}

/// Borderless table of patch sites: text columns followed by right-aligned counts,
/// printed indented under a heading line.
pub struct PatchTable {
    table: Table,
}

impl PatchTable {
    pub fn new(text: &[&str], counts: &[&str]) -> Self {
        let mut table = Table::new();
        table
            .load_preset(presets::NOTHING)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(text.iter().chain(counts).copied().collect::<Vec<_>>());

        let last = text.len() + counts.len() - 1;
        for (i, column) in table.column_iter_mut().enumerate() {
            if i >= text.len() {
                column.set_cell_alignment(CellAlignment::Right);
            }
            column.set_padding((u16::from(i > 0), u16::from(i < last)));
        }
        PatchTable { table }
    }

    pub fn row(&mut self, text: &[&str], counts: &[usize]) {
        let cells = text
            .iter()
            .map(|cell| (*cell).to_string())
            .chain(counts.iter().map(usize::to_string));
        self.table.add_row(cells);
    }

    pub fn print(&self) {
        for line in self.table.to_string().lines() {
            println!("  {}", line.trim_end());
        }
    }
}
