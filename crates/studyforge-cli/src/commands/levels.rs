//! The `studyforge levels` command.

use anyhow::Result;
use comfy_table::{Cell, Table};

use studyforge_core::model::BloomLevel;

pub fn execute() -> Result<()> {
    let mut table = Table::new();
    table.set_header(vec!["#", "Level", "Students can...", "Typical verbs"]);

    for (i, level) in BloomLevel::ALL.iter().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(level),
            Cell::new(level.description()),
            Cell::new(level.verbs().join(", ")),
        ]);
    }

    println!("{table}");
    Ok(())
}
