//! The `studyforge validate` command.

use std::path::PathBuf;

use anyhow::Result;

use studyforge_core::blueprint::{parse_blueprint, validate_blueprint};

pub fn execute(blueprint_path: PathBuf) -> Result<()> {
    let blueprint = parse_blueprint(&blueprint_path)?;

    let total: u32 = blueprint.distribution.values().sum();
    println!(
        "Blueprint: {} ({} questions across {} levels, {})",
        blueprint.title,
        total,
        blueprint.distribution.values().filter(|&&n| n > 0).count(),
        blueprint.question_type
    );

    let warnings = validate_blueprint(&blueprint);
    for w in &warnings {
        let prefix = w
            .level
            .map(|level| format!("  [{level}]"))
            .unwrap_or_else(|| "  ".to_string());
        println!("{prefix} WARNING: {}", w.message);
    }

    if warnings.is_empty() {
        println!("Blueprint valid.");
    } else {
        println!("\n{} warning(s) found.", warnings.len());
    }

    Ok(())
}
