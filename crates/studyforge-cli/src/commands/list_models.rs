//! The `studyforge list-models` command.

use anyhow::Result;
use comfy_table::{Cell, Table};

use studyforge_providers::{create_provider, load_config_from};

use super::GlobalArgs;

pub async fn execute(globals: &GlobalArgs) -> Result<()> {
    let config = load_config_from(globals.config.as_deref())?;

    let mut names: Vec<&String> = match &globals.provider {
        Some(filter) => {
            config.provider(filter)?;
            vec![filter]
        }
        None => config.providers.keys().collect(),
    };
    names.sort();

    for name in names {
        let provider = create_provider(config.provider(name)?, config.request_timeout())?;
        let models = match provider.list_models().await {
            Ok(models) => models,
            Err(e) if globals.provider.is_none() => {
                println!("Provider: {name} (unavailable: {e})\n");
                continue;
            }
            Err(e) => return Err(e),
        };

        println!("Provider: {name}");
        if models.is_empty() {
            println!("  (no models)\n");
            continue;
        }

        let mut table = Table::new();
        table.set_header(vec!["Model", "Size"]);
        for model in &models {
            let size = model
                .size_bytes
                .map(|b| format!("{:.1} GB", b as f64 / 1e9))
                .unwrap_or_else(|| "-".to_string());
            let marker = if model.id == config.default_model { " *" } else { "" };
            table.add_row(vec![Cell::new(format!("{}{marker}", model.id)), Cell::new(size)]);
        }
        println!("{table}\n");
    }

    Ok(())
}
