//! Subcommand implementations and the setup they share.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use clap::Args;
use comfy_table::{Cell, Table};

use studyforge_core::assembler::ProgressReporter;
use studyforge_core::client::GenerationClient;
use studyforge_core::model::{BloomLevel, Exam, Shortfall};
use studyforge_providers::{create_provider, load_config_from, StudyforgeConfig};
use studyforge_report::{parse_formats, write_exam};

pub mod evaluate;
pub mod exam;
pub mod flashcards;
pub mod generate;
pub mod init;
pub mod levels;
pub mod list_models;
pub mod validate;

/// Options accepted by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Config file path (default: ./studyforge.toml, then ~/.config/studyforge/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Model to use instead of the configured default
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// Provider to use instead of the configured default
    #[arg(long, global = true)]
    pub provider: Option<String>,
}

/// Loaded configuration plus a client for the selected model.
pub struct Session {
    pub config: StudyforgeConfig,
    pub client: GenerationClient,
}

impl Session {
    pub fn open(globals: &GlobalArgs) -> Result<Self> {
        let config = load_config_from(globals.config.as_deref())?;
        let provider_name = globals
            .provider
            .clone()
            .unwrap_or_else(|| config.default_provider.clone());
        let model = globals
            .model
            .clone()
            .unwrap_or_else(|| config.default_model.clone());

        let provider = create_provider(config.provider(&provider_name)?, config.request_timeout())?;
        tracing::info!(provider = %provider_name, %model, "using completion service");

        let client = GenerationClient::new(provider, config.client_settings(&model));
        Ok(Self { config, client })
    }

    pub fn output_dir(&self, requested: Option<PathBuf>) -> PathBuf {
        requested.unwrap_or_else(|| self.config.output_dir.clone())
    }
}

/// Console progress reporter.
pub struct ConsoleReporter;

impl ProgressReporter for ConsoleReporter {
    fn on_level_start(&self, level: BloomLevel, requested: u32) {
        eprintln!("  Generating: {level} ({requested} requested)");
    }

    fn on_retry(&self, level: BloomLevel, retry: u32, error: &str) {
        eprintln!("  Retry {retry} for {level}: {error}");
    }

    fn on_level_complete(&self, level: BloomLevel, realized: u32, requested: u32) {
        let status = if realized >= requested { "OK" } else { "SHORT" };
        eprintln!("  Done: {level} {realized}/{requested} [{status}]");
    }

    fn on_shortfall(&self, shortfall: &Shortfall) {
        eprintln!(
            "  Warning: {} is {} question(s) short",
            shortfall.level,
            shortfall.deficit()
        );
    }
}

/// Print requested vs generated counts per level.
pub fn print_distribution(exam: &Exam) {
    let mut table = Table::new();
    table.set_header(vec!["Level", "Requested", "Generated"]);

    let realized = exam.realized_distribution();
    for (level, requested) in &exam.requested {
        table.add_row(vec![
            Cell::new(level),
            Cell::new(requested),
            Cell::new(realized.get(level).copied().unwrap_or(0)),
        ]);
    }

    eprintln!("\n{table}");
}

/// Export an exam and print where it went.
pub fn export(exam: &Exam, shortfalls: &[Shortfall], dir: &Path, formats: &str) -> Result<()> {
    let formats = parse_formats(formats).map_err(|e| anyhow::anyhow!(e))?;
    for path in write_exam(exam, shortfalls, dir, &formats)? {
        eprintln!("Saved: {}", path.display());
    }
    Ok(())
}

pub fn elapsed(ms: u64) -> String {
    format!("{:.1}s", Duration::from_millis(ms).as_secs_f64())
}
