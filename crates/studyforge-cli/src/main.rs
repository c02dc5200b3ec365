//! studyforge CLI — the user-facing command-line interface.

use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::GlobalArgs;

#[derive(Parser)]
#[command(
    name = "studyforge",
    version,
    about = "Generate Bloom's-taxonomy exams and flashcards from course material"
)]
struct Cli {
    #[command(flatten)]
    globals: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate questions at one Bloom level and print them as JSON
    Generate(commands::generate::GenerateArgs),

    /// Assemble an exam from a blueprint or a level distribution
    Exam(commands::exam::ExamArgs),

    /// Generate a flashcard deck
    Flashcards(commands::flashcards::FlashcardArgs),

    /// Have the model judge an answer against a reference answer
    Evaluate(commands::evaluate::EvaluateArgs),

    /// Validate an exam blueprint
    Validate {
        /// Path to the blueprint TOML file
        #[arg(long)]
        blueprint: std::path::PathBuf,
    },

    /// List models offered by the configured providers
    ListModels,

    /// Print the Bloom's taxonomy levels
    Levels,

    /// Create a starter config, blueprint and content file
    Init,
}

#[tokio::main]
async fn main() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("studyforge=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let globals = cli.globals;

    let result = match cli.command {
        Commands::Generate(args) => commands::generate::execute(&globals, args).await,
        Commands::Exam(args) => commands::exam::execute(&globals, args).await,
        Commands::Flashcards(args) => commands::flashcards::execute(&globals, args).await,
        Commands::Evaluate(args) => commands::evaluate::execute(&globals, args).await,
        Commands::Validate { blueprint } => commands::validate::execute(blueprint),
        Commands::ListModels => commands::list_models::execute(&globals).await,
        Commands::Levels => commands::levels::execute(),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
