//! The `studyforge flashcards` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use studyforge_core::assembler::{ExamAssembler, ExamRequest};
use studyforge_core::content::load_content;
use studyforge_core::model::{BloomLevel, Difficulty};

use super::{elapsed, export, print_distribution, ConsoleReporter, GlobalArgs, Session};

#[derive(Args, Debug)]
pub struct FlashcardArgs {
    /// Content file or directory
    #[arg(long)]
    pub content: PathBuf,

    /// Number of cards
    #[arg(long, default_value = "10")]
    pub count: u32,

    /// Bloom level the cards target
    #[arg(long, default_value = "remember")]
    pub level: BloomLevel,

    /// Difficulty: easy, medium, hard
    #[arg(long, default_value = "medium")]
    pub difficulty: Difficulty,

    /// Deck title
    #[arg(long, default_value = "Flashcards")]
    pub title: String,

    /// Output directory (default: output_dir from config)
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Output formats: json, markdown, html, all (comma-separated)
    #[arg(long, default_value = "json,markdown")]
    pub format: String,
}

pub async fn execute(globals: &GlobalArgs, args: FlashcardArgs) -> Result<()> {
    anyhow::ensure!(args.count >= 1, "count must be at least 1");

    let session = Session::open(globals)?;
    let chunks = load_content(&args.content, session.config.max_chunk_chars)?;

    let request = ExamRequest::flashcards(args.title, args.level, args.count)
        .with_difficulty(args.difficulty);
    let assembler = ExamAssembler::new(session.client.clone(), session.config.assembler_config());
    let assembly = assembler
        .assemble(&request, &chunks, &ConsoleReporter)
        .await
        .context("flashcard generation failed")?;

    print_distribution(&assembly.exam);
    eprintln!(
        "{} card(s) from {} model call(s) in {}",
        assembly.exam.questions.len(),
        assembly.attempts,
        elapsed(assembly.duration_ms)
    );

    let dir = session.output_dir(args.output);
    export(&assembly.exam, &assembly.shortfalls, &dir, &args.format)
}
