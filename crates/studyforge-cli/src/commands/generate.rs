//! The `studyforge generate` command.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use studyforge_core::assembler::ExamAssembler;
use studyforge_core::content::load_content;
use studyforge_core::error::StudyError;
use studyforge_core::model::{BloomLevel, Difficulty, QuestionType};

use super::{GlobalArgs, Session};

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Content file or directory
    #[arg(long)]
    pub content: PathBuf,

    /// Bloom level: remember, understand, apply, analyze, evaluate, create
    #[arg(long)]
    pub level: BloomLevel,

    /// Question type
    #[arg(long = "type", default_value = "multiple-choice")]
    pub question_type: QuestionType,

    /// Difficulty: easy, medium, hard
    #[arg(long, default_value = "medium")]
    pub difficulty: Difficulty,

    /// Number of questions to ask for
    #[arg(long, default_value = "5")]
    pub count: u32,
}

/// One prompt, one model call, one parse: prints the parsed questions as JSON.
pub async fn execute(globals: &GlobalArgs, args: GenerateArgs) -> Result<()> {
    anyhow::ensure!(args.count >= 1, "count must be at least 1");

    let session = Session::open(globals)?;
    let chunks = load_content(&args.content, session.config.max_chunk_chars)?;
    let chunk = chunks
        .iter()
        .find(|c| !c.is_empty())
        .ok_or(StudyError::ContentEmpty)?;
    if chunks.len() > 1 {
        eprintln!(
            "Using the first of {} content chunks ({}); use `exam` to draw from all of them.",
            chunks.len(),
            chunk.id
        );
    }

    let assembler = ExamAssembler::new(session.client.clone(), session.config.assembler_config());
    let outcome = assembler
        .generate(chunk, args.level, args.question_type, args.difficulty, args.count)
        .await?;

    if outcome.dropped > 0 {
        eprintln!("Dropped {} malformed question entries.", outcome.dropped);
    }
    if (outcome.questions.len() as u32) < args.count {
        eprintln!(
            "Warning: asked for {} question(s), got {}.",
            args.count,
            outcome.questions.len()
        );
    }

    println!("{}", serde_json::to_string_pretty(&outcome.questions)?);
    Ok(())
}
