//! The `studyforge exam` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use studyforge_core::assembler::{ExamAssembler, ExamRequest};
use studyforge_core::blueprint::{parse_blueprint, validate_blueprint};
use studyforge_core::content::load_all;
use studyforge_core::model::{parse_distribution, Difficulty, QuestionType};

use super::{elapsed, export, print_distribution, ConsoleReporter, GlobalArgs, Session};

#[derive(Args, Debug)]
pub struct ExamArgs {
    /// Exam blueprint TOML file
    #[arg(long, conflicts_with = "distribution")]
    pub blueprint: Option<PathBuf>,

    /// Content file or directory (overrides the blueprint's content list)
    #[arg(long)]
    pub content: Vec<PathBuf>,

    /// Questions per level, e.g. "remember=3,apply=2"
    #[arg(long)]
    pub distribution: Option<String>,

    /// Exam title
    #[arg(long)]
    pub title: Option<String>,

    /// Question type: multiple-choice, true-false, short-answer, fill-in-the-blank, essay, mixed
    #[arg(long = "type")]
    pub question_type: Option<QuestionType>,

    /// Difficulty: easy, medium, hard (default: the blueprint's, else medium)
    #[arg(long)]
    pub difficulty: Option<Difficulty>,

    /// Output directory (default: output_dir from config)
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Output formats: json, markdown, html, all (comma-separated)
    #[arg(long, default_value = "json,markdown")]
    pub format: String,
}

pub async fn execute(globals: &GlobalArgs, args: ExamArgs) -> Result<()> {
    let blueprint = match &args.blueprint {
        Some(path) => {
            let bp = parse_blueprint(path)?;
            for w in validate_blueprint(&bp) {
                let prefix = w.level.map(|l| format!("[{l}] ")).unwrap_or_default();
                eprintln!("Warning: {prefix}{}", w.message);
            }
            Some(bp)
        }
        None => None,
    };

    let distribution = match (&args.distribution, &blueprint) {
        (Some(d), _) => parse_distribution(d).map_err(|e| anyhow::anyhow!(e))?,
        (None, Some(bp)) => bp.distribution.clone(),
        (None, None) => anyhow::bail!("either --blueprint or --distribution is required"),
    };

    let content = if !args.content.is_empty() {
        args.content.clone()
    } else {
        blueprint.as_ref().map(|bp| bp.content.clone()).unwrap_or_default()
    };
    anyhow::ensure!(
        !content.is_empty(),
        "no content given; pass --content or list content in the blueprint"
    );

    let title = args
        .title
        .clone()
        .or_else(|| blueprint.as_ref().map(|bp| bp.title.clone()))
        .unwrap_or_else(|| "Practice Exam".to_string());
    let question_type = args
        .question_type
        .or_else(|| blueprint.as_ref().map(|bp| bp.question_type))
        .unwrap_or(QuestionType::MultipleChoice);
    let difficulty = args
        .difficulty
        .or_else(|| blueprint.as_ref().map(|bp| bp.difficulty))
        .unwrap_or_default();

    let session = Session::open(globals)?;
    let chunks = load_all(&content, session.config.max_chunk_chars)?;

    let mut assembler_config = session.config.assembler_config();
    if let Some(attempts) = blueprint.as_ref().and_then(|bp| bp.max_attempts_per_level) {
        assembler_config.max_attempts_per_level = attempts;
    }

    let request = ExamRequest::new(title, question_type, distribution).with_difficulty(difficulty);
    eprintln!(
        "studyforge v{} — Assembling '{}': {} {} questions from {} content chunk(s)",
        env!("CARGO_PKG_VERSION"),
        request.title,
        request.distribution.values().fold(0u32, |acc, n| acc.saturating_add(*n)),
        request.difficulty,
        chunks.len()
    );
    eprintln!();

    let assembler = ExamAssembler::new(session.client.clone(), assembler_config);
    let assembly = assembler
        .assemble(&request, &chunks, &ConsoleReporter)
        .await
        .context("exam assembly failed")?;

    print_distribution(&assembly.exam);
    eprintln!(
        "{} model call(s), {} tokens, {} dropped, {} off-level, {} duplicate(s) in {}",
        assembly.attempts,
        assembly.token_usage.total_tokens,
        assembly.dropped_entries,
        assembly.off_level,
        assembly.duplicates,
        elapsed(assembly.duration_ms)
    );
    if !assembly.is_complete() {
        eprintln!("Warning: the exam is partial; see the table above.");
    }

    let dir = session.output_dir(args.output);
    export(&assembly.exam, &assembly.shortfalls, &dir, &args.format)
}
