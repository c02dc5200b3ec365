//! The `studyforge evaluate` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use studyforge_core::evaluator::Evaluator;
use studyforge_core::model::{BloomLevel, Exam, Question, QuestionType};
use studyforge_report::markdown::evaluation_to_markdown;
use studyforge_report::output::write_evaluation;

use super::{GlobalArgs, Session};

#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Exam JSON produced by `studyforge exam`
    #[arg(long, requires = "question_id", conflicts_with_all = ["question", "reference"])]
    pub exam: Option<PathBuf>,

    /// Id of the question within the exam
    #[arg(long, requires = "exam")]
    pub question_id: Option<String>,

    /// Question text, when not evaluating against an exam
    #[arg(long, requires = "reference")]
    pub question: Option<String>,

    /// Reference answer for --question
    #[arg(long, requires = "question")]
    pub reference: Option<String>,

    /// Bloom level of --question
    #[arg(long, default_value = "understand")]
    pub level: BloomLevel,

    /// The answer to judge
    #[arg(long)]
    pub answer: String,

    /// Write the result here (.json for JSON, anything else for Markdown)
    #[arg(long)]
    pub output: Option<PathBuf>,
}

pub async fn execute(globals: &GlobalArgs, args: EvaluateArgs) -> Result<()> {
    let question = resolve_question(&args)?;

    let session = Session::open(globals)?;
    let evaluator = Evaluator::new(session.client.clone(), session.config.request_timeout());
    let result = evaluator
        .evaluate(&question, &args.answer)
        .await
        .context("evaluation failed")?;

    println!("{}", evaluation_to_markdown(&question, &result));

    if let Some(path) = &args.output {
        write_evaluation(&question, &result, path)?;
        eprintln!("Saved: {}", path.display());
    }
    Ok(())
}

fn resolve_question(args: &EvaluateArgs) -> Result<Question> {
    if let (Some(path), Some(id)) = (&args.exam, &args.question_id) {
        let exam = Exam::load_json(path)?;
        return exam
            .question(id)
            .cloned()
            .with_context(|| format!("no question '{id}' in {}", path.display()));
    }

    match (&args.question, &args.reference) {
        (Some(prompt), Some(reference)) => Ok(Question {
            id: "question".into(),
            prompt: prompt.clone(),
            level: args.level,
            question_type: QuestionType::ShortAnswer,
            choices: vec![],
            answer: reference.clone(),
            explanation: None,
            hint: None,
        }),
        _ => anyhow::bail!("pass either --exam and --question-id, or --question and --reference"),
    }
}
