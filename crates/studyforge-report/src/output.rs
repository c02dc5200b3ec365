//! Output formats and file export.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};

use studyforge_core::model::{EvaluationResult, Exam, Question, Shortfall};

use crate::html::write_html;
use crate::markdown::{
    answer_key_to_markdown, evaluation_to_markdown, exam_to_markdown, flashcards_to_markdown,
};

/// An export format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Markdown,
    Html,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 3] = [OutputFormat::Json, OutputFormat::Markdown, OutputFormat::Html];
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            "html" => Ok(OutputFormat::Html),
            other => Err(format!("unknown format: {other} (expected json, markdown, html or all)")),
        }
    }
}

/// Parse a comma-separated format list; `all` selects every format.
pub fn parse_formats(s: &str) -> Result<Vec<OutputFormat>, String> {
    let mut formats = Vec::new();
    for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let selected = if part.eq_ignore_ascii_case("all") {
            OutputFormat::ALL.to_vec()
        } else {
            vec![part.parse()?]
        };
        for format in selected {
            if !formats.contains(&format) {
                formats.push(format);
            }
        }
    }
    if formats.is_empty() {
        return Err("no output format given".to_string());
    }
    Ok(formats)
}

/// File-name stem derived from an exam title.
pub fn file_stem(title: &str) -> String {
    let mut out = String::new();
    for c in title.chars() {
        if c.is_alphanumeric() {
            out.extend(c.to_lowercase());
        } else if !out.is_empty() && !out.ends_with('-') {
            out.push('-');
        }
    }
    let trimmed = out.trim_end_matches('-');
    if trimmed.is_empty() {
        "exam".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Write an exam in every requested format under `dir`. Returns the files written.
pub fn write_exam(
    exam: &Exam,
    shortfalls: &[Shortfall],
    dir: &Path,
    formats: &[OutputFormat],
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output directory: {}", dir.display()))?;
    let stem = file_stem(&exam.title);
    let mut written = Vec::new();

    for format in formats {
        match format {
            OutputFormat::Json => {
                let path = dir.join(format!("{stem}.json"));
                exam.save_json(&path)?;
                written.push(path);
            }
            OutputFormat::Markdown => {
                let path = dir.join(format!("{stem}.md"));
                if exam.is_flashcard_deck() {
                    write_text(&path, &flashcards_to_markdown(exam))?;
                    written.push(path);
                } else {
                    write_text(&path, &exam_to_markdown(exam, shortfalls))?;
                    written.push(path);
                    let key = dir.join(format!("{stem}-answers.md"));
                    write_text(&key, &answer_key_to_markdown(exam))?;
                    written.push(key);
                }
            }
            OutputFormat::Html => {
                let path = dir.join(format!("{stem}.html"));
                write_html(exam, shortfalls, &path)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                written.push(path);
            }
        }
    }

    tracing::debug!(files = written.len(), "exported '{}'", exam.title);
    Ok(written)
}

/// Write an evaluation result; `.json` paths get JSON, anything else Markdown.
pub fn write_evaluation(question: &Question, result: &EvaluationResult, path: &Path) -> Result<()> {
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    let content = if is_json {
        serde_json::to_string_pretty(result).context("failed to serialize evaluation")?
    } else {
        evaluation_to_markdown(question, result)
    };
    write_text(path, &content)
}

fn write_text(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))
}
