//! TOML exam blueprint parser.
//!
//! A blueprint names the content to draw from and how many questions to ask
//! at each Bloom level.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::model::{add_to_distribution, BloomLevel, Difficulty, Distribution, QuestionType};

/// Level counts above this are almost certainly a typo.
const LARGE_LEVEL_COUNT: u32 = 50;

/// A parsed exam blueprint.
#[derive(Debug, Clone)]
pub struct ExamBlueprint {
    pub title: String,
    pub question_type: QuestionType,
    pub difficulty: Difficulty,
    /// Content files or directories, resolved against the blueprint's directory.
    pub content: Vec<PathBuf>,
    pub distribution: Distribution,
    /// Per-blueprint override of the assembler's attempt budget.
    pub max_attempts_per_level: Option<u32>,
}

/// Intermediate TOML structure for parsing blueprint files.
#[derive(Debug, Deserialize)]
struct TomlBlueprint {
    exam: TomlExamHeader,
    #[serde(default)]
    distribution: BTreeMap<String, u32>,
}

#[derive(Debug, Deserialize)]
struct TomlExamHeader {
    title: String,
    #[serde(default = "default_question_type")]
    question_type: String,
    #[serde(default)]
    difficulty: Option<String>,
    #[serde(default)]
    content: Vec<String>,
    #[serde(default)]
    max_attempts_per_level: Option<u32>,
}

fn default_question_type() -> String {
    "multiple-choice".to_string()
}

/// Parse a blueprint file.
pub fn parse_blueprint(path: &Path) -> Result<ExamBlueprint> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read blueprint: {}", path.display()))?;

    parse_blueprint_str(&content, path)
}

/// Parse a blueprint from a string; relative content paths resolve against
/// the directory of `source_path`.
pub fn parse_blueprint_str(content: &str, source_path: &Path) -> Result<ExamBlueprint> {
    let parsed: TomlBlueprint = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let question_type: QuestionType = parsed
        .exam
        .question_type
        .parse()
        .map_err(|e: String| anyhow::anyhow!("{}", e))?;
    let difficulty: Difficulty = match parsed.exam.difficulty.as_deref() {
        Some(d) => d
            .parse()
            .map_err(|e: String| anyhow::anyhow!("{}: {}", source_path.display(), e))?,
        None => Difficulty::default(),
    };

    let mut distribution = Distribution::new();
    for (key, count) in parsed.distribution {
        let level: BloomLevel = key
            .parse()
            .map_err(|e: String| anyhow::anyhow!("{}: {}", source_path.display(), e))?;
        add_to_distribution(&mut distribution, level, count)
            .map_err(|e| anyhow::anyhow!("{}: {}", source_path.display(), e))?;
    }

    let base = source_path.parent().unwrap_or_else(|| Path::new(""));
    let content = parsed
        .exam
        .content
        .iter()
        .map(|c| {
            let p = PathBuf::from(c);
            if p.is_absolute() {
                p
            } else {
                base.join(p)
            }
        })
        .collect();

    Ok(ExamBlueprint {
        title: parsed.exam.title,
        question_type,
        difficulty,
        content,
        distribution,
        max_attempts_per_level: parsed.exam.max_attempts_per_level,
    })
}

/// A warning from blueprint validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The level concerned, if any.
    pub level: Option<BloomLevel>,
    /// Warning message.
    pub message: String,
}

/// Validate a blueprint for common issues.
pub fn validate_blueprint(blueprint: &ExamBlueprint) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    if blueprint.title.trim().is_empty() {
        warnings.push(ValidationWarning {
            level: None,
            message: "title is empty".into(),
        });
    }

    if blueprint.distribution.values().all(|&n| n == 0) {
        warnings.push(ValidationWarning {
            level: None,
            message: "distribution requests no questions".into(),
        });
    }

    for (&level, &count) in &blueprint.distribution {
        if count == 0 {
            warnings.push(ValidationWarning {
                level: Some(level),
                message: "count is 0 and will be skipped".into(),
            });
        } else if count > LARGE_LEVEL_COUNT {
            warnings.push(ValidationWarning {
                level: Some(level),
                message: format!("{count} questions requested; generation will be slow"),
            });
        }
    }

    if blueprint.content.is_empty() {
        warnings.push(ValidationWarning {
            level: None,
            message: "no content paths listed; pass --content when assembling".into(),
        });
    }
    for path in &blueprint.content {
        if !path.exists() {
            warnings.push(ValidationWarning {
                level: None,
                message: format!("content path not found: {}", path.display()),
            });
        }
    }

    if blueprint.max_attempts_per_level == Some(0) {
        warnings.push(ValidationWarning {
            level: None,
            message: "max_attempts_per_level is 0; no questions will be generated".into(),
        });
    }

    warnings
}
