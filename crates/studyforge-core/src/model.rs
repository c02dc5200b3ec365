//! Core data model types for studyforge.
//!
//! These are the fundamental types the whole pipeline passes around:
//! source content, Bloom levels, questions, exams and evaluation results.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A piece of course material questions are generated from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentChunk {
    /// Identifier, usually derived from the source file name.
    pub id: String,
    /// The source text.
    pub text: String,
    /// Optional topic tag (e.g. the first Markdown heading).
    #[serde(default)]
    pub topic: Option<String>,
}

impl ContentChunk {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            topic: None,
        }
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    /// Whether the chunk has no usable text.
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Cognitive level from Bloom's taxonomy, ordered from lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BloomLevel {
    Remember,
    Understand,
    Apply,
    Analyze,
    Evaluate,
    Create,
}

impl BloomLevel {
    /// Every level, lowest first.
    pub const ALL: [BloomLevel; 6] = [
        BloomLevel::Remember,
        BloomLevel::Understand,
        BloomLevel::Apply,
        BloomLevel::Analyze,
        BloomLevel::Evaluate,
        BloomLevel::Create,
    ];

    /// Lowercase identifier used in ids, file names and TOML keys.
    pub fn slug(self) -> &'static str {
        match self {
            BloomLevel::Remember => "remember",
            BloomLevel::Understand => "understand",
            BloomLevel::Apply => "apply",
            BloomLevel::Analyze => "analyze",
            BloomLevel::Evaluate => "evaluate",
            BloomLevel::Create => "create",
        }
    }

    /// What a question at this level tests.
    pub fn description(self) -> &'static str {
        match self {
            BloomLevel::Remember => "recall facts, terms and basic concepts from the material",
            BloomLevel::Understand => "explain ideas or concepts in their own words",
            BloomLevel::Apply => "use the information in a new, concrete situation",
            BloomLevel::Analyze => "break the material into parts and draw connections between them",
            BloomLevel::Evaluate => "justify a position or decision using criteria from the material",
            BloomLevel::Create => "synthesize the material into a new product, plan or point of view",
        }
    }

    /// Action verbs typical for questions at this level.
    pub fn verbs(self) -> &'static [&'static str] {
        match self {
            BloomLevel::Remember => &["define", "list", "recall", "identify", "name", "state"],
            BloomLevel::Understand => &["explain", "summarize", "describe", "classify", "paraphrase"],
            BloomLevel::Apply => &["apply", "solve", "use", "demonstrate", "calculate", "implement"],
            BloomLevel::Analyze => &["compare", "contrast", "differentiate", "examine", "organize"],
            BloomLevel::Evaluate => &["judge", "critique", "justify", "defend", "assess", "argue"],
            BloomLevel::Create => &["design", "construct", "propose", "formulate", "compose", "devise"],
        }
    }
}

impl fmt::Display for BloomLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BloomLevel::Remember => write!(f, "Remember"),
            BloomLevel::Understand => write!(f, "Understand"),
            BloomLevel::Apply => write!(f, "Apply"),
            BloomLevel::Analyze => write!(f, "Analyze"),
            BloomLevel::Evaluate => write!(f, "Evaluate"),
            BloomLevel::Create => write!(f, "Create"),
        }
    }
}

impl FromStr for BloomLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "remember" | "remembering" | "knowledge" | "recall" => Ok(BloomLevel::Remember),
            "understand" | "understanding" | "comprehension" => Ok(BloomLevel::Understand),
            "apply" | "applying" | "application" => Ok(BloomLevel::Apply),
            "analyze" | "analyse" | "analyzing" | "analysing" | "analysis" => {
                Ok(BloomLevel::Analyze)
            }
            "evaluate" | "evaluating" | "evaluation" => Ok(BloomLevel::Evaluate),
            "create" | "creating" | "creation" | "synthesis" => Ok(BloomLevel::Create),
            other => Err(format!("unknown Bloom level: {other}")),
        }
    }
}

/// Supported question formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionType {
    MultipleChoice,
    TrueFalse,
    ShortAnswer,
    FillInTheBlank,
    Essay,
    Flashcard,
    /// The model picks a format per question.
    Mixed,
}

impl QuestionType {
    pub const ALL: [QuestionType; 7] = [
        QuestionType::MultipleChoice,
        QuestionType::TrueFalse,
        QuestionType::ShortAnswer,
        QuestionType::FillInTheBlank,
        QuestionType::Essay,
        QuestionType::Flashcard,
        QuestionType::Mixed,
    ];

    /// Human-readable label used in prompts and rendered exams.
    pub fn label(self) -> &'static str {
        match self {
            QuestionType::MultipleChoice => "Multiple Choice",
            QuestionType::TrueFalse => "True/False",
            QuestionType::ShortAnswer => "Short Answer",
            QuestionType::FillInTheBlank => "Fill in the Blank",
            QuestionType::Essay => "Essay",
            QuestionType::Flashcard => "Flashcard",
            QuestionType::Mixed => "Mixed",
        }
    }

    /// Whether questions of this type carry answer choices.
    pub fn has_choices(self) -> bool {
        matches!(self, QuestionType::MultipleChoice | QuestionType::TrueFalse)
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestionType::MultipleChoice => write!(f, "multiple-choice"),
            QuestionType::TrueFalse => write!(f, "true-false"),
            QuestionType::ShortAnswer => write!(f, "short-answer"),
            QuestionType::FillInTheBlank => write!(f, "fill-in-the-blank"),
            QuestionType::Essay => write!(f, "essay"),
            QuestionType::Flashcard => write!(f, "flashcard"),
            QuestionType::Mixed => write!(f, "mixed"),
        }
    }
}

impl FromStr for QuestionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| if c == ' ' || c == '_' || c == '/' { '-' } else { c })
            .collect();
        match normalized.as_str() {
            "multiple-choice" | "mcq" | "mc" => Ok(QuestionType::MultipleChoice),
            "true-false" | "truefalse" | "tf" => Ok(QuestionType::TrueFalse),
            "short-answer" | "short" => Ok(QuestionType::ShortAnswer),
            "fill-in-the-blank" | "fill-in-blank" | "fill-in" | "cloze" => {
                Ok(QuestionType::FillInTheBlank)
            }
            "essay" | "long-answer" => Ok(QuestionType::Essay),
            "flashcard" | "flashcards" | "card" => Ok(QuestionType::Flashcard),
            "mixed" | "mix" | "any" => Ok(QuestionType::Mixed),
            _ => Err(format!("unknown question type: {}", s.trim())),
        }
    }
}

/// A single generated question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// Identifier, unique within an exam.
    pub id: String,
    /// The question text (the front of a flashcard).
    pub prompt: String,
    /// Cognitive level the question targets.
    pub level: BloomLevel,
    /// Question format.
    pub question_type: QuestionType,
    /// Answer choices for multiple-choice and true/false questions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<String>,
    /// Reference answer (the back of a flashcard).
    pub answer: String,
    /// Why the reference answer is correct.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    /// A nudge for the student.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

/// How demanding generated questions should be.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    /// Prompt guidance for this difficulty.
    pub fn guidance(self) -> &'static str {
        match self {
            Difficulty::Easy => {
                "Keep questions straightforward and answerable from a single statement in the content."
            }
            Difficulty::Medium => {
                "Questions may connect two related ideas from the content; distractors should be plausible."
            }
            Difficulty::Hard => {
                "Questions should require combining several ideas or reasoning beyond the literal text; distractors should reflect common misconceptions."
            }
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Easy => write!(f, "easy"),
            Difficulty::Medium => write!(f, "medium"),
            Difficulty::Hard => write!(f, "hard"),
        }
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "easy" | "beginner" => Ok(Difficulty::Easy),
            "medium" | "normal" | "intermediate" => Ok(Difficulty::Medium),
            "hard" | "difficult" | "advanced" => Ok(Difficulty::Hard),
            _ => Err(format!(
                "unknown difficulty: {} (expected easy, medium or hard)",
                s.trim()
            )),
        }
    }
}

/// Requested number of questions per level.
pub type Distribution = BTreeMap<BloomLevel, u32>;

/// Upper bound on the questions requested for a single level.
pub const MAX_LEVEL_COUNT: u32 = 1000;

/// Add `count` questions at `level`, rejecting totals above [`MAX_LEVEL_COUNT`].
pub fn add_to_distribution(dist: &mut Distribution, level: BloomLevel, count: u32) -> Result<(), String> {
    let entry = dist.entry(level).or_insert(0);
    match entry.checked_add(count) {
        Some(total) if total <= MAX_LEVEL_COUNT => {
            *entry = total;
            Ok(())
        }
        _ => Err(format!(
            "too many questions for {level}: at most {MAX_LEVEL_COUNT} per level"
        )),
    }
}

/// Parse a distribution such as `remember=3,apply=2`.
pub fn parse_distribution(s: &str) -> Result<Distribution, String> {
    let mut dist = Distribution::new();
    for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (level, count) = part
            .split_once('=')
            .or_else(|| part.split_once(':'))
            .ok_or_else(|| format!("expected level=count, got '{part}'"))?;
        let level: BloomLevel = level.parse()?;
        let count: u32 = count
            .trim()
            .parse()
            .map_err(|_| format!("invalid count for {level}: '{}'", count.trim()))?;
        add_to_distribution(&mut dist, level, count)?;
    }
    if dist.is_empty() {
        return Err("distribution is empty".to_string());
    }
    Ok(dist)
}

/// An assembled exam or flashcard deck.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exam {
    /// Unique exam identifier.
    pub id: Uuid,
    /// Human-readable title.
    pub title: String,
    /// Format the questions were requested in.
    pub question_type: QuestionType,
    /// Requested question count per level.
    pub requested: Distribution,
    #[serde(default)]
    pub difficulty: Difficulty,
    /// Questions ordered by level, then generation order.
    pub questions: Vec<Question>,
    /// When the exam was assembled.
    pub created_at: DateTime<Utc>,
}

impl Exam {
    /// Number of questions actually present per level.
    pub fn realized_distribution(&self) -> Distribution {
        let mut dist = Distribution::new();
        for q in &self.questions {
            *dist.entry(q.level).or_insert(0) += 1;
        }
        dist
    }

    pub fn questions_at(&self, level: BloomLevel) -> impl Iterator<Item = &Question> {
        self.questions.iter().filter(move |q| q.level == level)
    }

    pub fn question(&self, id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    pub fn requested_total(&self) -> u32 {
        self.requested.values().fold(0u32, |acc, n| acc.saturating_add(*n))
    }

    pub fn is_flashcard_deck(&self) -> bool {
        self.question_type == QuestionType::Flashcard
    }

    /// Save the exam as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize exam")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write exam to {}", path.display()))?;
        Ok(())
    }

    /// Load an exam from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read exam from {}", path.display()))?;
        serde_json::from_str(&content).context("failed to parse exam JSON")
    }
}

/// Deficit between requested and realized questions for one level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shortfall {
    pub level: BloomLevel,
    pub requested: u32,
    pub realized: u32,
}

impl Shortfall {
    pub fn deficit(&self) -> u32 {
        self.requested.saturating_sub(self.realized)
    }
}

/// The model's verdict on a submitted answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Judgment {
    Correct,
    Incorrect,
    /// The reply could not be interpreted as a verdict.
    Undetermined,
}

impl fmt::Display for Judgment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Judgment::Correct => write!(f, "correct"),
            Judgment::Incorrect => write!(f, "incorrect"),
            Judgment::Undetermined => write!(f, "undetermined"),
        }
    }
}

/// Outcome of evaluating one submitted answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub question_id: String,
    pub submitted_answer: String,
    pub judgment: Judgment,
    /// Score out of 100, when the model gave one.
    #[serde(default)]
    pub score: Option<u8>,
    pub feedback: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub improvements: Vec<String>,
    #[serde(default)]
    pub improved_answer: Option<String>,
}

impl EvaluationResult {
    pub fn is_correct(&self) -> bool {
        self.judgment == Judgment::Correct
    }
}
