//! studyforge-report — Exam export.
//!
//! Renders assembled exams, answer keys, flashcard decks and evaluation
//! results as JSON, Markdown and self-contained HTML.

pub mod html;
pub mod markdown;
pub mod output;

pub use output::{parse_formats, write_evaluation, write_exam, OutputFormat};
