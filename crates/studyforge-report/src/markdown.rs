//! Markdown renderers for exams, answer keys, flashcard decks and evaluations.

use std::fmt::Write as _;

use studyforge_core::model::{EvaluationResult, Exam, Question, QuestionType, Shortfall};

/// Letter label for the n-th choice (A, B, ...).
pub(crate) fn choice_label(index: usize) -> char {
    (b'A' + (index % 26) as u8) as char
}

/// Render the student-facing exam: questions grouped by level, no answers.
pub fn exam_to_markdown(exam: &Exam, shortfalls: &[Shortfall]) -> String {
    let mut md = String::new();
    let _ = writeln!(md, "# {}\n", exam.title);
    let _ = writeln!(
        md,
        "_{} questions · {} · {} · {}_\n",
        exam.questions.len(),
        exam.question_type.label(),
        exam.difficulty,
        exam.created_at.format("%Y-%m-%d")
    );

    if !shortfalls.is_empty() {
        md.push_str("> **Note:** some levels have fewer questions than requested:\n");
        for s in shortfalls {
            let _ = writeln!(md, "> - {}: {} of {}", s.level, s.realized, s.requested);
        }
        md.push('\n');
    }

    let mut number = 0;
    for (level, _) in exam.realized_distribution() {
        let _ = writeln!(md, "## {level}\n");
        for question in exam.questions_at(level) {
            number += 1;
            write_question(&mut md, number, question);
        }
    }
    md
}

fn write_question(md: &mut String, number: usize, question: &Question) {
    let _ = writeln!(md, "**{number}.** {}\n", question.prompt);
    for (i, choice) in question.choices.iter().enumerate() {
        let _ = writeln!(md, "- {}) {}", choice_label(i), choice);
    }
    if !question.choices.is_empty() {
        md.push('\n');
    }
    match question.question_type {
        QuestionType::ShortAnswer | QuestionType::FillInTheBlank => {
            md.push_str("Answer: ____________________\n\n");
        }
        QuestionType::Essay => md.push_str("_Write your answer below._\n\n\n\n"),
        _ => {}
    }
    if let Some(hint) = &question.hint {
        let _ = writeln!(md, "_Hint: {hint}_\n");
    }
}

/// Render the answer key, numbered like [`exam_to_markdown`].
pub fn answer_key_to_markdown(exam: &Exam) -> String {
    let mut md = String::new();
    let _ = writeln!(md, "# {} — Answer Key\n", exam.title);

    let mut number = 0;
    for (level, _) in exam.realized_distribution() {
        let _ = writeln!(md, "## {level}\n");
        for question in exam.questions_at(level) {
            number += 1;
            let answer = match question.choices.iter().position(|c| *c == question.answer) {
                Some(i) => format!("{}) {}", choice_label(i), question.answer),
                None => question.answer.clone(),
            };
            let _ = writeln!(md, "**{number}.** {answer}  ");
            let _ = writeln!(md, "<sub>`{}`</sub>", question.id);
            if let Some(explanation) = &question.explanation {
                let _ = writeln!(md, "\n{explanation}");
            }
            md.push('\n');
        }
    }
    md
}

/// Render a flashcard deck as a two-column table.
pub fn flashcards_to_markdown(exam: &Exam) -> String {
    let mut md = String::new();
    let _ = writeln!(md, "# {}\n", exam.title);
    md.push_str("| # | Front | Back | Level |\n");
    md.push_str("|---|-------|------|-------|\n");
    for (i, card) in exam.questions.iter().enumerate() {
        let _ = writeln!(
            md,
            "| {} | {} | {} | {} |",
            i + 1,
            table_cell(&card.prompt),
            table_cell(&card.answer),
            card.level
        );
    }
    md
}

fn table_cell(s: &str) -> String {
    s.replace('|', "\\|").replace('\n', "<br>")
}

/// Render one evaluation result.
pub fn evaluation_to_markdown(question: &Question, result: &EvaluationResult) -> String {
    let mut md = String::new();
    md.push_str("# Answer Evaluation\n\n");
    let _ = writeln!(md, "**Question:** {}\n", question.prompt);
    let _ = writeln!(md, "**Your answer:** {}\n", result.submitted_answer);
    let _ = writeln!(md, "**Reference answer:** {}\n", question.answer);

    let verdict = match result.score {
        Some(score) => format!("{} ({score}/100)", result.judgment),
        None => result.judgment.to_string(),
    };
    let _ = writeln!(md, "**Verdict:** {verdict}\n");

    if !result.feedback.is_empty() {
        let _ = writeln!(md, "## Feedback\n\n{}\n", result.feedback);
    }
    if !result.strengths.is_empty() {
        md.push_str("## Strengths\n\n");
        for s in &result.strengths {
            let _ = writeln!(md, "- {s}");
        }
        md.push('\n');
    }
    if !result.improvements.is_empty() {
        md.push_str("## To improve\n\n");
        for s in &result.improvements {
            let _ = writeln!(md, "- {s}");
        }
        md.push('\n');
    }
    if let Some(better) = &result.improved_answer {
        let _ = writeln!(md, "## Suggested answer\n\n{better}\n");
    }
    md
}
