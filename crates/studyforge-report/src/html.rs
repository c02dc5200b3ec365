//! HTML exam renderer.
//!
//! Produces a self-contained HTML file with all CSS/JS inlined. Answers are
//! folded into `<details>` elements and can be revealed all at once.

use anyhow::Result;
use std::path::Path;

use studyforge_core::model::{Exam, Question, Shortfall};

use crate::markdown::choice_label;

/// Escape a string for safe HTML insertion.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// Generate an HTML page for an exam or flashcard deck.
pub fn generate_html(exam: &Exam, shortfalls: &[Shortfall]) -> String {
    let mut html = String::new();

    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    html.push_str(&format!("<title>{}</title>\n", html_escape(&exam.title)));
    html.push_str("<style>\n");
    html.push_str(CSS);
    html.push_str("</style>\n");
    html.push_str("</head>\n<body>\n");

    // Header
    html.push_str("<header>\n");
    html.push_str(&format!("<h1>{}</h1>\n", html_escape(&exam.title)));
    html.push_str(&format!(
        "<p class=\"meta\">{} questions | {} | {} | {}</p>\n",
        exam.questions.len(),
        exam.question_type.label(),
        exam.difficulty,
        exam.created_at.format("%Y-%m-%d %H:%M UTC")
    ));
    html.push_str("<button onclick=\"toggleAnswers()\">Show / hide answers</button>\n");
    html.push_str("</header>\n");

    // Distribution summary
    html.push_str("<section class=\"distribution\">\n");
    html.push_str("<table>\n");
    html.push_str("<thead><tr><th>Level</th><th>Requested</th><th>Generated</th></tr></thead>\n");
    html.push_str("<tbody>\n");
    let realized = exam.realized_distribution();
    for (level, requested) in &exam.requested {
        let got = realized.get(level).copied().unwrap_or(0);
        let class = if shortfalls.iter().any(|s| s.level == *level) {
            "short"
        } else {
            "ok"
        };
        html.push_str(&format!(
            "<tr class=\"{class}\"><td>{level}</td><td>{requested}</td><td>{got}</td></tr>\n"
        ));
    }
    html.push_str("</tbody></table>\n");
    html.push_str("</section>\n");

    if exam.is_flashcard_deck() {
        html.push_str("<section class=\"cards\">\n");
        for card in &exam.questions {
            html.push_str(&format!(
                "<details class=\"card answer\"><summary>{}</summary><p>{}</p><span class=\"level\">{}</span></details>\n",
                html_escape(&card.prompt),
                html_escape(&card.answer),
                card.level
            ));
        }
        html.push_str("</section>\n");
    } else {
        let mut number = 0;
        for (level, _) in &realized {
            html.push_str(&format!(
                "<section class=\"level\">\n<h2>{level}</h2>\n<p class=\"meta\">{}</p>\n<ol start=\"{}\">\n",
                html_escape(level.description()),
                number + 1
            ));
            for question in exam.questions_at(*level) {
                number += 1;
                html.push_str(&question_html(question));
            }
            html.push_str("</ol>\n</section>\n");
        }
    }

    // JavaScript for revealing answers
    html.push_str("<script>\n");
    html.push_str(JS);
    html.push_str("</script>\n");

    html.push_str("</body>\n</html>");
    html
}

fn question_html(question: &Question) -> String {
    let mut li = format!(
        "<li id=\"{}\"><p>{}</p>\n",
        html_escape(&question.id),
        html_escape(&question.prompt)
    );
    if !question.choices.is_empty() {
        li.push_str("<ul class=\"choices\">\n");
        for (i, choice) in question.choices.iter().enumerate() {
            li.push_str(&format!(
                "<li><strong>{})</strong> {}</li>\n",
                choice_label(i),
                html_escape(choice)
            ));
        }
        li.push_str("</ul>\n");
    }
    if let Some(hint) = &question.hint {
        li.push_str(&format!("<p class=\"hint\">Hint: {}</p>\n", html_escape(hint)));
    }
    li.push_str(&format!(
        "<details class=\"answer\"><summary>Answer</summary><p>{}</p>",
        html_escape(&question.answer)
    ));
    if let Some(explanation) = &question.explanation {
        li.push_str(&format!(
            "<p class=\"explanation\">{}</p>",
            html_escape(explanation)
        ));
    }
    li.push_str("</details>\n</li>\n");
    li
}

/// Write an HTML page to a file.
pub fn write_html(exam: &Exam, shortfalls: &[Shortfall], path: &Path) -> Result<()> {
    let html = generate_html(exam, shortfalls);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, html)?;
    Ok(())
}

const CSS: &str = r#"
:root { --bg: #fff; --fg: #1a1a1a; --border: #e5e7eb; --ok: #dcfce7; --short: #fef3c7; }
@media (prefers-color-scheme: dark) {
  :root { --bg: #111827; --fg: #f9fafb; --border: #374151; --ok: #064e3b; --short: #78350f; }
}
body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif; margin: 0 auto; max-width: 52rem; padding: 2rem; background: var(--bg); color: var(--fg); }
h1, h2 { margin-top: 2rem; }
.meta { color: #6b7280; }
table { border-collapse: collapse; margin: 1rem 0; }
th, td { border: 1px solid var(--border); padding: 0.4rem 1rem; text-align: left; }
th { background: var(--border); }
.ok { background: var(--ok); }
.short { background: var(--short); }
ol > li { margin: 1.25rem 0; }
.choices { list-style: none; padding-left: 1rem; }
.hint { font-style: italic; color: #6b7280; }
details.answer { margin-top: 0.5rem; }
summary { cursor: pointer; font-weight: bold; }
.cards { display: grid; grid-template-columns: repeat(auto-fill, minmax(16rem, 1fr)); gap: 1rem; }
.card { border: 1px solid var(--border); border-radius: 8px; padding: 1rem; }
.card .level { font-size: 0.75rem; color: #6b7280; }
button { margin: 0.5rem 0; padding: 0.4rem 1rem; cursor: pointer; }
@media print { button, details.answer { display: none; } }
"#;

const JS: &str = r#"
function toggleAnswers() {
  const answers = Array.from(document.querySelectorAll('details.answer'));
  const open = answers.some(d => !d.open);
  answers.forEach(d => { d.open = open; });
}
"#;
