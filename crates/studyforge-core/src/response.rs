//! Parsing of raw model output into questions and evaluation verdicts.
//!
//! Two grammars are understood for questions:
//! - JSON, either fenced in a ```json block or as the outermost `{...}` /
//!   `[...]` span of the reply, holding a `questions` (or `flashcards`) array,
//!   a `sections[].questions` layout, or a bare array;
//! - a line format of `Q:` / `A:` blocks, used when no JSON can be parsed.
//!
//! Entries missing a prompt or an answer are dropped and counted, never fatal.

use serde_json::{Map, Value};

use crate::model::{BloomLevel, EvaluationResult, Judgment, Question, QuestionType};

/// Values applied to entries that do not state them, and the id scheme.
#[derive(Debug, Clone)]
pub struct ParseDefaults {
    pub level: BloomLevel,
    pub question_type: QuestionType,
    /// Question ids are `<id_prefix>-<n>`, n counting kept entries from 1.
    pub id_prefix: String,
}

impl ParseDefaults {
    pub fn new(level: BloomLevel, question_type: QuestionType, id_prefix: impl Into<String>) -> Self {
        Self {
            level,
            question_type,
            id_prefix: id_prefix.into(),
        }
    }
}

/// Questions extracted from one reply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseOutcome {
    pub questions: Vec<Question>,
    /// Entries that were recognised but lacked a prompt or an answer.
    pub dropped: usize,
}

/// Parse a raw model reply into questions.
pub fn parse_questions(raw: &str, defaults: &ParseDefaults) -> ParseOutcome {
    let drafts = match extract_json(raw).and_then(|j| serde_json::from_str::<Value>(&j).ok()) {
        Some(value) => json_drafts(&value),
        None => line_drafts(raw),
    };

    let mut outcome = ParseOutcome::default();
    for draft in drafts {
        match draft.finish(defaults, outcome.questions.len() + 1) {
            Some(question) => outcome.questions.push(question),
            None => outcome.dropped += 1,
        }
    }

    if outcome.dropped > 0 {
        tracing::warn!(
            dropped = outcome.dropped,
            kept = outcome.questions.len(),
            "dropped malformed question entries"
        );
    }
    outcome
}

/// Locate the JSON payload in a model reply.
///
/// Prefers the first fenced block tagged `json` (or an untagged fence whose
/// body starts with `{` / `[`). Otherwise takes the `{..}` and `[..]` spans
/// (first opener to last matching closer) and returns the earliest one that
/// is valid JSON, or the earliest span when neither parses.
pub fn extract_json(raw: &str) -> Option<String> {
    let mut in_block = false;
    let mut is_candidate = false;
    let mut current = String::new();

    for line in raw.lines() {
        let trimmed = line.trim();

        if !in_block && trimmed.starts_with("```") {
            in_block = true;
            let lang = trimmed.trim_start_matches('`').trim().to_lowercase();
            is_candidate = lang == "json" || lang.is_empty();
            current.clear();
            continue;
        }

        if in_block && trimmed == "```" {
            in_block = false;
            if is_candidate && looks_like_json(&current) {
                return Some(current);
            }
            current.clear();
            continue;
        }

        if in_block {
            if !current.is_empty() {
                current.push('\n');
            }
            current.push_str(line);
        }
    }

    // A truncated (unclosed) fence still counts.
    if in_block && is_candidate && looks_like_json(&current) {
        return Some(current);
    }

    // Brackets in surrounding prose must not hide the payload: try the
    // object and array spans in order and keep the first that parses.
    let mut spans: Vec<&str> = [('{', '}'), ('[', ']')]
        .into_iter()
        .filter_map(|(open, close)| {
            let start = raw.find(open)?;
            let end = raw.rfind(close)?;
            (end > start).then(|| &raw[start..=end])
        })
        .collect();
    spans.sort_by_key(|span| span.as_ptr() as usize);

    spans
        .iter()
        .find(|span| serde_json::from_str::<Value>(span).is_ok())
        .or_else(|| spans.first())
        .map(|span| span.to_string())
}

fn looks_like_json(s: &str) -> bool {
    let t = s.trim_start();
    t.starts_with('{') || t.starts_with('[')
}

// ---------------------------------------------------------------------------
// Drafts
// ---------------------------------------------------------------------------

/// A question entry before validation.
#[derive(Debug, Default)]
struct Draft {
    prompt: String,
    answer: String,
    choices: Vec<String>,
    level: Option<String>,
    question_type: Option<String>,
    explanation: Option<String>,
    hint: Option<String>,
}

impl Draft {
    fn finish(self, defaults: &ParseDefaults, n: usize) -> Option<Question> {
        let prompt = self.prompt.trim().to_string();
        let mut answer = self.answer.trim().to_string();
        if prompt.is_empty() || answer.is_empty() {
            return None;
        }

        let level = self
            .level
            .as_deref()
            .and_then(parse_level)
            .unwrap_or(defaults.level);
        let question_type = self
            .question_type
            .as_deref()
            .and_then(|t| t.parse().ok())
            .filter(|t| *t != QuestionType::Mixed)
            .unwrap_or_else(|| match defaults.question_type {
                QuestionType::Mixed => infer_type(&self.choices),
                kind => kind,
            });

        if let Some(choice) = resolve_choice_letter(&answer, &self.choices) {
            answer = choice;
        }

        Some(Question {
            id: format!("{}-{n}", defaults.id_prefix),
            prompt,
            level,
            question_type,
            choices: self.choices,
            answer,
            explanation: non_empty(self.explanation),
            hint: non_empty(self.hint),
        })
    }
}

/// Best guess at the format of an untyped entry in a mixed set.
fn infer_type(choices: &[String]) -> QuestionType {
    let is_true_false = choices.len() == 2
        && choices.iter().any(|c| c.to_lowercase().contains("true"))
        && choices.iter().any(|c| c.to_lowercase().contains("false"));
    if is_true_false {
        QuestionType::TrueFalse
    } else if choices.is_empty() {
        QuestionType::ShortAnswer
    } else {
        QuestionType::MultipleChoice
    }
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Accepts "Apply" as well as decorated labels like "Apply (use knowledge)".
fn parse_level(s: &str) -> Option<BloomLevel> {
    s.parse().ok().or_else(|| {
        s.split(|c: char| !c.is_alphabetic())
            .find(|w| !w.is_empty())
            .and_then(|w| w.parse().ok())
    })
}

/// Map an answer like "B" or "b)" to the matching option text.
fn resolve_choice_letter(answer: &str, choices: &[String]) -> Option<String> {
    let letter = answer.trim_end_matches([')', '.', ':']).trim();
    let mut chars = letter.chars();
    let c = chars.next()?.to_ascii_uppercase();
    if chars.next().is_some() || !c.is_ascii_uppercase() {
        return None;
    }
    let index = (c as u8 - b'A') as usize;
    choices.get(index).cloned()
}

// ---------------------------------------------------------------------------
// JSON grammar
// ---------------------------------------------------------------------------

const PROMPT_KEYS: &[&str] = &["question", "prompt", "front", "text"];
const ANSWER_KEYS: &[&str] = &[
    "answer",
    "correct_answer",
    "answer_key",
    "back",
    "sample_answer",
];
const LIST_KEYS: &[&str] = &["questions", "flashcards", "cards", "items"];

fn json_drafts(value: &Value) -> Vec<Draft> {
    entries(value).into_iter().map(json_draft).collect()
}

fn entries(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().collect(),
        Value::Object(obj) => {
            if let Some(items) = LIST_KEYS
                .iter()
                .find_map(|k| obj.get(*k).and_then(Value::as_array))
            {
                return items.iter().collect();
            }
            if let Some(sections) = obj.get("sections").and_then(Value::as_array) {
                return sections
                    .iter()
                    .filter_map(|s| s.get("questions").and_then(Value::as_array))
                    .flatten()
                    .collect();
            }
            if PROMPT_KEYS.iter().any(|k| obj.contains_key(*k)) {
                return vec![value];
            }
            Vec::new()
        }
        _ => Vec::new(),
    }
}

fn json_draft(value: &Value) -> Draft {
    let Some(obj) = value.as_object() else {
        return Draft::default();
    };
    Draft {
        prompt: first_text(obj, PROMPT_KEYS).unwrap_or_default(),
        answer: first_text(obj, ANSWER_KEYS).unwrap_or_default(),
        choices: ["options", "choices"]
            .iter()
            .find_map(|k| obj.get(*k).and_then(Value::as_array))
            .map(|items| {
                items
                    .iter()
                    .filter_map(scalar_text)
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default(),
        level: first_text(obj, &["bloom_level", "level"]),
        question_type: first_text(obj, &["type", "question_type"]),
        explanation: first_text(obj, &["explanation"]),
        hint: first_text(obj, &["hint"]),
    }
}

fn first_text(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| obj.get(*k).and_then(scalar_text))
        .find(|s| !s.is_empty())
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Bool(true) => Some("True".to_string()),
        Value::Bool(false) => Some("False".to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Line grammar
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, PartialEq)]
enum Field {
    Prompt,
    Answer,
    Explanation,
    Hint,
}

fn line_drafts(raw: &str) -> Vec<Draft> {
    let mut drafts: Vec<Draft> = Vec::new();
    let mut field = Field::Prompt;

    for line in raw.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if let Some(rest) = labelled(trimmed, &["question", "q"]) {
            drafts.push(Draft {
                prompt: rest.to_string(),
                ..Draft::default()
            });
            field = Field::Prompt;
            continue;
        }
        if let Some(rest) = labelled(trimmed, &["answer", "a"]) {
            if drafts.is_empty() {
                // An answer with no question still counts as a malformed entry.
                drafts.push(Draft::default());
            }
            if let Some(d) = drafts.last_mut() {
                d.answer = rest.to_string();
            }
            field = Field::Answer;
            continue;
        }

        let Some(draft) = drafts.last_mut() else {
            continue;
        };

        if let Some(rest) = labelled(trimmed, &["bloom's level", "bloom level", "level"]) {
            draft.level = Some(rest.to_string());
        } else if let Some(rest) = labelled(trimmed, &["type"]) {
            draft.question_type = Some(rest.to_string());
        } else if let Some(rest) = labelled(trimmed, &["explanation"]) {
            draft.explanation = Some(rest.to_string());
            field = Field::Explanation;
        } else if let Some(rest) = labelled(trimmed, &["hint"]) {
            draft.hint = Some(rest.to_string());
            field = Field::Hint;
        } else if field == Field::Prompt && is_choice_line(trimmed) {
            draft.choices.push(trimmed.trim_start_matches(['-', '*', ' ']).to_string());
        } else {
            let target = match field {
                Field::Prompt => &mut draft.prompt,
                Field::Answer => &mut draft.answer,
                Field::Explanation => draft.explanation.get_or_insert_with(String::new),
                Field::Hint => draft.hint.get_or_insert_with(String::new),
            };
            if !target.is_empty() {
                target.push(' ');
            }
            target.push_str(trimmed);
        }
    }

    drafts
}

/// Match `label[ digits]:` case-insensitively, after optional list numbering
/// and Markdown emphasis, returning the text after the colon.
fn labelled<'a>(line: &'a str, labels: &[&str]) -> Option<&'a str> {
    let line = line
        .trim_start_matches(|c: char| c.is_ascii_digit())
        .trim_start_matches(['.', ')'])
        .trim_start()
        .trim_start_matches(['*', '#'])
        .trim_start();
    for label in labels {
        let Some(head) = line.get(..label.len()) else {
            continue;
        };
        if !head.eq_ignore_ascii_case(label) {
            continue;
        }
        let rest = line[label.len()..].trim_start_matches(|c: char| c.is_ascii_digit() || c == ' ');
        if let Some(value) = rest.strip_prefix(':') {
            return Some(value.trim_start_matches('*').trim());
        }
    }
    None
}

fn is_choice_line(line: &str) -> bool {
    let mut chars = line.chars();
    match (chars.next(), chars.next()) {
        (Some(c), Some(')' | '.')) if c.is_ascii_alphabetic() && c.to_ascii_uppercase() <= 'H' => {
            true
        }
        (Some('-' | '*'), Some(' ')) => true,
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// Evaluation verdicts
// ---------------------------------------------------------------------------

/// Interpret the model's reply to an evaluation prompt.
///
/// The verdict is whatever the model asserts; if it asserts nothing
/// recognisable the judgment is [`Judgment::Undetermined`].
pub fn parse_evaluation(raw: &str, question_id: &str, submitted_answer: &str) -> EvaluationResult {
    let mut result = EvaluationResult {
        question_id: question_id.to_string(),
        submitted_answer: submitted_answer.to_string(),
        judgment: Judgment::Undetermined,
        score: None,
        feedback: raw.trim().to_string(),
        strengths: vec![],
        improvements: vec![],
        improved_answer: None,
    };

    let parsed = extract_json(raw)
        .and_then(|j| serde_json::from_str::<Value>(&j).ok())
        .and_then(|v| match v {
            Value::Object(obj) => Some(obj),
            _ => None,
        });

    let Some(obj) = parsed else {
        result.judgment = text_verdict(raw);
        return result;
    };

    // Accept both flat replies and `{"evaluation": {...}, "feedback": {...}}`.
    let verdict_obj = obj
        .get("evaluation")
        .and_then(Value::as_object)
        .unwrap_or(&obj);

    result.judgment = ["is_correct", "correct"]
        .iter()
        .find_map(|k| verdict_obj.get(*k).or_else(|| obj.get(*k)))
        .and_then(value_verdict)
        .unwrap_or(Judgment::Undetermined);
    result.score = verdict_obj
        .get("score")
        .or_else(|| obj.get("score"))
        .and_then(Value::as_f64)
        .map(|s| s.clamp(0.0, 100.0).round() as u8);

    match obj.get("feedback") {
        Some(Value::String(text)) => result.feedback = text.trim().to_string(),
        Some(Value::Object(fb)) => {
            result.strengths = string_list(fb.get("strengths"));
            result.improvements = string_list(fb.get("weaknesses"));
            result
                .improvements
                .extend(string_list(fb.get("specific_corrections")));
            if let Some(text) = first_text(fb, &["summary", "comment"])
                .or_else(|| first_text(&obj, &["explanation", "encouragement"]))
            {
                result.feedback = text;
            }
        }
        _ => {
            if let Some(text) = first_text(&obj, &["explanation", "reason", "reasoning"]) {
                result.feedback = text;
            }
        }
    }
    if result.strengths.is_empty() {
        result.strengths = string_list(obj.get("strengths"));
    }
    if result.improvements.is_empty() {
        result.improvements = string_list(obj.get("improvements").or_else(|| obj.get("weaknesses")));
    }
    result.improved_answer = first_text(&obj, &["improved_answer"]);

    result
}

fn value_verdict(value: &Value) -> Option<Judgment> {
    match value {
        Value::Bool(true) => Some(Judgment::Correct),
        Value::Bool(false) => Some(Judgment::Incorrect),
        Value::String(s) => match text_verdict(s) {
            Judgment::Undetermined => None,
            j => Some(j),
        },
        _ => None,
    }
}

fn text_verdict(text: &str) -> Judgment {
    let lower = text
        .trim_start_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase();
    const INCORRECT: &[&str] = &[
        "partially correct",
        "partly correct",
        "incorrect",
        "not correct",
        "wrong",
        "false",
        "no",
    ];
    const CORRECT: &[&str] = &["correct", "true", "yes", "right"];

    let starts_with_word = |w: &str| {
        lower.starts_with(w)
            && lower[w.len()..]
                .chars()
                .next()
                .map_or(true, |c| !c.is_alphanumeric())
    };
    if INCORRECT.iter().copied().any(starts_with_word) {
        Judgment::Incorrect
    } else if CORRECT.iter().copied().any(starts_with_word) {
        Judgment::Correct
    } else {
        Judgment::Undetermined
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(scalar_text)
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> ParseDefaults {
        ParseDefaults::new(BloomLevel::Remember, QuestionType::ShortAnswer, "cells-remember")
    }

    const WELL_FORMED: &str = r#"Here are your questions:

```json
{
    "questions": [
        {
            "question": "What do mitochondria produce?",
            "type": "short-answer",
            "bloom_level": "Remember",
            "answer": "ATP",
            "explanation": "Cellular respiration yields ATP.",
            "hint": "Think energy currency."
        },
        {
            "question": "Which organelle builds proteins?",
            "bloom_level": "Remember",
            "answer": "The ribosome"
        }
    ]
}
```
"#;

    #[test]
    fn parses_fenced_json() {
        let outcome = parse_questions(WELL_FORMED, &defaults());
        assert_eq!(outcome.dropped, 0);
        assert_eq!(outcome.questions.len(), 2);
        let q = &outcome.questions[0];
        assert_eq!(q.id, "cells-remember-1");
        assert_eq!(q.answer, "ATP");
        assert_eq!(q.level, BloomLevel::Remember);
        assert_eq!(q.hint.as_deref(), Some("Think energy currency."));
        assert_eq!(outcome.questions[1].id, "cells-remember-2");
    }

    #[test]
    fn parsing_is_idempotent() {
        let first = parse_questions(WELL_FORMED, &defaults());
        let second = parse_questions(WELL_FORMED, &defaults());
        assert_eq!(first, second);
    }

    #[test]
    fn missing_answer_is_dropped_and_counted() {
        let raw = r#"{"questions": [
            {"question": "Define osmosis.", "answer": "Diffusion of water across a membrane."},
            {"question": "Define diffusion."},
            {"question": "Name the powerhouse of the cell.", "answer": "Mitochondrion"}
        ]}"#;
        let outcome = parse_questions(raw, &defaults());
        assert_eq!(outcome.questions.len(), 2);
        assert_eq!(outcome.dropped, 1);
        // Ids count kept entries only.
        assert_eq!(outcome.questions[1].id, "cells-remember-2");
    }

    #[test]
    fn non_object_entries_and_blank_prompts_are_dropped() {
        let raw = r#"[ "just a string", {"question": "  ", "answer": "x"}, {"front": "ATP", "back": "Energy carrier"} ]"#;
        let outcome = parse_questions(raw, &defaults());
        assert_eq!(outcome.questions.len(), 1);
        assert_eq!(outcome.dropped, 2);
        assert_eq!(outcome.questions[0].prompt, "ATP");
        assert_eq!(outcome.questions[0].answer, "Energy carrier");
    }

    #[test]
    fn unfenced_json_with_surrounding_chatter() {
        let raw = "Sure! {\"questions\": [{\"question\": \"Q?\", \"answer\": \"A\"}]} Hope this helps.";
        let outcome = parse_questions(raw, &defaults());
        assert_eq!(outcome.questions.len(), 1);
    }

    #[test]
    fn unknown_level_falls_back_to_default() {
        let raw = r#"[{"question": "Q?", "answer": "A", "bloom_level": "Memorize"},
                      {"question": "Q2?", "answer": "B", "bloom_level": "Apply (use knowledge)"}]"#;
        let outcome = parse_questions(raw, &defaults());
        assert_eq!(outcome.questions[0].level, BloomLevel::Remember);
        assert_eq!(outcome.questions[1].level, BloomLevel::Apply);
    }

    #[test]
    fn multiple_choice_letter_resolves_to_option() {
        let raw = r#"{"questions": [{
            "question": "Which organelle produces ATP?",
            "type": "multiple-choice",
            "options": ["A) Ribosome", "B) Mitochondrion", "C) Nucleus", "D) Golgi"],
            "correct_answer": "B"
        }]}"#;
        let d = ParseDefaults::new(BloomLevel::Remember, QuestionType::MultipleChoice, "mc");
        let outcome = parse_questions(raw, &d);
        let q = &outcome.questions[0];
        assert_eq!(q.choices.len(), 4);
        assert_eq!(q.answer, "B) Mitochondrion");
        assert_eq!(q.question_type, QuestionType::MultipleChoice);
    }

    #[test]
    fn practice_exam_sections_are_flattened() {
        let raw = r#"{"sections": [
            {"section": "A", "questions": [{"question": "One?", "answer": "1"}]},
            {"section": "B", "questions": [{"question": "Two?", "answer": "2"}, {"question": "Three?"}]}
        ]}"#;
        let outcome = parse_questions(raw, &defaults());
        assert_eq!(outcome.questions.len(), 2);
        assert_eq!(outcome.dropped, 1);
    }

    #[test]
    fn boolean_answers_become_text() {
        let raw = r#"[{"question": "ATP stores energy.", "answer": true}]"#;
        let outcome = parse_questions(raw, &defaults());
        assert_eq!(outcome.questions[0].answer, "True");
    }

    #[test]
    fn line_grammar_fallback() {
        let raw = "\
Here you go.

Q1: What do mitochondria produce?
A: ATP
Level: Remember

Question 2: Which organelle
builds proteins?
A) Nucleus
B) Ribosome
Answer: B
Explanation: Ribosomes translate mRNA.

Q3: Name one function of the nucleus.
";
        let outcome = parse_questions(raw, &defaults());
        assert_eq!(outcome.questions.len(), 2);
        assert_eq!(outcome.dropped, 1);
        let q2 = &outcome.questions[1];
        assert_eq!(q2.prompt, "Which organelle builds proteins?");
        assert_eq!(q2.choices, vec!["A) Nucleus", "B) Ribosome"]);
        assert_eq!(q2.answer, "B) Ribosome");
        assert_eq!(q2.explanation.as_deref(), Some("Ribosomes translate mRNA."));
    }

    #[test]
    fn garbage_yields_nothing() {
        let outcome = parse_questions("I cannot help with that.", &defaults());
        assert!(outcome.questions.is_empty());
        assert_eq!(outcome.dropped, 0);
    }

    #[test]
    fn mixed_sets_infer_untyped_entries() {
        let raw = r#"{"questions": [
            {"question": "Which organelle makes ATP?", "options": ["A) Nucleus", "B) Mitochondrion"], "answer": "B"},
            {"question": "Ribosomes build lipids.", "options": ["True", "False"], "answer": "False"},
            {"question": "Name the cell's power plant.", "answer": "Mitochondrion"},
            {"question": "Cells store energy as _____.", "type": "fill-in-the-blank", "answer": "ATP"}
        ]}"#;
        let d = ParseDefaults::new(BloomLevel::Remember, QuestionType::Mixed, "mix");
        let kinds: Vec<QuestionType> = parse_questions(raw, &d)
            .questions
            .iter()
            .map(|q| q.question_type)
            .collect();
        assert_eq!(
            kinds,
            vec![
                QuestionType::MultipleChoice,
                QuestionType::TrueFalse,
                QuestionType::ShortAnswer,
                QuestionType::FillInTheBlank,
            ]
        );
    }

    #[test]
    fn bracketed_prose_before_the_object() {
        let raw = "Here are 2 questions [Remember level]:\n{\"questions\": [\
            {\"question\": \"What do mitochondria produce?\", \"answer\": \"ATP\"},\
            {\"question\": \"Which organelle builds proteins?\", \"answer\": \"The ribosome\"}]}\n\
            Let me know if you need more [or fewer].";
        let json = extract_json(raw).unwrap();
        assert!(json.starts_with("{\"questions\""));

        let outcome = parse_questions(raw, &defaults());
        assert_eq!(outcome.questions.len(), 2);
        assert_eq!(outcome.dropped, 0);
        assert_eq!(outcome.questions[0].answer, "ATP");
    }

    #[test]
    fn bare_array_after_braced_prose() {
        let raw = "Sure {here you go}: [{\"question\": \"Q\", \"answer\": \"A\"}]";
        assert_eq!(
            extract_json(raw).as_deref(),
            Some("[{\"question\": \"Q\", \"answer\": \"A\"}]")
        );
    }

    #[test]
    fn extract_json_prefers_json_fence() {
        let raw = "```python\nprint('{x}')\n```\n```json\n{\"a\": 1}\n```";
        assert_eq!(extract_json(raw).as_deref(), Some("{\"a\": 1}"));
        assert_eq!(extract_json("no json here"), None);
        assert_eq!(
            extract_json("```json\n[1, 2]").as_deref(),
            Some("[1, 2]"),
            "unclosed fence should still be used"
        );
    }

    #[test]
    fn evaluation_json_verdict() {
        let raw = r#"```json
{"is_correct": false, "score": 40, "feedback": "ATP, not glucose.",
 "strengths": ["mentions energy"], "improvements": ["name the molecule"],
 "improved_answer": "Mitochondria produce ATP."}
```"#;
        let result = parse_evaluation(raw, "q1", "glucose");
        assert_eq!(result.judgment, Judgment::Incorrect);
        assert_eq!(result.score, Some(40));
        assert_eq!(result.feedback, "ATP, not glucose.");
        assert_eq!(result.strengths, vec!["mentions energy"]);
        assert_eq!(result.improvements, vec!["name the molecule"]);
        assert_eq!(result.question_id, "q1");
        assert_eq!(result.submitted_answer, "glucose");
    }

    #[test]
    fn evaluation_nested_shape() {
        let raw = r#"{"evaluation": {"is_correct": true, "score": 95, "max_score": 100},
            "feedback": {"strengths": ["precise"], "weaknesses": [], "specific_corrections": ["cite the source"]},
            "encouragement": "Great work!"}"#;
        let result = parse_evaluation(raw, "q2", "ATP");
        assert!(result.is_correct());
        assert_eq!(result.score, Some(95));
        assert_eq!(result.improvements, vec!["cite the source"]);
        assert_eq!(result.feedback, "Great work!");
    }

    #[test]
    fn evaluation_text_verdicts() {
        assert_eq!(parse_evaluation("Correct. Well done.", "q", "a").judgment, Judgment::Correct);
        assert_eq!(
            parse_evaluation("Incorrect: the answer is ATP.", "q", "a").judgment,
            Judgment::Incorrect
        );
        assert_eq!(
            parse_evaluation("Partially correct, but vague.", "q", "a").judgment,
            Judgment::Incorrect
        );
        assert_eq!(parse_evaluation("**Yes** - right.", "q", "a").judgment, Judgment::Correct);
        let unclear = parse_evaluation("Nothing to say", "q", "a");
        assert_eq!(unclear.judgment, Judgment::Undetermined);
        assert_eq!(unclear.feedback, "Nothing to say");
    }

    #[test]
    fn evaluation_without_verdict_field_is_undetermined() {
        let result = parse_evaluation(r#"{"score": 90, "feedback": "fine"}"#, "q", "a");
        assert_eq!(result.judgment, Judgment::Undetermined);
        assert_eq!(result.score, Some(90));
    }
}
