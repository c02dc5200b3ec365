//! Prompt construction for question generation and answer evaluation.
//!
//! Builders are pure: they only format text and never talk to a model.

use std::fmt::Write as _;

use crate::error::StudyError;
use crate::model::{BloomLevel, ContentChunk, Difficulty, Question, QuestionType};

/// Build the prompt asking for `count` questions of `kind` at `level`.
///
/// The source text is embedded verbatim between `<content>` markers.
pub fn build_question_prompt(
    chunk: &ContentChunk,
    level: BloomLevel,
    kind: QuestionType,
    difficulty: Difficulty,
    count: u32,
) -> Result<String, StudyError> {
    if chunk.is_empty() {
        return Err(StudyError::ContentEmpty);
    }
    if count == 0 {
        return Err(StudyError::InvalidCount);
    }

    let mut prompt = String::new();
    let noun = if kind == QuestionType::Flashcard {
        "study flashcards"
    } else {
        "exam practice questions"
    };
    let _ = writeln!(
        prompt,
        "Generate exactly {count} {noun} from the course content below."
    );
    if let Some(topic) = &chunk.topic {
        let _ = writeln!(prompt, "Topic: {topic}");
    }
    prompt.push('\n');

    let _ = writeln!(prompt, "Bloom's Level: {level}");
    let _ = writeln!(
        prompt,
        "Every question must test the {level} level: students {}.",
        level.description()
    );
    let _ = writeln!(
        prompt,
        "Phrase questions with verbs such as: {}.",
        level.verbs().join(", ")
    );
    prompt.push('\n');

    let _ = writeln!(prompt, "Question Type: {}", kind.label());
    prompt.push_str(type_guidance(kind));
    prompt.push('\n');
    let _ = writeln!(prompt, "Difficulty: {difficulty}");
    prompt.push_str(difficulty.guidance());
    prompt.push_str("\n\n");

    prompt.push_str("Content:\n<content>\n");
    prompt.push_str(&chunk.text);
    if !chunk.text.ends_with('\n') {
        prompt.push('\n');
    }
    prompt.push_str("</content>\n\n");

    prompt.push_str("Return JSON:\n");
    prompt.push_str(&response_shape(level, kind));
    prompt.push('\n');

    Ok(prompt)
}

fn type_guidance(kind: QuestionType) -> &'static str {
    match kind {
        QuestionType::MultipleChoice => {
            "Give four options labelled \"A) \" to \"D) \" with exactly one correct option; the answer is the letter of the correct option."
        }
        QuestionType::TrueFalse => {
            "Each question is a statement; options are \"True\" and \"False\" and the answer is one of them."
        }
        QuestionType::ShortAnswer => "Each answer is one to three sentences.",
        QuestionType::FillInTheBlank => {
            "Mark the blank with \"_____\"; the answer is the missing word or phrase."
        }
        QuestionType::Essay => {
            "Each answer is a model answer outline listing the points a strong essay covers."
        }
        QuestionType::Flashcard => {
            "The question is the front of the card (a term or short prompt); the answer is the back (a concise definition or explanation)."
        }
        QuestionType::Mixed => {
            "Mix multiple choice, true/false, short answer and fill-in-the-blank questions and set \"type\" on every question. Give \"options\" only for multiple choice and true/false; for multiple choice the answer is the letter of the correct option."
        }
    }
}

fn response_shape(level: BloomLevel, kind: QuestionType) -> String {
    let type_field = if kind == QuestionType::Mixed {
        "multiple-choice | true-false | short-answer | fill-in-the-blank".to_string()
    } else {
        kind.to_string()
    };
    let options = if kind.has_choices() || kind == QuestionType::Mixed {
        "\n            \"options\": [\"A) option\", \"B) option\", \"C) option\", \"D) option\"],"
    } else {
        ""
    };
    format!(
        r#"{{
    "questions": [
        {{
            "question": "question text",
            "type": "{type_field}",
            "bloom_level": "{level}",{options}
            "answer": "reference answer",
            "explanation": "why this is correct",
            "hint": "helpful hint"
        }}
    ]
}}"#
    )
}

/// Build the prompt asking the model to judge a submitted answer.
pub fn build_evaluation_prompt(question: &Question, submitted_answer: &str) -> String {
    let mut prompt = String::from("Evaluate this student answer.\n\n");
    let _ = writeln!(prompt, "Question: {}", question.prompt);
    if !question.choices.is_empty() {
        let _ = writeln!(prompt, "Options: {}", question.choices.join(" | "));
    }
    let _ = writeln!(prompt, "Bloom's Level: {}", question.level);
    let _ = writeln!(prompt, "Expected Answer: {}", question.answer);
    let _ = writeln!(prompt, "Student's Answer: {submitted_answer}");
    prompt.push_str(
        r#"
Judge whether the student's answer is correct, and explain why.
Accept answers that are equivalent in meaning even if worded differently.

Return JSON:
{
    "is_correct": true,
    "score": 85,
    "feedback": "why the answer is or is not correct",
    "strengths": ["what's good"],
    "improvements": ["what's missing or wrong"],
    "improved_answer": "how to write a better answer"
}
"#,
    );
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk() -> ContentChunk {
        ContentChunk::new(
            "cells",
            "Mitochondria produce ATP through cellular respiration.\nRibosomes build proteins.",
        )
        .with_topic("Cell organelles")
    }

    #[test]
    fn prompt_contains_level_and_excerpt_for_every_level() {
        let chunk = chunk();
        for level in BloomLevel::ALL {
            for kind in QuestionType::ALL {
                let prompt = build_question_prompt(&chunk, level, kind, Difficulty::Medium, 3).unwrap();
                assert!(prompt.contains(&level.to_string()), "{level} missing");
                assert!(prompt.contains(&chunk.text), "excerpt missing for {level}");
                assert!(prompt.contains(kind.label()));
            }
        }
    }

    #[test]
    fn prompt_includes_verbs_topic_and_count() {
        let prompt =
            build_question_prompt(&chunk(), BloomLevel::Create, QuestionType::Essay, Difficulty::Medium, 2).unwrap();
        assert!(prompt.contains("Generate exactly 2 exam practice questions"));
        assert!(prompt.contains("Topic: Cell organelles"));
        assert!(prompt.contains("design"));
        assert!(!prompt.contains("\"options\""));

        let mcq =
            build_question_prompt(
                &chunk(),
                BloomLevel::Remember,
                QuestionType::MultipleChoice,
                Difficulty::Medium,
                1,
            )
            .unwrap();
        assert!(mcq.contains("\"options\""));
    }

    #[test]
    fn prompt_states_difficulty() {
        for difficulty in Difficulty::ALL {
            let prompt =
                build_question_prompt(&chunk(), BloomLevel::Apply, QuestionType::ShortAnswer, difficulty, 2)
                    .unwrap();
            assert!(prompt.contains(&format!("Difficulty: {difficulty}")));
            assert!(prompt.contains(difficulty.guidance()));
        }
        let easy =
            build_question_prompt(&chunk(), BloomLevel::Apply, QuestionType::ShortAnswer, Difficulty::Easy, 2)
                .unwrap();
        assert!(!easy.contains(Difficulty::Hard.guidance()));
    }

    #[test]
    fn mixed_prompt_lets_the_model_pick_types() {
        let prompt =
            build_question_prompt(&chunk(), BloomLevel::Understand, QuestionType::Mixed, Difficulty::Medium, 4)
                .unwrap();
        assert!(prompt.contains("Question Type: Mixed"));
        assert!(prompt.contains("\"type\": \"multiple-choice | true-false | short-answer | fill-in-the-blank\""));
        assert!(prompt.contains("\"options\""));
    }

    #[test]
    fn empty_content_is_rejected() {
        let empty = ContentChunk::new("empty", "  \n\t ");
        let err = build_question_prompt(&empty, BloomLevel::Apply, QuestionType::ShortAnswer, Difficulty::Easy, 3)
            .unwrap_err();
        assert!(matches!(err, StudyError::ContentEmpty));
    }

    #[test]
    fn zero_count_is_rejected() {
        let err = build_question_prompt(&chunk(), BloomLevel::Apply, QuestionType::ShortAnswer, Difficulty::Easy, 0)
            .unwrap_err();
        assert!(matches!(err, StudyError::InvalidCount));
    }

    #[test]
    fn evaluation_prompt_mentions_both_answers() {
        let question = Question {
            id: "q1".into(),
            prompt: "What do mitochondria produce?".into(),
            level: BloomLevel::Remember,
            question_type: QuestionType::ShortAnswer,
            choices: vec![],
            answer: "ATP".into(),
            explanation: None,
            hint: None,
        };
        let prompt = build_evaluation_prompt(&question, "energy");
        assert!(prompt.contains("Expected Answer: ATP"));
        assert!(prompt.contains("Student's Answer: energy"));
        assert!(prompt.contains("is_correct"));
    }
}
