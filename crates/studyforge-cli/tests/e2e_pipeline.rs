//! End-to-end pipeline tests: content → assembler → export → evaluator,
//! driven by the mock provider.

use std::sync::Arc;
use std::time::Duration;

use studyforge_core::assembler::{AssemblerConfig, ExamAssembler, ExamRequest, NoopReporter};
use studyforge_core::client::{ClientSettings, GenerationClient};
use studyforge_core::content::chunk_document;
use studyforge_core::error::StudyError;
use studyforge_core::evaluator::Evaluator;
use studyforge_core::model::{
    parse_distribution, BloomLevel, ContentChunk, Difficulty, Exam, Judgment, QuestionType,
};
use studyforge_core::traits::LlmProvider;
use studyforge_providers::mock::MockProvider;
use studyforge_providers::ProviderError;
use studyforge_report::{write_exam, OutputFormat};

const REMEMBER: &str = r#"{"questions": [
  {"question": "What do mitochondria produce?", "answer": "ATP", "level": "remember"},
  {"question": "Which organelle holds DNA?", "answer": "The nucleus", "level": "remember"},
  {"question": "What encloses the cell?", "answer": "The cell membrane", "level": "remember"}
]}"#;

const APPLY: &str = r#"```json
{"questions": [
  {"question": "A cell's ribosomes stop working. What fails first?", "answer": "Protein synthesis", "level": "apply"},
  {"question": "Predict the effect of a leaky membrane.", "answer": "Loss of ion gradients", "level": "apply"}
]}
```"#;

fn notes() -> Vec<ContentChunk> {
    chunk_document(
        "cells",
        "# Cells\n\nMitochondria produce ATP. The nucleus holds DNA.\n\nRibosomes build proteins.",
        6000,
    )
}

fn config() -> AssemblerConfig {
    AssemblerConfig {
        parallelism: 2,
        max_attempts_per_level: 3,
        request_timeout: Duration::from_secs(5),
        max_retries: 1,
        retry_delay: Duration::from_millis(1),
    }
}

fn client(mock: &Arc<MockProvider>) -> GenerationClient {
    let provider: Arc<dyn LlmProvider> = mock.clone();
    GenerationClient::new(provider, ClientSettings::new("mock-model"))
}

#[tokio::test]
async fn exam_follows_distribution_and_exports() {
    let mock = Arc::new(MockProvider::new([
        ("Bloom's Level: Remember", REMEMBER),
        ("Bloom's Level: Apply", APPLY),
    ]));
    let assembler = ExamAssembler::new(client(&mock), config());
    let request = ExamRequest::new(
        "Cell Biology",
        QuestionType::ShortAnswer,
        parse_distribution("remember=3,apply=2").unwrap(),
    );

    let assembly = assembler
        .assemble(&request, &notes(), &NoopReporter)
        .await
        .unwrap();

    assert!(assembly.is_complete());
    assert_eq!(mock.call_count(), 2);
    let levels: Vec<BloomLevel> = assembly.exam.questions.iter().map(|q| q.level).collect();
    assert_eq!(
        levels,
        vec![
            BloomLevel::Remember,
            BloomLevel::Remember,
            BloomLevel::Remember,
            BloomLevel::Apply,
            BloomLevel::Apply,
        ]
    );

    let dir = tempfile::tempdir().unwrap();
    let written = write_exam(&assembly.exam, &[], dir.path(), &OutputFormat::ALL).unwrap();
    assert_eq!(written.len(), 4);

    let reloaded = Exam::load_json(&dir.path().join("cell-biology.json")).unwrap();
    assert_eq!(reloaded.questions.len(), 5);
    assert_eq!(reloaded.requested, assembly.exam.requested);
    assert_eq!(reloaded.difficulty, Difficulty::Medium);
}

#[tokio::test]
async fn shortfall_still_returns_partial_exam() {
    let one = r#"{"questions": [{"question": "What is ATP?", "answer": "Energy currency"}]}"#;
    let mock = Arc::new(MockProvider::with_fixed_response(one));
    let assembler = ExamAssembler::new(client(&mock), config());
    let request = ExamRequest::new(
        "Short",
        QuestionType::ShortAnswer,
        parse_distribution("remember=4").unwrap(),
    );

    let assembly = assembler
        .assemble(&request, &notes(), &NoopReporter)
        .await
        .unwrap();

    assert!(!assembly.is_complete());
    assert_eq!(assembly.exam.questions.len(), 1);
    assert_eq!(assembly.shortfalls.len(), 1);
    assert_eq!(assembly.shortfalls[0].deficit(), 3);
    assert_eq!(assembly.duplicates, 2);
    assert_eq!(mock.call_count(), 3);
}

#[tokio::test]
async fn malformed_entries_are_dropped() {
    let reply = r#"{"questions": [
      {"question": "What do mitochondria produce?", "answer": "ATP"},
      {"question": "Which organelle holds DNA?"},
      {"question": "What builds proteins?", "answer": "Ribosomes"}
    ]}"#;
    let mock = Arc::new(MockProvider::with_fixed_response(reply));
    let assembler = ExamAssembler::new(client(&mock), config());

    let chunks = notes();
    let outcome = assembler
        .generate(&chunks[0], BloomLevel::Remember, QuestionType::ShortAnswer, Difficulty::Medium, 3)
        .await
        .unwrap();

    assert_eq!(outcome.questions.len(), 2);
    assert_eq!(outcome.dropped, 1);
    assert!(outcome.questions.iter().all(|q| q.id.starts_with("cells-remember")));
}

#[tokio::test]
async fn empty_content_never_calls_the_model() {
    let mock = Arc::new(MockProvider::with_fixed_response(REMEMBER));
    let assembler = ExamAssembler::new(client(&mock), config());
    let request = ExamRequest::new(
        "Nothing",
        QuestionType::ShortAnswer,
        parse_distribution("remember=2").unwrap(),
    );

    let chunks = chunk_document("blank", "   \n\n  ", 6000);
    let err = assembler
        .assemble(&request, &chunks, &NoopReporter)
        .await
        .unwrap_err();

    assert!(matches!(err, StudyError::ContentEmpty));
    assert_eq!(mock.call_count(), 0);
}

#[tokio::test]
async fn unreachable_service_fails_the_whole_exam() {
    let mock = Arc::new(MockProvider::failing(|| {
        ProviderError::NetworkError("connection refused".into())
    }));
    let assembler = ExamAssembler::new(client(&mock), config());
    let request = ExamRequest::new(
        "Offline",
        QuestionType::ShortAnswer,
        parse_distribution("remember=1,apply=1").unwrap(),
    );

    let err = assembler
        .assemble(&request, &notes(), &NoopReporter)
        .await
        .unwrap_err();

    assert!(err.is_service_failure());
    assert!(err.to_string().contains("connection refused"));
}

#[tokio::test]
async fn evaluator_judges_answers_in_order() {
    let mock = Arc::new(MockProvider::new([
        (
            "Student's Answer: ATP",
            r#"{"is_correct": true, "score": 100, "feedback": "Exactly."}"#,
        ),
        (
            "Student's Answer: glucose",
            r#"{"is_correct": false, "score": 10, "feedback": "Glucose is the input."}"#,
        ),
    ]));
    let gen_mock = Arc::new(MockProvider::with_fixed_response(REMEMBER));
    let assembler = ExamAssembler::new(client(&gen_mock), config());
    let outcome = assembler
        .generate(&notes()[0], BloomLevel::Remember, QuestionType::ShortAnswer, Difficulty::Easy, 1)
        .await
        .unwrap();
    let question = outcome.questions[0].clone();

    let evaluator = Evaluator::new(client(&mock), Duration::from_secs(5));
    let results = evaluator
        .evaluate_many(&[
            (question.clone(), "ATP".to_string()),
            (question.clone(), "glucose".to_string()),
            (question, "no idea".to_string()),
        ])
        .await;

    let judgments: Vec<Judgment> = results
        .into_iter()
        .map(|r| r.unwrap().judgment)
        .collect();
    assert_eq!(
        judgments,
        vec![Judgment::Correct, Judgment::Incorrect, Judgment::Undetermined]
    );
}
