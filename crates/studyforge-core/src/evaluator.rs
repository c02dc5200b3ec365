//! Answer evaluation.
//!
//! Grading is delegated entirely to the model; this module only builds the
//! prompt, applies the deadline and interprets the reply.

use std::time::Duration;

use futures::stream::{self, StreamExt};
use tracing::debug;

use crate::client::{with_timeout, GenerationClient};
use crate::error::StudyError;
use crate::model::{EvaluationResult, Question};
use crate::prompt::build_evaluation_prompt;
use crate::response::parse_evaluation;

/// Judges submitted answers against reference answers.
pub struct Evaluator {
    client: GenerationClient,
    timeout: Duration,
    parallelism: usize,
}

impl Evaluator {
    pub fn new(client: GenerationClient, timeout: Duration) -> Self {
        Self {
            client,
            timeout,
            parallelism: 4,
        }
    }

    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism.max(1);
        self
    }

    /// Ask the model whether `submitted` answers `question`.
    pub async fn evaluate(
        &self,
        question: &Question,
        submitted: &str,
    ) -> Result<EvaluationResult, StudyError> {
        let prompt = build_evaluation_prompt(question, submitted);
        let completion = with_timeout(self.timeout, self.client.complete(&prompt)).await?;
        let result = parse_evaluation(&completion.text, &question.id, submitted);
        debug!(question = %question.id, judgment = %result.judgment, "evaluated answer");
        Ok(result)
    }

    /// Evaluate several answers concurrently. Results are in input order.
    pub async fn evaluate_many(
        &self,
        answers: &[(Question, String)],
    ) -> Vec<Result<EvaluationResult, StudyError>> {
        stream::iter(answers)
            .map(|(question, submitted)| self.evaluate(question, submitted))
            .buffered(self.parallelism)
            .collect()
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::client::testing::ScriptedProvider;
    use crate::client::ClientSettings;
    use crate::error::ProviderError;
    use crate::model::{BloomLevel, Judgment, QuestionType};

    fn question(id: &str, prompt: &str, answer: &str) -> Question {
        Question {
            id: id.into(),
            prompt: prompt.into(),
            level: BloomLevel::Understand,
            question_type: QuestionType::ShortAnswer,
            choices: vec![],
            answer: answer.into(),
            explanation: None,
            hint: None,
        }
    }

    fn evaluator(provider: Arc<ScriptedProvider>) -> Evaluator {
        Evaluator::new(
            GenerationClient::new(provider, ClientSettings::default()),
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn verdict_comes_from_the_model() {
        let provider = Arc::new(ScriptedProvider::new().fallback(
            r#"{"is_correct": true, "score": 90, "feedback": "Accurate.", "strengths": ["precise"]}"#,
        ));
        let q = question("q1", "Why do cells need ATP?", "To power cellular work.");

        let result = evaluator(provider.clone())
            .evaluate(&q, "It is their energy source")
            .await
            .unwrap();
        assert_eq!(result.judgment, Judgment::Correct);
        assert_eq!(result.score, Some(90));
        assert_eq!(result.question_id, "q1");
        assert_eq!(result.submitted_answer, "It is their energy source");
        assert_eq!(result.strengths, vec!["precise".to_string()]);
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn unreadable_reply_is_undetermined() {
        let provider = Arc::new(ScriptedProvider::new().fallback("Hmm, hard to say."));
        let q = question("q1", "Define osmosis.", "Diffusion of water across a membrane.");

        let result = evaluator(provider).evaluate(&q, "water moves").await.unwrap();
        assert_eq!(result.judgment, Judgment::Undetermined);
        assert_eq!(result.feedback, "Hmm, hard to say.");
    }

    #[tokio::test]
    async fn service_failure_surfaces() {
        let provider = Arc::new(
            ScriptedProvider::new()
                .fallback("unused")
                .fail_first(ProviderError::NetworkError("connection refused".into())),
        );
        let q = question("q1", "Define osmosis.", "Diffusion of water.");

        let err = evaluator(provider).evaluate(&q, "water").await.unwrap_err();
        assert!(err.is_service_failure());
    }

    #[tokio::test]
    async fn evaluate_many_keeps_input_order() {
        let provider = Arc::new(
            ScriptedProvider::new()
                .reply("Student's Answer: right", r#"{"is_correct": true}"#)
                .reply("Student's Answer: wrong", r#"{"is_correct": false}"#),
        );
        let answers = vec![
            (question("a", "First?", "yes"), "wrong".to_string()),
            (question("b", "Second?", "yes"), "right".to_string()),
            (question("c", "Third?", "yes"), "wrong".to_string()),
        ];

        let results = evaluator(provider)
            .with_parallelism(2)
            .evaluate_many(&answers)
            .await;
        let verdicts: Vec<(String, Judgment)> = results
            .into_iter()
            .map(|r| r.unwrap())
            .map(|r| (r.question_id, r.judgment))
            .collect();
        assert_eq!(
            verdicts,
            vec![
                ("a".to_string(), Judgment::Incorrect),
                ("b".to_string(), Judgment::Correct),
                ("c".to_string(), Judgment::Incorrect),
            ]
        );
    }
}
