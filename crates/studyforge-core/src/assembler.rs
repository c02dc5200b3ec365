//! Exam assembler.
//!
//! Drives prompt building, model calls and parsing for every requested Bloom
//! level, with bounded parallelism, retries and a per-level attempt budget.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;
use tracing::{info, warn};
use uuid::Uuid;

use crate::client::{with_timeout, Completion, GenerationClient};
use crate::error::StudyError;
use crate::model::{
    BloomLevel, ContentChunk, Difficulty, Distribution, Exam, Question, QuestionType, Shortfall,
};
use crate::prompt::build_question_prompt;
use crate::response::{parse_questions, ParseDefaults, ParseOutcome};
use crate::traits::TokenUsage;

/// Configuration for the exam assembler.
#[derive(Debug, Clone)]
pub struct AssemblerConfig {
    /// Maximum levels generated concurrently.
    pub parallelism: usize,
    /// Model calls allowed per level before a shortfall is reported.
    pub max_attempts_per_level: u32,
    /// Deadline for a single model call.
    pub request_timeout: Duration,
    /// Retries on transient service errors, per call.
    pub max_retries: u32,
    /// Initial delay between retries; doubles up to a minute.
    pub retry_delay: Duration,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            parallelism: 4,
            max_attempts_per_level: 3,
            request_timeout: Duration::from_secs(300),
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
        }
    }
}

/// What to assemble.
#[derive(Debug, Clone)]
pub struct ExamRequest {
    pub title: String,
    pub question_type: QuestionType,
    pub difficulty: Difficulty,
    pub distribution: Distribution,
}

impl ExamRequest {
    pub fn new(title: impl Into<String>, question_type: QuestionType, distribution: Distribution) -> Self {
        Self {
            title: title.into(),
            question_type,
            difficulty: Difficulty::default(),
            distribution,
        }
    }

    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = difficulty;
        self
    }

    /// A flashcard deck of `count` cards at a single level.
    pub fn flashcards(title: impl Into<String>, level: BloomLevel, count: u32) -> Self {
        Self::new(
            title,
            QuestionType::Flashcard,
            Distribution::from([(level, count)]),
        )
    }
}

/// An assembled exam plus what it took to build it.
#[derive(Debug, Clone)]
pub struct Assembly {
    pub exam: Exam,
    /// Levels that ended with fewer questions than requested.
    pub shortfalls: Vec<Shortfall>,
    /// Entries the parser rejected for a missing prompt or answer.
    pub dropped_entries: usize,
    /// Questions discarded for targeting another level.
    pub off_level: usize,
    /// Questions discarded for repeating an earlier prompt.
    pub duplicates: usize,
    /// Model calls made, retries excluded.
    pub attempts: u32,
    pub token_usage: TokenUsage,
    pub duration_ms: u64,
}

impl Assembly {
    pub fn is_complete(&self) -> bool {
        self.shortfalls.is_empty()
    }
}

/// Progress reporting trait.
pub trait ProgressReporter: Send + Sync {
    fn on_level_start(&self, level: BloomLevel, requested: u32);
    fn on_retry(&self, level: BloomLevel, retry: u32, error: &str);
    fn on_level_complete(&self, level: BloomLevel, realized: u32, requested: u32);
    fn on_shortfall(&self, shortfall: &Shortfall);
}

/// No-op progress reporter.
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn on_level_start(&self, _: BloomLevel, _: u32) {}
    fn on_retry(&self, _: BloomLevel, _: u32, _: &str) {}
    fn on_level_complete(&self, _: BloomLevel, _: u32, _: u32) {}
    fn on_shortfall(&self, _: &Shortfall) {}
}

/// Questions gathered for one level.
#[derive(Debug, Default)]
struct LevelOutcome {
    questions: Vec<Question>,
    dropped: usize,
    off_level: usize,
    duplicates: usize,
    attempts: u32,
    token_usage: TokenUsage,
}

/// Builds exams from course content.
pub struct ExamAssembler {
    client: GenerationClient,
    config: AssemblerConfig,
}

impl ExamAssembler {
    pub fn new(client: GenerationClient, config: AssemblerConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &AssemblerConfig {
        &self.config
    }

    /// Assemble an exam matching `request.distribution` as closely as the
    /// model allows.
    ///
    /// Any service failure aborts the whole request; a level that runs out of
    /// attempts is reported as a [`Shortfall`] instead.
    pub async fn assemble(
        &self,
        request: &ExamRequest,
        chunks: &[ContentChunk],
        progress: &dyn ProgressReporter,
    ) -> Result<Assembly, StudyError> {
        let start = Instant::now();

        let usable: Vec<&ContentChunk> = chunks.iter().filter(|c| !c.is_empty()).collect();
        if usable.is_empty() {
            return Err(StudyError::ContentEmpty);
        }
        if request.distribution.values().all(|&n| n == 0) {
            return Err(StudyError::InvalidCount);
        }
        if usable.len() < chunks.len() {
            warn!(skipped = chunks.len() - usable.len(), "skipping empty content chunks");
        }

        let semaphore = Arc::new(Semaphore::new(self.config.parallelism.max(1)));
        let mut futures = FuturesUnordered::new();

        for (index, (&level, &requested)) in request.distribution.iter().enumerate() {
            if requested == 0 {
                continue;
            }
            let semaphore = Arc::clone(&semaphore);
            let usable = &usable;
            futures.push(async move {
                let _permit = semaphore.acquire_owned().await.map_err(|_| {
                    StudyError::ServiceUnavailable {
                        message: "assembler shut down".into(),
                        permanent: true,
                        retry_after_ms: None,
                    }
                })?;
                progress.on_level_start(level, requested);
                let outcome = self
                    .fill_level(level, requested, request, usable, index, progress)
                    .await?;
                Ok::<_, StudyError>((level, outcome))
            });
        }

        let mut by_level: BTreeMap<BloomLevel, LevelOutcome> = BTreeMap::new();
        while let Some(result) = futures.next().await {
            // Returning drops the remaining futures, abandoning their calls.
            let (level, outcome) = result?;
            by_level.insert(level, outcome);
        }

        let mut questions = Vec::new();
        let mut shortfalls = Vec::new();
        let mut dropped_entries = 0;
        let mut off_level = 0;
        let mut duplicates = 0;
        let mut attempts = 0;
        let mut token_usage = TokenUsage::default();

        for (level, outcome) in by_level {
            let requested = request.distribution.get(&level).copied().unwrap_or(0);
            let realized = outcome.questions.len() as u32;
            progress.on_level_complete(level, realized, requested);
            if realized < requested {
                let shortfall = Shortfall {
                    level,
                    requested,
                    realized,
                };
                warn!(
                    %level,
                    requested,
                    realized,
                    "level fell short after {} attempts", outcome.attempts
                );
                progress.on_shortfall(&shortfall);
                shortfalls.push(shortfall);
            }
            dropped_entries += outcome.dropped;
            off_level += outcome.off_level;
            duplicates += outcome.duplicates;
            attempts += outcome.attempts;
            token_usage += outcome.token_usage;
            questions.extend(outcome.questions);
        }

        let exam = Exam {
            id: Uuid::new_v4(),
            title: request.title.clone(),
            question_type: request.question_type,
            requested: request.distribution.clone(),
            difficulty: request.difficulty,
            questions,
            created_at: chrono::Utc::now(),
        };

        info!(
            questions = exam.questions.len(),
            requested = exam.requested_total(),
            attempts,
            "assembled '{}'", exam.title
        );

        Ok(Assembly {
            exam,
            shortfalls,
            dropped_entries,
            off_level,
            duplicates,
            attempts,
            token_usage,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// One prompt, one model call (with retries), one parse.
    pub async fn generate(
        &self,
        chunk: &ContentChunk,
        level: BloomLevel,
        kind: QuestionType,
        difficulty: Difficulty,
        count: u32,
    ) -> Result<ParseOutcome, StudyError> {
        let prompt = build_question_prompt(chunk, level, kind, difficulty, count)?;
        let completion = self.complete_with_retries(&prompt, level, &NoopReporter).await?;
        let defaults = ParseDefaults::new(level, kind, format!("{}-{}", chunk.id, level.slug()));
        Ok(parse_questions(&completion.text, &defaults))
    }

    async fn fill_level(
        &self,
        level: BloomLevel,
        requested: u32,
        request: &ExamRequest,
        chunks: &[&ContentChunk],
        offset: usize,
        progress: &dyn ProgressReporter,
    ) -> Result<LevelOutcome, StudyError> {
        let mut outcome = LevelOutcome::default();
        let mut seen: HashSet<String> = HashSet::new();

        for attempt in 1..=self.config.max_attempts_per_level {
            let remaining = requested - outcome.questions.len() as u32;
            if remaining == 0 {
                break;
            }

            let chunk = chunks[(offset + attempt as usize - 1) % chunks.len()];
            let prompt = build_question_prompt(
                chunk,
                level,
                request.question_type,
                request.difficulty,
                remaining,
            )?;
            let completion = self.complete_with_retries(&prompt, level, progress).await?;
            outcome.attempts += 1;
            outcome.token_usage += completion.token_usage;

            let defaults = ParseDefaults::new(
                level,
                request.question_type,
                format!("{}-{}-{attempt}", chunk.id, level.slug()),
            );
            let parsed = parse_questions(&completion.text, &defaults);
            outcome.dropped += parsed.dropped;

            for question in parsed.questions {
                if question.level != level {
                    outcome.off_level += 1;
                    continue;
                }
                if !seen.insert(prompt_key(&question.prompt)) {
                    outcome.duplicates += 1;
                    continue;
                }
                if outcome.questions.len() < requested as usize {
                    outcome.questions.push(question);
                }
            }

            tracing::debug!(
                %level,
                attempt,
                realized = outcome.questions.len(),
                requested,
                "attempt finished"
            );
        }

        Ok(outcome)
    }

    /// Call the model under the configured deadline, retrying transient
    /// failures with exponential backoff.
    async fn complete_with_retries(
        &self,
        prompt: &str,
        level: BloomLevel,
        progress: &dyn ProgressReporter,
    ) -> Result<Completion, StudyError> {
        let mut retry_delay = self.config.retry_delay;
        let mut retry = 0;
        loop {
            match with_timeout(self.config.request_timeout, self.client.complete(prompt)).await {
                Ok(completion) => return Ok(completion),
                Err(e) if e.is_retryable() && retry < self.config.max_retries => {
                    retry += 1;
                    // Use the service's retry-after hint if available
                    if let StudyError::ServiceUnavailable {
                        retry_after_ms: Some(ms),
                        ..
                    } = &e
                    {
                        retry_delay = Duration::from_millis(*ms);
                    }
                    warn!(%level, retry, "model call failed, retrying: {e}");
                    progress.on_retry(level, retry, &e.to_string());
                    tokio::time::sleep(retry_delay).await;
                    retry_delay = (retry_delay * 2).min(Duration::from_secs(60));
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Prompts differing only in case or spacing count as the same question.
fn prompt_key(prompt: &str) -> String {
    prompt
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}
