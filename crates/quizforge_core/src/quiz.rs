//! crates/quizforge_core/src/quiz.rs
//!
//! The quiz session engine: question generation against extracted text, the
//! quiz lifecycle (create -> start -> answer -> finish) and scoring with
//! elapsed-time accounting.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::domain::{
    AnswerDetail, AnswerSubmission, BloomLevel, DocumentStatus, GeneratedQuestion, QuizResult,
    QuizSession, QuizStatus,
};
use crate::ports::{
    DatabaseService, GenerationParams, PortError, PortResult, QuestionGeneratorService,
};

/// Upper bound on the extracted-text prefix sent to the generator. The cut is
/// intentional: generator input limits apply, and the tail of a long document
/// adds little to question variety.
const MAX_GENERATOR_INPUT_CHARS: usize = 4000;

/// How many previously generated question texts are passed back to the
/// generator as an (advisory) exclusion hint.
const EXCLUSION_HINT_LIMIT: u32 = 10;

pub struct QuizEngine {
    db: Arc<dyn DatabaseService>,
    generator: Arc<dyn QuestionGeneratorService>,
}

impl QuizEngine {
    pub fn new(db: Arc<dyn DatabaseService>, generator: Arc<dyn QuestionGeneratorService>) -> Self {
        Self { db, generator }
    }

    /// Generates a batch of questions from a completed document under a
    /// ruleset, persists it atomically and returns the stored records.
    ///
    /// Preconditions (all reported as `NotFound`): the document exists, is
    /// owned by the caller and has completed processing; extracted text
    /// exists for it; the ruleset exists.
    pub async fn generate(
        &self,
        owner_id: Uuid,
        file_id: Uuid,
        ruleset_id: Uuid,
        topic: Option<String>,
    ) -> PortResult<Vec<GeneratedQuestion>> {
        let document = self.db.get_document(file_id, owner_id).await?;
        if document.status != DocumentStatus::Completed {
            return Err(PortError::NotFound(format!(
                "Document {file_id} has no extracted content"
            )));
        }

        let extracted = self.db.get_extracted_text(file_id).await?;
        let ruleset = self.db.get_ruleset(ruleset_id).await?;

        let avoid = self
            .db
            .recent_question_texts(ruleset_id, EXCLUSION_HINT_LIMIT)
            .await?;

        let params = GenerationParams {
            num_questions: ruleset.config.num_questions,
            hardness: ruleset.config.hardness,
            bloom_levels: ruleset.config.bloom_levels.clone(),
            topic: topic.clone().or_else(|| ruleset.config.topic.clone()),
            avoid,
        };

        let source = bounded_prefix(&extracted.text, MAX_GENERATOR_INPUT_CHARS);
        let candidates = self.generator.generate(source, &params).await?;

        // Validate the whole batch before touching the store: either every
        // question is persisted or none are.
        let now = Utc::now();
        let mut questions = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            if candidate.options.len() != 4 {
                return Err(PortError::Generation(format!(
                    "expected 4 options, generator returned {}",
                    candidate.options.len()
                )));
            }
            if !candidate.options.contains(&candidate.answer) {
                return Err(PortError::Generation(format!(
                    "answer {:?} is not among the options",
                    candidate.answer
                )));
            }
            questions.push(GeneratedQuestion {
                id: Uuid::new_v4(),
                ruleset_id,
                text: candidate.question,
                options: candidate.options,
                answer: candidate.answer,
                difficulty: candidate.difficulty.unwrap_or(ruleset.config.hardness),
                bloom_level: candidate.bloom_level.unwrap_or(BloomLevel::Understand),
                topic: topic.clone(),
                created_at: now,
            });
        }

        self.db.insert_questions(&questions).await?;
        info!(%ruleset_id, count = questions.len(), "stored generated questions");
        Ok(questions)
    }

    /// Creates a quiz over a fixed question set, snapshotting the ruleset's
    /// grading style at this instant.
    pub async fn create_quiz(
        &self,
        owner_id: Uuid,
        ruleset_id: Uuid,
        question_ids: Vec<Uuid>,
        time_limit: Option<u32>,
    ) -> PortResult<QuizSession> {
        let ruleset = self.db.get_ruleset(ruleset_id).await?;

        let quiz = QuizSession {
            id: Uuid::new_v4(),
            owner_id,
            question_ids,
            timed: time_limit.is_some(),
            time_limit_minutes: time_limit,
            grading_style: ruleset.config.grading_style,
            status: QuizStatus::Created,
            start_time: None,
            end_time: None,
            score: None,
        };

        self.db.insert_quiz(&quiz).await?;
        Ok(quiz)
    }

    /// Starts the clock. A second start is rejected with `Conflict` instead
    /// of overwriting the original start time.
    pub async fn start_quiz(&self, quiz_id: Uuid, owner_id: Uuid) -> PortResult<QuizSession> {
        let started = self.db.begin_quiz(quiz_id, owner_id, Utc::now()).await?;
        if !started {
            return Err(PortError::Conflict(format!(
                "Quiz {quiz_id} has already been started"
            )));
        }
        self.db.get_quiz(quiz_id, owner_id).await
    }

    /// Appends an answer to the log. Deliberately no check that the quiz is
    /// in progress or that the question belongs to it; the log is resolved
    /// at finish time.
    pub async fn submit_answer(
        &self,
        quiz_id: Uuid,
        question_id: Uuid,
        selected_answer: String,
    ) -> PortResult<()> {
        self.db
            .insert_answer(&AnswerSubmission {
                quiz_id,
                question_id,
                selected_answer,
                answered_at: Utc::now(),
            })
            .await
    }

    /// Stops the clock, computes the score and commits the terminal state.
    /// Only the first finisher commits; later calls get `Conflict`.
    pub async fn finish_quiz(&self, quiz_id: Uuid, owner_id: Uuid) -> PortResult<QuizResult> {
        let quiz = self.db.get_quiz(quiz_id, owner_id).await?;

        let submissions = self.db.list_answers(quiz_id).await?;
        let questions = self.db.get_questions_by_ids(&quiz.question_ids).await?;
        let correct_answers: HashMap<Uuid, String> =
            questions.into_iter().map(|q| (q.id, q.answer)).collect();

        // Latest submission per question wins; the breakdown keeps the
        // chronological order of the surviving submissions.
        let effective = resolve_submissions(&submissions);

        let mut correct_count = 0usize;
        let mut answers = Vec::with_capacity(effective.len());
        for submission in effective {
            let correct_answer = correct_answers.get(&submission.question_id);
            let is_correct = correct_answer
                .map(|a| a == &submission.selected_answer)
                .unwrap_or(false);
            if is_correct {
                correct_count += 1;
            }
            answers.push(AnswerDetail {
                question_id: submission.question_id,
                selected_answer: submission.selected_answer.clone(),
                correct_answer: correct_answer.cloned(),
                is_correct,
            });
        }

        let total_questions = quiz.question_ids.len();
        let score = if total_questions > 0 {
            correct_count as f64 / total_questions as f64 * 100.0
        } else {
            0.0
        };

        let now = Utc::now();
        let time_taken = quiz
            .start_time
            .map(|start| (now - start).num_seconds().max(0) / 60);

        let committed = self.db.complete_quiz(quiz_id, owner_id, now, score).await?;
        if !committed {
            return Err(PortError::Conflict(format!(
                "Quiz {quiz_id} is already completed"
            )));
        }

        info!(%quiz_id, score, correct_count, total_questions, "quiz finished");
        Ok(QuizResult {
            quiz_id,
            score,
            total_questions,
            correct_answers: correct_count,
            time_taken,
            answers,
        })
    }
}

/// Folds the append-only submission log into one effective submission per
/// question: a later answer to the same question replaces the earlier one,
/// keeping the position of the earlier submission in the order.
fn resolve_submissions(submissions: &[AnswerSubmission]) -> Vec<AnswerSubmission> {
    let mut index: HashMap<Uuid, usize> = HashMap::new();
    let mut effective: Vec<AnswerSubmission> = Vec::new();
    for submission in submissions {
        match index.get(&submission.question_id) {
            Some(&i) => effective[i] = submission.clone(),
            None => {
                index.insert(submission.question_id, effective.len());
                effective.push(submission.clone());
            }
        }
    }
    effective
}

/// Cuts `text` to at most `max_chars` characters, on a char boundary.
fn bounded_prefix(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((i, _)) => &text[..i],
        None => text,
    }
}

#[cfg(test)]
mod helper_tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn bounded_prefix_respects_char_boundaries() {
        assert_eq!(bounded_prefix("hello", 10), "hello");
        assert_eq!(bounded_prefix("hello", 3), "hel");
        // 'é' is two bytes; a byte-indexed cut at 2 would panic.
        assert_eq!(bounded_prefix("éé", 1), "é");
    }

    #[test]
    fn latest_submission_wins_and_order_is_stable() {
        let quiz_id = Uuid::new_v4();
        let q1 = Uuid::new_v4();
        let q2 = Uuid::new_v4();
        let submission = |question_id, answer: &str| AnswerSubmission {
            quiz_id,
            question_id,
            selected_answer: answer.to_string(),
            answered_at: Utc::now(),
        };

        let log = vec![
            submission(q1, "A"),
            submission(q2, "B"),
            submission(q1, "C"),
        ];
        let effective = resolve_submissions(&log);

        assert_eq!(effective.len(), 2);
        assert_eq!(effective[0].question_id, q1);
        assert_eq!(effective[0].selected_answer, "C");
        assert_eq!(effective[1].question_id, q2);
        assert_eq!(effective[1].selected_answer, "B");
    }
}
