use std::sync::Arc;

use theory_core::model::{
    Category, ChoiceIndex, ProgressRecord, QuizError, QuizSession, ScoredQuiz, UserId,
};
use storage::repository::{
    AttemptRecord, AttemptRepository, ProgressRepository, QuestionRepository, SessionRepository,
};

use super::plan::{DEFAULT_QUIZ_LENGTH, MOCK_TEST_LENGTH, QuizBuilder};
use super::progress::QuizProgress;
use super::runner::{AnswerFeedback, QuizRunner};
use crate::Clock;
use crate::error::QuizFlowError;
use crate::sync::SyncHandle;

/// How many bank questions are pulled as candidates for one draw.
const CANDIDATE_LIMIT: u32 = 512;

/// Result of answering one question through the workflow.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizAnswerOutcome {
    pub feedback: AnswerFeedback,
    pub progress: QuizProgress,
}

/// Result of finishing a quiz.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizCompletion {
    pub scored: ScoredQuiz,
    pub attempt_id: i64,
    pub record: ProgressRecord,
}

/// Orchestrates quiz start, persisted answering, and completion.
///
/// Every mutation is written to local storage first; the sync handle, when
/// present, is only ever notified afterwards and never blocks the flow.
#[derive(Clone)]
pub struct QuizFlowService {
    clock: Clock,
    questions: Arc<dyn QuestionRepository>,
    sessions: Arc<dyn SessionRepository>,
    attempts: Arc<dyn AttemptRepository>,
    progress: Arc<dyn ProgressRepository>,
    sync: Option<SyncHandle>,
    user: Option<UserId>,
    shuffle: bool,
}

impl QuizFlowService {
    #[must_use]
    pub fn new(
        clock: Clock,
        questions: Arc<dyn QuestionRepository>,
        sessions: Arc<dyn SessionRepository>,
        attempts: Arc<dyn AttemptRepository>,
        progress: Arc<dyn ProgressRepository>,
    ) -> Self {
        Self {
            clock,
            questions,
            sessions,
            attempts,
            progress,
            sync: None,
            user: None,
            shuffle: true,
        }
    }

    #[must_use]
    pub fn with_sync(mut self, sync: SyncHandle) -> Self {
        self.sync = Some(sync);
        self
    }

    #[must_use]
    pub fn with_user(mut self, user: UserId) -> Self {
        self.user = Some(user);
        self
    }

    #[must_use]
    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    /// Start a quiz drawn from the bank.
    ///
    /// # Errors
    ///
    /// Returns `QuizFlowError::Empty` when no questions match, or a storage
    /// error.
    pub async fn start_quiz(
        &self,
        category: Option<Category>,
        length: u32,
    ) -> Result<QuizRunner, QuizFlowError> {
        let candidates = match category {
            Some(category) => {
                self.questions
                    .list_by_category(category, CANDIDATE_LIMIT)
                    .await?
            }
            None => self.questions.list_questions(CANDIDATE_LIMIT).await?,
        };

        let plan = QuizBuilder::new()
            .with_category(category)
            .with_length(length)
            .with_shuffle(self.shuffle)
            .build(candidates);
        if plan.is_empty() {
            return Err(QuizFlowError::Empty { category });
        }

        let runner = QuizRunner::new(plan.questions, self.clock.now())?;
        self.persist(&runner).await?;
        Ok(runner)
    }

    /// Start a default-length practice quiz.
    ///
    /// # Errors
    ///
    /// Returns `QuizFlowError::Empty` when no questions match, or a storage
    /// error.
    pub async fn start_practice(
        &self,
        category: Option<Category>,
    ) -> Result<QuizRunner, QuizFlowError> {
        self.start_quiz(category, DEFAULT_QUIZ_LENGTH).await
    }

    /// Start a full-length mock test across every category.
    ///
    /// # Errors
    ///
    /// Returns `QuizFlowError::Empty` when the bank is empty, or a storage
    /// error.
    pub async fn start_mock_test(&self) -> Result<QuizRunner, QuizFlowError> {
        self.start_quiz(None, MOCK_TEST_LENGTH).await
    }

    /// Answer the question under the cursor and persist the session.
    ///
    /// # Errors
    ///
    /// Returns `QuizFlowError` for invalid choices, session state errors,
    /// or persistence failures.
    pub async fn answer_current(
        &self,
        runner: &mut QuizRunner,
        choice: ChoiceIndex,
    ) -> Result<QuizAnswerOutcome, QuizFlowError> {
        let feedback = runner.answer_current(choice, self.clock.now())?;
        self.persist(runner).await?;
        Ok(QuizAnswerOutcome {
            feedback,
            progress: runner.progress(),
        })
    }

    /// Move to the next question, persisting when the cursor moved.
    ///
    /// # Errors
    ///
    /// Returns `QuizFlowError` for session state errors or persistence
    /// failures.
    pub async fn advance(&self, runner: &mut QuizRunner) -> Result<bool, QuizFlowError> {
        let moved = runner.advance(self.clock.now())?;
        if moved {
            self.persist(runner).await?;
        }
        Ok(moved)
    }

    /// Move back to the previous question, persisting when the cursor moved.
    ///
    /// # Errors
    ///
    /// Returns `QuizFlowError` for session state errors or persistence
    /// failures.
    pub async fn retreat(&self, runner: &mut QuizRunner) -> Result<bool, QuizFlowError> {
        let moved = runner.retreat(self.clock.now())?;
        if moved {
            self.persist(runner).await?;
        }
        Ok(moved)
    }

    /// Finish the quiz: score it, append the attempt to the history, fold
    /// the result into lifetime progress, and push everything remote-side.
    ///
    /// # Errors
    ///
    /// Returns `QuizFlowError` while questions are unanswered, or for
    /// scoring and persistence failures.
    pub async fn complete(&self, runner: &mut QuizRunner) -> Result<QuizCompletion, QuizFlowError> {
        let now = self.clock.now();
        runner.complete(now)?;
        let scored = runner.score()?;
        let snapshot = runner.snapshot();

        self.sessions
            .upsert_session(self.user.as_ref(), &snapshot)
            .await?;

        let started_at = snapshot.started_at.ok_or(QuizError::NotStarted)?;
        let attempt = AttemptRecord {
            id: None,
            session_id: snapshot.session_id,
            user_id: self.user.clone(),
            correct: scored.score.correct(),
            total: scored.score.total(),
            percent: scored.score.percent(),
            tier: scored.tier,
            points_awarded: scored.award.total(),
            started_at,
            completed_at: snapshot.completed_at.unwrap_or(now),
        };
        let attempt_id = self.attempts.append_attempt(&attempt).await?;

        let mut record = match self.progress.load_progress().await? {
            Some(record) => record,
            None => ProgressRecord::new(now),
        };
        record.record_quiz(&scored.by_category, scored.award, now);
        self.progress.save_progress(&record).await?;

        if let Some(sync) = &self.sync {
            sync.session_completed(snapshot);
            sync.attempt_recorded(attempt);
            sync.progress_changed(record.clone());
        }

        Ok(QuizCompletion {
            scored,
            attempt_id,
            record,
        })
    }

    /// Pick up the most recently touched in-progress quiz, if any.
    ///
    /// # Errors
    ///
    /// Returns `QuizFlowError` when the stored snapshot is inconsistent or
    /// its questions are missing from the bank.
    pub async fn resume_latest(&self) -> Result<Option<QuizRunner>, QuizFlowError> {
        let Some(snapshot) = self.sessions.latest_in_progress().await? else {
            return Ok(None);
        };
        let session = QuizSession::from_snapshot(snapshot)?;
        let questions = self.questions.get_questions(session.questions()).await?;
        Ok(Some(QuizRunner::resume(questions, session)?))
    }

    async fn persist(&self, runner: &QuizRunner) -> Result<(), QuizFlowError> {
        let snapshot = runner.snapshot();
        self.sessions
            .upsert_session(self.user.as_ref(), &snapshot)
            .await?;
        if let Some(sync) = &self.sync {
            sync.session_changed(snapshot);
        }
        Ok(())
    }
}
