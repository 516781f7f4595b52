use chrono::{DateTime, Utc};

use theory_core::model::{
    ChoiceIndex, Question, QuestionId, QuizError, QuizSession, QuizSnapshot, ScoredQuiz,
    SessionId, score_session,
};

use super::progress::QuizProgress;
use crate::error::QuizFlowError;

//
// ─── ANSWER FEEDBACK ───────────────────────────────────────────────────────────
//

/// Captures the outcome of answering one question.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerFeedback {
    pub question_id: QuestionId,
    pub choice: ChoiceIndex,
    pub is_correct: bool,
    pub correct_choice: ChoiceIndex,
    pub explanation: Option<String>,
    /// The choice this answer replaced, if the question was answered before.
    pub previous: Option<ChoiceIndex>,
}

//
// ─── QUIZ RUNNER ───────────────────────────────────────────────────────────────
//

/// In-memory stepper over one quiz.
///
/// Pairs the full question data with the session state machine so callers
/// can render prompts and validate choices without further lookups.
pub struct QuizRunner {
    questions: Vec<Question>,
    session: QuizSession,
}

impl QuizRunner {
    /// Build and start a fresh quiz over the given questions.
    ///
    /// `started_at` should come from the services layer clock to keep time
    /// deterministic.
    ///
    /// # Errors
    ///
    /// Returns `QuizFlowError::Session` when the question list is empty or
    /// holds duplicates.
    pub fn new(questions: Vec<Question>, started_at: DateTime<Utc>) -> Result<Self, QuizFlowError> {
        let ids = questions.iter().map(Question::id).collect();
        let mut session = QuizSession::new(ids, started_at)?;
        session.start(started_at);
        Ok(Self { questions, session })
    }

    /// Rebuild a runner around a previously persisted session.
    ///
    /// `questions` must be the session's questions in session order, as
    /// returned by an order-preserving repository fetch.
    ///
    /// # Errors
    ///
    /// Returns `QuizFlowError::QuestionMismatch` when the question list does
    /// not line up with the session.
    pub fn resume(questions: Vec<Question>, session: QuizSession) -> Result<Self, QuizFlowError> {
        let aligned = session.questions().len() == questions.len()
            && session
                .questions()
                .iter()
                .zip(&questions)
                .all(|(id, question)| *id == question.id());
        if !aligned {
            return Err(QuizFlowError::QuestionMismatch);
        }
        Ok(Self { questions, session })
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.session.id()
    }

    #[must_use]
    pub fn session(&self) -> &QuizSession {
        &self.session
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// The question under the cursor.
    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        let id = self.session.current_question()?;
        self.questions.iter().find(|question| question.id() == id)
    }

    /// The recorded choice for the question under the cursor.
    #[must_use]
    pub fn current_answer(&self) -> Option<ChoiceIndex> {
        let id = self.session.current_question()?;
        self.session.answer_for(id)
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.session.is_complete()
    }

    /// Returns a summary of the current quiz progress.
    #[must_use]
    pub fn progress(&self) -> QuizProgress {
        QuizProgress {
            total: self.session.total_questions(),
            answered: self.session.answered_count(),
            remaining: self.session.remaining(),
            cursor: self.session.cursor(),
            is_complete: self.session.is_complete(),
        }
    }

    /// The persisted form of the underlying session.
    #[must_use]
    pub fn snapshot(&self) -> QuizSnapshot {
        self.session.snapshot()
    }

    /// Answer the question under the cursor.
    ///
    /// # Errors
    ///
    /// Returns `QuizFlowError::InvalidChoice` when the choice is out of
    /// range for the question, or a session state error.
    pub fn answer_current(
        &mut self,
        choice: ChoiceIndex,
        now: DateTime<Utc>,
    ) -> Result<AnswerFeedback, QuizFlowError> {
        let Some(question_id) = self.session.current_question() else {
            return Err(QuizError::AlreadyComplete.into());
        };
        self.answer(question_id, choice, now)
    }

    /// Answer a specific question, replacing any earlier choice.
    ///
    /// # Errors
    ///
    /// Returns `QuizFlowError::InvalidChoice` when the choice is out of
    /// range for the question, or a session state error.
    pub fn answer(
        &mut self,
        question_id: QuestionId,
        choice: ChoiceIndex,
        now: DateTime<Utc>,
    ) -> Result<AnswerFeedback, QuizFlowError> {
        let question = self
            .questions
            .iter()
            .find(|question| question.id() == question_id)
            .ok_or(QuizError::UnknownQuestion { id: question_id })?;

        if !question.has_choice(choice) {
            return Err(QuizFlowError::InvalidChoice {
                question_id,
                choice,
                available: question.choice_count(),
            });
        }

        let is_correct = question.is_correct(choice);
        let correct_choice = question.correct();
        let explanation = question.explanation().map(ToString::to_string);

        let previous = self.session.record_answer(question_id, choice, now)?;

        Ok(AnswerFeedback {
            question_id,
            choice,
            is_correct,
            correct_choice,
            explanation,
            previous,
        })
    }

    /// Move the cursor to the next question.
    ///
    /// # Errors
    ///
    /// Returns a session state error when the quiz is not in progress.
    pub fn advance(&mut self, now: DateTime<Utc>) -> Result<bool, QuizFlowError> {
        Ok(self.session.advance(now)?)
    }

    /// Move the cursor back to the previous question.
    ///
    /// # Errors
    ///
    /// Returns a session state error when the quiz is not in progress.
    pub fn retreat(&mut self, now: DateTime<Utc>) -> Result<bool, QuizFlowError> {
        Ok(self.session.retreat(now)?)
    }

    /// Finish the quiz.
    ///
    /// # Errors
    ///
    /// Returns `QuizFlowError::Session` while any question lacks an answer.
    pub fn complete(&mut self, now: DateTime<Utc>) -> Result<(), QuizFlowError> {
        Ok(self.session.complete(now)?)
    }

    /// Mark the quiz against its questions.
    ///
    /// # Errors
    ///
    /// Returns `QuizFlowError::Score` when marking fails.
    pub fn score(&self) -> Result<ScoredQuiz, QuizFlowError> {
        Ok(score_session(&self.session, &self.questions)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use theory_core::model::{BonusTier, Category};
    use theory_core::time::fixed_now;

    fn build_question(id: u64, category: Category) -> Question {
        Question::new(
            QuestionId::new(id),
            category,
            format!("Prompt {id}"),
            vec!["A".to_string(), "B".to_string(), "C".to_string()],
            ChoiceIndex::new(0),
            Some(format!("Explanation {id}")),
        )
        .unwrap()
    }

    fn build_runner() -> QuizRunner {
        let questions = vec![
            build_question(1, Category::Alertness),
            build_question(2, Category::RoadSigns),
            build_question(3, Category::RoadSigns),
        ];
        QuizRunner::new(questions, fixed_now()).unwrap()
    }

    #[test]
    fn answer_current_reports_feedback() {
        let mut runner = build_runner();
        assert_eq!(runner.current_question().unwrap().id(), QuestionId::new(1));

        let feedback = runner
            .answer_current(ChoiceIndex::new(0), fixed_now())
            .unwrap();
        assert!(feedback.is_correct);
        assert_eq!(feedback.correct_choice, ChoiceIndex::new(0));
        assert_eq!(feedback.explanation.as_deref(), Some("Explanation 1"));
        assert_eq!(feedback.previous, None);

        let changed = runner
            .answer_current(ChoiceIndex::new(2), fixed_now())
            .unwrap();
        assert!(!changed.is_correct);
        assert_eq!(changed.previous, Some(ChoiceIndex::new(0)));
        assert_eq!(runner.progress().answered, 1);
    }

    #[test]
    fn out_of_range_choice_is_rejected_without_recording() {
        let mut runner = build_runner();
        let result = runner.answer_current(ChoiceIndex::new(7), fixed_now());
        assert!(matches!(
            result,
            Err(QuizFlowError::InvalidChoice { available: 3, .. })
        ));
        assert_eq!(runner.progress().answered, 0);
    }

    #[test]
    fn navigation_moves_within_bounds() {
        let mut runner = build_runner();
        assert!(runner.advance(fixed_now()).unwrap());
        assert!(runner.advance(fixed_now()).unwrap());
        assert!(!runner.advance(fixed_now()).unwrap());
        assert_eq!(runner.progress().cursor, 2);

        assert!(runner.retreat(fixed_now()).unwrap());
        assert_eq!(runner.current_question().unwrap().id(), QuestionId::new(2));
    }

    #[test]
    fn complete_requires_all_answers_then_scores() {
        let mut runner = build_runner();
        runner.answer_current(ChoiceIndex::new(0), fixed_now()).unwrap();
        assert!(matches!(
            runner.complete(fixed_now()),
            Err(QuizFlowError::Session(QuizError::Unanswered { remaining: 2 }))
        ));

        runner
            .answer(QuestionId::new(2), ChoiceIndex::new(0), fixed_now())
            .unwrap();
        runner
            .answer(QuestionId::new(3), ChoiceIndex::new(1), fixed_now())
            .unwrap();
        runner.complete(fixed_now()).unwrap();
        assert!(runner.is_complete());

        let scored = runner.score().unwrap();
        assert_eq!(scored.score.correct(), 2);
        assert_eq!(scored.score.percent(), 66);
        assert_eq!(scored.tier, BonusTier::None);
        assert_eq!(
            scored.by_category.get(&Category::RoadSigns).unwrap().total(),
            2
        );
    }

    #[test]
    fn resume_rejects_misaligned_questions() {
        let runner = build_runner();
        let session = QuizSession::from_snapshot(runner.snapshot()).unwrap();

        let misaligned = vec![
            build_question(1, Category::Alertness),
            build_question(3, Category::RoadSigns),
            build_question(2, Category::RoadSigns),
        ];
        assert!(matches!(
            QuizRunner::resume(misaligned, session),
            Err(QuizFlowError::QuestionMismatch)
        ));
    }

    #[test]
    fn resume_restores_cursor_and_answers() {
        let mut runner = build_runner();
        runner.answer_current(ChoiceIndex::new(1), fixed_now()).unwrap();
        runner.advance(fixed_now()).unwrap();
        let snapshot = runner.snapshot();

        let session = QuizSession::from_snapshot(snapshot).unwrap();
        let questions = vec![
            build_question(1, Category::Alertness),
            build_question(2, Category::RoadSigns),
            build_question(3, Category::RoadSigns),
        ];
        let resumed = QuizRunner::resume(questions, session).unwrap();
        assert_eq!(resumed.progress().cursor, 1);
        assert_eq!(resumed.progress().answered, 1);
        assert_eq!(
            resumed.session().answer_for(QuestionId::new(1)),
            Some(ChoiceIndex::new(1))
        );
    }
}
