use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::model::{ChoiceIndex, QuestionId, SessionId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizError {
    #[error("a quiz needs at least one question")]
    NoQuestions,

    #[error("question {id} appears more than once")]
    DuplicateQuestion { id: QuestionId },

    #[error("question {id} is not part of this quiz")]
    UnknownQuestion { id: QuestionId },

    #[error("quiz has not been started")]
    NotStarted,

    #[error("quiz is already complete")]
    AlreadyComplete,

    #[error("{remaining} questions are still unanswered")]
    Unanswered { remaining: usize },

    #[error("unknown quiz status: {raw}")]
    UnknownStatus { raw: String },

    #[error("invalid persisted quiz: {reason}")]
    InvalidSnapshot { reason: String },
}

//
// ─── STATUS ────────────────────────────────────────────────────────────────────
//

/// Lifecycle of a quiz session.
///
/// `NotStarted` only exists between building a session and the learner
/// opening the first question; answering requires `InProgress`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuizStatus {
    NotStarted,
    InProgress,
    Complete,
}

impl QuizStatus {
    /// Stable slug used in storage and over the wire.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            QuizStatus::NotStarted => "not-started",
            QuizStatus::InProgress => "in-progress",
            QuizStatus::Complete => "complete",
        }
    }

    /// Parse a slug back into a status.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::UnknownStatus` for unrecognised input.
    pub fn parse(raw: &str) -> Result<Self, QuizError> {
        match raw {
            "not-started" => Ok(QuizStatus::NotStarted),
            "in-progress" => Ok(QuizStatus::InProgress),
            "complete" => Ok(QuizStatus::Complete),
            _ => Err(QuizError::UnknownStatus {
                raw: raw.to_string(),
            }),
        }
    }
}

//
// ─── SNAPSHOT ──────────────────────────────────────────────────────────────────
//

/// One recorded answer inside a persisted quiz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedAnswer {
    pub question_id: QuestionId,
    pub choice: ChoiceIndex,
}

/// Persisted shape of a [`QuizSession`].
///
/// This is the exact form written to local storage and pushed to the
/// remote backend, so two devices can exchange it. Answers are listed in
/// question order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizSnapshot {
    pub session_id: SessionId,
    pub questions: Vec<QuestionId>,
    pub cursor: usize,
    pub answers: Vec<RecordedAnswer>,
    pub status: QuizStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub revision: u64,
    pub updated_at: DateTime<Utc>,
}

//
// ─── QUIZ SESSION ──────────────────────────────────────────────────────────────
//

/// State machine for one attempt at a set of questions.
///
/// Holds the ordered question list, the cursor, and the answer map. Every
/// mutation bumps `revision`; reconciliation between devices compares
/// revisions, never wall clocks, so the counter must only ever grow.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizSession {
    id: SessionId,
    questions: Vec<QuestionId>,
    cursor: usize,
    answers: BTreeMap<QuestionId, ChoiceIndex>,
    status: QuizStatus,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    revision: u64,
    updated_at: DateTime<Utc>,
}

impl QuizSession {
    /// Create a session over the given questions, not yet started.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::NoQuestions` for an empty list and
    /// `QuizError::DuplicateQuestion` if an id repeats.
    pub fn new(questions: Vec<QuestionId>, now: DateTime<Utc>) -> Result<Self, QuizError> {
        if questions.is_empty() {
            return Err(QuizError::NoQuestions);
        }
        if let Some(id) = first_duplicate(&questions) {
            return Err(QuizError::DuplicateQuestion { id });
        }

        Ok(Self {
            id: SessionId::generate(),
            questions,
            cursor: 0,
            answers: BTreeMap::new(),
            status: QuizStatus::NotStarted,
            started_at: None,
            completed_at: None,
            revision: 0,
            updated_at: now,
        })
    }

    /// Begin (or restart) the quiz.
    ///
    /// Always lands on the first question with an empty answer map, no
    /// matter what state the session was in before.
    pub fn start(&mut self, now: DateTime<Utc>) {
        self.cursor = 0;
        self.answers.clear();
        self.status = QuizStatus::InProgress;
        self.started_at = Some(now);
        self.completed_at = None;
        self.touch(now);
    }

    /// Abandon the current run and go back to a clean, unstarted session
    /// over the same questions.
    ///
    /// A fresh identifier is assigned, so snapshots of the abandoned run
    /// stay untouched under their own id. The revision keeps counting.
    pub fn reset(&mut self, now: DateTime<Utc>) {
        self.id = SessionId::generate();
        self.cursor = 0;
        self.answers.clear();
        self.status = QuizStatus::NotStarted;
        self.started_at = None;
        self.completed_at = None;
        self.touch(now);
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn questions(&self) -> &[QuestionId] {
        &self.questions
    }

    #[must_use]
    pub fn status(&self) -> QuizStatus {
        self.status
    }

    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    #[must_use]
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Total number of questions in this quiz.
    #[must_use]
    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    /// Number of questions with a recorded answer.
    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.answers.len()
    }

    /// Number of questions still without an answer.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.questions.len().saturating_sub(self.answers.len())
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.status == QuizStatus::Complete
    }

    /// Returns true once every question has an answer.
    #[must_use]
    pub fn is_fully_answered(&self) -> bool {
        self.answers.len() == self.questions.len()
    }

    /// The question under the cursor.
    #[must_use]
    pub fn current_question(&self) -> Option<QuestionId> {
        self.questions.get(self.cursor).copied()
    }

    /// The recorded choice for a question, if any.
    #[must_use]
    pub fn answer_for(&self, id: QuestionId) -> Option<ChoiceIndex> {
        self.answers.get(&id).copied()
    }

    /// Move the cursor to the next question.
    ///
    /// Returns false when already on the last question.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::NotStarted` or `QuizError::AlreadyComplete`
    /// when the quiz is not in progress.
    pub fn advance(&mut self, now: DateTime<Utc>) -> Result<bool, QuizError> {
        self.require_in_progress()?;
        if self.cursor + 1 >= self.questions.len() {
            return Ok(false);
        }
        self.cursor += 1;
        self.touch(now);
        Ok(true)
    }

    /// Move the cursor back to the previous question.
    ///
    /// Returns false when already on the first question.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::NotStarted` or `QuizError::AlreadyComplete`
    /// when the quiz is not in progress.
    pub fn retreat(&mut self, now: DateTime<Utc>) -> Result<bool, QuizError> {
        self.require_in_progress()?;
        if self.cursor == 0 {
            return Ok(false);
        }
        self.cursor -= 1;
        self.touch(now);
        Ok(true)
    }

    /// Record the learner's choice for a question.
    ///
    /// Answering the same question again replaces the earlier choice; the
    /// previous one is returned so callers can tell a change from a first
    /// answer. The map never holds two entries for one question.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::UnknownQuestion` if the question is not part of
    /// this quiz, or a state error when the quiz is not in progress.
    pub fn record_answer(
        &mut self,
        question_id: QuestionId,
        choice: ChoiceIndex,
        now: DateTime<Utc>,
    ) -> Result<Option<ChoiceIndex>, QuizError> {
        self.require_in_progress()?;
        if !self.questions.contains(&question_id) {
            return Err(QuizError::UnknownQuestion { id: question_id });
        }
        let previous = self.answers.insert(question_id, choice);
        self.touch(now);
        Ok(previous)
    }

    /// Finish the quiz.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::Unanswered` while any question lacks an answer,
    /// or a state error when the quiz is not in progress.
    pub fn complete(&mut self, now: DateTime<Utc>) -> Result<(), QuizError> {
        self.require_in_progress()?;
        if !self.is_fully_answered() {
            return Err(QuizError::Unanswered {
                remaining: self.remaining(),
            });
        }
        self.status = QuizStatus::Complete;
        self.completed_at = Some(now);
        self.touch(now);
        Ok(())
    }

    /// Capture the persisted form of this session.
    ///
    /// Answers come out in question order, which keeps snapshots of equal
    /// state byte-identical regardless of answering order.
    #[must_use]
    pub fn snapshot(&self) -> QuizSnapshot {
        let answers = self
            .questions
            .iter()
            .filter_map(|id| {
                self.answers.get(id).map(|choice| RecordedAnswer {
                    question_id: *id,
                    choice: *choice,
                })
            })
            .collect();

        QuizSnapshot {
            session_id: self.id,
            questions: self.questions.clone(),
            cursor: self.cursor,
            answers,
            status: self.status,
            started_at: self.started_at,
            completed_at: self.completed_at,
            revision: self.revision,
            updated_at: self.updated_at,
        }
    }

    /// Rehydrate a session from its persisted form.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::InvalidSnapshot` when the snapshot breaks a
    /// session invariant (cursor range, answer keys, status coherence).
    pub fn from_snapshot(snapshot: QuizSnapshot) -> Result<Self, QuizError> {
        if snapshot.questions.is_empty() {
            return Err(invalid("no questions"));
        }
        if let Some(id) = first_duplicate(&snapshot.questions) {
            return Err(invalid(format!("duplicate question {id}")));
        }
        if snapshot.cursor >= snapshot.questions.len() {
            return Err(invalid(format!(
                "cursor {} out of range for {} questions",
                snapshot.cursor,
                snapshot.questions.len()
            )));
        }

        let mut answers = BTreeMap::new();
        for entry in &snapshot.answers {
            if !snapshot.questions.contains(&entry.question_id) {
                return Err(invalid(format!(
                    "answer references unknown question {}",
                    entry.question_id
                )));
            }
            if answers.insert(entry.question_id, entry.choice).is_some() {
                return Err(invalid(format!(
                    "duplicate answer for question {}",
                    entry.question_id
                )));
            }
        }

        match snapshot.status {
            QuizStatus::NotStarted => {
                if snapshot.started_at.is_some() || !answers.is_empty() {
                    return Err(invalid("not-started quiz carries progress"));
                }
            }
            QuizStatus::InProgress => {
                if snapshot.started_at.is_none() {
                    return Err(invalid("in-progress quiz has no start time"));
                }
                if snapshot.completed_at.is_some() {
                    return Err(invalid("in-progress quiz has a completion time"));
                }
            }
            QuizStatus::Complete => {
                let (Some(started), Some(completed)) =
                    (snapshot.started_at, snapshot.completed_at)
                else {
                    return Err(invalid("complete quiz is missing timestamps"));
                };
                if completed < started {
                    return Err(invalid("completed before started"));
                }
                if answers.len() != snapshot.questions.len() {
                    return Err(invalid("complete quiz has unanswered questions"));
                }
            }
        }

        Ok(Self {
            id: snapshot.session_id,
            questions: snapshot.questions,
            cursor: snapshot.cursor,
            answers,
            status: snapshot.status,
            started_at: snapshot.started_at,
            completed_at: snapshot.completed_at,
            revision: snapshot.revision,
            updated_at: snapshot.updated_at,
        })
    }

    fn require_in_progress(&self) -> Result<(), QuizError> {
        match self.status {
            QuizStatus::InProgress => Ok(()),
            QuizStatus::NotStarted => Err(QuizError::NotStarted),
            QuizStatus::Complete => Err(QuizError::AlreadyComplete),
        }
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.revision = self.revision.saturating_add(1);
        self.updated_at = now;
    }
}

fn first_duplicate(questions: &[QuestionId]) -> Option<QuestionId> {
    let mut seen = std::collections::HashSet::with_capacity(questions.len());
    questions.iter().find(|id| !seen.insert(**id)).copied()
}

fn invalid(reason: impl Into<String>) -> QuizError {
    QuizError::InvalidSnapshot {
        reason: reason.into(),
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;
    use chrono::Duration;

    fn ids(values: &[u64]) -> Vec<QuestionId> {
        values.iter().map(|v| QuestionId::new(*v)).collect()
    }

    fn started_session() -> QuizSession {
        let mut session = QuizSession::new(ids(&[1, 2, 3]), fixed_now()).unwrap();
        session.start(fixed_now());
        session
    }

    #[test]
    fn new_session_is_not_started() {
        let session = QuizSession::new(ids(&[1, 2]), fixed_now()).unwrap();
        assert_eq!(session.status(), QuizStatus::NotStarted);
        assert_eq!(session.revision(), 0);
        assert!(session.started_at().is_none());
    }

    #[test]
    fn rejects_empty_question_list() {
        let result = QuizSession::new(Vec::new(), fixed_now());
        assert_eq!(result.unwrap_err(), QuizError::NoQuestions);
    }

    #[test]
    fn rejects_duplicate_questions() {
        let result = QuizSession::new(ids(&[1, 2, 1]), fixed_now());
        assert_eq!(
            result.unwrap_err(),
            QuizError::DuplicateQuestion {
                id: QuestionId::new(1)
            }
        );
    }

    #[test]
    fn start_resets_cursor_and_answers() {
        let mut session = started_session();
        session
            .record_answer(QuestionId::new(1), ChoiceIndex::new(0), fixed_now())
            .unwrap();
        session.advance(fixed_now()).unwrap();
        assert_eq!(session.cursor(), 1);
        assert_eq!(session.answered_count(), 1);

        session.start(fixed_now() + Duration::minutes(5));

        assert_eq!(session.cursor(), 0);
        assert_eq!(session.answered_count(), 0);
        assert_eq!(session.status(), QuizStatus::InProgress);
        assert_eq!(
            session.started_at(),
            Some(fixed_now() + Duration::minutes(5))
        );
    }

    #[test]
    fn reset_assigns_a_fresh_id_and_clears_the_run() {
        let mut session = started_session();
        session
            .record_answer(QuestionId::new(1), ChoiceIndex::new(0), fixed_now())
            .unwrap();
        let old_id = session.id();
        let old_revision = session.revision();

        session.reset(fixed_now() + Duration::minutes(1));

        assert_ne!(session.id(), old_id);
        assert_eq!(session.status(), QuizStatus::NotStarted);
        assert_eq!(session.cursor(), 0);
        assert_eq!(session.answered_count(), 0);
        assert!(session.started_at().is_none());
        assert_eq!(session.questions(), ids(&[1, 2, 3]).as_slice());
        assert!(session.revision() > old_revision);
    }

    #[test]
    fn answering_before_start_is_rejected() {
        let mut session = QuizSession::new(ids(&[1, 2]), fixed_now()).unwrap();
        let result = session.record_answer(QuestionId::new(1), ChoiceIndex::new(0), fixed_now());
        assert_eq!(result.unwrap_err(), QuizError::NotStarted);
    }

    #[test]
    fn records_and_replaces_answers() {
        let mut session = started_session();
        let first = session
            .record_answer(QuestionId::new(2), ChoiceIndex::new(0), fixed_now())
            .unwrap();
        assert_eq!(first, None);

        let replaced = session
            .record_answer(QuestionId::new(2), ChoiceIndex::new(3), fixed_now())
            .unwrap();
        assert_eq!(replaced, Some(ChoiceIndex::new(0)));

        // still a single entry for that question
        assert_eq!(session.answered_count(), 1);
        assert_eq!(
            session.answer_for(QuestionId::new(2)),
            Some(ChoiceIndex::new(3))
        );
    }

    #[test]
    fn rejects_answer_for_unknown_question() {
        let mut session = started_session();
        let result = session.record_answer(QuestionId::new(99), ChoiceIndex::new(0), fixed_now());
        assert_eq!(
            result.unwrap_err(),
            QuizError::UnknownQuestion {
                id: QuestionId::new(99)
            }
        );
    }

    #[test]
    fn cursor_stays_within_bounds() {
        let mut session = started_session();
        assert!(!session.retreat(fixed_now()).unwrap());
        assert!(session.advance(fixed_now()).unwrap());
        assert!(session.advance(fixed_now()).unwrap());
        assert!(!session.advance(fixed_now()).unwrap());
        assert_eq!(session.cursor(), 2);
        assert!(session.retreat(fixed_now()).unwrap());
        assert_eq!(session.cursor(), 1);
    }

    #[test]
    fn complete_requires_all_answers() {
        let mut session = started_session();
        session
            .record_answer(QuestionId::new(1), ChoiceIndex::new(0), fixed_now())
            .unwrap();

        let result = session.complete(fixed_now());
        assert_eq!(result.unwrap_err(), QuizError::Unanswered { remaining: 2 });
    }

    #[test]
    fn complete_sets_status_and_timestamp() {
        let mut session = started_session();
        for id in [1, 2, 3] {
            session
                .record_answer(QuestionId::new(id), ChoiceIndex::new(0), fixed_now())
                .unwrap();
        }
        let finished_at = fixed_now() + Duration::minutes(12);
        session.complete(finished_at).unwrap();

        assert!(session.is_complete());
        assert_eq!(session.completed_at(), Some(finished_at));

        let again = session.complete(finished_at);
        assert_eq!(again.unwrap_err(), QuizError::AlreadyComplete);
    }

    #[test]
    fn every_mutation_bumps_revision() {
        let mut session = QuizSession::new(ids(&[1, 2]), fixed_now()).unwrap();
        assert_eq!(session.revision(), 0);

        session.start(fixed_now());
        assert_eq!(session.revision(), 1);

        session
            .record_answer(QuestionId::new(1), ChoiceIndex::new(0), fixed_now())
            .unwrap();
        assert_eq!(session.revision(), 2);

        session.advance(fixed_now()).unwrap();
        assert_eq!(session.revision(), 3);

        // hitting the end does not mutate, so no bump
        session.advance(fixed_now()).unwrap();
        assert_eq!(session.revision(), 3);
    }

    #[test]
    fn snapshot_roundtrip_preserves_state() {
        let mut session = started_session();
        session
            .record_answer(QuestionId::new(3), ChoiceIndex::new(2), fixed_now())
            .unwrap();
        session
            .record_answer(QuestionId::new(1), ChoiceIndex::new(1), fixed_now())
            .unwrap();
        session.advance(fixed_now()).unwrap();

        let snapshot = session.snapshot();
        // answers are emitted in question order, not answer order
        assert_eq!(snapshot.answers[0].question_id, QuestionId::new(1));
        assert_eq!(snapshot.answers[1].question_id, QuestionId::new(3));

        let restored = QuizSession::from_snapshot(snapshot).unwrap();
        assert_eq!(restored, session);
    }

    #[test]
    fn snapshot_serializes_to_json_and_back() {
        let mut session = started_session();
        session
            .record_answer(QuestionId::new(1), ChoiceIndex::new(0), fixed_now())
            .unwrap();

        let json = serde_json::to_string(&session.snapshot()).unwrap();
        let parsed: QuizSnapshot = serde_json::from_str(&json).unwrap();
        let restored = QuizSession::from_snapshot(parsed).unwrap();
        assert_eq!(restored, session);
    }

    #[test]
    fn from_snapshot_rejects_cursor_out_of_range() {
        let mut snapshot = started_session().snapshot();
        snapshot.cursor = 3;
        let err = QuizSession::from_snapshot(snapshot).unwrap_err();
        assert!(matches!(err, QuizError::InvalidSnapshot { .. }));
    }

    #[test]
    fn from_snapshot_rejects_foreign_answer() {
        let mut snapshot = started_session().snapshot();
        snapshot.answers.push(RecordedAnswer {
            question_id: QuestionId::new(44),
            choice: ChoiceIndex::new(0),
        });
        let err = QuizSession::from_snapshot(snapshot).unwrap_err();
        assert!(matches!(err, QuizError::InvalidSnapshot { .. }));
    }

    #[test]
    fn from_snapshot_rejects_incoherent_completion() {
        let mut session = started_session();
        for id in [1, 2, 3] {
            session
                .record_answer(QuestionId::new(id), ChoiceIndex::new(0), fixed_now())
                .unwrap();
        }
        session.complete(fixed_now()).unwrap();

        let mut snapshot = session.snapshot();
        snapshot.completed_at = None;
        let err = QuizSession::from_snapshot(snapshot).unwrap_err();
        assert!(matches!(err, QuizError::InvalidSnapshot { .. }));
    }

    #[test]
    fn status_slug_roundtrip() {
        for status in [
            QuizStatus::NotStarted,
            QuizStatus::InProgress,
            QuizStatus::Complete,
        ] {
            assert_eq!(QuizStatus::parse(status.as_str()).unwrap(), status);
        }
        assert!(QuizStatus::parse("paused").is_err());
    }
}
