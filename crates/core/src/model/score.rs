use std::collections::BTreeMap;
use thiserror::Error;

use crate::model::progress::CategoryTally;
use crate::model::{Category, Question, QuestionId, QuizSession};

/// Percentage needed to pass a quiz.
pub const PASS_MARK_PERCENT: u32 = 86;

/// Percentage from which the excellent bonus applies.
pub const EXCELLENT_MARK_PERCENT: u32 = 90;

/// Mastery points earned per correctly answered question.
pub const POINTS_PER_CORRECT: u32 = 10;

/// Flat mastery award for finishing a learning module.
pub const MODULE_MASTERY_POINTS: u32 = 40;

const FLAWLESS_BONUS: u32 = 100;
const EXCELLENT_BONUS: u32 = 50;
const PASS_BONUS: u32 = 25;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ScoreError {
    #[error("cannot score a quiz with no questions")]
    EmptyQuiz,

    #[error("correct count {correct} exceeds total {total}")]
    CountMismatch { correct: u32, total: u32 },

    #[error("question {id} is missing from the question set")]
    MissingQuestion { id: QuestionId },

    #[error("unknown bonus tier: {raw}")]
    UnknownTier { raw: String },
}

//
// ─── BONUS TIER ────────────────────────────────────────────────────────────────
//

/// Bonus band a finished quiz falls into.
///
/// A perfect score outranks the excellent band; anything below the pass
/// mark earns no bonus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BonusTier {
    Flawless,
    Excellent,
    Pass,
    None,
}

impl BonusTier {
    /// Tier for a given floored percentage.
    #[must_use]
    pub fn for_percent(percent: u32) -> Self {
        if percent >= 100 {
            BonusTier::Flawless
        } else if percent >= EXCELLENT_MARK_PERCENT {
            BonusTier::Excellent
        } else if percent >= PASS_MARK_PERCENT {
            BonusTier::Pass
        } else {
            BonusTier::None
        }
    }

    /// Bonus mastery points granted by this tier.
    #[must_use]
    pub fn bonus_points(&self) -> u32 {
        match self {
            BonusTier::Flawless => FLAWLESS_BONUS,
            BonusTier::Excellent => EXCELLENT_BONUS,
            BonusTier::Pass => PASS_BONUS,
            BonusTier::None => 0,
        }
    }

    /// Stable slug used in storage and over the wire.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            BonusTier::Flawless => "flawless",
            BonusTier::Excellent => "excellent",
            BonusTier::Pass => "pass",
            BonusTier::None => "none",
        }
    }

    /// Parse a slug back into a tier.
    ///
    /// # Errors
    ///
    /// Returns `ScoreError::UnknownTier` for unrecognised input.
    pub fn parse(raw: &str) -> Result<Self, ScoreError> {
        match raw {
            "flawless" => Ok(BonusTier::Flawless),
            "excellent" => Ok(BonusTier::Excellent),
            "pass" => Ok(BonusTier::Pass),
            "none" => Ok(BonusTier::None),
            _ => Err(ScoreError::UnknownTier {
                raw: raw.to_string(),
            }),
        }
    }
}

//
// ─── QUIZ SCORE ────────────────────────────────────────────────────────────────
//

/// Correct/total result of a finished quiz.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizScore {
    correct: u32,
    total: u32,
}

impl QuizScore {
    /// Create a score.
    ///
    /// # Errors
    ///
    /// Returns `ScoreError::EmptyQuiz` when `total` is zero and
    /// `ScoreError::CountMismatch` when `correct` exceeds `total`.
    pub fn new(correct: u32, total: u32) -> Result<Self, ScoreError> {
        if total == 0 {
            return Err(ScoreError::EmptyQuiz);
        }
        if correct > total {
            return Err(ScoreError::CountMismatch { correct, total });
        }
        Ok(Self { correct, total })
    }

    #[must_use]
    pub fn correct(&self) -> u32 {
        self.correct
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.total
    }

    /// Floored percentage of correct answers.
    #[must_use]
    pub fn percent(&self) -> u32 {
        self.correct * 100 / self.total
    }

    /// Bonus band this score falls into.
    #[must_use]
    pub fn tier(&self) -> BonusTier {
        BonusTier::for_percent(self.percent())
    }

    /// True when the score reaches the pass mark.
    #[must_use]
    pub fn is_pass(&self) -> bool {
        self.percent() >= PASS_MARK_PERCENT
    }
}

//
// ─── MASTERY AWARD ─────────────────────────────────────────────────────────────
//

/// Mastery points granted for one achievement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MasteryAward {
    base: u32,
    bonus: u32,
}

impl MasteryAward {
    /// Award for a finished quiz: per-question points plus the tier bonus.
    #[must_use]
    pub fn for_quiz(score: &QuizScore) -> Self {
        Self {
            base: score.correct().saturating_mul(POINTS_PER_CORRECT),
            bonus: score.tier().bonus_points(),
        }
    }

    /// Flat award for mastering a learning module.
    #[must_use]
    pub fn for_module_mastery() -> Self {
        Self {
            base: MODULE_MASTERY_POINTS,
            bonus: 0,
        }
    }

    #[must_use]
    pub fn base(&self) -> u32 {
        self.base
    }

    #[must_use]
    pub fn bonus(&self) -> u32 {
        self.bonus
    }

    /// Total points granted.
    #[must_use]
    pub fn total(&self) -> u32 {
        self.base.saturating_add(self.bonus)
    }
}

//
// ─── SCORING ───────────────────────────────────────────────────────────────────
//

/// Everything derived from marking one quiz.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredQuiz {
    pub score: QuizScore,
    pub tier: BonusTier,
    pub award: MasteryAward,
    pub by_category: BTreeMap<Category, CategoryTally>,
}

/// Mark a session against its questions.
///
/// Every question in the session counts towards the total; a question
/// without a recorded answer is simply wrong. This lets abandoned quizzes
/// be scored the same way as completed ones.
///
/// # Errors
///
/// Returns `ScoreError::MissingQuestion` when the session references a
/// question absent from `questions`.
pub fn score_session(
    session: &QuizSession,
    questions: &[Question],
) -> Result<ScoredQuiz, ScoreError> {
    let by_id: BTreeMap<QuestionId, &Question> =
        questions.iter().map(|q| (q.id(), q)).collect();

    let mut correct = 0_u32;
    let mut by_category: BTreeMap<Category, CategoryTally> = BTreeMap::new();

    for id in session.questions() {
        let question = by_id
            .get(id)
            .ok_or(ScoreError::MissingQuestion { id: *id })?;
        let answered_right = session
            .answer_for(*id)
            .is_some_and(|choice| question.is_correct(choice));

        if answered_right {
            correct = correct.saturating_add(1);
        }
        by_category
            .entry(question.category())
            .or_default()
            .record(answered_right);
    }

    let total = u32::try_from(session.total_questions()).unwrap_or(u32::MAX);
    let score = QuizScore::new(correct, total)?;

    Ok(ScoredQuiz {
        score,
        tier: score.tier(),
        award: MasteryAward::for_quiz(&score),
        by_category,
    })
}

// ─── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ChoiceIndex;
    use crate::time::fixed_now;

    fn build_question(id: u64, category: Category) -> Question {
        Question::new(
            QuestionId::new(id),
            category,
            format!("Prompt {id}"),
            vec!["A".to_string(), "B".to_string(), "C".to_string()],
            ChoiceIndex::new(0),
            None,
        )
        .unwrap()
    }

    fn scored(correct: u32, total: u32) -> QuizScore {
        QuizScore::new(correct, total).unwrap()
    }

    #[test]
    fn percent_is_floored() {
        assert_eq!(scored(45, 50).percent(), 90);
        assert_eq!(scored(43, 50).percent(), 86);
        assert_eq!(scored(42, 50).percent(), 84);
        assert_eq!(scored(2, 3).percent(), 66);
    }

    #[test]
    fn tier_thresholds() {
        assert_eq!(scored(50, 50).tier(), BonusTier::Flawless);
        assert_eq!(scored(49, 50).tier(), BonusTier::Excellent);
        assert_eq!(scored(45, 50).tier(), BonusTier::Excellent);
        assert_eq!(scored(44, 50).tier(), BonusTier::Pass);
        assert_eq!(scored(43, 50).tier(), BonusTier::Pass);
        assert_eq!(scored(42, 50).tier(), BonusTier::None);
    }

    #[test]
    fn pass_mark() {
        assert!(scored(43, 50).is_pass());
        assert!(!scored(42, 50).is_pass());
        assert!(scored(10, 10).is_pass());
    }

    #[test]
    fn rejects_invalid_counts() {
        assert_eq!(QuizScore::new(1, 0).unwrap_err(), ScoreError::EmptyQuiz);
        assert_eq!(
            QuizScore::new(5, 3).unwrap_err(),
            ScoreError::CountMismatch {
                correct: 5,
                total: 3
            }
        );
    }

    #[test]
    fn quiz_award_combines_base_and_bonus() {
        let award = MasteryAward::for_quiz(&scored(10, 10));
        assert_eq!(award.base(), 100);
        assert_eq!(award.bonus(), 100);
        assert_eq!(award.total(), 200);

        let award = MasteryAward::for_quiz(&scored(9, 10));
        assert_eq!(award.base(), 90);
        assert_eq!(award.bonus(), 50);

        let award = MasteryAward::for_quiz(&scored(5, 10));
        assert_eq!(award.bonus(), 0);
        assert_eq!(award.total(), 50);
    }

    #[test]
    fn module_award_is_flat() {
        let award = MasteryAward::for_module_mastery();
        assert_eq!(award.total(), MODULE_MASTERY_POINTS);
    }

    #[test]
    fn tier_slug_roundtrip() {
        for tier in [
            BonusTier::Flawless,
            BonusTier::Excellent,
            BonusTier::Pass,
            BonusTier::None,
        ] {
            assert_eq!(BonusTier::parse(tier.as_str()).unwrap(), tier);
        }
        assert!(BonusTier::parse("gold").is_err());
    }

    #[test]
    fn scores_session_per_category() {
        let questions = vec![
            build_question(1, Category::Alertness),
            build_question(2, Category::Alertness),
            build_question(3, Category::RoadSigns),
        ];
        let mut session = QuizSession::new(
            questions.iter().map(Question::id).collect(),
            fixed_now(),
        )
        .unwrap();
        session.start(fixed_now());
        session
            .record_answer(QuestionId::new(1), ChoiceIndex::new(0), fixed_now())
            .unwrap();
        session
            .record_answer(QuestionId::new(2), ChoiceIndex::new(1), fixed_now())
            .unwrap();
        session
            .record_answer(QuestionId::new(3), ChoiceIndex::new(0), fixed_now())
            .unwrap();

        let marked = score_session(&session, &questions).unwrap();
        assert_eq!(marked.score.correct(), 2);
        assert_eq!(marked.score.total(), 3);

        let alertness = marked.by_category[&Category::Alertness];
        assert_eq!(alertness.correct(), 1);
        assert_eq!(alertness.total(), 2);
        let signs = marked.by_category[&Category::RoadSigns];
        assert_eq!(signs.correct(), 1);
        assert_eq!(signs.total(), 1);
    }

    #[test]
    fn unanswered_questions_count_as_wrong() {
        let questions = vec![
            build_question(1, Category::Attitude),
            build_question(2, Category::Attitude),
        ];
        let mut session = QuizSession::new(
            questions.iter().map(Question::id).collect(),
            fixed_now(),
        )
        .unwrap();
        session.start(fixed_now());
        session
            .record_answer(QuestionId::new(1), ChoiceIndex::new(0), fixed_now())
            .unwrap();

        let marked = score_session(&session, &questions).unwrap();
        assert_eq!(marked.score.correct(), 1);
        assert_eq!(marked.score.total(), 2);
    }

    #[test]
    fn missing_question_is_an_error() {
        let questions = vec![build_question(1, Category::Attitude)];
        let mut session =
            QuizSession::new(ids_of(&[1, 2]), fixed_now()).unwrap();
        session.start(fixed_now());

        let err = score_session(&session, &questions).unwrap_err();
        assert_eq!(
            err,
            ScoreError::MissingQuestion {
                id: QuestionId::new(2)
            }
        );
    }

    fn ids_of(values: &[u64]) -> Vec<QuestionId> {
        values.iter().map(|v| QuestionId::new(*v)).collect()
    }
}
