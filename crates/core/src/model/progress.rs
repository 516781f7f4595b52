use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::score::MasteryAward;
use crate::model::Category;

//
// ─── CATEGORY TALLY ────────────────────────────────────────────────────────────
//

/// Correct/total counters for one category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTally {
    correct: u32,
    total: u32,
}

impl CategoryTally {
    #[must_use]
    pub fn new(correct: u32, total: u32) -> Self {
        Self { correct, total }
    }

    #[must_use]
    pub fn correct(&self) -> u32 {
        self.correct
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.total
    }

    /// Count one answered question.
    pub fn record(&mut self, correct: bool) {
        self.total = self.total.saturating_add(1);
        if correct {
            self.correct = self.correct.saturating_add(1);
        }
    }

    /// Fold another tally into this one.
    pub fn add(&mut self, other: CategoryTally) {
        self.correct = self.correct.saturating_add(other.correct);
        self.total = self.total.saturating_add(other.total);
    }

    /// Floored accuracy percentage, or `None` before any answers.
    #[must_use]
    pub fn accuracy_percent(&self) -> Option<u32> {
        if self.total == 0 {
            None
        } else {
            Some(self.correct * 100 / self.total)
        }
    }
}

//
// ─── PROGRESS RECORD ───────────────────────────────────────────────────────────
//

/// Lifetime learning progress for one learner on one device.
///
/// Counters only ever grow. `merge` is plainly additive, so merging the
/// same record twice doubles its contribution; callers that hydrate from
/// a remote copy must only merge into an empty record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    tallies: BTreeMap<Category, CategoryTally>,
    mastery_points: u32,
    quizzes_completed: u32,
    modules_mastered: u32,
    updated_at: DateTime<Utc>,
}

impl ProgressRecord {
    /// A record with nothing learned yet.
    #[must_use]
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            tallies: BTreeMap::new(),
            mastery_points: 0,
            quizzes_completed: 0,
            modules_mastered: 0,
            updated_at: now,
        }
    }

    #[must_use]
    pub fn mastery_points(&self) -> u32 {
        self.mastery_points
    }

    #[must_use]
    pub fn quizzes_completed(&self) -> u32 {
        self.quizzes_completed
    }

    #[must_use]
    pub fn modules_mastered(&self) -> u32 {
        self.modules_mastered
    }

    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Tally for one category; zero counters when nothing is recorded.
    #[must_use]
    pub fn tally(&self, category: Category) -> CategoryTally {
        self.tallies.get(&category).copied().unwrap_or_default()
    }

    /// All non-empty per-category tallies.
    #[must_use]
    pub fn tallies(&self) -> &BTreeMap<Category, CategoryTally> {
        &self.tallies
    }

    /// Sum of all category tallies.
    #[must_use]
    pub fn overall(&self) -> CategoryTally {
        let mut sum = CategoryTally::default();
        for tally in self.tallies.values() {
            sum.add(*tally);
        }
        sum
    }

    /// True when nothing has ever been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tallies.is_empty()
            && self.mastery_points == 0
            && self.quizzes_completed == 0
            && self.modules_mastered == 0
    }

    /// Fold a finished quiz into the record.
    pub fn record_quiz(
        &mut self,
        by_category: &BTreeMap<Category, CategoryTally>,
        award: MasteryAward,
        now: DateTime<Utc>,
    ) {
        for (category, tally) in by_category {
            self.tallies.entry(*category).or_default().add(*tally);
        }
        self.mastery_points = self.mastery_points.saturating_add(award.total());
        self.quizzes_completed = self.quizzes_completed.saturating_add(1);
        self.updated_at = now;
    }

    /// Fold a newly mastered module into the record.
    pub fn record_module_mastery(&mut self, award: MasteryAward, now: DateTime<Utc>) {
        self.mastery_points = self.mastery_points.saturating_add(award.total());
        self.modules_mastered = self.modules_mastered.saturating_add(1);
        self.updated_at = now;
    }

    /// Additively fold another record into this one.
    ///
    /// Not idempotent: merging the same record twice counts it twice.
    pub fn merge(&mut self, other: &ProgressRecord) {
        for (category, tally) in &other.tallies {
            self.tallies.entry(*category).or_default().add(*tally);
        }
        self.mastery_points = self.mastery_points.saturating_add(other.mastery_points);
        self.quizzes_completed = self
            .quizzes_completed
            .saturating_add(other.quizzes_completed);
        self.modules_mastered = self.modules_mastered.saturating_add(other.modules_mastered);
        self.updated_at = self.updated_at.max(other.updated_at);
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────
