use rand::rng;
use rand::seq::SliceRandom;
use std::collections::HashSet;

use theory_core::model::{Category, Question};

/// Default number of questions in a practice quiz.
pub const DEFAULT_QUIZ_LENGTH: u32 = 10;

/// Number of questions in a full mock test.
pub const MOCK_TEST_LENGTH: u32 = 50;

/// Upper bound on any requested quiz length.
pub const MAX_QUIZ_LENGTH: u32 = 50;

/// Selection result for a quiz build.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizPlan {
    pub questions: Vec<Question>,
    pub requested: usize,
}

impl QuizPlan {
    /// Total number of questions in this plan.
    #[must_use]
    pub fn total(&self) -> usize {
        self.questions.len()
    }

    /// Returns true when no questions were selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// True when the bank could not fill the requested length.
    #[must_use]
    pub fn is_short(&self) -> bool {
        self.questions.len() < self.requested
    }
}

/// Builds a quiz by drawing questions from the bank.
///
/// Candidates are optionally filtered to one category, deduplicated by id,
/// shuffled, and cut down to the requested length.
pub struct QuizBuilder {
    category: Option<Category>,
    length: u32,
    shuffle: bool,
}

impl QuizBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            category: None,
            length: DEFAULT_QUIZ_LENGTH,
            shuffle: true,
        }
    }

    /// Preset for a full-length mock test across every category.
    #[must_use]
    pub fn mock_test() -> Self {
        Self::new().with_length(MOCK_TEST_LENGTH)
    }

    /// Restrict the draw to one category, or `None` for a mixed quiz.
    #[must_use]
    pub fn with_category(mut self, category: Option<Category>) -> Self {
        self.category = category;
        self
    }

    /// Requested quiz length; clamped to `1..=MAX_QUIZ_LENGTH` at build time.
    #[must_use]
    pub fn with_length(mut self, length: u32) -> Self {
        self.length = length;
        self
    }

    /// Enable or disable shuffling of the candidate pool.
    ///
    /// With shuffling off the draw is ordered by question id, which keeps
    /// tests deterministic.
    #[must_use]
    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    /// Draw a quiz plan from the given candidates.
    pub fn build(self, candidates: impl IntoIterator<Item = Question>) -> QuizPlan {
        let requested =
            usize::try_from(self.length.clamp(1, MAX_QUIZ_LENGTH)).unwrap_or(usize::MAX);

        let mut seen = HashSet::new();
        let mut pool: Vec<Question> = candidates
            .into_iter()
            .filter(|q| self.category.is_none_or(|c| q.category() == c))
            .filter(|q| seen.insert(q.id()))
            .collect();

        if self.shuffle {
            let mut rng = rng();
            pool.as_mut_slice().shuffle(&mut rng);
        } else {
            pool.sort_by_key(Question::id);
        }
        pool.truncate(requested);

        QuizPlan {
            questions: pool,
            requested,
        }
    }
}

impl Default for QuizBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use theory_core::model::{ChoiceIndex, QuestionId};

    fn build_question(id: u64, category: Category) -> Question {
        Question::new(
            QuestionId::new(id),
            category,
            format!("Prompt {id}"),
            vec!["A".to_string(), "B".to_string()],
            ChoiceIndex::new(0),
            None,
        )
        .unwrap()
    }

    fn bank() -> Vec<Question> {
        (1..=20)
            .map(|id| {
                let category = if id % 2 == 0 {
                    Category::RoadSigns
                } else {
                    Category::Alertness
                };
                build_question(id, category)
            })
            .collect()
    }

    #[test]
    fn builder_caps_at_requested_length() {
        let plan = QuizBuilder::new().with_length(5).build(bank());
        assert_eq!(plan.total(), 5);
        assert_eq!(plan.requested, 5);
        assert!(!plan.is_short());
    }

    #[test]
    fn builder_filters_by_category() {
        let plan = QuizBuilder::new()
            .with_category(Some(Category::RoadSigns))
            .with_length(50)
            .build(bank());
        assert_eq!(plan.total(), 10);
        assert!(plan.questions.iter().all(|q| q.category() == Category::RoadSigns));
        assert!(plan.is_short());
    }

    #[test]
    fn builder_deduplicates_by_id() {
        let mut candidates = bank();
        candidates.extend(bank());
        let plan = QuizBuilder::new().with_length(50).build(candidates);
        assert_eq!(plan.total(), 20);
    }

    #[test]
    fn unshuffled_draw_is_ordered_by_id() {
        let mut candidates = bank();
        candidates.reverse();
        let plan = QuizBuilder::new()
            .with_shuffle(false)
            .with_length(3)
            .build(candidates);
        let ids: Vec<u64> = plan.questions.iter().map(|q| q.id().value()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn length_is_clamped_to_valid_range() {
        let plan = QuizBuilder::new().with_length(0).build(bank());
        assert_eq!(plan.total(), 1);

        let plan = QuizBuilder::new().with_length(500).build(bank());
        assert_eq!(plan.requested, MAX_QUIZ_LENGTH as usize);
    }

    #[test]
    fn mock_test_preset_requests_full_length() {
        let plan = QuizBuilder::mock_test().build(bank());
        assert_eq!(plan.requested, MOCK_TEST_LENGTH as usize);
        assert_eq!(plan.total(), 20);
        assert!(plan.is_short());
    }
}
