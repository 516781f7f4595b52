use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::model::QuestionId;

/// Minimum number of answer choices on a question.
pub const MIN_CHOICES: usize = 2;

/// Maximum number of answer choices on a question.
pub const MAX_CHOICES: usize = 6;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question prompt cannot be empty")]
    EmptyPrompt,

    #[error("choice {index} cannot be empty")]
    EmptyChoice { index: usize },

    #[error("expected {MIN_CHOICES} to {MAX_CHOICES} choices, got {len}")]
    ChoiceCount { len: usize },

    #[error("correct choice {index} is out of range for {len} choices")]
    CorrectOutOfRange { index: u8, len: usize },

    #[error("unknown category: {raw}")]
    UnknownCategory { raw: String },
}

//
// ─── CATEGORY ──────────────────────────────────────────────────────────────────
//

/// Topic a theory question belongs to.
///
/// The set mirrors the official syllabus chapters; every question and
/// learning module is filed under exactly one of these.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Alertness,
    Attitude,
    SafetyMargins,
    HazardAwareness,
    VulnerableRoadUsers,
    RoadSigns,
    RulesOfTheRoad,
    MotorwayDriving,
}

impl Category {
    /// All categories in syllabus order.
    pub const ALL: [Category; 8] = [
        Category::Alertness,
        Category::Attitude,
        Category::SafetyMargins,
        Category::HazardAwareness,
        Category::VulnerableRoadUsers,
        Category::RoadSigns,
        Category::RulesOfTheRoad,
        Category::MotorwayDriving,
    ];

    /// Stable slug used in storage and over the wire.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Alertness => "alertness",
            Category::Attitude => "attitude",
            Category::SafetyMargins => "safety-margins",
            Category::HazardAwareness => "hazard-awareness",
            Category::VulnerableRoadUsers => "vulnerable-road-users",
            Category::RoadSigns => "road-signs",
            Category::RulesOfTheRoad => "rules-of-the-road",
            Category::MotorwayDriving => "motorway-driving",
        }
    }

    /// Human-readable name for display surfaces.
    #[must_use]
    pub fn title(&self) -> &'static str {
        match self {
            Category::Alertness => "Alertness",
            Category::Attitude => "Attitude",
            Category::SafetyMargins => "Safety margins",
            Category::HazardAwareness => "Hazard awareness",
            Category::VulnerableRoadUsers => "Vulnerable road users",
            Category::RoadSigns => "Road signs",
            Category::RulesOfTheRoad => "Rules of the road",
            Category::MotorwayDriving => "Motorway driving",
        }
    }

    /// Parse a slug back into a category.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::UnknownCategory` for unrecognised input.
    pub fn parse(raw: &str) -> Result<Self, QuestionError> {
        Category::ALL
            .into_iter()
            .find(|category| category.as_str() == raw)
            .ok_or_else(|| QuestionError::UnknownCategory {
                raw: raw.to_string(),
            })
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

//
// ─── CHOICE INDEX ──────────────────────────────────────────────────────────────
//

/// Zero-based position of an answer choice on a question.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ChoiceIndex(u8);

impl ChoiceIndex {
    /// Creates a new `ChoiceIndex`
    #[must_use]
    pub fn new(index: u8) -> Self {
        Self(index)
    }

    /// Returns the underlying index
    #[must_use]
    pub fn value(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for ChoiceIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A multiple-choice theory question.
///
/// Invariants enforced at construction: a non-blank prompt, between
/// [`MIN_CHOICES`] and [`MAX_CHOICES`] non-blank choices, and a correct
/// index within range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    category: Category,
    prompt: String,
    choices: Vec<String>,
    correct: ChoiceIndex,
    explanation: Option<String>,
}

impl Question {
    /// Create a validated question.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the prompt or any choice is blank, the
    /// choice count is out of bounds, or the correct index does not point
    /// at a choice.
    pub fn new(
        id: QuestionId,
        category: Category,
        prompt: impl Into<String>,
        choices: Vec<String>,
        correct: ChoiceIndex,
        explanation: Option<String>,
    ) -> Result<Self, QuestionError> {
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            return Err(QuestionError::EmptyPrompt);
        }
        if choices.len() < MIN_CHOICES || choices.len() > MAX_CHOICES {
            return Err(QuestionError::ChoiceCount { len: choices.len() });
        }
        if let Some(index) = choices.iter().position(|choice| choice.trim().is_empty()) {
            return Err(QuestionError::EmptyChoice { index });
        }
        if usize::from(correct.value()) >= choices.len() {
            return Err(QuestionError::CorrectOutOfRange {
                index: correct.value(),
                len: choices.len(),
            });
        }

        Ok(Self {
            id,
            category,
            prompt,
            choices,
            correct,
            explanation,
        })
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn category(&self) -> Category {
        self.category
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn choices(&self) -> &[String] {
        &self.choices
    }

    #[must_use]
    pub fn choice_count(&self) -> usize {
        self.choices.len()
    }

    #[must_use]
    pub fn correct(&self) -> ChoiceIndex {
        self.correct
    }

    #[must_use]
    pub fn explanation(&self) -> Option<&str> {
        self.explanation.as_deref()
    }

    /// Returns true when the given choice exists on this question.
    #[must_use]
    pub fn has_choice(&self, choice: ChoiceIndex) -> bool {
        usize::from(choice.value()) < self.choices.len()
    }

    /// Returns true when the given choice is the correct answer.
    #[must_use]
    pub fn is_correct(&self, choice: ChoiceIndex) -> bool {
        self.correct == choice
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn choices(texts: &[&str]) -> Vec<String> {
        texts.iter().map(ToString::to_string).collect()
    }

    fn build_question() -> Question {
        Question::new(
            QuestionId::new(1),
            Category::Alertness,
            "What should you do before moving off?",
            choices(&["Sound the horn", "Check mirrors and blind spots", "Flash headlights"]),
            ChoiceIndex::new(1),
            Some("Observation before moving off prevents pulling into passing traffic.".into()),
        )
        .unwrap()
    }

    #[test]
    fn builds_valid_question() {
        let question = build_question();
        assert_eq!(question.choice_count(), 3);
        assert!(question.is_correct(ChoiceIndex::new(1)));
        assert!(!question.is_correct(ChoiceIndex::new(0)));
    }

    #[test]
    fn rejects_blank_prompt() {
        let result = Question::new(
            QuestionId::new(1),
            Category::Attitude,
            "   ",
            choices(&["A", "B"]),
            ChoiceIndex::new(0),
            None,
        );
        assert_eq!(result.unwrap_err(), QuestionError::EmptyPrompt);
    }

    #[test]
    fn rejects_single_choice() {
        let result = Question::new(
            QuestionId::new(1),
            Category::Attitude,
            "Prompt",
            choices(&["Only one"]),
            ChoiceIndex::new(0),
            None,
        );
        assert_eq!(result.unwrap_err(), QuestionError::ChoiceCount { len: 1 });
    }

    #[test]
    fn rejects_too_many_choices() {
        let result = Question::new(
            QuestionId::new(1),
            Category::Attitude,
            "Prompt",
            choices(&["A", "B", "C", "D", "E", "F", "G"]),
            ChoiceIndex::new(0),
            None,
        );
        assert_eq!(result.unwrap_err(), QuestionError::ChoiceCount { len: 7 });
    }

    #[test]
    fn rejects_blank_choice() {
        let result = Question::new(
            QuestionId::new(1),
            Category::Attitude,
            "Prompt",
            choices(&["A", " "]),
            ChoiceIndex::new(0),
            None,
        );
        assert_eq!(result.unwrap_err(), QuestionError::EmptyChoice { index: 1 });
    }

    #[test]
    fn rejects_correct_index_out_of_range() {
        let result = Question::new(
            QuestionId::new(1),
            Category::Attitude,
            "Prompt",
            choices(&["A", "B"]),
            ChoiceIndex::new(2),
            None,
        );
        assert_eq!(
            result.unwrap_err(),
            QuestionError::CorrectOutOfRange { index: 2, len: 2 }
        );
    }

    #[test]
    fn category_slug_roundtrip() {
        for category in Category::ALL {
            assert_eq!(Category::parse(category.as_str()).unwrap(), category);
        }
    }

    #[test]
    fn category_parse_rejects_unknown() {
        let err = Category::parse("night-driving").unwrap_err();
        assert_eq!(
            err,
            QuestionError::UnknownCategory {
                raw: "night-driving".to_string()
            }
        );
    }

    #[test]
    fn category_serde_uses_slugs() {
        let json = serde_json::to_string(&Category::VulnerableRoadUsers).unwrap();
        assert_eq!(json, "\"vulnerable-road-users\"");
        let back: Category = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Category::VulnerableRoadUsers);
    }
}
