use std::sync::Arc;

use theory_core::model::{Category, CategoryTally, ProgressRecord};
use storage::repository::ProgressRepository;

use crate::Clock;
use crate::error::ProgressServiceError;

/// One category's slice of the overview.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryProgress {
    pub category: Category,
    pub tally: CategoryTally,
    pub accuracy_percent: Option<u32>,
}

/// Lifetime progress shaped for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressOverview {
    pub categories: Vec<CategoryProgress>,
    pub overall: CategoryTally,
    pub mastery_points: u32,
    pub quizzes_completed: u32,
    pub modules_mastered: u32,
}

/// Read side of the lifetime progress record.
#[derive(Clone)]
pub struct ProgressService {
    clock: Clock,
    progress: Arc<dyn ProgressRepository>,
}

impl ProgressService {
    #[must_use]
    pub fn new(clock: Clock, progress: Arc<dyn ProgressRepository>) -> Self {
        Self { clock, progress }
    }

    /// The stored record, or a fresh empty one when nothing was saved yet.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError` when storage fails.
    pub async fn current(&self) -> Result<ProgressRecord, ProgressServiceError> {
        Ok(match self.progress.load_progress().await? {
            Some(record) => record,
            None => ProgressRecord::new(self.clock.now()),
        })
    }

    /// Overview covering every category, zero-filled where nothing has
    /// been recorded yet.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError` when storage fails.
    pub async fn overview(&self) -> Result<ProgressOverview, ProgressServiceError> {
        let record = self.current().await?;

        let categories = Category::ALL
            .iter()
            .map(|category| {
                let tally = record.tally(*category);
                CategoryProgress {
                    category: *category,
                    tally,
                    accuracy_percent: tally.accuracy_percent(),
                }
            })
            .collect();

        Ok(ProgressOverview {
            categories,
            overall: record.overall(),
            mastery_points: record.mastery_points(),
            quizzes_completed: record.quizzes_completed(),
            modules_mastered: record.modules_mastered(),
        })
    }
}
