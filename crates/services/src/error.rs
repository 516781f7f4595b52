//! Shared error types for the services crate.

use thiserror::Error;

use theory_core::model::{
    Category, ChoiceIndex, ModuleError, ModuleId, QuestionId, QuizError, ScoreError,
};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

use crate::sync::RemoteError;

/// Errors emitted by `CoachService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CoachError {
    #[error("the coach is not configured")]
    Disabled,
    #[error("the coach returned an empty response")]
    EmptyResponse,
    #[error("coach request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Errors emitted by quiz services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizFlowError {
    #[error("no questions available for category {category:?}")]
    Empty { category: Option<Category> },
    #[error("question {question_id} has no choice {choice} (only {available} choices)")]
    InvalidChoice {
        question_id: QuestionId,
        choice: ChoiceIndex,
        available: usize,
    },
    #[error("loaded questions do not match the stored session")]
    QuestionMismatch,
    #[error(transparent)]
    Session(#[from] QuizError),
    #[error(transparent)]
    Score(#[from] ScoreError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by the sync layer.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SyncError {
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error(transparent)]
    Session(#[from] QuizError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ProgressService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressServiceError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ModuleService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ModuleServiceError {
    #[error("module {0} does not exist")]
    UnknownModule(ModuleId),
    #[error(transparent)]
    Module(#[from] ModuleError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `LeaderboardService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LeaderboardError {
    #[error("the leaderboard requires a configured remote")]
    Disabled,
    #[error(transparent)]
    Remote(#[from] RemoteError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Sync(#[from] SyncError),
}
