use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use theory_core::model::{
    BonusTier, Category, LearningModule, ModuleId, ModuleProgress, ProgressRecord, Question,
    QuestionId, QuizSnapshot, QuizStatus, SessionId, UserId,
};

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Persisted result of one finished quiz.
///
/// Written once at completion and never updated; the attempt history is
/// the learner's permanent score log. `id` is assigned by the backend on
/// insert.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptRecord {
    pub id: Option<i64>,
    pub session_id: SessionId,
    pub user_id: Option<UserId>,
    pub correct: u32,
    pub total: u32,
    pub percent: u32,
    pub tier: BonusTier,
    pub points_awarded: u32,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

//
// ─── REPOSITORY CONTRACTS ──────────────────────────────────────────────────────
//

/// Repository contract for the question bank.
#[async_trait]
pub trait QuestionRepository: Send + Sync {
    /// Persist or update a question.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the question cannot be stored.
    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError>;

    /// Fetch questions by id, in the order the ids were given.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if any are missing, or other storage errors.
    async fn get_questions(&self, ids: &[QuestionId]) -> Result<Vec<Question>, StorageError>;

    /// List questions across all categories, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the query fails.
    async fn list_questions(&self, limit: u32) -> Result<Vec<Question>, StorageError>;

    /// List questions in one category, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the query fails.
    async fn list_by_category(
        &self,
        category: Category,
        limit: u32,
    ) -> Result<Vec<Question>, StorageError>;
}

/// Repository contract for quiz session snapshots.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Persist or update a session snapshot.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the snapshot cannot be stored.
    async fn upsert_session(
        &self,
        user_id: Option<&UserId>,
        snapshot: &QuizSnapshot,
    ) -> Result<(), StorageError>;

    /// Fetch one session snapshot by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the query fails.
    async fn get_session(&self, id: SessionId) -> Result<Option<QuizSnapshot>, StorageError>;

    /// The most recently touched in-progress session, if any.
    ///
    /// This is what "resume" picks up after an app restart.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the query fails.
    async fn latest_in_progress(&self) -> Result<Option<QuizSnapshot>, StorageError>;
}

/// Repository contract for the attempt history.
#[async_trait]
pub trait AttemptRepository: Send + Sync {
    /// Append a finished attempt, returning its assigned row id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the attempt cannot be stored.
    async fn append_attempt(&self, attempt: &AttemptRecord) -> Result<i64, StorageError>;

    /// Most recent attempts, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the query fails.
    async fn list_recent(&self, limit: u32) -> Result<Vec<AttemptRecord>, StorageError>;
}

/// Repository contract for the single local progress record.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Load the device's progress record, if one was ever saved.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the query fails.
    async fn load_progress(&self) -> Result<Option<ProgressRecord>, StorageError>;

    /// Persist the device's progress record.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be stored.
    async fn save_progress(&self, record: &ProgressRecord) -> Result<(), StorageError>;
}

/// Repository contract for learning modules and their per-learner status.
#[async_trait]
pub trait ModuleRepository: Send + Sync {
    /// Persist or update a module definition.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the module cannot be stored.
    async fn upsert_module(&self, module: &LearningModule) -> Result<(), StorageError>;

    /// Fetch one module by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the query fails.
    async fn get_module(&self, id: ModuleId) -> Result<Option<LearningModule>, StorageError>;

    /// All modules, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the query fails.
    async fn list_modules(&self) -> Result<Vec<LearningModule>, StorageError>;

    /// The learner's status on one module, if recorded.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the query fails.
    async fn get_module_progress(
        &self,
        id: ModuleId,
    ) -> Result<Option<ModuleProgress>, StorageError>;

    /// Persist the learner's status on one module.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the status cannot be stored.
    async fn save_module_progress(&self, progress: &ModuleProgress) -> Result<(), StorageError>;

    /// All recorded module statuses.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the query fails.
    async fn list_module_progress(&self) -> Result<Vec<ModuleProgress>, StorageError>;
}

//
// ─── IN-MEMORY BACKEND ─────────────────────────────────────────────────────────
//

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    questions: Arc<Mutex<HashMap<QuestionId, Question>>>,
    sessions: Arc<Mutex<HashMap<SessionId, (Option<UserId>, QuizSnapshot)>>>,
    attempts: Arc<Mutex<Vec<AttemptRecord>>>,
    progress: Arc<Mutex<Option<ProgressRecord>>>,
    modules: Arc<Mutex<HashMap<ModuleId, LearningModule>>>,
    module_progress: Arc<Mutex<HashMap<ModuleId, ModuleProgress>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(err: std::sync::PoisonError<T>) -> StorageError {
    StorageError::Connection(err.to_string())
}

#[async_trait]
impl QuestionRepository for InMemoryRepository {
    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError> {
        let mut guard = self.questions.lock().map_err(poisoned)?;
        guard.insert(question.id(), question.clone());
        Ok(())
    }

    async fn get_questions(&self, ids: &[QuestionId]) -> Result<Vec<Question>, StorageError> {
        let guard = self.questions.lock().map_err(poisoned)?;
        let mut found = Vec::with_capacity(ids.len());
        for id in ids {
            match guard.get(id) {
                Some(question) => found.push(question.clone()),
                None => return Err(StorageError::NotFound),
            }
        }
        Ok(found)
    }

    async fn list_questions(&self, limit: u32) -> Result<Vec<Question>, StorageError> {
        let guard = self.questions.lock().map_err(poisoned)?;
        let mut all: Vec<Question> = guard.values().cloned().collect();
        all.sort_by_key(Question::id);
        all.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(all)
    }

    async fn list_by_category(
        &self,
        category: Category,
        limit: u32,
    ) -> Result<Vec<Question>, StorageError> {
        let guard = self.questions.lock().map_err(poisoned)?;
        let mut matching: Vec<Question> = guard
            .values()
            .filter(|question| question.category() == category)
            .cloned()
            .collect();
        matching.sort_by_key(Question::id);
        matching.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(matching)
    }
}

#[async_trait]
impl SessionRepository for InMemoryRepository {
    async fn upsert_session(
        &self,
        user_id: Option<&UserId>,
        snapshot: &QuizSnapshot,
    ) -> Result<(), StorageError> {
        let mut guard = self.sessions.lock().map_err(poisoned)?;
        guard.insert(
            snapshot.session_id,
            (user_id.cloned(), snapshot.clone()),
        );
        Ok(())
    }

    async fn get_session(&self, id: SessionId) -> Result<Option<QuizSnapshot>, StorageError> {
        let guard = self.sessions.lock().map_err(poisoned)?;
        Ok(guard.get(&id).map(|(_, snapshot)| snapshot.clone()))
    }

    async fn latest_in_progress(&self) -> Result<Option<QuizSnapshot>, StorageError> {
        let guard = self.sessions.lock().map_err(poisoned)?;
        Ok(guard
            .values()
            .map(|(_, snapshot)| snapshot)
            .filter(|snapshot| snapshot.status == QuizStatus::InProgress)
            .max_by_key(|snapshot| (snapshot.updated_at, snapshot.revision))
            .cloned())
    }
}

#[async_trait]
impl AttemptRepository for InMemoryRepository {
    async fn append_attempt(&self, attempt: &AttemptRecord) -> Result<i64, StorageError> {
        let mut guard = self.attempts.lock().map_err(poisoned)?;
        let id = i64::try_from(guard.len() + 1)
            .map_err(|_| StorageError::Serialization("attempt id overflow".into()))?;
        let mut stored = attempt.clone();
        stored.id = Some(id);
        guard.push(stored);
        Ok(id)
    }

    async fn list_recent(&self, limit: u32) -> Result<Vec<AttemptRecord>, StorageError> {
        let guard = self.attempts.lock().map_err(poisoned)?;
        let mut all: Vec<AttemptRecord> = guard.clone();
        all.sort_by_key(|attempt| std::cmp::Reverse((attempt.completed_at, attempt.id)));
        all.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(all)
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn load_progress(&self) -> Result<Option<ProgressRecord>, StorageError> {
        let guard = self.progress.lock().map_err(poisoned)?;
        Ok(guard.clone())
    }

    async fn save_progress(&self, record: &ProgressRecord) -> Result<(), StorageError> {
        let mut guard = self.progress.lock().map_err(poisoned)?;
        *guard = Some(record.clone());
        Ok(())
    }
}

#[async_trait]
impl ModuleRepository for InMemoryRepository {
    async fn upsert_module(&self, module: &LearningModule) -> Result<(), StorageError> {
        let mut guard = self.modules.lock().map_err(poisoned)?;
        guard.insert(module.id(), module.clone());
        Ok(())
    }

    async fn get_module(&self, id: ModuleId) -> Result<Option<LearningModule>, StorageError> {
        let guard = self.modules.lock().map_err(poisoned)?;
        Ok(guard.get(&id).cloned())
    }

    async fn list_modules(&self) -> Result<Vec<LearningModule>, StorageError> {
        let guard = self.modules.lock().map_err(poisoned)?;
        let mut all: Vec<LearningModule> = guard.values().cloned().collect();
        all.sort_by_key(LearningModule::id);
        Ok(all)
    }

    async fn get_module_progress(
        &self,
        id: ModuleId,
    ) -> Result<Option<ModuleProgress>, StorageError> {
        let guard = self.module_progress.lock().map_err(poisoned)?;
        Ok(guard.get(&id).copied())
    }

    async fn save_module_progress(&self, progress: &ModuleProgress) -> Result<(), StorageError> {
        let mut guard = self.module_progress.lock().map_err(poisoned)?;
        guard.insert(progress.module_id(), *progress);
        Ok(())
    }

    async fn list_module_progress(&self) -> Result<Vec<ModuleProgress>, StorageError> {
        let guard = self.module_progress.lock().map_err(poisoned)?;
        let mut all: Vec<ModuleProgress> = guard.values().copied().collect();
        all.sort_by_key(ModuleProgress::module_id);
        Ok(all)
    }
}

//
// ─── STORAGE AGGREGATE ─────────────────────────────────────────────────────────
//

/// Aggregates all repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub questions: Arc<dyn QuestionRepository>,
    pub sessions: Arc<dyn SessionRepository>,
    pub attempts: Arc<dyn AttemptRepository>,
    pub progress: Arc<dyn ProgressRepository>,
    pub modules: Arc<dyn ModuleRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let questions: Arc<dyn QuestionRepository> = Arc::new(repo.clone());
        let sessions: Arc<dyn SessionRepository> = Arc::new(repo.clone());
        let attempts: Arc<dyn AttemptRepository> = Arc::new(repo.clone());
        let progress: Arc<dyn ProgressRepository> = Arc::new(repo.clone());
        let modules: Arc<dyn ModuleRepository> = Arc::new(repo);
        Self {
            questions,
            sessions,
            attempts,
            progress,
            modules,
        }
    }
}
