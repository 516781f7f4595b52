use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use thiserror::Error;

use storage::repository::AttemptRecord;
use theory_core::model::{LeaderboardRow, ProgressRecord, QuizSnapshot, SessionId, UserId};

/// Errors surfaced by remote store adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RemoteError {
    #[error("remote request failed with status {0}")]
    Status(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("remote payload error: {0}")]
    Serialization(String),
    #[error("remote unavailable: {0}")]
    Unavailable(String),
}

/// Contract for the hosted backend the app mirrors its state to.
///
/// Session and progress writes are upserts where the newest payload for a
/// key wins on the remote side; attempts append to a history table.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Upload one session snapshot.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` when the request fails.
    async fn push_session(
        &self,
        user: Option<&UserId>,
        snapshot: &QuizSnapshot,
    ) -> Result<(), RemoteError>;

    /// Fetch one session snapshot by id.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` when the request fails.
    async fn fetch_session(
        &self,
        user: Option<&UserId>,
        id: SessionId,
    ) -> Result<Option<QuizSnapshot>, RemoteError>;

    /// Fetch the most recently updated session for the user, if any.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` when the request fails.
    async fn fetch_latest_session(
        &self,
        user: Option<&UserId>,
    ) -> Result<Option<QuizSnapshot>, RemoteError>;

    /// Append one finished attempt to the remote history.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` when the request fails.
    async fn push_attempt(
        &self,
        user: Option<&UserId>,
        attempt: &AttemptRecord,
    ) -> Result<(), RemoteError>;

    /// Upload the user's progress record.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` when the request fails.
    async fn push_progress(
        &self,
        user: Option<&UserId>,
        record: &ProgressRecord,
    ) -> Result<(), RemoteError>;

    /// Fetch the user's progress record, if the remote has one.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` when the request fails.
    async fn fetch_progress(
        &self,
        user: Option<&UserId>,
    ) -> Result<Option<ProgressRecord>, RemoteError>;

    /// Fetch leaderboard rows, best scores first.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` when the request fails.
    async fn fetch_leaderboard(&self, limit: u32) -> Result<Vec<LeaderboardRow>, RemoteError>;
}

//
// ─── RECORDING REMOTE ──────────────────────────────────────────────────────────
//

/// In-memory remote implementation for testing and offline prototyping.
///
/// Records every push so tests can assert on sync behaviour, and serves
/// whatever state was seeded into it.
#[derive(Default)]
pub struct RecordingRemote {
    sessions: Mutex<HashMap<SessionId, QuizSnapshot>>,
    attempts: Mutex<Vec<AttemptRecord>>,
    progress: Mutex<Option<ProgressRecord>>,
    leaderboard: Mutex<Vec<LeaderboardRow>>,
    session_pushes: AtomicUsize,
    attempt_pushes: AtomicUsize,
    progress_pushes: AtomicUsize,
    fail_pushes: AtomicBool,
}

fn poisoned<T>(err: std::sync::PoisonError<T>) -> RemoteError {
    RemoteError::Unavailable(err.to_string())
}

impl RecordingRemote {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of session snapshots pushed so far.
    #[must_use]
    pub fn session_push_count(&self) -> usize {
        self.session_pushes.load(Ordering::SeqCst)
    }

    /// Number of attempts pushed so far.
    #[must_use]
    pub fn attempt_push_count(&self) -> usize {
        self.attempt_pushes.load(Ordering::SeqCst)
    }

    /// Number of progress records pushed so far.
    #[must_use]
    pub fn progress_push_count(&self) -> usize {
        self.progress_pushes.load(Ordering::SeqCst)
    }

    /// Make every subsequent push fail until disabled again.
    pub fn set_fail_pushes(&self, fail: bool) {
        self.fail_pushes.store(fail, Ordering::SeqCst);
    }

    /// The last pushed (or seeded) snapshot for a session.
    #[must_use]
    pub fn stored_session(&self, id: SessionId) -> Option<QuizSnapshot> {
        self.sessions
            .lock()
            .ok()
            .and_then(|guard| guard.get(&id).cloned())
    }

    /// The last pushed (or seeded) progress record.
    #[must_use]
    pub fn stored_progress(&self) -> Option<ProgressRecord> {
        self.progress.lock().ok().and_then(|guard| guard.clone())
    }

    /// Every attempt pushed so far, oldest first.
    #[must_use]
    pub fn pushed_attempts(&self) -> Vec<AttemptRecord> {
        self.attempts
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    /// Place a session on the remote without counting it as a push.
    pub fn seed_session(&self, snapshot: QuizSnapshot) {
        if let Ok(mut guard) = self.sessions.lock() {
            guard.insert(snapshot.session_id, snapshot);
        }
    }

    /// Place a progress record on the remote without counting it as a push.
    pub fn seed_progress(&self, record: ProgressRecord) {
        if let Ok(mut guard) = self.progress.lock() {
            *guard = Some(record);
        }
    }

    /// Replace the remote leaderboard rows.
    pub fn seed_leaderboard(&self, rows: Vec<LeaderboardRow>) {
        if let Ok(mut guard) = self.leaderboard.lock() {
            *guard = rows;
        }
    }

    fn check_push(&self) -> Result<(), RemoteError> {
        if self.fail_pushes.load(Ordering::SeqCst) {
            return Err(RemoteError::Unavailable("simulated outage".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for RecordingRemote {
    async fn push_session(
        &self,
        _user: Option<&UserId>,
        snapshot: &QuizSnapshot,
    ) -> Result<(), RemoteError> {
        self.check_push()?;
        let mut guard = self.sessions.lock().map_err(poisoned)?;
        guard.insert(snapshot.session_id, snapshot.clone());
        self.session_pushes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn fetch_session(
        &self,
        _user: Option<&UserId>,
        id: SessionId,
    ) -> Result<Option<QuizSnapshot>, RemoteError> {
        let guard = self.sessions.lock().map_err(poisoned)?;
        Ok(guard.get(&id).cloned())
    }

    async fn fetch_latest_session(
        &self,
        _user: Option<&UserId>,
    ) -> Result<Option<QuizSnapshot>, RemoteError> {
        let guard = self.sessions.lock().map_err(poisoned)?;
        Ok(guard
            .values()
            .max_by_key(|snapshot| (snapshot.updated_at, snapshot.revision))
            .cloned())
    }

    async fn push_attempt(
        &self,
        _user: Option<&UserId>,
        attempt: &AttemptRecord,
    ) -> Result<(), RemoteError> {
        self.check_push()?;
        let mut guard = self.attempts.lock().map_err(poisoned)?;
        guard.push(attempt.clone());
        self.attempt_pushes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn push_progress(
        &self,
        _user: Option<&UserId>,
        record: &ProgressRecord,
    ) -> Result<(), RemoteError> {
        self.check_push()?;
        let mut guard = self.progress.lock().map_err(poisoned)?;
        *guard = Some(record.clone());
        self.progress_pushes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn fetch_progress(
        &self,
        _user: Option<&UserId>,
    ) -> Result<Option<ProgressRecord>, RemoteError> {
        let guard = self.progress.lock().map_err(poisoned)?;
        Ok(guard.clone())
    }

    async fn fetch_leaderboard(&self, limit: u32) -> Result<Vec<LeaderboardRow>, RemoteError> {
        let guard = self.leaderboard.lock().map_err(poisoned)?;
        let mut rows = guard.clone();
        rows.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(rows)
    }
}
