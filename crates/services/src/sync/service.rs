use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::Instant;

use theory_core::model::{
    ProgressRecord, QuizSession, QuizSnapshot, QuizStatus, SessionId, UserId,
};
use storage::repository::{AttemptRecord, ProgressRepository, SessionRepository};

use super::remote::RemoteStore;
use crate::error::SyncError;

const EVENT_CHANNEL_CAPACITY: usize = 64;

enum SyncEvent {
    SessionChanged(QuizSnapshot),
    SessionCompleted(QuizSnapshot),
    AttemptRecorded(AttemptRecord),
    ProgressChanged(ProgressRecord),
    Flush(oneshot::Sender<()>),
}

//
// ─── SYNC HANDLE ───────────────────────────────────────────────────────────────
//

/// Cheap cloneable handle other services use to queue sync work.
///
/// Every method is fire-and-forget: queueing never blocks the caller, and
/// when the queue is full the update is dropped (a later snapshot
/// supersedes it anyway).
#[derive(Clone)]
pub struct SyncHandle {
    events: mpsc::Sender<SyncEvent>,
    shutdown: broadcast::Sender<()>,
}

impl SyncHandle {
    /// Queue a session snapshot for a debounced upload.
    pub fn session_changed(&self, snapshot: QuizSnapshot) {
        self.send(SyncEvent::SessionChanged(snapshot));
    }

    /// Queue an immediate upload for a finished session.
    pub fn session_completed(&self, snapshot: QuizSnapshot) {
        self.send(SyncEvent::SessionCompleted(snapshot));
    }

    /// Queue an immediate append of a finished attempt.
    pub fn attempt_recorded(&self, attempt: AttemptRecord) {
        self.send(SyncEvent::AttemptRecorded(attempt));
    }

    /// Queue an immediate upload of the progress record.
    pub fn progress_changed(&self, record: ProgressRecord) {
        self.send(SyncEvent::ProgressChanged(record));
    }

    fn send(&self, event: SyncEvent) {
        if self.events.try_send(event).is_err() {
            tracing::warn!("sync queue unavailable; dropping update");
        }
    }

    /// Wait until every queued upload, including a pending debounce, has
    /// been attempted.
    pub async fn flush(&self) {
        let (tx, rx) = oneshot::channel();
        if self.events.send(SyncEvent::Flush(tx)).await.is_ok() {
            let _ = rx.await;
        }
    }

    /// Stop the background worker after a final flush.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(());
    }
}

//
// ─── SESSION SYNC SERVICE ──────────────────────────────────────────────────────
//

/// Mirrors local quiz state to the remote backend.
///
/// Rapid-fire session edits collapse into one upload per quiet period;
/// every other event goes out immediately. Uploads are best effort: a
/// failure is logged and the update dropped, never surfaced to the
/// learner.
pub struct SessionSyncService {
    remote: Arc<dyn RemoteStore>,
    user: Option<UserId>,
    debounce: Duration,
}

impl SessionSyncService {
    #[must_use]
    pub fn new(remote: Arc<dyn RemoteStore>, user: Option<UserId>, debounce: Duration) -> Self {
        Self {
            remote,
            user,
            debounce,
        }
    }

    /// Spawn the background upload worker.
    ///
    /// Call once; the returned handle can be cloned freely.
    #[must_use]
    pub fn start(&self) -> SyncHandle {
        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let worker = SyncWorker {
            remote: Arc::clone(&self.remote),
            user: self.user.clone(),
            debounce: self.debounce,
            pending: None,
        };
        tokio::spawn(worker.run(events_rx, shutdown_rx));

        SyncHandle {
            events: events_tx,
            shutdown: shutdown_tx,
        }
    }

    /// Adopt the remote copy of the resumable session when it is newer.
    ///
    /// With a local in-progress session, the remote copy wins only when its
    /// revision is strictly greater. Without one, the remote's latest
    /// in-progress session is adopted as-is. Returns the adopted session id.
    ///
    /// # Errors
    ///
    /// Returns `SyncError` when the remote or local storage fails, or when
    /// the remote snapshot is not internally consistent.
    pub async fn hydrate_session(
        &self,
        sessions: &dyn SessionRepository,
    ) -> Result<Option<SessionId>, SyncError> {
        match sessions.latest_in_progress().await? {
            Some(local) => {
                let remote = self
                    .remote
                    .fetch_session(self.user.as_ref(), local.session_id)
                    .await?;
                match remote {
                    Some(remote) if remote.revision > local.revision => {
                        self.adopt(sessions, remote).await
                    }
                    _ => Ok(None),
                }
            }
            None => {
                let remote = self.remote.fetch_latest_session(self.user.as_ref()).await?;
                match remote {
                    Some(remote) if remote.status == QuizStatus::InProgress => {
                        self.adopt(sessions, remote).await
                    }
                    _ => Ok(None),
                }
            }
        }
    }

    async fn adopt(
        &self,
        sessions: &dyn SessionRepository,
        snapshot: QuizSnapshot,
    ) -> Result<Option<SessionId>, SyncError> {
        // Reject corrupt remote state before it reaches local storage.
        QuizSession::from_snapshot(snapshot.clone())?;
        sessions
            .upsert_session(self.user.as_ref(), &snapshot)
            .await?;
        Ok(Some(snapshot.session_id))
    }

    /// Fold the remote progress record into an empty local one.
    ///
    /// The merge is additive, so a local record that already holds counters
    /// is left untouched. Returns true when remote progress was taken on.
    ///
    /// # Errors
    ///
    /// Returns `SyncError` when the remote or local storage fails.
    pub async fn hydrate_progress(
        &self,
        progress: &dyn ProgressRepository,
    ) -> Result<bool, SyncError> {
        let local = progress.load_progress().await?;
        if local.as_ref().is_some_and(|record| !record.is_empty()) {
            return Ok(false);
        }

        let Some(remote) = self.remote.fetch_progress(self.user.as_ref()).await? else {
            return Ok(false);
        };
        if remote.is_empty() {
            return Ok(false);
        }

        let mut merged = local.unwrap_or_else(|| ProgressRecord::new(remote.updated_at()));
        merged.merge(&remote);
        progress.save_progress(&merged).await?;
        Ok(true)
    }
}

//
// ─── WORKER ────────────────────────────────────────────────────────────────────
//

struct SyncWorker {
    remote: Arc<dyn RemoteStore>,
    user: Option<UserId>,
    debounce: Duration,
    pending: Option<QuizSnapshot>,
}

impl SyncWorker {
    async fn run(
        mut self,
        mut events: mpsc::Receiver<SyncEvent>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        let mut deadline: Option<Instant> = None;
        loop {
            let wake_at = deadline.unwrap_or_else(Instant::now);
            tokio::select! {
                event = events.recv() => match event {
                    Some(SyncEvent::SessionChanged(snapshot)) => {
                        self.flush_other_session(&snapshot).await;
                        self.stage(snapshot);
                        deadline = Some(Instant::now() + self.debounce);
                    }
                    Some(SyncEvent::SessionCompleted(snapshot)) => {
                        self.flush_other_session(&snapshot).await;
                        self.stage(snapshot);
                        deadline = None;
                        self.flush_pending().await;
                    }
                    Some(SyncEvent::AttemptRecorded(attempt)) => {
                        self.push_attempt(&attempt).await;
                    }
                    Some(SyncEvent::ProgressChanged(record)) => {
                        self.push_progress(&record).await;
                    }
                    Some(SyncEvent::Flush(ack)) => {
                        deadline = None;
                        self.flush_pending().await;
                        let _ = ack.send(());
                    }
                    None => {
                        self.flush_pending().await;
                        break;
                    }
                },
                () = tokio::time::sleep_until(wake_at), if deadline.is_some() => {
                    deadline = None;
                    self.flush_pending().await;
                }
                _ = shutdown.recv() => {
                    self.flush_pending().await;
                    break;
                }
            }
        }
    }

    /// Latest-wins staging; an older revision never replaces a newer one.
    fn stage(&mut self, snapshot: QuizSnapshot) {
        let stale = self.pending.as_ref().is_some_and(|pending| {
            pending.session_id == snapshot.session_id && pending.revision > snapshot.revision
        });
        if !stale {
            self.pending = Some(snapshot);
        }
    }

    /// A pending snapshot for a different session must not be silently
    /// superseded; push it out before staging the incoming one.
    async fn flush_other_session(&mut self, incoming: &QuizSnapshot) {
        if self
            .pending
            .as_ref()
            .is_some_and(|pending| pending.session_id != incoming.session_id)
        {
            self.flush_pending().await;
        }
    }

    async fn flush_pending(&mut self) {
        let Some(snapshot) = self.pending.take() else {
            return;
        };
        if let Err(error) = self.remote.push_session(self.user.as_ref(), &snapshot).await {
            tracing::warn!(
                session = %snapshot.session_id,
                %error,
                "session sync failed; dropping update"
            );
        }
    }

    async fn push_attempt(&self, attempt: &AttemptRecord) {
        if let Err(error) = self.remote.push_attempt(self.user.as_ref(), attempt).await {
            tracing::warn!(
                session = %attempt.session_id,
                %error,
                "attempt sync failed; dropping update"
            );
        }
    }

    async fn push_progress(&self, record: &ProgressRecord) {
        if let Err(error) = self.remote.push_progress(self.user.as_ref(), record).await {
            tracing::warn!(%error, "progress sync failed; dropping update");
        }
    }
}
