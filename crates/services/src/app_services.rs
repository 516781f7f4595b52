use std::sync::Arc;

use theory_core::model::{SessionId, UserId};
use storage::repository::Storage;

use crate::coach::CoachService;
use crate::error::{AppServicesError, SyncError};
use crate::leaderboard_service::LeaderboardService;
use crate::module_service::ModuleService;
use crate::progress_service::ProgressService;
use crate::quiz::QuizFlowService;
use crate::sync::{HttpRemoteStore, RemoteStore, SessionSyncService, SyncConfig, SyncHandle};
use crate::Clock;

/// What launch-time hydration pulled down from the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HydrationReport {
    pub progress_hydrated: bool,
    pub resumed_session: Option<SessionId>,
}

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    user_id: Option<UserId>,
    quiz_flow: Arc<QuizFlowService>,
    progress: Arc<ProgressService>,
    modules: Arc<ModuleService>,
    leaderboard: Arc<LeaderboardService>,
    coach: Arc<CoachService>,
    storage: Storage,
    sync: Option<Arc<SessionSyncService>>,
    sync_handle: Option<SyncHandle>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// Remote sync and the leaderboard switch on when the sync environment
    /// variables are present; without them the app runs fully offline.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        user_id: Option<UserId>,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::assemble(storage, clock, user_id, SyncConfig::from_env()))
    }

    /// Build fully offline services over in-memory storage.
    #[must_use]
    pub fn new_in_memory(clock: Clock, user_id: Option<UserId>) -> Self {
        Self::assemble(Storage::in_memory(), clock, user_id, None)
    }

    fn assemble(
        storage: Storage,
        clock: Clock,
        user_id: Option<UserId>,
        sync_config: Option<SyncConfig>,
    ) -> Self {
        let (sync, sync_handle, leaderboard) = match sync_config {
            Some(config) => {
                let debounce = config.debounce;
                let remote: Arc<dyn RemoteStore> = Arc::new(HttpRemoteStore::new(config));
                let leaderboard = LeaderboardService::new(Arc::clone(&remote));
                let service = Arc::new(SessionSyncService::new(remote, user_id.clone(), debounce));
                let handle = service.start();
                (Some(service), Some(handle), leaderboard)
            }
            None => (None, None, LeaderboardService::disabled()),
        };

        let mut quiz_flow = QuizFlowService::new(
            clock,
            Arc::clone(&storage.questions),
            Arc::clone(&storage.sessions),
            Arc::clone(&storage.attempts),
            Arc::clone(&storage.progress),
        );
        let mut modules = ModuleService::new(
            clock,
            Arc::clone(&storage.modules),
            Arc::clone(&storage.progress),
        );
        if let Some(handle) = &sync_handle {
            quiz_flow = quiz_flow.with_sync(handle.clone());
            modules = modules.with_sync(handle.clone());
        }
        if let Some(user) = &user_id {
            quiz_flow = quiz_flow.with_user(user.clone());
        }
        let progress = ProgressService::new(clock, Arc::clone(&storage.progress));

        Self {
            user_id,
            quiz_flow: Arc::new(quiz_flow),
            progress: Arc::new(progress),
            modules: Arc::new(modules),
            leaderboard: Arc::new(leaderboard),
            coach: Arc::new(CoachService::from_env()),
            storage,
            sync,
            sync_handle,
        }
    }

    #[must_use]
    pub fn user_id(&self) -> Option<&UserId> {
        self.user_id.as_ref()
    }

    #[must_use]
    pub fn quiz_flow(&self) -> Arc<QuizFlowService> {
        Arc::clone(&self.quiz_flow)
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress)
    }

    #[must_use]
    pub fn modules(&self) -> Arc<ModuleService> {
        Arc::clone(&self.modules)
    }

    #[must_use]
    pub fn leaderboard(&self) -> Arc<LeaderboardService> {
        Arc::clone(&self.leaderboard)
    }

    #[must_use]
    pub fn coach(&self) -> Arc<CoachService> {
        Arc::clone(&self.coach)
    }

    #[must_use]
    pub fn sync_enabled(&self) -> bool {
        self.sync.is_some()
    }

    /// Pull remote state down on launch: progress first, then the
    /// resumable session.
    ///
    /// Remote failures are logged and skipped so an offline start still
    /// works; only local storage failures abort.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` when local storage fails.
    pub async fn hydrate(&self) -> Result<HydrationReport, AppServicesError> {
        let Some(sync) = &self.sync else {
            return Ok(HydrationReport::default());
        };

        let mut report = HydrationReport::default();
        match sync.hydrate_progress(self.storage.progress.as_ref()).await {
            Ok(merged) => report.progress_hydrated = merged,
            Err(SyncError::Storage(error)) => return Err(error.into()),
            Err(error) => tracing::warn!(%error, "progress hydration skipped"),
        }
        match sync.hydrate_session(self.storage.sessions.as_ref()).await {
            Ok(adopted) => report.resumed_session = adopted,
            Err(SyncError::Storage(error)) => return Err(error.into()),
            Err(error) => tracing::warn!(%error, "session hydration skipped"),
        }
        Ok(report)
    }

    /// Flush pending sync work and stop the background worker.
    pub async fn shutdown(&self) {
        if let Some(handle) = &self.sync_handle {
            handle.flush().await;
            handle.shutdown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use theory_core::time::fixed_clock;

    #[tokio::test]
    async fn in_memory_assembly_runs_offline() {
        let services = AppServices::new_in_memory(fixed_clock(), None);
        assert!(!services.sync_enabled());
        assert!(!services.leaderboard().enabled());

        let report = services.hydrate().await.unwrap();
        assert_eq!(report, HydrationReport::default());

        services.shutdown().await;
    }
}
