use std::collections::HashMap;
use std::sync::Arc;

use theory_core::model::{
    LearningModule, MasteryAward, ModuleId, ModuleProgress, ModuleStatus, ProgressRecord,
};
use storage::repository::{ModuleRepository, ProgressRepository};

use crate::Clock;
use crate::error::ModuleServiceError;
use crate::sync::SyncHandle;

/// A module definition joined with the learner's status on it.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleOverview {
    pub module: LearningModule,
    pub status: ModuleStatus,
}

/// Learning module catalogue and mastery tracking.
#[derive(Clone)]
pub struct ModuleService {
    clock: Clock,
    modules: Arc<dyn ModuleRepository>,
    progress: Arc<dyn ProgressRepository>,
    sync: Option<SyncHandle>,
}

impl ModuleService {
    #[must_use]
    pub fn new(
        clock: Clock,
        modules: Arc<dyn ModuleRepository>,
        progress: Arc<dyn ProgressRepository>,
    ) -> Self {
        Self {
            clock,
            modules,
            progress,
            sync: None,
        }
    }

    #[must_use]
    pub fn with_sync(mut self, sync: SyncHandle) -> Self {
        self.sync = Some(sync);
        self
    }

    /// All modules with the learner's status on each, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `ModuleServiceError` when storage fails.
    pub async fn list(&self) -> Result<Vec<ModuleOverview>, ModuleServiceError> {
        let modules = self.modules.list_modules().await?;
        let statuses = self.modules.list_module_progress().await?;
        let by_id: HashMap<ModuleId, ModuleStatus> = statuses
            .iter()
            .map(|progress| (progress.module_id(), progress.status()))
            .collect();

        Ok(modules
            .into_iter()
            .map(|module| {
                let status = by_id
                    .get(&module.id())
                    .copied()
                    .unwrap_or(ModuleStatus::NotStarted);
                ModuleOverview { module, status }
            })
            .collect())
    }

    /// Record that the learner has worked through a module's material.
    ///
    /// Idempotent, and never demotes a mastered module.
    ///
    /// # Errors
    ///
    /// Returns `ModuleServiceError::UnknownModule` for an id with no
    /// definition, or a storage error.
    pub async fn mark_studied(&self, id: ModuleId) -> Result<ModuleStatus, ModuleServiceError> {
        let (progress, _) = self.promote(id, ModuleStatus::Studied).await?;
        Ok(progress.status())
    }

    /// Record that the learner has mastered a module.
    ///
    /// Mastery points are granted on the first transition; repeating the
    /// call normally changes nothing and returns `None`. The promotion and
    /// the award are two separate writes, so a failed award leaves a
    /// mastered module with its points still owed. A repeat call settles
    /// that debt instead of skipping it.
    ///
    /// # Errors
    ///
    /// Returns `ModuleServiceError::UnknownModule` for an id with no
    /// definition, or a storage error.
    pub async fn mark_mastered(
        &self,
        id: ModuleId,
    ) -> Result<Option<MasteryAward>, ModuleServiceError> {
        let (_, promoted) = self.promote(id, ModuleStatus::Mastered).await?;

        let now = self.clock.now();
        let mut record = match self.progress.load_progress().await? {
            Some(record) => record,
            None => ProgressRecord::new(now),
        };
        if !promoted && !self.award_outstanding(&record).await? {
            return Ok(None);
        }

        let award = MasteryAward::for_module_mastery();
        record.record_module_mastery(award, now);
        self.progress.save_progress(&record).await?;

        if let Some(sync) = &self.sync {
            sync.progress_changed(record);
        }
        Ok(Some(award))
    }

    /// Whether the points counter has fallen behind the stored masteries.
    async fn award_outstanding(
        &self,
        record: &ProgressRecord,
    ) -> Result<bool, ModuleServiceError> {
        let mastered = self
            .modules
            .list_module_progress()
            .await?
            .iter()
            .filter(|progress| progress.status() == ModuleStatus::Mastered)
            .count();
        let mastered = u32::try_from(mastered).unwrap_or(u32::MAX);
        Ok(record.modules_mastered() < mastered)
    }

    async fn promote(
        &self,
        id: ModuleId,
        to: ModuleStatus,
    ) -> Result<(ModuleProgress, bool), ModuleServiceError> {
        if self.modules.get_module(id).await?.is_none() {
            return Err(ModuleServiceError::UnknownModule(id));
        }

        let now = self.clock.now();
        let mut progress = match self.modules.get_module_progress(id).await? {
            Some(progress) => progress,
            None => ModuleProgress::new(id, now),
        };
        let promoted = progress.promote(to, now);
        if promoted {
            self.modules.save_module_progress(&progress).await?;
        }
        Ok((progress, promoted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use storage::repository::{InMemoryRepository, StorageError};
    use theory_core::model::Category;
    use theory_core::time::fixed_clock;

    fn sample_module() -> LearningModule {
        LearningModule::new(
            ModuleId::new(1),
            Category::RoadSigns,
            "Signs and signals",
            "Shapes, colours and meanings.",
        )
        .unwrap()
    }

    async fn seeded_service() -> (ModuleService, InMemoryRepository) {
        let repo = InMemoryRepository::new();
        repo.upsert_module(&sample_module()).await.unwrap();

        let service = ModuleService::new(
            fixed_clock(),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
        );
        (service, repo)
    }

    struct FailingOnceProgress {
        inner: InMemoryRepository,
        fail_next_save: AtomicBool,
    }

    #[async_trait]
    impl ProgressRepository for FailingOnceProgress {
        async fn load_progress(&self) -> Result<Option<ProgressRecord>, StorageError> {
            self.inner.load_progress().await
        }

        async fn save_progress(&self, record: &ProgressRecord) -> Result<(), StorageError> {
            if self.fail_next_save.swap(false, Ordering::SeqCst) {
                return Err(StorageError::Connection("injected write failure".into()));
            }
            self.inner.save_progress(record).await
        }
    }

    #[tokio::test]
    async fn list_defaults_to_not_started() {
        let (service, _repo) = seeded_service().await;
        let listed = service.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].status, ModuleStatus::NotStarted);
    }

    #[tokio::test]
    async fn studying_then_mastering_awards_once() {
        let (service, repo) = seeded_service().await;

        assert_eq!(
            service.mark_studied(ModuleId::new(1)).await.unwrap(),
            ModuleStatus::Studied
        );

        let award = service.mark_mastered(ModuleId::new(1)).await.unwrap();
        assert_eq!(award.map(|a| a.total()), Some(40));

        // Repeating the call must not double count.
        assert!(service.mark_mastered(ModuleId::new(1)).await.unwrap().is_none());

        let record = repo.load_progress().await.unwrap().unwrap();
        assert_eq!(record.mastery_points(), 40);
        assert_eq!(record.modules_mastered(), 1);
    }

    #[tokio::test]
    async fn mastered_module_is_never_demoted() {
        let (service, _repo) = seeded_service().await;
        service.mark_mastered(ModuleId::new(1)).await.unwrap();

        assert_eq!(
            service.mark_studied(ModuleId::new(1)).await.unwrap(),
            ModuleStatus::Mastered
        );
    }

    #[tokio::test]
    async fn unknown_module_is_rejected() {
        let (service, _repo) = seeded_service().await;
        assert!(matches!(
            service.mark_studied(ModuleId::new(9)).await,
            Err(ModuleServiceError::UnknownModule(_))
        ));
    }

    #[tokio::test]
    async fn retry_after_a_failed_award_write_grants_the_points() {
        let repo = InMemoryRepository::new();
        repo.upsert_module(&sample_module()).await.unwrap();

        let progress = FailingOnceProgress {
            inner: repo.clone(),
            fail_next_save: AtomicBool::new(true),
        };
        let service =
            ModuleService::new(fixed_clock(), Arc::new(repo.clone()), Arc::new(progress));

        // The promotion lands but the award write does not.
        assert!(service.mark_mastered(ModuleId::new(1)).await.is_err());
        let stored = repo.get_module_progress(ModuleId::new(1)).await.unwrap();
        assert_eq!(stored.map(|p| p.status()), Some(ModuleStatus::Mastered));
        assert!(repo.load_progress().await.unwrap().is_none());

        // Retrying settles the owed award exactly once.
        let award = service.mark_mastered(ModuleId::new(1)).await.unwrap();
        assert_eq!(award.map(|a| a.total()), Some(40));
        let record = repo.load_progress().await.unwrap().unwrap();
        assert_eq!(record.modules_mastered(), 1);
        assert_eq!(record.mastery_points(), 40);

        // And a further repeat is an ordinary no-op.
        assert!(
            service
                .mark_mastered(ModuleId::new(1))
                .await
                .unwrap()
                .is_none()
        );
    }
}
