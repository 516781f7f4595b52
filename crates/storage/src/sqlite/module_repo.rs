use theory_core::model::{LearningModule, ModuleId, ModuleProgress};

use super::{
    SqliteRepository,
    mapping::{id_to_i64, map_module_progress_row, map_module_row},
};
use crate::repository::{ModuleRepository, StorageError};

#[async_trait::async_trait]
impl ModuleRepository for SqliteRepository {
    async fn upsert_module(&self, module: &LearningModule) -> Result<(), StorageError> {
        let id = id_to_i64("module_id", module.id().value())?;

        sqlx::query(
            r"
                INSERT INTO modules (id, category, title, summary)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(id) DO UPDATE SET
                    category = excluded.category,
                    title = excluded.title,
                    summary = excluded.summary
            ",
        )
        .bind(id)
        .bind(module.category().as_str())
        .bind(module.title())
        .bind(module.summary())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn get_module(&self, id: ModuleId) -> Result<Option<LearningModule>, StorageError> {
        let row = sqlx::query("SELECT id, category, title, summary FROM modules WHERE id = ?1")
            .bind(id_to_i64("module_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_module_row).transpose()
    }

    async fn list_modules(&self) -> Result<Vec<LearningModule>, StorageError> {
        let rows =
            sqlx::query("SELECT id, category, title, summary FROM modules ORDER BY id ASC")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| StorageError::Connection(e.to_string()))?;

        rows.iter().map(map_module_row).collect()
    }

    async fn get_module_progress(
        &self,
        id: ModuleId,
    ) -> Result<Option<ModuleProgress>, StorageError> {
        let row = sqlx::query(
            "SELECT module_id, status, updated_at FROM module_progress WHERE module_id = ?1",
        )
        .bind(id_to_i64("module_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_module_progress_row).transpose()
    }

    async fn save_module_progress(&self, progress: &ModuleProgress) -> Result<(), StorageError> {
        let module_id = id_to_i64("module_id", progress.module_id().value())?;

        sqlx::query(
            r"
                INSERT INTO module_progress (module_id, status, updated_at)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(module_id) DO UPDATE SET
                    status = excluded.status,
                    updated_at = excluded.updated_at
            ",
        )
        .bind(module_id)
        .bind(progress.status().as_str())
        .bind(progress.updated_at())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn list_module_progress(&self) -> Result<Vec<ModuleProgress>, StorageError> {
        let rows = sqlx::query(
            "SELECT module_id, status, updated_at FROM module_progress ORDER BY module_id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        rows.iter().map(map_module_progress_row).collect()
    }
}
