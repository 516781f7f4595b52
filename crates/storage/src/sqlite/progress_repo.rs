use theory_core::model::ProgressRecord;

use super::{SqliteRepository, mapping::ser};
use crate::repository::{ProgressRepository, StorageError};

// The progress table keeps a single row (id = 1); the whole record is
// stored as one JSON document so tally keys never need schema changes.
#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn load_progress(&self) -> Result<Option<ProgressRecord>, StorageError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT record FROM progress WHERE id = 1")
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.map(|(record,)| serde_json::from_str(&record).map_err(ser))
            .transpose()
    }

    async fn save_progress(&self, record: &ProgressRecord) -> Result<(), StorageError> {
        let json = serde_json::to_string(record).map_err(ser)?;

        sqlx::query(
            r"
                INSERT INTO progress (id, record, updated_at)
                VALUES (1, ?1, ?2)
                ON CONFLICT(id) DO UPDATE SET
                    record = excluded.record,
                    updated_at = excluded.updated_at
            ",
        )
        .bind(json)
        .bind(record.updated_at())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }
}
