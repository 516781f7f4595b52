use theory_core::model::UserId;

use super::{SqliteRepository, mapping::map_attempt_row};
use crate::repository::{AttemptRecord, AttemptRepository, StorageError};

#[async_trait::async_trait]
impl AttemptRepository for SqliteRepository {
    async fn append_attempt(&self, attempt: &AttemptRecord) -> Result<i64, StorageError> {
        let result = sqlx::query(
            r"
                INSERT INTO quiz_attempts (
                    session_id, user_id, correct, total, percent,
                    tier, points_awarded, started_at, completed_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ",
        )
        .bind(attempt.session_id.to_string())
        .bind(attempt.user_id.as_ref().map(UserId::as_str))
        .bind(i64::from(attempt.correct))
        .bind(i64::from(attempt.total))
        .bind(i64::from(attempt.percent))
        .bind(attempt.tier.as_str())
        .bind(i64::from(attempt.points_awarded))
        .bind(attempt.started_at)
        .bind(attempt.completed_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(result.last_insert_rowid())
    }

    async fn list_recent(&self, limit: u32) -> Result<Vec<AttemptRecord>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, session_id, user_id, correct, total, percent,
                       tier, points_awarded, started_at, completed_at
                FROM quiz_attempts
                ORDER BY completed_at DESC, id DESC
                LIMIT ?1
            ",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        rows.iter().map(map_attempt_row).collect()
    }
}
