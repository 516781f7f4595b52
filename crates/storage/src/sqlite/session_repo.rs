use theory_core::model::{QuizSnapshot, QuizStatus, SessionId, UserId};

use super::{
    SqliteRepository,
    mapping::{map_session_row, ser},
};
use crate::repository::{SessionRepository, StorageError};

const SESSION_COLUMNS: &str = r"
    id, user_id, questions, cursor, answers, status,
    started_at, completed_at, revision, updated_at
";

#[async_trait::async_trait]
impl SessionRepository for SqliteRepository {
    async fn upsert_session(
        &self,
        user_id: Option<&UserId>,
        snapshot: &QuizSnapshot,
    ) -> Result<(), StorageError> {
        let questions = serde_json::to_string(&snapshot.questions).map_err(ser)?;
        let answers = serde_json::to_string(&snapshot.answers).map_err(ser)?;
        let cursor = i64::try_from(snapshot.cursor)
            .map_err(|_| StorageError::Serialization("cursor overflow".into()))?;
        let revision = i64::try_from(snapshot.revision)
            .map_err(|_| StorageError::Serialization("revision overflow".into()))?;

        sqlx::query(
            r"
                INSERT INTO quiz_sessions (
                    id, user_id, questions, cursor, answers, status,
                    started_at, completed_at, revision, updated_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                ON CONFLICT(id) DO UPDATE SET
                    user_id = excluded.user_id,
                    questions = excluded.questions,
                    cursor = excluded.cursor,
                    answers = excluded.answers,
                    status = excluded.status,
                    started_at = excluded.started_at,
                    completed_at = excluded.completed_at,
                    revision = excluded.revision,
                    updated_at = excluded.updated_at
            ",
        )
        .bind(snapshot.session_id.to_string())
        .bind(user_id.map(UserId::as_str))
        .bind(questions)
        .bind(cursor)
        .bind(answers)
        .bind(snapshot.status.as_str())
        .bind(snapshot.started_at)
        .bind(snapshot.completed_at)
        .bind(revision)
        .bind(snapshot.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn get_session(&self, id: SessionId) -> Result<Option<QuizSnapshot>, StorageError> {
        let sql = format!("SELECT {SESSION_COLUMNS} FROM quiz_sessions WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_session_row).transpose()
    }

    async fn latest_in_progress(&self) -> Result<Option<QuizSnapshot>, StorageError> {
        let sql = format!(
            r"
                SELECT {SESSION_COLUMNS}
                FROM quiz_sessions
                WHERE status = ?1
                ORDER BY updated_at DESC, revision DESC
                LIMIT 1
            "
        );
        let row = sqlx::query(&sql)
            .bind(QuizStatus::InProgress.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_session_row).transpose()
    }
}
