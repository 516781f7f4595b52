use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use storage::repository::AttemptRecord;
use theory_core::model::{LeaderboardRow, ProgressRecord, QuizSnapshot, SessionId, UserId};

use super::config::SyncConfig;
use super::remote::{RemoteError, RemoteStore};

/// `RemoteStore` backed by a PostgREST-style HTTP backend.
///
/// Session and progress rows are upserted with
/// `Prefer: resolution=merge-duplicates`, so re-pushing the same key
/// overwrites the stored row. Attempt rows are plain inserts.
#[derive(Clone)]
pub struct HttpRemoteStore {
    client: Client,
    config: SyncConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionRow {
    user_id: Option<String>,
    #[serde(flatten)]
    snapshot: QuizSnapshot,
}

#[derive(Debug, Serialize, Deserialize)]
struct ProgressRow {
    user_id: Option<String>,
    record: ProgressRecord,
}

#[derive(Debug, Serialize)]
struct AttemptRow {
    user_id: Option<String>,
    session_id: String,
    correct: u32,
    total: u32,
    percent: u32,
    tier: &'static str,
    points_awarded: u32,
    started_at: DateTime<Utc>,
    completed_at: DateTime<Utc>,
}

impl AttemptRow {
    fn new(user: Option<&UserId>, attempt: &AttemptRecord) -> Self {
        Self {
            user_id: user.map(|user| user.as_str().to_string()),
            session_id: attempt.session_id.to_string(),
            correct: attempt.correct,
            total: attempt.total,
            percent: attempt.percent,
            tier: attempt.tier.as_str(),
            points_awarded: attempt.points_awarded,
            started_at: attempt.started_at,
            completed_at: attempt.completed_at,
        }
    }
}

impl HttpRemoteStore {
    #[must_use]
    pub fn new(config: SyncConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn endpoint(&self, table: &str) -> String {
        format!(
            "{}/{table}",
            self.config.base_url.as_str().trim_end_matches('/')
        )
    }

    fn user_filter(user: Option<&UserId>) -> Option<(&'static str, String)> {
        user.map(|user| ("user_id", format!("eq.{}", user.as_str())))
    }

    async fn upsert<T: Serialize>(&self, table: &str, row: &T) -> Result<(), RemoteError> {
        let response = self
            .client
            .post(self.endpoint(table))
            .bearer_auth(&self.config.api_key)
            .header("Prefer", "resolution=merge-duplicates")
            .json(&[row])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(RemoteError::Status(response.status()));
        }
        Ok(())
    }

    async fn insert<T: Serialize>(&self, table: &str, row: &T) -> Result<(), RemoteError> {
        let response = self
            .client
            .post(self.endpoint(table))
            .bearer_auth(&self.config.api_key)
            .json(&[row])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(RemoteError::Status(response.status()));
        }
        Ok(())
    }

    async fn fetch_rows<T: for<'de> Deserialize<'de>>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, RemoteError> {
        let response = self
            .client
            .get(self.endpoint(table))
            .bearer_auth(&self.config.api_key)
            .query(query)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(RemoteError::Status(response.status()));
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn push_session(
        &self,
        user: Option<&UserId>,
        snapshot: &QuizSnapshot,
    ) -> Result<(), RemoteError> {
        let row = SessionRow {
            user_id: user.map(|user| user.as_str().to_string()),
            snapshot: snapshot.clone(),
        };
        self.upsert("quiz_sessions", &row).await
    }

    async fn fetch_session(
        &self,
        user: Option<&UserId>,
        id: SessionId,
    ) -> Result<Option<QuizSnapshot>, RemoteError> {
        let mut query = vec![
            ("session_id", format!("eq.{id}")),
            ("limit", "1".to_string()),
        ];
        query.extend(Self::user_filter(user));

        let rows: Vec<SessionRow> = self.fetch_rows("quiz_sessions", &query).await?;
        Ok(rows.into_iter().next().map(|row| row.snapshot))
    }

    async fn fetch_latest_session(
        &self,
        user: Option<&UserId>,
    ) -> Result<Option<QuizSnapshot>, RemoteError> {
        let mut query = vec![
            ("order", "updated_at.desc,revision.desc".to_string()),
            ("limit", "1".to_string()),
        ];
        query.extend(Self::user_filter(user));

        let rows: Vec<SessionRow> = self.fetch_rows("quiz_sessions", &query).await?;
        Ok(rows.into_iter().next().map(|row| row.snapshot))
    }

    async fn push_attempt(
        &self,
        user: Option<&UserId>,
        attempt: &AttemptRecord,
    ) -> Result<(), RemoteError> {
        let row = AttemptRow::new(user, attempt);
        self.insert("quiz_attempts", &row).await
    }

    async fn push_progress(
        &self,
        user: Option<&UserId>,
        record: &ProgressRecord,
    ) -> Result<(), RemoteError> {
        let row = ProgressRow {
            user_id: user.map(|user| user.as_str().to_string()),
            record: record.clone(),
        };
        self.upsert("progress", &row).await
    }

    async fn fetch_progress(
        &self,
        user: Option<&UserId>,
    ) -> Result<Option<ProgressRecord>, RemoteError> {
        let mut query = vec![("limit", "1".to_string())];
        query.extend(Self::user_filter(user));

        let rows: Vec<ProgressRow> = self.fetch_rows("progress", &query).await?;
        Ok(rows.into_iter().next().map(|row| row.record))
    }

    async fn fetch_leaderboard(&self, limit: u32) -> Result<Vec<LeaderboardRow>, RemoteError> {
        let query = vec![
            ("order", "mastery_points.desc".to_string()),
            ("limit", limit.to_string()),
        ];
        self.fetch_rows("leaderboard", &query).await
    }
}
