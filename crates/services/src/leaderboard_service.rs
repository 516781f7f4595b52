use std::sync::Arc;

use theory_core::model::{rank_rows, LeaderboardEntry};

use crate::error::LeaderboardError;
use crate::sync::RemoteStore;

/// Default number of rows shown on the leaderboard.
pub const DEFAULT_LEADERBOARD_LIMIT: u32 = 20;

/// Ranked standings fetched from the shared remote store.
///
/// The leaderboard only exists remotely. Without a configured remote the
/// service reports itself disabled instead of serving an empty board.
#[derive(Clone)]
pub struct LeaderboardService {
    remote: Option<Arc<dyn RemoteStore>>,
}

impl LeaderboardService {
    #[must_use]
    pub fn new(remote: Arc<dyn RemoteStore>) -> Self {
        Self {
            remote: Some(remote),
        }
    }

    #[must_use]
    pub fn disabled() -> Self {
        Self { remote: None }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.remote.is_some()
    }

    /// The top learners by mastery points, tied scores sharing a rank.
    ///
    /// # Errors
    ///
    /// Returns `LeaderboardError::Disabled` when no remote is configured,
    /// or `LeaderboardError::Remote` when the fetch fails.
    pub async fn top(&self, limit: u32) -> Result<Vec<LeaderboardEntry>, LeaderboardError> {
        let remote = self.remote.as_ref().ok_or(LeaderboardError::Disabled)?;
        let rows = remote.fetch_leaderboard(limit).await?;
        Ok(rank_rows(rows))
    }
}
