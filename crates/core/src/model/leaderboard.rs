use serde::{Deserialize, Serialize};

/// One unranked leaderboard row as the backend returns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardRow {
    pub display_name: String,
    pub mastery_points: u32,
}

/// A ranked leaderboard entry ready for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub display_name: String,
    pub mastery_points: u32,
}

/// Rank rows by mastery points, highest first.
///
/// Uses dense ranking: equal scores share a rank and the next distinct
/// score takes the following rank (1, 2, 2, 3). Ties are ordered by name
/// so the output is stable.
#[must_use]
pub fn rank_rows(mut rows: Vec<LeaderboardRow>) -> Vec<LeaderboardEntry> {
    rows.sort_by(|a, b| {
        b.mastery_points
            .cmp(&a.mastery_points)
            .then_with(|| a.display_name.cmp(&b.display_name))
    });

    let mut entries = Vec::with_capacity(rows.len());
    let mut rank = 0_u32;
    let mut last_points: Option<u32> = None;

    for row in rows {
        if last_points != Some(row.mastery_points) {
            rank += 1;
            last_points = Some(row.mastery_points);
        }
        entries.push(LeaderboardEntry {
            rank,
            display_name: row.display_name,
            mastery_points: row.mastery_points,
        });
    }
    entries
}

// ─── Tests ─────────────────────────────────────────────────────────────────────
