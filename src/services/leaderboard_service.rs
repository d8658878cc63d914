use tracing::debug;

use crate::{
    dao::{contest_store::ContestStore, models::ScoreRecordEntity},
    error::ServiceError,
    services::registry_service::{self, is_statically_disqualified},
    state::community::Community,
};

/// Rows shown per leaderboard page.
pub const PAGE_SIZE: usize = 20;

/// One ranked user.
#[derive(Debug, Clone, PartialEq)]
pub struct LeaderboardRow {
    /// User id.
    pub user: u64,
    /// Points for the community the leaderboard was asked from.
    pub points: f64,
    /// Points for the other community.
    pub other_points: f64,
}

/// A leaderboard page as seen from one community.
#[derive(Debug, Clone, PartialEq)]
pub struct Leaderboard {
    /// Community the leaderboard was asked from.
    pub community: Community,
    /// Sum of eligible points for `community`.
    pub total: f64,
    /// Sum of eligible points for the other community.
    pub other_total: f64,
    /// Ranked rows of the requested page, best first.
    pub rows: Vec<LeaderboardRow>,
}

/// A single user's standing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreCard {
    /// User id.
    pub user: u64,
    /// Itto points.
    pub itto: f64,
    /// Shenhe points.
    pub shenhe: f64,
    /// Whether the user is excluded from the contest.
    pub disqualified: bool,
}

impl ScoreCard {
    /// Points held for `community`.
    pub fn points(&self, community: Community) -> f64 {
        match community {
            Community::Itto => self.itto,
            Community::Shenhe => self.shenhe,
        }
    }
}

/// Rank `records` for `community`. `page` is 1-based.
///
/// Disqualified users are left out of both the totals and the rows; users without points
/// for `community` are left out of the rows.
pub fn build_leaderboard(
    records: Vec<ScoreRecordEntity>,
    community: Community,
    page: usize,
) -> Leaderboard {
    let other = community.other();
    let eligible: Vec<(u64, ScoreRecordEntity)> = records
        .into_iter()
        .filter(|record| !record.dq)
        .filter_map(|record| match record.user_id() {
            Some(user) => Some((user, record)),
            None => {
                debug!(user = %record.user, "skipping score record with malformed user id");
                None
            }
        })
        .filter(|(user, _)| !is_statically_disqualified(*user))
        .collect();

    let total: f64 = eligible.iter().map(|(_, record)| record.points(community)).sum();
    let other_total: f64 = eligible.iter().map(|(_, record)| record.points(other)).sum();

    let mut rows: Vec<LeaderboardRow> = eligible
        .iter()
        .filter(|(_, record)| record.points(community) != 0.0)
        .map(|(user, record)| LeaderboardRow {
            user: *user,
            points: record.points(community),
            other_points: record.points(other),
        })
        .collect();
    rows.sort_by(|a, b| b.points.total_cmp(&a.points));

    let rows = rows
        .into_iter()
        .skip(page.saturating_sub(1).saturating_mul(PAGE_SIZE))
        .take(PAGE_SIZE)
        .collect();

    Leaderboard {
        community,
        total,
        other_total,
        rows,
    }
}

/// Leaderboard page `page` (1-based) as seen from `community`.
pub async fn leaderboard(
    store: &dyn ContestStore,
    community: Community,
    page: usize,
) -> Result<Leaderboard, ServiceError> {
    let records = store.list_scores().await?;
    Ok(build_leaderboard(records, community, page))
}

/// Both scores of `user` and whether they are disqualified. Unknown users score zero.
pub async fn score_card(store: &dyn ContestStore, user: u64) -> Result<ScoreCard, ServiceError> {
    let record = store.find_score(user).await?;
    let disqualified = match &record {
        Some(record) => record.dq || is_statically_disqualified(user),
        None => registry_service::is_disqualified(store, user).await?,
    };
    let record = record.unwrap_or_else(|| ScoreRecordEntity::new(user));

    Ok(ScoreCard {
        user,
        itto: record.itto,
        shenhe: record.shenhe,
        disqualified,
    })
}
