//! Badge models.

use serde::{Deserialize, Serialize};

/// Badge rank variants in rank order: gold ranks lowest (first), so an
/// ascending rank sort yields gold before silver before bronze.
pub const BADGE_RANKS: [&str; 3] = ["gold", "silver", "bronze"];

/// A badge definition, unique by name per site. The dump lists one row per
/// award; distinct definitions and per-definition award counts are derived at
/// load time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Badge {
    pub id: i64,
    pub site_id: i64,
    pub name: String,
    /// `gold` / `silver` / `bronze`
    pub rank: String,
    /// `named` / `tag_based`
    pub kind: String,
    pub award_count: i64,
}

/// One badge award: user, badge and when it was granted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserBadge {
    pub site_id: i64,
    pub user_id: i64,
    pub badge_id: i64,
    pub award_date: String,
}
