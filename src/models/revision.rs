//! Post revision models.
//!
//! The dump stores one history row per edit event; rows sharing a revision
//! GUID form one logical revision. Grouping and ranking happen at query time.

use serde::{Deserialize, Serialize};

/// History type codes that record community votes rather than a single
/// user's edit (close, reopen, delete, undelete, migration and lock votes).
pub const VOTE_BASED_HISTORY_TYPES: [i64; 13] =
    [10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22];

/// One raw history row as ingested from the dump.
#[derive(Debug, Clone)]
pub struct PostHistory {
    pub site_id: i64,
    pub id: i64,
    pub post_id: i64,
    pub history_type: i64,
    pub revision_guid: String,
    pub user_id: Option<i64>,
    pub creation_date: Option<String>,
    pub comment: Option<String>,
}

/// One grouped revision of a post, ranked within its post by the earliest
/// history row of the group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Revision {
    pub post_id: i64,
    pub revision_guid: String,
    /// 1-based rank within the post, separately per vote-based and
    /// single-user-edit partitions.
    pub revision_number: i64,
    /// True when any history row in the group has a vote-based type.
    pub vote_based: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}
