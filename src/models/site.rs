//! Site (tenant) model.

use serde::{Deserialize, Serialize};

/// One tenant of the dataset. Created and updated only by the site-loading
/// command; read by every site-scoped query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Site {
    pub id: i64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Optional parent site (meta sites point at their main site).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<i64>,
    pub total_questions: i64,
    pub total_answers: i64,
    pub total_users: i64,
    pub total_comments: i64,
    pub total_tags: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_activity_date: Option<String>,
}
