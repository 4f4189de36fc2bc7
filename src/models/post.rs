//! Post model covering questions, answers and wiki-like variants.

use serde::{Deserialize, Serialize};

/// A question, answer or wiki-like post. The `post_type` discriminant
/// (1 = question, 2 = answer, higher values are wiki-like variants) decides
/// which optional counters are meaningful: only questions carry `view_count`
/// and `answer_count`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub site_id: i64,
    pub post_type: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    pub score: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer_count: Option<i64>,
    pub comment_count: i64,
    pub favorite_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_user_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_editor_user_id: Option<i64>,
    /// For answers: the question being answered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accepted_answer_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_edit_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_activity_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_license: Option<String>,
}
