//! Tag model.

use serde::{Deserialize, Serialize};

/// A tag, unique by name per site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub site_id: i64,
    pub name: String,
    /// Number of posts carrying this tag, as reported by the dump.
    pub count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt_post_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wiki_post_id: Option<i64>,
}
