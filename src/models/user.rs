//! User model.

use serde::{Deserialize, Serialize};

/// A registered user of one site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub site_id: i64,
    pub display_name: String,
    pub reputation: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_access_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub about_me: Option<String>,
    pub views: i64,
    pub up_votes: i64,
    pub down_votes: i64,
    pub is_moderator: bool,
    pub is_employee: bool,
}
