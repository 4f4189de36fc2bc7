//! REST API module.
//!
//! Read-only list/detail handlers, all shaped by the query pipeline. Every
//! list response is the same envelope: a page of items plus a look-ahead
//! `has_more` flag (no total count is ever computed).

mod badges;
mod comments;
mod posts;
mod sites;
mod tags;
mod users;

pub use badges::*;
pub use comments::*;
pub use posts::*;
pub use sites::*;
pub use tags::*;
pub use users::*;

use serde::Serialize;

use crate::errors::AppError;
use crate::query::{ListParams, ResourceConfig};
use crate::AppState;

/// Paginated response envelope.
#[derive(Debug, Serialize)]
pub struct Paged<T: Serialize> {
    pub items: Vec<T>,
    pub has_more: bool,
}

/// Wrap one fetched page. The query layer requests one row beyond the page
/// size; its presence is the `has_more` signal.
pub fn paginate<T: Serialize>(mut items: Vec<T>, pagesize: i64) -> Paged<T> {
    let has_more = items.len() as i64 > pagesize;
    items.truncate(pagesize as usize);
    Paged { items, has_more }
}

/// Mandatory site-scoping stage for site-scoped resources: a missing or
/// unresolvable site name fails the request instead of silently returning
/// data across tenants.
pub async fn scope_site(
    state: &AppState,
    cfg: &ResourceConfig,
    params: &ListParams,
) -> Result<Option<i64>, AppError> {
    if !cfg.site_scoped {
        return Ok(None);
    }
    let name = params
        .site
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::BadParameter("site is required".to_string()))?;
    let site = state
        .repo
        .find_site_by_name(name)
        .await?
        .ok_or_else(|| AppError::BadParameter(format!("Invalid site: {}", name)))?;
    Ok(Some(site.id))
}
