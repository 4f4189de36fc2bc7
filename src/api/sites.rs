//! Site directory and site statistics endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};

use super::{paginate, Paged};
use crate::errors::AppError;
use crate::models::Site;
use crate::query::{self, resources, ListParams};
use crate::siteinfo::SiteInfo;
use crate::AppState;

/// GET /sites - List all known sites. The only list endpoint that takes no
/// `site` parameter.
pub async fn list_sites(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Paged<Site>>, AppError> {
    let q = query::prepare(&resources::SITES, &params, None, None)?;
    let sites = state.repo.list_sites(&resources::SITES, &q).await?;
    Ok(Json(paginate(sites, q.limit)))
}

/// GET /sites/{name}/info - Aggregate statistics for one site, served from
/// the in-process cache when warm.
pub async fn get_site_info(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<SiteInfo>, AppError> {
    let site = state
        .repo
        .find_site_by_name(&name)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Unknown site: {}", name)))?;
    let info = state.siteinfo.get(&state.repo, &site).await?;
    Ok(Json((*info).clone()))
}
