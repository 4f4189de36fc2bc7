//! Badge API endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};

use super::{paginate, scope_site, Paged};
use crate::errors::AppError;
use crate::models::Badge;
use crate::query::{self, resources, ListParams};
use crate::AppState;

/// GET /badges - List badges.
pub async fn list_badges(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Paged<Badge>>, AppError> {
    let site_id = scope_site(&state, &resources::BADGES, &params).await?;
    let q = query::prepare(&resources::BADGES, &params, site_id, None)?;
    let badges = state.repo.list_badges(&resources::BADGES, &q).await?;
    Ok(Json(paginate(badges, q.limit)))
}

/// GET /badges/{ids} - One or more badges by id.
pub async fn get_badges(
    State(state): State<AppState>,
    Path(ids): Path<String>,
    Query(params): Query<ListParams>,
) -> Result<Json<Paged<Badge>>, AppError> {
    let ids = query::parse_id_list(&ids)?;
    let site_id = scope_site(&state, &resources::BADGES, &params).await?;
    let q = query::prepare(&resources::BADGES, &params, site_id, Some(ids))?;
    let badges = state.repo.list_badges(&resources::BADGES, &q).await?;
    Ok(Json(paginate(badges, q.limit)))
}
