//! Tag API endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};

use super::{paginate, scope_site, Paged};
use crate::errors::AppError;
use crate::models::Tag;
use crate::query::{self, resources, ListParams};
use crate::AppState;

/// GET /tags - List tags.
pub async fn list_tags(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Paged<Tag>>, AppError> {
    let site_id = scope_site(&state, &resources::TAGS, &params).await?;
    let q = query::prepare(&resources::TAGS, &params, site_id, None)?;
    let tags = state.repo.list_tags(&resources::TAGS, &q).await?;
    Ok(Json(paginate(tags, q.limit)))
}

/// GET /tags/{ids} - One or more tags by id.
pub async fn get_tags(
    State(state): State<AppState>,
    Path(ids): Path<String>,
    Query(params): Query<ListParams>,
) -> Result<Json<Paged<Tag>>, AppError> {
    let ids = query::parse_id_list(&ids)?;
    let site_id = scope_site(&state, &resources::TAGS, &params).await?;
    let q = query::prepare(&resources::TAGS, &params, site_id, Some(ids))?;
    let tags = state.repo.list_tags(&resources::TAGS, &q).await?;
    Ok(Json(paginate(tags, q.limit)))
}
