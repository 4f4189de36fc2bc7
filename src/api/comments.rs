//! Comment API endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};

use super::{paginate, scope_site, Paged};
use crate::errors::AppError;
use crate::models::Comment;
use crate::query::{self, resources, ListParams};
use crate::AppState;

/// GET /comments - List comments.
pub async fn list_comments(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Paged<Comment>>, AppError> {
    let site_id = scope_site(&state, &resources::COMMENTS, &params).await?;
    let q = query::prepare(&resources::COMMENTS, &params, site_id, None)?;
    let comments = state.repo.list_comments(&resources::COMMENTS, &q).await?;
    Ok(Json(paginate(comments, q.limit)))
}

/// GET /comments/{ids} - One or more comments by id.
pub async fn get_comments(
    State(state): State<AppState>,
    Path(ids): Path<String>,
    Query(params): Query<ListParams>,
) -> Result<Json<Paged<Comment>>, AppError> {
    let ids = query::parse_id_list(&ids)?;
    let site_id = scope_site(&state, &resources::COMMENTS, &params).await?;
    let q = query::prepare(&resources::COMMENTS, &params, site_id, Some(ids))?;
    let comments = state.repo.list_comments(&resources::COMMENTS, &q).await?;
    Ok(Json(paginate(comments, q.limit)))
}

/// GET /posts/{ids}/comments - All comments on the given posts.
///
/// Same pipeline as the plain detail route; the configured detail field is
/// the post foreign key instead of the primary key.
pub async fn get_post_comments(
    State(state): State<AppState>,
    Path(ids): Path<String>,
    Query(params): Query<ListParams>,
) -> Result<Json<Paged<Comment>>, AppError> {
    let ids = query::parse_id_list(&ids)?;
    let site_id = scope_site(&state, &resources::POST_COMMENTS, &params).await?;
    let q = query::prepare(&resources::POST_COMMENTS, &params, site_id, Some(ids))?;
    let comments = state
        .repo
        .list_comments(&resources::POST_COMMENTS, &q)
        .await?;
    Ok(Json(paginate(comments, q.limit)))
}
