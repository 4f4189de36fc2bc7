//! Post API endpoints: questions, answers, the combined post listing and
//! post revisions.

use axum::{
    extract::{Path, Query, State},
    Json,
};

use super::{paginate, scope_site, Paged};
use crate::errors::AppError;
use crate::models::{Post, Revision};
use crate::query::{self, resources, ListParams};
use crate::AppState;

/// GET /questions - List questions.
pub async fn list_questions(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Paged<Post>>, AppError> {
    let site_id = scope_site(&state, &resources::QUESTIONS, &params).await?;
    let q = query::prepare(&resources::QUESTIONS, &params, site_id, None)?;
    let posts = state.repo.list_posts(&resources::QUESTIONS, &q).await?;
    Ok(Json(paginate(posts, q.limit)))
}

/// GET /questions/{ids} - One or more questions by id.
pub async fn get_questions(
    State(state): State<AppState>,
    Path(ids): Path<String>,
    Query(params): Query<ListParams>,
) -> Result<Json<Paged<Post>>, AppError> {
    let ids = query::parse_id_list(&ids)?;
    let site_id = scope_site(&state, &resources::QUESTIONS, &params).await?;
    let q = query::prepare(&resources::QUESTIONS, &params, site_id, Some(ids))?;
    let posts = state.repo.list_posts(&resources::QUESTIONS, &q).await?;
    Ok(Json(paginate(posts, q.limit)))
}

/// GET /answers - List answers.
pub async fn list_answers(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Paged<Post>>, AppError> {
    let site_id = scope_site(&state, &resources::ANSWERS, &params).await?;
    let q = query::prepare(&resources::ANSWERS, &params, site_id, None)?;
    let posts = state.repo.list_posts(&resources::ANSWERS, &q).await?;
    Ok(Json(paginate(posts, q.limit)))
}

/// GET /answers/{ids} - One or more answers by id.
pub async fn get_answers(
    State(state): State<AppState>,
    Path(ids): Path<String>,
    Query(params): Query<ListParams>,
) -> Result<Json<Paged<Post>>, AppError> {
    let ids = query::parse_id_list(&ids)?;
    let site_id = scope_site(&state, &resources::ANSWERS, &params).await?;
    let q = query::prepare(&resources::ANSWERS, &params, site_id, Some(ids))?;
    let posts = state.repo.list_posts(&resources::ANSWERS, &q).await?;
    Ok(Json(paginate(posts, q.limit)))
}

/// GET /posts - List posts of every type.
pub async fn list_posts(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Paged<Post>>, AppError> {
    let site_id = scope_site(&state, &resources::POSTS, &params).await?;
    let q = query::prepare(&resources::POSTS, &params, site_id, None)?;
    let posts = state.repo.list_posts(&resources::POSTS, &q).await?;
    Ok(Json(paginate(posts, q.limit)))
}

/// GET /posts/{ids} - One or more posts by id.
pub async fn get_posts(
    State(state): State<AppState>,
    Path(ids): Path<String>,
    Query(params): Query<ListParams>,
) -> Result<Json<Paged<Post>>, AppError> {
    let ids = query::parse_id_list(&ids)?;
    let site_id = scope_site(&state, &resources::POSTS, &params).await?;
    let q = query::prepare(&resources::POSTS, &params, site_id, Some(ids))?;
    let posts = state.repo.list_posts(&resources::POSTS, &q).await?;
    Ok(Json(paginate(posts, q.limit)))
}

/// GET /posts/{ids}/revisions - Grouped revisions for the given posts.
///
/// Served by the dedicated window-function query rather than the generic
/// pipeline, so paging happens on the grouped rows here.
pub async fn get_post_revisions(
    State(state): State<AppState>,
    Path(ids): Path<String>,
    Query(params): Query<ListParams>,
) -> Result<Json<Paged<Revision>>, AppError> {
    let ids = query::parse_id_list(&ids)?;
    let site_id = scope_site(&state, &resources::POSTS, &params)
        .await?
        .expect("posts are site-scoped");

    let revisions = state.repo.revisions_for_posts(site_id, &ids).await?;

    let pagesize = params
        .pagesize
        .unwrap_or(query::DEFAULT_PAGE_SIZE)
        .clamp(1, query::MAX_PAGE_SIZE) as usize;
    let offset = (params.page.unwrap_or(1).max(1) as usize - 1) * pagesize;

    let has_more = revisions.len() > offset + pagesize;
    let items = revisions.into_iter().skip(offset).take(pagesize).collect();
    Ok(Json(Paged { items, has_more }))
}
