//! User API endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};

use super::{paginate, scope_site, Paged};
use crate::errors::AppError;
use crate::models::User;
use crate::query::{self, resources, ListParams};
use crate::AppState;

/// GET /users - List users.
pub async fn list_users(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Paged<User>>, AppError> {
    let site_id = scope_site(&state, &resources::USERS, &params).await?;
    let q = query::prepare(&resources::USERS, &params, site_id, None)?;
    let users = state.repo.list_users(&resources::USERS, &q).await?;
    Ok(Json(paginate(users, q.limit)))
}

/// GET /users/{ids} - One or more users by id.
pub async fn get_users(
    State(state): State<AppState>,
    Path(ids): Path<String>,
    Query(params): Query<ListParams>,
) -> Result<Json<Paged<User>>, AppError> {
    let ids = query::parse_id_list(&ids)?;
    let site_id = scope_site(&state, &resources::USERS, &params).await?;
    let q = query::prepare(&resources::USERS, &params, site_id, Some(ids))?;
    let users = state.repo.list_users(&resources::USERS, &q).await?;
    Ok(Json(paginate(users, q.limit)))
}
