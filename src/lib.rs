//! Quarry Backend
//!
//! A read-only REST backend over Stack Exchange data dumps: SQLite
//! persistence, a declarative query-shaping pipeline, and a bulk archive
//! loader.

pub mod api;
pub mod config;
pub mod db;
pub mod errors;
pub mod loader;
pub mod models;
pub mod query;
pub mod siteinfo;

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use db::Repository;
use siteinfo::SiteInfoService;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub siteinfo: Arc<SiteInfoService>,
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Questions and answers
        .route("/questions", get(api::list_questions))
        .route("/questions/{ids}", get(api::get_questions))
        .route("/answers", get(api::list_answers))
        .route("/answers/{ids}", get(api::get_answers))
        // Posts (both types) and per-post sub-resources
        .route("/posts", get(api::list_posts))
        .route("/posts/{ids}", get(api::get_posts))
        .route("/posts/{ids}/comments", get(api::get_post_comments))
        .route("/posts/{ids}/revisions", get(api::get_post_revisions))
        // Badges
        .route("/badges", get(api::list_badges))
        .route("/badges/{ids}", get(api::get_badges))
        // Tags
        .route("/tags", get(api::list_tags))
        .route("/tags/{ids}", get(api::get_tags))
        // Users
        .route("/users", get(api::list_users))
        .route("/users/{ids}", get(api::get_users))
        // Comments
        .route("/comments", get(api::list_comments))
        .route("/comments/{ids}", get(api::get_comments))
        // Sites
        .route("/sites", get(api::list_sites))
        .route("/sites/{name}/info", get(api::get_site_info))
        // Health check
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests;
