//! Database module for SQLite persistence.
//!
//! SQLite holds the ingested dump data and is the source of truth for every
//! query endpoint. Per-site entities keep the identifiers assigned in the
//! dumps, so their primary keys are composite `(site_id, id)`.

mod repository;

pub use repository::*;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

/// Initialize the database connection pool and run migrations.
pub async fn init_database(db_path: &Path) -> Result<SqlitePool, sqlx::Error> {
    // Ensure the parent directory exists
    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent).await.ok();
    }

    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .foreign_keys(true)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    // Run embedded migrations
    run_migrations(&pool).await?;

    Ok(pool)
}

/// Run database migrations.
async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sites (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            description TEXT,
            url TEXT,
            parent_id INTEGER REFERENCES sites(id) CHECK (parent_id IS NULL OR parent_id != id),
            total_questions INTEGER NOT NULL DEFAULT 0,
            total_answers INTEGER NOT NULL DEFAULT 0,
            total_users INTEGER NOT NULL DEFAULT 0,
            total_comments INTEGER NOT NULL DEFAULT 0,
            total_tags INTEGER NOT NULL DEFAULT 0,
            last_activity_date TEXT
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            site_id INTEGER NOT NULL REFERENCES sites(id) ON DELETE CASCADE,
            id INTEGER NOT NULL,
            display_name TEXT NOT NULL,
            reputation INTEGER NOT NULL DEFAULT 0,
            creation_date TEXT,
            last_access_date TEXT,
            website_url TEXT,
            location TEXT,
            about_me TEXT,
            views INTEGER NOT NULL DEFAULT 0,
            up_votes INTEGER NOT NULL DEFAULT 0,
            down_votes INTEGER NOT NULL DEFAULT 0,
            is_moderator INTEGER NOT NULL DEFAULT 0,
            is_employee INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (site_id, id)
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS posts (
            site_id INTEGER NOT NULL REFERENCES sites(id) ON DELETE CASCADE,
            id INTEGER NOT NULL,
            post_type INTEGER NOT NULL,
            title TEXT,
            body TEXT,
            score INTEGER NOT NULL DEFAULT 0,
            view_count INTEGER,
            answer_count INTEGER,
            comment_count INTEGER NOT NULL DEFAULT 0,
            favorite_count INTEGER NOT NULL DEFAULT 0,
            owner_user_id INTEGER,
            last_editor_user_id INTEGER,
            parent_id INTEGER,
            accepted_answer_id INTEGER,
            creation_date TEXT,
            last_edit_date TEXT,
            last_activity_date TEXT,
            content_license TEXT,
            PRIMARY KEY (site_id, id)
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tags (
            site_id INTEGER NOT NULL REFERENCES sites(id) ON DELETE CASCADE,
            id INTEGER NOT NULL,
            name TEXT NOT NULL,
            count INTEGER NOT NULL DEFAULT 0,
            excerpt_post_id INTEGER,
            wiki_post_id INTEGER,
            PRIMARY KEY (site_id, id),
            UNIQUE (site_id, name)
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS post_tags (
            site_id INTEGER NOT NULL REFERENCES sites(id) ON DELETE CASCADE,
            post_id INTEGER NOT NULL,
            tag_id INTEGER NOT NULL,
            PRIMARY KEY (site_id, post_id, tag_id)
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS badges (
            site_id INTEGER NOT NULL REFERENCES sites(id) ON DELETE CASCADE,
            id INTEGER NOT NULL,
            name TEXT NOT NULL,
            rank TEXT NOT NULL CHECK (rank IN ('gold', 'silver', 'bronze')),
            kind TEXT NOT NULL CHECK (kind IN ('named', 'tag_based')),
            award_count INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (site_id, id),
            UNIQUE (site_id, name)
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS user_badges (
            site_id INTEGER NOT NULL REFERENCES sites(id) ON DELETE CASCADE,
            user_id INTEGER NOT NULL,
            badge_id INTEGER NOT NULL,
            award_date TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS comments (
            site_id INTEGER NOT NULL REFERENCES sites(id) ON DELETE CASCADE,
            id INTEGER NOT NULL,
            post_id INTEGER NOT NULL,
            user_id INTEGER,
            score INTEGER NOT NULL DEFAULT 0,
            text TEXT NOT NULL,
            creation_date TEXT,
            PRIMARY KEY (site_id, id)
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS post_history (
            site_id INTEGER NOT NULL REFERENCES sites(id) ON DELETE CASCADE,
            id INTEGER NOT NULL,
            post_id INTEGER NOT NULL,
            history_type INTEGER NOT NULL,
            revision_guid TEXT NOT NULL,
            user_id INTEGER,
            creation_date TEXT,
            comment TEXT,
            PRIMARY KEY (site_id, id)
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Indexes for the common query paths
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_posts_site_type ON posts(site_id, post_type);
        CREATE INDEX IF NOT EXISTS idx_posts_creation ON posts(site_id, creation_date);
        CREATE INDEX IF NOT EXISTS idx_posts_activity ON posts(site_id, last_activity_date);
        CREATE INDEX IF NOT EXISTS idx_post_tags_tag ON post_tags(site_id, tag_id);
        CREATE INDEX IF NOT EXISTS idx_tags_name ON tags(site_id, name);
        CREATE INDEX IF NOT EXISTS idx_users_name ON users(site_id, display_name);
        CREATE INDEX IF NOT EXISTS idx_comments_post ON comments(site_id, post_id);
        CREATE INDEX IF NOT EXISTS idx_history_post ON post_history(site_id, post_id);
        CREATE INDEX IF NOT EXISTS idx_user_badges_badge ON user_badges(site_id, badge_id);
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
