//! Database repository for all read queries and bulk-load operations.
//!
//! List queries are assembled by the query pipeline and executed here;
//! bulk loads replace a site's slice of one table per transaction.

use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

use crate::errors::AppError;
use crate::models::{
    Badge, Comment, Post, PostHistory, Revision, Site, Tag, User, UserBadge,
    VOTE_BASED_HISTORY_TYPES,
};
use crate::query::{self, PreparedQuery, ResourceConfig};

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

/// Raw per-site aggregates consumed by the site-info service.
#[derive(Debug, Default, Clone)]
pub struct SiteAggregates {
    pub total_badges: i64,
    pub total_questions: i64,
    pub total_answers: i64,
    pub total_users: i64,
    pub total_comments: i64,
    pub total_votes: i64,
    pub first_badge_date: Option<String>,
    pub last_badge_date: Option<String>,
    pub first_question_date: Option<String>,
    pub last_question_date: Option<String>,
    pub first_answer_date: Option<String>,
    pub last_answer_date: Option<String>,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ==================== SITE OPERATIONS ====================

    /// Look up a site by its unique name.
    pub async fn find_site_by_name(&self, name: &str) -> Result<Option<Site>, AppError> {
        let row = sqlx::query("SELECT * FROM sites WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(site_from_row))
    }

    /// Insert a site or update its descriptive metadata, keyed by name.
    /// Returns the site id. Aggregate counters are left untouched.
    pub async fn upsert_site(
        &self,
        name: &str,
        description: Option<&str>,
        url: Option<&str>,
    ) -> Result<i64, AppError> {
        sqlx::query(
            r#"INSERT INTO sites (name, description, url) VALUES (?, ?, ?)
               ON CONFLICT(name) DO UPDATE SET description = excluded.description, url = excluded.url"#,
        )
        .bind(name)
        .bind(description)
        .bind(url)
        .execute(&self.pool)
        .await?;

        let row = sqlx::query("SELECT id FROM sites WHERE name = ?")
            .bind(name)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("id"))
    }

    /// Link a site to its parent by name. Returns false (and changes
    /// nothing) when either side is missing.
    pub async fn set_site_parent(&self, name: &str, parent_name: &str) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"UPDATE sites SET parent_id = (SELECT id FROM sites WHERE name = ?1)
               WHERE name = ?2 AND name != ?1
                 AND EXISTS (SELECT 1 FROM sites WHERE name = ?1)"#,
        )
        .bind(parent_name)
        .bind(name)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Refresh a site's denormalized counters and last-activity stamp from
    /// the loaded data.
    pub async fn update_site_counters(&self, site_id: i64) -> Result<(), AppError> {
        sqlx::query(
            r#"UPDATE sites SET
                total_questions = (SELECT COUNT(*) FROM posts WHERE site_id = ?1 AND post_type = 1),
                total_answers = (SELECT COUNT(*) FROM posts WHERE site_id = ?1 AND post_type = 2),
                total_users = (SELECT COUNT(*) FROM users WHERE site_id = ?1),
                total_comments = (SELECT COUNT(*) FROM comments WHERE site_id = ?1),
                total_tags = (SELECT COUNT(*) FROM tags WHERE site_id = ?1),
                last_activity_date = (SELECT MAX(last_activity_date) FROM posts WHERE site_id = ?1)
               WHERE id = ?1"#,
        )
        .bind(site_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // ==================== LIST QUERIES ====================

    pub async fn list_sites(
        &self,
        cfg: &ResourceConfig,
        q: &PreparedQuery,
    ) -> Result<Vec<Site>, AppError> {
        let rows = self.fetch_rows(cfg, q).await?;
        Ok(rows.iter().map(site_from_row).collect())
    }

    pub async fn list_posts(
        &self,
        cfg: &ResourceConfig,
        q: &PreparedQuery,
    ) -> Result<Vec<Post>, AppError> {
        let rows = self.fetch_rows(cfg, q).await?;
        Ok(rows.iter().map(post_from_row).collect())
    }

    pub async fn list_users(
        &self,
        cfg: &ResourceConfig,
        q: &PreparedQuery,
    ) -> Result<Vec<User>, AppError> {
        let rows = self.fetch_rows(cfg, q).await?;
        Ok(rows.iter().map(user_from_row).collect())
    }

    pub async fn list_badges(
        &self,
        cfg: &ResourceConfig,
        q: &PreparedQuery,
    ) -> Result<Vec<Badge>, AppError> {
        let rows = self.fetch_rows(cfg, q).await?;
        Ok(rows.iter().map(badge_from_row).collect())
    }

    pub async fn list_tags(
        &self,
        cfg: &ResourceConfig,
        q: &PreparedQuery,
    ) -> Result<Vec<Tag>, AppError> {
        let rows = self.fetch_rows(cfg, q).await?;
        Ok(rows.iter().map(tag_from_row).collect())
    }

    pub async fn list_comments(
        &self,
        cfg: &ResourceConfig,
        q: &PreparedQuery,
    ) -> Result<Vec<Comment>, AppError> {
        let rows = self.fetch_rows(cfg, q).await?;
        Ok(rows.iter().map(comment_from_row).collect())
    }

    async fn fetch_rows(
        &self,
        cfg: &ResourceConfig,
        q: &PreparedQuery,
    ) -> Result<Vec<sqlx::sqlite::SqliteRow>, AppError> {
        let mut qb = query::build_select(cfg, "*", q);
        Ok(qb.build().fetch_all(&self.pool).await?)
    }

    // ==================== REVISIONS ====================

    /// Grouped revision rows for a set of posts.
    ///
    /// History rows sharing a revision GUID form one logical revision; the
    /// grouping and per-post ranking happen here with a window function,
    /// partitioned by whether the group's history types intersect the
    /// vote-based set. This is the one aggregation too irregular for the
    /// generic filter/order pipeline.
    pub async fn revisions_for_posts(
        &self,
        site_id: i64,
        post_ids: &[i64],
    ) -> Result<Vec<Revision>, AppError> {
        if post_ids.is_empty() {
            return Ok(Vec::new());
        }

        let vote_types = VOTE_BASED_HISTORY_TYPES
            .iter()
            .map(|t| t.to_string())
            .collect::<Vec<_>>()
            .join(", ");

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            r#"SELECT post_id, revision_guid,
                      MIN(creation_date) AS creation_date,
                      MAX(user_id) AS user_id,
                      MAX(comment) AS comment,
                      MAX(CASE WHEN history_type IN ({vote_types}) THEN 1 ELSE 0 END) AS vote_based,
                      DENSE_RANK() OVER (
                          PARTITION BY post_id,
                              MAX(CASE WHEN history_type IN ({vote_types}) THEN 1 ELSE 0 END)
                          ORDER BY MIN(creation_date)
                      ) AS revision_number
               FROM post_history
               WHERE site_id = "#
        ));
        qb.push_bind(site_id);
        qb.push(" AND post_id IN (");
        let mut sep = qb.separated(", ");
        for id in post_ids {
            sep.push_bind(*id);
        }
        qb.push(") GROUP BY post_id, revision_guid ORDER BY post_id ASC, creation_date ASC");

        let rows = qb.build().fetch_all(&self.pool).await?;
        Ok(rows.iter().map(revision_from_row).collect())
    }

    // ==================== AGGREGATES ====================

    /// Compute the raw per-site totals and timestamp bounds behind the
    /// site-info response. Pure reads; callers own caching.
    pub async fn site_aggregates(&self, site_id: i64) -> Result<SiteAggregates, AppError> {
        let badges = sqlx::query(
            "SELECT COUNT(*) AS n, MIN(award_date) AS first, MAX(award_date) AS last
             FROM user_badges WHERE site_id = ?",
        )
        .bind(site_id)
        .fetch_one(&self.pool)
        .await?;

        let questions = sqlx::query(
            "SELECT COUNT(*) AS n, MIN(creation_date) AS first, MAX(creation_date) AS last
             FROM posts WHERE site_id = ? AND post_type = 1",
        )
        .bind(site_id)
        .fetch_one(&self.pool)
        .await?;

        let answers = sqlx::query(
            "SELECT COUNT(*) AS n, MIN(creation_date) AS first, MAX(creation_date) AS last
             FROM posts WHERE site_id = ? AND post_type = 2",
        )
        .bind(site_id)
        .fetch_one(&self.pool)
        .await?;

        let users = sqlx::query(
            "SELECT COUNT(*) AS n, COALESCE(SUM(up_votes + down_votes), 0) AS votes
             FROM users WHERE site_id = ?",
        )
        .bind(site_id)
        .fetch_one(&self.pool)
        .await?;

        let comments = sqlx::query("SELECT COUNT(*) AS n FROM comments WHERE site_id = ?")
            .bind(site_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(SiteAggregates {
            total_badges: badges.get("n"),
            total_questions: questions.get("n"),
            total_answers: answers.get("n"),
            total_users: users.get("n"),
            total_comments: comments.get("n"),
            total_votes: users.get("votes"),
            first_badge_date: badges.get("first"),
            last_badge_date: badges.get("last"),
            first_question_date: questions.get("first"),
            last_question_date: questions.get("last"),
            first_answer_date: answers.get("first"),
            last_answer_date: answers.get("last"),
        })
    }

    // ==================== BULK REPLACE ====================
    //
    // Each record kind is replaced inside one transaction: the site's slice
    // of the table is cleared and repopulated, so repeated loads of the same
    // input are idempotent. A kind either loads completely or not at all.

    pub async fn replace_tags(&self, site_id: i64, tags: &[Tag]) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM tags WHERE site_id = ?")
            .bind(site_id)
            .execute(&mut *tx)
            .await?;
        for tag in tags {
            sqlx::query(
                "INSERT INTO tags (site_id, id, name, count, excerpt_post_id, wiki_post_id)
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(site_id)
            .bind(tag.id)
            .bind(&tag.name)
            .bind(tag.count)
            .bind(tag.excerpt_post_id)
            .bind(tag.wiki_post_id)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn replace_users(&self, site_id: i64, users: &[User]) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM users WHERE site_id = ?")
            .bind(site_id)
            .execute(&mut *tx)
            .await?;
        for user in users {
            sqlx::query(
                r#"INSERT INTO users (site_id, id, display_name, reputation, creation_date,
                    last_access_date, website_url, location, about_me, views, up_votes,
                    down_votes, is_moderator, is_employee)
                   VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
            )
            .bind(site_id)
            .bind(user.id)
            .bind(&user.display_name)
            .bind(user.reputation)
            .bind(&user.creation_date)
            .bind(&user.last_access_date)
            .bind(&user.website_url)
            .bind(&user.location)
            .bind(&user.about_me)
            .bind(user.views)
            .bind(user.up_votes)
            .bind(user.down_votes)
            .bind(user.is_moderator as i32)
            .bind(user.is_employee as i32)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Replace posts and their tag links together; the links are derived
    /// from the post rows and are meaningless without them.
    pub async fn replace_posts(
        &self,
        site_id: i64,
        posts: &[Post],
        post_tags: &[(i64, i64)],
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM posts WHERE site_id = ?")
            .bind(site_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM post_tags WHERE site_id = ?")
            .bind(site_id)
            .execute(&mut *tx)
            .await?;
        for post in posts {
            sqlx::query(
                r#"INSERT INTO posts (site_id, id, post_type, title, body, score, view_count,
                    answer_count, comment_count, favorite_count, owner_user_id,
                    last_editor_user_id, parent_id, accepted_answer_id, creation_date,
                    last_edit_date, last_activity_date, content_license)
                   VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
            )
            .bind(site_id)
            .bind(post.id)
            .bind(post.post_type)
            .bind(&post.title)
            .bind(&post.body)
            .bind(post.score)
            .bind(post.view_count)
            .bind(post.answer_count)
            .bind(post.comment_count)
            .bind(post.favorite_count)
            .bind(post.owner_user_id)
            .bind(post.last_editor_user_id)
            .bind(post.parent_id)
            .bind(post.accepted_answer_id)
            .bind(&post.creation_date)
            .bind(&post.last_edit_date)
            .bind(&post.last_activity_date)
            .bind(&post.content_license)
            .execute(&mut *tx)
            .await?;
        }
        for (post_id, tag_id) in post_tags {
            sqlx::query("INSERT INTO post_tags (site_id, post_id, tag_id) VALUES (?, ?, ?)")
                .bind(site_id)
                .bind(post_id)
                .bind(tag_id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn replace_badges(
        &self,
        site_id: i64,
        badges: &[Badge],
        awards: &[UserBadge],
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM badges WHERE site_id = ?")
            .bind(site_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM user_badges WHERE site_id = ?")
            .bind(site_id)
            .execute(&mut *tx)
            .await?;
        for badge in badges {
            sqlx::query(
                "INSERT INTO badges (site_id, id, name, rank, kind, award_count)
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(site_id)
            .bind(badge.id)
            .bind(&badge.name)
            .bind(&badge.rank)
            .bind(&badge.kind)
            .bind(badge.award_count)
            .execute(&mut *tx)
            .await?;
        }
        for award in awards {
            sqlx::query(
                "INSERT INTO user_badges (site_id, user_id, badge_id, award_date)
                 VALUES (?, ?, ?, ?)",
            )
            .bind(site_id)
            .bind(award.user_id)
            .bind(award.badge_id)
            .bind(&award.award_date)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn replace_comments(
        &self,
        site_id: i64,
        comments: &[Comment],
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM comments WHERE site_id = ?")
            .bind(site_id)
            .execute(&mut *tx)
            .await?;
        for comment in comments {
            sqlx::query(
                r#"INSERT INTO comments (site_id, id, post_id, user_id, score, text, creation_date)
                   VALUES (?, ?, ?, ?, ?, ?, ?)"#,
            )
            .bind(site_id)
            .bind(comment.id)
            .bind(comment.post_id)
            .bind(comment.user_id)
            .bind(comment.score)
            .bind(&comment.text)
            .bind(&comment.creation_date)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn replace_post_history(
        &self,
        site_id: i64,
        rows: &[PostHistory],
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM post_history WHERE site_id = ?")
            .bind(site_id)
            .execute(&mut *tx)
            .await?;
        for row in rows {
            sqlx::query(
                r#"INSERT INTO post_history (site_id, id, post_id, history_type, revision_guid,
                    user_id, creation_date, comment)
                   VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
            )
            .bind(site_id)
            .bind(row.id)
            .bind(row.post_id)
            .bind(row.history_type)
            .bind(&row.revision_guid)
            .bind(row.user_id)
            .bind(&row.creation_date)
            .bind(&row.comment)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    // ==================== MAINTENANCE ====================

    /// Refresh the query planner's statistics after a bulk load.
    pub async fn analyze(&self) -> Result<(), AppError> {
        sqlx::query("ANALYZE").execute(&self.pool).await?;
        Ok(())
    }
}

// Helper functions for row conversion

fn site_from_row(row: &sqlx::sqlite::SqliteRow) -> Site {
    Site {
        id: row.get("id"),
        name: row.get("name"),
        description: row.get("description"),
        url: row.get("url"),
        parent_id: row.get("parent_id"),
        total_questions: row.get("total_questions"),
        total_answers: row.get("total_answers"),
        total_users: row.get("total_users"),
        total_comments: row.get("total_comments"),
        total_tags: row.get("total_tags"),
        last_activity_date: row.get("last_activity_date"),
    }
}

fn post_from_row(row: &sqlx::sqlite::SqliteRow) -> Post {
    Post {
        id: row.get("id"),
        site_id: row.get("site_id"),
        post_type: row.get("post_type"),
        title: row.get("title"),
        body: row.get("body"),
        score: row.get("score"),
        view_count: row.get("view_count"),
        answer_count: row.get("answer_count"),
        comment_count: row.get("comment_count"),
        favorite_count: row.get("favorite_count"),
        owner_user_id: row.get("owner_user_id"),
        last_editor_user_id: row.get("last_editor_user_id"),
        parent_id: row.get("parent_id"),
        accepted_answer_id: row.get("accepted_answer_id"),
        creation_date: row.get("creation_date"),
        last_edit_date: row.get("last_edit_date"),
        last_activity_date: row.get("last_activity_date"),
        content_license: row.get("content_license"),
    }
}

fn user_from_row(row: &sqlx::sqlite::SqliteRow) -> User {
    let is_moderator: i32 = row.get("is_moderator");
    let is_employee: i32 = row.get("is_employee");
    User {
        id: row.get("id"),
        site_id: row.get("site_id"),
        display_name: row.get("display_name"),
        reputation: row.get("reputation"),
        creation_date: row.get("creation_date"),
        last_access_date: row.get("last_access_date"),
        website_url: row.get("website_url"),
        location: row.get("location"),
        about_me: row.get("about_me"),
        views: row.get("views"),
        up_votes: row.get("up_votes"),
        down_votes: row.get("down_votes"),
        is_moderator: is_moderator != 0,
        is_employee: is_employee != 0,
    }
}

fn badge_from_row(row: &sqlx::sqlite::SqliteRow) -> Badge {
    Badge {
        id: row.get("id"),
        site_id: row.get("site_id"),
        name: row.get("name"),
        rank: row.get("rank"),
        kind: row.get("kind"),
        award_count: row.get("award_count"),
    }
}

fn tag_from_row(row: &sqlx::sqlite::SqliteRow) -> Tag {
    Tag {
        id: row.get("id"),
        site_id: row.get("site_id"),
        name: row.get("name"),
        count: row.get("count"),
        excerpt_post_id: row.get("excerpt_post_id"),
        wiki_post_id: row.get("wiki_post_id"),
    }
}

fn comment_from_row(row: &sqlx::sqlite::SqliteRow) -> Comment {
    Comment {
        id: row.get("id"),
        site_id: row.get("site_id"),
        post_id: row.get("post_id"),
        user_id: row.get("user_id"),
        score: row.get("score"),
        text: row.get("text"),
        creation_date: row.get("creation_date"),
    }
}

fn revision_from_row(row: &sqlx::sqlite::SqliteRow) -> Revision {
    let vote_based: i64 = row.get("vote_based");
    Revision {
        post_id: row.get("post_id"),
        revision_guid: row.get("revision_guid"),
        revision_number: row.get("revision_number"),
        vote_based: vote_based != 0,
        user_id: row.get("user_id"),
        creation_date: row.get("creation_date"),
        comment: row.get("comment"),
    }
}
