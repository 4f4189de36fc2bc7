//! Site aggregate/info service.
//!
//! Computes per-site summary statistics and caches them indefinitely; the
//! cache is only invalidated explicitly, after a bulk load lands new data.
//! Recomputation is not locked against concurrent callers: two simultaneous
//! misses may both recompute, which is safe because the computation is a
//! pure read and the last cache write wins.

use std::sync::Arc;

use chrono::DateTime;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::db::{Repository, SiteAggregates};
use crate::errors::AppError;
use crate::models::Site;

/// Typed cache key, so entries cannot collide with other cached shapes by
/// naming convention alone.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SiteKey(String);

impl SiteKey {
    pub fn new(site_name: &str) -> Self {
        Self(site_name.to_string())
    }
}

/// Summary statistics for one site.
///
/// Rates are per minute over the span between the first and last event of
/// their kind, and are omitted entirely when there is no positive count or
/// no measurable span.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteInfo {
    pub site: String,
    pub total_badges: i64,
    pub total_questions: i64,
    pub total_answers: i64,
    pub total_users: i64,
    pub total_votes: i64,
    pub total_comments: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_badge_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_badge_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_question_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_question_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_answer_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_answer_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badges_per_minute: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub questions_per_minute: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answers_per_minute: Option<f64>,
}

/// Caching site-info service.
#[derive(Default)]
pub struct SiteInfoService {
    cache: DashMap<SiteKey, Arc<SiteInfo>>,
}

impl SiteInfoService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached value for a site, computing and caching it on miss.
    pub async fn get(&self, repo: &Repository, site: &Site) -> Result<Arc<SiteInfo>, AppError> {
        let key = SiteKey::new(&site.name);
        if let Some(cached) = self.cache.get(&key) {
            return Ok(Arc::clone(&cached));
        }

        let aggregates = repo.site_aggregates(site.id).await?;
        let info = Arc::new(build_info(&site.name, aggregates));
        self.cache.insert(key, Arc::clone(&info));
        Ok(info)
    }

    /// Evict a site's cached aggregates. Called after bulk loads, since the
    /// cached value is stale the moment new data lands.
    pub fn invalidate(&self, site_name: &str) {
        self.cache.remove(&SiteKey::new(site_name));
    }
}

fn build_info(site_name: &str, agg: SiteAggregates) -> SiteInfo {
    SiteInfo {
        site: site_name.to_string(),
        total_badges: agg.total_badges,
        total_questions: agg.total_questions,
        total_answers: agg.total_answers,
        total_users: agg.total_users,
        total_votes: agg.total_votes,
        total_comments: agg.total_comments,
        badges_per_minute: per_minute(
            agg.total_badges,
            agg.first_badge_date.as_deref(),
            agg.last_badge_date.as_deref(),
        ),
        questions_per_minute: per_minute(
            agg.total_questions,
            agg.first_question_date.as_deref(),
            agg.last_question_date.as_deref(),
        ),
        answers_per_minute: per_minute(
            agg.total_answers,
            agg.first_answer_date.as_deref(),
            agg.last_answer_date.as_deref(),
        ),
        first_badge_date: agg.first_badge_date,
        last_badge_date: agg.last_badge_date,
        first_question_date: agg.first_question_date,
        last_question_date: agg.last_question_date,
        first_answer_date: agg.first_answer_date,
        last_answer_date: agg.last_answer_date,
    }
}

/// `count / elapsed_minutes`, or `None` when either boundary timestamp is
/// missing, the count is zero, or the elapsed span is not positive.
fn per_minute(count: i64, first: Option<&str>, last: Option<&str>) -> Option<f64> {
    if count <= 0 {
        return None;
    }
    let first = DateTime::parse_from_rfc3339(first?).ok()?;
    let last = DateTime::parse_from_rfc3339(last?).ok()?;
    let minutes = (last - first).num_seconds() as f64 / 60.0;
    if minutes <= 0.0 {
        return None;
    }
    Some(count as f64 / minutes)
}
