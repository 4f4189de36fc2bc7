//! Bulk data loader.
//!
//! One load runs the fixed stage sequence: resolve site, download or reuse
//! the cached archive, extract, replace each record kind, refresh storage
//! statistics, invalidate the site-info cache. Any error aborts the whole
//! run; there is no checkpointing. Loads are expected to be serialized
//! externally, one per site at a time: two concurrent loads for the same
//! site would race on the cache files and the full-table replaces.

pub mod dump;

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::db::Repository;
use crate::errors::AppError;
use crate::siteinfo::SiteInfoService;

/// Counts from one completed load, for operator logging.
#[derive(Debug, Default)]
pub struct LoadSummary {
    pub site: String,
    pub reused_archive: bool,
    pub tags: usize,
    pub users: usize,
    pub posts: usize,
    pub post_links: usize,
    pub badges: usize,
    pub awards: usize,
    pub comments: usize,
    pub history: usize,
}

/// Downloads, extracts and ingests one site's dump archive.
pub struct Loader {
    repo: Repository,
    siteinfo: Arc<SiteInfoService>,
    http: reqwest::Client,
    archive_url: String,
    cache_dir: PathBuf,
}

impl Loader {
    pub fn new(
        repo: Repository,
        siteinfo: Arc<SiteInfoService>,
        config: &Config,
    ) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()?;
        std::fs::create_dir_all(&config.cache_dir)?;
        Ok(Self {
            repo,
            siteinfo,
            http,
            archive_url: config.archive_url.trim_end_matches('/').to_string(),
            cache_dir: config.cache_dir.clone(),
        })
    }

    /// Fetch the sites manifest and upsert the tenant directory. Parent
    /// links are resolved in a second pass once every name exists.
    pub async fn sync_sites(&self) -> Result<usize, AppError> {
        let url = format!("{}/Sites.xml", self.archive_url);
        tracing::info!(%url, "fetching sites manifest");
        let body = self
            .http
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let entries = dump::parse_site_manifest(&body)?;
        for entry in &entries {
            self.repo
                .upsert_site(&entry.name, entry.description.as_deref(), entry.url.as_deref())
                .await?;
        }
        for entry in &entries {
            if let Some(parent) = &entry.parent {
                if !self.repo.set_site_parent(&entry.name, parent).await? {
                    tracing::warn!(site = %entry.name, %parent, "manifest names a missing parent site");
                }
            }
        }
        tracing::info!(sites = entries.len(), "sites manifest synced");
        Ok(entries.len())
    }

    /// Load one site's archive end to end.
    pub async fn load_site(&self, name: &str) -> Result<LoadSummary, AppError> {
        let site = self
            .repo
            .find_site_by_name(name)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Unknown site: {}", name)))?;

        let (archive, reused_archive) = self.fetch_archive(name).await?;
        let scratch = self.extract(name, &archive)?;

        let mut summary = LoadSummary {
            site: name.to_string(),
            reused_archive,
            ..LoadSummary::default()
        };

        // Tags first: post-tag linkage resolves names through this load.
        let tags = dump::read_tags(&scratch.join("Tags.xml"), site.id)?;
        let tag_ids: HashMap<String, i64> =
            tags.iter().map(|t| (t.name.clone(), t.id)).collect();
        self.repo.replace_tags(site.id, &tags).await?;
        summary.tags = tags.len();

        let users = dump::read_users(&scratch.join("Users.xml"), site.id)?;
        self.repo.replace_users(site.id, &users).await?;
        summary.users = users.len();

        let (posts, links) = dump::read_posts(&scratch.join("Posts.xml"), site.id, &tag_ids)?;
        self.repo.replace_posts(site.id, &posts, &links).await?;
        summary.posts = posts.len();
        summary.post_links = links.len();

        let (badges, awards) = dump::read_badges(&scratch.join("Badges.xml"), site.id)?;
        self.repo.replace_badges(site.id, &badges, &awards).await?;
        summary.badges = badges.len();
        summary.awards = awards.len();

        let comments = dump::read_comments(&scratch.join("Comments.xml"), site.id)?;
        self.repo.replace_comments(site.id, &comments).await?;
        summary.comments = comments.len();

        let history = dump::read_post_history(&scratch.join("PostHistory.xml"), site.id)?;
        self.repo.replace_post_history(site.id, &history).await?;
        summary.history = history.len();

        // Post-load maintenance: fresh planner statistics, fresh counters,
        // and the cached aggregates are stale now.
        self.repo.analyze().await?;
        self.repo.update_site_counters(site.id).await?;
        self.siteinfo.invalidate(name);

        tracing::info!(
            site = name,
            posts = summary.posts,
            users = summary.users,
            tags = summary.tags,
            badges = summary.badges,
            comments = summary.comments,
            history = summary.history,
            "load complete"
        );
        Ok(summary)
    }

    /// Download the site archive, or reuse the cached copy when the remote
    /// content tag matches the one recorded at the previous download.
    async fn fetch_archive(&self, site: &str) -> Result<(PathBuf, bool), AppError> {
        let url = format!("{}/{}.zip", self.archive_url, site);
        let archive = self.cache_dir.join(format!("{}.zip", site));
        let tag_file = self.cache_dir.join(format!("{}.etag", site));

        let head = self.http.head(&url).send().await?.error_for_status()?;
        let remote_tag = head
            .headers()
            .get(reqwest::header::ETAG)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let cached_tag = std::fs::read_to_string(&tag_file).ok();

        if archive.exists() && remote_tag.is_some() && remote_tag == cached_tag {
            tracing::info!(site, "archive unchanged, reusing cached copy");
            return Ok((archive, true));
        }

        tracing::info!(site, %url, "downloading archive");
        let mut resp = self.http.get(&url).send().await?.error_for_status()?;

        // Archives run to gigabytes; stream chunks straight to disk. The
        // partial file is renamed into place only once the body completes,
        // so an aborted download never sits behind a matching content tag.
        let partial = self.cache_dir.join(format!("{}.zip.part", site));
        let mut out = std::fs::File::create(&partial)?;
        while let Some(chunk) = resp.chunk().await? {
            out.write_all(&chunk)?;
        }
        out.flush()?;
        drop(out);
        std::fs::rename(&partial, &archive)?;
        match &remote_tag {
            Some(tag) => std::fs::write(&tag_file, tag)?,
            None => {
                // No content tag offered: forget any stale one so the next
                // run downloads again.
                let _ = std::fs::remove_file(&tag_file);
            }
        }
        Ok((archive, false))
    }

    /// Decompress the archive into a per-site scratch directory, replacing
    /// whatever a previous run left there.
    fn extract(&self, site: &str, archive: &Path) -> Result<PathBuf, AppError> {
        let scratch = self.cache_dir.join(format!("{}.extracted", site));
        if scratch.exists() {
            std::fs::remove_dir_all(&scratch)?;
        }
        std::fs::create_dir_all(&scratch)?;

        let file = std::fs::File::open(archive)?;
        let mut zip = zip::ZipArchive::new(file)?;
        zip.extract(&scratch)?;
        tracing::info!(site, files = zip.len(), "archive extracted");
        Ok(scratch)
    }
}
