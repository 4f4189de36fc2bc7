//! Row-oriented dump parsing.
//!
//! Every dump file is a flat XML document whose data rows are `<row .../>`
//! elements with one attribute per field. Parsing streams events and never
//! materializes the document tree.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::errors::AppError;
use crate::models::{Badge, Comment, Post, PostHistory, Tag, User, UserBadge};

type Row = HashMap<String, String>;

/// Streaming reader over the `<row .../>` elements of one dump file.
pub struct RowReader<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    source: String,
}

impl RowReader<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self, AppError> {
        let file = File::open(path).map_err(|e| {
            AppError::Archive(format!("Cannot open dump file {}: {}", path.display(), e))
        })?;
        Ok(Self::new(
            Reader::from_reader(BufReader::new(file)),
            path.display().to_string(),
        ))
    }
}

impl<'a> RowReader<&'a [u8]> {
    pub fn from_str(xml: &'a str, source: &str) -> Self {
        Self::new(Reader::from_reader(xml.as_bytes()), source.to_string())
    }
}

impl<R: BufRead> RowReader<R> {
    fn new(reader: Reader<R>, source: String) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            source,
        }
    }

    /// Next data row, or `None` at end of document.
    pub fn next_row(&mut self) -> Result<Option<Row>, AppError> {
        loop {
            self.buf.clear();
            match self.reader.read_event_into(&mut self.buf)? {
                Event::Empty(e) | Event::Start(e) if e.name().as_ref() == b"row" => {
                    let mut row = Row::new();
                    for attr in e.attributes() {
                        let attr = attr.map_err(|err| {
                            AppError::Archive(format!(
                                "{}: malformed attribute: {}",
                                self.source, err
                            ))
                        })?;
                        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
                        let value = attr.unescape_value()?.into_owned();
                        row.insert(key, value);
                    }
                    return Ok(Some(row));
                }
                Event::Eof => return Ok(None),
                _ => continue,
            }
        }
    }
}

// Attribute accessors. Dump integers and dates arrive as text; a value that
// is present but unparseable means a corrupt dump, which fails the run.

fn opt_str(row: &Row, key: &str) -> Option<String> {
    row.get(key).filter(|v| !v.is_empty()).cloned()
}

fn req_str(row: &Row, key: &str, source: &str) -> Result<String, AppError> {
    opt_str(row, key)
        .ok_or_else(|| AppError::Archive(format!("{}: row missing attribute '{}'", source, key)))
}

fn opt_i64(row: &Row, key: &str, source: &str) -> Result<Option<i64>, AppError> {
    match row.get(key).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => v.parse().map(Some).map_err(|_| {
            AppError::Archive(format!("{}: attribute '{}' is not an integer: '{}'", source, key, v))
        }),
    }
}

fn req_i64(row: &Row, key: &str, source: &str) -> Result<i64, AppError> {
    opt_i64(row, key, source)?
        .ok_or_else(|| AppError::Archive(format!("{}: row missing attribute '{}'", source, key)))
}

fn i64_or(row: &Row, key: &str, default: i64, source: &str) -> Result<i64, AppError> {
    Ok(opt_i64(row, key, source)?.unwrap_or(default))
}

fn opt_bool(row: &Row, key: &str) -> bool {
    row.get(key).map(|v| v == "True" || v == "true").unwrap_or(false)
}

fn opt_date(row: &Row, key: &str, source: &str) -> Result<Option<String>, AppError> {
    row.get(key)
        .filter(|v| !v.is_empty())
        .map(|v| normalize_date(v, source))
        .transpose()
}

fn req_date(row: &Row, key: &str, source: &str) -> Result<String, AppError> {
    opt_date(row, key, source)?
        .ok_or_else(|| AppError::Archive(format!("{}: row missing attribute '{}'", source, key)))
}

/// Dump timestamps are naive ISO-ish strings in UTC; normalize to one RFC
/// 3339 form so stored values compare consistently.
fn normalize_date(raw: &str, source: &str) -> Result<String, AppError> {
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map_err(|_| AppError::Archive(format!("{}: invalid timestamp '{}'", source, raw)))?;
    Ok(DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc)
        .to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Parse a post row's inline tag list. Older dumps write `<a><b>`, newer
/// ones `|a|b|`.
pub fn parse_tag_list(raw: &str) -> Vec<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    let (body, sep) = if trimmed.starts_with('<') {
        (trimmed.trim_start_matches('<').trim_end_matches('>'), "><")
    } else {
        (trimmed.trim_matches('|'), "|")
    };
    body.split(sep)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

// ==================== RECORD KINDS ====================

pub fn read_tags(path: &Path, site_id: i64) -> Result<Vec<Tag>, AppError> {
    parse_tags(RowReader::open(path)?, site_id)
}

fn parse_tags<R: BufRead>(mut rows: RowReader<R>, site_id: i64) -> Result<Vec<Tag>, AppError> {
    let source = rows.source.clone();
    let mut tags = Vec::new();
    while let Some(row) = rows.next_row()? {
        tags.push(Tag {
            id: req_i64(&row, "Id", &source)?,
            site_id,
            name: req_str(&row, "TagName", &source)?,
            count: i64_or(&row, "Count", 0, &source)?,
            excerpt_post_id: opt_i64(&row, "ExcerptPostId", &source)?,
            wiki_post_id: opt_i64(&row, "WikiPostId", &source)?,
        });
    }
    Ok(tags)
}

pub fn read_users(path: &Path, site_id: i64) -> Result<Vec<User>, AppError> {
    parse_users(RowReader::open(path)?, site_id)
}

fn parse_users<R: BufRead>(mut rows: RowReader<R>, site_id: i64) -> Result<Vec<User>, AppError> {
    let source = rows.source.clone();
    let mut users = Vec::new();
    while let Some(row) = rows.next_row()? {
        users.push(User {
            id: req_i64(&row, "Id", &source)?,
            site_id,
            display_name: req_str(&row, "DisplayName", &source)?,
            reputation: i64_or(&row, "Reputation", 0, &source)?,
            creation_date: opt_date(&row, "CreationDate", &source)?,
            last_access_date: opt_date(&row, "LastAccessDate", &source)?,
            website_url: opt_str(&row, "WebsiteUrl"),
            location: opt_str(&row, "Location"),
            about_me: opt_str(&row, "AboutMe"),
            views: i64_or(&row, "Views", 0, &source)?,
            up_votes: i64_or(&row, "UpVotes", 0, &source)?,
            down_votes: i64_or(&row, "DownVotes", 0, &source)?,
            is_moderator: opt_bool(&row, "IsModerator"),
            is_employee: opt_bool(&row, "IsEmployee"),
        });
    }
    Ok(users)
}

/// Parse posts and derive the post-tag links from each row's inline tag
/// list. A tag name that never appeared in the tags file is a
/// data-integrity error and fails the run rather than silently dropping the
/// link.
pub fn read_posts(
    path: &Path,
    site_id: i64,
    tag_ids: &HashMap<String, i64>,
) -> Result<(Vec<Post>, Vec<(i64, i64)>), AppError> {
    parse_posts(RowReader::open(path)?, site_id, tag_ids)
}

fn parse_posts<R: BufRead>(
    mut rows: RowReader<R>,
    site_id: i64,
    tag_ids: &HashMap<String, i64>,
) -> Result<(Vec<Post>, Vec<(i64, i64)>), AppError> {
    let source = rows.source.clone();
    let mut posts = Vec::new();
    let mut links = Vec::new();
    while let Some(row) = rows.next_row()? {
        let id = req_i64(&row, "Id", &source)?;
        let post_type = req_i64(&row, "PostTypeId", &source)?;

        if let Some(raw_tags) = row.get("Tags") {
            for name in parse_tag_list(raw_tags) {
                let tag_id = tag_ids.get(&name).ok_or_else(|| {
                    AppError::DataIntegrity(format!(
                        "{}: post {} references unknown tag '{}'",
                        source, id, name
                    ))
                })?;
                links.push((id, *tag_id));
            }
        }

        posts.push(Post {
            id,
            site_id,
            post_type,
            title: opt_str(&row, "Title"),
            body: opt_str(&row, "Body"),
            score: i64_or(&row, "Score", 0, &source)?,
            view_count: opt_i64(&row, "ViewCount", &source)?,
            answer_count: opt_i64(&row, "AnswerCount", &source)?,
            comment_count: i64_or(&row, "CommentCount", 0, &source)?,
            favorite_count: i64_or(&row, "FavoriteCount", 0, &source)?,
            owner_user_id: opt_i64(&row, "OwnerUserId", &source)?,
            last_editor_user_id: opt_i64(&row, "LastEditorUserId", &source)?,
            parent_id: opt_i64(&row, "ParentId", &source)?,
            accepted_answer_id: opt_i64(&row, "AcceptedAnswerId", &source)?,
            creation_date: opt_date(&row, "CreationDate", &source)?,
            last_edit_date: opt_date(&row, "LastEditDate", &source)?,
            last_activity_date: opt_date(&row, "LastActivityDate", &source)?,
            content_license: opt_str(&row, "ContentLicense"),
        });
    }
    Ok((posts, links))
}

/// Parse the per-award badge rows into distinct badge definitions plus the
/// award join rows. Definition ids are assigned in first-seen order.
pub fn read_badges(path: &Path, site_id: i64) -> Result<(Vec<Badge>, Vec<UserBadge>), AppError> {
    parse_badges(RowReader::open(path)?, site_id)
}

fn parse_badges<R: BufRead>(
    mut rows: RowReader<R>,
    site_id: i64,
) -> Result<(Vec<Badge>, Vec<UserBadge>), AppError> {
    let source = rows.source.clone();
    let mut badges: Vec<Badge> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut awards = Vec::new();

    while let Some(row) = rows.next_row()? {
        let name = req_str(&row, "Name", &source)?;
        let slot = match index.get(&name) {
            Some(&slot) => slot,
            None => {
                let rank = match req_i64(&row, "Class", &source)? {
                    1 => "gold",
                    2 => "silver",
                    3 => "bronze",
                    other => {
                        return Err(AppError::Archive(format!(
                            "{}: unknown badge class {}",
                            source, other
                        )))
                    }
                };
                let kind = if opt_bool(&row, "TagBased") {
                    "tag_based"
                } else {
                    "named"
                };
                badges.push(Badge {
                    id: badges.len() as i64 + 1,
                    site_id,
                    name: name.clone(),
                    rank: rank.to_string(),
                    kind: kind.to_string(),
                    award_count: 0,
                });
                index.insert(name.clone(), badges.len() - 1);
                badges.len() - 1
            }
        };
        badges[slot].award_count += 1;
        awards.push(UserBadge {
            site_id,
            user_id: req_i64(&row, "UserId", &source)?,
            badge_id: badges[slot].id,
            award_date: req_date(&row, "Date", &source)?,
        });
    }
    Ok((badges, awards))
}

pub fn read_comments(path: &Path, site_id: i64) -> Result<Vec<Comment>, AppError> {
    parse_comments(RowReader::open(path)?, site_id)
}

fn parse_comments<R: BufRead>(
    mut rows: RowReader<R>,
    site_id: i64,
) -> Result<Vec<Comment>, AppError> {
    let source = rows.source.clone();
    let mut comments = Vec::new();
    while let Some(row) = rows.next_row()? {
        comments.push(Comment {
            id: req_i64(&row, "Id", &source)?,
            site_id,
            post_id: req_i64(&row, "PostId", &source)?,
            user_id: opt_i64(&row, "UserId", &source)?,
            score: i64_or(&row, "Score", 0, &source)?,
            text: req_str(&row, "Text", &source)?,
            creation_date: opt_date(&row, "CreationDate", &source)?,
        });
    }
    Ok(comments)
}

pub fn read_post_history(path: &Path, site_id: i64) -> Result<Vec<PostHistory>, AppError> {
    parse_post_history(RowReader::open(path)?, site_id)
}

fn parse_post_history<R: BufRead>(
    mut rows: RowReader<R>,
    site_id: i64,
) -> Result<Vec<PostHistory>, AppError> {
    let source = rows.source.clone();
    let mut history = Vec::new();
    while let Some(row) = rows.next_row()? {
        history.push(PostHistory {
            id: req_i64(&row, "Id", &source)?,
            site_id,
            post_id: req_i64(&row, "PostId", &source)?,
            history_type: req_i64(&row, "PostHistoryTypeId", &source)?,
            revision_guid: req_str(&row, "RevisionGUID", &source)?,
            user_id: opt_i64(&row, "UserId", &source)?,
            creation_date: opt_date(&row, "CreationDate", &source)?,
            comment: opt_str(&row, "Comment"),
        });
    }
    Ok(history)
}

/// One entry of the sites manifest.
#[derive(Debug)]
pub struct SiteManifestEntry {
    pub name: String,
    pub description: Option<String>,
    pub url: Option<String>,
    pub parent: Option<String>,
}

/// Parse the sites-manifest document.
pub fn parse_site_manifest(xml: &str) -> Result<Vec<SiteManifestEntry>, AppError> {
    let mut rows = RowReader::from_str(xml, "Sites.xml");
    let source = rows.source.clone();
    let mut sites = Vec::new();
    while let Some(row) = rows.next_row()? {
        sites.push(SiteManifestEntry {
            name: req_str(&row, "Name", &source)?,
            description: opt_str(&row, "Description"),
            url: opt_str(&row, "Url"),
            parent: opt_str(&row, "Parent"),
        });
    }
    Ok(sites)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader(xml: &str) -> RowReader<&[u8]> {
        RowReader::from_str(xml, "test.xml")
    }

    #[test]
    fn reads_attribute_per_element_rows() {
        let xml = r#"<?xml version="1.0"?>
            <tags>
              <row Id="1" TagName="rust" Count="10" />
              <row Id="2" TagName="async" Count="4" ExcerptPostId="7" />
            </tags>"#;
        let tags = parse_tags(reader(xml), 1).unwrap();
        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0].name, "rust");
        assert_eq!(tags[1].excerpt_post_id, Some(7));
    }

    #[test]
    fn unescapes_attribute_entities() {
        let xml = r#"<c><row Id="1" PostId="2" Text="a &amp; b &lt;c&gt;" /></c>"#;
        let comments = parse_comments(reader(xml), 1).unwrap();
        assert_eq!(comments[0].text, "a & b <c>");
    }

    #[test]
    fn normalizes_dump_timestamps() {
        let xml = r#"<u><row Id="1" DisplayName="alice" CreationDate="2010-07-28T16:28:47.387" /></u>"#;
        let users = parse_users(reader(xml), 1).unwrap();
        assert_eq!(
            users[0].creation_date.as_deref(),
            Some("2010-07-28T16:28:47.387Z")
        );
    }

    #[test]
    fn invalid_timestamp_fails_the_parse() {
        let xml = r#"<u><row Id="1" DisplayName="a" CreationDate="yesterday" /></u>"#;
        let err = parse_users(reader(xml), 1).unwrap_err();
        assert_eq!(err.error_name(), "archive_error");
    }

    #[test]
    fn tag_list_supports_both_dump_formats() {
        assert_eq!(parse_tag_list("<rust><async>"), vec!["rust", "async"]);
        assert_eq!(parse_tag_list("|rust|async|"), vec!["rust", "async"]);
        assert!(parse_tag_list("").is_empty());
    }

    #[test]
    fn post_tags_resolve_through_the_name_map() {
        let xml = r#"<p><row Id="5" PostTypeId="1" Title="q" Tags="&lt;rust&gt;&lt;async&gt;" /></p>"#;
        let mut ids = HashMap::new();
        ids.insert("rust".to_string(), 1);
        ids.insert("async".to_string(), 2);
        let (posts, links) = parse_posts(reader(xml), 1, &ids).unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(links, vec![(5, 1), (5, 2)]);
    }

    #[test]
    fn unknown_tag_reference_is_a_data_integrity_error() {
        let xml = r#"<p><row Id="5" PostTypeId="1" Tags="&lt;ghost&gt;" /></p>"#;
        let err = parse_posts(reader(xml), 1, &HashMap::new()).unwrap_err();
        assert_eq!(err.error_name(), "data_integrity");
        assert!(err.message().contains("ghost"));
    }

    #[test]
    fn badge_definitions_are_deduplicated_with_award_counts() {
        let xml = r#"<b>
            <row Id="1" UserId="10" Name="Teacher" Class="3" Date="2023-01-01T00:00:00.000" />
            <row Id="2" UserId="11" Name="Teacher" Class="3" Date="2023-01-02T00:00:00.000" />
            <row Id="3" UserId="10" Name="Legendary" Class="1" Date="2023-01-03T00:00:00.000" />
        </b>"#;
        let (badges, awards) = parse_badges(reader(xml), 1).unwrap();
        assert_eq!(badges.len(), 2);
        assert_eq!(awards.len(), 3);
        let teacher = badges.iter().find(|b| b.name == "Teacher").unwrap();
        assert_eq!(teacher.award_count, 2);
        assert_eq!(teacher.rank, "bronze");
        let legendary = badges.iter().find(|b| b.name == "Legendary").unwrap();
        assert_eq!(legendary.rank, "gold");
        // Both Teacher awards point at the same definition.
        assert_eq!(awards[0].badge_id, awards[1].badge_id);
    }

    #[test]
    fn manifest_rows_parse_names_and_parents() {
        let xml = r#"<sites>
            <row Name="example" Url="https://example.com" Description="Main site" />
            <row Name="meta.example" Parent="example" />
        </sites>"#;
        let sites = parse_site_manifest(xml).unwrap();
        assert_eq!(sites.len(), 2);
        assert_eq!(sites[1].parent.as_deref(), Some("example"));
    }
}
