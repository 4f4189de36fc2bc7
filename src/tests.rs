//! Integration tests for the Quarry backend.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::response::IntoResponse;
use reqwest::Client;
use serde_json::Value;
use tempfile::TempDir;

use crate::config::Config;
use crate::db::{init_database, Repository};
use crate::loader::Loader;
use crate::models::{Badge, Comment, Post, PostHistory, Tag, User, UserBadge};
use crate::siteinfo::SiteInfoService;
use crate::{create_router, AppState};

/// Test fixture for integration tests.
struct TestFixture {
    client: Client,
    base_url: String,
    repo: Arc<Repository>,
    _temp_dir: TempDir,
}

impl TestFixture {
    async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config = test_config(temp_dir.path());

        let pool = init_database(&config.db_path).await.expect("Failed to init DB");
        let repo = Arc::new(Repository::new(pool));

        let state = AppState {
            repo: Arc::clone(&repo),
            siteinfo: Arc::new(SiteInfoService::new()),
        };

        let app = create_router(state);

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get addr");
        let base_url = format!("http://{}", addr);

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        TestFixture {
            client: Client::new(),
            base_url,
            repo,
            _temp_dir: temp_dir,
        }
    }

    /// Fixture with a small, fully known site already loaded.
    async fn seeded() -> Self {
        let fixture = Self::new().await;
        seed_demo_site(&fixture.repo).await;
        fixture
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get(&self, path: &str) -> (u16, Value) {
        let resp = self.client.get(self.url(path)).send().await.unwrap();
        let status = resp.status().as_u16();
        let body = resp.json().await.unwrap();
        (status, body)
    }
}

fn test_config(dir: &Path) -> Config {
    Config {
        db_path: dir.join("test.sqlite"),
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        log_level: "warn".to_string(),
        archive_url: "http://127.0.0.1:1/unused".to_string(),
        cache_dir: dir.join("dumps"),
        http_timeout_secs: 5,
    }
}

fn item_ids(body: &Value) -> Vec<i64> {
    body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["id"].as_i64().unwrap())
        .collect()
}

// ==================== SEED DATA ====================
//
// One site named "demosite" with three questions, two answers, three tags,
// two users, two badge definitions and a short edit history on question 1.

fn post(
    id: i64,
    post_type: i64,
    title: Option<&str>,
    score: i64,
    creation: &str,
    activity: &str,
    parent_id: Option<i64>,
) -> Post {
    Post {
        id,
        site_id: 1,
        post_type,
        title: title.map(str::to_string),
        body: Some(format!("body of post {}", id)),
        score,
        view_count: Some(10 * id),
        answer_count: None,
        comment_count: 0,
        favorite_count: 0,
        owner_user_id: Some(1),
        last_editor_user_id: None,
        parent_id,
        accepted_answer_id: None,
        creation_date: Some(creation.to_string()),
        last_edit_date: None,
        last_activity_date: Some(activity.to_string()),
        content_license: Some("CC BY-SA 4.0".to_string()),
    }
}

fn tag(id: i64, name: &str, count: i64) -> Tag {
    Tag {
        id,
        site_id: 1,
        name: name.to_string(),
        count,
        excerpt_post_id: None,
        wiki_post_id: None,
    }
}

fn user(id: i64, name: &str, reputation: i64, up: i64, down: i64, creation: &str) -> User {
    User {
        id,
        site_id: 1,
        display_name: name.to_string(),
        reputation,
        creation_date: Some(creation.to_string()),
        last_access_date: None,
        website_url: None,
        location: None,
        about_me: None,
        views: 0,
        up_votes: up,
        down_votes: down,
        is_moderator: false,
        is_employee: false,
    }
}

fn comment(id: i64, post_id: i64, score: i64, creation: &str) -> Comment {
    Comment {
        id,
        site_id: 1,
        post_id,
        user_id: Some(1),
        score,
        text: format!("comment {}", id),
        creation_date: Some(creation.to_string()),
    }
}

fn history(id: i64, post_id: i64, history_type: i64, guid: &str, creation: &str) -> PostHistory {
    PostHistory {
        id,
        site_id: 1,
        post_id,
        history_type,
        revision_guid: guid.to_string(),
        user_id: Some(1),
        creation_date: Some(creation.to_string()),
        comment: None,
    }
}

async fn seed_demo_site(repo: &Repository) -> i64 {
    let site_id = repo
        .upsert_site("demosite", Some("Demo site"), Some("https://demosite.example"))
        .await
        .unwrap();

    repo.replace_tags(
        site_id,
        &[tag(1, "rust", 2), tag(2, "async", 1), tag(3, "php", 1)],
    )
    .await
    .unwrap();

    repo.replace_users(
        site_id,
        &[
            user(1, "Alice Example", 100, 10, 2, "2023-01-01T00:00:00.000Z"),
            user(2, "Bob", 50, 3, 1, "2023-02-01T00:00:00.000Z"),
        ],
    )
    .await
    .unwrap();

    let posts = [
        post(
            1,
            1,
            Some("How do I borrow twice"),
            5,
            "2023-01-05T10:00:00.000Z",
            "2023-03-01T00:00:00.000Z",
            None,
        ),
        post(
            2,
            1,
            Some("Understanding lifetimes"),
            5,
            "2023-01-10T09:00:00.000Z",
            "2023-02-01T00:00:00.000Z",
            None,
        ),
        post(
            3,
            1,
            Some("Sorting arrays"),
            1,
            "2023-02-15T12:00:00.000Z",
            "2023-02-16T00:00:00.000Z",
            None,
        ),
        post(
            4,
            2,
            None,
            7,
            "2023-01-06T00:00:00.000Z",
            "2023-01-06T00:00:00.000Z",
            Some(1),
        ),
        post(
            5,
            2,
            None,
            2,
            "2023-01-11T00:00:00.000Z",
            "2023-01-11T00:00:00.000Z",
            Some(2),
        ),
    ];
    // rust on questions 1 and 2, async only on 1, php only on 3.
    let links = [(1, 1), (1, 2), (2, 1), (3, 3)];
    repo.replace_posts(site_id, &posts, &links).await.unwrap();

    repo.replace_badges(
        site_id,
        &[
            Badge {
                id: 1,
                site_id,
                name: "Teacher".to_string(),
                rank: "bronze".to_string(),
                kind: "named".to_string(),
                award_count: 2,
            },
            Badge {
                id: 2,
                site_id,
                name: "Great Question".to_string(),
                rank: "gold".to_string(),
                kind: "named".to_string(),
                award_count: 0,
            },
        ],
        // Two awards exactly 100 minutes apart.
        &[
            UserBadge {
                site_id,
                user_id: 1,
                badge_id: 1,
                award_date: "2023-01-01T00:00:00.000Z".to_string(),
            },
            UserBadge {
                site_id,
                user_id: 2,
                badge_id: 1,
                award_date: "2023-01-01T01:40:00.000Z".to_string(),
            },
        ],
    )
    .await
    .unwrap();

    repo.replace_comments(
        site_id,
        &[
            comment(1, 1, 3, "2023-01-05T11:00:00.000Z"),
            comment(2, 1, 1, "2023-01-06T11:00:00.000Z"),
            comment(3, 2, 2, "2023-01-11T11:00:00.000Z"),
        ],
    )
    .await
    .unwrap();

    repo.replace_post_history(
        site_id,
        &[
            history(1, 1, 1, "g1", "2023-01-05T10:00:00.000Z"),
            history(2, 1, 2, "g1", "2023-01-05T10:00:00.000Z"),
            history(3, 1, 3, "g1", "2023-01-05T10:00:00.000Z"),
            history(4, 1, 5, "g2", "2023-01-07T00:00:00.000Z"),
            // A close vote: grouped apart from the single-user edits.
            history(5, 1, 10, "g3", "2023-01-08T00:00:00.000Z"),
        ],
    )
    .await
    .unwrap();

    repo.update_site_counters(site_id).await.unwrap();
    site_id
}

// ==================== ENDPOINT TESTS ====================

#[tokio::test]
async fn test_health_check() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_site_parameter_is_required() {
    let fixture = TestFixture::seeded().await;

    let (status, body) = fixture.get("/questions").await;
    assert_eq!(status, 400);
    assert_eq!(body["error_name"], "bad_parameter");

    // Blank counts as missing.
    let (status, _) = fixture.get("/questions?site=%20").await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn test_unknown_site_is_rejected() {
    let fixture = TestFixture::seeded().await;

    let (status, body) = fixture.get("/questions?site=doesnotexist").await;
    assert_eq!(status, 400);
    assert_eq!(body["error_name"], "bad_parameter");
    assert!(body["error_message"]
        .as_str()
        .unwrap()
        .contains("doesnotexist"));
}

#[tokio::test]
async fn test_malformed_date_returns_structured_error() {
    let fixture = TestFixture::seeded().await;

    let (status, body) = fixture
        .get("/questions?site=demosite&fromdate=not-a-date")
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["error_id"], 400);
    assert_eq!(body["error_name"], "bad_parameter");
    assert!(body["error_message"].as_str().unwrap().contains("fromdate"));
}

#[tokio::test]
async fn test_questions_exclude_answers_and_default_to_activity() {
    let fixture = TestFixture::seeded().await;

    let (status, body) = fixture.get("/questions?site=demosite").await;
    assert_eq!(status, 200);
    // Newest activity first; the two answers never appear.
    assert_eq!(item_ids(&body), vec![1, 3, 2]);
    assert_eq!(body["has_more"], false);
}

#[tokio::test]
async fn test_vote_sort_breaks_ties_by_id() {
    let fixture = TestFixture::seeded().await;

    // Questions 1 and 2 share a score; the lower id wins the tie both ways.
    let (_, body) = fixture.get("/questions?site=demosite&sort=votes").await;
    assert_eq!(item_ids(&body), vec![1, 2, 3]);

    let (_, body) = fixture
        .get("/questions?site=demosite&sort=votes&order=asc")
        .await;
    assert_eq!(item_ids(&body), vec![3, 1, 2]);
}

#[tokio::test]
async fn test_date_window_includes_both_named_days() {
    let fixture = TestFixture::seeded().await;

    let (status, body) = fixture
        .get("/questions?site=demosite&fromdate=2023-01-05&todate=2023-01-10&sort=creation&order=asc")
        .await;
    assert_eq!(status, 200);
    // Created on the window's first and last day respectively.
    assert_eq!(item_ids(&body), vec![1, 2]);
}

#[tokio::test]
async fn test_detail_route_returns_requested_ids() {
    let fixture = TestFixture::seeded().await;

    let (status, body) = fixture.get("/questions/1;3?site=demosite").await;
    assert_eq!(status, 200);
    let mut ids = item_ids(&body);
    ids.sort();
    assert_eq!(ids, vec![1, 3]);

    // An id that matches nothing is simply absent, not an error.
    let (status, body) = fixture.get("/questions/2;999?site=demosite").await;
    assert_eq!(status, 200);
    assert_eq!(item_ids(&body), vec![2]);
}

#[tokio::test]
async fn test_detail_ids_beyond_the_cap_are_ignored() {
    let fixture = TestFixture::seeded().await;

    let ids = (1..=150).map(|i| i.to_string()).collect::<Vec<_>>().join(";");
    let (status, body) = fixture
        .get(&format!("/questions/{}?site=demosite", ids))
        .await;
    assert_eq!(status, 200);
    // All three questions fall inside the honored prefix.
    assert_eq!(item_ids(&body).len(), 3);
}

#[tokio::test]
async fn test_tag_filters_compose() {
    let fixture = TestFixture::seeded().await;

    let (_, body) = fixture.get("/questions?site=demosite&tagged=rust").await;
    let mut ids = item_ids(&body);
    ids.sort();
    assert_eq!(ids, vec![1, 2]);

    let (_, body) = fixture
        .get("/questions?site=demosite&tagged=rust&nottagged=async")
        .await;
    assert_eq!(item_ids(&body), vec![2]);

    // Multiple inclusions must all hold.
    let (_, body) = fixture
        .get("/questions?site=demosite&tagged=rust;async")
        .await;
    assert_eq!(item_ids(&body), vec![1]);

    // Including and excluding the same tag can match nothing.
    let (_, body) = fixture
        .get("/questions?site=demosite&tagged=rust&nottagged=rust")
        .await;
    assert!(item_ids(&body).is_empty());
}

#[tokio::test]
async fn test_intitle_matches_substring() {
    let fixture = TestFixture::seeded().await;

    let (_, body) = fixture.get("/questions?site=demosite&intitle=borrow").await;
    assert_eq!(item_ids(&body), vec![1]);
}

#[tokio::test]
async fn test_inname_is_case_insensitive() {
    let fixture = TestFixture::seeded().await;

    let (_, body) = fixture.get("/users?site=demosite&inname=ALICE").await;
    assert_eq!(item_ids(&body), vec![1]);
}

#[tokio::test]
async fn test_pages_reassemble_the_collection() {
    let fixture = TestFixture::seeded().await;

    let (_, first) = fixture.get("/questions?site=demosite&pagesize=2").await;
    assert_eq!(first["has_more"], true);
    let (_, second) = fixture
        .get("/questions?site=demosite&pagesize=2&page=2")
        .await;
    assert_eq!(second["has_more"], false);

    let mut ids = item_ids(&first);
    ids.extend(item_ids(&second));
    assert_eq!(ids, vec![1, 3, 2]);

    // An oversized pagesize is clamped, never rejected.
    let (status, body) = fixture.get("/questions?site=demosite&pagesize=500").await;
    assert_eq!(status, 200);
    assert_eq!(item_ids(&body).len(), 3);
}

#[tokio::test]
async fn test_badge_rank_sort_uses_declared_order() {
    let fixture = TestFixture::seeded().await;

    let (_, body) = fixture.get("/badges?site=demosite&sort=rank").await;
    // Gold ranks first by default (ascending over the declared ordinals).
    assert_eq!(item_ids(&body), vec![2, 1]);

    let (_, body) = fixture
        .get("/badges?site=demosite&sort=rank&order=asc")
        .await;
    assert_eq!(item_ids(&body), vec![2, 1]);

    // Descending reverses the rank order, so bronze comes first.
    let (_, body) = fixture
        .get("/badges?site=demosite&sort=rank&order=desc")
        .await;
    assert_eq!(item_ids(&body), vec![1, 2]);
}

#[tokio::test]
async fn test_post_comments_match_by_post_id() {
    let fixture = TestFixture::seeded().await;

    let (status, body) = fixture.get("/posts/1/comments?site=demosite").await;
    assert_eq!(status, 200);
    // Newest first.
    assert_eq!(item_ids(&body), vec![2, 1]);

    let (_, body) = fixture.get("/posts/1;2/comments?site=demosite").await;
    assert_eq!(item_ids(&body), vec![3, 2, 1]);
}

#[tokio::test]
async fn test_revisions_group_history_rows_by_guid() {
    let fixture = TestFixture::seeded().await;

    let (status, body) = fixture.get("/posts/1/revisions?site=demosite").await;
    assert_eq!(status, 200);
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 3);

    // Three initial rows share one GUID and collapse into revision 1.
    assert_eq!(items[0]["revision_guid"], "g1");
    assert_eq!(items[0]["revision_number"], 1);
    assert_eq!(items[0]["vote_based"], false);

    assert_eq!(items[1]["revision_guid"], "g2");
    assert_eq!(items[1]["revision_number"], 2);

    // The close vote ranks separately from the edit revisions.
    assert_eq!(items[2]["revision_guid"], "g3");
    assert_eq!(items[2]["revision_number"], 1);
    assert_eq!(items[2]["vote_based"], true);
}

#[tokio::test]
async fn test_sites_listing_needs_no_site_parameter() {
    let fixture = TestFixture::seeded().await;

    let (status, body) = fixture.get("/sites").await;
    assert_eq!(status, 200);
    let names: Vec<&str> = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["demosite"]);
    assert_eq!(body["items"][0]["total_questions"], 3);
    assert_eq!(body["items"][0]["total_answers"], 2);
}

#[tokio::test]
async fn test_site_info_reports_totals_and_rates() {
    let fixture = TestFixture::seeded().await;

    let (status, body) = fixture.get("/sites/demosite/info").await;
    assert_eq!(status, 200);
    assert_eq!(body["site"], "demosite");
    assert_eq!(body["total_questions"], 3);
    assert_eq!(body["total_answers"], 2);
    assert_eq!(body["total_users"], 2);
    assert_eq!(body["total_comments"], 3);
    assert_eq!(body["total_badges"], 2);
    // 10 + 2 + 3 + 1 votes cast across both users.
    assert_eq!(body["total_votes"], 16);

    // Two badge awards 100 minutes apart.
    let rate = body["badges_per_minute"].as_f64().unwrap();
    assert!((rate - 0.02).abs() < 1e-9);
    assert!(body["questions_per_minute"].as_f64().unwrap() > 0.0);
}

#[tokio::test]
async fn test_site_info_for_unknown_site_is_404() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture.get("/sites/nosuch/info").await;
    assert_eq!(status, 404);
    assert_eq!(body["error_name"], "not_found");
}

#[tokio::test]
async fn test_site_info_omits_rates_without_data() {
    let fixture = TestFixture::new().await;
    fixture
        .repo
        .upsert_site("empty", None, None)
        .await
        .unwrap();

    let (status, body) = fixture.get("/sites/empty/info").await;
    assert_eq!(status, 200);
    assert_eq!(body["total_badges"], 0);
    assert!(body.get("badges_per_minute").is_none());
    assert!(body.get("first_badge_date").is_none());
}

// ==================== LOADER TESTS ====================

/// Serve the files of one directory over HTTP with a fixed content tag,
/// standing in for the remote dump archive host.
async fn serve_archive(dir: PathBuf) -> String {
    use axum::extract::Path as UrlPath;
    use axum::http::{header, StatusCode};
    use axum::routing::get;

    let app = axum::Router::new().route(
        "/{file}",
        get(move |UrlPath(file): UrlPath<String>| {
            let dir = dir.clone();
            async move {
                match std::fs::read(dir.join(&file)) {
                    Ok(bytes) => ([(header::ETAG, "\"fixture-v1\"")], bytes).into_response(),
                    Err(_) => StatusCode::NOT_FOUND.into_response(),
                }
            }
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn build_archive(dir: &Path, site: &str, files: &[(&str, &str)]) {
    let file = std::fs::File::create(dir.join(format!("{}.zip", site))).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default();
    for (name, body) in files {
        zip.start_file(*name, options).unwrap();
        zip.write_all(body.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
}

fn alpha_dump_files() -> Vec<(&'static str, &'static str)> {
    vec![
        (
            "Tags.xml",
            r#"<tags>
                <row Id="1" TagName="rust" Count="2" />
                <row Id="2" TagName="async" Count="1" />
            </tags>"#,
        ),
        (
            "Users.xml",
            r#"<users>
                <row Id="1" DisplayName="Ada" Reputation="10" UpVotes="4" DownVotes="1"
                     CreationDate="2023-01-01T00:00:00.000" />
            </users>"#,
        ),
        (
            "Posts.xml",
            r#"<posts>
                <row Id="1" PostTypeId="1" Title="First question" Score="3"
                     CreationDate="2023-01-02T00:00:00.000"
                     LastActivityDate="2023-01-03T00:00:00.000"
                     Tags="&lt;rust&gt;&lt;async&gt;" />
                <row Id="2" PostTypeId="2" ParentId="1" Score="1"
                     CreationDate="2023-01-03T00:00:00.000"
                     LastActivityDate="2023-01-03T00:00:00.000" />
            </posts>"#,
        ),
        (
            "Badges.xml",
            r#"<badges>
                <row Id="1" UserId="1" Name="Teacher" Class="3" Date="2023-01-02T00:00:00.000" />
                <row Id="2" UserId="1" Name="Teacher" Class="3" Date="2023-01-04T00:00:00.000" />
            </badges>"#,
        ),
        (
            "Comments.xml",
            r#"<comments>
                <row Id="1" PostId="1" Score="2" Text="nice one"
                     CreationDate="2023-01-02T12:00:00.000" />
            </comments>"#,
        ),
        (
            "PostHistory.xml",
            r#"<posthistory>
                <row Id="1" PostHistoryTypeId="2" PostId="1" RevisionGUID="aaa"
                     CreationDate="2023-01-02T00:00:00.000" />
            </posthistory>"#,
        ),
    ]
}

#[tokio::test]
async fn test_loader_rejects_unknown_site() {
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(temp_dir.path());

    let pool = init_database(&config.db_path).await.unwrap();
    let repo = Repository::new(pool);
    let loader = Loader::new(repo, Arc::new(SiteInfoService::new()), &config).unwrap();

    let err = loader.load_site("phantom").await.unwrap_err();
    assert_eq!(err.error_name(), "not_found");
}

#[tokio::test]
async fn test_sync_sites_builds_the_directory_with_parents() {
    let temp_dir = TempDir::new().unwrap();
    let archive_dir = temp_dir.path().join("remote");
    std::fs::create_dir_all(&archive_dir).unwrap();
    std::fs::write(
        archive_dir.join("Sites.xml"),
        r#"<sites>
            <row Name="alpha" Description="Alpha site" Url="https://alpha.example" />
            <row Name="meta.alpha" Parent="alpha" />
        </sites>"#,
    )
    .unwrap();

    let mut config = test_config(temp_dir.path());
    config.archive_url = serve_archive(archive_dir).await;

    let pool = init_database(&config.db_path).await.unwrap();
    let repo = Repository::new(pool);
    let loader =
        Loader::new(repo.clone(), Arc::new(SiteInfoService::new()), &config).unwrap();

    let count = loader.sync_sites().await.unwrap();
    assert_eq!(count, 2);

    let alpha = repo.find_site_by_name("alpha").await.unwrap().unwrap();
    assert_eq!(alpha.description.as_deref(), Some("Alpha site"));
    let meta = repo.find_site_by_name("meta.alpha").await.unwrap().unwrap();
    assert_eq!(meta.parent_id, Some(alpha.id));
}

#[tokio::test]
async fn test_load_is_idempotent_and_reuses_cached_archive() {
    let temp_dir = TempDir::new().unwrap();
    let archive_dir = temp_dir.path().join("remote");
    std::fs::create_dir_all(&archive_dir).unwrap();
    build_archive(&archive_dir, "alpha", &alpha_dump_files());

    let mut config = test_config(temp_dir.path());
    config.archive_url = serve_archive(archive_dir).await;

    let pool = init_database(&config.db_path).await.unwrap();
    let repo = Repository::new(pool);
    repo.upsert_site("alpha", None, None).await.unwrap();

    let loader =
        Loader::new(repo.clone(), Arc::new(SiteInfoService::new()), &config).unwrap();

    let first = loader.load_site("alpha").await.unwrap();
    assert!(!first.reused_archive);
    assert_eq!(first.tags, 2);
    assert_eq!(first.users, 1);
    assert_eq!(first.posts, 2);
    assert_eq!(first.post_links, 2);
    assert_eq!(first.badges, 1);
    assert_eq!(first.awards, 2);
    assert_eq!(first.comments, 1);
    assert_eq!(first.history, 1);

    // Second run replaces everything with the same input: same counts, and
    // the unchanged archive is served from the cache.
    let second = loader.load_site("alpha").await.unwrap();
    assert!(second.reused_archive);
    assert_eq!(second.posts, first.posts);
    assert_eq!(second.awards, first.awards);

    let alpha = repo.find_site_by_name("alpha").await.unwrap().unwrap();
    assert_eq!(alpha.total_questions, 1);
    assert_eq!(alpha.total_answers, 1);
    assert_eq!(alpha.total_users, 1);
    assert_eq!(alpha.total_tags, 2);
}

#[tokio::test]
async fn test_download_lands_complete_archive_in_cache() {
    let temp_dir = TempDir::new().unwrap();
    let archive_dir = temp_dir.path().join("remote");
    std::fs::create_dir_all(&archive_dir).unwrap();
    build_archive(&archive_dir, "alpha", &alpha_dump_files());

    let mut config = test_config(temp_dir.path());
    config.archive_url = serve_archive(archive_dir.clone()).await;

    let pool = init_database(&config.db_path).await.unwrap();
    let repo = Repository::new(pool);
    repo.upsert_site("alpha", None, None).await.unwrap();

    let loader = Loader::new(repo, Arc::new(SiteInfoService::new()), &config).unwrap();
    loader.load_site("alpha").await.unwrap();

    // The chunk-written cache copy is byte-identical to the remote archive,
    // and the in-progress file has been renamed away.
    let cached = std::fs::read(config.cache_dir.join("alpha.zip")).unwrap();
    let remote = std::fs::read(archive_dir.join("alpha.zip")).unwrap();
    assert_eq!(cached, remote);
    assert!(!config.cache_dir.join("alpha.zip.part").exists());
}
