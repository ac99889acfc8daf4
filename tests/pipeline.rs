//! End-to-end build through the public API, against an in-memory Notion.
//!
//! The fake source serves a container with one published post, one draft and
//! one row missing its path, plus a content page for each row. Fetches are
//! counted so the disk cache can be checked from the outside.

use notion_blog::config::SiteConfig;
use notion_blog::record_map::RecordMap;
use notion_blog::render::HtmlRenderer;
use notion_blog::routes::build_routes;
use notion_blog::side::BuildContext;
use notion_blog::source::{DocumentSource, Documents, SourceError};
use notion_blog::types::{SidebarGroup, SidebarItem};
use serde_json::{Value, json};
use std::fs;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

const ROOT: &str = "root";

#[derive(Default)]
struct FakeNotion {
    fetches: AtomicUsize,
}

impl FakeNotion {
    fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl DocumentSource for FakeNotion {
    fn fetch_content_tree(&self, page_id: &str) -> Result<RecordMap, SourceError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let tree = match page_id {
            ROOT => container(),
            "a" | "b" | "c" => content_page(page_id),
            _ => {
                return Err(SourceError::Http {
                    status: 404,
                    body: page_id.to_string(),
                });
            }
        };
        Ok(serde_json::from_value(tree)?)
    }
}

fn row(
    id: &str,
    title: &str,
    path: Option<&str>,
    date: &str,
    status: Option<&str>,
) -> Value {
    let mut properties = json!({
        "title": [[title]],
        "dT3x": [[date]],
    });
    if let Some(path) = path {
        properties["pA7x"] = json!([[path]]);
    }
    if let Some(status) = status {
        properties["sT4x"] = json!([[status]]);
    }
    json!({ "value": {
        "id": id,
        "type": "page",
        "parent_id": "coll",
        "parent_table": "collection",
        "properties": properties,
    } })
}

fn container() -> Value {
    json!({
        "block": {
            ROOT: { "value": {
                "id": ROOT,
                "type": "collection_view_page",
                "collection_id": "coll",
                "view_ids": ["view"],
            } },
            "a": row("a", "Foo", Some("foo"), "1700000000", None),
            "b": row("b", "Secret", Some("secret"), "1700000000", Some("draft")),
            "c": row("c", "Pathless", None, "1700000000", None),
        },
        "collection": {
            "coll": { "value": { "id": "coll", "schema": {
                "title": { "name": "Title", "type": "title" },
                "pA7x": { "name": "Path", "type": "text" },
                "dT3x": { "name": "Date", "type": "number" },
                "sT4x": { "name": "Status", "type": "select" },
            } } }
        },
        "collection_view": {
            "view": { "value": { "id": "view", "type": "table" } }
        },
        "collection_query": {
            "coll": { "view": { "collection_group_results": { "blockIds": ["a", "b", "c"] } } }
        },
    })
}

fn content_page(page_id: &str) -> Value {
    let child = format!("{page_id}-1");
    json!({ "block": {
        page_id: { "value": {
            "id": page_id,
            "type": "page",
            "properties": { "title": [["ignored"]] },
            "content": [child],
        } },
        child.clone(): { "value": {
            "id": child,
            "type": "text",
            "properties": { "title": [["Hello from ", [["b"]]], ["Notion"]] },
        } },
    } })
}

fn site() -> SiteConfig {
    SiteConfig {
        title: "Test Blog".into(),
        author: "Ada".into(),
        ..SiteConfig::default()
    }
}

#[test]
fn only_complete_published_posts_are_listed() {
    let ctx = BuildContext::new(Documents::uncached(FakeNotion::default()), ROOT);
    let side = ctx.side_data().unwrap();

    assert_eq!(side.posts.len(), 1);
    let post = &side.posts[0];
    assert_eq!(post.title, "Foo");
    assert_eq!(post.slug, "foo");
    assert_eq!(post.date, "2023-11-14");
    assert_eq!(post.date_for_sidebar, "11-14");
    assert_eq!(post.url, "/blog/foo");

    assert_eq!(
        side.sidebar,
        vec![SidebarGroup {
            text: "2023".into(),
            items: vec![SidebarItem {
                text: "Foo".into(),
                link: "/blog/foo".into(),
            }],
        }]
    );
}

#[test]
fn side_data_serializes_the_full_post() {
    let ctx = BuildContext::new(Documents::uncached(FakeNotion::default()), ROOT);
    let side = ctx.side_data().unwrap();
    let value = serde_json::to_value(&*side).unwrap();
    assert_eq!(
        value,
        json!({
            "posts": [{
                "pageId": "a",
                "title": "Foo",
                "slug": "foo",
                "date": "2023-11-14",
                "dateForSidebar": "11-14",
                "tags": [],
                "description": "",
                "url": "/blog/foo",
                "status": "published",
            }],
            "sidebar": [{
                "text": "2023",
                "items": [{ "text": "Foo", "link": "/blog/foo" }],
            }],
        })
    );
}

#[test]
fn full_build_writes_the_site() {
    let out = TempDir::new().unwrap();
    let ctx = BuildContext::new(Documents::uncached(FakeNotion::default()), ROOT);

    let side = ctx.side_data().unwrap();
    let routes = build_routes(&ctx, &HtmlRenderer, &site()).unwrap();
    let summary = notion_blog::generate::generate(&side, &routes, &site(), out.path()).unwrap();

    assert_eq!(summary.posts, 1);
    assert_eq!(summary.pages, 3);
    assert!(routes.skipped.is_empty());

    let post = fs::read_to_string(out.path().join("blog/foo/index.html")).unwrap();
    assert!(post.contains("<strong>Hello from </strong>Notion"));
    assert!(post.contains("og:title"));
    assert!(!out.path().join("blog/secret").exists());

    let home = fs::read_to_string(out.path().join("index.html")).unwrap();
    assert!(home.contains("/blog/foo"));
    assert!(!home.contains("Secret"));

    let dumped: Value =
        serde_json::from_str(&fs::read_to_string(out.path().join("side-data.json")).unwrap())
            .unwrap();
    assert_eq!(dumped["sidebar"][0]["text"], "2023");
}

#[test]
fn second_cached_build_fetches_nothing() {
    let cache = TempDir::new().unwrap();
    let notion = Arc::new(FakeNotion::default());

    let first = BuildContext::new(Documents::new(Arc::clone(&notion), cache.path(), true), ROOT);
    build_routes(&first, &HtmlRenderer, &site()).unwrap();
    // container + one post
    assert_eq!(notion.fetches(), 2);

    let second = BuildContext::new(Documents::new(Arc::clone(&notion), cache.path(), true), ROOT);
    let routes = build_routes(&second, &HtmlRenderer, &site()).unwrap();
    assert_eq!(notion.fetches(), 2);
    assert_eq!(routes.routes.len(), 1);

    let stats = second.documents().cache_stats();
    assert_eq!(stats.hits, 2);
    assert_eq!(stats.misses, 0);
}

#[test]
fn clearing_the_cache_forces_a_refetch() {
    let cache = TempDir::new().unwrap();
    let notion = Arc::new(FakeNotion::default());

    let docs = Documents::new(Arc::clone(&notion), cache.path(), true);
    docs.fetch_container(ROOT).unwrap();
    docs.fetch_page("a").unwrap();
    assert_eq!(docs.clear_cache(), 2);

    docs.fetch_container(ROOT).unwrap();
    assert_eq!(notion.fetches(), 3);
}
