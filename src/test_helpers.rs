//! Shared content-tree fixtures for unit tests.
//!
//! Builds record maps shaped like the ones Notion returns, so extractor,
//! aggregator and renderer tests read like the data they run against.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tree = container(&[
//!     published("a", "Foo", "foo", 1_700_000_000),
//!     draft("b", "Bar", "bar", 1_600_000_000),
//! ]);
//! let ids = list_child_ids(&tree);
//! ```
//!
//! The container's schema maps display names to opaque property ids, like a
//! real database: `title`, `path` (text), `date` (number) and `status`
//! (select).

use serde_json::{Map, Value, json};

use crate::record_map::RecordMap;

pub const ROOT_ID: &str = "root";
pub const COLLECTION_ID: &str = "coll-1";
pub const VIEW_ID: &str = "view-1";

const TITLE_KEY: &str = "title";
const PATH_KEY: &str = "Ab1x";
const DATE_KEY: &str = "d8:x";
const STATUS_KEY: &str = "st9z";

// =========================================================================
// Container fixtures
// =========================================================================

/// Property values of one database row. `None` leaves the property out.
#[derive(Debug, Clone, Default)]
pub struct PageSpec {
    pub id: &'static str,
    pub title: Option<&'static str>,
    pub path: Option<&'static str>,
    pub date: Option<i64>,
    pub status: Option<&'static str>,
}

pub fn published(id: &'static str, title: &'static str, path: &'static str, date: i64) -> PageSpec {
    PageSpec {
        id,
        title: Some(title),
        path: Some(path),
        date: Some(date),
        status: Some("published"),
    }
}

pub fn draft(id: &'static str, title: &'static str, path: &'static str, date: i64) -> PageSpec {
    PageSpec {
        status: Some("draft"),
        ..published(id, title, path, date)
    }
}

/// Database schema: display name → (property id, type).
pub fn schema() -> Value {
    json!({
        TITLE_KEY: { "name": "title", "type": "title" },
        PATH_KEY: { "name": "path", "type": "text" },
        DATE_KEY: { "name": "date", "type": "number" },
        STATUS_KEY: { "name": "status", "type": "select" },
    })
}

/// A row block as Notion would return it.
pub fn page_block(spec: &PageSpec) -> Value {
    let mut properties = Map::new();
    if let Some(title) = spec.title {
        properties.insert(TITLE_KEY.into(), json!([[title]]));
    }
    if let Some(path) = spec.path {
        properties.insert(PATH_KEY.into(), json!([[path]]));
    }
    if let Some(date) = spec.date {
        properties.insert(DATE_KEY.into(), json!([[date.to_string()]]));
    }
    if let Some(status) = spec.status {
        properties.insert(STATUS_KEY.into(), json!([[status]]));
    }
    json!({
        "id": spec.id,
        "type": "page",
        "parent_id": COLLECTION_ID,
        "parent_table": "collection",
        "properties": properties,
    })
}

/// A container whose query lists every page, in order.
pub fn container(pages: &[PageSpec]) -> RecordMap {
    let ids: Vec<&str> = pages.iter().map(|p| p.id).collect();
    container_listing(&ids, pages)
}

/// A container listing `ids` while only `pages` have blocks, for trees
/// where the query references rows that are missing.
pub fn container_listing(ids: &[&str], pages: &[PageSpec]) -> RecordMap {
    let mut blocks = Map::new();
    blocks.insert(
        ROOT_ID.into(),
        json!({ "value": {
            "id": ROOT_ID,
            "type": "collection_view_page",
            "collection_id": COLLECTION_ID,
            "view_ids": [VIEW_ID],
        } }),
    );
    for page in pages {
        blocks.insert(page.id.into(), json!({ "value": page_block(page) }));
    }
    serde_json::from_value(json!({
        "block": blocks,
        "collection": {
            COLLECTION_ID: { "value": { "id": COLLECTION_ID, "schema": schema() } }
        },
        "collection_view": {
            VIEW_ID: { "value": { "id": VIEW_ID, "type": "table" } }
        },
        "collection_query": {
            COLLECTION_ID: { VIEW_ID: { "collection_group_results": { "blockIds": ids } } }
        },
    }))
    .unwrap()
}

// =========================================================================
// Content fixtures
// =========================================================================

/// A content block with a plain-text title.
pub fn text_block(id: &str, kind: &str, text: &str) -> Value {
    json!({ "id": id, "type": kind, "properties": { "title": [[text]] } })
}

/// A page whose content is `children`, in order. Blocks that name their own
/// `content` may reference other blocks in `children`.
pub fn content_page(page_id: &str, title: &str, children: &[Value]) -> RecordMap {
    let mut blocks = Map::new();
    let top_level: Vec<&str> = children
        .iter()
        .filter(|child| child.get("parent_id").is_none())
        .filter_map(|child| child["id"].as_str())
        .collect();
    blocks.insert(
        page_id.into(),
        json!({ "value": {
            "id": page_id,
            "type": "page",
            "properties": { "title": [[title]] },
            "content": top_level,
        } }),
    );
    for child in children {
        if let Some(id) = child["id"].as_str() {
            blocks.insert(id.into(), json!({ "value": child }));
        }
    }
    serde_json::from_value(json!({ "block": blocks })).unwrap()
}
