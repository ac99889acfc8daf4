//! Document source: where content trees come from.
//!
//! [`DocumentSource`] is the seam between the build and the remote document
//! API. The production implementation is [`NotionClient`], a blocking HTTP
//! client for Notion's unofficial `api/v3`; tests substitute an in-memory
//! fake.
//!
//! [`Documents`] wraps any source with the two disk cache namespaces the
//! build uses:
//!
//! | Call | Cache dir | Key |
//! |------|-----------|-----|
//! | [`Documents::fetch_container`] | `<cache>` | `notion-db` |
//! | [`Documents::fetch_page`] | `<cache>/posts` | page id |
//!
//! Errors from the source propagate unchanged. There is no retry.

use crate::cache::{CacheStats, FileCache};
use crate::record_map::{CollectionQueryResult, RecordMap};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use ureq::Agent;

/// Cache key of the container page.
pub const CONTAINER_CACHE_KEY: &str = "notion-db";

/// Subdirectory of the cache holding per-post content trees.
pub const PAGE_CACHE_DIR: &str = "posts";

const NOTION_API_URL: &str = "https://www.notion.so/api/v3";
const DEFAULT_TIMEOUT: u64 = 30;
const CHUNK_LIMIT: u32 = 100;
const MAX_CHUNKS: u32 = 10;
const QUERY_LIMIT: u32 = 9999;

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("HTTP error: {status} - {body}")]
    Http { status: u16, body: String },
    #[error("request failed: {0}")]
    Transport(String),
    #[error("JSON error: {0}")]
    Json(String),
}

impl From<serde_json::Error> for SourceError {
    fn from(e: serde_json::Error) -> Self {
        SourceError::Json(e.to_string())
    }
}

/// Anything that can produce the content tree of a page by id.
pub trait DocumentSource: Send + Sync {
    fn fetch_content_tree(&self, page_id: &str) -> Result<RecordMap, SourceError>;
}

impl<T: DocumentSource + ?Sized> DocumentSource for Arc<T> {
    fn fetch_content_tree(&self, page_id: &str) -> Result<RecordMap, SourceError> {
        (**self).fetch_content_tree(page_id)
    }
}

// ============================================================================
// Cached access
// ============================================================================

/// A document source behind the build's disk caches.
pub struct Documents<S> {
    source: S,
    container_cache: FileCache,
    page_cache: FileCache,
}

impl<S: DocumentSource> Documents<S> {
    pub fn new(source: S, cache_dir: &Path, cache_enabled: bool) -> Self {
        Self {
            source,
            container_cache: FileCache::new(cache_dir, cache_enabled),
            page_cache: FileCache::new(cache_dir.join(PAGE_CACHE_DIR), cache_enabled),
        }
    }

    /// Wrap a source with caching disabled.
    pub fn uncached(source: S) -> Self {
        Self {
            source,
            container_cache: FileCache::disabled(),
            page_cache: FileCache::disabled(),
        }
    }

    /// Content tree of one post.
    pub fn fetch_page(&self, page_id: &str) -> Result<RecordMap, SourceError> {
        self.page_cache.get_or_compute(page_id, || {
            info!(page_id, "fetching page");
            self.source.fetch_content_tree(page_id)
        })
    }

    /// Content tree of the root container. Cached under a fixed key, so a
    /// different root id reuses the same entry until the cache is cleared.
    pub fn fetch_container(&self, root_id: &str) -> Result<RecordMap, SourceError> {
        self.container_cache
            .get_or_compute(CONTAINER_CACHE_KEY, || {
                info!(page_id = root_id, "fetching container");
                self.source.fetch_content_tree(root_id)
            })
    }

    /// Drop every cached container and page entry.
    pub fn clear_cache(&self) -> usize {
        self.container_cache.clear() + self.page_cache.clear()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.container_cache.stats() + self.page_cache.stats()
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}

// ============================================================================
// Notion client
// ============================================================================

/// Blocking client for Notion's unofficial `api/v3`.
pub struct NotionClient {
    agent: Agent,
    base_url: String,
    token: Option<String>,
}

#[derive(Deserialize)]
struct PageChunk {
    #[serde(rename = "recordMap", default)]
    record_map: RecordMap,
    #[serde(default)]
    cursor: Value,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    result: QueryResult,
    #[serde(rename = "recordMap", default)]
    record_map: RecordMap,
}

#[derive(Deserialize, Default)]
struct QueryResult {
    #[serde(rename = "reducerResults", default)]
    reducer_results: CollectionQueryResult,
}

impl NotionClient {
    /// `token` is the `token_v2` cookie; public workspaces need none.
    pub fn new(token: Option<String>) -> Self {
        let agent = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT)))
            .http_status_as_error(false)
            .build()
            .into();

        Self {
            agent,
            base_url: NOTION_API_URL.to_string(),
            token,
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn post<T: DeserializeOwned>(&self, endpoint: &str, payload: &Value) -> Result<T, SourceError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        debug!(url = %url, "POST");

        let mut request = self.agent.post(&url).header("Accept", "application/json");
        if let Some(token) = &self.token {
            request = request.header("Cookie", format!("token_v2={token}"));
        }
        let response = request
            .send_json(payload)
            .map_err(|e| SourceError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let mut body_reader = response.into_body();

        if status >= 400 {
            let body = body_reader
                .read_to_string()
                .unwrap_or_else(|_| "(unable to read error body)".to_string());
            return Err(SourceError::Http { status, body });
        }

        body_reader
            .read_json()
            .map_err(|e| SourceError::Json(e.to_string()))
    }

    /// All chunks of a page, merged into one record map.
    fn load_page(&self, page_id: &str) -> Result<RecordMap, SourceError> {
        let mut record_map = RecordMap::default();
        let mut cursor = json!({ "stack": [] });

        for chunk_number in 0..MAX_CHUNKS {
            let chunk: PageChunk =
                self.post("loadPageChunk", &page_chunk_payload(page_id, chunk_number, &cursor))?;
            record_map.merge(chunk.record_map);

            let has_more = chunk
                .cursor
                .get("stack")
                .and_then(Value::as_array)
                .is_some_and(|stack| !stack.is_empty());
            if !has_more {
                break;
            }
            cursor = chunk.cursor;
        }

        Ok(record_map)
    }

    fn query_collection(
        &self,
        collection_id: &str,
        view_id: &str,
    ) -> Result<QueryResponse, SourceError> {
        self.post(
            "queryCollection",
            &query_collection_payload(collection_id, view_id),
        )
    }
}

impl DocumentSource for NotionClient {
    fn fetch_content_tree(&self, page_id: &str) -> Result<RecordMap, SourceError> {
        let page_id = parse_page_id(page_id).unwrap_or_else(|| page_id.to_string());
        let mut record_map = self.load_page(&page_id)?;

        for (collection_id, view_id) in collection_views(&record_map) {
            match self.query_collection(&collection_id, &view_id) {
                Ok(response) => {
                    record_map.merge(response.record_map);
                    record_map
                        .collection_query
                        .entry(collection_id)
                        .or_default()
                        .insert(view_id, response.result.reducer_results);
                }
                Err(e) => warn!(
                    collection_id = %collection_id,
                    view_id = %view_id,
                    error = %e,
                    "collection query failed, skipping view"
                ),
            }
        }

        Ok(record_map)
    }
}

fn page_chunk_payload(page_id: &str, chunk_number: u32, cursor: &Value) -> Value {
    json!({
        "pageId": page_id,
        "limit": CHUNK_LIMIT,
        "cursor": cursor,
        "chunkNumber": chunk_number,
        "verticalColumns": false,
    })
}

fn query_collection_payload(collection_id: &str, view_id: &str) -> Value {
    json!({
        "collection": { "id": collection_id },
        "collectionView": { "id": view_id },
        "loader": {
            "type": "reducer",
            "reducers": {
                "collection_group_results": { "type": "results", "limit": QUERY_LIMIT }
            },
            "sort": [],
            "searchQuery": "",
            "userTimeZone": "UTC",
        },
    })
}

/// `(collection id, view id)` for every database view block in the map,
/// skipping views whose results are already present.
fn collection_views(record_map: &RecordMap) -> Vec<(String, String)> {
    let mut views = Vec::new();
    for (_, block) in record_map.block.iter() {
        if !block.is_collection_view() {
            continue;
        }
        let Some(collection_id) = block.collection_pointer() else {
            continue;
        };
        for view_id in &block.view_ids {
            let known = record_map
                .collection_query
                .get(collection_id)
                .is_some_and(|q| q.contains_key(view_id));
            let pair = (collection_id.to_string(), view_id.clone());
            if !known && !views.contains(&pair) {
                views.push(pair);
            }
        }
    }
    views
}

/// Normalize a page id or Notion URL to the dashed UUID form.
///
/// Accepts `1f0c…` (32 hex digits), the dashed form, and URLs such as
/// `https://www.notion.so/My-Blog-1f0c…?v=…`. Returns `None` when no id can
/// be found.
pub fn parse_page_id(input: &str) -> Option<String> {
    let input = input.trim();
    let path = input.split(['?', '#']).next().unwrap_or(input);
    let last_segment = path.trim_end_matches('/').rsplit('/').next()?;
    let chars: Vec<char> = last_segment.chars().filter(|c| *c != '-').collect();
    if chars.len() < 32 {
        return None;
    }
    let hex: String = chars[chars.len() - 32..].iter().collect();
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let hex = hex.to_ascii_lowercase();
    Some(format!(
        "{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    ))
}
