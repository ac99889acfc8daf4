//! Metadata validation and the sorted post list.
//!
//! [`build_posts`] is the aggregator: it runs the extractor over every child
//! id of the container and keeps only rows that make a publishable post.
//!
//! ```text
//! id ──extract──▶ RawPageProps ──validate──▶ PageProps ──▶ Post
//!       │                  │
//!       │ missing block    ├─ draft: dropped silently
//!       ▼                  └─ title/path/date missing: dropped, warned
//!     dropped, warned
//! ```
//!
//! The surviving posts are sorted newest first. The sort is stable, so posts
//! sharing a date keep their order in the container. If two posts claim the
//! same slug, the first in sorted order (the newest) keeps it.

use crate::metadata::{PageStatus, RawPageProps, extract_page_props};
use crate::record_map::RecordMap;
use crate::types::Post;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use tracing::warn;

/// A row that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageProps {
    pub page_id: String,
    pub title: String,
    pub path: String,
    /// Milliseconds since the epoch.
    pub date: i64,
    pub status: PageStatus,
}

/// Why a row is not a post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    Draft,
    Incomplete { missing: Vec<&'static str> },
}

impl TryFrom<RawPageProps> for PageProps {
    type Error = Rejection;

    fn try_from(raw: RawPageProps) -> Result<Self, Self::Error> {
        if raw.status == Some(PageStatus::Draft) {
            return Err(Rejection::Draft);
        }
        match (raw.title, raw.path, raw.date) {
            (Some(title), Some(path), Some(date)) => Ok(PageProps {
                page_id: raw.page_id,
                title,
                path,
                date,
                status: raw.status.unwrap_or_default(),
            }),
            (title, path, date) => {
                let missing = [
                    ("title", title.is_none()),
                    ("path", path.is_none()),
                    ("date", date.is_none()),
                ]
                .into_iter()
                .filter_map(|(name, absent)| absent.then_some(name))
                .collect();
                Err(Rejection::Incomplete { missing })
            }
        }
    }
}

impl Post {
    /// Build a post from validated props. `None` if the date is out of range.
    pub fn from_props(props: PageProps) -> Option<Post> {
        let date: DateTime<Utc> = DateTime::from_timestamp_millis(props.date)?;
        Some(Post {
            url: format!("/blog/{}", props.path),
            page_id: props.page_id,
            title: props.title,
            slug: props.path,
            date: date.format("%Y-%m-%d").to_string(),
            date_for_sidebar: date.format("%m-%d").to_string(),
            tags: Vec::new(),
            description: String::new(),
            status: props.status,
        })
    }
}

/// The publishable posts among `ids`, newest first.
pub fn build_posts(ids: &[String], tree: &RecordMap) -> Vec<Post> {
    let mut posts: Vec<Post> = ids
        .iter()
        .filter_map(|id| {
            let raw = match extract_page_props(id, tree) {
                Ok(raw) => raw,
                Err(e) => {
                    warn!(page_id = %id, error = %e, "skipping page");
                    return None;
                }
            };
            let props = match PageProps::try_from(raw) {
                Ok(props) => props,
                Err(Rejection::Draft) => return None,
                Err(Rejection::Incomplete { missing }) => {
                    warn!(page_id = %id, ?missing, "skipping page with incomplete metadata");
                    return None;
                }
            };
            let timestamp = props.date;
            let post = Post::from_props(props);
            if post.is_none() {
                warn!(page_id = %id, timestamp, "skipping page with out-of-range date");
            }
            post
        })
        .collect();

    posts.sort_by(|a, b| b.date.cmp(&a.date));
    dedupe_slugs(posts)
}

fn dedupe_slugs(posts: Vec<Post>) -> Vec<Post> {
    let mut seen = HashSet::new();
    posts
        .into_iter()
        .filter(|post| {
            let first = seen.insert(post.slug.clone());
            if !first {
                warn!(
                    page_id = %post.page_id,
                    slug = %post.slug,
                    "duplicate slug, keeping the newer post"
                );
            }
            first
        })
        .collect()
}
