//! Shared types passed between the build stages.
//!
//! [`SideData`] is what the aggregator hands to every consumer (routes, site
//! generation, the `posts` command). It is also dumped as `side-data.json`,
//! so field names follow the camelCase convention of the site's JSON.

use crate::metadata::PageStatus;
use serde::{Deserialize, Serialize};

/// One published post, ready to list and link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub page_id: String,
    pub title: String,
    pub slug: String,
    /// `YYYY-MM-DD`, UTC.
    pub date: String,
    /// `MM-DD`, UTC.
    pub date_for_sidebar: String,
    pub tags: Vec<String>,
    pub description: String,
    /// `/blog/{slug}`
    pub url: String,
    pub status: PageStatus,
}

/// Posts of one calendar year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SidebarGroup {
    /// The year, e.g. `"2023"`.
    pub text: String,
    pub items: Vec<SidebarItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SidebarItem {
    pub text: String,
    pub link: String,
}

/// Everything derived from the container for one build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideData {
    /// Newest first.
    pub posts: Vec<Post>,
    /// Newest year first.
    pub sidebar: Vec<SidebarGroup>,
}

impl SideData {
    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }
}
