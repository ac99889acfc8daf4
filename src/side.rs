//! Build-scoped aggregation of the post list and sidebar.
//!
//! Several consumers need the same [`SideData`] during one build: the route
//! builder, site generation and the `posts` command. [`BuildContext`] owns the
//! document source and computes it at most once:
//!
//! 1. fetch the container (through the disk cache),
//! 2. list its child page ids,
//! 3. extract, validate and sort the posts,
//! 4. group them into the sidebar.
//!
//! The result is memoized behind an `Arc` and shared read-only. The memo lock
//! is held for the whole computation, so callers racing on the first call wait
//! for one fetch instead of issuing their own. A failed computation memoizes
//! nothing and the next call tries again.

use crate::collection::list_child_ids;
use crate::posts::build_posts;
use crate::sidebar::build_sidebar;
use crate::source::{DocumentSource, Documents, SourceError};
use crate::types::SideData;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{info, warn};

pub struct BuildContext<S> {
    documents: Documents<S>,
    root_id: String,
    side_data: Mutex<Option<Arc<SideData>>>,
}

impl<S: DocumentSource> BuildContext<S> {
    pub fn new(documents: Documents<S>, root_id: impl Into<String>) -> Self {
        Self {
            documents,
            root_id: root_id.into(),
            side_data: Mutex::new(None),
        }
    }

    pub fn documents(&self) -> &Documents<S> {
        &self.documents
    }

    pub fn root_id(&self) -> &str {
        &self.root_id
    }

    /// The post list and sidebar for this build, computed on first use.
    pub fn side_data(&self) -> Result<Arc<SideData>, SourceError> {
        let mut slot = self
            .side_data
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(data) = slot.as_ref() {
            return Ok(Arc::clone(data));
        }
        let data = Arc::new(self.compute_side_data()?);
        *slot = Some(Arc::clone(&data));
        Ok(data)
    }

    fn compute_side_data(&self) -> Result<SideData, SourceError> {
        let tree = self.documents.fetch_container(&self.root_id)?;
        let ids = list_child_ids(&tree);
        if ids.is_empty() {
            warn!(root_id = %self.root_id, "container lists no pages");
            return Ok(SideData::default());
        }

        let posts = build_posts(&ids, &tree);
        let sidebar = build_sidebar(&posts);
        info!(
            rows = ids.len(),
            posts = posts.len(),
            years = sidebar.len(),
            "built post list"
        );
        Ok(SideData { posts, sidebar })
    }
}
