//! Container traversal: the ordered child page ids of the blog database.

use crate::record_map::{CollectionQueryResult, RecordMap};

/// The two result shapes a collection query can come back in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryResults {
    /// Ids under the `collection_group_results` reducer.
    Grouped(Vec<String>),
    /// Legacy flat `blockIds` list.
    Flat(Vec<String>),
}

impl QueryResults {
    /// Pick the shape present in a query result, grouped first.
    pub fn from_query(result: &CollectionQueryResult) -> Option<Self> {
        if let Some(ids) = result
            .collection_group_results
            .as_ref()
            .and_then(|group| group.block_ids.clone())
        {
            return Some(QueryResults::Grouped(ids));
        }
        result.block_ids.clone().map(QueryResults::Flat)
    }

    pub fn into_ids(self) -> Vec<String> {
        match self {
            QueryResults::Grouped(ids) | QueryResults::Flat(ids) => ids,
        }
    }
}

/// Child page ids of the container, in the order of its first view.
///
/// Uses the first collection and the first collection view of the tree.
/// Any missing piece yields an empty list; this never fails.
pub fn list_child_ids(tree: &RecordMap) -> Vec<String> {
    let Some(collection) = tree.collection.first() else {
        return Vec::new();
    };
    let Some(view) = tree.collection_view.first() else {
        return Vec::new();
    };
    tree.collection_query
        .get(&collection.id)
        .and_then(|views| views.get(&view.id))
        .and_then(QueryResults::from_query)
        .map(QueryResults::into_ids)
        .unwrap_or_default()
}
