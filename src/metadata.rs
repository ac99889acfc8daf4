//! Best-effort metadata extraction for one database row.
//!
//! A blog post is a row of the container database. Its metadata lives in four
//! named properties:
//!
//! | Property | Kept when |
//! |----------|-----------|
//! | `title` | non-empty text |
//! | `path`  | non-empty text (becomes the URL slug) |
//! | `date`  | a numeric timestamp (a date property or a number) |
//! | `status`| exactly `published` or `draft`, compared untrimmed |
//!
//! Dates leave the extractor in milliseconds. Date-typed properties
//! (`date`, `created_time`, `last_edited_time`) already are; a bare `number`
//! property carries no unit, so its magnitude decides (see [`unix_millis`]).
//!
//! Extraction never judges whether a row is a valid post. It returns a
//! [`RawPageProps`] with whatever it could read and leaves the decision to
//! [`crate::posts`]. A property that is absent and a property holding an
//! unusable value are both reported as `None`; only an unknown status literal
//! gets a warning, since that is almost always a typo in the database.
//!
//! The only hard failure is a row whose block is missing from the content
//! tree altogether.

use crate::record_map::{PropertyValue, RecordMap};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// Bare numbers at or above this magnitude are read as milliseconds.
const MILLIS_THRESHOLD: i64 = 100_000_000_000;

/// Publication status of a row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageStatus {
    #[default]
    Published,
    Draft,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown page status: {0:?}")]
pub struct UnknownStatus(pub String);

impl FromStr for PageStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "published" => Ok(PageStatus::Published),
            "draft" => Ok(PageStatus::Draft),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

impl fmt::Display for PageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageStatus::Published => f.write_str("published"),
            PageStatus::Draft => f.write_str("draft"),
        }
    }
}

/// Whatever could be read off a row. Every field but the id may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawPageProps {
    pub page_id: String,
    pub title: Option<String>,
    pub path: Option<String>,
    /// Milliseconds since the epoch.
    pub date: Option<i64>,
    pub status: Option<PageStatus>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("page block not found in content tree: {0}")]
    PageNotFound(String),
}

/// A unitless Unix timestamp in milliseconds: seconds below 10^11 are scaled.
pub fn unix_millis(timestamp: i64) -> i64 {
    if timestamp.unsigned_abs() >= MILLIS_THRESHOLD.unsigned_abs() {
        timestamp
    } else {
        timestamp * 1000
    }
}

/// Read title, path, date and status of `page_id` from `tree`.
pub fn extract_page_props(page_id: &str, tree: &RecordMap) -> Result<RawPageProps, ExtractError> {
    let block = tree
        .block(page_id)
        .ok_or_else(|| ExtractError::PageNotFound(page_id.to_string()))?;

    let raw_text = |name: &str| {
        tree.page_property(name, block)
            .and_then(|value| value.as_text().map(String::from))
            .filter(|s| !s.is_empty())
    };
    let text = |name: &str| {
        raw_text(name)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    };

    let date = tree
        .page_property("date", block)
        .and_then(|value| match value {
            PropertyValue::Timestamp(millis) => Some(millis),
            other => other.as_timestamp().map(unix_millis),
        });

    let status = raw_text("status").and_then(|raw| match raw.parse::<PageStatus>() {
        Ok(status) => Some(status),
        Err(e) => {
            warn!(page_id, error = %e, "ignoring invalid status");
            None
        }
    });

    Ok(RawPageProps {
        page_id: page_id.to_string(),
        title: text("title"),
        path: text("path"),
        date,
        status,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use serde_json::json;

    fn extract(spec: PageSpec) -> RawPageProps {
        let tree = container(std::slice::from_ref(&spec));
        extract_page_props(spec.id, &tree).unwrap()
    }

    // =========================================================================
    // Status parsing
    // =========================================================================

    #[test]
    fn status_parses_exact_literals() {
        assert_eq!("published".parse::<PageStatus>(), Ok(PageStatus::Published));
        assert_eq!("draft".parse::<PageStatus>(), Ok(PageStatus::Draft));
        assert!("Published".parse::<PageStatus>().is_err());
        assert!("archived".parse::<PageStatus>().is_err());
    }

    #[test]
    fn status_default_is_published() {
        assert_eq!(PageStatus::default(), PageStatus::Published);
        assert_eq!(PageStatus::Draft.to_string(), "draft");
    }

    // =========================================================================
    // Extraction
    // =========================================================================

    #[test]
    fn complete_row_is_fully_extracted() {
        let props = extract(published("a", "Foo", "foo", 1_700_000_000));
        assert_eq!(
            props,
            RawPageProps {
                page_id: "a".into(),
                title: Some("Foo".into()),
                path: Some("foo".into()),
                date: Some(1_700_000_000_000),
                status: Some(PageStatus::Published),
            }
        );
    }

    #[test]
    fn missing_block_is_an_error() {
        let tree = container(&[]);
        assert_eq!(
            extract_page_props("ghost", &tree),
            Err(ExtractError::PageNotFound("ghost".into()))
        );
    }

    #[test]
    fn absent_properties_are_none() {
        let props = extract(PageSpec {
            id: "a",
            ..Default::default()
        });
        assert_eq!(props.title, None);
        assert_eq!(props.path, None);
        assert_eq!(props.date, None);
        assert_eq!(props.status, None);
    }

    #[test]
    fn blank_title_and_path_are_none() {
        let props = extract(PageSpec {
            id: "a",
            title: Some("   "),
            path: Some(""),
            ..Default::default()
        });
        assert_eq!(props.title, None);
        assert_eq!(props.path, None);
    }

    #[test]
    fn text_is_trimmed() {
        let props = extract(published("a", "  Foo ", " foo", 1));
        assert_eq!(props.title.as_deref(), Some("Foo"));
        assert_eq!(props.path.as_deref(), Some("foo"));
    }

    #[test]
    fn unknown_status_is_treated_as_absent() {
        let props = extract(PageSpec {
            status: Some("archived"),
            ..published("a", "Foo", "foo", 1)
        });
        assert_eq!(props.status, None);
        assert_eq!(props.title.as_deref(), Some("Foo"));
    }

    #[test]
    fn padded_status_is_not_a_status() {
        let props = extract(PageSpec {
            status: Some("draft "),
            ..published("a", "Foo", "foo", 1)
        });
        assert_eq!(props.status, None);
    }

    #[test]
    fn non_numeric_date_is_none() {
        let mut tree = container(&[published("a", "Foo", "foo", 1)]);
        let mut block = tree.block("a").unwrap().clone();
        block.properties.insert("d8:x".into(), json!([["next tuesday"]]));
        tree.block.insert("a".into(), block);

        assert_eq!(extract_page_props("a", &tree).unwrap().date, None);
    }

    #[test]
    fn date_property_reads_as_milliseconds() {
        let tree: RecordMap = serde_json::from_value(json!({
            "block": { "a": { "value": {
                "id": "a",
                "parent_id": "c",
                "parent_table": "collection",
                "properties": {
                    "t": [["Foo"]],
                    "d": [["‣", [["d", { "type": "date", "start_date": "2023-11-14" }]]]]
                }
            } } },
            "collection": { "c": { "value": { "id": "c", "schema": {
                "t": { "name": "Title", "type": "title" },
                "d": { "name": "Date", "type": "date" }
            } } } }
        }))
        .unwrap();

        let props = extract_page_props("a", &tree).unwrap();
        assert_eq!(props.title.as_deref(), Some("Foo"));
        assert_eq!(props.date, Some(1_699_920_000_000));
    }

    #[test]
    fn early_date_property_stays_in_milliseconds() {
        // 1972-06-01 is below the bare-number millisecond threshold
        let tree: RecordMap = serde_json::from_value(json!({
            "block": { "a": { "value": {
                "id": "a",
                "parent_id": "c",
                "parent_table": "collection",
                "properties": {
                    "d": [["‣", [["d", { "type": "date", "start_date": "1972-06-01" }]]]]
                }
            } } },
            "collection": { "c": { "value": { "id": "c", "schema": {
                "d": { "name": "Date", "type": "date" }
            } } } }
        }))
        .unwrap();

        assert_eq!(
            extract_page_props("a", &tree).unwrap().date,
            Some(76_204_800_000)
        );
    }

    #[test]
    fn number_dates_are_scaled_by_magnitude() {
        assert_eq!(unix_millis(1_700_000_000), 1_700_000_000_000);
        assert_eq!(unix_millis(1_700_000_000_000), 1_700_000_000_000);
        assert_eq!(unix_millis(0), 0);

        let millis = extract(published("a", "Foo", "foo", 1_700_000_000_000));
        assert_eq!(millis.date, Some(1_700_000_000_000));
    }

    #[test]
    fn created_time_can_serve_as_date() {
        let tree: RecordMap = serde_json::from_value(json!({
            "block": { "a": { "value": {
                "id": "a",
                "created_time": 1_700_000_000_000_i64,
                "properties": {}
            } } },
            "collection": { "c": { "value": { "id": "c", "schema": {
                "ct": { "name": "date", "type": "created_time" }
            } } } }
        }))
        .unwrap();

        assert_eq!(
            extract_page_props("a", &tree).unwrap().date,
            Some(1_700_000_000_000)
        );
    }
}
