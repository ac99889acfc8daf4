//! Typed model of a Notion record map, the "content tree" of one page.
//!
//! Notion's unofficial API answers every page request with a record map: flat
//! tables of records keyed by id (`block`, `collection`, `collection_view`)
//! plus the pre-computed `collection_query` listing of a database view. The
//! tree structure lives in each block's `content` list of child ids.
//!
//! ## Record envelopes
//!
//! Each table entry is wrapped in a record envelope. Two shapes are in the
//! wild and both are accepted:
//!
//! ```text
//! { "role": "reader", "value": { ...block... } }                 // classic
//! { "spaceId": "…", "value": { "role": "reader", "value": {…} } } // nested
//! ```
//!
//! Records without a readable value (permission denied, unknown shape) are
//! skipped rather than failing the whole map.
//!
//! ## Ordering
//!
//! "First collection" and "first view" are meaningful for a database page, so
//! [`RecordTable`] keeps entries in document order and maintains a runtime id
//! index on the side. Serialization writes the classic envelope back out, so a
//! cached record map reads back identically.
//!
//! ## Rich text
//!
//! Text properties are arrays of decorated runs:
//! `[["Hello "], ["world", [["b"], ["a", "https://…"]]]]`. [`text_runs`] decodes
//! them into [`TextRun`]s; [`text_content`] concatenates the plain text.

use chrono::{NaiveDate, NaiveTime};
use serde::de::{Deserializer, IgnoredAny, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::marker::PhantomData;

/// All records returned for one page request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordMap {
    #[serde(default)]
    pub block: RecordTable<Block>,
    #[serde(default)]
    pub collection: RecordTable<Collection>,
    #[serde(default)]
    pub collection_view: RecordTable<CollectionView>,
    /// `collection id → view id → query results`.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub collection_query: HashMap<String, HashMap<String, CollectionQueryResult>>,
}

impl RecordMap {
    pub fn block(&self, id: &str) -> Option<&Block> {
        self.block.get(id)
    }

    /// Merge another record map into this one. Records from `other` win.
    pub fn merge(&mut self, other: RecordMap) {
        self.block.extend(other.block);
        self.collection.extend(other.collection);
        self.collection_view.extend(other.collection_view);
        for (collection_id, views) in other.collection_query {
            self.collection_query
                .entry(collection_id)
                .or_default()
                .extend(views);
        }
    }

    /// Read one named property of a page block through its collection schema.
    ///
    /// The schema comes from the block's parent collection, falling back to
    /// the first collection in the map. The property name is matched
    /// case-insensitively against the schema's display names, and the raw
    /// value is decoded according to the schema type:
    ///
    /// | Schema type | Result |
    /// |-------------|--------|
    /// | `date` | [`PropertyValue::Timestamp`] in milliseconds (UTC) |
    /// | `created_time`, `last_edited_time` | block timestamp |
    /// | `number` | [`PropertyValue::Number`] |
    /// | `checkbox` | [`PropertyValue::Checkbox`] |
    /// | `multi_select` | [`PropertyValue::List`] |
    /// | anything else | [`PropertyValue::Text`] (plain text content) |
    ///
    /// Returns `None` when the schema has no such property, the block carries
    /// no value for it, or the value cannot be decoded.
    pub fn page_property(&self, name: &str, block: &Block) -> Option<PropertyValue> {
        let collection = self.schema_collection(block)?;
        let (property_id, schema) = collection
            .schema
            .iter()
            .find(|(_, schema)| schema.name.eq_ignore_ascii_case(name))?;

        match schema.kind.as_str() {
            "created_time" => block.created_time.map(PropertyValue::Timestamp),
            "last_edited_time" => block.last_edited_time.map(PropertyValue::Timestamp),
            kind => {
                let raw = block.properties.get(property_id)?;
                match kind {
                    "date" => date_value(raw)?
                        .timestamp_millis()
                        .map(PropertyValue::Timestamp),
                    "number" => text_content(raw)
                        .trim()
                        .parse::<f64>()
                        .ok()
                        .map(PropertyValue::Number),
                    "checkbox" => Some(PropertyValue::Checkbox(text_content(raw) == "Yes")),
                    "multi_select" => Some(PropertyValue::List(
                        text_content(raw)
                            .split(',')
                            .map(str::trim)
                            .filter(|s| !s.is_empty())
                            .map(String::from)
                            .collect(),
                    )),
                    _ => Some(PropertyValue::Text(text_content(raw))),
                }
            }
        }
    }

    fn schema_collection(&self, block: &Block) -> Option<&Collection> {
        let parent = block
            .parent_id
            .as_deref()
            .filter(|_| block.parent_table.as_deref() == Some("collection"))
            .and_then(|id| self.collection.get(id));
        parent.or_else(|| self.collection.first())
    }
}

/// A decoded page property.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Text(String),
    /// Unix timestamp as delivered by the source (milliseconds for Notion).
    Timestamp(i64),
    Number(f64),
    Checkbox(bool),
    List(Vec<String>),
}

impl PropertyValue {
    /// Plain text, for text-like properties only.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Integer timestamp, only when the source already delivered a number.
    pub fn as_timestamp(&self) -> Option<i64> {
        match self {
            PropertyValue::Timestamp(ts) => Some(*ts),
            PropertyValue::Number(n) if n.is_finite() && n.fract() == 0.0 => Some(*n as i64),
            _ => None,
        }
    }
}

// ============================================================================
// Records
// ============================================================================

/// One block: a page, a paragraph, a list item, a database view, …
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Block {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Property id → rich text value.
    #[serde(
        default,
        deserialize_with = "nullable",
        skip_serializing_if = "HashMap::is_empty"
    )]
    pub properties: HashMap<String, Value>,
    /// Child block ids, in display order.
    #[serde(
        default,
        deserialize_with = "nullable",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub content: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_table: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_id: Option<String>,
    #[serde(
        default,
        deserialize_with = "nullable",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub view_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_time: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_edited_time: Option<i64>,
}

impl Block {
    /// Plain text of a raw property (e.g. `"title"`, `"language"`).
    pub fn text(&self, property_id: &str) -> Option<String> {
        self.properties.get(property_id).map(text_content)
    }

    /// Decorated runs of a raw property; empty when absent.
    pub fn runs(&self, property_id: &str) -> Vec<TextRun> {
        self.properties
            .get(property_id)
            .map(text_runs)
            .unwrap_or_default()
    }

    /// A string entry of the block's `format` object.
    pub fn format_str(&self, key: &str) -> Option<&str> {
        self.format.as_ref()?.get(key)?.as_str()
    }

    /// Collection backing a `collection_view*` block.
    pub fn collection_pointer(&self) -> Option<&str> {
        self.collection_id.as_deref().or_else(|| {
            self.format
                .as_ref()?
                .get("collection_pointer")?
                .get("id")?
                .as_str()
        })
    }

    pub fn is_collection_view(&self) -> bool {
        matches!(
            self.kind.as_str(),
            "collection_view" | "collection_view_page"
        )
    }
}

/// A database: its id and property schema.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Collection {
    pub id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub schema: BTreeMap<String, PropertySchema>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertySchema {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectionView {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
}

/// Query results attached to one collection view.
///
/// Newer API responses put the ids under a `collection_group_results`
/// reducer; older ones carry a flat `blockIds` list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectionQueryResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_group_results: Option<ReducerResult>,
    #[serde(rename = "blockIds", default, skip_serializing_if = "Option::is_none")]
    pub block_ids: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReducerResult {
    #[serde(rename = "blockIds", default, skip_serializing_if = "Option::is_none")]
    pub block_ids: Option<Vec<String>>,
}

fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ============================================================================
// RecordTable
// ============================================================================

/// Insertion-ordered table of records keyed by id.
///
/// The `index` is rebuilt as entries are inserted and never serialized.
#[derive(Debug, Clone)]
pub struct RecordTable<T> {
    entries: Vec<(String, T)>,
    index: HashMap<String, usize>,
}

impl<T> Default for RecordTable<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<T> RecordTable<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.index.get(id).map(|&pos| &self.entries[pos].1)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// The first record in document order.
    pub fn first(&self) -> Option<&T> {
        self.entries.first().map(|(_, value)| value)
    }

    /// Insert or replace; a replaced record keeps its original position.
    pub fn insert(&mut self, id: String, value: T) {
        match self.index.get(&id) {
            Some(&pos) => self.entries[pos].1 = value,
            None => {
                self.index.insert(id.clone(), self.entries.len());
                self.entries.push((id, value));
            }
        }
    }

    pub fn extend(&mut self, other: RecordTable<T>) {
        for (id, value) in other.entries {
            self.insert(id, value);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries.iter().map(|(id, value)| (id.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T> FromIterator<(String, T)> for RecordTable<T> {
    fn from_iter<I: IntoIterator<Item = (String, T)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (id, value) in iter {
            table.insert(id, value);
        }
        table
    }
}

#[derive(Deserialize)]
struct Envelope<T> {
    value: T,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RecordRepr<T> {
    Nested { value: Envelope<T> },
    Classic { value: Option<T> },
    Unreadable(IgnoredAny),
}

impl<T> RecordRepr<T> {
    fn into_value(self) -> Option<T> {
        match self {
            RecordRepr::Nested { value } => Some(value.value),
            RecordRepr::Classic { value } => value,
            RecordRepr::Unreadable(_) => None,
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for RecordTable<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TableVisitor<T>(PhantomData<T>);

        impl<'de, T: Deserialize<'de>> Visitor<'de> for TableVisitor<T> {
            type Value = RecordTable<T>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of record ids to records")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut table = RecordTable::new();
                while let Some((id, record)) = map.next_entry::<String, RecordRepr<T>>()? {
                    if let Some(value) = record.into_value() {
                        table.insert(id, value);
                    }
                }
                Ok(table)
            }

            fn visit_unit<E: serde::de::Error>(self) -> Result<Self::Value, E> {
                Ok(RecordTable::new())
            }
        }

        deserializer.deserialize_any(TableVisitor(PhantomData))
    }
}

impl<T: Serialize> Serialize for RecordTable<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Wrapped<'a, T> {
            value: &'a T,
        }

        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (id, value) in &self.entries {
            map.serialize_entry(id, &Wrapped { value })?;
        }
        map.end()
    }
}

// ============================================================================
// Rich text
// ============================================================================

/// One run of text and the inline formats applied to it.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub formats: Vec<TextFormat>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TextFormat {
    Bold,
    Italic,
    Strike,
    Underline,
    Code,
    Link(String),
    Color(String),
    Date(NotionDate),
    /// Mention of another page, by id.
    Page(String),
    /// Mention of a user, by id.
    User(String),
    /// Inline equation source.
    Equation(String),
    Unknown,
}

/// The payload of a date mention (`["d", {...}]`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotionDate {
    pub start_date: String,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
}

impl NotionDate {
    /// Milliseconds since the epoch, reading the date (and optional
    /// `HH:MM` start time) as UTC.
    pub fn timestamp_millis(&self) -> Option<i64> {
        let date = NaiveDate::parse_from_str(&self.start_date, "%Y-%m-%d").ok()?;
        let time = self
            .start_time
            .as_deref()
            .and_then(|t| NaiveTime::parse_from_str(t, "%H:%M").ok())
            .unwrap_or(NaiveTime::MIN);
        Some(date.and_time(time).and_utc().timestamp_millis())
    }

    /// Human-readable form: `2024-03-01` or `2024-03-01 → 2024-03-04`.
    pub fn display(&self) -> String {
        match &self.end_date {
            Some(end) => format!("{} → {}", self.start_date, end),
            None => self.start_date.clone(),
        }
    }
}

/// Decode a rich text value into runs. Malformed runs are skipped.
pub fn text_runs(value: &Value) -> Vec<TextRun> {
    let Some(segments) = value.as_array() else {
        return Vec::new();
    };
    segments
        .iter()
        .filter_map(|segment| {
            let parts = segment.as_array()?;
            let text = parts.first()?.as_str()?.to_string();
            let formats = parts
                .get(1)
                .and_then(Value::as_array)
                .map(|formats| formats.iter().map(parse_format).collect())
                .unwrap_or_default();
            Some(TextRun { text, formats })
        })
        .collect()
}

/// Concatenated plain text of a rich text value.
pub fn text_content(value: &Value) -> String {
    text_runs(value).into_iter().map(|run| run.text).collect()
}

/// First date mention inside a rich text value.
pub fn date_value(value: &Value) -> Option<NotionDate> {
    text_runs(value)
        .into_iter()
        .flat_map(|run| run.formats)
        .find_map(|format| match format {
            TextFormat::Date(date) => Some(date),
            _ => None,
        })
}

fn parse_format(format: &Value) -> TextFormat {
    let Some(parts) = format.as_array() else {
        return TextFormat::Unknown;
    };
    let arg = parts.get(1);
    let arg_str = || arg.and_then(Value::as_str).map(String::from);
    match parts.first().and_then(Value::as_str) {
        Some("b") => TextFormat::Bold,
        Some("i") => TextFormat::Italic,
        Some("s") => TextFormat::Strike,
        Some("_") => TextFormat::Underline,
        Some("c") => TextFormat::Code,
        Some("a") => arg_str().map_or(TextFormat::Unknown, TextFormat::Link),
        Some("h") => arg_str().map_or(TextFormat::Unknown, TextFormat::Color),
        Some("p") => arg_str().map_or(TextFormat::Unknown, TextFormat::Page),
        Some("u") => arg_str().map_or(TextFormat::Unknown, TextFormat::User),
        Some("e") => arg_str().map_or(TextFormat::Unknown, TextFormat::Equation),
        Some("d") => arg
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
            .map_or(TextFormat::Unknown, TextFormat::Date),
        _ => TextFormat::Unknown,
    }
}
