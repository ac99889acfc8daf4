//! # Notion Blog
//!
//! A static blog generator whose content lives in a Notion database. One
//! Notion page holds a collection view; every row of that collection is a
//! post, and its properties (title, path, date, status) decide whether and
//! where the post is published.
//!
//! # Architecture
//!
//! ```text
//! 1. Fetch     root page  →  record map      (Notion api/v3, optional disk cache)
//! 2. Derive    record map →  SideData        (posts + sidebar, computed once per build)
//! 3. Render    post pages →  RouteSet        (one route per post, in parallel)
//! 4. Generate  RouteSet   →  dist/           (final HTML site)
//! ```
//!
//! Derivation is pure: it reads a [`record_map::RecordMap`] and never touches
//! the network, so tests build record maps by hand and exercise the whole
//! pipeline through a fake [`source::DocumentSource`].
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`source`] | Document source trait, cached access, Notion HTTP client |
//! | [`cache`] | JSON-file disk cache with hit/miss accounting |
//! | [`record_map`] | Typed record map: blocks, collections, rich text, properties |
//! | [`collection`] | Row ids of the root container's collection view |
//! | [`metadata`] | Raw page properties read out of a record map |
//! | [`posts`] | Validation, date formatting and ordering of posts |
//! | [`sidebar`] | Year-grouped archive navigation |
//! | [`side`] | Per-build context memoizing the post list and sidebar |
//! | [`render`] | Content tree to HTML |
//! | [`routes`] | One rendered route per post, with head metadata |
//! | [`generate`] | Writes the HTML site using Maud |
//! | [`config`] | `blog.toml` loading, validation, env overrides |
//! | [`types`] | Serializable post and sidebar types |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Drafts Never Leak
//!
//! A post is published unless its status says `draft`. Drafts are dropped
//! before slugs, dates or URLs are computed, so nothing derived from a draft
//! reaches the sidebar or the output directory.
//!
//! ## Incomplete Rows Are Skipped, Not Fatal
//!
//! A row missing a title, path or date is logged and left out. One half-written
//! post in the database should not stop the rest of the blog from building.
//!
//! ## Maud Over Template Engines
//!
//! HTML is generated with [Maud](https://maud.lambda.xyz/): malformed markup is
//! a compile error, and every interpolation is escaped by default.

pub mod cache;
pub mod collection;
pub mod config;
pub mod generate;
pub mod metadata;
pub mod output;
pub mod posts;
pub mod record_map;
pub mod render;
pub mod routes;
pub mod side;
pub mod sidebar;
pub mod source;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
