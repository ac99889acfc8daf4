//! CLI output formatting.
//!
//! # Information-First Display
//!
//! Output is **information-centric, not file-centric**. Every post is shown by
//! its positional index and title, with its date, URL or output file as
//! secondary context. This makes the output readable as a content inventory
//! while still letting users trace each entry to a page in the site.
//!
//! # Output Format
//!
//! ## Posts
//!
//! ```text
//! Posts
//! 001 Foo
//!     Date: 2023-11-14
//!     URL: /blog/foo
//!
//! Sidebar
//!     2023 (1 post)
//! ```
//!
//! ## Build
//!
//! ```text
//! Home → index.html
//! Blog → blog/index.html
//! 001 Foo → blog/foo/index.html
//!
//! Skipped
//!     bar: fetch failed: HTTP error: 404 - …
//!
//! Generated 3 pages (1 post, 1 skipped)
//! Cache: 1 cached, 2 fetched (3 total)
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.

use crate::cache::CacheStats;
use crate::generate::GenerateSummary;
use crate::routes::RouteSet;
use crate::types::SideData;

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// `1 post`, `2 posts`.
fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

/// Truncate text to `max` characters, appending `...` if truncated.
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max).collect();
        format!("{cut}...")
    }
}

// ============================================================================
// posts
// ============================================================================

/// Format the post inventory of a build.
pub fn format_posts_output(side: &SideData) -> Vec<String> {
    let mut lines = Vec::new();

    if side.posts.is_empty() {
        lines.push("No published posts".to_string());
        return lines;
    }

    lines.push("Posts".to_string());
    for (i, post) in side.posts.iter().enumerate() {
        lines.push(format!("{} {}", format_index(i + 1), post.title));
        lines.push(format!("{}Date: {}", indent(1), post.date));
        lines.push(format!("{}URL: {}", indent(1), post.url));
    }

    lines.push(String::new());
    lines.push("Sidebar".to_string());
    for group in &side.sidebar {
        lines.push(format!(
            "{}{} ({})",
            indent(1),
            group.text,
            plural(group.items.len(), "post")
        ));
    }

    lines
}

/// Print the post inventory to stdout.
pub fn print_posts_output(side: &SideData) {
    for line in format_posts_output(side) {
        println!("{}", line);
    }
}

// ============================================================================
// build
// ============================================================================

/// Format the result of a full build.
pub fn format_build_output(
    routes: &RouteSet,
    summary: &GenerateSummary,
    cache: Option<&CacheStats>,
) -> Vec<String> {
    let mut lines = vec![
        "Home \u{2192} index.html".to_string(),
        "Blog \u{2192} blog/index.html".to_string(),
    ];

    let written = routes
        .routes
        .iter()
        .filter(|r| !summary.rejected_slugs.contains(&r.path));
    for (i, route) in written.enumerate() {
        lines.push(format!(
            "{} {} \u{2192} blog/{}/index.html",
            format_index(i + 1),
            route.title,
            route.path
        ));
    }

    let skipped = routes.skipped.len() + summary.rejected_slugs.len();
    if skipped > 0 {
        lines.push(String::new());
        lines.push("Skipped".to_string());
        for s in &routes.skipped {
            lines.push(format!("{}{}: {}", indent(1), s.slug, truncate(&s.reason, 120)));
        }
        for slug in &summary.rejected_slugs {
            lines.push(format!("{}{}: unsafe slug", indent(1), slug));
        }
    }

    lines.push(String::new());
    let mut total = format!(
        "Generated {} ({}",
        plural(summary.pages, "page"),
        plural(summary.posts, "post")
    );
    if skipped > 0 {
        total.push_str(&format!(", {skipped} skipped"));
    }
    total.push(')');
    lines.push(total);

    if let Some(stats) = cache {
        lines.push(format!("Cache: {}", stats));
    }

    lines
}

/// Print build output to stdout.
pub fn print_build_output(
    routes: &RouteSet,
    summary: &GenerateSummary,
    cache: Option<&CacheStats>,
) {
    for line in format_build_output(routes, summary, cache) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================
