//! HTML site generation.
//!
//! Final stage of the build. Takes the build's [`SideData`] and the rendered
//! [`RouteSet`] and writes a static site.
//!
//! ## Generated Pages
//!
//! - **Home page** (`/index.html`): site description and the latest posts
//! - **Blog index** (`/blog/index.html`): every post, newest first, with the
//!   year sidebar
//! - **Post pages** (`/blog/{slug}/index.html`): sharing metadata, top nav,
//!   year sidebar with the current post marked, title, date and content
//! - **Side data** (`/side-data.json`): the post list and sidebar as JSON
//!
//! ## Output Structure
//!
//! ```text
//! dist/
//! ├── index.html
//! ├── side-data.json
//! └── blog/
//!     ├── index.html
//!     ├── first-post/
//!     │   └── index.html
//!     └── ...
//! ```
//!
//! ## CSS
//!
//! `static/style.css` is embedded at compile time and inlined into every
//! page, so the output directory is self-contained.
//!
//! ## HTML Generation
//!
//! Uses [maud](https://maud.lambda.xyz/) for compile-time HTML templating.
//! Post bodies arrive pre-rendered from [`crate::render`]; everything else is
//! escaped by maud.

use crate::config::SiteConfig;
use crate::routes::{Route, RouteSet};
use crate::types::{Post, SideData, SidebarGroup};
use maud::{DOCTYPE, Markup, PreEscaped, html};
use std::fs;
use std::path::{Component, Path};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// What [`generate`] wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerateSummary {
    /// HTML documents written, including home and blog index.
    pub pages: usize,
    /// Post pages written.
    pub posts: usize,
    /// Routes not written because their slug is not a plain relative path.
    pub rejected_slugs: Vec<String>,
}

const CSS: &str = include_str!("../static/style.css");

/// File the side data is dumped to, relative to the output directory.
pub const SIDE_DATA_FILENAME: &str = "side-data.json";

pub fn generate(
    side: &SideData,
    routes: &RouteSet,
    site: &SiteConfig,
    output_dir: &Path,
) -> Result<GenerateSummary, GenerateError> {
    let mut summary = GenerateSummary::default();
    let blog_dir = output_dir.join("blog");
    fs::create_dir_all(&blog_dir)?;

    fs::write(
        output_dir.join("index.html"),
        render_home(side, site).into_string(),
    )?;
    fs::write(
        blog_dir.join("index.html"),
        render_blog_index(side, site).into_string(),
    )?;
    summary.pages += 2;

    for route in &routes.routes {
        if !is_safe_slug(&route.path) {
            warn!(slug = %route.path, "refusing to write post outside the blog directory");
            summary.rejected_slugs.push(route.path.clone());
            continue;
        }
        let post_dir = blog_dir.join(&route.path);
        fs::create_dir_all(&post_dir)?;
        fs::write(
            post_dir.join("index.html"),
            render_post_page(route, side, site).into_string(),
        )?;
        summary.pages += 1;
        summary.posts += 1;
    }

    fs::write(
        output_dir.join(SIDE_DATA_FILENAME),
        serde_json::to_string_pretty(side)?,
    )?;

    info!(
        pages = summary.pages,
        output = %output_dir.display(),
        "site generated"
    );
    Ok(summary)
}

/// Slugs become directory names: only plain relative segments are allowed.
fn is_safe_slug(slug: &str) -> bool {
    !slug.is_empty()
        && Path::new(slug)
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
}

// ============================================================================
// HTML Components
// ============================================================================

/// Renders the base HTML document structure
fn base_document(title: &str, site: &SiteConfig, head: Markup, content: Markup) -> Markup {
    let page_title = if title == site.title {
        title.to_string()
    } else {
        format!("{} | {}", title, site.title)
    };
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (page_title) }
                @if !site.description.is_empty() {
                    meta name="description" content=(site.description);
                }
                (head)
                style { (PreEscaped(CSS)) }
            }
            body {
                (site_header(site))
                (content)
                (site_footer(site))
            }
        }
    }
}

/// Renders the top bar: site title and configured nav links.
fn site_header(site: &SiteConfig) -> Markup {
    html! {
        header.site-header {
            a.site-title href="/" { (site.title) }
            nav.site-nav {
                ul {
                    @for item in &site.nav {
                        li { a href=(item.link) { (item.text) } }
                    }
                }
            }
        }
    }
}

fn site_footer(site: &SiteConfig) -> Markup {
    html! {
        footer.site-footer {
            @if !site.social.is_empty() {
                ul.social-links {
                    @for social in &site.social {
                        li { a href=(social.link) rel="noopener" { (social.icon) } }
                    }
                }
            }
            @if let Some(footer) = &site.footer {
                p { (footer) }
            }
        }
    }
}

/// Renders the year sidebar, marking the link of the current page.
pub fn render_sidebar(groups: &[SidebarGroup], current_link: Option<&str>) -> Markup {
    html! {
        aside.sidebar {
            @for group in groups {
                section.sidebar-group {
                    h2 { (group.text) }
                    ul {
                        @for item in &group.items {
                            @let is_current = current_link == Some(item.link.as_str());
                            li class=[is_current.then_some("current")] {
                                a href=(item.link) { (item.text) }
                            }
                        }
                    }
                }
            }
        }
    }
}

fn post_list(posts: &[Post]) -> Markup {
    html! {
        ul.post-list {
            @for post in posts {
                li {
                    time datetime=(post.date) { (post.date) }
                    " "
                    a href=(post.url) { (post.title) }
                }
            }
        }
    }
}

// ============================================================================
// Page Renderers
// ============================================================================

fn render_home(side: &SideData, site: &SiteConfig) -> Markup {
    let latest = &side.posts[..side.posts.len().min(site.home_posts)];
    let content = html! {
        main.home-page {
            h1 { (site.title) }
            @if !site.description.is_empty() {
                p.site-description { (site.description) }
            }
            @if latest.is_empty() {
                p.empty { "No posts yet." }
            } @else {
                h2 { "Latest posts" }
                (post_list(latest))
                @if side.posts.len() > latest.len() {
                    p.more { a href="/blog/" { "All posts →" } }
                }
            }
        }
    };
    base_document(&site.title, site, html! {}, content)
}

fn render_blog_index(side: &SideData, site: &SiteConfig) -> Markup {
    let content = html! {
        div.layout {
            (render_sidebar(&side.sidebar, None))
            main.blog-index {
                h1 { "Blog" }
                (post_list(&side.posts))
            }
        }
    };
    base_document("Blog", site, html! {}, content)
}

fn render_post_page(route: &Route, side: &SideData, site: &SiteConfig) -> Markup {
    let current = format!("/blog/{}", route.path);
    let head = html! {
        @for tag in &route.head {
            @let (attr, key, value) = tag.parts();
            @if attr == "property" {
                meta property=(key) content=(value);
            } @else {
                meta name=(key) content=(value);
            }
        }
    };
    let content = html! {
        div.layout {
            (render_sidebar(&side.sidebar, Some(&current)))
            main.post-page {
                article {
                    header.post-header {
                        h1 { (route.title) }
                        time datetime=(route.date) { (route.date) }
                    }
                    (PreEscaped(&route.html_content))
                }
            }
        }
    };
    base_document(&route.title, site, head, content)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{NavLink, SocialLink};
    use crate::metadata::PageStatus;
    use crate::routes::{MetaTag, head_tags};
    use crate::sidebar::build_sidebar;
    use tempfile::TempDir;

    fn post(title: &str, slug: &str, date: &str) -> Post {
        Post {
            page_id: format!("id-{slug}"),
            title: title.into(),
            slug: slug.into(),
            date: date.into(),
            date_for_sidebar: date[5..].into(),
            tags: vec![],
            description: String::new(),
            url: format!("/blog/{slug}"),
            status: PageStatus::Published,
        }
    }

    fn side(posts: Vec<Post>) -> SideData {
        let sidebar = build_sidebar(&posts);
        SideData { posts, sidebar }
    }

    fn route(p: &Post, site: &SiteConfig) -> Route {
        Route {
            path: p.slug.clone(),
            title: p.title.clone(),
            date: p.date.clone(),
            html_content: format!("<p>content of {}</p>", p.slug),
            head: head_tags(p, site),
        }
    }

    fn sample() -> (SideData, RouteSet, SiteConfig) {
        let site = SiteConfig {
            author: "Ada".into(),
            ..SiteConfig::default()
        };
        let data = side(vec![
            post("New", "new", "2024-02-01"),
            post("Old", "old", "2023-05-06"),
        ]);
        let routes = RouteSet {
            routes: data.posts.iter().map(|p| route(p, &site)).collect(),
            skipped: vec![],
        };
        (data, routes, site)
    }

    // =========================================================================
    // Components
    // =========================================================================

    #[test]
    fn base_document_includes_doctype_and_css() {
        let doc = base_document("T", &SiteConfig::default(), html! {}, html! {}).into_string();
        assert!(doc.starts_with("<!DOCTYPE html>"));
        assert!(doc.contains("<style>"));
        assert!(doc.contains("<title>T | My Blog</title>"));
    }

    #[test]
    fn header_renders_nav_links() {
        let site = SiteConfig {
            nav: vec![NavLink {
                text: "About".into(),
                link: "/about/".into(),
            }],
            ..SiteConfig::default()
        };
        let html = site_header(&site).into_string();
        assert!(html.contains(r#"<a href="/about/">About</a>"#));
        assert!(html.contains("site-title"));
    }

    #[test]
    fn footer_renders_social_links() {
        let site = SiteConfig {
            social: vec![SocialLink {
                icon: "github".into(),
                link: "https://github.com/ada".into(),
            }],
            footer: Some("Built from Notion".into()),
            ..SiteConfig::default()
        };
        let html = site_footer(&site).into_string();
        assert!(html.contains("https://github.com/ada"));
        assert!(html.contains("Built from Notion"));
    }

    #[test]
    fn sidebar_marks_current_item() {
        let data = side(vec![post("A", "a", "2024-01-01"), post("B", "b", "2023-01-01")]);
        let html = render_sidebar(&data.sidebar, Some("/blog/b")).into_string();
        assert!(html.contains("<h2>2024</h2>"));
        assert!(html.contains(r#"<li class="current"><a href="/blog/b">B</a></li>"#));
        assert_eq!(html.matches("current").count(), 1);
    }

    #[test]
    fn titles_are_escaped() {
        let data = side(vec![post("<b>bold</b>", "x", "2024-01-01")]);
        let html = post_list(&data.posts).into_string();
        assert!(html.contains("&lt;b&gt;bold&lt;/b&gt;"));
    }

    // =========================================================================
    // Pages
    // =========================================================================

    #[test]
    fn home_lists_latest_posts_only() {
        let site = SiteConfig {
            home_posts: 1,
            ..SiteConfig::default()
        };
        let data = side(vec![post("New", "new", "2024-02-01"), post("Old", "old", "2023-01-01")]);
        let html = render_home(&data, &site).into_string();
        assert!(html.contains("/blog/new"));
        assert!(!html.contains("/blog/old"));
        assert!(html.contains("All posts"));
    }

    #[test]
    fn home_without_posts() {
        let html = render_home(&SideData::default(), &SiteConfig::default()).into_string();
        assert!(html.contains("No posts yet."));
    }

    #[test]
    fn post_page_has_meta_tags_and_content() {
        let (data, routes, site) = sample();
        let html = render_post_page(&routes.routes[0], &data, &site).into_string();
        assert!(html.contains(r#"<meta property="og:title" content="New">"#));
        assert!(html.contains(r#"<meta name="twitter:card" content="summary_large_image">"#));
        assert!(html.contains("<p>content of new</p>"));
        assert!(html.contains(r#"<time datetime="2024-02-01">"#));
        assert!(html.contains(r#"<li class="current"><a href="/blog/new">"#));
    }

    #[test]
    fn meta_tag_content_is_escaped() {
        let site = SiteConfig::default();
        let mut r = route(&post("A \"quoted\" title", "q", "2024-01-01"), &site);
        r.head = vec![MetaTag::Property {
            property: "og:title".into(),
            content: "A \"quoted\" title".into(),
        }];
        let html = render_post_page(&r, &SideData::default(), &site).into_string();
        assert!(html.contains("content=\"A &quot;quoted&quot; title\""));
    }

    // =========================================================================
    // generate()
    // =========================================================================

    #[test]
    fn generate_writes_site_layout() {
        let tmp = TempDir::new().unwrap();
        let (data, routes, site) = sample();

        let summary = generate(&data, &routes, &site, tmp.path()).unwrap();

        assert_eq!(summary.pages, 4);
        assert_eq!(summary.posts, 2);
        assert!(tmp.path().join("index.html").exists());
        assert!(tmp.path().join("blog/index.html").exists());
        assert!(tmp.path().join("blog/new/index.html").exists());
        assert!(tmp.path().join("blog/old/index.html").exists());
    }

    #[test]
    fn generate_dumps_side_data_json() {
        let tmp = TempDir::new().unwrap();
        let (data, routes, site) = sample();
        generate(&data, &routes, &site, tmp.path()).unwrap();

        let json = fs::read_to_string(tmp.path().join(SIDE_DATA_FILENAME)).unwrap();
        let back: SideData = serde_json::from_str(&json).unwrap();
        assert_eq!(back, data);
        assert!(json.contains("\"dateForSidebar\""));
        assert!(json.contains("\"pageId\""));
    }

    #[test]
    fn generate_rejects_unsafe_slugs() {
        let tmp = TempDir::new().unwrap();
        let site = SiteConfig::default();
        let evil = post("Evil", "../../escape", "2024-01-01");
        let routes = RouteSet {
            routes: vec![route(&evil, &site)],
            skipped: vec![],
        };

        let summary = generate(&side(vec![evil]), &routes, &site, tmp.path()).unwrap();
        assert_eq!(summary.posts, 0);
        assert_eq!(summary.rejected_slugs, vec!["../../escape"]);
    }

    #[test]
    fn safe_slug_rules() {
        assert!(is_safe_slug("foo"));
        assert!(is_safe_slug("2024/foo"));
        assert!(!is_safe_slug(""));
        assert!(!is_safe_slug("/etc"));
        assert!(!is_safe_slug("a/../b"));
    }
}
