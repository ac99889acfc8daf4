//! One route per post: fetched, rendered and described for sharing.
//!
//! [`build_routes`] drives the renderer over every post of the build's
//! [`SideData`](crate::types::SideData). Posts are independent, so they run in
//! parallel on the rayon pool; output order still follows the post list.
//!
//! A post whose content cannot be fetched or rendered is logged and left out.
//! The remaining posts are unaffected, and the failures are reported back in
//! [`RouteSet::skipped`] so the CLI can summarize them.

use crate::config::SiteConfig;
use crate::render::Renderer;
use crate::source::{DocumentSource, SourceError};
use crate::side::BuildContext;
use crate::types::Post;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{error, info};

/// One `<meta>` element of a page head.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum MetaTag {
    /// `<meta property=… content=…>` (Open Graph, article).
    Property { property: String, content: String },
    /// `<meta name=… content=…>` (Twitter card).
    Name { name: String, content: String },
}

impl MetaTag {
    fn property(property: &str, content: impl Into<String>) -> Self {
        MetaTag::Property {
            property: property.to_string(),
            content: content.into(),
        }
    }

    fn name(name: &str, content: impl Into<String>) -> Self {
        MetaTag::Name {
            name: name.to_string(),
            content: content.into(),
        }
    }

    /// `(attribute, key, content)` for templating.
    pub fn parts(&self) -> (&'static str, &str, &str) {
        match self {
            MetaTag::Property { property, content } => ("property", property, content),
            MetaTag::Name { name, content } => ("name", name, content),
        }
    }
}

/// A rendered post page.
#[derive(Debug, Clone, Serialize)]
pub struct Route {
    /// The post slug.
    pub path: String,
    pub title: String,
    pub date: String,
    pub html_content: String,
    pub head: Vec<MetaTag>,
}

/// A post that produced no route.
#[derive(Debug, Clone)]
pub struct SkippedPost {
    pub slug: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct RouteSet {
    /// In post order.
    pub routes: Vec<Route>,
    pub skipped: Vec<SkippedPost>,
}

/// Fetch and render every post of the build.
///
/// Fails only when the post list itself cannot be built.
pub fn build_routes<S: DocumentSource>(
    ctx: &BuildContext<S>,
    renderer: &dyn Renderer,
    site: &SiteConfig,
) -> Result<RouteSet, SourceError> {
    let side = ctx.side_data()?;
    info!(posts = side.posts.len(), "rendering posts");

    let results: Vec<Result<Route, SkippedPost>> = side
        .posts
        .par_iter()
        .map(|post| build_route(ctx, renderer, site, post))
        .collect();

    let mut set = RouteSet::default();
    for result in results {
        match result {
            Ok(route) => set.routes.push(route),
            Err(skipped) => set.skipped.push(skipped),
        }
    }
    Ok(set)
}

fn build_route<S: DocumentSource>(
    ctx: &BuildContext<S>,
    renderer: &dyn Renderer,
    site: &SiteConfig,
    post: &Post,
) -> Result<Route, SkippedPost> {
    let skip = |reason: String| {
        error!(page_id = %post.page_id, slug = %post.slug, %reason, "skipping post");
        SkippedPost {
            slug: post.slug.clone(),
            reason,
        }
    };

    let tree = ctx
        .documents()
        .fetch_page(&post.page_id)
        .map_err(|e| skip(format!("fetch failed: {e}")))?;
    let html_content = renderer
        .render(&post.page_id, &tree)
        .map_err(|e| skip(format!("render failed: {e}")))?;

    Ok(Route {
        path: post.slug.clone(),
        title: post.title.clone(),
        date: post.date.clone(),
        html_content,
        head: head_tags(post, site),
    })
}

/// Open Graph, Twitter card and article metadata for a post page.
pub fn head_tags(post: &Post, site: &SiteConfig) -> Vec<MetaTag> {
    let description = if post.description.is_empty() {
        format!("Blog post by {}", site.author)
    } else {
        post.description.clone()
    };
    let url = site.absolute_url(&post.url);
    let image = site.og_image.as_deref().map(|img| site.absolute_url(img));

    let mut head = vec![
        MetaTag::property("og:title", &post.title),
        MetaTag::property("og:description", &description),
        MetaTag::property("og:type", "article"),
        MetaTag::property("og:url", url),
    ];
    if let Some(image) = &image {
        head.push(MetaTag::property("og:image", image));
    }
    head.push(MetaTag::name("twitter:card", "summary_large_image"));
    head.push(MetaTag::name("twitter:title", &post.title));
    head.push(MetaTag::name("twitter:description", &description));
    if let Some(image) = &image {
        head.push(MetaTag::name("twitter:image", image));
    }
    if let Some(handle) = &site.twitter {
        head.push(MetaTag::name("twitter:site", handle));
        head.push(MetaTag::name("twitter:creator", handle));
    }
    head.push(MetaTag::property("article:published_time", &post.date));
    if !site.author.is_empty() {
        head.push(MetaTag::property("article:author", &site.author));
    }
    head
}
