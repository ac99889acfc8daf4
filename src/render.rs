//! Content tree → HTML fragment.
//!
//! [`Renderer`] is the seam the route builder renders through; [`HtmlRenderer`]
//! is the production implementation. It walks the page block's `content` list
//! depth first and emits one element per block with maud, so every piece of
//! user text is escaped.
//!
//! ## Supported blocks
//!
//! | Block | HTML |
//! |-------|------|
//! | `text` | `p` |
//! | `header`, `sub_header`, `sub_sub_header` | `h2`, `h3`, `h4` (the page title is the `h1`) |
//! | `bulleted_list`, `numbered_list` | consecutive items grouped into one `ul` / `ol` |
//! | `to_do` | disabled checkbox + text |
//! | `toggle` | `details` / `summary` |
//! | `quote`, `callout`, `divider` | `blockquote`, `aside`, `hr` |
//! | `code` | `pre > code.language-{lang}` |
//! | `image` | `figure > img` (Notion-hosted files go through the image proxy) |
//! | `bookmark`, `equation` | link, `code.notion-equation` |
//! | `page` | link to the child page |
//!
//! Database views (`collection_view*`), embeds such as `tweet`, and block types
//! not listed render nothing. Children referenced by id but absent from the
//! tree are skipped.
//!
//! Nesting deeper than [`MAX_DEPTH`] fails with [`RenderError::TooDeep`]; a
//! content tree that references itself ends up there too.

use crate::record_map::{Block, RecordMap, TextFormat, TextRun};
use maud::{Markup, html};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use tracing::debug;

/// Deepest nesting of child blocks rendered.
pub const MAX_DEPTH: usize = 32;

const NOTION_URL: &str = "https://www.notion.so";

/// Characters `encodeURIComponent` leaves alone.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("page block not found in content tree: {0}")]
    PageNotFound(String),
    #[error("content of {0} is nested more than {MAX_DEPTH} levels deep")]
    TooDeep(String),
}

/// Renders the content of one page to an HTML fragment.
pub trait Renderer: Send + Sync {
    fn render(&self, page_id: &str, tree: &RecordMap) -> Result<String, RenderError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlRenderer;

impl Renderer for HtmlRenderer {
    fn render(&self, page_id: &str, tree: &RecordMap) -> Result<String, RenderError> {
        let page = tree
            .block(page_id)
            .ok_or_else(|| RenderError::PageNotFound(page_id.to_string()))?;
        let walk = Walk { tree, page_id };
        let body = walk.children(&page.content, 0)?;
        Ok(html! { div.notion-page { (body) } }.into_string())
    }
}

struct Walk<'a> {
    tree: &'a RecordMap,
    page_id: &'a str,
}

impl Walk<'_> {
    fn children(&self, ids: &[String], depth: usize) -> Result<Markup, RenderError> {
        if ids.is_empty() {
            return Ok(html! {});
        }
        if depth >= MAX_DEPTH {
            return Err(RenderError::TooDeep(self.page_id.to_string()));
        }

        let blocks: Vec<&Block> = ids.iter().filter_map(|id| self.tree.block(id)).collect();
        let mut parts = Vec::with_capacity(blocks.len());
        for group in blocks.chunk_by(|a, b| a.kind == b.kind && is_list_item(a)) {
            match group[0].kind.as_str() {
                "bulleted_list" => {
                    let items = self.list_items(group, depth)?;
                    parts.push(html! { ul { @for item in &items { (item) } } });
                }
                "numbered_list" => {
                    let items = self.list_items(group, depth)?;
                    parts.push(html! { ol { @for item in &items { (item) } } });
                }
                _ => {
                    for block in group {
                        parts.push(self.block(block, depth)?);
                    }
                }
            }
        }

        Ok(html! { @for part in &parts { (part) } })
    }

    fn list_items(&self, items: &[&Block], depth: usize) -> Result<Vec<Markup>, RenderError> {
        items
            .iter()
            .map(|item| {
                let nested = self.children(&item.content, depth + 1)?;
                Ok(html! { li { (self.title(item)) (nested) } })
            })
            .collect()
    }

    fn block(&self, block: &Block, depth: usize) -> Result<Markup, RenderError> {
        let nested = || self.children(&block.content, depth + 1);

        let markup = match block.kind.as_str() {
            "text" => {
                let nested = nested()?;
                html! {
                    p { (self.title(block)) }
                    @if !block.content.is_empty() {
                        div.notion-indent { (nested) }
                    }
                }
            }
            "header" => html! { h2 { (self.title(block)) } },
            "sub_header" => html! { h3 { (self.title(block)) } },
            "sub_sub_header" => html! { h4 { (self.title(block)) } },
            "to_do" => {
                let checked = block.text("checked").as_deref() == Some("Yes");
                let nested = nested()?;
                html! {
                    div.notion-to-do {
                        label {
                            input type="checkbox" disabled checked[checked];
                            " "
                            span { (self.title(block)) }
                        }
                        (nested)
                    }
                }
            }
            "toggle" => {
                let nested = nested()?;
                html! {
                    details.notion-toggle {
                        summary { (self.title(block)) }
                        (nested)
                    }
                }
            }
            "quote" => html! { blockquote { (self.title(block)) } },
            "callout" => {
                let nested = nested()?;
                html! {
                    aside.notion-callout {
                        @if let Some(icon) = block.format_str("page_icon") {
                            span.notion-callout-icon { (icon) }
                        }
                        div { (self.title(block)) (nested) }
                    }
                }
            }
            "divider" => html! { hr; },
            "code" => {
                let language = block
                    .text("language")
                    .map(|l| l.trim().to_lowercase().replace(' ', "-"))
                    .filter(|l| !l.is_empty())
                    .unwrap_or_else(|| "plain".to_string());
                let source = block.text("title").unwrap_or_default();
                html! {
                    pre.notion-code {
                        code class={ "language-" (language) } { (source) }
                    }
                }
            }
            "image" => match image_source(block) {
                Some(src) => {
                    let caption = block.runs("caption");
                    let alt = caption.iter().map(|r| r.text.as_str()).collect::<String>();
                    html! {
                        figure.notion-image {
                            img src=(image_url(&src, &block.id)) alt=(alt) loading="lazy";
                            @if !caption.is_empty() {
                                figcaption { (self.rich_text(&caption)) }
                            }
                        }
                    }
                }
                None => html! {},
            },
            "bookmark" => match block.text("link") {
                Some(link) => {
                    let label = block
                        .text("title")
                        .filter(|t| !t.is_empty())
                        .unwrap_or_else(|| link.clone());
                    html! {
                        p.notion-bookmark {
                            a href=(link) rel="noopener" { (label) }
                        }
                    }
                }
                None => html! {},
            },
            "equation" => html! {
                div.notion-equation {
                    code { (block.text("title").unwrap_or_default()) }
                }
            },
            "page" => {
                let title = block
                    .text("title")
                    .filter(|t| !t.is_empty())
                    .unwrap_or_else(|| "Untitled".to_string());
                html! {
                    p.notion-page-link {
                        a href=(page_url(&block.id)) { (title) }
                    }
                }
            }
            "collection_view" | "collection_view_page" | "tweet" => html! {},
            other => {
                debug!(block_id = %block.id, kind = other, "skipping unsupported block");
                html! {}
            }
        };
        Ok(markup)
    }

    fn title(&self, block: &Block) -> Markup {
        self.rich_text(&block.runs("title"))
    }

    fn rich_text(&self, runs: &[TextRun]) -> Markup {
        html! { @for run in runs { (self.run(run)) } }
    }

    fn run(&self, run: &TextRun) -> Markup {
        for format in &run.formats {
            match format {
                TextFormat::Date(date) => {
                    return html! { time datetime=(date.start_date) { (date.display()) } };
                }
                TextFormat::Page(id) => {
                    let title = self
                        .tree
                        .block(id)
                        .and_then(|b| b.text("title"))
                        .filter(|t| !t.is_empty())
                        .unwrap_or_else(|| "Untitled".to_string());
                    return html! { a.notion-page-mention href=(page_url(id)) { (title) } };
                }
                TextFormat::Equation(source) => {
                    return html! { code.notion-equation { (source) } };
                }
                _ => {}
            }
        }

        run.formats
            .iter()
            .fold(html! { (run.text) }, |inner, format| match format {
                TextFormat::Bold => html! { strong { (inner) } },
                TextFormat::Italic => html! { em { (inner) } },
                TextFormat::Strike => html! { s { (inner) } },
                TextFormat::Underline => html! { u { (inner) } },
                TextFormat::Code => html! { code { (inner) } },
                TextFormat::Link(href) => html! { a href=(href) { (inner) } },
                TextFormat::Color(color) => {
                    html! { span class={ "notion-" (color.replace('_', "-")) } { (inner) } }
                }
                _ => inner,
            })
    }
}

fn is_list_item(block: &Block) -> bool {
    matches!(block.kind.as_str(), "bulleted_list" | "numbered_list")
}

fn image_source(block: &Block) -> Option<String> {
    block
        .format_str("display_source")
        .map(String::from)
        .or_else(|| block.text("source"))
        .filter(|s| !s.is_empty())
}

/// Public URL of an image block's source.
///
/// Files uploaded to Notion are only reachable through its image proxy,
/// which needs the owning block id.
pub fn image_url(source: &str, block_id: &str) -> String {
    let hosted = source.starts_with("attachment:")
        || source.contains("secure.notion-static.com")
        || source.contains("prod-files-secure");
    if hosted {
        format!(
            "{NOTION_URL}/image/{}?table=block&id={}",
            utf8_percent_encode(source, URI_COMPONENT),
            block_id
        )
    } else {
        source.to_string()
    }
}

fn page_url(page_id: &str) -> String {
    format!("{NOTION_URL}/{}", page_id.replace('-', ""))
}
