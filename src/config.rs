//! Blog configuration.
//!
//! Handles loading, validating, and merging `blog.toml`. Configuration is
//! layered, lowest priority first:
//!
//! 1. stock defaults ([`BlogConfig::default`]),
//! 2. the user's `blog.toml` (sparse, override only what you need),
//! 3. environment variables (`NOTION_PAGE_ID`, `NOTION_TOKEN`, `CACHE`),
//! 4. command-line flags (`--cache`).
//!
//! ## Configuration Options
//!
//! ```toml
//! [notion]
//! page_id = "https://www.notion.so/me/Blog-1f0c…"  # or a bare page id
//! # token = "…"                                    # token_v2 cookie for private pages
//!
//! [site]
//! title = "My Blog"
//! description = ""
//! base_url = "https://blog.example.com"  # used for absolute og:url / og:image
//! author = ""
//! # twitter = "@me"
//! # og_image = "/og.png"
//! # footer = "© 2024 Me"
//! home_posts = 5                          # latest posts listed on the home page
//! nav = [{ text = "Home", link = "/" }, { text = "Blog", link = "/blog/" }]
//! social = [{ icon = "github", link = "https://github.com/me" }]
//!
//! [cache]
//! enabled = false      # same as CACHE=1 or --cache
//! dir = ".cache"
//!
//! [processing]
//! max_processes = 4    # max parallel page fetches (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.
//!
//! The root page id is the only value without a usable default. Commands that
//! talk to Notion call [`BlogConfig::root_page_id`], which fails with
//! [`ConfigError::MissingPageId`] before any network traffic happens.

use crate::source::parse_page_id;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILENAME: &str = "blog.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
    #[error("no Notion page id configured: set [notion] page_id or NOTION_PAGE_ID")]
    MissingPageId,
}

/// Blog configuration loaded from `blog.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BlogConfig {
    /// Where the posts come from.
    pub notion: NotionConfig,
    /// Site identity, navigation and social metadata.
    pub site: SiteConfig,
    /// Disk cache of fetched content trees.
    pub cache: CacheConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NotionConfig {
    /// Root container page: a page id or a Notion URL.
    pub page_id: Option<String>,
    /// `token_v2` cookie, for workspaces that are not public.
    pub token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    pub title: String,
    pub description: String,
    /// Absolute site URL without trailing slash. Empty means relative URLs.
    pub base_url: String,
    pub author: String,
    /// Twitter handle for `twitter:site` / `twitter:creator`.
    pub twitter: Option<String>,
    /// Default share image, absolute or site-relative.
    pub og_image: Option<String>,
    pub footer: Option<String>,
    /// Number of latest posts on the home page.
    pub home_posts: usize,
    pub nav: Vec<NavLink>,
    pub social: Vec<SocialLink>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "My Blog".to_string(),
            description: String::new(),
            base_url: String::new(),
            author: String::new(),
            twitter: None,
            og_image: None,
            footer: None,
            home_posts: 5,
            nav: vec![
                NavLink {
                    text: "Home".to_string(),
                    link: "/".to_string(),
                },
                NavLink {
                    text: "Blog".to_string(),
                    link: "/blog/".to_string(),
                },
            ],
            social: Vec::new(),
        }
    }
}

impl SiteConfig {
    /// Absolute URL of a site path. With no `base_url`, the path itself.
    pub fn absolute_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NavLink {
    pub text: String,
    pub link: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SocialLink {
    /// Label shown for the link, e.g. `github`.
    pub icon: String,
    pub link: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    pub enabled: bool,
    pub dir: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            dir: PathBuf::from(".cache"),
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel page workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

impl BlogConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.site.title.trim().is_empty() {
            return Err(ConfigError::Validation(
                "site.title must not be empty".into(),
            ));
        }
        let base_url = &self.site.base_url;
        if !base_url.is_empty()
            && !(base_url.starts_with("http://") || base_url.starts_with("https://"))
        {
            return Err(ConfigError::Validation(
                "site.base_url must start with http:// or https://".into(),
            ));
        }
        if self.site.home_posts == 0 {
            return Err(ConfigError::Validation(
                "site.home_posts must be at least 1".into(),
            ));
        }
        if self.site.nav.iter().any(|n| n.link.trim().is_empty()) {
            return Err(ConfigError::Validation(
                "site.nav links must not be empty".into(),
            ));
        }
        if self.cache.dir.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "cache.dir must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Apply environment overrides. `lookup` is `std::env::var` in production.
    ///
    /// - `NOTION_PAGE_ID` replaces `notion.page_id`
    /// - `NOTION_TOKEN` replaces `notion.token`
    /// - `CACHE=1` (or `true`) enables the disk cache
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(page_id) = non_empty("NOTION_PAGE_ID") {
            self.notion.page_id = Some(page_id);
        }
        if let Some(token) = non_empty("NOTION_TOKEN") {
            self.notion.token = Some(token);
        }
        if let Some(cache) = non_empty("CACHE") {
            self.cache.enabled = matches!(cache.trim(), "1" | "true");
        }
    }

    /// The root container id in dashed form.
    pub fn root_page_id(&self) -> Result<String, ConfigError> {
        let raw = self
            .notion
            .page_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::MissingPageId)?;
        parse_page_id(raw).ok_or_else(|| {
            ConfigError::Validation(format!(
                "notion.page_id is not a Notion page id or URL: {raw}"
            ))
        })
    }
}

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(BlogConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<BlogConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: BlogConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from a `blog.toml` path.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result. A missing file yields the defaults.
pub fn load_config(path: &Path) -> Result<BlogConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(path)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `blog.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# notion-blog configuration
# ========================
# All options are optional except the Notion page id, which can also come
# from the NOTION_PAGE_ID environment variable. Unknown keys are rejected.

[notion]
# Root container page: the Notion page holding the posts database.
# Accepts a bare id or the page URL.
# page_id = "https://www.notion.so/me/Blog-1f0c2a3b4c5d6e7f8091a2b3c4d5e6f7"

# token_v2 cookie, only needed for pages that are not public.
# Prefer the NOTION_TOKEN environment variable.
# token = ""

[site]
title = "My Blog"
description = ""

# Absolute site URL, used for og:url and og:image. Leave empty for
# relative URLs.
base_url = ""
author = ""

# Twitter handle for twitter:site and twitter:creator.
# twitter = "@me"

# Default share image, absolute or relative to base_url.
# og_image = "/og.png"

# footer = "Built from Notion"

# Number of latest posts listed on the home page.
home_posts = 5

nav = [
  { text = "Home", link = "/" },
  { text = "Blog", link = "/blog/" },
]
social = []

[cache]
# Cache fetched pages on disk between builds. Same as CACHE=1 or --cache.
enabled = false
dir = ".cache"

[processing]
# Maximum parallel page fetches. Omit for auto (= number of CPU cores).
# Values above the core count are clamped down.
# max_processes = 4
"##
}
