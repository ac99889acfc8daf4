use clap::{Parser, Subcommand};
use notion_blog::config::{self, BlogConfig};
use notion_blog::render::HtmlRenderer;
use notion_blog::routes::build_routes;
use notion_blog::side::BuildContext;
use notion_blog::source::{Documents, NotionClient};
use notion_blog::{generate, output};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "notion-blog")]
#[command(about = "Static blog generator backed by a Notion database")]
#[command(long_about = "\
Static blog generator backed by a Notion database

A Notion page holding a collection view is the data source. Every row of the
collection is a post; its properties decide whether and where it is published.

Expected collection properties (names are case-insensitive):

  title    Post title
  path     URL slug, the post is served under /blog/<path>/
  date     Publication date (date property or Unix timestamp)
  status   \"published\" or \"draft\" (absent = published)

Rows missing a title, path or date are left out of the build.

Settings come from blog.toml (optional). NOTION_PAGE_ID, NOTION_TOKEN and
CACHE=1 in the environment override the file.

Run 'notion-blog gen-config' to generate a documented blog.toml.")]
#[command(version)]
struct Cli {
    /// Config file
    #[arg(long, default_value = config::CONFIG_FILENAME, global = true)]
    config: PathBuf,

    /// Output directory
    #[arg(long, default_value = "dist", global = true)]
    output: PathBuf,

    /// Read and write the on-disk Notion cache
    #[arg(long, global = true)]
    cache: bool,

    /// Log progress to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch every post and write the HTML site
    Build,
    /// List the posts that would be published
    Posts {
        /// Print the post list and sidebar as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete the cached Notion responses
    ClearCache,
    /// Print a stock blog.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Build => {
            let blog = load_blog_config(&cli)?;
            init_thread_pool(&blog.processing);
            let ctx = build_context(&blog)?;

            let side = ctx.side_data()?;
            let routes = build_routes(&ctx, &HtmlRenderer, &blog.site)?;
            let summary = generate::generate(&side, &routes, &blog.site, &cli.output)?;

            let stats = ctx.documents().cache_stats();
            output::print_build_output(&routes, &summary, blog.cache.enabled.then_some(&stats));
            println!("==> Build complete: {}", cli.output.display());
        }
        Command::Posts { json } => {
            let blog = load_blog_config(&cli)?;
            let ctx = build_context(&blog)?;
            let side = ctx.side_data()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&*side)?);
            } else {
                output::print_posts_output(&side);
            }
        }
        Command::ClearCache => {
            let blog = load_blog_config(&cli)?;
            let removed = clear_cache(&blog.cache.dir);
            println!(
                "Removed {removed} cache entries from {}",
                blog.cache.dir.display()
            );
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// File config, then environment, then CLI flags.
fn load_blog_config(cli: &Cli) -> Result<BlogConfig, config::ConfigError> {
    let mut blog = config::load_config(&cli.config)?;
    blog.apply_env_overrides(|key| std::env::var(key).ok());
    if cli.cache {
        blog.cache.enabled = true;
    }
    blog.validate()?;
    Ok(blog)
}

/// `-v` logs at info; otherwise `RUST_LOG` decides, defaulting to warnings.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Capped at the number of available CPU cores.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}

fn build_context(blog: &BlogConfig) -> Result<BuildContext<NotionClient>, config::ConfigError> {
    let root_id = blog.root_page_id()?;
    let client = NotionClient::new(blog.notion.token.clone());
    let documents = Documents::new(client, &blog.cache.dir, blog.cache.enabled);
    Ok(BuildContext::new(documents, root_id))
}

fn clear_cache(dir: &Path) -> usize {
    Documents::new(NotionClient::new(None), dir, true).clear_cache()
}
