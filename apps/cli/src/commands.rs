//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use url::Url;

use docharvest_chunk::Chunk;
use docharvest_crawler::Crawler;
use docharvest_index::{EmbeddingCapability, VectorIndex};
use docharvest_shared::{CrawlConfig, OutputFormat, init_config, load_config};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// DocHarvest — turn documentation sites into machine-consumable corpora.
#[derive(Parser)]
#[command(
    name = "docharvest",
    version,
    about = "Crawl documentation sites into clean, chunked, searchable corpora.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Crawl a documentation site into an output directory.
    Crawl {
        /// Start URL of the documentation site.
        url: String,

        /// Output root directory (defaults to the configured one).
        #[arg(short, long)]
        out: Option<String>,

        /// Maximum crawl depth from the start URL.
        #[arg(short, long)]
        depth: Option<u32>,

        /// Per-page formats to emit (comma-separated: html,markdown,json,chunks).
        #[arg(long)]
        formats: Option<String>,

        /// Flat delay between requests, in milliseconds.
        #[arg(long)]
        rate_limit_ms: Option<u64>,

        /// Skip image downloads.
        #[arg(long)]
        no_images: bool,

        /// Skip stylesheet downloads.
        #[arg(long)]
        no_css: bool,

        /// Skip script downloads.
        #[arg(long)]
        no_js: bool,

        /// Skip font downloads.
        #[arg(long)]
        no_fonts: bool,
    },

    /// Build a vector index from a crawl's chunk artifacts.
    Index {
        /// Crawl output directory containing `*.chunks.json` files.
        dir: String,

        /// Collection name for the persisted index pair.
        #[arg(short, long, default_value = "default")]
        collection: String,
    },

    /// Similarity-search a previously built vector index.
    Search {
        /// The search query.
        query: String,

        /// Directory holding the index pair.
        #[arg(short, long, default_value = ".")]
        dir: String,

        /// Collection name of the index pair.
        #[arg(short, long, default_value = "default")]
        collection: String,

        /// Number of results.
        #[arg(short = 'k', long, default_value_t = 5)]
        top_k: usize,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "docharvest=info",
        1 => "docharvest=debug",
        _ => "docharvest=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Crawl {
            url,
            out,
            depth,
            formats,
            rate_limit_ms,
            no_images,
            no_css,
            no_js,
            no_fonts,
        } => {
            cmd_crawl(
                &url,
                out.as_deref(),
                depth,
                formats.as_deref(),
                rate_limit_ms,
                no_images,
                no_css,
                no_js,
                no_fonts,
            )
            .await
        }
        Command::Index { dir, collection } => cmd_index(&dir, &collection),
        Command::Search {
            query,
            dir,
            collection,
            top_k,
        } => cmd_search(&query, &dir, &collection, top_k),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

// ---------------------------------------------------------------------------
// crawl
// ---------------------------------------------------------------------------

#[allow(clippy::too_many_arguments)]
async fn cmd_crawl(
    url: &str,
    out: Option<&str>,
    depth: Option<u32>,
    formats: Option<&str>,
    rate_limit_ms: Option<u64>,
    no_images: bool,
    no_css: bool,
    no_js: bool,
    no_fonts: bool,
) -> Result<()> {
    let app_config = load_config()?;
    let mut config = CrawlConfig::from(&app_config);

    if let Some(depth) = depth {
        config.max_depth = depth;
    }
    if let Some(rate) = rate_limit_ms {
        config.rate_limit_ms = rate;
    }
    if let Some(formats) = formats {
        config.output_formats = formats
            .split(',')
            .map(|s| s.parse::<OutputFormat>().map_err(|e| eyre!(e)))
            .collect::<Result<Vec<_>>>()?;
    }
    config.include_images = config.include_images && !no_images;
    config.include_css = config.include_css && !no_css;
    config.include_js = config.include_js && !no_js;
    config.include_fonts = config.include_fonts && !no_fonts;

    let start_url = Url::parse(url).map_err(|e| eyre!("invalid URL '{url}': {e}"))?;
    let output_root = out
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(&app_config.defaults.output_dir));

    info!(url, depth = config.max_depth, "starting crawl");

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .expect("valid template")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    spinner.enable_steady_tick(std::time::Duration::from_millis(80));
    spinner.set_message(format!("Crawling {url}"));

    let crawler = Crawler::new(config)?;
    let outcome = crawler.crawl(&start_url, &output_root).await?;
    spinner.finish_and_clear();

    println!();
    println!("  Crawl {}", if outcome.is_success() { "completed" } else { "failed" });
    println!("  Pages downloaded: {}", outcome.pages_downloaded);
    println!("  Pages found:      {}", outcome.pages_found);
    println!("  Files written:    {}", outcome.files.len());
    println!("  Errors:           {}", outcome.errors.len());
    println!("  Output:           {}", outcome.output_dir.display());
    println!("  Time:             {:.1}s", outcome.duration.as_secs_f64());
    println!();

    for error in outcome.errors.iter().take(10) {
        println!("  error: {error}");
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// index & search
// ---------------------------------------------------------------------------

fn cmd_index(dir: &str, collection: &str) -> Result<()> {
    let dir = PathBuf::from(dir);
    if !dir.is_dir() {
        return Err(eyre!("'{}' is not a directory", dir.display()));
    }

    let mut chunk_files = Vec::new();
    collect_chunk_files(&dir, &mut chunk_files)?;
    if chunk_files.is_empty() {
        return Err(eyre!("no *.chunks.json files under '{}'", dir.display()));
    }

    let mut texts = Vec::new();
    let mut metadatas = Vec::new();
    for file in &chunk_files {
        let chunks: Vec<Chunk> = serde_json::from_str(&std::fs::read_to_string(file)?)?;
        for chunk in chunks {
            let mut metadata = serde_json::to_value(&chunk.metadata)?;
            metadata["content"] = serde_json::Value::String(chunk.content.clone());
            metadata["chunk_id"] = serde_json::Value::String(chunk.id);
            texts.push(chunk.content);
            metadatas.push(metadata);
        }
    }

    info!(
        files = chunk_files.len(),
        chunks = texts.len(),
        collection,
        "indexing chunks"
    );

    let mut index = VectorIndex::open(&dir, collection, embedding_capability())?;
    index.add_texts(&texts, metadatas)?;

    println!("  Indexed {} chunks into collection '{collection}'", texts.len());
    println!("  Index rows: {}", index.len());
    Ok(())
}

fn cmd_search(query: &str, dir: &str, collection: &str, top_k: usize) -> Result<()> {
    let index = VectorIndex::open(Path::new(dir), collection, embedding_capability())?;
    let hits = index.search(query, top_k)?;

    if hits.is_empty() {
        println!("  No results — is the collection indexed yet?");
        return Ok(());
    }

    for (i, hit) in hits.iter().enumerate() {
        let preview: String = hit.content.chars().take(120).collect();
        println!("  {}. [{:.4}] {preview}", i + 1, hit.score);
        if let Some(url) = hit.metadata.get("url").and_then(|v| v.as_str()) {
            println!("     {url}");
        }
    }
    Ok(())
}

/// Recursively collect `*.chunks.json` files.
fn collect_chunk_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_chunk_files(&path, out)?;
        } else if path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(".chunks.json"))
        {
            out.push(path);
        }
    }
    Ok(())
}

/// The embedding capability this build ships with.
fn embedding_capability() -> EmbeddingCapability {
    #[cfg(feature = "fastembed")]
    {
        docharvest_index::FastEmbedder::capability()
    }
    #[cfg(not(feature = "fastembed"))]
    {
        EmbeddingCapability::unavailable(
            "this build has no embedding model; rebuild with --features fastembed",
        )
    }
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("  Wrote default config to {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config = load_config()?;
    println!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}
