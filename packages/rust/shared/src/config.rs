//! Application configuration for DocHarvest.
//!
//! User config lives at `~/.docharvest/docharvest.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{HarvestError, Result};
use crate::types::OutputFormat;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "docharvest.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".docharvest";

// ---------------------------------------------------------------------------
// Config structs (matching docharvest.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Asset download toggles.
    #[serde(default)]
    pub assets: AssetsConfig,

    /// Output format selection.
    #[serde(default)]
    pub outputs: OutputsConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Root directory for crawl output directories.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Default maximum crawl depth.
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,

    /// Minimum ms between requests.
    #[serde(default = "default_rate_limit")]
    pub rate_limit_ms: u64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            max_depth: default_max_depth(),
            rate_limit_ms: default_rate_limit(),
        }
    }
}

fn default_output_dir() -> String {
    "downloads".into()
}
fn default_max_depth() -> u32 {
    3
}
fn default_rate_limit() -> u64 {
    1000
}

/// `[assets]` section — per-type asset download toggles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetsConfig {
    #[serde(default = "default_true")]
    pub images: bool,
    #[serde(default = "default_true")]
    pub stylesheets: bool,
    #[serde(default = "default_true")]
    pub scripts: bool,
    #[serde(default = "default_true")]
    pub fonts: bool,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            images: true,
            stylesheets: true,
            scripts: true,
            fonts: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// `[outputs]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputsConfig {
    /// Per-page formats to emit.
    #[serde(default = "default_formats")]
    pub formats: Vec<String>,

    /// Whether to emit per-page metadata records and site-level artifacts.
    #[serde(default = "default_true")]
    pub generate_metadata: bool,

    /// Target tokens per retrieval chunk.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Fractional overlap between adjacent chunks.
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: f32,
}

impl Default for OutputsConfig {
    fn default() -> Self {
        Self {
            formats: default_formats(),
            generate_metadata: true,
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

fn default_formats() -> Vec<String> {
    vec![
        "html".into(),
        "markdown".into(),
        "json".into(),
        "chunks".into(),
    ]
}
fn default_chunk_size() -> usize {
    400
}
fn default_chunk_overlap() -> f32 {
    0.15
}

// ---------------------------------------------------------------------------
// Crawl config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime crawl configuration — merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Maximum crawl depth from the root URL.
    pub max_depth: u32,
    /// Flat delay in ms between frontier iterations.
    pub rate_limit_ms: u64,
    /// Identifying User-Agent header value.
    pub user_agent: String,
    /// Download images.
    pub include_images: bool,
    /// Download stylesheets.
    pub include_css: bool,
    /// Download scripts.
    pub include_js: bool,
    /// Download fonts.
    pub include_fonts: bool,
    /// Per-page output formats.
    pub output_formats: Vec<OutputFormat>,
    /// Emit metadata records and site-level artifacts.
    pub generate_metadata: bool,
    /// Target tokens per chunk.
    pub chunk_size: usize,
    /// Fractional chunk overlap.
    pub chunk_overlap: f32,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for CrawlConfig {
    fn from(config: &AppConfig) -> Self {
        let output_formats = config
            .outputs
            .formats
            .iter()
            .filter_map(|s| s.parse::<OutputFormat>().ok())
            .collect();

        Self {
            max_depth: config.defaults.max_depth,
            rate_limit_ms: config.defaults.rate_limit_ms,
            user_agent: concat!("DocHarvest/", env!("CARGO_PKG_VERSION")).to_string(),
            include_images: config.assets.images,
            include_css: config.assets.stylesheets,
            include_js: config.assets.scripts,
            include_fonts: config.assets.fonts,
            output_formats,
            generate_metadata: config.outputs.generate_metadata,
            chunk_size: config.outputs.chunk_size,
            chunk_overlap: config.outputs.chunk_overlap,
        }
    }
}

impl CrawlConfig {
    /// Whether a given per-page output format is enabled.
    pub fn emits(&self, format: OutputFormat) -> bool {
        self.output_formats.contains(&format)
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.docharvest/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| HarvestError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.docharvest/docharvest.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| HarvestError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| HarvestError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| HarvestError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| HarvestError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| HarvestError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("output_dir"));
        assert!(toml_str.contains("chunk_size"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.defaults.max_depth, 3);
        assert_eq!(parsed.defaults.rate_limit_ms, 1000);
        assert_eq!(parsed.outputs.chunk_size, 400);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[defaults]
max_depth = 5

[assets]
images = false
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.defaults.max_depth, 5);
        assert!(!config.assets.images);
        assert!(config.assets.fonts);
        assert!((config.outputs.chunk_overlap - 0.15).abs() < f32::EPSILON);
    }

    #[test]
    fn crawl_config_from_app_config() {
        let app = AppConfig::default();
        let crawl = CrawlConfig::from(&app);
        assert_eq!(crawl.max_depth, 3);
        assert_eq!(crawl.rate_limit_ms, 1000);
        assert!(crawl.user_agent.starts_with("DocHarvest/"));
        assert!(crawl.emits(OutputFormat::Chunks));
    }

    #[test]
    fn unknown_output_formats_are_skipped() {
        let mut app = AppConfig::default();
        app.outputs.formats = vec!["markdown".into(), "bogus".into()];
        let crawl = CrawlConfig::from(&app);
        assert_eq!(crawl.output_formats, vec![OutputFormat::Markdown]);
    }
}
