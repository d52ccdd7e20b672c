//! Configuration type definitions.
//!
//! This module contains all the data structures used in `lectern.yaml`.
//! These types are pure data - no I/O or complex logic. Every field has a
//! default so a site without a config file still builds.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// =============================================================================
// Root config
// =============================================================================

/// Site configuration loaded from `lectern.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub site: SiteConfig,
    /// Named, ordered document collections (e.g. `posts`)
    pub collections: Vec<CollectionConfig>,
    /// Paths (relative to the input directory) copied verbatim to the output
    pub passthrough: Vec<PathBuf>,
    pub markdown: MarkdownConfig,
    pub highlight: HighlightConfig,
    pub templates: TemplatesConfig,
    pub search: SearchConfig,
    /// Development-specific settings (watch mode, live reload)
    pub dev: DevConfig,
    /// Arbitrary global data passed to templates as `data.*`
    pub data: serde_json::Value,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            site: SiteConfig::default(),
            collections: default_collections(),
            passthrough: default_passthrough(),
            markdown: MarkdownConfig::default(),
            highlight: HighlightConfig::default(),
            templates: TemplatesConfig::default(),
            search: SearchConfig::default(),
            dev: DevConfig::default(),
            data: serde_json::Value::Object(serde_json::Map::new()),
        }
    }
}

fn default_passthrough() -> Vec<PathBuf> {
    ["img", "css", "js", "font", "robots.txt"]
        .into_iter()
        .map(PathBuf::from)
        .collect()
}

// =============================================================================
// Site configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub name: String,
    /// Absolute site URL, used by templates for canonical links
    pub url: Option<String>,
    /// Content directory
    pub input: PathBuf,
    /// Build directory
    pub output: PathBuf,
    /// SVG icons for the `icon` shortcode, relative to the input directory
    pub icons: PathBuf,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: "My Site".to_string(),
            url: None,
            input: PathBuf::from("src"),
            output: PathBuf::from("_site"),
            icons: PathBuf::from("_includes/icons"),
        }
    }
}

// =============================================================================
// Collections
// =============================================================================

/// A named collection: every document whose input-relative path matches
/// `glob`, ordered by `navigation.order`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionConfig {
    pub name: String,
    pub glob: String,
}

impl CollectionConfig {
    pub fn new(name: &str, glob: &str) -> Self {
        Self {
            name: name.to_string(),
            glob: glob.to_string(),
        }
    }
}

/// The collection used when the config does not declare any: posts grouped
/// by topic as `posts/<topic>/posts/*.md`.
pub fn default_collections() -> Vec<CollectionConfig> {
    vec![CollectionConfig::new("posts", "posts/**/posts/*.md")]
}

// =============================================================================
// Markdown configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkdownConfig {
    /// Extensions to enable for markdown processing
    #[serde(default = "default_markdown_extensions")]
    pub extensions: Vec<String>,
    /// Text of the permalink anchor appended to every heading
    #[serde(default = "default_anchor_symbol")]
    pub anchor_symbol: String,
    /// CSS class of the permalink anchor
    #[serde(default = "default_anchor_class")]
    pub anchor_class: String,
}

fn default_markdown_extensions() -> Vec<String> {
    vec![
        "footnotes".to_string(),
        "heading_attributes".to_string(),
        "strikethrough".to_string(),
        "tables".to_string(),
        "tasklists".to_string(),
    ]
}

fn default_anchor_symbol() -> String {
    "#".to_string()
}

fn default_anchor_class() -> String {
    "header-anchor".to_string()
}

impl Default for MarkdownConfig {
    fn default() -> Self {
        Self {
            extensions: default_markdown_extensions(),
            anchor_symbol: default_anchor_symbol(),
            anchor_class: default_anchor_class(),
        }
    }
}

// =============================================================================
// Highlighting and templates
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightConfig {
    /// autumnus theme used for the generated stylesheet
    pub theme: String,
    /// Output-relative path of the generated stylesheet (none if unset)
    pub stylesheet: Option<PathBuf>,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            theme: "dracula".to_string(),
            stylesheet: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplatesConfig {
    /// Directory (relative to the input directory) holding tera templates
    pub dir: PathBuf,
    /// Layout used when a document does not set `layout`
    pub default_layout: String,
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("_includes"),
            default_layout: "base.html".to_string(),
        }
    }
}

// =============================================================================
// Search configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub enabled: bool,
    /// Files (relative to the output directory) to index
    pub glob: String,
    /// Output-relative directory the index bundle is written to
    pub bundle_dir: String,
    /// Run an external indexer instead of the built-in one.
    /// Invoked as `<command...> --site <output> --glob <glob>`.
    pub command: Option<Vec<String>>,
    /// CSS selector for the root element to index. Pages without it are not
    /// indexed, which fails the build.
    pub root_selector: String,
    /// CSS selectors to exclude from indexing
    pub exclude_selectors: Vec<String>,
    /// Force a specific language for indexing (ISO 639-1 code)
    pub force_language: Option<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            glob: "**/*.html".to_string(),
            bundle_dir: "pagefind".to_string(),
            command: None,
            root_selector: "html".to_string(),
            exclude_selectors: Vec::new(),
            force_language: None,
        }
    }
}

// =============================================================================
// Development configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DevConfig {
    /// File watching configuration
    #[serde(default)]
    pub watch: WatchConfig,
    /// Enable live reload in the browser when files change (default: true)
    #[serde(default = "default_live_reload")]
    pub live_reload: bool,
}

impl Default for DevConfig {
    fn default() -> Self {
        Self {
            watch: WatchConfig::default(),
            live_reload: true,
        }
    }
}

fn default_live_reload() -> bool {
    true
}

/// Configuration for file watching during development.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Use polling-based watcher instead of native file system events.
    /// Useful for network filesystems, Docker volumes, or other situations
    /// where native events are unreliable.
    #[serde(default)]
    pub poll: bool,
    /// Poll interval in milliseconds (only used if poll=true).
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Debounce timeout in milliseconds.
    /// Changes within this window are batched together.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_debounce_ms() -> u64 {
    100
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            poll: false,
            poll_interval_ms: default_poll_interval_ms(),
            debounce_ms: default_debounce_ms(),
        }
    }
}
