//! Pipeline context for sharing state across stages.

use std::collections::BTreeMap;
use std::path::Path;

use crate::build::format::{FormatContext, FormatRegistry};
use crate::build::highlight::SyntaxHighlighter;
use crate::build::nav::{NavLink, mark_current};
use crate::build::render::{PageInfo, Renderer, SiteContext};
use crate::build::shortcodes::{ShortcodeContext, ShortcodeRegistry};
use crate::config::{BuildContext, MarkdownConfig};

/// Shared context for pipeline stages.
///
/// Collections and navigation are complete before any stage runs.
pub struct PipelineContext<'a> {
    // === Output configuration ===
    /// Directory where output files are written
    pub output_dir: &'a Path,

    // === Site-level data ===
    pub site: &'a SiteContext,

    /// Global data passed to templates as `data.*`
    pub data: &'a serde_json::Value,

    pub markdown_config: &'a MarkdownConfig,

    /// Every collection, ascending by navigation order
    pub collections: &'a BTreeMap<String, Vec<PageInfo>>,

    /// Navigation tree, unmarked
    pub navigation: &'a [NavLink],

    /// Layout for documents that do not set one
    pub default_layout: &'a str,

    // === Services ===
    pub highlighter: &'a SyntaxHighlighter,

    /// Template renderer (needs mutable access for render_content)
    pub renderer: &'a mut Renderer,

    /// Content format registry for rendering different file types
    pub format_registry: &'a FormatRegistry,

    pub shortcodes: &'a ShortcodeRegistry,

    /// Directory holding SVG icons for the `icon` shortcode
    pub icons_dir: &'a Path,

    // === Mode flags ===
    /// Path prefix, production flag, dev/live reload
    pub build: &'a BuildContext,
}

impl<'a> PipelineContext<'a> {
    pub fn shortcode_context(&self) -> ShortcodeContext<'a> {
        ShortcodeContext {
            icons_dir: self.icons_dir,
            highlighter: self.highlighter,
            markdown_config: self.markdown_config,
        }
    }

    pub fn format_context(&self) -> FormatContext<'a> {
        FormatContext {
            highlighter: self.highlighter,
            markdown_config: self.markdown_config,
        }
    }

    /// Navigation with the page at `url` marked current.
    pub fn navigation_for(&self, url: &str) -> Vec<NavLink> {
        mark_current(self.navigation, url)
    }
}
