//! Pluggable content format system.
//!
//! Discovery asks the registry which files are documents, and the markdown
//! stage asks it how to render them. Markdown is the only built-in format.

use std::path::Path;

use crate::build::highlight::SyntaxHighlighter;
use crate::build::markdown::{MarkdownError, render_markdown};
use crate::build::render::TocEntry;
use crate::config::MarkdownConfig;

/// Output from rendering a content format.
#[derive(Debug, Clone)]
pub struct FormatOutput {
    /// The rendered HTML content.
    pub html: String,
    /// Table of contents extracted from headings.
    pub toc: Vec<TocEntry>,
}

/// Context available during format rendering.
#[derive(Clone, Copy)]
pub struct FormatContext<'a> {
    pub highlighter: &'a SyntaxHighlighter,
    pub markdown_config: &'a MarkdownConfig,
}

#[derive(thiserror::Error, Debug)]
pub enum FormatError {
    #[error("markdown error: {0}")]
    Markdown(#[from] MarkdownError),
}

/// A content format that can render files to HTML.
pub trait ContentFormat: Send + Sync {
    /// The name of this format (e.g., "markdown").
    fn name(&self) -> &'static str;

    /// File extensions this format handles (lowercase, without dot).
    fn extensions(&self) -> &[&'static str];

    /// Render content to HTML, returning the HTML and its table of contents.
    fn render(&self, content: &str, ctx: &FormatContext) -> Result<FormatOutput, FormatError>;
}

/// Markdown via pulldown-cmark.
pub struct MarkdownFormat;

impl ContentFormat for MarkdownFormat {
    fn name(&self) -> &'static str {
        "markdown"
    }

    fn extensions(&self) -> &[&'static str] {
        &["md", "markdown"]
    }

    fn render(&self, content: &str, ctx: &FormatContext) -> Result<FormatOutput, FormatError> {
        let output = render_markdown(content, ctx.highlighter, ctx.markdown_config)?;
        Ok(FormatOutput {
            html: output.html,
            toc: output.toc,
        })
    }
}

/// Registry of content formats, looked up by file extension.
pub struct FormatRegistry {
    formats: Vec<Box<dyn ContentFormat>>,
}

impl FormatRegistry {
    pub fn new() -> Self {
        Self {
            formats: Vec::new(),
        }
    }

    /// Create a registry with the default formats (Markdown).
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(MarkdownFormat);
        registry
    }

    /// Register a new format.
    ///
    /// Later registrations take precedence for overlapping extensions.
    pub fn register<F: ContentFormat + 'static>(&mut self, format: F) {
        self.formats.push(Box::new(format));
    }

    pub fn for_extension(&self, ext: &str) -> Option<&dyn ContentFormat> {
        let ext_lower = ext.to_lowercase();
        self.formats
            .iter()
            .rev()
            .find(|f| f.extensions().iter().any(|e| *e == ext_lower))
            .map(|f| f.as_ref())
    }

    pub fn for_path(&self, path: &Path) -> Option<&dyn ContentFormat> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| self.for_extension(ext))
    }

    /// Check if a path is a document (has a registered format).
    pub fn is_document(&self, path: &Path) -> bool {
        self.for_path(path).is_some()
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_default_formats() {
        let registry = FormatRegistry::with_defaults();

        assert!(registry.for_extension("md").is_some());
        assert!(registry.for_extension("MD").is_some());
        assert!(registry.for_extension("txt").is_none());
        assert!(registry.is_document(Path::new("posts/first.md")));
        assert!(!registry.is_document(Path::new("img/logo.svg")));
    }

    struct PlainFormat;
    impl ContentFormat for PlainFormat {
        fn name(&self) -> &'static str {
            "plain"
        }
        fn extensions(&self) -> &[&'static str] {
            &["txt", "md"]
        }
        fn render(&self, content: &str, _ctx: &FormatContext) -> Result<FormatOutput, FormatError> {
            Ok(FormatOutput {
                html: format!("<pre>{content}</pre>"),
                toc: vec![],
            })
        }
    }

    #[test]
    fn test_later_registration_wins() {
        let mut registry = FormatRegistry::with_defaults();
        registry.register(PlainFormat);

        assert_eq!(registry.for_extension("md").unwrap().name(), "plain");
        assert_eq!(registry.for_extension("markdown").unwrap().name(), "markdown");
    }
}
