//! Document types for pipeline processing.

use crate::build::document::Document;
use crate::build::render::TocEntry;

/// A document being processed through the pipeline.
///
/// Wraps the original `Document` with mutable state that evolves
/// through pipeline stages:
///
/// 1. Initially: `content` = raw markdown, `toc` = empty
/// 2. After shortcodes: calls replaced by raw-wrapped markup
/// 3. After tera: template syntax expanded
/// 4. After markdown: `content` = HTML, `toc` = populated
/// 5. After template: `output_html` = final page HTML
/// 6. After minify: `output_html` minified in production
#[derive(Debug)]
pub struct ProcessingDocument {
    /// The original document (metadata and raw content)
    pub doc: Document,

    /// Content being processed.
    pub content: String,

    /// Table of contents extracted during markdown rendering.
    pub toc: Vec<TocEntry>,

    /// Final HTML output after template rendering.
    ///
    /// None until the template stage populates it.
    pub output_html: Option<String>,
}

impl ProcessingDocument {
    /// Create a new processing document from a discovered document.
    pub fn new(doc: Document) -> Self {
        let content = doc.raw_content.clone();
        Self {
            doc,
            content,
            toc: Vec::new(),
            output_html: None,
        }
    }

    /// Get the document's URL path (for output location).
    pub fn url_path(&self) -> &str {
        &self.doc.url_path
    }
}
