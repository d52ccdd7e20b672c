//! Default pipeline stages.
//!
//! The standard document processing pipeline consists of:
//!
//! 1. **ShortcodeStage** - Expand `{{< ... >}}` calls concurrently
//! 2. **TeraStage** - Process Tera syntax in content (macros, variables, loops)
//! 3. **MarkdownStage** - Convert markdown to HTML with syntax highlighting
//! 4. **TemplateStage** - Wrap content in its layout
//!    (**BaseUrlStage** follows it when a path prefix is set)
//! 5. **MinifyStage** - Minify pages in production
//! 6. **WriteStage** - Write final HTML to output directory
//!
//! **SearchIndexStage** is a finalize stage run after every page is written.

mod base_url;
mod markdown;
mod minify;
mod search;
mod shortcode;
mod template;
mod tera;
mod write;

pub use base_url::BaseUrlStage;
pub use markdown::MarkdownStage;
pub use minify::MinifyStage;
pub use search::SearchIndexStage;
pub use shortcode::ShortcodeStage;
pub use template::{LIVE_RELOAD_PATH, TemplateStage};
pub use tera::TeraStage;
pub use write::WriteStage;
