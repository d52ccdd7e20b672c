use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;
use tera::{Context, Tera};

use super::document::Document;
use super::filters::register_filters;
use super::highlight::SyntaxHighlighter;
use super::nav::NavLink;
use super::shortcodes::register_functions;
use crate::config::{BuildContext, MarkdownConfig};

#[derive(thiserror::Error, Debug)]
pub enum RenderError {
    #[error("template error: {0}")]
    Template(#[from] tera::Error),

    #[error("layout not found: {0}")]
    LayoutNotFound(String),
}

/// The template renderer, wrapping Tera.
pub struct Renderer {
    tera: Tera,
}

/// Macros available to content as `macros::name(...)` when present.
const MACROS_TEMPLATE: &str = "macros.html";

impl Renderer {
    /// Create a renderer loading every `*.html` template under `templates_dir`.
    ///
    /// A missing directory yields a renderer with no layouts, in which case
    /// pages are written without a wrapper.
    pub fn new(templates_dir: &Path, build: &BuildContext) -> Result<Self, RenderError> {
        let mut tera = if templates_dir.is_dir() {
            let glob = templates_dir.join("**/*.html");
            Tera::new(&glob.to_string_lossy())?
        } else {
            tracing::debug!(
                "no templates directory at {}, pages are rendered without layouts",
                templates_dir.display()
            );
            Tera::default()
        };
        register_filters(&mut tera, build);

        Ok(Self { tera })
    }

    /// Make the `icon` and `markdown` shortcodes callable from templates.
    pub fn register_shortcodes(
        &mut self,
        icons_dir: &Path,
        highlighter: &SyntaxHighlighter,
        markdown_config: &MarkdownConfig,
    ) {
        register_functions(&mut self.tera, icons_dir, highlighter, markdown_config);
    }

    fn has_template(&self, name: &str) -> bool {
        self.tera.get_template_names().any(|n| n == name)
    }

    /// Render a page with its layout.
    ///
    /// An explicit layout must exist. Without one, the default layout is used
    /// if present and the bare content is returned otherwise.
    pub fn render_page(
        &self,
        layout: Option<&str>,
        default_layout: &str,
        context: &PageContext,
    ) -> Result<String, RenderError> {
        let template = match layout {
            Some(name) if self.has_template(name) => name,
            Some(name) => return Err(RenderError::LayoutNotFound(name.to_string())),
            None if self.has_template(default_layout) => default_layout,
            None => return Ok(context.content.to_string()),
        };

        let mut tera_context = Context::new();
        tera_context.insert("site", context.site);
        tera_context.insert("page", context.page);
        tera_context.insert("content", context.content);
        tera_context.insert("toc", context.toc);
        tera_context.insert("navigation", context.navigation);
        tera_context.insert("collections", context.collections);
        tera_context.insert("data", context.data);
        tera_context.insert("build", context.build);

        Ok(self.tera.render(template, &tera_context)?)
    }

    /// Render raw content (markdown) through Tera before markdown processing.
    /// This allows markdown files to use Tera syntax like macros, loops, and variables.
    ///
    /// Unlike `render_str`, this method gives the content access to macros defined
    /// in template files by dynamically adding the content as a template.
    pub fn render_content(
        &mut self,
        content: &str,
        context: &ContentRenderContext,
    ) -> Result<String, RenderError> {
        let mut tera_context = Context::new();
        tera_context.insert("site", context.site);
        tera_context.insert("page", context.page);
        tera_context.insert("collections", context.collections);
        tera_context.insert("data", context.data);
        tera_context.insert("build", context.build);

        let source = if self.has_template(MACROS_TEMPLATE) {
            format!(
                "{{% import \"{}\" as macros %}}\n{}",
                MACROS_TEMPLATE, content
            )
        } else {
            content.to_string()
        };

        const TEMP_TEMPLATE_NAME: &str = "__content_render__";
        self.tera.add_raw_template(TEMP_TEMPLATE_NAME, &source)?;

        // No `.html` suffix, so markdown content is never autoescaped
        let result = self.tera.render(TEMP_TEMPLATE_NAME, &tera_context);

        self.tera.templates.remove(TEMP_TEMPLATE_NAME);

        Ok(result?)
    }
}

/// Context available during content (markdown) rendering.
/// This is a subset of PageContext since nav/toc aren't available yet.
#[derive(Debug, Serialize)]
pub struct ContentRenderContext<'a> {
    pub site: &'a SiteContext,
    pub page: &'a PageInfo,
    pub collections: &'a BTreeMap<String, Vec<PageInfo>>,
    pub data: &'a serde_json::Value,
    pub build: &'a BuildContext,
}

/// Context passed to layouts.
#[derive(Debug, Serialize)]
pub struct PageContext<'a> {
    pub site: &'a SiteContext,
    pub page: &'a PageInfo,
    /// Rendered HTML of the page body
    pub content: &'a str,
    /// Table of contents for the current page
    pub toc: &'a [TocEntry],
    /// Site navigation with the current page marked
    pub navigation: &'a [NavLink],
    /// Every collection, ascending by navigation order
    pub collections: &'a BTreeMap<String, Vec<PageInfo>>,
    /// Global data from the config file, accessible as `data.*`
    pub data: &'a serde_json::Value,
    pub build: &'a BuildContext,
}

/// Site-level information.
#[derive(Debug, Clone, Serialize)]
pub struct SiteContext {
    pub name: String,
    pub url: Option<String>,
}

/// Information about a page, as seen by templates.
///
/// `url` is unprefixed; templates pass it through the `url` filter.
#[derive(Debug, Clone, Serialize)]
pub struct PageInfo {
    pub title: String,
    pub url: String,
    pub source_path: String,
    pub description: Option<String>,
    pub date: Option<String>,
    pub tags: Vec<String>,
    pub order: Option<i64>,
    /// Custom front matter fields (flattened to top level, e.g., `page.author`)
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl PageInfo {
    pub fn from_document(doc: &Document) -> Self {
        let fm = &doc.front_matter;
        Self {
            title: doc.title(),
            url: doc.url_path.clone(),
            source_path: doc.glob_path(),
            description: fm.description.clone(),
            date: fm.date.clone(),
            tags: fm.tags.clone(),
            order: doc.nav_order(),
            extra: fm.extra.clone(),
        }
    }
}

/// A table of contents entry for the current page.
#[derive(Debug, Clone, Serialize)]
pub struct TocEntry {
    /// The heading text
    pub text: String,
    /// The heading id (for anchor links)
    pub id: String,
    /// The heading level (1-6)
    pub level: u8,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn write(root: &Path, name: &str, content: &str) {
        std::fs::write(root.join(name), content).unwrap();
    }

    struct Fixture {
        site: SiteContext,
        page: PageInfo,
        collections: BTreeMap<String, Vec<PageInfo>>,
        data: serde_json::Value,
        build: BuildContext,
    }

    impl Fixture {
        fn new() -> Self {
            let doc = Document::parse(
                PathBuf::from("posts/hello.md"),
                "/posts/hello/".to_string(),
                "---\ntitle: Hello\nauthor: Sam\nnavigation:\n  order: 2\n---\nBody",
            )
            .unwrap();
            let page = PageInfo::from_document(&doc);
            let mut collections = BTreeMap::new();
            collections.insert("posts".to_string(), vec![page.clone()]);
            Self {
                site: SiteContext {
                    name: "Test".to_string(),
                    url: None,
                },
                page,
                collections,
                data: serde_json::json!({ "tagline": "hi" }),
                build: BuildContext::from_vars(None, Some("/blog/")),
            }
        }

        fn page_context<'a>(&'a self, content: &'a str) -> PageContext<'a> {
            PageContext {
                site: &self.site,
                page: &self.page,
                content,
                toc: &[],
                navigation: &[],
                collections: &self.collections,
                data: &self.data,
                build: &self.build,
            }
        }
    }

    #[test]
    fn test_page_info_from_document() {
        let fixture = Fixture::new();
        assert_eq!(fixture.page.title, "Hello");
        assert_eq!(fixture.page.order, Some(2));
        assert_eq!(fixture.page.source_path, "posts/hello.md");
        assert!(fixture.page.extra.contains_key("author"));
    }

    #[test]
    fn test_render_page_with_default_layout() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "base.html",
            "<title>{{ page.title }} | {{ site.name }}</title>{{ content | safe }}<a href=\"{{ page.url | url }}\">{{ page.author }}</a>",
        );
        let fixture = Fixture::new();
        let renderer = Renderer::new(dir.path(), &fixture.build).unwrap();

        let html = renderer
            .render_page(None, "base.html", &fixture.page_context("<p>x</p>"))
            .unwrap();
        assert_eq!(
            html,
            "<title>Hello | Test</title><p>x</p><a href=\"/blog/posts/hello/\">Sam</a>"
        );
    }

    #[test]
    fn test_missing_explicit_layout_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let fixture = Fixture::new();
        let renderer = Renderer::new(dir.path(), &fixture.build).unwrap();

        let result = renderer.render_page(Some("post.html"), "base.html", &fixture.page_context(""));
        assert!(matches!(result, Err(RenderError::LayoutNotFound(name)) if name == "post.html"));
    }

    #[test]
    fn test_missing_default_layout_returns_content() {
        let fixture = Fixture::new();
        let renderer = Renderer::new(Path::new("/nonexistent/templates"), &fixture.build).unwrap();

        let html = renderer
            .render_page(None, "base.html", &fixture.page_context("<p>bare</p>"))
            .unwrap();
        assert_eq!(html, "<p>bare</p>");
    }

    #[test]
    fn test_render_content_sees_collections_and_macros() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "macros.html",
            "{% macro shout(text) %}{{ text | upper }}{% endmacro shout %}",
        );
        let fixture = Fixture::new();
        let mut renderer = Renderer::new(dir.path(), &fixture.build).unwrap();

        let context = ContentRenderContext {
            site: &fixture.site,
            page: &fixture.page,
            collections: &fixture.collections,
            data: &fixture.data,
            build: &fixture.build,
        };
        let out = renderer
            .render_content(
                "{{ macros::shout(text=data.tagline) }} {% for p in collections.posts %}{{ p.title }}{% endfor %}",
                &context,
            )
            .unwrap();
        assert_eq!(out.trim(), "HI Hello");

        // The temporary template does not leak
        assert!(!renderer.has_template("__content_render__"));
    }
}
