//! Page template rendering stage.
//!
//! Wraps rendered HTML content in its layout, adding navigation,
//! collections, and other page elements.

use futures_util::FutureExt;
use futures_util::future::BoxFuture;

use crate::build::pipeline::{PipelineContext, PipelineError, ProcessingDocument, Stage};
use crate::build::render::{PageContext, PageInfo};

/// Path of the live reload event stream served by `lectern serve`.
pub const LIVE_RELOAD_PATH: &str = "/_lectern/live-reload";

/// Stage that applies the layout to rendered content.
///
/// The layout is the document's `layout` front matter, or the configured
/// default. After this stage, `doc.output_html` contains the complete page.
pub struct TemplateStage;

impl TemplateStage {
    fn run(docs: &mut [ProcessingDocument], ctx: &PipelineContext<'_>) -> Result<(), PipelineError> {
        for doc in docs {
            let page = PageInfo::from_document(&doc.doc);
            let navigation = ctx.navigation_for(doc.url_path());

            let page_context = PageContext {
                site: ctx.site,
                page: &page,
                content: &doc.content,
                toc: &doc.toc,
                navigation: &navigation,
                collections: ctx.collections,
                data: ctx.data,
                build: ctx.build,
            };

            let html = ctx
                .renderer
                .render_page(
                    doc.doc.front_matter.layout.as_deref(),
                    ctx.default_layout,
                    &page_context,
                )
                .map_err(|e| PipelineError::Render {
                    path: doc.doc.source_path.clone(),
                    source: e,
                })?;

            doc.output_html = Some(if ctx.build.live_reload {
                inject_live_reload(html)
            } else {
                html
            });
        }

        Ok(())
    }
}

impl Stage for TemplateStage {
    fn name(&self) -> &'static str {
        "template"
    }

    fn process<'a>(
        &'a self,
        docs: &'a mut [ProcessingDocument],
        ctx: &'a mut PipelineContext<'_>,
    ) -> BoxFuture<'a, Result<(), PipelineError>> {
        futures_util::future::ready(Self::run(docs, ctx)).boxed()
    }
}

/// Insert the live reload client before `</body>`, or append it.
fn inject_live_reload(mut html: String) -> String {
    let script = format!(
        "<script>new EventSource(\"{LIVE_RELOAD_PATH}\").addEventListener(\"reload\", () => location.reload());</script>"
    );
    match html.rfind("</body>") {
        Some(pos) => html.insert_str(pos, &script),
        None => html.push_str(&script),
    }
    html
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inject_live_reload_before_body_close() {
        let html = inject_live_reload("<body><p>x</p></body></html>".to_string());
        assert!(html.starts_with("<body><p>x</p><script>"));
        assert!(html.ends_with("</script></body></html>"));
        assert!(html.contains(LIVE_RELOAD_PATH));
    }

    #[test]
    fn test_inject_live_reload_without_body() {
        let html = inject_live_reload("<p>x</p>".to_string());
        assert!(html.starts_with("<p>x</p><script>"));
    }
}
