//! Tera template processing stage.
//!
//! Processes Tera syntax in content, expanding macros, variables, and
//! control structures before markdown rendering.

use futures_util::FutureExt;
use futures_util::future::BoxFuture;

use crate::build::pipeline::{PipelineContext, PipelineError, ProcessingDocument, Stage};
use crate::build::render::{ContentRenderContext, PageInfo};

/// Stage that processes Tera syntax in content.
///
/// Content authors can use:
/// - Macros: `{{ macros::note(content="...") }}` (when `macros.html` exists)
/// - Variables: `{{ page.title }}`, `{{ collections.posts | length }}`
/// - Filters: `{{ page.date | readable_date }}`
/// - Control flow: `{% for post in collections.posts %}...{% endfor %}`
pub struct TeraStage;

impl TeraStage {
    fn run(
        docs: &mut [ProcessingDocument],
        ctx: &mut PipelineContext<'_>,
    ) -> Result<(), PipelineError> {
        for doc in docs {
            let page = PageInfo::from_document(&doc.doc);
            let content_context = ContentRenderContext {
                site: ctx.site,
                page: &page,
                collections: ctx.collections,
                data: ctx.data,
                build: ctx.build,
            };

            doc.content = ctx
                .renderer
                .render_content(&doc.content, &content_context)
                .map_err(|e| PipelineError::Render {
                    path: doc.doc.source_path.clone(),
                    source: e,
                })?;
        }

        Ok(())
    }
}

impl Stage for TeraStage {
    fn name(&self) -> &'static str {
        "tera"
    }

    fn process<'a>(
        &'a self,
        docs: &'a mut [ProcessingDocument],
        ctx: &'a mut PipelineContext<'_>,
    ) -> BoxFuture<'a, Result<(), PipelineError>> {
        futures_util::future::ready(Self::run(docs, ctx)).boxed()
    }
}
