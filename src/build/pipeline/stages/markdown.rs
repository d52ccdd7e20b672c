//! Content rendering stage.
//!
//! Renders document content to HTML using the appropriate format
//! from the format registry.

use futures_util::FutureExt;
use futures_util::future::BoxFuture;

use crate::build::pipeline::{PipelineContext, PipelineError, ProcessingDocument, Stage};

/// Stage that renders content to HTML using the format registry.
///
/// After this stage, `doc.content` contains HTML and `doc.toc`
/// contains the extracted headings.
pub struct MarkdownStage;

impl MarkdownStage {
    fn run(docs: &mut [ProcessingDocument], ctx: &PipelineContext<'_>) -> Result<(), PipelineError> {
        let format_ctx = ctx.format_context();

        for doc in docs {
            let format = ctx
                .format_registry
                .for_path(&doc.doc.source_path)
                .ok_or_else(|| {
                    PipelineError::stage(
                        "markdown",
                        format!(
                            "no format registered for {}",
                            doc.doc.source_path.display()
                        ),
                    )
                })?;

            let output =
                format
                    .render(&doc.content, &format_ctx)
                    .map_err(|e| PipelineError::Format {
                        path: doc.doc.source_path.clone(),
                        source: e,
                    })?;

            doc.content = output.html;
            doc.toc = output.toc;
        }

        Ok(())
    }
}

impl Stage for MarkdownStage {
    fn name(&self) -> &'static str {
        "markdown"
    }

    fn process<'a>(
        &'a self,
        docs: &'a mut [ProcessingDocument],
        ctx: &'a mut PipelineContext<'_>,
    ) -> BoxFuture<'a, Result<(), PipelineError>> {
        futures_util::future::ready(Self::run(docs, ctx)).boxed()
    }
}
