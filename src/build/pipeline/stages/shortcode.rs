//! Shortcode expansion stage.

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, try_join_all};

use crate::build::pipeline::{PipelineContext, PipelineError, ProcessingDocument, Stage};
use crate::build::shortcodes::expand_shortcodes;

/// Stage that replaces shortcode calls with their output.
///
/// Documents are expanded concurrently, as are the calls within each
/// document. Output is wrapped in tera `raw` blocks, so the tera stage
/// passes it through untouched.
pub struct ShortcodeStage;

impl Stage for ShortcodeStage {
    fn name(&self) -> &'static str {
        "shortcodes"
    }

    fn process<'a>(
        &'a self,
        docs: &'a mut [ProcessingDocument],
        ctx: &'a mut PipelineContext<'_>,
    ) -> BoxFuture<'a, Result<(), PipelineError>> {
        async move {
            let registry = ctx.shortcodes;
            let shortcode_ctx = ctx.shortcode_context();

            let expanded = try_join_all(docs.iter().map(|doc| {
                let shortcode_ctx = &shortcode_ctx;
                async move {
                    expand_shortcodes(&doc.content, registry, shortcode_ctx)
                        .await
                        .map_err(|e| PipelineError::Shortcode {
                            path: doc.doc.source_path.clone(),
                            source: e,
                        })
                }
            }))
            .await?;

            for (doc, content) in docs.iter_mut().zip(expanded) {
                doc.content = content;
            }
            Ok(())
        }
        .boxed()
    }
}
