//! Production minification stage.

use std::borrow::Cow;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;

use crate::build::minify::minify;
use crate::build::paths::is_html_page;
use crate::build::pipeline::{PipelineContext, PipelineError, ProcessingDocument, Stage};

/// Stage that minifies rendered HTML pages when the build is in production.
///
/// Documents whose URL names a non-HTML file (e.g. `/feed.xml`) are left alone.
pub struct MinifyStage;

impl MinifyStage {
    fn run(docs: &mut [ProcessingDocument], ctx: &PipelineContext<'_>) {
        if !ctx.build.production {
            return;
        }

        for doc in docs {
            if !is_html_page(doc.url_path()) {
                continue;
            }
            let Some(html) = doc.output_html.as_mut() else {
                continue;
            };
            let minified = match minify(html, ctx.build) {
                Cow::Owned(minified) => minified,
                Cow::Borrowed(_) => continue,
            };
            *html = minified;
        }
    }
}

impl Stage for MinifyStage {
    fn name(&self) -> &'static str {
        "minify"
    }

    fn process<'a>(
        &'a self,
        docs: &'a mut [ProcessingDocument],
        ctx: &'a mut PipelineContext<'_>,
    ) -> BoxFuture<'a, Result<(), PipelineError>> {
        Self::run(docs, ctx);
        futures_util::future::ready(Ok(())).boxed()
    }
}
