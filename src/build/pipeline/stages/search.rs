//! Search indexing finalize stage.

use futures_util::FutureExt;
use futures_util::future::BoxFuture;

use crate::build::pipeline::{FinalizeStage, PipelineContext, PipelineError};
use crate::build::search::build_search_index;
use crate::config::SearchConfig;

/// Indexes the finished output tree. A failing indexer fails the build.
pub struct SearchIndexStage {
    config: SearchConfig,
}

impl SearchIndexStage {
    pub fn new(config: SearchConfig) -> Self {
        Self { config }
    }
}

impl FinalizeStage for SearchIndexStage {
    fn name(&self) -> &'static str {
        "search"
    }

    fn finalize<'a>(
        &'a self,
        ctx: &'a PipelineContext<'_>,
    ) -> BoxFuture<'a, Result<(), PipelineError>> {
        async move {
            match build_search_index(ctx.output_dir, &self.config).await? {
                Some(count) => tracing::info!("indexed {} page(s) for search", count),
                None => tracing::info!("search index built by external indexer"),
            }
            Ok(())
        }
        .boxed()
    }
}
