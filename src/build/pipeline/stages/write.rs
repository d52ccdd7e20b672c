//! File writing stage.
//!
//! Writes the final HTML output to the filesystem.

use futures_util::FutureExt;
use futures_util::future::BoxFuture;

use crate::build::paths::url_to_output_path;
use crate::build::pipeline::{PipelineContext, PipelineError, ProcessingDocument, Stage};

/// Stage that writes rendered documents to the output directory.
///
/// This stage takes the final HTML from `doc.output_html` and writes
/// it to the appropriate location in the output directory, creating
/// any necessary parent directories.
pub struct WriteStage;

impl Stage for WriteStage {
    fn name(&self) -> &'static str {
        "write"
    }

    fn process<'a>(
        &'a self,
        docs: &'a mut [ProcessingDocument],
        ctx: &'a mut PipelineContext<'_>,
    ) -> BoxFuture<'a, Result<(), PipelineError>> {
        async move {
            for doc in docs.iter() {
                let html = doc.output_html.as_ref().ok_or_else(|| {
                    PipelineError::stage(
                        "write",
                        format!(
                            "document '{}' has no output HTML (was template stage run?)",
                            doc.url_path()
                        ),
                    )
                })?;

                let output_path = url_to_output_path(doc.url_path(), ctx.output_dir);
                let io_err = |e| PipelineError::Io {
                    path: output_path.clone(),
                    source: e,
                };

                if let Some(parent) = output_path.parent() {
                    tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
                }
                tokio::fs::write(&output_path, html).await.map_err(io_err)?;
                tracing::debug!("wrote {}", output_path.display());
            }

            Ok(())
        }
        .boxed()
    }
}
