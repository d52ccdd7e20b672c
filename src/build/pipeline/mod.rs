//! Build pipeline for document processing.
//!
//! The pipeline transforms documents through a series of stages:
//! 1. Shortcode expansion (async, every call in a document joined concurrently)
//! 2. Tera processing (content is itself a template)
//! 3. Markdown rendering (to HTML with TOC)
//! 4. Template rendering (layout wrapper)
//! 5. Minification (production builds only)
//! 6. File writing (output to disk)
//!
//! Optional stages are inserted after a named stage.
//! Build-wide stages run after all documents are written.

mod context;
mod document;
mod error;
mod stages;

pub use context::PipelineContext;
pub use document::ProcessingDocument;
pub use error::PipelineError;
pub use stages::{BaseUrlStage, LIVE_RELOAD_PATH, SearchIndexStage};

use futures_util::future::BoxFuture;

use stages::{MarkdownStage, MinifyStage, ShortcodeStage, TemplateStage, TeraStage, WriteStage};

/// A stage in the document processing pipeline.
///
/// Stages transform documents sequentially. Each stage receives all documents
/// and can modify them in place before passing to the next stage.
pub trait Stage: Send + Sync {
    /// Unique name for this stage (used for insertion points).
    fn name(&self) -> &'static str;

    /// Process documents through this stage.
    ///
    /// Synchronous stages return an already-resolved future.
    fn process<'a>(
        &'a self,
        docs: &'a mut [ProcessingDocument],
        ctx: &'a mut PipelineContext<'_>,
    ) -> BoxFuture<'a, Result<(), PipelineError>>;
}

/// A stage that runs once after all documents are processed and written.
pub trait FinalizeStage: Send + Sync {
    /// Unique name for this stage.
    fn name(&self) -> &'static str;

    fn finalize<'a>(
        &'a self,
        ctx: &'a PipelineContext<'_>,
    ) -> BoxFuture<'a, Result<(), PipelineError>>;
}

/// The document processing pipeline.
///
/// The default pipeline is shortcodes → tera → markdown → template → minify → write.
///
/// # Extension Points
///
/// Insert optional stages using `insert_after`:
///
/// ```ignore
/// pipeline.insert_after("template", BaseUrlStage)?;
/// ```
///
/// Add build-wide stages using `add_finalize_stage`:
///
/// ```ignore
/// pipeline.add_finalize_stage(SearchIndexStage::new(config.search.clone()));
/// ```
pub struct Pipeline {
    /// Document processing stages (run for each document batch)
    stages: Vec<Box<dyn Stage>>,
    /// Build-wide stages (run once after all documents)
    finalize_stages: Vec<Box<dyn FinalizeStage>>,
}

impl Pipeline {
    /// Create an empty pipeline with no stages.
    pub fn new() -> Self {
        Self {
            stages: Vec::new(),
            finalize_stages: Vec::new(),
        }
    }

    /// Create the default pipeline with standard stages.
    pub fn default_pipeline() -> Self {
        let mut pipeline = Self::new();
        pipeline.add_stage(ShortcodeStage);
        pipeline.add_stage(TeraStage);
        pipeline.add_stage(MarkdownStage);
        pipeline.add_stage(TemplateStage);
        pipeline.add_stage(MinifyStage);
        pipeline.add_stage(WriteStage);
        pipeline
    }

    /// Add a stage to the end of the pipeline.
    pub fn add_stage<S: Stage + 'static>(&mut self, stage: S) -> &mut Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// Insert a stage after the named stage.
    ///
    /// Returns an error if no stage with the given name exists.
    pub fn insert_after<S: Stage + 'static>(
        &mut self,
        name: &str,
        stage: S,
    ) -> Result<&mut Self, PipelineError> {
        let pos = self
            .stages
            .iter()
            .position(|s| s.name() == name)
            .ok_or_else(|| PipelineError::stage(name, "stage not found in pipeline"))?;
        self.stages.insert(pos + 1, Box::new(stage));
        Ok(self)
    }

    /// Add a finalize stage (runs after all documents are processed).
    pub fn add_finalize_stage<S: FinalizeStage + 'static>(&mut self, stage: S) -> &mut Self {
        self.finalize_stages.push(Box::new(stage));
        self
    }

    /// Run the pipeline on a set of documents.
    pub async fn run(
        &self,
        docs: &mut [ProcessingDocument],
        ctx: &mut PipelineContext<'_>,
    ) -> Result<(), PipelineError> {
        for stage in &self.stages {
            tracing::debug!("stage '{}': {} document(s)", stage.name(), docs.len());
            stage.process(docs, ctx).await?;
        }

        for stage in &self.finalize_stages {
            tracing::debug!("finalize stage '{}'", stage.name());
            stage.finalize(ctx).await?;
        }

        Ok(())
    }

    #[cfg(test)]
    fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::default_pipeline()
    }
}
