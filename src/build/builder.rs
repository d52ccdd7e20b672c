use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config::{BuildContext, Config};

use super::collection::{CollectionError, build_collections};
use super::format::FormatRegistry;
use super::highlight::SyntaxHighlighter;
use super::nav::build_navigation;
use super::passthrough::{PassthroughError, copy_passthrough};
use super::paths::resolve_against;
use super::pipeline::{
    BaseUrlStage, Pipeline, PipelineContext, PipelineError, ProcessingDocument, SearchIndexStage,
};
use super::render::{PageInfo, RenderError, Renderer, SiteContext};
use super::shortcodes::ShortcodeRegistry;
use super::source::{ContentSource, SourceError};

#[derive(thiserror::Error, Debug)]
pub enum BuildError {
    #[error("source error: {0}")]
    Source(#[from] SourceError),

    #[error(transparent)]
    Collection(#[from] CollectionError),

    #[error("render error: {0}")]
    Render(#[from] RenderError),

    #[error("passthrough error: {0}")]
    Passthrough(#[from] PassthroughError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("unknown highlight theme: {0}")]
    UnknownHighlightTheme(String),

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug)]
pub struct BuildResult {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub templates_dir: PathBuf,
    pub documents: usize,
    pub passthrough_files: usize,
}

pub struct Builder {
    config: Config,
    /// Base path for resolving relative paths (typically the config file's directory)
    base_path: PathBuf,
    build: BuildContext,
    formats: FormatRegistry,
    shortcodes: ShortcodeRegistry,
}

impl Builder {
    pub fn new(config: Config, base_path: PathBuf, build: BuildContext) -> Self {
        Self {
            config,
            base_path,
            build,
            formats: FormatRegistry::with_defaults(),
            shortcodes: ShortcodeRegistry::with_defaults(),
        }
    }

    pub fn input_dir(&self) -> PathBuf {
        resolve_against(&self.base_path, &self.config.site.input)
    }

    pub fn output_dir(&self) -> PathBuf {
        resolve_against(&self.base_path, &self.config.site.output)
    }

    pub fn templates_dir(&self) -> PathBuf {
        self.input_dir().join(&self.config.templates.dir)
    }

    fn icons_dir(&self) -> PathBuf {
        self.input_dir().join(&self.config.site.icons)
    }

    /// Input-relative paths that are never content: passthrough entries,
    /// the templates directory, and the output directory when it lives
    /// inside the input directory.
    fn excluded_paths(&self, input_dir: &Path, output_dir: &Path) -> Vec<PathBuf> {
        let mut excluded = self.config.passthrough.clone();
        excluded.push(self.config.templates.dir.clone());
        if let Ok(relative) = output_dir.strip_prefix(input_dir) {
            excluded.push(relative.to_path_buf());
        }
        excluded
    }

    pub async fn build(&self) -> Result<BuildResult, BuildError> {
        // 1. Discover documents
        // 2. Build collections and navigation (before any rendering)
        // 3. Load templates
        // 4. Copy passthrough files
        // 5. Run the pipeline, then the search indexer
        let input_dir = self.input_dir();
        let output_dir = self.output_dir();
        let templates_dir = self.templates_dir();

        let source = ContentSource::open(
            input_dir.clone(),
            self.excluded_paths(&input_dir, &output_dir),
        )?;
        let documents = source.discover(&self.formats)?;
        tracing::info!(
            "found {} document(s) in {}",
            documents.len(),
            input_dir.display()
        );

        let collections: BTreeMap<String, Vec<PageInfo>> =
            build_collections(&self.config.collections, &documents)?
                .into_iter()
                .map(|(name, collection)| {
                    let pages = collection
                        .documents
                        .into_iter()
                        .map(PageInfo::from_document)
                        .collect();
                    (name, pages)
                })
                .collect();
        let navigation = build_navigation(&documents);

        let highlighter = SyntaxHighlighter::new(&self.config.highlight.theme);
        let icons_dir = self.icons_dir();
        let mut renderer = Renderer::new(&templates_dir, &self.build)?;
        renderer.register_shortcodes(&icons_dir, &highlighter, &self.config.markdown);

        tokio::fs::create_dir_all(&output_dir)
            .await
            .map_err(|e| BuildError::Io {
                path: output_dir.clone(),
                source: e,
            })?;

        let passthrough_files =
            copy_passthrough(&input_dir, &output_dir, &self.config.passthrough)?;
        tracing::debug!("copied {} passthrough file(s)", passthrough_files);

        self.write_highlight_stylesheet(&highlighter, &output_dir)
            .await?;

        let mut pipeline = Pipeline::default_pipeline();
        if self.build.path_prefix != "/" {
            pipeline.insert_after("template", BaseUrlStage)?;
        }
        if self.config.search.enabled {
            pipeline.add_finalize_stage(SearchIndexStage::new(self.config.search.clone()));
        }

        let site = SiteContext {
            name: self.config.site.name.clone(),
            url: self.config.site.url.clone(),
        };
        let mut ctx = PipelineContext {
            output_dir: &output_dir,
            site: &site,
            data: &self.config.data,
            markdown_config: &self.config.markdown,
            collections: &collections,
            navigation: &navigation,
            default_layout: &self.config.templates.default_layout,
            highlighter: &highlighter,
            renderer: &mut renderer,
            format_registry: &self.formats,
            shortcodes: &self.shortcodes,
            icons_dir: &icons_dir,
            build: &self.build,
        };

        let document_count = documents.len();
        let mut docs: Vec<ProcessingDocument> =
            documents.into_iter().map(ProcessingDocument::new).collect();
        pipeline.run(&mut docs, &mut ctx).await?;

        let display_output = output_dir.canonicalize().unwrap_or(output_dir.clone());
        tracing::info!(
            "wrote {} page(s) to {}",
            document_count,
            display_output.display()
        );

        Ok(BuildResult {
            input_dir,
            output_dir,
            templates_dir,
            documents: document_count,
            passthrough_files,
        })
    }

    async fn write_highlight_stylesheet(
        &self,
        highlighter: &SyntaxHighlighter,
        output_dir: &Path,
    ) -> Result<(), BuildError> {
        let Some(stylesheet) = &self.config.highlight.stylesheet else {
            return Ok(());
        };
        let css = highlighter
            .generate_css()
            .ok_or_else(|| BuildError::UnknownHighlightTheme(highlighter.theme_name().to_string()))?;

        let path = output_dir.join(stylesheet);
        let io_err = |e| BuildError::Io {
            path: path.clone(),
            source: e,
        };
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }
        tokio::fs::write(&path, css).await.map_err(io_err)?;
        Ok(())
    }
}
