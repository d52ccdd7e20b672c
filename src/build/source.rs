use std::collections::HashMap;
use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use super::document::{Document, FrontMatterError};
use super::format::FormatRegistry;
use super::paths::{permalink_to_url, source_path_to_url};

// =============================================================================
// Errors
// =============================================================================

#[derive(thiserror::Error, Debug)]
pub enum SourceError {
    #[error("input path does not exist: {0}")]
    PathNotFound(PathBuf),

    #[error("input path is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        source: walkdir::Error,
    },

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{path}: {source}")]
    FrontMatter {
        path: PathBuf,
        source: FrontMatterError,
    },

    #[error("{path}: permalink '{permalink}' points outside the output directory")]
    InvalidPermalink { path: PathBuf, permalink: String },

    #[error("{first} and {second} both render to {url}")]
    DuplicateUrl {
        url: String,
        first: PathBuf,
        second: PathBuf,
    },
}

// =============================================================================
// Content source
// =============================================================================

/// The content tree under the input directory.
///
/// Directories whose names start with `_` (templates, icons) or `.` are not
/// content, nor are passthrough paths.
#[derive(Debug, Clone)]
pub struct ContentSource {
    /// The input directory
    pub root: PathBuf,
    /// Input-relative paths that are never treated as content
    excluded: Vec<PathBuf>,
}

impl ContentSource {
    /// Open the input directory, validating that it exists.
    pub fn open(root: PathBuf, excluded: Vec<PathBuf>) -> Result<Self, SourceError> {
        if !root.exists() {
            return Err(SourceError::PathNotFound(root));
        }
        if !root.is_dir() {
            return Err(SourceError::NotADirectory(root));
        }
        Ok(Self { root, excluded })
    }

    /// Discover and parse every document.
    ///
    /// Documents are returned sorted by source path, which is the discovery
    /// order collections preserve for equal navigation orders.
    pub fn discover(&self, formats: &FormatRegistry) -> Result<Vec<Document>, SourceError> {
        let mut documents = Vec::new();

        let walker = WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !self.is_skipped(entry));

        for entry in walker {
            let entry = entry.map_err(|e| SourceError::Walk {
                path: self.root.clone(),
                source: e,
            })?;

            if !entry.file_type().is_file() || !formats.is_document(entry.path()) {
                continue;
            }

            let relative = self.relative(entry.path());
            documents.push(self.load_document(entry.path(), relative)?);
        }

        documents.sort_by(|a, b| a.source_path.cmp(&b.source_path));
        check_unique_urls(&documents)?;

        tracing::debug!(
            "discovered {} document(s) in {}",
            documents.len(),
            self.root.display()
        );
        Ok(documents)
    }

    /// Read and parse a single document.
    fn load_document(&self, full_path: &Path, relative: PathBuf) -> Result<Document, SourceError> {
        let raw = std::fs::read_to_string(full_path).map_err(|e| SourceError::Read {
            path: full_path.to_path_buf(),
            source: e,
        })?;

        let mut doc = Document::parse(relative.clone(), source_path_to_url(&relative), &raw)
            .map_err(|e| SourceError::FrontMatter {
                path: relative,
                source: e,
            })?;

        if let Some(permalink) = &doc.front_matter.permalink {
            doc.url_path =
                permalink_to_url(permalink).ok_or_else(|| SourceError::InvalidPermalink {
                    path: doc.source_path.clone(),
                    permalink: permalink.clone(),
                })?;
        }

        Ok(doc)
    }

    fn is_skipped(&self, entry: &DirEntry) -> bool {
        // Never skip the root itself
        if entry.depth() == 0 {
            return false;
        }

        let name = entry.file_name().to_string_lossy();
        if name.starts_with('.') {
            return true;
        }
        if entry.file_type().is_dir()
            && (name.starts_with('_') || matches!(name.as_ref(), "node_modules" | "target"))
        {
            return true;
        }

        let relative = self.relative(entry.path());
        self.excluded.iter().any(|excluded| relative.starts_with(excluded))
    }

    /// Path relative to the input directory.
    pub fn relative(&self, path: &Path) -> PathBuf {
        path.strip_prefix(&self.root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| path.to_path_buf())
    }
}

/// Two documents writing the same file would silently clobber each other.
fn check_unique_urls(documents: &[Document]) -> Result<(), SourceError> {
    let mut seen: HashMap<&str, &Path> = HashMap::new();
    for doc in documents {
        if let Some(first) = seen.insert(&doc.url_path, &doc.source_path) {
            return Err(SourceError::DuplicateUrl {
                url: doc.url_path.clone(),
                first: first.to_path_buf(),
                second: doc.source_path.clone(),
            });
        }
    }
    Ok(())
}
