//! File watching for automatic rebuilds.
//!
//! Uses `notify-debouncer-full` to watch the input directory, templates,
//! and the config file for changes. The output directory is ignored so a
//! rebuild never triggers another.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::time::Duration;

use notify::event::ModifyKind;
use notify::{
    Config as NotifyConfig, EventKind, PollWatcher, RecommendedWatcher, RecursiveMode, Watcher,
};
use notify_debouncer_full::{
    DebounceEventResult, Debouncer, RecommendedCache, new_debouncer, new_debouncer_opt,
};

use crate::config::WatchConfig;

// =============================================================================
// Errors
// =============================================================================

#[derive(thiserror::Error, Debug)]
pub enum WatchError {
    #[error("notify error: {0}")]
    Notify(#[from] notify::Error),
}

// =============================================================================
// Watch events
// =============================================================================

/// What kind of file changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeKind {
    /// A content document was created, modified or deleted.
    Document { path: PathBuf, deleted: bool },
    /// A layout, include, or icon changed.
    Template { path: PathBuf },
    /// Any other file under the input directory.
    Passthrough { path: PathBuf },
    /// The config file changed.
    Config,
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeKind::Document {
                path,
                deleted: true,
            } => write!(f, "deleted {}", path.display()),
            ChangeKind::Document { path, .. } => write!(f, "document {}", path.display()),
            ChangeKind::Template { path } => write!(f, "template {}", path.display()),
            ChangeKind::Passthrough { path } => write!(f, "asset {}", path.display()),
            ChangeKind::Config => f.write_str("config file"),
        }
    }
}

/// Events sent from the file watcher.
#[derive(Debug)]
pub enum WatchEvent {
    /// Files changed, rebuild needed.
    FilesChanged(Vec<ChangeKind>),
    /// Watcher error occurred.
    Error(String),
}

// =============================================================================
// Path classification
// =============================================================================

/// Paths to watch for changes.
#[derive(Debug, Clone)]
pub struct WatchPaths {
    pub input_dir: PathBuf,
    /// Ignored, even when inside the input directory.
    pub output_dir: PathBuf,
    pub templates_dir: PathBuf,
    pub config_path: PathBuf,
}

/// Classifies file paths into change types.
#[derive(Clone)]
pub struct PathClassifier {
    paths: WatchPaths,
}

impl PathClassifier {
    pub fn new(paths: WatchPaths) -> Self {
        Self { paths }
    }

    /// Classify a changed path into a ChangeKind.
    pub fn classify(&self, path: &Path, deleted: bool) -> Option<ChangeKind> {
        // Skip hidden files and directories
        if path
            .components()
            .any(|c| c.as_os_str().to_string_lossy().starts_with('.'))
        {
            return None;
        }

        if path.starts_with(&self.paths.output_dir) {
            return None;
        }

        if path == self.paths.config_path {
            return Some(ChangeKind::Config);
        }

        if path.starts_with(&self.paths.templates_dir) {
            return Some(ChangeKind::Template {
                path: path.to_path_buf(),
            });
        }

        if path.starts_with(&self.paths.input_dir) {
            let ext = path.extension().and_then(|e| e.to_str());
            return match ext {
                Some("md") | Some("markdown") => Some(ChangeKind::Document {
                    path: path.to_path_buf(),
                    deleted,
                }),
                _ => Some(ChangeKind::Passthrough {
                    path: path.to_path_buf(),
                }),
            };
        }

        None // Unknown path, ignore
    }
}

// =============================================================================
// File watcher
// =============================================================================

/// A file watcher that can use either native or polling backend.
pub enum FileWatcher {
    /// Native file system watcher (recommended for local development).
    Native {
        _debouncer: Debouncer<RecommendedWatcher, RecommendedCache>,
        rx: Receiver<WatchEvent>,
    },
    /// Polling-based watcher (for network filesystems, Docker, etc.).
    Polling {
        _debouncer: Debouncer<PollWatcher, RecommendedCache>,
        rx: Receiver<WatchEvent>,
    },
}

impl FileWatcher {
    /// Create a new file watcher.
    pub fn new(
        config: &WatchConfig,
        paths: &WatchPaths,
        classifier: PathClassifier,
    ) -> Result<Self, WatchError> {
        let debounce_timeout = Duration::from_millis(config.debounce_ms);

        let (tx, rx) = mpsc::channel();

        let callback = move |result: DebounceEventResult| {
            match result {
                Ok(events) => {
                    let changes: Vec<ChangeKind> = events
                        .iter()
                        .filter_map(|event| {
                            let deleted = matches!(event.kind, EventKind::Remove(_));
                            // Only process events for actual file changes
                            if !is_relevant_event(&event.kind) {
                                return None;
                            }
                            // Classify the first path (usually there's only one)
                            event
                                .paths
                                .first()
                                .and_then(|p| classifier.classify(p, deleted))
                        })
                        .collect();

                    if !changes.is_empty() {
                        let _ = tx.send(WatchEvent::FilesChanged(changes));
                    }
                }
                Err(errors) => {
                    for e in errors {
                        let _ = tx.send(WatchEvent::Error(e.to_string()));
                    }
                }
            }
        };

        if config.poll {
            // Use polling watcher
            let poll_interval = Duration::from_millis(config.poll_interval_ms);
            let notify_config = NotifyConfig::default().with_poll_interval(poll_interval);

            let mut debouncer = new_debouncer_opt::<_, PollWatcher, RecommendedCache>(
                debounce_timeout,
                None,
                callback,
                RecommendedCache::default(),
                notify_config,
            )
            .map_err(WatchError::Notify)?;

            add_watch_paths_to_debouncer(&mut debouncer, paths)?;

            Ok(FileWatcher::Polling {
                _debouncer: debouncer,
                rx,
            })
        } else {
            // Use native watcher
            let mut debouncer =
                new_debouncer(debounce_timeout, None, callback).map_err(WatchError::Notify)?;

            add_watch_paths_to_debouncer(&mut debouncer, paths)?;

            Ok(FileWatcher::Native {
                _debouncer: debouncer,
                rx,
            })
        }
    }

    /// Receive the next watch event (blocking).
    pub fn recv(&self) -> Option<WatchEvent> {
        match self {
            FileWatcher::Native { rx, .. } => rx.recv().ok(),
            FileWatcher::Polling { rx, .. } => rx.recv().ok(),
        }
    }
}

/// Add watch paths to a debouncer.
fn add_watch_paths_to_debouncer<W: Watcher, C: notify_debouncer_full::FileIdCache>(
    debouncer: &mut Debouncer<W, C>,
    paths: &WatchPaths,
) -> Result<(), WatchError> {
    if paths.input_dir.exists() {
        debouncer.watch(&paths.input_dir, RecursiveMode::Recursive)?;
    }

    // Templates normally live under the input directory
    if paths.templates_dir.exists() && !paths.templates_dir.starts_with(&paths.input_dir) {
        debouncer.watch(&paths.templates_dir, RecursiveMode::Recursive)?;
    }

    // Watch config file's parent directory (to catch config changes)
    if let Some(parent) = paths.config_path.parent()
        && parent.exists()
    {
        debouncer.watch(parent, RecursiveMode::NonRecursive)?;
    }

    Ok(())
}

/// Check if an event kind is relevant for rebuilds.
fn is_relevant_event(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_)
            | EventKind::Remove(_)
            | EventKind::Modify(ModifyKind::Data(_))
            | EventKind::Modify(ModifyKind::Name(_))
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> PathClassifier {
        PathClassifier::new(WatchPaths {
            input_dir: PathBuf::from("/site/src"),
            output_dir: PathBuf::from("/site/src/_site"),
            templates_dir: PathBuf::from("/site/src/_includes"),
            config_path: PathBuf::from("/site/lectern.yaml"),
        })
    }

    #[test]
    fn test_classify_document() {
        assert_eq!(
            classifier().classify(Path::new("/site/src/posts/a.md"), true),
            Some(ChangeKind::Document {
                path: PathBuf::from("/site/src/posts/a.md"),
                deleted: true,
            })
        );
    }

    #[test]
    fn test_classify_template_and_config() {
        let classifier = classifier();
        assert!(matches!(
            classifier.classify(Path::new("/site/src/_includes/base.html"), false),
            Some(ChangeKind::Template { .. })
        ));
        assert!(matches!(
            classifier.classify(Path::new("/site/src/_includes/icons/star.svg"), false),
            Some(ChangeKind::Template { .. })
        ));
        assert_eq!(
            classifier.classify(Path::new("/site/lectern.yaml"), false),
            Some(ChangeKind::Config)
        );
    }

    #[test]
    fn test_change_kind_display() {
        let deleted = ChangeKind::Document {
            path: PathBuf::from("/site/src/a.md"),
            deleted: true,
        };
        assert_eq!(deleted.to_string(), "deleted /site/src/a.md");
        let template = ChangeKind::Template {
            path: PathBuf::from("/site/src/_includes/base.html"),
        };
        assert_eq!(template.to_string(), "template /site/src/_includes/base.html");
        assert_eq!(ChangeKind::Config.to_string(), "config file");
    }

    #[test]
    fn test_classify_passthrough() {
        assert!(matches!(
            classifier().classify(Path::new("/site/src/css/site.css"), false),
            Some(ChangeKind::Passthrough { .. })
        ));
    }

    #[test]
    fn test_output_and_hidden_paths_are_ignored() {
        let classifier = classifier();
        assert_eq!(
            classifier.classify(Path::new("/site/src/_site/index.html"), false),
            None
        );
        assert_eq!(
            classifier.classify(Path::new("/site/src/.git/HEAD"), false),
            None
        );
        assert_eq!(classifier.classify(Path::new("/site/README.md"), false), None);
    }

    #[test]
    fn test_relevant_events() {
        use notify::event::{CreateKind, DataChange, MetadataKind};

        assert!(is_relevant_event(&EventKind::Create(CreateKind::File)));
        assert!(is_relevant_event(&EventKind::Modify(ModifyKind::Data(
            DataChange::Content
        ))));
        assert!(!is_relevant_event(&EventKind::Modify(ModifyKind::Metadata(
            MetadataKind::Any
        ))));
    }
}
