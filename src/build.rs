mod builder;
mod collection;
mod document;
mod filters;
pub mod format;
mod highlight;
mod markdown;
mod minify;
mod nav;
mod passthrough;
mod paths;
pub mod pipeline;
mod render;
mod search;
pub mod shortcodes;
pub mod source;
mod watch;

pub use builder::{BuildResult, Builder};
pub use paths::{base_path_from_config, resolve_against};
pub use pipeline::LIVE_RELOAD_PATH;
pub use watch::{ChangeKind, FileWatcher, PathClassifier, WatchEvent, WatchPaths};
