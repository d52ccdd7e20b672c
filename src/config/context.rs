//! Per-invocation build context.
//!
//! The environment is read exactly once, at process entry, into an immutable
//! [`BuildContext`] that is passed by reference to every component that needs
//! the path prefix or the production flag.

use serde::Serialize;

/// Read-only settings for one build invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildContext {
    /// URL prefix for generated links, always starting and ending with `/`
    pub path_prefix: String,
    /// Production builds minify HTML
    pub production: bool,
    /// Set by `serve`
    pub dev: bool,
    /// Templates inject the live reload client when set
    pub live_reload: bool,
    pub version: String,
}

impl BuildContext {
    /// Build the context from `NODE_ENV` and `PATH_PREFIX`.
    pub fn from_env() -> Self {
        let node_env = std::env::var("NODE_ENV").ok();
        let path_prefix = std::env::var("PATH_PREFIX").ok();
        Self::from_vars(node_env.as_deref(), path_prefix.as_deref())
    }

    /// Build the context from explicit values (as they would appear in the environment).
    pub fn from_vars(node_env: Option<&str>, path_prefix: Option<&str>) -> Self {
        Self {
            path_prefix: normalize_prefix(path_prefix.unwrap_or("/")),
            production: node_env.is_some_and(|env| env.trim() == "production"),
            dev: false,
            live_reload: false,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Mark this context as a dev server build.
    pub fn with_dev_mode(mut self, live_reload: bool) -> Self {
        self.dev = true;
        self.live_reload = live_reload;
        self
    }

    /// Prefix a root-relative URL with the path prefix.
    ///
    /// Relative, protocol-relative and absolute URLs are returned unchanged.
    pub fn url(&self, url: &str) -> String {
        if !url.starts_with('/') || url.starts_with("//") {
            return url.to_string();
        }
        if self.path_prefix == "/" {
            return url.to_string();
        }
        format!("{}{}", self.path_prefix.trim_end_matches('/'), url)
    }
}

impl Default for BuildContext {
    fn default() -> Self {
        Self::from_vars(None, None)
    }
}

/// "blog" -> "/blog/", "" -> "/"
fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{}/", trimmed)
    }
}
