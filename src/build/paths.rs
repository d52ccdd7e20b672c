//! Path and URL conversion utilities.
//!
//! This module handles conversions between:
//! - Source file paths (relative to the input directory)
//! - URL paths (the URL at which content will be served, before the path prefix)
//! - Output file paths (where files are written in the output directory)

use std::path::{Path, PathBuf};

/// Convert a markdown file path to a URL path.
///
/// URLs are directory-style and always end with `/`.
///
/// # Examples
/// ```ignore
/// source_path_to_url("about.md") => "/about/"
/// source_path_to_url("posts/first-post.md") => "/posts/first-post/"
/// source_path_to_url("posts/index.md") => "/posts/"
/// source_path_to_url("index.md") => "/"
/// ```
pub fn source_path_to_url(path: &Path) -> String {
    let path_str = path.with_extension("").to_string_lossy().replace('\\', "/");

    // Index files become the directory URL
    let path_str = if path_str == "index" {
        ""
    } else {
        path_str.strip_suffix("/index").unwrap_or(&path_str)
    };

    if path_str.is_empty() {
        "/".to_string()
    } else {
        format!("/{}/", path_str.trim_matches('/'))
    }
}

/// Normalize a front matter `permalink` into a URL path.
///
/// Returns `None` for permalinks with `..` segments, which would be written
/// outside the output directory.
///
/// ```ignore
/// permalink_to_url("about") => Some("/about/")
/// permalink_to_url("/feed.xml") => Some("/feed.xml")
/// permalink_to_url("../../x.html") => None
/// ```
pub fn permalink_to_url(permalink: &str) -> Option<String> {
    let trimmed = permalink.trim().trim_start_matches('/');
    if trimmed.split(['/', '\\']).any(|segment| segment == "..") {
        return None;
    }
    if trimmed.is_empty() {
        return Some("/".to_string());
    }
    let last = trimmed.rsplit('/').next().unwrap_or(trimmed);
    if trimmed.ends_with('/') || last.contains('.') {
        Some(format!("/{}", trimmed))
    } else {
        Some(format!("/{}/", trimmed))
    }
}

/// Whether a URL names an HTML page rather than some other file (e.g. `/feed.xml`).
pub fn is_html_page(url: &str) -> bool {
    url.ends_with('/') || url.ends_with(".html") || url.ends_with(".htm")
}

/// Convert a URL path to an output file path.
///
/// Directory URLs become `path/index.html`; URLs naming a file keep it.
///
/// # Examples
/// ```ignore
/// url_to_output_path("/posts/first/", output_dir) => output_dir/posts/first/index.html
/// url_to_output_path("/", output_dir) => output_dir/index.html
/// url_to_output_path("/feed.xml", output_dir) => output_dir/feed.xml
/// ```
pub fn url_to_output_path(url_path: &str, output_dir: &Path) -> PathBuf {
    let url_path = url_path.trim_start_matches('/');

    if url_path.is_empty() {
        return output_dir.join("index.html");
    }

    let last = url_path.rsplit('/').next().unwrap_or(url_path);
    if !url_path.ends_with('/') && last.contains('.') {
        output_dir.join(url_path)
    } else {
        output_dir.join(url_path.trim_end_matches('/')).join("index.html")
    }
}

/// Get the base path from a config file path (its parent directory).
pub fn base_path_from_config(config_path: &Path) -> PathBuf {
    config_path
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Resolve a configured path against the base path unless it is absolute.
pub fn resolve_against(base_path: &Path, path: &Path) -> PathBuf {
    if path.is_relative() {
        base_path.join(path)
    } else {
        path.to_path_buf()
    }
}
