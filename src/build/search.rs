//! Post-build search indexing.
//!
//! The built-in backend runs pagefind in process. Setting `search.command`
//! runs an external indexer instead, invoked as
//! `<command...> --site <output> --glob <glob>`. Either way a failure fails
//! the build.

use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobMatcher};
use walkdir::WalkDir;

use pagefind::api::PagefindIndex;
use pagefind::options::PagefindServiceConfig;
use tokio::process::Command;

use crate::config::SearchConfig;

#[derive(thiserror::Error, Debug)]
pub enum SearchError {
    #[error("failed to create search index: {0}")]
    IndexCreation(String),

    #[error("failed to index directory: {0}")]
    Indexing(String),

    #[error("failed to write search files: {0}")]
    WriteFiles(String),

    #[error("invalid search glob '{glob}': {source}")]
    Glob {
        glob: String,
        source: globset::Error,
    },

    #[error("failed to read search manifest {path}: {message}")]
    Manifest { path: PathBuf, message: String },

    #[error("search index covers {indexed} of {expected} HTML page(s); pages without the '{root_selector}' element are skipped")]
    Incomplete {
        indexed: usize,
        expected: usize,
        root_selector: String,
    },

    #[error("failed to start search indexer '{command}': {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[error("search indexer '{command}' exited with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: std::process::ExitStatus,
        stderr: String,
    },
}

/// Index the output directory.
///
/// Returns the number of indexed pages, or `None` when an external command
/// did the indexing.
pub async fn build_search_index(
    output_dir: &Path,
    config: &SearchConfig,
) -> Result<Option<usize>, SearchError> {
    match &config.command {
        Some(command) => {
            run_command(command, output_dir, &config.glob).await?;
            Ok(None)
        }
        None => run_pagefind(output_dir, config).await.map(Some),
    }
}

async fn run_pagefind(output_dir: &Path, config: &SearchConfig) -> Result<usize, SearchError> {
    let builder = PagefindServiceConfig::builder()
        .keep_index_url(false) // Strip index.html from URLs
        .root_selector(config.root_selector.clone())
        .exclude_selectors(config.exclude_selectors.clone());
    let service_config = match &config.force_language {
        Some(language) => builder.force_language(language.clone()).build(),
        None => builder.build(),
    };

    let bundle_dir = output_dir.join(&config.bundle_dir);
    let expected = count_pages(output_dir, &bundle_dir, &config.glob)?;

    let mut index = PagefindIndex::new(Some(service_config))
        .map_err(|e| SearchError::IndexCreation(e.to_string()))?;

    let output_dir_str = output_dir.to_string_lossy().to_string();
    index
        .add_directory(output_dir_str, Some(config.glob.clone()))
        .await
        .map_err(|e| SearchError::Indexing(e.to_string()))?;

    index
        .write_files(Some(bundle_dir.to_string_lossy().to_string()))
        .await
        .map_err(|e| SearchError::WriteFiles(e.to_string()))?;

    // Files pagefind reads but cannot index still count as added, so the
    // written manifest is the source of truth
    let indexed = indexed_page_count(&bundle_dir).await?;
    if indexed < expected {
        return Err(SearchError::Incomplete {
            indexed,
            expected,
            root_selector: config.root_selector.clone(),
        });
    }

    Ok(indexed)
}

/// HTML files under `output_dir` matching `glob`, outside the bundle directory.
fn count_pages(output_dir: &Path, bundle_dir: &Path, glob: &str) -> Result<usize, SearchError> {
    let matcher: GlobMatcher = GlobBuilder::new(glob)
        .literal_separator(true)
        .build()
        .map_err(|e| SearchError::Glob {
            glob: glob.to_string(),
            source: e,
        })?
        .compile_matcher();

    let count = WalkDir::new(output_dir)
        .into_iter()
        .filter_entry(|e| e.path() != bundle_dir)
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .strip_prefix(output_dir)
                .is_ok_and(|relative| matcher.is_match(relative))
        })
        .count();
    Ok(count)
}

/// Sum of `page_count` over every language in `pagefind-entry.json`.
async fn indexed_page_count(bundle_dir: &Path) -> Result<usize, SearchError> {
    let path = bundle_dir.join("pagefind-entry.json");
    let manifest_err = |message: String| SearchError::Manifest {
        path: path.clone(),
        message,
    };

    let raw = tokio::fs::read_to_string(&path)
        .await
        .map_err(|e| manifest_err(e.to_string()))?;
    let entry: serde_json::Value =
        serde_json::from_str(&raw).map_err(|e| manifest_err(e.to_string()))?;

    let count = entry
        .get("languages")
        .and_then(|languages| languages.as_object())
        .map(|languages| {
            languages
                .values()
                .filter_map(|language| language.get("page_count")?.as_u64())
                .sum::<u64>()
        })
        .unwrap_or(0);
    Ok(count as usize)
}

async fn run_command(command: &[String], output_dir: &Path, glob: &str) -> Result<(), SearchError> {
    let shown = command.join(" ");
    // An empty command is rejected when the config is loaded
    let Some((program, args)) = command.split_first() else {
        return Err(SearchError::Spawn {
            command: shown,
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty command"),
        });
    };

    tracing::debug!("running search indexer: {}", shown);
    let output = Command::new(program)
        .args(args)
        .arg("--site")
        .arg(output_dir)
        .arg("--glob")
        .arg(glob)
        .output()
        .await
        .map_err(|e| SearchError::Spawn {
            command: shown.clone(),
            source: e,
        })?;

    if !output.status.success() {
        return Err(SearchError::CommandFailed {
            command: shown,
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    for line in stdout.lines().filter(|l| !l.trim().is_empty()) {
        tracing::debug!("[search] {}", line);
    }
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn command_config(script: &str) -> SearchConfig {
        SearchConfig {
            command: Some(vec![
                "sh".to_string(),
                "-c".to_string(),
                script.to_string(),
                "indexer".to_string(),
            ]),
            ..SearchConfig::default()
        }
    }

    #[tokio::test]
    async fn test_command_receives_site_and_glob() {
        let dir = tempfile::tempdir().unwrap();
        let config = command_config("echo \"$@\" > \"$2/args.txt\"");

        let result = build_search_index(dir.path(), &config).await.unwrap();
        assert_eq!(result, None);

        let args = std::fs::read_to_string(dir.path().join("args.txt")).unwrap();
        assert_eq!(
            args.trim(),
            format!("--site {} --glob **/*.html", dir.path().display())
        );
    }

    #[tokio::test]
    async fn test_command_failure_surfaces_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let config = command_config("echo 'index exploded' >&2; exit 3");

        let err = build_search_index(dir.path(), &config).await.unwrap_err();
        match err {
            SearchError::CommandFailed { status, stderr, .. } => {
                assert_eq!(status.code(), Some(3));
                assert_eq!(stderr, "index exploded");
            }
            other => panic!("expected CommandFailed, got {other:?}"),
        }
    }

    #[test]
    fn test_count_pages_skips_bundle_and_non_html() {
        let dir = tempfile::tempdir().unwrap();
        for path in ["index.html", "posts/a/index.html", "pagefind/ui.html", "css/site.css"] {
            let full = dir.path().join(path);
            std::fs::create_dir_all(full.parent().unwrap()).unwrap();
            std::fs::write(full, "<html></html>").unwrap();
        }

        let count = count_pages(dir.path(), &dir.path().join("pagefind"), "**/*.html").unwrap();
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = SearchConfig {
            command: Some(vec!["lectern-no-such-indexer".to_string()]),
            ..SearchConfig::default()
        };

        let err = build_search_index(dir.path(), &config).await.unwrap_err();
        assert!(matches!(err, SearchError::Spawn { .. }));
    }
}
