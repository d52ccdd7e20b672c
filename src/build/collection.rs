//! Ordered document collections.
//!
//! A collection selects documents by a glob over their input-relative path and
//! orders them by `navigation.order`. The sort is stable: documents with equal
//! orders keep their discovery order (lexicographic by source path).

use std::collections::BTreeMap;
use std::path::PathBuf;

use globset::{GlobBuilder, GlobMatcher};

use crate::config::CollectionConfig;

use super::document::Document;

#[derive(thiserror::Error, Debug)]
pub enum CollectionError {
    #[error("collection '{collection}': invalid glob '{glob}': {source}")]
    InvalidGlob {
        collection: String,
        glob: String,
        source: globset::Error,
    },

    #[error(
        "collection '{collection}': {path} has no navigation order (add `navigation: {{ order: <n> }}` to its front matter)"
    )]
    MissingOrder { collection: String, path: PathBuf },
}

/// An ordered view over the documents matching a glob.
#[derive(Debug, Clone)]
pub struct Collection<'a> {
    pub name: String,
    /// Matching documents, ascending by navigation order
    pub documents: Vec<&'a Document>,
}

/// Build one collection from the discovered documents.
///
/// Fails if the glob is invalid, or if any matching document lacks a
/// navigation order. Missing orders are never defaulted or skipped.
pub fn build_collection<'a>(
    config: &CollectionConfig,
    documents: &'a [Document],
) -> Result<Collection<'a>, CollectionError> {
    let matcher = compile_glob(config)?;

    let mut entries: Vec<(i64, &'a Document)> = documents
        .iter()
        .filter(|doc| matcher.is_match(doc.glob_path()))
        .map(|doc| {
            doc.nav_order()
                .map(|order| (order, doc))
                .ok_or_else(|| CollectionError::MissingOrder {
                    collection: config.name.clone(),
                    path: doc.source_path.clone(),
                })
        })
        .collect::<Result<_, _>>()?;

    // `sort_by_key` is stable
    entries.sort_by_key(|(order, _)| *order);

    Ok(Collection {
        name: config.name.clone(),
        documents: entries.into_iter().map(|(_, doc)| doc).collect(),
    })
}

/// Build every configured collection, keyed by name.
pub fn build_collections<'a>(
    configs: &[CollectionConfig],
    documents: &'a [Document],
) -> Result<BTreeMap<String, Collection<'a>>, CollectionError> {
    configs
        .iter()
        .map(|config| {
            let collection = build_collection(config, documents)?;
            tracing::debug!(
                "collection '{}': {} document(s)",
                collection.name,
                collection.documents.len()
            );
            Ok((config.name.clone(), collection))
        })
        .collect()
}

fn compile_glob(config: &CollectionConfig) -> Result<GlobMatcher, CollectionError> {
    // `*` stays within one path segment; `**` crosses directories
    GlobBuilder::new(&config.glob)
        .literal_separator(true)
        .build()
        .map(|glob| glob.compile_matcher())
        .map_err(|e| CollectionError::InvalidGlob {
            collection: config.name.clone(),
            glob: config.glob.clone(),
            source: e,
        })
}
