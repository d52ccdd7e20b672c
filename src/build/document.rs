use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::util::title_case;

// =============================================================================
// Documents
// =============================================================================

/// A markdown document discovered in the input directory.
///
/// Documents are immutable once parsed; the render pipeline works on a
/// `ProcessingDocument` wrapper instead.
#[derive(Debug, Clone)]
pub struct Document {
    /// Path relative to the input directory (e.g., "posts/first-post.md")
    pub source_path: PathBuf,
    /// The URL path this document will be served at (e.g., "/posts/first-post/")
    pub url_path: String,
    /// Front matter metadata
    pub front_matter: FrontMatter,
    /// The markdown content without front matter
    pub raw_content: String,
}

/// Front matter metadata parsed from the document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrontMatter {
    /// Page title (can override filename-derived title)
    pub title: Option<String>,
    /// Page description for SEO/previews
    pub description: Option<String>,
    /// Publication date, `YYYY-MM-DD` or RFC 3339
    pub date: Option<String>,
    /// Template to wrap the page in (defaults to the configured layout)
    pub layout: Option<String>,
    /// Output URL override, e.g. "/about/" or "/feed.xml"
    pub permalink: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Navigation entry; required for collection membership
    pub navigation: Option<NavigationMeta>,
    /// Additional arbitrary metadata (available in templates at top level, e.g., `page.author`)
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

/// The `navigation` front matter block.
///
/// ```yaml
/// navigation:
///   key: Setup
///   parent: Guides
///   order: 2
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationMeta {
    /// Unique key other entries refer to as `parent` (defaults to the title)
    pub key: Option<String>,
    /// Link text (defaults to the key)
    pub title: Option<String>,
    /// Key of the parent entry
    pub parent: Option<String>,
    /// Position among siblings and within collections
    pub order: i64,
}

#[derive(thiserror::Error, Debug)]
pub enum FrontMatterError {
    #[error("invalid front matter: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result of parsing front matter from markdown content.
#[derive(Debug)]
pub struct ParsedContent {
    /// The parsed front matter (empty if none found)
    pub front_matter: FrontMatter,
    /// The markdown content without the front matter block
    pub content: String,
}

/// Parse front matter from markdown content.
///
/// Front matter is a YAML block delimited by `---` at the start of the file:
///
/// ```markdown
/// ---
/// title: My Page
/// navigation:
///   order: 1
/// ---
///
/// # Content starts here
/// ```
///
/// Malformed YAML, or a `navigation` block without an integer `order`,
/// is an error.
pub fn parse_front_matter(content: &str) -> Result<ParsedContent, FrontMatterError> {
    let content = content.trim_start_matches('\u{feff}').trim_start();

    if !content.starts_with("---") {
        return Ok(ParsedContent {
            front_matter: FrontMatter::default(),
            content: content.to_string(),
        });
    }

    let after_opening = &content[3..];
    let Some(closing_pos) = after_opening.find("\n---") else {
        // No closing delimiter found, treat entire content as markdown
        return Ok(ParsedContent {
            front_matter: FrontMatter::default(),
            content: content.to_string(),
        });
    };

    let yaml_content = after_opening[..closing_pos].trim_start_matches(['\r', '\n']);

    // "---" + yaml + "\n---"
    let markdown_start = 3 + closing_pos + 4;
    let markdown_content = if markdown_start < content.len() {
        content[markdown_start..]
            .trim_start_matches(['\r', '\n'])
            .to_string()
    } else {
        String::new()
    };

    let front_matter = if yaml_content.trim().is_empty() {
        FrontMatter::default()
    } else {
        serde_yaml::from_str(yaml_content)?
    };

    Ok(ParsedContent {
        front_matter,
        content: markdown_content,
    })
}

impl Document {
    /// Create a document from its path, URL and file contents.
    pub fn parse(
        source_path: PathBuf,
        url_path: String,
        raw: &str,
    ) -> Result<Self, FrontMatterError> {
        let parsed = parse_front_matter(raw)?;
        Ok(Self {
            source_path,
            url_path,
            front_matter: parsed.front_matter,
            raw_content: parsed.content,
        })
    }

    /// Get the document title, falling back to filename if not in front matter.
    pub fn title(&self) -> String {
        self.front_matter.title.clone().unwrap_or_else(|| {
            self.source_path
                .file_stem()
                .and_then(|s| s.to_str())
                .map(title_case)
                .unwrap_or_else(|| "Untitled".to_string())
        })
    }

    /// The navigation order, if the document has a `navigation` block.
    pub fn nav_order(&self) -> Option<i64> {
        self.front_matter.navigation.as_ref().map(|nav| nav.order)
    }

    /// The input-relative path with `/` separators, as matched by collection globs.
    pub fn glob_path(&self) -> String {
        self.source_path.to_string_lossy().replace('\\', "/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(path: &str, raw: &str) -> Document {
        Document::parse(PathBuf::from(path), "/x/".to_string(), raw).unwrap()
    }

    #[test]
    fn test_document_title_fallback() {
        let doc = doc("posts/getting-started.md", "Body");
        assert_eq!(doc.title(), "Getting Started");
    }

    #[test]
    fn test_document_title_from_front_matter() {
        let doc = doc("intro.md", "---\ntitle: Welcome\n---\nBody");
        assert_eq!(doc.title(), "Welcome");
    }

    #[test]
    fn test_parse_front_matter_basic() {
        let content = r#"---
title: My Page
description: A test page
date: 2024-03-01
---

# Hello World
"#;
        let parsed = parse_front_matter(content).unwrap();
        assert_eq!(parsed.front_matter.title, Some("My Page".to_string()));
        assert_eq!(
            parsed.front_matter.description,
            Some("A test page".to_string())
        );
        assert_eq!(parsed.front_matter.date, Some("2024-03-01".to_string()));
        assert_eq!(parsed.content.trim(), "# Hello World");
    }

    #[test]
    fn test_parse_navigation_block() {
        let content = "---\nnavigation:\n  key: Setup\n  parent: Guides\n  order: 3\n---\nBody";
        let parsed = parse_front_matter(content).unwrap();
        let nav = parsed.front_matter.navigation.unwrap();
        assert_eq!(nav.key.as_deref(), Some("Setup"));
        assert_eq!(nav.parent.as_deref(), Some("Guides"));
        assert_eq!(nav.order, 3);
    }

    #[test]
    fn test_navigation_without_order_is_an_error() {
        let content = "---\nnavigation:\n  key: Setup\n---\nBody";
        assert!(parse_front_matter(content).is_err());
    }

    #[test]
    fn test_navigation_order_must_be_integer() {
        let content = "---\nnavigation:\n  order: first\n---\nBody";
        assert!(parse_front_matter(content).is_err());
    }

    #[test]
    fn test_malformed_yaml_is_an_error() {
        let content = "---\ntitle: [unclosed\n---\nBody";
        assert!(parse_front_matter(content).is_err());
    }

    #[test]
    fn test_parse_front_matter_with_custom_fields() {
        let content = r#"---
title: Custom Page
author: Jane Doe
tags:
  - rust
  - notes
---

Content here
"#;
        let parsed = parse_front_matter(content).unwrap();
        assert_eq!(parsed.front_matter.tags, vec!["rust", "notes"]);
        assert!(parsed.front_matter.extra.contains_key("author"));
        assert!(!parsed.front_matter.extra.contains_key("tags"));
    }

    #[test]
    fn test_parse_front_matter_no_front_matter() {
        let content = "# Just Markdown\n\nNo front matter here.";
        let parsed = parse_front_matter(content).unwrap();
        assert_eq!(parsed.front_matter.title, None);
        assert!(parsed.content.starts_with("# Just Markdown"));
    }

    #[test]
    fn test_parse_front_matter_empty_front_matter() {
        let parsed = parse_front_matter("---\n---\n\n# Content").unwrap();
        assert_eq!(parsed.front_matter.title, None);
        assert!(parsed.content.starts_with("# Content"));
    }

    #[test]
    fn test_glob_path_uses_forward_slashes() {
        let doc = doc("posts/one.md", "Body");
        assert_eq!(doc.glob_path(), "posts/one.md");
        assert_eq!(doc.nav_order(), None);
    }
}
