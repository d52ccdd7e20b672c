//! Markdown rendering with syntax highlighting, heading anchors and TOC extraction.
//!
//! Raw HTML in the source is passed through untouched.

use std::collections::HashSet;

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd, html};

use super::highlight::SyntaxHighlighter;
use super::render::TocEntry;
use crate::config::MarkdownConfig;
use crate::util::{html_escape, slugify};

#[derive(thiserror::Error, Debug)]
pub enum MarkdownError {
    #[error("invalid markdown extension: {0}")]
    InvalidExtension(String),
}

/// Result of rendering markdown, containing both HTML and table of contents.
pub struct MarkdownOutput {
    pub html: String,
    pub toc: Vec<TocEntry>,
}

/// A heading being collected until its end tag.
struct HeadingState<'a> {
    level: HeadingLevel,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<(String, Option<String>)>,
    /// Inline events inside the heading
    inner: Vec<Event<'a>>,
    /// Plain text, for the slug and the TOC
    text: String,
}

struct CodeBlockState {
    language: String,
    content: String,
}

/// Render markdown to HTML using pulldown-cmark with syntax highlighting.
///
/// Every heading gets a unique id and a permalink anchor using the configured
/// symbol and class.
pub fn render_markdown(
    markdown: &str,
    highlighter: &SyntaxHighlighter,
    markdown_config: &MarkdownConfig,
) -> Result<MarkdownOutput, MarkdownError> {
    let options = parse_options(&markdown_config.extensions)?;
    let parser = Parser::new_ext(markdown, options);

    let mut events: Vec<Event> = Vec::new();
    let mut code_block: Option<CodeBlockState> = None;
    let mut heading: Option<HeadingState> = None;
    let mut used_ids: HashSet<String> = HashSet::new();
    let mut toc: Vec<TocEntry> = Vec::new();

    for event in parser {
        match event {
            Event::Start(Tag::CodeBlock(kind)) => {
                code_block = Some(CodeBlockState {
                    language: match kind {
                        CodeBlockKind::Fenced(info) => fence_language(&info).to_string(),
                        CodeBlockKind::Indented => String::new(),
                    },
                    content: String::new(),
                });
            }
            Event::End(TagEnd::CodeBlock) => {
                if let Some(block) = code_block.take() {
                    let highlighted = highlighter.highlight(&block.content, &block.language);
                    events.push(Event::Html(highlighted.into()));
                }
            }
            Event::Text(text) if code_block.is_some() => {
                if let Some(block) = code_block.as_mut() {
                    block.content.push_str(&text);
                }
            }
            Event::Start(Tag::Heading {
                level,
                id,
                classes,
                attrs,
            }) => {
                heading = Some(HeadingState {
                    level,
                    id: id.map(|id| id.to_string()),
                    classes: classes.iter().map(|c| c.to_string()).collect(),
                    attrs: attrs
                        .iter()
                        .map(|(k, v)| (k.to_string(), v.as_ref().map(|v| v.to_string())))
                        .collect(),
                    inner: Vec::new(),
                    text: String::new(),
                });
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some(state) = heading.take() {
                    let rendered =
                        finish_heading(state, &mut used_ids, &mut toc, markdown_config);
                    events.push(Event::Html(rendered.into()));
                }
            }
            other => match heading.as_mut() {
                Some(state) => {
                    if let Event::Text(text) | Event::Code(text) = &other {
                        state.text.push_str(text);
                    }
                    state.inner.push(other);
                }
                None => events.push(other),
            },
        }
    }

    let mut html_output = String::new();
    html::push_html(&mut html_output, events.into_iter());

    Ok(MarkdownOutput {
        html: html_output,
        toc,
    })
}

fn parse_options(extensions: &[String]) -> Result<Options, MarkdownError> {
    let mut options = Options::empty();
    for extension in extensions {
        match extension.as_str() {
            "definition_lists" => options.insert(Options::ENABLE_DEFINITION_LIST),
            "footnotes" => options.insert(Options::ENABLE_FOOTNOTES),
            "gfm" => options.insert(Options::ENABLE_GFM),
            "heading_attributes" => options.insert(Options::ENABLE_HEADING_ATTRIBUTES),
            "smart_punctuation" => options.insert(Options::ENABLE_SMART_PUNCTUATION),
            "strikethrough" => options.insert(Options::ENABLE_STRIKETHROUGH),
            "tables" => options.insert(Options::ENABLE_TABLES),
            "tasklists" => options.insert(Options::ENABLE_TASKLISTS),
            other => return Err(MarkdownError::InvalidExtension(other.to_string())),
        }
    }
    Ok(options)
}

/// "rust,ignore" -> "rust"
fn fence_language(info: &str) -> &str {
    info.split([',', ' ']).next().unwrap_or("").trim()
}

/// Emit a heading with its id and permalink anchor, recording it in the TOC.
fn finish_heading(
    state: HeadingState,
    used_ids: &mut HashSet<String>,
    toc: &mut Vec<TocEntry>,
    config: &MarkdownConfig,
) -> String {
    let id = match state.id {
        Some(id) => id,
        None => unique_id(&state.text, used_ids),
    };
    used_ids.insert(id.clone());

    toc.push(TocEntry {
        text: state.text.clone(),
        id: id.clone(),
        level: state.level as u8,
    });

    let class_attr = if state.classes.is_empty() {
        String::new()
    } else {
        format!(" class=\"{}\"", html_escape(&state.classes.join(" ")))
    };

    let extra_attrs: String = state
        .attrs
        .iter()
        .map(|(k, v)| match v {
            Some(val) => format!(" {}=\"{}\"", k, html_escape(val)),
            None => format!(" {}", k),
        })
        .collect();

    let mut inner_html = String::new();
    html::push_html(&mut inner_html, state.inner.into_iter());

    let id = html_escape(&id);
    format!(
        "<h{level} id=\"{id}\"{class_attr}{extra_attrs}>{inner_html} <a class=\"{class}\" href=\"#{id}\" aria-hidden=\"true\">{symbol}</a></h{level}>\n",
        level = state.level as usize,
        class = html_escape(&config.anchor_class),
        symbol = html_escape(&config.anchor_symbol),
    )
}

/// Slug the heading text, suffixing `-1`, `-2`, ... on collisions.
fn unique_id(text: &str, used_ids: &HashSet<String>) -> String {
    let mut base = slugify(text);
    if base.is_empty() {
        base = "section".to_string();
    }

    let mut id = base.clone();
    let mut suffix = 1;
    while used_ids.contains(&id) {
        id = format!("{}-{}", base, suffix);
        suffix += 1;
    }
    id
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(markdown: &str) -> MarkdownOutput {
        render_markdown(
            markdown,
            &SyntaxHighlighter::default(),
            &MarkdownConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_render_basic_markdown() {
        let output = render("# Hello\n\nWorld");

        assert!(output.html.contains("<p>World</p>"));
        assert_eq!(output.toc.len(), 1);
        assert_eq!(output.toc[0].text, "Hello");
        assert_eq!(output.toc[0].level, 1);
    }

    #[test]
    fn test_heading_anchor() {
        let output = render("## Getting Started");
        assert_eq!(
            output.html.trim(),
            "<h2 id=\"getting-started\">Getting Started <a class=\"header-anchor\" href=\"#getting-started\" aria-hidden=\"true\">#</a></h2>"
        );
    }

    #[test]
    fn test_custom_anchor_symbol_and_class() {
        let config = MarkdownConfig {
            anchor_symbol: "¶".to_string(),
            anchor_class: "permalink".to_string(),
            ..MarkdownConfig::default()
        };
        let output = render_markdown("# Title", &SyntaxHighlighter::default(), &config).unwrap();
        assert!(output.html.contains("<a class=\"permalink\" href=\"#title\""));
        assert!(output.html.contains(">¶</a>"));
    }

    #[test]
    fn test_duplicate_headings_get_unique_ids() {
        let output = render("## Setup\n\n## Setup\n\n## Setup");
        let ids: Vec<&str> = output.toc.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["setup", "setup-1", "setup-2"]);
    }

    #[test]
    fn test_heading_with_inline_code() {
        let output = render("## The `order` field");
        assert!(output.html.contains("The <code>order</code> field"));
        assert_eq!(output.toc[0].id, "the-order-field");
    }

    #[test]
    fn test_explicit_heading_id() {
        let output = render("## Install {#setup}");
        assert_eq!(output.toc[0].id, "setup");
        assert!(output.html.contains("<h2 id=\"setup\">"));
    }

    #[test]
    fn test_raw_html_passthrough() {
        let output = render("<div class=\"callout\">Note</div>\n\nText with <kbd>Ctrl</kbd>");
        assert!(output.html.contains("<div class=\"callout\">Note</div>"));
        assert!(output.html.contains("<kbd>Ctrl</kbd>"));
    }

    #[test]
    fn test_render_code_block() {
        let output = render("```rust\nlet x = 1;\n```");
        assert!(output.html.contains("let"));
        assert!(output.html.contains("<pre"));
    }

    #[test]
    fn test_fence_language() {
        assert_eq!(fence_language("rust,ignore"), "rust");
        assert_eq!(fence_language("js title=x"), "js");
        assert_eq!(fence_language(""), "");
    }

    #[test]
    fn test_invalid_extension() {
        let config = MarkdownConfig {
            extensions: vec!["not_a_real_extension".to_string()],
            ..MarkdownConfig::default()
        };

        let result = render_markdown("# Test", &SyntaxHighlighter::default(), &config);
        assert!(result.is_err());
    }
}
