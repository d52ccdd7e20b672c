//! Async shortcodes.
//!
//! Content calls shortcodes as `{{< name arg "quoted arg" >}}`, or for paired
//! shortcodes `{{< name >}}body{{< /name >}}`. Every top-level call in a
//! document is evaluated concurrently, then the results are spliced back in
//! place, wrapped in a tera `raw` block so the template stage leaves them
//! alone.
//!
//! Templates reach the same shortcodes as tera functions, e.g.
//! `{{ icon(name=page.icon) }}` or `{{ markdown(body=page.summary) }}`, so
//! layouts can pass template values as arguments.

use std::collections::HashMap;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, try_join_all};
use regex::Regex;
use tera::{Tera, Value};

use super::highlight::SyntaxHighlighter;
use super::markdown::{MarkdownError, render_markdown};
use crate::config::MarkdownConfig;

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{<\s*(/)?\s*([A-Za-z_][A-Za-z0-9_-]*)(.*?)>\}\}")
        .expect("Invalid shortcode tag regex")
});

#[derive(thiserror::Error, Debug)]
pub enum ShortcodeError {
    #[error("unknown shortcode '{0}'")]
    Unknown(String),

    #[error("shortcode '{0}' is never closed")]
    Unclosed(String),

    #[error("closing tag for '{0}' has no matching opening tag")]
    UnexpectedClose(String),

    #[error("shortcode '{shortcode}': {message}")]
    InvalidArgument { shortcode: String, message: String },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Markdown(#[from] MarkdownError),
}

/// Resources shortcodes may use.
#[derive(Clone, Copy)]
pub struct ShortcodeContext<'a> {
    /// Directory holding `<name>.svg` files for `icon`
    pub icons_dir: &'a Path,
    pub highlighter: &'a SyntaxHighlighter,
    pub markdown_config: &'a MarkdownConfig,
}

/// A markup producer callable from content.
pub trait Shortcode: Send + Sync {
    fn name(&self) -> &'static str;

    /// Paired shortcodes take a body and require a closing tag.
    fn paired(&self) -> bool {
        false
    }

    fn call<'a>(
        &'a self,
        args: &'a [String],
        body: Option<&'a str>,
        ctx: &'a ShortcodeContext<'a>,
    ) -> BoxFuture<'a, Result<String, ShortcodeError>>;
}

/// `{{< icon name >}}` - the trimmed contents of `<icons_dir>/<name>.svg`.
pub struct IconShortcode;

impl Shortcode for IconShortcode {
    fn name(&self) -> &'static str {
        "icon"
    }

    fn call<'a>(
        &'a self,
        args: &'a [String],
        _body: Option<&'a str>,
        ctx: &'a ShortcodeContext<'a>,
    ) -> BoxFuture<'a, Result<String, ShortcodeError>> {
        async move {
            let [name] = args else {
                return Err(invalid_argument(
                    self.name(),
                    format!("expected one icon name, got {} argument(s)", args.len()),
                ));
            };
            let path = icon_path(ctx.icons_dir, name)?;
            let svg = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| ShortcodeError::Io { path, source: e })?;
            Ok(svg.trim().to_string())
        }
        .boxed()
    }
}

/// `<icons_dir>/<name>.svg`, refusing names that leave the directory.
fn icon_path(icons_dir: &Path, name: &str) -> Result<PathBuf, ShortcodeError> {
    if name.is_empty() || name.contains(['/', '\\']) || name.contains("..") {
        return Err(invalid_argument(
            "icon",
            format!("invalid icon name '{name}'"),
        ));
    }
    Ok(icons_dir.join(format!("{name}.svg")))
}

/// `{{< markdown >}}...{{< /markdown >}}` - the body rendered as markdown.
pub struct MarkdownShortcode;

impl Shortcode for MarkdownShortcode {
    fn name(&self) -> &'static str {
        "markdown"
    }

    fn paired(&self) -> bool {
        true
    }

    fn call<'a>(
        &'a self,
        _args: &'a [String],
        body: Option<&'a str>,
        ctx: &'a ShortcodeContext<'a>,
    ) -> BoxFuture<'a, Result<String, ShortcodeError>> {
        let result = render_fragment(
            body.unwrap_or_default(),
            ctx.highlighter,
            ctx.markdown_config,
        );
        futures_util::future::ready(result).boxed()
    }
}

fn render_fragment(
    body: &str,
    highlighter: &SyntaxHighlighter,
    markdown_config: &MarkdownConfig,
) -> Result<String, ShortcodeError> {
    let output = render_markdown(body, highlighter, markdown_config)?;
    Ok(output.html.trim_end().to_string())
}

fn invalid_argument(shortcode: &str, message: String) -> ShortcodeError {
    ShortcodeError::InvalidArgument {
        shortcode: shortcode.to_string(),
        message,
    }
}

// =============================================================================
// Template functions
// =============================================================================

/// Register `icon(name=...)` and `markdown(body=...)` on `tera`.
///
/// Template rendering is synchronous, so the icon is read with blocking I/O.
pub fn register_functions(
    tera: &mut Tera,
    icons_dir: &Path,
    highlighter: &SyntaxHighlighter,
    markdown_config: &MarkdownConfig,
) {
    tera.register_function(
        "icon",
        IconFunction {
            icons_dir: icons_dir.to_path_buf(),
        },
    );
    tera.register_function(
        "markdown",
        MarkdownFunction {
            highlighter: highlighter.clone(),
            markdown_config: markdown_config.clone(),
        },
    );
}

fn string_arg<'v>(
    args: &'v HashMap<String, Value>,
    function: &str,
    key: &str,
) -> tera::Result<&'v str> {
    args.get(key).and_then(Value::as_str).ok_or_else(|| {
        tera::Error::msg(format!(
            "function `{function}` expects a string argument `{key}`"
        ))
    })
}

struct IconFunction {
    icons_dir: PathBuf,
}

impl tera::Function for IconFunction {
    fn call(&self, args: &HashMap<String, Value>) -> tera::Result<Value> {
        let name = string_arg(args, "icon", "name")?;
        let path = icon_path(&self.icons_dir, name).map_err(|e| tera::Error::msg(e.to_string()))?;
        let svg = std::fs::read_to_string(&path).map_err(|e| {
            tera::Error::msg(ShortcodeError::Io { path, source: e }.to_string())
        })?;
        Ok(Value::String(svg.trim().to_string()))
    }

    fn is_safe(&self) -> bool {
        true
    }
}

struct MarkdownFunction {
    highlighter: SyntaxHighlighter,
    markdown_config: MarkdownConfig,
}

impl tera::Function for MarkdownFunction {
    fn call(&self, args: &HashMap<String, Value>) -> tera::Result<Value> {
        let body = string_arg(args, "markdown", "body")?;
        render_fragment(body, &self.highlighter, &self.markdown_config)
            .map(Value::String)
            .map_err(|e| tera::Error::msg(e.to_string()))
    }

    fn is_safe(&self) -> bool {
        true
    }
}

/// Shortcodes by name. Later registrations shadow earlier ones.
pub struct ShortcodeRegistry {
    shortcodes: Vec<Box<dyn Shortcode>>,
}

impl ShortcodeRegistry {
    pub fn new() -> Self {
        Self {
            shortcodes: Vec::new(),
        }
    }

    /// `icon` and `markdown`.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(IconShortcode);
        registry.register(MarkdownShortcode);
        registry
    }

    pub fn register<S: Shortcode + 'static>(&mut self, shortcode: S) {
        self.shortcodes.push(Box::new(shortcode));
    }

    pub fn get(&self, name: &str) -> Option<&dyn Shortcode> {
        self.shortcodes
            .iter()
            .rev()
            .find(|s| s.name() == name)
            .map(|s| s.as_ref())
    }
}

impl Default for ShortcodeRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// A top-level shortcode call found in content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortcodeCall {
    pub name: String,
    pub args: Vec<String>,
    /// Text between the opening and closing tags of a paired call
    pub body: Option<String>,
    /// Byte range of the whole call, tags included
    pub span: Range<usize>,
}

struct Tag<'c> {
    closing: bool,
    name: &'c str,
    args: &'c str,
    span: Range<usize>,
}

fn scan_tags(content: &str) -> Vec<Tag<'_>> {
    TAG_RE
        .captures_iter(content)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            Some(Tag {
                closing: caps.get(1).is_some(),
                name: caps.get(2)?.as_str(),
                args: caps.get(3).map_or("", |m| m.as_str()),
                span: whole.range(),
            })
        })
        .collect()
}

/// Find the top-level calls in `content`.
///
/// Paired calls swallow everything up to their matching closing tag, so
/// nested calls stay inside the body.
pub fn parse_calls(
    content: &str,
    registry: &ShortcodeRegistry,
) -> Result<Vec<ShortcodeCall>, ShortcodeError> {
    let tags = scan_tags(content);
    let mut calls = Vec::new();
    let mut i = 0;

    while i < tags.len() {
        let tag = &tags[i];
        if tag.closing {
            return Err(ShortcodeError::UnexpectedClose(tag.name.to_string()));
        }
        let shortcode = registry
            .get(tag.name)
            .ok_or_else(|| ShortcodeError::Unknown(tag.name.to_string()))?;
        let args = split_args(tag.args);

        if !shortcode.paired() {
            calls.push(ShortcodeCall {
                name: tag.name.to_string(),
                args,
                body: None,
                span: tag.span.clone(),
            });
            i += 1;
            continue;
        }

        let close = matching_close(&tags, i)
            .ok_or_else(|| ShortcodeError::Unclosed(tag.name.to_string()))?;
        calls.push(ShortcodeCall {
            name: tag.name.to_string(),
            args,
            body: Some(content[tag.span.end..tags[close].span.start].to_string()),
            span: tag.span.start..tags[close].span.end,
        });
        i = close + 1;
    }

    Ok(calls)
}

/// Index of the tag closing `tags[open]`, counting same-name nesting.
fn matching_close(tags: &[Tag], open: usize) -> Option<usize> {
    let name = tags[open].name;
    let mut depth = 0usize;
    for (i, tag) in tags.iter().enumerate().skip(open + 1) {
        if tag.name != name {
            continue;
        }
        if !tag.closing {
            depth += 1;
        } else if depth == 0 {
            return Some(i);
        } else {
            depth -= 1;
        }
    }
    None
}

/// Split arguments on whitespace; double quotes group words.
fn split_args(raw: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut has_token = false;

    for c in raw.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                has_token = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if has_token {
                    args.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            c => {
                current.push(c);
                has_token = true;
            }
        }
    }
    if has_token {
        args.push(current);
    }
    args
}

/// Expand every shortcode in `content`.
///
/// All top-level calls run concurrently; the first failure fails the whole
/// expansion.
pub async fn expand_shortcodes(
    content: &str,
    registry: &ShortcodeRegistry,
    ctx: &ShortcodeContext<'_>,
) -> Result<String, ShortcodeError> {
    expand(content.to_string(), registry, *ctx, true).await
}

fn expand<'a>(
    content: String,
    registry: &'a ShortcodeRegistry,
    ctx: ShortcodeContext<'a>,
    wrap_raw: bool,
) -> BoxFuture<'a, Result<String, ShortcodeError>> {
    async move {
        let calls = parse_calls(&content, registry)?;
        if calls.is_empty() {
            return Ok(content);
        }

        let outputs = try_join_all(calls.iter().map(|call| evaluate(call, registry, ctx))).await?;

        let mut result = String::with_capacity(content.len());
        let mut last = 0;
        for (call, output) in calls.iter().zip(outputs) {
            result.push_str(&content[last..call.span.start]);
            if wrap_raw {
                result.push_str("{% raw %}");
                result.push_str(&output);
                result.push_str("{% endraw %}");
            } else {
                result.push_str(&output);
            }
            last = call.span.end;
        }
        result.push_str(&content[last..]);
        Ok(result)
    }
    .boxed()
}

async fn evaluate<'a>(
    call: &'a ShortcodeCall,
    registry: &'a ShortcodeRegistry,
    ctx: ShortcodeContext<'a>,
) -> Result<String, ShortcodeError> {
    let shortcode = registry
        .get(&call.name)
        .ok_or_else(|| ShortcodeError::Unknown(call.name.clone()))?;

    // Nested calls are expanded first and fed to the outer shortcode as plain text
    let body = match &call.body {
        Some(body) => Some(expand(body.clone(), registry, ctx, false).await?),
        None => None,
    };

    shortcode.call(&call.args, body.as_deref(), &ctx).await
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        icons: tempfile::TempDir,
        highlighter: SyntaxHighlighter,
        markdown_config: MarkdownConfig,
        registry: ShortcodeRegistry,
    }

    impl Fixture {
        fn new() -> Self {
            let icons = tempfile::tempdir().unwrap();
            std::fs::write(icons.path().join("star.svg"), "<svg>star</svg>\n").unwrap();
            Self {
                icons,
                highlighter: SyntaxHighlighter::default(),
                markdown_config: MarkdownConfig::default(),
                registry: ShortcodeRegistry::with_defaults(),
            }
        }

        fn ctx(&self) -> ShortcodeContext<'_> {
            ShortcodeContext {
                icons_dir: self.icons.path(),
                highlighter: &self.highlighter,
                markdown_config: &self.markdown_config,
            }
        }

        async fn expand(&self, content: &str) -> Result<String, ShortcodeError> {
            expand_shortcodes(content, &self.registry, &self.ctx()).await
        }
    }

    #[test]
    fn test_split_args() {
        assert_eq!(split_args(" star "), vec!["star"]);
        assert_eq!(
            split_args(r#"a "two words" b"#),
            vec!["a", "two words", "b"]
        );
        assert_eq!(split_args(r#""""#), vec![""]);
        assert!(split_args("   ").is_empty());
    }

    #[test]
    fn test_parse_calls_nesting() {
        let registry = ShortcodeRegistry::with_defaults();
        let content = "a {{< markdown >}}x {{< icon star >}}{{< /markdown >}} b {{< icon moon >}}";

        let calls = parse_calls(content, &registry).unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].name, "markdown");
        assert_eq!(calls[0].body.as_deref(), Some("x {{< icon star >}}"));
        assert_eq!(calls[1].args, vec!["moon"]);
        assert_eq!(&content[calls[1].span.clone()], "{{< icon moon >}}");
    }

    #[tokio::test]
    async fn test_icon_is_inlined_and_raw_wrapped() {
        let fixture = Fixture::new();
        let out = fixture.expand("Rate: {{< icon star >}}!").await.unwrap();
        assert_eq!(out, "Rate: {% raw %}<svg>star</svg>{% endraw %}!");
    }

    #[tokio::test]
    async fn test_many_calls_in_one_document() {
        let fixture = Fixture::new();
        let out = fixture
            .expand("{{< icon star >}} {{<icon \"star\">}} {{< icon star >}}")
            .await
            .unwrap();
        assert_eq!(out.matches("<svg>star</svg>").count(), 3);
    }

    #[tokio::test]
    async fn test_markdown_shortcode_renders_body() {
        let fixture = Fixture::new();
        let out = fixture
            .expand("{{< markdown >}}*hi* {{< icon star >}}{{< /markdown >}}")
            .await
            .unwrap();
        assert!(out.starts_with("{% raw %}<p><em>hi</em> <svg>star</svg></p>"));
        // The nested icon is not wrapped twice
        assert_eq!(out.matches("{% raw %}").count(), 1);
    }

    #[tokio::test]
    async fn test_content_without_shortcodes_is_unchanged() {
        let fixture = Fixture::new();
        let content = "# Title\n\n{{ page.title }} and {{< not a tag";
        assert_eq!(fixture.expand(content).await.unwrap(), content);
    }

    #[tokio::test]
    async fn test_missing_icon_is_error() {
        let fixture = Fixture::new();
        let err = fixture.expand("{{< icon nope >}}").await.unwrap_err();
        assert!(matches!(err, ShortcodeError::Io { .. }));
    }

    #[tokio::test]
    async fn test_icon_name_cannot_escape_directory() {
        let fixture = Fixture::new();
        let err = fixture.expand("{{< icon ../secret >}}").await.unwrap_err();
        assert!(matches!(err, ShortcodeError::InvalidArgument { .. }));
    }

    #[test]
    fn test_template_functions() {
        let fixture = Fixture::new();
        let mut tera = Tera::default();
        register_functions(
            &mut tera,
            fixture.icons.path(),
            &fixture.highlighter,
            &fixture.markdown_config,
        );
        tera.add_raw_template(
            "page.html",
            "{{ icon(name=icon_name) }}|{{ markdown(body=\"*hi*\") }}",
        )
        .unwrap();

        let mut context = tera::Context::new();
        context.insert("icon_name", "star");
        let out = tera.render("page.html", &context).unwrap();
        // Autoescaping leaves function output alone
        assert_eq!(out, "<svg>star</svg>|<p><em>hi</em></p>");

        context.insert("icon_name", "../secret");
        assert!(tera.render("page.html", &context).is_err());
    }

    #[tokio::test]
    async fn test_unknown_shortcode_is_error() {
        let fixture = Fixture::new();
        let err = fixture.expand("{{< youtube abc >}}").await.unwrap_err();
        assert!(matches!(err, ShortcodeError::Unknown(name) if name == "youtube"));
    }

    #[tokio::test]
    async fn test_unbalanced_tags_are_errors() {
        let fixture = Fixture::new();
        assert!(matches!(
            fixture.expand("{{< markdown >}}never closed").await,
            Err(ShortcodeError::Unclosed(_))
        ));
        assert!(matches!(
            fixture.expand("stray {{< /markdown >}}").await,
            Err(ShortcodeError::UnexpectedClose(_))
        ));
    }
}
