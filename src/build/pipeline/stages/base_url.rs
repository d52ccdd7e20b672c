//! Path prefix rewriting stage.
//!
//! Root-relative `href`, `src`, `action` and `poster` attributes in rendered
//! pages are prefixed with `PATH_PREFIX`, so links written directly in
//! markdown or layouts work when the site is deployed under a sub-path.

use std::borrow::Cow;
use std::sync::LazyLock;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use regex::{Captures, Regex};

use crate::build::paths::is_html_page;
use crate::build::pipeline::{PipelineContext, PipelineError, ProcessingDocument, Stage};
use crate::config::BuildContext;

static URL_ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(\s(?:href|src|action|poster)\s*=\s*)(?:"(/[^"]*)"|'(/[^']*)')"#)
        .expect("Invalid URL attribute regex")
});

/// Stage that applies the path prefix to every root-relative URL attribute.
///
/// Only added to the pipeline when the prefix is not `/`. URLs already under
/// the prefix (e.g. from the `url` filter) are left alone.
pub struct BaseUrlStage;

impl BaseUrlStage {
    fn run(docs: &mut [ProcessingDocument], build: &BuildContext) {
        for doc in docs {
            if !is_html_page(doc.url_path()) {
                continue;
            }
            let Some(html) = doc.output_html.as_mut() else {
                continue;
            };
            let rewritten = match prefix_urls(html, build) {
                Cow::Owned(rewritten) => rewritten,
                Cow::Borrowed(_) => continue,
            };
            *html = rewritten;
        }
    }
}

impl Stage for BaseUrlStage {
    fn name(&self) -> &'static str {
        "base_url"
    }

    fn process<'a>(
        &'a self,
        docs: &'a mut [ProcessingDocument],
        ctx: &'a mut PipelineContext<'_>,
    ) -> BoxFuture<'a, Result<(), PipelineError>> {
        Self::run(docs, ctx.build);
        futures_util::future::ready(Ok(())).boxed()
    }
}

/// Prefix root-relative URL attributes in `html`.
fn prefix_urls<'h>(html: &'h str, build: &BuildContext) -> Cow<'h, str> {
    if build.path_prefix == "/" {
        return Cow::Borrowed(html);
    }

    URL_ATTR_RE.replace_all(html, |caps: &Captures| {
        let (url, quote) = match (caps.get(2), caps.get(3)) {
            (Some(url), _) => (url.as_str(), '"'),
            (None, Some(url)) => (url.as_str(), '\''),
            (None, None) => return caps[0].to_string(),
        };
        let url = if url.starts_with(&build.path_prefix) {
            url.to_string()
        } else {
            build.url(url)
        };
        format!("{}{quote}{url}{quote}", &caps[1])
    })
}
