//! HTML minification for production builds.

use std::borrow::Cow;

use crate::config::BuildContext;

/// Minify a rendered page.
///
/// Returns `Cow::Borrowed` outside production, and whenever minifying would
/// not make the page smaller.
pub fn minify<'a>(html: &'a str, build: &BuildContext) -> Cow<'a, str> {
    if !build.production {
        return Cow::Borrowed(html);
    }

    match String::from_utf8(minify_html_inner(html.as_bytes())) {
        Ok(minified) if minified.len() < html.len() => Cow::Owned(minified),
        Ok(_) => Cow::Borrowed(html),
        Err(e) => {
            tracing::warn!("minifier produced invalid UTF-8, keeping original: {}", e);
            Cow::Borrowed(html)
        }
    }
}

fn minify_html_inner(html: &[u8]) -> Vec<u8> {
    let mut cfg = minify_html::Cfg::new();
    cfg.keep_closing_tags = true;
    cfg.keep_html_and_head_opening_tags = true;
    cfg.keep_comments = false;
    cfg.minify_css = true;
    cfg.minify_js = true;
    cfg.remove_bangs = true;
    cfg.remove_processing_instructions = true;
    minify_html::minify(html, &cfg)
}
