//! Template filters.
//!
//! Pure value transforms registered on the tera instance:
//!
//! - `readable_date(format="%d %B %Y")` - "2024-01-05" -> "05 January 2024"
//! - `html_date_string` - "2024-01-05T10:00:00Z" -> "2024-01-05"
//! - `parent_path` - "/posts/first/" -> "/posts/"
//! - `url` - "/posts/" -> "/blog/posts/" with a `/blog/` path prefix

use std::collections::HashMap;
use std::fmt::Write;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use tera::{Filter, Tera, Value};

use crate::config::BuildContext;
use crate::util::html_escape;

const READABLE_DATE_FORMAT: &str = "%d %B %Y";
const HTML_DATE_FORMAT: &str = "%Y-%m-%d";

/// Register every filter on a tera instance.
pub fn register_filters(tera: &mut Tera, build: &BuildContext) {
    tera.register_filter("readable_date", readable_date);
    tera.register_filter("html_date_string", html_date_string);
    tera.register_filter("parent_path", parent_path);

    tera.register_filter(
        "url",
        UrlFilter {
            build: build.clone(),
        },
    );
}

/// Prefixes root-relative URLs with the path prefix.
///
/// The output is attribute-escaped here and marked safe, so autoescaping
/// does not turn `/` into `&#x2F;`.
struct UrlFilter {
    build: BuildContext,
}

impl Filter for UrlFilter {
    fn filter(&self, value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
        let url = expect_str("url", value)?;
        Ok(Value::String(html_escape(&self.build.url(url))))
    }

    fn is_safe(&self) -> bool {
        true
    }
}

pub fn readable_date(value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
    let format = match args.get("format") {
        Some(Value::String(format)) => format.as_str(),
        Some(other) => {
            return Err(tera::Error::msg(format!(
                "readable_date: `format` must be a string, got {other}"
            )));
        }
        None => READABLE_DATE_FORMAT,
    };
    let date = parse_date("readable_date", value)?;
    format_date("readable_date", &date, format).map(Value::String)
}

pub fn html_date_string(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    let date = parse_date("html_date_string", value)?;
    format_date("html_date_string", &date, HTML_DATE_FORMAT).map(Value::String)
}

pub fn parent_path(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    let url = expect_str("parent_path", value)?;
    Ok(Value::String(parent_url(url)))
}

/// "/posts/first/" -> "/posts/", "/feed.xml" -> "/", "/" -> "/"
pub fn parent_url(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    match trimmed.rsplit_once('/') {
        Some((head, _)) if !head.is_empty() => format!("{}/", head),
        _ => "/".to_string(),
    }
}

/// Accepts `YYYY-MM-DD`, RFC 3339, or `YYYY-MM-DDTHH:MM:SS`.
pub fn parse_date_str(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }
    if let Ok(datetime) = DateTime::parse_from_rfc3339(s) {
        return Some(datetime.naive_utc());
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").ok()
}

fn parse_date(filter: &str, value: &Value) -> tera::Result<NaiveDateTime> {
    let s = expect_str(filter, value)?;
    parse_date_str(s)
        .ok_or_else(|| tera::Error::msg(format!("{filter}: cannot parse date '{s}'")))
}

fn format_date(filter: &str, date: &NaiveDateTime, format: &str) -> tera::Result<String> {
    // An invalid format string surfaces as a fmt error rather than a panic
    let mut out = String::new();
    write!(out, "{}", date.format(format))
        .map_err(|_| tera::Error::msg(format!("{filter}: invalid date format '{format}'")))?;
    Ok(out)
}

fn expect_str<'v>(filter: &str, value: &'v Value) -> tera::Result<&'v str> {
    value
        .as_str()
        .ok_or_else(|| tera::Error::msg(format!("{filter}: expected a string, got {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tera::Context;

    fn no_args() -> HashMap<String, Value> {
        HashMap::new()
    }

    #[test]
    fn test_readable_date_default_format() {
        let out = readable_date(&Value::from("2024-01-05"), &no_args()).unwrap();
        assert_eq!(out, Value::from("05 January 2024"));
    }

    #[test]
    fn test_readable_date_custom_format() {
        let mut args = no_args();
        args.insert("format".to_string(), Value::from("%Y/%m"));
        let out = readable_date(&Value::from("2024-03-09T12:00:00Z"), &args).unwrap();
        assert_eq!(out, Value::from("2024/03"));
    }

    #[test]
    fn test_readable_date_rejects_garbage() {
        assert!(readable_date(&Value::from("last tuesday"), &no_args()).is_err());
        assert!(readable_date(&Value::from(20240105), &no_args()).is_err());
    }

    #[test]
    fn test_html_date_string() {
        let out = html_date_string(&Value::from("2024-03-09T23:30:00+00:00"), &no_args()).unwrap();
        assert_eq!(out, Value::from("2024-03-09"));
    }

    #[test]
    fn test_parent_url() {
        assert_eq!(parent_url("/posts/first/"), "/posts/");
        assert_eq!(parent_url("/posts/"), "/");
        assert_eq!(parent_url("/"), "/");
        assert_eq!(parent_url("/feed.xml"), "/");
        assert_eq!(parent_url("/a/b/c/"), "/a/b/");
    }

    #[test]
    fn test_filters_in_template() {
        let mut tera = Tera::default();
        register_filters(&mut tera, &BuildContext::from_vars(None, Some("/blog")));

        let mut context = Context::new();
        context.insert("date", "2024-01-05");
        context.insert("page_url", "/posts/first/");
        let out = tera
            .render_str(
                "{{ date | html_date_string }}|{{ page_url | parent_path | url }}",
                &context,
            )
            .unwrap();
        assert_eq!(out, "2024-01-05|/blog/posts/");
    }

    #[test]
    fn test_url_filter_is_not_autoescaped() {
        let mut tera = Tera::default();
        tera.add_raw_template("link.html", "<a href=\"{{ href | url }}\">")
            .unwrap();
        register_filters(&mut tera, &BuildContext::from_vars(None, Some("docs")));

        let mut context = Context::new();
        context.insert("href", "/a/?q=\"x\"");
        let out = tera.render("link.html", &context).unwrap();
        assert_eq!(out, "<a href=\"/docs/a/?q=&quot;x&quot;\">");
    }
}
