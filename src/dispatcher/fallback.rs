//! Fallback pages for requests no action handled.
//!
//! Both renderers append to whatever the response already holds and never
//! propagate a failure: they are the last line of defense for a request.

use crate::error::DispatchError;
use crate::server::{Request, Response};
use std::panic::{self, AssertUnwindSafe};
use tracing::warn;

const HTML: &str = "text/html";

/// Render the 404 page for `req`.
pub fn not_found(req: &Request, res: &mut Response) {
    res.status = 404;
    res.content_type = HTML.to_string();
    res.writeln(&[&"<h1>Not Found</h1>"]);
    res.write(&[
        &"The requested URL",
        &escape_html(&req.path),
        &"was not found on the server.",
    ]);
}

/// Render the 500 page for `err`.
///
/// Shows the message, then the failure's file and line when known, then the
/// cause chain and host backtrace when present.
pub fn error(res: &mut Response, err: &DispatchError) {
    if panic::catch_unwind(AssertUnwindSafe(|| render_error(res, err))).is_err() {
        warn!(error = %err, "Error page rendering panicked");
    }
}

fn render_error(res: &mut Response, err: &DispatchError) {
    res.status = 500;
    res.content_type = HTML.to_string();
    res.writeln(&[&"<h2>", &escape_html(&err.to_string()), &"</h2>"]);

    if let Some(loc) = err.location() {
        res.writeln(&[
            &"<p>In file<b>",
            &escape_html(loc.file),
            &"</b>at line<b>",
            &loc.line,
            &"</b></p>",
        ]);
    }

    let causes = err.causes();
    let backtrace = err.backtrace();
    if !causes.is_empty() || backtrace.is_some() {
        res.writeln(&[&"<h3>Error Chain</h3><pre>"]);
        res.writeln(&[&escape_html(&err.to_string())]);
        for cause in &causes {
            res.writeln(&[&"caused by:", &escape_html(cause)]);
        }
        res.writeln(&[&"</pre>"]);
    }
    if let Some(bt) = backtrace {
        res.writeln(&[&"<h3>Backtrace</h3><pre>"]);
        res.writeln(&[&escape_html(bt)]);
        res.writeln(&[&"</pre>"]);
    }
}

/// Escape text for interpolation into HTML element content.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ActionFailure, ActionRuntimeError, ResolutionError};

    #[test]
    fn test_not_found_page() {
        let mut res = Response::new();
        not_found(&Request::get("/missing/<page>"), &mut res);
        assert_eq!(res.status, 404);
        assert_eq!(res.content_type, "text/html");
        assert!(res.body().starts_with("<h1>Not Found</h1>\n"));
        assert!(res.body().contains("/missing/&lt;page&gt;"));
    }

    #[test]
    fn test_error_page_with_location() {
        let err: anyhow::Error = ActionFailure::new("stock exhausted").into();
        let err = DispatchError::from(ActionRuntimeError::from_error(&err));
        let mut res = Response::new();
        error(&mut res, &err);
        assert_eq!(res.status, 500);
        assert!(res.body().starts_with("<h2> stock exhausted </h2>\n"));
        assert!(res.body().contains("<p>In file<b>"));
        assert!(res.body().contains("fallback.rs"));
    }

    #[test]
    fn test_error_page_without_diagnostics() {
        let err = DispatchError::from(ResolutionError::ModuleNotFound {
            module: "shop".into(),
        });
        let mut res = Response::new();
        error(&mut res, &err);
        assert_eq!(res.body(), "<h2> Module &#39;shop&#39; not found </h2>\n");
    }

    #[test]
    fn test_error_page_renders_cause_chain() {
        let err = anyhow::anyhow!("connection refused").context("loading basket");
        let err = DispatchError::from(ActionRuntimeError::from_error(&err));
        let mut res = Response::new();
        error(&mut res, &err);
        assert!(res.body().contains("<h3>Error Chain</h3>"));
        assert!(res.body().contains("caused by: connection refused"));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html(r#"<a href="x">&'"#), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
    }
}
