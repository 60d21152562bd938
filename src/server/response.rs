use dashmap::DashMap;
use once_cell::sync::Lazy;
use std::fmt::Display;

/// Content type every response starts with.
pub const DEFAULT_CONTENT_TYPE: &str = "text/html; charset=UTF-8";

/// Upper bound on distinct content types promoted to `'static` header lines.
const MAX_INTERNED_CONTENT_TYPES: usize = 256;

static INTERNED_CONTENT_TYPES: Lazy<DashMap<String, &'static str>> = Lazy::new(DashMap::new);

/// Outbound response written by the dispatcher, fallback pages and actions.
///
/// Only the status, the content type and an append-only text body are exposed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// HTTP status code
    pub status: u16,
    /// Value of the `Content-Type` header
    pub content_type: String,
    body: String,
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl Response {
    #[must_use]
    pub fn new() -> Self {
        Self {
            status: 200,
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            body: String::new(),
        }
    }

    /// Append `parts` to the body, separated by single spaces.
    pub fn write(&mut self, parts: &[&dyn Display]) {
        for (i, part) in parts.iter().enumerate() {
            if i > 0 {
                self.body.push(' ');
            }
            self.body.push_str(&part.to_string());
        }
    }

    /// Like [`Response::write`], followed by a newline.
    pub fn writeln(&mut self, parts: &[&dyn Display]) {
        self.write(parts);
        self.body.push('\n');
    }

    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    #[must_use]
    pub fn into_body(self) -> String {
        self.body
    }
}

pub(crate) fn status_reason(status: u16) -> &'static str {
    http::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown")
}

fn content_type_header(content_type: &str) -> &'static str {
    match content_type {
        "text/html" => "Content-Type: text/html",
        DEFAULT_CONTENT_TYPE => "Content-Type: text/html; charset=UTF-8",
        "text/plain" => "Content-Type: text/plain",
        "text/plain; charset=UTF-8" => "Content-Type: text/plain; charset=UTF-8",
        "application/json" => "Content-Type: application/json",
        other => {
            if let Some(line) = INTERNED_CONTENT_TYPES.get(other) {
                return *line;
            }
            if INTERNED_CONTENT_TYPES.len() >= MAX_INTERNED_CONTENT_TYPES
                || other.contains(['\r', '\n'])
            {
                return "Content-Type: application/octet-stream";
            }
            // may_minihttp only accepts 'static header lines; the set of
            // distinct content types is bounded above.
            let line: &'static str = Box::leak(format!("Content-Type: {other}").into_boxed_str());
            *INTERNED_CONTENT_TYPES
                .entry(other.to_string())
                .or_insert(line)
        }
    }
}

/// Copy a finished [`Response`] onto the transport's response.
pub fn write_response(res: &mut may_minihttp::Response, response: Response) {
    res.status_code(usize::from(response.status), status_reason(response.status));
    res.header(content_type_header(&response.content_type));
    res.body_vec(response.into_body().into_bytes());
}
