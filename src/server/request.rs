use crate::ids::RequestId;
use http::Method;
use smallvec::SmallVec;
use std::io::Read;
use tracing::debug;

/// Maximum inline query parameters before heap allocation.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Maximum inline headers/cookies before heap allocation.
pub const MAX_INLINE_HEADERS: usize = 16;

/// Stack-allocated name/value pairs for query parameters.
pub type ParamVec = SmallVec<[(String, String); MAX_INLINE_PARAMS]>;

/// Stack-allocated name/value pairs for headers and cookies.
pub type HeaderVec = SmallVec<[(String, String); MAX_INLINE_HEADERS]>;

/// Inbound request as seen by the dispatcher and by actions.
///
/// The dispatcher only reads [`Request::path`]; everything else is for actions,
/// hooks and continuation gates.
#[derive(Debug, Clone)]
pub struct Request {
    /// Correlation id for logs
    pub request_id: RequestId,
    /// HTTP method
    pub method: Method,
    /// Percent-decoded request path without the query string
    pub path: String,
    /// Decoded query string parameters in arrival order
    pub query_params: ParamVec,
    /// Headers with lowercase names
    pub headers: HeaderVec,
    /// Cookies parsed from the `cookie` header
    pub cookies: HeaderVec,
    /// Raw request body
    pub body: Vec<u8>,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            request_id: RequestId::new(),
            method,
            path: path.into(),
            query_params: ParamVec::new(),
            headers: HeaderVec::new(),
            cookies: HeaderVec::new(),
            body: Vec::new(),
        }
    }

    /// Shorthand for a `GET` request.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    #[must_use]
    pub fn with_query_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_ascii_lowercase(), value.into()));
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Get a query parameter by name. Last occurrence wins.
    #[inline]
    #[must_use]
    pub fn get_query_param(&self, name: &str) -> Option<&str> {
        self.query_params
            .iter()
            .rfind(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Get a header by name (case-insensitive per RFC 7230)
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[inline]
    #[must_use]
    pub fn get_cookie(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Body as UTF-8 text, if it is valid UTF-8.
    #[must_use]
    pub fn body_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }
}

/// Parse the `cookie` header into name/value pairs.
pub fn parse_cookies(headers: &HeaderVec) -> HeaderVec {
    headers
        .iter()
        .filter(|(k, _)| k == "cookie")
        .flat_map(|(_, c)| c.split(';'))
        .filter_map(|pair| {
            let mut parts = pair.trim().splitn(2, '=');
            let name = parts.next()?.trim();
            if name.is_empty() {
                return None;
            }
            let value = parts.next().unwrap_or("").trim();
            Some((name.to_string(), value.to_string()))
        })
        .collect()
}

/// Parse query string parameters from a request target.
///
/// Extracts everything after the `?` character and URL-decodes names and values.
pub fn parse_query_params(target: &str) -> ParamVec {
    match target.split_once('?') {
        Some((_, query)) => url::form_urlencoded::parse(query.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect(),
        None => ParamVec::new(),
    }
}

/// Strip the query string from a request target and percent-decode the path.
///
/// A path that does not decode to valid UTF-8 is kept verbatim.
pub fn decode_path(target: &str) -> String {
    let raw = target.split('?').next().unwrap_or("/");
    match urlencoding::decode(raw) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => raw.to_string(),
    }
}

/// Convert a raw `may_minihttp` request into a [`Request`].
pub fn parse_request(req: may_minihttp::Request) -> Request {
    let target = req.path().to_string();
    let method = Method::from_bytes(req.method().as_bytes()).unwrap_or(Method::GET);

    let headers: HeaderVec = req
        .headers()
        .iter()
        .map(|h| {
            (
                h.name.to_ascii_lowercase(),
                String::from_utf8_lossy(h.value).into_owned(),
            )
        })
        .collect();
    let cookies = parse_cookies(&headers);
    let query_params = parse_query_params(&target);
    let request_id = RequestId::from_header_or_new(
        headers
            .iter()
            .find(|(k, _)| k == "x-request-id")
            .map(|(_, v)| v.as_str()),
    );

    let mut body = Vec::new();
    if let Err(e) = req.body().read_to_end(&mut body) {
        debug!(error = %e, "Request body read failed");
        body.clear();
    }

    debug!(
        request_id = %request_id,
        method = %method,
        target = %target,
        header_count = headers.len(),
        body_size_bytes = body.len(),
        "HTTP request parsed"
    );

    Request {
        request_id,
        method,
        path: decode_path(&target),
        query_params,
        headers,
        cookies,
        body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cookies() {
        let mut h = HeaderVec::new();
        h.push(("cookie".to_string(), "a=b; c=d; =skipped".to_string()));
        let cookies = parse_cookies(&h);
        assert_eq!(cookies.len(), 2);
        let req = Request {
            cookies,
            ..Request::get("/")
        };
        assert_eq!(req.get_cookie("a"), Some("b"));
        assert_eq!(req.get_cookie("c"), Some("d"));
    }

    #[test]
    fn test_parse_query_params() {
        let q = parse_query_params("/p?x=1&y=hello%20world&x=2");
        let req = Request {
            query_params: q,
            ..Request::get("/p")
        };
        assert_eq!(req.get_query_param("x"), Some("2"));
        assert_eq!(req.get_query_param("y"), Some("hello world"));
        assert!(parse_query_params("/p").is_empty());
    }

    #[test]
    fn test_decode_path() {
        assert_eq!(decode_path("/caf%C3%A9/menu?x=1"), "/café/menu");
        assert_eq!(decode_path("/plain"), "/plain");
        assert_eq!(decode_path("/bad%FF"), "/bad%FF");
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let req = Request::get("/").with_header("X-Trace", "abc");
        assert_eq!(req.get_header("x-trace"), Some("abc"));
        assert_eq!(req.get_header("X-TRACE"), Some("abc"));
    }
}
