//! HTTP request parsing and representation.

use std::collections::HashMap;
use std::str::FromStr;
use serde::de::DeserializeOwned;
use url::form_urlencoded;

use crate::parser::error::Error;
use crate::parser::method::Method;
use crate::parser::version::HttpVersion;

/// A parsed HTTP request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// The HTTP method (GET, POST, etc.)
    pub method: Method,
    /// The path component of the request target, without the query string.
    /// Kept as sent; the router percent-decodes it segment by segment.
    pub path: String,
    /// The raw query string, if the target carried one
    pub query: Option<String>,
    /// The HTTP version
    pub version: HttpVersion,
    /// The HTTP headers, with the names as sent by the client
    pub headers: HashMap<String, String>,
    /// The request body
    pub body: Vec<u8>,
    /// Query parameters parsed from the target, percent-decoded, `+` as space
    pub query_params: HashMap<String, String>,
}

impl HttpRequest {
    /// Create a request from its request-line parts and headers.
    ///
    /// `target` may carry a query string; it is split off into [`query`](Self::query)
    /// and [`query_params`](Self::query_params) so that [`path`](Self::path) is
    /// exactly what the router matches against.
    pub fn new(method: Method, target: impl Into<String>, version: HttpVersion, headers: HashMap<String, String>) -> Self {
        let target = target.into();
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path.to_string(), Some(query.to_string())),
            None => (target, None),
        };
        let query_params = query.as_deref().map(parse_query).unwrap_or_default();

        Self {
            method,
            path,
            query,
            version,
            headers,
            body: Vec::new(),
            query_params,
        }
    }

    /// Create a request with a body.
    pub fn with_body(method: Method, target: impl Into<String>, version: HttpVersion, headers: HashMap<String, String>, body: Vec<u8>) -> Self {
        let mut request = Self::new(method, target, version, headers);
        request.body = body;
        request
    }

    /// Case-insensitive header lookup.
    pub fn get_header(&self, name: &str) -> Option<&String> {
        self.headers
            .iter()
            .find_map(|(k, v)| k.eq_ignore_ascii_case(name).then_some(v))
    }

    /// Check if a header exists.
    pub fn has_header(&self, name: &str) -> bool {
        self.get_header(name).is_some()
    }

    /// Get a query parameter value.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query_params.get(name).map(String::as_str)
    }

    /// Check if the request declares a JSON body.
    pub fn is_json(&self) -> bool {
        self.get_header("Content-Type")
            .is_some_and(|content_type| content_type.starts_with("application/json"))
    }

    /// Decode the body as JSON.
    ///
    /// Fails with [`Error::MissingHeader`] when the request does not declare
    /// `Content-Type: application/json`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, Error> {
        if !self.is_json() {
            return Err(Error::MissingHeader("Content-Type: application/json".to_string()));
        }
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// Decode an `application/x-www-form-urlencoded` query. A repeated key keeps
/// its last value.
fn parse_query(query: &str) -> HashMap<String, String> {
    form_urlencoded::parse(query.as_bytes())
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect()
}

/// Split the raw bytes into the head and whatever follows the blank line.
fn split_head(input: &[u8]) -> (&[u8], &[u8]) {
    if let Some(pos) = input.windows(4).position(|w| w == b"\r\n\r\n") {
        return (&input[..pos], &input[pos + 4..]);
    }
    if let Some(pos) = input.windows(2).position(|w| w == b"\n\n") {
        return (&input[..pos], &input[pos + 2..]);
    }
    (input, &[])
}

/// Parse an HTTP request from a byte slice.
///
/// The body is taken from the bytes after the head, bounded by
/// `Content-Length`. Without that header the body is empty.
pub fn parse_request(input: &[u8]) -> Result<HttpRequest, Error> {
    if input.is_empty() {
        return Err(Error::EmptyRequest);
    }

    let (head, rest) = split_head(input);
    let head = std::str::from_utf8(head).map_err(|_| Error::InvalidEncoding)?;
    let mut lines = head.lines();

    let request_line = lines.next().ok_or(Error::EmptyRequest)?;
    let parts: Vec<&str> = request_line.split_whitespace().collect();
    let [method, target, version] = parts.as_slice() else {
        return Err(Error::MalformedRequestLine(request_line.to_string()));
    };

    let method = Method::from_str(method)?;
    if !target.starts_with('/') {
        return Err(Error::InvalidTarget(target.to_string()));
    }
    let version = HttpVersion::from_str(version)?;

    let mut headers = HashMap::new();
    for line in lines {
        if line.is_empty() {
            break;
        }
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| Error::InvalidHeaderFormat(line.to_string()))?;
        // A repeated header keeps its last value.
        headers.insert(name.trim().to_string(), value.trim().to_string());
    }

    let mut request = HttpRequest::new(method, *target, version, headers);

    if version.requires_host() && !request.has_header("Host") {
        return Err(Error::MissingHeader("Host".to_string()));
    }

    if let Some(length) = request.get_header("Content-Length") {
        let expected: usize = length
            .parse()
            .map_err(|_| Error::InvalidContentLength(length.clone()))?;
        if rest.len() < expected {
            return Err(Error::IncompleteBody { expected, actual: rest.len() });
        }
        request.body = rest[..expected].to_vec();
    }

    Ok(request)
}
