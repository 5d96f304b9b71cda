use crate::http::headers::HeaderList;

/// HTTP request methods.
///
/// Anything the server does not recognise parses as `Unknown` rather than
/// failing; such requests simply never match a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET - Retrieve a resource
    GET,
    /// POST - Create or submit data
    POST,
    /// PUT - Replace a resource
    PUT,
    /// DELETE - Delete a resource
    DELETE,
    /// PATCH - Partial modification of a resource
    PATCH,
    /// HEAD - Like GET but without the response body
    HEAD,
    /// OPTIONS - Describe communication options
    OPTIONS,
    /// Any other token in the method position
    Unknown,
}

/// A request parsed from the bytes captured for one connection.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    /// Path without the query string (e.g. "/index.html")
    pub path: String,
    /// Everything after the first `?`, if present
    pub query_string: Option<String>,
    pub version: String,
    /// At most `MAX_HEADERS`; extra header lines are dropped
    pub headers: HeaderList,
    /// Body bytes that arrived inside the request buffer
    pub body: Vec<u8>,
}

/// Builder for constructing Request objects.
pub struct RequestBuilder {
    method: Option<Method>,
    path: Option<String>,
    version: Option<String>,
    headers: HeaderList,
    body: Vec<u8>,
}

impl Method {
    /// Parses an HTTP method token (case-sensitive).
    ///
    /// ```
    /// # use livehttp::http::request::Method;
    /// assert_eq!(Method::parse("GET"), Method::GET);
    /// assert_eq!(Method::parse("get"), Method::Unknown);
    /// ```
    pub fn parse(s: &str) -> Self {
        match s {
            "GET" => Method::GET,
            "POST" => Method::POST,
            "PUT" => Method::PUT,
            "DELETE" => Method::DELETE,
            "PATCH" => Method::PATCH,
            "HEAD" => Method::HEAD,
            "OPTIONS" => Method::OPTIONS,
            _ => Method::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::DELETE => "DELETE",
            Method::PATCH => "PATCH",
            Method::HEAD => "HEAD",
            Method::OPTIONS => "OPTIONS",
            Method::Unknown => "UNKNOWN",
        }
    }
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self {
            method: None,
            path: None,
            version: None,
            headers: HeaderList::new(),
            body: Vec::new(),
        }
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Adds a header; ignored once the header list is full.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let _ = self.headers.try_append(key, value);
        self
    }

    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    pub fn build(self) -> Result<Request, &'static str> {
        let target = self.path.ok_or("path missing")?;
        let (path, query_string) = split_target(&target);
        Ok(Request {
            method: self.method.ok_or("method missing")?,
            path,
            query_string,
            version: self.version.unwrap_or_else(|| "HTTP/1.1".to_string()),
            headers: self.headers,
            body: self.body,
        })
    }
}

/// Splits a request target into path and query string at the first `?`.
pub(crate) fn split_target(target: &str) -> (String, Option<String>) {
    match target.split_once('?') {
        Some((path, query)) => (path.to_string(), Some(query.to_string())),
        None => (target.to_string(), None),
    }
}

impl Request {
    /// Retrieves a header value by name, ignoring case.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key)
    }

    /// Content-Length as a number; 0 when missing or not a number.
    pub fn content_length(&self) -> usize {
        self.header("Content-Length")
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(0)
    }

    /// The client's content-negotiation preference, as handed to the send path.
    pub fn accept_encoding(&self) -> Option<&str> {
        self.header("Accept-Encoding")
            .map(|v| v.trim_start_matches([' ', '\t', ':']))
            .filter(|v| !v.is_empty())
    }
}
