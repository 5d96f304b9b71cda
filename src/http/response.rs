use crate::error::CapacityExceeded;
use crate::http::chunked::ChunkedBody;
use crate::http::headers::HeaderList;

/// HTTP status codes supported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// 200 OK
    Ok,
    /// 201 Created
    Created,
    /// 204 No Content
    NoContent,
    /// 301 Moved Permanently
    MovedPermanently,
    /// 400 Bad Request
    BadRequest,
    /// 403 Forbidden
    Forbidden,
    /// 404 Not Found
    NotFound,
    /// 405 Method Not Allowed
    MethodNotAllowed,
    /// 500 Internal Server Error
    InternalServerError,
}

impl StatusCode {
    /// Returns the numeric HTTP status code.
    ///
    /// ```
    /// # use livehttp::http::response::StatusCode;
    /// assert_eq!(StatusCode::Ok.as_u16(), 200);
    /// assert_eq!(StatusCode::NotFound.as_u16(), 404);
    /// ```
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::Created => 201,
            StatusCode::NoContent => 204,
            StatusCode::MovedPermanently => 301,
            StatusCode::BadRequest => 400,
            StatusCode::Forbidden => 403,
            StatusCode::NotFound => 404,
            StatusCode::MethodNotAllowed => 405,
            StatusCode::InternalServerError => 500,
        }
    }

    /// Returns the standard reason phrase for this status code.
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::Created => "Created",
            StatusCode::NoContent => "No Content",
            StatusCode::MovedPermanently => "Moved Permanently",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::Forbidden => "Forbidden",
            StatusCode::NotFound => "Not Found",
            StatusCode::MethodNotAllowed => "Method Not Allowed",
            StatusCode::InternalServerError => "Internal Server Error",
        }
    }
}

/// How the connection delivers a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Serialize the whole response, send it, close the connection
    Buffered,
    /// Send a chunked body and leave the connection open
    Streamed,
}

/// A response under construction by a route handler.
///
/// The connection decides the delivery mode before the handler runs; a
/// handler checks `is_streamed` and either sets a body or writes chunks.
#[derive(Debug)]
pub struct Response {
    pub status: StatusCode,
    /// At most `MAX_HEADERS`
    pub headers: HeaderList,
    pub body: Vec<u8>,
    delivery: Delivery,
    chunks: ChunkedBody,
}

/// Builder for constructing buffered responses in a fluent style.
///
/// ```ignore
/// let response = ResponseBuilder::new(StatusCode::Ok)
///     .header("Content-Type", "application/json")
///     .body(b"{}".to_vec())
///     .build();
/// ```
pub struct ResponseBuilder {
    status: StatusCode,
    headers: HeaderList,
    body: Vec<u8>,
}

impl ResponseBuilder {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderList::new(),
            body: Vec::new(),
        }
    }

    /// Adds or replaces a header; dropped once the header list is full.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let _ = self.headers.try_set(key, value);
        self
    }

    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    pub fn build(self) -> Response {
        Response {
            status: self.status,
            headers: self.headers,
            body: self.body,
            delivery: Delivery::Buffered,
            chunks: ChunkedBody::new(),
        }
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new(Delivery::Buffered)
    }
}

impl Response {
    /// An empty 200 response with the given delivery mode.
    pub fn new(delivery: Delivery) -> Self {
        Self {
            status: StatusCode::Ok,
            headers: HeaderList::new(),
            body: Vec::new(),
            delivery,
            chunks: ChunkedBody::new(),
        }
    }

    /// Creates a simple 200 OK response with the given body.
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        ResponseBuilder::new(StatusCode::Ok)
            .body(body.into())
            .build()
    }

    /// The 404 used when no route matches.
    pub fn not_found() -> Self {
        ResponseBuilder::new(StatusCode::NotFound)
            .header("Content-Type", "text/plain")
            .body(b"404 Not Found".to_vec())
            .build()
    }

    pub fn delivery(&self) -> Delivery {
        self.delivery
    }

    pub fn is_streamed(&self) -> bool {
        self.delivery == Delivery::Streamed
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    pub fn try_set_header(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), CapacityExceeded> {
        self.headers.try_set(name, value)
    }

    /// Sets a header, dropping it when the header list is full.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        if let Err(e) = self.headers.try_set(name.as_str(), value) {
            tracing::debug!(header = %name, "{e}, dropping header");
        }
    }

    pub fn set_body(&mut self, body: &str) {
        self.body = body.as_bytes().to_vec();
    }

    pub fn set_body_bin(&mut self, body: impl Into<Vec<u8>>) {
        self.body = body.into();
    }

    /// Queues one chunk of a streamed body.
    pub fn write_chunk(&mut self, data: &[u8]) -> Result<(), CapacityExceeded> {
        self.chunks.push(data)
    }

    /// The framed streamed body, terminal chunk included.
    ///
    /// A streamed response whose handler only set `body` sends it as a
    /// single chunk.
    pub(crate) fn take_chunked_body(&mut self) -> Result<bytes::Bytes, CapacityExceeded> {
        let mut chunks = std::mem::take(&mut self.chunks);
        if chunks.is_empty() && !self.body.is_empty() {
            chunks.push(&self.body)?;
        }
        Ok(chunks.finish())
    }
}
