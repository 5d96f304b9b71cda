use crate::http::headers::HeaderList;
use crate::http::request::{Method, Request, split_target};

const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

#[derive(Debug, PartialEq, Eq)]
pub enum ParseError {
    /// Nothing but whitespace was captured
    Empty,
    /// The request line has no method or no target
    InvalidRequestLine,
}

/// Parses whatever was captured for a request.
///
/// The header block ends at the first CRLFCRLF. When the buffer filled up
/// before a terminator arrived, the captured bytes are parsed as the header
/// block: a trailing partial line without a colon is skipped, as is any
/// other line that is not `name: value`. Header lines past `MAX_HEADERS`
/// are dropped.
pub fn parse_http_request(buf: &[u8]) -> Result<Request, ParseError> {
    let (header_bytes, body_bytes) = match find_headers_end(buf) {
        Some(end) => (&buf[..end], &buf[end + HEADER_TERMINATOR.len()..]),
        None => (buf, &[][..]),
    };

    let headers_str = String::from_utf8_lossy(header_bytes);
    let mut lines = headers_str.split("\r\n");

    let request_line = lines.next().unwrap_or_default();
    if request_line.trim().is_empty() {
        return Err(ParseError::Empty);
    }

    let mut parts = request_line.split_whitespace();
    let method_str = parts.next().ok_or(ParseError::InvalidRequestLine)?;
    let target = parts.next().ok_or(ParseError::InvalidRequestLine)?;
    let version = parts.next().unwrap_or("HTTP/1.1");

    let method = Method::parse(method_str);
    let (path, query_string) = split_target(target);

    let mut headers = HeaderList::new();
    for line in lines {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        if headers.try_append(key.trim(), value.trim()).is_err() {
            tracing::debug!(line, "header capacity reached, dropping header");
        }
    }

    let body = match headers
        .get("Content-Length")
        .and_then(|v| v.trim().parse::<usize>().ok())
    {
        Some(len) => body_bytes[..len.min(body_bytes.len())].to_vec(),
        None => body_bytes.to_vec(),
    };

    Ok(Request {
        method,
        path,
        query_string,
        version: version.to_string(),
        headers,
        body,
    })
}

pub fn find_headers_end(buf: &[u8]) -> Option<usize> {
    buf.windows(HEADER_TERMINATOR.len())
        .position(|w| w == HEADER_TERMINATOR)
}
