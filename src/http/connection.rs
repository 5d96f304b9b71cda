use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::http::parser::{find_headers_end, parse_http_request};
use crate::http::request::Request;
use crate::http::response::{Delivery, Response};
use crate::http::writer::ResponseWriter;
use crate::reload::{HotReloadState, RELOAD_HEADER, now_millis};
use crate::server::router::{Route, Router};

/// Bytes captured per request. A header block longer than this is parsed
/// from its first `REQUEST_BUFFER_SIZE` bytes; the rest is never read.
pub const REQUEST_BUFFER_SIZE: usize = 4096;

/// A byte stream a connection can run over: plain TCP, TLS, or an in-memory
/// pipe in tests.
pub trait Io: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T> Io for T where T: AsyncRead + AsyncWrite + Unpin + Send {}

pub type BoxedIo = Box<dyn Io>;

/// What the event loop lends a connection while servicing it.
#[derive(Clone, Copy)]
pub struct ServeContext<'a> {
    pub router: &'a Router,
    /// Dev mode streams the designated dev page
    pub dev_mode: bool,
    /// Present only in dev mode
    pub reload: Option<&'a HotReloadState>,
}

#[derive(Debug)]
pub enum Outcome<S> {
    /// A buffered response was sent and the connection closed
    Closed,
    /// A streamed response was sent; the connection is still open
    Streamed(S),
    /// The peer sent nothing usable; no handler ran
    Aborted,
}

pub struct Connection<S> {
    stream: S,
    buffer: Box<[u8; REQUEST_BUFFER_SIZE]>,
    state: ConnectionState,
}

pub enum ConnectionState {
    Reading,
    Processing(Request),
    Writing(Response),
    Closed,
}

impl<S: Io> Connection<S> {
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            buffer: Box::new([0u8; REQUEST_BUFFER_SIZE]),
            state: ConnectionState::Reading,
        }
    }

    /// Services exactly one request: read, parse, route, respond.
    pub async fn run(mut self, ctx: ServeContext<'_>) -> anyhow::Result<Outcome<S>> {
        loop {
            match std::mem::replace(&mut self.state, ConnectionState::Closed) {
                ConnectionState::Reading => match self.read_request().await? {
                    Some(req) => {
                        self.state = ConnectionState::Processing(req);
                    }
                    None => return Ok(Outcome::Aborted),
                },

                ConnectionState::Processing(req) => {
                    let response = Self::handle_request(&req, ctx);
                    self.state = ConnectionState::Writing(response);
                }

                ConnectionState::Writing(mut response) => {
                    let mut writer = ResponseWriter::new(&mut response)?;
                    writer.write_to_stream(&mut self.stream).await?;

                    return match response.delivery() {
                        Delivery::Buffered => {
                            if let Err(e) = self.stream.shutdown().await {
                                debug!(error = %e, "shutdown after response failed");
                            }
                            Ok(Outcome::Closed)
                        }
                        Delivery::Streamed => Ok(Outcome::Streamed(self.stream)),
                    };
                }

                ConnectionState::Closed => return Ok(Outcome::Aborted),
            }
        }
    }

    /// Returns `None` when the peer closed before sending anything or the
    /// captured bytes hold no request line.
    pub async fn read_request(&mut self) -> anyhow::Result<Option<Request>> {
        let filled = read_head(&mut self.stream, &mut self.buffer[..]).await?;
        if filled == 0 {
            return Ok(None);
        }

        let raw = &self.buffer[..filled];
        debug!(bytes = filled, request = %String::from_utf8_lossy(raw), "raw request");

        match parse_http_request(raw) {
            Ok(req) => Ok(Some(req)),
            Err(e) => {
                warn!(error = ?e, "unparseable request, closing connection");
                Ok(None)
            }
        }
    }

    fn handle_request(req: &Request, ctx: ServeContext<'_>) -> Response {
        debug!(
            headers = req.headers.len(),
            accept_encoding = req.accept_encoding().unwrap_or("identity"),
            "parsed request"
        );

        let route = ctx.router.find(req.method, &req.path);
        let delivery = if ctx.dev_mode && route.is_some_and(Route::is_dev_page) {
            Delivery::Streamed
        } else {
            Delivery::Buffered
        };

        let mut response = match route {
            Some(route) => {
                let mut response = Response::new(delivery);
                route.call(req, &mut response);
                response
            }
            None => Response::not_found(),
        };

        if ctx.reload.is_some_and(|state| state.reload_hint_at(now_millis())) {
            response.set_header(RELOAD_HEADER, "1");
        }

        info!(
            method = req.method.as_str(),
            path = %req.path,
            status = response.status.as_u16(),
            delivery = ?response.delivery(),
            "request handled"
        );
        response
    }
}

/// Reads into `buf` until the header terminator has arrived, the peer stops
/// sending, or `buf` is full. Returns the number of bytes captured.
pub async fn read_head<S>(stream: &mut S, buf: &mut [u8]) -> std::io::Result<usize>
where
    S: AsyncRead + Unpin + ?Sized,
{
    let mut total = 0;

    while total < buf.len() {
        let n = match stream.read(&mut buf[total..]).await {
            Ok(n) => n,
            Err(e) if total == 0 => return Err(e),
            Err(e) => {
                debug!(error = %e, "read failed mid-request, using captured bytes");
                break;
            }
        };
        if n == 0 {
            break;
        }

        // The terminator may straddle two reads.
        let scan_from = total.saturating_sub(3);
        total += n;
        if find_headers_end(&buf[scan_from..total]).is_some() {
            break;
        }
    }

    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::duplex;

    #[tokio::test]
    async fn read_head_stops_at_terminator() {
        let (mut client, mut server) = duplex(64);
        client.write_all(b"GET / HTTP/1.1\r\n\r\n").await.unwrap();

        let mut buf = [0u8; 128];
        let n = read_head(&mut server, &mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"GET / HTTP/1.1\r\n\r\n");
    }

    #[tokio::test]
    async fn read_head_finds_split_terminator() {
        let (mut client, mut server) = duplex(64);
        let reader = tokio::spawn(async move {
            let mut buf = [0u8; 128];
            let n = read_head(&mut server, &mut buf).await.unwrap();
            buf[..n].to_vec()
        });

        client.write_all(b"GET / HTTP/1.1\r\n\r").await.unwrap();
        tokio::task::yield_now().await;
        client.write_all(b"\n").await.unwrap();

        assert_eq!(reader.await.unwrap(), b"GET / HTTP/1.1\r\n\r\n");
    }

    #[tokio::test]
    async fn read_head_zero_bytes_on_close() {
        let (client, mut server) = duplex(64);
        drop(client);

        let mut buf = [0u8; 16];
        assert_eq!(read_head(&mut server, &mut buf).await.unwrap(), 0);
    }
}
