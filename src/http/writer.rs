use bytes::{BufMut, Bytes, BytesMut};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::CapacityExceeded;
use crate::http::response::{Delivery, Response};

const HTTP_VERSION: &str = "HTTP/1.1";

/// Framing headers are always written by the serializer, never copied from
/// the handler's header list.
fn is_framing_header(name: &str) -> bool {
    name.eq_ignore_ascii_case("Content-Length") || name.eq_ignore_ascii_case("Transfer-Encoding")
}

fn put_header(buf: &mut BytesMut, name: &str, value: &str) {
    buf.put_slice(name.as_bytes());
    buf.put_slice(b": ");
    buf.put_slice(value.as_bytes());
    buf.put_slice(b"\r\n");
}

fn put_status_line(buf: &mut BytesMut, resp: &Response) {
    let status_line = format!(
        "{} {} {}\r\n",
        HTTP_VERSION,
        resp.status.as_u16(),
        resp.status.reason_phrase()
    );
    buf.put_slice(status_line.as_bytes());
}

/// Status line, headers, `Content-Length`, `Connection: close`, body.
pub fn serialize_buffered(resp: &Response) -> Bytes {
    let mut buf = BytesMut::with_capacity(256 + resp.body.len());
    put_status_line(&mut buf, resp);

    for (k, v) in resp.headers.iter() {
        if is_framing_header(k) || k.eq_ignore_ascii_case("Connection") {
            continue;
        }
        put_header(&mut buf, k, v);
    }
    put_header(&mut buf, "Content-Length", &resp.body.len().to_string());
    put_header(&mut buf, "Connection", "close");

    buf.put_slice(b"\r\n");
    buf.put_slice(&resp.body);
    buf.freeze()
}

/// Status line, headers, `Transfer-Encoding: chunked`, framed body.
pub fn serialize_streamed(resp: &mut Response) -> Result<Bytes, CapacityExceeded> {
    let body = resp.take_chunked_body()?;

    let mut buf = BytesMut::with_capacity(256 + body.len());
    put_status_line(&mut buf, resp);

    for (k, v) in resp.headers.iter() {
        if is_framing_header(k) {
            continue;
        }
        put_header(&mut buf, k, v);
    }
    put_header(&mut buf, "Transfer-Encoding", "chunked");

    buf.put_slice(b"\r\n");
    buf.put_slice(&body);
    Ok(buf.freeze())
}

pub struct ResponseWriter {
    buffer: Bytes,
    written: usize,
}

impl ResponseWriter {
    /// Serializes `response` according to its delivery mode.
    pub fn new(response: &mut Response) -> Result<Self, CapacityExceeded> {
        let buffer = match response.delivery() {
            Delivery::Buffered => serialize_buffered(response),
            Delivery::Streamed => serialize_streamed(response)?,
        };
        Ok(Self { buffer, written: 0 })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    pub async fn write_to_stream<S>(&mut self, stream: &mut S) -> anyhow::Result<()>
    where
        S: AsyncWrite + Unpin + ?Sized,
    {
        while self.written < self.buffer.len() {
            let n = stream.write(&self.buffer[self.written..]).await?;

            if n == 0 {
                return Err(anyhow::anyhow!("connection closed while writing"));
            }

            self.written += n;
        }

        stream.flush().await?;
        Ok(())
    }
}
