//! Chunked transfer coding for streamed responses.
//!
//! Each chunk is framed as `<hex length>\r\n<payload>\r\n`; the body ends with
//! the zero-length chunk `0\r\n\r\n`. A zero-length payload is therefore never
//! written as a regular chunk, since it would terminate the body early.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::CapacityExceeded;

/// Upper bound on the framed size of one streamed body.
pub const MAX_STREAM_BODY: usize = 16 * 1024 * 1024;

const TERMINAL_CHUNK: &[u8] = b"0\r\n\r\n";

/// Accumulates framed chunks without ever growing past `MAX_STREAM_BODY`.
#[derive(Debug, Default)]
pub struct ChunkedBody {
    buf: BytesMut,
    chunks: usize,
}

impl ChunkedBody {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames `data` as one chunk. Empty payloads are skipped.
    pub fn push(&mut self, data: &[u8]) -> Result<(), CapacityExceeded> {
        if data.is_empty() {
            return Ok(());
        }

        let size_line = format!("{:x}\r\n", data.len());
        let framed = size_line.len() + data.len() + 2;
        // Keep room for the terminal chunk so `finish` can never overflow.
        if self.buf.len() + framed + TERMINAL_CHUNK.len() > MAX_STREAM_BODY {
            return Err(CapacityExceeded {
                table: "stream body",
                capacity: MAX_STREAM_BODY,
            });
        }

        self.buf.reserve(framed);
        self.buf.put_slice(size_line.as_bytes());
        self.buf.put_slice(data);
        self.buf.put_slice(b"\r\n");
        self.chunks += 1;
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.chunks == 0
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks
    }

    /// Appends the terminal chunk and returns the complete body.
    pub fn finish(mut self) -> Bytes {
        self.buf.put_slice(TERMINAL_CHUNK);
        self.buf.freeze()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_length_in_hex() {
        let mut body = ChunkedBody::new();
        body.push(&[b'a'; 26]).unwrap();
        assert_eq!(
            &body.finish()[..],
            format!("1a\r\n{}\r\n0\r\n\r\n", "a".repeat(26)).as_bytes()
        );
    }

    #[test]
    fn empty_body_is_only_the_terminator() {
        assert_eq!(&ChunkedBody::new().finish()[..], b"0\r\n\r\n");
    }

    #[test]
    fn empty_push_does_not_terminate() {
        let mut body = ChunkedBody::new();
        body.push(b"").unwrap();
        body.push(b"hi").unwrap();
        assert_eq!(body.chunk_count(), 1);
        assert_eq!(&body.finish()[..], b"2\r\nhi\r\n0\r\n\r\n");
    }

    #[test]
    fn refuses_to_grow_past_limit() {
        let mut body = ChunkedBody::new();
        let big = vec![0u8; MAX_STREAM_BODY];
        assert!(body.push(&big).is_err());
        assert!(body.is_empty());
    }
}
