//! HTTP/1.1 request handling for a single-threaded event loop.
//!
//! One connection carries one request. The connection reads at most
//! [`connection::REQUEST_BUFFER_SIZE`] bytes, parses them leniently, runs the
//! matching handler and writes the response in one of two ways:
//!
//! ```text
//!        ┌─────────────┐
//!        │   Reading   │ ← Capture the header block
//!        └──────┬──────┘
//!               │ Request parsed
//!               ▼
//!        ┌──────────────────┐
//!        │   Processing     │ ← Route and run the handler
//!        └──────┬───────────┘
//!               │ Response ready
//!               ▼
//!        ┌──────────────────┐
//!        │    Writing       │ ← Serialize and send
//!        └──────┬───────────┘
//!               ├─ Buffered → Content-Length body, connection closed
//!               └─ Streamed → chunked body, connection left open
//! ```
//!
//! - **`connection`**: the per-connection state machine
//! - **`parser`**: lenient request parsing from a byte buffer
//! - **`request`** / **`headers`**: the parsed request and its bounded header list
//! - **`response`**: response construction for handlers
//! - **`chunked`**: chunk framing for streamed responses
//! - **`writer`**: serialization and partial-write-safe output
//! - **`mime`**: content types by file extension

pub mod chunked;
pub mod connection;
pub mod headers;
pub mod mime;
pub mod parser;
pub mod request;
pub mod response;
pub mod writer;
