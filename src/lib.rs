//! livehttp - embeddable HTTP/HTTPS server with dev-mode hot reload.
//!
//! Requests are serviced inline by a single event loop. In dev mode a
//! watcher thread observes the content directory and wakes the loop when a
//! file changes, and the dev page is streamed with chunked coding.

pub mod config;
pub mod error;
pub mod handlers;
pub mod http;
pub mod reload;
pub mod server;
