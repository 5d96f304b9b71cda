//! Listening side: the event loop, routing, TLS, the redirect listener and
//! parked streamed connections.

pub mod listener;
pub mod redirect;
pub mod router;
pub mod shutdown;
pub mod streams;
pub mod tls;

pub use listener::{BoundServer, Server, run};
pub use router::Router;
pub use shutdown::Shutdown;
