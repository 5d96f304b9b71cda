//! Plaintext listener that sends every client to the TLS port.
//!
//! It reads nothing from the client: each accepted connection gets the same
//! 301 and is closed. It shares nothing with the main loop except the TLS
//! port it points at.

use std::net::SocketAddr;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::server::shutdown::Shutdown;

/// The complete redirect response for `https://<host>:<tls_port>/`.
pub fn redirect_response(host: &str, tls_port: u16) -> String {
    let location = Url::parse(&format!("https://{host}:{tls_port}/"))
        .map(|url| url.to_string())
        .unwrap_or_else(|_| format!("https://{host}:{tls_port}/"));

    format!(
        "HTTP/1.1 301 Moved Permanently\r\n\
         Location: {location}\r\n\
         Connection: close\r\n\r\n"
    )
}

/// Whether binding `redirect_addr` would take the TLS listener's port.
pub fn collides_with(redirect_addr: &str, tls_addr: SocketAddr) -> bool {
    let Ok(redirect) = redirect_addr.parse::<SocketAddr>() else {
        return false;
    };
    redirect.port() != 0
        && redirect.port() == tls_addr.port()
        && (redirect.ip() == tls_addr.ip() || redirect.ip().is_unspecified() || tls_addr.ip().is_unspecified())
}

/// Binds `addr` and starts answering. A bind failure, or an address that
/// collides with the TLS listener, is logged and leaves the main server
/// running without a redirect listener.
pub async fn start(addr: &str, host: &str, tls_addr: SocketAddr, shutdown: Shutdown) -> Option<JoinHandle<()>> {
    if collides_with(addr, tls_addr) {
        warn!(addr, tls = %tls_addr, "redirect address is the TLS port, set tls.redirect_addr; redirect disabled");
        return None;
    }

    let tls_port = tls_addr.port();
    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(addr, error = %e, "redirect binding failed");
            return None;
        }
    };
    info!(addr, "redirect listener on http://{addr}");
    Some(tokio::spawn(run(listener, redirect_response(host, tls_port), shutdown)))
}

pub async fn run(listener: TcpListener, response: String, shutdown: Shutdown) {
    loop {
        let accepted = tokio::select! {
            _ = shutdown.wait() => break,
            accepted = listener.accept() => accepted,
        };

        let (mut socket, peer) = match accepted {
            Ok(pair) => pair,
            Err(e) => {
                warn!(error = %e, "redirect accept failed");
                continue;
            }
        };

        if let Err(e) = socket.write_all(response.as_bytes()).await {
            debug!(%peer, error = %e, "redirect write failed");
            continue;
        }
        let _ = socket.shutdown().await;
        debug!(%peer, "redirected to TLS");
    }
    debug!("redirect listener stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_addresses_collide() {
        let tls: SocketAddr = "0.0.0.0:8080".parse().unwrap();
        assert!(collides_with("0.0.0.0:8080", tls));
        assert!(collides_with("127.0.0.1:8080", tls));
        assert!(!collides_with("0.0.0.0:8081", tls));

        let local: SocketAddr = "127.0.0.1:8443".parse().unwrap();
        assert!(!collides_with("127.0.0.2:8443", local));
        assert!(!collides_with("127.0.0.1:0", local));
        assert!(!collides_with("not an address", local));
    }

    #[tokio::test]
    async fn colliding_address_is_not_bound() {
        let tls: SocketAddr = "127.0.0.1:8443".parse().unwrap();
        assert!(start("0.0.0.0:8443", "localhost", tls, Shutdown::new()).await.is_none());
    }

    #[test]
    fn response_points_at_tls_port() {
        let response = redirect_response("localhost", 8443);
        assert!(response.starts_with("HTTP/1.1 301 Moved Permanently\r\n"));
        assert!(response.contains("Location: https://localhost:8443/\r\n"));
        assert!(response.ends_with("Connection: close\r\n\r\n"));
    }
}
