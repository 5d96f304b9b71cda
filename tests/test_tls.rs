//! HTTPS end to end, using the self-signed `localhost` certificate in
//! `tests/fixtures`.

use std::fs::File;
use std::io::BufReader;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use livehttp::config::Config;
use livehttp::http::request::Method;
use livehttp::server::{Server, Shutdown};
use rustls::pki_types::ServerName;
use rustls::{ClientConfig, RootCertStore};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_rustls::TlsConnector;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

fn tls_config(redirect_addr: &str) -> Config {
    let mut config = Config {
        listen_addr: "127.0.0.1:0".to_string(),
        ..Config::default()
    };
    config.tls.enabled = true;
    config.tls.cert = Some(fixture("cert.pem"));
    config.tls.key = Some(fixture("key.pem"));
    config.tls.redirect_addr = redirect_addr.to_string();
    config
}

fn connector() -> TlsConnector {
    let mut roots = RootCertStore::empty();
    let mut pem = BufReader::new(File::open(fixture("cert.pem")).unwrap());
    for cert in rustls_pemfile::certs(&mut pem) {
        roots.add(cert.unwrap()).unwrap();
    }

    let config = ClientConfig::builder_with_provider(Arc::new(rustls::crypto::ring::default_provider()))
        .with_safe_default_protocol_versions()
        .unwrap()
        .with_root_certificates(roots)
        .with_no_client_auth();
    TlsConnector::from(Arc::new(config))
}

/// Starts a TLS server whose `/hello` route counts its invocations.
async fn start(config: Config) -> (SocketAddr, Arc<AtomicUsize>, Shutdown, JoinHandle<anyhow::Result<()>>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);

    let mut server = Server::new(config);
    server.route(Method::GET, "/hello", move |_, res| {
        counter.fetch_add(1, Ordering::SeqCst);
        res.set_header("Content-Type", "text/plain");
        res.set_body("hi");
    });

    let bound = server.bind().await.unwrap();
    let addr = bound.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let handle = tokio::spawn(bound.run(shutdown.clone()));
    (addr, calls, shutdown, handle)
}

async fn stop(shutdown: Shutdown, handle: JoinHandle<anyhow::Result<()>>) {
    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("server stops")
        .unwrap()
        .unwrap();
}

async fn https_get(addr: SocketAddr, path: &str) -> String {
    let tcp = TcpStream::connect(addr).await.unwrap();
    let name = ServerName::try_from("localhost").unwrap();
    let mut tls = connector().connect(name, tcp).await.unwrap();

    tls.write_all(format!("GET {path} HTTP/1.1\r\nHost: localhost\r\n\r\n").as_bytes())
        .await
        .unwrap();

    let mut out = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), tls.read_to_end(&mut out))
        .await
        .expect("server closes TLS connection")
        .unwrap();
    String::from_utf8_lossy(&out).into_owned()
}

/// A port nothing is listening on right now.
async fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

#[tokio::test]
async fn test_tls_request_is_routed() {
    let (addr, calls, shutdown, handle) = start(tls_config("127.0.0.1:0")).await;

    let response = https_get(addr, "/hello").await;

    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(response.contains("Content-Length: 2\r\n"));
    assert!(response.ends_with("\r\n\r\nhi"));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    stop(shutdown, handle).await;
}

#[tokio::test]
async fn test_plaintext_on_tls_port_gets_no_http_response() {
    let (addr, calls, shutdown, handle) = start(tls_config("127.0.0.1:0")).await;

    let mut plain = TcpStream::connect(addr).await.unwrap();
    plain.write_all(b"GET /hello HTTP/1.1\r\nHost: localhost\r\n\r\n").await.unwrap();

    // At most a TLS alert comes back before the connection is dropped.
    let mut out = Vec::new();
    let _ = tokio::time::timeout(Duration::from_secs(5), plain.read_to_end(&mut out))
        .await
        .expect("server drops plaintext connection");
    assert!(!out.starts_with(b"HTTP/"));
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    // Only that connection was affected.
    let response = https_get(addr, "/hello").await;
    assert!(response.ends_with("\r\n\r\nhi"));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    stop(shutdown, handle).await;
}

#[tokio::test]
async fn test_redirect_port_points_at_tls_port() {
    let redirect_port = free_port().await;
    let (addr, _calls, shutdown, handle) = start(tls_config(&format!("127.0.0.1:{redirect_port}"))).await;

    let mut out = String::new();
    tokio::time::timeout(Duration::from_secs(5), async {
        // The redirect listener starts with the event loop.
        let mut client = loop {
            match TcpStream::connect(("127.0.0.1", redirect_port)).await {
                Ok(client) => break client,
                Err(_) => tokio::time::sleep(Duration::from_millis(20)).await,
            }
        };
        client.read_to_string(&mut out).await.unwrap();
    })
    .await
    .expect("redirect answered");

    assert!(out.starts_with("HTTP/1.1 301 Moved Permanently\r\n"));
    assert!(out.contains(&format!("Location: https://localhost:{}/\r\n", addr.port())));
    assert!(out.contains("Connection: close\r\n"));

    stop(shutdown, handle).await;
}
