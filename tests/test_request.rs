use livehttp::http::request::{Method, RequestBuilder};

#[test]
fn test_request_header_retrieval() {
    let req = RequestBuilder::new()
        .method(Method::GET)
        .path("/")
        .header("Host", "example.com")
        .header("Content-Type", "application/json")
        .build()
        .unwrap();

    assert_eq!(req.header("Host"), Some("example.com"));
    assert_eq!(req.header("content-type"), Some("application/json"));
    assert_eq!(req.header("Missing"), None);
}

#[test]
fn test_request_content_length_parsing() {
    let req = RequestBuilder::new()
        .method(Method::POST)
        .path("/api")
        .header("Content-Length", "42")
        .build()
        .unwrap();

    assert_eq!(req.content_length(), 42);
}

#[test]
fn test_request_content_length_missing_or_invalid() {
    let missing = RequestBuilder::new().method(Method::POST).path("/").build().unwrap();
    assert_eq!(missing.content_length(), 0);

    let invalid = RequestBuilder::new()
        .method(Method::POST)
        .path("/")
        .header("Content-Length", "lots")
        .build()
        .unwrap();
    assert_eq!(invalid.content_length(), 0);
}

#[test]
fn test_request_builder_splits_query() {
    let req = RequestBuilder::new()
        .method(Method::GET)
        .path("/search?q=rust")
        .build()
        .unwrap();

    assert_eq!(req.path, "/search");
    assert_eq!(req.query_string.as_deref(), Some("q=rust"));
    assert_eq!(req.version, "HTTP/1.1");
}

#[test]
fn test_request_builder_requires_method_and_path() {
    assert!(RequestBuilder::new().path("/").build().is_err());
    assert!(RequestBuilder::new().method(Method::GET).build().is_err());
}

#[test]
fn test_accept_encoding() {
    let req = RequestBuilder::new()
        .method(Method::GET)
        .path("/")
        .header("Accept-Encoding", "gzip, br")
        .build()
        .unwrap();
    assert_eq!(req.accept_encoding(), Some("gzip, br"));

    let none = RequestBuilder::new().method(Method::GET).path("/").build().unwrap();
    assert_eq!(none.accept_encoding(), None);
}

#[test]
fn test_method_round_trip_names() {
    for method in [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::DELETE,
        Method::PATCH,
        Method::HEAD,
        Method::OPTIONS,
    ] {
        assert_eq!(Method::parse(method.as_str()), method);
    }
    assert_eq!(Method::parse("UNKNOWN"), Method::Unknown);
}
