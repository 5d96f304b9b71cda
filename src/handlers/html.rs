use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use crate::http::request::Request;
use crate::http::response::{Response, StatusCode};

const NOT_FOUND_HTML: &str = "<h1>404 Not Found</h1>";
const HTML_TYPE: &str = "text/html; charset=utf-8";

/// Handler serving one HTML file from `dir`.
pub fn page(
    dir: impl Into<PathBuf>,
    file: impl AsRef<Path>,
) -> impl Fn(&Request, &mut Response) + Send + Sync + 'static {
    let path = dir.into().join(file);
    move |_: &Request, res: &mut Response| render_html(res, &path)
}

/// Renders an HTML file into `res`.
///
/// Buffered: the file as body, or a 404 page. Streamed: always 200 with
/// no-cache and keep-alive headers, the file (or the 404 markup) as a single
/// chunk.
pub fn render_html(res: &mut Response, path: &Path) {
    let content = load_html_file(path);

    if !res.is_streamed() {
        res.set_header("Content-Type", HTML_TYPE);
        match content {
            Some(content) => res.set_body_bin(content),
            None => {
                res.set_status(StatusCode::NotFound);
                res.set_body(NOT_FOUND_HTML);
            }
        }
        return;
    }

    res.set_status(StatusCode::Ok);
    res.set_header("Content-Type", HTML_TYPE);
    res.set_header("Cache-Control", "no-cache");
    res.set_header("Connection", "keep-alive");

    let content = content.unwrap_or_else(|| NOT_FOUND_HTML.as_bytes().to_vec());
    debug!(bytes = content.len(), "streaming page");
    if let Err(e) = res.write_chunk(&content) {
        warn!(path = %path.display(), "{e}, page not streamed");
    }
}

fn load_html_file(path: &Path) -> Option<Vec<u8>> {
    match std::fs::read(path) {
        Ok(content) => {
            info!(path = %path.display(), "HTML file loaded");
            Some(content)
        }
        Err(e) => {
            error!(path = %path.display(), error = %e, "HTML file not found");
            None
        }
    }
}
