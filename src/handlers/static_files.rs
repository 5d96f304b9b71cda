use std::path::PathBuf;

use tracing::warn;

use crate::http::mime;
use crate::http::request::Request;
use crate::http::response::{Response, StatusCode};

/// Handler serving files below `root`, addressed by the request path.
pub fn serve(root: impl Into<PathBuf>) -> impl Fn(&Request, &mut Response) + Send + Sync + 'static {
    let root = root.into();
    move |req: &Request, res: &mut Response| {
        if req.path.contains("..") {
            res.set_status(StatusCode::Forbidden);
            res.set_header("Content-Type", "text/plain");
            res.set_body("403 Forbidden");
            return;
        }

        let file = root.join(req.path.trim_start_matches('/'));
        if !file.is_file() {
            res.set_status(StatusCode::NotFound);
            res.set_header("Content-Type", "text/html");
            res.set_body("<h1>404 Not Found</h1>");
            return;
        }

        match std::fs::read(&file) {
            Ok(content) => {
                res.set_header("Content-Type", mime::from_path(&file));
                res.set_body_bin(content);
            }
            Err(e) => {
                warn!(path = %file.display(), error = %e, "failed to read static file");
                res.set_status(StatusCode::InternalServerError);
                res.set_body("Internal Server Error");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::request::{Method, RequestBuilder};

    fn get(path: &str) -> Request {
        RequestBuilder::new().method(Method::GET).path(path).build().unwrap()
    }

    #[test]
    fn serves_file_with_mime() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir(root.path().join("css")).unwrap();
        std::fs::write(root.path().join("css/site.css"), "body{}").unwrap();

        let handler = serve(root.path());
        let mut res = Response::default();
        handler(&get("/css/site.css"), &mut res);

        assert_eq!(res.status, StatusCode::Ok);
        assert_eq!(res.headers.get("Content-Type"), Some("text/css"));
        assert_eq!(res.body, b"body{}");
    }

    #[test]
    fn rejects_parent_traversal() {
        let root = tempfile::tempdir().unwrap();
        let handler = serve(root.path());
        let mut res = Response::default();
        handler(&get("/css/../../etc/passwd"), &mut res);

        assert_eq!(res.status, StatusCode::Forbidden);
    }

    #[test]
    fn missing_file_and_directory_are_404() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir(root.path().join("img")).unwrap();
        let handler = serve(root.path());

        for path in ["/img/none.png", "/img/"] {
            let mut res = Response::default();
            handler(&get(path), &mut res);
            assert_eq!(res.status, StatusCode::NotFound, "{path}");
        }
    }
}
