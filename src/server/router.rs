use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::CapacityExceeded;
use crate::handlers::static_files;
use crate::http::request::{Method, Request};
use crate::http::response::Response;

/// Maximum number of registered routes.
pub const MAX_ROUTES: usize = 100;

/// Prefixes served from the public directory by `use_static_files`.
const STATIC_PREFIXES: &[&str] = &[
    "/css/",
    "/js/",
    "/img/",
    "/images/",
    "/fonts/",
    "/assets/",
    "/uploads/",
    "/media/",
    "/favicon.ico",
];

pub type Handler = Arc<dyn Fn(&Request, &mut Response) + Send + Sync>;

#[derive(Clone)]
pub struct Route {
    pub method: Method,
    /// Exact path, or a prefix when it ends with `/`
    pub path: String,
    handler: Handler,
    dev_page: bool,
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("dev_page", &self.dev_page)
            .finish_non_exhaustive()
    }
}

impl Route {
    fn matches_exact(&self, method: Method, path: &str) -> bool {
        self.method == method && self.path == path
    }

    fn matches_prefix(&self, method: Method, path: &str) -> bool {
        self.method == method && self.path.ends_with('/') && path.starts_with(&self.path)
    }

    /// Whether this is the page delivered as a chunked stream in dev mode.
    pub fn is_dev_page(&self) -> bool {
        self.dev_page
    }

    pub fn call(&self, req: &Request, res: &mut Response) {
        (self.handler)(req, res)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn try_route<F>(&mut self, method: Method, path: &str, handler: F) -> Result<(), CapacityExceeded>
    where
        F: Fn(&Request, &mut Response) + Send + Sync + 'static,
    {
        self.push(method, path, Arc::new(handler), false)
    }

    /// Registers a route; dropped with a warning once the table is full.
    pub fn route<F>(&mut self, method: Method, path: &str, handler: F) -> &mut Self
    where
        F: Fn(&Request, &mut Response) + Send + Sync + 'static,
    {
        if let Err(e) = self.try_route(method, path, handler) {
            tracing::warn!(path, "{e}, route dropped");
        }
        self
    }

    /// Registers the GET route streamed with chunked coding in dev mode.
    pub fn dev_page<F>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(&Request, &mut Response) + Send + Sync + 'static,
    {
        if let Err(e) = self.push(Method::GET, path, Arc::new(handler), true) {
            tracing::warn!(path, "{e}, route dropped");
        }
        self
    }

    /// Serves the usual asset prefixes from `root`.
    pub fn use_static_files(&mut self, root: impl Into<PathBuf>) -> &mut Self {
        let handler: Handler = Arc::new(static_files::serve(root));
        for prefix in STATIC_PREFIXES {
            if let Err(e) = self.push(Method::GET, prefix, Arc::clone(&handler), false) {
                tracing::warn!(path = prefix, "{e}, route dropped");
            }
        }
        self
    }

    /// Exact matches win over prefix matches; among prefixes the longest wins.
    pub fn find(&self, method: Method, path: &str) -> Option<&Route> {
        if let Some(route) = self.routes.iter().find(|r| r.matches_exact(method, path)) {
            return Some(route);
        }
        self.routes
            .iter()
            .filter(|r| r.matches_prefix(method, path))
            .max_by_key(|r| r.path.len())
    }

    fn push(&mut self, method: Method, path: &str, handler: Handler, dev_page: bool) -> Result<(), CapacityExceeded> {
        if self.routes.len() >= MAX_ROUTES {
            return Err(CapacityExceeded {
                table: "route",
                capacity: MAX_ROUTES,
            });
        }
        self.routes.push(Route {
            method,
            path: path.to_string(),
            handler,
            dev_page,
        });
        Ok(())
    }
}
