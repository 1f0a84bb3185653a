//! Static file fallback.
//!
//! Serves the files of a project directory the way a development server
//! does, mounted under a public `base` path. This is what requests fall
//! through to when no middleware or route answers them.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use http::{Method, StatusCode};
use tracing::{debug, error};

use crate::handler::{BoxFuture, BoxedHandler, ErasedHandler, Handler, private};
use crate::request::Request;
use crate::response::{ContentType, Response};

/// Handler serving files below `root` at URL prefix `base`.
///
/// `base` accepts the same spellings a bundler config does: `"./"`, `"/"` and
/// `""` all mount at the site root; `"/app"` and `"/app/"` mount at `/app/`.
#[derive(Clone, Debug)]
pub struct StaticFiles {
    root: Arc<Path>,
    base: Arc<str>,
}

impl StaticFiles {
    pub fn new(root: impl Into<PathBuf>, base: &str) -> Self {
        let root: PathBuf = root.into();
        Self {
            root: Arc::from(root),
            base: Arc::from(normalize_base(base)),
        }
    }

    pub fn root(&self) -> &Path { &self.root }
    pub fn base(&self) -> &str { &self.base }

    async fn serve(&self, req: Request) -> Response {
        if req.method() != Method::GET && req.method() != Method::HEAD {
            return Response::builder()
                .status(StatusCode::METHOD_NOT_ALLOWED)
                .header("allow", "GET, HEAD")
                .no_body();
        }

        let Some(mut path) = self.resolve(req.path()) else {
            debug!(path = %req.path(), "outside base or not a plain path");
            return Response::status(StatusCode::NOT_FOUND);
        };

        if tokio::fs::metadata(&path).await.is_ok_and(|m| m.is_dir()) {
            path.push("index.html");
        }

        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let content_type = path.extension()
                    .and_then(|e| e.to_str())
                    .map_or(ContentType::OctetStream, ContentType::from_extension);
                Response::builder().bytes(content_type, bytes)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Response::status(StatusCode::NOT_FOUND),
            Err(e) => {
                error!(path = %path.display(), error = %e, "failed to read static file");
                Response::status(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }

    /// Maps a URL path to a file path under `root`, or `None` if the path is
    /// not under `base` or tries to leave `root`.
    ///
    /// Segments are percent-decoded one at a time, so an encoded `/` stays
    /// inside its segment and is rejected there.
    fn resolve(&self, url_path: &str) -> Option<PathBuf> {
        let rest = match url_path.strip_prefix(&*self.base) {
            Some(rest) => rest,
            // "/app" addresses the "/app/" mount itself.
            None if url_path.len() + 1 == self.base.len() && self.base.starts_with(url_path) => "",
            None => return None,
        };

        let mut path = self.root.to_path_buf();
        for raw in rest.split('/').filter(|s| !s.is_empty()) {
            let segment = urlencoding::decode(raw).ok()?;
            if segment.contains(['/', '\\', '\0']) {
                return None;
            }
            match Path::new(&*segment).components().next() {
                Some(Component::Normal(part)) => path.push(part),
                Some(Component::CurDir) => {}
                _ => return None,
            }
        }
        Some(path)
    }
}

fn normalize_base(base: &str) -> String {
    let trimmed = base.trim_start_matches('.').trim_matches('/');
    if trimmed.is_empty() {
        "/".to_owned()
    } else {
        format!("/{trimmed}/")
    }
}

impl private::Sealed for StaticFiles {}

impl Handler for StaticFiles {
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(self)
    }
}

impl ErasedHandler for StaticFiles {
    fn call(&self, req: Request) -> BoxFuture {
        let this = self.clone();
        Box::pin(async move { this.serve(req).await })
    }
}
