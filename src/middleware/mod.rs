//! Middleware layer.
//!
//! Middleware intercepts requests on their way to routing. Tracing and
//! answering particular requests before they reach a route both live here.
//!
//! A middleware receives the [`Request`] and a [`Next`] continuation. It can
//! answer the request itself by returning a [`Response`](crate::Response), or hand it on with
//! [`Next::run`]. `Next` is consumed by `run`, so the rest of the chain is
//! invoked at most once per request.
//!
//! ```rust
//! use formecho::middleware::Next;
//! use formecho::{Request, Response, Router};
//!
//! async fn deny_admin(req: Request, next: Next) -> Response {
//!     if req.path().starts_with("/admin") {
//!         return Response::status(http::StatusCode::FORBIDDEN);
//!     }
//!     next.run(req).await
//! }
//!
//! let app = Router::new().layer(deny_admin);
//! ```
//!
//! Built-in middleware:
//! - [`form_echo`] — logs and echoes multipart form submissions
//! - [`trace`] — per-request span with method, path, status, latency

pub mod form_echo;
pub mod trace;

use std::future::Future;
use std::sync::Arc;

use crate::handler::BoxFuture;
use crate::request::Request;
use crate::response::IntoResponse;
use crate::router::Inner;

pub use form_echo::{FormEcho, FormEchoConfig, FormEchoMode};
pub use trace::Trace;

/// A request interceptor registered with [`Router::layer`](crate::Router::layer).
///
/// Implemented for every `Fn(Request, Next) -> impl Future<Output = impl IntoResponse>`
/// and for the built-in middleware types.
pub trait Middleware: Send + Sync + 'static {
    fn call(&self, req: Request, next: Next) -> BoxFuture;
}

pub(crate) type BoxedMiddleware = Arc<dyn Middleware>;

impl<F, Fut, R> Middleware for F
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call(&self, req: Request, next: Next) -> BoxFuture {
        let fut = (self)(req, next);
        Box::pin(async move { fut.await.into_response() })
    }
}

/// The remainder of the chain after the current middleware.
pub struct Next {
    inner: Arc<Inner>,
    index: usize,
}

impl Next {
    pub(crate) fn new(inner: Arc<Inner>) -> Self {
        Self { inner, index: 0 }
    }

    /// Passes `req` to the next middleware, or to routing once the chain is
    /// exhausted.
    pub fn run(mut self, req: Request) -> BoxFuture {
        let current = self.inner.middleware.get(self.index).cloned();
        match current {
            Some(mw) => {
                self.index += 1;
                mw.call(req, self)
            }
            None => self.inner.route(req),
        }
    }
}

impl std::fmt::Debug for Next {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Next")
            .field("index", &self.index)
            .field("remaining", &self.inner.middleware.len().saturating_sub(self.index))
            .finish()
    }
}
