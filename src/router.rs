//! Radix-tree request router with a middleware chain in front of it.
//!
//! One tree per HTTP method. Middleware registered with [`Router::layer`] run
//! first, in registration order; whatever they pass on is routed, and anything
//! no route claims goes to the fallback handler.

use std::collections::HashMap;
use std::sync::Arc;

use http::Method;
use matchit::Router as MatchitRouter;

use crate::handler::{self, BoxFuture, BoxedHandler, Handler};
use crate::middleware::{BoxedMiddleware, Middleware, Next};
use crate::request::Request;

/// The application router.
///
/// Build it once at startup; pass it to [`Server::serve`](crate::Server::serve).
/// Every builder method returns `self` so registrations chain naturally.
///
/// ```rust
/// use formecho::middleware::{FormEcho, Trace};
/// use formecho::{Request, Response, Router};
/// use http::Method;
///
/// async fn ping(_req: Request) -> Response { Response::text("pong") }
///
/// let app = Router::new()
///     .layer(Trace)
///     .layer(FormEcho::default())
///     .on(Method::GET, "/ping", ping);
/// ```
#[derive(Clone)]
pub struct Router {
    inner: Arc<Inner>,
}

#[derive(Clone)]
pub(crate) struct Inner {
    pub(crate) middleware: Vec<BoxedMiddleware>,
    routes: HashMap<Method, MatchitRouter<BoxedHandler>>,
    fallback: BoxedHandler,
}

impl Router {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                middleware: Vec::new(),
                routes: HashMap::new(),
                fallback: handler::not_found.into_boxed_handler(),
            }),
        }
    }

    /// Register a handler for a method + path pair.
    ///
    /// Path parameters use `{name}` syntax — `req.param("name")` retrieves them.
    ///
    /// # Panics
    ///
    /// Panics if `path` is not a valid route or conflicts with an existing
    /// one. Routes are fixed at startup, so this is a programming error.
    pub fn on(mut self, method: Method, path: &str, handler: impl Handler) -> Self {
        Arc::make_mut(&mut self.inner)
            .routes
            .entry(method)
            .or_default()
            .insert(path, handler.into_boxed_handler())
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        self
    }

    /// Append a middleware to the chain. The first one registered sees the
    /// request first.
    pub fn layer(mut self, middleware: impl Middleware) -> Self {
        Arc::make_mut(&mut self.inner).middleware.push(Arc::new(middleware));
        self
    }

    /// Handler for requests no route matches. Defaults to `404 Not Found`.
    pub fn fallback(mut self, handler: impl Handler) -> Self {
        Arc::make_mut(&mut self.inner).fallback = handler.into_boxed_handler();
        self
    }

    /// Runs one request through the middleware chain and routing.
    pub fn handle(&self, req: Request) -> BoxFuture {
        Next::new(Arc::clone(&self.inner)).run(req)
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}

impl Inner {
    pub(crate) fn route(&self, mut req: Request) -> BoxFuture {
        let matched = self.routes
            .get(req.method())
            .and_then(|tree| tree.at(req.path()).ok())
            .map(|m| {
                let params: HashMap<String, String> = m.params.iter()
                    .map(|(k, v)| (k.to_owned(), v.to_owned()))
                    .collect();
                (Arc::clone(m.value), params)
            });

        match matched {
            Some((handler, params)) => {
                req.set_params(params);
                handler.call(req)
            }
            None => self.fallback.call(req),
        }
    }
}
