//! # formecho
//!
//! A development HTTP server that shows you what your forms send.
//!
//! Every `POST` is decoded as `multipart/form-data`, logged, and answered with
//! a readable dump of its fields and uploaded files. Everything else falls
//! through to the project's static files, mounted under a configurable base
//! path.
//!
//! ## Pieces
//!
//! - [`middleware::FormEcho`] — the form-echo middleware
//! - [`form::decode`] — multipart decoding via [`multer`]
//! - [`render::render`] — depth-limited dumps of a decoded form
//! - [`Router`] — middleware chain, radix-tree routes via [`matchit`], fallback
//! - [`Server`] — hyper HTTP/1.1 + HTTP/2, graceful shutdown on SIGTERM / Ctrl-C
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use formecho::middleware::{FormEcho, Trace};
//! use formecho::{Router, Server, StaticFiles};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), formecho::Error> {
//!     let app = Router::new()
//!         .layer(Trace)
//!         .layer(FormEcho::dev())
//!         .fallback(StaticFiles::new("public", "./"));
//!
//!     Server::bind("127.0.0.1:5173").await?.serve(app).await
//! }
//! ```

mod error;
mod handler;
mod request;
mod response;
mod router;
mod server;
mod static_files;

pub mod config;
pub mod form;
pub mod middleware;
pub mod render;

pub use config::Config;
pub use error::Error;
pub use handler::{BoxFuture, Handler};
pub use request::{Body, BoxError, Request};
pub use response::{ContentType, IntoResponse, Response, ResponseBuilder};
pub use router::Router;
pub use server::Server;
pub use static_files::StaticFiles;
