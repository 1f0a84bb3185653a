//! Per-request tracing span.

use std::time::Instant;

use tracing::{Instrument, info, info_span};

use crate::handler::BoxFuture;
use crate::middleware::{Middleware, Next};
use crate::request::Request;

/// Opens a `request` span carrying method and path, and logs status and
/// latency once the rest of the chain has answered.
///
/// Register it first so every later middleware logs inside the span.
#[derive(Clone, Copy, Debug, Default)]
pub struct Trace;

impl Middleware for Trace {
    fn call(&self, req: Request, next: Next) -> BoxFuture {
        let span = info_span!("request", method = %req.method(), path = %req.path());
        Box::pin(
            async move {
                let start = Instant::now();
                let res = next.run(req).await;
                info!(
                    status = res.status_code().as_u16(),
                    latency_us = start.elapsed().as_micros() as u64,
                    "finished"
                );
                res
            }
            .instrument(span),
        )
    }
}
