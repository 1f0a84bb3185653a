//! Logs and echoes multipart form submissions.
//!
//! Register it on a development server to see exactly what a form posts:
//!
//! ```text
//! $ curl -F name=Ada http://localhost:5173/anything
//! Form data:
//!
//! { fields: { name: [ 'Ada' ] }, files: {} }
//! ```
//!
//! Only `POST` requests are touched. Everything else goes straight to the
//! next handler.
//!
//! In [`FormEchoMode::Preview`] the middleware logs the raw request and
//! passes it on without reading the body, matching a preview server that
//! serves already-built output.

use std::path::PathBuf;
use std::sync::Arc;

use http::{Method, StatusCode};
use serde::{Deserialize, Deserializer};
use tracing::{error, info, warn};

use crate::form::{self, DEFAULT_MAX_BODY_BYTES, DecodeError, FormOptions};
use crate::handler::BoxFuture;
use crate::middleware::{Middleware, Next};
use crate::render::{self, RenderFormat, RenderOptions};
use crate::request::Request;
use crate::response::Response;

/// Which server the middleware is attached to.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FormEchoMode {
    /// Decode, log and answer every POST.
    #[default]
    Dev,
    /// Log every POST and pass it on untouched.
    Preview,
}

/// Settings for [`FormEcho`], usually the `[form_echo]` table of the config
/// file.
#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FormEchoConfig {
    pub mode: FormEchoMode,
    pub format: RenderFormat,
    pub depth: usize,
    /// Status sent when a POST body cannot be decoded.
    #[serde(deserialize_with = "status_code")]
    pub decode_error_status: StatusCode,
    pub max_body_bytes: usize,
    pub upload_dir: Option<PathBuf>,
    pub keep_uploads: bool,
}

impl Default for FormEchoConfig {
    fn default() -> Self {
        Self {
            mode: FormEchoMode::Dev,
            format: RenderFormat::Inspect,
            depth: RenderOptions::default().depth,
            decode_error_status: StatusCode::BAD_REQUEST,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            upload_dir: None,
            keep_uploads: false,
        }
    }
}

impl FormEchoConfig {
    fn render_options(&self) -> RenderOptions {
        RenderOptions { format: self.format, depth: self.depth }
    }

    fn form_options(&self) -> FormOptions {
        FormOptions {
            max_body_bytes: self.max_body_bytes,
            upload_dir: self.upload_dir.clone(),
            keep_uploads: self.keep_uploads,
        }
    }
}

fn status_code<'de, D: Deserializer<'de>>(de: D) -> Result<StatusCode, D::Error> {
    let code = u16::deserialize(de)?;
    StatusCode::from_u16(code).map_err(serde::de::Error::custom)
}

/// The form-echo middleware. See the [module docs](self).
#[derive(Clone, Debug, Default)]
pub struct FormEcho {
    config: Arc<FormEchoConfig>,
}

impl FormEcho {
    pub fn new(config: FormEchoConfig) -> Self {
        Self { config: Arc::new(config) }
    }

    /// Decode-and-echo with default settings.
    pub fn dev() -> Self {
        Self::default()
    }

    /// Log-only with default settings.
    pub fn preview() -> Self {
        Self::new(FormEchoConfig { mode: FormEchoMode::Preview, ..FormEchoConfig::default() })
    }

    pub fn config(&self) -> &FormEchoConfig {
        &self.config
    }
}

impl Middleware for FormEcho {
    fn call(&self, req: Request, next: Next) -> BoxFuture {
        if req.method() != Method::POST {
            return next.run(req);
        }

        match self.config.mode {
            FormEchoMode::Preview => {
                warn!(request = ?req, "POST reached the preview server");
                next.run(req)
            }
            FormEchoMode::Dev => {
                let config = Arc::clone(&self.config);
                Box::pin(async move { echo(req, &config).await })
            }
        }
    }
}

async fn echo(req: Request, config: &FormEchoConfig) -> Response {
    let url = req.uri().to_string();
    warn!(%url, "form POST");

    let content_type = req.content_type().map(str::to_owned);
    let decoded = form::decode(content_type.as_deref(), req.into_body(), &config.form_options()).await;

    match decoded {
        Ok(form) => {
            let rendered = render::render(&form, &config.render_options());
            info!("Form data: {rendered}");
            Response::text(format!("Form data:\n\n{rendered}"))
        }
        Err(e) => {
            error!(%url, error = %e, "form decode failed");
            // A failed upload spool is a server fault.
            let status = match &e {
                DecodeError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
                _ => config.decode_error_status,
            };
            Response::builder()
                .status(status)
                .text(format!("Form decode error: {e}\n"))
        }
    }
}
