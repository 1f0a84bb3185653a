//! `formecho.toml` configuration.
//!
//! ```toml
//! base = "./"
//! root = "public"
//!
//! [server]
//! addr = "127.0.0.1:5173"
//!
//! [form_echo]
//! mode = "dev"              # or "preview"
//! format = "inspect"        # "compact", "json"
//! depth = 3
//! decode_error_status = 400
//! max_body_bytes = 10485760
//! # upload_dir = "/tmp/uploads"
//! keep_uploads = false
//! ```
//!
//! Every key is optional.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::Error;
use crate::middleware::{FormEcho, FormEchoConfig, Trace};
use crate::router::Router;
use crate::static_files::StaticFiles;

pub const DEFAULT_ADDR: &str = "127.0.0.1:5173";

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Public path the site is mounted under. Passed to the static file
    /// fallback unchanged.
    pub base: String,
    /// Directory served for requests no middleware answers.
    pub root: PathBuf,
    pub server: ServerConfig,
    pub form_echo: FormEchoConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub addr: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base: "./".to_owned(),
            root: PathBuf::from("."),
            server: ServerConfig::default(),
            form_echo: FormEchoConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { addr: DEFAULT_ADDR.to_owned() }
    }
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, Error> {
        Ok(toml::from_str(content)?)
    }

    /// Assembles the request pipeline: tracing, then form echo, then static
    /// files under `base`.
    pub fn router(&self) -> Router {
        Router::new()
            .layer(Trace)
            .layer(FormEcho::new(self.form_echo.clone()))
            .fallback(StaticFiles::new(self.root.clone(), &self.base))
    }
}

#[cfg(test)]
mod tests {
    use http::StatusCode;

    use super::*;
    use crate::middleware::FormEchoMode;
    use crate::render::RenderFormat;

    #[test]
    fn empty_file_gives_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.base, "./");
        assert_eq!(config.root, PathBuf::from("."));
        assert_eq!(config.server.addr, DEFAULT_ADDR);
        assert_eq!(config.form_echo.mode, FormEchoMode::Dev);
        assert_eq!(config.form_echo.decode_error_status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn parses_full_config() {
        let config = Config::from_toml_str(
            r#"
            base = "/app/"
            root = "dist"

            [server]
            addr = "0.0.0.0:4173"

            [form_echo]
            mode = "preview"
            format = "compact"
            depth = 5
            keep_uploads = true
            upload_dir = "/tmp/up"
            "#,
        )
        .unwrap();

        assert_eq!(config.base, "/app/");
        assert_eq!(config.root, PathBuf::from("dist"));
        assert_eq!(config.server.addr, "0.0.0.0:4173");
        assert_eq!(config.form_echo.mode, FormEchoMode::Preview);
        assert_eq!(config.form_echo.format, RenderFormat::Compact);
        assert_eq!(config.form_echo.depth, 5);
        assert!(config.form_echo.keep_uploads);
        assert_eq!(config.form_echo.upload_dir, Some(PathBuf::from("/tmp/up")));
    }

    #[test]
    fn unknown_keys_are_errors() {
        let err = Config::from_toml_str("bsae = \"./\"").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = Config::from_file(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
