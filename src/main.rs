//! formecho — development server that echoes form submissions.
//!
//! # Usage
//!
//! ```text
//! formecho --root public --base ./
//! formecho --config formecho.toml --mode preview
//! RUST_LOG=debug formecho
//! ```
//!
//! Command-line flags override the config file.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use formecho::Config;
use formecho::middleware::FormEchoMode;
use formecho::render::RenderFormat;
use tracing::info;

#[derive(Parser)]
#[command(name = "formecho", about = "Log and echo multipart form submissions")]
struct Cli {
    /// TOML config file.
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Address to listen on (host:port).
    #[arg(long)]
    addr: Option<String>,

    /// Directory served for non-POST requests.
    #[arg(long)]
    root: Option<PathBuf>,

    /// Public base path the site is mounted under.
    #[arg(long)]
    base: Option<String>,

    /// `dev` decodes and echoes POSTs; `preview` only logs them.
    #[arg(long, value_enum)]
    mode: Option<FormEchoMode>,

    /// Rendering of decoded forms.
    #[arg(long, value_enum)]
    format: Option<RenderFormat>,

    /// Nesting depth shown before eliding.
    #[arg(long)]
    depth: Option<usize>,
}

impl Cli {
    fn apply(self, config: &mut Config) {
        if let Some(addr) = self.addr {
            config.server.addr = addr;
        }
        if let Some(root) = self.root {
            config.root = root;
        }
        if let Some(base) = self.base {
            config.base = base;
        }
        if let Some(mode) = self.mode {
            config.form_echo.mode = mode;
        }
        if let Some(format) = self.format {
            config.form_echo.format = format;
        }
        if let Some(depth) = self.depth {
            config.form_echo.depth = depth;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,formecho=debug")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => Config::default(),
    };
    cli.apply(&mut config);

    info!(
        root = %config.root.display(),
        base = %config.base,
        mode = ?config.form_echo.mode,
        format = ?config.form_echo.format,
        "starting"
    );

    let server = formecho::Server::bind(&config.server.addr)
        .await
        .with_context(|| format!("binding {}", config.server.addr))?;
    server.serve(config.router()).await?;
    Ok(())
}
