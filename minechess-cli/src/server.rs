//! `minechess server`: host games over HTTP and WebSocket
//!
//! Flags are checked up front so a bad `--static-dir` or timeout fails
//! before any socket is bound.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Args;

use minechess_server::{run_server, ServerConfig};

#[derive(Args)]
pub struct ServerArgs {
    /// Port number to listen on
    #[arg(long, default_value = "3000")]
    pub port: u16,

    /// Directory containing the frontend build, served for non-API paths
    #[arg(long)]
    pub static_dir: Option<PathBuf>,

    /// Maximum time a single WebSocket write may take, in milliseconds
    #[arg(long, default_value = "5000")]
    pub write_timeout_ms: u64,
}

impl ServerArgs {
    fn to_config(&self) -> Result<ServerConfig> {
        if self.write_timeout_ms == 0 {
            bail!("--write-timeout-ms must be greater than zero");
        }
        let static_dir = self.static_dir.as_deref().map(frontend_dir).transpose()?;
        Ok(ServerConfig {
            port: self.port,
            static_dir,
            write_timeout: Duration::from_millis(self.write_timeout_ms),
        })
    }
}

/// Blocks until the server stops
pub fn run(args: ServerArgs) -> Result<()> {
    let config = args.to_config()?;
    tracing::info!(
        "MineChess server on port {} (write timeout {:?})",
        config.port,
        config.write_timeout
    );

    let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    runtime.block_on(run_server(config))
}

/// A missing frontend build only costs the static pages, so it is a
/// warning. A path that names a file is a typo worth stopping for.
fn frontend_dir(path: &Path) -> Result<String> {
    if path.is_file() {
        bail!("--static-dir must name a directory, got file {}", path.display());
    }
    if !path.exists() {
        tracing::warn!(
            "frontend build not found at {}; only the API will be served",
            path.display()
        );
    }
    Ok(path.to_string_lossy().into_owned())
}
