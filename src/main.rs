//! MJOP MCP Server - Main Entry Point
//!
//! Parses the command line, starts logging and serves the maintenance plan
//! over stdio. The actual implementation is in the `mjop_mcp` library.

use anyhow::{Result, bail};
use clap::{CommandFactory, Parser};
use log::info;
use mcp_attr::server::serve_stdio;
use mjop_mcp::logging::init_logging;
use mjop_mcp::{MjopServerHandler, SaldoPolicy, ServerOptions};
use std::path::PathBuf;

/// MJOP MCP Server - multi-year property maintenance planning via Model Context Protocol
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the plan file (TOML)
    file: String,

    /// Commit the plan file to git on every save
    #[arg(long)]
    sync_git: bool,

    /// Log level filter (e.g. "info", "debug", "mjop_mcp=trace")
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Write rotating log files to this directory instead of stderr
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Balance below this share of the total worth is classified as "watch"
    #[arg(long, default_value_t = 0.01)]
    saldo_watch_ratio: f64,
}

#[tokio::main]
async fn main() -> Result<()> {
    if std::env::args().len() == 1 {
        let mut cmd = Args::command();
        eprintln!("{}", cmd.render_help());
        std::process::exit(2);
    }

    let args = Args::parse();
    let _logger = init_logging(&args.log_level, args.log_dir.as_deref())?;

    if !args.saldo_watch_ratio.is_finite() || args.saldo_watch_ratio < 0.0 {
        bail!(
            "--saldo-watch-ratio must be a non-negative number, got {}",
            args.saldo_watch_ratio
        );
    }

    let options = ServerOptions::default()
        .with_sync_git(args.sync_git)
        .with_saldo_policy(SaldoPolicy {
            watch_ratio: args.saldo_watch_ratio,
        });
    let handler = MjopServerHandler::new(&args.file, options)?;
    info!("event=serve_start file={} sync_git={}", args.file, args.sync_git);
    serve_stdio(handler).await?;
    Ok(())
}
