//! Trellis shell binary.
//!
//! Bootstraps one page against a Trellis server:
//! - reads credentials, page and interface list from the config file
//! - connects the transport and joins the session room
//! - injects and composes the page's modules
//! - serves responses until interrupted or disconnected

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;
use trellis_rpc::{LogFeedback, TcpConnector};

mod config;
mod modules;
mod session;

use crate::config::ShellConfig;
use crate::session::Session;

/// Shell command line arguments.
#[derive(Parser, Debug)]
#[command(name = "trellis-shell")]
#[command(about = "Bootstrap a Trellis page and serve its requests")]
struct Args {
	/// Configuration file (defaults to <config dir>/trellis/shell.toml)
	#[arg(short, long, value_name = "PATH")]
	config: Option<PathBuf>,

	/// Verbose logging
	#[arg(short, long)]
	verbose: bool,
}

fn main() -> anyhow::Result<()> {
	let args = Args::parse();

	setup_tracing(args.verbose);

	let config = ShellConfig::resolve(args.config.as_deref())?;
	info!(page = %config.page.path, interfaces = config.interfaces.len(), "starting trellis-shell");

	let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
	runtime.block_on(run(config))
}

async fn run(config: ShellConfig) -> anyhow::Result<()> {
	let shutdown = CancellationToken::new();
	let connector = Arc::new(TcpConnector::with_shutdown(shutdown.child_token()));
	let session = Session::start(&config, connector, Arc::new(LogFeedback)).await?;
	info!(
		paths = ?session.namespace().paths(),
		outstanding = session.correlator().outstanding(),
		"page composed"
	);

	tokio::spawn({
		let shutdown = shutdown.clone();
		async move {
			if tokio::signal::ctrl_c().await.is_ok() {
				info!("interrupted, shutting down");
				shutdown.cancel();
			}
		}
	});

	session.run(shutdown).await;
	Ok(())
}

fn setup_tracing(verbose: bool) {
	use tracing_subscriber::EnvFilter;

	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
		if verbose {
			EnvFilter::new("trellis_shell=trace,trellis_loader=debug,trellis_rpc=debug,info")
		} else {
			EnvFilter::new("info")
		}
	});

	tracing_subscriber::fmt().with_env_filter(filter).with_target(true).init();
}
