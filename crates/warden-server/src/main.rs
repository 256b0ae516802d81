// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Warden server binary.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use warden_server::{install_account_plugins, PluginRegistry};

/// Warden server - bootstraps the administrator account and serves membership
/// checks.
#[derive(Parser, Debug)]
#[command(name = "warden-server", about = "Warden review server host", version)]
struct Args {
	/// Path to a TOML config file (defaults to /etc/warden/server.toml)
	#[arg(long, env = "WARDEN_SERVER_CONFIG")]
	config: Option<PathBuf>,

	/// Subcommands for warden-server (e.g., `version`)
	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Show version information
	Version,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	if let Some(Command::Version) = args.command {
		println!("warden-server {}", env!("CARGO_PKG_VERSION"));
		return Ok(());
	}

	// Load .env file if present
	dotenvy::dotenv().ok();

	let config = match args.config {
		Some(path) => warden_server_config::load_config_with_file(path)?,
		None => warden_server_config::load_config()?,
	};

	tracing_subscriber::registry()
		.with(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| config.logging.level.clone().into()),
		)
		.with(tracing_subscriber::fmt::layer())
		.init();

	tracing::info!(database = %config.database.url, "starting warden-server");

	let pool = warden_server_db::create_pool(&config.database.url, config.database.max_connections).await?;
	warden_server_db::run_migrations(&pool).await?;

	let mut registry = PluginRegistry::new();
	install_account_plugins(&mut registry, pool.clone(), &config.bootstrap);

	// Listeners finish before the server reports ready.
	registry.start_all().await;
	tracing::info!(
		listeners = registry.listeners().len(),
		group_backends = registry.group_backends().len(),
		"warden-server ready"
	);

	tokio::signal::ctrl_c().await?;
	tracing::info!("Received shutdown signal");

	registry.stop_all().await;
	pool.close().await;

	tracing::info!("Server shutdown complete");
	Ok(())
}
