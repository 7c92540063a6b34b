//! Main entry point for the explorer archiver.
//!
//! Fetches the complete transaction history of every configured account from
//! the block explorer and writes one JSON file per account. The process exits
//! with a non-zero status on the first failure.

use archiver_config::Config;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

mod factory_registry;

/// Command-line arguments for the archiver.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml", env = "ARCHIVER_CONFIG")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,

	/// Last block to fetch instead of the current chain head
	#[arg(long)]
	end_block: Option<u64>,

	/// Only archive the account with this label (repeatable)
	#[arg(long = "account", value_name = "LABEL")]
	accounts: Vec<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

	fmt()
		.with_env_filter(env_filter)
		.with_target(true)
		.with_writer(std::io::stderr)
		.init();

	match run(args).await {
		Ok(()) => ExitCode::SUCCESS,
		Err(e) => {
			tracing::error!(error = %e, "Archiver failed");
			ExitCode::FAILURE
		},
	}
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
	let config_path = args
		.config
		.to_str()
		.ok_or("Configuration path is not valid UTF-8")?;
	let config = Config::from_file(config_path).await?;
	let config = apply_overrides(config, &args)?;
	tracing::info!(
		accounts = config.accounts.len(),
		explorer = %config.explorer.primary,
		storage = %config.storage.primary,
		"Loaded configuration"
	);

	let archiver = factory_registry::build_archiver_from_config(config)?;
	let summary = archiver.run().await?;

	for account in &summary.accounts {
		tracing::info!(label = %account.label, records = account.records, "Saved");
	}
	Ok(())
}

/// Applies the command-line end block and account filter to the loaded
/// configuration.
fn apply_overrides(mut config: Config, args: &Args) -> Result<Config, Box<dyn std::error::Error>> {
	if let Some(end_block) = args.end_block {
		if end_block < config.archiver.start_block {
			return Err(format!(
				"--end-block {} is before start_block {}",
				end_block, config.archiver.start_block
			)
			.into());
		}
		config.archiver.end_block = Some(end_block);
	}

	config.accounts = config.select_accounts(&args.accounts)?;
	Ok(config)
}
