use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pool_cache::{implementations::memory::MemoryCache, CacheService};
use pool_config::{Config, ConfigLoader};
use pool_core::{Orchestrator, OrchestratorBuilder};
use pool_rpc::AlloyChainReader;
use pool_types::{
	GasEstimate, Intent, SignApprovalIntent, Transaction, TransactionDescriptor, TransactionType,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "pool-tx")]
#[command(about = "Lending pool transaction builder", long_about = None)]
struct Cli {
	#[command(subcommand)]
	command: Commands,

	#[arg(short, long, value_name = "FILE", default_value = "config/local.toml")]
	config: PathBuf,

	#[arg(long, env = "POOL_LOG_LEVEL")]
	log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
	/// Build the transactions for a JSON intent
	Build {
		#[arg(short, long, value_name = "FILE")]
		intent: PathBuf,
	},
	/// Build the typed data for an off-chain permit signature
	Permit {
		#[arg(short, long, value_name = "FILE")]
		intent: PathBuf,
	},
	/// Validate the configuration file
	Validate,
}

/// A descriptor after both of its thunks have run.
#[derive(Serialize)]
struct Materialized {
	tx_type: TransactionType,
	tx: Transaction,
	gas: GasEstimate,
}

#[tokio::main]
async fn main() -> Result<()> {
	let cli = Cli::parse();

	let config = load_config(&cli.config).await?;
	let log_level = cli.log_level.as_deref().unwrap_or(&config.logging.level);
	setup_tracing(log_level, config.logging.json)?;

	match cli.command {
		Commands::Build { intent } => build(config, &intent).await,
		Commands::Permit { intent } => permit(config, &intent).await,
		Commands::Validate => validate(&config),
	}
}

async fn load_config(path: &Path) -> Result<Config> {
	ConfigLoader::new()
		.with_file(path)
		.load()
		.await
		.context("Failed to load configuration")
}

async fn build(config: Config, intent: &Path) -> Result<()> {
	let intent: Intent = read_json(intent).await?;
	info!(action = intent.action(), "Building transactions");

	let orchestrator = orchestrator(config)?;
	let descriptors = orchestrator
		.execute(&intent)
		.await
		.context("Failed to build transactions")?;

	let materialized = materialize(&descriptors).await?;
	println!("{}", serde_json::to_string_pretty(&materialized)?);
	Ok(())
}

async fn permit(config: Config, intent: &Path) -> Result<()> {
	let intent: SignApprovalIntent = read_json(intent).await?;

	let orchestrator = orchestrator(config)?;
	let request = orchestrator
		.sign_erc20_approval(&intent)
		.await
		.context("Failed to build permit request")?;

	println!("{}", request.to_wire_string());
	Ok(())
}

fn validate(config: &Config) -> Result<()> {
	info!("Configuration is valid");
	info!("Chain id: {}", config.network.chain_id);

	let contracts = &config.contracts;
	for (name, address) in [
		("pool", contracts.pool),
		("wrapped_token_gateway", contracts.wrapped_token_gateway),
		("l2_pool", contracts.l2_pool),
		("swap_collateral_adapter", contracts.swap_collateral_adapter),
		("repay_with_collateral_adapter", contracts.repay_with_collateral_adapter),
		("flash_liquidation_adapter", contracts.flash_liquidation_adapter),
		("ens_registry", contracts.ens_registry),
	] {
		match address {
			Some(address) => info!("  {}: {}", name, address),
			None => info!("  {}: not configured", name),
		}
	}

	Ok(())
}

fn orchestrator(config: Config) -> Result<Orchestrator> {
	let chain = AlloyChainReader::new(&config.network.rpc_url)
		.context("Failed to create chain reader")?
		.with_pool(config.contracts.l2_pool.or(config.contracts.pool))
		.with_ens_registry(config.contracts.ens_registry);

	OrchestratorBuilder::new()
		.with_config(config)
		.with_chain(Arc::new(chain))
		.with_cache(CacheService::new(Arc::new(MemoryCache::new())))
		.build()
		.context("Failed to build orchestrator")
}

async fn materialize(descriptors: &[TransactionDescriptor]) -> Result<Vec<Materialized>> {
	let mut materialized = Vec::with_capacity(descriptors.len());
	for descriptor in descriptors {
		materialized.push(Materialized {
			tx_type: descriptor.tx_type,
			tx: descriptor
				.transaction()
				.await
				.context("Failed to populate transaction")?,
			gas: descriptor
				.gas_estimate()
				.await
				.context("Failed to estimate gas")?,
		});
	}
	Ok(materialized)
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
	let content = tokio::fs::read_to_string(path)
		.await
		.with_context(|| format!("Failed to read {}", path.display()))?;
	serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

fn setup_tracing(log_level: &str, json: bool) -> Result<()> {
	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

	// output goes to stdout, so logs go to stderr
	let registry = tracing_subscriber::registry().with(env_filter);
	if json {
		registry
			.with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
			.init();
	} else {
		registry
			.with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
			.init();
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	#[tokio::test]
	async fn test_read_json_intent() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		write!(
			file,
			r#"{{"action":"set_user_e_mode","user":"0x00000000000000000000000000000000000000a1","category_id":1}}"#
		)
		.unwrap();

		let intent: Intent = read_json(file.path()).await.unwrap();
		assert_eq!(intent.action(), "set_user_e_mode");
	}

	#[tokio::test]
	async fn test_read_json_reports_path() {
		let err = read_json::<Intent>(Path::new("/nonexistent/intent.json"))
			.await
			.unwrap_err();
		assert!(err.to_string().contains("/nonexistent/intent.json"));
	}

	#[test]
	fn test_cli_parses_build() {
		let cli = Cli::try_parse_from([
			"pool-tx", "--config", "c.toml", "build", "--intent", "i.json",
		])
		.unwrap();
		assert_eq!(cli.config, PathBuf::from("c.toml"));
		assert!(matches!(
			cli.command,
			Commands::Build { ref intent } if intent == Path::new("i.json")
		));
	}
}
