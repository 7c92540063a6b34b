//! Configuration module for the explorer archiver.
//!
//! This module provides structures and utilities for managing archiver
//! configuration. It supports loading configuration from TOML files, resolving
//! `${VAR}` references against the environment (the explorer API key is
//! normally supplied this way) and validating every section before the
//! archiver is built.
//!
//! ## Modular Configuration Support
//!
//! Configurations can be split into multiple files:
//! - Use `include = ["file1.toml", "file2.toml"]` to include other config files
//! - Each top-level section must be unique across all files (no duplicates allowed)

mod loader;

use archiver_types::Account;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Largest page the explorer will serve (`page * offset <= 10000`).
pub const MAX_PAGE_SIZE: u32 = 10_000;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Extract just the message without the huge input dump
		let message = err.message().to_string();
		ConfigError::Parse(message)
	}
}

/// Main configuration structure for the archiver.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Block range and paging settings.
	pub archiver: ArchiverConfig,
	/// Block explorer client configuration.
	pub explorer: ExplorerConfig,
	/// Request pacing for the explorer credential.
	#[serde(default)]
	pub rate_limit: RateLimitConfig,
	/// Output storage configuration.
	pub storage: StorageConfig,
	/// Accounts to archive, processed in the order listed.
	pub accounts: Vec<Account>,
}

/// How records of the boundary block shared by two consecutive pages are
/// treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundaryPolicy {
	/// Keep every record as returned, so the boundary block's records appear
	/// once per page that contains them.
	#[default]
	Keep,
	/// Drop the leading records of a page that repeat the previous page's
	/// boundary-block tail.
	Dedupe,
}

/// Block range and paging settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ArchiverConfig {
	/// First block of every account's window.
	#[serde(default)]
	pub start_block: u64,
	/// Last block of every account's window. When unset the chain head is
	/// queried once at startup.
	pub end_block: Option<u64>,
	/// Maximum records requested per page.
	#[serde(default = "default_page_size")]
	pub page_size: u32,
	/// Treatment of records repeated across page boundaries.
	#[serde(default)]
	pub boundary_policy: BoundaryPolicy,
}

fn default_page_size() -> u32 {
	MAX_PAGE_SIZE
}

/// Block explorer client configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExplorerConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of explorer implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
	/// Retry policy for transport failures.
	#[serde(default)]
	pub retry: RetryConfig,
}

/// Retry policy applied to transport-level explorer failures.
///
/// API-reported failures are never retried.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetryConfig {
	/// Total attempts per request, including the first one.
	#[serde(default = "default_max_attempts")]
	pub max_attempts: u32,
	/// Delay before the first retry.
	#[serde(default = "default_initial_backoff_ms")]
	pub initial_backoff_ms: u64,
	/// Upper bound for the delay between two attempts.
	#[serde(default = "default_max_backoff_ms")]
	pub max_backoff_ms: u64,
}

fn default_max_attempts() -> u32 {
	4
}

fn default_initial_backoff_ms() -> u64 {
	500
}

fn default_max_backoff_ms() -> u64 {
	30_000
}

impl Default for RetryConfig {
	fn default() -> Self {
		Self {
			max_attempts: default_max_attempts(),
			initial_backoff_ms: default_initial_backoff_ms(),
			max_backoff_ms: default_max_backoff_ms(),
		}
	}
}

/// Request pacing for the explorer credential.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
	/// Whether the credential is on a rate-limited tier.
	#[serde(default)]
	pub rate_limited: bool,
	/// Minimum spacing between the starts of two consecutive requests.
	#[serde(default = "default_min_request_interval_ms")]
	pub min_request_interval_ms: u64,
}

/// Free-tier spacing: one request every 6 seconds.
fn default_min_request_interval_ms() -> u64 {
	6_000
}

impl Default for RateLimitConfig {
	fn default() -> Self {
		Self {
			rate_limited: false,
			min_request_interval_ms: default_min_request_interval_ms(),
		}
	}
}

/// Output storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of storage implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// Resolves environment variables in a string.
///
/// Replaces ${VAR_NAME} with the value of the environment variable VAR_NAME.
/// Supports default values with ${VAR_NAME:-default_value}.
///
/// Input strings are limited to 1MB to prevent ReDoS attacks.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024; // 1MB
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = input.to_string();
	let mut replacements = Vec::new();

	for cap in re.captures_iter(input) {
		let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let default_value = cap.get(2).map(|m| m.as_str());

		let value = match std::env::var(var_name.as_str()) {
			Ok(v) => v,
			Err(_) => match default_value {
				Some(default) => default.to_string(),
				None => {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{}' not found",
						var_name.as_str()
					)));
				},
			},
		};

		replacements.push((full_match.start(), full_match.end(), value));
	}

	// Apply replacements in reverse order to maintain positions
	for (start, end, value) in replacements.iter().rev() {
		result.replace_range(start..end, value);
	}

	Ok(result)
}

impl Config {
	/// Loads configuration from a file, following include directives.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let path_buf = Path::new(path);
		let base_dir = path_buf.parent().unwrap_or_else(|| Path::new("."));

		let mut loader = loader::ConfigLoader::new(base_dir);
		let file_name = path_buf
			.file_name()
			.ok_or_else(|| ConfigError::Validation(format!("Invalid path: {}", path)))?;
		loader.load_config(file_name).await
	}

	/// Returns the configured accounts whose label is in `labels`, preserving
	/// configuration order. An empty filter selects every account.
	pub fn select_accounts(&self, labels: &[String]) -> Result<Vec<Account>, ConfigError> {
		if labels.is_empty() {
			return Ok(self.accounts.clone());
		}

		for label in labels {
			if !self.accounts.iter().any(|a| &a.label == label) {
				return Err(ConfigError::Validation(format!(
					"Account '{}' is not configured",
					label
				)));
			}
		}

		Ok(self
			.accounts
			.iter()
			.filter(|a| labels.contains(&a.label))
			.cloned()
			.collect())
	}

	/// Validates the configuration to ensure all required fields are properly set.
	///
	/// - Page size lies within the explorer's limits
	/// - A pinned end block does not precede the start block
	/// - Explorer and storage primaries name configured implementations
	/// - Retry and pacing settings are usable
	/// - The account table is non-empty, labels are unique and addresses well formed
	fn validate(&self) -> Result<(), ConfigError> {
		// Validate archiver config
		if self.archiver.page_size == 0 {
			return Err(ConfigError::Validation(
				"page_size must be greater than 0".into(),
			));
		}
		if self.archiver.page_size > MAX_PAGE_SIZE {
			return Err(ConfigError::Validation(format!(
				"page_size cannot exceed {}",
				MAX_PAGE_SIZE
			)));
		}
		if let Some(end_block) = self.archiver.end_block {
			if end_block < self.archiver.start_block {
				return Err(ConfigError::Validation(format!(
					"end_block {} is before start_block {}",
					end_block, self.archiver.start_block
				)));
			}
		}

		// Validate explorer config
		if self.explorer.implementations.is_empty() {
			return Err(ConfigError::Validation(
				"At least one explorer implementation must be configured".into(),
			));
		}
		if !self
			.explorer
			.implementations
			.contains_key(&self.explorer.primary)
		{
			return Err(ConfigError::Validation(format!(
				"Primary explorer '{}' not found in implementations",
				self.explorer.primary
			)));
		}
		if self.explorer.retry.max_attempts == 0 {
			return Err(ConfigError::Validation(
				"retry.max_attempts must be at least 1".into(),
			));
		}
		if self.explorer.retry.initial_backoff_ms > self.explorer.retry.max_backoff_ms {
			return Err(ConfigError::Validation(
				"retry.initial_backoff_ms cannot exceed retry.max_backoff_ms".into(),
			));
		}

		// Validate rate limit config
		if self.rate_limit.rate_limited && self.rate_limit.min_request_interval_ms == 0 {
			return Err(ConfigError::Validation(
				"min_request_interval_ms must be greater than 0 when rate_limited is set".into(),
			));
		}

		// Validate storage config
		if self.storage.implementations.is_empty() {
			return Err(ConfigError::Validation(
				"At least one storage implementation must be configured".into(),
			));
		}
		if !self
			.storage
			.implementations
			.contains_key(&self.storage.primary)
		{
			return Err(ConfigError::Validation(format!(
				"Primary storage '{}' not found in implementations",
				self.storage.primary
			)));
		}

		// Validate accounts
		if self.accounts.is_empty() {
			return Err(ConfigError::Validation(
				"At least one account must be configured".into(),
			));
		}
		let mut labels = HashSet::new();
		for account in &self.accounts {
			account
				.validate()
				.map_err(|e| ConfigError::Validation(e.to_string()))?;
			if !labels.insert(account.label.as_str()) {
				return Err(ConfigError::Validation(format!(
					"Duplicate account label '{}'",
					account.label
				)));
			}
		}

		Ok(())
	}
}

/// Parses a TOML string, resolving environment variables and validating the
/// result.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const BASE_CONFIG: &str = r#"
[archiver]
start_block = 9117609
page_size = 10000

[explorer]
primary = "etherscan"
[explorer.implementations.etherscan]
api_url = "https://api.etherscan.io/api"
api_key = "test-key"

[storage]
primary = "memory"
[storage.implementations.memory]

[[accounts]]
label = "TORNADO_CASH_0_1ETH"
address = "0x12D66f87A04A9E220743712cE6d9bB1B5616B8Fc"

[[accounts]]
label = "TORNADO_CASH_1ETH"
address = "0x47CE0C6eD5B0Ce3d3A51fdb1C52DC66a7c3c2936"
"#;

	#[test]
	fn test_env_var_resolution() {
		std::env::set_var("ARCHIVER_TEST_HOST", "localhost");
		std::env::set_var("ARCHIVER_TEST_PORT", "5432");

		let input = "host = \"${ARCHIVER_TEST_HOST}:${ARCHIVER_TEST_PORT}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "host = \"localhost:5432\"");

		std::env::remove_var("ARCHIVER_TEST_HOST");
		std::env::remove_var("ARCHIVER_TEST_PORT");
	}

	#[test]
	fn test_env_var_with_default() {
		let input = "value = \"${ARCHIVER_MISSING_VAR:-default_value}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "value = \"default_value\"");
	}

	#[test]
	fn test_missing_env_var_error() {
		let input = "value = \"${ARCHIVER_MISSING_VAR}\"";
		let result = resolve_env_vars(input);
		assert!(result.is_err());
		assert!(result.unwrap_err().to_string().contains("ARCHIVER_MISSING_VAR"));
	}

	#[test]
	fn test_parse_base_config_with_defaults() {
		let config: Config = BASE_CONFIG.parse().unwrap();

		assert_eq!(config.archiver.start_block, 9_117_609);
		assert_eq!(config.archiver.page_size, 10_000);
		assert_eq!(config.archiver.end_block, None);
		assert_eq!(config.archiver.boundary_policy, BoundaryPolicy::Keep);
		assert!(!config.rate_limit.rate_limited);
		assert_eq!(config.rate_limit.min_request_interval_ms, 6_000);
		assert_eq!(config.explorer.retry.max_attempts, 4);

		// Account order follows the file
		let labels: Vec<_> = config.accounts.iter().map(|a| a.label.as_str()).collect();
		assert_eq!(labels, vec!["TORNADO_CASH_0_1ETH", "TORNADO_CASH_1ETH"]);
	}

	#[test]
	fn test_api_key_from_environment() {
		std::env::set_var("ARCHIVER_TEST_API_KEY", "from-env");
		let config_str = BASE_CONFIG.replace("\"test-key\"", "\"${ARCHIVER_TEST_API_KEY}\"");

		let config: Config = config_str.parse().unwrap();
		let api_key = config.explorer.implementations["etherscan"]
			.get("api_key")
			.and_then(|v| v.as_str())
			.unwrap()
			.to_string();
		assert_eq!(api_key, "from-env");

		std::env::remove_var("ARCHIVER_TEST_API_KEY");
	}

	#[test]
	fn test_dedupe_policy_and_rate_limit() {
		let config_str = BASE_CONFIG.replace(
			"page_size = 10000",
			"page_size = 1000\nboundary_policy = \"dedupe\"\n\n[rate_limit]\nrate_limited = true\nmin_request_interval_ms = 5000",
		);
		let config: Config = config_str.parse().unwrap();
		assert_eq!(config.archiver.boundary_policy, BoundaryPolicy::Dedupe);
		assert!(config.rate_limit.rate_limited);
		assert_eq!(config.rate_limit.min_request_interval_ms, 5_000);
	}

	#[test]
	fn test_page_size_bounds_rejected() {
		let zero = BASE_CONFIG.replace("page_size = 10000", "page_size = 0");
		let err = Config::from_str(&zero).unwrap_err();
		assert!(err.to_string().contains("page_size must be greater than 0"));

		let too_large = BASE_CONFIG.replace("page_size = 10000", "page_size = 10001");
		let err = Config::from_str(&too_large).unwrap_err();
		assert!(err.to_string().contains("page_size cannot exceed 10000"));
	}

	#[test]
	fn test_inverted_block_range_rejected() {
		let config_str =
			BASE_CONFIG.replace("start_block = 9117609", "start_block = 100\nend_block = 99");
		let err = Config::from_str(&config_str).unwrap_err();
		assert!(err.to_string().contains("end_block 99 is before start_block 100"));
	}

	#[test]
	fn test_empty_account_table_rejected() {
		let without_accounts = BASE_CONFIG.split("[[accounts]]").next().unwrap();
		let config_str = format!("accounts = []\n{}", without_accounts);
		let err = Config::from_str(&config_str).unwrap_err();
		assert!(err.to_string().contains("At least one account"));
	}

	#[test]
	fn test_duplicate_label_rejected() {
		let config_str = format!(
			"{}\n[[accounts]]\nlabel = \"TORNADO_CASH_1ETH\"\naddress = \"0x910Cbd523D972eb0a6f4cAe4618aD62622b39DbF\"\n",
			BASE_CONFIG
		);
		let err = Config::from_str(&config_str).unwrap_err();
		assert!(err
			.to_string()
			.contains("Duplicate account label 'TORNADO_CASH_1ETH'"));
	}

	#[test]
	fn test_malformed_address_rejected() {
		let config_str = BASE_CONFIG.replace(
			"0x47CE0C6eD5B0Ce3d3A51fdb1C52DC66a7c3c2936",
			"0x47CE0C6eD5B0Ce3d3A51",
		);
		let err = Config::from_str(&config_str).unwrap_err();
		assert!(err.to_string().contains("TORNADO_CASH_1ETH"));
	}

	#[test]
	fn test_unknown_primary_rejected() {
		let config_str = BASE_CONFIG.replace("primary = \"memory\"", "primary = \"file\"");
		let err = Config::from_str(&config_str).unwrap_err();
		assert!(err
			.to_string()
			.contains("Primary storage 'file' not found in implementations"));
	}

	#[test]
	fn test_select_accounts() {
		let config: Config = BASE_CONFIG.parse().unwrap();

		assert_eq!(config.select_accounts(&[]).unwrap().len(), 2);

		let selected = config
			.select_accounts(&["TORNADO_CASH_1ETH".to_string()])
			.unwrap();
		assert_eq!(selected.len(), 1);
		assert_eq!(selected[0].label, "TORNADO_CASH_1ETH");

		let err = config
			.select_accounts(&["UNKNOWN".to_string()])
			.unwrap_err();
		assert!(err.to_string().contains("'UNKNOWN' is not configured"));
	}
}
