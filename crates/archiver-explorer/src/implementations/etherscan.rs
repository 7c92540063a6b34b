//! Etherscan-compatible explorer client.
//!
//! Talks to the `account/txlist` and `proxy/eth_blockNumber` endpoints of an
//! Etherscan-style REST API. Both go through one request helper that appends
//! the API key and decodes the JSON body.

use crate::{ExplorerError, ExplorerInterface};
use archiver_types::{
	parse_hex_quantity, ConfigSchema, Field, FieldType, PageRequest, PageResult, Schema,
	SecretString, TransactionRecord, ValidationError,
};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

/// Message returned with `status: "0"` when the window holds no transactions.
const NO_TRANSACTIONS_MESSAGE: &str = "No transactions found";

/// Characters of the body kept in HTTP error messages.
const MAX_ERROR_BODY: usize = 512;

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// Etherscan explorer client.
pub struct EtherscanExplorer {
	client: reqwest::Client,
	api_url: String,
	api_key: SecretString,
}

impl EtherscanExplorer {
	pub fn new(
		api_url: String,
		api_key: SecretString,
		timeout: Duration,
	) -> Result<Self, ExplorerError> {
		let client = reqwest::Client::builder()
			.timeout(timeout)
			.build()
			.map_err(|e| {
				ExplorerError::Configuration(format!("Failed to build HTTP client: {}", e))
			})?;

		Ok(Self {
			client,
			api_url,
			api_key,
		})
	}

	/// Sends one GET request with the given query parameters and decodes the
	/// JSON body.
	async fn request(&self, params: &[(&str, String)]) -> Result<Value, ExplorerError> {
		let response = self
			.client
			.get(&self.api_url)
			.query(params)
			.query(&[("apikey", self.api_key.expose_secret())])
			.send()
			.await
			.map_err(|e| ExplorerError::Transport(e.without_url().to_string()))?;

		let status = response.status();
		if !status.is_success() {
			let body: String = response
				.text()
				.await
				.unwrap_or_default()
				.chars()
				.take(MAX_ERROR_BODY)
				.collect();
			return Err(ExplorerError::Http {
				status: status.as_u16(),
				body,
			});
		}

		let bytes = response
			.bytes()
			.await
			.map_err(|e| ExplorerError::Transport(e.without_url().to_string()))?;

		serde_json::from_slice(&bytes)
			.map_err(|e| ExplorerError::Decode(format!("Invalid JSON response: {}", e)))
	}
}

#[async_trait]
impl ExplorerInterface for EtherscanExplorer {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(EtherscanSchema)
	}

	async fn fetch_page(&self, request: &PageRequest) -> Result<PageResult, ExplorerError> {
		let params = [
			("module", "account".to_string()),
			("action", "txlist".to_string()),
			("address", request.address.clone()),
			("startblock", request.start_block.to_string()),
			("endblock", request.end_block.to_string()),
			("page", request.page.to_string()),
			("offset", request.page_size.to_string()),
			("sort", request.sort.as_str().to_string()),
		];

		let body = self.request(&params).await?;
		decode_page(body)
	}

	async fn fetch_chain_head(&self) -> Result<u64, ExplorerError> {
		let params = [
			("module", "proxy".to_string()),
			("action", "eth_blockNumber".to_string()),
		];

		let body = self.request(&params).await?;
		decode_chain_head(body)
	}
}

/// Standard `{status, message, result}` envelope of account endpoints.
#[derive(Debug, Deserialize)]
struct Envelope {
	#[serde(default)]
	status: String,
	message: String,
	#[serde(default)]
	result: Value,
}

/// Decodes a `txlist` response.
///
/// - `message` starting with `OK`: `result` must be an array of objects.
/// - `status "0"`, `No transactions found`, empty result: an empty page.
/// - anything else: a failed page carrying the explorer's message and, when
///   `result` is a string, its detail.
fn decode_page(body: Value) -> Result<PageResult, ExplorerError> {
	let envelope: Envelope = serde_json::from_value(body)
		.map_err(|e| ExplorerError::Decode(format!("Unexpected response shape: {}", e)))?;

	if envelope.message.starts_with(archiver_types::window::STATUS_OK_PREFIX) {
		let items = match envelope.result {
			Value::Array(items) => items,
			other => {
				return Err(ExplorerError::Decode(format!(
					"Expected an array result, got {}",
					json_type(&other)
				)));
			},
		};

		let records = items
			.into_iter()
			.map(|item| {
				TransactionRecord::try_from(item).map_err(|value| {
					ExplorerError::Decode(format!(
						"Expected a transaction object, got {}",
						json_type(&value)
					))
				})
			})
			.collect::<Result<Vec<_>, _>>()?;

		return Ok(PageResult::from_message(envelope.message, records));
	}

	let empty_result = match &envelope.result {
		Value::Array(items) => items.is_empty(),
		Value::Null => true,
		_ => false,
	};
	// Etherscan answers an address or block range without any transactions
	// with status "0" and this message rather than an OK envelope. It is the
	// normal end of history, not a failure.
	if envelope.status == "0" && envelope.message == NO_TRANSACTIONS_MESSAGE && empty_result {
		return Ok(PageResult {
			records: Vec::new(),
			status_ok: true,
			status_message: envelope.message,
		});
	}

	let message = match envelope.result {
		Value::String(detail) if !detail.is_empty() => format!("{}: {}", envelope.message, detail),
		_ => envelope.message,
	};
	Ok(PageResult::from_message(message, Vec::new()))
}

/// Decodes an `eth_blockNumber` proxy response.
fn decode_chain_head(body: Value) -> Result<u64, ExplorerError> {
	if let Some(error) = body.get("error") {
		let message = error
			.get("message")
			.and_then(Value::as_str)
			.map(str::to_string)
			.unwrap_or_else(|| error.to_string());
		return Err(ExplorerError::Api(message));
	}

	// Key errors come back in the account-endpoint envelope
	if body.get("status").and_then(Value::as_str) == Some("0") {
		let message = body
			.get("message")
			.and_then(Value::as_str)
			.unwrap_or("NOTOK");
		let detail = body.get("result").and_then(Value::as_str).unwrap_or("");
		return Err(ExplorerError::Api(format!("{}: {}", message, detail)));
	}

	let result = body
		.get("result")
		.and_then(Value::as_str)
		.ok_or_else(|| ExplorerError::Decode("Missing block number result".into()))?;

	parse_hex_quantity(result)
		.ok_or_else(|| ExplorerError::Decode(format!("Invalid block number: {}", result)))
}

fn json_type(value: &Value) -> &'static str {
	match value {
		Value::Null => "null",
		Value::Bool(_) => "boolean",
		Value::Number(_) => "number",
		Value::String(_) => "string",
		Value::Array(_) => "array",
		Value::Object(_) => "object",
	}
}

/// Configuration schema for the Etherscan explorer.
pub struct EtherscanSchema;

impl ConfigSchema for EtherscanSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![
				Field::new("api_url", FieldType::String).with_validator(|value| {
					match value.as_str() {
						Some(url) if url.starts_with("https://") || url.starts_with("http://") => {
							Ok(())
						},
						_ => Err("api_url must start with http:// or https://".to_string()),
					}
				}),
				Field::new("api_key", FieldType::String).with_validator(|value| {
					match value.as_str() {
						Some(key) if !key.trim().is_empty() => Ok(()),
						_ => Err("api_key cannot be empty".to_string()),
					}
				}),
			],
			vec![Field::new(
				"timeout_seconds",
				FieldType::Integer {
					min: Some(1),
					max: Some(300),
				},
			)],
		);

		schema.validate(config)
	}
}

/// Factory function to create an Etherscan explorer from configuration.
///
/// Configuration parameters:
/// - `api_url`: Explorer API endpoint, e.g. `https://api.etherscan.io/api`
/// - `api_key`: Explorer API key
/// - `timeout_seconds`: Per-request timeout (default: 30)
pub fn create_explorer(config: &toml::Value) -> Result<Box<dyn ExplorerInterface>, ExplorerError> {
	EtherscanSchema
		.validate(config)
		.map_err(|e| ExplorerError::Configuration(format!("Invalid configuration: {}", e)))?;

	let api_url = config
		.get("api_url")
		.and_then(|v| v.as_str())
		.ok_or_else(|| ExplorerError::Configuration("api_url is required".into()))?
		.to_string();

	let api_key = config
		.get("api_key")
		.and_then(|v| v.as_str())
		.map(SecretString::from)
		.ok_or_else(|| ExplorerError::Configuration("api_key is required".into()))?;

	let timeout_seconds = config
		.get("timeout_seconds")
		.and_then(|v| v.as_integer())
		.map(|v| v as u64)
		.unwrap_or(DEFAULT_TIMEOUT_SECONDS);

	let explorer = EtherscanExplorer::new(api_url, api_key, Duration::from_secs(timeout_seconds))?;
	Ok(Box::new(explorer))
}

/// Registry for the Etherscan explorer implementation.
pub struct Registry;

impl archiver_types::ImplementationRegistry for Registry {
	const NAME: &'static str = "etherscan";
	type Factory = crate::ExplorerFactory;

	fn factory() -> Self::Factory {
		create_explorer
	}
}

impl crate::ExplorerRegistry for Registry {}
