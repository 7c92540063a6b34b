//! Block explorer module for the explorer archiver.
//!
//! This module defines the narrow interface the pagination engine needs from a
//! block explorer (one page of an address's transactions, and the current
//! chain head) and the service that wraps an implementation with request
//! pacing and a retry policy for transport failures.

use archiver_config::RetryConfig;
use archiver_types::{truncate_id, ConfigSchema, ImplementationRegistry, PageRequest, PageResult};
use async_trait::async_trait;
use backoff::ExponentialBackoffBuilder;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub mod pacer;

pub use pacer::RequestPacer;

/// Re-export implementations
pub mod implementations {
	pub mod etherscan;
}

/// Errors that can occur while talking to a block explorer.
#[derive(Debug, Error)]
pub enum ExplorerError {
	/// Connection failure or timeout before a response was received.
	#[error("Transport error: {0}")]
	Transport(String),
	/// The explorer answered with a non-success HTTP status.
	#[error("HTTP {status}: {body}")]
	Http { status: u16, body: String },
	/// The response body was not the JSON shape the explorer documents.
	#[error("Decode error: {0}")]
	Decode(String),
	/// The explorer reported a failure in the response body.
	#[error("Explorer API error: {0}")]
	Api(String),
	/// Error that occurs during configuration validation.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

impl ExplorerError {
	/// Whether repeating the same request may succeed.
	///
	/// Only failures below the API layer qualify: connection problems,
	/// timeouts, server errors and HTTP-level throttling.
	pub fn is_transient(&self) -> bool {
		match self {
			ExplorerError::Transport(_) => true,
			ExplorerError::Http { status, .. } => *status == 429 || (500..600).contains(status),
			ExplorerError::Decode(_) | ExplorerError::Api(_) | ExplorerError::Configuration(_) => {
				false
			},
		}
	}
}

/// Trait defining the interface for block explorer clients.
///
/// This trait must be implemented by any explorer client that wants to
/// integrate with the archiver. Implementations perform exactly one HTTP
/// exchange per call; pacing and retries belong to [`ExplorerService`].
#[async_trait]
pub trait ExplorerInterface: Send + Sync {
	/// Returns the configuration schema for this explorer implementation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Fetches one page of an address's transactions.
	///
	/// An API-reported failure is returned as a `PageResult` with
	/// `status_ok == false`, not as an error, so the caller decides how to
	/// report it.
	async fn fetch_page(&self, request: &PageRequest) -> Result<PageResult, ExplorerError>;

	/// Fetches the current chain head block number.
	async fn fetch_chain_head(&self) -> Result<u64, ExplorerError>;
}

/// Type alias for explorer factory functions.
pub type ExplorerFactory = fn(&toml::Value) -> Result<Box<dyn ExplorerInterface>, ExplorerError>;

/// Registry trait for explorer implementations.
pub trait ExplorerRegistry: ImplementationRegistry<Factory = ExplorerFactory> {}

/// Get all registered explorer implementations.
///
/// Returns a vector of (name, factory) tuples for all available explorer implementations.
pub fn get_all_implementations() -> Vec<(&'static str, ExplorerFactory)> {
	use implementations::etherscan;

	vec![(etherscan::Registry::NAME, etherscan::Registry::factory())]
}

/// Service that paces and retries requests to one explorer implementation.
///
/// Every attempt, including retries and chain-head lookups, waits on the
/// shared [`RequestPacer`] first.
pub struct ExplorerService {
	backend: Box<dyn ExplorerInterface>,
	pacer: Arc<RequestPacer>,
	retry: RetryConfig,
}

impl ExplorerService {
	pub fn new(
		backend: Box<dyn ExplorerInterface>,
		pacer: Arc<RequestPacer>,
		retry: RetryConfig,
	) -> Self {
		Self {
			backend,
			pacer,
			retry,
		}
	}

	/// Fetches one page, retrying transient failures.
	pub async fn fetch_page(&self, request: &PageRequest) -> Result<PageResult, ExplorerError> {
		let address = truncate_id(&request.address);
		self.with_retry("fetch_page", &address, || self.backend.fetch_page(request))
			.await
	}

	/// Fetches the chain head, retrying transient failures.
	pub async fn fetch_chain_head(&self) -> Result<u64, ExplorerError> {
		self.with_retry("fetch_chain_head", "-", || self.backend.fetch_chain_head())
			.await
	}

	async fn with_retry<T, F, Fut>(
		&self,
		operation: &'static str,
		address: &str,
		mut call: F,
	) -> Result<T, ExplorerError>
	where
		F: FnMut() -> Fut,
		Fut: Future<Output = Result<T, ExplorerError>>,
	{
		let policy = ExponentialBackoffBuilder::new()
			.with_initial_interval(Duration::from_millis(self.retry.initial_backoff_ms))
			.with_multiplier(2.0)
			.with_randomization_factor(0.0)
			.with_max_interval(Duration::from_millis(self.retry.max_backoff_ms))
			.with_max_elapsed_time(None)
			.build();

		let max_attempts = self.retry.max_attempts.max(1);
		let mut attempt = 0u32;

		backoff::future::retry_notify(
			policy,
			|| {
				attempt += 1;
				let current = attempt;
				let request = call();
				async move {
					self.pacer.acquire().await;
					request.await.map_err(|e| {
						if e.is_transient() && current < max_attempts {
							backoff::Error::transient(e)
						} else {
							backoff::Error::permanent(e)
						}
					})
				}
			},
			|e: ExplorerError, wait: Duration| {
				tracing::warn!(
					component = "explorer",
					operation,
					address,
					error = %e,
					retry_in_ms = wait.as_millis() as u64,
					"Transient explorer failure, retrying"
				);
			},
		)
		.await
	}
}
