//! Storage module for the explorer archiver.
//!
//! This module persists the fetched history of each account as one artifact
//! keyed by the account label. Backends only move bytes; the service handles
//! JSON serialization.

use archiver_types::{ConfigSchema, ImplementationRegistry, TransactionRecord};
use async_trait::async_trait;
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod file;
	pub mod memory;
}

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
	/// Error that occurs during serialization/deserialization.
	#[error("Serialization error: {0}")]
	Serialization(String),
	/// Error that occurs in the storage backend.
	#[error("Backend error: {0}")]
	Backend(String),
	/// Error that occurs during configuration validation.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Trait defining the low-level interface for storage backends.
///
/// Writes replace any existing value for the key as a whole; a reader never
/// observes a partially written artifact.
#[async_trait]
pub trait StorageInterface: Send + Sync {
	/// Stores raw bytes, overwriting any existing value.
	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError>;

	/// Returns the configuration schema for validation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Whether values should be written in indented form.
	fn pretty(&self) -> bool {
		false
	}
}

/// Type alias for storage factory functions.
pub type StorageFactory = fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>;

/// Registry trait for storage implementations.
pub trait StorageRegistry: ImplementationRegistry<Factory = StorageFactory> {}

/// Get all registered storage implementations.
///
/// Returns a vector of (name, factory) tuples for all available storage implementations.
pub fn get_all_implementations() -> Vec<(&'static str, StorageFactory)> {
	use implementations::{file, memory};

	vec![
		(file::Registry::NAME, file::Registry::factory()),
		(memory::Registry::NAME, memory::Registry::factory()),
	]
}

/// High-level storage service for account histories.
pub struct StorageService {
	/// The underlying storage backend implementation.
	backend: Box<dyn StorageInterface>,
}

impl StorageService {
	pub fn new(backend: Box<dyn StorageInterface>) -> Self {
		Self { backend }
	}

	/// Persists an account's history as a JSON array under its label,
	/// replacing any previous artifact.
	pub async fn store_history(
		&self,
		label: &str,
		history: &[TransactionRecord],
	) -> Result<(), StorageError> {
		let bytes = if self.backend.pretty() {
			serde_json::to_vec_pretty(history)
		} else {
			serde_json::to_vec(history)
		}
		.map_err(|e| StorageError::Serialization(e.to_string()))?;

		tracing::debug!(
			component = "storage",
			label,
			records = history.len(),
			bytes = bytes.len(),
			"Writing history"
		);
		self.backend.set_bytes(label, bytes).await
	}
}
