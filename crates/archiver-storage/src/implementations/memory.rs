//! In-memory storage backend.
//!
//! Keeps artifacts in a map for tests and dry runs where nothing should be
//! written to disk.

use crate::{StorageError, StorageInterface};
use archiver_types::{ConfigSchema, Field, FieldType, Schema, ValidationError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared handle to the contents of a [`MemoryStorage`].
pub type MemoryStore = Arc<RwLock<HashMap<String, Vec<u8>>>>;

/// In-memory storage implementation.
pub struct MemoryStorage {
	store: MemoryStore,
	pretty: bool,
}

impl MemoryStorage {
	pub fn new() -> Self {
		Self {
			store: Arc::new(RwLock::new(HashMap::new())),
			pretty: false,
		}
	}

	/// Returns a handle that stays valid after the storage is moved into a
	/// service, so callers can inspect what was written.
	pub fn handle(&self) -> MemoryStore {
		self.store.clone()
	}
}

impl Default for MemoryStorage {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl StorageInterface for MemoryStorage {
	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
		let mut store = self.store.write().await;
		store.insert(key.to_string(), value);
		Ok(())
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(MemoryStorageSchema)
	}

	fn pretty(&self) -> bool {
		self.pretty
	}
}

/// Configuration schema for MemoryStorage.
pub struct MemoryStorageSchema;

impl ConfigSchema for MemoryStorageSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(vec![], vec![Field::new("pretty", FieldType::Boolean)]);
		schema.validate(config)
	}
}

/// Factory function to create a memory storage backend from configuration.
///
/// Configuration parameters:
/// - `pretty`: Indent stored JSON (default: false)
pub fn create_storage(config: &toml::Value) -> Result<Box<dyn StorageInterface>, StorageError> {
	MemoryStorageSchema
		.validate(config)
		.map_err(|e| StorageError::Configuration(e.to_string()))?;

	let mut storage = MemoryStorage::new();
	storage.pretty = config
		.get("pretty")
		.and_then(|v| v.as_bool())
		.unwrap_or(false);
	Ok(Box::new(storage))
}

/// Registry for the memory storage implementation.
pub struct Registry;

impl archiver_types::ImplementationRegistry for Registry {
	const NAME: &'static str = "memory";
	type Factory = crate::StorageFactory;

	fn factory() -> Self::Factory {
		create_storage
	}
}

impl crate::StorageRegistry for Registry {}
