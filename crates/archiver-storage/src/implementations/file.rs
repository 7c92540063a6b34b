//! File-based storage backend.
//!
//! Each key becomes `<output_dir>/<key>.json`. Writes go to a temporary file
//! in the same directory that is then renamed over the target, so an
//! interrupted run never leaves a truncated artifact behind.

use crate::{StorageError, StorageInterface};
use archiver_types::{ConfigSchema, Field, FieldType, Schema, ValidationError};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;

const DEFAULT_OUTPUT_DIR: &str = "./data";

/// File-based storage implementation.
pub struct FileStorage {
	/// Directory holding one JSON file per key.
	output_dir: PathBuf,
	pretty: bool,
}

impl FileStorage {
	pub fn new(output_dir: PathBuf) -> Self {
		Self {
			output_dir,
			pretty: false,
		}
	}

	/// Indents written JSON.
	pub fn with_pretty(mut self, pretty: bool) -> Self {
		self.pretty = pretty;
		self
	}

	/// Converts a storage key to a filesystem-safe file path.
	fn get_file_path(&self, key: &str) -> PathBuf {
		let safe_key = key.replace(['/', '\\', ':'], "_");
		self.output_dir.join(format!("{}.json", safe_key))
	}
}

#[async_trait]
impl StorageInterface for FileStorage {
	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
		let path = self.get_file_path(key);

		fs::create_dir_all(&self.output_dir)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;

		// Write atomically by writing to temp file then renaming
		let temp_path = path.with_extension("json.tmp");
		fs::write(&temp_path, value)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;

		fs::rename(&temp_path, &path)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;

		tracing::debug!(component = "storage", path = %path.display(), "Artifact written");
		Ok(())
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(FileStorageSchema)
	}

	fn pretty(&self) -> bool {
		self.pretty
	}
}

/// Configuration schema for FileStorage.
pub struct FileStorageSchema;

impl ConfigSchema for FileStorageSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![],
			vec![
				Field::new("output_dir", FieldType::String).with_validator(|value| {
					match value.as_str() {
						Some(dir) if !dir.trim().is_empty() => Ok(()),
						_ => Err("output_dir cannot be empty".to_string()),
					}
				}),
				Field::new("pretty", FieldType::Boolean),
			],
		);

		schema.validate(config)
	}
}

/// Factory function to create a file storage backend from configuration.
///
/// Configuration parameters:
/// - `output_dir`: Directory for the per-account JSON files (default: "./data")
/// - `pretty`: Indent written JSON (default: false)
pub fn create_storage(config: &toml::Value) -> Result<Box<dyn StorageInterface>, StorageError> {
	FileStorageSchema
		.validate(config)
		.map_err(|e| StorageError::Configuration(e.to_string()))?;

	let output_dir = config
		.get("output_dir")
		.and_then(|v| v.as_str())
		.unwrap_or(DEFAULT_OUTPUT_DIR);
	let pretty = config
		.get("pretty")
		.and_then(|v| v.as_bool())
		.unwrap_or(false);

	Ok(Box::new(
		FileStorage::new(PathBuf::from(output_dir)).with_pretty(pretty),
	))
}

/// Registry for the file storage implementation.
pub struct Registry;

impl archiver_types::ImplementationRegistry for Registry {
	const NAME: &'static str = "file";
	type Factory = crate::StorageFactory;

	fn factory() -> Self::Factory {
		create_storage
	}
}

impl crate::StorageRegistry for Registry {}
