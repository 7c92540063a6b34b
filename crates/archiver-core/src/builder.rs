//! Builder for constructing archiver engines.
//!
//! Composes an [`ArchiverEngine`] from the configured explorer and storage
//! implementations using their factory functions.

use crate::engine::ArchiverEngine;
use crate::pagination::PaginationEngine;
use archiver_config::Config;
use archiver_explorer::{ExplorerError, ExplorerInterface, ExplorerService, RequestPacer};
use archiver_storage::{StorageError, StorageInterface, StorageService};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during archiver construction.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Missing required component: {0}")]
	MissingComponent(String),
}

/// Factory functions for every pluggable component, keyed by implementation
/// name.
pub struct ArchiverFactories<EF, SF> {
	pub explorer_factories: HashMap<String, EF>,
	pub storage_factories: HashMap<String, SF>,
}

/// Builder for an [`ArchiverEngine`].
pub struct ArchiverBuilder {
	config: Config,
}

impl ArchiverBuilder {
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	/// Builds the engine from the primary explorer and storage
	/// implementations.
	///
	/// Every configured implementation with a registered factory is created,
	/// so a broken secondary entry is reported at startup.
	pub fn build<EF, SF>(self, factories: ArchiverFactories<EF, SF>) -> Result<ArchiverEngine, BuilderError>
	where
		EF: Fn(&toml::Value) -> Result<Box<dyn ExplorerInterface>, ExplorerError>,
		SF: Fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>,
	{
		let config = self.config;

		let explorer_backend = create_primary(
			"explorer",
			&config.explorer.primary,
			&config.explorer.implementations,
			&factories.explorer_factories,
		)?;
		let pacer = Arc::new(RequestPacer::from_config(&config.rate_limit));
		tracing::info!(
			component = "explorer",
			rate_limited = pacer.is_limited(),
			min_request_interval_ms = config.rate_limit.min_request_interval_ms,
			max_attempts = config.explorer.retry.max_attempts,
			"Request policy"
		);
		let explorer = Arc::new(ExplorerService::new(
			explorer_backend,
			pacer,
			config.explorer.retry.clone(),
		));

		let storage_backend = create_primary(
			"storage",
			&config.storage.primary,
			&config.storage.implementations,
			&factories.storage_factories,
		)?;
		let storage = Arc::new(StorageService::new(storage_backend));

		let pagination = PaginationEngine::new(
			explorer.clone(),
			config.archiver.page_size,
			config.archiver.boundary_policy,
		);

		Ok(ArchiverEngine::new(
			explorer,
			storage,
			pagination,
			config.accounts,
			config.archiver.start_block,
			config.archiver.end_block,
		))
	}
}

/// Creates every configured implementation of one component and returns the
/// primary one.
fn create_primary<T, E, F>(
	component: &'static str,
	primary: &str,
	implementations: &HashMap<String, toml::Value>,
	factories: &HashMap<String, F>,
) -> Result<T, BuilderError>
where
	E: std::fmt::Display,
	F: Fn(&toml::Value) -> Result<T, E>,
{
	let mut created = HashMap::new();

	for (name, config) in implementations {
		let Some(factory) = factories.get(name) else {
			tracing::warn!(component, implementation = %name, "No factory registered, skipping");
			continue;
		};

		match factory(config) {
			Ok(implementation) => {
				// Validation already happened in the factory
				let is_primary = primary == name;
				tracing::info!(component, implementation = %name, enabled = %is_primary, "Loaded");
				created.insert(name.clone(), implementation);
			},
			Err(e) => {
				tracing::error!(
					component,
					implementation = %name,
					error = %e,
					"Failed to create implementation"
				);
				return Err(BuilderError::Config(format!(
					"Failed to create {} implementation '{}': {}",
					component, name, e
				)));
			},
		}
	}

	created.remove(primary).ok_or_else(|| {
		BuilderError::MissingComponent(format!(
			"Primary {} '{}' has no registered implementation",
			component, primary
		))
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::test_support::ScriptedExplorer;
	use archiver_explorer::ExplorerFactory;
	use archiver_storage::StorageFactory;
	use std::str::FromStr;

	const CONFIG: &str = r#"
[archiver]
start_block = 9117609
end_block = 9117700

[explorer]
primary = "scripted"
[explorer.implementations.scripted]

[storage]
primary = "memory"
[storage.implementations.memory]

[[accounts]]
label = "TORNADO_CASH_ROUTER"
address = "0xd90e2f925DA726b50C4Ed8D0Fb90Ad053324F31b"
"#;

	fn scripted(_config: &toml::Value) -> Result<Box<dyn ExplorerInterface>, ExplorerError> {
		let (explorer, _) = ScriptedExplorer::new(vec![], 9_200_000);
		Ok(Box::new(explorer))
	}

	fn factories() -> ArchiverFactories<ExplorerFactory, StorageFactory> {
		ArchiverFactories {
			explorer_factories: HashMap::from([("scripted".to_string(), scripted as ExplorerFactory)]),
			storage_factories: archiver_storage::get_all_implementations()
				.into_iter()
				.map(|(name, factory)| (name.to_string(), factory))
				.collect(),
		}
	}

	#[tokio::test]
	async fn test_build_and_run() {
		let config = Config::from_str(CONFIG).unwrap();
		let engine = ArchiverBuilder::new(config).build(factories()).unwrap();

		assert_eq!(engine.accounts().len(), 1);
		let summary = engine.run().await.unwrap();
		assert_eq!(summary.end_block, 9_117_700);
		assert_eq!(summary.accounts[0].records, 0);
	}

	#[test]
	fn test_missing_factory_for_primary() {
		let config = Config::from_str(&CONFIG.replace("scripted", "blockscout")).unwrap();
		let err = ArchiverBuilder::new(config).build(factories()).err().unwrap();
		assert!(matches!(err, BuilderError::MissingComponent(ref m) if m.contains("blockscout")));
	}

	#[test]
	fn test_factory_failure_is_reported() {
		let config = Config::from_str(&CONFIG.replace(
			"[storage.implementations.memory]",
			"[storage.implementations.memory]\npretty = 1",
		))
		.unwrap();
		let err = ArchiverBuilder::new(config).build(factories()).err().unwrap();
		assert!(matches!(err, BuilderError::Config(ref m) if m.contains("memory")));
	}
}
