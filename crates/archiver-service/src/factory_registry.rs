//! Factory registry for archiver implementations.
//!
//! Collects the factories every implementation crate registers and selects the
//! ones the configuration refers to.

use archiver_config::Config;
use archiver_core::{ArchiverBuilder, ArchiverEngine, ArchiverFactories};
use archiver_explorer::ExplorerFactory;
use archiver_storage::StorageFactory;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Registry of every known implementation factory.
pub struct FactoryRegistry {
	pub explorer: HashMap<String, ExplorerFactory>,
	pub storage: HashMap<String, StorageFactory>,
}

impl FactoryRegistry {
	pub fn new() -> Self {
		Self {
			explorer: HashMap::new(),
			storage: HashMap::new(),
		}
	}

	pub fn register_explorer(&mut self, name: impl Into<String>, factory: ExplorerFactory) {
		self.explorer.insert(name.into(), factory);
	}

	pub fn register_storage(&mut self, name: impl Into<String>, factory: StorageFactory) {
		self.storage.insert(name.into(), factory);
	}
}

static REGISTRY: OnceLock<FactoryRegistry> = OnceLock::new();

/// Returns the global registry, populating it on first use.
pub fn get_registry() -> &'static FactoryRegistry {
	REGISTRY.get_or_init(|| {
		let mut registry = FactoryRegistry::new();

		for (name, factory) in archiver_explorer::get_all_implementations() {
			tracing::debug!("Registering explorer implementation: {}", name);
			registry.register_explorer(name, factory);
		}

		for (name, factory) in archiver_storage::get_all_implementations() {
			tracing::debug!("Registering storage implementation: {}", name);
			registry.register_storage(name, factory);
		}

		registry
	})
}

/// Selects the registered factories named in `implementations`.
fn select_factories<F: Copy>(
	kind: &str,
	implementations: &HashMap<String, toml::Value>,
	registered: &HashMap<String, F>,
) -> Result<HashMap<String, F>, String> {
	let mut factories = HashMap::new();
	for name in implementations.keys() {
		let Some(factory) = registered.get(name) else {
			let mut available: Vec<_> = registered.keys().cloned().collect();
			available.sort();
			return Err(format!(
				"Unknown {} implementation '{}'. Available: [{}]",
				kind,
				name,
				available.join(", ")
			));
		};
		factories.insert(name.clone(), *factory);
	}
	Ok(factories)
}

/// Builds the archiver engine from the registry and the configuration.
pub fn build_archiver_from_config(
	config: Config,
) -> Result<ArchiverEngine, Box<dyn std::error::Error>> {
	let registry = get_registry();

	let factories = ArchiverFactories {
		explorer_factories: select_factories(
			"explorer",
			&config.explorer.implementations,
			&registry.explorer,
		)?,
		storage_factories: select_factories(
			"storage",
			&config.storage.implementations,
			&registry.storage,
		)?,
	};

	Ok(ArchiverBuilder::new(config).build(factories)?)
}
