//! Registry trait for self-registering implementations.
//!
//! Every pluggable backend (explorer clients, storage backends) provides a
//! Registry struct declaring its configuration name and factory function.

/// Base trait for implementation registries.
pub trait ImplementationRegistry {
	/// The name used in configuration files to reference this implementation.
	///
	/// This should match the key used in the TOML configuration, for example:
	/// - "etherscan" for explorer.implementations.etherscan
	/// - "file" for storage.implementations.file
	const NAME: &'static str;

	/// The factory function type this implementation provides.
	type Factory;

	/// Get the factory function for this implementation.
	fn factory() -> Self::Factory;
}
