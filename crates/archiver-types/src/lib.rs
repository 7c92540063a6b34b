//! Common types module for the explorer archiver.
//!
//! This module defines the core data types shared by every archiver crate:
//! the opaque transaction records returned by the block explorer, the block
//! windows the pagination engine walks, the account table, and the
//! configuration validation framework used by pluggable implementations.

/// Account table entries (label and address).
pub mod account;
/// Opaque transaction records returned by the explorer.
pub mod record;
/// Registry trait for self-registering implementations.
pub mod registry;
/// Secret string wrapper for API keys.
pub mod secret_string;
/// Utility functions for common conversions.
pub mod utils;
/// Configuration validation types for ensuring type-safe configurations.
pub mod validation;
/// Block windows, page requests and page results.
pub mod window;

// Re-export all types for convenient access
pub use account::{Account, AccountError};
pub use record::{History, RecordError, TransactionRecord};
pub use registry::ImplementationRegistry;
pub use secret_string::SecretString;
pub use utils::{current_timestamp, parse_hex_quantity, truncate_id};
pub use validation::*;
pub use window::{FetchWindow, PageRequest, PageResult, SortOrder, WindowError};
