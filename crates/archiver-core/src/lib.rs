//! Core archiver engine.
//!
//! This module ties the explorer client and the storage backend together:
//! the pagination engine drains one address's transaction history across a
//! block window, and the archiver engine runs it for every configured account
//! in order, persisting each history before moving on. The builder assembles
//! both from configuration using the registered factories.

pub mod builder;
pub mod engine;
pub mod pagination;

#[cfg(test)]
pub(crate) mod test_support;

pub use builder::{ArchiverBuilder, ArchiverFactories, BuilderError};
pub use engine::{AccountSummary, ArchiverEngine, EngineError, RunSummary};
pub use pagination::PaginationEngine;
