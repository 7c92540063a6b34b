//! Archiver engine that drains every configured account in turn.
//!
//! The chain head is captured once per run and shared by every account
//! window. Accounts are processed sequentially in configuration order; the
//! first failure aborts the run and the failing account is not persisted.

use crate::pagination::PaginationEngine;
use archiver_explorer::{ExplorerError, ExplorerService};
use archiver_storage::{StorageError, StorageService};
use archiver_types::{current_timestamp, truncate_id, Account, RecordError};
use std::sync::Arc;
use thiserror::Error;

/// Errors that abort an archive run.
#[derive(Debug, Error)]
pub enum EngineError {
	/// The explorer answered with a status message other than `OK*`.
	#[error("Explorer reported failure for {address}: {message}")]
	Api { address: String, message: String },
	/// The explorer could not be reached or returned an unreadable reply.
	#[error("Explorer error: {0}")]
	Explorer(#[from] ExplorerError),
	/// A record lacks a usable block number.
	#[error("Invalid record: {0}")]
	Record(#[from] RecordError),
	/// The block window or page size is unusable.
	#[error("Invalid window: {0}")]
	InvalidWindow(String),
	/// A full page lies inside a single block, so the window cannot move.
	#[error(
		"No progress for {address}: a full page of {page_size} records lies entirely in block {block}"
	)]
	NoProgress {
		address: String,
		block: u64,
		page_size: u32,
	},
	/// The explorer returned a record outside the requested window.
	#[error("Record block {block} outside window {start_block}..={end_block}")]
	OutOfWindow {
		block: u64,
		start_block: u64,
		end_block: u64,
	},
	/// The history could not be persisted.
	#[error("Storage error: {0}")]
	Storage(#[from] StorageError),
}

/// Outcome for one archived account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountSummary {
	pub label: String,
	pub address: String,
	pub records: usize,
}

/// Outcome of a complete run.
#[derive(Debug, Clone)]
pub struct RunSummary {
	/// UNIX time the run started.
	pub started_at: u64,
	/// Upper bound used for every account window.
	pub end_block: u64,
	pub accounts: Vec<AccountSummary>,
}

impl RunSummary {
	pub fn total_records(&self) -> usize {
		self.accounts.iter().map(|a| a.records).sum()
	}
}

/// Archives the history of a fixed list of accounts.
pub struct ArchiverEngine {
	explorer: Arc<ExplorerService>,
	storage: Arc<StorageService>,
	pagination: PaginationEngine,
	accounts: Vec<Account>,
	start_block: u64,
	/// Pinned upper bound; the chain head is queried when unset.
	end_block: Option<u64>,
}

impl ArchiverEngine {
	pub fn new(
		explorer: Arc<ExplorerService>,
		storage: Arc<StorageService>,
		pagination: PaginationEngine,
		accounts: Vec<Account>,
		start_block: u64,
		end_block: Option<u64>,
	) -> Self {
		Self {
			explorer,
			storage,
			pagination,
			accounts,
			start_block,
			end_block,
		}
	}

	pub fn accounts(&self) -> &[Account] {
		&self.accounts
	}

	/// Runs the archive for every account, stopping at the first failure.
	pub async fn run(&self) -> Result<RunSummary, EngineError> {
		let started_at = current_timestamp();

		let end_block = match self.end_block {
			Some(end_block) => {
				tracing::info!(end_block, "Using pinned end block");
				end_block
			},
			None => {
				let head = self.explorer.fetch_chain_head().await?;
				tracing::info!(end_block = head, "Fetched chain head");
				head
			},
		};

		tracing::info!(
			accounts = self.accounts.len(),
			start_block = self.start_block,
			end_block,
			"Starting archive run"
		);

		let mut summaries = Vec::with_capacity(self.accounts.len());
		for account in &self.accounts {
			let records = self
				.archive_account(account, end_block)
				.await
				.inspect_err(|e| {
					tracing::error!(
						label = %account.label,
						address = %truncate_id(&account.address),
						error = %e,
						"Archive run aborted"
					);
				})?;

			summaries.push(AccountSummary {
				label: account.label.clone(),
				address: account.address.clone(),
				records,
			});
		}

		let summary = RunSummary {
			started_at,
			end_block,
			accounts: summaries,
		};
		tracing::info!(
			accounts = summary.accounts.len(),
			records = summary.total_records(),
			elapsed_secs = current_timestamp().saturating_sub(started_at),
			"Archive run complete"
		);
		Ok(summary)
	}

	async fn archive_account(&self, account: &Account, end_block: u64) -> Result<usize, EngineError> {
		let history = self
			.pagination
			.fetch_all_transactions(&account.address, self.start_block, end_block)
			.await?;

		self.storage.store_history(&account.label, &history).await?;

		tracing::info!(
			label = %account.label,
			address = %truncate_id(&account.address),
			records = history.len(),
			"Account archived"
		);
		Ok(history.len())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::test_support::{records_between, ScriptedExplorer};
	use archiver_config::BoundaryPolicy;
	use archiver_storage::implementations::memory::MemoryStorage;
	use archiver_types::PageResult;

	fn accounts() -> Vec<Account> {
		vec![
			Account::new(
				"TORNADO_CASH_0_1ETH",
				"0x12D66f87A04A9E220743712cE6d9bB1B5616B8Fc",
			),
			Account::new(
				"TORNADO_CASH_1ETH",
				"0x47CE0C6eD5B0Ce3d3A51fdb1C52DC66a7c3c2936",
			),
		]
	}

	fn engine(
		explorer: ScriptedExplorer,
		storage: MemoryStorage,
		end_block: Option<u64>,
	) -> ArchiverEngine {
		let explorer = explorer.into_service();
		ArchiverEngine::new(
			explorer.clone(),
			Arc::new(StorageService::new(Box::new(storage))),
			PaginationEngine::new(explorer, 1000, BoundaryPolicy::Keep),
			accounts(),
			9_117_609,
			end_block,
		)
	}

	#[tokio::test]
	async fn test_run_archives_every_account_in_order() {
		let (explorer, observed) = ScriptedExplorer::new(
			vec![
				Ok(PageResult::ok(records_between(9_117_700, 9_200_000, 3))),
				Ok(PageResult::ok(records_between(9_300_000, 9_400_000, 5))),
			],
			21_000_000,
		);
		let storage = MemoryStorage::new();
		let store = storage.handle();

		let summary = engine(explorer, storage, None).run().await.unwrap();

		assert_eq!(summary.end_block, 21_000_000);
		assert_eq!(summary.total_records(), 8);
		assert_eq!(summary.accounts[0].label, "TORNADO_CASH_0_1ETH");
		assert_eq!(summary.accounts[1].records, 5);
		assert_eq!(observed.head_calls(), 1);

		let requests = observed.requests();
		assert_eq!(requests.len(), 2);
		assert_eq!(
			requests[0].address,
			"0x12D66f87A04A9E220743712cE6d9bB1B5616B8Fc"
		);
		assert!(requests.iter().all(|r| r.end_block == 21_000_000));
		assert!(requests.iter().all(|r| r.start_block == 9_117_609));

		let store = store.read().await;
		assert!(store.contains_key("TORNADO_CASH_0_1ETH"));
		assert!(store.contains_key("TORNADO_CASH_1ETH"));
	}

	#[tokio::test]
	async fn test_pinned_end_block_skips_chain_head() {
		let (explorer, observed) = ScriptedExplorer::new(vec![], 21_000_000);

		let summary = engine(explorer, MemoryStorage::new(), Some(10_000_000))
			.run()
			.await
			.unwrap();

		assert_eq!(summary.end_block, 10_000_000);
		assert_eq!(observed.head_calls(), 0);
		assert!(observed
			.requests()
			.iter()
			.all(|r| r.end_block == 10_000_000));
	}

	#[tokio::test]
	async fn test_failure_stops_run_and_skips_persistence() {
		let (explorer, observed) = ScriptedExplorer::new(
			vec![Ok(PageResult::from_message("NOTOK: Invalid API Key", vec![]))],
			21_000_000,
		);
		let storage = MemoryStorage::new();
		let store = storage.handle();

		let err = engine(explorer, storage, None).run().await.unwrap_err();

		assert!(matches!(err, EngineError::Api { ref message, .. } if message.starts_with("NOTOK")));
		// The second account is never attempted
		assert_eq!(observed.requests().len(), 1);
		assert!(store.read().await.is_empty());
	}

	#[tokio::test]
	async fn test_start_after_chain_head_is_rejected_before_fetching() {
		let (explorer, observed) = ScriptedExplorer::new(vec![], 9_000_000);

		let err = engine(explorer, MemoryStorage::new(), None)
			.run()
			.await
			.unwrap_err();

		assert!(matches!(err, EngineError::InvalidWindow(_)));
		assert!(observed.requests().is_empty());
	}
}
