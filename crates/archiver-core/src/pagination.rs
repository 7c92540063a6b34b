//! Bounded pagination over an address's transaction history.
//!
//! The explorer caps every response at `page_size` records, so a long history
//! is walked by always asking for the first page of a shrinking block window.
//! After a full page the window start moves to the block of the page's last
//! record. That block is queried again because the page may have cut it in
//! half.

use crate::engine::EngineError;
use archiver_config::BoundaryPolicy;
use archiver_explorer::ExplorerService;
use archiver_types::{truncate_id, FetchWindow, History, PageRequest, TransactionRecord};
use std::sync::Arc;
use tracing::instrument;

/// Drives repeated page fetches for one address at a time.
pub struct PaginationEngine {
	explorer: Arc<ExplorerService>,
	page_size: u32,
	boundary_policy: BoundaryPolicy,
}

impl PaginationEngine {
	pub fn new(
		explorer: Arc<ExplorerService>,
		page_size: u32,
		boundary_policy: BoundaryPolicy,
	) -> Self {
		Self {
			explorer,
			page_size,
			boundary_policy,
		}
	}

	/// Fetches every transaction of `address` between `start_block` and
	/// `end_block`, both inclusive, in ascending block order.
	///
	/// Fails on the first page the explorer reports as unsuccessful; nothing
	/// fetched before the failure is returned.
	#[instrument(skip_all, fields(address = %truncate_id(address), start_block = start_block, end_block = end_block))]
	pub async fn fetch_all_transactions(
		&self,
		address: &str,
		start_block: u64,
		end_block: u64,
	) -> Result<History, EngineError> {
		if self.page_size == 0 {
			return Err(EngineError::InvalidWindow(
				"page size must be greater than 0".into(),
			));
		}
		let mut window = FetchWindow::new(address, start_block, end_block)
			.map_err(|e| EngineError::InvalidWindow(e.to_string()))?;

		let mut history = History::new();
		let mut step = 0u32;

		loop {
			step += 1;
			let request = PageRequest::first_page(&window, self.page_size);
			let page = self.explorer.fetch_page(&request).await?;

			if !page.status_ok {
				tracing::error!(step, message = %page.status_message, "Explorer reported failure");
				return Err(EngineError::Api {
					address: address.to_string(),
					message: page.status_message,
				});
			}

			let fetched = page.len();
			let full = fetched >= self.page_size as usize;
			let last_block = if full && !window.is_exhausted() {
				page.records
					.last()
					.map(TransactionRecord::block_number)
					.transpose()?
			} else {
				None
			};

			let appended = match self.boundary_policy {
				BoundaryPolicy::Keep => {
					history.extend(page.records);
					fetched
				},
				BoundaryPolicy::Dedupe => {
					let skip = boundary_overlap(&history, window.start_block(), &page.records);
					history.extend(page.records.into_iter().skip(skip));
					fetched - skip
				},
			};

			tracing::debug!(
				step,
				window_start = window.start_block(),
				fetched,
				appended,
				total = history.len(),
				"Fetched page"
			);

			// A short page, or a window already at its last block, ends the history
			let Some(last_block) = last_block else {
				break;
			};

			if last_block == window.start_block() {
				return Err(EngineError::NoProgress {
					address: address.to_string(),
					block: last_block,
					page_size: self.page_size,
				});
			}
			if !window.advance_to(last_block) {
				return Err(EngineError::OutOfWindow {
					block: last_block,
					start_block: window.start_block(),
					end_block: window.end_block(),
				});
			}
		}

		tracing::debug!(steps = step, records = history.len(), "History complete");
		Ok(history)
	}
}

/// Number of leading records of `page` that repeat the records of
/// `boundary_block` already at the end of `history`.
///
/// Records are compared whole and by position, so distinct transactions that
/// merely share the block are never dropped.
fn boundary_overlap(
	history: &[TransactionRecord],
	boundary_block: u64,
	page: &[TransactionRecord],
) -> usize {
	let tail_len = history
		.iter()
		.rev()
		.take_while(|record| record.block_number().ok() == Some(boundary_block))
		.count();
	let tail = &history[history.len() - tail_len..];

	tail.iter()
		.zip(page)
		.take_while(|(previous, current)| previous == current)
		.count()
}
