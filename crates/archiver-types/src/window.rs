//! Block windows and the request/response shapes of one pagination step.

use crate::record::TransactionRecord;
use thiserror::Error;

/// Prefix of every status message the explorer uses for a successful reply.
///
/// Matched as a prefix so suffixed variants such as `OK-Missing/unindexed`
/// are accepted.
pub const STATUS_OK_PREFIX: &str = "OK";

/// Errors raised when a window cannot be constructed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WindowError {
	/// The start of the window lies past its end.
	#[error("Start block {start} is greater than end block {end}")]
	StartAfterEnd { start: u64, end: u64 },
}

/// Inclusive range of block numbers queried for one address.
///
/// `start_block <= end_block` always holds. The end block is fixed for one
/// engine run while the start only ever moves forward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchWindow {
	address: String,
	start_block: u64,
	end_block: u64,
}

impl FetchWindow {
	/// Creates a window, rejecting ranges whose start lies past their end.
	pub fn new(
		address: impl Into<String>,
		start_block: u64,
		end_block: u64,
	) -> Result<Self, WindowError> {
		if start_block > end_block {
			return Err(WindowError::StartAfterEnd {
				start: start_block,
				end: end_block,
			});
		}
		Ok(Self {
			address: address.into(),
			start_block,
			end_block,
		})
	}

	pub fn address(&self) -> &str {
		&self.address
	}

	pub fn start_block(&self) -> u64 {
		self.start_block
	}

	pub fn end_block(&self) -> u64 {
		self.end_block
	}

	/// Returns true once the window has shrunk to its last block.
	pub fn is_exhausted(&self) -> bool {
		self.start_block == self.end_block
	}

	/// Moves the start of the window to `block`.
	///
	/// Returns false, leaving the window unchanged, if `block` would move the
	/// start backwards or past the end.
	pub fn advance_to(&mut self, block: u64) -> bool {
		if block < self.start_block || block > self.end_block {
			return false;
		}
		self.start_block = block;
		true
	}
}

/// Sort direction requested from the explorer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
	#[default]
	Ascending,
}

impl SortOrder {
	pub fn as_str(&self) -> &'static str {
		match self {
			SortOrder::Ascending => "asc",
		}
	}
}

/// Parameters of a single page fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
	pub address: String,
	pub start_block: u64,
	pub end_block: u64,
	/// Page index. The pagination engine always asks for page 0 and moves the
	/// window instead.
	pub page: u32,
	/// Maximum number of records per page (`offset` in explorer terms).
	pub page_size: u32,
	pub sort: SortOrder,
}

impl PageRequest {
	/// Builds the request for the first page of `window`, sorted ascending.
	pub fn first_page(window: &FetchWindow, page_size: u32) -> Self {
		Self {
			address: window.address().to_string(),
			start_block: window.start_block(),
			end_block: window.end_block(),
			page: 0,
			page_size,
			sort: SortOrder::Ascending,
		}
	}
}

/// Decoded outcome of one fetch call.
#[derive(Debug, Clone, PartialEq)]
pub struct PageResult {
	pub records: Vec<TransactionRecord>,
	pub status_ok: bool,
	pub status_message: String,
}

impl PageResult {
	/// Builds a result, deriving `status_ok` from the status message.
	pub fn from_message(
		status_message: impl Into<String>,
		records: Vec<TransactionRecord>,
	) -> Self {
		let status_message = status_message.into();
		Self {
			status_ok: status_message.starts_with(STATUS_OK_PREFIX),
			status_message,
			records,
		}
	}

	/// A successful page carrying `records`.
	pub fn ok(records: Vec<TransactionRecord>) -> Self {
		Self::from_message(STATUS_OK_PREFIX, records)
	}

	pub fn len(&self) -> usize {
		self.records.len()
	}

	pub fn is_empty(&self) -> bool {
		self.records.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_window_rejects_inverted_range() {
		assert_eq!(
			FetchWindow::new("0x00", 10, 9),
			Err(WindowError::StartAfterEnd { start: 10, end: 9 })
		);
		assert!(FetchWindow::new("0x00", 9, 9).unwrap().is_exhausted());
	}

	#[test]
	fn test_window_advance_is_monotonic() {
		let mut window = FetchWindow::new("0x00", 100, 200).unwrap();
		assert!(window.advance_to(150));
		assert_eq!(window.start_block(), 150);

		// Backwards and past-the-end moves are refused
		assert!(!window.advance_to(149));
		assert!(!window.advance_to(201));
		assert_eq!(window.start_block(), 150);

		// Staying in place is allowed
		assert!(window.advance_to(150));
		assert!(window.advance_to(200));
		assert!(window.is_exhausted());
	}

	#[test]
	fn test_first_page_request() {
		let window = FetchWindow::new("0xabc", 5_000_000, 5_000_000).unwrap();
		let request = PageRequest::first_page(&window, 10_000);
		assert_eq!(request.page, 0);
		assert_eq!(request.start_block, 5_000_000);
		assert_eq!(request.end_block, 5_000_000);
		assert_eq!(request.sort.as_str(), "asc");
	}

	#[test]
	fn test_status_prefix_match() {
		assert!(PageResult::from_message("OK", vec![]).status_ok);
		assert!(PageResult::from_message("OK-Missing/unindexed", vec![]).status_ok);
		assert!(!PageResult::from_message("NOTOK", vec![]).status_ok);
		assert!(!PageResult::from_message("No transactions found", vec![]).status_ok);
	}
}
