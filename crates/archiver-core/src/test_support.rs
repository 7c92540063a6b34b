//! Scripted explorer used by the engine tests.

use archiver_config::RetryConfig;
use archiver_explorer::{ExplorerError, ExplorerInterface, ExplorerService, RequestPacer};
use archiver_types::{
	ConfigSchema, PageRequest, PageResult, Schema, TransactionRecord, ValidationError,
};
use async_trait::async_trait;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Records every page request and answers from a queue of scripted replies.
pub struct ScriptedExplorer {
	pages: Mutex<VecDeque<Result<PageResult, ExplorerError>>>,
	requests: Arc<Mutex<Vec<PageRequest>>>,
	chain_head: u64,
	head_calls: Arc<Mutex<usize>>,
}

/// Handles onto what a [`ScriptedExplorer`] observed.
#[derive(Clone)]
pub struct Observed {
	pub requests: Arc<Mutex<Vec<PageRequest>>>,
	pub head_calls: Arc<Mutex<usize>>,
}

impl Observed {
	pub fn requests(&self) -> Vec<PageRequest> {
		self.requests.lock().unwrap().clone()
	}

	pub fn head_calls(&self) -> usize {
		*self.head_calls.lock().unwrap()
	}
}

impl ScriptedExplorer {
	pub fn new(pages: Vec<Result<PageResult, ExplorerError>>, chain_head: u64) -> (Self, Observed) {
		let observed = Observed {
			requests: Arc::new(Mutex::new(Vec::new())),
			head_calls: Arc::new(Mutex::new(0)),
		};
		(
			Self {
				pages: Mutex::new(pages.into()),
				requests: observed.requests.clone(),
				chain_head,
				head_calls: observed.head_calls.clone(),
			},
			observed,
		)
	}

	/// Wraps the explorer in a service without pacing.
	pub fn into_service(self) -> Arc<ExplorerService> {
		Arc::new(ExplorerService::new(
			Box::new(self),
			Arc::new(RequestPacer::unlimited()),
			RetryConfig::default(),
		))
	}
}

struct EmptySchema;

impl ConfigSchema for EmptySchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(vec![], vec![]).validate(config)
	}
}

#[async_trait]
impl ExplorerInterface for ScriptedExplorer {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(EmptySchema)
	}

	async fn fetch_page(&self, request: &PageRequest) -> Result<PageResult, ExplorerError> {
		self.requests.lock().unwrap().push(request.clone());
		self.pages
			.lock()
			.unwrap()
			.pop_front()
			.unwrap_or_else(|| Ok(PageResult::ok(vec![])))
	}

	async fn fetch_chain_head(&self) -> Result<u64, ExplorerError> {
		*self.head_calls.lock().unwrap() += 1;
		Ok(self.chain_head)
	}
}

pub fn record(block: u64, index: usize) -> TransactionRecord {
	TransactionRecord::try_from(json!({
		"blockNumber": block.to_string(),
		"hash": format!("0x{:064x}", block * 100_000 + index as u64),
		"transactionIndex": index.to_string(),
		"value": "0"
	}))
	.unwrap()
}

/// `count` records spread over blocks `first..=last`, the final record in
/// `last`.
pub fn records_between(first: u64, last: u64, count: usize) -> Vec<TransactionRecord> {
	let span = last - first;
	(0..count)
		.map(|i| {
			let block = if count == 1 {
				last
			} else {
				first + span * i as u64 / (count as u64 - 1)
			};
			record(block, i)
		})
		.collect()
}
