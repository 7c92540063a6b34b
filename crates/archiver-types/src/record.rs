//! Transaction records as returned by the block explorer.
//!
//! Records are kept as opaque JSON objects so they can be written back out
//! exactly as received. Only the `blockNumber` field is ever inspected.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Name of the field carrying the block height of a record.
pub const BLOCK_NUMBER_FIELD: &str = "blockNumber";

/// Errors that can occur when reading fields of a record.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
	/// The record has no `blockNumber` field.
	#[error("Record is missing the '{0}' field")]
	MissingField(&'static str),
	/// The `blockNumber` field is present but not a decimal integer.
	#[error("Invalid block number '{0}'")]
	InvalidBlockNumber(String),
}

/// A single transaction record returned by the explorer.
///
/// Serializes transparently as the underlying JSON object, preserving
/// key order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionRecord(Map<String, Value>);

/// Ordered, append-only sequence of records for one address.
pub type History = Vec<TransactionRecord>;

impl TransactionRecord {
	/// Returns the block number the transaction was included in.
	///
	/// The explorer encodes it as a decimal string; bare JSON integers are
	/// accepted as well.
	pub fn block_number(&self) -> Result<u64, RecordError> {
		match self.0.get(BLOCK_NUMBER_FIELD) {
			Some(Value::String(s)) => s
				.trim()
				.parse::<u64>()
				.map_err(|_| RecordError::InvalidBlockNumber(s.clone())),
			Some(Value::Number(n)) => n
				.as_u64()
				.ok_or_else(|| RecordError::InvalidBlockNumber(n.to_string())),
			Some(other) => Err(RecordError::InvalidBlockNumber(other.to_string())),
			None => Err(RecordError::MissingField(BLOCK_NUMBER_FIELD)),
		}
	}
}

impl TryFrom<Value> for TransactionRecord {
	type Error = Value;

	fn try_from(value: Value) -> Result<Self, Self::Error> {
		match value {
			Value::Object(map) => Ok(Self(map)),
			other => Err(other),
		}
	}
}
