//! Account table entries.
//!
//! Each configured account pairs a logical label, which names the output
//! artifact, with the address whose history is archived.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when an account entry is malformed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccountError {
	#[error("Account label cannot be empty")]
	EmptyLabel,
	#[error("Account label '{0}' may only contain letters, digits, '_', '-' and '.'")]
	InvalidLabel(String),
	#[error("Invalid address '{address}' for account '{label}': {reason}")]
	InvalidAddress {
		label: String,
		address: String,
		reason: String,
	},
}

/// One entry of the account table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
	/// Logical name, used as the output artifact name.
	pub label: String,
	/// Hex address with `0x` prefix.
	pub address: String,
}

impl Account {
	pub fn new(label: impl Into<String>, address: impl Into<String>) -> Self {
		Self {
			label: label.into(),
			address: address.into(),
		}
	}

	/// Checks that the label is usable as a file name and the address is a
	/// 20-byte hex string.
	pub fn validate(&self) -> Result<(), AccountError> {
		if self.label.is_empty() {
			return Err(AccountError::EmptyLabel);
		}
		let label_ok = self.label != "."
			&& self.label != ".."
			&& self
				.label
				.chars()
				.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
		if !label_ok {
			return Err(AccountError::InvalidLabel(self.label.clone()));
		}

		let invalid = |reason: &str| AccountError::InvalidAddress {
			label: self.label.clone(),
			address: self.address.clone(),
			reason: reason.to_string(),
		};

		let digits = self
			.address
			.strip_prefix("0x")
			.or_else(|| self.address.strip_prefix("0X"))
			.ok_or_else(|| invalid("missing 0x prefix"))?;
		let bytes = hex::decode(digits).map_err(|e| invalid(&e.to_string()))?;
		if bytes.len() != 20 {
			return Err(invalid(&format!("expected 20 bytes, got {}", bytes.len())));
		}

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_valid_account() {
		let account = Account::new(
			"TORNADO_CASH_1ETH",
			"0x47CE0C6eD5B0Ce3d3A51fdb1C52DC66a7c3c2936",
		);
		assert!(account.validate().is_ok());
	}

	#[test]
	fn test_invalid_labels() {
		let address = "0x47CE0C6eD5B0Ce3d3A51fdb1C52DC66a7c3c2936";
		assert_eq!(
			Account::new("", address).validate(),
			Err(AccountError::EmptyLabel)
		);
		assert!(matches!(
			Account::new("../escape", address).validate(),
			Err(AccountError::InvalidLabel(_))
		));
		assert!(matches!(
			Account::new("..", address).validate(),
			Err(AccountError::InvalidLabel(_))
		));
	}

	#[test]
	fn test_invalid_addresses() {
		for address in [
			"47CE0C6eD5B0Ce3d3A51fdb1C52DC66a7c3c2936",
			"0x47CE0C6eD5B0Ce3d3A51fdb1C52DC66a7c3c29",
			"0xZZCE0C6eD5B0Ce3d3A51fdb1C52DC66a7c3c2936",
		] {
			let result = Account::new("label", address).validate();
			assert!(
				matches!(result, Err(AccountError::InvalidAddress { .. })),
				"address {} should be rejected",
				address
			);
		}
	}
}
