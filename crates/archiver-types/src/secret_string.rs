//! Secret string type for explorer API keys.
//!
//! The key is appended to every explorer request, so it travels through
//! request builders and config structs that are routinely logged. Wrapping it
//! keeps it out of `Debug`/`Display` output and zeroes it on drop.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use zeroize::Zeroizing;

/// A string that is zeroed on drop and redacted when formatted.
#[derive(Clone)]
pub struct SecretString(Zeroizing<String>);

impl SecretString {
	pub fn new(s: String) -> Self {
		Self(Zeroizing::new(s))
	}

	/// Exposes the secret as a string slice.
	///
	/// Only call this where the raw value is handed to the wire; never log it.
	pub fn expose_secret(&self) -> &str {
		&self.0
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

impl fmt::Debug for SecretString {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "SecretString(***REDACTED***)")
	}
}

impl fmt::Display for SecretString {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "***REDACTED***")
	}
}

impl From<String> for SecretString {
	fn from(s: String) -> Self {
		Self::new(s)
	}
}

impl From<&str> for SecretString {
	fn from(s: &str) -> Self {
		Self::new(s.to_string())
	}
}

impl PartialEq for SecretString {
	fn eq(&self, other: &Self) -> bool {
		self.0.as_str() == other.0.as_str()
	}
}

impl Eq for SecretString {}

// Serializing never writes the key back out
impl Serialize for SecretString {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str("***REDACTED***")
	}
}

impl<'de> Deserialize<'de> for SecretString {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		let s = String::deserialize(deserializer)?;
		Ok(SecretString::new(s))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_api_key_is_redacted() {
		let key = SecretString::from("ABCDEF123456");
		assert_eq!(format!("{:?}", key), "SecretString(***REDACTED***)");
		assert_eq!(format!("{}", key), "***REDACTED***");
		assert_eq!(
			serde_json::to_string(&key).unwrap(),
			"\"***REDACTED***\""
		);
	}

	#[test]
	fn test_api_key_expose() {
		let key: SecretString = serde_json::from_str("\"ABCDEF123456\"").unwrap();
		assert_eq!(key.expose_secret(), "ABCDEF123456");
		assert_eq!(key, SecretString::from("ABCDEF123456"));
		assert!(!key.is_empty());
	}
}
