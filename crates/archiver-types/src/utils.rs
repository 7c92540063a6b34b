//! Small helpers shared across the archiver crates.

/// Returns the current UNIX timestamp in seconds, or 0 if the system clock
/// is set before the epoch.
pub fn current_timestamp() -> u64 {
	std::time::SystemTime::now()
		.duration_since(std::time::UNIX_EPOCH)
		.map(|d| d.as_secs())
		.unwrap_or(0)
}

/// Shortens an address for log output: first 10 characters followed by "..".
pub fn truncate_id(id: &str) -> String {
	match id.char_indices().nth(10) {
		Some((end, _)) => format!("{}..", &id[..end]),
		None => id.to_string(),
	}
}

/// Parses a JSON-RPC hex quantity such as `"0x10d4f"`.
pub fn parse_hex_quantity(value: &str) -> Option<u64> {
	let digits = value
		.strip_prefix("0x")
		.or_else(|| value.strip_prefix("0X"))?;
	if digits.is_empty() {
		return None;
	}
	u64::from_str_radix(digits, 16).ok()
}
