//! Request pacing for rate-limited explorer credentials.
//!
//! Free-tier explorer keys allow a fixed number of requests per time window.
//! One pacer is shared by every request made with a credential, so all
//! accounts in a run draw from the same budget.

use archiver_config::RateLimitConfig;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;
use std::time::Duration;

/// Spaces the starts of consecutive requests by a minimum interval.
///
/// Backed by a single-cell GCRA limiter: the first request passes at once,
/// each later one waits until `min_interval` has passed since the previous
/// start.
pub struct RequestPacer {
	/// `None` for unlimited credentials.
	limiter: Option<DefaultDirectRateLimiter>,
}

impl RequestPacer {
	/// A pacer allowing one request per `min_interval`. A zero interval means
	/// no pacing.
	pub fn new(min_interval: Duration) -> Self {
		let limiter = Quota::with_period(min_interval)
			.map(|quota| RateLimiter::direct(quota.allow_burst(NonZeroU32::MIN)));
		Self { limiter }
	}

	/// A pacer that never waits.
	pub fn unlimited() -> Self {
		Self { limiter: None }
	}

	pub fn from_config(config: &RateLimitConfig) -> Self {
		if config.rate_limited {
			Self::new(Duration::from_millis(config.min_request_interval_ms))
		} else {
			Self::unlimited()
		}
	}

	pub fn is_limited(&self) -> bool {
		self.limiter.is_some()
	}

	/// Waits until a new request may start.
	pub async fn acquire(&self) {
		let Some(limiter) = &self.limiter else {
			return;
		};

		if limiter.check().is_ok() {
			return;
		}
		tracing::debug!(component = "explorer", "Pacing explorer request");
		limiter.until_ready().await;
	}
}
