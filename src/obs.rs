//! Optional observability helpers for token acquisition.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to wrap each acquisition in a span named `token_broker.acquire` with the
//!   `program` and `scope_key` fields, and to emit debug events when a fetch settles and when its
//!   result is (or is not) cached.
//! - Enable `metrics` to increment the `token_broker_acquire_total` counter for every
//!   attempt/hit/miss/failure, labeled by `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::{_prelude::*, flows::CacheStatus};

/// Outcome labels recorded for each acquisition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AcquireOutcome {
	/// Entry to [`Broker::acquire`](crate::flows::Broker::acquire).
	Attempt,
	/// Served from the cache.
	CacheHit,
	/// Served by a fetch.
	CacheMiss,
	/// Failure propagated back to the caller.
	Failure,
}
impl AcquireOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			AcquireOutcome::Attempt => "attempt",
			AcquireOutcome::CacheHit => "cache_hit",
			AcquireOutcome::CacheMiss => "cache_miss",
			AcquireOutcome::Failure => "failure",
		}
	}
}
impl From<CacheStatus> for AcquireOutcome {
	fn from(status: CacheStatus) -> Self {
		match status {
			CacheStatus::CacheHit => AcquireOutcome::CacheHit,
			CacheStatus::CacheMiss => AcquireOutcome::CacheMiss,
		}
	}
}
impl Display for AcquireOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
