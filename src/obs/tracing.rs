// self
use crate::{
	_prelude::*,
	fetch::FetchedToken,
	store::{CacheWrite, StoreKey},
};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedFlow<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedFlow<F> = F;

/// Span wrapping one acquisition.
#[derive(Clone, Debug)]
pub struct FlowSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl FlowSpan {
	/// Creates a `token_broker.acquire` span tagged with the normalized program and scope key.
	pub fn new(program: &str, scope_key: &str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("token_broker.acquire", program, scope_key);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (program, scope_key);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedFlow<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Emits a debug event once a fetch for `key` settles. Never logs the token.
pub fn trace_fetch_settled(key: &StoreKey, outcome: &Result<FetchedToken>) {
	#[cfg(feature = "tracing")]
	{
		match outcome {
			Ok(token) => {
				tracing::debug!(%key, expires_in = ?token.expires_in, "token fetch succeeded")
			},
			Err(e) => tracing::debug!(%key, error = %e, "token fetch failed"),
		}
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (key, outcome);
	}
}

/// Emits a debug event describing the cache decision for a fetched token.
pub fn trace_cache_write(key: &StoreKey, write: CacheWrite) {
	#[cfg(feature = "tracing")]
	{
		match write {
			CacheWrite::Stored { expires_at } => tracing::debug!(%key, %expires_at, "token cached"),
			CacheWrite::NotCacheable => {
				tracing::debug!(%key, "token lifetime within safety margin; not cached")
			},
		}
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (key, write);
	}
}

/// Emits a debug event when a fetch finished after the broker was re-initialised.
pub fn trace_stale_generation(key: &StoreKey) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(%key, "broker re-initialised during fetch; result not cached");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = key;
	}
}
