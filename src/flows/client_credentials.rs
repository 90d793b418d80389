//! Client-credentials acquisition with caching and single-flight fetches.
//!
//! A cache miss registers an [`OnceCell`](async_lock::OnceCell) for its store key under the same
//! lock that performed the lookup, so concurrent callers for that key always attach to one fetch.
//! The cell initializer performs the round trip and settles it: it unregisters the cell and writes
//! a successful result through to the store before any attached caller observes it. If the caller
//! driving the fetch is cancelled, one of the waiting callers takes it over.

// crates.io
use async_lock::OnceCell;
// self
use crate::{
	_prelude::*,
	auth::{ProgramName, ScopeKey},
	config::BrokerConfig,
	fetch::{FetchedToken, TokenFetcher, TransportErrorMapper},
	flows::{AcquiredToken, Broker, CacheStatus, InFlight, TokenRequest},
	http::TokenHttpClient,
	obs::{self, AcquireOutcome, FlowSpan},
	store::StoreKey,
};

impl<C, M> Broker<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Returns a bearer token for `request`, from the cache when a valid one is held.
	///
	/// Input problems and a missing [`initialise`](Self::initialise) are reported before any
	/// network activity. Every caller that shares a fetch receives the same outcome and reports
	/// [`CacheStatus::CacheMiss`]; failures are never cached.
	pub async fn acquire(&self, request: TokenRequest) -> Result<AcquiredToken> {
		obs::record_acquire_outcome(AcquireOutcome::Attempt);

		let result = match request.validate() {
			Ok((program, scope)) => {
				let span = FlowSpan::new(program.normalized(), scope.as_key());

				span.instrument(self.acquire_validated(program, scope)).await
			},
			Err(e) => Err(e.into()),
		};

		match &result {
			Ok(token) => obs::record_acquire_outcome(token.cache_status.into()),
			Err(_) => {
				self.metrics.record_failure();
				obs::record_acquire_outcome(AcquireOutcome::Failure);
			},
		}

		result
	}

	async fn acquire_validated(
		&self,
		program: ProgramName,
		scope: ScopeKey,
	) -> Result<AcquiredToken> {
		let key = StoreKey::new(&program, &scope);
		let (config, generation, cell) = {
			let mut state = self.state.lock();
			let Some(config) = state.config.clone() else {
				return Err(Error::NotInitialised);
			};

			if let Some(cached) = state.store.lookup(&key) {
				self.metrics.record_hit();

				return Ok(AcquiredToken::new(cached.access_token, CacheStatus::CacheHit));
			}

			let generation = state.generation;
			let cell = Arc::clone(
				state.in_flight.entry(key.clone()).or_insert_with(|| Arc::new(OnceCell::new())),
			);

			(config, generation, cell)
		};

		self.metrics.record_miss();

		let settle = || self.fetch_and_settle(&config, generation, &program, &scope, &key, &cell);
		let fetched = cell.get_or_init(settle).await.clone()?;

		Ok(AcquiredToken::new(fetched.access_token, CacheStatus::CacheMiss))
	}

	async fn fetch_and_settle(
		&self,
		config: &BrokerConfig,
		generation: u64,
		program: &ProgramName,
		scope: &ScopeKey,
		key: &StoreKey,
		cell: &InFlight,
	) -> Result<FetchedToken> {
		let fetcher = TokenFetcher::<C, M>::new(
			Arc::clone(&self.http_client),
			Arc::clone(&self.transport_mapper),
		);

		self.metrics.record_fetch();

		let outcome = fetcher.fetch(config, program, scope).await;

		obs::trace_fetch_settled(key, &outcome);

		let mut state = self.state.lock();

		if state.in_flight.get(key).is_some_and(|current| Arc::ptr_eq(current, cell)) {
			state.in_flight.remove(key);
		}
		if let Ok(token) = &outcome {
			if state.generation == generation {
				let write = state.store.put(
					key,
					token.access_token.clone(),
					token.expires_in,
					token.issued_at,
				);

				obs::trace_cache_write(key, write);
			} else {
				obs::trace_stale_generation(key);
			}
		}

		outcome
	}
}
