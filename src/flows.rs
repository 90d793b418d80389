//! The broker: configuration lifecycle, cache administration, and token acquisition.

pub mod common;

mod client_credentials;

pub use common::*;

// crates.io
use async_lock::OnceCell;
// self
use crate::{
	_prelude::*,
	config::{BrokerConfig, BrokerOptions},
	fetch::{FetchedToken, TransportErrorMapper},
	http::TokenHttpClient,
	store::{StoreKey, TokenStore},
};
#[cfg(feature = "reqwest")]
use crate::{
	fetch::ReqwestTransportErrorMapper,
	http::{HttpTimeouts, ReqwestHttpClient},
};

#[cfg(feature = "reqwest")]
/// Broker specialized for the crate's default reqwest transport stack.
pub type ReqwestBroker = Broker<ReqwestHttpClient, ReqwestTransportErrorMapper>;

type InFlight = Arc<OnceCell<Result<FetchedToken>>>;

struct BrokerState {
	config: Option<Arc<BrokerConfig>>,
	// Bumped by every successful initialise; fetches started under an older generation do not
	// write back.
	generation: u64,
	store: TokenStore,
	in_flight: HashMap<StoreKey, InFlight>,
}

/// Hands out cached client-credentials tokens per program and scope.
///
/// The broker starts uninitialised; [`initialise`](Self::initialise) installs the authorization
/// server settings and may be called again to switch them, which also empties the cache.
/// [`acquire`](Self::acquire) serves valid cached tokens immediately and otherwise fetches, with
/// at most one request in flight per `(program, scope)` key. Clones share all state.
pub struct Broker<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// HTTP client wrapper used for every token request.
	pub http_client: Arc<C>,
	/// Mapper applied to transport-layer errors before surfacing them to callers.
	pub transport_mapper: Arc<M>,
	state: Arc<Mutex<BrokerState>>,
	metrics: Arc<CacheMetrics>,
}
impl<C, M> Broker<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates an uninitialised broker on top of a caller-provided transport + mapper pair.
	pub fn with_http_client(http_client: impl Into<Arc<C>>, mapper: impl Into<Arc<M>>) -> Self {
		Self {
			http_client: http_client.into(),
			transport_mapper: mapper.into(),
			state: Arc::new(Mutex::new(BrokerState {
				config: None,
				generation: 0,
				store: TokenStore::default(),
				in_flight: HashMap::new(),
			})),
			metrics: Default::default(),
		}
	}

	/// Validates `options` and makes them the active configuration.
	///
	/// On success every cached token is discarded. Fetches already underway finish against the
	/// configuration they started with and hand their result to their callers, but do not
	/// populate the new cache. On failure the previous configuration stays active.
	pub fn initialise(&self, options: BrokerOptions) -> Result<()> {
		let config = Arc::new(BrokerConfig::from_options(options)?);
		let mut state = self.state.lock();

		state.store = TokenStore::new(config.safety_margin());
		state.in_flight.clear();
		state.generation = state.generation.wrapping_add(1);
		state.config = Some(config);

		Ok(())
	}

	/// Decodes options from a dynamic JSON value, then [`initialise`](Self::initialise)s.
	pub fn initialise_from_value(&self, options: &JsonValue) -> Result<()> {
		self.initialise(BrokerOptions::from_value(options)?)
	}

	/// Returns `true` once a configuration has been installed.
	pub fn is_initialised(&self) -> bool {
		self.state.lock().config.is_some()
	}

	/// Snapshot of the active configuration, if any.
	pub fn config(&self) -> Option<Arc<BrokerConfig>> {
		self.state.lock().config.clone()
	}

	/// Token URL template with the program placeholder unexpanded, if initialised.
	pub fn token_url_template(&self) -> Option<String> {
		self.config().map(|config| config.token_url_template())
	}

	/// Discards every cached token. Fetches already underway are unaffected.
	pub fn clear_token_cache(&self) {
		self.state.lock().store.clear_all();
	}

	/// Discards cached tokens for `program_name` (case-insensitive, trimmed); returns how many.
	pub fn clear_token_cache_for_program(&self, program_name: &str) -> usize {
		self.state.lock().store.clear_program(program_name)
	}

	/// Reclaims memory held by expired entries; returns how many were dropped.
	pub fn purge_expired_tokens(&self) -> usize {
		self.state.lock().store.purge_expired_at(OffsetDateTime::now_utc())
	}

	/// Number of entries currently held, including expired ones not yet purged.
	pub fn cached_token_count(&self) -> usize {
		self.state.lock().store.len()
	}

	/// Hit, miss, fetch, and failure counters for this broker and its clones.
	pub fn cache_metrics(&self) -> &CacheMetrics {
		&self.metrics
	}
}
#[cfg(feature = "reqwest")]
impl Broker<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates an uninitialised broker with a reqwest transport using default timeouts.
	pub fn new() -> Result<Self> {
		Self::with_timeouts(HttpTimeouts::default())
	}

	/// Creates an uninitialised broker with a reqwest transport using `timeouts`.
	pub fn with_timeouts(timeouts: HttpTimeouts) -> Result<Self> {
		Ok(Self::with_http_client(
			ReqwestHttpClient::with_timeouts(timeouts)?,
			ReqwestTransportErrorMapper,
		))
	}
}
impl<C, M> Clone for Broker<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn clone(&self) -> Self {
		Self {
			http_client: Arc::clone(&self.http_client),
			transport_mapper: Arc::clone(&self.transport_mapper),
			state: Arc::clone(&self.state),
			metrics: Arc::clone(&self.metrics),
		}
	}
}
impl<C, M> Debug for Broker<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let state = self.state.lock();

		f.debug_struct("Broker")
			.field("config", &state.config)
			.field("cached_tokens", &state.store.len())
			.field("in_flight", &state.in_flight.len())
			.finish()
	}
}
