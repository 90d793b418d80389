//! In-memory token store partitioned by program.
//!
//! The store holds no lock of its own; the broker keeps it behind the same mutex as its in-flight
//! fetch table so that "miss, then register a fetch" is a single atomic step.

// crates.io
use time::PrimitiveDateTime;
// self
use crate::{
	_prelude::*,
	auth::{TokenSecret, program},
	config::DEFAULT_SAFETY_MARGIN,
	store::{CacheWrite, CachedToken, StoreKey},
};

type ScopeMap = HashMap<String, CachedToken>;

/// Mapping from `(normalized program, scope key)` to [`CachedToken`].
///
/// Expiry is lazy: stale entries stay in memory but are never returned. Call
/// [`purge_expired_at`](Self::purge_expired_at) to reclaim them.
#[derive(Clone, Debug)]
pub struct TokenStore {
	safety_margin: Duration,
	programs: HashMap<String, ScopeMap>,
}
impl TokenStore {
	/// Creates an empty store that subtracts `safety_margin` from every declared lifetime.
	pub fn new(safety_margin: Duration) -> Self {
		Self { safety_margin, programs: HashMap::new() }
	}

	/// Safety margin applied by [`put`](Self::put).
	pub fn safety_margin(&self) -> Duration {
		self.safety_margin
	}

	/// Returns the entry for `key` if it is still valid now.
	pub fn lookup(&self, key: &StoreKey) -> Option<CachedToken> {
		self.lookup_at(key, OffsetDateTime::now_utc())
	}

	/// Returns the entry for `key` if it is still valid at `now`.
	pub fn lookup_at(&self, key: &StoreKey, now: OffsetDateTime) -> Option<CachedToken> {
		self.programs
			.get(&key.program)
			.and_then(|scopes| scopes.get(&key.scope_key))
			.filter(|token| token.is_valid_at(now))
			.cloned()
	}

	/// Caches `access_token` unless `declared_ttl` is absent or does not exceed the safety margin.
	///
	/// An existing entry for the same key is replaced. Lifetimes reaching past the last
	/// representable instant are stored with that instant as their expiry.
	pub fn put(
		&mut self,
		key: &StoreKey,
		access_token: TokenSecret,
		declared_ttl: Option<Duration>,
		issued_at: OffsetDateTime,
	) -> CacheWrite {
		let Some(ttl) = declared_ttl.filter(|ttl| *ttl > self.safety_margin) else {
			return CacheWrite::NotCacheable;
		};
		let expires_at = ttl
			.checked_sub(self.safety_margin)
			.and_then(|lifetime| issued_at.checked_add(lifetime))
			.unwrap_or(PrimitiveDateTime::MAX.assume_utc());

		self.programs
			.entry(key.program.clone())
			.or_default()
			.insert(key.scope_key.clone(), CachedToken { access_token, issued_at, expires_at });

		CacheWrite::Stored { expires_at }
	}

	/// Removes every entry.
	pub fn clear_all(&mut self) {
		self.programs.clear();
	}

	/// Removes every entry for `program_name` (matched case-insensitively); returns how many.
	pub fn clear_program(&mut self, program_name: &str) -> usize {
		self.programs.remove(&program::normalize(program_name)).map_or(0, |scopes| scopes.len())
	}

	/// Drops entries that are no longer valid at `now`; returns how many were removed.
	pub fn purge_expired_at(&mut self, now: OffsetDateTime) -> usize {
		let mut purged = 0;

		self.programs.retain(|_, scopes| {
			let before = scopes.len();

			scopes.retain(|_, token| token.is_valid_at(now));
			purged += before - scopes.len();

			!scopes.is_empty()
		});

		purged
	}

	/// Number of stored entries, including expired ones not yet purged.
	pub fn len(&self) -> usize {
		self.programs.values().map(HashMap::len).sum()
	}

	/// Returns `true` if nothing is stored.
	pub fn is_empty(&self) -> bool {
		self.programs.values().all(HashMap::is_empty)
	}
}
impl Default for TokenStore {
	fn default() -> Self {
		Self::new(DEFAULT_SAFETY_MARGIN)
	}
}
