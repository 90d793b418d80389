//! Token cache entries, keys, and the in-memory [`TokenStore`].

pub mod memory;

pub use memory::TokenStore;

// self
use crate::{
	_prelude::*,
	auth::{ProgramName, ScopeKey, TokenSecret, program},
};

/// Outcome of [`TokenStore::put`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheWrite {
	/// The token was cached until the contained instant.
	Stored {
		/// Instant after which the entry is no longer served.
		expires_at: OffsetDateTime,
	},
	/// The declared lifetime was absent or did not exceed the safety margin.
	NotCacheable,
}
impl CacheWrite {
	/// Returns `true` if the token was written to the store.
	pub fn is_stored(self) -> bool {
		matches!(self, Self::Stored { .. })
	}
}

/// Cached access token with its safety-adjusted expiry.
#[derive(Clone, PartialEq, Eq)]
pub struct CachedToken {
	/// Access token secret; callers must avoid logging it.
	pub access_token: TokenSecret,
	/// Instant the token was received.
	pub issued_at: OffsetDateTime,
	/// `issued_at + (declared_ttl - safety_margin)`.
	pub expires_at: OffsetDateTime,
}
impl CachedToken {
	/// Returns `true` if the entry may still be served at `instant`.
	pub fn is_valid_at(&self, instant: OffsetDateTime) -> bool {
		instant < self.expires_at
	}

	/// Remaining servable lifetime at `instant`, clamped at zero.
	pub fn remaining_at(&self, instant: OffsetDateTime) -> Duration {
		let remaining = self.expires_at - instant;

		if remaining.is_negative() { Duration::ZERO } else { remaining }
	}
}
impl Debug for CachedToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CachedToken")
			.field("access_token", &"<redacted>")
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

/// Unique key identifying a cached token: normalized program plus scope key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StoreKey {
	/// Lower-cased, trimmed program name.
	pub program: String,
	/// Scope cache key (see [`ScopeKey::as_key`]).
	pub scope_key: String,
}
impl StoreKey {
	/// Builds a key for a validated program and scope.
	pub fn new(program: &ProgramName, scope: &ScopeKey) -> Self {
		Self { program: program.normalized().to_owned(), scope_key: scope.as_key().to_owned() }
	}

	/// Builds a key from raw strings, normalizing both halves.
	pub fn from_raw(program_name: &str, scope: &str) -> Self {
		Self {
			program: program::normalize(program_name),
			scope_key: ScopeKey::derive(scope).as_key().to_owned(),
		}
	}
}
impl Display for StoreKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "{}/{}", self.program, self.scope_key)
	}
}
