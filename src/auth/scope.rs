//! Scope normalization into canonical cache keys.

// self
use crate::_prelude::*;

/// Key used when a request carries no scopes at all.
pub const NO_SCOPE_KEY: &str = "none";

/// Canonical, order- and case-insensitive view of a requested scope string.
///
/// Tokens are lower-cased, deduplicated, and sorted. [`as_key`](Self::as_key) concatenates them
/// with no separator (an empty set becomes [`NO_SCOPE_KEY`]); [`request_scope`](Self::request_scope)
/// joins them with spaces for the wire.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ScopeKey {
	scopes: Arc<[String]>,
	key: String,
}
impl ScopeKey {
	/// Normalizes `scope` into a key. Total; never fails.
	pub fn derive(scope: &str) -> Self {
		let set =
			scope.to_lowercase().split_whitespace().map(str::to_owned).collect::<BTreeSet<_>>();
		let scopes = Arc::<[String]>::from(set.into_iter().collect::<Vec<_>>());
		let key = if scopes.is_empty() { NO_SCOPE_KEY.to_owned() } else { scopes.concat() };

		Self { scopes, key }
	}

	/// Cache key string.
	pub fn as_key(&self) -> &str {
		&self.key
	}

	/// Returns true if no scopes were requested.
	pub fn is_empty(&self) -> bool {
		self.scopes.is_empty()
	}

	/// Iterator over the normalized scopes.
	pub fn iter(&self) -> impl Iterator<Item = &str> {
		self.scopes.iter().map(String::as_str)
	}

	/// Space-delimited scope parameter for the token request, if any scopes were requested.
	pub fn request_scope(&self) -> Option<String> {
		if self.scopes.is_empty() { None } else { Some(self.scopes.join(" ")) }
	}
}
impl Default for ScopeKey {
	fn default() -> Self {
		Self::derive("")
	}
}
impl Debug for ScopeKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("ScopeKey").field(&self.key).finish()
	}
}
impl Display for ScopeKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.key)
	}
}
impl From<&str> for ScopeKey {
	fn from(value: &str) -> Self {
		Self::derive(value)
	}
}

/// Derives the cache key string for `scope`.
pub fn derive_key(scope: &str) -> String {
	ScopeKey::derive(scope).key
}
