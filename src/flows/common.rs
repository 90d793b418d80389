//! Request and response shapes shared by broker operations, plus the broker's cache counters.

// std
use std::sync::atomic::{AtomicU64, Ordering};
// self
use crate::{
	_prelude::*,
	auth::{ProgramName, ScopeKey, TokenSecret},
	error::RequestError,
};

/// Inputs to [`Broker::acquire`](crate::flows::Broker::acquire).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRequest {
	/// Program on whose behalf the token is requested; trimmed before use.
	pub program_name: String,
	/// Space-delimited scopes; empty means no scope.
	#[serde(default)]
	pub scope: String,
}
impl TokenRequest {
	/// Creates a request for `program_name` with no scopes.
	pub fn new(program_name: impl Into<String>) -> Self {
		Self { program_name: program_name.into(), scope: String::new() }
	}

	/// Sets the requested scopes.
	pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
		self.scope = scope.into();

		self
	}

	/// Validates the program name and derives the scope key.
	pub fn validate(&self) -> Result<(ProgramName, ScopeKey), RequestError> {
		Ok((ProgramName::new(&self.program_name)?, ScopeKey::derive(&self.scope)))
	}
}
impl TryFrom<&JsonValue> for TokenRequest {
	type Error = RequestError;

	/// Decodes `{ "programName": ..., "scope": ... }`; a null or absent scope means no scope.
	fn try_from(value: &JsonValue) -> Result<Self, Self::Error> {
		let object = match value {
			JsonValue::Null => return Err(RequestError::NoInputs),
			JsonValue::Object(object) => object,
			_ => return Err(RequestError::InputsNotAnObject),
		};
		let program_name = match object.get("programName") {
			None | Some(JsonValue::Null) => return Err(RequestError::ProgramNameMissing),
			Some(JsonValue::String(name)) => name,
			Some(_) => return Err(RequestError::ProgramNameNotAString),
		};
		let scope = match object.get("scope") {
			None | Some(JsonValue::Null) => "",
			Some(JsonValue::String(scope)) => scope,
			Some(_) => return Err(RequestError::ScopeNotAString),
		};

		ProgramName::new(program_name)?;

		Ok(Self::new(program_name.as_str()).with_scope(scope))
	}
}

/// Whether a token was served from the cache or fetched for this call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CacheStatus {
	/// Served from the token store without a network round trip.
	CacheHit,
	/// Obtained from a fetch, possibly one shared with concurrent callers.
	CacheMiss,
}
impl CacheStatus {
	/// Returns a stable label.
	pub const fn as_str(self) -> &'static str {
		match self {
			CacheStatus::CacheHit => "cacheHit",
			CacheStatus::CacheMiss => "cacheMiss",
		}
	}
}
impl Display for CacheStatus {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Successful [`Broker::acquire`](crate::flows::Broker::acquire) result.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AcquiredToken {
	/// Bearer secret; callers must avoid logging it.
	pub access_token: TokenSecret,
	/// Where the token came from.
	pub cache_status: CacheStatus,
}
impl AcquiredToken {
	pub(crate) fn new(access_token: TokenSecret, cache_status: CacheStatus) -> Self {
		Self { access_token, cache_status }
	}

	/// Returns `true` if the token was served from the cache.
	pub fn is_cache_hit(&self) -> bool {
		self.cache_status == CacheStatus::CacheHit
	}
}

/// Thread-safe counters for acquisitions made through one broker.
#[derive(Debug, Default)]
pub struct CacheMetrics {
	hits: AtomicU64,
	misses: AtomicU64,
	fetches: AtomicU64,
	failures: AtomicU64,
}
impl CacheMetrics {
	/// Acquisitions answered from the store.
	pub fn hits(&self) -> u64 {
		self.hits.load(Ordering::Relaxed)
	}

	/// Acquisitions that found no usable entry, including those joining a shared fetch.
	pub fn misses(&self) -> u64 {
		self.misses.load(Ordering::Relaxed)
	}

	/// Requests actually sent to the token endpoint.
	pub fn fetches(&self) -> u64 {
		self.fetches.load(Ordering::Relaxed)
	}

	/// Acquisitions that returned an error.
	pub fn failures(&self) -> u64 {
		self.failures.load(Ordering::Relaxed)
	}

	pub(crate) fn record_hit(&self) {
		self.hits.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_miss(&self) {
		self.misses.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_fetch(&self) {
		self.fetches.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failures.fetch_add(1, Ordering::Relaxed);
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;

	#[test]
	fn request_decoding_reports_each_problem() {
		let cases = [
			(JsonValue::Null, RequestError::NoInputs),
			(json!("encentivize"), RequestError::InputsNotAnObject),
			(json!({}), RequestError::ProgramNameMissing),
			(json!({ "programName": 7 }), RequestError::ProgramNameNotAString),
			(json!({ "programName": "   " }), RequestError::ProgramNameBlank),
			(json!({ "programName": "a", "scope": ["read"] }), RequestError::ScopeNotAString),
		];

		for (value, expected) in cases {
			assert_eq!(TokenRequest::try_from(&value), Err(expected), "inputs = {value}");
		}
	}

	#[test]
	fn request_decoding_defaults_scope() {
		let request = TokenRequest::try_from(&json!({ "programName": " Encentivize " }))
			.expect("Program-only inputs should decode.");
		let (program, scope) = request.validate().expect("Decoded request should validate.");

		assert_eq!(program.as_str(), "Encentivize");
		assert!(scope.is_empty());

		let request: TokenRequest =
			serde_json::from_value(json!({ "programName": "a", "scope": "B A" }))
				.expect("Serde decoding should accept camelCase fields.");

		assert_eq!(request, TokenRequest::new("a").with_scope("B A"));
	}

	#[test]
	fn cache_status_labels() {
		assert_eq!(CacheStatus::CacheHit.to_string(), "cacheHit");
		assert_eq!(
			serde_json::to_value(CacheStatus::CacheMiss).expect("Status should serialize."),
			json!("cacheMiss")
		);
	}
}
