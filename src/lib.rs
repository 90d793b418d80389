//! Client-credentials token cache for service-to-service calls.
//!
//! A [`Broker`](flows::Broker) hands out per-program OAuth 2.0 access tokens from an in-memory
//! store keyed by normalized scopes. Cached tokens expire a safety margin ahead of the lifetime the
//! authorization server declared, and a missing token is fetched at most once per key however
//! many callers ask for it at the same time.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod config;
pub mod error;
pub mod fetch;
pub mod flows;
pub mod http;
pub mod obs;
pub mod store;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		config::BrokerOptions,
		fetch::ReqwestTransportErrorMapper,
		flows::Broker,
		http::{HttpTimeouts, ReqwestHttpClient},
	};

	/// Broker type alias used by reqwest-backed integration tests.
	pub type ReqwestTestBroker = Broker<ReqwestHttpClient, ReqwestTransportErrorMapper>;

	/// Client identifier shared by integration tests.
	pub const TEST_CLIENT_ID: &str = "Aperitif";
	/// Client secret shared by integration tests.
	pub const TEST_CLIENT_SECRET: &str = "qwh3ejk12";

	/// Options pointing at `base_url` with the shared test credentials.
	pub fn test_options(base_url: &str) -> BrokerOptions {
		BrokerOptions::new()
			.base_url(base_url)
			.client_id(TEST_CLIENT_ID)
			.client_secret(TEST_CLIENT_SECRET)
	}

	/// Builds a reqwest-backed broker with default timeouts, initialised against `base_url`.
	pub fn build_reqwest_test_broker(base_url: &str) -> ReqwestTestBroker {
		build_reqwest_test_broker_with(test_options(base_url), HttpTimeouts::default())
	}

	/// Builds a reqwest-backed broker from explicit options and timeouts.
	pub fn build_reqwest_test_broker_with(
		options: BrokerOptions,
		timeouts: HttpTimeouts,
	) -> ReqwestTestBroker {
		let broker = Broker::with_timeouts(timeouts)
			.expect("Failed to build reqwest transport for tests.");

		broker.initialise(options).expect("Test options should initialise the broker.");

		broker
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeSet, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
		time::Duration as StdDuration,
	};

	pub use parking_lot::Mutex;
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use serde_json::Value as JsonValue;
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use oauth2;
#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
