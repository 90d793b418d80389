//! Transport primitives for token fetches.
//!
//! [`TokenHttpClient`] is the broker's only dependency on an HTTP stack. The default
//! [`ReqwestHttpClient`] applies the connect and response timeouts from [`HttpTimeouts`]; custom
//! transports plug in through the same trait together with a matching
//! [`TransportErrorMapper`](crate::fetch::TransportErrorMapper).

// crates.io
use oauth2::{AsyncHttpClient, HttpClientError};
#[cfg(feature = "reqwest")] use oauth2::{HttpRequest, HttpResponse};
// self
use crate::{_prelude::*, error::ConfigError};

/// Abstraction over HTTP transports capable of executing token requests.
///
/// Implementations must be `Send + Sync + 'static` so a broker can be cloned across tasks, and
/// the handles they return must own whatever state is required so their request futures stay
/// `Send` for the lifetime of the in-flight fetch. Dropping a request future must abort the
/// underlying network operation.
pub trait TokenHttpClient
where
	Self: 'static + Send + Sync,
{
	/// Concrete error emitted by the underlying transport.
	type TransportError: 'static + Send + Sync + StdError;

	/// [`AsyncHttpClient`] handle used for a single fetch.
	type Handle: for<'c> AsyncHttpClient<
			'c,
			Error = HttpClientError<Self::TransportError>,
			Future: 'c + Send,
		>
		+ 'static
		+ Send
		+ Sync;

	/// Builds a handle for one token request.
	fn handle(&self) -> Self::Handle;
}

/// Connect and response deadlines applied to every token request.
///
/// The response timeout bounds the whole exchange, connecting included, so it must be at least
/// as long as the connect timeout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HttpTimeouts {
	/// Upper bound for establishing the connection.
	pub connect: StdDuration,
	/// Upper bound for the whole exchange, from dispatch to the last body byte.
	pub response: StdDuration,
}
impl HttpTimeouts {
	/// Overrides the connect timeout.
	pub fn with_connect(mut self, timeout: StdDuration) -> Self {
		self.connect = timeout;

		self
	}

	/// Overrides the response timeout.
	pub fn with_response(mut self, timeout: StdDuration) -> Self {
		self.response = timeout;

		self
	}

	/// Rejects a connect timeout longer than the response timeout.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.connect > self.response {
			return Err(ConfigError::ConnectTimeoutExceedsResponse {
				connect: self.connect,
				response: self.response,
			});
		}

		Ok(())
	}
}
impl Default for HttpTimeouts {
	fn default() -> Self {
		Self { connect: StdDuration::from_secs(10), response: StdDuration::from_secs(30) }
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// Token endpoints answer directly, so clients built here never follow redirects. A custom
/// client passed to [`with_client`](Self::with_client) should be configured the same way and
/// carry its own timeouts.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds a client enforcing `timeouts` with redirects disabled.
	pub fn with_timeouts(timeouts: HttpTimeouts) -> Result<Self, ConfigError> {
		timeouts.validate()?;

		let client = ReqwestClient::builder()
			.connect_timeout(timeouts.connect)
			.timeout(timeouts.response)
			.redirect(reqwest::redirect::Policy::none())
			.build()?;

		Ok(Self(client))
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl TokenHttpClient for ReqwestHttpClient {
	type Handle = ReqwestHandle;
	type TransportError = ReqwestError;

	fn handle(&self) -> Self::Handle {
		ReqwestHandle(self.0.clone())
	}
}

/// Per-request handle returned by [`ReqwestHttpClient`].
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct ReqwestHandle(ReqwestClient);
#[cfg(feature = "reqwest")]
impl<'c> AsyncHttpClient<'c> for ReqwestHandle {
	type Error = HttpClientError<ReqwestError>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send + Sync>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		let client = self.0.clone();

		Box::pin(async move {
			let response =
				client.execute(request.try_into().map_err(Box::new)?).await.map_err(Box::new)?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let mut response_new =
				HttpResponse::new(response.bytes().await.map_err(Box::new)?.to_vec());

			*response_new.status_mut() = status;
			*response_new.headers_mut() = headers;

			Ok(response_new)
		})
	}
}
