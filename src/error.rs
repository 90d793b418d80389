//! Broker-level error types shared by configuration, acquisition, and token fetches.
//!
//! Every variant is `Clone` so one settled fetch can be handed to every caller coalesced onto
//! it; underlying causes are kept behind [`Arc`].

// self
use crate::_prelude::*;

/// Broker-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type SharedError = Arc<dyn std::error::Error + Send + Sync>;

/// Canonical broker error exposed by public APIs.
#[derive(Clone, Debug, ThisError)]
pub enum Error {
	/// Initialization options are missing, mistyped, or invalid.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Acquisition inputs are missing, mistyped, or invalid.
	#[error(transparent)]
	Request(#[from] RequestError),
	/// [`Broker::acquire`](crate::flows::Broker::acquire) ran before a successful initialise.
	#[error("Token broker has not yet been initialised.")]
	NotInitialised,
	/// Transport failure (timeouts, DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// The authorization server answered, but not with a usable token.
	#[error(transparent)]
	Protocol(#[from] ProtocolError),
}
impl Error {
	/// Returns `true` for caller misuse (bad options, bad inputs, missing initialise).
	///
	/// These never reach the network and retrying them cannot succeed. A request that could not
	/// be built or dispatched at fetch time is a [`TransportError::InvalidRequest`] instead.
	pub fn is_caller_misuse(&self) -> bool {
		matches!(self, Self::Config(_) | Self::Request(_) | Self::NotInitialised)
	}

	/// Returns `true` for timeouts in either the connect or the response phase.
	pub fn is_timeout(&self) -> bool {
		matches!(
			self,
			Self::Transport(TransportError::RequestTimeout | TransportError::ResponseTimeout)
		)
	}
}

/// Configuration failures raised by `initialise` and transport construction.
#[derive(Clone, Debug, ThisError)]
pub enum ConfigError {
	/// No options were supplied.
	#[error("Initialise must be called with options.")]
	NoOptions,
	/// Options were supplied but are not an object.
	#[error("Options must be an object.")]
	OptionsNotAnObject,
	/// `baseUrl` is absent.
	#[error("The base URL must be set.")]
	BaseUrlMissing,
	/// `baseUrl` is not a string.
	#[error("The base URL must be a string.")]
	BaseUrlNotAString,
	/// `baseUrl` is empty or whitespace.
	#[error("The base URL cannot be blank.")]
	BaseUrlBlank,
	/// `baseUrl` cannot be parsed.
	#[error("The base URL is invalid.")]
	InvalidBaseUrl {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// `baseUrl` parses but cannot carry path segments (e.g. `mailto:`).
	#[error("The base URL `{url}` cannot carry a token path.")]
	BaseUrlCannotBeABase {
		/// Offending URL.
		url: String,
	},
	/// `clientId` is absent.
	#[error("The client id must be set.")]
	ClientIdMissing,
	/// `clientId` is not a string.
	#[error("The client id must be a string.")]
	ClientIdNotAString,
	/// `clientId` is empty or whitespace.
	#[error("The client id cannot be blank.")]
	ClientIdBlank,
	/// `clientSecret` is absent.
	#[error("The client secret must be specified.")]
	ClientSecretMissing,
	/// `clientSecret` is not a string.
	#[error("The client secret must be a string.")]
	ClientSecretNotAString,
	/// `clientSecret` is empty or whitespace.
	#[error("The client secret cannot be blank.")]
	ClientSecretBlank,
	/// `tokenPathTemplate` is not a string.
	#[error("The token path template must be a string.")]
	TemplateNotAString,
	/// `tokenPathTemplate` lacks the `{{programName}}` placeholder.
	#[error("The token path template `{template}` does not contain {{programName}}.")]
	TemplateMissingPlaceholder {
		/// Offending template.
		template: String,
	},
	/// `safetyMarginSecs` is not a non-negative number of seconds.
	#[error("The safety margin must be a non-negative number of seconds.")]
	InvalidSafetyMargin,
	/// The connect timeout is longer than the response timeout, which also bounds connecting.
	#[error("The connect timeout ({connect:?}) cannot exceed the response timeout ({response:?}).")]
	ConnectTimeoutExceedsResponse {
		/// Requested connect timeout.
		connect: StdDuration,
		/// Requested response timeout.
		response: StdDuration,
	},
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: SharedError,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Arc::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Acquisition input failures; raised before any network activity.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum RequestError {
	/// No inputs were supplied.
	#[error("Inputs must be specified when acquiring a token.")]
	NoInputs,
	/// Inputs were supplied but are not an object.
	#[error("Token request inputs must be an object.")]
	InputsNotAnObject,
	/// `programName` is absent.
	#[error("The program name is required.")]
	ProgramNameMissing,
	/// `programName` is not a string.
	#[error("The program name must be a string.")]
	ProgramNameNotAString,
	/// `programName` is empty or whitespace.
	#[error("The program name cannot be blank.")]
	ProgramNameBlank,
	/// `scope` is present but not a string.
	#[error("The scope must be a string.")]
	ScopeNotAString,
}

/// Transport-level failures (timeouts, network, IO).
#[derive(Clone, Debug, ThisError)]
pub enum TransportError {
	/// Connecting to the token endpoint exceeded the connect timeout; the attempt was aborted.
	#[error("Request has expired before a connection was established.")]
	RequestTimeout,
	/// The token endpoint did not answer within the response timeout.
	#[error("Response has expired before the token endpoint answered.")]
	ResponseTimeout,
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the token endpoint.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: SharedError,
	},
	/// The token request could not be built or handed to the transport.
	#[error("Token request could not be dispatched.")]
	InvalidRequest {
		/// Underlying request builder failure.
		#[source]
		source: SharedError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the token endpoint.")]
	Io {
		/// IO failure.
		#[source]
		source: Arc<std::io::Error>,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Arc::new(src) }
	}

	/// Wraps a request builder failure raised while dispatching a fetch.
	pub fn invalid_request(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::InvalidRequest { source: Arc::new(src) }
	}
}
impl From<oauth2::http::Error> for TransportError {
	fn from(e: oauth2::http::Error) -> Self {
		Self::invalid_request(e)
	}
}
impl From<std::io::Error> for TransportError {
	fn from(e: std::io::Error) -> Self {
		Self::Io { source: Arc::new(e) }
	}
}

/// The token endpoint responded, but the response is not a usable token.
#[derive(Clone, Debug, ThisError)]
pub enum ProtocolError {
	/// Non-200 status; `body` holds the raw response for diagnostics.
	#[error("Token endpoint answered with HTTP {status}: {body}")]
	AuthServer {
		/// HTTP status code.
		status: u16,
		/// Raw response body (lossy UTF-8).
		body: String,
	},
	/// The body is not a JSON object of the expected shape.
	#[error("Token endpoint returned a malformed response: {body}")]
	MalformedResponse {
		/// Raw response body (lossy UTF-8).
		body: String,
		/// Structured parsing failure.
		#[source]
		source: Arc<serde_path_to_error::Error<serde_json::Error>>,
	},
	/// The parsed body has no usable `access_token`.
	#[error("Token object did not contain the property access_token.")]
	MissingAccessToken,
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn misuse_errors_are_distinguished_from_runtime_failures() {
		assert!(Error::from(ConfigError::ClientIdBlank).is_caller_misuse());
		assert!(Error::from(RequestError::ProgramNameBlank).is_caller_misuse());
		assert!(Error::NotInitialised.is_caller_misuse());
		assert!(!Error::from(TransportError::ResponseTimeout).is_caller_misuse());
		assert!(!Error::from(ProtocolError::MissingAccessToken).is_caller_misuse());
	}

	#[test]
	fn unbuildable_requests_are_runtime_failures() {
		let http_err = oauth2::http::Request::builder()
			.uri("http://[::1")
			.body(())
			.expect_err("An unterminated IPv6 host should not parse as a URI.");
		let err = Error::from(TransportError::from(http_err));

		assert!(matches!(err, Error::Transport(TransportError::InvalidRequest { .. })));
		assert!(!err.is_caller_misuse());
		assert!(!err.is_timeout());
		assert!(StdError::source(&err).is_some());
	}

	#[test]
	fn timeouts_cover_both_phases() {
		assert!(Error::from(TransportError::RequestTimeout).is_timeout());
		assert!(Error::from(TransportError::ResponseTimeout).is_timeout());
		assert!(!Error::from(TransportError::from(std::io::Error::other("reset"))).is_timeout());
	}

	#[test]
	fn cloned_errors_keep_their_source() {
		let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "connection reset");
		let original = Error::from(TransportError::from(io));
		let cloned = original.clone();
		let source = StdError::source(&cloned)
			.expect("Cloned transport error should still expose the IO cause.");

		assert_eq!(source.to_string(), "connection reset");
		assert_eq!(original.to_string(), cloned.to_string());
	}

	#[test]
	fn auth_server_error_carries_body() {
		let err = Error::from(ProtocolError::AuthServer {
			status: 401,
			body: "{\"error\":\"invalid_client\"}".into(),
		});

		assert!(err.to_string().contains("401"));
		assert!(err.to_string().contains("invalid_client"));
	}
}
