//! Single round trip to the token endpoint and classification of its answer.

// crates.io
use oauth2::{
	AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse,
	http::{
		Method, Request, StatusCode,
		header::{ACCEPT, CONTENT_TYPE},
	},
};
use url::form_urlencoded;
// self
use crate::{
	_prelude::*,
	auth::{ProgramName, ScopeKey, TokenSecret},
	config::BrokerConfig,
	error::{ProtocolError, TransportError},
	http::TokenHttpClient,
};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const JSON_ACCEPT: &str = "application/json";

/// Maps HTTP transport failures into broker [`Error`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] emitted by the transport into a broker error.
	///
	/// Connect-phase timeouts should become [`TransportError::RequestTimeout`] and response-phase
	/// timeouts [`TransportError::ResponseTimeout`].
	fn map_transport_error(&self, error: HttpClientError<E>) -> Error;
}

/// Default mapper for reqwest-backed transports.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
#[cfg(feature = "reqwest")]
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(&self, err: HttpClientError<ReqwestError>) -> Error {
		match err {
			HttpClientError::Reqwest(inner) => map_reqwest_error(*inner),
			HttpClientError::Http(inner) => TransportError::from(inner).into(),
			HttpClientError::Io(inner) => TransportError::from(inner).into(),
			HttpClientError::Other(message) =>
				TransportError::from(std::io::Error::other(message)).into(),
			_ => TransportError::from(std::io::Error::other(
				"HTTP client error occurred while calling the token endpoint.",
			))
			.into(),
		}
	}
}

#[cfg(feature = "reqwest")]
fn map_reqwest_error(err: ReqwestError) -> Error {
	if err.is_builder() {
		return TransportError::invalid_request(err).into();
	}
	if err.is_timeout() {
		return elapsed_timeout(err.is_connect()).into();
	}

	TransportError::network(err).into()
}

// reqwest flags an elapsed connect timeout as both a connect and a timeout error.
#[cfg(feature = "reqwest")]
fn elapsed_timeout(during_connect: bool) -> TransportError {
	if during_connect { TransportError::RequestTimeout } else { TransportError::ResponseTimeout }
}

/// Token issued by one successful round trip, before any caching decision.
#[derive(Clone, PartialEq, Eq)]
pub struct FetchedToken {
	/// Bearer secret returned by the authorization server.
	pub access_token: TokenSecret,
	/// Declared lifetime; `None` when absent, non-positive, or unparseable.
	pub expires_in: Option<Duration>,
	/// Instant the response was received.
	pub issued_at: OffsetDateTime,
}
impl Debug for FetchedToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("FetchedToken")
			.field("access_token", &"<redacted>")
			.field("expires_in", &self.expires_in)
			.field("issued_at", &self.issued_at)
			.finish()
	}
}

/// Performs client-credentials requests through a [`TokenHttpClient`].
pub struct TokenFetcher<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	http_client: Arc<C>,
	transport_mapper: Arc<M>,
}
impl<C, M> TokenFetcher<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a fetcher sharing the caller's transport and mapper.
	pub fn new(http_client: impl Into<Arc<C>>, transport_mapper: impl Into<Arc<M>>) -> Self {
		Self { http_client: http_client.into(), transport_mapper: transport_mapper.into() }
	}

	/// POSTs one client-credentials request for `program` and `scope` and classifies the answer.
	///
	/// Performs no caching and no retries.
	pub async fn fetch(
		&self,
		config: &BrokerConfig,
		program: &ProgramName,
		scope: &ScopeKey,
	) -> Result<FetchedToken> {
		let request = build_token_request(config, program, scope)?;
		let handle = self.http_client.handle();
		let response = handle
			.call(request)
			.await
			.map_err(|e| self.transport_mapper.map_transport_error(e))?;
		let issued_at = OffsetDateTime::now_utc();
		let (access_token, expires_in) = classify_response(&response)?;

		Ok(FetchedToken { access_token, expires_in, issued_at })
	}
}
impl<C, M> Clone for TokenFetcher<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn clone(&self) -> Self {
		Self {
			http_client: Arc::clone(&self.http_client),
			transport_mapper: Arc::clone(&self.transport_mapper),
		}
	}
}
impl<C, M> Debug for TokenFetcher<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("TokenFetcher(..)")
	}
}

/// Builds the form-encoded POST for `program` and `scope`.
pub fn build_token_request(
	config: &BrokerConfig,
	program: &ProgramName,
	scope: &ScopeKey,
) -> Result<HttpRequest> {
	let url = config.token_url(program)?;
	let mut form = form_urlencoded::Serializer::new(String::new());

	form.append_pair("grant_type", "client_credentials")
		.append_pair("client_id", config.client_id())
		.append_pair("client_secret", config.client_secret());

	if let Some(scope) = scope.request_scope() {
		form.append_pair("scope", &scope);
	}

	let request = Request::builder()
		.method(Method::POST)
		.uri(url.as_str())
		.header(CONTENT_TYPE, FORM_CONTENT_TYPE)
		.header(ACCEPT, JSON_ACCEPT)
		.body(form.finish().into_bytes())
		.map_err(TransportError::from)?;

	Ok(request)
}

#[derive(Deserialize)]
struct TokenBody {
	#[serde(default)]
	access_token: Option<String>,
	#[serde(default)]
	expires_in: Option<JsonValue>,
}

/// Classifies a token endpoint response into a secret and its declared lifetime.
pub fn classify_response(
	response: &HttpResponse,
) -> Result<(TokenSecret, Option<Duration>), ProtocolError> {
	let raw = response.body();

	if response.status() != StatusCode::OK {
		return Err(ProtocolError::AuthServer {
			status: response.status().as_u16(),
			body: String::from_utf8_lossy(raw).into_owned(),
		});
	}

	let mut de = serde_json::Deserializer::from_slice(raw);
	let body: TokenBody = serde_path_to_error::deserialize(&mut de).map_err(|source| {
		ProtocolError::MalformedResponse {
			body: String::from_utf8_lossy(raw).into_owned(),
			source: Arc::new(source),
		}
	})?;
	let access_token = body
		.access_token
		.filter(|token| !token.is_empty())
		.map(TokenSecret::new)
		.ok_or(ProtocolError::MissingAccessToken)?;

	Ok((access_token, body.expires_in.as_ref().and_then(declared_ttl)))
}

fn declared_ttl(value: &JsonValue) -> Option<Duration> {
	let secs = match value {
		JsonValue::Number(number) => number.as_f64(),
		JsonValue::String(text) => text.trim().parse::<f64>().ok(),
		_ => None,
	}?;

	if !secs.is_finite() || secs <= 0. {
		return None;
	}

	Duration::checked_seconds_f64(secs)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::config::BrokerOptions;

	fn response(status: u16, body: &str) -> HttpResponse {
		let mut response = HttpResponse::new(body.as_bytes().to_vec());

		*response.status_mut() =
			StatusCode::from_u16(status).expect("Status fixture should be valid.");

		response
	}

	#[test]
	fn success_yields_token_and_lifetime() {
		let (token, ttl) = classify_response(&response(
			200,
			"{\"access_token\":\"abc\",\"token_type\":\"bearer\",\"expires_in\":3600}",
		))
		.expect("Well-formed body should classify as a token.");

		assert_eq!(token.expose(), "abc");
		assert_eq!(ttl, Some(Duration::hours(1)));
	}

	#[test]
	fn lifetimes_accept_numeric_strings_and_ignore_nonsense() {
		for (raw, expected) in [
			("\"120\"", Some(Duration::minutes(2))),
			("1000000000000", Some(Duration::seconds(1_000_000_000_000))),
			("1e300", None),
			("0", None),
			("-5", None),
			("\"soon\"", None),
			("null", None),
			("{}", None),
		] {
			let body = format!("{{\"access_token\":\"abc\",\"expires_in\":{raw}}}");
			let (_, ttl) = classify_response(&response(200, &body))
				.expect("Lifetime variations should never fail classification.");

			assert_eq!(ttl, expected, "expires_in = {raw}");
		}
	}

	#[cfg(feature = "reqwest")]
	#[test]
	fn elapsed_timeouts_are_split_by_phase() {
		assert!(matches!(elapsed_timeout(true), TransportError::RequestTimeout));
		assert!(matches!(elapsed_timeout(false), TransportError::ResponseTimeout));
	}

	#[test]
	fn non_200_is_an_auth_server_error() {
		let err = classify_response(&response(401, "{\"error\":\"invalid_client\"}"))
			.expect_err("401 should be rejected.");

		assert!(matches!(
			err,
			ProtocolError::AuthServer { status: 401, ref body } if body.contains("invalid_client")
		));

		let err = classify_response(&response(201, "{\"access_token\":\"abc\"}"))
			.expect_err("Only 200 counts as success.");

		assert!(matches!(err, ProtocolError::AuthServer { status: 201, .. }));
	}

	#[test]
	fn malformed_bodies_keep_the_raw_text() {
		let err = classify_response(&response(200, "<html>oops</html>"))
			.expect_err("HTML should not parse as a token.");

		assert!(matches!(
			err,
			ProtocolError::MalformedResponse { ref body, .. } if body == "<html>oops</html>"
		));

		let err = classify_response(&response(200, "{\"access_token\":42}"))
			.expect_err("A numeric token should not parse.");
		let ProtocolError::MalformedResponse { source, .. } = &err else {
			panic!("Expected a malformed response error, got {err:?}.");
		};

		assert_eq!(source.path().to_string(), "access_token");
	}

	#[test]
	fn missing_or_empty_tokens_are_rejected() {
		for body in ["{}", "{\"access_token\":\"\"}", "{\"access_token\":null,\"expires_in\":60}"] {
			let err = classify_response(&response(200, body))
				.expect_err("Body without a token should be rejected.");

			assert!(matches!(err, ProtocolError::MissingAccessToken), "body = {body}");
		}
	}

	#[test]
	fn request_carries_form_fields_and_headers() {
		let config = BrokerConfig::from_options(
			BrokerOptions::new()
				.base_url("https://auth.example.com/api/")
				.client_id("Aperitif")
				.client_secret("qwh3ejk12"),
		)
		.expect("Options fixture should be valid.");
		let program = ProgramName::new("Encentivize").expect("Program fixture should be valid.");
		let request = build_token_request(&config, &program, &ScopeKey::derive("Write read"))
			.expect("Request should build.");
		let form = form_urlencoded::parse(request.body()).into_owned().collect::<HashMap<_, _>>();

		assert_eq!(request.method(), &Method::POST);
		assert_eq!(
			request.uri().to_string(),
			"https://auth.example.com/api/Encentivize/oauth/token"
		);
		assert_eq!(request.headers()[CONTENT_TYPE], FORM_CONTENT_TYPE);
		assert_eq!(request.headers()[ACCEPT], JSON_ACCEPT);
		assert_eq!(form["grant_type"], "client_credentials");
		assert_eq!(form["client_id"], "Aperitif");
		assert_eq!(form["client_secret"], "qwh3ejk12");
		assert_eq!(form["scope"], "read write");

		let request = build_token_request(&config, &program, &ScopeKey::default())
			.expect("Request should build.");

		assert!(!form_urlencoded::parse(request.body()).any(|(key, _)| key == "scope"));
	}
}
