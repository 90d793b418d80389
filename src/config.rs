//! Broker configuration: raw initialise options and their validated form.
//!
//! [`BrokerOptions`] is what callers hand to
//! [`Broker::initialise`](crate::flows::Broker::initialise), either assembled in code or decoded
//! from a dynamic JSON value (e.g. a config file section). [`BrokerConfig`] is the validated
//! snapshot every token fetch reads. Each rejected field has its own [`ConfigError`] variant so
//! callers can branch on the exact problem.

// self
use crate::{_prelude::*, auth::ProgramName, error::ConfigError};

/// Placeholder substituted with the program name when building token URLs.
pub const PROGRAM_NAME_PLACEHOLDER: &str = "{programName}";
/// Token path appended to the base URL unless overridden.
pub const DEFAULT_TOKEN_PATH_TEMPLATE: &str = "{programName}/oauth/token";
/// Portion of each declared token lifetime that is never served from cache.
pub const DEFAULT_SAFETY_MARGIN: Duration = Duration::seconds(30);

/// Unvalidated initialise options.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct BrokerOptions {
	/// Authorization server base URL.
	pub base_url: Option<String>,
	/// OAuth 2.0 client identifier.
	pub client_id: Option<String>,
	/// OAuth 2.0 client secret.
	pub client_secret: Option<String>,
	/// Token path relative to `base_url`; must contain [`PROGRAM_NAME_PLACEHOLDER`].
	pub token_path_template: Option<String>,
	/// Safety margin subtracted from declared token lifetimes.
	pub safety_margin: Option<Duration>,
}
impl BrokerOptions {
	/// Creates empty options.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the authorization server base URL.
	pub fn base_url(mut self, value: impl Into<String>) -> Self {
		self.base_url = Some(value.into());

		self
	}

	/// Sets the client identifier.
	pub fn client_id(mut self, value: impl Into<String>) -> Self {
		self.client_id = Some(value.into());

		self
	}

	/// Sets the client secret.
	pub fn client_secret(mut self, value: impl Into<String>) -> Self {
		self.client_secret = Some(value.into());

		self
	}

	/// Overrides the token path template (defaults to [`DEFAULT_TOKEN_PATH_TEMPLATE`]).
	pub fn token_path_template(mut self, value: impl Into<String>) -> Self {
		self.token_path_template = Some(value.into());

		self
	}

	/// Overrides the safety margin (defaults to [`DEFAULT_SAFETY_MARGIN`]).
	pub fn safety_margin(mut self, margin: Duration) -> Self {
		self.safety_margin = Some(margin);

		self
	}

	/// Decodes options from a dynamic value using the camelCase keys `baseUrl`, `clientId`,
	/// `clientSecret`, `tokenPathTemplate`, and `safetyMarginSecs`.
	///
	/// Required fields are checked in declaration order (missing, then type, then blank) so the
	/// first problem reported is stable.
	pub fn from_value(value: &JsonValue) -> Result<Self, ConfigError> {
		let map = match value {
			JsonValue::Null => return Err(ConfigError::NoOptions),
			JsonValue::Object(map) => map,
			_ => return Err(ConfigError::OptionsNotAnObject),
		};
		let base_url = required_text(
			map.get("baseUrl"),
			ConfigError::BaseUrlMissing,
			ConfigError::BaseUrlNotAString,
			ConfigError::BaseUrlBlank,
		)?;
		let client_id = required_text(
			map.get("clientId"),
			ConfigError::ClientIdMissing,
			ConfigError::ClientIdNotAString,
			ConfigError::ClientIdBlank,
		)?;
		let client_secret = required_text(
			map.get("clientSecret"),
			ConfigError::ClientSecretMissing,
			ConfigError::ClientSecretNotAString,
			ConfigError::ClientSecretBlank,
		)?;
		let token_path_template = match map.get("tokenPathTemplate") {
			None | Some(JsonValue::Null) => None,
			Some(JsonValue::String(template)) => Some(template.clone()),
			Some(_) => return Err(ConfigError::TemplateNotAString),
		};
		let safety_margin = match map.get("safetyMarginSecs") {
			None | Some(JsonValue::Null) => None,
			Some(JsonValue::Number(secs)) => Some(
				secs.as_f64()
					.filter(|secs| secs.is_finite() && *secs >= 0.)
					.and_then(Duration::checked_seconds_f64)
					.ok_or(ConfigError::InvalidSafetyMargin)?,
			),
			Some(_) => return Err(ConfigError::InvalidSafetyMargin),
		};

		Ok(Self {
			base_url: Some(base_url),
			client_id: Some(client_id),
			client_secret: Some(client_secret),
			token_path_template,
			safety_margin,
		})
	}
}
impl TryFrom<&JsonValue> for BrokerOptions {
	type Error = ConfigError;

	fn try_from(value: &JsonValue) -> Result<Self, Self::Error> {
		Self::from_value(value)
	}
}
impl Debug for BrokerOptions {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("BrokerOptions")
			.field("base_url", &self.base_url)
			.field("client_id", &self.client_id)
			.field("client_secret_set", &self.client_secret.is_some())
			.field("token_path_template", &self.token_path_template)
			.field("safety_margin", &self.safety_margin)
			.finish()
	}
}

/// Validated configuration snapshot read by every token fetch.
#[derive(Clone, PartialEq, Eq)]
pub struct BrokerConfig {
	base_url: Url,
	client_id: String,
	client_secret: String,
	token_path_template: String,
	safety_margin: Duration,
}
impl BrokerConfig {
	/// Validates `options`, applying defaults for the optional fields.
	pub fn from_options(options: BrokerOptions) -> Result<Self, ConfigError> {
		let base_url = required_text(
			options.base_url.map(JsonValue::String).as_ref(),
			ConfigError::BaseUrlMissing,
			ConfigError::BaseUrlNotAString,
			ConfigError::BaseUrlBlank,
		)?;
		let client_id = required_text(
			options.client_id.map(JsonValue::String).as_ref(),
			ConfigError::ClientIdMissing,
			ConfigError::ClientIdNotAString,
			ConfigError::ClientIdBlank,
		)?;
		let client_secret = required_text(
			options.client_secret.map(JsonValue::String).as_ref(),
			ConfigError::ClientSecretMissing,
			ConfigError::ClientSecretNotAString,
			ConfigError::ClientSecretBlank,
		)?;
		let base_url = Url::parse(base_url.trim())
			.map_err(|source| ConfigError::InvalidBaseUrl { source })?;

		if base_url.cannot_be_a_base() {
			return Err(ConfigError::BaseUrlCannotBeABase { url: base_url.to_string() });
		}

		let token_path_template =
			options.token_path_template.unwrap_or_else(|| DEFAULT_TOKEN_PATH_TEMPLATE.into());

		if !token_path_template.contains(PROGRAM_NAME_PLACEHOLDER) {
			return Err(ConfigError::TemplateMissingPlaceholder { template: token_path_template });
		}

		let safety_margin = options.safety_margin.unwrap_or(DEFAULT_SAFETY_MARGIN);

		if safety_margin.is_negative() {
			return Err(ConfigError::InvalidSafetyMargin);
		}

		Ok(Self { base_url, client_id, client_secret, token_path_template, safety_margin })
	}

	/// Authorization server base URL.
	pub fn base_url(&self) -> &Url {
		&self.base_url
	}

	/// OAuth 2.0 client identifier.
	pub fn client_id(&self) -> &str {
		&self.client_id
	}

	/// OAuth 2.0 client secret. Callers must avoid logging this string.
	pub fn client_secret(&self) -> &str {
		&self.client_secret
	}

	/// Token path template relative to the base URL.
	pub fn token_path_template(&self) -> &str {
		&self.token_path_template
	}

	/// Safety margin subtracted from declared token lifetimes.
	pub fn safety_margin(&self) -> Duration {
		self.safety_margin
	}

	/// Joined `{base}/{template}` string with the placeholder left in place.
	pub fn token_url_template(&self) -> String {
		let mut base = self.base_url.clone();

		base.set_query(None);
		base.set_fragment(None);

		format!(
			"{}/{}",
			base.as_str().trim_end_matches('/'),
			self.token_path_template.trim_start_matches('/')
		)
	}

	/// Token endpoint for `program`; the name is percent-encoded as a path segment.
	pub fn token_url(&self, program: &ProgramName) -> Result<Url, ConfigError> {
		let mut url = self.base_url.clone();

		url.set_query(None);
		url.set_fragment(None);

		{
			let mut segments = url.path_segments_mut().map_err(|_| {
				ConfigError::BaseUrlCannotBeABase { url: self.base_url.to_string() }
			})?;

			segments.pop_if_empty();

			for segment in self.token_path_template.split('/').filter(|s| !s.is_empty()) {
				segments.push(&segment.replace(PROGRAM_NAME_PLACEHOLDER, program.as_str()));
			}
		}

		Ok(url)
	}
}
impl TryFrom<BrokerOptions> for BrokerConfig {
	type Error = ConfigError;

	fn try_from(options: BrokerOptions) -> Result<Self, Self::Error> {
		Self::from_options(options)
	}
}
impl Debug for BrokerConfig {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("BrokerConfig")
			.field("base_url", &self.base_url.as_str())
			.field("client_id", &self.client_id)
			.field("client_secret", &"<redacted>")
			.field("token_path_template", &self.token_path_template)
			.field("safety_margin", &self.safety_margin)
			.finish()
	}
}

fn required_text(
	value: Option<&JsonValue>,
	missing: ConfigError,
	not_a_string: ConfigError,
	blank: ConfigError,
) -> Result<String, ConfigError> {
	match value {
		None | Some(JsonValue::Null) => Err(missing),
		Some(JsonValue::String(text)) if text.trim().is_empty() => Err(blank),
		Some(JsonValue::String(text)) => Ok(text.clone()),
		Some(_) => Err(not_a_string),
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;

	fn valid_options() -> BrokerOptions {
		BrokerOptions::new()
			.base_url("http://localhost:3000/")
			.client_id("Aperitif")
			.client_secret("qwh3ejk12")
	}

	fn program(name: &str) -> ProgramName {
		ProgramName::new(name).expect("Program fixture should be valid.")
	}

	#[test]
	fn options_decoding_reports_each_problem_in_order() {
		let cases = [
			(json!(null), "NoOptions"),
			(json!("asd"), "OptionsNotAnObject"),
			(json!({}), "BaseUrlMissing"),
			(json!({ "baseUrl": {} }), "BaseUrlNotAString"),
			(json!({ "baseUrl": "    " }), "BaseUrlBlank"),
			(json!({ "baseUrl": "http://localhost:3000/" }), "ClientIdMissing"),
			(json!({ "baseUrl": "http://localhost:3000/", "clientId": {} }), "ClientIdNotAString"),
			(json!({ "baseUrl": "http://localhost:3000/", "clientId": "   " }), "ClientIdBlank"),
			(
				json!({ "baseUrl": "http://localhost:3000/", "clientId": "bob" }),
				"ClientSecretMissing",
			),
			(
				json!({ "baseUrl": "http://localhost:3000/", "clientId": "bob", "clientSecret": {} }),
				"ClientSecretNotAString",
			),
			(
				json!({ "baseUrl": "http://localhost:3000/", "clientId": "bob", "clientSecret": " " }),
				"ClientSecretBlank",
			),
		];

		for (value, expected) in cases {
			let err = BrokerOptions::from_value(&value)
				.expect_err("Invalid options should be rejected.");
			let label = format!("{err:?}");

			assert!(label.starts_with(expected), "{value} produced {label}, expected {expected}.");
		}
	}

	#[test]
	fn options_decoding_reads_optional_fields() {
		let options = BrokerOptions::from_value(&json!({
			"baseUrl": "http://localhost:3000/api/",
			"clientId": "Aperitif",
			"clientSecret": "qwh3ejk12",
			"tokenPathTemplate": "programs/{programName}/apps/token",
			"safetyMarginSecs": 45
		}))
		.expect("Complete options should decode.");

		assert_eq!(options.safety_margin, Some(Duration::seconds(45)));
		assert!(matches!(
			BrokerOptions::from_value(&json!({
				"baseUrl": "http://localhost:3000/",
				"clientId": "Aperitif",
				"clientSecret": "qwh3ejk12",
				"safetyMarginSecs": -1
			})),
			Err(ConfigError::InvalidSafetyMargin)
		));
		assert!(matches!(
			BrokerOptions::from_value(&json!({
				"baseUrl": "http://localhost:3000/",
				"clientId": "Aperitif",
				"clientSecret": "qwh3ejk12",
				"tokenPathTemplate": 7
			})),
			Err(ConfigError::TemplateNotAString)
		));
	}

	#[test]
	fn config_applies_defaults() {
		let config = BrokerConfig::from_options(valid_options()).expect("Options should validate.");

		assert_eq!(config.safety_margin(), DEFAULT_SAFETY_MARGIN);
		assert_eq!(config.token_path_template(), DEFAULT_TOKEN_PATH_TEMPLATE);
		assert_eq!(config.token_url_template(), "http://localhost:3000/{programName}/oauth/token");
	}

	#[test]
	fn config_rejects_bad_urls_and_templates() {
		assert!(matches!(
			BrokerConfig::from_options(valid_options().base_url("not a url")),
			Err(ConfigError::InvalidBaseUrl { .. })
		));
		assert!(matches!(
			BrokerConfig::from_options(valid_options().base_url("mailto:ops@example.com")),
			Err(ConfigError::BaseUrlCannotBeABase { .. })
		));
		assert!(matches!(
			BrokerConfig::from_options(valid_options().token_path_template("oauth/token")),
			Err(ConfigError::TemplateMissingPlaceholder { .. })
		));
		assert!(matches!(
			BrokerConfig::from_options(valid_options().safety_margin(Duration::seconds(-5))),
			Err(ConfigError::InvalidSafetyMargin)
		));
		assert!(matches!(
			BrokerConfig::from_options(valid_options().client_secret("")),
			Err(ConfigError::ClientSecretBlank)
		));
	}

	#[test]
	fn token_urls_substitute_and_encode_program() {
		let config = BrokerConfig::from_options(
			valid_options()
				.base_url("http://localhost:3000/api?debug=1")
				.token_path_template("/programs/{programName}/apps/token"),
		)
		.expect("Options should validate.");

		assert_eq!(
			config.token_url(&program("encentivize")).expect("URL should build.").as_str(),
			"http://localhost:3000/api/programs/encentivize/apps/token"
		);
		assert_eq!(
			config.token_url(&program("a b/c")).expect("URL should build.").as_str(),
			"http://localhost:3000/api/programs/a%20b%2Fc/apps/token"
		);
	}

	#[test]
	fn debug_output_redacts_secret() {
		let config = BrokerConfig::from_options(valid_options()).expect("Options should validate.");
		let rendered = format!("{config:?} {:?}", valid_options());

		assert!(!rendered.contains("qwh3ejk12"));
	}
}
