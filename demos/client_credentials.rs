//! Demonstrates acquiring per-program client-credentials tokens with the default reqwest
//! transport, showing the cache miss, the cache hit, and a per-program cache reset.

// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use serde_json::json;
// self
use token_broker::flows::{ReqwestBroker, TokenRequest};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/encentivize/oauth/token")
				.form_urlencoded_tuple("scope", "email.read profile.read");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"demo-access\",\"token_type\":\"bearer\",\"expires_in\":900}",
			);
		})
		.await;
	let broker = ReqwestBroker::new()?;

	broker.initialise_from_value(&json!({
		"baseUrl": server.base_url(),
		"clientId": "demo-client",
		"clientSecret": "super-secret",
	}))?;

	println!("Token endpoint template: {:?}", broker.token_url_template());

	let request = TokenRequest::new("Encentivize").with_scope("profile.read Email.Read");

	for attempt in 1..=2 {
		let token = broker.acquire(request.clone()).await?;

		println!(
			"Attempt {attempt}: {} ({})",
			token.access_token.bearer_header(),
			token.cache_status
		);
	}

	broker.clear_token_cache_for_program("encentivize");

	let token = broker.acquire(request).await?;

	println!("After clearing the program cache: {}", token.cache_status);

	let metrics = broker.cache_metrics();

	println!(
		"Hits: {}, misses: {}, token endpoint calls: {}",
		metrics.hits(),
		metrics.misses(),
		metrics.fetches()
	);

	token_mock.assert_calls_async(2).await;

	Ok(())
}
