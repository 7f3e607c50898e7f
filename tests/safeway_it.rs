#![cfg(feature = "test")]

// crates.io
use httpmock::prelude::*;
use serde_json::{Value, json};
// self
use supermarket::{
	_preludet::*,
	clip::{ClipPipeline, ClipStats, RunMode},
	config::ConfigOption,
	error::{ClipRejection, ErrorCategory},
	promotion::PromotionSearchOptions,
	provider::{Registry, Supermarket, safeway},
	rate_limit::RateLimiter,
};

const LIST_PATH: &str = "/abs/pub/mobile/j4u/api/ecomgallery";
const CLIP_PATH: &str = "/abs/pub/mobile/j4u/api/offers/clip";

fn offer(clip_id: &str, offer_id: Value, status: &str, is_clippable: bool) -> Value {
	json!({
		"brand": "Acme",
		"clipId": clip_id,
		"extlOfferId": format!("ext-{clip_id}"),
		"description": format!("Offer {clip_id}"),
		"hierarchies": { "categories": ["Dairy"], "events": [] },
		"offerId": offer_id,
		"offerPgm": "PD",
		"status": status,
		"startDate": "1747157766952",
		"endDate": 1747762566952_i64,
		"deleted": false,
		"isClippable": is_clippable,
		"isDisplayable": true,
	})
}

fn build_provider(server: &MockServer, extra: impl IntoIterator<Item = ConfigOption>) -> Box<dyn Supermarket> {
	let registry = Registry::new();
	let mut options = mock_options(&server.base_url());

	options.extend(extra);
	safeway::register(&registry);

	registry
		.create(&CancellationToken::new(), safeway::NAME, options)
		.expect("Safeway provider should build against the mock server.")
}

fn pipeline(mode: RunMode, observer: Arc<RecordingObserver>) -> ClipPipeline {
	ClipPipeline::new(RateLimiter::disabled()).with_observer(observer).with_mode(mode)
}

async fn mock_token(server: &MockServer) -> httpmock::Mock<'_> {
	server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/token")
				.header("user-agent", "okhttp/4.12.0")
				.form_urlencoded_tuple("grant_type", "refresh_token")
				.form_urlencoded_tuple("refresh_token", "refresh-test")
				.form_urlencoded_tuple("client_id", "client-test")
				.form_urlencoded_tuple("scope", "openid profile offline_access partner");
			then.status(200).header("content-type", "application/json").json_body(json!({
				"access_token": "access-1",
				"refresh_token": "refresh-2",
				"token_type": "Bearer",
				"expires_in": 3600,
			}));
		})
		.await
}

async fn mock_gallery(server: &MockServer, coupons: Vec<Value>) -> httpmock::Mock<'_> {
	server
		.mock_async(|when, then| {
			when.method(GET)
				.path(LIST_PATH)
				.query_param("storeId", "1234")
				.query_param("offerPgm", "PD-CC")
				.header("authorization", "Bearer access-1");
			then.status(200)
				.header("content-type", "application/json")
				.json_body(json!({ "cc": coupons, "pd": null }));
		})
		.await
}

async fn mock_clip<'a>(server: &'a MockServer, offer_id: &str) -> httpmock::Mock<'a> {
	let body = json!({
		"items": [
			{ "clipType": "C", "itemId": offer_id, "itemType": "PD" },
			{ "clipType": "L", "itemId": offer_id, "itemType": "PD" },
		]
	});

	server
		.mock_async(|when, then| {
			when.method(POST)
				.path(CLIP_PATH)
				.query_param("storeId", "1234")
				.header("authorization", "Bearer access-1")
				.header("x-swy_api_key", "appandroid")
				.json_body(body);
			then.status(200).header("content-type", "application/json").json_body(json!({
				"items": [{ "clipType": "C", "itemId": offer_id, "itemType": "PD", "status": 1 }]
			}));
		})
		.await
}

#[tokio::test]
async fn clip_all_run_counts_each_bucket_and_clips_once() {
	let server = MockServer::start_async().await;
	let token = mock_token(&server).await;
	let gallery = mock_gallery(
		&server,
		vec![
			offer("already", json!("1001"), "C", true),
			offer("ignored", json!("1002"), "U", false),
			offer("eligible", json!("1003"), "U", true),
		],
	)
	.await;
	let clip = mock_clip(&server, "1003").await;
	let provider = build_provider(&server, []);
	let observer = Arc::new(RecordingObserver::default());
	let report = pipeline(RunMode::ClipAll, observer.clone())
		.run(&CancellationToken::new(), provider.as_ref(), &PromotionSearchOptions::default())
		.await
		.expect("Clip-all run should succeed.");
	let expected =
		ClipStats { already_clipped: 1, newly_clipped: 1, deleted: 0, ignored: 1, errors: 0 };

	assert_eq!(report.fetched, 3);
	assert_eq!(report.stats, expected);
	assert!(report.failures.is_empty());
	assert_eq!(*observer.stats.lock(), vec![expected]);
	assert_eq!(*observer.finished.lock(), vec![true]);

	// One token exchange serves the refresh, the listing, and the clip.
	token.assert_calls_async(1).await;
	gallery.assert_calls_async(1).await;
	clip.assert_calls_async(1).await;
}

#[tokio::test]
async fn refresh_failure_stops_before_any_listing() {
	let server = MockServer::start_async().await;
	let token = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(400).header("content-type", "application/json").json_body(json!({
				"error": "invalid_grant",
				"error_description": "refresh token expired",
			}));
		})
		.await;
	let gallery = mock_gallery(&server, Vec::new()).await;
	let provider = build_provider(&server, []);
	let observer = Arc::new(RecordingObserver::default());
	let err = pipeline(RunMode::ClipAll, observer.clone())
		.run(&CancellationToken::new(), provider.as_ref(), &PromotionSearchOptions::default())
		.await
		.expect_err("Rejected refresh should fail the run.");

	assert_eq!(err.category(), ErrorCategory::TokenRefresh);
	assert!(err.to_string().contains("invalid_grant"), "Unexpected error: {err}");
	assert_eq!(*observer.errors.lock(), vec![ErrorCategory::TokenRefresh]);
	assert_eq!(*observer.stats.lock(), vec![ClipStats::default()]);
	assert_eq!(*observer.finished.lock(), vec![false]);

	token.assert_calls_async(1).await;
	gallery.assert_calls_async(0).await;
}

#[tokio::test]
async fn missing_promo_code_is_counted_and_the_run_continues() {
	let server = MockServer::start_async().await;
	let _token = mock_token(&server).await;
	let _gallery = mock_gallery(
		&server,
		vec![offer("no-code", Value::Null, "U", true), offer("valid", json!("2002"), "U", true)],
	)
	.await;
	let clip = mock_clip(&server, "2002").await;
	let provider = build_provider(&server, []);
	let observer = Arc::new(RecordingObserver::default());
	let report = pipeline(RunMode::ClipAll, observer.clone())
		.run(&CancellationToken::new(), provider.as_ref(), &PromotionSearchOptions::default())
		.await
		.expect("Item failures should not fail the run.");

	assert_eq!(report.stats.errors, 1);
	assert_eq!(report.stats.newly_clipped, 1);
	assert_eq!(report.failures.len(), 1);
	assert!(matches!(
		&report.failures[0],
		Error::ClipItem { id, source }
			if id == "no-code"
				&& matches!(
					**source,
					Error::ClipRejected { reason: ClipRejection::MissingPromoCode, .. }
				)
	));
	assert_eq!(*observer.errors.lock(), vec![ErrorCategory::ClipDeal]);

	clip.assert_calls_async(1).await;
}

#[tokio::test]
async fn requests_carry_identity_and_bearer_headers() {
	let server = MockServer::start_async().await;
	let _token = mock_token(&server).await;
	let gallery = server
		.mock_async(|when, then| {
			when.method(GET)
				.path(LIST_PATH)
				.query_param("includeRedeemedBonusOffers", "y")
				.header("authorization", "Bearer access-1")
				.header("user-agent", "okhttp/4.12.0")
				.header("accept", "application/json")
				.header("platform", "android")
				.header("x-swy_version", "2.1")
				.header("x-swy_banner", "safeway")
				.header("storeid", "1234")
				.header("x-swy_api_key", "api-key-test")
				.header("appversion", "2025.1.0");
			then.status(200).header("content-type", "application/json").json_body(json!({}));
		})
		.await;
	// Wire logging is observational and must not change what is sent.
	let provider = build_provider(&server, [ConfigOption::Debug(true)]);
	let report = pipeline(RunMode::ListOnly, Arc::new(RecordingObserver::default()))
		.run(&CancellationToken::new(), provider.as_ref(), &PromotionSearchOptions::default())
		.await
		.expect("List-only run should succeed.");

	assert_eq!(report.fetched, 0);

	gallery.assert_calls_async(1).await;
}

#[tokio::test]
async fn listing_failures_are_fatal_and_categorized() {
	let server = MockServer::start_async().await;
	let _token = mock_token(&server).await;
	let gallery = server
		.mock_async(|when, then| {
			when.method(GET).path(LIST_PATH);
			then.status(503);
		})
		.await;
	let clip = mock_clip(&server, "1").await;
	let provider = build_provider(&server, []);
	let err = pipeline(RunMode::ClipAll, Arc::new(RecordingObserver::default()))
		.run(&CancellationToken::new(), provider.as_ref(), &PromotionSearchOptions::default())
		.await
		.expect_err("HTTP 503 should fail the run.");

	assert!(matches!(err, Error::Fetch { .. }));
	assert_eq!(err.category(), ErrorCategory::PromotionsFetch);

	gallery.assert_calls_async(1).await;
	clip.assert_calls_async(0).await;
}

#[tokio::test]
async fn malformed_listing_is_a_parse_failure() {
	let server = MockServer::start_async().await;
	let _token = mock_token(&server).await;
	let _gallery = server
		.mock_async(|when, then| {
			when.method(GET).path(LIST_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.json_body(json!({ "cc": [{ "clipId": 7 }] }));
		})
		.await;
	let provider = build_provider(&server, []);
	let err = pipeline(RunMode::ListOnly, Arc::new(RecordingObserver::default()))
		.run(&CancellationToken::new(), provider.as_ref(), &PromotionSearchOptions::default())
		.await
		.expect_err("Numeric clip ids should not decode.");

	assert_eq!(err.category(), ErrorCategory::PromotionsParse);
}

#[tokio::test]
async fn health_probe_needs_a_prior_refresh() {
	let server = MockServer::start_async().await;
	let token = mock_token(&server).await;
	let provider = build_provider(&server, []);
	let ctx = CancellationToken::new();
	let authenticator = provider.authenticator().expect("Safeway exposes an authenticator.");

	assert!(!authenticator.is_authenticated(&ctx).await.expect("Probe should not fail."));
	token.assert_calls_async(0).await;

	let access = authenticator.refresh_token(&ctx).await.expect("Refresh should succeed.");

	assert_eq!(access.access_token.expose(), "access-1");
	assert!(authenticator.is_authenticated(&ctx).await.expect("Probe should not fail."));

	// The cached token is still valid, so the probe does not exchange again.
	token.assert_calls_async(1).await;
}

#[tokio::test]
async fn unreachable_token_endpoint_fails_authentication() {
	let server = MockServer::start_async().await;
	let mut options = mock_options(&server.base_url());

	options.push(ConfigOption::TokenUrl(
		Url::parse("http://127.0.0.1:9/token").expect("Closed port URL should parse."),
	));

	let registry = Registry::new();

	safeway::register(&registry);

	let provider = registry
		.create(&CancellationToken::new(), safeway::NAME, options)
		.expect("Provider should build.");
	let err = provider
		.authenticator()
		.expect("Safeway exposes an authenticator.")
		.refresh_token(&CancellationToken::new())
		.await
		.expect_err("Closed ports should fail.");

	assert_eq!(err.category(), ErrorCategory::TokenRefresh);
}
