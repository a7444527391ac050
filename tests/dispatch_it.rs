mod common;

// crates.io
use serde_json::json;
// self
use common::{Harness, Reply};
use gateway_caller::{
	_preludet::*,
	auth::CredentialKind,
	classify::{ResultStatus, TaxonomyCode},
	request::{Method, RequestSpec},
};

fn orders() -> RequestSpec {
	RequestSpec::new("/orders").with_credential(CredentialKind::User)
}

#[tokio::test]
async fn fresh_client_needs_login_without_transport_calls() {
	let harness = Harness::new();
	let envelope = harness.caller.get(orders()).await;

	assert_eq!(envelope.status_code, ResultStatus::UNAUTHORIZED);
	assert_eq!(envelope.taxonomy, Some(TaxonomyCode::NeedsLogin));
	assert_eq!(envelope.data, None);
	assert!(harness.transport.calls().is_empty());
}

#[tokio::test]
async fn valid_credentials_send_exactly_one_call() {
	let harness = Harness::new();
	let payload = json!({ "ResultCode": "00", "MessageType": "01", "Data": [1, 2] });

	harness.seed_fresh().await;
	harness.transport.script("/api/orders", Reply::json(200, payload.clone()));

	let envelope = harness.caller.get(orders().with_query("page", "2")).await;

	assert!(envelope.is_success());
	assert_eq!(envelope.status_code, ResultStatus::OK);
	assert_eq!(envelope.message, "");
	assert_eq!(envelope.data, Some(payload));

	let calls = harness.transport.calls();

	assert_eq!(calls.len(), 1);

	let call = &calls[0];

	assert_eq!(call.method, Method::Get);
	assert_eq!(call.url.as_str(), "https://gateway.test/api/orders?page=2");
	assert_eq!(call.header("Authorization"), Some("Bearer user-1"));
	assert_eq!(call.header("Access_Token"), Some("user-1"));
	assert_eq!(call.header("Client_Id"), Some("web-portal"));
	assert_eq!(call.header("X-Origin-Time"), Some("2025-06-01T12:00:00Z"));
	assert_eq!(call.header("Content-Type"), Some("application/json"));
	assert_eq!(call.header("Cache-Control"), Some("no-store, max-age=0"));
	assert_eq!(call.timeout, StdDuration::from_secs(15));
	assert!(harness.caller.pending_keys().is_empty());
}

#[tokio::test]
async fn headers_merge_defaults_then_per_call_values() {
	let harness = Harness::with_config(
		common::config_builder()
			.default_header("Accept-Language", "en-US")
			.default_header("X-Channel", "web"),
	);
	let other_base =
		Url::parse("https://files.gateway.test/v2").expect("Override base URL should parse.");

	harness.seed_fresh().await;
	harness.transport.script("/v2/upload", Reply::json(201, json!({ "ResultCode": "00" })));

	let envelope = harness
		.caller
		.put(
			RequestSpec::new("upload")
				.with_base_url(other_base)
				.with_header("x-channel", "kiosk")
				.with_payload(json!({ "name": "report.pdf" }))
				.with_timeout(StdDuration::from_secs(3)),
		)
		.await;

	assert!(envelope.is_success());

	let calls = harness.transport.calls();
	let call = &calls[0];

	assert_eq!(call.method, Method::Put);
	assert_eq!(call.url.as_str(), "https://files.gateway.test/v2/upload");
	assert_eq!(call.header("Accept-Language"), Some("en-US"));
	assert_eq!(call.header("X-Channel"), Some("kiosk"));
	assert_eq!(call.header("Authorization"), None);
	assert_eq!(call.body, Some(json!({ "name": "report.pdf" })));
	assert_eq!(call.timeout, StdDuration::from_secs(3));
}

#[tokio::test]
async fn identical_in_flight_requests_are_rejected_once() {
	let harness = Harness::new();

	harness.seed_fresh().await;
	harness.transport.script(
		"/api/orders",
		Reply::json(200, json!({ "ResultCode": "00" })).delayed(StdDuration::from_millis(50)),
	);

	let (first, second) = tokio::join!(
		harness.caller.get(orders()),
		harness.caller.post(orders().with_query("page", "2"))
	);
	let (winner, loser) = if first.is_success() { (first, second) } else { (second, first) };

	assert!(winner.is_success());
	assert_eq!(loser.status_code, ResultStatus::DUPLICATE_REQUEST);
	assert_eq!(loser.status_code, 400.901);
	assert_eq!(loser.taxonomy, Some(TaxonomyCode::DuplicateRequest));
	assert_eq!(harness.transport.calls().len(), 1);
	assert!(harness.caller.pending_keys().is_empty());
	assert!(token_is_kept(&harness).await);
}

#[tokio::test]
async fn clear_pending_cancels_in_flight_calls() {
	let harness = Harness::new();

	harness.seed_fresh().await;
	harness.transport.script("/api/reports", Reply::Hang);

	let (envelope, aborted) = tokio::join!(
		harness.caller.get(RequestSpec::new("/reports").with_query("year", "2025")),
		async {
			while harness.caller.pending_keys().is_empty() {
				tokio::task::yield_now().await;
			}

			harness.caller.clear_pending::<&str>(&[])
		}
	);
	let aborted = aborted.expect("The hanging request should be aborted.");

	assert_eq!(aborted.len(), 1);
	assert_eq!(aborted[0].as_str(), "https://gateway.test/api/reports");
	assert_eq!(envelope.status_code, ResultStatus::CANCELLED);
	assert_eq!(envelope.taxonomy, Some(TaxonomyCode::Cancelled));
	assert!(harness.caller.clear_pending::<&str>(&[]).is_none());
	assert!(harness.caller.pending_keys().is_empty());
	assert!(token_is_kept(&harness).await);
}

#[tokio::test]
async fn allow_listed_and_global_calls_survive_clear_pending() {
	let harness = Harness::new();

	harness.seed_fresh().await;
	harness.transport.script(
		"/api/ping",
		Reply::json(200, json!({ "ResultCode": "00" })).delayed(StdDuration::from_millis(30)),
	);
	harness.transport.script(
		"/api/notices",
		Reply::json(200, json!({ "ResultCode": "00" })).delayed(StdDuration::from_millis(30)),
	);

	let (ping, notices, aborted) = tokio::join!(
		harness.caller.get(RequestSpec::new("/ping").global()),
		harness.caller.get(RequestSpec::new("/notices")),
		async {
			while harness.caller.pending_keys().len() < 2 {
				tokio::task::yield_now().await;
			}

			harness.caller.clear_pending(&["/api/notices"])
		}
	);

	assert_eq!(aborted, None);
	assert!(ping.is_success());
	assert!(notices.is_success());
}

#[tokio::test]
async fn token_invalid_result_code_ends_the_user_session() {
	let harness = Harness::new();

	harness.seed_fresh().await;
	harness.transport.script(
		"/api/orders",
		Reply::json(200, json!({ "ResultCode": "03", "Message": "Token invalid", "MessageType": "02" })),
	);

	let envelope = harness.caller.get(orders()).await;

	assert_eq!(envelope.status_code, ResultStatus::with_sub(401, 3));
	assert_eq!(envelope.status_code, 401.3);
	assert_eq!(envelope.message, "Token invalid(401.3)");
	assert_eq!(envelope.data, None);
	assert_eq!(envelope.taxonomy, Some(TaxonomyCode::ApplicationError));
	assert_eq!(harness.credential(CredentialKind::User).await.token, None);
	assert!(harness.credential(CredentialKind::System).await.has_token());
}

#[tokio::test]
async fn expired_user_session_times_out_without_refresh() {
	let harness = Harness::new();

	harness.seed(CredentialKind::System, common::issued("sys-1", Duration::ZERO, 7_200)).await;
	harness
		.seed(CredentialKind::User, common::issued("user-1", Duration::seconds(-3_700), 3_600))
		.await;

	let envelope = harness.caller.get(RequestSpec::new("/public")).await;

	assert_eq!(envelope.status_code, ResultStatus::SESSION_TIMEOUT);
	assert_eq!(envelope.taxonomy, Some(TaxonomyCode::UserSessionTimeout));
	assert!(harness.transport.calls().is_empty());
	assert_eq!(harness.credential(CredentialKind::User).await.token, None);
}

#[tokio::test]
async fn http_failures_keep_the_raw_status() {
	let harness = Harness::new();

	harness.seed_fresh().await;
	harness.transport.script("/api/orders", Reply::json(500, json!("oops")));
	harness.transport.script("/api/missing", Reply::json(404, Value::Null));

	let envelope = harness.caller.get(orders()).await;

	assert_eq!(envelope.status_code, ResultStatus::http(500));
	assert_eq!(envelope.message, "Internal server error (500).");
	assert_eq!(envelope.taxonomy, None);
	assert!(token_is_kept(&harness).await);

	let envelope = harness.caller.delete(RequestSpec::new("/missing")).await;

	assert_eq!(envelope.status_code, ResultStatus::http(404));
	assert!(token_is_kept(&harness).await);
}

#[tokio::test]
async fn unauthorized_responses_end_the_user_session() {
	let harness = Harness::new();

	harness.seed_fresh().await;
	harness.transport.script("/api/orders", Reply::json(401, Value::Null));

	let envelope = harness.caller.get(orders()).await;

	assert_eq!(envelope.status_code, ResultStatus::UNAUTHORIZED);
	assert!(!token_is_kept(&harness).await);
}

#[tokio::test]
async fn transport_failures_are_classified() {
	let harness = Harness::new();

	harness.seed_fresh().await;
	harness.transport.script("/api/slow", Reply::Timeout);
	harness.transport.script("/api/down", Reply::Network);

	let timeout = harness.caller.get(RequestSpec::new("/slow")).await;
	let network = harness.caller.get(RequestSpec::new("/down")).await;

	assert_eq!(timeout.status_code, ResultStatus::TIMEOUT);
	assert_eq!(timeout.taxonomy, Some(TaxonomyCode::Timeout));
	assert_eq!(network.status_code, ResultStatus::NO_RESPONSE);
	assert_eq!(network.taxonomy, Some(TaxonomyCode::NetworkError));
	assert!(token_is_kept(&harness).await);
}

#[tokio::test]
async fn disabled_token_checker_skips_the_lifecycle() {
	let harness = Harness::with_config(common::config_builder().call_token_checker(false));

	harness.transport.script("/api/orders", Reply::json(200, json!({ "ResultCode": "00" })));

	let envelope = harness.caller.get(orders()).await;

	assert!(envelope.is_success());
	assert_eq!(harness.transport.paths(), vec!["/api/orders".to_owned()]);
	assert_eq!(harness.transport.calls()[0].header("Authorization"), None);
}

#[tokio::test]
async fn unparsable_targets_are_invalid_requests() {
	let harness = Harness::new();

	harness.seed_fresh().await;

	let envelope = harness.caller.get(RequestSpec::new("https://[broken")).await;

	assert_eq!(envelope.status_code, ResultStatus::INVALID_REQUEST);
	assert_eq!(envelope.taxonomy, Some(TaxonomyCode::InvalidRequest));
	assert!(harness.transport.calls().is_empty());
}

async fn token_is_kept(harness: &Harness) -> bool {
	harness.credential(CredentialKind::User).await.has_token()
}
