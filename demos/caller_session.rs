//! Demonstrates one user session against a mocked gateway: log in, call a protected endpoint
//! with the renewed credentials, then log out.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use serde_json::json;
// self
use gateway_caller::{
	Caller,
	auth::CredentialKind,
	config::CallerConfig,
	request::RequestSpec,
	store::{CredentialStore, MemoryStore},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let system_refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/auth/system/refresh").header("client_id", "demo-portal");
			then.status(200).json_body(json!({ "access_token": "demo-system", "expires_in": 7_200 }));
		})
		.await;
	let login = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/auth/login");
			then.status(200).json_body(json!({
				"ResultCode": "00",
				"access_token": "demo-user",
				"refresh_token": "demo-refresh",
				"expires_in": 3_600,
			}));
		})
		.await;
	let orders = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/orders").header("authorization", "Bearer demo-user");
			then.status(200).json_body(json!({
				"ResultCode": "00",
				"MessageType": "01",
				"Data": [{ "id": 7, "item": "book" }],
			}));
		})
		.await;
	let config = CallerConfig::builder("DEMO", server.url("/api"))
		.client_id("demo-portal")
		.system_refresh_path("/auth/system/refresh")
		.user_refresh_path("/auth/user/refresh")
		.build()?;
	let store: Arc<dyn CredentialStore> = Arc::new(MemoryStore::default());
	let caller = Caller::new(config, store);
	let envelope = caller
		.login(
			CredentialKind::User,
			RequestSpec::new("/auth/login").with_payload(json!({ "account": "demo", "password": "pw" })),
		)
		.await;

	println!("Login finished with status {}.", envelope.status_code);

	let envelope = caller.get(RequestSpec::new("/orders").with_credential(CredentialKind::User)).await;

	println!("Orders: {}.", serde_json::to_string(&envelope)?);

	caller.logout().await?;

	let envelope = caller.get(RequestSpec::new("/orders").with_credential(CredentialKind::User)).await;

	println!("After logout: {} {}.", envelope.status_code, envelope.message);

	login.assert_async().await;
	system_refresh.assert_async().await;
	orders.assert_calls_async(1).await;

	Ok(())
}
