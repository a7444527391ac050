#![allow(dead_code)]

// std
use std::io::{Error as IoError, ErrorKind};
// crates.io
use time::macros;
// self
use gateway_caller::{
	_preludet::*,
	Caller,
	auth::{CredentialKind, CredentialRecord, TokenSecret},
	clock::ManualClock,
	config::{CallerConfig, CallerConfigBuilder},
	error::TransportError,
	http::{HttpTransport, OutboundRequest, TransportFuture, TransportResponse},
	store::{self, BucketKey, MemoryStore},
};

pub const BASE_URL: &str = "https://gateway.test/api";
pub const SYSTEM_REFRESH: &str = "/api/auth/system/refresh";
pub const USER_REFRESH: &str = "/api/auth/user/refresh";
pub const RENEWAL_PERIOD: Duration = Duration::seconds(1_800);

/// Scripted answer for one transport call.
#[derive(Clone, Debug)]
pub enum Reply {
	Respond { status: u16, body: Value, delay: StdDuration },
	Timeout,
	Network,
	Hang,
}
impl Reply {
	pub fn json(status: u16, body: Value) -> Self {
		Self::Respond { status, body, delay: StdDuration::ZERO }
	}

	pub fn delayed(self, by: StdDuration) -> Self {
		match self {
			Self::Respond { status, body, .. } => Self::Respond { status, body, delay: by },
			other => other,
		}
	}
}

/// In-process transport that answers from per-path queues and records every request.
///
/// Paths without a scripted reply answer `404`.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
	replies: Mutex<HashMap<String, VecDeque<Reply>>>,
	calls: Mutex<Vec<OutboundRequest>>,
}
impl ScriptedTransport {
	pub fn script(&self, path: &str, reply: Reply) -> &Self {
		self.replies.lock().entry(path.to_owned()).or_default().push_back(reply);

		self
	}

	pub fn calls(&self) -> Vec<OutboundRequest> {
		self.calls.lock().clone()
	}

	pub fn calls_to(&self, path: &str) -> Vec<OutboundRequest> {
		self.calls.lock().iter().filter(|call| call.url.path() == path).cloned().collect()
	}

	pub fn paths(&self) -> Vec<String> {
		self.calls.lock().iter().map(|call| call.url.path().to_owned()).collect()
	}
}
impl HttpTransport for ScriptedTransport {
	fn send(&self, request: OutboundRequest) -> TransportFuture<'_> {
		let reply =
			self.replies.lock().get_mut(request.url.path()).and_then(VecDeque::pop_front);

		self.calls.lock().push(request);

		Box::pin(async move {
			match reply {
				None => Ok(TransportResponse { status: 404, body: Value::Null }),
				Some(Reply::Respond { status, body, delay }) => {
					if !delay.is_zero() {
						tokio::time::sleep(delay).await;
					}

					Ok(TransportResponse { status, body })
				},
				Some(Reply::Timeout) => Err(TransportError::timeout(IoError::new(
					ErrorKind::TimedOut,
					"scripted deadline elapsed",
				))),
				Some(Reply::Network) => Err(TransportError::network(IoError::new(
					ErrorKind::ConnectionRefused,
					"scripted connection refused",
				))),
				Some(Reply::Hang) => std::future::pending().await,
			}
		})
	}
}

pub struct Harness {
	pub caller: Caller<ScriptedTransport>,
	pub transport: Arc<ScriptedTransport>,
	pub store: MemoryStore,
	pub clock: ManualClock,
}
impl Harness {
	pub fn new() -> Self {
		Self::with_config(config_builder())
	}

	pub fn with_config(builder: CallerConfigBuilder) -> Self {
		let config = builder.build().expect("Fixture configuration should build.");
		let transport = Arc::new(ScriptedTransport::default());
		let clock = ManualClock::new(start());
		let (caller, store) = build_test_caller(config, transport.clone());

		Self { caller: caller.with_clock(clock.clone()), transport, store, clock }
	}

	pub fn bucket(&self, kind: CredentialKind) -> BucketKey {
		self.caller.bucket(kind)
	}

	pub async fn seed(&self, kind: CredentialKind, record: CredentialRecord) {
		store::save_record(&self.store, &self.bucket(kind), &record)
			.await
			.expect("Seeding a credential should succeed.");
	}

	/// Seeds credentials that stay outside their renewal windows for an hour.
	pub async fn seed_fresh(&self) {
		self.seed(CredentialKind::System, issued("sys-1", Duration::ZERO, 7_200)).await;
		self.seed(
			CredentialKind::User,
			issued("user-1", Duration::ZERO, 7_200).with_refresh_token(Some(TokenSecret::new("refresh-1"))),
		)
		.await;
	}

	pub async fn credential(&self, kind: CredentialKind) -> CredentialRecord {
		self.caller.credential(kind).await.expect("Reading a credential should succeed.")
	}
}

pub fn config_builder() -> CallerConfigBuilder {
	CallerConfig::builder("PORTAL", BASE_URL)
		.client_id("web-portal")
		.system_refresh_path("/auth/system/refresh")
		.user_refresh_path("/auth/user/refresh")
}

pub fn start() -> OffsetDateTime {
	macros::datetime!(2025-06-01 12:00 UTC)
}

/// Record issued `offset` from [`start`] with a lifetime of `ttl` seconds.
pub fn issued(token: &str, offset: Duration, ttl: i64) -> CredentialRecord {
	CredentialRecord::issue(token, ttl, RENEWAL_PERIOD, start() + offset)
		.expect("Fixture lifetime should stay in range.")
}

pub fn token(record: &CredentialRecord) -> Option<&str> {
	record.token.as_ref().map(TokenSecret::expose)
}
