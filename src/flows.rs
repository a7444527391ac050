//! High-level request orchestration powered by the caller facade.

pub mod common;
pub mod dispatch;
pub mod lifecycle;
pub mod login;

pub use common::*;
pub use lifecycle::*;

// self
use crate::{
	_prelude::*,
	auth::{CredentialKind, CredentialRecord},
	clock::{Clock, SystemClock},
	config::CallerConfig,
	dedup::{EndpointKey, PendingPool},
	http::HttpTransport,
	obs,
	store::{self, BucketKey, CredentialStore},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

#[cfg(feature = "reqwest")]
/// Caller specialized for the crate's default reqwest transport.
pub type ReqwestCaller = Caller<ReqwestTransport>;

/// Coordinates gateway calls for one application session.
///
/// The caller owns the transport, the credential store, and the pending-request pool so each
/// flow can focus on its own logic (renewal decisions, header assembly, grant persistence).
/// Every public request operation resolves to a [`ResultEnvelope`](crate::ResultEnvelope);
/// none of them return an error.
pub struct Caller<T>
where
	T: ?Sized + HttpTransport,
{
	/// Transport used for every outbound call.
	pub http: Arc<T>,
	/// Store holding the system and user credential buckets.
	pub store: Arc<dyn CredentialStore>,
	/// Static configuration.
	pub config: CallerConfig,
	/// Time source for renewal decisions and request timestamps.
	pub clock: Arc<dyn Clock>,
	/// Shared counters for refresh outcomes.
	pub refresh_metrics: Arc<RefreshMetrics>,
	pending: Arc<PendingPool>,
	refresh_guards: Arc<RefreshGuards>,
}
impl<T> Caller<T>
where
	T: ?Sized + HttpTransport,
{
	/// Creates a caller that uses the provided transport.
	pub fn with_transport(
		config: CallerConfig,
		store: Arc<dyn CredentialStore>,
		transport: impl Into<Arc<T>>,
	) -> Self {
		Self {
			http: transport.into(),
			store,
			config,
			clock: Arc::new(SystemClock),
			refresh_metrics: Default::default(),
			pending: Default::default(),
			refresh_guards: Default::default(),
		}
	}

	/// Replaces the wall clock.
	pub fn with_clock(mut self, clock: impl 'static + Clock) -> Self {
		self.clock = Arc::new(clock);

		self
	}

	/// Bucket key for `kind`.
	pub fn bucket(&self, kind: CredentialKind) -> BucketKey {
		self.config.bucket(kind)
	}

	/// Reads the stored credential of `kind`.
	pub async fn credential(&self, kind: CredentialKind) -> Result<CredentialRecord> {
		Ok(store::load_record(self.store.as_ref(), &self.bucket(kind)).await?)
	}

	/// Clears the user bucket; the system credential is kept.
	pub async fn logout(&self) -> Result<()> {
		self.store.clear(&self.bucket(CredentialKind::User)).await?;

		Ok(())
	}

	/// Aborts every non-global in-flight request whose URL or path is not allow-listed.
	///
	/// Returns the aborted keys, or `None` when nothing was aborted. Aborted calls resolve
	/// with a `CANCELLED` envelope.
	pub fn clear_pending<S>(&self, allow_list: &[S]) -> Option<Vec<EndpointKey>>
	where
		S: AsRef<str>,
	{
		let aborted = self.pending.clear_pending(allow_list);

		if let Some(keys) = &aborted {
			obs::log_pending_cancelled(keys);
		}

		aborted
	}

	/// Keys of the requests currently in flight.
	pub fn pending_keys(&self) -> Vec<EndpointKey> {
		self.pending.keys()
	}

	pub(crate) async fn end_user_session(&self) {
		if let Err(e) = self.store.clear(&self.bucket(CredentialKind::User)).await {
			obs::log_store_failure("logout", &e);
		}
	}
}
#[cfg(feature = "reqwest")]
impl Caller<ReqwestTransport> {
	/// Creates a caller backed by a default reqwest client.
	pub fn new(config: CallerConfig, store: Arc<dyn CredentialStore>) -> Self {
		Self::with_transport(config, store, ReqwestTransport::default())
	}
}
impl<T> Clone for Caller<T>
where
	T: ?Sized + HttpTransport,
{
	fn clone(&self) -> Self {
		Self {
			http: self.http.clone(),
			store: self.store.clone(),
			config: self.config.clone(),
			clock: self.clock.clone(),
			refresh_metrics: self.refresh_metrics.clone(),
			pending: self.pending.clone(),
			refresh_guards: self.refresh_guards.clone(),
		}
	}
}
impl<T> Debug for Caller<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Caller")
			.field("auth_key_name", &self.config.auth_key_name)
			.field("default_base_url", &self.config.default_base_url.as_str())
			.field("client_id_set", &self.config.client_id.is_some())
			.field("pending", &self.pending.len())
			.finish()
	}
}
