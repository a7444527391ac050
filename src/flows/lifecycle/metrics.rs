// std
use std::sync::atomic::{AtomicU64, Ordering};
// self
use crate::auth::CredentialKind;

/// Refresh counters for both credential kinds.
#[derive(Debug, Default)]
pub struct RefreshMetrics {
	system: RefreshCounters,
	user: RefreshCounters,
}
impl RefreshMetrics {
	/// Counters for `kind`.
	pub fn for_kind(&self, kind: CredentialKind) -> &RefreshCounters {
		match kind {
			CredentialKind::System => &self.system,
			CredentialKind::User => &self.user,
		}
	}
}

/// Thread-safe counters for refresh attempts of one credential kind.
#[derive(Debug, Default)]
pub struct RefreshCounters {
	attempts: AtomicU64,
	success: AtomicU64,
	failure: AtomicU64,
	races: AtomicU64,
}
impl RefreshCounters {
	/// Returns the total number of refresh calls sent.
	pub fn attempts(&self) -> u64 {
		self.attempts.load(Ordering::Relaxed)
	}

	/// Returns the number of refreshes that persisted a new credential.
	pub fn successes(&self) -> u64 {
		self.success.load(Ordering::Relaxed)
	}

	/// Returns the number of failed refresh calls.
	pub fn failures(&self) -> u64 {
		self.failure.load(Ordering::Relaxed)
	}

	/// Returns the number of refreshes skipped because another one was in flight.
	pub fn races(&self) -> u64 {
		self.races.load(Ordering::Relaxed)
	}

	pub(crate) fn record_attempt(&self) {
		self.attempts.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_success(&self) {
		self.success.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failure.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_race(&self) {
		self.races.fetch_add(1, Ordering::Relaxed);
	}
}
