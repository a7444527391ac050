//! Injectable clock so renewal decisions can be tested without wall-clock waits.

// self
use crate::_prelude::*;

/// Source of the current instant for lifecycle decisions and request timestamps.
pub trait Clock
where
	Self: Send + Sync,
{
	/// Returns the current instant.
	fn now(&self) -> OffsetDateTime;
}

/// Wall clock backed by [`OffsetDateTime::now_utc`].
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;
impl Clock for SystemClock {
	fn now(&self) -> OffsetDateTime {
		OffsetDateTime::now_utc()
	}
}

/// Manually driven clock; clones share the same instant.
#[derive(Clone, Debug)]
pub struct ManualClock(Arc<Mutex<OffsetDateTime>>);
impl ManualClock {
	/// Creates a clock frozen at `start`.
	pub fn new(start: OffsetDateTime) -> Self {
		Self(Arc::new(Mutex::new(start)))
	}

	/// Moves the clock to `instant`.
	pub fn set(&self, instant: OffsetDateTime) {
		*self.0.lock() = instant;
	}

	/// Moves the clock forward by `delta`.
	pub fn advance(&self, delta: Duration) {
		*self.0.lock() += delta;
	}
}
impl Clock for ManualClock {
	fn now(&self) -> OffsetDateTime {
		*self.0.lock()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	#[test]
	fn manual_clock_clones_share_the_instant() {
		let clock = ManualClock::new(macros::datetime!(2025-01-01 00:00 UTC));
		let shared = clock.clone();

		shared.advance(Duration::minutes(30));

		assert_eq!(clock.now(), macros::datetime!(2025-01-01 00:30 UTC));

		clock.set(macros::datetime!(2030-06-01 12:00 UTC));

		assert_eq!(shared.now(), macros::datetime!(2030-06-01 12:00 UTC));
	}
}
