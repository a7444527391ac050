//! Pending-request pool that rejects duplicate in-flight calls and aborts them on demand.

// std
use std::sync::atomic::{AtomicU64, Ordering};
// crates.io
use futures::future::{AbortHandle, AbortRegistration};
// self
use crate::_prelude::*;

/// Identity of an in-flight request: the resolved URL without query string or fragment.
///
/// Method and payload do not participate, so a `GET` and a `POST` to the same URL collide.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EndpointKey {
	url: String,
	path: String,
}
impl EndpointKey {
	/// Derives the key for `url`.
	pub fn from_url(url: &Url) -> Self {
		let mut bare = url.clone();

		bare.set_query(None);
		bare.set_fragment(None);

		Self { path: bare.path().to_owned(), url: bare.into() }
	}

	/// URL without query string.
	pub fn as_str(&self) -> &str {
		&self.url
	}

	/// URL path component.
	pub fn path(&self) -> &str {
		&self.path
	}

	fn matches(&self, pattern: &str) -> bool {
		self.url == pattern || self.path == pattern
	}
}
impl Display for EndpointKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.url)
	}
}

/// Raised when a request's key is already registered.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("A request to {key} is already in flight.")]
pub struct DuplicateRequest {
	/// Key of the in-flight request.
	pub key: EndpointKey,
}

#[derive(Debug)]
struct PendingEntry {
	id: u64,
	abort: AbortHandle,
	global: bool,
}

/// Registry of in-flight requests keyed by [`EndpointKey`].
///
/// The internal lock is never held across an await point; registration completes before the
/// guarded future is first polled.
#[derive(Debug, Default)]
pub struct PendingPool {
	entries: Mutex<HashMap<EndpointKey, PendingEntry>>,
	next_id: AtomicU64,
}
impl PendingPool {
	/// Registers `key`, returning a ticket that releases the entry on drop and the
	/// registration used to make the request future abortable.
	pub fn register(
		&self,
		key: EndpointKey,
		global: bool,
	) -> Result<(PendingTicket<'_>, AbortRegistration), DuplicateRequest> {
		let mut entries = self.entries.lock();

		if entries.contains_key(&key) {
			return Err(DuplicateRequest { key });
		}

		let id = self.next_id.fetch_add(1, Ordering::Relaxed);
		let (abort, registration) = AbortHandle::new_pair();

		entries.insert(key.clone(), PendingEntry { id, abort, global });

		Ok((PendingTicket { pool: self, key, id }, registration))
	}

	/// Aborts every non-global entry whose URL or path is not in `allow_list`.
	///
	/// Returns the aborted keys in sorted order, or `None` when nothing was aborted.
	pub fn clear_pending<S>(&self, allow_list: &[S]) -> Option<Vec<EndpointKey>>
	where
		S: AsRef<str>,
	{
		let mut entries = self.entries.lock();
		let mut doomed = entries
			.iter()
			.filter(|(key, entry)| {
				!entry.global && !allow_list.iter().any(|pattern| key.matches(pattern.as_ref()))
			})
			.map(|(key, _)| key.clone())
			.collect::<Vec<_>>();

		if doomed.is_empty() {
			return None;
		}

		doomed.sort();

		for key in &doomed {
			if let Some(entry) = entries.remove(key) {
				entry.abort.abort();
			}
		}

		Some(doomed)
	}

	/// Returns the registered keys in sorted order.
	pub fn keys(&self) -> Vec<EndpointKey> {
		let mut keys = self.entries.lock().keys().cloned().collect::<Vec<_>>();

		keys.sort();

		keys
	}

	/// Returns `true` when `key` is registered.
	pub fn contains(&self, key: &EndpointKey) -> bool {
		self.entries.lock().contains_key(key)
	}

	/// Number of registered entries.
	pub fn len(&self) -> usize {
		self.entries.lock().len()
	}

	/// Returns `true` when nothing is in flight.
	pub fn is_empty(&self) -> bool {
		self.entries.lock().is_empty()
	}

	fn release(&self, key: &EndpointKey, id: u64) {
		let mut entries = self.entries.lock();

		if entries.get(key).is_some_and(|entry| entry.id == id) {
			entries.remove(key);
		}
	}
}

/// Registration receipt; dropping it removes the entry unless it was already replaced.
#[derive(Debug)]
pub struct PendingTicket<'a> {
	pool: &'a PendingPool,
	key: EndpointKey,
	id: u64,
}
impl PendingTicket<'_> {
	/// Key this ticket holds.
	pub fn key(&self) -> &EndpointKey {
		&self.key
	}
}
impl Drop for PendingTicket<'_> {
	fn drop(&mut self) {
		self.pool.release(&self.key, self.id);
	}
}
