//! Session-scoped in-memory [`CredentialStore`] implementation.

// self
use crate::{
	_prelude::*,
	store::{BucketKey, CredentialStore, StoreFuture},
};

type BucketMap = Arc<RwLock<HashMap<BucketKey, Map<String, Value>>>>;

/// Thread-safe store that keeps buckets for the lifetime of the process.
///
/// Clones share the same buckets, so one instance can back several callers that belong to
/// the same session.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(BucketMap);
impl MemoryStore {
	/// Returns a copy of a bucket's fields, if the bucket exists.
	pub fn snapshot(&self, bucket: &BucketKey) -> Option<Map<String, Value>> {
		self.0.read().get(bucket).cloned()
	}

	fn get_now(map: &BucketMap, bucket: &BucketKey, field: &str) -> Option<Value> {
		map.read().get(bucket).and_then(|fields| fields.get(field)).cloned()
	}

	fn set_now(map: &BucketMap, bucket: &BucketKey, field: &str, value: Value) {
		map.write().entry(bucket.clone()).or_default().insert(field.to_owned(), value);
	}

	fn delete_now(map: &BucketMap, bucket: &BucketKey, field: &str) {
		if let Some(fields) = map.write().get_mut(bucket) {
			fields.remove(field);
		}
	}
}
impl CredentialStore for MemoryStore {
	fn get<'a>(&'a self, bucket: &'a BucketKey, field: &'a str) -> StoreFuture<'a, Option<Value>> {
		Box::pin(async move { Ok(Self::get_now(&self.0, bucket, field)) })
	}

	fn set<'a>(
		&'a self,
		bucket: &'a BucketKey,
		field: &'a str,
		value: Value,
	) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			Self::set_now(&self.0, bucket, field, value);

			Ok(())
		})
	}

	fn delete<'a>(&'a self, bucket: &'a BucketKey, field: &'a str) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			Self::delete_now(&self.0, bucket, field);

			Ok(())
		})
	}

	fn clear<'a>(&'a self, bucket: &'a BucketKey) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			self.0.write().remove(bucket);

			Ok(())
		})
	}
}
