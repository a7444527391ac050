//! Credential store contract and the built-in session-scoped store.

pub mod memory;

pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{CredentialKind, CredentialRecord},
};

/// Boxed future returned by [`CredentialStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Scoped key-value contract holding one named bucket per credential kind.
///
/// Buckets are addressed by [`BucketKey`]; each bucket maps field names to JSON values.
pub trait CredentialStore
where
	Self: Send + Sync,
{
	/// Reads one field of a bucket.
	fn get<'a>(&'a self, bucket: &'a BucketKey, field: &'a str) -> StoreFuture<'a, Option<Value>>;

	/// Writes one field of a bucket, creating the bucket on demand.
	fn set<'a>(&'a self, bucket: &'a BucketKey, field: &'a str, value: Value)
	-> StoreFuture<'a, ()>;

	/// Removes one field of a bucket.
	fn delete<'a>(&'a self, bucket: &'a BucketKey, field: &'a str) -> StoreFuture<'a, ()>;

	/// Removes the whole bucket.
	fn clear<'a>(&'a self, bucket: &'a BucketKey) -> StoreFuture<'a, ()>;
}

/// Error type produced by [`CredentialStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Stored values could not be encoded or decoded.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Name of a credential bucket, e.g. `PORTAL_SYSTEM`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BucketKey(String);
impl BucketKey {
	/// Builds the bucket key for `kind` under the caller's key name.
	pub fn new(auth_key_name: &str, kind: CredentialKind) -> Self {
		Self(format!("{auth_key_name}_{}", kind.bucket_suffix()))
	}

	/// Returns the raw bucket name.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}
impl Display for BucketKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}

/// Reads every record field from `bucket`; missing buckets yield an empty record.
pub async fn load_record(
	store: &dyn CredentialStore,
	bucket: &BucketKey,
) -> Result<CredentialRecord, StoreError> {
	let mut fields = Map::new();

	for field in CredentialRecord::FIELDS {
		if let Some(value) = store.get(bucket, field).await? {
			fields.insert(field.to_owned(), value);
		}
	}

	CredentialRecord::from_fields(fields).map_err(|e| StoreError::Serialization {
		message: format!("Bucket {bucket} holds an unreadable field `{}`: {}", e.path(), e.inner()),
	})
}

/// Writes every record field to `bucket`; absent values delete the field.
pub async fn save_record(
	store: &dyn CredentialStore,
	bucket: &BucketKey,
	record: &CredentialRecord,
) -> Result<(), StoreError> {
	let fields = record.to_fields().map_err(|e| StoreError::Serialization {
		message: format!("Failed to encode the record for bucket {bucket}: {e}"),
	})?;

	for (field, value) in fields {
		if value.is_null() {
			store.delete(bucket, &field).await?;
		} else {
			store.set(bucket, &field, value).await?;
		}
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;
	use crate::auth::TokenSecret;
	use std::error::Error as StdError;

	#[test]
	fn store_error_converts_into_crate_error_with_source() {
		let store_error = StoreError::Backend { message: "quota exceeded".into() };
		let error: Error = store_error.clone().into();

		assert!(matches!(error, Error::Storage(_)));
		assert!(error.to_string().contains("quota exceeded"));

		let source = StdError::source(&error)
			.expect("Crate error should expose the original store error as its source.");

		assert_eq!(source.to_string(), store_error.to_string());
	}

	#[test]
	fn bucket_keys_append_kind_suffix() {
		assert_eq!(BucketKey::new("PORTAL", CredentialKind::System).as_str(), "PORTAL_SYSTEM");
		assert_eq!(BucketKey::new("PORTAL", CredentialKind::User).as_str(), "PORTAL_USER");
	}

	#[tokio::test]
	async fn saving_an_absent_refresh_token_deletes_the_field() {
		let store = MemoryStore::default();
		let bucket = BucketKey::new("PORTAL", CredentialKind::User);
		let now = macros::datetime!(2025-01-01 00:00 UTC);
		let with_refresh = CredentialRecord::issue("a", 600, Duration::seconds(60), now)
			.expect("Fixture lifetime should stay in range.")
			.with_refresh_token(Some(TokenSecret::new("r")));

		save_record(&store, &bucket, &with_refresh).await.expect("Saving should succeed.");

		let without_refresh = CredentialRecord::issue("b", 600, Duration::seconds(60), now)
			.expect("Fixture lifetime should stay in range.");

		save_record(&store, &bucket, &without_refresh).await.expect("Saving should succeed.");

		assert_eq!(
			store.get(&bucket, "refresh_token").await.expect("Reading should succeed."),
			None
		);
		assert_eq!(
			load_record(&store, &bucket).await.expect("Loading should succeed."),
			without_refresh
		);
	}

	#[tokio::test]
	async fn unreadable_fields_surface_as_serialization_errors() {
		let store = MemoryStore::default();
		let bucket = BucketKey::new("PORTAL", CredentialKind::System);

		store
			.set(&bucket, "expires_in", Value::String("soon".into()))
			.await
			.expect("Writing a raw field should succeed.");

		let err = load_record(&store, &bucket)
			.await
			.expect_err("A string lifetime should not load as a record.");

		assert!(matches!(err, StoreError::Serialization { .. }));
		assert!(err.to_string().contains("expires_in"));
	}
}
