//! Dual-token API gateway caller: keep a system credential and a user credential fresh, reject
//! duplicate in-flight calls, and fold every transport or application failure into one result
//! envelope.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod classify;
pub mod clock;
pub mod config;
pub mod dedup;
pub mod envelope;
pub mod error;
pub mod flows;
pub mod http;
pub mod obs;
pub mod request;
pub mod store;
#[cfg(any(test, feature = "test"))]
#[doc(hidden)]
pub mod _preludet {
	//! Test-only prelude (enabled via `cfg(test)` or the `test` crate feature).

	pub use crate::_prelude::*;

	// self
	use crate::{
		config::CallerConfig,
		flows::Caller,
		http::HttpTransport,
		store::{CredentialStore, MemoryStore},
	};

	/// Constructs a [`Caller`] backed by a fresh [`MemoryStore`] and the provided transport.
	///
	/// The returned store shares its buckets with the caller, so tests can seed and inspect
	/// credentials directly.
	pub fn build_test_caller<T>(config: CallerConfig, transport: Arc<T>) -> (Caller<T>, MemoryStore)
	where
		T: HttpTransport,
	{
		let store_backend = MemoryStore::default();
		let store: Arc<dyn CredentialStore> = Arc::new(store_backend.clone());

		(Caller::with_transport(config, store, transport), store_backend)
	}

	/// Constructs a reqwest-backed [`Caller`] and its [`MemoryStore`] for HTTP-level tests.
	#[cfg(feature = "reqwest")]
	pub fn build_reqwest_test_caller(
		config: CallerConfig,
	) -> (Caller<crate::http::ReqwestTransport>, MemoryStore) {
		build_test_caller(config, Arc::new(crate::http::ReqwestTransport::default()))
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap, VecDeque},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
		time::Duration as StdDuration,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use serde_json::{Map, Value};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, gateway_caller as _, httpmock as _};

pub use classify::{ErrorRecord, ResultStatus, TaxonomyCode};
pub use envelope::ResultEnvelope;
pub use flows::Caller;
