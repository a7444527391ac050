//! Crate-level error types for configuration, storage, and transports.
//!
//! Public request operations never return these; they resolve to a
//! [`ResultEnvelope`](crate::envelope::ResultEnvelope) instead. These errors surface from
//! construction, configuration parsing, and direct store access.

// self
use crate::{_prelude::*, auth::CredentialKind};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical crate error exposed by non-envelope APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, deadline).
	#[error(transparent)]
	Transport(#[from] TransportError),
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Configuration document could not be parsed.
	#[error("Caller configuration is invalid at `{path}`.", path = .source.path())]
	Parse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// A configured URL cannot be parsed.
	#[error("The {field} URL is invalid.")]
	InvalidUrl {
		/// Configuration field holding the URL.
		field: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Bucket prefix is empty.
	#[error("The auth key name must not be empty.")]
	EmptyAuthKeyName,
	/// A refresh endpoint path is empty.
	#[error("The {kind} refresh path must not be empty.")]
	EmptyRefreshPath {
		/// Credential kind whose path is missing.
		kind: CredentialKind,
	},
	/// A timeout is zero.
	#[error("The {field} must be greater than zero.")]
	ZeroTimeout {
		/// Configuration field holding the timeout.
		field: &'static str,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures that produced no HTTP response.
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// The per-call deadline elapsed.
	#[error("Request timed out.")]
	Timeout {
		/// Transport-specific timeout error.
		#[source]
		source: BoxError,
	},
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the gateway.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the gateway.")]
	Io(#[from] std::io::Error),
	/// Failure that fits no other category (request building, body encoding).
	#[error("Transport failed: {message}.")]
	Other {
		/// Human-readable error payload.
		message: String,
	},
}
impl TransportError {
	/// Wraps a transport-specific timeout error.
	pub fn timeout(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Timeout { source: Box::new(src) }
	}

	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}

	/// Builds an uncategorized transport failure.
	pub fn other(message: impl Into<String>) -> Self {
		Self::Other { message: message.into() }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() {
			Self::timeout(e)
		} else if e.is_builder() {
			Self::other(e.to_string())
		} else {
			Self::network(e)
		}
	}
}
