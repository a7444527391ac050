//! Stored credential records and their renewal-window arithmetic.

// self
use crate::{_prelude::*, auth::TokenSecret};

/// Lifetime in seconds applied when a grant response omits `expires_in`.
pub const DEFAULT_EXPIRES_IN: i64 = 300;

/// Position of a credential relative to its renewal window at a given instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CredentialStatus {
	/// No token is stored.
	Absent,
	/// Token is valid and outside its renewal window, or carries no expiry data.
	Fresh,
	/// The instant lies inside `[renewal_window_start, expires_at]`.
	RenewalDue,
	/// The instant is strictly after `expires_at`.
	Expired,
}

/// Raised when a token lifetime moves expiry outside the representable date range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ThisError)]
#[error("A token lifetime of {expires_in} seconds is out of range.")]
pub struct LifetimeOutOfRange {
	/// Lifetime in seconds as reported by the issuing endpoint.
	pub expires_in: i64,
}

/// One credential bucket's contents.
///
/// Timestamps are only meaningful while `token` is present.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
	/// Access token presented to the gateway.
	#[serde(default)]
	pub token: Option<TokenSecret>,
	/// Refresh token; only user credentials carry one.
	#[serde(default)]
	pub refresh_token: Option<TokenSecret>,
	/// Lifetime in seconds reported by the issuing endpoint.
	#[serde(default)]
	pub expires_in: Option<i64>,
	/// Instant from which proactive renewal is attempted.
	#[serde(default, with = "time::serde::timestamp::option")]
	pub renewal_window_start: Option<OffsetDateTime>,
	/// Hard expiry instant.
	#[serde(default, with = "time::serde::timestamp::option")]
	pub expires_at: Option<OffsetDateTime>,
}
impl CredentialRecord {
	/// Store field names, in persistence order.
	pub const FIELDS: [&'static str; 5] =
		["token", "refresh_token", "expires_in", "renewal_window_start", "expires_at"];

	/// Builds a record for a freshly issued token.
	///
	/// The renewal window opens `renewal_period` before expiry; when the lifetime is shorter
	/// than the period the window is already open at issuance. Lifetimes that push either
	/// instant outside the representable date range are rejected.
	pub fn issue(
		token: impl Into<String>,
		expires_in: i64,
		renewal_period: Duration,
		now: OffsetDateTime,
	) -> Result<Self, LifetimeOutOfRange> {
		let out_of_range = || LifetimeOutOfRange { expires_in };
		let expires_at =
			now.checked_add(Duration::seconds(expires_in)).ok_or_else(out_of_range)?;
		let renewal_window_start =
			expires_at.checked_sub(renewal_period).ok_or_else(out_of_range)?;

		Ok(Self {
			token: Some(TokenSecret::new(token)),
			refresh_token: None,
			expires_in: Some(expires_in),
			renewal_window_start: Some(renewal_window_start),
			expires_at: Some(expires_at),
		})
	}

	/// Attaches a refresh token.
	pub fn with_refresh_token(mut self, refresh_token: Option<TokenSecret>) -> Self {
		self.refresh_token = refresh_token;

		self
	}

	/// Returns `true` when an access token is stored.
	pub fn has_token(&self) -> bool {
		self.token.is_some()
	}

	/// Computes the renewal status at `now`.
	pub fn status_at(&self, now: OffsetDateTime) -> CredentialStatus {
		if self.token.is_none() {
			return CredentialStatus::Absent;
		}

		let Some(expires_at) = self.expires_at else {
			return CredentialStatus::Fresh;
		};

		if now > expires_at {
			return CredentialStatus::Expired;
		}

		match self.renewal_window_start {
			Some(start) if start <= now => CredentialStatus::RenewalDue,
			_ => CredentialStatus::Fresh,
		}
	}

	/// Returns `true` if the record has expired at `now`.
	pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
		matches!(self.status_at(now), CredentialStatus::Expired)
	}

	/// Returns `true` if `now` falls inside the renewal window.
	pub fn is_renewal_due_at(&self, now: OffsetDateTime) -> bool {
		matches!(self.status_at(now), CredentialStatus::RenewalDue)
	}

	/// Splits the record into store fields; absent values map to `null`.
	pub fn to_fields(&self) -> Result<Map<String, Value>, serde_json::Error> {
		match serde_json::to_value(self)? {
			Value::Object(fields) => Ok(fields),
			_ => Ok(Map::new()),
		}
	}

	/// Rebuilds a record from store fields, reporting the failing field path on error.
	pub fn from_fields(
		fields: Map<String, Value>,
	) -> Result<Self, serde_path_to_error::Error<serde_json::Error>> {
		serde_path_to_error::deserialize(Value::Object(fields))
	}
}
impl Debug for CredentialRecord {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CredentialRecord")
			.field("token", &self.token.as_ref().map(|_| "<redacted>"))
			.field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
			.field("expires_in", &self.expires_in)
			.field("renewal_window_start", &self.renewal_window_start)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}
