//! Shared helpers for flow implementations (URL resolution, headers, grants, guarded sends).

// crates.io
use futures::future::{Abortable, Aborted};
use time::format_description::well_known::Rfc3339;
// self
use crate::{
	_prelude::*,
	auth::{CredentialKind, CredentialRecord, DEFAULT_EXPIRES_IN, TokenSecret},
	classify::{ErrorRecord, RawFailure},
	dedup::EndpointKey,
	flows::Caller,
	http::{HttpTransport, OutboundRequest, TransportResponse},
	store,
};

/// Headers sent on every call before defaults and per-call headers are merged.
pub const BASE_HEADERS: [(&str, &str); 2] =
	[("Content-Type", "application/json"), ("Cache-Control", "no-store, max-age=0")];

/// Token grant returned by login and refresh endpoints.
#[derive(Clone, Debug, Deserialize)]
pub struct TokenGrant {
	/// Newly issued access token.
	pub access_token: TokenSecret,
	/// Rotated refresh token, when the endpoint issues one.
	#[serde(default)]
	pub refresh_token: Option<TokenSecret>,
	/// Lifetime in seconds; defaults to 300 when omitted.
	#[serde(default)]
	pub expires_in: Option<i64>,
}
impl TokenGrant {
	/// Parses a grant body, naming the failing field on error.
	pub fn from_body(body: &Value) -> Result<Self, ErrorRecord> {
		serde_path_to_error::deserialize(body)
			.map_err(|e| ErrorRecord::malformed_grant(format!("`{}` {}", e.path(), e.inner())))
	}

	/// Converts the grant into a stored record issued at `now`.
	///
	/// Non-positive lifetimes and lifetimes whose expiry falls outside the representable
	/// date range make the grant unusable.
	pub fn into_record(
		self,
		renewal_period: Duration,
		now: OffsetDateTime,
	) -> Result<CredentialRecord, ErrorRecord> {
		let expires_in = self.expires_in.unwrap_or(DEFAULT_EXPIRES_IN);

		if expires_in <= 0 {
			return Err(ErrorRecord::malformed_grant(format!(
				"`expires_in` must be positive, got {expires_in}"
			)));
		}

		let record = CredentialRecord::issue(self.access_token.expose(), expires_in, renewal_period, now)
			.map_err(|e| ErrorRecord::malformed_grant(format!("`expires_in` {e}")))?;

		Ok(record.with_refresh_token(self.refresh_token))
	}
}

/// Singleflight guards, one per credential kind.
#[derive(Debug, Default)]
pub(crate) struct RefreshGuards {
	system: AsyncMutex<()>,
	user: AsyncMutex<()>,
}
impl RefreshGuards {
	pub(crate) fn for_kind(&self, kind: CredentialKind) -> &AsyncMutex<()> {
		match kind {
			CredentialKind::System => &self.system,
			CredentialKind::User => &self.user,
		}
	}
}

/// Resolves `path` against `base` and appends `query`.
///
/// Absolute `http(s)` URLs pass through untouched; otherwise the two parts are joined with
/// exactly one slash, so a base path prefix such as `/api` is kept.
pub fn resolve_url(
	base: &Url,
	path: &str,
	query: &[(String, String)],
) -> Result<Url, url::ParseError> {
	let mut url = if is_absolute(path) {
		Url::parse(path)?
	} else if path.is_empty() {
		base.clone()
	} else {
		Url::parse(&format!(
			"{}/{}",
			base.as_str().trim_end_matches('/'),
			path.trim_start_matches('/')
		))?
	};

	if !query.is_empty() {
		url.query_pairs_mut().extend_pairs(query);
	}

	Ok(url)
}

fn is_absolute(path: &str) -> bool {
	let lower = path.get(..8).unwrap_or(path).to_ascii_lowercase();

	lower.starts_with("http://") || lower.starts_with("https://")
}

/// Formats the origin timestamp header value.
pub fn format_origin_time(now: OffsetDateTime) -> Result<String, ErrorRecord> {
	now.format(&Rfc3339).map_err(|e| ErrorRecord::invalid_request(format!("origin time: {e}")))
}

/// Inserts a header, replacing any existing entry whose name differs only in case.
pub fn set_header(
	headers: &mut BTreeMap<String, String>,
	name: impl Into<String>,
	value: impl Into<String>,
) {
	let name = name.into();

	headers.retain(|existing, _| !existing.eq_ignore_ascii_case(&name));
	headers.insert(name, value.into());
}

/// Merges `extra` into `headers` with case-insensitive replacement.
pub fn merge_headers(headers: &mut BTreeMap<String, String>, extra: &BTreeMap<String, String>) {
	for (name, value) in extra {
		set_header(headers, name.as_str(), value.as_str());
	}
}

/// Returns the base header set.
pub fn base_headers() -> BTreeMap<String, String> {
	BASE_HEADERS.iter().map(|(name, value)| ((*name).to_owned(), (*value).to_owned())).collect()
}

impl<T> Caller<T>
where
	T: ?Sized + HttpTransport,
{
	/// Sends `request` through the pending pool.
	///
	/// Registration happens before the transport future is polled; the entry is released
	/// when the call settles, whatever the outcome.
	pub(crate) async fn send_guarded(
		&self,
		request: OutboundRequest,
		global: bool,
	) -> Result<TransportResponse, RawFailure> {
		let key = EndpointKey::from_url(&request.url);
		let (ticket, registration) = self
			.pending
			.register(key, global)
			.map_err(|e| RawFailure::Duplicate { key: e.key.to_string() })?;
		let outcome = Abortable::new(self.http.send(request), registration).await;
		let key = ticket.key().to_string();

		drop(ticket);

		match outcome {
			Ok(Ok(response)) => Ok(response),
			Ok(Err(e)) => Err(RawFailure::Transport(e)),
			Err(Aborted) => Err(RawFailure::Cancelled { key }),
		}
	}

	pub(crate) async fn load_credential(
		&self,
		kind: CredentialKind,
	) -> Result<CredentialRecord, ErrorRecord> {
		store::load_record(self.store.as_ref(), &self.bucket(kind))
			.await
			.map_err(ErrorRecord::storage_failure)
	}

	pub(crate) async fn store_credential(
		&self,
		kind: CredentialKind,
		record: &CredentialRecord,
	) -> Result<(), ErrorRecord> {
		store::save_record(self.store.as_ref(), &self.bucket(kind), record)
			.await
			.map_err(ErrorRecord::storage_failure)
	}
}
