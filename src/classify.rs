//! Failure taxonomy and the mapping from raw failures to [`ErrorRecord`] values.
//!
//! Statuses are HTTP codes optionally refined by a sub-code (`440.2`, `400.901`). Gateway
//! application codes take precedence over the HTTP status, even on `2xx` responses; sub-codes
//! in the `.9xx` range are synthesized locally and never come from the gateway.

// self
use crate::{_prelude::*, auth::CredentialKind, error::TransportError, http::TransportResponse};

/// Category assigned to a failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaxonomyCode {
	/// The call needs a user credential and none is stored.
	NeedsLogin,
	/// The user credential has expired.
	UserSessionTimeout,
	/// Renewing the system credential failed.
	SystemRefreshFailed,
	/// Renewing the user credential failed.
	UserRefreshFailed,
	/// An identical request is already in flight.
	DuplicateRequest,
	/// The request was aborted through the pending pool.
	Cancelled,
	/// The per-call deadline elapsed.
	Timeout,
	/// The transport failed before a response arrived.
	NetworkError,
	/// The gateway answered with a failing application result code.
	ApplicationError,
	/// A transport failure that fits no other category.
	UnclassifiedTransportError,
	/// The request could not be assembled.
	InvalidRequest,
	/// The credential store failed.
	StorageFailure,
}
impl TaxonomyCode {
	/// Returns the stable upper-case label.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::NeedsLogin => "NEEDS_LOGIN",
			Self::UserSessionTimeout => "USER_SESSION_TIMEOUT",
			Self::SystemRefreshFailed => "SYSTEM_REFRESH_FAILED",
			Self::UserRefreshFailed => "USER_REFRESH_FAILED",
			Self::DuplicateRequest => "DUPLICATE_REQUEST",
			Self::Cancelled => "CANCELLED",
			Self::Timeout => "TIMEOUT",
			Self::NetworkError => "NETWORK_ERROR",
			Self::ApplicationError => "APPLICATION_ERROR",
			Self::UnclassifiedTransportError => "UNCLASSIFIED_TRANSPORT_ERROR",
			Self::InvalidRequest => "INVALID_REQUEST",
			Self::StorageFailure => "STORAGE_FAILURE",
		}
	}
}
impl Display for TaxonomyCode {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// HTTP status with an optional sub-code, rendered as `http.sub`.
///
/// Serializes as an integer when there is no sub-code and as a float otherwise, so
/// `400.901` reaches JSON consumers as the number they expect.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ResultStatus {
	/// HTTP part; `0` when no response was received.
	pub http: u16,
	/// Fractional refinement.
	pub sub: Option<u16>,
}
impl ResultStatus {
	/// `200`
	pub const OK: Self = Self::http(200);
	/// `401`
	pub const UNAUTHORIZED: Self = Self::http(401);
	/// `403`
	pub const FORBIDDEN: Self = Self::http(403);
	/// `408`
	pub const TIMEOUT: Self = Self::http(408);
	/// `440`
	pub const SESSION_TIMEOUT: Self = Self::http(440);
	/// `0`, used when no response was received.
	pub const NO_RESPONSE: Self = Self::http(0);
	/// `400.901`
	pub const DUPLICATE_REQUEST: Self = Self::with_sub(400, 901);
	/// `400.902`
	pub const CANCELLED: Self = Self::with_sub(400, 902);
	/// `400.903`
	pub const INVALID_REQUEST: Self = Self::with_sub(400, 903);
	/// `500.901`
	pub const STORAGE_FAILURE: Self = Self::with_sub(500, 901);
	/// `502.901`, a token grant body without a usable access token.
	pub const MALFORMED_GRANT: Self = Self::with_sub(502, 901);

	/// Status without a sub-code.
	pub const fn http(http: u16) -> Self {
		Self { http, sub: None }
	}

	/// Status refined by `sub`.
	pub const fn with_sub(http: u16, sub: u16) -> Self {
		Self { http, sub: Some(sub) }
	}

	/// Numeric value, e.g. `440.2`.
	pub fn as_f64(self) -> f64 {
		match self.sub {
			None => f64::from(self.http),
			Some(_) => self.to_string().parse().unwrap_or(f64::from(self.http)),
		}
	}
}
impl Display for ResultStatus {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self.sub {
			None => write!(f, "{}", self.http),
			Some(sub) => write!(f, "{}.{sub}", self.http),
		}
	}
}
impl Serialize for ResultStatus {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: serde::Serializer,
	{
		match self.sub {
			None => serializer.serialize_u16(self.http),
			Some(_) => serializer.serialize_f64(self.as_f64()),
		}
	}
}
impl PartialEq<f64> for ResultStatus {
	fn eq(&self, other: &f64) -> bool {
		self.as_f64() == *other
	}
}

/// Classified failure: status, human-readable message, and taxonomy.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ErrorRecord {
	/// Status reported in the envelope.
	pub status: ResultStatus,
	/// Short English message.
	pub message: String,
	/// Category; `None` for plain HTTP failures.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub taxonomy: Option<TaxonomyCode>,
	/// Underlying failure, kept for logs.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub cause: Option<Box<ErrorRecord>>,
}
impl ErrorRecord {
	/// Statuses that end the user session.
	pub const LOGOUT_STATUSES: [ResultStatus; 7] = [
		ResultStatus::UNAUTHORIZED,
		ResultStatus::with_sub(401, 3),
		ResultStatus::with_sub(401, 5),
		ResultStatus::FORBIDDEN,
		ResultStatus::with_sub(403, 6),
		ResultStatus::SESSION_TIMEOUT,
		ResultStatus::with_sub(440, 2),
	];
	/// Taxonomies that end the user session.
	pub const LOGOUT_TAXONOMIES: [TaxonomyCode; 4] = [
		TaxonomyCode::NeedsLogin,
		TaxonomyCode::UserSessionTimeout,
		TaxonomyCode::SystemRefreshFailed,
		TaxonomyCode::UserRefreshFailed,
	];

	/// Creates a record.
	pub fn new(
		status: ResultStatus,
		message: impl Into<String>,
		taxonomy: Option<TaxonomyCode>,
	) -> Self {
		Self { status, message: message.into(), taxonomy, cause: None }
	}

	/// A user credential is required and none is stored.
	pub fn needs_login() -> Self {
		Self::new(
			ResultStatus::UNAUTHORIZED,
			"You are not logged in or the session has timed out; please log in again (401).",
			Some(TaxonomyCode::NeedsLogin),
		)
	}

	/// The user credential has expired.
	pub fn user_session_timeout() -> Self {
		Self::new(
			ResultStatus::SESSION_TIMEOUT,
			"The session has timed out; please log in again (440).",
			Some(TaxonomyCode::UserSessionTimeout),
		)
	}

	/// Renewing `kind` failed because of `cause`.
	pub fn refresh_failed(kind: CredentialKind, cause: Self) -> Self {
		let (message, taxonomy) = match kind {
			CredentialKind::System => (
				"An unexpected error occurred while renewing the system session; please try again later.",
				TaxonomyCode::SystemRefreshFailed,
			),
			CredentialKind::User => (
				"An unexpected error occurred while renewing the user session; please try again later.",
				TaxonomyCode::UserRefreshFailed,
			),
		};

		Self::new(ResultStatus::SESSION_TIMEOUT, message, Some(taxonomy)).with_cause(cause)
	}

	/// An identical request to `key` is already in flight.
	pub fn duplicate_request(key: impl Display) -> Self {
		Self::new(
			ResultStatus::DUPLICATE_REQUEST,
			format!("Rejected a request identical to one still in flight: {key}."),
			Some(TaxonomyCode::DuplicateRequest),
		)
	}

	/// The request to `key` was aborted through the pending pool.
	pub fn cancelled(key: impl Display) -> Self {
		Self::new(
			ResultStatus::CANCELLED,
			format!("The request to {key} was cancelled."),
			Some(TaxonomyCode::Cancelled),
		)
	}

	/// The request could not be assembled.
	pub fn invalid_request(detail: impl Display) -> Self {
		Self::new(
			ResultStatus::INVALID_REQUEST,
			format!("The request could not be assembled: {detail}."),
			Some(TaxonomyCode::InvalidRequest),
		)
	}

	/// The credential store failed.
	pub fn storage_failure(detail: impl Display) -> Self {
		Self::new(
			ResultStatus::STORAGE_FAILURE,
			format!("The credential store failed: {detail}"),
			Some(TaxonomyCode::StorageFailure),
		)
	}

	/// A token grant body could not be used.
	pub fn malformed_grant(detail: impl Display) -> Self {
		Self::new(
			ResultStatus::MALFORMED_GRANT,
			format!("The gateway returned an unusable token grant: {detail}."),
			Some(TaxonomyCode::ApplicationError),
		)
	}

	/// Attaches the underlying failure.
	pub fn with_cause(mut self, cause: Self) -> Self {
		self.cause = Some(Box::new(cause));

		self
	}

	/// Returns `true` when the user bucket must be cleared.
	pub fn triggers_logout(&self) -> bool {
		Self::LOGOUT_STATUSES.contains(&self.status)
			|| self.taxonomy.is_some_and(|code| Self::LOGOUT_TAXONOMIES.contains(&code))
	}

	/// Returns `true` for duplicate-request rejections.
	pub fn is_duplicate(&self) -> bool {
		self.taxonomy == Some(TaxonomyCode::DuplicateRequest)
	}
}
impl Display for ErrorRecord {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "{} {}", self.status, self.message)?;

		if let Some(taxonomy) = self.taxonomy {
			write!(f, " [{taxonomy}]")?;
		}

		Ok(())
	}
}

/// Failure observed by the guarded transport path before classification.
#[derive(Debug)]
pub enum RawFailure {
	/// The pending pool rejected the request as a duplicate.
	Duplicate {
		/// Endpoint key already in flight.
		key: String,
	},
	/// The pending pool aborted the request.
	Cancelled {
		/// Endpoint key of the aborted request.
		key: String,
	},
	/// No response was received.
	Transport(TransportError),
	/// The gateway responded with a failure.
	Response(TransportResponse),
}
impl From<TransportError> for RawFailure {
	fn from(e: TransportError) -> Self {
		Self::Transport(e)
	}
}

/// Classifies a raw failure.
pub fn classify(failure: RawFailure) -> ErrorRecord {
	match failure {
		RawFailure::Duplicate { key } => ErrorRecord::duplicate_request(key),
		RawFailure::Cancelled { key } => ErrorRecord::cancelled(key),
		RawFailure::Transport(e) => classify_transport(&e),
		RawFailure::Response(response) => classify_response(&response),
	}
}

fn classify_transport(e: &TransportError) -> ErrorRecord {
	match e {
		TransportError::Timeout { .. } => ErrorRecord::new(
			ResultStatus::TIMEOUT,
			"The request timed out (408).",
			Some(TaxonomyCode::Timeout),
		),
		TransportError::Network { .. } | TransportError::Io(_) => ErrorRecord::new(
			ResultStatus::NO_RESPONSE,
			format!("The gateway could not be reached: {e}"),
			Some(TaxonomyCode::NetworkError),
		),
		TransportError::Other { .. } => ErrorRecord::new(
			ResultStatus::NO_RESPONSE,
			e.to_string(),
			Some(TaxonomyCode::UnclassifiedTransportError),
		),
	}
}

fn classify_response(response: &TransportResponse) -> ErrorRecord {
	let payload = ApplicationPayload::from_body(&response.body);

	if let Some(status) = payload.failure_status() {
		let message = format!("{}({status})", payload.message.as_deref().unwrap_or_default());

		return ErrorRecord::new(status, message, Some(TaxonomyCode::ApplicationError));
	}

	let status = ResultStatus::http(response.status);

	ErrorRecord::new(status, default_message(response.status), None)
}

/// Splits a response into its payload or its classified failure.
///
/// `2xx` and `304` responses succeed unless the payload carries a failing application code.
pub fn response_outcome(response: TransportResponse) -> Result<Value, ErrorRecord> {
	if response.is_success()
		&& ApplicationPayload::from_body(&response.body).failure_status().is_none()
	{
		return Ok(response.body);
	}

	Err(classify_response(&response))
}

/// Gateway envelope fields read from a response body.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApplicationPayload {
	/// Application result code; `00` is success.
	#[serde(default)]
	pub result_code: Option<String>,
	/// Gateway message.
	#[serde(default)]
	pub message: Option<String>,
	/// Message type; `01` is a normal message.
	#[serde(default)]
	pub message_type: Option<String>,
}
impl ApplicationPayload {
	/// Reads the gateway fields; bodies of any other shape yield an empty payload.
	pub fn from_body(body: &Value) -> Self {
		Self::deserialize(body).unwrap_or_default()
	}

	/// Status for result codes that always fail the call.
	pub fn failure_status(&self) -> Option<ResultStatus> {
		let status = match self.result_code.as_deref()? {
			"02" => ResultStatus::with_sub(440, 2),
			"03" => ResultStatus::with_sub(401, 3),
			"04" => ResultStatus::with_sub(400, 4),
			"05" => ResultStatus::with_sub(401, 5),
			"06" => ResultStatus::with_sub(403, 6),
			_ => return None,
		};

		Some(status)
	}

	/// Returns `true` when a successful response still deserves a warning.
	pub fn is_notice(&self) -> bool {
		match self.result_code.as_deref() {
			None => false,
			Some("00") => self.message_type.as_deref().is_some_and(|kind| kind != "01"),
			Some(_) => true,
		}
	}
}

/// Default message for a raw HTTP status.
pub fn default_message(status: u16) -> String {
	let message = match status {
		0 => "The gateway response carried no status code.",
		200 => "The gateway reported an error with a success status.",
		400 => "Bad request (400).",
		401 => "You are not logged in or the session has timed out; please log in again (401).",
		403 => "Access denied (403).",
		404 => "Resource not found (404).",
		405 => "Method not allowed (405).",
		408 => "The request timed out (408).",
		440 => "The session has timed out; please log in again (440).",
		500 => "Internal server error (500).",
		501 => "Not implemented (501).",
		502 => "Bad gateway (502).",
		503 => "Service unavailable (503).",
		504 => "Gateway timed out (504).",
		505 => "HTTP version not supported (505).",
		other => return format!("Unexpected gateway status ({other}); please try again later."),
	};

	message.to_owned()
}
