//! Per-call request specification.

// self
use crate::{_prelude::*, auth::CredentialKind};

/// HTTP methods recognized by the caller.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
	/// `GET`
	#[default]
	Get,
	/// `POST`
	Post,
	/// `PUT`
	Put,
	/// `DELETE`
	Delete,
}
impl Method {
	/// Returns the canonical upper-case method name.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Get => "GET",
			Self::Post => "POST",
			Self::Put => "PUT",
			Self::Delete => "DELETE",
		}
	}
}
impl Display for Method {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// One gateway call.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RequestSpec {
	/// Target path (or absolute URL) resolved against the base URL.
	pub path: String,
	/// HTTP method; the typed helpers on [`Caller`](crate::flows::Caller) override it.
	pub method: Method,
	/// JSON body.
	pub payload: Option<Value>,
	/// Query parameters appended to the resolved URL.
	pub query: Vec<(String, String)>,
	/// Credential attached to the call, if any.
	pub credential: Option<CredentialKind>,
	/// Per-call headers merged over the configured defaults.
	pub headers: BTreeMap<String, String>,
	/// Per-call timeout override.
	pub timeout: Option<StdDuration>,
	/// Per-call base URL override.
	pub base_url: Option<Url>,
	/// Exempts the call from duplicate rejection cleanup via `clear_pending`.
	pub global: bool,
}
impl RequestSpec {
	/// Creates a `GET` spec for `path` with no credential.
	pub fn new(path: impl Into<String>) -> Self {
		Self { path: path.into(), ..Default::default() }
	}

	/// Sets the method.
	pub fn with_method(mut self, method: Method) -> Self {
		self.method = method;

		self
	}

	/// Sets the JSON body.
	pub fn with_payload(mut self, payload: Value) -> Self {
		self.payload = Some(payload);

		self
	}

	/// Appends a query parameter.
	pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.query.push((name.into(), value.into()));

		self
	}

	/// Requires `kind` for the call.
	pub fn with_credential(mut self, kind: CredentialKind) -> Self {
		self.credential = Some(kind);

		self
	}

	/// Adds a per-call header.
	pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.insert(name.into(), value.into());

		self
	}

	/// Overrides the timeout.
	pub fn with_timeout(mut self, timeout: StdDuration) -> Self {
		self.timeout = Some(timeout);

		self
	}

	/// Overrides the base URL.
	pub fn with_base_url(mut self, base_url: Url) -> Self {
		self.base_url = Some(base_url);

		self
	}

	/// Marks the call as global so `clear_pending` never aborts it.
	pub fn global(mut self) -> Self {
		self.global = true;

		self
	}
}
