//! Transport primitives for gateway calls.
//!
//! The caller depends on an HTTP stack only through [`HttpTransport`]. Any HTTP status is a
//! response; implementations return [`TransportError`] only when no response arrived. The
//! default [`ReqwestTransport`] lives behind the `reqwest` feature.

// std
#[cfg(feature = "reqwest")] use std::ops::Deref;
// self
use crate::{_prelude::*, error::TransportError, request::Method};

/// Boxed future returned by [`HttpTransport::send`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<TransportResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP stacks capable of executing gateway calls.
///
/// Implementations must be `Send + Sync + 'static` so one transport can be shared by every
/// caller through an `Arc`. Cancellation is handled by the caller: the returned future may be
/// dropped at any await point.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Executes `request` and resolves to the raw response.
	fn send(&self, request: OutboundRequest) -> TransportFuture<'_>;
}

/// Fully assembled request handed to the transport.
#[derive(Clone, PartialEq)]
pub struct OutboundRequest {
	/// HTTP method.
	pub method: Method,
	/// Target URL including the query string.
	pub url: Url,
	/// Final header set.
	pub headers: BTreeMap<String, String>,
	/// JSON body.
	pub body: Option<Value>,
	/// Deadline for the whole exchange.
	pub timeout: StdDuration,
}
impl OutboundRequest {
	/// Looks up a header value, ignoring ASCII case.
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers
			.iter()
			.find(|(key, _)| key.eq_ignore_ascii_case(name))
			.map(|(_, value)| value.as_str())
	}
}
impl Debug for OutboundRequest {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let headers = self
			.headers
			.iter()
			.map(|(name, value)| {
				let shown = if is_secret_header(name) { "<redacted>" } else { value.as_str() };

				(name.as_str(), shown)
			})
			.collect::<Vec<_>>();

		f.debug_struct("OutboundRequest")
			.field("method", &self.method)
			.field("url", &self.url.as_str())
			.field("headers", &headers)
			.field("body", &self.body)
			.field("timeout", &self.timeout)
			.finish()
	}
}

fn is_secret_header(name: &str) -> bool {
	let name = name.to_ascii_lowercase();

	name == "authorization" || name.contains("token")
}

/// Status and decoded body of a gateway response.
#[derive(Clone, Debug, PartialEq)]
pub struct TransportResponse {
	/// HTTP status code.
	pub status: u16,
	/// JSON body; `null` when empty, a JSON string when the body is not JSON.
	pub body: Value,
}
impl TransportResponse {
	/// Returns `true` for `2xx` and `304` statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status) || self.status == 304
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestTransport {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestTransport {
	fn send(&self, request: OutboundRequest) -> TransportFuture<'_> {
		Box::pin(execute(self.0.clone(), request))
	}
}

#[cfg(feature = "reqwest")]
impl From<Method> for reqwest::Method {
	fn from(method: Method) -> Self {
		match method {
			Method::Get => Self::GET,
			Method::Post => Self::POST,
			Method::Put => Self::PUT,
			Method::Delete => Self::DELETE,
		}
	}
}

#[cfg(feature = "reqwest")]
async fn execute(
	client: ReqwestClient,
	request: OutboundRequest,
) -> Result<TransportResponse, TransportError> {
	let mut builder = client.request(request.method.into(), request.url).timeout(request.timeout);

	for (name, value) in &request.headers {
		builder = builder.header(name, value);
	}

	if let Some(body) = &request.body {
		let bytes = serde_json::to_vec(body)
			.map_err(|e| TransportError::other(format!("request body could not be encoded: {e}")))?;

		builder = builder.body(bytes);
	}

	let response = builder.send().await?;
	let status = response.status().as_u16();
	let bytes = response.bytes().await?;

	Ok(TransportResponse { status, body: decode_body(&bytes) })
}

#[cfg(feature = "reqwest")]
fn decode_body(bytes: &[u8]) -> Value {
	if bytes.iter().all(u8::is_ascii_whitespace) {
		return Value::Null;
	}

	serde_json::from_slice(bytes)
		.unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}
