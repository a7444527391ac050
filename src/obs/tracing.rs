// self
use crate::{
	_prelude::*,
	auth::CredentialKind,
	classify::{ApplicationPayload, ErrorRecord},
	dedup::EndpointKey,
	obs::FlowKind,
	request::Method,
};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedFlow<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedFlow<F> = F;

/// A span builder used by caller flows.
#[derive(Clone, Debug)]
pub struct FlowSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl FlowSpan {
	/// Creates a new span tagged with the provided flow kind + stage.
	pub fn new(kind: FlowKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("gateway_caller.flow", flow = kind.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedFlow<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Context captured for a failed call.
#[derive(Clone, Copy, Debug)]
pub struct FailureContext<'a> {
	/// Method of the failed call.
	pub method: Method,
	/// Resolved target URL, or the raw path when it does not resolve.
	pub url: &'a str,
	/// Instant the call started.
	pub requested_at: OffsetDateTime,
	/// Instant the failure was observed.
	pub responded_at: OffsetDateTime,
}

/// Emits the error event for a failed call.
pub fn log_dispatch_failure(context: FailureContext<'_>, record: &ErrorRecord) {
	#[cfg(feature = "tracing")]
	{
		tracing::error!(
			method = context.method.as_str(),
			url = context.url,
			requested_at = %context.requested_at,
			responded_at = %context.responded_at,
			status = %record.status,
			taxonomy = record.taxonomy.map(|code| code.as_str()),
			cause = record.cause.as_deref().map(tracing::field::display),
			"{}",
			record.message
		);
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (context, record);
	}
}

/// Emits a warning for a successful response that still carries an application notice.
pub fn log_application_notice(url: &str, payload: &ApplicationPayload) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(
			url,
			result_code = payload.result_code.as_deref(),
			message_type = payload.message_type.as_deref(),
			"Gateway reported an exception: {}",
			payload.message.as_deref().unwrap_or_default()
		);
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (url, payload);
	}
}

/// Notes that a refresh lost the race against another in-flight refresh.
pub fn log_refresh_race(kind: CredentialKind, joined: bool) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(kind = kind.as_str(), joined, "Refresh already in flight.");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (kind, joined);
	}
}

/// Emits the error event for a refresh that failed for any reason other than a race.
pub fn log_refresh_failure(kind: CredentialKind, url: &str, record: &ErrorRecord) {
	#[cfg(feature = "tracing")]
	{
		tracing::error!(
			kind = kind.as_str(),
			url,
			status = %record.status,
			taxonomy = record.taxonomy.map(|code| code.as_str()),
			cause = record.cause.as_deref().map(tracing::field::display),
			"Credential refresh failed: {}",
			record.message
		);
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (kind, url, record);
	}
}

/// Notes the requests aborted by `clear_pending`.
pub fn log_pending_cancelled(keys: &[EndpointKey]) {
	#[cfg(feature = "tracing")]
	{
		let keys = keys.iter().map(EndpointKey::as_str).collect::<Vec<_>>();

		tracing::debug!(count = keys.len(), ?keys, "Cancelled pending requests.");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = keys;
	}
}

/// Reports a store failure that could not be surfaced through an envelope.
pub fn log_store_failure(operation: &'static str, error: &dyn StdError) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(operation, error = %error, "Credential store operation failed.");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (operation, error);
	}
}
