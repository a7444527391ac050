//! Optional observability helpers for caller flows.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `gateway_caller.flow` with the `flow` and
//!   `stage` (call site) fields, plus the failure and notice events emitted by dispatch.
//! - Enable `metrics` to increment the `gateway_caller_flow_total` counter for every
//!   attempt/success/failure, labeled by `flow` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Flow kinds observed by the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// Main gateway request.
	Dispatch,
	/// Credential login.
	Login,
	/// System credential renewal.
	SystemRefresh,
	/// User credential renewal.
	UserRefresh,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::Dispatch => "dispatch",
			FlowKind::Login => "login",
			FlowKind::SystemRefresh => "system_refresh",
			FlowKind::UserRefresh => "user_refresh",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to a caller flow.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure folded into an envelope.
	Failure,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
