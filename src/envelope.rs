//! The single result shape returned by every public request operation.

// self
use crate::{
	_prelude::*,
	classify::{ErrorRecord, ResultStatus, TaxonomyCode},
};

/// Outcome of a gateway call.
///
/// Successful calls carry status `200`, an empty message, and the response payload.
/// Failures carry the classified status and message, `data: null`, and the taxonomy code
/// when one applies.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultEnvelope {
	/// `200` on success; the classified status otherwise.
	pub status_code: ResultStatus,
	/// Empty on success.
	pub message: String,
	/// Response payload on success; `None` (`null`) on failure.
	pub data: Option<Value>,
	/// Failure category, when one applies.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub taxonomy: Option<TaxonomyCode>,
}
impl ResultEnvelope {
	/// Wraps a successful payload.
	pub fn success(data: Value) -> Self {
		Self { status_code: ResultStatus::OK, message: String::new(), data: Some(data), taxonomy: None }
	}

	/// Wraps a classified failure.
	pub fn failure(record: ErrorRecord) -> Self {
		Self { status_code: record.status, message: record.message, data: None, taxonomy: record.taxonomy }
	}

	/// Returns `true` for successful calls.
	pub fn is_success(&self) -> bool {
		self.status_code == ResultStatus::OK && self.taxonomy.is_none() && self.message.is_empty()
	}
}
impl From<ErrorRecord> for ResultEnvelope {
	fn from(record: ErrorRecord) -> Self {
		Self::failure(record)
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;

	#[test]
	fn envelopes_serialize_with_camel_case_fields() {
		let success = ResultEnvelope::success(json!({ "Data": [1] }));

		assert!(success.is_success());
		assert_eq!(
			serde_json::to_value(&success).expect("Envelopes should serialize."),
			json!({ "statusCode": 200, "message": "", "data": { "Data": [1] } })
		);

		let failure = ResultEnvelope::failure(ErrorRecord::duplicate_request("https://gw/a"));

		assert!(!failure.is_success());
		assert_eq!(
			serde_json::to_value(&failure).expect("Envelopes should serialize."),
			json!({
				"statusCode": 400.901,
				"message": "Rejected a request identical to one still in flight: https://gw/a.",
				"data": null,
				"taxonomy": "DUPLICATE_REQUEST"
			})
		);
	}
}
