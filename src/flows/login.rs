//! Login flows that obtain the system or user credential.

// self
use crate::{
	_prelude::*,
	auth::CredentialKind,
	classify::ErrorRecord,
	envelope::ResultEnvelope,
	flows::{Caller, common::TokenGrant},
	http::HttpTransport,
	obs::FlowKind,
	request::{Method, RequestSpec},
};

impl<T> Caller<T>
where
	T: ?Sized + HttpTransport,
{
	/// Logs in for `kind` by posting `spec`, bypassing the lifecycle check.
	///
	/// On success the grant is persisted (`access_token`, `expires_in` defaulting to 300, and
	/// `refresh_token` for user logins) and the envelope carries the raw response payload.
	pub async fn login(&self, kind: CredentialKind, spec: RequestSpec) -> ResultEnvelope {
		let spec = spec.with_method(Method::Post);
		let call = async {
			let data = self.execute(&spec, false).await?;

			self.persist_grant(kind, &data).await?;

			Ok::<_, ErrorRecord>(data)
		};

		self.settle(FlowKind::Login, kind.as_str(), &spec, call).await
	}

	async fn persist_grant(&self, kind: CredentialKind, data: &Value) -> Result<(), ErrorRecord> {
		let mut record =
			TokenGrant::from_body(data)?.into_record(self.config.renewal_period(), self.clock.now())?;

		if kind == CredentialKind::System {
			record.refresh_token = None;
		}

		self.store_credential(kind, &record).await
	}
}
