//! Pre-flight credential checks and refresh execution.
//!
//! [`plan_renewal`] decides, from both stored records and one instant, whether the call may
//! proceed and which credentials need renewal. [`Caller::refresh`] performs one renewal under
//! a per-kind singleflight guard; a refresh that loses the race either waits for the winner
//! or returns immediately, depending on `join_inflight_refresh`.

mod metrics;

pub use metrics::{RefreshCounters, RefreshMetrics};

// self
use crate::{
	_prelude::*,
	auth::{CredentialKind, CredentialRecord, CredentialStatus},
	classify::{self, ErrorRecord, RawFailure},
	flows::{Caller, common},
	http::{HttpTransport, OutboundRequest},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	request::Method,
};

/// Renewals required before a call may proceed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenewalPlan {
	/// The system credential is missing, expired, or inside its renewal window.
	pub refresh_system: bool,
	/// The user credential is inside its renewal window.
	pub refresh_user: bool,
}

/// Decides whether a call requiring `required` may proceed at `now`.
///
/// A missing user credential fails with `NEEDS_LOGIN` only when the call requires it; an
/// expired user credential fails with `USER_SESSION_TIMEOUT` whatever the call requires.
/// Neither failure schedules a refresh.
pub fn plan_renewal(
	required: Option<CredentialKind>,
	system: &CredentialRecord,
	user: &CredentialRecord,
	now: OffsetDateTime,
) -> Result<RenewalPlan, ErrorRecord> {
	let user_status = user.status_at(now);

	if required == Some(CredentialKind::User) && user_status == CredentialStatus::Absent {
		return Err(ErrorRecord::needs_login());
	}
	if user_status == CredentialStatus::Expired {
		return Err(ErrorRecord::user_session_timeout());
	}

	Ok(RenewalPlan {
		refresh_system: system.status_at(now) != CredentialStatus::Fresh,
		refresh_user: user_status == CredentialStatus::RenewalDue,
	})
}

/// Result of one refresh attempt.
#[derive(Clone, Debug, PartialEq)]
pub enum RefreshOutcome {
	/// A new credential was persisted.
	Refreshed(CredentialRecord),
	/// Another refresh of the same kind was in flight; not an error.
	DuplicateRace,
	/// The refresh failed.
	Failed(ErrorRecord),
}

enum RefreshStop {
	Race,
	Failed(ErrorRecord),
}
impl From<ErrorRecord> for RefreshStop {
	fn from(record: ErrorRecord) -> Self {
		Self::Failed(record)
	}
}

impl<T> Caller<T>
where
	T: ?Sized + HttpTransport,
{
	/// Runs the pre-flight check for a call requiring `required`.
	///
	/// Renews the system credential first, then the user credential. Refresh races are
	/// tolerated; any other refresh failure aborts the call.
	pub async fn check_tokens(&self, required: Option<CredentialKind>) -> Result<(), ErrorRecord> {
		let now = self.clock.now();
		let system = self.load_credential(CredentialKind::System).await?;
		let user = self.load_credential(CredentialKind::User).await?;
		let plan = plan_renewal(required, &system, &user, now)?;

		for (kind, due) in
			[(CredentialKind::System, plan.refresh_system), (CredentialKind::User, plan.refresh_user)]
		{
			if !due {
				continue;
			}
			if let RefreshOutcome::Failed(cause) = self.refresh(kind).await {
				return Err(ErrorRecord::refresh_failed(kind, cause));
			}
		}

		Ok(())
	}

	/// Renews the credential of `kind` unconditionally.
	pub async fn refresh(&self, kind: CredentialKind) -> RefreshOutcome {
		let flow = refresh_flow(kind);
		let counters = self.refresh_metrics.for_kind(kind);
		let guard = self.refresh_guards.for_kind(kind);
		let Some(_singleflight) = guard.try_lock() else {
			counters.record_race();
			obs::log_refresh_race(kind, self.config.join_inflight_refresh);

			if self.config.join_inflight_refresh {
				drop(guard.lock().await);
			}

			return RefreshOutcome::DuplicateRace;
		};
		let span = FlowSpan::new(flow, "refresh");

		counters.record_attempt();
		obs::record_flow_outcome(flow, FlowOutcome::Attempt);

		match span.instrument(self.refresh_locked(kind)).await {
			Ok(record) => {
				counters.record_success();
				obs::record_flow_outcome(flow, FlowOutcome::Success);

				RefreshOutcome::Refreshed(record)
			},
			Err(RefreshStop::Race) => {
				counters.record_race();
				obs::log_refresh_race(kind, false);

				RefreshOutcome::DuplicateRace
			},
			Err(RefreshStop::Failed(record)) => {
				let url = self
					.refresh_url(kind)
					.map_or_else(|_| self.config.refresh.path(kind).to_owned(), |url| url.to_string());

				counters.record_failure();
				obs::log_refresh_failure(kind, &url, &record);
				obs::record_flow_outcome(flow, FlowOutcome::Failure);

				RefreshOutcome::Failed(record)
			},
		}
	}

	async fn refresh_locked(&self, kind: CredentialKind) -> Result<CredentialRecord, RefreshStop> {
		let current = self.load_credential(kind).await?;
		let request = self.refresh_request(kind, &current, self.clock.now())?;
		let response = self.send_guarded(request, false).await.map_err(|failure| match failure {
			RawFailure::Duplicate { .. } => RefreshStop::Race,
			other => RefreshStop::Failed(classify::classify(other)),
		})?;
		let body = classify::response_outcome(response)?;
		let grant = common::TokenGrant::from_body(&body)?;
		let mut record = grant.into_record(self.config.renewal_period(), self.clock.now())?;

		match kind {
			CredentialKind::System => record.refresh_token = None,
			CredentialKind::User =>
				if record.refresh_token.is_none() {
					record.refresh_token = current.refresh_token;
				},
		}

		self.store_credential(kind, &record).await?;

		Ok(record)
	}

	/// Resolves the endpoint that renews credentials of `kind`.
	pub(crate) fn refresh_url(&self, kind: CredentialKind) -> Result<Url, ErrorRecord> {
		let path = self.config.refresh.path(kind);

		common::resolve_url(self.config.refresh_base_url(), path, &[])
			.map_err(|e| ErrorRecord::invalid_request(format!("`{path}` {e}")))
	}

	fn refresh_request(
		&self,
		kind: CredentialKind,
		current: &CredentialRecord,
		now: OffsetDateTime,
	) -> Result<OutboundRequest, ErrorRecord> {
		let names = &self.config.header_names;
		let url = self.refresh_url(kind)?;
		let mut headers = self.config.default_headers.clone();

		for (name, value) in common::BASE_HEADERS {
			common::set_header(&mut headers, name, value);
		}

		match kind {
			CredentialKind::System =>
				if let Some(client_id) = &self.config.client_id {
					common::set_header(&mut headers, names.client_id.as_str(), client_id.as_str());
				},
			CredentialKind::User => {
				let token = current.token.as_ref().ok_or_else(ErrorRecord::needs_login)?;

				common::set_header(&mut headers, names.access_token.as_str(), token.expose());
				common::set_header(&mut headers, "Authorization", token.bearer());

				if let Some(refresh_token) = &current.refresh_token {
					common::set_header(
						&mut headers,
						names.refresh_token.as_str(),
						refresh_token.expose(),
					);
				}
			},
		}

		common::set_header(&mut headers, names.origin_time.as_str(), common::format_origin_time(now)?);

		Ok(OutboundRequest {
			method: Method::Post,
			url,
			headers,
			body: None,
			timeout: self.config.refresh_timeout(),
		})
	}
}

fn refresh_flow(kind: CredentialKind) -> FlowKind {
	match kind {
		CredentialKind::System => FlowKind::SystemRefresh,
		CredentialKind::User => FlowKind::UserRefresh,
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;
	use crate::{
		_preludet::build_test_caller,
		classify::TaxonomyCode,
		config::CallerConfig,
		http::{TransportFuture, TransportResponse},
	};

	const PERIOD: Duration = Duration::seconds(1_800);

	fn now() -> OffsetDateTime {
		macros::datetime!(2025-06-01 12:00 UTC)
	}

	fn issued(offset: Duration, ttl: i64) -> CredentialRecord {
		CredentialRecord::issue("token", ttl, PERIOD, now() + offset)
			.expect("Fixture lifetime should stay in range.")
	}

	#[test]
	fn missing_user_credential_needs_login_only_when_required() {
		let system = issued(Duration::ZERO, 7_200);
		let absent = CredentialRecord::default();
		let err = plan_renewal(Some(CredentialKind::User), &system, &absent, now())
			.expect_err("A user call without a user credential should fail.");

		assert_eq!(err.taxonomy, Some(TaxonomyCode::NeedsLogin));
		assert_eq!(
			plan_renewal(Some(CredentialKind::System), &system, &absent, now()),
			Ok(RenewalPlan::default())
		);
		assert_eq!(plan_renewal(None, &system, &absent, now()), Ok(RenewalPlan::default()));
	}

	#[test]
	fn expired_user_credential_times_out_without_refresh() {
		let system = issued(Duration::ZERO, 7_200);
		let user = issued(Duration::seconds(-3_601), 3_600);
		let err = plan_renewal(None, &system, &user, now())
			.expect_err("An expired user credential should fail every call.");

		assert_eq!(err.taxonomy, Some(TaxonomyCode::UserSessionTimeout));
	}

	#[test]
	fn renewal_window_boundary_is_inclusive() {
		let system = issued(Duration::ZERO, 7_200);
		// Expires at now + 1800, so the window opens exactly at now.
		let user = issued(Duration::seconds(-1_800), 3_600);
		let plan = plan_renewal(Some(CredentialKind::User), &system, &user, now())
			.expect("A user credential inside its window should not fail.");

		assert_eq!(plan, RenewalPlan { refresh_system: false, refresh_user: true });

		let plan = plan_renewal(
			Some(CredentialKind::User),
			&system,
			&user,
			now() - Duration::seconds(1),
		)
		.expect("A user credential before its window should not fail.");

		assert!(!plan.refresh_user);
	}

	#[test]
	fn system_credential_renews_when_absent_due_or_expired() {
		let absent = CredentialRecord::default();
		let due = issued(Duration::ZERO, 600);
		let expired = issued(Duration::seconds(-7_200), 3_600);
		let fresh = issued(Duration::ZERO, 7_200);

		for (system, expected) in [(&absent, true), (&due, true), (&expired, true), (&fresh, false)] {
			let plan = plan_renewal(None, system, &absent, now())
				.expect("System credential state should never fail a call.");

			assert_eq!(plan.refresh_system, expected);
		}
	}

	#[derive(Debug)]
	struct NotFound;
	impl HttpTransport for NotFound {
		fn send(&self, _: OutboundRequest) -> TransportFuture<'_> {
			Box::pin(async { Ok(TransportResponse { status: 404, body: Value::Null }) })
		}
	}

	#[test]
	fn refresh_urls_resolve_against_the_refresh_base() {
		let config = CallerConfig::builder("PORTAL", "https://gateway.test/api")
			.refresh_base_url("https://auth.test/v1")
			.system_refresh_path("/system/refresh")
			.user_refresh_path("https://sso.test/user/refresh")
			.build()
			.expect("Fixture configuration should build.");
		let (caller, _) = build_test_caller(config, Arc::new(NotFound));
		let url = |kind| caller.refresh_url(kind).expect("Refresh paths should resolve.").to_string();

		assert_eq!(url(CredentialKind::System), "https://auth.test/v1/system/refresh");
		assert_eq!(url(CredentialKind::User), "https://sso.test/user/refresh");
	}
}
