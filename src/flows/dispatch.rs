//! Request dispatch: lifecycle check, header assembly, guarded send, and envelope folding.

// self
use crate::{
	_prelude::*,
	classify::{self, ApplicationPayload, ErrorRecord},
	envelope::ResultEnvelope,
	flows::{Caller, common},
	http::{HttpTransport, OutboundRequest},
	obs::{self, FailureContext, FlowKind, FlowOutcome, FlowSpan},
	request::{Method, RequestSpec},
};

impl<T> Caller<T>
where
	T: ?Sized + HttpTransport,
{
	/// Sends `spec` and folds the outcome into an envelope.
	///
	/// Runs the credential lifecycle check first when `call_token_checker` is enabled.
	pub async fn dispatch(&self, spec: RequestSpec) -> ResultEnvelope {
		let check = self.config.call_token_checker;

		self.settle(FlowKind::Dispatch, "dispatch", &spec, self.execute(&spec, check)).await
	}

	/// Sends `spec` as a `GET`.
	pub async fn get(&self, spec: RequestSpec) -> ResultEnvelope {
		self.dispatch(spec.with_method(Method::Get)).await
	}

	/// Sends `spec` as a `POST`.
	pub async fn post(&self, spec: RequestSpec) -> ResultEnvelope {
		self.dispatch(spec.with_method(Method::Post)).await
	}

	/// Sends `spec` as a `PUT`.
	pub async fn put(&self, spec: RequestSpec) -> ResultEnvelope {
		self.dispatch(spec.with_method(Method::Put)).await
	}

	/// Sends `spec` as a `DELETE`.
	pub async fn delete(&self, spec: RequestSpec) -> ResultEnvelope {
		self.dispatch(spec.with_method(Method::Delete)).await
	}

	/// Drives `call` inside a flow span and turns its result into an envelope.
	///
	/// Failures are logged with their request context and, when the classification demands
	/// it, end the user session before the envelope is returned.
	pub(crate) async fn settle<F>(
		&self,
		flow: FlowKind,
		stage: &'static str,
		spec: &RequestSpec,
		call: F,
	) -> ResultEnvelope
	where
		F: Future<Output = Result<Value, ErrorRecord>>,
	{
		let span = FlowSpan::new(flow, stage);
		let requested_at = self.clock.now();

		obs::record_flow_outcome(flow, FlowOutcome::Attempt);

		match span.instrument(call).await {
			Ok(data) => {
				obs::record_flow_outcome(flow, FlowOutcome::Success);

				ResultEnvelope::success(data)
			},
			Err(record) => {
				let url = self
					.target_url(spec)
					.map_or_else(|_| spec.path.clone(), |url| url.to_string());
				let context = FailureContext {
					method: spec.method,
					url: &url,
					requested_at,
					responded_at: self.clock.now(),
				};

				obs::log_dispatch_failure(context, &record);

				if record.triggers_logout() {
					self.end_user_session().await;
				}

				obs::record_flow_outcome(flow, FlowOutcome::Failure);

				ResultEnvelope::failure(record)
			},
		}
	}

	pub(crate) async fn execute(&self, spec: &RequestSpec, check: bool) -> Result<Value, ErrorRecord> {
		if check {
			self.check_tokens(spec.credential).await?;
		}

		let request = self.assemble(spec).await?;
		let url = request.url.to_string();
		let response = self.send_guarded(request, spec.global).await.map_err(classify::classify)?;
		let data = classify::response_outcome(response)?;
		let payload = ApplicationPayload::from_body(&data);

		if payload.is_notice() {
			obs::log_application_notice(&url, &payload);
		}

		Ok(data)
	}

	/// Resolves the URL `spec` targets, including its query.
	pub(crate) fn target_url(&self, spec: &RequestSpec) -> Result<Url, ErrorRecord> {
		let base = spec.base_url.as_ref().unwrap_or(&self.config.default_base_url);

		common::resolve_url(base, &spec.path, &spec.query)
			.map_err(|e| ErrorRecord::invalid_request(format!("`{}` {e}", spec.path)))
	}

	async fn assemble(&self, spec: &RequestSpec) -> Result<OutboundRequest, ErrorRecord> {
		let names = &self.config.header_names;
		let url = self.target_url(spec)?;
		let mut headers = common::base_headers();

		common::merge_headers(&mut headers, &self.config.default_headers);
		common::merge_headers(&mut headers, &spec.headers);
		common::set_header(
			&mut headers,
			names.origin_time.as_str(),
			common::format_origin_time(self.clock.now())?,
		);

		if let Some(client_id) = &self.config.client_id {
			common::set_header(&mut headers, names.client_id.as_str(), client_id.as_str());
		}
		if let Some(kind) = spec.credential {
			let record = self.load_credential(kind).await?;

			if let Some(token) = &record.token {
				common::set_header(&mut headers, names.access_token.as_str(), token.expose());
				common::set_header(&mut headers, "Authorization", token.bearer());
			}
		}

		Ok(OutboundRequest {
			method: spec.method,
			url,
			headers,
			body: spec.payload.clone(),
			timeout: spec.timeout.unwrap_or_else(|| self.config.timeout()),
		})
	}
}
