//! Static caller configuration owned by the integrating application.

// self
use crate::{_prelude::*, auth::CredentialKind, error::ConfigError, store::BucketKey};

const DEFAULT_RENEWAL_PERIOD_SECS: u32 = 1_800;
const DEFAULT_TIMEOUT_MS: u64 = 15_000;

/// Refresh endpoint locations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshEndpoints {
	/// Base URL for refresh calls; falls back to the default base URL.
	#[serde(default)]
	pub base_url: Option<Url>,
	/// Path of the system credential refresh endpoint.
	pub system_path: String,
	/// Path of the user credential refresh endpoint.
	pub user_path: String,
}
impl RefreshEndpoints {
	/// Returns the refresh path for `kind`.
	pub fn path(&self, kind: CredentialKind) -> &str {
		match kind {
			CredentialKind::System => &self.system_path,
			CredentialKind::User => &self.user_path,
		}
	}
}

/// Header names used on the wire; `Authorization` is fixed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeaderNames {
	/// Raw access-token header.
	pub access_token: String,
	/// Raw refresh-token header (user refresh only).
	pub refresh_token: String,
	/// Client-identifier header.
	pub client_id: String,
	/// Origin-timestamp header.
	pub origin_time: String,
}
impl Default for HeaderNames {
	fn default() -> Self {
		Self {
			access_token: "Access_Token".into(),
			refresh_token: "Refresh_Token".into(),
			client_id: "Client_Id".into(),
			origin_time: "X-Origin-Time".into(),
		}
	}
}

/// Caller-wide settings shared by every request.
///
/// Deserialize it from JSON with [`CallerConfig::from_json`] or assemble it with
/// [`CallerConfig::builder`]; both paths validate the result.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerConfig {
	/// Prefix for credential bucket names (`<name>_SYSTEM`, `<name>_USER`).
	pub auth_key_name: String,
	/// Base URL applied when a request carries no override.
	pub default_base_url: Url,
	/// Headers merged into every request.
	#[serde(default)]
	pub default_headers: BTreeMap<String, String>,
	/// Client identifier injected into requests and system refreshes.
	#[serde(default)]
	pub client_id: Option<String>,
	/// Refresh endpoint locations.
	pub refresh: RefreshEndpoints,
	/// Seconds before expiry at which renewal becomes eligible.
	#[serde(default = "default_renewal_period")]
	pub renewal_period_secs: u32,
	/// Runs the credential lifecycle check before guarded requests.
	#[serde(default = "default_true")]
	pub call_token_checker: bool,
	/// Wire header names.
	#[serde(default)]
	pub header_names: HeaderNames,
	/// Default per-call timeout in milliseconds.
	#[serde(default = "default_timeout_ms")]
	pub timeout_ms: u64,
	/// Timeout for refresh calls in milliseconds.
	#[serde(default = "default_timeout_ms")]
	pub refresh_timeout_ms: u64,
	/// Makes a refresh that lost a race wait for the in-flight refresh of the same kind.
	#[serde(default = "default_true")]
	pub join_inflight_refresh: bool,
}
impl CallerConfig {
	/// Returns a builder seeded with the bucket prefix and default base URL.
	pub fn builder(
		auth_key_name: impl Into<String>,
		default_base_url: impl Into<String>,
	) -> CallerConfigBuilder {
		CallerConfigBuilder::new(auth_key_name, default_base_url)
	}

	/// Parses and validates a JSON configuration document.
	pub fn from_json(bytes: &[u8]) -> Result<Self, ConfigError> {
		let mut de = serde_json::Deserializer::from_slice(bytes);
		let config: Self = serde_path_to_error::deserialize(&mut de)
			.map_err(|source| ConfigError::Parse { source })?;

		config.validate()?;

		Ok(config)
	}

	/// Checks invariants that serde cannot express.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.auth_key_name.trim().is_empty() {
			return Err(ConfigError::EmptyAuthKeyName);
		}

		for kind in CredentialKind::ALL {
			if self.refresh.path(kind).trim().is_empty() {
				return Err(ConfigError::EmptyRefreshPath { kind });
			}
		}

		if self.timeout_ms == 0 {
			return Err(ConfigError::ZeroTimeout { field: "timeout" });
		}
		if self.refresh_timeout_ms == 0 {
			return Err(ConfigError::ZeroTimeout { field: "refresh timeout" });
		}

		Ok(())
	}

	/// Bucket key for `kind`.
	pub fn bucket(&self, kind: CredentialKind) -> BucketKey {
		BucketKey::new(&self.auth_key_name, kind)
	}

	/// Renewal period as a duration.
	pub fn renewal_period(&self) -> Duration {
		Duration::seconds(i64::from(self.renewal_period_secs))
	}

	/// Default per-call timeout.
	pub fn timeout(&self) -> StdDuration {
		StdDuration::from_millis(self.timeout_ms)
	}

	/// Timeout for refresh calls.
	pub fn refresh_timeout(&self) -> StdDuration {
		StdDuration::from_millis(self.refresh_timeout_ms)
	}

	/// Base URL used by refresh calls.
	pub fn refresh_base_url(&self) -> &Url {
		self.refresh.base_url.as_ref().unwrap_or(&self.default_base_url)
	}
}

fn default_renewal_period() -> u32 {
	DEFAULT_RENEWAL_PERIOD_SECS
}

fn default_timeout_ms() -> u64 {
	DEFAULT_TIMEOUT_MS
}

fn default_true() -> bool {
	true
}

/// Builder for [`CallerConfig`] values.
#[derive(Clone, Debug)]
pub struct CallerConfigBuilder {
	auth_key_name: String,
	default_base_url: String,
	default_headers: BTreeMap<String, String>,
	client_id: Option<String>,
	refresh_base_url: Option<String>,
	system_refresh_path: String,
	user_refresh_path: String,
	renewal_period_secs: u32,
	call_token_checker: bool,
	header_names: HeaderNames,
	timeout: StdDuration,
	refresh_timeout: StdDuration,
	join_inflight_refresh: bool,
}
impl CallerConfigBuilder {
	fn new(auth_key_name: impl Into<String>, default_base_url: impl Into<String>) -> Self {
		Self {
			auth_key_name: auth_key_name.into(),
			default_base_url: default_base_url.into(),
			default_headers: BTreeMap::new(),
			client_id: None,
			refresh_base_url: None,
			system_refresh_path: String::new(),
			user_refresh_path: String::new(),
			renewal_period_secs: DEFAULT_RENEWAL_PERIOD_SECS,
			call_token_checker: true,
			header_names: HeaderNames::default(),
			timeout: StdDuration::from_millis(DEFAULT_TIMEOUT_MS),
			refresh_timeout: StdDuration::from_millis(DEFAULT_TIMEOUT_MS),
			join_inflight_refresh: true,
		}
	}

	/// Adds a header merged into every request.
	pub fn default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.default_headers.insert(name.into(), value.into());

		self
	}

	/// Sets the client identifier.
	pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
		self.client_id = Some(client_id.into());

		self
	}

	/// Sets a dedicated base URL for refresh calls.
	pub fn refresh_base_url(mut self, url: impl Into<String>) -> Self {
		self.refresh_base_url = Some(url.into());

		self
	}

	/// Sets the system refresh path.
	pub fn system_refresh_path(mut self, path: impl Into<String>) -> Self {
		self.system_refresh_path = path.into();

		self
	}

	/// Sets the user refresh path.
	pub fn user_refresh_path(mut self, path: impl Into<String>) -> Self {
		self.user_refresh_path = path.into();

		self
	}

	/// Sets the renewal period in seconds (defaults to 1800).
	pub fn renewal_period_secs(mut self, secs: u32) -> Self {
		self.renewal_period_secs = secs;

		self
	}

	/// Enables or disables the lifecycle check for non-login calls.
	pub fn call_token_checker(mut self, enabled: bool) -> Self {
		self.call_token_checker = enabled;

		self
	}

	/// Overrides the wire header names.
	pub fn header_names(mut self, names: HeaderNames) -> Self {
		self.header_names = names;

		self
	}

	/// Sets the default per-call timeout (defaults to 15 seconds).
	pub fn timeout(mut self, timeout: StdDuration) -> Self {
		self.timeout = timeout;

		self
	}

	/// Sets the refresh timeout (defaults to 15 seconds).
	pub fn refresh_timeout(mut self, timeout: StdDuration) -> Self {
		self.refresh_timeout = timeout;

		self
	}

	/// Chooses whether a refresh that lost a race waits for the winner.
	pub fn join_inflight_refresh(mut self, join: bool) -> Self {
		self.join_inflight_refresh = join;

		self
	}

	/// Parses URLs, validates, and produces a [`CallerConfig`].
	pub fn build(self) -> Result<CallerConfig, ConfigError> {
		let default_base_url = Url::parse(&self.default_base_url)
			.map_err(|source| ConfigError::InvalidUrl { field: "default base", source })?;
		let refresh_base_url = self
			.refresh_base_url
			.as_deref()
			.map(Url::parse)
			.transpose()
			.map_err(|source| ConfigError::InvalidUrl { field: "refresh base", source })?;
		let config = CallerConfig {
			auth_key_name: self.auth_key_name,
			default_base_url,
			default_headers: self.default_headers,
			client_id: self.client_id,
			refresh: RefreshEndpoints {
				base_url: refresh_base_url,
				system_path: self.system_refresh_path,
				user_path: self.user_refresh_path,
			},
			renewal_period_secs: self.renewal_period_secs,
			call_token_checker: self.call_token_checker,
			header_names: self.header_names,
			timeout_ms: duration_millis(self.timeout),
			refresh_timeout_ms: duration_millis(self.refresh_timeout),
			join_inflight_refresh: self.join_inflight_refresh,
		};

		config.validate()?;

		Ok(config)
	}
}

fn duration_millis(duration: StdDuration) -> u64 {
	u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
