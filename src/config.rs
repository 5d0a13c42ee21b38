//! Client configuration: API base URL, request timeout, endpoint paths, and the login view.
//!
//! [`ClientConfig`] values are assembled through [`ClientConfigBuilder`] (or loaded from the
//! environment via [`ClientConfig::from_env`]) and validated once, so the coordinator can
//! assume every path is well-formed.

// std
use std::env;
// self
use crate::{_prelude::*, error::ConfigError};

/// Environment variable holding the API base URL.
pub const ENV_API_URL: &str = "TASKTRACK_API_URL";
/// Environment variable holding an optional request timeout in whole seconds.
pub const ENV_API_TIMEOUT_SECS: &str = "TASKTRACK_API_TIMEOUT_SECS";

/// Endpoint paths consumed by the client, relative to the base URL.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiEndpoints {
	/// Session refresh endpoint; exempt from refresh-and-retry.
	pub refresh: String,
	/// Server-side logout endpoint.
	pub logout: String,
	/// Credential login endpoint.
	pub login: String,
	/// Account registration endpoint.
	pub register: String,
	/// Current user profile endpoint.
	pub profile: String,
	/// Profile update endpoint.
	pub profile_update: String,
	/// Password change endpoint.
	pub password_change: String,
	/// Profile picture upload endpoint.
	pub profile_picture: String,
	/// Task collection endpoint.
	pub tasks: String,
	/// Completion history endpoint.
	pub task_history: String,
}
impl Default for ApiEndpoints {
	fn default() -> Self {
		Self {
			refresh: "/api/auth/refresh-token".into(),
			logout: "/api/auth/logout".into(),
			login: "/api/auth/login".into(),
			register: "/api/auth/register".into(),
			profile: "/api/users/me".into(),
			profile_update: "/api/users/profile".into(),
			password_change: "/api/users/profile/change-password".into(),
			profile_picture: "/api/users/profile/update-profile-picture".into(),
			tasks: "/api/tasks".into(),
			task_history: "/api/tasks/history".into(),
		}
	}
}
impl ApiEndpoints {
	fn named(&self) -> [(&'static str, &str); 10] {
		[
			("refresh", &self.refresh),
			("logout", &self.logout),
			("login", &self.login),
			("register", &self.register),
			("profile", &self.profile),
			("profile_update", &self.profile_update),
			("password_change", &self.password_change),
			("profile_picture", &self.profile_picture),
			("tasks", &self.tasks),
			("task_history", &self.task_history),
		]
	}
}

/// Immutable, validated client configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
	/// Base URL every relative request path is appended to.
	pub base_url: Url,
	/// Fixed per-call network timeout.
	pub timeout: StdDuration,
	/// Endpoint paths used by the client.
	pub endpoints: ApiEndpoints,
	/// Location of the login view that forced logouts redirect to.
	pub login_view: String,
}
impl ClientConfig {
	/// Timeout applied when none is configured.
	pub const DEFAULT_TIMEOUT: StdDuration = StdDuration::from_secs(10);

	/// Creates a new builder for the provided base URL.
	pub fn builder(base_url: Url) -> ClientConfigBuilder {
		ClientConfigBuilder::new(base_url)
	}

	/// Loads configuration from [`ENV_API_URL`] and [`ENV_API_TIMEOUT_SECS`].
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|var| env::var(var).ok())
	}

	/// Loads configuration through an arbitrary variable lookup.
	pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&'static str) -> Option<String>,
	{
		let raw_url = lookup(ENV_API_URL)
			.filter(|value| !value.trim().is_empty())
			.ok_or(ConfigError::MissingEnv { var: ENV_API_URL })?;
		let base_url = Url::parse(raw_url.trim())
			.map_err(|source| ConfigError::InvalidBaseUrl { source })?;
		let mut builder = Self::builder(base_url);

		if let Some(raw) = lookup(ENV_API_TIMEOUT_SECS) {
			let secs = raw.trim().parse::<u64>().map_err(|_| ConfigError::InvalidEnv {
				var: ENV_API_TIMEOUT_SECS,
				value: raw.clone(),
			})?;

			builder = builder.timeout(StdDuration::from_secs(secs));
		}

		builder.build()
	}

	/// Resolves a request path into an absolute URL.
	///
	/// Absolute `http(s)` URLs are used unchanged. Relative paths are appended to the base
	/// URL's path (not RFC 3986 joined), keeping any `?query` suffix.
	pub fn url_for(&self, path: &str) -> Result<Url, ConfigError> {
		if let Ok(absolute) = Url::parse(path) {
			if matches!(absolute.scheme(), "http" | "https") {
				return Ok(absolute);
			}

			return Err(ConfigError::InvalidRequestPath { path: path.to_owned() });
		}

		let (path_part, query) = match path.split_once('?') {
			Some((p, q)) => (p, Some(q)),
			None => (path, None),
		};
		let mut url = self.base_url.clone();
		let base_path = url.path().trim_end_matches('/').to_owned();
		let joined = if path_part.starts_with('/') {
			format!("{base_path}{path_part}")
		} else {
			format!("{base_path}/{path_part}")
		};

		url.set_path(&joined);
		url.set_query(query.filter(|q| !q.is_empty()));
		url.set_fragment(None);

		Ok(url)
	}

	/// Returns `true` when `path` targets the refresh endpoint.
	pub fn is_refresh_path(&self, path: &str) -> bool {
		let path = path.split_once('?').map_or(path, |(p, _)| p);

		path.trim_end_matches('/').ends_with(self.endpoints.refresh.trim_end_matches('/'))
	}

	/// Returns `true` when `location` already points at the login view.
	pub fn is_login_view(&self, location: &str) -> bool {
		location.contains(self.login_view.as_str())
	}

	fn validate(&self) -> Result<(), ConfigError> {
		if !matches!(self.base_url.scheme(), "http" | "https") || self.base_url.cannot_be_a_base()
		{
			return Err(ConfigError::UnsupportedBaseUrl { url: self.base_url.to_string() });
		}
		if self.timeout.is_zero() {
			return Err(ConfigError::ZeroTimeout);
		}

		for (name, path) in self.endpoints.named() {
			validate_path(name, path)?;
		}

		validate_path("login_view", &self.login_view)
	}
}

/// Builder for [`ClientConfig`] values.
#[derive(Debug)]
pub struct ClientConfigBuilder {
	/// Base URL for every API call.
	pub base_url: Url,
	/// Per-call network timeout.
	pub timeout: StdDuration,
	/// Endpoint paths.
	pub endpoints: ApiEndpoints,
	/// Login view location.
	pub login_view: String,
}
impl ClientConfigBuilder {
	/// Creates a builder seeded with defaults for everything except the base URL.
	pub fn new(base_url: Url) -> Self {
		Self {
			base_url,
			timeout: ClientConfig::DEFAULT_TIMEOUT,
			endpoints: ApiEndpoints::default(),
			login_view: "/login".into(),
		}
	}

	/// Overrides the per-call timeout.
	pub fn timeout(mut self, timeout: StdDuration) -> Self {
		self.timeout = timeout;

		self
	}

	/// Overrides the endpoint paths.
	pub fn endpoints(mut self, endpoints: ApiEndpoints) -> Self {
		self.endpoints = endpoints;

		self
	}

	/// Overrides the login view location.
	pub fn login_view(mut self, view: impl Into<String>) -> Self {
		self.login_view = view.into();

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<ClientConfig, ConfigError> {
		let config = ClientConfig {
			base_url: self.base_url,
			timeout: self.timeout,
			endpoints: self.endpoints,
			login_view: self.login_view,
		};

		config.validate()?;

		Ok(config)
	}
}

fn validate_path(name: &'static str, path: &str) -> Result<(), ConfigError> {
	if path.starts_with('/') {
		Ok(())
	} else {
		Err(ConfigError::InvalidPath { name, path: path.to_owned() })
	}
}
