//! Provider configuration assembled from an ordered list of options.
//!
//! [`ConfigOption`] values are applied strictly left to right over [`Config::default`], so the
//! last option touching a field wins. The registry only assembles the value; domain-required
//! fields are checked by the caller through [`Config::validate_required`] before a provider is
//! created.

// std
use std::time::Duration;
// self
use crate::{_prelude::*, error::ConfigError};

/// OAuth client credentials used for the refresh grant.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
	/// OAuth client identifier.
	pub client_id: String,
	/// Long-lived refresh token.
	pub refresh_token: String,
}
impl Debug for Credentials {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Credentials")
			.field("client_id", &self.client_id)
			.field("refresh_token", &"<redacted>")
			.finish()
	}
}

/// Provider configuration; immutable once handed to a constructor.
#[derive(Clone, PartialEq, Eq)]
pub struct Config {
	/// User agent presented on every request; empty keeps the transport default.
	pub user_agent: String,
	/// Mobile app version to emulate.
	pub app_version: String,
	/// OAuth client credentials.
	pub credentials: Credentials,
	/// Vendor API key.
	pub api_key: String,
	/// Store whose promotions are listed.
	pub store_id: String,
	/// Per-request HTTP timeout.
	pub timeout: Duration,
	/// Enables wire logging of requests and responses.
	pub debug: bool,
	/// Overrides the provider's token endpoint.
	pub token_url: Option<Url>,
	/// Overrides the provider's API origin.
	pub api_base: Option<Url>,
}
impl Config {
	/// Default per-request timeout.
	pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

	/// Applies `options` in order over the defaults.
	pub fn from_options(options: impl IntoIterator<Item = ConfigOption>) -> Self {
		options.into_iter().fold(Self::default(), Self::with)
	}

	/// Applies a single option, returning the updated config.
	pub fn with(mut self, option: ConfigOption) -> Self {
		option.apply(&mut self);

		self
	}

	/// Checks the fields every provider needs, reporting the first one that is empty.
	pub fn validate_required(&self) -> Result<(), ConfigError> {
		let required = [
			("refresh_token", &self.credentials.refresh_token),
			("client_id", &self.credentials.client_id),
			("api_key", &self.api_key),
			("store_id", &self.store_id),
		];

		match required.into_iter().find(|(_, value)| value.trim().is_empty()) {
			Some((field, _)) => Err(ConfigError::MissingField { field }),
			None => Ok(()),
		}
	}
}
impl Default for Config {
	fn default() -> Self {
		Self {
			user_agent: String::new(),
			app_version: String::new(),
			credentials: Credentials::default(),
			api_key: String::new(),
			store_id: String::new(),
			timeout: Self::DEFAULT_TIMEOUT,
			debug: false,
			token_url: None,
			api_base: None,
		}
	}
}
impl Debug for Config {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Config")
			.field("user_agent", &self.user_agent)
			.field("app_version", &self.app_version)
			.field("credentials", &self.credentials)
			.field("api_key_set", &!self.api_key.is_empty())
			.field("store_id", &self.store_id)
			.field("timeout", &self.timeout)
			.field("debug", &self.debug)
			.field("token_url", &self.token_url.as_ref().map(Url::as_str))
			.field("api_base", &self.api_base.as_ref().map(Url::as_str))
			.finish()
	}
}

/// One mutation of a [`Config`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigOption {
	/// Sets the user agent.
	UserAgent(String),
	/// Sets the app version to emulate.
	AppVersion(String),
	/// Sets the client id and refresh token together.
	Credentials {
		/// OAuth client identifier.
		client_id: String,
		/// Long-lived refresh token.
		refresh_token: String,
	},
	/// Sets the API key.
	ApiKey(String),
	/// Sets the store id used for promotions.
	StoreId(String),
	/// Sets the per-request timeout.
	Timeout(Duration),
	/// Enables or disables wire logging.
	Debug(bool),
	/// Overrides the token endpoint.
	TokenUrl(Url),
	/// Overrides the API origin.
	ApiBase(Url),
}
impl ConfigOption {
	/// Convenience constructor for [`ConfigOption::Credentials`].
	pub fn credentials(client_id: impl Into<String>, refresh_token: impl Into<String>) -> Self {
		Self::Credentials { client_id: client_id.into(), refresh_token: refresh_token.into() }
	}

	/// Writes the option into `config`.
	pub fn apply(self, config: &mut Config) {
		match self {
			Self::UserAgent(value) => config.user_agent = value,
			Self::AppVersion(value) => config.app_version = value,
			Self::Credentials { client_id, refresh_token } =>
				config.credentials = Credentials { client_id, refresh_token },
			Self::ApiKey(value) => config.api_key = value,
			Self::StoreId(value) => config.store_id = value,
			Self::Timeout(value) => config.timeout = value,
			Self::Debug(value) => config.debug = value,
			Self::TokenUrl(value) => config.token_url = Some(value),
			Self::ApiBase(value) => config.api_base = Some(value),
		}
	}
}
