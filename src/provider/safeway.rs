//! Safeway provider: Okta refresh grant plus the J4U mobile promotions API.
//!
//! The token endpoint is called through a transport with the user agent and optional wire log
//! only. API calls use a second chain that also carries the platform identity headers, with the
//! bearer stage in front.

mod promotion;
mod wire;

pub use promotion::*;
pub use wire::*;

// self
use crate::{
	_prelude::*,
	auth::{Authenticator, RefreshAuthenticator, RefreshTokenSource},
	config::Config,
	error::ConfigError,
	http::TransportClient,
	promotion::PromotionService,
	provider::{Registry, Supermarket},
};

/// Registry name of the provider.
pub const NAME: &str = "safeway";
/// Default OAuth token endpoint.
pub const DEFAULT_TOKEN_URL: &str =
	"https://albertsons.okta.com/oauth2/ausp6soxrIyPrm8rS2p6/v1/token";
/// Default API origin.
pub const DEFAULT_API_BASE: &str = "https://www.safeway.com";
/// Scopes sent with the refresh grant.
pub const SCOPES: [&str; 4] = ["openid", "profile", "offline_access", "partner"];
/// Identity headers sent on every API call.
pub const PLATFORM_HEADERS: [(&str, &str); 4] = [
	("accept", "application/json"),
	("platform", "android"),
	("x-swy_version", "2.1"),
	("x-swy_banner", "safeway"),
];

/// Registers the provider under [`NAME`].
pub fn register(registry: &Registry) {
	registry.register(NAME, create);
}

/// [`crate::provider::Creator`] for the provider.
pub fn create(_ctx: &CancellationToken, config: &Config) -> Result<Box<dyn Supermarket>> {
	Ok(Box::new(Safeway::new(config)?))
}

/// Safeway capability set.
#[derive(Debug)]
pub struct Safeway {
	authenticator: RefreshAuthenticator,
	promotions: SafewayPromotions,
}
impl Safeway {
	/// Builds the authenticator and promotion service from `config`.
	pub fn new(config: &Config) -> Result<Self> {
		let token_url = match &config.token_url {
			Some(url) => url.clone(),
			None => Url::parse(DEFAULT_TOKEN_URL).map_err(ConfigError::from)?,
		};
		let token_transport = TransportClient::builder()
			.user_agent(&config.user_agent)
			.wire_log(config.debug)
			.timeout(config.timeout)
			.build()?;
		let api_transport = PLATFORM_HEADERS
			.into_iter()
			.fold(TransportClient::builder(), |builder, (name, value)| builder.header(name, value))
			.user_agent(&config.user_agent)
			.wire_log(config.debug)
			.timeout(config.timeout)
			.build()?;
		let source = RefreshTokenSource::new(
			&token_url,
			&config.credentials.client_id,
			&config.credentials.refresh_token,
			SCOPES,
			token_transport,
		)?;
		let authenticator = RefreshAuthenticator::new(Arc::new(source), api_transport);
		let promotions = SafewayPromotions::new(authenticator.http_client().clone(), config)?;

		Ok(Self { authenticator, promotions })
	}
}
impl Supermarket for Safeway {
	fn authenticator(&self) -> Result<&dyn Authenticator> {
		Ok(&self.authenticator)
	}

	fn promotion(&self) -> Result<&dyn PromotionService> {
		Ok(&self.promotions)
	}
}
