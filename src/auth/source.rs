//! Token sources: producers of a currently valid access token.
//!
//! [`RefreshTokenSource`] performs the OAuth 2.0 `refresh_token` grant through the `oauth2`
//! crate, dispatching the exchange over a [`TransportClient`] so token calls share the user
//! agent and wire logging of every other request. The current token is cached behind an async
//! lock; a network exchange only happens when the cached token is absent or about to expire.

// std
use std::sync::atomic::{AtomicU64, Ordering};
// crates.io
use oauth2::{
	AuthType, ClientId, EndpointNotSet, EndpointSet, HttpClientError, RefreshToken,
	RequestTokenError, Scope, TokenResponse, TokenUrl,
	basic::{BasicClient, BasicErrorResponse, BasicRequestTokenError, BasicTokenResponse},
};
// self
use crate::{
	_prelude::*,
	auth::{Token, TokenSecret},
	error::{AuthError, ConfigError},
	http::{ResponseMetadata, TransportClient},
};

type ConfiguredBasicClient =
	BasicClient<EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Boxed future returned by [`TokenSource::token`].
pub type TokenFuture<'a> = Pin<Box<dyn Future<Output = Result<Token>> + 'a + Send>>;

/// Produces a currently valid token, refreshing transparently when needed.
pub trait TokenSource
where
	Self: Send + Sync,
{
	/// Returns the cached token or a freshly minted one.
	fn token(&self) -> TokenFuture<'_>;
}

/// Caching token source backed by the OAuth 2.0 refresh grant.
pub struct RefreshTokenSource {
	oauth_client: ConfiguredBasicClient,
	http_client: TransportClient,
	scopes: Vec<String>,
	current: AsyncMutex<Token>,
	exchanges: AtomicU64,
}
impl RefreshTokenSource {
	/// Builds a source that exchanges `refresh_token` at `token_url`.
	///
	/// The client id travels in the request body and no client secret is sent, matching public
	/// mobile clients.
	pub fn new(
		token_url: &Url,
		client_id: impl Into<String>,
		refresh_token: impl Into<String>,
		scopes: impl IntoIterator<Item = impl Into<String>>,
		http_client: TransportClient,
	) -> Result<Self> {
		let token_url =
			TokenUrl::new(token_url.to_string()).map_err(|source| ConfigError::InvalidUrl { source })?;
		let oauth_client = BasicClient::new(ClientId::new(client_id.into()))
			.set_token_uri(token_url)
			.set_auth_type(AuthType::RequestBody);

		Ok(Self {
			oauth_client,
			http_client,
			scopes: scopes.into_iter().map(Into::into).collect(),
			current: AsyncMutex::new(Token::from_refresh_token(refresh_token)),
			exchanges: AtomicU64::new(0),
		})
	}

	/// Number of network exchanges performed so far.
	pub fn exchanges(&self) -> u64 {
		self.exchanges.load(Ordering::Relaxed)
	}

	async fn exchange(&self, refresh_token: &TokenSecret) -> Result<Token> {
		let handle = self.http_client.oauth_handle();
		let secret = RefreshToken::new(refresh_token.expose().to_owned());
		let mut request = self.oauth_client.exchange_refresh_token(&secret);

		for scope in &self.scopes {
			request = request.add_scope(Scope::new(scope.clone()));
		}

		self.exchanges.fetch_add(1, Ordering::Relaxed);

		let response = request
			.request_async(&handle)
			.await
			.map_err(|err| map_request_error(handle.metadata(), err))?;

		Ok(map_token_response(&response, refresh_token))
	}
}
impl TokenSource for RefreshTokenSource {
	fn token(&self) -> TokenFuture<'_> {
		Box::pin(async move {
			let mut current = self.current.lock().await;

			if current.is_valid() {
				return Ok(current.clone());
			}

			let refresh_token =
				current.refresh_token.clone().ok_or(AuthError::MissingRefreshToken)?;

			tracing::debug!("auth: refreshing access token");

			let fresh = self.exchange(&refresh_token).await?;

			tracing::debug!(expiry = ?fresh.expiry, "auth: access token refreshed");

			*current = fresh.clone();

			Ok(fresh)
		})
	}
}
impl Debug for RefreshTokenSource {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RefreshTokenSource")
			.field("scopes", &self.scopes)
			.field("exchanges", &self.exchanges())
			.finish()
	}
}

fn map_token_response(response: &BasicTokenResponse, previous_refresh: &TokenSecret) -> Token {
	let now = OffsetDateTime::now_utc();
	let expiry = response
		.expires_in()
		.and_then(|ttl| time::Duration::try_from(ttl).ok())
		.and_then(|ttl| now.checked_add(ttl));
	// Providers may omit the refresh token when it is not rotated.
	let refresh_token = response
		.refresh_token()
		.map(|secret| TokenSecret::new(secret.secret().to_owned()))
		.unwrap_or_else(|| previous_refresh.clone());

	Token {
		access_token: TokenSecret::new(response.access_token().secret().to_owned()),
		refresh_token: Some(refresh_token),
		token_type: response.token_type().as_ref().to_owned(),
		expiry,
	}
}

fn map_request_error(
	meta: Option<ResponseMetadata>,
	err: BasicRequestTokenError<HttpClientError<Error>>,
) -> Error {
	let status = meta.and_then(|value| value.status);

	match err {
		RequestTokenError::ServerResponse(response) => map_server_response(status, &response),
		RequestTokenError::Request(error) => map_transport_error(error),
		RequestTokenError::Parse(error, _body) => AuthError::TokenRefresh {
			reason: format!("token endpoint returned malformed JSON at `{}`", error.path()),
			status,
		}
		.into(),
		RequestTokenError::Other(message) => AuthError::TokenRefresh { reason: message, status }.into(),
	}
}

fn map_server_response(status: Option<u16>, response: &BasicErrorResponse) -> Error {
	let reason = match response.error_description() {
		Some(description) => format!("{}: {description}", response.error().as_ref()),
		None => response.error().as_ref().to_owned(),
	};

	AuthError::TokenRefresh { reason, status }.into()
}

fn map_transport_error(err: HttpClientError<Error>) -> Error {
	match err {
		HttpClientError::Reqwest(inner) => match *inner {
			Error::Cancelled => Error::Cancelled,
			inner => AuthError::Unreachable { source: Box::new(inner) }.into(),
		},
		HttpClientError::Http(inner) => ConfigError::from(inner).into(),
		HttpClientError::Io(inner) => AuthError::Unreachable {
			source: Box::new(crate::error::TransportError::Io(inner).into()),
		}
		.into(),
		HttpClientError::Other(message) => AuthError::TokenRefresh { reason: message, status: None }.into(),
		_ => AuthError::TokenRefresh {
			reason: "unknown HTTP client failure".into(),
			status: None,
		}
		.into(),
	}
}
