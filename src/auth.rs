//! Authentication capability: token primitives, token sources, and the refresh-backed
//! [`Authenticator`].

mod secret;
mod source;
mod token;

pub use secret::*;
pub use source::*;
pub use token::*;

// std
use std::sync::atomic::{AtomicBool, Ordering};
// self
use crate::{_prelude::*, http::TransportClient};

/// Boxed future returned by [`Authenticator`] operations.
pub type AuthFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// Owns a refreshable token and exposes it to the transport chain.
pub trait Authenticator
where
	Self: Send + Sync,
{
	/// Fully decorated client bound to this authenticator's token source.
	fn http_client(&self) -> &TransportClient;

	/// Returns the cached token or refreshes it, updating the authenticated state.
	fn refresh_token<'a>(&'a self, ctx: &'a CancellationToken) -> AuthFuture<'a, Token>;

	/// Side-effecting health probe.
	///
	/// Returns `false` without any I/O when no refresh has ever succeeded; otherwise attempts a
	/// refresh and reports the resulting state.
	fn is_authenticated<'a>(&'a self, ctx: &'a CancellationToken) -> AuthFuture<'a, bool>;
}

/// [`Authenticator`] that delegates caching and refreshing to a [`TokenSource`].
#[derive(Debug)]
pub struct RefreshAuthenticator<S = RefreshTokenSource>
where
	S: TokenSource,
{
	source: Arc<S>,
	client: TransportClient,
	authenticated: AtomicBool,
}
impl<S> RefreshAuthenticator<S>
where
	S: 'static + TokenSource,
{
	/// Binds `source` and decorates `client` with the bearer token stage.
	pub fn new(source: Arc<S>, client: TransportClient) -> Self {
		let client = client.authorized(source.clone());

		Self { source, client, authenticated: AtomicBool::new(false) }
	}
}
impl<S> Authenticator for RefreshAuthenticator<S>
where
	S: 'static + TokenSource,
{
	fn http_client(&self) -> &TransportClient {
		&self.client
	}

	fn refresh_token<'a>(&'a self, ctx: &'a CancellationToken) -> AuthFuture<'a, Token> {
		Box::pin(async move {
			let outcome = tokio::select! {
				biased;
				_ = ctx.cancelled() => Err(Error::Cancelled),
				outcome = self.source.token() => outcome,
			};

			self.authenticated.store(outcome.is_ok(), Ordering::SeqCst);

			match &outcome {
				Ok(token) => tracing::debug!(expiry = ?token.expiry, "auth: token ready"),
				Err(err) => tracing::warn!(error = %err, "auth: token refresh failed"),
			}

			outcome
		})
	}

	fn is_authenticated<'a>(&'a self, ctx: &'a CancellationToken) -> AuthFuture<'a, bool> {
		Box::pin(async move {
			if !self.authenticated.load(Ordering::SeqCst) {
				return Ok(false);
			}

			match self.refresh_token(ctx).await {
				Ok(_) => Ok(true),
				Err(Error::Cancelled) => Err(Error::Cancelled),
				Err(_) => Ok(false),
			}
		})
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::AtomicUsize;
	// self
	use super::*;
	use crate::error::AuthError;

	#[derive(Debug, Default)]
	struct FlakySource {
		fail: AtomicBool,
		calls: AtomicUsize,
	}
	impl TokenSource for FlakySource {
		fn token(&self) -> TokenFuture<'_> {
			Box::pin(async move {
				self.calls.fetch_add(1, Ordering::SeqCst);

				if self.fail.load(Ordering::SeqCst) {
					return Err(AuthError::TokenRefresh {
						reason: "invalid_grant".into(),
						status: Some(400),
					}
					.into());
				}

				Ok(Token {
					access_token: TokenSecret::new("access"),
					refresh_token: None,
					token_type: "Bearer".into(),
					expiry: None,
				})
			})
		}
	}

	#[tokio::test]
	async fn probe_skips_io_until_first_success() {
		let source = Arc::new(FlakySource::default());
		let auth = RefreshAuthenticator::new(source.clone(), TransportClient::default());
		let ctx = CancellationToken::new();

		assert!(!auth.is_authenticated(&ctx).await.expect("Probe should not fail."));
		assert_eq!(source.calls.load(Ordering::SeqCst), 0);

		auth.refresh_token(&ctx).await.expect("Refresh should succeed.");

		assert!(auth.is_authenticated(&ctx).await.expect("Probe should not fail."));
		assert_eq!(source.calls.load(Ordering::SeqCst), 2);
	}

	#[tokio::test]
	async fn failed_refresh_drops_authenticated_state() {
		let source = Arc::new(FlakySource::default());
		let auth = RefreshAuthenticator::new(source.clone(), TransportClient::default());
		let ctx = CancellationToken::new();

		auth.refresh_token(&ctx).await.expect("Refresh should succeed.");
		source.fail.store(true, Ordering::SeqCst);

		let err = auth.refresh_token(&ctx).await.expect_err("Refresh should fail.");

		assert!(matches!(err, Error::Auth(AuthError::TokenRefresh { status: Some(400), .. })));
		assert!(!auth.is_authenticated(&ctx).await.expect("Probe should not fail."));
	}

	#[tokio::test]
	async fn cancelled_context_aborts_refresh() {
		let auth = RefreshAuthenticator::new(
			Arc::new(FlakySource::default()),
			TransportClient::default(),
		);
		let ctx = CancellationToken::new();

		ctx.cancel();

		assert!(matches!(auth.refresh_token(&ctx).await, Err(Error::Cancelled)));
	}
}
