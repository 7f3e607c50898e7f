// crates.io
use reqwest::{
	Request,
	header::{AUTHORIZATION, HeaderValue},
};
// self
use crate::{
	_prelude::*,
	auth::TokenSource,
	error::ConfigError,
	http::{Middleware, Next, TransportFuture},
};

/// Sets the `Authorization` header from a [`TokenSource`], refreshing when needed.
///
/// A refresh failure fails the request; nothing is retried.
pub struct BearerAuth {
	source: Arc<dyn TokenSource>,
}
impl BearerAuth {
	/// Creates the stage for `source`.
	pub fn new(source: Arc<dyn TokenSource>) -> Self {
		Self { source }
	}
}
impl Middleware for BearerAuth {
	fn handle<'a>(&'a self, mut request: Request, next: Next<'a>) -> TransportFuture<'a> {
		Box::pin(async move {
			let token = self.source.token().await?;
			let mut value = HeaderValue::from_str(&token.authorization_value())
				.map_err(|_| ConfigError::InvalidHeader { name: AUTHORIZATION.to_string() })?;

			value.set_sensitive(true);
			request.headers_mut().insert(AUTHORIZATION, value);

			next.run(request).await
		})
	}
}
impl Debug for BearerAuth {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("BearerAuth(..)")
	}
}
