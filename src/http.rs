//! HTTP transport chain shared by token exchanges and vendor API calls.
//!
//! A [`TransportClient`] owns a [`ReqwestClient`] plus an ordered list of [`Middleware`] stages,
//! outermost first. Dispatching a request hands it to the first stage together with a [`Next`]
//! cursor over the remaining stages; the last cursor executes the request on the base client.
//! Stages receive owned [`reqwest::Request`] values, so decorating a request never mutates a
//! template the caller still holds.
//!
//! [`TransportBuilder`] assembles the standard chain:
//! [`BearerAuth`] → [`StaticHeaders`] → [`WireLogger`] (debug only) → base transport.
//!
//! Token exchanges run through [`OAuthHandle`], an [`AsyncHttpClient`] adapter that records the
//! response status in a [`ResponseMetadataSlot`] so refresh failures can report it.

mod bearer;
mod headers;
mod wire_log;

pub use bearer::*;
pub use headers::*;
pub use wire_log::*;

// std
use std::time::Duration;
// crates.io
use oauth2::{AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse};
use reqwest::{Method, Request, RequestBuilder, Response};
// self
use crate::{
	_prelude::*,
	auth::TokenSource,
	error::{ConfigError, TransportError},
};

/// Boxed future returned by transport stages.
pub type TransportFuture<'a> = Pin<Box<dyn Future<Output = Result<Response>> + 'a + Send>>;

/// One decorator in the transport chain.
///
/// Implementations must forward to `next` exactly once unless they fail the request, and must
/// propagate the error of the stage they wrap unchanged.
pub trait Middleware
where
	Self: Send + Sync,
{
	/// Handles `request`, delegating the rest of the chain to `next`.
	fn handle<'a>(&'a self, request: Request, next: Next<'a>) -> TransportFuture<'a>;
}

/// Cursor over the stages that have not run yet.
#[derive(Clone, Copy)]
pub struct Next<'a> {
	client: &'a ReqwestClient,
	chain: &'a [Arc<dyn Middleware>],
}
impl<'a> Next<'a> {
	/// Runs the remaining stages, ending with the base client.
	pub fn run(self, request: Request) -> TransportFuture<'a> {
		match self.chain.split_first() {
			Some((stage, rest)) => stage.handle(request, Next { client: self.client, chain: rest }),
			None => {
				let client = self.client;

				Box::pin(async move {
					client.execute(request).await.map_err(|e| TransportError::from(e).into())
				})
			},
		}
	}

	/// Number of stages left before the base client.
	pub fn remaining(&self) -> usize {
		self.chain.len()
	}
}
impl Debug for Next<'_> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Next").field("remaining", &self.remaining()).finish()
	}
}

/// Decorated HTTP client; cheap to clone.
#[derive(Clone)]
pub struct TransportClient {
	client: ReqwestClient,
	chain: Arc<[Arc<dyn Middleware>]>,
}
impl TransportClient {
	/// Starts a [`TransportBuilder`].
	pub fn builder() -> TransportBuilder {
		TransportBuilder::default()
	}

	/// Wraps `client` without any stages.
	pub fn with_client(client: ReqwestClient) -> Self {
		Self { client, chain: Arc::from(Vec::new()) }
	}

	/// Starts a request on the base client; send it through [`TransportClient::send`].
	pub fn request(&self, method: Method, url: Url) -> RequestBuilder {
		self.client.request(method, url)
	}

	/// Starts a `GET` request.
	pub fn get(&self, url: Url) -> RequestBuilder {
		self.request(Method::GET, url)
	}

	/// Starts a `POST` request.
	pub fn post(&self, url: Url) -> RequestBuilder {
		self.request(Method::POST, url)
	}

	/// Builds `builder` and sends it through the chain.
	pub async fn send(&self, ctx: &CancellationToken, builder: RequestBuilder) -> Result<Response> {
		let request = builder.build().map_err(TransportError::from)?;

		self.execute(ctx, request).await
	}

	/// Sends `request` through the chain, aborting when `ctx` is cancelled.
	///
	/// No stage sees the request once `ctx` is already cancelled.
	pub async fn execute(&self, ctx: &CancellationToken, request: Request) -> Result<Response> {
		if ctx.is_cancelled() {
			return Err(Error::Cancelled);
		}

		tokio::select! {
			biased;
			_ = ctx.cancelled() => Err(Error::Cancelled),
			response = self.dispatch(request) => response,
		}
	}

	/// Sends `request` through the chain without a cancellation guard.
	pub fn dispatch(&self, request: Request) -> TransportFuture<'_> {
		Next { client: &self.client, chain: &self.chain }.run(request)
	}

	/// Returns a client with `stage` installed as the new outermost stage.
	pub fn with_stage(&self, stage: Arc<dyn Middleware>) -> Self {
		let chain = std::iter::once(stage).chain(self.chain.iter().cloned()).collect::<Vec<_>>();

		Self { client: self.client.clone(), chain: Arc::from(chain) }
	}

	/// Returns a client that injects bearer tokens from `source` on every request.
	pub fn authorized(self, source: Arc<dyn TokenSource>) -> Self {
		self.with_stage(Arc::new(BearerAuth::new(source)))
	}

	/// Number of installed stages.
	pub fn stages(&self) -> usize {
		self.chain.len()
	}

	/// Creates an `oauth2` HTTP adapter that dispatches through this chain.
	pub fn oauth_handle(&self) -> OAuthHandle {
		OAuthHandle { client: self.clone(), slot: ResponseMetadataSlot::default() }
	}
}
impl Default for TransportClient {
	fn default() -> Self {
		Self::with_client(ReqwestClient::default())
	}
}
impl Debug for TransportClient {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TransportClient").field("stages", &self.stages()).finish()
	}
}

/// Builder for the standard transport chain.
#[derive(Default)]
pub struct TransportBuilder {
	user_agent: Option<String>,
	headers: Vec<(String, String)>,
	wire_log: bool,
	timeout: Option<Duration>,
}
impl TransportBuilder {
	/// Sets the user agent applied to every request; empty values are ignored.
	pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
		let user_agent = user_agent.into();

		self.user_agent = (!user_agent.is_empty()).then_some(user_agent);

		self
	}

	/// Adds a static header applied to every request.
	pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.push((name.into(), value.into()));

		self
	}

	/// Enables request/response wire logging.
	pub fn wire_log(mut self, enabled: bool) -> Self {
		self.wire_log = enabled;

		self
	}

	/// Sets the per-request timeout of the base client.
	pub fn timeout(mut self, timeout: Duration) -> Self {
		self.timeout = Some(timeout);

		self
	}

	/// Builds the client.
	pub fn build(self) -> Result<TransportClient> {
		let mut builder = ReqwestClient::builder();

		if let Some(timeout) = self.timeout {
			builder = builder.timeout(timeout);
		}

		let client = builder.build().map_err(ConfigError::http_client_build)?;
		let mut chain = Vec::<Arc<dyn Middleware>>::new();

		if self.user_agent.is_some() || !self.headers.is_empty() {
			chain.push(Arc::new(StaticHeaders::new(self.user_agent.as_deref(), &self.headers)?));
		}
		if self.wire_log {
			chain.push(Arc::new(WireLogger::default()));
		}

		Ok(TransportClient { client, chain: Arc::from(chain) })
	}
}
impl Debug for TransportBuilder {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TransportBuilder")
			.field("user_agent", &self.user_agent)
			.field("headers", &self.headers.len())
			.field("wire_log", &self.wire_log)
			.field("timeout", &self.timeout)
			.finish()
	}
}

/// Captures metadata from the most recent HTTP response for downstream error mapping.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadata {
	/// HTTP status code, if a response arrived.
	pub status: Option<u16>,
}

/// Thread-safe slot for sharing [`ResponseMetadata`] between transport and error layers.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadataSlot(Arc<Mutex<Option<ResponseMetadata>>>);
impl ResponseMetadataSlot {
	/// Stores new metadata for the current request.
	pub fn store(&self, meta: ResponseMetadata) {
		*self.0.lock() = Some(meta);
	}

	/// Returns the captured metadata, if any, consuming it from the slot.
	pub fn take(&self) -> Option<ResponseMetadata> {
		self.0.lock().take()
	}
}

/// [`AsyncHttpClient`] adapter that sends `oauth2` requests through a [`TransportClient`].
#[derive(Clone, Debug)]
pub struct OAuthHandle {
	client: TransportClient,
	slot: ResponseMetadataSlot,
}
impl OAuthHandle {
	/// Metadata of the last response, consumed from the slot.
	pub fn metadata(&self) -> Option<ResponseMetadata> {
		self.slot.take()
	}
}
impl<'c> AsyncHttpClient<'c> for OAuthHandle {
	type Error = HttpClientError<Error>;
	type Future = Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		Box::pin(async move {
			self.slot.take();

			let request = Request::try_from(request)
				.map_err(|e| Box::new(Error::from(TransportError::from(e))))?;
			let response = self.client.dispatch(request).await.map_err(Box::new)?;
			let status = response.status();
			let headers = response.headers().to_owned();

			self.slot.store(ResponseMetadata { status: Some(status.as_u16()) });

			let body = response
				.bytes()
				.await
				.map_err(|e| Box::new(Error::from(TransportError::from(e))))?;
			let mut response_new = HttpResponse::new(body.to_vec());

			*response_new.status_mut() = status;
			*response_new.headers_mut() = headers;

			Ok(response_new)
		})
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// self
	use super::*;

	struct Counting(AtomicUsize);
	impl Middleware for Counting {
		fn handle<'a>(&'a self, request: Request, next: Next<'a>) -> TransportFuture<'a> {
			self.0.fetch_add(1, Ordering::SeqCst);

			next.run(request)
		}
	}

	struct Reject;
	impl Middleware for Reject {
		fn handle<'a>(&'a self, _request: Request, _next: Next<'a>) -> TransportFuture<'a> {
			Box::pin(async { Err(Error::Cancelled) })
		}
	}

	fn request() -> Request {
		Request::new(Method::GET, Url::parse("http://127.0.0.1:9/").expect("URL should parse."))
	}

	#[test]
	fn with_stage_prepends() {
		let client = TransportClient::default();
		let client = client.with_stage(Arc::new(Reject));
		let client = client.with_stage(Arc::new(Counting(AtomicUsize::new(0))));

		assert_eq!(client.stages(), 2);
	}

	#[tokio::test]
	async fn failing_stage_short_circuits_the_chain() {
		let outer = Arc::new(Counting(AtomicUsize::new(0)));
		let client =
			TransportClient::default().with_stage(Arc::new(Reject)).with_stage(outer.clone());
		let err = client.dispatch(request()).await.expect_err("Rejecting stage should fail.");

		assert!(matches!(err, Error::Cancelled));
		assert_eq!(outer.0.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn cancelled_context_skips_dispatch() {
		let counting = Arc::new(Counting(AtomicUsize::new(0)));
		let client = TransportClient::default().with_stage(counting.clone());
		let ctx = CancellationToken::new();

		ctx.cancel();

		let err = client.execute(&ctx, request()).await.expect_err("Cancelled call should fail.");

		assert!(matches!(err, Error::Cancelled));
		assert_eq!(counting.0.load(Ordering::SeqCst), 0);
	}

	#[tokio::test]
	async fn cancelled_context_leaves_the_wire_log_untouched() {
		let logger = Arc::new(WireLogger::default());
		let client = TransportClient::default().with_stage(Arc::new(Reject)).with_stage(logger.clone());
		let ctx = CancellationToken::new();

		ctx.cancel();

		let err = client.execute(&ctx, request()).await.expect_err("Cancelled call should fail.");

		assert!(matches!(err, Error::Cancelled));
		assert_eq!(logger.next_sequence(), 0);
	}

	#[tokio::test]
	async fn wire_log_numbers_each_request() {
		let logger = Arc::new(WireLogger::default());
		let client = TransportClient::default().with_stage(Arc::new(Reject)).with_stage(logger.clone());
		let ctx = CancellationToken::new();

		for _ in 0..3 {
			client.execute(&ctx, request()).await.expect_err("Rejecting stage should fail.");
		}

		assert_eq!(logger.next_sequence(), 3);
	}

	#[test]
	fn builder_installs_requested_stages() {
		let client = TransportClient::builder()
			.user_agent("okhttp/4.12.0")
			.wire_log(true)
			.build()
			.expect("Builder should succeed.");

		assert_eq!(client.stages(), 2);

		let bare = TransportClient::builder().user_agent("").build().expect("Builder should succeed.");

		assert_eq!(bare.stages(), 0);
	}
}
