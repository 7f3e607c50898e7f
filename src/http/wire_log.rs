// std
use std::{
	fmt::Write as _,
	sync::atomic::{AtomicU64, Ordering},
};
// crates.io
use reqwest::{
	Request, StatusCode, Version,
	header::{AUTHORIZATION, HeaderMap},
};
// self
use crate::{
	_prelude::*,
	http::{Middleware, Next, TransportFuture},
};

/// Debug-only stage that logs each request and the response head.
///
/// Every request gets a monotonically increasing sequence number carried as the `seq` field of
/// both log events. Request bodies are logged only when already buffered; response bodies are
/// never read. The `Authorization` value is redacted.
#[derive(Debug, Default)]
pub struct WireLogger {
	sequence: AtomicU64,
}
impl WireLogger {
	/// Sequence number the next request will receive.
	pub fn next_sequence(&self) -> u64 {
		self.sequence.load(Ordering::Relaxed)
	}
}
impl Middleware for WireLogger {
	fn handle<'a>(&'a self, request: Request, next: Next<'a>) -> TransportFuture<'a> {
		Box::pin(async move {
			let seq = self.sequence.fetch_add(1, Ordering::Relaxed);

			tracing::debug!(seq, "http: request\n{}", render_request(&request));

			match next.run(request).await {
				Ok(response) => {
					tracing::debug!(
						seq,
						"http: response\n{}",
						render_response(response.version(), response.status(), response.headers())
					);

					Ok(response)
				},
				Err(err) => {
					tracing::warn!(seq, error = %err, "http: request failed");

					Err(err)
				},
			}
		})
	}
}

/// Renders the request line, headers, and buffered body.
pub fn render_request(request: &Request) -> String {
	let url = request.url();
	let target = match url.query() {
		Some(query) => format!("{}?{query}", url.path()),
		None => url.path().to_owned(),
	};
	let mut out = format!("  {} {target} {:?}\n", request.method(), request.version());

	if let Some(host) = url.host_str() {
		let _ = writeln!(out, "  host: {host}");
	}

	render_headers(&mut out, request.headers());

	if let Some(body) = request.body().and_then(|body| body.as_bytes()) {
		let _ = writeln!(out, "\n  {}", String::from_utf8_lossy(body));
	}

	out.trim_end().to_owned()
}

/// Renders the status line and headers of a response.
pub fn render_response(version: Version, status: StatusCode, headers: &HeaderMap) -> String {
	let mut out = format!("  {version:?} {status}\n");

	render_headers(&mut out, headers);

	out.trim_end().to_owned()
}

fn render_headers(out: &mut String, headers: &HeaderMap) {
	for (name, value) in headers {
		let value = if name == AUTHORIZATION {
			"<redacted>".into()
		} else {
			String::from_utf8_lossy(value.as_bytes())
		};
		let _ = writeln!(out, "  {name}: {value}");
	}
}
