// crates.io
use reqwest::{
	Request,
	header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT},
};
// self
use crate::{
	_prelude::*,
	error::ConfigError,
	http::{Middleware, Next, TransportFuture},
};

/// Applies a fixed user agent and static headers to every request.
///
/// Values set here replace per-call values for the same header.
#[derive(Clone, Debug)]
pub struct StaticHeaders {
	headers: HeaderMap,
}
impl StaticHeaders {
	/// Validates and stores the headers; an empty `user_agent` leaves the request's own.
	pub fn new(user_agent: Option<&str>, headers: &[(String, String)]) -> Result<Self, ConfigError> {
		let mut map = HeaderMap::with_capacity(headers.len() + 1);

		if let Some(user_agent) = user_agent.filter(|value| !value.is_empty()) {
			map.insert(USER_AGENT, encode_value(USER_AGENT.as_str(), user_agent)?);
		}

		for (name, value) in headers {
			let header = HeaderName::from_bytes(name.as_bytes())
				.map_err(|_| ConfigError::InvalidHeader { name: name.clone() })?;

			map.insert(header, encode_value(name, value)?);
		}

		Ok(Self { headers: map })
	}

	/// Headers applied by this stage.
	pub fn headers(&self) -> &HeaderMap {
		&self.headers
	}

	/// Writes the static headers into `target`, replacing existing values.
	pub fn apply(&self, target: &mut HeaderMap) {
		for (name, value) in &self.headers {
			target.insert(name.clone(), value.clone());
		}
	}
}
impl Middleware for StaticHeaders {
	fn handle<'a>(&'a self, mut request: Request, next: Next<'a>) -> TransportFuture<'a> {
		self.apply(request.headers_mut());

		next.run(request)
	}
}

fn encode_value(name: &str, value: &str) -> Result<HeaderValue, ConfigError> {
	HeaderValue::from_str(value).map_err(|_| ConfigError::InvalidHeader { name: name.to_owned() })
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn static_values_replace_per_call_values() {
		let stage = StaticHeaders::new(
			Some("okhttp/4.12.0"),
			&[("platform".into(), "android".into())],
		)
		.expect("Headers should be valid.");
		let mut target = HeaderMap::new();

		target.insert(USER_AGENT, HeaderValue::from_static("curl/8"));
		target.insert("platform", HeaderValue::from_static("ios"));
		target.insert("storeid", HeaderValue::from_static("1234"));
		stage.apply(&mut target);

		assert_eq!(target[USER_AGENT], "okhttp/4.12.0");
		assert_eq!(target["platform"], "android");
		assert_eq!(target["storeid"], "1234");
	}

	#[test]
	fn invalid_headers_are_rejected() {
		let err = StaticHeaders::new(None, &[("bad header".into(), "x".into())])
			.expect_err("Spaces are not allowed in header names.");

		assert!(matches!(err, ConfigError::InvalidHeader { name } if name == "bad header"));

		let err = StaticHeaders::new(Some("line\nbreak"), &[])
			.expect_err("Control characters are not allowed in header values.");

		assert!(matches!(err, ConfigError::InvalidHeader { .. }));
	}
}
