//! OAuth token snapshot handed out by token sources.

// std
use std::time::Duration;
// self
use crate::{_prelude::*, auth::TokenSecret};

/// Access/refresh token pair with its expiry.
#[derive(Clone, PartialEq, Eq)]
pub struct Token {
	/// Access token presented as the bearer credential.
	pub access_token: TokenSecret,
	/// Refresh token used to mint the next access token.
	pub refresh_token: Option<TokenSecret>,
	/// Token type reported by the token endpoint (usually `bearer`).
	pub token_type: String,
	/// Expiry instant; `None` means the token never expires.
	pub expiry: Option<OffsetDateTime>,
}
impl Token {
	/// Tokens are treated as expired this long before their actual expiry.
	pub const EXPIRY_DELTA: Duration = Duration::from_secs(10);

	/// Seeds a token that only carries a refresh token, forcing a refresh on first use.
	///
	/// An empty `refresh_token` seeds no refresh token at all.
	pub fn from_refresh_token(refresh_token: impl Into<String>) -> Self {
		let refresh_token = refresh_token.into();

		Self {
			access_token: TokenSecret::default(),
			refresh_token: (!refresh_token.is_empty()).then(|| TokenSecret::new(refresh_token)),
			token_type: "Bearer".into(),
			expiry: None,
		}
	}

	/// Returns `true` if the access token is present and not about to expire at `now`.
	pub fn is_valid_at(&self, now: OffsetDateTime) -> bool {
		if self.access_token.is_empty() {
			return false;
		}

		match self.expiry {
			Some(expiry) => now + Self::EXPIRY_DELTA < expiry,
			None => true,
		}
	}

	/// Convenience helper that checks validity against the current UTC instant.
	pub fn is_valid(&self) -> bool {
		self.is_valid_at(OffsetDateTime::now_utc())
	}

	/// Authorization scheme with the canonical casing for well-known types.
	pub fn scheme(&self) -> &str {
		let token_type = self.token_type.trim();

		if token_type.is_empty() || token_type.eq_ignore_ascii_case("bearer") {
			"Bearer"
		} else if token_type.eq_ignore_ascii_case("mac") {
			"MAC"
		} else if token_type.eq_ignore_ascii_case("basic") {
			"Basic"
		} else {
			token_type
		}
	}

	/// Value for the `Authorization` header.
	pub fn authorization_value(&self) -> String {
		format!("{} {}", self.scheme(), self.access_token.expose())
	}
}
impl Debug for Token {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Token")
			.field("access_token", &"<redacted>")
			.field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
			.field("token_type", &self.token_type)
			.field("expiry", &self.expiry)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	fn token(access: &str, expiry: Option<OffsetDateTime>) -> Token {
		Token {
			access_token: TokenSecret::new(access),
			refresh_token: None,
			token_type: "bearer".into(),
			expiry,
		}
	}

	#[test]
	fn validity_honours_expiry_delta() {
		let expiry = macros::datetime!(2025-01-01 01:00 UTC);
		let token = token("access", Some(expiry));

		assert!(token.is_valid_at(macros::datetime!(2025-01-01 00:59:49 UTC)));
		assert!(!token.is_valid_at(macros::datetime!(2025-01-01 00:59:50 UTC)));
		assert!(!token.is_valid_at(macros::datetime!(2025-01-01 01:30 UTC)));
	}

	#[test]
	fn seeded_tokens_require_refresh() {
		let seeded = Token::from_refresh_token("refresh");

		assert!(!seeded.is_valid());
		assert_eq!(seeded.refresh_token.as_ref().map(TokenSecret::expose), Some("refresh"));
		assert!(Token::from_refresh_token("").refresh_token.is_none());
		assert!(token("access", None).is_valid());
	}

	#[test]
	fn authorization_value_normalizes_scheme() {
		assert_eq!(token("abc", None).authorization_value(), "Bearer abc");

		let mut mac = token("abc", None);

		mac.token_type = "MAC".into();

		assert_eq!(mac.authorization_value(), "MAC abc");

		let mut custom = token("abc", None);

		custom.token_type = "DPoP".into();

		assert_eq!(custom.authorization_value(), "DPoP abc");
	}

	#[test]
	fn debug_output_redacts_secrets() {
		let rendered = format!("{:?}", token("very-secret", None));

		assert!(!rendered.contains("very-secret"));
	}
}
