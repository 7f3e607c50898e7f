//! Crate-level error types shared by the registry, providers, transport, and clip pipeline.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Authentication or token refresh failure.
	#[error(transparent)]
	Auth(#[from] AuthError),
	/// Vendor API answered with something the provider cannot use.
	#[error(transparent)]
	Api(#[from] ApiError),
	/// Transport failure (DNS, TCP, TLS, timeout).
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// No constructor is registered under the requested provider name.
	#[error("Provider `{name}` is not registered.")]
	NotRegistered {
		/// Requested provider name.
		name: String,
	},
	/// Promotions could not be listed.
	#[error("Promotions could not be fetched.")]
	Fetch {
		/// Underlying failure.
		#[source]
		source: Box<Error>,
	},
	/// A single promotion could not be clipped.
	#[error("Promotion `{id}` could not be clipped.")]
	ClipItem {
		/// Promotion identifier.
		id: String,
		/// Underlying failure.
		#[source]
		source: Box<Error>,
	},
	/// A promotion failed the clip preconditions before any request was sent.
	#[error("Promotion `{id}` cannot be clipped: {reason}.")]
	ClipRejected {
		/// Promotion identifier (possibly empty).
		id: String,
		/// Failed precondition.
		reason: ClipRejection,
	},
	/// The execution context was cancelled.
	#[error("Operation was cancelled.")]
	Cancelled,
}
impl Error {
	/// Wraps a listing failure, leaving cancellation untouched.
	pub fn fetch(source: Error) -> Self {
		match source {
			Self::Cancelled => Self::Cancelled,
			source => Self::Fetch { source: Box::new(source) },
		}
	}

	/// Wraps a per-promotion failure, leaving cancellation untouched.
	pub fn clip_item(id: impl Into<String>, source: Error) -> Self {
		match source {
			Self::Cancelled => Self::Cancelled,
			source => Self::ClipItem { id: id.into(), source: Box::new(source) },
		}
	}

	/// Returns `true` for the categories that only affect one promotion.
	pub fn is_item_scoped(&self) -> bool {
		matches!(self, Self::ClipItem { .. } | Self::ClipRejected { .. })
	}

	/// Maps the error to the category used by observability collaborators.
	pub fn category(&self) -> ErrorCategory {
		match self {
			Self::Config(_) | Self::NotRegistered { .. } => ErrorCategory::ConfigValidation,
			Self::Auth(_) => ErrorCategory::TokenRefresh,
			Self::Api(ApiError::Decode { .. }) => ErrorCategory::PromotionsParse,
			Self::Fetch { source } => match source.category() {
				ErrorCategory::PromotionsParse => ErrorCategory::PromotionsParse,
				ErrorCategory::TokenRefresh => ErrorCategory::TokenRefresh,
				_ => ErrorCategory::PromotionsFetch,
			},
			Self::ClipItem { .. } | Self::ClipRejected { .. } => ErrorCategory::ClipDeal,
			Self::Api(_) | Self::Transport(_) | Self::Cancelled => ErrorCategory::PromotionsFetch,
		}
	}
}

/// Error categories surfaced to observability collaborators.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
	/// Missing or malformed configuration.
	ConfigValidation,
	/// Token refresh failed.
	TokenRefresh,
	/// Promotions could not be listed.
	PromotionsFetch,
	/// Promotions payload could not be decoded.
	PromotionsParse,
	/// A single clip attempt failed.
	ClipDeal,
}
impl ErrorCategory {
	/// Returns a stable label suitable for metric labels.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::ConfigValidation => "config_validation",
			Self::TokenRefresh => "token_refresh",
			Self::PromotionsFetch => "promotions_fetch",
			Self::PromotionsParse => "promotions_parse",
			Self::ClipDeal => "clip_deal",
		}
	}
}
impl Display for ErrorCategory {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// A required configuration field is empty.
	#[error("Missing required configuration: {field}.")]
	MissingField {
		/// Field label.
		field: &'static str,
	},
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying builder failure.
		#[source]
		source: BoxError,
	},
	/// Header name or value cannot be encoded.
	#[error("Header `{name}` is invalid.")]
	InvalidHeader {
		/// Offending header name.
		name: String,
	},
	/// Endpoint URL cannot be parsed or joined.
	#[error("Endpoint URL is invalid.")]
	InvalidUrl {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
}
impl ConfigError {
	/// Wraps a transport builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
impl From<url::ParseError> for ConfigError {
	fn from(source: url::ParseError) -> Self {
		Self::InvalidUrl { source }
	}
}

/// Authentication failures; fatal to a run.
#[derive(Debug, ThisError)]
pub enum AuthError {
	/// The token endpoint rejected or failed the refresh grant.
	#[error("Token refresh failed: {reason}.")]
	TokenRefresh {
		/// Provider- or transport-supplied reason.
		reason: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// No refresh token is available to exchange.
	#[error("No refresh token is available.")]
	MissingRefreshToken,
	/// The token endpoint could not be reached.
	#[error("Token endpoint is unreachable.")]
	Unreachable {
		/// Underlying transport failure.
		#[source]
		source: Box<Error>,
	},
}

/// Vendor API responses the provider cannot use.
#[derive(Debug, ThisError)]
pub enum ApiError {
	/// Endpoint answered with a non-success status.
	#[error("The {operation} call returned HTTP {status}.")]
	Status {
		/// Logical operation label.
		operation: &'static str,
		/// HTTP status code.
		status: u16,
	},
	/// Endpoint payload could not be decoded.
	#[error("The {operation} response could not be decoded.")]
	Decode {
		/// Logical operation label.
		operation: &'static str,
		/// Structured parsing failure naming the JSON path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Request body could not be encoded.
	#[error("The {operation} request could not be encoded.")]
	Encode {
		/// Logical operation label.
		operation: &'static str,
		/// Serialization failure.
		#[source]
		source: serde_json::Error,
	},
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling {url}.")]
	Network {
		/// Target URL, when known.
		url: String,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred during transport.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(url: impl Into<String>, src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Network { url: url.into(), source: Box::new(src) }
	}
}
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		let url = e.url().map(ToString::to_string).unwrap_or_default();

		Self::network(url, e)
	}
}

/// Clip preconditions a promotion can fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClipRejection {
	/// Promotion id is empty.
	MissingId,
	/// Promo code or promo type is absent.
	MissingPromoCode,
	/// Promotion is already clipped.
	AlreadyClipped,
	/// Promotion is not clippable.
	NotClippable,
	/// Promotion is deleted.
	Deleted,
}
impl Display for ClipRejection {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(match self {
			Self::MissingId => "missing id",
			Self::MissingPromoCode => "missing promo code or type",
			Self::AlreadyClipped => "already clipped",
			Self::NotClippable => "not clippable",
			Self::Deleted => "deleted",
		})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn fetch_wrapper_preserves_cancellation_and_source() {
		assert!(matches!(Error::fetch(Error::Cancelled), Error::Cancelled));

		let wrapped =
			Error::fetch(ApiError::Status { operation: "list clip deals", status: 502 }.into());
		let source = StdError::source(&wrapped).expect("Fetch errors should expose their source.");

		assert!(source.to_string().contains("HTTP 502"));
		assert_eq!(wrapped.category(), ErrorCategory::PromotionsFetch);
	}

	#[test]
	fn categories_follow_taxonomy() {
		assert_eq!(
			Error::from(ConfigError::MissingField { field: "store_id" }).category(),
			ErrorCategory::ConfigValidation
		);
		assert_eq!(
			Error::NotRegistered { name: "unknown".into() }.category(),
			ErrorCategory::ConfigValidation
		);
		assert_eq!(Error::from(AuthError::MissingRefreshToken).category(), ErrorCategory::TokenRefresh);
		assert_eq!(
			Error::fetch(AuthError::MissingRefreshToken.into()).category(),
			ErrorCategory::TokenRefresh
		);
		assert_eq!(
			Error::ClipRejected { id: "1".into(), reason: ClipRejection::Deleted }.category(),
			ErrorCategory::ClipDeal
		);
	}

	#[test]
	fn clip_errors_are_item_scoped() {
		let err = Error::clip_item("42", TransportError::Io(std::io::Error::other("reset")).into());

		assert!(err.is_item_scoped());
		assert!(err.to_string().contains("42"));
		assert!(!Error::Cancelled.is_item_scoped());
	}
}
