//! Discover and clip grocery digital promotions through a retailer's private mobile API.
//!
//! A [`provider::Registry`] maps provider names to constructors. Each provider binds an
//! [`auth::Authenticator`] (OAuth 2.0 refresh grant behind a cached token source) and a
//! [`promotion::PromotionService`] that share one decorated [`http::TransportClient`].
//! [`clip::ClipPipeline`] drives the run: authenticate, fetch, classify, then clip the
//! eligible promotions one at a time, paced by a jittered [`rate_limit::RateLimiter`].

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
#[cfg(feature = "cli")] pub mod cli;
pub mod clip;
pub mod config;
pub mod error;
pub mod http;
pub mod obs;
pub mod promotion;
pub mod provider;
pub mod rate_limit;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and fixtures for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// self
	use crate::{
		auth::{Authenticator, AuthFuture, Token, TokenSecret},
		clip::ClipStats,
		config::{Config, ConfigOption},
		error::{AuthError, ErrorCategory},
		http::TransportClient,
		obs::{Observer, Stage},
		promotion::{
			ClipDeal, Promotion, PromotionFuture, PromotionSearchOptions, PromotionService,
		},
		provider::Supermarket,
	};

	/// Options whose endpoints point at a local mock server.
	pub fn mock_options(base_url: &str) -> Vec<ConfigOption> {
		let base = Url::parse(base_url).expect("Mock server URL should parse.");
		let token_url = base.join("/token").expect("Mock token URL should join.");

		vec![
			ConfigOption::UserAgent("okhttp/4.12.0".into()),
			ConfigOption::AppVersion("2025.1.0".into()),
			ConfigOption::credentials("client-test", "refresh-test"),
			ConfigOption::ApiKey("api-key-test".into()),
			ConfigOption::StoreId("1234".into()),
			ConfigOption::TokenUrl(token_url),
			ConfigOption::ApiBase(base),
		]
	}

	/// Builds a config from [`mock_options`].
	pub fn mock_config(base_url: &str) -> Config {
		Config::from_options(mock_options(base_url))
	}

	/// Builds a clip deal with valid promo identifiers and the provided flags.
	pub fn deal(id: &str, is_clipped: bool, is_clippable: bool, is_deleted: bool) -> ClipDeal {
		ClipDeal {
			promotion: Promotion {
				id: id.into(),
				promo_code: Some(format!("code-{id}")),
				promo_type: Some("PD".into()),
				is_clipped,
				is_clippable,
				is_deleted,
				is_displayable: true,
				..Promotion::default()
			},
			..ClipDeal::default()
		}
	}

	/// Observer that records every event for later assertions.
	#[derive(Debug, Default)]
	pub struct RecordingObserver {
		/// Number of `run_started` calls.
		pub starts: AtomicUsize,
		/// Outcomes passed to `run_finished`.
		pub finished: Mutex<Vec<bool>>,
		/// Error categories in the order they were reported.
		pub errors: Mutex<Vec<ErrorCategory>>,
		/// Stages that reported a duration.
		pub stages: Mutex<Vec<Stage>>,
		/// Fetched promotion counts.
		pub fetched: Mutex<Vec<usize>>,
		/// Clip stats snapshots.
		pub stats: Mutex<Vec<ClipStats>>,
	}
	impl Observer for RecordingObserver {
		fn run_started(&self) {
			self.starts.fetch_add(1, Ordering::SeqCst);
		}

		fn run_finished(&self, success: bool) {
			self.finished.lock().push(success);
		}

		fn error(&self, category: ErrorCategory) {
			self.errors.lock().push(category);
		}

		fn duration(&self, stage: Stage, _elapsed: std::time::Duration) {
			self.stages.lock().push(stage);
		}

		fn promotions_fetched(&self, count: usize) {
			self.fetched.lock().push(count);
		}

		fn clip_stats(&self, stats: &ClipStats) {
			self.stats.lock().push(*stats);
		}
	}

	/// Scripted in-memory provider that never touches the network.
	#[derive(Debug, Default)]
	pub struct ScriptedSupermarket {
		/// Fails the token refresh when set.
		pub fail_refresh: bool,
		/// Fails the listing call when set.
		pub fail_fetch: bool,
		/// Deals returned by the listing call.
		pub deals: Vec<ClipDeal>,
		/// Ids whose clip call is answered with HTTP 500.
		pub failing_ids: Vec<String>,
		/// Number of token refreshes attempted.
		pub refreshes: AtomicUsize,
		/// Number of listing calls attempted.
		pub fetches: AtomicUsize,
		/// Ids passed to the clip call, in order.
		pub clipped: Mutex<Vec<String>>,
		/// Undecorated client handed out as the authenticated client.
		pub client: TransportClient,
	}
	impl ScriptedSupermarket {
		/// Creates a provider that lists the given deals.
		pub fn with_deals(deals: Vec<ClipDeal>) -> Self {
			Self { deals, ..Self::default() }
		}
	}
	impl Authenticator for ScriptedSupermarket {
		fn http_client(&self) -> &TransportClient {
			&self.client
		}

		fn refresh_token<'a>(&'a self, _ctx: &'a CancellationToken) -> AuthFuture<'a, Token> {
			Box::pin(async move {
				self.refreshes.fetch_add(1, Ordering::SeqCst);

				if self.fail_refresh {
					return Err(AuthError::TokenRefresh {
						reason: "scripted refresh failure".into(),
						status: Some(400),
					}
					.into());
				}

				Ok(Token {
					access_token: TokenSecret::new("scripted-access"),
					refresh_token: None,
					token_type: "Bearer".into(),
					expiry: None,
				})
			})
		}

		fn is_authenticated<'a>(&'a self, _ctx: &'a CancellationToken) -> AuthFuture<'a, bool> {
			Box::pin(async move { Ok(!self.fail_refresh) })
		}
	}
	impl PromotionService for ScriptedSupermarket {
		fn clip_deals<'a>(
			&'a self,
			_ctx: &'a CancellationToken,
			_options: &'a PromotionSearchOptions,
		) -> PromotionFuture<'a, Vec<ClipDeal>> {
			Box::pin(async move {
				self.fetches.fetch_add(1, Ordering::SeqCst);

				if self.fail_fetch {
					return Err(crate::error::ApiError::Status {
						operation: "list clip deals",
						status: 503,
					}
					.into());
				}

				Ok(self.deals.clone())
			})
		}

		fn clip_deal<'a>(
			&'a self,
			_ctx: &'a CancellationToken,
			deal: &'a ClipDeal,
		) -> PromotionFuture<'a, ()> {
			Box::pin(async move {
				deal.check_clippable()?;
				self.clipped.lock().push(deal.id.clone());

				if self.failing_ids.contains(&deal.id) {
					return Err(
						crate::error::ApiError::Status { operation: "clip deal", status: 500 }.into()
					);
				}

				Ok(())
			})
		}
	}
	impl Supermarket for ScriptedSupermarket {
		fn authenticator(&self) -> Result<&dyn Authenticator> {
			Ok(self)
		}

		fn promotion(&self) -> Result<&dyn PromotionService> {
			Ok(self)
		}
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::OffsetDateTime;
	pub use tokio_util::sync::CancellationToken;
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use oauth2;
pub use reqwest;
pub use tokio_util::sync::CancellationToken;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
