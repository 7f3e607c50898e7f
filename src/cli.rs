//! Command-line surface: argument model, subscriber setup, and the top-level run.
//!
//! Every flag falls back to an environment variable so the binary can run from a scheduler
//! without a wrapper script.

// std
use std::time::Duration;
// crates.io
use clap::{Parser, builder::FalseyValueParser};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
// self
use crate::{
	_prelude::*,
	clip::{ClipPipeline, RunMode, RunReport},
	config::{Config, ConfigOption},
	obs::{self, MetricsObserver, Observer},
	promotion::PromotionSearchOptions,
	provider::{Registry, safeway},
	rate_limit::RateLimiter,
};

/// Jitter applied to `--delay-ms`.
pub const DELAY_JITTER: f64 = 0.5;

/// Command-line arguments.
#[derive(Clone, Parser)]
#[command(name = "supermarket", about = "Lists and clips grocery digital promotions", version)]
pub struct Args {
	/// Refresh token for authentication.
	#[arg(long, env = "REFRESH_TOKEN", default_value = "", hide_default_value = true)]
	pub refresh_token: String,
	/// OAuth client id for authentication.
	#[arg(long, env = "CLIENT_ID", default_value = "")]
	pub client_id: String,
	/// User agent presented on every request.
	#[arg(long, env = "USER_AGENT", default_value = "okhttp/4.12.0")]
	pub user_agent: String,
	/// Vendor API key.
	#[arg(long, env = "API_KEY", default_value = "", hide_default_value = true)]
	pub api_key: String,
	/// Store whose promotions are listed.
	#[arg(long, env = "STORE_ID", default_value = "")]
	pub store_id: String,
	/// Mobile app version to emulate.
	#[arg(long, env = "APP_VERSION", default_value = "")]
	pub app_version: String,
	/// Clip every eligible promotion instead of only listing them.
	#[arg(long, env = "CLIP_ALL", value_parser = FalseyValueParser::new())]
	pub clip_all: bool,
	/// Delay between clip calls in milliseconds, randomized by +/-50%.
	#[arg(long, env = "DELAY_MS", default_value_t = 1000)]
	pub delay_ms: u64,
	/// Log verbosity [0-4]; `RUST_LOG` takes precedence when set.
	#[arg(short, long, env = "VERBOSE", default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=4))]
	pub verbose: u8,
	/// Registered provider to run against.
	#[arg(long, env = "PROVIDER", default_value = safeway::NAME)]
	pub provider: String,
	/// Overrides the provider's token endpoint.
	#[arg(long, env = "SAFEWAY_TOKEN_URL")]
	pub token_url: Option<Url>,
	/// Per-request HTTP timeout in seconds.
	#[arg(long, env = "TIMEOUT_SECS", default_value_t = 30)]
	pub timeout_secs: u64,
}
impl Args {
	/// Ordered provider options derived from the arguments.
	pub fn options(&self) -> Vec<ConfigOption> {
		let mut options = vec![
			ConfigOption::UserAgent(self.user_agent.clone()),
			ConfigOption::AppVersion(self.app_version.clone()),
			ConfigOption::credentials(&self.client_id, &self.refresh_token),
			ConfigOption::ApiKey(self.api_key.clone()),
			ConfigOption::Debug(self.verbose > 0),
			ConfigOption::StoreId(self.store_id.clone()),
			ConfigOption::Timeout(Duration::from_secs(self.timeout_secs)),
		];

		if let Some(url) = &self.token_url {
			options.push(ConfigOption::TokenUrl(url.clone()));
		}

		options
	}

	/// Run mode selected by `--clip-all`.
	pub fn mode(&self) -> RunMode {
		if self.clip_all { RunMode::ClipAll } else { RunMode::ListOnly }
	}

	/// Rate limiter built from `--delay-ms`.
	pub fn rate_limiter(&self) -> RateLimiter {
		RateLimiter::new(Duration::from_millis(self.delay_ms), DELAY_JITTER)
	}
}
impl Debug for Args {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Args")
			.field("client_id", &self.client_id)
			.field("user_agent", &self.user_agent)
			.field("store_id", &self.store_id)
			.field("app_version", &self.app_version)
			.field("clip_all", &self.clip_all)
			.field("delay_ms", &self.delay_ms)
			.field("verbose", &self.verbose)
			.field("provider", &self.provider)
			.field("token_url", &self.token_url.as_ref().map(Url::as_str))
			.field("timeout_secs", &self.timeout_secs)
			.finish_non_exhaustive()
	}
}

/// Default filter directives for a verbosity level.
pub fn filter_directives(verbose: u8) -> &'static str {
	match verbose {
		0 => "warn,supermarket=info",
		1 => "warn,supermarket=debug",
		2 => "info,supermarket=debug",
		3 => "debug",
		_ => "trace",
	}
}

/// Installs the global `fmt` subscriber; `RUST_LOG` overrides `verbose`.
pub fn init_tracing(verbose: u8) {
	let filter = EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| EnvFilter::new(filter_directives(verbose)));

	tracing_subscriber::registry().with(fmt::layer().with_target(false)).with(filter).init();
}

/// Validates the arguments, builds the configured provider, and runs the pipeline once.
///
/// Missing credentials fail with a config validation error before any request is sent.
pub async fn run(args: &Args, ctx: &CancellationToken) -> Result<RunReport> {
	obs::record_build_info(env!("CARGO_PKG_VERSION"));

	run_with_observer(args, ctx, Arc::new(MetricsObserver::default())).await
}

/// [`run`] reporting to `observer`.
///
/// Failures before the pipeline starts are still reported as a started and failed run.
pub async fn run_with_observer(
	args: &Args,
	ctx: &CancellationToken,
	observer: Arc<dyn Observer>,
) -> Result<RunReport> {
	let options = args.options();

	if let Err(e) = Config::from_options(options.clone()).validate_required() {
		return Err(reject_run(observer.as_ref(), e.into()));
	}

	let registry = Registry::new();

	safeway::register(&registry);

	tracing::debug!(?args, providers = ?registry.available(), "cli: starting run");

	let supermarket = match registry.create(ctx, &args.provider, options) {
		Ok(supermarket) => supermarket,
		Err(e) => return Err(reject_run(observer.as_ref(), e)),
	};

	ClipPipeline::new(args.rate_limiter())
		.with_observer(observer)
		.with_mode(args.mode())
		.run(ctx, supermarket.as_ref(), &PromotionSearchOptions::default())
		.await
}

fn reject_run(observer: &dyn Observer, err: Error) -> Error {
	observer.run_started();
	observer.error(err.category());
	observer.run_finished(false);

	err
}
