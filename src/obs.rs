//! Observability collaborators for the clip pipeline.
//!
//! # Feature Flags
//!
//! - Spans named `supermarket.run` carry a `stage` field (`authenticate`, `fetch`, `clip`).
//! - Enable `metrics` to record run, error, duration, and clip-stat series through the `metrics`
//!   facade with [`MetricsObserver`]. Installing a recorder/exporter is up to the host.

mod metrics;
mod tracing;

pub use self::{metrics::*, tracing::*};

// std
use std::time::Duration;
// self
use crate::{_prelude::*, clip::ClipStats, error::ErrorCategory};

/// Timed stages of a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
	/// Token refresh during authentication.
	TokenRefresh,
	/// Promotion listing.
	PromotionsFetch,
	/// One successful clip call.
	ClipDeal,
	/// Whole run.
	Execution,
}
impl Stage {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Stage::TokenRefresh => "token_refresh",
			Stage::PromotionsFetch => "promotions_fetch",
			Stage::ClipDeal => "clip_deal",
			Stage::Execution => "execution",
		}
	}
}
impl Display for Stage {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Receives run events; every method defaults to a no-op.
pub trait Observer
where
	Self: Send + Sync,
{
	/// A run started.
	fn run_started(&self) {}

	/// A run ended.
	fn run_finished(&self, _success: bool) {}

	/// An error of `category` happened.
	fn error(&self, _category: ErrorCategory) {}

	/// `stage` completed after `elapsed`.
	fn duration(&self, _stage: Stage, _elapsed: Duration) {}

	/// The listing returned `count` promotions.
	fn promotions_fetched(&self, _count: usize) {}

	/// Final counters of the run; reported exactly once.
	fn clip_stats(&self, _stats: &ClipStats) {}
}

/// Observer that ignores everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopObserver;
impl Observer for NoopObserver {}
