// std
use std::{
	sync::atomic::{AtomicU64, Ordering},
	time::Duration,
};
// self
use crate::{
	clip::ClipStats,
	error::ErrorCategory,
	obs::{Observer, Stage},
};

/// Records run events through the global `metrics` recorder (when enabled).
///
/// Series: `supermarket_runs_total`, `supermarket_runs_success_total`,
/// `supermarket_errors_total{category}`, `supermarket_last_error_timestamp{category}`,
/// `supermarket_last_run_success`, `supermarket_last_run_timestamp`,
/// `supermarket_last_success_timestamp`, `supermarket_consecutive_failures`,
/// `supermarket_promotions_count`, `supermarket_clip_stats{bucket}`, and
/// `supermarket_duration_seconds{stage}`.
#[derive(Debug, Default)]
pub struct MetricsObserver {
	consecutive_failures: AtomicU64,
}
impl MetricsObserver {
	/// Failed runs since the last successful one.
	pub fn consecutive_failures(&self) -> u64 {
		self.consecutive_failures.load(Ordering::Relaxed)
	}
}
impl Observer for MetricsObserver {
	fn run_started(&self) {
		#[cfg(feature = "metrics")]
		metrics::counter!("supermarket_runs_total").increment(1);
	}

	fn run_finished(&self, success: bool) {
		let failures = if success {
			self.consecutive_failures.store(0, Ordering::Relaxed);

			0
		} else {
			self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1
		};

		#[cfg(feature = "metrics")]
		{
			let now = unix_now();

			if success {
				metrics::counter!("supermarket_runs_success_total").increment(1);
				metrics::gauge!("supermarket_last_success_timestamp").set(now);
			}

			metrics::gauge!("supermarket_last_run_success").set(if success { 1.0 } else { 0.0 });
			metrics::gauge!("supermarket_last_run_timestamp").set(now);
			metrics::gauge!("supermarket_consecutive_failures").set(failures as f64);
		}
		#[cfg(not(feature = "metrics"))]
		{
			let _ = failures;
		}
	}

	fn error(&self, category: ErrorCategory) {
		#[cfg(feature = "metrics")]
		{
			metrics::counter!("supermarket_errors_total", "category" => category.as_str())
				.increment(1);
			metrics::gauge!("supermarket_last_error_timestamp", "category" => category.as_str())
				.set(unix_now());
		}
		#[cfg(not(feature = "metrics"))]
		{
			let _ = category;
		}
	}

	fn duration(&self, stage: Stage, elapsed: Duration) {
		#[cfg(feature = "metrics")]
		metrics::histogram!("supermarket_duration_seconds", "stage" => stage.as_str())
			.record(elapsed.as_secs_f64());
		#[cfg(not(feature = "metrics"))]
		{
			let _ = (stage, elapsed);
		}
	}

	fn promotions_fetched(&self, count: usize) {
		#[cfg(feature = "metrics")]
		metrics::gauge!("supermarket_promotions_count").set(count as f64);
		#[cfg(not(feature = "metrics"))]
		{
			let _ = count;
		}
	}

	fn clip_stats(&self, stats: &ClipStats) {
		#[cfg(feature = "metrics")]
		for (bucket, value) in stats.buckets() {
			metrics::gauge!("supermarket_clip_stats", "bucket" => bucket).set(value as f64);
		}
		#[cfg(not(feature = "metrics"))]
		{
			let _ = stats;
		}
	}
}

/// Publishes `supermarket_build_info{version}` with a constant value of 1.
pub fn record_build_info(version: &'static str) {
	#[cfg(feature = "metrics")]
	metrics::gauge!("supermarket_build_info", "version" => version).set(1.0);
	#[cfg(not(feature = "metrics"))]
	{
		let _ = version;
	}
}

#[cfg(feature = "metrics")]
fn unix_now() -> f64 {
	time::OffsetDateTime::now_utc().unix_timestamp() as f64
}
