//! Jittered fixed-delay pacing between mutating calls.
//!
//! [`RateLimiter::wait`] is the only backpressure in the crate. It keeps no call history and
//! each call samples its own delay. The sleep is not cancellation-aware; callers that need that
//! race it against their [`CancellationToken`] themselves.

// std
use std::time::Duration;
// crates.io
use rand::Rng;

/// Sleeps `base ± base * jitter`, uniformly distributed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RateLimiter {
	base: Duration,
	jitter: f64,
}
impl RateLimiter {
	/// Creates a limiter; `jitter` is clamped to `0.0..=1.0`.
	pub fn new(base: Duration, jitter: f64) -> Self {
		let jitter = if jitter.is_finite() { jitter.clamp(0.0, 1.0) } else { 0.0 };

		Self { base, jitter }
	}

	/// Limiter that never sleeps.
	pub const fn disabled() -> Self {
		Self { base: Duration::ZERO, jitter: 0.0 }
	}

	/// Base delay.
	pub fn base(&self) -> Duration {
		self.base
	}

	/// Jitter fraction.
	pub fn jitter(&self) -> f64 {
		self.jitter
	}

	/// Samples the next delay using `rng`.
	pub fn delay_with(&self, rng: &mut impl Rng) -> Duration {
		if self.base.is_zero() {
			return Duration::ZERO;
		}

		let base = self.base.as_secs_f64();
		let range = base * self.jitter;
		let offset = if range > 0.0 { rng.random_range(-range..=range) } else { 0.0 };

		Duration::from_secs_f64((base + offset).max(0.0))
	}

	/// Samples the next delay.
	pub fn delay(&self) -> Duration {
		self.delay_with(&mut rand::rng())
	}

	/// Sleeps for a freshly sampled delay; returns immediately when the base delay is zero.
	pub async fn wait(&self) {
		let delay = self.delay();

		if delay.is_zero() {
			return;
		}

		tracing::trace!(delay_ms = delay.as_millis() as u64, "rate limit: waiting");
		tokio::time::sleep(delay).await;
	}
}
impl Default for RateLimiter {
	fn default() -> Self {
		Self::disabled()
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::time::Instant;
	// self
	use super::*;

	#[test]
	fn samples_stay_within_jitter_bounds() {
		let limiter = RateLimiter::new(Duration::from_millis(1_000), 0.5);
		let mut rng = rand::rng();

		for _ in 0..1_000 {
			let delay = limiter.delay_with(&mut rng);

			assert!(delay >= Duration::from_millis(500), "{delay:?} is below the lower bound");
			assert!(delay <= Duration::from_millis(1_500), "{delay:?} is above the upper bound");
		}
	}

	#[test]
	fn jitter_is_clamped() {
		assert_eq!(RateLimiter::new(Duration::from_secs(1), 3.0).jitter(), 1.0);
		assert_eq!(RateLimiter::new(Duration::from_secs(1), -1.0).jitter(), 0.0);
		assert_eq!(RateLimiter::new(Duration::from_secs(1), f64::NAN).jitter(), 0.0);
		assert_eq!(
			RateLimiter::new(Duration::from_millis(250), 0.0).delay(),
			Duration::from_millis(250)
		);
	}

	#[tokio::test]
	async fn zero_base_returns_immediately() {
		for jitter in [0.0, 0.5, 1.0] {
			let limiter = RateLimiter::new(Duration::ZERO, jitter);
			let started = Instant::now();

			limiter.wait().await;

			assert!(started.elapsed() < Duration::from_millis(50));
		}
	}

	#[tokio::test(start_paused = true)]
	async fn wait_sleeps_for_sampled_delay() {
		let limiter = RateLimiter::new(Duration::from_millis(200), 0.0);
		let started = tokio::time::Instant::now();

		limiter.wait().await;

		assert!(started.elapsed() >= Duration::from_millis(200));
	}
}
