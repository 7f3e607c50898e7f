//! Clip pipeline: authenticate, fetch, classify, then clip eligible deals one at a time.
//!
//! Fatal failures (authentication, listing, cancellation) unwind to the caller. A failure on a
//! single deal is counted in [`ClipStats::errors`], logged with the deal id, and the loop moves
//! on. The rate limiter only runs after a successful clip, so skipped deals are never paced.
//! Final [`ClipStats`] reach the [`Observer`] exactly once per run, on every path.

// std
use std::time::Instant;
// self
use crate::{
	_prelude::*,
	obs::{NoopObserver, Observer, RunSpan, Stage},
	promotion::{ClipDeal, Disposition, PromotionSearchOptions, PromotionService},
	provider::Supermarket,
	rate_limit::RateLimiter,
};

/// Run-scoped outcome counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ClipStats {
	/// Deals that were clipped before the run.
	pub already_clipped: usize,
	/// Deals clipped by this run.
	pub newly_clipped: usize,
	/// Deleted deals.
	pub deleted: usize,
	/// Deals that are not clippable.
	pub ignored: usize,
	/// Clip attempts that failed.
	pub errors: usize,
}
impl ClipStats {
	/// Counters paired with their stable bucket labels.
	pub fn buckets(&self) -> [(&'static str, usize); 5] {
		[
			("already_clipped", self.already_clipped),
			("newly_clipped", self.newly_clipped),
			("deleted", self.deleted),
			("ignored", self.ignored),
			("errors", self.errors),
		]
	}

	/// Sum of all buckets.
	pub fn total(&self) -> usize {
		self.buckets().iter().map(|(_, value)| value).sum()
	}
}
impl Display for ClipStats {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(
			f,
			"already: {}, newly: {}, deleted: {}, ignored: {}, errors: {}",
			self.already_clipped, self.newly_clipped, self.deleted, self.ignored, self.errors
		)
	}
}

/// Whether the run clips or only lists.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RunMode {
	/// Authenticate and fetch without clipping.
	#[default]
	ListOnly,
	/// Clip every eligible deal.
	ClipAll,
}

/// Result of a successful run.
#[derive(Debug)]
pub struct RunReport {
	/// Number of deals returned by the listing.
	pub fetched: usize,
	/// Final counters.
	pub stats: ClipStats,
	/// Per-deal failures, in list order.
	pub failures: Vec<Error>,
}

/// Orchestrates one run against a [`Supermarket`].
pub struct ClipPipeline {
	rate_limiter: RateLimiter,
	observer: Arc<dyn Observer>,
	mode: RunMode,
}
impl ClipPipeline {
	/// Creates a list-only pipeline paced by `rate_limiter`.
	pub fn new(rate_limiter: RateLimiter) -> Self {
		Self { rate_limiter, observer: Arc::new(NoopObserver), mode: RunMode::default() }
	}

	/// Sets the observer receiving run events.
	pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
		self.observer = observer;

		self
	}

	/// Sets the run mode.
	pub fn with_mode(mut self, mode: RunMode) -> Self {
		self.mode = mode;

		self
	}

	/// Runs the pipeline once.
	pub async fn run(
		&self,
		ctx: &CancellationToken,
		supermarket: &dyn Supermarket,
		options: &PromotionSearchOptions,
	) -> Result<RunReport> {
		let started = Instant::now();
		let mut stats = ClipStats::default();

		self.observer.run_started();

		let outcome = self.execute(ctx, supermarket, options, &mut stats).await;

		self.observer.duration(Stage::Execution, started.elapsed());
		tracing::info!(
			already = stats.already_clipped,
			newly = stats.newly_clipped,
			deleted = stats.deleted,
			ignored = stats.ignored,
			errors = stats.errors,
			"clip: run stats"
		);
		self.observer.clip_stats(&stats);

		match outcome {
			Ok((fetched, failures)) => {
				self.observer.run_finished(true);

				Ok(RunReport { fetched, stats, failures })
			},
			Err(err) => {
				if !matches!(err, Error::Cancelled) {
					self.observer.error(err.category());
				}

				tracing::error!(error = %err, "clip: run failed");
				self.observer.run_finished(false);

				Err(err)
			},
		}
	}

	async fn execute(
		&self,
		ctx: &CancellationToken,
		supermarket: &dyn Supermarket,
		options: &PromotionSearchOptions,
		stats: &mut ClipStats,
	) -> Result<(usize, Vec<Error>)> {
		let authenticator = supermarket.authenticator()?;

		tracing::info!("clip: getting an access token");

		let started = Instant::now();

		RunSpan::new("authenticate").instrument(authenticator.refresh_token(ctx)).await?;
		self.observer.duration(Stage::TokenRefresh, started.elapsed());

		let promotion = supermarket.promotion()?;

		tracing::info!("clip: getting all promotions");

		let started = Instant::now();
		let deals = RunSpan::new("fetch")
			.instrument(promotion.clip_deals(ctx, options))
			.await
			.map_err(Error::fetch)?;

		self.observer.duration(Stage::PromotionsFetch, started.elapsed());
		self.observer.promotions_fetched(deals.len());

		if self.mode == RunMode::ListOnly {
			tracing::info!(count = deals.len(), "clip: list-only run, not clipping");

			return Ok((deals.len(), Vec::new()));
		}

		let failures =
			RunSpan::new("clip").instrument(self.clip_all(ctx, promotion, &deals, stats)).await?;

		Ok((deals.len(), failures))
	}

	async fn clip_all(
		&self,
		ctx: &CancellationToken,
		promotion: &dyn PromotionService,
		deals: &[ClipDeal],
		stats: &mut ClipStats,
	) -> Result<Vec<Error>> {
		let mut failures = Vec::new();
		let mut announced = false;

		for deal in deals {
			if ctx.is_cancelled() {
				return Err(Error::Cancelled);
			}

			match deal.classify() {
				Disposition::AlreadyClipped => stats.already_clipped += 1,
				Disposition::Ignored => stats.ignored += 1,
				Disposition::Deleted => stats.deleted += 1,
				Disposition::Eligible => {
					if !announced {
						tracing::info!("clip: clipping eligible promotions");

						announced = true;
					}

					let started = Instant::now();

					match promotion.clip_deal(ctx, deal).await {
						Ok(()) => {
							self.observer.duration(Stage::ClipDeal, started.elapsed());
							stats.newly_clipped += 1;
							tracing::info!(id = %deal.id, "clip: promotion clipped");
							self.rate_limiter.wait().await;
						},
						Err(Error::Cancelled) => return Err(Error::Cancelled),
						Err(source) => {
							tracing::error!(
								id = %deal.id,
								error = %source,
								"clip: promotion could not be clipped"
							);

							let err = Error::clip_item(deal.id.clone(), source);

							self.observer.error(err.category());
							stats.errors += 1;
							failures.push(err);
						},
					}
				},
			}
		}

		Ok(failures)
	}
}
impl Debug for ClipPipeline {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ClipPipeline")
			.field("rate_limiter", &self.rate_limiter)
			.field("mode", &self.mode)
			.finish()
	}
}
