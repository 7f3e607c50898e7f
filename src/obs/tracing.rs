// crates.io
use tracing::{Instrument, instrument::Instrumented};
// self
use crate::_prelude::*;

/// Span builder used by the clip pipeline.
#[derive(Clone, Debug)]
pub struct RunSpan {
	span: tracing::Span,
}
impl RunSpan {
	/// Creates a `supermarket.run` span tagged with `stage`.
	pub fn new(stage: &'static str) -> Self {
		Self { span: tracing::info_span!("supermarket.run", stage) }
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> Instrumented<Fut>
	where
		Fut: Future,
	{
		fut.instrument(self.span.clone())
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[tokio::test]
	async fn instrument_wraps_future() {
		let span = RunSpan::new("fetch");
		// `tracing::Instrument` is in scope here, so name the inherent method explicitly.
		let value = RunSpan::instrument(&span, async { 42 }).await;

		assert_eq!(value, 42);
	}
}
