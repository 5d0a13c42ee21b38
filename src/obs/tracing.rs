// self
use crate::{
	_prelude::*,
	obs::{self, CallKind, CallOutcome},
};

/// Future returned by [`CallSpan::instrument`]; a plain passthrough without `tracing`.
#[cfg(feature = "tracing")]
pub type InstrumentedCall<F> = tracing::instrument::Instrumented<F>;
/// Future returned by [`CallSpan::instrument`]; a plain passthrough without `tracing`.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedCall<F> = F;

/// Span opened around one client call.
///
/// With `tracing` enabled this is a `tasktrack_client.call` span carrying `kind`, `stage`,
/// and, once the call settles, `outcome`. A recovered call shows up as its `api` span with a
/// nested `refresh` span (leader only) followed by a `replay` span.
#[derive(Clone, Debug)]
pub struct CallSpan {
	kind: CallKind,
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl CallSpan {
	/// Opens a span for a call of `kind` issued from `stage`.
	pub fn new(kind: CallKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!(
				"tasktrack_client.call",
				kind = kind.as_str(),
				stage,
				outcome = tracing::field::Empty,
			);

			Self { kind, span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = stage;

			Self { kind }
		}
	}

	/// Kind the span was opened for.
	pub fn kind(&self) -> CallKind {
		self.kind
	}

	/// Attaches the span to `fut` without holding an entered guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedCall<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}

	/// Counts an attempt for the span's kind.
	pub fn attempt(&self) {
		obs::record_call_outcome(self.kind, CallOutcome::Attempt);
	}

	/// Records a terminal outcome on the span and the call counter.
	pub fn settle(&self, outcome: CallOutcome) {
		obs::record_call_outcome(self.kind, outcome);

		#[cfg(feature = "tracing")]
		{
			self.span.record("outcome", outcome.as_str());
		}
	}

	/// Counts an attempt, drives `fut` inside the span, and settles with its result.
	pub async fn run<T, E, Fut>(self, fut: Fut) -> Result<T, E>
	where
		Fut: Future<Output = Result<T, E>>,
	{
		self.attempt();

		let result = self.instrument(fut).await;

		self.settle(CallOutcome::of(&result));

		result
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[tokio::test]
	async fn run_passes_the_result_through() {
		let span = CallSpan::new(CallKind::Replay, "run_passes_the_result_through");

		assert_eq!(span.kind(), CallKind::Replay);
		assert_eq!(span.run(async { Ok::<_, ()>(42) }).await, Ok(42));

		let failing = CallSpan::new(CallKind::Refresh, "run_passes_the_result_through");

		assert_eq!(failing.run(async { Err::<(), _>("rejected") }).await, Err("rejected"));
	}
}
