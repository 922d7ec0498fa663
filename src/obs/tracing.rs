// self
use crate::{_prelude::*, obs::FlowKind};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedFlow<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedFlow<F> = F;

/// A span builder used by broker flows.
#[derive(Clone, Debug)]
pub struct FlowSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl FlowSpan {
	/// Creates a new span tagged with the provided flow kind + stage.
	pub fn new(kind: FlowKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("vault_broker.flow", flow = kind.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedFlow<Fut>
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
}

/// Emits the event logged after a backend produced a token.
pub(crate) fn login_succeeded(backend: &'static str, expires_at: Option<OffsetDateTime>) {
	#[cfg(feature = "tracing")]
	tracing::info!(backend, ?expires_at, "auth token acquired");
	#[cfg(not(feature = "tracing"))]
	let _ = (backend, expires_at);
}

/// Emits the event logged when the renewal timer is armed.
pub(crate) fn renewal_scheduled(delay: Duration) {
	#[cfg(feature = "tracing")]
	tracing::debug!(delay_secs = delay.as_seconds_f64(), "auth token renewal scheduled");
	#[cfg(not(feature = "tracing"))]
	let _ = delay;
}

/// Emits the warning logged when a renewable token cannot be scheduled (no tokio runtime).
pub(crate) fn renewal_unavailable() {
	#[cfg(feature = "tracing")]
	tracing::warn!("no tokio runtime available, auth token renewal disabled");
}

/// Emits the event logged after a successful background renewal.
pub(crate) fn renewal_succeeded(expires_at: Option<OffsetDateTime>) {
	#[cfg(feature = "tracing")]
	tracing::info!(?expires_at, "auth token renewed");
	#[cfg(not(feature = "tracing"))]
	let _ = expires_at;
}

/// Emits the warning logged when a background renewal fails; the cached token stays in use.
pub(crate) fn renewal_failed(err: &Error) {
	#[cfg(feature = "tracing")]
	tracing::warn!(error = %err, "auth token renewal failed");
	#[cfg(not(feature = "tracing"))]
	let _ = err;
}
