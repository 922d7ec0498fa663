//! Renewal timer: arming, cancellation, and the renew-then-introspect cycle.

// crates.io
use tokio::{runtime::Handle, task::AbortHandle};
// self
use crate::{
	_prelude::*,
	auth::{self, Token},
	manager::{ManagerInner, ManagerState},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

/// Armed timer; at most one exists per manager.
pub(super) struct RenewalTimer {
	pub(super) generation: u64,
	pub(super) handle: AbortHandle,
}

/// Aborts the armed timer, if any.
pub(super) fn cancel(state: &mut ManagerState) {
	if let Some(timer) = state.timer.take() {
		timer.handle.abort();
	}
}

impl ManagerInner {
	/// Replaces any armed timer with one targeting `token`.
	///
	/// Nothing is armed for tokens that are not renewable, already expired, or when no tokio
	/// runtime is available to run the timer.
	pub(super) fn schedule_renewal(self: &Arc<Self>, state: &mut ManagerState, token: &Token) {
		cancel(state);

		let now = OffsetDateTime::now_utc();

		if !token.is_renewable() || token.is_expired_at(now) {
			return;
		}

		let Some(delay) = token.renewal_delay_at(now) else { return };
		let Ok(sleep) = std::time::Duration::try_from(delay) else { return };
		let Ok(runtime) = Handle::try_current() else {
			obs::renewal_unavailable();

			return;
		};

		state.timer_generation += 1;

		let generation = state.timer_generation;
		let inner = Arc::downgrade(self);
		let task = runtime.spawn(async move {
			tokio::time::sleep(sleep).await;

			if let Some(inner) = inner.upgrade() {
				inner.renew(generation).await;
			}
		});

		state.timer = Some(RenewalTimer { generation, handle: task.abort_handle() });

		obs::renewal_scheduled(delay);
	}

	/// Renews the cached token under the singleflight guard, so a foreground acquisition never
	/// runs alongside it.
	async fn renew(self: Arc<Self>, generation: u64) {
		let _singleflight = self.flight.lock().await;
		let token = {
			let mut state = self.state.lock();

			if state.timer.as_ref().map(|timer| timer.generation) != Some(generation) {
				return;
			}

			state.timer = None;

			match state.token.clone() {
				// An expired token is left to the next `get_token` to replace.
				Some(token) if !token.is_expired() => token,
				_ => return,
			}
		};

		self.metrics.record_attempt();
		obs::record_flow_outcome(FlowKind::Renewal, FlowOutcome::Attempt);

		let api = self.api.as_ref();
		let result = FlowSpan::new(FlowKind::Renewal, "renew_self")
			.instrument(async {
				auth::renew_self(api, token.id()).await?;

				auth::lookup_self(api, token.id()).await
			})
			.await;

		obs::record_result(FlowKind::Renewal, &result);

		let mut state = self.state.lock();

		match result {
			Ok(fresh) => {
				self.metrics.record_success();
				obs::renewal_succeeded(fresh.expires_at());

				self.schedule_renewal(&mut state, &fresh);

				state.token = Some(fresh);
			},
			Err(err) => {
				self.metrics.record_failure();
				obs::renewal_failed(&err);

				self.schedule_renewal(&mut state, &token);
			},
		}
	}
}
