//! Token lifecycle manager: cached token, singleflight acquisition, and background renewal.
//!
//! [`TokenManager::get_token`] returns the cached token while it is valid. Otherwise it joins (or
//! drives) the single in-flight acquisition guarded by an async mutex, so concurrent callers
//! trigger exactly one login and all observe its outcome. Renewable tokens arm a timer that fires
//! at half the remaining lifetime. A failed renewal keeps the cached token and re-arms against it,
//! so a transient outage never invalidates a token that has not actually expired. Renewals take
//! the same guard as acquisitions, so at most one login or renewal is in flight per manager.

mod metrics;
mod renewal;

pub use metrics::RenewalMetrics;

// self
use crate::{
	_prelude::*,
	auth::Token,
	backend::{AuthBackend, AuthOptions},
	http::VaultHttpClient,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

/// Hands out valid tokens produced by one [`AuthBackend`].
///
/// Cloning is cheap; clones share the cached token, the in-flight acquisition and the renewal
/// timer. The timer is cancelled once the last clone is dropped.
#[derive(Clone)]
pub struct TokenManager {
	inner: Arc<ManagerInner>,
}
impl TokenManager {
	/// Creates a manager with no cached token.
	pub fn new(api: Arc<dyn VaultHttpClient>, backend: Arc<dyn AuthBackend>) -> Self {
		Self {
			inner: Arc::new(ManagerInner {
				api,
				backend,
				state: Mutex::new(ManagerState::default()),
				flight: AsyncMutex::new(()),
				metrics: RenewalMetrics::default(),
			}),
		}
	}

	/// Builds the backend described by `options` and wraps it in a manager.
	pub fn from_options(api: Arc<dyn VaultHttpClient>, options: &AuthOptions) -> Result<Self> {
		Ok(Self::new(api, options.build()?))
	}

	/// Returns a valid token, logging in when none is cached or the cached one expired.
	///
	/// Fails with [`Error::AuthTokenExpired`] without touching the network when the cached token
	/// expired and the backend cannot reauthenticate.
	pub async fn get_token(&self) -> Result<Token> {
		let seen = match self.inner.lookup_cached()? {
			Cached::Valid(token) => return Ok(token),
			Cached::Stale { epoch } => epoch,
		};
		let _singleflight = self.inner.flight.lock().await;

		// Another caller may have finished an acquisition while this one waited.
		{
			let state = self.inner.state.lock();

			if let Some(token) = state.token.as_ref().filter(|token| !token.is_expired()) {
				return Ok(token.clone());
			}
			if state.epoch != seen
				&& let Some(err) = &state.last_failure
			{
				return Err(err.clone());
			}
		}

		match self.inner.lookup_cached()? {
			Cached::Valid(token) => Ok(token),
			Cached::Stale { .. } => self.inner.acquire().await,
		}
	}

	/// Returns the cached token without validating or refreshing it.
	pub fn cached_token(&self) -> Option<Token> {
		self.inner.state.lock().token.clone()
	}

	/// Returns `true` while a renewal timer is armed.
	pub fn renewal_scheduled(&self) -> bool {
		self.inner.state.lock().timer.is_some()
	}

	/// Renewal counters for this manager.
	pub fn renewal_metrics(&self) -> &RenewalMetrics {
		&self.inner.metrics
	}

	/// Backend producing tokens for this manager.
	pub fn backend(&self) -> &Arc<dyn AuthBackend> {
		&self.inner.backend
	}

	/// Transport shared by logins, introspection and renewals.
	pub fn http_client(&self) -> &Arc<dyn VaultHttpClient> {
		&self.inner.api
	}
}
impl Debug for TokenManager {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let state = self.inner.state.lock();

		f.debug_struct("TokenManager")
			.field("backend", &self.inner.backend.kind())
			.field("mount", &self.inner.backend.mount())
			.field("token", &state.token)
			.field("renewal_scheduled", &state.timer.is_some())
			.finish()
	}
}

struct ManagerInner {
	api: Arc<dyn VaultHttpClient>,
	backend: Arc<dyn AuthBackend>,
	state: Mutex<ManagerState>,
	flight: AsyncMutex<()>,
	metrics: RenewalMetrics,
}
impl ManagerInner {
	fn lookup_cached(&self) -> Result<Cached> {
		let state = self.state.lock();

		match &state.token {
			Some(token) if !token.is_expired() => Ok(Cached::Valid(token.clone())),
			Some(_) if !self.backend.reauthentication_allowed() => Err(Error::AuthTokenExpired),
			_ => Ok(Cached::Stale { epoch: state.epoch }),
		}
	}

	/// Runs the backend login. Callers must hold the singleflight guard.
	async fn acquire(self: &Arc<Self>) -> Result<Token> {
		let span = FlowSpan::new(FlowKind::Login, self.backend.kind().as_str());

		obs::record_flow_outcome(FlowKind::Login, FlowOutcome::Attempt);

		let result = span.instrument(self.backend.authenticate(self.api.as_ref())).await;

		obs::record_result(FlowKind::Login, &result);

		let mut state = self.state.lock();

		state.epoch += 1;

		match &result {
			Ok(token) => {
				obs::login_succeeded(self.backend.kind().as_str(), token.expires_at());

				state.token = Some(token.clone());
				state.last_failure = None;

				self.schedule_renewal(&mut state, token);
			},
			Err(err) => {
				state.token = None;
				state.last_failure = Some(err.clone());

				renewal::cancel(&mut state);
			},
		}

		result
	}
}
impl Drop for ManagerInner {
	fn drop(&mut self) {
		renewal::cancel(self.state.get_mut());
	}
}

#[derive(Default)]
struct ManagerState {
	token: Option<Token>,
	/// Bumped whenever an acquisition finishes.
	epoch: u64,
	last_failure: Option<Error>,
	timer: Option<renewal::RenewalTimer>,
	timer_generation: u64,
}

enum Cached {
	Valid(Token),
	Stale { epoch: u64 },
}
