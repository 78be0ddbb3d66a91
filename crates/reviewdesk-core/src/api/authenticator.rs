//! Bearer-token attachment and refresh-and-replay for data requests.
//!
//! A 401 from a data endpoint triggers one shared refresh. The first request
//! to observe the 401 runs it; everyone else arriving while it is in flight
//! queues a waiter. When the refresh settles, every participant gets the same
//! outcome and replays at most once.

use std::sync::{Arc, Mutex, MutexGuard};

use serde::de::DeserializeOwned;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use super::request::{ApiRequest, ApiResponse, Transport};
use super::ApiError;
use crate::auth::SessionProvider;

type RefreshOutcome = Result<String, ApiError>;

/// The pending-refresh singleton.
enum RefreshSlot {
    Idle,
    InFlight(Vec<oneshot::Sender<RefreshOutcome>>),
}

enum Turn {
    Lead,
    Wait(oneshot::Receiver<RefreshOutcome>),
}

/// Held by the request running the refresh. Settling (or being dropped
/// mid-refresh) returns the slot to idle and wakes every waiter.
struct RefreshLease<'a> {
    slot: &'a Mutex<RefreshSlot>,
    settled: bool,
}

impl<'a> RefreshLease<'a> {
    fn new(slot: &'a Mutex<RefreshSlot>) -> Self {
        Self {
            slot,
            settled: false,
        }
    }

    fn settle(mut self, outcome: RefreshOutcome) -> RefreshOutcome {
        self.release(&outcome);
        self.settled = true;
        outcome
    }

    fn release(&mut self, outcome: &RefreshOutcome) {
        let waiters = match std::mem::replace(&mut *lock_slot(self.slot), RefreshSlot::Idle) {
            RefreshSlot::InFlight(waiters) => waiters,
            RefreshSlot::Idle => Vec::new(),
        };
        if !waiters.is_empty() {
            debug!(waiters = waiters.len(), "Waking requests queued behind refresh");
        }
        for waiter in waiters {
            // A waiter whose request was dropped no longer cares
            let _ = waiter.send(outcome.clone());
        }
    }
}

impl Drop for RefreshLease<'_> {
    fn drop(&mut self) {
        if !self.settled {
            warn!("Refresh abandoned before settling");
            self.release(&Err(ApiError::RefreshFailed("refresh cancelled".to_string())));
        }
    }
}

fn lock_slot(slot: &Mutex<RefreshSlot>) -> MutexGuard<'_, RefreshSlot> {
    slot.lock().unwrap_or_else(|e| e.into_inner())
}

pub struct RequestAuthenticator {
    transport: Arc<dyn Transport>,
    session: Arc<dyn SessionProvider>,
    refresh: Mutex<RefreshSlot>,
}

impl RequestAuthenticator {
    pub fn new(transport: Arc<dyn Transport>, session: Arc<dyn SessionProvider>) -> Self {
        Self {
            transport,
            session,
            refresh: Mutex::new(RefreshSlot::Idle),
        }
    }

    /// Send a request, returning the successful response or the classified
    /// error. Auth endpoints are passed straight through.
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        if request.is_auth_endpoint() {
            return self.transport.execute(request).await?.error_for_status();
        }

        let bearer = self.session.bearer_token();
        let response = self
            .transport
            .execute(request.clone().with_bearer(bearer))
            .await?;
        if response.status != 401 {
            return response.error_for_status();
        }

        debug!(path = %request.path, "Received 401, refreshing before replay");
        let token = self.refresh_coalesced().await?;
        self.transport
            .execute(request.with_bearer(Some(token)))
            .await?
            .error_for_status()
    }

    /// Send and decode the JSON body.
    pub async fn send_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        self.send(request).await?.json()
    }

    /// Refresh ahead of a request when the stored token is inside its expiry
    /// buffer. Shares the in-flight refresh with reactive retries.
    pub async fn ensure_fresh(&self) -> Result<(), ApiError> {
        if self.session.needs_refresh() {
            debug!("Token inside expiry buffer, refreshing proactively");
            self.refresh_coalesced().await?;
        }
        Ok(())
    }

    async fn refresh_coalesced(&self) -> RefreshOutcome {
        let turn = {
            let mut slot = lock_slot(&self.refresh);
            match &mut *slot {
                RefreshSlot::Idle => {
                    *slot = RefreshSlot::InFlight(Vec::new());
                    Turn::Lead
                }
                RefreshSlot::InFlight(waiters) => {
                    let (tx, rx) = oneshot::channel();
                    waiters.push(tx);
                    Turn::Wait(rx)
                }
            }
        };

        match turn {
            Turn::Lead => {
                let lease = RefreshLease::new(&self.refresh);
                let outcome = self.session.refresh_access_token().await;
                lease.settle(outcome)
            }
            Turn::Wait(rx) => rx
                .await
                .unwrap_or_else(|_| Err(ApiError::RefreshFailed("refresh abandoned".to_string()))),
        }
    }
}
