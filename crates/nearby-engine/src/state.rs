//! State shared by the controller and the scheduler.
//!
//! `current` is the single request slot of the user: the active request, or
//! the last one that reached a terminal status. Short critical sections go
//! through the std mutexes; anything that awaits the store while deciding a
//! lifecycle transition holds `writer`.

use crate::events::RequestEvent;
use crate::generator::ResponseGenerator;
use crate::store::RequestStore;
use nearby_core::{EngineConfig, ProviderId, ProviderResponse, Request, RequestId, SessionContext};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;

/// A provider response whose persistence failed
#[derive(Debug, Clone)]
pub(crate) struct FailedCommit {
    pub(crate) request_id: RequestId,
    pub(crate) provider_id: ProviderId,
    pub(crate) response: ProviderResponse,
}

pub(crate) struct EngineState {
    pub(crate) context: SessionContext,
    pub(crate) config: EngineConfig,
    pub(crate) generator: ResponseGenerator,
    pub(crate) store: Arc<dyn RequestStore>,
    pub(crate) writer: tokio::sync::Mutex<()>,
    events: broadcast::Sender<RequestEvent>,
    current: Mutex<Option<Request>>,
    rng: Mutex<StdRng>,
    failed_commits: Mutex<Vec<FailedCommit>>,
    /// Requests whose resolution settled with failed commits
    awaiting_retry: Mutex<HashSet<RequestId>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl EngineState {
    pub(crate) fn new(
        context: SessionContext,
        config: EngineConfig,
        store: Arc<dyn RequestStore>,
    ) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let (events, _) = broadcast::channel(config.event_capacity);

        Self {
            context,
            generator: ResponseGenerator::from_config(&config),
            config,
            store,
            writer: tokio::sync::Mutex::new(()),
            events,
            current: Mutex::new(None),
            rng: Mutex::new(rng),
            failed_commits: Mutex::new(Vec::new()),
            awaiting_retry: Mutex::new(HashSet::new()),
        }
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<RequestEvent> {
        self.events.subscribe()
    }

    pub(crate) fn emit(&self, event: RequestEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    pub(crate) fn snapshot(&self) -> Option<Request> {
        lock(&self.current).clone()
    }

    pub(crate) fn with_current<T>(&self, f: impl FnOnce(&mut Option<Request>) -> T) -> T {
        f(&mut *lock(&self.current))
    }

    pub(crate) fn active_id(&self) -> Option<RequestId> {
        lock(&self.current)
            .as_ref()
            .filter(|r| r.is_active())
            .map(|r| r.id)
    }

    /// True while `request_id` is the active request and `provider_id` has not answered
    pub(crate) fn accepts(&self, request_id: RequestId, provider_id: &str) -> bool {
        lock(&self.current)
            .as_ref()
            .filter(|r| r.id == request_id && r.is_active())
            .and_then(|r| r.provider(provider_id))
            .map(|p| p.response.is_unset())
            .unwrap_or(false)
    }

    pub(crate) fn draw<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        f(&mut *lock(&self.rng))
    }

    pub(crate) fn record_failed(&self, failed: FailedCommit) {
        lock(&self.failed_commits).push(failed);
    }

    /// Remove and return the failed commits of `request_id`
    pub(crate) fn take_failed(&self, request_id: RequestId) -> Vec<FailedCommit> {
        let mut failed = lock(&self.failed_commits);
        let (taken, kept): (Vec<_>, Vec<_>) = failed.drain(..).partition(|f| f.request_id == request_id);
        *failed = kept;
        taken
    }

    pub(crate) fn has_failed(&self, request_id: RequestId) -> bool {
        lock(&self.failed_commits)
            .iter()
            .any(|f| f.request_id == request_id)
    }

    /// Forget bookkeeping that belongs to other requests
    pub(crate) fn retain_only(&self, request_id: RequestId) {
        lock(&self.failed_commits).retain(|f| f.request_id == request_id);
        lock(&self.awaiting_retry).retain(|id| *id == request_id);
    }

    pub(crate) fn mark_awaiting_retry(&self, request_id: RequestId) {
        lock(&self.awaiting_retry).insert(request_id);
    }

    pub(crate) fn clear_awaiting_retry(&self, request_id: RequestId) -> bool {
        lock(&self.awaiting_retry).remove(&request_id)
    }

    #[cfg(test)]
    pub(crate) fn is_awaiting_retry(&self, request_id: RequestId) -> bool {
        lock(&self.awaiting_retry).contains(&request_id)
    }
}
