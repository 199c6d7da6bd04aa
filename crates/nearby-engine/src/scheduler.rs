//! Response Scheduler: fan-out / fan-in of provider responses
//!
//! ```text
//!            initial delay
//! create ───────────────────→ draw outcome + delay per provider
//!                                 │        │        │
//!                              commit   commit   commit     (any order)
//!                                 └────────┼────────┘
//!                                        settle → Completed? → Settled{summary}
//! ```
//!
//! Timers are never aborted. A commit re-checks the request when it fires
//! and does nothing unless the request is still active and the provider has
//! not answered yet.

use crate::events::{CommitStatus, RequestEvent, ResolutionSummary};
use crate::generator::Outcome;
use crate::state::{EngineState, FailedCommit};
use nearby_core::{ProviderId, ProviderKind, ProviderResponse, Request, RequestId, RequestStatus};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

#[derive(Clone)]
pub struct ResponseScheduler {
    state: Arc<EngineState>,
}

impl ResponseScheduler {
    pub(crate) fn new(state: Arc<EngineState>) -> Self {
        Self { state }
    }

    /// Start resolving every provider of `request` that has not answered.
    pub(crate) fn schedule(&self, request: &Request) -> JoinHandle<ResolutionSummary> {
        let scheduler = self.clone();
        let request_id = request.id;
        let kind = request.kind;
        let pending: Vec<ProviderId> = request
            .providers
            .iter()
            .filter(|p| p.response.is_unset())
            .map(|p| p.id.clone())
            .collect();

        debug!(request_id = %request_id, providers = pending.len(), "scheduling resolution");
        tokio::spawn(async move { scheduler.resolve(request_id, kind, pending).await })
    }

    async fn resolve(
        self,
        request_id: RequestId,
        kind: ProviderKind,
        pending: Vec<ProviderId>,
    ) -> ResolutionSummary {
        tokio::time::sleep(self.state.config.initial_delay()).await;

        let (min, max) = (
            self.state.config.min_response_delay_ms,
            self.state.config.max_response_delay_ms,
        );
        let mut tasks = JoinSet::new();
        for provider_id in pending {
            let (outcome, delay_ms) = self.state.draw(|rng| {
                let outcome = self.state.generator.generate(kind, rng);
                (outcome, rng.gen_range(min..=max))
            });
            let scheduler = self.clone();
            tasks.spawn(async move {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                scheduler.commit(request_id, &provider_id, outcome).await
            });
        }

        let mut summary = ResolutionSummary::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(status) => summary.record(status),
                Err(e) => {
                    warn!(request_id = %request_id, error = %e, "provider task did not finish");
                    summary.record(CommitStatus::Failed);
                }
            }
        }

        self.settle(request_id, summary).await;
        summary
    }

    /// Deliver one provider's outcome for `request_id`.
    ///
    /// Suppressed when the request is no longer active or the provider has
    /// already answered. A failed write leaves the provider unset and is kept
    /// for the next refresh.
    pub async fn commit(
        &self,
        request_id: RequestId,
        provider_id: &str,
        outcome: Outcome,
    ) -> CommitStatus {
        if !self.state.accepts(request_id, provider_id) {
            debug!(request_id = %request_id, provider_id, "commit suppressed");
            return CommitStatus::Suppressed;
        }

        match outcome.into_response() {
            Some(response) => self.deliver(request_id, provider_id, response).await,
            None => {
                debug!(request_id = %request_id, provider_id, "provider did not respond");
                CommitStatus::NoResponse
            }
        }
    }

    /// Persist `response`, then apply it to the held request.
    ///
    /// The write happens before the in-memory check, so a cancel landing
    /// while it is in flight leaves the stored request with a response the
    /// held request never shows.
    pub(crate) async fn deliver(
        &self,
        request_id: RequestId,
        provider_id: &str,
        response: ProviderResponse,
    ) -> CommitStatus {
        if !self.state.accepts(request_id, provider_id) {
            debug!(request_id = %request_id, provider_id, "commit suppressed");
            return CommitStatus::Suppressed;
        }

        if let Err(e) = self
            .state
            .store
            .update_provider_response(request_id, provider_id, &response)
            .await
        {
            warn!(request_id = %request_id, provider_id, error = %e, "failed to persist provider response");
            self.state.record_failed(FailedCommit {
                request_id,
                provider_id: provider_id.to_string(),
                response,
            });
            self.state.emit(RequestEvent::CommitFailed {
                request_id,
                provider_id: provider_id.to_string(),
                error: e.to_string(),
            });
            return CommitStatus::Failed;
        }

        // The request may have been cancelled while the write was in flight
        let applied = self.state.with_current(|current| {
            let Some(request) = current.as_mut().filter(|r| r.id == request_id && r.is_active())
            else {
                return false;
            };
            match request.provider_mut(provider_id) {
                Some(provider) if provider.response.is_unset() => {
                    provider.response = response.clone();
                    true
                }
                _ => false,
            }
        });
        if !applied {
            debug!(request_id = %request_id, provider_id, "commit suppressed after write");
            return CommitStatus::Suppressed;
        }

        info!(request_id = %request_id, provider_id, response = response.label(), "provider responded");
        let status = CommitStatus::from(&response);
        self.state.emit(RequestEvent::ProviderResponded {
            request_id,
            provider_id: provider_id.to_string(),
            response,
        });
        status
    }

    async fn settle(&self, request_id: RequestId, summary: ResolutionSummary) {
        let _writer = self.state.writer.lock().await;

        if let Some(err) = summary.partial_failure() {
            warn!(request_id = %request_id, error = %err, "resolution settled with failed commits");
        }

        // A refresh may already have retried this round's failures
        if !self.state.has_failed(request_id) {
            self.complete(request_id).await;
        } else if self.state.active_id() == Some(request_id) {
            self.state.mark_awaiting_retry(request_id);
        }

        info!(
            request_id = %request_id,
            confirmed = summary.confirmed,
            rejected = summary.rejected,
            "resolution settled"
        );
        self.state.emit(RequestEvent::Settled {
            request_id,
            summary,
        });
    }

    /// Move `request_id` from active to completed. The caller holds the writer guard.
    pub(crate) async fn complete(&self, request_id: RequestId) -> bool {
        if self.state.active_id() != Some(request_id) {
            return false;
        }

        if let Err(e) = self
            .state
            .store
            .update_request_status(request_id, RequestStatus::Completed)
            .await
        {
            warn!(request_id = %request_id, error = %e, "failed to persist completion");
            return false;
        }

        self.state.with_current(|current| {
            if let Some(request) = current.as_mut().filter(|r| r.id == request_id) {
                request.status = RequestStatus::Completed;
            }
        });
        info!(request_id = %request_id, "request completed");
        self.state.emit(RequestEvent::Completed { request_id });
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use nearby_core::{EngineConfig, SessionContext};

    fn scheduler() -> ResponseScheduler {
        let config = EngineConfig {
            seed: Some(1),
            ..Default::default()
        };
        let state = EngineState::new(SessionContext::new("user-1"), config, Arc::new(InMemoryStore::new()));
        ResponseScheduler::new(Arc::new(state))
    }

    #[tokio::test]
    async fn test_stale_round_is_not_held_for_retry() {
        let scheduler = scheduler();
        let stale = RequestId::new_v4();
        scheduler.state.record_failed(FailedCommit {
            request_id: stale,
            provider_id: "provider-1".to_string(),
            response: ProviderResponse::Rejected,
        });

        let summary = ResolutionSummary {
            failed: 1,
            ..Default::default()
        };
        scheduler.settle(stale, summary).await;

        assert!(!scheduler.state.is_awaiting_retry(stale));
        assert!(scheduler.state.snapshot().is_none());
    }
}
