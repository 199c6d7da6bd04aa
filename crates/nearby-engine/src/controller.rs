//! Request Lifecycle Controller
//!
//! One controller per logged-in user, holding a single request slot:
//!
//! ```text
//! NONE ──create──→ ACTIVE ──cancel──→ CANCELLED ──create──→ ACTIVE ...
//!                    │
//!                    └──all providers settled──→ COMPLETED ──create──→ ACTIVE ...
//! ```
//!
//! `create`, `cancel` and `refresh` are serialized by the writer guard, so
//! two overlapping calls can never leave two requests active.

use crate::events::RequestEvent;
use crate::scheduler::ResponseScheduler;
use crate::state::EngineState;
use crate::store::RequestStore;
use chrono::Utc;
use nearby_core::{
    EngineConfig, NearbyError, NewRequest, Provider, ProviderKind, Request, RequestId,
    RequestStatus, SessionContext,
};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn};

pub struct RequestController {
    state: Arc<EngineState>,
    scheduler: ResponseScheduler,
}

impl RequestController {
    pub fn new(
        context: SessionContext,
        config: EngineConfig,
        store: Arc<dyn RequestStore>,
    ) -> Result<Self, NearbyError> {
        config.validate()?;
        let state = Arc::new(EngineState::new(context, config, store));
        Ok(Self {
            scheduler: ResponseScheduler::new(state.clone()),
            state,
        })
    }

    pub fn user_id(&self) -> &str {
        &self.state.context.user_id
    }

    pub fn config(&self) -> &EngineConfig {
        &self.state.config
    }

    pub fn scheduler(&self) -> &ResponseScheduler {
        &self.scheduler
    }

    /// Change notifications for every request this controller drives
    pub fn subscribe(&self) -> broadcast::Receiver<RequestEvent> {
        self.state.subscribe()
    }

    /// The held request with every committed response, or `None` before the first `create`
    pub fn observe(&self) -> Option<Request> {
        self.state.snapshot()
    }

    pub fn active_request_id(&self) -> Option<RequestId> {
        self.state.active_id()
    }

    /// Broadcast a new request for `query` to `providers`.
    ///
    /// A request that is still active is cancelled first. Returns as soon as
    /// the request is persisted; providers answer later.
    pub async fn create(
        &self,
        query: &str,
        kind: ProviderKind,
        providers: &[Provider],
    ) -> Result<Request, NearbyError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(NearbyError::Validation("query is empty".to_string()));
        }
        if providers.is_empty() {
            return Err(NearbyError::Validation("no providers to ask".to_string()));
        }

        let _writer = self.state.writer.lock().await;

        if let Some(previous) = self.state.active_id() {
            info!(request_id = %previous, "finalizing previous request");
            self.mark_cancelled(previous).await?;
        }

        let fields = NewRequest {
            user_id: self.state.context.user_id.clone(),
            query: query.to_string(),
            category: kind.default_category().to_string(),
            kind,
            timestamp: Utc::now(),
        };
        let request_id = self.state.store.create_request(&fields).await?;

        let mut seen = HashSet::new();
        let snapshots: Vec<Provider> = providers
            .iter()
            .filter(|p| seen.insert(p.id.clone()))
            .map(Provider::snapshot)
            .collect();
        if let Err(e) = self.state.store.attach_providers(request_id, &snapshots).await {
            // The request row exists; carry on with the in-memory snapshots
            warn!(request_id = %request_id, error = %e, "failed to attach providers");
        }

        let request = Request {
            id: request_id,
            user_id: fields.user_id,
            query: fields.query,
            category: fields.category,
            kind,
            timestamp: fields.timestamp,
            status: RequestStatus::Active,
            providers: snapshots,
        };
        self.state.with_current(|current| *current = Some(request.clone()));
        self.state.retain_only(request_id);

        info!(
            request_id = %request_id,
            trace_id = %self.state.context.trace_id,
            query,
            providers = request.providers.len(),
            "request created"
        );
        self.state.emit(RequestEvent::Created {
            request_id,
            providers: request.providers.len(),
        });
        self.scheduler.schedule(&request);

        Ok(request)
    }

    /// Cancel the active request. Responses still in flight are dropped.
    pub async fn cancel(&self) -> Result<Request, NearbyError> {
        let _writer = self.state.writer.lock().await;

        let request_id = self.state.active_id().ok_or(NearbyError::NoActiveRequest)?;
        self.mark_cancelled(request_id).await?;
        self.state.snapshot().ok_or(NearbyError::NoActiveRequest)
    }

    /// Manual refresh.
    ///
    /// Without an active request, adopts the user's active request from the
    /// store and resumes resolution of its unanswered providers. With one,
    /// retries each provider response that previously failed to persist.
    pub async fn refresh(&self) -> Result<Option<Request>, NearbyError> {
        let _writer = self.state.writer.lock().await;

        match self.state.active_id() {
            None => self.restore().await?,
            Some(request_id) => self.retry_failed(request_id).await,
        }
        Ok(self.state.snapshot())
    }

    async fn restore(&self) -> Result<(), NearbyError> {
        let user_id = &self.state.context.user_id;
        let Some(request) = self.state.store.fetch_active_request(user_id).await? else {
            return Ok(());
        };

        let unanswered = request.tally().unset;
        info!(request_id = %request.id, unanswered, "restored active request");
        self.state.with_current(|current| *current = Some(request.clone()));
        self.state.retain_only(request.id);
        self.state.emit(RequestEvent::Restored {
            request_id: request.id,
            unanswered,
        });
        self.scheduler.schedule(&request);
        Ok(())
    }

    async fn retry_failed(&self, request_id: RequestId) {
        let failed = self.state.take_failed(request_id);
        if !failed.is_empty() {
            info!(request_id = %request_id, retries = failed.len(), "retrying failed commits");
        }
        for commit in failed {
            self.scheduler
                .deliver(commit.request_id, &commit.provider_id, commit.response)
                .await;
        }

        // Completion was held back for the failed commits
        if !self.state.has_failed(request_id) && self.state.clear_awaiting_retry(request_id) {
            self.scheduler.complete(request_id).await;
        }
    }

    /// Persist and apply the cancellation. The caller holds the writer guard.
    async fn mark_cancelled(&self, request_id: RequestId) -> Result<(), NearbyError> {
        self.state
            .store
            .update_request_status(request_id, RequestStatus::Cancelled)
            .await?;

        self.state.with_current(|current| {
            if let Some(request) = current.as_mut().filter(|r| r.id == request_id) {
                request.status = RequestStatus::Cancelled;
            }
        });
        info!(request_id = %request_id, "request cancelled");
        self.state.emit(RequestEvent::Cancelled { request_id });
        Ok(())
    }
}
