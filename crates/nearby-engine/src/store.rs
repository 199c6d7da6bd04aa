//! Persistence collaborator for request durability
//!
//! Every call is treated as a fallible remote operation. The engine never
//! mutates its in-memory request on a failed write.

use async_trait::async_trait;
use nearby_core::{
    NewRequest, PersistenceError, Provider, ProviderResponse, Request, RequestId, RequestStatus,
};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use uuid::Uuid;

#[async_trait]
pub trait RequestStore: Send + Sync {
    /// Persist a new active request and return its identity
    async fn create_request(&self, fields: &NewRequest) -> Result<RequestId, PersistenceError>;

    /// Link the provider snapshots a request was sent to
    async fn attach_providers(
        &self,
        request_id: RequestId,
        providers: &[Provider],
    ) -> Result<(), PersistenceError>;

    async fn update_provider_response(
        &self,
        request_id: RequestId,
        provider_id: &str,
        response: &ProviderResponse,
    ) -> Result<(), PersistenceError>;

    async fn update_request_status(
        &self,
        request_id: RequestId,
        status: RequestStatus,
    ) -> Result<(), PersistenceError>;

    /// The user's newest active request, if any
    async fn fetch_active_request(&self, user_id: &str) -> Result<Option<Request>, PersistenceError>;
}

/// Store kept in process memory
#[derive(Default)]
pub struct InMemoryStore {
    requests: Mutex<HashMap<RequestId, Request>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of a stored request
    pub fn request(&self, request_id: RequestId) -> Option<Request> {
        self.lock().get(&request_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Number of stored requests in `status` for `user_id`
    pub fn count_with_status(&self, user_id: &str, status: RequestStatus) -> usize {
        self.lock()
            .values()
            .filter(|r| r.user_id == user_id && r.status == status)
            .count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<RequestId, Request>> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_request<T>(
        &self,
        operation: &'static str,
        request_id: RequestId,
        f: impl FnOnce(&mut Request) -> Result<T, PersistenceError>,
    ) -> Result<T, PersistenceError> {
        let mut requests = self.lock();
        let request = requests.get_mut(&request_id).ok_or_else(|| {
            PersistenceError::new(operation, format!("request {} not found", request_id))
        })?;
        f(request)
    }
}

#[async_trait]
impl RequestStore for InMemoryStore {
    async fn create_request(&self, fields: &NewRequest) -> Result<RequestId, PersistenceError> {
        let id = Uuid::new_v4();
        let request = Request {
            id,
            user_id: fields.user_id.clone(),
            query: fields.query.clone(),
            category: fields.category.clone(),
            kind: fields.kind,
            timestamp: fields.timestamp,
            status: RequestStatus::Active,
            providers: Vec::new(),
        };
        self.lock().insert(id, request);
        Ok(id)
    }

    async fn attach_providers(
        &self,
        request_id: RequestId,
        providers: &[Provider],
    ) -> Result<(), PersistenceError> {
        self.with_request("attach_providers", request_id, |request| {
            request.providers.extend(providers.iter().cloned());
            Ok(())
        })
    }

    async fn update_provider_response(
        &self,
        request_id: RequestId,
        provider_id: &str,
        response: &ProviderResponse,
    ) -> Result<(), PersistenceError> {
        self.with_request("update_provider_response", request_id, |request| {
            let provider = request.provider_mut(provider_id).ok_or_else(|| {
                PersistenceError::new(
                    "update_provider_response",
                    format!("provider {} not attached to request {}", provider_id, request_id),
                )
            })?;
            provider.response = response.clone();
            Ok(())
        })
    }

    async fn update_request_status(
        &self,
        request_id: RequestId,
        status: RequestStatus,
    ) -> Result<(), PersistenceError> {
        self.with_request("update_request_status", request_id, |request| {
            request.status = status;
            Ok(())
        })
    }

    async fn fetch_active_request(&self, user_id: &str) -> Result<Option<Request>, PersistenceError> {
        Ok(self
            .lock()
            .values()
            .filter(|r| r.user_id == user_id && r.status == RequestStatus::Active)
            .max_by_key(|r| r.timestamp)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use nearby_core::{GeoPoint, ProviderKind};

    fn fields(user_id: &str) -> NewRequest {
        NewRequest {
            user_id: user_id.to_string(),
            query: "milk".to_string(),
            category: "grocery".to_string(),
            kind: ProviderKind::Product,
            timestamp: Utc::now(),
        }
    }

    fn provider(id: &str) -> Provider {
        Provider {
            id: id.to_string(),
            name: "Corner Store".to_string(),
            kind: ProviderKind::Product,
            category: "grocery".to_string(),
            rating: 3.9,
            distance: 1.8,
            location: GeoPoint { lat: 37.77, lng: -122.413 },
            address: "789 Howard St, San Francisco, CA".to_string(),
            phone: "+1234567893".to_string(),
            response: ProviderResponse::Unset,
        }
    }

    #[tokio::test]
    async fn test_round_trip_through_store() {
        let store = InMemoryStore::new();
        let id = store.create_request(&fields("user-1")).await.unwrap();
        store.attach_providers(id, &[provider("provider-3")]).await.unwrap();
        store
            .update_provider_response(id, "provider-3", &ProviderResponse::Rejected)
            .await
            .unwrap();

        let active = store.fetch_active_request("user-1").await.unwrap().unwrap();
        assert_eq!(active.id, id);
        assert_eq!(active.providers[0].confirmed(), Some(false));
        assert!(store.fetch_active_request("user-2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_terminal_requests_are_not_active() {
        let store = InMemoryStore::new();
        let id = store.create_request(&fields("user-1")).await.unwrap();
        store.update_request_status(id, RequestStatus::Cancelled).await.unwrap();

        assert!(store.fetch_active_request("user-1").await.unwrap().is_none());
        assert_eq!(store.count_with_status("user-1", RequestStatus::Cancelled), 1);
    }

    #[tokio::test]
    async fn test_unknown_ids_fail() {
        let store = InMemoryStore::new();
        let err = store
            .update_request_status(Uuid::new_v4(), RequestStatus::Completed)
            .await
            .unwrap_err();
        assert_eq!(err.operation, "update_request_status");

        let id = store.create_request(&fields("user-1")).await.unwrap();
        let err = store
            .update_provider_response(id, "provider-9", &ProviderResponse::Rejected)
            .await
            .unwrap_err();
        assert_eq!(err.operation, "update_provider_response");
    }
}
