//! Change notifications emitted while a request lives
use nearby_core::{NearbyError, ProviderId, ProviderResponse, RequestId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RequestEvent {
    /// A new request became active
    Created {
        request_id: RequestId,
        providers: usize,
    },
    /// An active request was picked up again from the store
    Restored {
        request_id: RequestId,
        unanswered: usize,
    },
    /// One provider's response was committed
    ProviderResponded {
        request_id: RequestId,
        provider_id: ProviderId,
        response: ProviderResponse,
    },
    /// Persisting a provider's response failed; retried on the next refresh
    CommitFailed {
        request_id: RequestId,
        provider_id: ProviderId,
        error: String,
    },
    Cancelled {
        request_id: RequestId,
    },
    Completed {
        request_id: RequestId,
    },
    /// Every provider task of a resolution round has settled
    Settled {
        request_id: RequestId,
        summary: ResolutionSummary,
    },
}

impl RequestEvent {
    pub fn name(&self) -> &'static str {
        match self {
            RequestEvent::Created { .. } => "created",
            RequestEvent::Restored { .. } => "restored",
            RequestEvent::ProviderResponded { .. } => "provider_responded",
            RequestEvent::CommitFailed { .. } => "commit_failed",
            RequestEvent::Cancelled { .. } => "cancelled",
            RequestEvent::Completed { .. } => "completed",
            RequestEvent::Settled { .. } => "settled",
        }
    }

    pub fn request_id(&self) -> RequestId {
        match self {
            RequestEvent::Created { request_id, .. }
            | RequestEvent::Restored { request_id, .. }
            | RequestEvent::ProviderResponded { request_id, .. }
            | RequestEvent::CommitFailed { request_id, .. }
            | RequestEvent::Cancelled { request_id }
            | RequestEvent::Completed { request_id }
            | RequestEvent::Settled { request_id, .. } => *request_id,
        }
    }
}

/// What happened to a single provider's scheduled response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitStatus {
    Confirmed,
    Rejected,
    /// The provider never answered; nothing was written
    NoResponse,
    /// The request was no longer active, or the provider had already answered
    Suppressed,
    /// The persistence write failed; the provider stays unset
    Failed,
}

impl From<&ProviderResponse> for CommitStatus {
    fn from(response: &ProviderResponse) -> Self {
        match response {
            ProviderResponse::Confirmed { .. } => CommitStatus::Confirmed,
            ProviderResponse::Rejected => CommitStatus::Rejected,
            ProviderResponse::Unset => CommitStatus::NoResponse,
        }
    }
}

/// Aggregate of one resolution round.
///
/// Only `confirmed` and `rejected` count as answers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionSummary {
    pub confirmed: usize,
    pub rejected: usize,
    pub no_response: usize,
    pub suppressed: usize,
    pub failed: usize,
}

impl ResolutionSummary {
    pub fn record(&mut self, status: CommitStatus) {
        match status {
            CommitStatus::Confirmed => self.confirmed += 1,
            CommitStatus::Rejected => self.rejected += 1,
            CommitStatus::NoResponse => self.no_response += 1,
            CommitStatus::Suppressed => self.suppressed += 1,
            CommitStatus::Failed => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.confirmed + self.rejected + self.no_response + self.suppressed + self.failed
    }

    pub fn partial_failure(&self) -> Option<NearbyError> {
        (self.failed > 0).then(|| NearbyError::PartialCommitFailure {
            failed: self.failed,
            total: self.total(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_summary_counts() {
        let mut summary = ResolutionSummary::default();
        for status in [
            CommitStatus::Confirmed,
            CommitStatus::Confirmed,
            CommitStatus::Rejected,
            CommitStatus::NoResponse,
            CommitStatus::Suppressed,
        ] {
            summary.record(status);
        }

        assert_eq!(summary.confirmed, 2);
        assert_eq!(summary.rejected, 1);
        assert_eq!(summary.total(), 5);
        assert!(summary.partial_failure().is_none());
    }

    #[test]
    fn test_partial_failure() {
        let mut summary = ResolutionSummary::default();
        summary.record(CommitStatus::Confirmed);
        summary.record(CommitStatus::Failed);

        assert_eq!(
            summary.partial_failure(),
            Some(NearbyError::PartialCommitFailure { failed: 1, total: 2 })
        );
    }

    #[test]
    fn test_event_json_is_tagged() {
        let event = RequestEvent::Cancelled {
            request_id: Uuid::nil(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "cancelled");
        assert_eq!(event.name(), "cancelled");
        assert_eq!(event.request_id(), Uuid::nil());
    }
}
