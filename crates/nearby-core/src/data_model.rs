//! Data Model: Provider, Request and the per-request response overlay
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identity of a request, assigned by the persistence collaborator.
pub type RequestId = Uuid;

/// Identity of a provider in the directory (ex: "provider-1").
pub type ProviderId = String;

/// What a provider fulfills, and what a request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Product,
    Service,
}

impl ProviderKind {
    /// Category recorded on requests of this kind
    pub fn default_category(&self) -> &'static str {
        match self {
            ProviderKind::Product => "grocery",
            ProviderKind::Service => "service",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ProviderKind::Product => write!(f, "product"),
            ProviderKind::Service => write!(f, "service"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// Response overlay of a provider inside one request.
///
/// `Unset` covers both "no answer yet" and "never answered"; a rejection is
/// always explicit.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ProviderResponse {
    #[default]
    Unset,
    Confirmed {
        message: String,
    },
    Rejected,
}

impl ProviderResponse {
    pub fn is_unset(&self) -> bool {
        matches!(self, ProviderResponse::Unset)
    }

    /// Label used in events, logs and metrics
    pub fn label(&self) -> &'static str {
        match self {
            ProviderResponse::Unset => "unset",
            ProviderResponse::Confirmed { .. } => "confirmed",
            ProviderResponse::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provider {
    pub id: ProviderId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ProviderKind,
    pub category: String,
    /// 0.0 to 5.0
    pub rating: f64,
    /// Kilometers from the user
    pub distance: f64,
    pub location: GeoPoint,
    pub address: String,
    pub phone: String,
    #[serde(default)]
    pub response: ProviderResponse,
}

impl Provider {
    /// Per-request copy with the overlay reset.
    pub fn snapshot(&self) -> Provider {
        Provider {
            response: ProviderResponse::Unset,
            ..self.clone()
        }
    }

    /// `None` while the provider has not answered
    pub fn confirmed(&self) -> Option<bool> {
        match self.response {
            ProviderResponse::Unset => None,
            ProviderResponse::Confirmed { .. } => Some(true),
            ProviderResponse::Rejected => Some(false),
        }
    }

    pub fn confirmation_message(&self) -> Option<&str> {
        match &self.response {
            ProviderResponse::Confirmed { message } => Some(message),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Active,
    Completed,
    Cancelled,
}

impl RequestStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestStatus::Completed | RequestStatus::Cancelled)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RequestStatus::Pending => write!(f, "pending"),
            RequestStatus::Active => write!(f, "active"),
            RequestStatus::Completed => write!(f, "completed"),
            RequestStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Fields handed to the persistence collaborator when a request is created
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRequest {
    pub user_id: String,
    pub query: String,
    pub category: String,
    #[serde(rename = "type")]
    pub kind: ProviderKind,
    pub timestamp: DateTime<Utc>,
}

/// A broadcast asking a set of providers to confirm fulfillment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub id: RequestId,
    pub user_id: String,
    pub query: String,
    pub category: String,
    #[serde(rename = "type")]
    pub kind: ProviderKind,
    pub timestamp: DateTime<Utc>,
    pub status: RequestStatus,
    /// Snapshots, in the order the directory ranked them
    pub providers: Vec<Provider>,
}

impl Request {
    pub fn is_active(&self) -> bool {
        self.status == RequestStatus::Active
    }

    pub fn provider(&self, provider_id: &str) -> Option<&Provider> {
        self.providers.iter().find(|p| p.id == provider_id)
    }

    pub fn provider_mut(&mut self, provider_id: &str) -> Option<&mut Provider> {
        self.providers.iter_mut().find(|p| p.id == provider_id)
    }

    /// Current counts of the response overlay
    pub fn tally(&self) -> ResponseTally {
        self.providers
            .iter()
            .fold(ResponseTally::default(), |mut tally, p| {
                match p.response {
                    ProviderResponse::Unset => tally.unset += 1,
                    ProviderResponse::Confirmed { .. } => tally.confirmed += 1,
                    ProviderResponse::Rejected => tally.rejected += 1,
                }
                tally
            })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseTally {
    pub confirmed: usize,
    pub rejected: usize,
    pub unset: usize,
}
