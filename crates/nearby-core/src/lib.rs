//! Nearby Core: data model, error taxonomy and engine configuration
//!
//! Shared by the directory, the request engine and the HTTP surface.

pub mod config;
pub mod context;
pub mod data_model;
pub mod error;

pub use config::EngineConfig;
pub use context::SessionContext;
pub use data_model::{
    GeoPoint, NewRequest, Provider, ProviderId, ProviderKind, ProviderResponse, Request,
    RequestId, RequestStatus, ResponseTally,
};
pub use error::{NearbyError, PersistenceError};
