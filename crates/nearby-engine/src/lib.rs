//! Nearby Engine: request lifecycle and provider response simulation
//!
//! A user broadcasts a request to nearby providers; each provider answers
//! (or doesn't) on its own schedule, and observers watch the answers land
//! one at a time.
//!
//! # Architecture
//!
//! ```text
//! RequestController ── create / cancel / refresh ──→ RequestStore
//!        │ observe                                         ↑
//!        ↓                                                 │
//!   request slot ←── commit ── ResponseScheduler ── persist┘
//!        │                          │
//!        │                   ResponseGenerator (rng)
//!        ↓
//!   broadcast<RequestEvent>
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use nearby_core::{EngineConfig, ProviderKind, SessionContext};
//! use nearby_engine::{InMemoryStore, RequestController};
//!
//! # async fn run(providers: Vec<nearby_core::Provider>) -> Result<(), nearby_core::NearbyError> {
//! let controller = RequestController::new(
//!     SessionContext::new("user-1"),
//!     EngineConfig::default(),
//!     Arc::new(InMemoryStore::new()),
//! )?;
//! let mut events = controller.subscribe();
//!
//! let request = controller.create("milk", ProviderKind::Product, &providers).await?;
//! assert!(request.providers.iter().all(|p| p.confirmed().is_none()));
//!
//! while let Ok(event) = events.recv().await {
//!     println!("{}: {:?}", event.name(), controller.observe().map(|r| r.tally()));
//! }
//! # Ok(())
//! # }
//! ```

pub mod controller;
pub mod events;
pub mod generator;
pub mod scheduler;
mod state;
pub mod store;

pub use controller::RequestController;
pub use events::{CommitStatus, RequestEvent, ResolutionSummary};
pub use generator::{messages_for, Outcome, ResponseGenerator, PRODUCT_MESSAGES, SERVICE_MESSAGES};
pub use scheduler::ResponseScheduler;
pub use store::{InMemoryStore, RequestStore};
