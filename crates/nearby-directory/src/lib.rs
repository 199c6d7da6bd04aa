//! Nearby Directory: who can fulfill a query
//!
//! The directory is an external collaborator of the request engine. This
//! crate defines its interface, a YAML-backed in-memory implementation and
//! the search helpers the client layers on top:
//!
//! ```text
//! query → classify → direct search ──(empty)──→ category search → rank by rating
//! ```
//!
//! # Example
//!
//! ```
//! use nearby_directory::{find_providers, InMemoryDirectory};
//! use nearby_core::ProviderKind;
//!
//! let directory = InMemoryDirectory::seeded().unwrap();
//! let rt = tokio::runtime::Runtime::new().unwrap();
//! let outcome = rt.block_on(find_providers(&directory, "milk")).unwrap();
//!
//! assert_eq!(outcome.kind, ProviderKind::Product);
//! assert_eq!(outcome.category, "grocery");
//! assert_eq!(outcome.providers[0].name, "Quick Mart");
//! ```

pub mod classify;
pub mod directory;
pub mod history;

pub use classify::{category_for, classify};
pub use directory::{find_providers, CatalogItem, InMemoryDirectory, ProviderDirectory, SearchOutcome};
pub use history::{SearchHistory, SearchHistoryEntry};
