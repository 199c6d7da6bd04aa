//! Provider Directory: lookup of providers for a query
use crate::classify::{category_for, classify, words};
use async_trait::async_trait;
use nearby_core::{NearbyError, Provider, ProviderKind};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;

static SEED: &str = include_str!("../data/directory.yaml");

/// External lookup of providers. Results carry no response overlay.
#[async_trait]
pub trait ProviderDirectory: Send + Sync {
    /// Direct search on the query text
    async fn search(&self, query: &str) -> Result<Vec<Provider>, NearbyError>;

    /// Providers whose category equals `category`
    async fn search_by_category(&self, category: &str) -> Result<Vec<Provider>, NearbyError>;
}

/// Result of a provider search, ranked highest rating first
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub query: String,
    #[serde(rename = "type")]
    pub kind: ProviderKind,
    pub category: String,
    pub providers: Vec<Provider>,
}

/// Direct search, falling back to a category search on the lowercased query.
pub async fn find_providers(
    directory: &dyn ProviderDirectory,
    query: &str,
) -> Result<SearchOutcome, NearbyError> {
    let query = query.trim();
    if query.is_empty() {
        return Err(NearbyError::Validation("query is empty".to_string()));
    }

    let kind = classify(query);
    let mut providers = directory.search(query).await?;
    if providers.is_empty() {
        let category = query.to_lowercase();
        tracing::debug!(query, category = %category, "no direct matches, searching by category");
        providers = directory.search_by_category(&category).await?;
    }

    providers.sort_by(|a, b| b.rating.partial_cmp(&a.rating).unwrap_or(Ordering::Equal));
    tracing::info!(query, kind = %kind, found = providers.len(), "provider search finished");

    Ok(SearchOutcome {
        query: query.to_string(),
        kind,
        category: category_for(kind).to_string(),
        providers,
    })
}

/// A catalog entry linking a product name to the providers that carry it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogItem {
    pub name: String,
    pub providers: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct DirectoryFile {
    providers: Vec<Provider>,
    #[serde(default)]
    catalog: Vec<CatalogItem>,
}

/// Directory held in memory, loaded from YAML.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDirectory {
    providers: Vec<Provider>,
    catalog: Vec<CatalogItem>,
}

impl InMemoryDirectory {
    pub fn new(providers: Vec<Provider>, catalog: Vec<CatalogItem>) -> Result<Self, NearbyError> {
        let known: HashSet<&str> = providers.iter().map(|p| p.id.as_str()).collect();
        for item in &catalog {
            if let Some(missing) = item.providers.iter().find(|id| !known.contains(id.as_str())) {
                return Err(NearbyError::Directory(format!(
                    "catalog item '{}' references unknown provider '{}'",
                    item.name, missing
                )));
            }
        }
        Ok(Self { providers, catalog })
    }

    /// The bundled San Francisco demo directory
    pub fn seeded() -> Result<Self, NearbyError> {
        Self::from_yaml(SEED)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, NearbyError> {
        let file: DirectoryFile =
            serde_yaml::from_str(yaml).map_err(|e| NearbyError::Directory(e.to_string()))?;
        Self::new(file.providers, file.catalog)
    }

    pub fn providers(&self) -> &[Provider] {
        &self.providers
    }

    fn matches(name: &str, terms: &[String]) -> bool {
        let name = name.to_lowercase();
        terms.iter().any(|t| name.contains(t.as_str()))
    }

    fn search_terms(query: &str) -> Vec<String> {
        words(query).into_iter().filter(|w| w.len() > 1).collect()
    }
}

#[async_trait]
impl ProviderDirectory for InMemoryDirectory {
    async fn search(&self, query: &str) -> Result<Vec<Provider>, NearbyError> {
        let terms = Self::search_terms(query);
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        // Products first: providers stocking a matching catalog item
        let stocked: HashSet<&str> = self
            .catalog
            .iter()
            .filter(|item| Self::matches(&item.name, &terms))
            .flat_map(|item| item.providers.iter().map(String::as_str))
            .collect();
        if !stocked.is_empty() {
            return Ok(self
                .providers
                .iter()
                .filter(|p| stocked.contains(p.id.as_str()))
                .cloned()
                .collect());
        }

        Ok(self
            .providers
            .iter()
            .filter(|p| Self::matches(&p.name, &terms))
            .cloned()
            .collect())
    }

    async fn search_by_category(&self, category: &str) -> Result<Vec<Provider>, NearbyError> {
        Ok(self
            .providers
            .iter()
            .filter(|p| p.category == category)
            .cloned()
            .collect())
    }
}
