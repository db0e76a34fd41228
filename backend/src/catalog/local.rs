//! In-memory catalog for tests and offline runs.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use super::{CatalogRecord, CatalogService};
use crate::error::ResolutionError;

#[derive(Default)]
struct LocalCatalogData {
    records: HashMap<String, Vec<CatalogRecord>>,
    queries: Vec<String>,
    failure: Option<String>,
}

/// Catalog answering from a fixed table, keyed by normalized name.
///
/// Names match case-insensitively with runs of whitespace collapsed, so
/// `hd  1234` finds `HD 1234`.
#[derive(Clone, Default)]
pub struct LocalCatalog {
    data: Arc<RwLock<LocalCatalogData>>,
}

fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

impl LocalCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the records returned for `name`.
    pub fn insert(&self, name: &str, records: Vec<CatalogRecord>) {
        let mut data = self.data.write().unwrap_or_else(|e| e.into_inner());
        data.records.insert(normalize_name(name), records);
    }

    /// Make every following query fail with `message`.
    pub fn set_failure(&self, message: Option<&str>) {
        let mut data = self.data.write().unwrap_or_else(|e| e.into_inner());
        data.failure = message.map(str::to_string);
    }

    /// Names queried so far, in order.
    pub fn queries(&self) -> Vec<String> {
        self.data
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .queries
            .clone()
    }

    pub fn query_count(&self) -> usize {
        self.data
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .queries
            .len()
    }
}

#[async_trait]
impl CatalogService for LocalCatalog {
    async fn query(&self, name: &str) -> Result<Vec<CatalogRecord>, ResolutionError> {
        let mut data = self.data.write().unwrap_or_else(|e| e.into_inner());
        data.queries.push(name.to_string());
        if let Some(ref message) = data.failure {
            return Err(ResolutionError::Catalog {
                name: name.to_string(),
                message: message.clone(),
            });
        }
        Ok(data
            .records
            .get(&normalize_name(name))
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lookup_ignores_case_and_spacing() {
        let catalog = LocalCatalog::new();
        catalog.insert("HD 1234", vec![CatalogRecord::new("HD 1234", 1.0, 2.0)]);
        assert_eq!(catalog.query("hd   1234").await.unwrap().len(), 1);
        assert!(catalog.query("HD 12345").await.unwrap().is_empty());
        assert_eq!(catalog.queries(), vec!["hd   1234", "HD 12345"]);
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let catalog = LocalCatalog::new();
        catalog.set_failure(Some("service unavailable"));
        assert!(matches!(
            catalog.query("HD 1234").await,
            Err(ResolutionError::Catalog { .. })
        ));
        catalog.set_failure(None);
        assert!(catalog.query("HD 1234").await.is_ok());
    }
}
