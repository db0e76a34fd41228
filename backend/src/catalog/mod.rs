//! Astronomical name resolution.
//!
//! A [`CatalogService`] answers a name query with raw catalog records in
//! catalog units. [`TargetResolver`] insists on exactly one record and turns
//! it into a [`Target`] in the units the P2 store expects:
//!
//! | field        | catalog     | target                  |
//! |--------------|-------------|-------------------------|
//! | RA           | degrees     | `HH:MM:SS.sss`          |
//! | DEC          | degrees     | `±D:MM:SS.sss`          |
//! | proper motion| mas/yr      | arcsec/yr, 5 decimals   |
//! | parallax     | mas         | arcsec                  |

pub mod local;
#[cfg(feature = "http-client")]
pub mod simbad;

use std::sync::Arc;

use async_trait::async_trait;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::ResolutionError;
use crate::models::target::{format_dec, format_ra, proper_motion_arcsec, Magnitudes, Target};

pub use local::LocalCatalog;
#[cfg(feature = "http-client")]
pub use simbad::SimbadCatalog;

/// One catalog entry, in catalog units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogRecord {
    /// Main identifier of the object in the catalog
    pub identifier: String,
    /// Degrees, ICRS
    pub ra_deg: f64,
    /// Degrees, ICRS
    pub dec_deg: f64,
    /// mas/yr
    pub pm_ra: Option<f64>,
    /// mas/yr
    pub pm_dec: Option<f64>,
    /// mas
    pub parallax: Option<f64>,
    pub flux_v: Option<f64>,
    pub flux_r: Option<f64>,
    pub flux_h: Option<f64>,
    pub flux_k: Option<f64>,
}

impl CatalogRecord {
    pub fn new(identifier: impl Into<String>, ra_deg: f64, dec_deg: f64) -> Self {
        Self {
            identifier: identifier.into(),
            ra_deg,
            dec_deg,
            pm_ra: None,
            pm_dec: None,
            parallax: None,
            flux_v: None,
            flux_r: None,
            flux_h: None,
            flux_k: None,
        }
    }
}

/// Name lookup against an astronomical catalog.
#[async_trait]
pub trait CatalogService: Send + Sync {
    /// Every record whose identifiers include `name`.
    async fn query(&self, name: &str) -> Result<Vec<CatalogRecord>, ResolutionError>;
}

/// Resolves target names to normalized [`Target`]s.
#[derive(Clone)]
pub struct TargetResolver {
    catalog: Arc<dyn CatalogService>,
}

impl TargetResolver {
    pub fn new(catalog: Arc<dyn CatalogService>) -> Self {
        Self { catalog }
    }

    /// Resolve `name` to exactly one catalog object.
    ///
    /// # Errors
    /// * `ResolutionError::NotFound` - No record matches
    /// * `ResolutionError::Ambiguous` - More than one record matches; never
    ///   narrowed down automatically
    /// * `ResolutionError::InvalidRecord` - The record has unusable coordinates
    pub async fn resolve(&self, name: &str) -> Result<Target, ResolutionError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ResolutionError::NotFound {
                name: name.to_string(),
            });
        }

        info!("Resolving target {}", name);
        let records = self.catalog.query(name).await?;
        match records.len() {
            0 => Err(ResolutionError::NotFound {
                name: name.to_string(),
            }),
            1 => normalize(name, &records[0]),
            count => Err(ResolutionError::Ambiguous {
                name: name.to_string(),
                count,
                candidates: records.into_iter().map(|r| r.identifier).collect(),
            }),
        }
    }
}

/// Convert a catalog record to a [`Target`] named `name`.
pub fn normalize(name: &str, record: &CatalogRecord) -> Result<Target, ResolutionError> {
    if !record.ra_deg.is_finite() || !record.dec_deg.is_finite() || record.dec_deg.abs() > 90.0 {
        return Err(ResolutionError::InvalidRecord {
            name: name.to_string(),
            message: format!(
                "coordinates ({}, {}) out of range",
                record.ra_deg, record.dec_deg
            ),
        });
    }

    let mut target = Target::new(name);
    target.ra = Some(format_ra(record.ra_deg));
    target.dec = Some(format_dec(record.dec_deg));

    target.proper_motion_ra = proper_motion(name, "RA", record.pm_ra);
    target.proper_motion_dec = proper_motion(name, "DEC", record.pm_dec);

    target.parallax = finite(record.parallax).map(|mas| mas / 1000.0);
    target.magnitudes = Magnitudes {
        v: finite(record.flux_v),
        r: finite(record.flux_r),
        h: finite(record.flux_h),
        k: finite(record.flux_k),
    };
    Ok(target)
}

/// mas/yr to arcsec/yr, or `None` with a warning when the catalog has no value.
fn proper_motion(name: &str, axis: &str, mas_per_year: Option<f64>) -> Option<f64> {
    let pm = finite(mas_per_year).map(proper_motion_arcsec);
    if pm.is_none() {
        warn!("Proper motion in {} not found in catalog for target {}", axis, name);
    }
    pm
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver_with(records: Vec<CatalogRecord>) -> (TargetResolver, Arc<LocalCatalog>) {
        let catalog = Arc::new(LocalCatalog::new());
        catalog.insert("HD 1234", records);
        (TargetResolver::new(catalog.clone()), catalog)
    }

    fn hd1234() -> CatalogRecord {
        CatalogRecord {
            pm_ra: Some(-546.01),
            pm_dec: Some(93.4),
            parallax: Some(25.0),
            flux_k: Some(5.0),
            ..CatalogRecord::new("HD 1234", 70.269_875, 13.928_527_78)
        }
    }

    #[tokio::test]
    async fn test_resolve_normalizes_units() {
        let (resolver, _) = resolver_with(vec![hd1234()]);
        let target = resolver.resolve("HD 1234").await.unwrap();
        assert_eq!(target.name, "HD 1234");
        assert_eq!(target.ra.as_deref(), Some("04:41:04.770"));
        assert_eq!(target.dec.as_deref(), Some("+13:55:42.700"));
        assert_eq!(target.proper_motion_ra, Some(-0.54601));
        assert_eq!(target.proper_motion_dec, Some(0.0934));
        assert_eq!(target.parallax, Some(0.025));
        assert_eq!(target.magnitudes.k, Some(5.0));
        assert_eq!(target.magnitudes.v, None);
    }

    #[tokio::test]
    async fn test_missing_proper_motion_is_not_an_error() {
        let record = CatalogRecord::new("HD 1234", 70.0, 13.0);
        let (resolver, _) = resolver_with(vec![record]);
        let target = resolver.resolve("HD 1234").await.unwrap();
        assert!(target.is_resolved());
        assert_eq!(target.proper_motion_ra, None);
        assert!(!target.ob_fields().contains_key("properMotionDec"));
    }

    #[tokio::test]
    async fn test_proper_motion_components_are_independent() {
        let record = CatalogRecord {
            pm_ra: Some(-546.01),
            pm_dec: Some(f64::NAN),
            ..CatalogRecord::new("HD 1234", 70.0, 13.0)
        };
        let (resolver, _) = resolver_with(vec![record]);
        let target = resolver.resolve("HD 1234").await.unwrap();
        assert_eq!(target.proper_motion_ra, Some(-0.54601));
        assert_eq!(target.proper_motion_dec, None);

        let fields = target.ob_fields();
        assert!(fields.contains_key("properMotionRa"));
        assert!(!fields.contains_key("properMotionDec"));
    }

    #[tokio::test]
    async fn test_ambiguous_lists_candidates() {
        let (resolver, _) = resolver_with(vec![
            CatalogRecord::new("HD 1234A", 70.0, 13.0),
            CatalogRecord::new("HD 1234B", 70.1, 13.1),
        ]);
        match resolver.resolve("HD 1234").await {
            Err(ResolutionError::Ambiguous {
                count, candidates, ..
            }) => {
                assert_eq!(count, 2);
                assert_eq!(candidates, vec!["HD 1234A", "HD 1234B"]);
            }
            other => panic!("expected Ambiguous, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_not_found_and_blank_names() {
        let (resolver, catalog) = resolver_with(vec![hd1234()]);
        assert!(matches!(
            resolver.resolve("HD 9999").await,
            Err(ResolutionError::NotFound { .. })
        ));
        assert!(matches!(
            resolver.resolve("   ").await,
            Err(ResolutionError::NotFound { .. })
        ));
        assert_eq!(catalog.query_count(), 1);
    }

    #[test]
    fn test_invalid_coordinates() {
        let record = CatalogRecord::new("bad", f64::NAN, 0.0);
        assert!(matches!(
            normalize("bad", &record),
            Err(ResolutionError::InvalidRecord { .. })
        ));
    }
}
