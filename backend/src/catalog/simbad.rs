//! SIMBAD catalog client over the TAP synchronous endpoint.
//!
//! One ADQL query per name, matched against every identifier of an object
//! (`ident.id`), joined with the basic data and the flux table:
//!
//! ```sql
//! SELECT basic.main_id, basic.ra, basic.dec, basic.pmra, basic.pmdec,
//!        basic.plx_value, allfluxes.V, allfluxes.R, allfluxes.H, allfluxes.K
//! FROM ident
//! JOIN basic ON ident.oidref = basic.oid
//! LEFT JOIN allfluxes ON allfluxes.oidref = basic.oid
//! WHERE ident.id = 'HD 1234'
//! ```

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use super::{CatalogRecord, CatalogService};
use crate::error::ResolutionError;

#[derive(Debug, Deserialize)]
struct TapColumn {
    name: String,
}

#[derive(Debug, Deserialize)]
struct TapResponse {
    metadata: Vec<TapColumn>,
    data: Vec<Vec<Value>>,
}

/// Catalog backed by the SIMBAD TAP service.
#[derive(Clone)]
pub struct SimbadCatalog {
    client: Client,
    url: String,
}

impl SimbadCatalog {
    /// # Arguments
    /// * `url` - TAP sync endpoint, see [`crate::config::client::SIMBAD_TAP_URL`]
    /// * `timeout` - Per-query timeout
    pub fn new(url: &str, timeout: Duration) -> Result<Self, ResolutionError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ResolutionError::Catalog {
                name: String::new(),
                message: format!("Failed to build HTTP client: {}", e),
            })?;
        Ok(Self {
            client,
            url: url.to_string(),
        })
    }
}

/// ADQL query for one identifier; quotes are doubled.
pub fn adql_query(name: &str) -> String {
    format!(
        "SELECT basic.main_id, basic.ra, basic.dec, basic.pmra, basic.pmdec, \
         basic.plx_value, allfluxes.V, allfluxes.R, allfluxes.H, allfluxes.K \
         FROM ident JOIN basic ON ident.oidref = basic.oid \
         LEFT JOIN allfluxes ON allfluxes.oidref = basic.oid \
         WHERE ident.id = '{}'",
        name.replace('\'', "''")
    )
}

/// Turn a TAP JSON response into records, columns matched by name.
fn parse_response(name: &str, body: &str) -> Result<Vec<CatalogRecord>, ResolutionError> {
    let invalid = |message: String| ResolutionError::InvalidRecord {
        name: name.to_string(),
        message,
    };

    let response: TapResponse =
        serde_json::from_str(body).map_err(|e| invalid(format!("Malformed TAP response: {}", e)))?;
    let column = |wanted: &str| {
        response
            .metadata
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(wanted))
    };
    let (id_col, ra_col, dec_col) = match (column("main_id"), column("ra"), column("dec")) {
        (Some(i), Some(r), Some(d)) => (i, r, d),
        _ => return Err(invalid("TAP response lacks main_id/ra/dec".to_string())),
    };
    let optional = |row: &[Value], wanted: &str| {
        column(wanted)
            .and_then(|i| row.get(i))
            .and_then(Value::as_f64)
    };

    let mut records = Vec::with_capacity(response.data.len());
    for row in &response.data {
        let row = row.as_slice();
        let identifier = row
            .get(id_col)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .trim()
            .to_string();
        let (ra_deg, dec_deg) = match (
            row.get(ra_col).and_then(Value::as_f64),
            row.get(dec_col).and_then(Value::as_f64),
        ) {
            (Some(ra), Some(dec)) => (ra, dec),
            _ => return Err(invalid(format!("{} has no coordinates", identifier))),
        };
        records.push(CatalogRecord {
            pm_ra: optional(row, "pmra"),
            pm_dec: optional(row, "pmdec"),
            parallax: optional(row, "plx_value"),
            flux_v: optional(row, "V"),
            flux_r: optional(row, "R"),
            flux_h: optional(row, "H"),
            flux_k: optional(row, "K"),
            ..CatalogRecord::new(identifier, ra_deg, dec_deg)
        });
    }
    Ok(records)
}

#[async_trait]
impl CatalogService for SimbadCatalog {
    async fn query(&self, name: &str) -> Result<Vec<CatalogRecord>, ResolutionError> {
        let failed = |message: String| ResolutionError::Catalog {
            name: name.to_string(),
            message,
        };

        let query = adql_query(name);
        debug!("SIMBAD TAP query: {}", query);
        let params = [
            ("REQUEST", "doQuery"),
            ("LANG", "ADQL"),
            ("FORMAT", "json"),
            ("QUERY", query.as_str()),
        ];
        let response = self
            .client
            .post(&self.url)
            .form(&params)
            .send()
            .await
            .map_err(|e| failed(format!("Request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| failed(format!("Failed to read response: {}", e)))?;
        if !status.is_success() {
            return Err(failed(format!("HTTP {}: {}", status, body.trim())));
        }

        parse_response(name, &body)
    }
}
