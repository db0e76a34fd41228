//! Observation configuration.
//!
//! A YAML document with two top-level keys:
//!
//! ```yaml
//! setup:
//!   run_id: 60.A-9252(M)
//!   folder: HD206893
//!   concatenation: none
//!   date: 2020-09-20
//!   resolution: MEDIUM
//!   polarisation: IN
//!   constraints:
//!     airmass: 1.6
//! ObservingBlocks:
//!   HD206893_B:
//!     mode: dual_off
//!     target: HD 206893
//!     calib: false
//!     companion: [129.0, 198.0]
//!     dit: 30
//!     ndit: 4
//! ```
//!
//! OB definitions are kept raw until an OB is built so that a malformed
//! entry only fails that OB, in file order.

pub mod client;
pub mod samples;

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ConfigurationError;

pub use client::ClientConfig;

/// Spectral resolution of the science spectrometer (`INS.SPEC.RES`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Resolution {
    #[serde(alias = "low")]
    Low,
    #[serde(alias = "medium", alias = "MED")]
    Medium,
    #[serde(alias = "high")]
    High,
}

impl Resolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::Low => "LOW",
            Resolution::Medium => "MEDIUM",
            Resolution::High => "HIGH",
        }
    }
}

/// Wollaston prism position (`INS.SPEC.POL`, `INS.FT.POL`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Polarisation {
    #[serde(alias = "in")]
    In,
    #[serde(alias = "out")]
    Out,
}

impl Polarisation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Polarisation::In => "IN",
            Polarisation::Out => "OUT",
        }
    }
}

/// User-supplied values that take precedence over derived ones.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Overrides {
    /// Free-text OB description (`obsDescription.name`)
    #[serde(default)]
    pub description: Option<String>,
    /// Constraint set entries, e.g. `airmass: 1.6`
    #[serde(default)]
    pub constraints: BTreeMap<String, Value>,
    /// Explicit target-section fields, e.g. `properMotionRa: 0.0`
    #[serde(default)]
    pub target_fields: BTreeMap<String, Value>,
}

impl Overrides {
    pub fn is_empty(&self) -> bool {
        self.description.is_none() && self.constraints.is_empty() && self.target_fields.is_empty()
    }
}

/// The `setup` section, shared by every OB of the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetupConfig {
    pub run_id: String,
    pub folder: String,
    #[serde(default = "default_concatenation")]
    pub concatenation: String,
    #[serde(default, deserialize_with = "deserialize_date")]
    pub date: Option<String>,
    #[serde(default)]
    pub resolution: Option<Resolution>,
    #[serde(default)]
    pub polarisation: Option<Polarisation>,
    #[serde(default)]
    pub ft_polarisation: Option<Polarisation>,
    #[serde(flatten)]
    pub overrides: Overrides,
}

fn default_concatenation() -> String {
    "none".to_string()
}

/// Accept `date` as a YAML string or as a bare number-like scalar.
fn deserialize_date<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value: Option<Value> = Option::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.trim().to_string()),
        Some(other) => Some(other.to_string()),
    })
}

impl SetupConfig {
    /// Concatenation name, or `None` when disabled with the literal `none`.
    pub fn concatenation_name(&self) -> Option<&str> {
        let name = self.concatenation.trim();
        if name.is_empty() || name.eq_ignore_ascii_case("none") {
            None
        } else {
            Some(name)
        }
    }

    /// Observation date, if given, as an ISO calendar date.
    pub fn observation_date(&self) -> Result<Option<NaiveDate>, ConfigurationError> {
        self.date
            .as_deref()
            .map(|d| {
                NaiveDate::parse_from_str(d, "%Y-%m-%d").map_err(|e| {
                    ConfigurationError::invalid("setup", "date", format!("'{}': {}", d, e))
                })
            })
            .transpose()
    }
}

/// Definition of one OB as written in the configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObDefinition {
    pub mode: String,
    pub target: String,
    #[serde(default)]
    pub calib: Option<bool>,
    #[serde(default)]
    pub resolution: Option<Resolution>,
    #[serde(default)]
    pub polarisation: Option<Polarisation>,
    /// Science detector integration time (s)
    #[serde(default)]
    pub dit: Option<f64>,
    /// Number of science integrations per exposure
    #[serde(default)]
    pub ndit: Option<u32>,
    /// Reference-star exposure settings, default to `dit`/`ndit`
    #[serde(default)]
    pub reference_dit: Option<f64>,
    #[serde(default)]
    pub reference_ndit: Option<u32>,
    /// Offset [RA, DEC] in mas of the science object from the fringe-tracking star
    #[serde(default)]
    pub companion: Option<[f64; 2]>,
    #[serde(default)]
    pub companion_name: Option<String>,
    #[serde(default)]
    pub companion_mag: Option<f64>,
    /// Sky offset [RA, DEC] in mas
    #[serde(default)]
    pub sky_offset: Option<[f64; 2]>,
    #[serde(flatten)]
    pub overrides: Overrides,
}

/// One `ObservingBlocks` entry, not yet interpreted.
#[derive(Debug, Clone, PartialEq)]
pub struct ObEntry {
    pub label: String,
    raw: serde_yaml::Value,
}

impl ObEntry {
    pub fn new(label: impl Into<String>, raw: serde_yaml::Value) -> Self {
        Self {
            label: label.into(),
            raw,
        }
    }

    /// Interpret the entry as an [`ObDefinition`].
    pub fn definition(&self) -> Result<ObDefinition, ConfigurationError> {
        serde_yaml::from_value(self.raw.clone()).map_err(|e| {
            let message = e.to_string();
            match missing_field_name(&message) {
                Some(field) => ConfigurationError::missing(&self.label, field),
                None => ConfigurationError::Parse(format!("OB '{}': {}", self.label, message)),
            }
        })
    }
}

/// Extract `x` from serde's "missing field `x`" message.
fn missing_field_name(message: &str) -> Option<&str> {
    let rest = message.split("missing field `").nth(1)?;
    rest.split('`').next()
}

#[derive(Deserialize)]
struct RawConfig {
    setup: SetupConfig,
    #[serde(rename = "ObservingBlocks", default)]
    observing_blocks: serde_yaml::Mapping,
}

/// A complete observation configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ObsConfig {
    pub setup: SetupConfig,
    /// OB entries in file order
    pub observing_blocks: Vec<ObEntry>,
}

impl ObsConfig {
    /// Parse a configuration from YAML text.
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigurationError> {
        let raw: RawConfig = serde_yaml::from_str(content)
            .map_err(|e| ConfigurationError::Parse(e.to_string()))?;

        let mut observing_blocks = Vec::with_capacity(raw.observing_blocks.len());
        for (key, value) in raw.observing_blocks {
            let label = match key {
                serde_yaml::Value::String(s) => s,
                serde_yaml::Value::Number(n) => n.to_string(),
                other => {
                    return Err(ConfigurationError::Parse(format!(
                        "ObservingBlocks keys must be labels, found {:?}",
                        other
                    )))
                }
            };
            observing_blocks.push(ObEntry::new(label, value));
        }

        Ok(Self {
            setup: raw.setup,
            observing_blocks,
        })
    }

    /// Load a configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigurationError> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| ConfigurationError::Io {
            path: path.as_ref().display().to_string(),
            source: e,
        })?;
        Self::from_yaml_str(&content)
    }

    pub fn labels(&self) -> Vec<&str> {
        self.observing_blocks
            .iter()
            .map(|e| e.label.as_str())
            .collect()
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
