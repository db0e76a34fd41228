//! The Observing Block aggregate and its create-then-update protocol.
//!
//! An OB is built from one configuration entry, generates its templates
//! locally, resolves its target through the catalog, and is then mirrored on
//! the P2 store in two phases:
//!
//! 1. [`p2_create`](ObservingBlock::p2_create): create the OB shell, then the
//!    acquisition template and every science template in order.
//! 2. [`p2_update`](ObservingBlock::p2_update): merge the target and the
//!    configuration overrides into the OB document, save it with the version
//!    received last, then save every template in order.
//!
//! Remote versions are never refreshed behind the caller's back: a stale
//! version surfaces as a version conflict.

use std::fmt;

use log::{info, warn};
use serde_json::Value;

use super::mode::{apply_target, ModeSettings, ObservationMode, TemplatePlan};
use super::sync::{ObHandle, SyncState};
use super::target::{parse_dec, parse_ra, Target};
use super::template::Template;
use crate::api::{ContainerId, ObDocument, ObId};
use crate::catalog::TargetResolver;
use crate::config::{ObDefinition, Overrides, SetupConfig};
use crate::error::{ConfigurationError, ObError, ResolutionError};
use crate::p2::repository::P2Repository;

/// Stamped into `obsDescription.userComments` of every OB.
pub const USER_COMMENT: &str = concat!("Generated by p2-gravity v", env!("CARGO_PKG_VERSION"));

/// Merge configuration overrides into an OB document.
///
/// Only assigns keys, so applying the same overrides twice leaves the
/// document as after the first application.
pub fn populate_from_yml(document: &mut ObDocument, overrides: &Overrides) {
    document
        .obs_description
        .insert("userComments".to_string(), Value::from(USER_COMMENT));
    if let Some(ref description) = overrides.description {
        document
            .obs_description
            .insert("name".to_string(), Value::from(description.as_str()));
    }
    for (key, value) in &overrides.constraints {
        document.constraints.insert(key.clone(), value.clone());
    }
    for (key, value) in &overrides.target_fields {
        document.target.insert(key.clone(), value.clone());
    }
}

/// One Observing Block.
#[derive(Debug, Clone)]
pub struct ObservingBlock {
    label: String,
    mode: ObservationMode,
    settings: ModeSettings,
    definition: ObDefinition,
    setup: SetupConfig,
    target: Target,
    plan: Option<TemplatePlan>,
    state: SyncState<ObHandle>,
}

impl ObservingBlock {
    /// Build an OB from its configuration entry.
    ///
    /// # Errors
    /// * `ConfigurationError::UnknownMode` - If `mode` is not a known tag
    /// * `ConfigurationError::MissingField` - If a mode requirement is absent
    /// * `ConfigurationError::InvalidValue` - If a value is out of range
    pub fn new(
        label: impl Into<String>,
        definition: ObDefinition,
        setup: SetupConfig,
    ) -> Result<Self, ConfigurationError> {
        let label = label.into();
        let mode: ObservationMode = definition.mode.parse()?;
        if definition.target.trim().is_empty() {
            return Err(ConfigurationError::missing(&label, "target"));
        }
        validate_target_fields(&label, &setup.overrides)?;
        validate_target_fields(&label, &definition.overrides)?;
        let settings = ModeSettings::from_definition(&label, mode, &definition, &setup)?;

        Ok(Self {
            target: Target::new(definition.target.trim()),
            label,
            mode,
            settings,
            definition,
            setup,
            plan: None,
            state: SyncState::Pending,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn mode(&self) -> ObservationMode {
        self.mode
    }

    pub fn settings(&self) -> &ModeSettings {
        &self.settings
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn state(&self) -> &SyncState<ObHandle> {
        &self.state
    }

    pub fn ob_id(&self) -> Option<ObId> {
        self.state.handle().map(|h| h.ob_id())
    }

    /// Acquisition then science templates, once generated.
    pub fn templates(&self) -> Option<&TemplatePlan> {
        self.plan.as_ref()
    }

    fn invalid_state(&self, operation: &'static str, state: &str) -> ObError {
        ObError::InvalidState {
            label: self.label.clone(),
            operation,
            state: state.to_string(),
        }
    }

    // ==================== Local preparation ====================

    /// Build the acquisition template and the ordered science templates.
    ///
    /// Pure local computation. If the target is already resolved its
    /// acquisition parameters are applied as well.
    pub fn generate_templates(&mut self) -> Result<&TemplatePlan, ObError> {
        if !self.state.is_pending() {
            return Err(self.invalid_state("generate templates", self.state.name()));
        }
        let mut plan = (self.mode.strategy())(&self.settings);
        if self.target.is_resolved() {
            apply_target(self.mode, &mut plan.acquisition, &self.target);
        }
        info!(
            "Generated {} templates for OB '{}' ({})",
            plan.template_count(),
            self.label,
            self.mode
        );
        Ok(self.plan.insert(plan))
    }

    /// Resolve the target name through the catalog.
    ///
    /// Any resolution failure leaves the OB untouched.
    pub async fn resolve_target(&mut self, resolver: &TargetResolver) -> Result<(), ResolutionError> {
        let target = resolver.resolve(&self.target.name).await?;
        self.set_target(target);
        Ok(())
    }

    /// Use an already resolved target.
    pub fn set_target(&mut self, target: Target) {
        if let Some(ref mut plan) = self.plan {
            apply_target(self.mode, &mut plan.acquisition, &target);
        }
        self.target = target;
    }

    /// OB document with target, generated values and overrides applied,
    /// in increasing precedence.
    pub fn merged_document(&self, base: &ObDocument) -> ObDocument {
        let mut document = base.clone();
        for (key, value) in self.target.ob_fields() {
            document.target.insert(key, value);
        }
        document
            .obs_description
            .insert("name".to_string(), Value::from(self.label.as_str()));
        populate_from_yml(&mut document, &self.setup.overrides);
        populate_from_yml(&mut document, &self.definition.overrides);
        document
    }

    // ==================== Remote synchronization ====================

    /// Create the OB and its templates in container `container_id`.
    ///
    /// # Errors
    /// * `ObError::InvalidState` - If already created, the target is not
    ///   resolved or templates were not generated. Nothing is sent.
    /// * `ObError::Remote` - If a call fails. When the OB shell was created
    ///   the OB stays `Created` with the templates created so far.
    pub async fn p2_create(
        &mut self,
        repo: &dyn P2Repository,
        container_id: ContainerId,
    ) -> Result<(), ObError> {
        if !self.state.is_pending() {
            return Err(self.invalid_state("create", self.state.name()));
        }
        if !self.target.is_resolved() {
            return Err(self.invalid_state("create", "target is unresolved"));
        }
        let plan = match self.plan.as_mut() {
            Some(plan) => plan,
            None => {
                return Err(ObError::InvalidState {
                    label: self.label.clone(),
                    operation: "create",
                    state: "templates are not generated".to_string(),
                })
            }
        };

        info!("Creating OB '{}' in container {}", self.label, container_id);
        let (document, version) = repo.create_ob(container_id, &self.label).await?;
        let ob_id = document.ob_id;
        self.state = SyncState::Created(ObHandle {
            container_id,
            document,
            version,
        });

        info!("Creating templates for OB '{}'", self.label);
        if let Err(e) = create_templates(plan, repo, ob_id).await {
            warn!(
                "OB '{}' ({}) exists remotely with incomplete templates",
                self.label, ob_id
            );
            return Err(e);
        }
        Ok(())
    }

    /// Push target, overrides and template parameters to the store.
    ///
    /// # Errors
    /// * `ObError::InvalidState` - If the OB was never created
    /// * `ObError::Remote` - If a save fails; a version conflict is returned
    ///   as is and nothing is retried
    pub async fn p2_update(&mut self, repo: &dyn P2Repository) -> Result<(), ObError> {
        let handle = match &self.state {
            SyncState::Pending => return Err(self.invalid_state("update", "pending")),
            SyncState::Created(h) | SyncState::Synced(h) => h.clone(),
        };

        info!("Updating OB '{}'", self.label);
        let document = self.merged_document(&handle.document);
        let (document, version) = repo.save_ob(&document, &handle.version).await?;
        self.state = SyncState::Created(ObHandle {
            container_id: handle.container_id,
            document,
            version,
        });

        info!("Updating templates of OB '{}'", self.label);
        if let Some(plan) = self.plan.as_mut() {
            plan.acquisition.p2_update(repo).await?;
            for template in plan.science.iter_mut() {
                template.p2_update(repo).await?;
            }
        }

        if let SyncState::Created(handle) = std::mem::take(&mut self.state) {
            self.state = SyncState::Synced(handle);
        }
        Ok(())
    }

    /// Summary shown before submission.
    pub fn summary(&self, run_id: &str) -> ObSummary {
        ObSummary {
            label: self.label.clone(),
            run_id: run_id.to_string(),
            folder: self.setup.folder.clone(),
            date: self.setup.date.clone(),
            mode: self.mode,
            calibration: self.settings.calibration,
            target: self.target.clone(),
            templates: self
                .plan
                .iter()
                .flat_map(|p| p.iter())
                .map(|t| t.name().to_string())
                .collect(),
        }
    }
}

async fn create_templates(
    plan: &mut TemplatePlan,
    repo: &dyn P2Repository,
    ob_id: ObId,
) -> Result<(), ObError> {
    plan.acquisition.p2_create(repo, ob_id).await?;
    for template in plan.science.iter_mut() {
        template.p2_create(repo, ob_id).await?;
    }
    Ok(())
}

/// Explicit `ra`/`dec` overrides must be well-formed sexagesimal strings.
fn validate_target_fields(label: &str, overrides: &Overrides) -> Result<(), ConfigurationError> {
    let checks: [(&str, fn(&str) -> Option<f64>); 2] = [("ra", parse_ra), ("dec", parse_dec)];
    for (field, parse) in checks {
        if let Some(value) = overrides.target_fields.get(field) {
            let valid = value.as_str().and_then(parse).is_some();
            if !valid {
                return Err(ConfigurationError::invalid(
                    label,
                    format!("target_fields.{}", field),
                    format!("{} is not a sexagesimal coordinate", value),
                ));
            }
        }
    }
    Ok(())
}

/// What an operator sees before an OB is sent.
#[derive(Debug, Clone, PartialEq)]
pub struct ObSummary {
    pub label: String,
    pub run_id: String,
    pub folder: String,
    pub date: Option<String>,
    pub mode: ObservationMode,
    pub calibration: bool,
    pub target: Target,
    pub templates: Vec<String>,
}

impl fmt::Display for ObSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "run: {}    folder: {}    date: {}",
            self.run_id,
            self.folder,
            self.date.as_deref().unwrap_or("-")
        )?;
        writeln!(
            f,
            "ob: {}    mode: {}{}",
            self.label,
            self.mode,
            if self.calibration { " (calibrator)" } else { "" }
        )?;
        writeln!(
            f,
            "target: {}    ra: {}    dec: {}",
            self.target.name,
            self.target.ra.as_deref().unwrap_or("?"),
            self.target.dec.as_deref().unwrap_or("?")
        )?;
        write!(f, "templates: {}", self.templates.join(", "))
    }
}

#[cfg(test)]
#[path = "observing_block_tests.rs"]
mod observing_block_tests;
