//! Instrument templates attached to an Observing Block.

use std::collections::BTreeMap;

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::sync::{SyncState, TemplateHandle};
use crate::api::{ObId, TemplateId, TemplateParam};
use crate::error::ObError;
use crate::p2::repository::P2Repository;

/// Role of a template within its OB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateKind {
    Acquisition,
    Science,
    Calibration,
}

/// A template: a name, local parameter values and its remote state.
///
/// Parameter values set locally are pushed on the next
/// [`p2_update`](Template::p2_update); parameters never set keep the value
/// the store assigned by default.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    name: String,
    kind: TemplateKind,
    params: BTreeMap<String, Value>,
    state: SyncState<TemplateHandle>,
}

impl Template {
    pub fn new(name: impl Into<String>, kind: TemplateKind) -> Self {
        Self {
            name: name.into(),
            kind,
            params: BTreeMap::new(),
            state: SyncState::Pending,
        }
    }

    /// Builder-style [`set_param`](Template::set_param).
    pub fn with_param(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.set_param(key, value);
        self
    }

    pub fn set_param(&mut self, key: &str, value: impl Into<Value>) {
        self.params.insert(key.to_string(), value.into());
    }

    pub fn remove_param(&mut self, key: &str) -> Option<Value> {
        self.params.remove(key)
    }

    pub fn param(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }

    pub fn params(&self) -> &BTreeMap<String, Value> {
        &self.params
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> TemplateKind {
        self.kind
    }

    pub fn state(&self) -> &SyncState<TemplateHandle> {
        &self.state
    }

    pub fn template_id(&self) -> Option<TemplateId> {
        self.state.handle().map(|h| h.document.template_id)
    }

    fn invalid_state(&self, operation: &'static str) -> ObError {
        ObError::InvalidState {
            label: self.name.clone(),
            operation,
            state: self.state.name().to_string(),
        }
    }

    /// Create the template remotely under `ob_id`.
    ///
    /// # Errors
    /// * `ObError::InvalidState` - If already created
    /// * `ObError::Remote` - If the store refuses; the template stays pending
    pub async fn p2_create(&mut self, repo: &dyn P2Repository, ob_id: ObId) -> Result<(), ObError> {
        if !self.state.is_pending() {
            return Err(self.invalid_state("create"));
        }

        let (document, version) = repo.create_template(ob_id, &self.name).await?;
        debug!(
            "Created template {} ({}) in OB {} at version {}",
            self.name, document.template_id, ob_id, version
        );
        self.state = SyncState::Created(TemplateHandle {
            ob_id,
            document,
            version,
        });
        Ok(())
    }

    /// Push local parameter values to the remote template.
    ///
    /// # Errors
    /// * `ObError::InvalidState` - If never created
    /// * `ObError::Remote` - If the store refuses; the state is unchanged
    pub async fn p2_update(&mut self, repo: &dyn P2Repository) -> Result<(), ObError> {
        let handle = match &self.state {
            SyncState::Pending => return Err(self.invalid_state("update")),
            SyncState::Created(h) | SyncState::Synced(h) => h,
        };
        let ob_id = handle.ob_id;

        let params: Vec<TemplateParam> = self
            .params
            .iter()
            .map(|(name, value)| TemplateParam {
                name: name.clone(),
                value: value.clone(),
            })
            .collect();

        let (document, version) = repo
            .save_template(ob_id, &handle.document, &params, &handle.version)
            .await?;
        debug!(
            "Saved template {} ({} params) at version {}",
            self.name,
            params.len(),
            version
        );
        self.state = SyncState::Synced(TemplateHandle {
            ob_id,
            document,
            version,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::p2::repositories::LocalP2Repository;

    async fn ob_in_new_run(repo: &LocalP2Repository) -> ObId {
        let run = repo.add_run("60.A-9252(M)", "GRAVITY");
        let (ob, _) = repo.create_ob(run.container_id, "ob").await.unwrap();
        ob.ob_id
    }

    #[tokio::test]
    async fn test_update_before_create_is_invalid() {
        let repo = LocalP2Repository::new();
        let mut template = Template::new("GRAVITY_dual_obs_exp", TemplateKind::Science);
        let err = template.p2_update(&repo).await.unwrap_err();
        assert!(matches!(err, ObError::InvalidState { operation: "update", .. }));
        assert_eq!(repo.call_count(), 0);
    }

    #[tokio::test]
    async fn test_create_then_update_pushes_params() {
        let repo = LocalP2Repository::new();
        let ob_id = ob_in_new_run(&repo).await;

        let mut template = Template::new("GRAVITY_dual_obs_exp", TemplateKind::Science)
            .with_param("DET2.DIT", 30.0)
            .with_param("DET2.NDIT.OBJECT", 4);
        template.p2_create(&repo, ob_id).await.unwrap();
        assert_eq!(template.state().name(), "created");
        assert!(template.template_id().is_some());

        template.p2_update(&repo).await.unwrap();
        assert!(template.state().is_synced());

        let stored = &repo.templates(ob_id)[0];
        assert_eq!(stored.param("DET2.DIT"), Some(&Value::from(30.0)));
        assert_eq!(stored.param("DET2.NDIT.OBJECT"), Some(&Value::from(4)));
        assert_eq!(repo.template_versions(ob_id), vec![2]);
    }

    #[tokio::test]
    async fn test_second_create_is_invalid() {
        let repo = LocalP2Repository::new();
        let ob_id = ob_in_new_run(&repo).await;
        let mut template = Template::new("GRAVITY_single_obs_exp", TemplateKind::Science);
        template.p2_create(&repo, ob_id).await.unwrap();
        assert!(template.p2_create(&repo, ob_id).await.is_err());
        assert_eq!(repo.templates(ob_id).len(), 1);
    }

    #[tokio::test]
    async fn test_failed_create_stays_pending() {
        let repo = LocalP2Repository::new();
        let ob_id = ob_in_new_run(&repo).await;
        repo.fail_next(
            "create_template",
            crate::error::RemoteError::transport("connection reset"),
        );
        let mut template = Template::new("GRAVITY_single_acq", TemplateKind::Acquisition);
        assert!(template.p2_create(&repo, ob_id).await.is_err());
        assert!(template.state().is_pending());
    }
}
