//! Per-OB submission pipeline.
//!
//! Each configured OB goes through
//! `configure → generate → resolve → confirm → create → update`, strictly
//! one OB after the other. A failure aborts the remaining steps of that OB
//! only; it is recorded with the step at which it happened and the next OB
//! is processed. Nothing is retried.

use log::{info, warn};

use super::confirmation::{ConfirmDecision, Confirmation};
use super::report::SubmissionReport;
use crate::api::{ContainerId, ObId};
use crate::catalog::TargetResolver;
use crate::config::{ObEntry, ObsConfig, SetupConfig};
use crate::error::{ObError, ObFailure, SyncStep};
use crate::models::ObservingBlock;
use crate::p2::repository::P2Repository;
use crate::p2::services::{prepare_container, SetupError};

/// Sends the OBs of a configuration to a P2 store.
pub struct Submission<'a> {
    repo: &'a dyn P2Repository,
    resolver: &'a TargetResolver,
    confirmation: &'a dyn Confirmation,
}

impl<'a> Submission<'a> {
    pub fn new(
        repo: &'a dyn P2Repository,
        resolver: &'a TargetResolver,
        confirmation: &'a dyn Confirmation,
    ) -> Self {
        Self {
            repo,
            resolver,
            confirmation,
        }
    }

    /// Build an OB from its entry and generate its templates.
    pub fn configure(entry: &ObEntry, setup: &SetupConfig) -> Result<ObservingBlock, ObFailure> {
        let fail = |e: ObError| ObFailure::new(&entry.label, &setup.run_id, SyncStep::Configure, e);
        let definition = entry.definition().map_err(|e| fail(e.into()))?;
        let mut ob = ObservingBlock::new(&entry.label, definition, setup.clone())
            .map_err(|e| fail(e.into()))?;
        ob.generate_templates().map_err(fail)?;
        Ok(ob)
    }

    /// Resolve, confirm, create and update one configured OB.
    ///
    /// # Returns
    /// * `Ok(Some(ObId))` - The OB was sent
    /// * `Ok(None)` - The operator cancelled; nothing was sent
    /// * `Err(ObFailure)` - The step that failed and why
    pub async fn submit(
        &self,
        ob: &mut ObservingBlock,
        run_id: &str,
        container_id: ContainerId,
    ) -> Result<Option<ObId>, ObFailure> {
        let label = ob.label().to_string();
        let fail = |step: SyncStep, e: ObError| ObFailure::new(&label, run_id, step, e);

        ob.resolve_target(self.resolver)
            .await
            .map_err(|e| fail(SyncStep::Resolve, e.into()))?;

        if self.confirmation.confirm(&ob.summary(run_id)) == ConfirmDecision::Cancel {
            warn!("OB {} was not sent to P2", label);
            return Ok(None);
        }

        let created = ob.p2_create(self.repo, container_id).await;
        if let Err(e) = created {
            // the OB shell may exist even if a template failed
            let partial = ob.ob_id().is_some();
            return Err(fail(SyncStep::Create, e).with_remote_state(partial));
        }
        ob.p2_update(self.repo)
            .await
            .map_err(|e| fail(SyncStep::Update, e).with_remote_state(true))?;

        let ob_id = ob.ob_id().ok_or_else(|| {
            fail(
                SyncStep::Update,
                ObError::InvalidState {
                    label: label.clone(),
                    operation: "report",
                    state: ob.state().name().to_string(),
                },
            )
        })?;
        info!("OB {} sent to run {}", label, run_id);
        Ok(Some(ob_id))
    }

    /// Process every OB of `config` in file order.
    ///
    /// All OBs are configured before any remote call. The container is only
    /// prepared if at least one OB configured successfully.
    ///
    /// # Errors
    /// * `SetupError` - The run or folder could not be reached; no OB was sent
    pub async fn submit_all(&self, config: &ObsConfig) -> Result<SubmissionReport, SetupError> {
        let setup = &config.setup;
        setup.observation_date()?;
        let mut report = SubmissionReport::new(&setup.run_id);

        let configured: Vec<Result<ObservingBlock, ObFailure>> = config
            .observing_blocks
            .iter()
            .map(|entry| Self::configure(entry, setup))
            .collect();

        let container_id = if configured.iter().any(Result::is_ok) {
            let prepared = prepare_container(self.repo, setup).await?;
            Some(prepared.container_id)
        } else {
            None
        };

        for item in configured {
            let outcome = match (item, container_id) {
                (Ok(mut ob), Some(container_id)) => self
                    .submit(&mut ob, &setup.run_id, container_id)
                    .await
                    .map(|sent| (ob.label().to_string(), sent)),
                (Ok(ob), None) => Ok((ob.label().to_string(), None)),
                (Err(failure), _) => Err(failure),
            };
            match outcome {
                Ok((label, Some(ob_id))) => report.record_sent(&label, ob_id),
                Ok((label, None)) => report.record_cancelled(&label),
                Err(failure) => {
                    warn!("{}", failure);
                    report.record_failure(&failure);
                }
            }
        }

        report.complete();
        Ok(report)
    }
}
