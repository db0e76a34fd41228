//! Repository trait for the remote scheduling store.
//!
//! The store is a container hierarchy (Run → Folder → [Concatenation] → OB →
//! Templates) with optimistic versioning: every create returns the version
//! assigned by the store, and every save must present the version received
//! last. A stale version is rejected with [`RemoteError::VersionConflict`].
//!
//! # Implementations
//!
//! - [`crate::p2::repositories::LocalP2Repository`]: in-memory store used by
//!   tests and dry runs.
//! - `HttpP2Repository` (feature `http-client`): the ESO P2 REST API.

pub mod error;

use async_trait::async_trait;

use crate::api::{
    ContainerId, ContainerItem, ObDocument, ObId, RunInfo, TemplateDocument, TemplateParam,
    Version,
};

pub use error::{ErrorContext, RemoteError, RemoteResult};

/// Container, Observing Block and template operations of the remote store.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to work with async Rust.
#[async_trait]
pub trait P2Repository: Send + Sync {
    // ==================== Containers ====================

    /// List the observing runs visible to the authenticated user.
    async fn list_runs(&self) -> RemoteResult<Vec<RunInfo>>;

    /// List the direct children of a container.
    ///
    /// # Returns
    /// * `Ok(Vec<ContainerItem>)` - Items in display order
    /// * `Err(RemoteError::NotFound)` - If the container doesn't exist
    async fn list_items(&self, container_id: ContainerId) -> RemoteResult<Vec<ContainerItem>>;

    /// Create a folder under `parent_id`.
    async fn create_folder(
        &self,
        parent_id: ContainerId,
        name: &str,
    ) -> RemoteResult<(ContainerItem, Version)>;

    /// Create a concatenation under `parent_id`.
    async fn create_concatenation(
        &self,
        parent_id: ContainerId,
        name: &str,
    ) -> RemoteResult<(ContainerItem, Version)>;

    // ==================== Observing Blocks ====================

    /// Create an empty Observing Block named `label` under `parent_id`.
    ///
    /// # Returns
    /// * `Ok((ObDocument, Version))` - The OB shell and its initial version
    async fn create_ob(
        &self,
        parent_id: ContainerId,
        label: &str,
    ) -> RemoteResult<(ObDocument, Version)>;

    /// Save an Observing Block.
    ///
    /// # Arguments
    /// * `ob` - Full document to store
    /// * `version` - Version received on the last create/save of this OB
    ///
    /// # Returns
    /// * `Ok((ObDocument, Version))` - The stored document and its new version
    /// * `Err(RemoteError::VersionConflict)` - If `version` is not current
    async fn save_ob(&self, ob: &ObDocument, version: &Version)
        -> RemoteResult<(ObDocument, Version)>;

    // ==================== Templates ====================

    /// Attach a new template named `template_name` to an Observing Block.
    ///
    /// Templates are appended; their order is the execution order.
    async fn create_template(
        &self,
        ob_id: ObId,
        template_name: &str,
    ) -> RemoteResult<(TemplateDocument, Version)>;

    /// Set parameters of a template.
    ///
    /// # Arguments
    /// * `ob_id` - Owning Observing Block
    /// * `template` - Template as last received from the store
    /// * `params` - Parameters to set; others keep their current value
    /// * `version` - Version received on the last create/save of this template
    async fn save_template(
        &self,
        ob_id: ObId,
        template: &TemplateDocument,
        params: &[TemplateParam],
        version: &Version,
    ) -> RemoteResult<(TemplateDocument, Version)>;
}
