//! In-memory local repository implementation.
//!
//! This module provides a local implementation of [`P2Repository`] suitable
//! for unit testing and dry runs. All data is stored in memory using HashMap
//! and Vec structures, providing fast, deterministic, and isolated execution.
//!
//! Versions are integer counters rendered as [`Version`] tags. They start at 1
//! on creation and increase by one on every successful save, so tests can
//! assert exactly how many saves reached the store.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::api::{
    ContainerId, ContainerItem, ItemType, ObDocument, ObId, RunInfo, TemplateDocument,
    TemplateId, TemplateParam, Version,
};
use crate::p2::repository::{ErrorContext, P2Repository, RemoteError, RemoteResult};

/// In-memory local repository.
///
/// # Example
/// ```
/// use p2_gravity::p2::repositories::LocalP2Repository;
///
/// let repo = LocalP2Repository::new();
/// let run = repo.add_run("60.A-9252(M)", "GRAVITY");
/// assert_eq!(repo.ob_count(), 0);
/// assert!(run.container_id.value() > 0);
/// ```
#[derive(Clone)]
pub struct LocalP2Repository {
    data: Arc<RwLock<LocalData>>,
}

struct ContainerNode {
    item: ContainerItem,
    version: u64,
    children: Vec<ContainerItem>,
}

struct StoredTemplate {
    doc: TemplateDocument,
    version: u64,
}

struct StoredOb {
    doc: ObDocument,
    version: u64,
    templates: Vec<StoredTemplate>,
}

struct LocalData {
    runs: Vec<RunInfo>,
    containers: HashMap<ContainerId, ContainerNode>,
    obs: HashMap<ObId, StoredOb>,

    // Names of every operation received, in order
    journal: Vec<String>,
    // Operation name -> error to return on its next call
    injected_failures: HashMap<String, RemoteError>,

    next_container_id: i64,
    next_ob_id: i64,
    next_template_id: i64,

    is_healthy: bool,
}

impl Default for LocalData {
    fn default() -> Self {
        Self {
            runs: Vec::new(),
            containers: HashMap::new(),
            obs: HashMap::new(),
            journal: Vec::new(),
            injected_failures: HashMap::new(),
            next_container_id: 1,
            next_ob_id: 1,
            next_template_id: 1,
            is_healthy: true,
        }
    }
}

fn version_tag(counter: u64) -> Version {
    Version::new(counter.to_string())
}

fn check_version(
    presented: &Version,
    current: u64,
    context: ErrorContext,
) -> RemoteResult<()> {
    if presented.as_str() == current.to_string() {
        return Ok(());
    }
    Err(RemoteError::version_conflict_with_context(
        format!(
            "presented version {} but current version is {}",
            presented, current
        ),
        context,
    ))
}

fn template_type(template_name: &str) -> &'static str {
    if template_name.ends_with("_acq") {
        "acquisition"
    } else if template_name.contains("calibrator") {
        "calibration"
    } else {
        "science"
    }
}

impl LocalP2Repository {
    /// Create a new empty local repository.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(LocalData::default())),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, LocalData> {
        self.data.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, LocalData> {
        self.data.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Register an observing run and its top-level container.
    pub fn add_run(&self, prog_id: &str, instrument: &str) -> RunInfo {
        let mut data = self.write();
        let container_id = ContainerId(data.next_container_id);
        data.next_container_id += 1;
        let run = RunInfo {
            run_id: data.runs.len() as i64 + 1,
            prog_id: prog_id.to_string(),
            container_id,
            instrument: instrument.to_string(),
        };
        data.containers.insert(
            container_id,
            ContainerNode {
                item: ContainerItem {
                    item_type: ItemType::Folder,
                    name: prog_id.to_string(),
                    container_id: Some(container_id),
                    ob_id: None,
                },
                version: 1,
                children: Vec::new(),
            },
        );
        data.runs.push(run.clone());
        run
    }

    /// Set the health status for testing connection failures.
    pub fn set_healthy(&self, healthy: bool) {
        self.write().is_healthy = healthy;
    }

    /// Make the next call of `operation` fail with `error`.
    ///
    /// `operation` is the trait method name, e.g. `"create_template"`.
    pub fn fail_next(&self, operation: &str, error: RemoteError) {
        self.write()
            .injected_failures
            .insert(operation.to_string(), error);
    }

    /// Simulate an edit made through another session: bumps the OB version
    /// without changing its content.
    pub fn touch_ob(&self, ob_id: ObId) -> bool {
        let mut data = self.write();
        match data.obs.get_mut(&ob_id) {
            Some(stored) => {
                stored.version += 1;
                true
            }
            None => false,
        }
    }

    /// Names of all operations received so far, in call order.
    pub fn journal(&self) -> Vec<String> {
        self.read().journal.clone()
    }

    /// Total number of operations received.
    pub fn call_count(&self) -> usize {
        self.read().journal.len()
    }

    /// Number of Observing Blocks stored.
    pub fn ob_count(&self) -> usize {
        self.read().obs.len()
    }

    /// Current document of an Observing Block.
    pub fn ob(&self, ob_id: ObId) -> Option<ObDocument> {
        self.read().obs.get(&ob_id).map(|s| s.doc.clone())
    }

    /// Current version counter of an Observing Block.
    pub fn ob_version(&self, ob_id: ObId) -> Option<u64> {
        self.read().obs.get(&ob_id).map(|s| s.version)
    }

    /// Templates of an Observing Block in execution order.
    pub fn templates(&self, ob_id: ObId) -> Vec<TemplateDocument> {
        self.read()
            .obs
            .get(&ob_id)
            .map(|s| s.templates.iter().map(|t| t.doc.clone()).collect())
            .unwrap_or_default()
    }

    /// Version counters of the templates of an Observing Block.
    pub fn template_versions(&self, ob_id: ObId) -> Vec<u64> {
        self.read()
            .obs
            .get(&ob_id)
            .map(|s| s.templates.iter().map(|t| t.version).collect())
            .unwrap_or_default()
    }

    /// Observing Blocks stored directly under a container.
    pub fn obs_in(&self, container_id: ContainerId) -> Vec<ObDocument> {
        let data = self.read();
        data.containers
            .get(&container_id)
            .map(|node| {
                node.children
                    .iter()
                    .filter_map(|child| child.ob_id)
                    .filter_map(|ob_id| data.obs.get(&ob_id).map(|s| s.doc.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Record the call, then fail if unhealthy or if a failure was injected.
    fn enter(&self, operation: &str) -> RemoteResult<()> {
        let mut data = self.write();
        data.journal.push(operation.to_string());
        if !data.is_healthy {
            return Err(
                RemoteError::transport("Remote store is not reachable").with_operation(operation)
            );
        }
        if let Some(err) = data.injected_failures.remove(operation) {
            return Err(err.with_operation(operation));
        }
        Ok(())
    }

    fn create_container(
        &self,
        parent_id: ContainerId,
        name: &str,
        item_type: ItemType,
        operation: &str,
    ) -> RemoteResult<(ContainerItem, Version)> {
        let mut data = self.write();
        let context = ErrorContext::new(operation)
            .with_entity("container")
            .with_entity_id(parent_id);
        if name.trim().is_empty() {
            return Err(RemoteError::rejected_with_context(
                format!("{} name must not be empty", item_type),
                context,
            ));
        }
        if !data.containers.contains_key(&parent_id) {
            return Err(RemoteError::not_found_with_context(
                format!("Container {} not found", parent_id),
                context,
            ));
        }
        let container_id = ContainerId(data.next_container_id);
        data.next_container_id += 1;
        let item = ContainerItem {
            item_type,
            name: name.to_string(),
            container_id: Some(container_id),
            ob_id: None,
        };
        data.containers.insert(
            container_id,
            ContainerNode {
                item: item.clone(),
                version: 1,
                children: Vec::new(),
            },
        );
        if let Some(parent) = data.containers.get_mut(&parent_id) {
            parent.children.push(item.clone());
        }
        Ok((item, version_tag(1)))
    }
}

impl Default for LocalP2Repository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl P2Repository for LocalP2Repository {
    async fn list_runs(&self) -> RemoteResult<Vec<RunInfo>> {
        self.enter("list_runs")?;
        Ok(self.read().runs.clone())
    }

    async fn list_items(&self, container_id: ContainerId) -> RemoteResult<Vec<ContainerItem>> {
        self.enter("list_items")?;
        let data = self.read();
        data.containers
            .get(&container_id)
            .map(|node| node.children.clone())
            .ok_or_else(|| {
                RemoteError::not_found_with_context(
                    format!("Container {} not found", container_id),
                    ErrorContext::new("list_items")
                        .with_entity("container")
                        .with_entity_id(container_id),
                )
            })
    }

    async fn create_folder(
        &self,
        parent_id: ContainerId,
        name: &str,
    ) -> RemoteResult<(ContainerItem, Version)> {
        self.enter("create_folder")?;
        self.create_container(parent_id, name, ItemType::Folder, "create_folder")
    }

    async fn create_concatenation(
        &self,
        parent_id: ContainerId,
        name: &str,
    ) -> RemoteResult<(ContainerItem, Version)> {
        self.enter("create_concatenation")?;
        self.create_container(
            parent_id,
            name,
            ItemType::Concatenation,
            "create_concatenation",
        )
    }

    async fn create_ob(
        &self,
        parent_id: ContainerId,
        label: &str,
    ) -> RemoteResult<(ObDocument, Version)> {
        self.enter("create_ob")?;
        let mut data = self.write();
        let context = ErrorContext::new("create_ob")
            .with_entity("container")
            .with_entity_id(parent_id);
        if label.trim().is_empty() {
            return Err(RemoteError::rejected_with_context(
                "OB name must not be empty",
                context,
            ));
        }
        if !data.containers.contains_key(&parent_id) {
            return Err(RemoteError::not_found_with_context(
                format!("Container {} not found", parent_id),
                context,
            ));
        }

        let ob_id = ObId(data.next_ob_id);
        data.next_ob_id += 1;
        let doc = ObDocument::new(ob_id, label);
        data.obs.insert(
            ob_id,
            StoredOb {
                doc: doc.clone(),
                version: 1,
                templates: Vec::new(),
            },
        );
        if let Some(parent) = data.containers.get_mut(&parent_id) {
            parent.version += 1;
            parent.children.push(ContainerItem {
                item_type: ItemType::OB,
                name: label.to_string(),
                container_id: None,
                ob_id: Some(ob_id),
            });
        }
        Ok((doc, version_tag(1)))
    }

    async fn save_ob(
        &self,
        ob: &ObDocument,
        version: &Version,
    ) -> RemoteResult<(ObDocument, Version)> {
        self.enter("save_ob")?;
        let mut data = self.write();
        let context = ErrorContext::new("save_ob")
            .with_entity("ob")
            .with_entity_id(ob.ob_id);
        let stored = data.obs.get_mut(&ob.ob_id).ok_or_else(|| {
            RemoteError::not_found_with_context(
                format!("OB {} not found", ob.ob_id),
                context.clone(),
            )
        })?;
        check_version(version, stored.version, context)?;

        stored.doc = ob.clone();
        stored.version += 1;
        Ok((stored.doc.clone(), version_tag(stored.version)))
    }

    async fn create_template(
        &self,
        ob_id: ObId,
        template_name: &str,
    ) -> RemoteResult<(TemplateDocument, Version)> {
        self.enter("create_template")?;
        let mut data = self.write();
        let template_id = TemplateId(data.next_template_id);
        let stored = data.obs.get_mut(&ob_id).ok_or_else(|| {
            RemoteError::not_found_with_context(
                format!("OB {} not found", ob_id),
                ErrorContext::new("create_template")
                    .with_entity("ob")
                    .with_entity_id(ob_id),
            )
        })?;
        let is_acquisition = template_type(template_name) == "acquisition";
        if is_acquisition
            && stored
                .templates
                .iter()
                .any(|t| t.doc.template_type == "acquisition")
        {
            return Err(RemoteError::rejected_with_context(
                "OB already has an acquisition template",
                ErrorContext::new("create_template")
                    .with_entity("ob")
                    .with_entity_id(ob_id)
                    .with_details(template_name),
            ));
        }

        let doc = TemplateDocument {
            template_id,
            template_name: template_name.to_string(),
            template_type: template_type(template_name).to_string(),
            parameters: Vec::new(),
            extra: Default::default(),
        };
        stored.templates.push(StoredTemplate {
            doc: doc.clone(),
            version: 1,
        });
        data.next_template_id += 1;
        Ok((doc, version_tag(1)))
    }

    async fn save_template(
        &self,
        ob_id: ObId,
        template: &TemplateDocument,
        params: &[TemplateParam],
        version: &Version,
    ) -> RemoteResult<(TemplateDocument, Version)> {
        self.enter("save_template")?;
        let mut data = self.write();
        let context = ErrorContext::new("save_template")
            .with_entity("template")
            .with_entity_id(template.template_id);
        let stored = data
            .obs
            .get_mut(&ob_id)
            .and_then(|ob| {
                ob.templates
                    .iter_mut()
                    .find(|t| t.doc.template_id == template.template_id)
            })
            .ok_or_else(|| {
                RemoteError::not_found_with_context(
                    format!("Template {} not found in OB {}", template.template_id, ob_id),
                    context.clone(),
                )
            })?;
        check_version(version, stored.version, context)?;

        for param in params {
            match stored
                .doc
                .parameters
                .iter_mut()
                .find(|p| p.name == param.name)
            {
                Some(existing) => existing.value = param.value.clone(),
                None => stored.doc.parameters.push(param.clone()),
            }
        }
        stored.version += 1;
        Ok((stored.doc.clone(), version_tag(stored.version)))
    }
}

#[cfg(test)]
#[path = "local_tests.rs"]
mod local_tests;
