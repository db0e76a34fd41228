//! Container preparation on the P2 store.
//!
//! Every OB of a configuration lands in the same container:
//! `Run → Folder [→ Concatenation]`. The folder is reused when it already
//! exists; a concatenation is created fresh on every run of the tool.

use log::info;
use thiserror::Error;

use crate::api::{ContainerId, ContainerItem, ItemType, RunInfo};
use crate::config::SetupConfig;
use crate::error::ConfigurationError;
use crate::p2::repository::{P2Repository, RemoteError, RemoteResult};

/// Failures while locating the target container.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("Run '{run_id}' not found (available runs: {})", .available.join(", "))]
    RunNotFound {
        run_id: String,
        available: Vec<String>,
    },

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Remote(#[from] RemoteError),
}

/// Where the OBs of one configuration are created.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedContainer {
    pub run: RunInfo,
    pub folder_id: ContainerId,
    /// Folder, or the concatenation inside it
    pub container_id: ContainerId,
}

/// Find a direct child of `container_id` by name and type.
pub async fn find_item(
    repo: &dyn P2Repository,
    container_id: ContainerId,
    name: &str,
    item_type: ItemType,
) -> RemoteResult<Option<ContainerItem>> {
    let items = repo.list_items(container_id).await?;
    Ok(items
        .into_iter()
        .find(|item| item.item_type == item_type && item.name == name))
}

fn container_of(item: &ContainerItem) -> RemoteResult<ContainerId> {
    item.container_id.ok_or_else(|| {
        RemoteError::decode(format!("{} '{}' has no container id", item.item_type, item.name))
    })
}

/// Locate the run, find or create the folder, then create the
/// concatenation unless disabled.
pub async fn prepare_container(
    repo: &dyn P2Repository,
    setup: &SetupConfig,
) -> Result<PreparedContainer, SetupError> {
    let runs = repo.list_runs().await?;
    let run = match runs.iter().find(|r| r.prog_id == setup.run_id) {
        Some(run) => run.clone(),
        None => {
            return Err(SetupError::RunNotFound {
                run_id: setup.run_id.clone(),
                available: runs.into_iter().map(|r| r.prog_id).collect(),
            })
        }
    };

    let folder = match find_item(repo, run.container_id, &setup.folder, ItemType::Folder).await? {
        Some(folder) => folder,
        None => {
            info!("Creating folder '{}' in run '{}'", setup.folder, run.prog_id);
            let (folder, _) = repo.create_folder(run.container_id, &setup.folder).await?;
            folder
        }
    };
    let folder_id = container_of(&folder)?;

    let container_id = match setup.concatenation_name() {
        Some(name) => {
            info!("Creating concatenation '{}' in folder '{}'", name, setup.folder);
            let (concatenation, _) = repo.create_concatenation(folder_id, name).await?;
            container_of(&concatenation)?
        }
        None => folder_id,
    };

    Ok(PreparedContainer {
        run,
        folder_id,
        container_id,
    })
}
