//! Lifecycle of a locally prepared object mirrored on the remote store.
//!
//! ```text
//! Pending ──create──▶ Created ──update──▶ Synced
//!                       ▲  │                │
//!                       └──┘ (failed update)│
//!                                  ◀──update┘
//! ```
//!
//! The remote handle (document and version) only exists inside `Created` and
//! `Synced`, so code holding a `Pending` value has nothing it could save.

use std::fmt;

use crate::api::{ContainerId, ObDocument, ObId, TemplateDocument, Version};

/// Synchronization state carrying the remote handle `H` once created.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncState<H> {
    /// Exists locally only
    Pending,
    /// Created remotely; local changes not (fully) pushed
    Created(H),
    /// Last update pushed successfully
    Synced(H),
}

impl<H> Default for SyncState<H> {
    fn default() -> Self {
        SyncState::Pending
    }
}

impl<H> SyncState<H> {
    pub fn is_pending(&self) -> bool {
        matches!(self, SyncState::Pending)
    }

    pub fn is_synced(&self) -> bool {
        matches!(self, SyncState::Synced(_))
    }

    pub fn handle(&self) -> Option<&H> {
        match self {
            SyncState::Pending => None,
            SyncState::Created(h) | SyncState::Synced(h) => Some(h),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SyncState::Pending => "pending",
            SyncState::Created(_) => "created",
            SyncState::Synced(_) => "synced",
        }
    }
}

impl<H> fmt::Display for SyncState<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Remote handle of an Observing Block.
#[derive(Debug, Clone, PartialEq)]
pub struct ObHandle {
    pub container_id: ContainerId,
    pub document: ObDocument,
    pub version: Version,
}

impl ObHandle {
    pub fn ob_id(&self) -> ObId {
        self.document.ob_id
    }
}

/// Remote handle of a template, bound to its parent OB.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateHandle {
    pub ob_id: ObId,
    pub document: TemplateDocument,
    pub version: Version,
}
