//! Error types for remote store operations.
//!
//! Every failure of the P2 boundary is a [`RemoteError`] carrying an
//! [`ErrorContext`] that names the operation and the entity involved, so an
//! operator can find the half-written item on the remote side.
//!
//! None of these errors are retried: remote mutations are not idempotent.

use std::fmt;

/// Result type for remote store operations
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Structured context for remote errors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorContext {
    /// The operation being performed (e.g., "create_ob", "save_template")
    pub operation: Option<String>,
    /// The entity type involved (e.g., "ob", "template", "folder")
    pub entity: Option<String>,
    /// The entity ID if applicable
    pub entity_id: Option<String>,
    /// Additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with an operation name.
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: Some(operation.into()),
            ..Default::default()
        }
    }

    /// Set the entity type.
    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }

    /// Set the entity ID.
    pub fn with_entity_id(mut self, id: impl ToString) -> Self {
        self.entity_id = Some(id.to_string());
        self
    }

    /// Set additional details.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(ref op) = self.operation {
            parts.push(format!("operation={}", op));
        }
        if let Some(ref entity) = self.entity {
            parts.push(format!("entity={}", entity));
        }
        if let Some(ref id) = self.entity_id {
            parts.push(format!("id={}", id));
        }
        if let Some(ref details) = self.details {
            parts.push(format!("details={}", details));
        }
        write!(f, "[{}]", parts.join(", "))
    }
}

/// Error type for remote store operations
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    /// Network failure or unexpected server-side status.
    #[error("Transport error: {message} {context}")]
    Transport {
        message: String,
        context: ErrorContext,
    },

    /// Login refused or session no longer valid.
    #[error("Authentication error: {message} {context}")]
    Authentication {
        message: String,
        context: ErrorContext,
    },

    /// Requested entity does not exist on the store.
    #[error("Not found: {message} {context}")]
    NotFound {
        message: String,
        context: ErrorContext,
    },

    /// The store understood the request and refused it (duplicate name,
    /// invalid parameter value, item not editable).
    #[error("Rejected by remote store: {message} {context}")]
    Rejected {
        message: String,
        context: ErrorContext,
    },

    /// A save presented a version older than the one held by the store.
    #[error("Version conflict: {message} {context}")]
    VersionConflict {
        message: String,
        context: ErrorContext,
    },

    /// The store answered with a payload that could not be decoded.
    #[error("Decode error: {message} {context}")]
    Decode {
        message: String,
        context: ErrorContext,
    },
}

impl RemoteError {
    /// Create a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// Create an authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// Create a not found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// Create a not found error with context.
    pub fn not_found_with_context(message: impl Into<String>, context: ErrorContext) -> Self {
        Self::NotFound {
            message: message.into(),
            context,
        }
    }

    /// Create a rejection error.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// Create a rejection error with context.
    pub fn rejected_with_context(message: impl Into<String>, context: ErrorContext) -> Self {
        Self::Rejected {
            message: message.into(),
            context,
        }
    }

    /// Create a version conflict error.
    pub fn version_conflict(message: impl Into<String>) -> Self {
        Self::VersionConflict {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// Create a version conflict error with context.
    pub fn version_conflict_with_context(
        message: impl Into<String>,
        context: ErrorContext,
    ) -> Self {
        Self::VersionConflict {
            message: message.into(),
            context,
        }
    }

    /// Create a decode error.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// True for semantic refusals by the store, as opposed to transport or
    /// authentication failures.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected { .. } | Self::VersionConflict { .. })
    }

    /// True when the store refused a save because of a stale version.
    pub fn is_version_conflict(&self) -> bool {
        matches!(self, Self::VersionConflict { .. })
    }

    /// Get the error context.
    pub fn context(&self) -> &ErrorContext {
        match self {
            Self::Transport { context, .. } => context,
            Self::Authentication { context, .. } => context,
            Self::NotFound { context, .. } => context,
            Self::Rejected { context, .. } => context,
            Self::VersionConflict { context, .. } => context,
            Self::Decode { context, .. } => context,
        }
    }

    fn context_mut(&mut self) -> &mut ErrorContext {
        match self {
            Self::Transport { context, .. }
            | Self::Authentication { context, .. }
            | Self::NotFound { context, .. }
            | Self::Rejected { context, .. }
            | Self::VersionConflict { context, .. }
            | Self::Decode { context, .. } => context,
        }
    }

    /// Add or update the operation in the error context.
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.context_mut().operation = Some(operation.into());
        self
    }

    /// Add or update the entity in the error context.
    pub fn with_entity(mut self, entity: impl Into<String>, id: impl ToString) -> Self {
        let context = self.context_mut();
        context.entity = Some(entity.into());
        context.entity_id = Some(id.to_string());
        self
    }
}

#[cfg(feature = "http-client")]
impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            RemoteError::decode(err.to_string())
        } else {
            RemoteError::transport(err.to_string())
        }
    }
}
