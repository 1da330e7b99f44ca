//! Error types for sensor hooks and hook resolution.

use crate::id::SensorTypeId;

/// Failure reported by a sensor hook.
///
/// Hook failures never reach the monitored application; the dispatcher logs
/// them and continues with the next hook.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HookError {
    /// The hook returned an error.
    #[error("sensor hook failed: {0}")]
    Failed(String),

    /// The hook panicked while being dispatched.
    #[error("sensor hook panicked: {0}")]
    Panicked(String),
}

impl HookError {
    /// Creates a [`HookError::Failed`] from any displayable reason.
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed(reason.into())
    }
}

/// Result returned by every hook callback.
pub type HookResult = Result<(), HookError>;

/// Errors that can occur while registering hooks in a
/// [`SensorCatalog`](crate::catalog::SensorCatalog).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    /// A hook is already registered for this sensor type.
    #[error("a hook is already registered for {0}")]
    DuplicateSensorType(SensorTypeId),
}
