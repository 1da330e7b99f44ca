//! Dispatcher configuration.

use serde::{Deserialize, Serialize};

/// Behavior switches of a [`HookDispatcher`](crate::HookDispatcher).
///
/// Both switches default to `true`; turning them off is meant for debugging
/// sensors, not for production agents.
///
/// # Example
///
/// ```
/// use hookweave_dispatch::DispatcherConfig;
///
/// let config = DispatcherConfig::default().with_catch_panics(false);
/// assert!(config.reentrancy_guard);
/// assert!(!config.catch_panics);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Skip dispatches triggered on a thread that is already inside a
    /// dispatch of the same dispatcher, e.g. a sensor calling instrumented code.
    pub reentrancy_guard: bool,
    /// Convert panicking hooks into logged hook failures.
    pub catch_panics: bool,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            reentrancy_guard: true,
            catch_panics: true,
        }
    }
}

impl DispatcherConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables the re-entrancy guard.
    #[must_use]
    pub fn with_reentrancy_guard(mut self, enabled: bool) -> Self {
        self.reentrancy_guard = enabled;
        self
    }

    /// Enables or disables panic isolation.
    #[must_use]
    pub fn with_catch_panics(mut self, enabled: bool) -> Self {
        self.catch_panics = enabled;
        self
    }
}
