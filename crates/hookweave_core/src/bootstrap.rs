//! Agent configuration and dispatcher bootstrap.
//!
//! [`Agent::start`] turns an [`AgentConfig`] into a running engine: it
//! installs tracing and builds the [`HookDispatcher`] the instrumentation
//! layer calls into.
//!
//! # Example
//!
//! ```ignore
//! use hookweave_core::{Agent, AgentConfig};
//!
//! let config = AgentConfig::from_json(r#"{
//!     "tracing": { "level": "debug", "format": "compact" },
//!     "dispatcher": { "catch_panics": true }
//! }"#)?;
//! let agent = Agent::start(config, catalog, core_service)?;
//! agent.dispatcher().register_method_mapping(site, sensor_config);
//! ```

use std::sync::Arc;

use hookweave_dispatch::{DispatcherConfig, HookDispatcher};
use hookweave_sensor::resolver::HookResolver;
use hookweave_sensor::sink::CoreService;
use serde::{Deserialize, Serialize};

use crate::tracing_setup::{TracingConfig, TracingSetup};

/// Errors that can occur while bootstrapping the agent.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    /// The configuration document could not be parsed.
    #[error("invalid agent configuration: {0}")]
    InvalidConfig(#[from] serde_json::Error),

    /// The configured log level is not a tracing level.
    #[error("invalid log level: {0:?}")]
    InvalidLevel(String),
}

// ─────────────────────────────────────────────────────────────────────────────
// AgentConfig
// ─────────────────────────────────────────────────────────────────────────────

/// Complete agent configuration. Every section is optional in the serialized
/// form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Logging settings.
    pub tracing: TracingConfig,
    /// Dispatcher settings.
    pub dispatcher: DispatcherConfig,
}

impl AgentConfig {
    /// Parses a JSON configuration document.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError::InvalidConfig`] if `json` is malformed or
    /// has fields of the wrong type.
    pub fn from_json(json: &str) -> Result<Self, BootstrapError> {
        Ok(serde_json::from_str(json)?)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Agent
// ─────────────────────────────────────────────────────────────────────────────

/// A started agent.
#[derive(Debug)]
pub struct Agent {
    config: AgentConfig,
    dispatcher: Arc<HookDispatcher>,
}

impl Agent {
    /// Installs tracing and creates the dispatcher.
    ///
    /// An already installed global subscriber is kept.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError::InvalidLevel`] if the tracing level is
    /// invalid. Nothing is installed in that case.
    pub fn start(
        config: AgentConfig,
        resolver: Arc<dyn HookResolver>,
        core_service: Arc<dyn CoreService>,
    ) -> Result<Self, BootstrapError> {
        let setup = TracingSetup::from_config(&config.tracing)?;
        setup.init();

        let dispatcher = Arc::new(HookDispatcher::with_config(
            resolver,
            core_service,
            config.dispatcher,
        ));
        tracing::debug!(
            reentrancy_guard = config.dispatcher.reentrancy_guard,
            catch_panics = config.dispatcher.catch_panics,
            "hook dispatcher started"
        );

        Ok(Self { config, dispatcher })
    }

    /// Returns the dispatcher the instrumentation layer calls into.
    #[must_use]
    pub fn dispatcher(&self) -> &Arc<HookDispatcher> {
        &self.dispatcher
    }

    /// Returns the configuration the agent was started with.
    #[must_use]
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracing_setup::TracingFormat;

    #[test]
    fn empty_document_yields_defaults() {
        let config = AgentConfig::from_json("{}").expect("valid config");
        assert_eq!(config, AgentConfig::default());
        assert!(config.dispatcher.reentrancy_guard);
        assert!(config.dispatcher.catch_panics);
    }

    #[test]
    fn sections_are_parsed() {
        let config = AgentConfig::from_json(
            r#"{
                "tracing": { "level": "trace", "format": "compact", "span_events": true },
                "dispatcher": { "reentrancy_guard": false }
            }"#,
        )
        .expect("valid config");

        assert_eq!(config.tracing.level, "trace");
        assert_eq!(config.tracing.format, TracingFormat::Compact);
        assert!(config.tracing.span_events);
        assert!(!config.dispatcher.reentrancy_guard);
        assert!(config.dispatcher.catch_panics);
    }

    #[test]
    fn malformed_document_is_rejected() {
        let err = AgentConfig::from_json(r#"{ "dispatcher": { "catch_panics": "yes" } }"#)
            .unwrap_err();
        assert!(matches!(err, BootstrapError::InvalidConfig(_)));
    }
}
