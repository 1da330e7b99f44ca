//! Agent infrastructure for hookweave.
//!
//! - [`TracingSetup`] - installs the `tracing` subscriber the engine logs to
//! - [`Agent`] - builds a ready [`HookDispatcher`](hookweave_dispatch::HookDispatcher)
//!   from an [`AgentConfig`]

/// Agent configuration and dispatcher bootstrap.
pub mod bootstrap;

/// Tracing subscriber setup.
pub mod tracing_setup;

pub use bootstrap::{Agent, AgentConfig, BootstrapError};
pub use tracing_setup::{TracingConfig, TracingFormat, TracingSetup};
