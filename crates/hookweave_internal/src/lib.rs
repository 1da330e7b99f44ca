//! # Hookweave Internal Library
//!
//! Re-exports the core hookweave crates for convenience.

/// Layer 1: sensor identifiers, hook contracts and the hook resolver.
pub use hookweave_sensor;

/// Layer 2: sensor registry, invocation context and hook dispatcher.
pub use hookweave_dispatch;

/// Agent infrastructure: tracing setup and dispatcher bootstrap.
#[cfg(feature = "core")]
pub use hookweave_core;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use hookweave_dispatch::prelude::*;
    pub use hookweave_sensor::prelude::*;

    #[cfg(feature = "core")]
    pub use hookweave_core::{Agent, AgentConfig, TracingConfig, TracingFormat, TracingSetup};
}
