//! Hook dispatch and invocation-tree correlation for hookweave (Layer 2).
//!
//! Instrumented methods and constructors call fixed entry points of a
//! [`HookDispatcher`]. For every call the dispatcher looks up the site in the
//! [`SensorRegistry`], dispatches to the attached sensor hooks in wrap order,
//! and, while an invocation-tree recording is active on the calling thread,
//! threads the call into that tree and substitutes the tree hook as data sink.
//!
//! # Core Concepts
//!
//! - [`SensorRegistry`] - Site id to [`SensorConfig`](hookweave_sensor::config::SensorConfig), wait-free reads
//! - [`InvocationContext`] - Per-thread recording state
//! - [`HookDispatcher`] - The entry points called by instrumented code
//! - [`DispatcherConfig`] - Re-entrancy and panic isolation switches
//!
//! # Example
//!
//! ```ignore
//! use hookweave_dispatch::{HookDispatch, HookDispatchMapper, HookDispatcher};
//!
//! let dispatcher = HookDispatcher::new(catalog, core_service);
//! dispatcher.register_method_mapping(SiteId::new(3), config);
//!
//! // emitted by the instrumentation layer around the method body
//! dispatcher.dispatch_method_before_body(SiteId::new(3), Some(&receiver), &[]);
//! dispatcher.dispatch_first_method_after_body(SiteId::new(3), Some(&receiver), &[], None);
//! dispatcher.dispatch_second_method_after_body(SiteId::new(3), Some(&receiver), &[], None);
//! ```
//!
//! # Architecture
//!
//! - **Layer 1** (`hookweave_sensor`): contracts between engine and sensors
//! - **Layer 2** (`hookweave_dispatch`): registry, invocation context, dispatcher (this crate)

/// Dispatcher configuration.
pub mod config;

/// Per-thread invocation-tree state.
pub mod context;

/// Dispatch entry points.
pub mod dispatcher;

/// Site id to sensor configuration mapping.
pub mod registry;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::config::DispatcherConfig;
    pub use crate::context::InvocationContext;
    pub use crate::dispatcher::{DispatchPhase, HookDispatch, HookDispatchMapper, HookDispatcher};
    pub use crate::registry::SensorRegistry;
}

// Re-export key types at crate root for convenience
pub use config::DispatcherConfig;
pub use context::InvocationContext;
pub use dispatcher::{DispatchPhase, HookDispatch, HookDispatchMapper, HookDispatcher};
pub use registry::SensorRegistry;
