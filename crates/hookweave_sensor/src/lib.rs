//! Sensor-side primitives for hookweave (Layer 1).
//!
//! `hookweave_sensor` defines everything the dispatch engine and the sensor
//! implementations agree on:
//!
//! - [`id`] - Site and sensor-type identifiers
//! - [`object`] - Opaque handles for receivers, arguments and return values
//! - [`config`] - Per-site [`SensorConfig`](config::SensorConfig)
//! - [`hook`] - Method, constructor and exception hook contracts
//! - [`sink`] - The data sink handed to after-body dispatches
//! - [`resolver`] - Sensor-type to hook resolution
//! - [`catalog`] - The default thread-safe resolver
//!
//! # Architecture
//!
//! - **Layer 1** (`hookweave_sensor`): contracts between engine and sensors (this crate)
//! - **Layer 2** (`hookweave_dispatch`): registry, invocation context, dispatcher
//! - **Infrastructure** (`hookweave_core`): tracing setup and bootstrap

/// Site and sensor-type identifiers.
pub mod id;

/// Opaque object handles passed through to hooks.
pub mod object;

/// Per-site sensor configuration.
pub mod config;

/// Error types for hooks and resolution.
pub mod error;

/// Hook contracts implemented by sensors.
pub mod hook;

/// Data sinks for finalized measurements.
pub mod sink;

/// Hook resolution contract.
pub mod resolver;

/// Default hook resolver.
pub mod catalog;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::catalog::SensorCatalog;
    pub use crate::config::{ExceptionWiring, SensorConfig, SensorConfigBuilder};
    pub use crate::error::{CatalogError, HookError, HookResult};
    pub use crate::hook::{
        ConstructorHook, ExceptionSensorHook, HookHandle, InvocationTreeHook, MethodHook,
    };
    pub use crate::id::{SensorTypeId, SiteId};
    pub use crate::object::Object;
    pub use crate::resolver::{ExceptionSensor, HookResolver, TreeSensor};
    pub use crate::sink::{CoreService, SensorData, Sink, SinkKind};
}
