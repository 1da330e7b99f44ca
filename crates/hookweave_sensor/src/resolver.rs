//! Hook resolution contract.
//!
//! The dispatcher never owns sensors. It asks a [`HookResolver`] for the
//! shared hook of a sensor type, and for the two well-known sensors it treats
//! specially: the invocation-tree sensor and the exception sensor.

use core::fmt;
use std::sync::Arc;

use crate::hook::{ExceptionSensorHook, HookHandle, InvocationTreeHook};
use crate::id::SensorTypeId;

/// The well-known invocation-tree sensor: its type id and its hook.
#[derive(Clone)]
pub struct TreeSensor {
    /// Sensor-type id of the invocation-tree sensor.
    pub id: SensorTypeId,
    /// The shared tree-building hook.
    pub hook: Arc<dyn InvocationTreeHook>,
}

impl fmt::Debug for TreeSensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeSensor").field("id", &self.id).finish_non_exhaustive()
    }
}

/// The well-known exception sensor: its type id and its hook.
#[derive(Clone)]
pub struct ExceptionSensor {
    /// Sensor-type id of the exception sensor.
    pub id: SensorTypeId,
    /// The shared exception hook.
    pub hook: Arc<dyn ExceptionSensorHook>,
}

impl fmt::Debug for ExceptionSensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExceptionSensor")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// Resolves sensor types to their shared hooks.
///
/// Called on application threads during dispatch, so implementations must be
/// cheap and must never block on I/O. While the dispatcher catches panics, a
/// panicking resolver is treated like a failing hook: it is counted and the
/// dispatch behaves as if nothing was resolved. Resolvers may query the dispatcher's state.
pub trait HookResolver: Send + Sync {
    /// Returns the hook of `sensor_type`, or `None` if it is unknown.
    fn hook_for(&self, sensor_type: SensorTypeId) -> Option<HookHandle>;

    /// Returns the invocation-tree sensor, if one is installed.
    fn invocation_tree_sensor(&self) -> Option<TreeSensor>;

    /// Returns the exception sensor, if one is installed.
    fn exception_sensor(&self) -> Option<ExceptionSensor>;
}
