//! Hook contracts implemented by sensors.
//!
//! Every sensor type has one shared hook instance. The dispatcher calls it
//! at fixed points around an instrumented call:
//!
//! | Contract | Entry | After body | Exceptional |
//! |----------|-------|------------|-------------|
//! | [`MethodHook`] | `before_body` | `first_after_body`, `second_after_body` | |
//! | [`ConstructorHook`] | `before_constructor` | `after_constructor` | |
//! | [`ExceptionSensorHook`] | | | `dispatch_on_throw_in_body`, `dispatch_before_catch_body` |
//!
//! Only the second (terminal) after-body phase receives a [`Sink`]; the first
//! exists so sensors can snapshot post-return state with minimal latency.
//!
//! Hooks report failures through [`HookResult`]. A failing hook never stops
//! the remaining hooks from running.

use core::fmt;
use std::sync::Arc;

use crate::config::SensorConfig;
use crate::error::HookResult;
use crate::id::{SensorTypeId, SiteId};
use crate::object::Object;
use crate::sink::{CoreService, Sink};

// ─────────────────────────────────────────────────────────────────────────────
// MethodHook
// ─────────────────────────────────────────────────────────────────────────────

/// Hook invoked around instrumented methods.
pub trait MethodHook: Send + Sync {
    /// Called before the method body executes.
    fn before_body(
        &self,
        site: SiteId,
        sensor_type: SensorTypeId,
        receiver: Option<&dyn Object>,
        args: &[&dyn Object],
        config: &SensorConfig,
    ) -> HookResult;

    /// Called immediately after the method body returns.
    fn first_after_body(
        &self,
        site: SiteId,
        sensor_type: SensorTypeId,
        receiver: Option<&dyn Object>,
        args: &[&dyn Object],
        return_value: Option<&dyn Object>,
        config: &SensorConfig,
    ) -> HookResult {
        let _ = (site, sensor_type, receiver, args, return_value, config);
        Ok(())
    }

    /// Called after [`first_after_body`](Self::first_after_body) to finalize
    /// and store the measurement into `sink`.
    fn second_after_body(
        &self,
        sink: Sink<'_>,
        site: SiteId,
        sensor_type: SensorTypeId,
        receiver: Option<&dyn Object>,
        args: &[&dyn Object],
        return_value: Option<&dyn Object>,
        config: &SensorConfig,
    ) -> HookResult;
}

// ─────────────────────────────────────────────────────────────────────────────
// ConstructorHook
// ─────────────────────────────────────────────────────────────────────────────

/// Hook invoked around instrumented constructors.
pub trait ConstructorHook: Send + Sync {
    /// Called before the constructor body executes.
    fn before_constructor(
        &self,
        site: SiteId,
        sensor_type: SensorTypeId,
        args: &[&dyn Object],
        config: &SensorConfig,
    ) -> HookResult;

    /// Called after the constructor body completed, with the new instance.
    fn after_constructor(
        &self,
        sink: Sink<'_>,
        site: SiteId,
        sensor_type: SensorTypeId,
        instance: &dyn Object,
        args: &[&dyn Object],
        config: &SensorConfig,
    ) -> HookResult;
}

// ─────────────────────────────────────────────────────────────────────────────
// ExceptionSensorHook
// ─────────────────────────────────────────────────────────────────────────────

/// Hook of the well-known exception sensor.
///
/// Receives `config` as an `Option` because the throwing or catching site
/// does not need to be registered.
pub trait ExceptionSensorHook: Send + Sync {
    /// Called when an exception is thrown inside an instrumented body.
    fn dispatch_on_throw_in_body(
        &self,
        sink: Sink<'_>,
        site: SiteId,
        sensor_type: SensorTypeId,
        receiver: Option<&dyn Object>,
        exception: &dyn Object,
        args: &[&dyn Object],
        config: Option<&SensorConfig>,
    ) -> HookResult;

    /// Called when an exception is about to be handled by a catch block.
    fn dispatch_before_catch_body(
        &self,
        sink: Sink<'_>,
        site: SiteId,
        sensor_type: SensorTypeId,
        exception: &dyn Object,
        config: Option<&SensorConfig>,
    ) -> HookResult;
}

// ─────────────────────────────────────────────────────────────────────────────
// InvocationTreeHook
// ─────────────────────────────────────────────────────────────────────────────

/// Hook of the well-known invocation-tree sensor.
///
/// While a recording is active the tree hook is dispatched for every nested
/// instrumented call and doubles as the [`Sink`] of all other sensors, so
/// their data ends up attached to the tree.
pub trait InvocationTreeHook: MethodHook + ConstructorHook + CoreService {}

impl<T: MethodHook + ConstructorHook + CoreService> InvocationTreeHook for T {}

// ─────────────────────────────────────────────────────────────────────────────
// HookHandle
// ─────────────────────────────────────────────────────────────────────────────

/// Shared handle to the hook of one sensor type.
///
/// A handle exposes the method-side view, the constructor-side view, or both
/// views of the same hook instance. Dispatching a method call to a handle
/// without a method side skips it, and likewise for constructors.
#[derive(Clone)]
pub struct HookHandle {
    method: Option<Arc<dyn MethodHook>>,
    constructor: Option<Arc<dyn ConstructorHook>>,
}

impl HookHandle {
    /// Creates a handle for a hook that only instruments methods.
    #[must_use]
    pub fn for_methods<H: MethodHook + 'static>(hook: Arc<H>) -> Self {
        Self {
            method: Some(hook),
            constructor: None,
        }
    }

    /// Creates a handle for a hook that only instruments constructors.
    #[must_use]
    pub fn for_constructors<H: ConstructorHook + 'static>(hook: Arc<H>) -> Self {
        Self {
            method: None,
            constructor: Some(hook),
        }
    }

    /// Creates a handle for a hook that instruments methods and constructors.
    #[must_use]
    pub fn universal<H: MethodHook + ConstructorHook + 'static>(hook: Arc<H>) -> Self {
        Self {
            method: Some(Arc::clone(&hook) as Arc<dyn MethodHook>),
            constructor: Some(hook),
        }
    }

    /// Returns the method-side view of the hook.
    #[must_use]
    pub fn method(&self) -> Option<&Arc<dyn MethodHook>> {
        self.method.as_ref()
    }

    /// Returns the constructor-side view of the hook.
    #[must_use]
    pub fn constructor(&self) -> Option<&Arc<dyn ConstructorHook>> {
        self.constructor.as_ref()
    }
}

impl fmt::Debug for HookHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookHandle")
            .field("method", &self.method.is_some())
            .field("constructor", &self.constructor.is_some())
            .finish()
    }
}
