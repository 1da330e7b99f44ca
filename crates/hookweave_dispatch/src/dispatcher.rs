//! Dispatch entry points called by instrumented code.
//!
//! [`HookDispatcher`] implements the call-site contract ([`HookDispatch`]) and
//! the mapping contract ([`HookDispatchMapper`]) the instrumentation layer
//! uses. Every entry point runs synchronously on the application thread that
//! executes the instrumented code and never returns an error: a lookup miss is
//! a no-op, an unresolved hook is skipped, and a failing hook is logged and
//! counted before dispatch moves on to the next one.
//!
//! # Ordering
//!
//! | Phase | Configured sensors | Woven tree sensor |
//! |-------|--------------------|-------------------|
//! | before body / before constructor | last to first | after the sensors |
//! | first after body | first to last | after the sensors |
//! | second after body / after constructor | first to last | after the sensors |
//!
//! The woven tree sensor is only dispatched while an invocation-tree recording
//! is active and the call's own configuration does not list it.

use core::any::Any;
use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use hookweave_sensor::config::SensorConfig;
use hookweave_sensor::error::{HookError, HookResult};
use hookweave_sensor::hook::{ConstructorHook, HookHandle, MethodHook};
use hookweave_sensor::id::{SensorTypeId, SiteId};
use hookweave_sensor::object::Object;
use hookweave_sensor::resolver::{ExceptionSensor, HookResolver};
use hookweave_sensor::sink::{CoreService, Sink};
use tracing::{debug, trace, warn};

use crate::config::DispatcherConfig;
use crate::context::{ContextStore, DispatchScope, Opening};
use crate::registry::SensorRegistry;

// ─────────────────────────────────────────────────────────────────────────────
// DispatchPhase
// ─────────────────────────────────────────────────────────────────────────────

/// The point of an instrumented call a dispatch belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DispatchPhase {
    /// Method entry.
    BeforeBody,
    /// Method return, before finalization.
    FirstAfterBody,
    /// Method return, terminal dispatch.
    SecondAfterBody,
    /// Exception thrown inside a method body.
    OnThrowInBody,
    /// Exception about to be caught inside a method body.
    BeforeCatch,
    /// Constructor entry.
    BeforeConstructor,
    /// Constructor completion, terminal dispatch.
    AfterConstructor,
    /// Exception thrown inside a constructor body.
    ConstructorOnThrowInBody,
    /// Exception about to be caught inside a constructor body.
    ConstructorBeforeCatch,
}

impl DispatchPhase {
    /// Returns the phase name used in log output.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BeforeBody => "before_body",
            Self::FirstAfterBody => "first_after_body",
            Self::SecondAfterBody => "second_after_body",
            Self::OnThrowInBody => "on_throw_in_body",
            Self::BeforeCatch => "before_catch",
            Self::BeforeConstructor => "before_constructor",
            Self::AfterConstructor => "after_constructor",
            Self::ConstructorOnThrowInBody => "constructor_on_throw_in_body",
            Self::ConstructorBeforeCatch => "constructor_before_catch",
        }
    }
}

impl fmt::Display for DispatchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Contracts
// ─────────────────────────────────────────────────────────────────────────────

/// Call-site contract emitted by the instrumentation layer.
///
/// Around a method body the instrumentation calls
/// `before_body`, then on normal return `first_after_body` and
/// `second_after_body`. Bodies instrumented for exception tracking also call
/// `on_throw_in_body` or `before_catch` on the throwing path. The second
/// after-body dispatch (or `after_body` for constructors) is the terminal
/// dispatch of a call and must be emitted on every exit path.
///
/// Argument order is part of the compatibility surface.
pub trait HookDispatch: Send + Sync {
    /// Method entry.
    fn dispatch_method_before_body(
        &self,
        site: SiteId,
        receiver: Option<&dyn Object>,
        args: &[&dyn Object],
    );

    /// Method return, before finalization.
    fn dispatch_first_method_after_body(
        &self,
        site: SiteId,
        receiver: Option<&dyn Object>,
        args: &[&dyn Object],
        return_value: Option<&dyn Object>,
    );

    /// Method return, terminal dispatch.
    fn dispatch_second_method_after_body(
        &self,
        site: SiteId,
        receiver: Option<&dyn Object>,
        args: &[&dyn Object],
        return_value: Option<&dyn Object>,
    );

    /// Exception thrown inside a method body.
    fn dispatch_on_throw_in_body(
        &self,
        site: SiteId,
        receiver: Option<&dyn Object>,
        args: &[&dyn Object],
        exception: &dyn Object,
    );

    /// Exception about to be caught inside a method body.
    fn dispatch_before_catch(&self, site: SiteId, exception: &dyn Object);

    /// Constructor entry.
    fn dispatch_constructor_before_body(&self, site: SiteId, args: &[&dyn Object]);

    /// Constructor completion, terminal dispatch.
    fn dispatch_constructor_after_body(
        &self,
        site: SiteId,
        instance: &dyn Object,
        args: &[&dyn Object],
    );

    /// Exception thrown inside a constructor body.
    fn dispatch_constructor_on_throw_in_body(
        &self,
        site: SiteId,
        instance: &dyn Object,
        args: &[&dyn Object],
        exception: &dyn Object,
    );

    /// Exception about to be caught inside a constructor body.
    fn dispatch_constructor_before_catch(&self, site: SiteId, exception: &dyn Object);
}

/// Registration of site configurations, called when classes are
/// instrumented.
pub trait HookDispatchMapper: Send + Sync {
    /// Registers the configuration of an instrumented method.
    fn register_method_mapping(&self, site: SiteId, config: SensorConfig);

    /// Registers the configuration of an instrumented constructor.
    fn register_constructor_mapping(&self, site: SiteId, config: SensorConfig);
}

// ─────────────────────────────────────────────────────────────────────────────
// HookDispatcher
// ─────────────────────────────────────────────────────────────────────────────

/// The hook dispatch engine.
///
/// Shared by all application threads; per-thread state lives in thread-local
/// storage private to this instance.
pub struct HookDispatcher {
    registry: SensorRegistry,
    resolver: Arc<dyn HookResolver>,
    core_service: Arc<dyn CoreService>,
    config: DispatcherConfig,
    contexts: ContextStore,
    failures: AtomicU64,
}

impl HookDispatcher {
    /// Creates a dispatcher with the default [`DispatcherConfig`].
    #[must_use]
    pub fn new(resolver: Arc<dyn HookResolver>, core_service: Arc<dyn CoreService>) -> Self {
        Self::with_config(resolver, core_service, DispatcherConfig::default())
    }

    /// Creates a dispatcher with an explicit configuration.
    #[must_use]
    pub fn with_config(
        resolver: Arc<dyn HookResolver>,
        core_service: Arc<dyn CoreService>,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            registry: SensorRegistry::new(),
            resolver,
            core_service,
            config,
            contexts: ContextStore::new(),
            failures: AtomicU64::new(0),
        }
    }

    /// Returns the site registry.
    #[must_use]
    pub fn registry(&self) -> &SensorRegistry {
        &self.registry
    }

    /// Returns the dispatcher configuration.
    #[must_use]
    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Checks if an invocation-tree recording is active on the calling thread.
    #[must_use]
    pub fn invocation_active(&self) -> bool {
        self.contexts.is_active()
    }

    /// Number of hook and resolver calls that failed or panicked since
    /// creation.
    #[must_use]
    pub fn hook_failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────────

    fn enter(&self, site: SiteId, phase: DispatchPhase) -> Option<DispatchScope<'_>> {
        let scope = self.contexts.enter(self.config.reentrancy_guard);
        if scope.is_none() {
            debug!(%site, %phase, "dispatch skipped, already dispatching on this thread");
        }
        scope
    }

    /// Opens a `starts_invocation` call on the thread's context.
    ///
    /// The tree sensor is resolved only when no recording is active. Returns
    /// `true` if the call holds a depth level it must close at its terminal
    /// dispatch.
    fn begin_invocation(&self, site: SiteId, phase: DispatchPhase) -> bool {
        let tree = if self.contexts.is_active() {
            None
        } else {
            self.guard_resolver(site, phase, || self.resolver.invocation_tree_sensor())
                .flatten()
        };

        let opening = self.contexts.open_invocation(site, tree);
        match opening {
            Opening::Started => trace!(%site, "invocation tree started"),
            Opening::Joined => trace!(%site, "nested invocation joined the active tree"),
            Opening::Unrecorded => {
                debug!(%site, "no invocation tree sensor available, call not recorded");
            }
        }
        opening.is_recorded()
    }

    /// Closes the `starts_invocation` call opened at `site`, if any.
    ///
    /// Ownership was decided on entry, so the site's current configuration
    /// plays no part here.
    fn end_invocation(&self, site: SiteId) {
        if self.contexts.close_invocation(site) {
            trace!(%site, "invocation tree closed");
        }
    }

    fn resolve<T: ?Sized>(
        &self,
        site: SiteId,
        sensor_type: SensorTypeId,
        phase: DispatchPhase,
        side: fn(&HookHandle) -> Option<&Arc<T>>,
    ) -> Option<Arc<T>> {
        let handle = self
            .guard_resolver(site, phase, || self.resolver.hook_for(sensor_type))
            .flatten();
        let Some(handle) = handle else {
            debug!(%site, %sensor_type, %phase, "no hook resolved for sensor type");
            return None;
        };

        let hook = side(&handle).cloned();
        if hook.is_none() {
            debug!(%site, %sensor_type, %phase, "hook does not support this dispatch");
        }
        hook
    }

    fn method_hook(
        &self,
        site: SiteId,
        sensor_type: SensorTypeId,
        phase: DispatchPhase,
    ) -> Option<Arc<dyn MethodHook>> {
        self.resolve(site, sensor_type, phase, HookHandle::method)
    }

    fn constructor_hook(
        &self,
        site: SiteId,
        sensor_type: SensorTypeId,
        phase: DispatchPhase,
    ) -> Option<Arc<dyn ConstructorHook>> {
        self.resolve(site, sensor_type, phase, HookHandle::constructor)
    }

    fn exception_sensor(&self, site: SiteId, phase: DispatchPhase) -> Option<ExceptionSensor> {
        let sensor = self
            .guard_resolver(site, phase, || self.resolver.exception_sensor())
            .flatten();
        if sensor.is_none() {
            debug!(%site, %phase, "no exception sensor available");
        }
        sensor
    }

    /// Runs `call`, turning a panic into [`HookError::Panicked`] when
    /// `catch_panics` is enabled.
    fn contain<R>(&self, call: impl FnOnce() -> R) -> Result<R, HookError> {
        if self.config.catch_panics {
            panic::catch_unwind(AssertUnwindSafe(call))
                .map_err(|payload| HookError::Panicked(panic_message(&*payload)))
        } else {
            Ok(call())
        }
    }

    /// Runs one resolver call. A panic is counted and logged like a failing
    /// hook and yields `None`.
    fn guard_resolver<R>(
        &self,
        site: SiteId,
        phase: DispatchPhase,
        call: impl FnOnce() -> R,
    ) -> Option<R> {
        match self.contain(call) {
            Ok(resolved) => Some(resolved),
            Err(error) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                warn!(%site, %phase, %error, "hook resolver failed");
                None
            }
        }
    }

    /// Runs one hook call, absorbing its failure.
    fn isolate(
        &self,
        site: SiteId,
        sensor_type: SensorTypeId,
        phase: DispatchPhase,
        call: impl FnOnce() -> HookResult,
    ) {
        if let Err(error) = self.contain(call).and_then(|outcome| outcome) {
            self.failures.fetch_add(1, Ordering::Relaxed);
            warn!(%site, %sensor_type, %phase, %error, "sensor hook failed");
        }
    }

    fn dispatch_exception(
        &self,
        site: SiteId,
        phase: DispatchPhase,
        call: impl FnOnce(&ExceptionSensor, Sink<'_>, Option<&SensorConfig>) -> HookResult,
    ) {
        let Some(_scope) = self.enter(site, phase) else {
            return;
        };
        let Some(sensor) = self.exception_sensor(site, phase) else {
            return;
        };

        let config = self.registry.lookup(site);
        let ctx = self.contexts.snapshot();
        let sink = ctx.current_sink(sensor.id, self.core_service.as_ref());
        self.isolate(site, sensor.id, phase, || call(&sensor, sink, config.as_deref()));
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

impl HookDispatch for HookDispatcher {
    fn dispatch_method_before_body(
        &self,
        site: SiteId,
        receiver: Option<&dyn Object>,
        args: &[&dyn Object],
    ) {
        let phase = DispatchPhase::BeforeBody;
        let Some(mut scope) = self.enter(site, phase) else {
            return;
        };
        let Some(config) = self.registry.lookup(site) else {
            return;
        };

        if config.starts_invocation() && self.begin_invocation(site, phase) {
            scope.close_on_unwind(site);
        }
        let ctx = self.contexts.snapshot();

        for &sensor_type in config.sensor_ids().iter().rev() {
            if let Some(hook) = self.method_hook(site, sensor_type, phase) {
                self.isolate(site, sensor_type, phase, || {
                    hook.before_body(site, sensor_type, receiver, args, &config)
                });
            }
        }

        if let Some(tree) = ctx.woven_tree(config.sensor_ids()) {
            self.isolate(site, tree.id, phase, || {
                tree.hook.before_body(site, tree.id, receiver, args, &config)
            });
        }
    }

    fn dispatch_first_method_after_body(
        &self,
        site: SiteId,
        receiver: Option<&dyn Object>,
        args: &[&dyn Object],
        return_value: Option<&dyn Object>,
    ) {
        let phase = DispatchPhase::FirstAfterBody;
        let Some(_scope) = self.enter(site, phase) else {
            return;
        };
        let Some(config) = self.registry.lookup(site) else {
            return;
        };
        let ctx = self.contexts.snapshot();

        for &sensor_type in config.sensor_ids() {
            if let Some(hook) = self.method_hook(site, sensor_type, phase) {
                self.isolate(site, sensor_type, phase, || {
                    hook.first_after_body(site, sensor_type, receiver, args, return_value, &config)
                });
            }
        }

        if let Some(tree) = ctx.woven_tree(config.sensor_ids()) {
            self.isolate(site, tree.id, phase, || {
                tree.hook
                    .first_after_body(site, tree.id, receiver, args, return_value, &config)
            });
        }
    }

    fn dispatch_second_method_after_body(
        &self,
        site: SiteId,
        receiver: Option<&dyn Object>,
        args: &[&dyn Object],
        return_value: Option<&dyn Object>,
    ) {
        let phase = DispatchPhase::SecondAfterBody;
        let Some(mut scope) = self.enter(site, phase) else {
            return;
        };
        scope.close_on_unwind(site);
        let Some(config) = self.registry.lookup(site) else {
            self.end_invocation(site);
            return;
        };
        let ctx = self.contexts.snapshot();
        let core = self.core_service.as_ref();

        for &sensor_type in config.sensor_ids() {
            if let Some(hook) = self.method_hook(site, sensor_type, phase) {
                let sink = ctx.current_sink(sensor_type, core);
                self.isolate(site, sensor_type, phase, || {
                    hook.second_after_body(
                        sink,
                        site,
                        sensor_type,
                        receiver,
                        args,
                        return_value,
                        &config,
                    )
                });
            }
        }

        if let Some(tree) = ctx.woven_tree(config.sensor_ids()) {
            self.isolate(site, tree.id, phase, || {
                tree.hook.second_after_body(
                    Sink::Core(core),
                    site,
                    tree.id,
                    receiver,
                    args,
                    return_value,
                    &config,
                )
            });
        }

        self.end_invocation(site);
    }

    fn dispatch_on_throw_in_body(
        &self,
        site: SiteId,
        receiver: Option<&dyn Object>,
        args: &[&dyn Object],
        exception: &dyn Object,
    ) {
        self.dispatch_exception(site, DispatchPhase::OnThrowInBody, |sensor, sink, config| {
            sensor.hook.dispatch_on_throw_in_body(
                sink, site, sensor.id, receiver, exception, args, config,
            )
        });
    }

    fn dispatch_before_catch(&self, site: SiteId, exception: &dyn Object) {
        self.dispatch_exception(site, DispatchPhase::BeforeCatch, |sensor, sink, config| {
            sensor
                .hook
                .dispatch_before_catch_body(sink, site, sensor.id, exception, config)
        });
    }

    fn dispatch_constructor_before_body(&self, site: SiteId, args: &[&dyn Object]) {
        let phase = DispatchPhase::BeforeConstructor;
        let Some(mut scope) = self.enter(site, phase) else {
            return;
        };
        let Some(config) = self.registry.lookup(site) else {
            return;
        };

        if config.starts_invocation() && self.begin_invocation(site, phase) {
            scope.close_on_unwind(site);
        }
        let ctx = self.contexts.snapshot();

        for &sensor_type in config.sensor_ids().iter().rev() {
            if let Some(hook) = self.constructor_hook(site, sensor_type, phase) {
                self.isolate(site, sensor_type, phase, || {
                    hook.before_constructor(site, sensor_type, args, &config)
                });
            }
        }

        if let Some(tree) = ctx.woven_tree(config.sensor_ids()) {
            self.isolate(site, tree.id, phase, || {
                tree.hook.before_constructor(site, tree.id, args, &config)
            });
        }
    }

    fn dispatch_constructor_after_body(
        &self,
        site: SiteId,
        instance: &dyn Object,
        args: &[&dyn Object],
    ) {
        let phase = DispatchPhase::AfterConstructor;
        let Some(mut scope) = self.enter(site, phase) else {
            return;
        };
        scope.close_on_unwind(site);
        let Some(config) = self.registry.lookup(site) else {
            self.end_invocation(site);
            return;
        };
        let ctx = self.contexts.snapshot();
        let core = self.core_service.as_ref();

        for &sensor_type in config.sensor_ids() {
            if let Some(hook) = self.constructor_hook(site, sensor_type, phase) {
                let sink = ctx.current_sink(sensor_type, core);
                self.isolate(site, sensor_type, phase, || {
                    hook.after_constructor(sink, site, sensor_type, instance, args, &config)
                });
            }
        }

        if let Some(tree) = ctx.woven_tree(config.sensor_ids()) {
            self.isolate(site, tree.id, phase, || {
                tree.hook
                    .after_constructor(Sink::Core(core), site, tree.id, instance, args, &config)
            });
        }

        self.end_invocation(site);
    }

    fn dispatch_constructor_on_throw_in_body(
        &self,
        site: SiteId,
        instance: &dyn Object,
        args: &[&dyn Object],
        exception: &dyn Object,
    ) {
        let phase = DispatchPhase::ConstructorOnThrowInBody;
        self.dispatch_exception(site, phase, |sensor, sink, config| {
            sensor.hook.dispatch_on_throw_in_body(
                sink,
                site,
                sensor.id,
                Some(instance),
                exception,
                args,
                config,
            )
        });
    }

    fn dispatch_constructor_before_catch(&self, site: SiteId, exception: &dyn Object) {
        let phase = DispatchPhase::ConstructorBeforeCatch;
        self.dispatch_exception(site, phase, |sensor, sink, config| {
            sensor
                .hook
                .dispatch_before_catch_body(sink, site, sensor.id, exception, config)
        });
    }
}

impl HookDispatchMapper for HookDispatcher {
    fn register_method_mapping(&self, site: SiteId, config: SensorConfig) {
        trace!(%site, sensors = config.sensor_ids().len(), "method mapping registered");
        self.registry.register(site, config);
    }

    fn register_constructor_mapping(&self, site: SiteId, config: SensorConfig) {
        trace!(%site, sensors = config.sensor_ids().len(), "constructor mapping registered");
        self.registry.register(site, config);
    }
}

impl fmt::Debug for HookDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookDispatcher")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .field("hook_failures", &self.hook_failures())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_display_uses_snake_case() {
        assert_eq!(DispatchPhase::BeforeBody.to_string(), "before_body");
        assert_eq!(
            DispatchPhase::ConstructorBeforeCatch.to_string(),
            "constructor_before_catch"
        );
    }

    #[test]
    fn panic_message_reads_str_and_string_payloads() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(&*payload), "boom");

        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(&*payload), "bang");

        let payload: Box<dyn Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(&*payload), "non-string panic payload");
    }
}
