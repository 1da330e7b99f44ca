//! Default hook resolver.
//!
//! [`SensorCatalog`] maps sensor-type ids to hooks and holds the two
//! well-known sensors. Registration happens while the agent starts (and when
//! sensor definitions change); lookups happen on every dispatched call.
//!
//! # Example
//!
//! ```ignore
//! let catalog = SensorCatalog::new();
//! catalog
//!     .register(SensorTypeId::new(7), HookHandle::for_methods(Arc::new(TimerHook::new())))?
//!     .set_invocation_tree_sensor(SensorTypeId::new(13), Arc::new(TreeHook::new()))?
//!     .set_exception_sensor(SensorTypeId::new(21), Arc::new(ExceptionHook::new()));
//! ```

use core::fmt;
use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::RwLock;

use crate::error::CatalogError;
use crate::hook::{ExceptionSensorHook, HookHandle, InvocationTreeHook};
use crate::id::SensorTypeId;
use crate::resolver::{ExceptionSensor, HookResolver, TreeSensor};

/// Thread-safe registry of sensor hooks.
///
/// # Thread Safety
///
/// Uses interior mutability via [`RwLock`] so hooks can be registered through
/// a shared reference while other threads resolve them.
#[derive(Default)]
pub struct SensorCatalog {
    /// Maps sensor-type ids to hook handles.
    hooks: RwLock<HashMap<SensorTypeId, HookHandle>>,
    tree: RwLock<Option<TreeSensor>>,
    exception: RwLock<Option<ExceptionSensor>>,
}

impl SensorCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the hook of an ordinary sensor type.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::DuplicateSensorType`] if a hook is already
    /// registered for `sensor_type`.
    pub fn register(
        &self,
        sensor_type: SensorTypeId,
        hook: HookHandle,
    ) -> Result<&Self, CatalogError> {
        let mut hooks = self.hooks.write();
        if hooks.contains_key(&sensor_type) {
            return Err(CatalogError::DuplicateSensorType(sensor_type));
        }
        hooks.insert(sensor_type, hook);
        Ok(self)
    }

    /// Installs the invocation-tree sensor.
    ///
    /// The tree hook also becomes resolvable through
    /// [`hook_for`](HookResolver::hook_for), so sites may list it explicitly.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::DuplicateSensorType`] if another hook already
    /// uses `sensor_type`.
    pub fn set_invocation_tree_sensor<H>(
        &self,
        sensor_type: SensorTypeId,
        hook: Arc<H>,
    ) -> Result<&Self, CatalogError>
    where
        H: InvocationTreeHook + 'static,
    {
        self.register(sensor_type, HookHandle::universal(Arc::clone(&hook)))?;
        *self.tree.write() = Some(TreeSensor {
            id: sensor_type,
            hook,
        });
        Ok(self)
    }

    /// Installs the exception sensor, replacing a previous one.
    pub fn set_exception_sensor<H>(&self, sensor_type: SensorTypeId, hook: Arc<H>) -> &Self
    where
        H: ExceptionSensorHook + 'static,
    {
        *self.exception.write() = Some(ExceptionSensor {
            id: sensor_type,
            hook,
        });
        self
    }

    /// Returns the number of registered sensor types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.hooks.read().len()
    }

    /// Returns `true` if no sensor type is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hooks.read().is_empty()
    }

    /// Checks if a hook is registered for `sensor_type`.
    #[must_use]
    pub fn contains(&self, sensor_type: SensorTypeId) -> bool {
        self.hooks.read().contains_key(&sensor_type)
    }
}

impl HookResolver for SensorCatalog {
    fn hook_for(&self, sensor_type: SensorTypeId) -> Option<HookHandle> {
        self.hooks.read().get(&sensor_type).cloned()
    }

    fn invocation_tree_sensor(&self) -> Option<TreeSensor> {
        self.tree.read().clone()
    }

    fn exception_sensor(&self) -> Option<ExceptionSensor> {
        self.exception.read().clone()
    }
}

impl fmt::Debug for SensorCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut sensor_types: Vec<SensorTypeId> = self.hooks.read().keys().copied().collect();
        sensor_types.sort_unstable();
        f.debug_struct("SensorCatalog")
            .field("sensor_types", &sensor_types)
            .field("tree", &self.tree.read().as_ref().map(|tree| tree.id))
            .field(
                "exception",
                &self.exception.read().as_ref().map(|exception| exception.id),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SensorConfig;
    use crate::error::HookResult;
    use crate::hook::{ConstructorHook, MethodHook};
    use crate::id::SiteId;
    use crate::object::Object;
    use crate::sink::{CoreService, SensorData, Sink};

    struct Quiet;

    impl MethodHook for Quiet {
        fn before_body(
            &self,
            _site: SiteId,
            _sensor_type: SensorTypeId,
            _receiver: Option<&dyn Object>,
            _args: &[&dyn Object],
            _config: &SensorConfig,
        ) -> HookResult {
            Ok(())
        }

        fn second_after_body(
            &self,
            _sink: Sink<'_>,
            _site: SiteId,
            _sensor_type: SensorTypeId,
            _receiver: Option<&dyn Object>,
            _args: &[&dyn Object],
            _return_value: Option<&dyn Object>,
            _config: &SensorConfig,
        ) -> HookResult {
            Ok(())
        }
    }

    impl ConstructorHook for Quiet {
        fn before_constructor(
            &self,
            _site: SiteId,
            _sensor_type: SensorTypeId,
            _args: &[&dyn Object],
            _config: &SensorConfig,
        ) -> HookResult {
            Ok(())
        }

        fn after_constructor(
            &self,
            _sink: Sink<'_>,
            _site: SiteId,
            _sensor_type: SensorTypeId,
            _instance: &dyn Object,
            _args: &[&dyn Object],
            _config: &SensorConfig,
        ) -> HookResult {
            Ok(())
        }
    }

    impl CoreService for Quiet {
        fn add_method_sensor_data(
            &self,
            _sensor_type: SensorTypeId,
            _site: SiteId,
            _prefix: Option<&str>,
            _data: SensorData,
        ) {
        }

        fn add_exception_sensor_data(
            &self,
            _sensor_type: SensorTypeId,
            _throwable_identity: u64,
            _data: SensorData,
        ) {
        }
    }

    impl ExceptionSensorHook for Quiet {
        fn dispatch_on_throw_in_body(
            &self,
            _sink: Sink<'_>,
            _site: SiteId,
            _sensor_type: SensorTypeId,
            _receiver: Option<&dyn Object>,
            _exception: &dyn Object,
            _args: &[&dyn Object],
            _config: Option<&SensorConfig>,
        ) -> HookResult {
            Ok(())
        }

        fn dispatch_before_catch_body(
            &self,
            _sink: Sink<'_>,
            _site: SiteId,
            _sensor_type: SensorTypeId,
            _exception: &dyn Object,
            _config: Option<&SensorConfig>,
        ) -> HookResult {
            Ok(())
        }
    }

    #[test]
    fn register_then_resolve() {
        let catalog = SensorCatalog::new();
        assert!(catalog.is_empty());

        catalog
            .register(SensorTypeId::new(7), HookHandle::for_methods(Arc::new(Quiet)))
            .expect("registration should succeed");

        assert_eq!(catalog.len(), 1);
        assert!(catalog.contains(SensorTypeId::new(7)));
        assert!(catalog.hook_for(SensorTypeId::new(7)).is_some());
        assert!(catalog.hook_for(SensorTypeId::new(8)).is_none());
    }

    #[test]
    fn register_rejects_duplicate_sensor_type() {
        let catalog = SensorCatalog::new();
        catalog
            .register(SensorTypeId::new(7), HookHandle::for_methods(Arc::new(Quiet)))
            .unwrap();

        let result = catalog.register(
            SensorTypeId::new(7),
            HookHandle::for_methods(Arc::new(Quiet)),
        );
        assert_eq!(
            result.err(),
            Some(CatalogError::DuplicateSensorType(SensorTypeId::new(7)))
        );
    }

    #[test]
    fn tree_sensor_is_resolvable_by_id() {
        let catalog = SensorCatalog::new();
        catalog
            .set_invocation_tree_sensor(SensorTypeId::new(13), Arc::new(Quiet))
            .unwrap();

        let tree = catalog.invocation_tree_sensor().expect("tree sensor set");
        assert_eq!(tree.id, SensorTypeId::new(13));

        let handle = catalog.hook_for(SensorTypeId::new(13)).expect("tree hook");
        assert!(handle.method().is_some());
        assert!(handle.constructor().is_some());
    }

    #[test]
    fn well_known_sensors_default_to_none() {
        let catalog = SensorCatalog::new();
        assert!(catalog.invocation_tree_sensor().is_none());
        assert!(catalog.exception_sensor().is_none());
    }

    #[test]
    fn exception_sensor_can_be_replaced() {
        let catalog = SensorCatalog::new();
        catalog
            .set_exception_sensor(SensorTypeId::new(21), Arc::new(Quiet))
            .set_exception_sensor(SensorTypeId::new(22), Arc::new(Quiet));

        let exception = catalog.exception_sensor().expect("exception sensor set");
        assert_eq!(exception.id, SensorTypeId::new(22));
        // The exception sensor is not dispatched through per-site sensor lists.
        assert!(!catalog.contains(SensorTypeId::new(22)));
    }

    #[test]
    fn registration_chains() {
        let catalog = SensorCatalog::new();
        catalog
            .register(SensorTypeId::new(1), HookHandle::for_methods(Arc::new(Quiet)))
            .unwrap()
            .register(SensorTypeId::new(2), HookHandle::for_constructors(Arc::new(Quiet)))
            .unwrap();
        assert_eq!(catalog.len(), 2);
    }
}
