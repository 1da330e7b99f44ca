//! Data sinks for finalized measurements.
//!
//! After-body dispatches hand every sensor a [`Sink`]. Outside an
//! invocation-tree recording the sink is the real [`CoreService`]; inside one
//! it is the active [`InvocationTreeHook`], which attaches the data to the
//! current tree node instead of reporting it on its own.

use core::fmt;

use crate::hook::InvocationTreeHook;
use crate::id::{SensorTypeId, SiteId};
use crate::object::Object;

/// Opaque measurement payload produced by a sensor.
pub type SensorData = Box<dyn Object>;

/// Destination for finalized sensor data.
///
/// The real implementation buffers data for transport to the monitoring
/// backend; the invocation-tree hook implements it as a local sink.
pub trait CoreService: Send + Sync {
    /// Stores data produced by a method or constructor sensor.
    ///
    /// `prefix` distinguishes several data objects a sensor stores for the
    /// same site.
    fn add_method_sensor_data(
        &self,
        sensor_type: SensorTypeId,
        site: SiteId,
        prefix: Option<&str>,
        data: SensorData,
    );

    /// Stores data produced by the exception sensor for one throwable.
    fn add_exception_sensor_data(
        &self,
        sensor_type: SensorTypeId,
        throwable_identity: u64,
        data: SensorData,
    );
}

/// The two kinds of sink a hook can receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SinkKind {
    /// The real downstream core service.
    Core,
    /// The active invocation-tree hook.
    InvocationTree,
}

impl fmt::Display for SinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkKind::Core => f.write_str("core"),
            SinkKind::InvocationTree => f.write_str("invocation-tree"),
        }
    }
}

/// Sink handed to a single hook call.
#[derive(Clone, Copy)]
pub enum Sink<'a> {
    /// The real downstream core service.
    Core(&'a dyn CoreService),
    /// The active invocation-tree hook acting as a local sink.
    InvocationTree(&'a dyn InvocationTreeHook),
}

impl Sink<'_> {
    /// Returns which kind of sink this is.
    #[must_use]
    pub fn kind(&self) -> SinkKind {
        match self {
            Sink::Core(_) => SinkKind::Core,
            Sink::InvocationTree(_) => SinkKind::InvocationTree,
        }
    }

    /// Returns `true` if data goes to the active invocation tree.
    #[must_use]
    pub fn is_invocation_tree(&self) -> bool {
        matches!(self, Sink::InvocationTree(_))
    }
}

impl fmt::Debug for Sink<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Sink").field(&self.kind()).finish()
    }
}

impl CoreService for Sink<'_> {
    fn add_method_sensor_data(
        &self,
        sensor_type: SensorTypeId,
        site: SiteId,
        prefix: Option<&str>,
        data: SensorData,
    ) {
        match self {
            Sink::Core(core) => core.add_method_sensor_data(sensor_type, site, prefix, data),
            Sink::InvocationTree(tree) => {
                tree.add_method_sensor_data(sensor_type, site, prefix, data);
            }
        }
    }

    fn add_exception_sensor_data(
        &self,
        sensor_type: SensorTypeId,
        throwable_identity: u64,
        data: SensorData,
    ) {
        match self {
            Sink::Core(core) => {
                core.add_exception_sensor_data(sensor_type, throwable_identity, data);
            }
            Sink::InvocationTree(tree) => {
                tree.add_exception_sensor_data(sensor_type, throwable_identity, data);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SensorConfig;
    use crate::error::HookResult;
    use crate::hook::{ConstructorHook, MethodHook};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Store {
        stored: Mutex<Vec<(u64, String)>>,
    }

    impl Store {
        fn record(&self, sensor_type: SensorTypeId, data: &SensorData) {
            self.stored
                .lock()
                .unwrap()
                .push((sensor_type.get(), format!("{data:?}")));
        }
    }

    impl CoreService for Store {
        fn add_method_sensor_data(
            &self,
            sensor_type: SensorTypeId,
            _site: SiteId,
            _prefix: Option<&str>,
            data: SensorData,
        ) {
            self.record(sensor_type, &data);
        }

        fn add_exception_sensor_data(
            &self,
            sensor_type: SensorTypeId,
            _throwable_identity: u64,
            data: SensorData,
        ) {
            self.record(sensor_type, &data);
        }
    }

    impl MethodHook for Store {
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

    impl ConstructorHook for Store {
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

    #[test]
    fn sink_kind_matches_variant() {
        let store = Store::default();
        assert_eq!(Sink::Core(&store).kind(), SinkKind::Core);
        assert_eq!(Sink::InvocationTree(&store).kind(), SinkKind::InvocationTree);
        assert!(Sink::InvocationTree(&store).is_invocation_tree());
        assert!(!Sink::Core(&store).is_invocation_tree());
    }

    #[test]
    fn sink_delegates_to_wrapped_service() {
        let core = Store::default();
        let tree = Store::default();

        Sink::Core(&core).add_method_sensor_data(
            SensorTypeId::new(7),
            SiteId::new(3),
            None,
            Box::new(1_u32),
        );
        Sink::InvocationTree(&tree).add_exception_sensor_data(
            SensorTypeId::new(2),
            99,
            Box::new("boom"),
        );

        assert_eq!(*core.stored.lock().unwrap(), vec![(7, "1".to_string())]);
        assert_eq!(
            *tree.stored.lock().unwrap(),
            vec![(2, "\"boom\"".to_string())]
        );
    }

    #[test]
    fn sink_kind_display() {
        assert_eq!(SinkKind::Core.to_string(), "core");
        assert_eq!(SinkKind::InvocationTree.to_string(), "invocation-tree");
    }
}
