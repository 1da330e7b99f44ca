//! Per-site sensor configuration.
//!
//! One [`SensorConfig`] exists per instrumented method or constructor. It is
//! created once by the instrumentation layer (at class-load time) and is
//! immutable afterwards; re-instrumentation replaces it wholesale.
//!
//! # Example
//!
//! ```
//! use hookweave_sensor::config::SensorConfig;
//! use hookweave_sensor::id::SensorTypeId;
//!
//! let config = SensorConfig::method()
//!     .with_sensor(SensorTypeId::new(7))
//!     .with_sensor(SensorTypeId::new(13))
//!     .starts_invocation(true)
//!     .build();
//!
//! assert_eq!(config.sensor_ids(), &[SensorTypeId::new(7), SensorTypeId::new(13)]);
//! assert!(config.starts_invocation());
//! assert!(!config.is_constructor());
//! ```

use crate::id::SensorTypeId;

// ─────────────────────────────────────────────────────────────────────────────
// ExceptionWiring
// ─────────────────────────────────────────────────────────────────────────────

/// Exception-sensor wiring metadata attached to a site.
///
/// Informational for the exception sensor; the dispatcher never branches on it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExceptionWiring {
    /// Fully qualified name of the exception type the site was instrumented for.
    pub target_class: Option<String>,
    /// Whether enhanced exception tracking (throw, pass, catch) is enabled.
    pub enhanced: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// SensorConfig
// ─────────────────────────────────────────────────────────────────────────────

/// Sensor configuration of one instrumented site.
///
/// The order of [`sensor_ids`](Self::sensor_ids) defines the wrap order: the
/// last sensor is the outermost wrapper and is dispatched first on entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorConfig {
    sensor_ids: Vec<SensorTypeId>,
    starts_invocation: bool,
    is_constructor: bool,
    exception_wiring: Option<ExceptionWiring>,
}

impl SensorConfig {
    /// Starts building the configuration of an instrumented method.
    #[must_use]
    pub fn method() -> SensorConfigBuilder {
        SensorConfigBuilder::new(false)
    }

    /// Starts building the configuration of an instrumented constructor.
    #[must_use]
    pub fn constructor() -> SensorConfigBuilder {
        SensorConfigBuilder::new(true)
    }

    /// Sensor types attached to the site, in declaration order.
    #[must_use]
    pub fn sensor_ids(&self) -> &[SensorTypeId] {
        &self.sensor_ids
    }

    /// Whether entering the site starts an invocation-tree recording.
    #[must_use]
    pub fn starts_invocation(&self) -> bool {
        self.starts_invocation
    }

    /// Whether the site is a constructor.
    #[must_use]
    pub fn is_constructor(&self) -> bool {
        self.is_constructor
    }

    /// Exception-sensor wiring, if the site was instrumented for exceptions.
    #[must_use]
    pub fn exception_wiring(&self) -> Option<&ExceptionWiring> {
        self.exception_wiring.as_ref()
    }

    /// Returns `true` if `sensor` is one of the configured sensor types.
    #[must_use]
    pub fn contains_sensor(&self, sensor: SensorTypeId) -> bool {
        self.sensor_ids.contains(&sensor)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SensorConfigBuilder
// ─────────────────────────────────────────────────────────────────────────────

/// Builder for [`SensorConfig`].
#[derive(Debug, Clone)]
#[must_use]
pub struct SensorConfigBuilder {
    config: SensorConfig,
}

impl SensorConfigBuilder {
    fn new(is_constructor: bool) -> Self {
        Self {
            config: SensorConfig {
                sensor_ids: Vec::new(),
                starts_invocation: false,
                is_constructor,
                exception_wiring: None,
            },
        }
    }

    /// Appends a sensor type. Appending an already present type is ignored.
    pub fn with_sensor(mut self, sensor: impl Into<SensorTypeId>) -> Self {
        let sensor = sensor.into();
        if !self.config.sensor_ids.contains(&sensor) {
            self.config.sensor_ids.push(sensor);
        }
        self
    }

    /// Appends several sensor types in order.
    pub fn with_sensors<I>(mut self, sensors: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<SensorTypeId>,
    {
        for sensor in sensors {
            self = self.with_sensor(sensor);
        }
        self
    }

    /// Marks the site as the root of an invocation-tree recording.
    pub fn starts_invocation(mut self, starts: bool) -> Self {
        self.config.starts_invocation = starts;
        self
    }

    /// Attaches exception-sensor wiring metadata.
    pub fn with_exception_wiring(mut self, wiring: ExceptionWiring) -> Self {
        self.config.exception_wiring = Some(wiring);
        self
    }

    /// Finishes the configuration.
    #[must_use]
    pub fn build(self) -> SensorConfig {
        self.config
    }
}
