//! Identifiers shared between the instrumentation layer, the engine and sensors.

use core::fmt;

/// Identifier of one instrumented method or constructor.
///
/// Assigned by the instrumentation layer. Methods and constructors share a
/// single namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SiteId(u64);

impl SiteId {
    /// Creates a site identifier from its raw value.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for SiteId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "site#{}", self.0)
    }
}

/// Identifier of a sensor type (timer, SQL capture, invocation tree, ...).
///
/// Each sensor type has exactly one shared hook instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SensorTypeId(u64);

impl SensorTypeId {
    /// Creates a sensor-type identifier from its raw value.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for SensorTypeId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for SensorTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sensor#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_display_with_prefix() {
        assert_eq!(SiteId::new(3).to_string(), "site#3");
        assert_eq!(SensorTypeId::from(13).to_string(), "sensor#13");
    }

    #[test]
    fn ids_round_trip_raw_value() {
        assert_eq!(SiteId::from(42).get(), 42);
        assert_eq!(SensorTypeId::new(7).get(), 7);
    }
}
