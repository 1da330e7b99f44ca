//! Opaque object handles.
//!
//! Receivers, arguments, return values, constructed instances and exceptions
//! travel through the engine as `&dyn Object`. The engine never looks inside;
//! sensors that care about a concrete type downcast:
//!
//! ```
//! use hookweave_sensor::object::Object;
//!
//! #[derive(Debug)]
//! struct Query(&'static str);
//!
//! let arg: &dyn Object = &Query("select 1");
//! let query = arg.downcast_ref::<Query>().expect("argument is a query");
//! assert_eq!(query.0, "select 1");
//! ```

use core::fmt::Debug;

use downcast_rs::{DowncastSync, impl_downcast};

/// A value owned by the monitored application.
///
/// Blanket-implemented for every `'static + Debug + Send + Sync` type.
pub trait Object: DowncastSync + Debug {}

impl<T: DowncastSync + Debug> Object for T {}

impl_downcast!(sync Object);

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Receiver {
        id: u32,
    }

    #[test]
    fn downcast_to_concrete_type() {
        let value: &dyn Object = &Receiver { id: 9 };
        assert_eq!(value.downcast_ref::<Receiver>(), Some(&Receiver { id: 9 }));
        assert!(value.downcast_ref::<String>().is_none());
    }

    #[test]
    fn is_checks_type() {
        let value: &dyn Object = &"text";
        assert!(value.is::<&str>());
        assert!(!value.is::<u64>());
    }
}
