//! Hook dispatch and invocation-tree correlation for instrumentation-based
//! performance monitoring agents.
//!

pub use hookweave_internal::*;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use hookweave_internal::prelude::*;
}
