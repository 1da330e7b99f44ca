//! Site id to sensor configuration mapping.
//!
//! The registry is written when classes are loaded or re-instrumented and is
//! read on every instrumented call from any number of threads.
//!
//! # Concurrency
//!
//! - Readers load the current immutable snapshot (`ArcSwap` load) and are
//!   wait-free; a lookup never allocates.
//! - Writers copy the snapshot, apply the change and publish the copy with a
//!   compare-and-swap loop (`rcu`). Concurrent writes are never lost.
//! - Replacing a site's configuration is an atomic swap: a reader sees either
//!   the old or the new configuration, never a mix.

use core::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;
use hashbrown::HashMap;
use hookweave_sensor::config::SensorConfig;
use hookweave_sensor::id::SiteId;

type Snapshot = HashMap<SiteId, Arc<SensorConfig>>;

/// Registry of instrumented sites.
///
/// A lookup miss is a normal state (uninstrumented or not yet registered site)
/// and never an error.
pub struct SensorRegistry {
    sites: ArcSwap<Snapshot>,
}

impl SensorRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sites: ArcSwap::from_pointee(HashMap::new()),
        }
    }

    /// Stores the configuration of `site`, replacing any previous one.
    pub fn register(&self, site: SiteId, config: SensorConfig) {
        let config = Arc::new(config);
        self.sites.rcu(|current| {
            let mut next = Snapshot::clone(current);
            next.insert(site, Arc::clone(&config));
            next
        });
    }

    /// Returns the configuration of `site`, if registered.
    #[must_use]
    pub fn lookup(&self, site: SiteId) -> Option<Arc<SensorConfig>> {
        self.sites.load().get(&site).cloned()
    }

    /// Checks if `site` is registered.
    #[must_use]
    pub fn contains(&self, site: SiteId) -> bool {
        self.sites.load().contains_key(&site)
    }

    /// Returns the number of registered sites.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sites.load().len()
    }

    /// Returns `true` if no site is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sites.load().is_empty()
    }

    /// Lists registered site ids in ascending order.
    #[must_use]
    pub fn site_ids(&self) -> Vec<SiteId> {
        let mut ids: Vec<SiteId> = self.sites.load().keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

impl Default for SensorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SensorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SensorRegistry")
            .field("sites", &self.len())
            .finish()
    }
}
